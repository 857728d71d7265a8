pub mod activity;
pub mod application;
pub mod current_user;
pub mod notifications;
pub mod participation;
pub mod rating;

pub use activity::{
    ActivitiesRow, Activity, ActivityDraft, ActivityId, ActivityPatch, ActivityStatus, HostRef,
    UserId,
};
pub use application::{Applicant, Application, ApplicationStatus, ApplicationsRow, Decision};
pub use current_user::CurrentUserRow;
pub use notifications::NotificationsRow;
pub use participation::ParticipationView;
pub use rating::{GivenRating, Rating, RatingsRow};
