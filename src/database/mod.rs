pub mod activities_repo;
pub mod applications_repo;
pub mod current_user_repo;
pub mod notifications_repo;
pub mod ratings_repo;
pub mod schema;
