use std::sync::Arc;

use dashmap::DashSet;

use crate::error::{ParticipationError, ParticipationResult};
use crate::models::{ActivityId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gesture {
    Apply,
    CancelApplication,
    Decide(UserId),
    SubmitRating(UserId),
    CancelActivity,
    CreateActivity,
    EditActivity,
}

type GestureKey = (UserId, ActivityId, Gesture);

/// Server-side stand-in for a disabled button: one outstanding request per
/// (user, activity, gesture). Deduplication beyond that is the store's job.
#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    pending: Arc<DashSet<GestureKey>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(
        &self,
        user_id: UserId,
        activity_id: ActivityId,
        gesture: Gesture,
    ) -> ParticipationResult<InFlightGuard> {
        let key = (user_id, activity_id, gesture);
        if !self.pending.insert(key) {
            return Err(ParticipationError::InFlight);
        }
        Ok(InFlightGuard {
            pending: Arc::clone(&self.pending),
            key,
        })
    }

    #[cfg(test)]
    fn is_pending(&self, user_id: UserId, activity_id: ActivityId, gesture: Gesture) -> bool {
        self.pending.contains(&(user_id, activity_id, gesture))
    }
}

/// Releases its key when dropped, whether the request succeeded or not.
#[derive(Debug)]
pub struct InFlightGuard {
    pending: Arc<DashSet<GestureKey>>,
    key: GestureKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.pending.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_gesture_is_refused_until_first_finishes() {
        let registry = InFlightRegistry::new();
        let guard = registry.begin(1, 42, Gesture::Apply).unwrap();
        assert!(matches!(
            registry.begin(1, 42, Gesture::Apply),
            Err(ParticipationError::InFlight)
        ));
        // Different gesture or different user is independent.
        assert!(registry.begin(1, 42, Gesture::CancelActivity).is_ok());
        assert!(registry.begin(2, 42, Gesture::Apply).is_ok());

        drop(guard);
        assert!(!registry.is_pending(1, 42, Gesture::Apply));
        assert!(registry.begin(1, 42, Gesture::Apply).is_ok());
    }

    #[test]
    fn rating_gestures_are_keyed_per_target() {
        let registry = InFlightRegistry::new();
        let _first = registry.begin(1, 5, Gesture::SubmitRating(2)).unwrap();
        assert!(registry.begin(1, 5, Gesture::SubmitRating(3)).is_ok());
        assert!(registry.begin(1, 5, Gesture::SubmitRating(2)).is_err());
    }
}
