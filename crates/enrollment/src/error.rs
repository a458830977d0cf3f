use thiserror::Error;

use studio_core::{DomainError, SessionId, UserId};
use studio_scheduling::SessionError;

use crate::store::StoreError;

/// Failure of an engine operation.
///
/// All variants are caller-recoverable. When an operation fails, the session
/// is exactly as it was before the call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnrollmentError {
    /// Book attempted on a full session; the caller may join the waitlist instead.
    #[error("session {session_id} is full ({capacity} seats)")]
    CapacityExceeded { session_id: SessionId, capacity: u32 },

    /// Cancel attempted for a user with no confirmed booking.
    #[error("user {0} is not enrolled")]
    NotEnrolled(UserId),

    /// LeaveWaitlist attempted for a user not on the waitlist.
    #[error("user {0} is not on the waitlist")]
    NotWaitlisted(UserId),

    /// Book/JoinWaitlist attempted for a user already confirmed or waitlisted.
    #[error("user {0} is already booked or waitlisted")]
    AlreadyEnrolled(UserId),

    /// Mutating operation attempted on a session that is not open.
    #[error("session {0} is closed")]
    SessionClosed(SessionId),

    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    #[error("session {0} already exists")]
    SessionExists(SessionId),

    #[error("unknown user {0}")]
    UnknownUser(UserId),

    /// Only raised when `require_active_membership` is enabled.
    #[error("membership of user {0} is inactive")]
    MembershipInactive(UserId),

    #[error("capacity {requested} is below current attendance of {attendees}")]
    CapacityBelowAttendance { requested: u32, attendees: usize },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A thread panicked while holding a store lock.
    #[error("session store lock poisoned")]
    StorePoisoned,
}

impl From<DomainError> for EnrollmentError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => EnrollmentError::Validation(msg),
            DomainError::InvariantViolation(msg) => EnrollmentError::InvariantViolation(msg),
            DomainError::InvalidId(msg) => EnrollmentError::Validation(msg),
            err @ (DomainError::NotFound { .. } | DomainError::Duplicate { .. }) => {
                EnrollmentError::Validation(err.to_string())
            }
        }
    }
}

impl From<SessionError> for EnrollmentError {
    fn from(value: SessionError) -> Self {
        match value {
            SessionError::CapacityExceeded {
                session_id,
                capacity,
            } => EnrollmentError::CapacityExceeded {
                session_id,
                capacity,
            },
            SessionError::NotEnrolled(user) => EnrollmentError::NotEnrolled(user),
            SessionError::NotWaitlisted(user) => EnrollmentError::NotWaitlisted(user),
            SessionError::AlreadyEnrolled(user) => EnrollmentError::AlreadyEnrolled(user),
            SessionError::SessionClosed(id) => EnrollmentError::SessionClosed(id),
            SessionError::NotScheduled(id) => EnrollmentError::SessionNotFound(id),
            SessionError::AlreadyScheduled(id) => EnrollmentError::SessionExists(id),
            SessionError::CapacityBelowAttendance {
                requested,
                attendees,
            } => EnrollmentError::CapacityBelowAttendance {
                requested,
                attendees,
            },
            SessionError::Domain(err) => err.into(),
        }
    }
}

impl From<StoreError> for EnrollmentError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(id) => EnrollmentError::SessionNotFound(id),
            StoreError::AlreadyExists(id) => EnrollmentError::SessionExists(id),
            StoreError::Poisoned => EnrollmentError::StorePoisoned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_errors_keep_their_meaning() {
        let user = UserId::new("u1");
        let session = SessionId::new("class-1");

        assert_eq!(
            EnrollmentError::from(SessionError::NotEnrolled(user.clone())),
            EnrollmentError::NotEnrolled(user.clone())
        );
        assert_eq!(
            EnrollmentError::from(SessionError::NotScheduled(session.clone())),
            EnrollmentError::SessionNotFound(session.clone())
        );
        assert_eq!(
            EnrollmentError::from(SessionError::Domain(DomainError::invariant("broken"))),
            EnrollmentError::InvariantViolation("broken".to_string())
        );
        assert_eq!(
            EnrollmentError::from(StoreError::AlreadyExists(session.clone())),
            EnrollmentError::SessionExists(session)
        );
    }

    #[test]
    fn messages_name_the_offending_ids() {
        let err = EnrollmentError::CapacityExceeded {
            session_id: SessionId::new("class-1"),
            capacity: 2,
        };
        assert_eq!(err.to_string(), "session class-1 is full (2 seats)");
    }
}
