use thiserror::Error;

use studio_core::{DomainError, SessionId, UserId};

/// Rejection reasons for session commands.
///
/// Every variant is caller-recoverable; a rejected command never changes the
/// session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Book attempted on a full session.
    #[error("session {session_id} is full ({capacity} seats)")]
    CapacityExceeded { session_id: SessionId, capacity: u32 },

    /// Cancel attempted for a user without a confirmed seat.
    #[error("user {0} is not enrolled in this session")]
    NotEnrolled(UserId),

    /// LeaveWaitlist attempted for a user who is not waiting.
    #[error("user {0} is not on the waitlist")]
    NotWaitlisted(UserId),

    /// Book/JoinWaitlist attempted for a user already confirmed or waitlisted.
    #[error("user {0} is already booked or waitlisted")]
    AlreadyEnrolled(UserId),

    /// Mutation attempted on a session that is no longer open.
    #[error("session {0} is closed")]
    SessionClosed(SessionId),

    /// Command targets a session that was never scheduled.
    #[error("session {0} has not been scheduled")]
    NotScheduled(SessionId),

    /// ScheduleSession sent to an already scheduled session.
    #[error("session {0} is already scheduled")]
    AlreadyScheduled(SessionId),

    /// Capacity reduction below the number of confirmed attendees.
    #[error("capacity {requested} is below current attendance of {attendees}")]
    CapacityBelowAttendance { requested: u32, attendees: usize },

    #[error(transparent)]
    Domain(#[from] DomainError),
}
