//! Class scheduling domain module.
//!
//! A [`ClassSession`] owns its attendee list, its FIFO waitlist and its booking
//! ledger. All three change only through command handling and event
//! application, implemented purely as deterministic domain logic (no IO, no
//! locking, no clock reads).

pub mod booking;
pub mod error;
pub mod session;

pub use booking::{Booking, BookingStatus, Standing};
pub use error::SessionError;
pub use session::{
    BookSeat, BookingCancelled, CancelBooking, CancelSession, ChangeCapacity, ClassSession,
    CompleteSession, DetailsUpdated, JoinWaitlist, LeaveWaitlist, Schedule, ScheduleSession,
    SeatBooked, SessionCancelled, SessionCapacityChanged, SessionCommand, SessionCompleted,
    SessionDetails, SessionEvent, SessionScheduled, SessionStatus, UpdateDetails,
    WaitlistJoined, WaitlistLeft, WaitlistPromoted,
};

/// Aggregate type name used in event envelopes.
pub const AGGREGATE_TYPE: &str = "scheduling.session";
