use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use studio_core::{BookingId, SessionId, UserId};

/// Status of a booking record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Waitlisted,
    Cancelled,
}

impl BookingStatus {
    pub fn is_active(self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }
}

impl core::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BookingStatus::Confirmed => write!(f, "confirmed"),
            BookingStatus::Waitlisted => write!(f, "waitlisted"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A user's standing in one session, derived from attendees/waitlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Standing {
    None,
    Confirmed,
    Waitlisted,
}

/// Record of a user's relationship to a session.
///
/// Bookings are written only by `ClassSession::apply`, in the same step that
/// changes the attendee list or waitlist they describe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub session_id: SessionId,
    pub user_id: UserId,
    pub booked_at: DateTime<Utc>,
    pub status: BookingStatus,
    /// Last status change (equal to `booked_at` until the first transition).
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub(crate) fn new(
        id: BookingId,
        session_id: SessionId,
        user_id: UserId,
        status: BookingStatus,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            session_id,
            user_id,
            booked_at: at,
            status,
            updated_at: at,
        }
    }

    pub(crate) fn transition(&mut self, status: BookingStatus, at: DateTime<Utc>) {
        self.status = status;
        self.updated_at = at;
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}
