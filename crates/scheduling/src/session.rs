use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use studio_core::{
    Aggregate, AggregateRoot, BookingId, DomainError, DomainResult, SessionId, TeacherId, UserId,
};
use studio_events::Event;

use crate::booking::{Booking, BookingStatus, Standing};
use crate::error::SessionError;

/// Session lifecycle status. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionStatus {
    Upcoming,
    Completed,
    Cancelled,
}

impl core::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SessionStatus::Upcoming => write!(f, "UPCOMING"),
            SessionStatus::Completed => write!(f, "COMPLETED"),
            SessionStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// When a session takes place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub start: DateTime<Utc>,
    pub duration_minutes: u32,
}

impl Schedule {
    pub fn new(start: DateTime<Utc>, duration_minutes: u32) -> Self {
        Self {
            start,
            duration_minutes,
        }
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.start + Duration::minutes(i64::from(self.duration_minutes))
    }
}

/// Descriptive fields of a session. No invariant depends on them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetails {
    pub name: String,
    pub description: String,
    pub teacher_id: Option<TeacherId>,
    /// Price in smallest currency unit (e.g., cents).
    pub price: u64,
}

impl SessionDetails {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("session name must not be empty"));
        }
        Ok(())
    }
}

/// Aggregate root: ClassSession.
///
/// # Invariants
/// - `attendees.len() <= capacity`, and `capacity > 0`.
/// - No user appears twice in `attendees` or twice in `waitlist`.
/// - `attendees` and `waitlist` are disjoint.
/// - `waitlist` is in join order (index 0 joined first).
/// - Each user has at most one active booking, and it is `confirmed` exactly when
///   the user is an attendee and `waitlisted` exactly when the user is waiting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSession {
    id: SessionId,
    details: SessionDetails,
    schedule: Schedule,
    capacity: u32,
    attendees: Vec<UserId>,
    waitlist: Vec<UserId>,
    status: SessionStatus,
    bookings: Vec<Booking>,
    version: u64,
    #[serde(skip)]
    created: bool,
}

impl ClassSession {
    /// Create an empty, not-yet-scheduled aggregate instance.
    pub fn empty(id: SessionId) -> Self {
        Self {
            id,
            details: SessionDetails::default(),
            schedule: Schedule::new(DateTime::<Utc>::UNIX_EPOCH, 0),
            capacity: 0,
            attendees: Vec::new(),
            waitlist: Vec::new(),
            status: SessionStatus::Upcoming,
            bookings: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> &SessionId {
        &self.id
    }

    pub fn is_scheduled(&self) -> bool {
        self.created
    }

    pub fn details(&self) -> &SessionDetails {
        &self.details
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.schedule.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.schedule.end()
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn attendees(&self) -> &[UserId] {
        &self.attendees
    }

    pub fn waitlist(&self) -> &[UserId] {
        &self.waitlist
    }

    /// Every booking ever made for this session, in creation order.
    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    /// The user's bookings in creation order, cancelled ones included.
    pub fn bookings_for<'a>(&'a self, user_id: &UserId) -> impl Iterator<Item = &'a Booking> + use<'a> {
        let user_id = user_id.clone();
        self.bookings.iter().filter(move |b| b.user_id == user_id)
    }

    /// The user's current (non-cancelled) booking, if any.
    pub fn active_booking(&self, user_id: &UserId) -> Option<&Booking> {
        self.bookings
            .iter()
            .rev()
            .find(|b| b.user_id == *user_id && b.is_active())
    }

    pub fn is_full(&self) -> bool {
        self.attendees.len() >= self.capacity as usize
    }

    pub fn open_seats(&self) -> usize {
        (self.capacity as usize).saturating_sub(self.attendees.len())
    }

    pub fn is_booked(&self, user_id: &UserId) -> bool {
        self.attendees.contains(user_id)
    }

    pub fn is_waitlisted(&self, user_id: &UserId) -> bool {
        self.waitlist.contains(user_id)
    }

    /// 0-based position in the waitlist.
    pub fn waitlist_position(&self, user_id: &UserId) -> Option<usize> {
        self.waitlist.iter().position(|u| u == user_id)
    }

    pub fn standing(&self, user_id: &UserId) -> Standing {
        if self.is_booked(user_id) {
            Standing::Confirmed
        } else if self.is_waitlisted(user_id) {
            Standing::Waitlisted
        } else {
            Standing::None
        }
    }

    /// Whether enrollment changes are accepted at instant `at`.
    pub fn is_open_at(&self, at: DateTime<Utc>) -> bool {
        self.created && self.status == SessionStatus::Upcoming && at < self.schedule.start
    }

    /// Whether the session is still upcoming but its end instant has passed.
    pub fn is_elapsed_at(&self, at: DateTime<Utc>) -> bool {
        self.created && self.status == SessionStatus::Upcoming && self.schedule.end() <= at
    }

    /// Verify every structural invariant, reporting the first violation.
    pub fn check_invariants(&self) -> DomainResult<()> {
        if !self.created {
            return Ok(());
        }

        if self.capacity == 0 {
            return Err(DomainError::invariant("capacity must be positive"));
        }
        if self.attendees.len() > self.capacity as usize {
            return Err(DomainError::invariant(format!(
                "{} attendees exceed capacity {}",
                self.attendees.len(),
                self.capacity
            )));
        }

        let mut seated = HashSet::new();
        for user in &self.attendees {
            if !seated.insert(user) {
                return Err(DomainError::invariant(format!(
                    "attendee {user} appears more than once"
                )));
            }
        }

        let mut waiting = HashSet::new();
        for user in &self.waitlist {
            if !waiting.insert(user) {
                return Err(DomainError::invariant(format!(
                    "waitlisted user {user} appears more than once"
                )));
            }
            if seated.contains(user) {
                return Err(DomainError::invariant(format!(
                    "user {user} is both attending and waitlisted"
                )));
            }
        }

        if self.status == SessionStatus::Cancelled
            && !(self.attendees.is_empty() && self.waitlist.is_empty())
        {
            return Err(DomainError::invariant(
                "cancelled session still has attendees or waitlist",
            ));
        }

        let mut active: HashMap<&UserId, &Booking> = HashMap::new();
        for booking in &self.bookings {
            if booking.session_id != self.id {
                return Err(DomainError::invariant(format!(
                    "booking {} belongs to session {}",
                    booking.id, booking.session_id
                )));
            }
            if booking.is_active() && active.insert(&booking.user_id, booking).is_some() {
                return Err(DomainError::invariant(format!(
                    "user {} has more than one active booking",
                    booking.user_id
                )));
            }
        }

        for user in &self.attendees {
            match active.get(user) {
                Some(b) if b.status == BookingStatus::Confirmed => {}
                _ => {
                    return Err(DomainError::invariant(format!(
                        "attendee {user} has no confirmed booking"
                    )));
                }
            }
        }
        for user in &self.waitlist {
            match active.get(user) {
                Some(b) if b.status == BookingStatus::Waitlisted => {}
                _ => {
                    return Err(DomainError::invariant(format!(
                        "waitlisted user {user} has no waitlisted booking"
                    )));
                }
            }
        }
        if active.len() != self.attendees.len() + self.waitlist.len() {
            return Err(DomainError::invariant(
                "active bookings exist for users outside the roster",
            ));
        }

        // Waitlisted bookings are appended on join, so ledger order is join order.
        let joined: Vec<&UserId> = self
            .bookings
            .iter()
            .filter(|b| b.status == BookingStatus::Waitlisted)
            .map(|b| &b.user_id)
            .collect();
        if !joined.iter().copied().eq(self.waitlist.iter()) {
            return Err(DomainError::invariant("waitlist is not in join order"));
        }

        Ok(())
    }
}

impl AggregateRoot for ClassSession {
    type Id = SessionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Command: ScheduleSession.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSession {
    pub session_id: SessionId,
    pub details: SessionDetails,
    pub schedule: Schedule,
    pub capacity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: BookSeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSeat {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub booking_id: BookingId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: JoinWaitlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinWaitlist {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub booking_id: BookingId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelBooking (confirmed seat).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelBooking {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: LeaveWaitlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveWaitlist {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateDetails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDetails {
    pub session_id: SessionId,
    pub details: SessionDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeCapacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeCapacity {
    pub session_id: SessionId,
    pub capacity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelSession.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelSession {
    pub session_id: SessionId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CompleteSession.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteSession {
    pub session_id: SessionId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionCommand {
    ScheduleSession(ScheduleSession),
    BookSeat(BookSeat),
    JoinWaitlist(JoinWaitlist),
    CancelBooking(CancelBooking),
    LeaveWaitlist(LeaveWaitlist),
    UpdateDetails(UpdateDetails),
    ChangeCapacity(ChangeCapacity),
    CancelSession(CancelSession),
    CompleteSession(CompleteSession),
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// Event: SessionScheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionScheduled {
    pub session_id: SessionId,
    pub details: SessionDetails,
    pub schedule: Schedule,
    pub capacity: u32,
    /// `Completed` when the session was entered after its start instant.
    pub status: SessionStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SeatBooked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatBooked {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub booking_id: BookingId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: WaitlistJoined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistJoined {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub booking_id: BookingId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BookingCancelled (a confirmed seat was given up).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingCancelled {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub booking_id: BookingId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: WaitlistPromoted (waitlist head took the freed seat).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistPromoted {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub booking_id: BookingId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: WaitlistLeft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistLeft {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub booking_id: BookingId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DetailsUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsUpdated {
    pub session_id: SessionId,
    pub details: SessionDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SessionCapacityChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCapacityChanged {
    pub session_id: SessionId,
    pub previous: u32,
    pub capacity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SessionCancelled. Every active booking is cancelled with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCancelled {
    pub session_id: SessionId,
    pub reason: Option<String>,
    pub cancelled_bookings: Vec<BookingId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SessionCompleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCompleted {
    pub session_id: SessionId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    SessionScheduled(SessionScheduled),
    SeatBooked(SeatBooked),
    WaitlistJoined(WaitlistJoined),
    BookingCancelled(BookingCancelled),
    WaitlistPromoted(WaitlistPromoted),
    WaitlistLeft(WaitlistLeft),
    DetailsUpdated(DetailsUpdated),
    SessionCapacityChanged(SessionCapacityChanged),
    SessionCancelled(SessionCancelled),
    SessionCompleted(SessionCompleted),
}

impl Event for SessionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::SessionScheduled(_) => "scheduling.session.scheduled",
            SessionEvent::SeatBooked(_) => "scheduling.seat.booked",
            SessionEvent::WaitlistJoined(_) => "scheduling.waitlist.joined",
            SessionEvent::BookingCancelled(_) => "scheduling.booking.cancelled",
            SessionEvent::WaitlistPromoted(_) => "scheduling.waitlist.promoted",
            SessionEvent::WaitlistLeft(_) => "scheduling.waitlist.left",
            SessionEvent::DetailsUpdated(_) => "scheduling.session.details_updated",
            SessionEvent::SessionCapacityChanged(_) => "scheduling.session.capacity_changed",
            SessionEvent::SessionCancelled(_) => "scheduling.session.cancelled",
            SessionEvent::SessionCompleted(_) => "scheduling.session.completed",
        }
    }

    fn stream_id(&self) -> String {
        let id = match self {
            SessionEvent::SessionScheduled(e) => &e.session_id,
            SessionEvent::SeatBooked(e) => &e.session_id,
            SessionEvent::WaitlistJoined(e) => &e.session_id,
            SessionEvent::BookingCancelled(e) => &e.session_id,
            SessionEvent::WaitlistPromoted(e) => &e.session_id,
            SessionEvent::WaitlistLeft(e) => &e.session_id,
            SessionEvent::DetailsUpdated(e) => &e.session_id,
            SessionEvent::SessionCapacityChanged(e) => &e.session_id,
            SessionEvent::SessionCancelled(e) => &e.session_id,
            SessionEvent::SessionCompleted(e) => &e.session_id,
        };
        id.to_string()
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SessionEvent::SessionScheduled(e) => e.occurred_at,
            SessionEvent::SeatBooked(e) => e.occurred_at,
            SessionEvent::WaitlistJoined(e) => e.occurred_at,
            SessionEvent::BookingCancelled(e) => e.occurred_at,
            SessionEvent::WaitlistPromoted(e) => e.occurred_at,
            SessionEvent::WaitlistLeft(e) => e.occurred_at,
            SessionEvent::DetailsUpdated(e) => e.occurred_at,
            SessionEvent::SessionCapacityChanged(e) => e.occurred_at,
            SessionEvent::SessionCancelled(e) => e.occurred_at,
            SessionEvent::SessionCompleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for ClassSession {
    type Command = SessionCommand;
    type Event = SessionEvent;
    type Error = SessionError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SessionEvent::SessionScheduled(e) => {
                self.id = e.session_id.clone();
                self.details = e.details.clone();
                self.schedule = e.schedule;
                self.capacity = e.capacity;
                self.status = e.status;
                self.attendees.clear();
                self.waitlist.clear();
                self.bookings.clear();
                self.created = true;
            }
            SessionEvent::SeatBooked(e) => {
                self.attendees.push(e.user_id.clone());
                self.bookings.push(Booking::new(
                    e.booking_id.clone(),
                    e.session_id.clone(),
                    e.user_id.clone(),
                    BookingStatus::Confirmed,
                    e.occurred_at,
                ));
            }
            SessionEvent::WaitlistJoined(e) => {
                self.waitlist.push(e.user_id.clone());
                self.bookings.push(Booking::new(
                    e.booking_id.clone(),
                    e.session_id.clone(),
                    e.user_id.clone(),
                    BookingStatus::Waitlisted,
                    e.occurred_at,
                ));
            }
            SessionEvent::BookingCancelled(e) => {
                self.attendees.retain(|u| *u != e.user_id);
                self.transition_booking(&e.booking_id, BookingStatus::Cancelled, e.occurred_at);
            }
            SessionEvent::WaitlistPromoted(e) => {
                self.waitlist.retain(|u| *u != e.user_id);
                self.attendees.push(e.user_id.clone());
                self.transition_booking(&e.booking_id, BookingStatus::Confirmed, e.occurred_at);
            }
            SessionEvent::WaitlistLeft(e) => {
                self.waitlist.retain(|u| *u != e.user_id);
                self.transition_booking(&e.booking_id, BookingStatus::Cancelled, e.occurred_at);
            }
            SessionEvent::DetailsUpdated(e) => {
                self.details = e.details.clone();
            }
            SessionEvent::SessionCapacityChanged(e) => {
                self.capacity = e.capacity;
            }
            SessionEvent::SessionCancelled(e) => {
                for id in &e.cancelled_bookings {
                    self.transition_booking(id, BookingStatus::Cancelled, e.occurred_at);
                }
                self.attendees.clear();
                self.waitlist.clear();
                self.status = SessionStatus::Cancelled;
            }
            SessionEvent::SessionCompleted(_) => {
                self.status = SessionStatus::Completed;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SessionCommand::ScheduleSession(cmd) => self.handle_schedule(cmd),
            SessionCommand::BookSeat(cmd) => self.handle_book(cmd),
            SessionCommand::JoinWaitlist(cmd) => self.handle_join_waitlist(cmd),
            SessionCommand::CancelBooking(cmd) => self.handle_cancel_booking(cmd),
            SessionCommand::LeaveWaitlist(cmd) => self.handle_leave_waitlist(cmd),
            SessionCommand::UpdateDetails(cmd) => self.handle_update_details(cmd),
            SessionCommand::ChangeCapacity(cmd) => self.handle_change_capacity(cmd),
            SessionCommand::CancelSession(cmd) => self.handle_cancel_session(cmd),
            SessionCommand::CompleteSession(cmd) => self.handle_complete(cmd),
        }
    }
}

impl ClassSession {
    fn transition_booking(&mut self, id: &BookingId, status: BookingStatus, at: DateTime<Utc>) {
        if let Some(booking) = self.bookings.iter_mut().find(|b| b.id == *id) {
            booking.transition(status, at);
        }
    }

    fn ensure_scheduled(&self, session_id: &SessionId) -> Result<(), SessionError> {
        if !self.created {
            return Err(SessionError::NotScheduled(session_id.clone()));
        }
        if self.id != *session_id {
            return Err(DomainError::invariant("session_id mismatch").into());
        }
        Ok(())
    }

    fn ensure_upcoming(&self) -> Result<(), SessionError> {
        if self.status != SessionStatus::Upcoming {
            return Err(SessionError::SessionClosed(self.id.clone()));
        }
        Ok(())
    }

    fn ensure_open(&self, at: DateTime<Utc>) -> Result<(), SessionError> {
        if !self.is_open_at(at) {
            return Err(SessionError::SessionClosed(self.id.clone()));
        }
        Ok(())
    }

    fn ensure_new_booking_id(&self, booking_id: &BookingId) -> Result<(), SessionError> {
        if self.bookings.iter().any(|b| b.id == *booking_id) {
            return Err(DomainError::duplicate("booking", booking_id).into());
        }
        Ok(())
    }

    fn booking_of(&self, user_id: &UserId, status: BookingStatus) -> Result<&Booking, SessionError> {
        self.active_booking(user_id)
            .filter(|b| b.status == status)
            .ok_or_else(|| {
                DomainError::invariant(format!("user {user_id} has no {status} booking")).into()
            })
    }

    fn handle_schedule(&self, cmd: &ScheduleSession) -> Result<Vec<SessionEvent>, SessionError> {
        if self.created {
            return Err(SessionError::AlreadyScheduled(self.id.clone()));
        }

        cmd.details.validate()?;
        if cmd.capacity == 0 {
            return Err(DomainError::validation("capacity must be positive").into());
        }
        if cmd.schedule.duration_minutes == 0 {
            return Err(DomainError::validation("duration must be positive").into());
        }

        let status = if cmd.schedule.start > cmd.occurred_at {
            SessionStatus::Upcoming
        } else {
            SessionStatus::Completed
        };

        Ok(vec![SessionEvent::SessionScheduled(SessionScheduled {
            session_id: cmd.session_id.clone(),
            details: cmd.details.clone(),
            schedule: cmd.schedule,
            capacity: cmd.capacity,
            status,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_book(&self, cmd: &BookSeat) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_scheduled(&cmd.session_id)?;
        self.ensure_open(cmd.occurred_at)?;

        if self.standing(&cmd.user_id) != Standing::None {
            return Err(SessionError::AlreadyEnrolled(cmd.user_id.clone()));
        }
        if self.is_full() {
            return Err(SessionError::CapacityExceeded {
                session_id: self.id.clone(),
                capacity: self.capacity,
            });
        }
        self.ensure_new_booking_id(&cmd.booking_id)?;

        Ok(vec![SessionEvent::SeatBooked(SeatBooked {
            session_id: cmd.session_id.clone(),
            user_id: cmd.user_id.clone(),
            booking_id: cmd.booking_id.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_join_waitlist(&self, cmd: &JoinWaitlist) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_scheduled(&cmd.session_id)?;
        self.ensure_open(cmd.occurred_at)?;

        if self.standing(&cmd.user_id) != Standing::None {
            return Err(SessionError::AlreadyEnrolled(cmd.user_id.clone()));
        }
        self.ensure_new_booking_id(&cmd.booking_id)?;

        Ok(vec![SessionEvent::WaitlistJoined(WaitlistJoined {
            session_id: cmd.session_id.clone(),
            user_id: cmd.user_id.clone(),
            booking_id: cmd.booking_id.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel_booking(&self, cmd: &CancelBooking) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_scheduled(&cmd.session_id)?;
        self.ensure_open(cmd.occurred_at)?;

        if !self.is_booked(&cmd.user_id) {
            return Err(SessionError::NotEnrolled(cmd.user_id.clone()));
        }
        let cancelled = self.booking_of(&cmd.user_id, BookingStatus::Confirmed)?;

        let mut events = vec![SessionEvent::BookingCancelled(BookingCancelled {
            session_id: cmd.session_id.clone(),
            user_id: cmd.user_id.clone(),
            booking_id: cancelled.id.clone(),
            occurred_at: cmd.occurred_at,
        })];

        // One seat freed, so at most one promotion: the waitlist head.
        if let Some(next) = self.waitlist.first() {
            let promoted = self.booking_of(next, BookingStatus::Waitlisted)?;
            events.push(SessionEvent::WaitlistPromoted(WaitlistPromoted {
                session_id: cmd.session_id.clone(),
                user_id: next.clone(),
                booking_id: promoted.id.clone(),
                occurred_at: cmd.occurred_at,
            }));
        }

        Ok(events)
    }

    fn handle_leave_waitlist(&self, cmd: &LeaveWaitlist) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_scheduled(&cmd.session_id)?;
        self.ensure_open(cmd.occurred_at)?;

        if !self.is_waitlisted(&cmd.user_id) {
            return Err(SessionError::NotWaitlisted(cmd.user_id.clone()));
        }
        let booking = self.booking_of(&cmd.user_id, BookingStatus::Waitlisted)?;

        Ok(vec![SessionEvent::WaitlistLeft(WaitlistLeft {
            session_id: cmd.session_id.clone(),
            user_id: cmd.user_id.clone(),
            booking_id: booking.id.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_details(&self, cmd: &UpdateDetails) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_scheduled(&cmd.session_id)?;
        cmd.details.validate()?;

        if cmd.details == self.details {
            return Ok(vec![]);
        }

        Ok(vec![SessionEvent::DetailsUpdated(DetailsUpdated {
            session_id: cmd.session_id.clone(),
            details: cmd.details.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_capacity(&self, cmd: &ChangeCapacity) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_scheduled(&cmd.session_id)?;
        self.ensure_upcoming()?;

        if cmd.capacity == 0 {
            return Err(DomainError::validation("capacity must be positive").into());
        }
        if (cmd.capacity as usize) < self.attendees.len() {
            return Err(SessionError::CapacityBelowAttendance {
                requested: cmd.capacity,
                attendees: self.attendees.len(),
            });
        }
        if cmd.capacity == self.capacity {
            return Ok(vec![]);
        }

        Ok(vec![SessionEvent::SessionCapacityChanged(SessionCapacityChanged {
            session_id: cmd.session_id.clone(),
            previous: self.capacity,
            capacity: cmd.capacity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel_session(&self, cmd: &CancelSession) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_scheduled(&cmd.session_id)?;
        self.ensure_upcoming()?;

        let cancelled_bookings = self
            .bookings
            .iter()
            .filter(|b| b.is_active())
            .map(|b| b.id.clone())
            .collect();

        Ok(vec![SessionEvent::SessionCancelled(SessionCancelled {
            session_id: cmd.session_id.clone(),
            reason: cmd.reason.clone(),
            cancelled_bookings,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_complete(&self, cmd: &CompleteSession) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_scheduled(&cmd.session_id)?;
        self.ensure_upcoming()?;

        if cmd.occurred_at < self.schedule.end() {
            return Err(DomainError::validation("session has not ended yet").into());
        }

        Ok(vec![SessionEvent::SessionCompleted(SessionCompleted {
            session_id: cmd.session_id.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
