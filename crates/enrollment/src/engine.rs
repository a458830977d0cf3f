//! Enrollment engine (application-level orchestration).
//!
//! Each operation follows the same pipeline, inside the session's critical
//! section:
//!
//! ```text
//! Command
//!   ↓
//! 1. Lock the session (SessionStore::with_session)
//!   ↓
//! 2. Check the stored session's invariants, then handle the command (pure
//!    decision logic, produces events or a rejection)
//!   ↓
//! 3. Apply events to a working copy and check invariants
//!   ↓
//! 4. Commit the working copy over the stored session
//!   ↓
//! 5. Publish events to the bus (still under the session lock, so observers
//!    see each session's events in order)
//! ```
//!
//! A rejection at step 2 or 3 leaves the stored session untouched.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use studio_core::{Aggregate, AggregateRoot, BookingId, SessionId, UserId};
use studio_events::{Event, EventBus, EventEnvelope};
use studio_identity::UserDirectory;
use studio_scheduling::{
    AGGREGATE_TYPE, BookSeat, Booking, CancelBooking, CancelSession, ChangeCapacity, ClassSession,
    CompleteSession, JoinWaitlist, LeaveWaitlist, Schedule, ScheduleSession, SessionCommand,
    SessionDetails, SessionEvent, SessionStatus, UpdateDetails,
};

use crate::config::EnrollmentConfig;
use crate::error::EnrollmentError;
use crate::store::SessionStore;

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Administrative request to put a new class on the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewSession {
    pub session_id: SessionId,
    pub details: SessionDetails,
    pub schedule: Schedule,
    pub capacity: u32,
}

/// Attendees and waitlist of a session, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Roster {
    pub attendees: Vec<UserId>,
    pub waitlist: Vec<UserId>,
}

/// Maintains attendee/waitlist invariants across book, cancel, join-waitlist
/// and leave-waitlist.
///
/// ## Generic Parameters
///
/// - `S`: session store (serializes access per session)
/// - `D`: user directory (identity checks)
/// - `B`: event bus receiving `EventEnvelope<JsonValue>` after each change
///
/// The engine holds no global state; hosts own the stores and pass them in.
pub struct EnrollmentEngine<S, D, B> {
    sessions: S,
    users: D,
    bus: B,
    config: EnrollmentConfig,
    clock: Clock,
}

impl<S, D, B> core::fmt::Debug for EnrollmentEngine<S, D, B>
where
    S: core::fmt::Debug,
    D: core::fmt::Debug,
    B: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EnrollmentEngine")
            .field("sessions", &self.sessions)
            .field("users", &self.users)
            .field("bus", &self.bus)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S, D, B> EnrollmentEngine<S, D, B> {
    pub fn new(sessions: S, users: D, bus: B, config: EnrollmentConfig) -> Self {
        Self {
            sessions,
            users,
            bus,
            config,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the wall clock used to stamp operations.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &EnrollmentConfig {
        &self.config
    }

    pub fn users(&self) -> &D {
        &self.users
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

impl<S, D, B> EnrollmentEngine<S, D, B>
where
    S: SessionStore,
    D: UserDirectory,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    // ─────────────────────────────────────────────────────────────────────────
    // Enrollment operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Take a seat. Fails with `CapacityExceeded` when the session is full;
    /// the engine never waitlists on the caller's behalf.
    pub fn book(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
    ) -> Result<ClassSession, EnrollmentError> {
        self.ensure_may_enroll(user_id)?;
        let command = SessionCommand::BookSeat(BookSeat {
            session_id: session_id.clone(),
            user_id: user_id.clone(),
            booking_id: BookingId::generate(),
            occurred_at: self.now(),
        });
        self.execute(session_id, command, "book")
    }

    /// Append the user to the end of the waitlist.
    pub fn join_waitlist(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
    ) -> Result<ClassSession, EnrollmentError> {
        self.ensure_may_enroll(user_id)?;
        let command = SessionCommand::JoinWaitlist(JoinWaitlist {
            session_id: session_id.clone(),
            user_id: user_id.clone(),
            booking_id: BookingId::generate(),
            occurred_at: self.now(),
        });
        self.execute(session_id, command, "join_waitlist")
    }

    /// Give up a confirmed seat; the waitlist head (if any) takes it.
    pub fn cancel(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
    ) -> Result<ClassSession, EnrollmentError> {
        let command = SessionCommand::CancelBooking(CancelBooking {
            session_id: session_id.clone(),
            user_id: user_id.clone(),
            occurred_at: self.now(),
        });
        self.execute(session_id, command, "cancel")
    }

    /// Leave the waitlist. Never promotes anyone.
    pub fn leave_waitlist(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
    ) -> Result<ClassSession, EnrollmentError> {
        let command = SessionCommand::LeaveWaitlist(LeaveWaitlist {
            session_id: session_id.clone(),
            user_id: user_id.clone(),
            occurred_at: self.now(),
        });
        self.execute(session_id, command, "leave_waitlist")
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Administrative operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Put a new session on the schedule with an empty roster.
    pub fn schedule_session(&self, request: NewSession) -> Result<ClassSession, EnrollmentError> {
        let session_id = request.session_id.clone();
        let command = SessionCommand::ScheduleSession(ScheduleSession {
            session_id: request.session_id,
            details: request.details,
            schedule: request.schedule,
            capacity: request.capacity,
            occurred_at: self.now(),
        });

        let mut session = ClassSession::empty(session_id.clone());
        let events = session.handle(&command)?;
        session.apply_all(&events);
        session.check_invariants()?;

        self.sessions
            .insert_with(session.clone(), |stored| self.publish(stored.id_typed(), 0, &events))?;
        tracing::info!(
            session_id = %session_id,
            capacity = session.capacity(),
            status = %session.status(),
            start = %session.start(),
            "session scheduled"
        );

        Ok(session)
    }

    pub fn update_details(
        &self,
        session_id: &SessionId,
        details: SessionDetails,
    ) -> Result<ClassSession, EnrollmentError> {
        let command = SessionCommand::UpdateDetails(UpdateDetails {
            session_id: session_id.clone(),
            details,
            occurred_at: self.now(),
        });
        self.execute(session_id, command, "update_details")
    }

    /// Change capacity. Reducing it below the current attendee count is
    /// rejected; raising it does not promote waitlisted users.
    pub fn change_capacity(
        &self,
        session_id: &SessionId,
        capacity: u32,
    ) -> Result<ClassSession, EnrollmentError> {
        let command = SessionCommand::ChangeCapacity(ChangeCapacity {
            session_id: session_id.clone(),
            capacity,
            occurred_at: self.now(),
        });
        self.execute(session_id, command, "change_capacity")
    }

    /// Cancel the whole session, cancelling every confirmed and waitlisted booking.
    pub fn cancel_session(
        &self,
        session_id: &SessionId,
        reason: Option<String>,
    ) -> Result<ClassSession, EnrollmentError> {
        let command = SessionCommand::CancelSession(CancelSession {
            session_id: session_id.clone(),
            reason,
            occurred_at: self.now(),
        });
        self.execute(session_id, command, "cancel_session")
    }

    /// Mark every upcoming session whose end instant is at or before `now` as
    /// completed. Returns the ids that transitioned.
    pub fn complete_elapsed(&self, now: DateTime<Utc>) -> Result<Vec<SessionId>, EnrollmentError> {
        let mut completed = Vec::new();

        for session_id in self.sessions.ids()? {
            let outcome = self.sessions.with_session(&session_id, |session| {
                if !session.is_elapsed_at(now) {
                    return Ok(false);
                }
                let command = SessionCommand::CompleteSession(CompleteSession {
                    session_id: session_id.clone(),
                    occurred_at: now,
                });
                self.commit(session, &command).map(|_| true)
            });

            match outcome {
                Ok(Ok(true)) => completed.push(session_id),
                Ok(Ok(false)) => {}
                Ok(Err(err)) => return Err(err),
                // Removed concurrently; nothing left to complete.
                Err(crate::store::StoreError::NotFound(_)) => {}
                Err(err) => return Err(err.into()),
            }
        }

        if !completed.is_empty() {
            tracing::info!(count = completed.len(), "elapsed sessions completed");
        }
        Ok(completed)
    }

    /// Delete a session record from the store.
    pub fn remove_session(&self, session_id: &SessionId) -> Result<ClassSession, EnrollmentError> {
        let removed = self.sessions.remove(session_id)?;
        tracing::info!(session_id = %session_id, "session removed");
        Ok(removed)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries (no mutation)
    // ─────────────────────────────────────────────────────────────────────────

    pub fn session(&self, session_id: &SessionId) -> Result<ClassSession, EnrollmentError> {
        Ok(self.sessions.get(session_id)?)
    }

    pub fn is_full(&self, session_id: &SessionId) -> Result<bool, EnrollmentError> {
        Ok(self.session(session_id)?.is_full())
    }

    pub fn open_seats(&self, session_id: &SessionId) -> Result<usize, EnrollmentError> {
        Ok(self.session(session_id)?.open_seats())
    }

    pub fn is_booked(&self, session_id: &SessionId, user_id: &UserId) -> Result<bool, EnrollmentError> {
        Ok(self.session(session_id)?.is_booked(user_id))
    }

    pub fn is_waitlisted(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
    ) -> Result<bool, EnrollmentError> {
        Ok(self.session(session_id)?.is_waitlisted(user_id))
    }

    /// 0-based waitlist position, `None` when the user is not waiting.
    pub fn waitlist_position(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
    ) -> Result<Option<usize>, EnrollmentError> {
        Ok(self.session(session_id)?.waitlist_position(user_id))
    }

    pub fn roster(&self, session_id: &SessionId) -> Result<Roster, EnrollmentError> {
        let session = self.session(session_id)?;
        Ok(Roster {
            attendees: session.attendees().to_vec(),
            waitlist: session.waitlist().to_vec(),
        })
    }

    /// Ids of every stored session, sorted.
    pub fn session_ids(&self) -> Result<Vec<SessionId>, EnrollmentError> {
        Ok(self.sessions.ids()?)
    }

    /// Upcoming sessions, earliest start first.
    pub fn upcoming_sessions(&self) -> Result<Vec<ClassSession>, EnrollmentError> {
        let mut upcoming: Vec<ClassSession> = self
            .sessions
            .snapshots()?
            .into_iter()
            .filter(|s| s.status() == SessionStatus::Upcoming)
            .collect();
        upcoming.sort_by(|a, b| a.start().cmp(&b.start()).then_with(|| a.id().cmp(b.id())));
        Ok(upcoming)
    }

    /// Every booking the user ever made, across sessions, oldest first.
    pub fn bookings_for_user(&self, user_id: &UserId) -> Result<Vec<Booking>, EnrollmentError> {
        let mut bookings: Vec<Booking> = self
            .sessions
            .snapshots()?
            .iter()
            .flat_map(|s| s.bookings_for(user_id).cloned())
            .collect();
        bookings.sort_by_key(|b| b.booked_at);
        Ok(bookings)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Pipeline
    // ─────────────────────────────────────────────────────────────────────────

    fn ensure_may_enroll(&self, user_id: &UserId) -> Result<(), EnrollmentError> {
        let user = self
            .users
            .get(user_id)
            .ok_or_else(|| EnrollmentError::UnknownUser(user_id.clone()))?;

        if self.config.require_active_membership && !user.membership.is_active() {
            return Err(EnrollmentError::MembershipInactive(user_id.clone()));
        }
        Ok(())
    }

    fn execute(
        &self,
        session_id: &SessionId,
        command: SessionCommand,
        operation: &'static str,
    ) -> Result<ClassSession, EnrollmentError> {
        tracing::debug!(session_id = %session_id, operation, "executing");

        let result = self
            .sessions
            .with_session(session_id, |session| -> Result<_, EnrollmentError> {
                let events = self.commit(session, &command)?;
                Ok((session.clone(), events))
            })
            .map_err(EnrollmentError::from)
            .and_then(|inner| inner);

        match result {
            Ok((session, events)) => {
                log_outcome(operation, &session, &events);
                Ok(session)
            }
            Err(err) => {
                tracing::debug!(session_id = %session_id, operation, error = %err, "rejected");
                Err(err)
            }
        }
    }

    /// Decide, apply to a working copy, verify, then commit and publish.
    ///
    /// Must be called with exclusive access to `session`.
    fn commit(
        &self,
        session: &mut ClassSession,
        command: &SessionCommand,
    ) -> Result<Vec<SessionEvent>, EnrollmentError> {
        // Never build on stored state that was edited outside this pipeline.
        session.check_invariants()?;

        let events = session.handle(command)?;
        if events.is_empty() {
            return Ok(events);
        }

        let next = session.applied(&events);
        next.check_invariants()?;

        let version_before = session.version();
        *session = next;
        self.publish(session.id_typed(), version_before, &events);
        Ok(events)
    }

    /// Sequence numbers continue from `version_before`, so the envelope of the
    /// n-th event carries the session version right after it was applied.
    fn publish(&self, session_id: &SessionId, version_before: u64, events: &[SessionEvent]) {
        let envelopes: Vec<EventEnvelope<JsonValue>> = events
            .iter()
            .zip(version_before + 1..)
            .filter_map(|(ev, sequence)| {
                EventEnvelope::encode(AGGREGATE_TYPE, sequence, ev)
                    .map_err(|err| {
                        tracing::warn!(event_type = ev.event_type(), error = %err, "failed to encode event");
                    })
                    .ok()
            })
            .collect();

        let total = envelopes.len();
        if let Err((sent, err)) = self.bus.publish_all(envelopes) {
            tracing::warn!(
                session_id = %session_id,
                sent,
                total,
                error = ?err,
                "failed to publish events"
            );
        }
    }
}

fn log_outcome(operation: &'static str, session: &ClassSession, events: &[SessionEvent]) {
    for ev in events {
        match ev {
            SessionEvent::WaitlistPromoted(e) => tracing::info!(
                session_id = %e.session_id,
                user_id = %e.user_id,
                booking_id = %e.booking_id,
                "waitlist head promoted"
            ),
            SessionEvent::SeatBooked(e) => {
                tracing::info!(session_id = %e.session_id, user_id = %e.user_id, "seat booked")
            }
            SessionEvent::WaitlistJoined(e) => {
                tracing::info!(session_id = %e.session_id, user_id = %e.user_id, "waitlist joined")
            }
            SessionEvent::BookingCancelled(e) => {
                tracing::info!(session_id = %e.session_id, user_id = %e.user_id, "booking cancelled")
            }
            SessionEvent::WaitlistLeft(e) => {
                tracing::info!(session_id = %e.session_id, user_id = %e.user_id, "waitlist left")
            }
            other => tracing::info!(
                session_id = %session.id_typed(),
                operation,
                event_type = other.event_type(),
                "session updated"
            ),
        }
    }

    tracing::debug!(
        session_id = %session.id_typed(),
        operation,
        attendees = session.attendees().len(),
        waitlist = session.waitlist().len(),
        version = session.version(),
        "applied"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use studio_events::InMemoryEventBus;
    use studio_identity::{InMemoryUserDirectory, Membership, Role, User};

    use crate::store::InMemorySessionStore;

    type TestEngine =
        EnrollmentEngine<InMemorySessionStore, InMemoryUserDirectory, Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>>;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn user(id: &str) -> UserId {
        UserId::new(id)
    }

    fn class() -> SessionId {
        SessionId::new("class-1")
    }

    fn engine_with(config: EnrollmentConfig) -> TestEngine {
        let users = InMemoryUserDirectory::with_users(["u1", "u2", "u3", "u4"].map(|id| {
            User::new(UserId::new(id), id, format!("{id}@example.com"), Role::Client).unwrap()
        }))
        .unwrap();
        EnrollmentEngine::new(
            InMemorySessionStore::new(),
            users,
            Arc::new(InMemoryEventBus::new()),
            config,
        )
    }

    fn engine_with_class(capacity: u32) -> TestEngine {
        let engine = engine_with(EnrollmentConfig::default());
        engine
            .schedule_session(NewSession {
                session_id: class(),
                details: SessionDetails::new("Sunrise Vinyasa Flow"),
                schedule: Schedule::new(test_time() + Duration::days(1), 60),
                capacity,
            })
            .unwrap();
        engine
    }

    #[test]
    fn book_returns_updated_snapshot_and_persists_it() {
        let engine = engine_with_class(2);
        let session = engine.book(&class(), &user("u1")).unwrap();

        assert_eq!(session.attendees(), &[user("u1")]);
        assert_eq!(engine.session(&class()).unwrap(), session);
        assert!(engine.is_booked(&class(), &user("u1")).unwrap());
        assert_eq!(engine.open_seats(&class()).unwrap(), 1);
    }

    #[test]
    fn unknown_users_cannot_enroll() {
        let engine = engine_with_class(2);
        assert_eq!(
            engine.book(&class(), &user("ghost")).unwrap_err(),
            EnrollmentError::UnknownUser(user("ghost"))
        );
        assert_eq!(
            engine.join_waitlist(&class(), &user("ghost")).unwrap_err(),
            EnrollmentError::UnknownUser(user("ghost"))
        );
    }

    #[test]
    fn inactive_members_are_rejected_only_when_configured() {
        let lenient = engine_with_class(2);
        lenient.users().toggle_membership(&user("u1")).unwrap();
        assert!(lenient.book(&class(), &user("u1")).is_ok());

        let strict = engine_with(EnrollmentConfig {
            require_active_membership: true,
        });
        strict
            .schedule_session(NewSession {
                session_id: class(),
                details: SessionDetails::new("Power Ashtanga"),
                schedule: Schedule::new(test_time() + Duration::days(2), 90),
                capacity: 2,
            })
            .unwrap();
        assert_eq!(
            strict.users().toggle_membership(&user("u1")).unwrap(),
            Membership::Inactive
        );
        assert_eq!(
            strict.book(&class(), &user("u1")).unwrap_err(),
            EnrollmentError::MembershipInactive(user("u1"))
        );
    }

    #[test]
    fn missing_session_is_reported() {
        let engine = engine_with(EnrollmentConfig::default());
        let missing = SessionId::new("class-404");
        assert_eq!(
            engine.book(&missing, &user("u1")).unwrap_err(),
            EnrollmentError::SessionNotFound(missing.clone())
        );
        assert_eq!(
            engine.is_full(&missing).unwrap_err(),
            EnrollmentError::SessionNotFound(missing)
        );
    }

    #[test]
    fn scheduling_twice_is_rejected() {
        let engine = engine_with_class(2);
        let err = engine
            .schedule_session(NewSession {
                session_id: class(),
                details: SessionDetails::new("Duplicate"),
                schedule: Schedule::new(test_time() + Duration::days(1), 60),
                capacity: 2,
            })
            .unwrap_err();
        assert_eq!(err, EnrollmentError::SessionExists(class()));
    }

    #[test]
    fn cancel_publishes_cancellation_then_promotion_in_sequence() {
        let engine = engine_with_class(1);
        let events = engine.bus().subscribe();

        engine.book(&class(), &user("u1")).unwrap();
        engine.join_waitlist(&class(), &user("u2")).unwrap();
        engine.cancel(&class(), &user("u1")).unwrap();

        let published = events.drain();
        let types: Vec<&str> = published.iter().map(|e| e.event_type()).collect();
        assert_eq!(
            types,
            vec![
                "scheduling.seat.booked",
                "scheduling.waitlist.joined",
                "scheduling.booking.cancelled",
                "scheduling.waitlist.promoted",
            ]
        );

        // Version 1 was the scheduling event, published before subscribing.
        let sequences: Vec<u64> = published.iter().map(|e| e.sequence_number()).collect();
        assert_eq!(sequences, vec![2, 3, 4, 5]);
        assert!(published.iter().all(|e| e.aggregate_id() == "class-1"));
        assert!(published.iter().all(|e| e.aggregate_type() == AGGREGATE_TYPE));
    }

    #[test]
    fn rejected_operations_publish_nothing() {
        let engine = engine_with_class(1);
        engine.book(&class(), &user("u1")).unwrap();
        let events = engine.bus().subscribe();

        assert!(engine.book(&class(), &user("u2")).is_err());
        assert!(engine.cancel(&class(), &user("u3")).is_err());
        assert!(engine.leave_waitlist(&class(), &user("u3")).is_err());

        assert!(events.drain().is_empty());
    }

    #[test]
    fn operations_close_once_the_class_starts() {
        let start = test_time() + Duration::hours(1);
        let scheduled_at = start - Duration::hours(2);
        let engine = engine_with(EnrollmentConfig::default()).with_clock(move || scheduled_at);
        engine
            .schedule_session(NewSession {
                session_id: class(),
                details: SessionDetails::new("Mindful Meditation"),
                schedule: Schedule::new(start, 45),
                capacity: 25,
            })
            .unwrap();
        engine.book(&class(), &user("u1")).unwrap();

        let engine = engine.with_clock(move || start);
        assert_eq!(
            engine.book(&class(), &user("u2")).unwrap_err(),
            EnrollmentError::SessionClosed(class())
        );
        assert_eq!(
            engine.cancel(&class(), &user("u1")).unwrap_err(),
            EnrollmentError::SessionClosed(class())
        );
    }

    #[test]
    fn complete_elapsed_only_touches_finished_upcoming_sessions() {
        let engine = engine_with_class(2);
        engine.book(&class(), &user("u1")).unwrap();
        let other = SessionId::new("class-2");
        engine
            .schedule_session(NewSession {
                session_id: other.clone(),
                details: SessionDetails::new("Evening Restorative Yoga"),
                schedule: Schedule::new(test_time() + Duration::days(3), 75),
                capacity: 15,
            })
            .unwrap();

        let end_of_first = engine.session(&class()).unwrap().end();
        assert_eq!(engine.complete_elapsed(end_of_first).unwrap(), vec![class()]);
        assert!(engine.complete_elapsed(end_of_first).unwrap().is_empty());

        let first = engine.session(&class()).unwrap();
        assert_eq!(first.status(), SessionStatus::Completed);
        assert_eq!(first.attendees(), &[user("u1")]);
        assert_eq!(engine.session(&other).unwrap().status(), SessionStatus::Upcoming);

        let upcoming: Vec<SessionId> = engine
            .upcoming_sessions()
            .unwrap()
            .iter()
            .map(|s| s.id_typed().clone())
            .collect();
        assert_eq!(upcoming, vec![other]);
    }

    #[test]
    fn cancel_session_cancels_all_bookings_and_closes_it() {
        let engine = engine_with_class(1);
        engine.book(&class(), &user("u1")).unwrap();
        engine.join_waitlist(&class(), &user("u2")).unwrap();

        let session = engine
            .cancel_session(&class(), Some("studio closed".to_string()))
            .unwrap();
        assert_eq!(session.status(), SessionStatus::Cancelled);
        assert_eq!(
            engine.roster(&class()).unwrap(),
            Roster {
                attendees: vec![],
                waitlist: vec![]
            }
        );

        let u2_bookings = engine.bookings_for_user(&user("u2")).unwrap();
        assert_eq!(u2_bookings.len(), 1);
        assert_eq!(u2_bookings[0].status, studio_scheduling::BookingStatus::Cancelled);

        assert_eq!(
            engine.join_waitlist(&class(), &user("u3")).unwrap_err(),
            EnrollmentError::SessionClosed(class())
        );
    }

    #[test]
    fn capacity_changes_respect_current_attendance() {
        let engine = engine_with_class(3);
        engine.book(&class(), &user("u1")).unwrap();
        engine.book(&class(), &user("u2")).unwrap();

        assert_eq!(
            engine.change_capacity(&class(), 1).unwrap_err(),
            EnrollmentError::CapacityBelowAttendance {
                requested: 1,
                attendees: 2
            }
        );
        assert_eq!(engine.session(&class()).unwrap().capacity(), 3);

        engine.change_capacity(&class(), 2).unwrap();
        assert!(engine.is_full(&class()).unwrap());
    }

    #[test]
    fn update_details_and_remove_session() {
        let engine = engine_with_class(2);
        let mut details = SessionDetails::new("Sunrise Vinyasa Flow");
        details.price = 2500;
        engine.update_details(&class(), details.clone()).unwrap();
        assert_eq!(engine.session(&class()).unwrap().details(), &details);

        let removed = engine.remove_session(&class()).unwrap();
        assert_eq!(removed.details(), &details);
        assert_eq!(
            engine.session(&class()).unwrap_err(),
            EnrollmentError::SessionNotFound(class())
        );
    }

    #[test]
    fn bookings_for_user_spans_sessions() {
        let engine = engine_with_class(2);
        let second = SessionId::new("class-2");
        engine
            .schedule_session(NewSession {
                session_id: second.clone(),
                details: SessionDetails::new("Power Ashtanga"),
                schedule: Schedule::new(test_time() + Duration::days(2), 90),
                capacity: 1,
            })
            .unwrap();

        engine.book(&class(), &user("u1")).unwrap();
        engine.book(&second, &user("u2")).unwrap();
        engine.join_waitlist(&second, &user("u1")).unwrap();

        let sessions: Vec<SessionId> = engine
            .bookings_for_user(&user("u1"))
            .unwrap()
            .into_iter()
            .map(|b| b.session_id)
            .collect();
        assert_eq!(sessions.len(), 2);
        assert!(sessions.contains(&class()));
        assert!(sessions.contains(&second));
        assert_eq!(engine.waitlist_position(&second, &user("u1")).unwrap(), Some(0));
        assert!(engine.is_waitlisted(&second, &user("u1")).unwrap());
    }

    #[test]
    fn scheduling_publishes_the_first_sequence_number() {
        let engine = engine_with(EnrollmentConfig::default());
        let events = engine.bus().subscribe();

        engine
            .schedule_session(NewSession {
                session_id: class(),
                details: SessionDetails::new("Sunrise Vinyasa Flow"),
                schedule: Schedule::new(test_time() + Duration::days(1), 60),
                capacity: 1,
            })
            .unwrap();
        engine.book(&class(), &user("u1")).unwrap();

        let published = events.drain();
        let sequences: Vec<(u64, &str)> = published
            .iter()
            .map(|e| (e.sequence_number(), e.event_type()))
            .collect();
        assert_eq!(
            sequences,
            vec![(1, "scheduling.session.scheduled"), (2, "scheduling.seat.booked")]
        );
    }

    #[test]
    fn sessions_edited_outside_the_engine_are_refused() {
        let engine = engine_with_class(1);
        engine
            .sessions
            .with_session(&class(), |session| {
                for id in ["u2", "u3"] {
                    session.apply(&SessionEvent::SeatBooked(studio_scheduling::SeatBooked {
                        session_id: class(),
                        user_id: user(id),
                        booking_id: BookingId::new(format!("booking-{id}")),
                        occurred_at: test_time(),
                    }));
                }
            })
            .unwrap();
        let events = engine.bus().subscribe();

        assert!(matches!(
            engine.book(&class(), &user("u1")).unwrap_err(),
            EnrollmentError::InvariantViolation(_)
        ));
        assert!(matches!(
            engine.cancel(&class(), &user("u2")).unwrap_err(),
            EnrollmentError::InvariantViolation(_)
        ));
        assert!(events.drain().is_empty());
        assert_eq!(engine.session(&class()).unwrap().attendees(), &[user("u2"), user("u3")]);
    }

    /// Bus that refuses every message.
    struct ClosedBus;

    impl EventBus<EventEnvelope<JsonValue>> for ClosedBus {
        type Error = &'static str;

        fn publish(&self, _message: EventEnvelope<JsonValue>) -> Result<(), Self::Error> {
            Err("bus closed")
        }

        fn subscribe(&self) -> studio_events::Subscription<EventEnvelope<JsonValue>> {
            studio_events::Subscription::new(std::sync::mpsc::channel().1)
        }
    }

    #[test]
    fn failed_publish_keeps_committed_changes() {
        let users = InMemoryUserDirectory::with_users(["u1", "u2"].map(|id| {
            User::new(UserId::new(id), id, format!("{id}@example.com"), Role::Client).unwrap()
        }))
        .unwrap();
        let engine = EnrollmentEngine::new(
            InMemorySessionStore::new(),
            users,
            ClosedBus,
            EnrollmentConfig::default(),
        );

        engine
            .schedule_session(NewSession {
                session_id: class(),
                details: SessionDetails::new("Sunrise Vinyasa Flow"),
                schedule: Schedule::new(test_time() + Duration::days(1), 60),
                capacity: 1,
            })
            .unwrap();
        engine.book(&class(), &user("u1")).unwrap();
        engine.join_waitlist(&class(), &user("u2")).unwrap();
        let session = engine.cancel(&class(), &user("u1")).unwrap();

        assert_eq!(session.version(), 5);
        assert_eq!(
            engine.roster(&class()).unwrap(),
            Roster {
                attendees: vec![user("u2")],
                waitlist: vec![],
            }
        );
        assert_eq!(engine.session(&class()).unwrap(), session);
    }
}
