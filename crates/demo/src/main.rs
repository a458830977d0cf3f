//! Walks a small studio through a booking day and logs every published event.

mod seed;

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::Value as JsonValue;

use studio_core::{SessionId, UserId};
use studio_enrollment::{
    EnrollmentConfig, EnrollmentEngine, EnrollmentError, InMemorySessionStore,
};
use studio_events::{EventBus, EventEnvelope, InMemoryEventBus};
use studio_identity::{InMemoryUserDirectory, UserDirectory};

type Engine = EnrollmentEngine<
    InMemorySessionStore,
    InMemoryUserDirectory,
    Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>,
>;

fn main() -> anyhow::Result<()> {
    studio_observability::init();

    let config = EnrollmentConfig::from_env()?;
    tracing::info!(
        require_active_membership = config.require_active_membership,
        "starting studio demo"
    );

    let now = Utc::now();
    let users = InMemoryUserDirectory::with_users(seed::users()?)?;
    let bus: Arc<InMemoryEventBus<EventEnvelope<JsonValue>>> = Arc::new(InMemoryEventBus::new());
    let events = bus.subscribe();

    // Rosters are replayed as of a week ago, before any seeded class started.
    let seeded_at = now - Duration::days(7);
    let engine = EnrollmentEngine::new(InMemorySessionStore::new(), users, bus, config)
        .with_clock(move || seeded_at);
    seed_classes(&engine, now)?;

    let engine = engine.with_clock(Utc::now);
    let completed = engine.complete_elapsed(Utc::now())?;
    tracing::info!(?completed, "elapsed classes completed");

    booking_day(&engine)?;

    for session in engine.upcoming_sessions()? {
        tracing::info!(
            session_id = %session.id_typed(),
            name = %session.details().name,
            start = %session.start(),
            attendees = session.attendees().len(),
            capacity = session.capacity(),
            waitlist = session.waitlist().len(),
            "upcoming"
        );
    }

    let ben = UserId::new("user-client-1");
    for booking in engine.bookings_for_user(&ben)? {
        tracing::info!(
            user_id = %ben,
            session_id = %booking.session_id,
            status = %booking.status,
            "booking history"
        );
    }

    let published = events.drain();
    for envelope in &published {
        tracing::debug!(
            aggregate_id = envelope.aggregate_id(),
            sequence = envelope.sequence_number(),
            event_type = envelope.event_type(),
            "event"
        );
    }
    tracing::info!(
        events = published.len(),
        sessions = engine.session_ids()?.len(),
        "demo finished"
    );

    Ok(())
}

fn seed_classes(engine: &Engine, now: chrono::DateTime<Utc>) -> anyhow::Result<()> {
    for class in seed::classes(now) {
        let session_id = class.session.session_id.clone();
        engine.schedule_session(class.session)?;

        for user in class.attendees {
            engine.book(&session_id, &UserId::new(*user))?;
        }
        for user in class.waitlist {
            engine.join_waitlist(&session_id, &UserId::new(*user))?;
        }
        if let Some(reason) = class.cancelled {
            engine.cancel_session(&session_id, Some(reason.to_string()))?;
        }
    }
    Ok(())
}

/// Sunrise Vinyasa fills up, a member cancels and the waitlist moves.
fn booking_day(engine: &Engine) -> anyhow::Result<()> {
    let sunrise = SessionId::new("class-1");
    let ben = UserId::new("user-client-1");
    let chloe = UserId::new("user-client-2");
    let eva = UserId::new("user-client-4");

    engine.book(&sunrise, &eva)?;
    tracing::info!(open_seats = engine.open_seats(&sunrise)?, "after Eva booked");

    match engine.book(&sunrise, &chloe) {
        Err(EnrollmentError::CapacityExceeded { .. }) => {
            tracing::info!(user_id = %chloe, "class full, joining waitlist");
            match engine.join_waitlist(&sunrise, &chloe) {
                Ok(_) => {}
                Err(EnrollmentError::MembershipInactive(user)) => {
                    tracing::info!(user_id = %user, "membership inactive, reactivating");
                    engine.users().toggle_membership(&user)?;
                    engine.join_waitlist(&sunrise, &user)?;
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(EnrollmentError::MembershipInactive(user)) => {
            tracing::info!(user_id = %user, "membership inactive, reactivating");
            engine.users().toggle_membership(&user)?;
            engine.join_waitlist(&sunrise, &user)?;
        }
        Ok(_) => anyhow::bail!("class-1 should have been full"),
        Err(err) => return Err(err.into()),
    }

    engine.cancel(&sunrise, &ben)?;

    let roster = engine.roster(&sunrise)?;
    tracing::info!(
        attendees = ?roster.attendees,
        waitlist = ?roster.waitlist,
        "after Ben cancelled"
    );

    // The class stays full: David moved up and Chloe is next in line.
    let capacity_change = engine.change_capacity(&sunrise, 1);
    if let Err(err) = capacity_change {
        tracing::info!(error = %err, "capacity reduction refused");
    }

    Ok(())
}
