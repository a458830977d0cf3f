//! Concurrency tests: many threads driving one engine.

use std::sync::{Arc, Barrier};
use std::thread;

use chrono::{Duration, Utc};
use serde_json::Value as JsonValue;

use studio_core::{SessionId, UserId};
use studio_enrollment::{
    EnrollmentConfig, EnrollmentEngine, EnrollmentError, InMemorySessionStore, NewSession,
};
use studio_events::{EventBus, EventEnvelope, InMemoryEventBus};
use studio_identity::{InMemoryUserDirectory, Role, User};
use studio_scheduling::{Schedule, SessionDetails};

type Engine = EnrollmentEngine<
    InMemorySessionStore,
    InMemoryUserDirectory,
    Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>,
>;

const THREADS: usize = 16;

fn engine_with_users(count: usize) -> Engine {
    let directory = InMemoryUserDirectory::with_users((0..count).map(|i| {
        User::new(
            UserId::new(format!("user-{i}")),
            format!("Member {i}"),
            format!("member{i}@studio.test"),
            Role::Client,
        )
        .unwrap()
    }))
    .unwrap();

    EnrollmentEngine::new(
        InMemorySessionStore::new(),
        directory,
        Arc::new(InMemoryEventBus::new()),
        EnrollmentConfig::default(),
    )
}

fn schedule(engine: &Engine, id: &str, capacity: u32) -> SessionId {
    let session_id = SessionId::new(id);
    engine
        .schedule_session(NewSession {
            session_id: session_id.clone(),
            details: SessionDetails::new("Power Ashtanga"),
            schedule: Schedule::new(Utc::now() + Duration::days(1), 90),
            capacity,
        })
        .unwrap();
    session_id
}

#[test]
fn concurrent_bookings_never_exceed_capacity() {
    let engine = Arc::new(engine_with_users(THREADS));
    let session_id = schedule(&engine, "class-2", 5);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let engine = Arc::clone(&engine);
            let session_id = session_id.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let user = UserId::new(format!("user-{i}"));
                barrier.wait();
                match engine.book(&session_id, &user) {
                    Ok(_) => true,
                    Err(EnrollmentError::CapacityExceeded { .. }) => {
                        engine.join_waitlist(&session_id, &user).unwrap();
                        false
                    }
                    Err(other) => panic!("unexpected error: {other}"),
                }
            })
        })
        .collect();

    let booked = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|booked| *booked)
        .count();

    let session = engine.session(&session_id).unwrap();
    assert_eq!(booked, 5);
    assert_eq!(session.attendees().len(), 5);
    assert_eq!(session.waitlist().len(), THREADS - 5);
    session.check_invariants().unwrap();
}

#[test]
fn concurrent_cancellations_promote_each_waiter_once() {
    let engine = Arc::new(engine_with_users(8));
    let session_id = schedule(&engine, "class-3", 4);

    for i in 0..4 {
        engine.book(&session_id, &UserId::new(format!("user-{i}"))).unwrap();
    }
    for i in 4..8 {
        engine
            .join_waitlist(&session_id, &UserId::new(format!("user-{i}")))
            .unwrap();
    }
    let subscription = engine.bus().subscribe();
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let engine = Arc::clone(&engine);
            let session_id = session_id.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                engine
                    .cancel(&session_id, &UserId::new(format!("user-{i}")))
                    .unwrap();
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let session = engine.session(&session_id).unwrap();
    let attendees: Vec<String> = session.attendees().iter().map(|u| u.to_string()).collect();
    assert_eq!(attendees, vec!["user-4", "user-5", "user-6", "user-7"]);
    assert!(session.waitlist().is_empty());

    // Events for one session are published under its lock, so sequence
    // numbers arrive strictly increasing.
    let sequences: Vec<u64> = subscription
        .drain()
        .iter()
        .map(|e| e.sequence_number())
        .collect();
    assert_eq!(sequences.len(), 8);
    assert!(sequences.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn different_sessions_progress_independently() {
    let engine = Arc::new(engine_with_users(THREADS));
    let sessions: Vec<SessionId> = (0..4)
        .map(|i| schedule(&engine, &format!("class-{}", 10 + i), 2))
        .collect();

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let engine = Arc::clone(&engine);
            let session_id = sessions[i % sessions.len()].clone();
            thread::spawn(move || {
                let user = UserId::new(format!("user-{i}"));
                if engine.book(&session_id, &user).is_err() {
                    engine.join_waitlist(&session_id, &user).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    for session_id in &sessions {
        let session = engine.session(session_id).unwrap();
        assert_eq!(session.attendees().len(), 2);
        assert_eq!(session.waitlist().len(), 2);
        session.check_invariants().unwrap();
    }
}
