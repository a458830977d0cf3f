use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{Duration, Utc};
use serde_json::Value as JsonValue;
use std::sync::Arc;

use studio_core::{SessionId, UserId};
use studio_enrollment::{EnrollmentConfig, EnrollmentEngine, InMemorySessionStore, NewSession};
use studio_events::{EventEnvelope, InMemoryEventBus};
use studio_identity::{InMemoryUserDirectory, Role, User};
use studio_scheduling::{Schedule, SessionDetails};

type Engine = EnrollmentEngine<
    InMemorySessionStore,
    InMemoryUserDirectory,
    Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>,
>;

fn user_id(i: usize) -> UserId {
    UserId::new(format!("user-{i}"))
}

fn setup(users: usize, capacity: u32) -> (Engine, SessionId) {
    let directory = InMemoryUserDirectory::with_users((0..users).map(|i| {
        User::new(
            user_id(i),
            format!("Member {i}"),
            format!("member{i}@studio.test"),
            Role::Client,
        )
        .unwrap()
    }))
    .unwrap();

    let engine = EnrollmentEngine::new(
        InMemorySessionStore::new(),
        directory,
        Arc::new(InMemoryEventBus::new()),
        EnrollmentConfig::default(),
    );
    let session_id = SessionId::new("class-bench");
    engine
        .schedule_session(NewSession {
            session_id: session_id.clone(),
            details: SessionDetails::new("Bench Flow"),
            schedule: Schedule::new(Utc::now() + Duration::days(30), 60),
            capacity,
        })
        .unwrap();
    (engine, session_id)
}

fn bench_book_cancel(c: &mut Criterion) {
    let mut group = c.benchmark_group("book_cancel");

    // Book then cancel with an empty waitlist (no promotion).
    group.bench_function("book_then_cancel", |b| {
        let (engine, session_id) = setup(1, 10);
        let user = user_id(0);
        b.iter(|| {
            engine.book(black_box(&session_id), black_box(&user)).unwrap();
            engine.cancel(black_box(&session_id), black_box(&user)).unwrap();
        });
    });

    // Cancel promotes the waitlist head; the cancelled user rejoins at the tail.
    group.bench_function("cancel_with_promotion", |b| {
        let (engine, session_id) = setup(2, 1);
        engine.book(&session_id, &user_id(0)).unwrap();
        engine.join_waitlist(&session_id, &user_id(1)).unwrap();
        let mut seated = 0;
        b.iter(|| {
            let waiting = 1 - seated;
            engine.cancel(&session_id, &user_id(seated)).unwrap();
            engine.join_waitlist(&session_id, &user_id(seated)).unwrap();
            seated = waiting;
        });
    });

    group.finish();
}

fn bench_roster_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("book_by_roster_size");

    for attendees in [10usize, 100, 500] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::from_parameter(attendees),
            &attendees,
            |b, &attendees| {
                let (engine, session_id) = setup(attendees + 1, attendees as u32 + 1);
                for i in 0..attendees {
                    engine.book(&session_id, &user_id(i)).unwrap();
                }
                let user = user_id(attendees);
                b.iter(|| {
                    engine.book(&session_id, &user).unwrap();
                    engine.cancel(&session_id, &user).unwrap();
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_book_cancel, bench_roster_size);
criterion_main!(benches);
