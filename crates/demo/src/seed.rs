//! Sample studio data: members, teachers and a week of classes.

use chrono::{DateTime, Duration, NaiveTime, Utc};

use studio_core::{DomainResult, SessionId, TeacherId, UserId};
use studio_enrollment::NewSession;
use studio_identity::{Membership, Role, User};
use studio_scheduling::{Schedule, SessionDetails};

/// A class plus the roster it should hold once seeded.
pub struct SeedClass {
    pub session: NewSession,
    pub attendees: &'static [&'static str],
    pub waitlist: &'static [&'static str],
    /// Reason the studio cancelled the class, if it did.
    pub cancelled: Option<&'static str>,
}

pub fn users() -> DomainResult<Vec<User>> {
    let member = |id: &str, name: &str, email: &str, role: Role, membership: Membership| {
        User::new(UserId::new(id), name, email, role).map(|u| {
            u.with_membership(membership)
                .with_avatar(format!("https://picsum.photos/seed/{}/100/100", first_name(name)))
        })
    };

    Ok(vec![
        member("user-admin-1", "Alex Ray", "alex@zenithyoga.com", Role::Admin, Membership::Active)?,
        member("user-client-1", "Ben Carter", "ben@example.com", Role::Client, Membership::Active)?,
        member("user-client-2", "Chloe Davis", "chloe@example.com", Role::Client, Membership::Inactive)?,
        member("user-client-3", "David Evans", "david@example.com", Role::Client, Membership::Active)?,
        member("user-client-4", "Eva Foster", "eva@example.com", Role::Client, Membership::Active)?,
    ])
}

fn first_name(name: &str) -> String {
    name.split_whitespace()
        .next()
        .unwrap_or(name)
        .to_ascii_lowercase()
}

/// Midnight of `now + days`, plus `hour` hours.
fn day_at(now: DateTime<Utc>, days: i64, hour: i64) -> DateTime<Utc> {
    (now + Duration::days(days))
        .date_naive()
        .and_time(NaiveTime::MIN)
        .and_utc()
        + Duration::hours(hour)
}

fn details(name: &str, description: &str, teacher: &str, price: u64) -> SessionDetails {
    SessionDetails {
        name: name.to_string(),
        description: description.to_string(),
        teacher_id: Some(TeacherId::new(teacher)),
        price,
    }
}

fn class(id: &str, details: SessionDetails, start: DateTime<Utc>, minutes: u32, capacity: u32) -> NewSession {
    NewSession {
        session_id: SessionId::new(id),
        details,
        schedule: Schedule::new(start, minutes),
        capacity,
    }
}

pub fn classes(now: DateTime<Utc>) -> Vec<SeedClass> {
    vec![
        SeedClass {
            session: class(
                "class-1",
                details(
                    "Sunrise Vinyasa Flow",
                    "Energize your morning with a dynamic flow to awaken the body and mind.",
                    "teacher-1",
                    2500,
                ),
                day_at(now, 1, 7),
                60,
                2,
            ),
            attendees: &["user-client-1"],
            waitlist: &["user-client-3"],
            cancelled: None,
        },
        SeedClass {
            session: class(
                "class-2",
                details(
                    "Evening Restorative Yoga",
                    "Unwind and release tension with gentle poses and deep stretches.",
                    "teacher-3",
                    2500,
                ),
                day_at(now, 1, 19),
                75,
                15,
            ),
            attendees: &[],
            waitlist: &[],
            cancelled: None,
        },
        SeedClass {
            session: class(
                "class-3",
                details(
                    "Power Ashtanga",
                    "A challenging and invigorating practice to build strength and endurance.",
                    "teacher-2",
                    3000,
                ),
                day_at(now, 2, 18),
                90,
                20,
            ),
            attendees: &["user-client-1", "user-client-3"],
            waitlist: &[],
            cancelled: None,
        },
        SeedClass {
            session: class(
                "class-4",
                details(
                    "Mindful Meditation",
                    "Cultivate inner peace and focus through guided meditation techniques.",
                    "teacher-1",
                    1500,
                ),
                day_at(now, 3, 12),
                45,
                25,
            ),
            attendees: &[],
            waitlist: &[],
            cancelled: None,
        },
        SeedClass {
            session: class(
                "class-5",
                details(
                    "Hatha Foundations",
                    "A foundational class focusing on alignment and breath.",
                    "teacher-3",
                    2000,
                ),
                day_at(now, -2, 9),
                60,
                15,
            ),
            attendees: &["user-client-1"],
            waitlist: &[],
            cancelled: None,
        },
        SeedClass {
            session: class(
                "class-6",
                details(
                    "Inversions Workshop",
                    "Build confidence upside down with drills for headstand and forearm stand.",
                    "teacher-2",
                    5000,
                ),
                day_at(now, -5, 14),
                120,
                10,
            ),
            attendees: &[],
            waitlist: &[],
            cancelled: Some("unforeseen circumstances"),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn seed_users_are_valid_and_unique() {
        let users = users().unwrap();
        assert_eq!(users.len(), 5);
        assert_eq!(users.iter().filter(|u| u.is_admin()).count(), 1);
        assert!(!users[2].membership.is_active());
        assert_eq!(
            users[1].avatar_url.as_deref(),
            Some("https://picsum.photos/seed/ben/100/100")
        );
    }

    #[test]
    fn class_times_are_relative_to_now() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 15, 30, 0).unwrap();
        let seeded = classes(now);
        assert_eq!(
            seeded[0].session.schedule.start,
            Utc.with_ymd_and_hms(2026, 3, 3, 7, 0, 0).unwrap()
        );
        assert_eq!(
            seeded[4].session.schedule.start,
            Utc.with_ymd_and_hms(2026, 2, 28, 9, 0, 0).unwrap()
        );
    }
}
