use chrono::{DateTime, Utc};

/// A fact about one stream (one session, one user, ...).
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted name, stable across releases (e.g. "scheduling.seat.booked").
    fn event_type(&self) -> &'static str;

    /// Id of the stream the event belongs to.
    fn stream_id(&self) -> String;

    fn occurred_at(&self) -> DateTime<Utc>;
}
