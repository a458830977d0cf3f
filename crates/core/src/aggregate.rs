//! Decide/apply split for studio records that change through events.

/// A record with an identity and an event count.
pub trait AggregateRoot {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Number of events applied since the record was created.
    fn version(&self) -> u64;
}

/// Command handling in two steps.
///
/// `handle` reads state and either rejects the command or returns the events
/// it implies. `apply` folds one event into state and bumps `version()` by one.
/// Neither step touches clocks, locks or IO, so both can run on a scratch copy
/// before anything is committed.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    fn apply(&mut self, event: &Self::Event);

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Apply events in order.
    fn apply_all(&mut self, events: &[Self::Event]) {
        for event in events {
            self.apply(event);
        }
    }

    /// Copy of `self` with `events` applied; `self` is left as it was.
    fn applied(&self, events: &[Self::Event]) -> Self
    where
        Self: Clone,
    {
        let mut next = self.clone();
        next.apply_all(events);
        next
    }
}
