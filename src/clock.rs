use crate::task::TaskId;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use std::sync::{Arc, Mutex};

pub trait Clock: Send {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Settable clock. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct FixedClock(Arc<Mutex<NaiveDateTime>>);

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self(Arc::new(Mutex::new(now)))
    }

    pub fn at(date: NaiveDate, hour: u32) -> Self {
        Self::new(date.and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or_default()))
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.0.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.0.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Source of new task ids.
pub trait IdGenerator: Send {
    fn next_id(&mut self, clock: &dyn Clock) -> TaskId;

    /// Records an id already in use so later ids stay above it.
    fn observe(&mut self, id: TaskId);
}

/// Millisecond timestamps, bumped past the previous id when the clock has
/// not moved on.
#[derive(Debug, Clone, Default)]
pub struct ClockIds {
    last: TaskId,
}

impl IdGenerator for ClockIds {
    fn next_id(&mut self, clock: &dyn Clock) -> TaskId {
        let millis = clock.now().and_utc().timestamp_millis().max(0) as TaskId;
        self.last = millis.max(self.last.saturating_add(1));
        self.last
    }

    fn observe(&mut self, id: TaskId) {
        self.last = self.last.max(id);
    }
}

#[derive(Debug, Clone, Default)]
pub struct SequentialIds {
    last: TaskId,
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self, _clock: &dyn Clock) -> TaskId {
        self.last = self.last.saturating_add(1);
        self.last
    }

    fn observe(&mut self, id: TaskId) {
        self.last = self.last.max(id);
    }
}
