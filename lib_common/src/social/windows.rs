//! # Hour Windows
//!
//! Converts "N hours before now" into half-open `[start, end)` UNIX-second
//! intervals of exactly one hour.
//!
//! A batch reads the clock once and derives every window from that single
//! reading, so window `n + 1` starts exactly 3600 seconds before window `n`.
//! Reading the clock again for every window is only done when asked for
//! explicitly through [`WindowAnchoring::PerWindow`].

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::retrieve::FetchError;

/// Length of one hour-bucket in seconds.
pub const SECONDS_PER_HOUR: i64 = 60 * 60;

/// A source of wall-clock time in UNIX seconds.
pub trait Clock {
    /// Current time in whole seconds since the epoch.
    fn now_unix(&self) -> i64;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// A clock that always reports the same instant. Handy in tests and replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_unix(&self) -> i64 {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_unix(&self) -> i64 {
        (**self).now_unix()
    }
}

/// One hour-bucket, `[start, end)` in UNIX seconds. `end == start + 3600` always.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    start: i64,
    end: i64,
}

impl TimeWindow {
    /// The hour that started `hours_before` hours before `now`.
    ///
    /// # Errors
    /// `InvalidArgument` when `hours_before` is zero.
    pub fn hours_before(now: i64, hours_before: u32) -> Result<Self, FetchError> {
        if hours_before == 0 {
            return Err(FetchError::invalid("hours_before must be at least 1"));
        }
        let start = now - i64::from(hours_before) * SECONDS_PER_HOUR;
        Ok(Self {
            start,
            end: start + SECONDS_PER_HOUR,
        })
    }

    /// Inclusive lower bound.
    pub fn start(&self) -> i64 {
        self.start
    }

    /// Exclusive upper bound.
    pub fn end(&self) -> i64 {
        self.end
    }
}

/// Where the "now" of each window comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowAnchoring {
    /// One clock reading for the whole batch.
    #[default]
    Batch,
    /// A fresh clock reading per window. Windows may drift apart under load.
    PerWindow,
}

/// Reads `clock` once and returns the window for `hours_before`.
pub fn window<C: Clock>(clock: &C, hours_before: u32) -> Result<TimeWindow, FetchError> {
    TimeWindow::hours_before(clock.now_unix(), hours_before)
}

/// Windows for `1..=hours` hours before now, from a single clock reading.
///
/// Element `i` is the window `i + 1` hours before now. `hours == 0` gives an
/// empty list.
pub fn windows<C: Clock>(clock: &C, hours: u32) -> Vec<TimeWindow> {
    windows_with(clock, hours, WindowAnchoring::Batch)
}

/// Like [`windows`], with an explicit anchoring policy.
pub fn windows_with<C: Clock>(clock: &C, hours: u32, anchoring: WindowAnchoring) -> Vec<TimeWindow> {
    let anchor = (anchoring == WindowAnchoring::Batch).then(|| clock.now_unix());
    (1..=hours)
        .map(|hours_before| {
            let now = anchor.unwrap_or_else(|| clock.now_unix());
            let start = now - i64::from(hours_before) * SECONDS_PER_HOUR;
            TimeWindow {
                start,
                end: start + SECONDS_PER_HOUR,
            }
        })
        .collect()
}
