//! # Tide Clock Core Library
//!
//! This library provides the data types and pipeline stages for a daily tide
//! clock: a small appliance that wakes once a day, downloads the day's tide
//! turning points, shows them on an e-paper panel and goes back to sleep.
//!
//! ## Design Philosophy
//!
//! ### Cold Start Every Cycle
//! The device loses all volatile memory while asleep, so every wake is a fresh
//! process. Nothing here caches across cycles; each stage is a function of its
//! inputs plus the configuration passed in.
//!
//! ### Data Flow
//! 1. **Connect**: join the network ([`network`])
//! 2. **Fetch**: tide samples ([`tide_data`]) and the UTC offset ([`timezone`])
//! 3. **Localise**: shift UTC timestamps to wall-clock time ([`local_time`])
//! 4. **Plan**: classify and lay out one text line per tide ([`planner`])
//! 5. **Render**: rasterise and refresh the panel once ([`renderer`], [`panel`])
//! 6. **Sleep**: arm a wake alarm 24 hours out ([`sleep`])
//!
//! [`cycle::run_cycle`] strings stages 1–5 together; the binary hands the
//! result to the sleep scheduler.
//!
//! ## Core Types
//! - [`TideSample`]: one `{time, value}` entry from the tide API
//! - [`TideLevel`]: High/Low classification at a fixed 1.0 m threshold
//! - [`LocalTideEvent`]: a sample shifted to local time and classified

use chrono::NaiveDateTime;
use std::fmt;

pub mod config;
pub mod cycle;
pub mod http;
pub mod local_time;
pub mod network;
pub mod panel;
pub mod planner;
pub mod renderer;
pub mod sleep;
pub mod tide_data;
pub mod timezone;

/// Heights strictly below this many metres are classified as low tide.
pub const LOW_TIDE_THRESHOLD_M: f32 = 1.0;

/// A single tide sample exactly as the tide API reported it.
///
/// `time` is kept as the raw ISO-8601 string; conversion happens later in
/// [`local_time`], so a malformed timestamp fails the cycle at that stage and
/// not while decoding the response.
///
/// # Example
/// ```
/// use tide_clock_lib::TideSample;
///
/// let sample = TideSample { time: "2024-06-01T03:15:00Z".into(), height_m: 0.8 };
/// assert_eq!(sample.height_m, 0.8);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct TideSample {
    /// UTC timestamp, `YYYY-MM-DDTHH:MM:SSZ`
    pub time: String,
    /// Height above chart datum in metres
    pub height_m: f32,
}

/// High or low water.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TideLevel {
    High,
    Low,
}

impl TideLevel {
    /// Pure threshold classification: `< 1.0 m` is low, anything else high.
    ///
    /// ```
    /// use tide_clock_lib::TideLevel;
    ///
    /// assert_eq!(TideLevel::classify(0.999), TideLevel::Low);
    /// assert_eq!(TideLevel::classify(1.0), TideLevel::High);
    /// ```
    pub fn classify(height_m: f32) -> Self {
        if height_m < LOW_TIDE_THRESHOLD_M {
            TideLevel::Low
        } else {
            TideLevel::High
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TideLevel::High => "High",
            TideLevel::Low => "Low",
        }
    }
}

impl fmt::Display for TideLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `pad` so width/alignment flags like `{:<4}` apply
        f.pad(self.label())
    }
}

/// A tide sample in local wall-clock time, ready for layout.
///
/// Lives for one cycle only: built by [`local_time::normalize`], consumed by
/// [`planner::plan`].
#[derive(Clone, Debug, PartialEq)]
pub struct LocalTideEvent {
    /// Local wall-clock time (UTC plus the cycle's flat offset)
    pub local_time: NaiveDateTime,
    /// Height in metres, unchanged from the sample
    pub height_m: f32,
    pub level: TideLevel,
}
