//! # Sleep scheduling
//!
//! After rendering, the clock arms a wake alarm a fixed interval from *now*
//! (measured when scheduling, not when the cycle started) and hands control
//! to the deep-sleep primitive, which never returns. Execution resumes only
//! through a full restart, so nothing in memory survives between cycles.

use std::env;
use std::process::{self, Command};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// One day.
pub const DEFAULT_SLEEP: Duration = Duration::from_secs(86_400);

/// The contract the clock needs from the wake/sleep hardware.
pub trait WakeAlarm {
    /// Arm the alarm for a monotonic-time `deadline`.
    fn arm(&mut self, deadline: Instant);

    /// Halt until the armed deadline, then restart from the top.
    fn deep_sleep(&mut self) -> !;
}

/// Wake deadline `after` past `now`; an interval the clock cannot represent
/// falls back to [`DEFAULT_SLEEP`].
pub fn next_wake(now: Instant, after: Duration) -> Instant {
    now.checked_add(after).unwrap_or_else(|| {
        warn!(
            seconds = after.as_secs(),
            "sleep interval out of range, using {}s",
            DEFAULT_SLEEP.as_secs()
        );
        now.checked_add(DEFAULT_SLEEP).unwrap_or(now)
    })
}

#[derive(Clone, Copy, Debug)]
pub struct SleepScheduler {
    interval: Duration,
}

impl Default for SleepScheduler {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SLEEP,
        }
    }
}

impl SleepScheduler {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn from_secs(seconds: u64) -> Self {
        Self::new(Duration::from_secs(seconds))
    }

    /// Compute the deadline from `now` and arm `alarm` with it.
    pub fn arm<A: WakeAlarm>(&self, alarm: &mut A, now: Instant) -> Instant {
        let deadline = next_wake(now, self.interval);
        alarm.arm(deadline);
        info!(
            seconds = (deadline - now).as_secs(),
            "wake alarm armed, entering deep sleep"
        );
        deadline
    }

    /// Arm from the current monotonic time and sleep. Does not return.
    pub fn schedule_next_wake<A: WakeAlarm>(&self, mut alarm: A) -> ! {
        self.arm(&mut alarm, Instant::now());
        alarm.deep_sleep()
    }
}

/// Wake alarm for a host process.
///
/// "Deep sleep" blocks the thread until the deadline; "wake" replaces the
/// process with a fresh copy of itself (same binary, same arguments) so the
/// next cycle is a cold start just like on the device.
#[derive(Debug, Default)]
pub struct HostAlarm {
    deadline: Option<Instant>,
}

impl HostAlarm {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WakeAlarm for HostAlarm {
    fn arm(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }

    fn deep_sleep(&mut self) -> ! {
        if let Some(deadline) = self.deadline {
            let remaining = deadline.saturating_duration_since(Instant::now());
            thread::sleep(remaining);
        }
        restart()
    }
}

fn restart() -> ! {
    let exe = match env::current_exe() {
        Ok(exe) => exe,
        Err(e) => {
            error!("cannot locate own executable for restart: {}", e);
            process::exit(1);
        }
    };
    let mut command = Command::new(&exe);
    command.args(env::args_os().skip(1));
    info!(exe = %exe.display(), "waking: restarting");

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // exec only returns on failure
        let e = command.exec();
        error!("restart failed: {}", e);
        process::exit(1);
    }

    #[cfg(not(unix))]
    {
        match command.spawn() {
            Ok(_) => process::exit(0),
            Err(e) => {
                error!("restart failed: {}", e);
                process::exit(1);
            }
        }
    }
}
