//! # Tide Clock Application Entry Point
//!
//! Runs one wake cycle (connect, fetch, localise, plan, render) and then puts
//! the device to sleep until the same time tomorrow. There are no required
//! arguments; `--once` skips the sleep for development runs.


use chrono::Utc;
use std::env;
use tide_clock_lib::{
    config::{Config, Credentials, ErrorPolicy},
    cycle::{run_cycle, ApiForecast},
    network::HostRadio,
    panel::{RateLimitedPanel, TerminalPanel},
    sleep::{HostAlarm, SleepScheduler},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let run_once = env::args().any(|arg| arg == "--once");
    info!("tide clock starting");

    let config = Config::load();
    let credentials = Credentials::load()?;

    let mut radio = HostRadio::new(config.network.probe_addr.clone());
    let source = ApiForecast::new(&config, &credentials)?;
    let mut panel = RateLimitedPanel::new(TerminalPanel::stdout(
        config.display.width,
        config.display.height,
    ));

    // Single-threaded: one blocking pass, no background tasks
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let outcome = runtime.block_on(run_cycle(
        &config,
        &credentials,
        &mut radio,
        &source,
        &mut panel,
        Utc::now(),
    ));

    match outcome {
        Ok(report) => info!(
            samples = report.samples,
            offset_hours = report.offset_hours,
            drawn = report.render.drawn,
            clipped = report.render.clipped,
            "cycle complete"
        ),
        Err(e) => match config.on_error {
            ErrorPolicy::Halt => return Err(e.into()),
            ErrorPolicy::Sleep => {
                let e = anyhow::Error::from(e);
                error!("cycle failed, sleeping until next wake: {:#}", e);
            }
        },
    }

    if run_once {
        return Ok(());
    }

    drop(runtime);
    SleepScheduler::from_secs(config.sleep.seconds).schedule_next_wake(HostAlarm::new())
}
