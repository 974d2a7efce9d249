use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use shock_guard_rs::config::{Config, FREQ_HZ};
use shock_guard_rs::controller::PAUSE_SECONDS;
use shock_guard_rs::daemon::Daemon;
use shock_guard_rs::pause::{self, PauseFlag};
use shock_guard_rs::platform;
use shock_guard_rs::protect::SysfsProtectSwitch;
use shock_guard_rs::sensors::{HdapsSensor, HDAPS_POSITION_FILE};
use shock_guard_rs::startup::{wait_until_ready, ReadinessPolicy};
use std::path::PathBuf;
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser, Debug)]
#[command(name = "shock_guard")]
#[command(about = "Park the hard disk heads while the laptop is being shaken", long_about = None)]
#[command(after_help = format!("Send SIGUSR1 to deactivate for {} seconds.", PAUSE_SECONDS))]
struct Args {
    /// Block device to protect, likely hda or sda
    #[arg(short, long)]
    device: String,

    /// Sensitivity threshold (15 is a good start)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    sensitivity: u32,

    /// Run in the background
    #[arg(short, long)]
    background: bool,

    /// Print per-sample statistics
    #[arg(short, long)]
    verbose: bool,

    /// Protect attribute (default: /sys/block/<device>/queue/protect)
    #[arg(long, value_name = "PATH")]
    protect_file: Option<PathBuf>,

    /// Accelerometer position attribute
    #[arg(long, value_name = "PATH", default_value = HDAPS_POSITION_FILE)]
    position_file: PathBuf,

    /// Sampling frequency in Hz
    #[arg(long, default_value_t = FREQ_HZ)]
    frequency: u32,

    /// Write a JSON status snapshot here every few seconds
    #[arg(long, value_name = "PATH")]
    status_file: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Config {
        let mut config = Config::new(&self.device, self.sensitivity);
        if let Some(protect_file) = self.protect_file {
            config.protect_file = protect_file;
        }
        config.position_file = self.position_file;
        config.frequency_hz = self.frequency;
        config.status_file = self.status_file;
        config.verbose = self.verbose;
        config.background = self.background;
        config
    }
}

fn main() -> Result<()> {
    let config = match Args::parse().into_config().validated() {
        Ok(config) => config,
        Err(e) => Args::command().error(ErrorKind::InvalidValue, e).exit(),
    };

    // Fork before the logger or runtime start any threads
    if config.background {
        platform::daemonize().context("failed to move into the background")?;
    }
    init_logging(config.verbose);

    if let Err(e) = platform::lock_memory() {
        log::warn!("could not lock memory, parking may be delayed by paging: {}", e);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    runtime.block_on(run(config))
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

async fn run(config: Config) -> Result<()> {
    let mut switch = SysfsProtectSwitch::new(&config.protect_file);
    let mut sensor = HdapsSensor::new(&config.position_file);

    let policy = ReadinessPolicy::for_background(config.background);
    let first = wait_until_ready(&mut switch, &mut sensor, policy).await?;
    log::debug!(
        "protect_file: {}  threshold: {}  first reading: ({}, {})",
        switch.path().display(),
        config.threshold,
        first.x,
        first.y
    );

    let pause = PauseFlag::new();
    let _pause_listener =
        pause::listen_for_pause(pause.clone()).context("failed to install SIGUSR1 handler")?;
    let mut terminate =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;

    let mut daemon = Daemon::new(config, sensor, switch, pause);
    daemon
        .run(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        })
        .await;

    Ok(())
}
