use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

use usbwatch::config::MonitorConfig;
use usbwatch::logging::{init_logging, setup_panic_hook};
use usbwatch::monitor::{EventSink, MonitorEvent, UsbMonitor};
use usbwatch::uevent::MulticastGroup;

#[derive(Parser, Debug)]
#[command(name = "usbwatch")]
#[command(about = "Report USB devices as they are plugged in and removed")]
struct Args {
    /// Configuration file (defaults to $XDG_CONFIG_HOME/usbwatch/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Netlink multicast group to listen on
    #[arg(long)]
    group: Option<MulticastGroup>,

    /// Read timeout in milliseconds; bounds how long a stop request waits
    #[arg(long)]
    read_timeout_ms: Option<u64>,

    /// Label devices from uevent fields only, without lsusb/lsblk
    #[arg(long)]
    no_enrich: bool,

    /// Enable verbose logging
    #[arg(long, short)]
    verbose: bool,
}

fn load_config(args: &Args) -> Result<MonitorConfig> {
    let mut config = match &args.config {
        Some(path) => MonitorConfig::load_from_file(path)?,
        None => {
            let path = MonitorConfig::default_config_path();
            if path.exists() {
                MonitorConfig::load_from_file(&path)?
            } else {
                MonitorConfig::default()
            }
        }
    };

    config.apply_env_overrides();

    if let Some(group) = args.group {
        config.channel.group = group;
    }
    if let Some(ms) = args.read_timeout_ms {
        config.channel.read_timeout_ms = ms;
    }
    if args.no_enrich {
        config.enrichment.enabled = false;
    }
    if args.verbose {
        config.logging.level = "trace".to_string();
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    init_logging(&config.logging)?;
    setup_panic_hook();

    info!("Starting usbwatch on {} group", config.channel.group);

    let (sink, mut events) = EventSink::channel();
    let mut monitor = UsbMonitor::from_config(&config, sink);
    monitor.start_monitoring().await;

    let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let mut stopping = false;

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(MonitorEvent::Finished) | None => break,
                    // Already written to the log by the sink
                    Some(MonitorEvent::Log(_)) => {}
                    Some(event) => println!("{}", event),
                }
            }
            _ = tokio::signal::ctrl_c(), if !stopping => {
                info!("Received CTRL+C, shutting down gracefully...");
                monitor.stop_monitoring();
                stopping = true;
            }
            _ = sigterm.recv(), if !stopping => {
                info!("Received SIGTERM, shutting down gracefully...");
                monitor.stop_monitoring();
                stopping = true;
            }
        }
    }

    match monitor.wait().await {
        Some(registry) => info!("usbwatch stopped with {} device(s) attached", registry.len()),
        None => warn!("Monitoring task did not return its registry"),
    }

    Ok(())
}
