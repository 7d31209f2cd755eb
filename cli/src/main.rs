//! Stayline CLI server
//!
//! Headless booking engine suitable for deployment as a systemd service,
//! Docker container, or standalone process.
//!
//! ```sh
//! # Run with default config (~/.config/stayline/config.toml)
//! stayline
//!
//! # Custom config path
//! stayline --config /etc/stayline/config.toml
//!
//! # Local demo with seeded rooms
//! stayline --api-port 8081 --seed-demo
//!
//! # Validate config without starting
//! stayline --check
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use stayline::config::{AppConfig, CONFIG_ENV};
use stayline::server::{init_tracing, ServerHandle, ServerOptions};

/// Stayline: hotel booking lifecycle and room availability engine.
#[derive(Parser, Debug)]
#[command(
    name = "stayline",
    version,
    about = "Hotel booking lifecycle and room availability engine",
    long_about = "Stayline: REST API for hotel bookings, payments, check-in/out, \
                  refunds and room availability, with a background sweep for \
                  unpaid, no-show and overdue stays.\n\n\
                  Default config: ~/.config/stayline/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Override the REST API listen port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration file and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,

    /// Load the demo room catalog and discount codes on startup.
    #[arg(long)]
    seed_demo: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli.config.unwrap_or_else(stayline::default_config_path);

    let loaded = AppConfig::load(&config_path);
    let mut config = match &loaded {
        Ok(cfg) => cfg.clone(),
        Err(_) => AppConfig::default(),
    };

    // ── Apply CLI overrides ────────────────────────────────────
    if let Some(port) = cli.api_port {
        config.server.api_port = port;
    }
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }

    // ── Config validation mode ─────────────────────────────────
    if cli.check {
        if let Err(e) = &loaded {
            eprintln!("❌ Failed to load {}: {}", config_path.display(), e);
            std::process::exit(1);
        }
        if let Err(e) = config.validate() {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
        println!("✅ Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!("   API address : {}:{}", config.server.api_host, config.server.api_port);
        println!("   Database    : {}", config.database.connection_url());
        println!("   Timezone    : {}", config.hotel.timezone);
        println!(
            "   Scheduler   : {} (every {}s)",
            if config.scheduler.enabled { "enabled" } else { "disabled" },
            config.scheduler.interval_secs
        );
        println!("   Log level   : {}", config.logging.level);
        return Ok(());
    }

    init_tracing(&config);
    match &loaded {
        Ok(_) => info!("Configuration loaded from {}", config_path.display()),
        Err(e) => {
            error!("Failed to load config from {}: {}", config_path.display(), e);
            error!("Using default configuration.");
        }
    }
    if let Some(port) = cli.api_port {
        info!("CLI override: api_port = {}", port);
    }
    if let Some(ref level) = cli.log_level {
        info!("CLI override: log_level = {}", level);
    }

    // ── Start server ───────────────────────────────────────────
    let handle = ServerHandle::start(ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
        seed_demo: cli.seed_demo,
    })
    .await?;

    handle.install_signal_handler();
    info!("🚀 Press Ctrl+C to shutdown gracefully.");

    handle.shutdown_signal().wait().await;
    handle.wait().await;

    Ok(())
}
