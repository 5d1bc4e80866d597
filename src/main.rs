use anyhow::{bail, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use ccdcam::{
    device::{DeviceClient, SimulatedClient},
    facade::CommandFacade,
    server::CommandServerBuilder,
    session::SessionController,
    CcdConfig,
};

#[derive(Parser, Debug)]
#[command(name = "ccdcam")]
#[command(about = "Remote control and image analysis server for cooled CCD cameras")]
#[command(version)]
#[command(long_about = "Connects to a CCD camera through a device server, runs single or \
continuous exposures, and serves the images, ROI statistics and intensity profiles over a small \
HTTP command interface.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "ccdcam.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without connecting")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting ccdcam v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match CcdConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("✗ Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    if args.validate_config {
        info!("Configuration validation successful");
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let client = device_client(&config)?;
    let session = SessionController::from_config(&config, client);

    if let Err(e) = session.connect().await {
        error!("Failed to connect to {}: {}", config.device.camera_id, e);
        if e.is_fatal() {
            std::process::exit(1);
        }
        warn!("Continuing without a camera connection; commands will retry");
    }

    let facade = CommandFacade::new(Arc::clone(&session), &config.analysis);
    let server = CommandServerBuilder::new()
        .config(config.server.clone())
        .facade(facade)
        .build()?;
    let listener = server.bind().await?;

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server_task = tokio::spawn(async move {
        let shutdown = async {
            let _ = stop_rx.await;
        };
        if let Err(e) = server.serve(listener, shutdown).await {
            error!("Command server stopped: {}", e);
        }
    });

    let reason = wait_for_shutdown().await;
    info!("Shutdown initiated: {}", reason);

    session.stop_continuous();
    session.shutdown();

    let _ = stop_tx.send(());
    if let Err(e) = server_task.await {
        warn!("Command server task failed to join: {}", e);
    }

    info!("ccdcam shutdown complete");
    Ok(())
}

/// Build the configured device client
fn device_client(config: &CcdConfig) -> Result<Arc<dyn DeviceClient>> {
    if !config.device.simulate {
        bail!(
            "No device-protocol client is available for {}:{}; set device.simulate = true",
            config.device.host,
            config.device.port
        );
    }

    let (width, height) = config.device.sensor_size;
    info!(
        "Using simulated camera '{}' ({}x{})",
        config.device.camera_id, width, height
    );

    Ok(Arc::new(
        SimulatedClient::builder()
            .camera_id(config.device.camera_id.clone())
            .sensor_size(width, height)
            .telescope(config.device.telescope_simulator)
            .build(),
    ))
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM
async fn wait_for_shutdown() -> &'static str {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => "SIGINT",
                    _ = sigterm.recv() => "SIGTERM",
                }
            }
            Err(e) => {
                warn!("Failed to register SIGTERM handler: {}", e);
                let _ = signal::ctrl_c().await;
                "SIGINT"
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
        "SIGINT"
    }
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ccdcam={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# ccdcam configuration file");
    println!("# Every option with its default value");
    println!("# CCDCAM_<SECTION>__<KEY> environment variables override any of them");
    println!();
    println!("{}", toml::to_string_pretty(&CcdConfig::default())?);
    Ok(())
}
