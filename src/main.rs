//! Measurement Recorder CLI
//!
//! Records motion and GPS sessions and browses the recorded files.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use measurement_recorder::{
    config::Config,
    sensor::{LocationTracker, SimulatedLocation, SimulatedMotion, StaticPermission},
    session::{
        create_shared_log_with_persistence, format_elapsed, interval_to_hz, LocationStatus,
        Providers, SessionController,
    },
    settings::{
        GeneralSettings, JsonFileSettingsStore, MountType, SensorSettings, SettingsStore,
        GENERAL_SETTINGS_KEY, SENSOR_SETTINGS_KEY,
    },
    storage::{LocalFileStore, SessionArchive},
    SessionConfig, VERSION,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "measure")]
#[command(version = VERSION)]
#[command(about = "Record accelerometer, gyroscope and GPS sessions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a measurement session until Ctrl+C (or --duration)
    Record {
        /// Stop automatically after this many seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Behave as if location permission was refused
        #[arg(long)]
        deny_location: bool,
    },

    /// List recorded sessions
    Sessions,

    /// List the files of one session
    Files {
        /// Session id (folder name)
        session: String,
    },

    /// Print one file of a session
    Show { session: String, file: String },

    /// Delete a session, or a single file of it
    Delete {
        session: String,

        /// Only delete this file
        #[arg(long)]
        file: Option<String>,
    },

    /// Show or edit recording settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },

    /// Show cumulative recording statistics
    Status,

    /// Show configuration
    Config,
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Print the stored settings and what a session would use
    Show,

    /// Choose sensors to record (comma-separated: accelerometer,gyro,gps or all)
    Sensors { list: String },

    /// Update device, vehicle and sampling-rate settings
    General(GeneralArgs),
}

#[derive(Args)]
struct GeneralArgs {
    #[arg(long)]
    device_brand: Option<String>,
    #[arg(long)]
    device_model: Option<String>,
    /// NO_MOUNT, MAGNETIC or CLIP
    #[arg(long)]
    mount_type: Option<String>,
    #[arg(long)]
    vehicle_brand: Option<String>,
    #[arg(long)]
    vehicle_km: Option<String>,
    /// GPS interval in milliseconds
    #[arg(long)]
    gps_rate: Option<String>,
    /// Accelerometer rate in Hz
    #[arg(long)]
    accelerometer_rate: Option<String>,
    /// Gyroscope rate in Hz (defaults to the accelerometer rate)
    #[arg(long)]
    gyro_rate: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load().unwrap_or_default();

    match cli.command {
        Commands::Record {
            duration,
            deny_location,
        } => cmd_record(&config, duration, deny_location).await,
        Commands::Sessions => cmd_sessions(&config).await,
        Commands::Files { session } => cmd_files(&config, &session).await,
        Commands::Show { session, file } => cmd_show(&config, &session, &file).await,
        Commands::Delete { session, file } => cmd_delete(&config, &session, file).await,
        Commands::Settings { action } => cmd_settings(&config, action).await,
        Commands::Status => cmd_status(&config),
        Commands::Config => cmd_config(&config),
    }
}

fn archive(config: &Config) -> SessionArchive {
    SessionArchive::new(Arc::new(LocalFileStore::new(&config.base_path)))
}

async fn cmd_record(
    config: &Config,
    duration: Option<u64>,
    deny_location: bool,
) -> anyhow::Result<()> {
    println!("Measurement Recorder v{VERSION}");
    println!();

    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    let permission = if deny_location {
        StaticPermission::denied()
    } else {
        StaticPermission::granted()
    };
    let providers = Providers {
        accelerometer: Box::new(SimulatedMotion::accelerometer()),
        gyroscope: Box::new(SimulatedMotion::gyroscope()),
        location: LocationTracker::new(
            Box::new(SimulatedLocation::default()),
            Box::new(permission),
        ),
    };

    let log = create_shared_log_with_persistence(config.stats_path());
    let mut controller = SessionController::new(
        Arc::new(JsonFileSettingsStore::new(&config.settings_path)),
        Arc::new(LocalFileStore::new(&config.base_path)),
        providers,
    )
    .with_options(config.recorder_options())
    .with_log(Arc::clone(&log));

    let stop = Arc::new(Notify::new());
    let signal = Arc::clone(&stop);
    ctrlc::set_handler(move || signal.notify_one()).context("Error setting Ctrl+C handler")?;

    let report = controller.start().await?;
    println!("Session {} started", report.session_id);
    for kind in &report.config.enabled_sensors {
        let interval = report.config.interval(*kind);
        println!(
            "  {kind}: every {} ms ({:.2} Hz)",
            interval.as_secs_f64() * 1000.0,
            interval_to_hz(interval)
        );
    }
    if report.location == LocationStatus::PermissionDenied {
        eprintln!("Warning: location permission not granted; recording without GPS");
    }
    for issue in &report.issues {
        eprintln!("Warning: {issue}");
    }
    println!();
    println!("Press Ctrl+C to stop");

    let deadline = async {
        match duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);
    let mut display = tokio::time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            _ = stop.notified() => break,
            _ = &mut deadline => break,
            _ = display.tick() => {
                let counts: Vec<String> = controller
                    .sample_counts()
                    .iter()
                    .map(|(kind, n)| format!("{kind}: {n}"))
                    .collect();
                println!(
                    "[{}] {}",
                    format_elapsed(controller.current_elapsed()),
                    counts.join(", ")
                );
            }
        }
    }

    println!();
    println!("Stopping measurement...");
    let report = controller.stop().await?;
    for path in &report.written {
        println!("  wrote {}", path.display());
    }
    for failure in &report.failures {
        eprintln!("  failed: {failure}");
    }
    println!(
        "Session {} finished after {}",
        report.session_id,
        format_elapsed(report.elapsed)
    );

    if let Err(e) = log.save() {
        eprintln!("Warning: Could not save recording stats: {e}");
    }
    Ok(())
}

async fn cmd_sessions(config: &Config) -> anyhow::Result<()> {
    let sessions = archive(config).list_sessions().await?;
    if sessions.is_empty() {
        println!("No sessions recorded yet.");
        println!("Run 'measure record' to start one.");
        return Ok(());
    }
    for session in sessions {
        println!("{session}");
    }
    Ok(())
}

async fn cmd_files(config: &Config, session: &str) -> anyhow::Result<()> {
    let files = archive(config).list_session_files(session).await?;
    if files.is_empty() {
        println!("Session {session} has no files.");
    }
    for file in files {
        println!("{file}");
    }
    Ok(())
}

async fn cmd_show(config: &Config, session: &str, file: &str) -> anyhow::Result<()> {
    let content = archive(config).read_session_file(session, file).await?;
    println!("{content}");
    Ok(())
}

async fn cmd_delete(config: &Config, session: &str, file: Option<String>) -> anyhow::Result<()> {
    let archive = archive(config);
    match file {
        Some(file) => {
            archive.delete_session_file(session, &file).await?;
            println!("Deleted {file} from {session}");
        }
        None => {
            archive.delete_session(session).await?;
            println!("Deleted session {session}");
        }
    }
    Ok(())
}

async fn cmd_settings(config: &Config, action: SettingsCommand) -> anyhow::Result<()> {
    let store = JsonFileSettingsStore::new(&config.settings_path);

    match action {
        SettingsCommand::Show => {
            for key in [SENSOR_SETTINGS_KEY, GENERAL_SETTINGS_KEY] {
                let value = store.get(key).await?;
                println!("{key}:");
                match value {
                    Some(v) => println!("{}", serde_json::to_string_pretty(&v)?),
                    None => println!("  (not set)"),
                }
            }
            println!();
            println!("Next session would use:");
            let resolved = SessionConfig::load(&store).await;
            println!("{}", serde_json::to_string_pretty(&resolved)?);
        }
        SettingsCommand::Sensors { list } => {
            let sensors = SensorSettings::from_csv(&list);
            let enabled = sensors.enabled();
            if enabled.is_empty() {
                bail!("At least one known sensor must be given (accelerometer, gyro, gps)");
            }
            let normalized = SensorSettings::from_kinds(enabled);
            store
                .set(SENSOR_SETTINGS_KEY, serde_json::to_value(&normalized)?)
                .await?;
            println!("Enabled sensors: {}", normalized.sensors.join(", "));
        }
        SettingsCommand::General(args) => {
            let mut general: GeneralSettings = match store.get(GENERAL_SETTINGS_KEY).await? {
                Some(v) => serde_json::from_value(v).unwrap_or_default(),
                None => GeneralSettings::default(),
            };
            apply_general(&mut general, args);
            store
                .set(GENERAL_SETTINGS_KEY, serde_json::to_value(&general)?)
                .await?;
            println!("{}", serde_json::to_string_pretty(&general)?);
        }
    }
    Ok(())
}

/// Overlay the given flags on the stored settings, filling device defaults.
fn apply_general(general: &mut GeneralSettings, args: GeneralArgs) {
    fn set(field: &mut Option<String>, value: Option<String>) {
        if let Some(v) = value {
            *field = Some(v).filter(|v| !v.trim().is_empty());
        }
    }

    set(&mut general.device.brand, args.device_brand);
    set(&mut general.device.model, args.device_model);
    set(&mut general.vehicle.brand, args.vehicle_brand);
    set(&mut general.vehicle.km, args.vehicle_km);
    set(&mut general.sensor.gps_rate, args.gps_rate);
    set(&mut general.sensor.accelerometer_rate, args.accelerometer_rate);
    set(&mut general.sensor.gyro_rate, args.gyro_rate);
    if let Some(mount) = args.mount_type {
        general.device.mount_type = Some(MountType::from(mount.to_ascii_uppercase()));
    }

    if general.device.brand.is_none() {
        general.device.brand = Some(std::env::consts::OS.to_string());
    }
    if general.device.model.is_none() {
        general.device.model = hostname::get()
            .ok()
            .map(|h| h.to_string_lossy().into_owned());
    }
}

fn cmd_status(config: &Config) -> anyhow::Result<()> {
    println!("Measurement Recorder Status");
    println!("===========================");
    println!();
    println!("Recordings: {}", config.base_path.join("files").display());
    println!("Settings:   {}", config.settings_path.display());
    println!();

    let stats_path = config.stats_path();
    if stats_path.exists() {
        println!("{}", create_shared_log_with_persistence(stats_path).summary());
    } else {
        println!("No previous session data found.");
    }
    Ok(())
}

fn cmd_config(config: &Config) -> anyhow::Result<()> {
    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
