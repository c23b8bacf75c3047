//! `fingerlink`: drive an R307 fingerprint station from the command line.
//!
//! # Commands
//!
//! - `enroll`: capture a finger twice and register it
//! - `identify`: wait for a finger and record the access
//! - `sync`: delete templates the remote index does not claim
//! - `delete <position>`: delete one template and deactivate its owner
//! - `positions`: list occupied positions and their owners
//! - `ping`: test the connection to the module

mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::{AppConfig, StoreBackend};
use fingerlink_core::Position;
use fingerlink_engine::{EnrollmentRequest, Station};
use fingerlink_hardware::{Sensor, SerialTransport};
use fingerlink_storage::{Directory, FirebaseStore, MemoryStore, RemoteStore};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "fingerlink")]
#[command(version)]
#[command(about = "Fingerprint enrollment, identification and sync for R307 modules")]
struct Cli {
    /// Config file (default: ./fingerlink.toml or $FINGERLINK_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Serial port of the module
    #[arg(long, global = true)]
    port: Option<String>,

    /// Base URL of the remote store
    #[arg(long, global = true)]
    store_url: Option<String>,

    /// Keep remote records in memory instead of the remote store
    #[arg(long, global = true)]
    offline: bool,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new finger in the lowest free position
    Enroll {
        #[arg(long)]
        nombre: Option<String>,
        #[arg(long)]
        apellido: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Identify one finger
    Identify,
    /// Remove templates without an index entry
    Sync,
    /// Delete the template at a position
    Delete { position: Position },
    /// List occupied positions
    Positions,
    /// Test the connection to the module
    Ping,
}

impl Cli {
    /// Flags win over file and environment.
    fn apply_to(&self, config: &mut AppConfig) {
        if let Some(port) = &self.port {
            config.sensor.port = port.clone();
        }
        if let Some(url) = &self.store_url {
            config.store.base_url = url.clone();
        }
        if self.offline {
            config.store.backend = StoreBackend::Memory;
        }
        match self.verbose {
            0 => {}
            1 => config.log_level = "debug".to_string(),
            _ => config.log_level = "trace".to_string(),
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = config::load_config(cli.config.as_deref())?;
    cli.apply_to(&mut config);
    init_tracing(&config.log_level);

    let sensor_config = config.sensor_config();
    let transport = SerialTransport::open(&sensor_config)
        .with_context(|| format!("opening sensor on {}", sensor_config.port))?;
    let mut sensor = Sensor::new(transport, &sensor_config);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping");
            on_interrupt.cancel();
        }
    });

    match config.store.backend {
        StoreBackend::Firebase => {
            let store = FirebaseStore::new(&config.store_config())?;
            let station = Station::new(Directory::new(store), config.engine_config())
                .with_cancellation(cancel);
            run(&station, &mut sensor, cli.command).await
        }
        StoreBackend::Memory => {
            info!("Using in-memory store, records are discarded on exit");
            let station = Station::new(Directory::new(MemoryStore::new()), config.engine_config())
                .with_cancellation(cancel);
            run(&station, &mut sensor, cli.command).await
        }
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn run<S: RemoteStore>(
    station: &Station<S>,
    sensor: &mut Sensor<SerialTransport>,
    command: Commands,
) -> anyhow::Result<ExitCode> {
    let code = match command {
        Commands::Enroll {
            nombre,
            apellido,
            email,
        } => {
            let mut request = EnrollmentRequest::new();
            if let Some(nombre) = nombre {
                request = request.with_nombre(nombre);
            }
            if let Some(apellido) = apellido {
                request = request.with_apellido(apellido);
            }
            if let Some(email) = email {
                request = request.with_email(email);
            }

            let outcome = station.enroll(sensor, &request).await;
            println!("{}", outcome.message());
            if let Some(position) = outcome.stored_position() {
                println!("Posicion: {position}");
            }
            exit_code(outcome.is_enrolled())
        }
        Commands::Identify => {
            let outcome = station.identify(sensor).await;
            println!("{}", outcome.message());
            exit_code(outcome.is_authorized())
        }
        Commands::Sync => {
            let outcome = station.reconcile(sensor).await;
            println!("{}", outcome.message());
            if let Some(report) = outcome.report() {
                println!(
                    "Sensor: {} -> {}, indexadas: {}, eliminadas: {}/{}",
                    report.posiciones_sensor_inicial,
                    report.posiciones_sensor_final,
                    report.posiciones_firebase,
                    report.huellas_eliminadas_exitosamente,
                    report.huellas_identificadas_eliminar,
                );
                for position in &report.huellas_huerfanas_restantes {
                    println!("  huerfana: {position}");
                }
            }
            exit_code(outcome.is_successful())
        }
        Commands::Delete { position } => {
            let outcome = station.remove(sensor, position).await;
            println!("{}", outcome.message());
            exit_code(outcome.is_removed())
        }
        Commands::Positions => {
            let inventory = station.inventory(sensor).await?;
            for entry in &inventory.entries {
                match &entry.index {
                    Some(index) => {
                        let estado = if index.activo { "activo" } else { "inactivo" };
                        println!("  {}: {} ({estado})", entry.position, index.nombre);
                    }
                    None => println!("  {}: sin datos remotos", entry.position),
                }
            }
            println!("Total: {} posiciones ocupadas", inventory.total());
            ExitCode::SUCCESS
        }
        Commands::Ping => {
            station.check_connection(sensor).await?;
            println!("Sensor conectado");
            ExitCode::SUCCESS
        }
    };
    Ok(code)
}
