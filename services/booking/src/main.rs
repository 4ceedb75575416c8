//! Booking CLI
//!
//! Command-line interface for browsing the appointment catalogue and booking a slot.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::Level;

use booking::events::NoticeLevel;
use booking::flow::{find_doctor, find_specialty, run_booking, BookingRequest};
use booking::model::Slot;
use booking::{build_api, build_controller, load_config, Config};

#[derive(Parser)]
#[command(name = "booking")]
#[command(about = "Appointment booking client with time-boxed slot reservation")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Appointment API base URL (overrides config file)
    #[arg(long)]
    base_url: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the available specialties
    Specialties,

    /// List the doctors of a specialty
    Doctors {
        #[arg(long)]
        specialty: String,
    },

    /// List the free time slots of a doctor on a date
    Slots {
        #[arg(long)]
        specialty: String,
        #[arg(long)]
        doctor: String,
        /// Date as YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,
    },

    /// Hold a slot and confirm the appointment
    Book {
        #[arg(long)]
        specialty: String,
        #[arg(long)]
        doctor: String,
        /// Date as YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,
        /// Start time as HH:MM
        #[arg(long)]
        time: Slot,
        #[arg(long)]
        reason: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, base_url={:?}, log_level={:?}",
        args.config,
        args.base_url,
        args.log_level
    );

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    config.resolve_secrets()?;

    if let Some(base_url) = args.base_url {
        config.api.base_url = base_url;
    }

    let api = build_api(&config.api)?;

    match args.command {
        Command::Specialties => {
            for specialty in api.list_specialties().await? {
                println!("{}\t{}", specialty.id, specialty.name);
            }
        }
        Command::Doctors { specialty } => {
            let specialty = find_specialty(api.as_ref(), &specialty).await?;
            for doctor in api.list_doctors(specialty.id).await? {
                println!("{}\t{}", doctor.id, doctor.name);
            }
        }
        Command::Slots {
            specialty,
            doctor,
            date,
        } => {
            let specialty = find_specialty(api.as_ref(), &specialty).await?;
            let doctor = find_doctor(api.as_ref(), &specialty, &doctor).await?;
            for slot in api.list_available_slots(doctor.id, date).await? {
                println!("{}", slot);
            }
        }
        Command::Book {
            specialty,
            doctor,
            date,
            time,
            reason,
        } => {
            let controller = Arc::new(build_controller(api, &config.booking));
            let request = BookingRequest {
                specialty,
                doctor,
                date,
                time,
                reason,
            };

            let mut events = controller.subscribe();
            tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    if let Some(notice) = event.notice() {
                        match notice.level {
                            NoticeLevel::Info => tracing::info!("{}", notice.message),
                            NoticeLevel::Warning => tracing::warn!("{}", notice.message),
                            NoticeLevel::Error => tracing::error!("{}", notice.message),
                        }
                    }
                }
            });

            let cancel = CancellationToken::new();
            let cancel_for_signal = cancel.clone();
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for ctrl-c: {}", e);
                    return;
                }
                tracing::info!("Interrupt received");
                cancel_for_signal.cancel();
            });

            tracing::info!("Starting booking");
            let appointment = run_booking(
                controller,
                &request,
                config.booking.tick_interval(),
                cancel,
            )
            .await?;

            println!(
                "Appointment {} confirmed: {} at {}",
                appointment.id, appointment.date, appointment.time
            );
        }
    }

    Ok(())
}
