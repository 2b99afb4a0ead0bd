use clap::{Parser, Subcommand};
use clinic_core::config::database_url_from_env_value;
use clinic_core::{db, CoreConfig, DoctorService, SqlitePool, UserService};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "clinic")]
#[command(about = "Clinic records administration CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    InitDb,
    /// List all user accounts
    ListUsers,
    /// Enable or disable a user account
    SetUserActive {
        /// Username of the account
        username: String,
        /// `true` to enable, `false` to disable
        #[arg(action = clap::ArgAction::Set)]
        active: bool,
    },
    /// List every doctor, including deactivated ones
    ListDoctors,
    /// Activate or deactivate a doctor
    SetDoctorActive {
        /// Doctor id
        id: i64,
        /// `true` to activate, `false` to deactivate
        #[arg(action = clap::ArgAction::Set)]
        active: bool,
    },
}

/// Open the configured database, creating the schema if needed.
async fn open_pool() -> anyhow::Result<SqlitePool> {
    let cfg = CoreConfig::new(database_url_from_env_value(
        std::env::var("DATABASE_URL").ok(),
    ))?;
    let pool = db::connect(&cfg).await?;
    db::init_schema(&pool).await?;
    Ok(pool)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clinic_cli=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::InitDb) => {
            open_pool().await?;
            println!("Database schema is ready.");
        }
        Some(Commands::ListUsers) => {
            let users = UserService::new(open_pool().await?).list().await?;
            if users.is_empty() {
                println!("No users found.");
            } else {
                for user in users {
                    println!(
                        "ID: {}, Username: {}, Email: {}, Active: {}",
                        user.id, user.username, user.email, user.is_active
                    );
                }
            }
        }
        Some(Commands::SetUserActive { username, active }) => {
            match UserService::new(open_pool().await?)
                .set_active(&username, active)
                .await
            {
                Ok(user) => println!("User {} active: {}", user.username, user.is_active),
                Err(e) => eprintln!("Error updating user {}: {}", username, e),
            }
        }
        Some(Commands::ListDoctors) => {
            let doctors = DoctorService::new(open_pool().await?).list_all().await?;
            if doctors.is_empty() {
                println!("No doctors found.");
            } else {
                for doctor in doctors {
                    println!(
                        "ID: {}, Name: {}, Specialization: {}, License: {}, Active: {}",
                        doctor.id,
                        doctor.full_name(),
                        doctor.specialization.label(),
                        doctor.license_number,
                        doctor.is_active
                    );
                }
            }
        }
        Some(Commands::SetDoctorActive { id, active }) => {
            match DoctorService::new(open_pool().await?)
                .set_active(id, active)
                .await
            {
                Ok(doctor) => println!("{} active: {}", doctor.full_name(), doctor.is_active),
                Err(e) => eprintln!("Error updating doctor {}: {}", id, e),
            }
        }
        None => {
            println!("Use 'clinic --help' for commands");
        }
    }

    Ok(())
}
