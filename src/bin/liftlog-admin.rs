use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

use liftlog::config::{
    run_migrations, AdminAccount, AdminSeeder, AppConfig, DatabaseConfig, SeedOutcome, StorageConfig,
    UploadConfig,
};
use liftlog::repositories::{PgUserRepository, PgVideoRepository};
use liftlog::services::{FfmpegVideoProcessor, MaintenanceService, S3ObjectStorage};

#[derive(Parser)]
#[command(name = "liftlog-admin")]
#[command(about = "Bootstrap and maintenance tasks for the LiftLog backend", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the admin account unless the email is already registered
    CreateAdmin(AdminArgs),

    /// Reset the admin password, creating the account when missing
    ResetAdminPassword(AdminArgs),

    /// Recompute public URLs for every stored video
    FixVideoUrls,

    /// Generate thumbnails for videos that have none
    RegenerateThumbnails,
}

#[derive(Args)]
struct AdminArgs {
    /// Admin email address
    #[arg(long, default_value = "admin@liftlog.local")]
    email: String,

    /// Admin username
    #[arg(long, default_value = "admin")]
    username: String,

    /// Admin password
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    password: String,
}

impl From<AdminArgs> for AdminAccount {
    fn from(args: AdminArgs) -> Self {
        AdminAccount {
            email: args.email,
            username: args.username,
            password: args.password,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("liftlog=info")))
        .init();

    let cli = Cli::parse();

    let pool = DatabaseConfig::from_env()?.create_pool().await?;
    run_migrations(&pool).await?;

    match cli.command {
        Commands::CreateAdmin(args) => {
            let outcome = seeder(pool)?.ensure_admin(&args.into()).await?;
            report_seed(outcome);
        }
        Commands::ResetAdminPassword(args) => {
            let outcome = seeder(pool)?.reset_admin(&args.into()).await?;
            report_seed(outcome);
        }
        Commands::FixVideoUrls => {
            let summary = maintenance(pool).await?.fix_video_urls().await?;
            println!("Scanned {} videos, updated {}", summary.scanned, summary.updated);
        }
        Commands::RegenerateThumbnails => {
            let summary = maintenance(pool).await?.regenerate_thumbnails().await?;
            println!(
                "Processed {} videos: {} thumbnails generated, {} failed",
                summary.processed, summary.generated, summary.failed
            );
        }
    }

    Ok(())
}

fn seeder(pool: PgPool) -> Result<AdminSeeder> {
    let config = AppConfig::from_env()?;
    Ok(AdminSeeder::new(Arc::new(PgUserRepository::new(pool)), config.bcrypt_cost))
}

async fn maintenance(pool: PgPool) -> Result<MaintenanceService> {
    let storage = S3ObjectStorage::from_config(&StorageConfig::from_env()?).await;
    let processor = FfmpegVideoProcessor::new(&UploadConfig::from_env());
    Ok(MaintenanceService::new(
        Arc::new(PgVideoRepository::new(pool)),
        Arc::new(storage),
        Arc::new(processor),
    ))
}

fn report_seed(outcome: SeedOutcome) {
    match outcome {
        SeedOutcome::Created => println!("Admin account created"),
        SeedOutcome::AlreadyExists => println!("Admin account already exists, nothing to do"),
        SeedOutcome::PasswordReset => println!("Admin password reset"),
    }
}
