use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::{mask_password, Config};
use crate::domain::Caller;
use crate::gateway::PostgresGateway;
use crate::services::{AccrualEngine, ReferralNetwork};

#[derive(Parser)]
#[command(name = "arbor-core")]
#[command(about = "Arbor Core - referral network and yield accrual engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Yield accrual commands
    #[command(subcommand)]
    Accrual(AccrualCommands),

    /// Print the referral commission report for an account
    Network {
        /// Account UUID
        #[arg(value_name = "ACCOUNT_ID")]
        account_id: Uuid,
    },

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Configuration validation
    Config,
}

#[derive(Subcommand)]
pub enum AccrualCommands {
    /// Run one accrual cycle over all enrolled accounts
    Run,
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

pub async fn handle_accrual_run(config: &Config) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;
    let gateway = Arc::new(PostgresGateway::new(pool));
    let engine = AccrualEngine::new(
        gateway,
        Duration::from_secs(config.accrual_deadline_secs),
    );

    let summary = engine.run_cycle(&Caller::admin("cli")).await?;

    println!("✓ Accrual cycle finished");
    println!("  Processed: {}", summary.processed);
    println!("  Skipped:   {}", summary.skipped);
    println!("  Failed:    {}", summary.failed.len());
    for id in &summary.failed {
        println!("    - {}", id);
    }

    Ok(())
}

pub async fn handle_network(config: &Config, account_id: Uuid) -> anyhow::Result<()> {
    let pool = crate::db::create_pool(config).await?;
    let gateway = Arc::new(PostgresGateway::new(pool));
    let service = ReferralNetwork::new(
        gateway,
        Duration::from_secs(config.network_deadline_secs),
    );

    let report = service.compute(account_id).await?;

    println!("Referral network for account {}", account_id);
    for level in &report.levels {
        println!("Level {} ({} account(s), total commission {}):", level.level, level.entries.len(), level.total);
        for entry in &level.entries {
            println!(
                "  {}  volume {}  commission {}",
                entry.account_id, entry.volume, entry.commission
            );
        }
    }

    Ok(())
}

pub async fn handle_db_migrate(config: &Config) -> anyhow::Result<()> {
    use sqlx::migrate::Migrator;
    use std::path::Path;

    let pool = crate::db::create_pool(config).await?;
    let migrator = Migrator::new(Path::new("./migrations")).await?;

    tracing::info!("Running database migrations...");
    migrator.run(&pool).await?;

    tracing::info!("Database migrations completed");
    println!("✓ Database migrations completed");

    Ok(())
}

pub fn handle_config_validate(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");

    println!("Configuration:");
    println!("  Server Port: {}", config.server_port);
    println!("  Database URL: {}", mask_password(&config.database_url));
    println!(
        "  Accrual Schedule: {}",
        config.accrual_schedule.as_deref().unwrap_or("(manual)")
    );
    println!("  Accrual Deadline: {}s", config.accrual_deadline_secs);
    println!("  Network Deadline: {}s", config.network_deadline_secs);

    if let Some(expr) = &config.accrual_schedule {
        use std::str::FromStr;
        cron::Schedule::from_str(expr)
            .map_err(|e| anyhow::anyhow!("ACCRUAL_SCHEDULE is not a valid cron expression: {}", e))?;
    }

    tracing::info!("Configuration is valid");
    println!("✓ Configuration is valid");

    Ok(())
}
