use clap::Parser;
use sqlx::migrate::Migrator;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arbor_core::cli::{AccrualCommands, Cli, Commands, DbCommands};
use arbor_core::config::Config;
use arbor_core::gateway::PostgresGateway;
use arbor_core::services::{scheduler, AccrualEngine};
use arbor_core::{cli, create_app, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    // Setup logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    match args.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Accrual(AccrualCommands::Run) => cli::handle_accrual_run(&config).await,
        Commands::Network { account_id } => cli::handle_network(&config, account_id).await,
        Commands::Db(DbCommands::Migrate) => cli::handle_db_migrate(&config).await,
        Commands::Config => cli::handle_config_validate(&config),
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let pool = db::create_pool(&config).await?;

    let migrator = Migrator::new(Path::new("./migrations")).await?;
    migrator.run(&pool).await?;
    tracing::info!("Database migrations completed");

    let gateway = Arc::new(PostgresGateway::new(pool));

    if let Some(expr) = &config.accrual_schedule {
        let schedule = cron::Schedule::from_str(expr)
            .map_err(|e| anyhow::anyhow!("Invalid ACCRUAL_SCHEDULE '{}': {}", expr, e))?;
        let engine = Arc::new(AccrualEngine::new(
            gateway.clone(),
            Duration::from_secs(config.accrual_deadline_secs),
        ));
        tokio::spawn(scheduler::run_scheduler(engine, schedule));
        tracing::info!("Accrual scheduler enabled: {}", expr);
    }

    let state = AppState {
        gateway,
        config: config.clone(),
    };
    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
