mod cli;
mod metrics;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cookbook_core::{
    create_event_channel, create_identity_provider, load_config, validate_config, CatalogService,
    Config, ConnectivityFlag, EventEnvelope, Record, ReqwestTransport, SanitizedConfig,
    ServiceDeps, SqliteCatalogStore,
};

use cli::{Cli, Command};

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli) {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli
        .config
        .clone()
        .or_else(|| std::env::var("COOKBOOK_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    if let Command::Config = cli.command {
        let sanitized = SanitizedConfig::from(&config);
        println!("{}", serde_json::to_string_pretty(&sanitized)?);
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.runtime.worker_threads)
        .enable_all()
        .build()
        .context("Failed to build runtime")?;

    let result = runtime.block_on(execute(&cli, &config));
    if cli.metrics {
        eprintln!("{}", metrics::gather_metrics());
    }
    result
}

async fn execute(cli: &Cli, config: &Config) -> Result<()> {
    let identity =
        create_identity_provider(&config.auth).context("Failed to create identity provider")?;
    info!("Using identity: {}", identity.method_name());

    let transport =
        Arc::new(ReqwestTransport::new(&config.remote).context("Failed to build HTTP client")?);
    let store = Arc::new(
        SqliteCatalogStore::new(&config.database.path).context("Failed to open catalog store")?,
    );
    info!("Database path: {:?}", config.database.path);

    let (events, receiver) = create_event_channel(config.runtime.event_buffer);
    let service = CatalogService::new(
        config,
        ServiceDeps {
            transport,
            identity,
            connectivity: Arc::new(ConnectivityFlag::new(!cli.offline)),
            store: store.clone(),
            liked: store,
            events,
        },
    );

    // Work runs on the pool; this task is the delivery context. The channel
    // closes once the service (and every handle it holds) is dropped.
    let command = tokio::spawn(run_command(service, cli.command.clone()));
    receiver.run(deliver).await;

    command.await.context("Command task failed")?
}

async fn run_command(service: CatalogService, command: Command) -> Result<()> {
    match &command {
        Command::Sync => {
            let result = service.sync().await.context("Sync failed")?;
            if let Some(reason) = &result.degraded {
                warn!("Showing cached catalog: {}", reason);
            }
            println!(
                "source={} added={} updated={} removed={} skipped={}",
                result.source.as_str(),
                result.added.len(),
                result.updated.len(),
                result.removed_ids.len(),
                result.skipped
            );
            print_records(&result.records);
        }
        Command::Search { query } => {
            let results = service.search(query).await.context("Search failed")?;
            print_records(&results.records);
        }
        Command::Like { id } | Command::Unlike { id } => {
            let liked = matches!(command, Command::Like { .. });
            let mutation = service
                .set_liked(*id, liked)
                .await
                .with_context(|| format!("Could not update like for record {}", id))?;
            println!("record {} liked={}", id, mutation.effective_value());
        }
        Command::Favorites => {
            let records = service.favorites().await.context("Could not read favorites")?;
            print_records(&records);
        }
        Command::Filter { .. } => {
            if let Some(filter) = command.category() {
                let records = service
                    .filter_by_category(&filter)
                    .await
                    .context("Could not filter catalog")?;
                print_records(&records);
            }
        }
        Command::Delete { id } => {
            service
                .delete_record(*id)
                .await
                .with_context(|| format!("Could not delete record {}", id))?;
            println!("record {} deleted", id);
        }
        Command::Config => {}
    }
    Ok(())
}

fn deliver(envelope: EventEnvelope) {
    match serde_json::to_string(&envelope.event) {
        Ok(json) => info!(event = envelope.event.event_type(), "{}", json),
        Err(e) => warn!(error = %e, "Failed to serialize event"),
    }
}

fn print_records(records: &[Record]) {
    for record in records {
        let marker = if record.liked { "*" } else { " " };
        println!("{} {:>6}  {}", marker, record.id, record.title);
    }
}
