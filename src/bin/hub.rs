use std::sync::Arc;

use clap::Parser;
use service_watch::{
    config::{Config, StorageConfig, read_config_file},
    monitor::{Monitor, MonitorSettings},
    monitors::NetworkProber,
    notifications::{
        FanoutSink, NotificationSink, broadcast::BroadcastSink, webhook::WebhookSink,
    },
    storage::{MemoryRepository, Repository},
    util::{get_config_file, get_log_level},
};
use tracing::{info, instrument, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short, default_value_t = get_config_file())]
    file: String,
}

fn init() {
    let level = get_log_level();
    // the binary shares the library's crate name
    let filter = filter::Targets::new().with_target("service_watch", level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = read_config_file(&args.file)?;

    let repository = open_repository(&config).await?;
    let broadcast = Arc::new(BroadcastSink::new(256));
    let sink = notification_sink(&config, broadcast.clone())?;
    let prober = Arc::new(NetworkProber::new(config.probes)?);

    let monitor = Monitor::spawn(MonitorSettings::from(&config), repository, sink, prober);
    let scheduled = monitor.bootstrap().await?;
    info!("monitoring {scheduled} checks");

    #[cfg(feature = "api")]
    if let Some(api) = &config.api {
        use service_watch::api::{ApiConfig, ApiState, spawn_api_server};

        let state = ApiState::new(monitor.clone(), broadcast.sender());
        let addr = spawn_api_server(ApiConfig::from(api), state).await?;
        info!("API available at http://{addr}/api/v1");
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    monitor.shutdown().await;

    Ok(())
}

#[instrument(skip_all)]
async fn open_repository(config: &Config) -> anyhow::Result<Arc<dyn Repository>> {
    match &config.storage {
        StorageConfig::None => {
            let hosts = config.hosts.as_deref().unwrap_or_default();
            Ok(Arc::new(MemoryRepository::from_config(hosts).await?))
        }

        #[cfg(feature = "storage-sqlite")]
        StorageConfig::Sqlite { path } => {
            use service_watch::storage::sqlite::SqliteRepository;

            if config.hosts.is_some() {
                warn!("the hosts section only seeds the in-memory backend, ignoring it");
            }
            Ok(Arc::new(SqliteRepository::new(path).await?))
        }

        #[cfg(not(feature = "storage-sqlite"))]
        StorageConfig::Sqlite { .. } => {
            anyhow::bail!("SQLite storage requested but the storage-sqlite feature is disabled")
        }
    }
}

fn notification_sink(
    config: &Config,
    broadcast: Arc<BroadcastSink>,
) -> anyhow::Result<Arc<dyn NotificationSink>> {
    let mut fanout = FanoutSink::default();
    fanout.push(broadcast);

    if let Some(webhook) = &config.notifications.webhook {
        info!("publishing notifications to {}", webhook.url);
        fanout.push(Arc::new(WebhookSink::new(webhook)?));
    } else {
        warn!("no webhook configured, notifications stay in-process");
    }

    Ok(Arc::new(fanout))
}
