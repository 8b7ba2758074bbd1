use anyhow::{Context, Result};
use inventory_collector::collector_core::{DiscoveryContext, ExceptionLog};
use inventory_collector::collectors::build_collectors;
use inventory_collector::config::CollectorConfig;
use inventory_collector::out::{BatchEmitter, OutMode, Sink, StdoutEmitter};
use inventory_collector::provider::aws::{caller_account, SdkClientProvider};
use inventory_collector::provider::fixture::{Fixture, FixtureProvider};
use inventory_collector::provider::ClientProvider;
use inventory_collector::utils::env_or;
use std::sync::Arc;
use tracing::{error, info};

const MOCK_ACCOUNT: &str = "000000000000";

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cfg = CollectorConfig::from_env().context("invalid collector settings")?;

    let (provider, account_id): (Arc<dyn ClientProvider>, String) = match &cfg.mock_fixture {
        Some(path) => {
            info!(fixture = %path, "MOCK_MODE: serving fixture instead of AWS");
            let fixture = Fixture::load(path).await?;
            let account = cfg.account_id.clone().unwrap_or_else(|| MOCK_ACCOUNT.to_string());
            let provider: Arc<dyn ClientProvider> = Arc::new(FixtureProvider::new(fixture));
            (provider, account)
        }
        None => {
            let account = match &cfg.account_id {
                Some(a) => a.clone(),
                None => caller_account(&cfg.regions[0]).await?,
            };
            let provider: Arc<dyn ClientProvider> = Arc::new(SdkClientProvider::new());
            (provider, account)
        }
    };

    let sink = match cfg.out_mode {
        OutMode::Stdout => Sink::Stdout(StdoutEmitter),
        OutMode::Http => {
            let endpoint = cfg.endpoint.clone().unwrap_or_default();
            Sink::Http(BatchEmitter::new(endpoint, cfg.batch_size, cfg.batch_flush_ms))
        }
    };
    let exceptions = ExceptionLog::new();
    let collectors = build_collectors(&cfg.services, provider, &cfg.windows());

    // 리전 단위 병렬 실행
    let (sink_ref, exceptions_ref, account) = (&sink, &exceptions, account_id.as_str());
    let tasks = collectors.iter().flat_map(|c| {
        cfg.regions.iter().map(move |region| async move {
            let ctx = DiscoveryContext {
                region,
                account_id: account,
                emitter: sink_ref,
                exceptions: exceptions_ref,
            };
            match c.discover(&ctx).await {
                Ok(summary) => summary.emitted,
                Err(e) => {
                    error!(collector = c.name(), region = %region, error = ?e, "Collector failed");
                    0
                }
            }
        })
    });
    let emitted: usize = futures::future::join_all(tasks).await.into_iter().sum();

    let sent = sink.finish().await?;
    info!(
        account = %account_id,
        emitted,
        sent,
        failures = exceptions.len(),
        "Discovery run complete"
    );
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if env_or("LOG_FORMAT", "text") == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
