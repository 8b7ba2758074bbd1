use crate::collector_core::*;
use crate::enrich::{
    self, SubResourceEnricher, BACKUP_KEY, MEMBERS_KEY, PROXIES_KEY, SNAPSHOTS_KEY, USAGE_KEY,
};
use crate::error::ProviderError;
use crate::metrics::MetricWindows;
use crate::provider::{list_all, ClientProvider, DbCluster, DbInstance, InstanceFilter, RdsApi};
use crate::size::{resolve_cluster_size, resolve_instance_size};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct RdsCollector {
    provider: Arc<dyn ClientProvider>,
    windows: MetricWindows,
}

impl RdsCollector {
    pub fn new(provider: Arc<dyn ClientProvider>, windows: MetricWindows) -> Self {
        Self { provider, windows }
    }
}

#[async_trait]
impl Collector for RdsCollector {
    fn name(&self) -> &'static str { "rds" }

    async fn discover(&self, ctx: &DiscoveryContext<'_>) -> anyhow::Result<DiscoverySummary> {
        let clients = self
            .provider
            .open(ctx.region)
            .await
            .with_context(|| format!("opening RDS clients for {}", ctx.region))?;

        let mut pass = RdsPass {
            ctx,
            rds: clients.rds.as_ref(),
            enricher: SubResourceEnricher::new(&clients, self.windows.clone()),
            summary: DiscoverySummary::default(),
        };
        pass.run().await;
        let summary = pass.summary;

        info!(
            region = %ctx.region,
            emitted = summary.emitted,
            failed_categories = summary.failed_categories.len(),
            "RDS discovery finished"
        );
        Ok(summary)
    }
}

/// One sequential pass over every RDS category in one region.
struct RdsPass<'a> {
    ctx: &'a DiscoveryContext<'a>,
    rds: &'a dyn RdsApi,
    enricher: SubResourceEnricher<'a>,
    summary: DiscoverySummary,
}

impl<'a> RdsPass<'a> {
    async fn run(&mut self) {
        let proxies = self.proxies().await;
        self.settle(ResourceType::DbProxy, proxies);
        let snapshots = self.snapshots().await;
        self.settle(ResourceType::DbSnapshot, snapshots);
        let instances = self.instances().await;
        self.settle(ResourceType::DbInstance, instances);
        let clusters = self.clusters().await;
        self.settle(ResourceType::DbCluster, clusters);
    }

    /// A failed listing skips its category and is reported once.
    fn settle(&mut self, resource_type: ResourceType, outcome: Result<(), ProviderError>) {
        if let Err(err) = outcome {
            self.ctx
                .exceptions
                .on_discovery_exception(resource_type, None, self.ctx.region, &err);
            self.summary.failed_categories.push(resource_type);
        }
    }

    async fn proxies(&mut self) -> Result<(), ProviderError> {
        let rds = self.rds;
        let proxies = list_all(move |marker| rds.describe_db_proxies(None, marker)).await?;
        for proxy in &proxies {
            if let Some(env) = self.skeleton(
                ResourceType::DbProxy,
                &proxy.db_proxy_arn,
                &proxy.db_proxy_name,
                proxy.created_date,
                proxy,
            ) {
                self.emit(env);
            }
        }
        Ok(())
    }

    async fn snapshots(&mut self) -> Result<(), ProviderError> {
        let rds = self.rds;
        let snapshots = list_all(move |marker| rds.describe_db_snapshots(None, marker)).await?;
        for snapshot in &snapshots {
            if let Some(env) = self.skeleton(
                ResourceType::DbSnapshot,
                &snapshot.db_snapshot_arn,
                &snapshot.db_snapshot_identifier,
                snapshot.snapshot_create_time.or(snapshot.instance_create_time),
                snapshot,
            ) {
                self.emit(env);
            }
        }
        Ok(())
    }

    async fn instances(&mut self) -> Result<(), ProviderError> {
        let rds = self.rds;
        let instances =
            list_all(move |marker| rds.describe_db_instances(InstanceFilter::All, marker)).await?;
        // cluster members are reported through their cluster
        for db in instances.iter().filter(|db| db.db_cluster_identifier.is_none()) {
            if let Some(env) = self.skeleton(
                ResourceType::DbInstance,
                &db.db_instance_arn,
                &db.db_instance_identifier,
                db.instance_create_time,
                db,
            ) {
                let env = self.enrich_instance(db, env).await;
                self.emit(env);
            }
        }
        Ok(())
    }

    async fn clusters(&mut self) -> Result<(), ProviderError> {
        let rds = self.rds;
        let clusters = list_all(move |marker| rds.describe_db_clusters(marker)).await?;
        for cluster in &clusters {
            if let Some(env) = self.skeleton(
                ResourceType::DbCluster,
                &cluster.db_cluster_arn,
                &cluster.db_cluster_identifier,
                cluster.cluster_create_time,
                cluster,
            ) {
                let env = self.enrich_cluster(cluster, env).await;
                self.emit(env);
            }
        }
        Ok(())
    }

    async fn enrich_instance(&self, db: &DbInstance, mut env: ResourceEnvelope) -> ResourceEnvelope {
        let e = &self.enricher;
        enrich::merge_tags(&mut env, e.tags(&db.db_instance_arn).await);
        enrich::merge(&mut env, SNAPSHOTS_KEY, e.instance_snapshots(db).await);
        let size = resolve_instance_size(e.metrics(), db, &mut env).await;
        debug!(resource_id = %db.db_instance_arn, outcome = ?size, "Size resolved");
        enrich::merge(&mut env, PROXIES_KEY, e.instance_proxies(db).await);
        enrich::merge(&mut env, USAGE_KEY, e.instance_usage(db).await);
        enrich::merge(&mut env, BACKUP_KEY, e.backup_jobs(&db.db_instance_arn).await);
        env
    }

    async fn enrich_cluster(&self, cluster: &DbCluster, mut env: ResourceEnvelope) -> ResourceEnvelope {
        let e = &self.enricher;
        enrich::merge_tags(&mut env, e.tags(&cluster.db_cluster_arn).await);
        enrich::merge(&mut env, MEMBERS_KEY, e.cluster_members(cluster).await);
        enrich::merge(&mut env, SNAPSHOTS_KEY, e.cluster_snapshots(cluster).await);
        let size = resolve_cluster_size(e.metrics(), cluster, &mut env).await;
        debug!(resource_id = %cluster.db_cluster_arn, outcome = ?size, "Size resolved");
        enrich::merge(&mut env, BACKUP_KEY, e.backup_jobs(&cluster.db_cluster_arn).await);
        enrich::merge(&mut env, USAGE_KEY, e.cluster_usage(cluster).await);
        env
    }

    fn skeleton<T: Serialize>(
        &self,
        resource_type: ResourceType,
        identity: &str,
        display_name: &str,
        creation_timestamp: Option<DateTime<Utc>>,
        raw: &T,
    ) -> Option<ResourceEnvelope> {
        if creation_timestamp.is_none() {
            warn!(resource_id = %identity, resource_type = %resource_type, "Resource has no creation time");
        }
        let built = configuration_of(identity, raw).and_then(|configuration| {
            ResourceEnvelope::new(EnvelopeConfig {
                identity: identity.to_string(),
                display_name: display_name.to_string(),
                resource_type,
                account_id: self.ctx.account_id.to_string(),
                region: self.ctx.region.to_string(),
                configuration,
                creation_timestamp,
            })
        });
        match built {
            Ok(env) => Some(env),
            Err(err) => {
                warn!(resource_type = %resource_type, error = %err, "Skipping resource");
                None
            }
        }
    }

    fn emit(&mut self, env: ResourceEnvelope) {
        match env.to_document() {
            Ok(doc) => {
                self.ctx.emitter.emit(env.resource_type().emit_tag(), doc);
                self.summary.emitted += 1;
            }
            Err(err) => {
                warn!(resource_id = %env.identity(), error = %err, "Failed to render envelope");
            }
        }
    }
}
