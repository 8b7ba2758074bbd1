//! Sub-resource enrichment.
//!
//! Each enrichment is one provider lookup keyed by a resource. It returns
//! `Ok(value)` to merge under its supplementary key, or the provider error;
//! [`merge`] turns an error into a failure marker under the same key so the
//! resource is still emitted.

use serde_json::{json, Map, Value};
use tracing::warn;

use crate::collector_core::ResourceEnvelope;
use crate::engine::{EngineFamily, EngineProfile, CONNECTIONS_METRIC};
use crate::error::ProviderError;
use crate::metrics::{MetricAggregator, MetricWindows};
use crate::provider::{
    list_all, BackupApi, DbCluster, DbInstance, Dimension, InstanceFilter, RdsApi, ServiceClients,
};

pub const TAGS_KEY: &str = "tags";
pub const SNAPSHOTS_KEY: &str = "dbSnapshot";
pub const MEMBERS_KEY: &str = "dbInstances";
pub const PROXIES_KEY: &str = "dbProxies";
pub const USAGE_KEY: &str = "staleDataMetrics";
pub const BACKUP_KEY: &str = "backupJobs";

pub type Enrichment = Result<Value, ProviderError>;

/// Marker merged in place of a failed enrichment.
pub fn failure_marker(err: &ProviderError) -> Value {
    json!({
        "failed": true,
        "errorKind": err.kind(),
        "errorCode": err.code(),
        "message": err.message(),
    })
}

pub fn merge(envelope: &mut ResourceEnvelope, key: &str, outcome: Enrichment) {
    match outcome {
        Ok(value) => envelope.merge_supplementary(key, value),
        Err(err) => {
            warn!(
                resource_id = %envelope.identity(),
                enrichment = key,
                error = %err,
                "Enrichment failed"
            );
            envelope.merge_supplementary(key, failure_marker(&err));
        }
    }
}

/// Tags go to the envelope's tag map; a failure is recorded under
/// supplementary `tags`.
pub fn merge_tags(envelope: &mut ResourceEnvelope, outcome: Result<Vec<(String, String)>, ProviderError>) {
    match outcome {
        Ok(tags) => envelope.merge_tags(tags),
        Err(err) => merge(envelope, TAGS_KEY, Err(err)),
    }
}

pub struct SubResourceEnricher<'a> {
    rds: &'a dyn RdsApi,
    backup: &'a dyn BackupApi,
    metrics: MetricAggregator<'a>,
}

impl<'a> SubResourceEnricher<'a> {
    pub fn new(clients: &'a ServiceClients, windows: MetricWindows) -> Self {
        Self {
            rds: clients.rds.as_ref(),
            backup: clients.backup.as_ref(),
            metrics: MetricAggregator::new(clients.cloudwatch.as_ref(), windows),
        }
    }

    pub fn metrics(&self) -> &MetricAggregator<'a> {
        &self.metrics
    }

    pub async fn tags(&self, arn: &str) -> Result<Vec<(String, String)>, ProviderError> {
        let tags = self.rds.list_tags_for_resource(arn).await?;
        Ok(tags.into_iter().map(|t| (t.key, t.value)).collect())
    }

    pub async fn instance_snapshots(&self, db: &DbInstance) -> Enrichment {
        let (rds, id) = (self.rds, db.db_instance_identifier.as_str());
        let snapshots = list_all(move |marker| rds.describe_db_snapshots(Some(id), marker)).await?;
        Ok(json!({ "dbSnapshots": snapshots }))
    }

    pub async fn cluster_snapshots(&self, cluster: &DbCluster) -> Enrichment {
        let (rds, id) = (self.rds, cluster.db_cluster_identifier.as_str());
        let snapshots =
            list_all(move |marker| rds.describe_db_cluster_snapshots(Some(id), marker)).await?;
        Ok(json!({ "dbClusterSnapshots": snapshots }))
    }

    pub async fn cluster_members(&self, cluster: &DbCluster) -> Enrichment {
        let members = self.members_of(cluster).await?;
        Ok(json!(members))
    }

    pub async fn instance_proxies(&self, db: &DbInstance) -> Enrichment {
        let (rds, name) = (self.rds, db.db_instance_identifier.as_str());
        let proxies = list_all(move |marker| rds.describe_db_proxies(Some(name), marker)).await?;
        Ok(json!(proxies))
    }

    pub async fn backup_jobs(&self, resource_arn: &str) -> Enrichment {
        let backup = self.backup;
        let jobs = list_all(move |token| backup.list_backup_jobs(resource_arn, token)).await?;
        Ok(json!(jobs))
    }

    pub async fn instance_usage(&self, db: &DbInstance) -> Enrichment {
        let mut all = Map::new();
        let (key, value) = self.instance_usage_entry(db).await?;
        all.insert(key, value);
        Ok(Value::Object(all))
    }

    /// Aurora clusters report IO at cluster level; any other cluster is
    /// measured per member instance.
    pub async fn cluster_usage(&self, cluster: &DbCluster) -> Enrichment {
        let mut all = Map::new();
        let family = cluster.engine.as_deref().map(EngineFamily::classify);
        if family == Some(EngineFamily::Clustered) {
            let profile = EngineFamily::Clustered.profile();
            let id = cluster.db_cluster_identifier.as_str();
            let series = self.usage_series(profile, id).await?;
            all.insert(format!("{id}:cluster"), series);
        } else {
            for db in self.members_of(cluster).await? {
                let (key, value) = self.instance_usage_entry(&db).await?;
                all.insert(key, value);
            }
        }
        Ok(Value::Object(all))
    }

    async fn members_of(&self, cluster: &DbCluster) -> Result<Vec<DbInstance>, ProviderError> {
        let (rds, arn) = (self.rds, cluster.db_cluster_arn.as_str());
        list_all(move |marker| rds.describe_db_instances(InstanceFilter::ClusterMembers(arn), marker))
            .await
    }

    async fn instance_usage_entry(&self, db: &DbInstance) -> Result<(String, Value), ProviderError> {
        // instance-level IO is ReadIOPS/WriteIOPS for every engine
        let profile = match db.engine.as_deref().map(EngineFamily::classify) {
            Some(EngineFamily::Document) => EngineFamily::Document.profile(),
            _ => EngineFamily::Standard.profile(),
        };
        let id = db.db_instance_identifier.as_str();
        let series = self.usage_series(profile, id).await?;
        Ok((format!("{id}:instance"), series))
    }

    async fn usage_series(&self, profile: &EngineProfile, id: &str) -> Enrichment {
        let dimensions = [Dimension::new(profile.usage_dimension, id)];
        let connections = self
            .metrics
            .stale_sum(profile.namespace, CONNECTIONS_METRIC, &dimensions)
            .await?;
        let writes = self
            .metrics
            .stale_avg(profile.namespace, profile.write_metric, &dimensions)
            .await?;
        let reads = self
            .metrics
            .stale_avg(profile.namespace, profile.read_metric, &dimensions)
            .await?;

        let mut series = Map::new();
        series.insert(CONNECTIONS_METRIC.to_string(), json!(connections));
        series.insert(profile.write_metric.to_string(), json!(writes));
        series.insert(profile.read_metric.to_string(), json!(reads));
        Ok(Value::Object(series))
    }
}
