//! In-memory provider backed by a JSON fixture.
//!
//! Serves the same ports as the SDK adapters so the collector can run with
//! `MOCK_MODE=<fixture.json>` and without AWS credentials. Failures can be
//! injected per operation (or per metric name) to exercise degraded paths.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{
    BackupApi, BackupJob, ClientProvider, CloudWatchApi, DbCluster, DbClusterSnapshot, DbInstance,
    DbProxy, DbSnapshot, Dimension, InstanceFilter, MetricPoint, MetricQuery, Page, RdsApi,
    ServiceClients, Tag,
};
use crate::error::{ConfigError, ProviderError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FixtureMetric {
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: Vec<Dimension>,
    pub datapoints: Vec<MetricPoint>,
}

/// Provider state served by [`FixtureProvider`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Fixture {
    pub db_instances: Vec<DbInstance>,
    pub db_clusters: Vec<DbCluster>,
    pub db_snapshots: Vec<DbSnapshot>,
    pub db_cluster_snapshots: Vec<DbClusterSnapshot>,
    pub db_proxies: Vec<DbProxy>,
    /// resource ARN → tags
    pub tags: HashMap<String, Vec<Tag>>,
    pub metrics: Vec<FixtureMetric>,
    pub backup_jobs: Vec<BackupJob>,
    /// Items per listing page; everything on one page when unset.
    pub page_size: Option<usize>,
}

impl Fixture {
    pub async fn load(path: &str) -> Result<Self, ConfigError> {
        let data = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::io(path, e))?;
        Ok(serde_json::from_str(&data)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    DescribeDbInstances,
    DescribeDbClusters,
    DescribeDbSnapshots,
    DescribeDbClusterSnapshots,
    DescribeDbProxies,
    ListTagsForResource,
    GetMetricStatistics,
    ListBackupJobs,
}

#[derive(Debug, Default)]
struct FixtureState {
    failures: Mutex<HashMap<Operation, ProviderError>>,
    metric_failures: Mutex<HashMap<String, ProviderError>>,
    queries: Mutex<Vec<MetricQuery>>,
    calls: Mutex<Vec<Operation>>,
    opened: AtomicUsize,
    live: AtomicUsize,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Default)]
pub struct FixtureProvider {
    fixture: Arc<Fixture>,
    state: Arc<FixtureState>,
}

impl FixtureProvider {
    pub fn new(fixture: Fixture) -> Self {
        Self {
            fixture: Arc::new(fixture),
            state: Arc::default(),
        }
    }

    /// Make every call of `op` fail with `err`.
    pub fn fail(&self, op: Operation, err: ProviderError) {
        lock(&self.state.failures).insert(op, err);
    }

    /// Make metric queries for `metric_name` fail with `err`.
    pub fn fail_metric(&self, metric_name: &str, err: ProviderError) {
        lock(&self.state.metric_failures).insert(metric_name.to_string(), err);
    }

    pub fn metric_queries(&self) -> Vec<MetricQuery> {
        lock(&self.state.queries).clone()
    }

    pub fn calls(&self, op: Operation) -> usize {
        lock(&self.state.calls).iter().filter(|c| **c == op).count()
    }

    /// Number of client scopes opened so far.
    pub fn opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    /// Clients currently held by a pass.
    pub fn live_clients(&self) -> usize {
        self.state.live.load(Ordering::SeqCst)
    }

    fn session(&self) -> FixtureSession {
        self.state.live.fetch_add(1, Ordering::SeqCst);
        FixtureSession {
            fixture: Arc::clone(&self.fixture),
            state: Arc::clone(&self.state),
        }
    }
}

#[async_trait]
impl ClientProvider for FixtureProvider {
    async fn open(&self, _region: &str) -> Result<ServiceClients, ProviderError> {
        self.state.opened.fetch_add(1, Ordering::SeqCst);
        Ok(ServiceClients {
            rds: Box::new(self.session()),
            cloudwatch: Box::new(self.session()),
            backup: Box::new(self.session()),
        })
    }
}

struct FixtureSession {
    fixture: Arc<Fixture>,
    state: Arc<FixtureState>,
}

impl Drop for FixtureSession {
    fn drop(&mut self) {
        self.state.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FixtureSession {
    fn call(&self, op: Operation) -> Result<(), ProviderError> {
        lock(&self.state.calls).push(op);
        match lock(&self.state.failures).get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn page<T: Clone>(&self, items: Vec<T>, marker: Option<String>) -> Result<Page<T>, ProviderError> {
        let Some(size) = self.fixture.page_size.filter(|s| *s > 0) else {
            return Ok(Page::last(items));
        };
        let start = match marker {
            Some(m) => m
                .parse::<usize>()
                .map_err(|_| ProviderError::service("InvalidParameterValue", format!("bad marker {m}")))?,
            None => 0,
        };
        let end = (start + size).min(items.len());
        let page = items.get(start..end).map(<[T]>::to_vec).unwrap_or_default();
        let marker = (end < items.len()).then(|| end.to_string());
        Ok(Page { items: page, marker })
    }

    fn cluster_identifier<'a>(&'a self, id_or_arn: &'a str) -> &'a str {
        self.fixture
            .db_clusters
            .iter()
            .find(|c| c.db_cluster_arn == id_or_arn)
            .map(|c| c.db_cluster_identifier.as_str())
            .unwrap_or(id_or_arn)
    }
}

#[async_trait]
impl RdsApi for FixtureSession {
    async fn describe_db_instances(
        &self,
        filter: InstanceFilter<'_>,
        marker: Option<String>,
    ) -> Result<Page<DbInstance>, ProviderError> {
        self.call(Operation::DescribeDbInstances)?;
        let items = match filter {
            InstanceFilter::All => self.fixture.db_instances.clone(),
            InstanceFilter::ClusterMembers(cluster) => {
                let cluster = self.cluster_identifier(cluster);
                self.fixture
                    .db_instances
                    .iter()
                    .filter(|db| db.db_cluster_identifier.as_deref() == Some(cluster))
                    .cloned()
                    .collect()
            }
        };
        self.page(items, marker)
    }

    async fn describe_db_clusters(
        &self,
        marker: Option<String>,
    ) -> Result<Page<DbCluster>, ProviderError> {
        self.call(Operation::DescribeDbClusters)?;
        self.page(self.fixture.db_clusters.clone(), marker)
    }

    async fn describe_db_snapshots(
        &self,
        db_instance_identifier: Option<&str>,
        marker: Option<String>,
    ) -> Result<Page<DbSnapshot>, ProviderError> {
        self.call(Operation::DescribeDbSnapshots)?;
        let items = self
            .fixture
            .db_snapshots
            .iter()
            .filter(|s| {
                db_instance_identifier.is_none()
                    || s.db_instance_identifier.as_deref() == db_instance_identifier
            })
            .cloned()
            .collect();
        self.page(items, marker)
    }

    async fn describe_db_cluster_snapshots(
        &self,
        db_cluster_identifier: Option<&str>,
        marker: Option<String>,
    ) -> Result<Page<DbClusterSnapshot>, ProviderError> {
        self.call(Operation::DescribeDbClusterSnapshots)?;
        let items = self
            .fixture
            .db_cluster_snapshots
            .iter()
            .filter(|s| {
                db_cluster_identifier.is_none()
                    || s.db_cluster_identifier.as_deref() == db_cluster_identifier
            })
            .cloned()
            .collect();
        self.page(items, marker)
    }

    async fn describe_db_proxies(
        &self,
        db_proxy_name: Option<&str>,
        marker: Option<String>,
    ) -> Result<Page<DbProxy>, ProviderError> {
        self.call(Operation::DescribeDbProxies)?;
        let Some(name) = db_proxy_name else {
            return self.page(self.fixture.db_proxies.clone(), marker);
        };
        let items: Vec<DbProxy> = self
            .fixture
            .db_proxies
            .iter()
            .filter(|p| p.db_proxy_name == name)
            .cloned()
            .collect();
        if items.is_empty() {
            return Err(ProviderError::service(
                "DBProxyNotFoundFault",
                format!("DBProxy {name} not found."),
            ));
        }
        self.page(items, marker)
    }

    async fn list_tags_for_resource(&self, resource_arn: &str) -> Result<Vec<Tag>, ProviderError> {
        self.call(Operation::ListTagsForResource)?;
        Ok(self.fixture.tags.get(resource_arn).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl CloudWatchApi for FixtureSession {
    async fn get_metric_statistics(
        &self,
        query: &MetricQuery,
    ) -> Result<Vec<MetricPoint>, ProviderError> {
        lock(&self.state.queries).push(query.clone());
        self.call(Operation::GetMetricStatistics)?;
        if let Some(err) = lock(&self.state.metric_failures).get(&query.metric_name) {
            return Err(err.clone());
        }
        Ok(self
            .fixture
            .metrics
            .iter()
            .find(|m| {
                m.namespace == query.namespace
                    && m.metric_name == query.metric_name
                    && m.dimensions == query.dimensions
            })
            .map(|m| m.datapoints.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl BackupApi for FixtureSession {
    async fn list_backup_jobs(
        &self,
        resource_arn: &str,
        next_token: Option<String>,
    ) -> Result<Page<BackupJob>, ProviderError> {
        self.call(Operation::ListBackupJobs)?;
        let items = self
            .fixture
            .backup_jobs
            .iter()
            .filter(|j| j.resource_arn.as_deref() == Some(resource_arn))
            .cloned()
            .collect();
        self.page(items, next_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instances(n: usize) -> Vec<DbInstance> {
        (0..n)
            .map(|i| DbInstance {
                db_instance_identifier: format!("db-{i}"),
                db_instance_arn: format!("arn:aws:rds:us-east-1:111122223333:db:db-{i}"),
                ..Default::default()
            })
            .collect()
    }

    #[tokio::test]
    async fn pages_follow_page_size() {
        let provider = FixtureProvider::new(Fixture {
            db_instances: instances(5),
            page_size: Some(2),
            ..Default::default()
        });
        let clients = provider.open("us-east-1").await.unwrap();

        let first = clients
            .rds
            .describe_db_instances(InstanceFilter::All, None)
            .await
            .unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.marker.as_deref(), Some("2"));

        let last = clients
            .rds
            .describe_db_instances(InstanceFilter::All, Some("4".to_string()))
            .await
            .unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.marker, None);
    }

    #[tokio::test]
    async fn sessions_are_released_on_drop() {
        let provider = FixtureProvider::new(Fixture::default());
        let clients = provider.open("us-east-1").await.unwrap();
        assert_eq!(provider.live_clients(), 3);
        drop(clients);
        assert_eq!(provider.live_clients(), 0);
        assert_eq!(provider.opened(), 1);
    }

    #[tokio::test]
    async fn injected_failures_apply_per_operation() {
        let provider = FixtureProvider::new(Fixture {
            db_instances: instances(1),
            ..Default::default()
        });
        provider.fail(
            Operation::DescribeDbClusters,
            ProviderError::client("connection reset"),
        );
        let clients = provider.open("us-east-1").await.unwrap();

        assert!(clients.rds.describe_db_clusters(None).await.is_err());
        assert!(clients
            .rds
            .describe_db_instances(InstanceFilter::All, None)
            .await
            .is_ok());
        assert_eq!(provider.calls(Operation::DescribeDbClusters), 1);
    }

    #[test]
    fn fixture_parses_from_json() {
        let fixture: Fixture = serde_json::from_str(
            r#"{
                "dbInstances": [
                    {"dbInstanceIdentifier": "demo-db",
                     "dbInstanceArn": "arn:aws:rds:ap-northeast-2:111122223333:db:demo-db",
                     "engine": "postgres",
                     "allocatedStorage": 20,
                     "instanceCreateTime": "2024-01-02T03:04:05Z"}
                ],
                "tags": {"arn:aws:rds:ap-northeast-2:111122223333:db:demo-db": [{"key": "env", "value": "dev"}]}
            }"#,
        )
        .unwrap();
        assert_eq!(fixture.db_instances[0].engine.as_deref(), Some("postgres"));
        assert_eq!(fixture.db_instances[0].allocated_storage, Some(20));
        assert!(fixture.db_instances[0].instance_create_time.is_some());
        assert_eq!(fixture.tags.len(), 1);
    }
}
