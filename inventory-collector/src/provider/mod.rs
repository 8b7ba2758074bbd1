//! Provider ports: the remote calls discovery makes, abstracted so the AWS
//! SDK and the fixture provider can stand behind them.

pub mod aws;
pub mod fixture;
pub mod types;

use async_trait::async_trait;
use std::future::Future;

use crate::error::ProviderError;
pub use types::*;

/// RDS control-plane calls used by discovery.
#[async_trait]
pub trait RdsApi: Send + Sync {
    async fn describe_db_instances(
        &self,
        filter: InstanceFilter<'_>,
        marker: Option<String>,
    ) -> Result<Page<DbInstance>, ProviderError>;

    async fn describe_db_clusters(
        &self,
        marker: Option<String>,
    ) -> Result<Page<DbCluster>, ProviderError>;

    /// Snapshots visible to the account (shared included, public excluded),
    /// optionally restricted to one source instance.
    async fn describe_db_snapshots(
        &self,
        db_instance_identifier: Option<&str>,
        marker: Option<String>,
    ) -> Result<Page<DbSnapshot>, ProviderError>;

    /// Cluster snapshots (shared included, public excluded) of one cluster.
    async fn describe_db_cluster_snapshots(
        &self,
        db_cluster_identifier: Option<&str>,
        marker: Option<String>,
    ) -> Result<Page<DbClusterSnapshot>, ProviderError>;

    async fn describe_db_proxies(
        &self,
        db_proxy_name: Option<&str>,
        marker: Option<String>,
    ) -> Result<Page<DbProxy>, ProviderError>;

    async fn list_tags_for_resource(&self, resource_arn: &str) -> Result<Vec<Tag>, ProviderError>;
}

/// Monitoring calls
#[async_trait]
pub trait CloudWatchApi: Send + Sync {
    async fn get_metric_statistics(
        &self,
        query: &MetricQuery,
    ) -> Result<Vec<MetricPoint>, ProviderError>;
}

/// Backup calls
#[async_trait]
pub trait BackupApi: Send + Sync {
    async fn list_backup_jobs(
        &self,
        resource_arn: &str,
        next_token: Option<String>,
    ) -> Result<Page<BackupJob>, ProviderError>;
}

/// Clients for one service pass in one region.
///
/// Acquired at the start of a pass and dropped when the pass ends, whatever
/// path it ends on.
pub struct ServiceClients {
    pub rds: Box<dyn RdsApi>,
    pub cloudwatch: Box<dyn CloudWatchApi>,
    pub backup: Box<dyn BackupApi>,
}

/// Opens region-scoped clients.
#[async_trait]
pub trait ClientProvider: Send + Sync {
    async fn open(&self, region: &str) -> Result<ServiceClients, ProviderError>;
}

/// Follow a paginated listing until the provider stops returning a marker.
pub async fn list_all<T, F, Fut>(mut fetch: F) -> Result<Vec<T>, ProviderError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, ProviderError>>,
{
    let mut items = Vec::new();
    let mut marker: Option<String> = None;
    loop {
        let page = fetch(marker.take()).await?;
        items.extend(page.items);
        marker = page.marker.filter(|m| !m.is_empty());
        if marker.is_none() {
            break;
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn list_all_follows_every_marker() {
        let seen = Mutex::new(Vec::new());
        let items = list_all(|marker: Option<String>| {
            seen.lock().unwrap().push(marker.clone());
            async move {
                Ok(match marker.as_deref() {
                    None => Page {
                        items: vec![1, 2],
                        marker: Some("p2".to_string()),
                    },
                    Some("p2") => Page {
                        items: vec![3],
                        marker: Some("p3".to_string()),
                    },
                    _ => Page::last(vec![4]),
                })
            }
        })
        .await
        .unwrap();

        assert_eq!(items, vec![1, 2, 3, 4]);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![None, Some("p2".to_string()), Some("p3".to_string())]
        );
    }

    #[tokio::test]
    async fn list_all_treats_empty_marker_as_end() {
        let items = list_all(|_| async {
            Ok(Page {
                items: vec!["a"],
                marker: Some(String::new()),
            })
        })
        .await
        .unwrap();
        assert_eq!(items, vec!["a"]);
    }

    #[tokio::test]
    async fn list_all_stops_on_error() {
        let result: Result<Vec<u8>, _> = list_all(|marker: Option<String>| async move {
            match marker {
                None => Ok(Page {
                    items: vec![1],
                    marker: Some("next".to_string()),
                }),
                Some(_) => Err(ProviderError::client("timeout")),
            }
        })
        .await;
        assert_eq!(result, Err(ProviderError::client("timeout")));
    }
}
