//! Storage size resolution per engine family.

use serde_json::json;
use tracing::warn;

use crate::collector_core::ResourceEnvelope;
use crate::engine::{EngineFamily, Reduction, SizeDerivation};
use crate::error::ProviderError;
use crate::metrics::MetricAggregator;
use crate::provider::{DbCluster, DbInstance, Dimension};

pub const BYTES_PER_GIB: i64 = 1024 * 1024 * 1024;

pub fn gib_to_bytes(gib: i32) -> i64 {
    i64::from(gib) * BYTES_PER_GIB
}

/// What happened to a resource's size fields. Only `Resolved` sets them.
#[derive(Debug, Clone, PartialEq)]
pub enum SizeOutcome {
    Resolved {
        size_in_bytes: i64,
        max_size_in_bytes: Option<i64>,
    },
    /// the metric exists but had no datapoint in the window
    NoDatapoints,
    /// the metric call failed
    Failed(ProviderError),
    MissingEngine,
    /// capacity-minus-free needs an allocated capacity
    MissingCapacity,
}

struct SizeTarget<'a> {
    identity: &'a str,
    family: EngineFamily,
    dimension_value: &'a str,
    allocated_gib: Option<i32>,
}

pub async fn resolve_instance_size(
    metrics: &MetricAggregator<'_>,
    db: &DbInstance,
    envelope: &mut ResourceEnvelope,
) -> SizeOutcome {
    let Some(engine) = db.engine.as_deref() else {
        warn!(
            resource_id = %db.db_instance_arn,
            "{} RDS instance is missing engine property", db.db_instance_identifier
        );
        return SizeOutcome::MissingEngine;
    };
    let family = EngineFamily::classify(engine);
    let dimension_value = match family {
        EngineFamily::Standard => db.db_instance_identifier.as_str(),
        _ => db
            .db_cluster_identifier
            .as_deref()
            .unwrap_or(&db.db_instance_identifier),
    };
    let target = SizeTarget {
        identity: &db.db_instance_arn,
        family,
        dimension_value,
        allocated_gib: db.allocated_storage,
    };
    resolve(metrics, target, envelope).await
}

pub async fn resolve_cluster_size(
    metrics: &MetricAggregator<'_>,
    cluster: &DbCluster,
    envelope: &mut ResourceEnvelope,
) -> SizeOutcome {
    let Some(engine) = cluster.engine.as_deref() else {
        warn!(
            resource_id = %cluster.db_cluster_arn,
            "{} RDS cluster is missing engine property", cluster.db_cluster_identifier
        );
        return SizeOutcome::MissingEngine;
    };
    let target = SizeTarget {
        identity: &cluster.db_cluster_arn,
        family: EngineFamily::classify_cluster(engine),
        dimension_value: &cluster.db_cluster_identifier,
        allocated_gib: cluster.allocated_storage,
    };
    resolve(metrics, target, envelope).await
}

async fn resolve(
    metrics: &MetricAggregator<'_>,
    target: SizeTarget<'_>,
    envelope: &mut ResourceEnvelope,
) -> SizeOutcome {
    let profile = target.family.profile();

    if profile.size_derivation == SizeDerivation::CapacityMinusFree
        && target.allocated_gib.is_none()
    {
        warn!(
            resource_id = %target.identity,
            "resource has no allocated storage, size not derivable"
        );
        return SizeOutcome::MissingCapacity;
    }

    let dimensions = [Dimension::new(profile.size_dimension, target.dimension_value)];
    let reading = match profile.size_reduction {
        Reduction::Minimum => {
            metrics
                .minimum(profile.namespace, profile.size_metric, &dimensions)
                .await
        }
        Reduction::Maximum => {
            metrics
                .maximum(profile.namespace, profile.size_metric, &dimensions)
                .await
        }
    };

    let value = match reading {
        Ok(reading) => match reading.value {
            Some(v) => v as i64,
            None => {
                warn!(
                    resource_id = %target.identity,
                    metric = profile.size_metric,
                    "resource is missing size metrics"
                );
                return SizeOutcome::NoDatapoints;
            }
        },
        Err(err) => {
            warn!(
                resource_id = %target.identity,
                metric = profile.size_metric,
                error = %err,
                "resource is missing size metrics, with error"
            );
            return SizeOutcome::Failed(err);
        }
    };

    envelope.merge_supplementary("size", json!({ (profile.size_metric): value }));

    let max_size_in_bytes = target.allocated_gib.map(gib_to_bytes);
    let size_in_bytes = match (profile.size_derivation, max_size_in_bytes) {
        (SizeDerivation::CapacityMinusFree, Some(capacity)) => capacity - value,
        (SizeDerivation::CapacityMinusFree, None) => return SizeOutcome::MissingCapacity,
        (SizeDerivation::UsedBytes, _) => value,
    };

    envelope.record_size(size_in_bytes, max_size_in_bytes);
    SizeOutcome::Resolved {
        size_in_bytes,
        max_size_in_bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector_core::{EnvelopeConfig, ResourceType};
    use crate::metrics::MetricWindows;
    use crate::provider::fixture::{Fixture, FixtureMetric, FixtureProvider};
    use crate::provider::{ClientProvider, MetricPoint};
    use serde_json::Value;

    fn envelope(identity: &str) -> ResourceEnvelope {
        ResourceEnvelope::new(EnvelopeConfig {
            identity: identity.to_string(),
            display_name: "db".to_string(),
            resource_type: ResourceType::DbInstance,
            account_id: "111122223333".to_string(),
            region: "us-east-1".to_string(),
            configuration: Value::Null,
            creation_timestamp: None,
        })
        .unwrap()
    }

    fn metric(namespace: &str, name: &str, dim: Dimension, point: MetricPoint) -> FixtureMetric {
        FixtureMetric {
            namespace: namespace.into(),
            metric_name: name.into(),
            dimensions: vec![dim],
            datapoints: vec![point],
        }
    }

    fn postgres(allocated: Option<i32>) -> DbInstance {
        DbInstance {
            db_instance_identifier: "pg-1".into(),
            db_instance_arn: "arn:aws:rds:us-east-1:111122223333:db:pg-1".into(),
            engine: Some("postgres".into()),
            allocated_storage: allocated,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn standard_engine_subtracts_free_space() {
        let provider = FixtureProvider::new(Fixture {
            metrics: vec![metric(
                "AWS/RDS",
                "FreeStorageSpace",
                Dimension::new("DBInstanceIdentifier", "pg-1"),
                MetricPoint {
                    minimum: Some((20 * BYTES_PER_GIB) as f64),
                    ..Default::default()
                },
            )],
            ..Default::default()
        });
        let clients = provider.open("us-east-1").await.unwrap();
        let metrics = MetricAggregator::new(clients.cloudwatch.as_ref(), MetricWindows::default());
        let db = postgres(Some(100));
        let mut env = envelope(&db.db_instance_arn);

        let outcome = resolve_instance_size(&metrics, &db, &mut env).await;

        assert_eq!(
            outcome,
            SizeOutcome::Resolved {
                size_in_bytes: 80 * BYTES_PER_GIB,
                max_size_in_bytes: Some(100 * BYTES_PER_GIB),
            }
        );
        assert_eq!(env.size_in_bytes(), Some(80 * BYTES_PER_GIB));
        assert_eq!(env.max_size_in_bytes(), Some(100 * BYTES_PER_GIB));
        assert_eq!(
            env.supplementary()["size"]["FreeStorageSpace"],
            20 * BYTES_PER_GIB
        );
    }

    #[tokio::test]
    async fn document_engine_uses_volume_bytes_used() {
        let provider = FixtureProvider::new(Fixture {
            metrics: vec![metric(
                "AWS/DocDB",
                "VolumeBytesUsed",
                Dimension::new("DBClusterIdentifier", "docs"),
                MetricPoint {
                    maximum: Some(5_000_000_000.0),
                    ..Default::default()
                },
            )],
            ..Default::default()
        });
        let clients = provider.open("us-east-1").await.unwrap();
        let metrics = MetricAggregator::new(clients.cloudwatch.as_ref(), MetricWindows::default());
        let db = DbInstance {
            db_instance_identifier: "docs-1".into(),
            db_instance_arn: "arn:aws:rds:us-east-1:111122223333:db:docs-1".into(),
            db_cluster_identifier: Some("docs".into()),
            engine: Some("docdb".into()),
            allocated_storage: Some(10),
            ..Default::default()
        };
        let mut env = envelope(&db.db_instance_arn);

        resolve_instance_size(&metrics, &db, &mut env).await;

        assert_eq!(env.size_in_bytes(), Some(5_000_000_000));
        assert_eq!(env.max_size_in_bytes(), Some(10 * BYTES_PER_GIB));
    }

    #[tokio::test]
    async fn clustered_engine_reads_cluster_volume() {
        let provider = FixtureProvider::new(Fixture {
            metrics: vec![metric(
                "AWS/RDS",
                "VolumeBytesUsed",
                Dimension::new("DBClusterIdentifier", "aurora-1"),
                MetricPoint {
                    maximum: Some(123_456.0),
                    ..Default::default()
                },
            )],
            ..Default::default()
        });
        let clients = provider.open("us-east-1").await.unwrap();
        let metrics = MetricAggregator::new(clients.cloudwatch.as_ref(), MetricWindows::default());
        let cluster = DbCluster {
            db_cluster_identifier: "aurora-1".into(),
            db_cluster_arn: "arn:aws:rds:us-east-1:111122223333:cluster:aurora-1".into(),
            engine: Some("aurora-postgresql".into()),
            allocated_storage: Some(1),
            ..Default::default()
        };
        let mut env = envelope(&cluster.db_cluster_arn);

        let outcome = resolve_cluster_size(&metrics, &cluster, &mut env).await;

        assert_eq!(
            outcome,
            SizeOutcome::Resolved {
                size_in_bytes: 123_456,
                max_size_in_bytes: Some(BYTES_PER_GIB),
            }
        );
        assert_eq!(env.supplementary()["size"]["VolumeBytesUsed"], 123_456);
    }

    #[tokio::test]
    async fn no_datapoint_leaves_size_absent() {
        let provider = FixtureProvider::new(Fixture::default());
        let clients = provider.open("us-east-1").await.unwrap();
        let metrics = MetricAggregator::new(clients.cloudwatch.as_ref(), MetricWindows::default());
        let db = postgres(Some(100));
        let mut env = envelope(&db.db_instance_arn);

        let outcome = resolve_instance_size(&metrics, &db, &mut env).await;

        assert_eq!(outcome, SizeOutcome::NoDatapoints);
        assert_eq!(env.size_in_bytes(), None);
        assert_eq!(env.max_size_in_bytes(), None);
        assert!(env.supplementary().get("size").is_none());
    }

    #[tokio::test]
    async fn failed_metric_call_leaves_size_absent() {
        let provider = FixtureProvider::new(Fixture::default());
        provider.fail_metric("FreeStorageSpace", ProviderError::client("timeout"));
        let clients = provider.open("us-east-1").await.unwrap();
        let metrics = MetricAggregator::new(clients.cloudwatch.as_ref(), MetricWindows::default());
        let db = postgres(Some(100));
        let mut env = envelope(&db.db_instance_arn);

        let outcome = resolve_instance_size(&metrics, &db, &mut env).await;

        assert_eq!(outcome, SizeOutcome::Failed(ProviderError::client("timeout")));
        assert_eq!(env.size_in_bytes(), None);
        assert_eq!(env.max_size_in_bytes(), None);
    }

    #[tokio::test]
    async fn missing_engine_skips_the_metric_call() {
        let provider = FixtureProvider::new(Fixture::default());
        let clients = provider.open("us-east-1").await.unwrap();
        let metrics = MetricAggregator::new(clients.cloudwatch.as_ref(), MetricWindows::default());
        let db = DbInstance {
            engine: None,
            ..postgres(Some(100))
        };
        let mut env = envelope(&db.db_instance_arn);

        let outcome = resolve_instance_size(&metrics, &db, &mut env).await;

        assert_eq!(outcome, SizeOutcome::MissingEngine);
        assert!(provider.metric_queries().is_empty());
        assert_eq!(env.size_in_bytes(), None);
    }

    #[tokio::test]
    async fn cluster_without_engine_skips_the_metric_call() {
        let provider = FixtureProvider::new(Fixture {
            metrics: vec![metric(
                "AWS/RDS",
                "VolumeBytesUsed",
                Dimension::new("DBClusterIdentifier", "bare-1"),
                MetricPoint {
                    maximum: Some(42.0),
                    ..Default::default()
                },
            )],
            ..Default::default()
        });
        let clients = provider.open("us-east-1").await.unwrap();
        let metrics = MetricAggregator::new(clients.cloudwatch.as_ref(), MetricWindows::default());
        let cluster = DbCluster {
            db_cluster_identifier: "bare-1".into(),
            db_cluster_arn: "arn:aws:rds:us-east-1:111122223333:cluster:bare-1".into(),
            engine: None,
            allocated_storage: Some(1),
            ..Default::default()
        };
        let mut env = envelope(&cluster.db_cluster_arn);

        let outcome = resolve_cluster_size(&metrics, &cluster, &mut env).await;

        assert_eq!(outcome, SizeOutcome::MissingEngine);
        assert!(provider.metric_queries().is_empty());
        assert_eq!(env.size_in_bytes(), None);
        assert!(env.supplementary().get("size").is_none());
    }

    #[tokio::test]
    async fn standard_engine_without_capacity_is_not_derivable() {
        let provider = FixtureProvider::new(Fixture::default());
        let clients = provider.open("us-east-1").await.unwrap();
        let metrics = MetricAggregator::new(clients.cloudwatch.as_ref(), MetricWindows::default());
        let db = postgres(None);
        let mut env = envelope(&db.db_instance_arn);

        let outcome = resolve_instance_size(&metrics, &db, &mut env).await;

        assert_eq!(outcome, SizeOutcome::MissingCapacity);
        assert_eq!(env.size_in_bytes(), None);
    }
}
