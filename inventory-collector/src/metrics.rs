//! CloudWatch metric reduction
//!
//! Reduces a metric over a lookback window to a single scalar (min/max) or to
//! a timestamp-keyed series (sum/average). The stale variants look further
//! back, since CloudWatch publishes some RDS metrics with a delay and the
//! most recent period may have no data yet.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::ProviderError;
use crate::provider::{CloudWatchApi, Dimension, MetricPoint, MetricQuery, Statistic};

/// ISO-8601 timestamp → statistic
pub type MetricSeries = BTreeMap<String, f64>;

/// Lookback windows for metric queries.
#[derive(Debug, Clone)]
pub struct MetricWindows {
    pub lookback: Duration,
    pub period_secs: i32,
    pub stale_lookback: Duration,
    pub stale_period_secs: i32,
}

impl Default for MetricWindows {
    fn default() -> Self {
        Self {
            lookback: Duration::days(1),
            period_secs: 3600,
            stale_lookback: Duration::days(14),
            stale_period_secs: 86400,
        }
    }
}

/// A reduced scalar plus the datapoints it came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricReading {
    pub value: Option<f64>,
    pub datapoints: Vec<MetricPoint>,
}

pub struct MetricAggregator<'a> {
    client: &'a dyn CloudWatchApi,
    windows: MetricWindows,
}

impl<'a> MetricAggregator<'a> {
    pub fn new(client: &'a dyn CloudWatchApi, windows: MetricWindows) -> Self {
        Self { client, windows }
    }

    /// Lowest `Minimum` statistic over the standard window.
    pub async fn minimum(
        &self,
        namespace: &str,
        metric_name: &str,
        dimensions: &[Dimension],
    ) -> Result<MetricReading, ProviderError> {
        let datapoints = self
            .fetch(namespace, metric_name, dimensions, Statistic::Minimum, false)
            .await?;
        let value = datapoints
            .iter()
            .filter_map(|dp| dp.minimum)
            .reduce(f64::min);
        Ok(MetricReading { value, datapoints })
    }

    /// Highest `Maximum` statistic over the standard window.
    pub async fn maximum(
        &self,
        namespace: &str,
        metric_name: &str,
        dimensions: &[Dimension],
    ) -> Result<MetricReading, ProviderError> {
        let datapoints = self
            .fetch(namespace, metric_name, dimensions, Statistic::Maximum, false)
            .await?;
        let value = datapoints
            .iter()
            .filter_map(|dp| dp.maximum)
            .reduce(f64::max);
        Ok(MetricReading { value, datapoints })
    }

    /// Per-period sums over the stale window.
    pub async fn stale_sum(
        &self,
        namespace: &str,
        metric_name: &str,
        dimensions: &[Dimension],
    ) -> Result<MetricSeries, ProviderError> {
        let datapoints = self
            .fetch(namespace, metric_name, dimensions, Statistic::Sum, true)
            .await?;
        Ok(series(&datapoints, |dp| dp.sum))
    }

    /// Per-period averages over the stale window.
    pub async fn stale_avg(
        &self,
        namespace: &str,
        metric_name: &str,
        dimensions: &[Dimension],
    ) -> Result<MetricSeries, ProviderError> {
        let datapoints = self
            .fetch(namespace, metric_name, dimensions, Statistic::Average, true)
            .await?;
        Ok(series(&datapoints, |dp| dp.average))
    }

    async fn fetch(
        &self,
        namespace: &str,
        metric_name: &str,
        dimensions: &[Dimension],
        statistic: Statistic,
        stale: bool,
    ) -> Result<Vec<MetricPoint>, ProviderError> {
        let (lookback, period_secs) = if stale {
            (self.windows.stale_lookback, self.windows.stale_period_secs)
        } else {
            (self.windows.lookback, self.windows.period_secs)
        };
        let end_time = Utc::now();
        let query = MetricQuery {
            namespace: namespace.to_string(),
            metric_name: metric_name.to_string(),
            dimensions: dimensions.to_vec(),
            start_time: end_time - lookback,
            end_time,
            period_secs,
            statistic,
        };
        let datapoints = self.client.get_metric_statistics(&query).await?;
        debug!(
            namespace = %namespace,
            metric = %metric_name,
            statistic = ?statistic,
            datapoints = datapoints.len(),
            "Got metric statistics"
        );
        Ok(datapoints)
    }
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn series(datapoints: &[MetricPoint], pick: fn(&MetricPoint) -> Option<f64>) -> MetricSeries {
    datapoints
        .iter()
        .filter_map(|dp| Some((format_timestamp(dp.timestamp.as_ref()?), pick(dp)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::fixture::{Fixture, FixtureMetric, FixtureProvider};
    use crate::provider::ClientProvider;
    use chrono::TimeZone;

    fn at(day: u32) -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap())
    }

    fn dims() -> Vec<Dimension> {
        vec![Dimension::new("DBInstanceIdentifier", "db-1")]
    }

    fn provider() -> FixtureProvider {
        FixtureProvider::new(Fixture {
            metrics: vec![
                FixtureMetric {
                    namespace: "AWS/RDS".into(),
                    metric_name: "FreeStorageSpace".into(),
                    dimensions: dims(),
                    datapoints: vec![
                        MetricPoint {
                            timestamp: at(1),
                            minimum: Some(300.0),
                            maximum: Some(900.0),
                            ..Default::default()
                        },
                        MetricPoint {
                            timestamp: at(2),
                            minimum: Some(200.0),
                            maximum: Some(950.0),
                            ..Default::default()
                        },
                    ],
                },
                FixtureMetric {
                    namespace: "AWS/RDS".into(),
                    metric_name: "DatabaseConnections".into(),
                    dimensions: dims(),
                    datapoints: vec![
                        MetricPoint {
                            timestamp: at(1),
                            sum: Some(12.0),
                            average: Some(3.0),
                            ..Default::default()
                        },
                        MetricPoint {
                            timestamp: at(2),
                            sum: Some(8.0),
                            average: Some(2.0),
                            ..Default::default()
                        },
                        MetricPoint {
                            timestamp: None,
                            sum: Some(99.0),
                            average: Some(99.0),
                            ..Default::default()
                        },
                    ],
                },
            ],
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn minimum_and_maximum_reduce_over_datapoints() {
        let provider = provider();
        let clients = provider.open("us-east-1").await.unwrap();
        let metrics = MetricAggregator::new(clients.cloudwatch.as_ref(), MetricWindows::default());

        let min = metrics
            .minimum("AWS/RDS", "FreeStorageSpace", &dims())
            .await
            .unwrap();
        assert_eq!(min.value, Some(200.0));
        assert_eq!(min.datapoints.len(), 2);

        let max = metrics
            .maximum("AWS/RDS", "FreeStorageSpace", &dims())
            .await
            .unwrap();
        assert_eq!(max.value, Some(950.0));
    }

    #[tokio::test]
    async fn no_datapoints_is_absent_not_zero() {
        let provider = provider();
        let clients = provider.open("us-east-1").await.unwrap();
        let metrics = MetricAggregator::new(clients.cloudwatch.as_ref(), MetricWindows::default());

        let reading = metrics
            .minimum("AWS/RDS", "FreeStorageSpace", &[Dimension::new("DBInstanceIdentifier", "other")])
            .await
            .unwrap();
        assert_eq!(reading.value, None);
        assert!(reading.datapoints.is_empty());
    }

    #[tokio::test]
    async fn sum_and_average_series_are_keyed_by_timestamp() {
        let provider = provider();
        let clients = provider.open("us-east-1").await.unwrap();
        let metrics = MetricAggregator::new(clients.cloudwatch.as_ref(), MetricWindows::default());

        let sums = metrics
            .stale_sum("AWS/RDS", "DatabaseConnections", &dims())
            .await
            .unwrap();
        let avgs = metrics
            .stale_avg("AWS/RDS", "DatabaseConnections", &dims())
            .await
            .unwrap();

        assert_eq!(
            sums.into_iter().collect::<Vec<_>>(),
            vec![
                ("2024-03-01T00:00:00Z".to_string(), 12.0),
                ("2024-03-02T00:00:00Z".to_string(), 8.0),
            ]
        );
        assert_eq!(avgs.get("2024-03-01T00:00:00Z"), Some(&3.0));
        assert_eq!(avgs.get("2024-03-02T00:00:00Z"), Some(&2.0));
        assert_eq!(avgs.len(), 2);
    }

    #[tokio::test]
    async fn stale_queries_use_the_wider_window() {
        let provider = provider();
        let clients = provider.open("us-east-1").await.unwrap();
        let metrics = MetricAggregator::new(clients.cloudwatch.as_ref(), MetricWindows::default());

        metrics
            .minimum("AWS/RDS", "FreeStorageSpace", &dims())
            .await
            .unwrap();
        metrics
            .stale_sum("AWS/RDS", "DatabaseConnections", &dims())
            .await
            .unwrap();

        let queries = provider.metric_queries();
        assert_eq!(queries.len(), 2);
        let standard = &queries[0];
        let stale = &queries[1];
        assert_eq!(standard.statistic, Statistic::Minimum);
        assert_eq!(stale.statistic, Statistic::Sum);
        assert!(stale.end_time - stale.start_time > standard.end_time - standard.start_time);
        assert_eq!(stale.period_secs, 86400);
        assert_eq!(standard.period_secs, 3600);
    }

    #[tokio::test]
    async fn errors_propagate_to_the_caller() {
        let provider = provider();
        provider.fail_metric(
            "FreeStorageSpace",
            ProviderError::service("Throttling", "Rate exceeded"),
        );
        let clients = provider.open("us-east-1").await.unwrap();
        let metrics = MetricAggregator::new(clients.cloudwatch.as_ref(), MetricWindows::default());

        let err = metrics
            .minimum("AWS/RDS", "FreeStorageSpace", &dims())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("Throttling"));
    }
}
