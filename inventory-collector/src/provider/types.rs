//! Raw provider resources as returned by list/describe calls.
//!
//! These are snapshots of SDK output, flattened into serde structs so they
//! can be stored verbatim as an envelope's `configuration`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Endpoint {
    pub address: Option<String>,
    pub port: Option<i32>,
    pub hosted_zone_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DbSubnetGroup {
    pub db_subnet_group_name: Option<String>,
    pub vpc_id: Option<String>,
    pub subnet_group_status: Option<String>,
    pub subnet_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DbParameterGroupStatus {
    pub db_parameter_group_name: Option<String>,
    pub parameter_apply_status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptionGroupMembership {
    pub option_group_name: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DbInstance {
    pub db_instance_identifier: String,
    pub db_instance_arn: String,
    pub db_cluster_identifier: Option<String>,
    pub engine: Option<String>,
    pub engine_version: Option<String>,
    pub db_instance_class: Option<String>,
    pub db_instance_status: Option<String>,
    /// GiB
    pub allocated_storage: Option<i32>,
    pub max_allocated_storage: Option<i32>,
    pub storage_type: Option<String>,
    pub storage_encrypted: Option<bool>,
    pub kms_key_id: Option<String>,
    pub multi_az: Option<bool>,
    pub publicly_accessible: Option<bool>,
    pub endpoint: Option<Endpoint>,
    pub availability_zone: Option<String>,
    pub instance_create_time: Option<DateTime<Utc>>,
    pub backup_retention_period: Option<i32>,
    pub deletion_protection: Option<bool>,
    pub iam_database_authentication_enabled: Option<bool>,
    pub vpc_security_group_ids: Vec<String>,
    pub db_subnet_group: Option<DbSubnetGroup>,
    pub db_parameter_groups: Vec<DbParameterGroupStatus>,
    pub option_group_memberships: Vec<OptionGroupMembership>,
    pub ca_certificate_identifier: Option<String>,
    pub performance_insights_enabled: Option<bool>,
    pub enabled_cloudwatch_logs_exports: Vec<String>,
    pub auto_minor_version_upgrade: Option<bool>,
    pub copy_tags_to_snapshot: Option<bool>,
    pub preferred_backup_window: Option<String>,
    pub preferred_maintenance_window: Option<String>,
    pub monitoring_interval: Option<i32>,
    pub master_username: Option<String>,
    pub dbi_resource_id: Option<String>,
    pub license_model: Option<String>,
    pub iops: Option<i32>,
    pub storage_throughput: Option<i32>,
    pub latest_restorable_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DbClusterMember {
    pub db_instance_identifier: Option<String>,
    pub is_cluster_writer: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DbCluster {
    pub db_cluster_identifier: String,
    pub db_cluster_arn: String,
    pub engine: Option<String>,
    pub engine_version: Option<String>,
    pub engine_mode: Option<String>,
    pub status: Option<String>,
    /// GiB
    pub allocated_storage: Option<i32>,
    pub cluster_create_time: Option<DateTime<Utc>>,
    pub storage_encrypted: Option<bool>,
    pub kms_key_id: Option<String>,
    pub multi_az: Option<bool>,
    pub endpoint: Option<String>,
    pub reader_endpoint: Option<String>,
    pub port: Option<i32>,
    pub db_cluster_members: Vec<DbClusterMember>,
    pub backup_retention_period: Option<i32>,
    pub deletion_protection: Option<bool>,
    pub db_subnet_group: Option<String>,
    pub db_cluster_parameter_group: Option<String>,
    pub vpc_security_group_ids: Vec<String>,
    pub availability_zones: Vec<String>,
    pub iam_database_authentication_enabled: Option<bool>,
    pub enabled_cloudwatch_logs_exports: Vec<String>,
    pub performance_insights_enabled: Option<bool>,
    pub auto_minor_version_upgrade: Option<bool>,
    pub copy_tags_to_snapshot: Option<bool>,
    pub http_endpoint_enabled: Option<bool>,
    pub activity_stream_status: Option<String>,
    pub preferred_backup_window: Option<String>,
    pub preferred_maintenance_window: Option<String>,
    pub master_username: Option<String>,
    pub db_cluster_resource_id: Option<String>,
    pub associated_role_arns: Vec<String>,
    pub latest_restorable_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DbSnapshot {
    pub db_snapshot_identifier: String,
    pub db_snapshot_arn: String,
    pub db_instance_identifier: Option<String>,
    pub engine: Option<String>,
    pub snapshot_type: Option<String>,
    pub status: Option<String>,
    pub allocated_storage: Option<i32>,
    pub instance_create_time: Option<DateTime<Utc>>,
    pub snapshot_create_time: Option<DateTime<Utc>>,
    pub encrypted: Option<bool>,
    pub kms_key_id: Option<String>,
    pub engine_version: Option<String>,
    pub vpc_id: Option<String>,
    pub port: Option<i32>,
    pub availability_zone: Option<String>,
    pub storage_type: Option<String>,
    pub iam_database_authentication_enabled: Option<bool>,
    pub master_username: Option<String>,
    pub option_group_name: Option<String>,
    pub license_model: Option<String>,
    pub source_region: Option<String>,
    pub source_db_snapshot_identifier: Option<String>,
    pub dbi_resource_id: Option<String>,
    pub percent_progress: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DbClusterSnapshot {
    pub db_cluster_snapshot_identifier: String,
    pub db_cluster_snapshot_arn: String,
    pub db_cluster_identifier: Option<String>,
    pub engine: Option<String>,
    pub snapshot_type: Option<String>,
    pub status: Option<String>,
    pub allocated_storage: Option<i32>,
    pub cluster_create_time: Option<DateTime<Utc>>,
    pub snapshot_create_time: Option<DateTime<Utc>>,
    pub storage_encrypted: Option<bool>,
    pub kms_key_id: Option<String>,
    pub engine_version: Option<String>,
    pub vpc_id: Option<String>,
    pub port: Option<i32>,
    pub availability_zones: Vec<String>,
    pub iam_database_authentication_enabled: Option<bool>,
    pub master_username: Option<String>,
    pub license_model: Option<String>,
    pub source_db_cluster_snapshot_arn: Option<String>,
    pub percent_progress: Option<i32>,
}

/// Proxy credential settings. The secret itself is never read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProxyAuth {
    pub description: Option<String>,
    pub user_name: Option<String>,
    pub auth_scheme: Option<String>,
    pub secret_arn: Option<String>,
    pub iam_auth: Option<String>,
    pub client_password_auth_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DbProxy {
    pub db_proxy_name: String,
    pub db_proxy_arn: String,
    pub engine_family: Option<String>,
    pub status: Option<String>,
    pub endpoint: Option<String>,
    pub vpc_id: Option<String>,
    pub vpc_subnet_ids: Vec<String>,
    pub require_tls: Option<bool>,
    pub idle_client_timeout: Option<i32>,
    pub created_date: Option<DateTime<Utc>>,
    pub updated_date: Option<DateTime<Utc>>,
    pub role_arn: Option<String>,
    pub debug_logging: Option<bool>,
    pub vpc_security_group_ids: Vec<String>,
    pub auth: Vec<ProxyAuth>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackupJob {
    pub backup_job_id: String,
    pub backup_vault_name: Option<String>,
    pub resource_arn: Option<String>,
    pub state: Option<String>,
    pub status_message: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub completion_date: Option<DateTime<Utc>>,
    pub backup_size_in_bytes: Option<i64>,
    pub recovery_point_arn: Option<String>,
}

/// One sample from the monitoring API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricPoint {
    pub timestamp: Option<DateTime<Utc>>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub average: Option<f64>,
    pub sum: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Statistic {
    Minimum,
    Maximum,
    Average,
    Sum,
}

/// A `GetMetricStatistics` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricQuery {
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: Vec<Dimension>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub period_secs: i32,
    pub statistic: Statistic,
}

/// One page of a paginated listing. `marker` is the continuation token.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub marker: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            marker: None,
        }
    }
}

/// Provider-side filter for `DescribeDBInstances`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceFilter<'a> {
    All,
    /// `db-cluster-id` filter; accepts a cluster ARN or identifier
    ClusterMembers(&'a str),
}
