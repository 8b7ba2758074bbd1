//! AWS SDK adapters behind the provider ports.

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_backup as backup;
use aws_sdk_cloudwatch as cloudwatch;
use aws_sdk_cloudwatch::primitives::DateTime as AwsDateTime;
use aws_sdk_rds as rds;
use aws_sdk_sts as sts;
use aws_types::region::Region;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::{
    BackupApi, BackupJob, ClientProvider, CloudWatchApi, DbCluster, DbClusterMember,
    DbClusterSnapshot, DbInstance, DbParameterGroupStatus, DbProxy, DbSnapshot, DbSubnetGroup,
    Endpoint, InstanceFilter, MetricPoint, MetricQuery, OptionGroupMembership, Page, ProxyAuth,
    RdsApi, ServiceClients, Statistic, Tag,
};
use crate::error::ProviderError;

/// Opens SDK clients from the default credential chain for each region.
#[derive(Debug, Default, Clone)]
pub struct SdkClientProvider;

impl SdkClientProvider {
    pub fn new() -> Self {
        Self
    }
}

async fn regional_config(region: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await
}

#[async_trait]
impl ClientProvider for SdkClientProvider {
    async fn open(&self, region: &str) -> Result<ServiceClients, ProviderError> {
        let conf = regional_config(region).await;
        debug!(region = %region, "opened rds/cloudwatch/backup clients");
        Ok(ServiceClients {
            rds: Box::new(SdkRds(rds::Client::new(&conf))),
            cloudwatch: Box::new(SdkCloudWatch(cloudwatch::Client::new(&conf))),
            backup: Box::new(SdkBackup(backup::Client::new(&conf))),
        })
    }
}

/// Resolve the account id of the caller's credentials.
pub async fn caller_account(region: &str) -> Result<String> {
    let conf = regional_config(region).await;
    let who = sts::Client::new(&conf)
        .get_caller_identity()
        .send()
        .await
        .context("Failed to resolve caller identity")?;
    who.account()
        .map(str::to_string)
        .context("GetCallerIdentity returned no account")
}

fn to_chrono(dt: Option<&AwsDateTime>) -> Option<DateTime<Utc>> {
    dt.and_then(|d| DateTime::from_timestamp(d.secs(), d.subsec_nanos()))
}

fn owned(s: Option<&str>) -> Option<String> {
    s.map(str::to_string)
}

pub struct SdkRds(rds::Client);

fn convert_instance(db: &rds::types::DbInstance) -> DbInstance {
    DbInstance {
        db_instance_identifier: db.db_instance_identifier().unwrap_or_default().to_string(),
        db_instance_arn: db.db_instance_arn().unwrap_or_default().to_string(),
        db_cluster_identifier: owned(db.db_cluster_identifier()),
        engine: owned(db.engine()),
        engine_version: owned(db.engine_version()),
        db_instance_class: owned(db.db_instance_class()),
        db_instance_status: owned(db.db_instance_status()),
        allocated_storage: db.allocated_storage(),
        max_allocated_storage: db.max_allocated_storage(),
        storage_type: owned(db.storage_type()),
        storage_encrypted: db.storage_encrypted(),
        kms_key_id: owned(db.kms_key_id()),
        multi_az: db.multi_az(),
        publicly_accessible: db.publicly_accessible(),
        endpoint: db.endpoint().map(|e| Endpoint {
            address: owned(e.address()),
            port: e.port(),
            hosted_zone_id: owned(e.hosted_zone_id()),
        }),
        availability_zone: owned(db.availability_zone()),
        instance_create_time: to_chrono(db.instance_create_time()),
        backup_retention_period: db.backup_retention_period(),
        deletion_protection: db.deletion_protection(),
        iam_database_authentication_enabled: db.iam_database_authentication_enabled(),
        vpc_security_group_ids: db
            .vpc_security_groups()
            .iter()
            .filter_map(|g| owned(g.vpc_security_group_id()))
            .collect(),
        db_subnet_group: db.db_subnet_group().map(|g| DbSubnetGroup {
            db_subnet_group_name: owned(g.db_subnet_group_name()),
            vpc_id: owned(g.vpc_id()),
            subnet_group_status: owned(g.subnet_group_status()),
            subnet_ids: g
                .subnets()
                .iter()
                .filter_map(|s| owned(s.subnet_identifier()))
                .collect(),
        }),
        db_parameter_groups: db
            .db_parameter_groups()
            .iter()
            .map(|g| DbParameterGroupStatus {
                db_parameter_group_name: owned(g.db_parameter_group_name()),
                parameter_apply_status: owned(g.parameter_apply_status()),
            })
            .collect(),
        option_group_memberships: db
            .option_group_memberships()
            .iter()
            .map(|o| OptionGroupMembership {
                option_group_name: owned(o.option_group_name()),
                status: owned(o.status()),
            })
            .collect(),
        ca_certificate_identifier: owned(db.ca_certificate_identifier()),
        performance_insights_enabled: db.performance_insights_enabled(),
        enabled_cloudwatch_logs_exports: db.enabled_cloudwatch_logs_exports().to_vec(),
        auto_minor_version_upgrade: db.auto_minor_version_upgrade(),
        copy_tags_to_snapshot: db.copy_tags_to_snapshot(),
        preferred_backup_window: owned(db.preferred_backup_window()),
        preferred_maintenance_window: owned(db.preferred_maintenance_window()),
        monitoring_interval: db.monitoring_interval(),
        master_username: owned(db.master_username()),
        dbi_resource_id: owned(db.dbi_resource_id()),
        license_model: owned(db.license_model()),
        iops: db.iops(),
        storage_throughput: db.storage_throughput(),
        latest_restorable_time: to_chrono(db.latest_restorable_time()),
    }
}

fn convert_cluster(c: &rds::types::DbCluster) -> DbCluster {
    DbCluster {
        db_cluster_identifier: c.db_cluster_identifier().unwrap_or_default().to_string(),
        db_cluster_arn: c.db_cluster_arn().unwrap_or_default().to_string(),
        engine: owned(c.engine()),
        engine_version: owned(c.engine_version()),
        engine_mode: owned(c.engine_mode()),
        status: owned(c.status()),
        allocated_storage: c.allocated_storage(),
        cluster_create_time: to_chrono(c.cluster_create_time()),
        storage_encrypted: c.storage_encrypted(),
        kms_key_id: owned(c.kms_key_id()),
        multi_az: c.multi_az(),
        endpoint: owned(c.endpoint()),
        reader_endpoint: owned(c.reader_endpoint()),
        port: c.port(),
        db_cluster_members: c
            .db_cluster_members()
            .iter()
            .map(|m| DbClusterMember {
                db_instance_identifier: owned(m.db_instance_identifier()),
                is_cluster_writer: m.is_cluster_writer(),
            })
            .collect(),
        backup_retention_period: c.backup_retention_period(),
        deletion_protection: c.deletion_protection(),
        db_subnet_group: owned(c.db_subnet_group()),
        db_cluster_parameter_group: owned(c.db_cluster_parameter_group()),
        vpc_security_group_ids: c
            .vpc_security_groups()
            .iter()
            .filter_map(|g| owned(g.vpc_security_group_id()))
            .collect(),
        availability_zones: c.availability_zones().to_vec(),
        iam_database_authentication_enabled: c.iam_database_authentication_enabled(),
        enabled_cloudwatch_logs_exports: c.enabled_cloudwatch_logs_exports().to_vec(),
        performance_insights_enabled: c.performance_insights_enabled(),
        auto_minor_version_upgrade: c.auto_minor_version_upgrade(),
        copy_tags_to_snapshot: c.copy_tags_to_snapshot(),
        http_endpoint_enabled: c.http_endpoint_enabled(),
        activity_stream_status: c.activity_stream_status().map(|s| s.as_str().to_string()),
        preferred_backup_window: owned(c.preferred_backup_window()),
        preferred_maintenance_window: owned(c.preferred_maintenance_window()),
        master_username: owned(c.master_username()),
        db_cluster_resource_id: owned(c.db_cluster_resource_id()),
        associated_role_arns: c
            .associated_roles()
            .iter()
            .filter_map(|r| owned(r.role_arn()))
            .collect(),
        latest_restorable_time: to_chrono(c.latest_restorable_time()),
    }
}

fn convert_snapshot(s: &rds::types::DbSnapshot) -> DbSnapshot {
    DbSnapshot {
        db_snapshot_identifier: s.db_snapshot_identifier().unwrap_or_default().to_string(),
        db_snapshot_arn: s.db_snapshot_arn().unwrap_or_default().to_string(),
        db_instance_identifier: owned(s.db_instance_identifier()),
        engine: owned(s.engine()),
        snapshot_type: owned(s.snapshot_type()),
        status: owned(s.status()),
        allocated_storage: s.allocated_storage(),
        instance_create_time: to_chrono(s.instance_create_time()),
        snapshot_create_time: to_chrono(s.snapshot_create_time()),
        encrypted: s.encrypted(),
        kms_key_id: owned(s.kms_key_id()),
        engine_version: owned(s.engine_version()),
        vpc_id: owned(s.vpc_id()),
        port: s.port(),
        availability_zone: owned(s.availability_zone()),
        storage_type: owned(s.storage_type()),
        iam_database_authentication_enabled: s.iam_database_authentication_enabled(),
        master_username: owned(s.master_username()),
        option_group_name: owned(s.option_group_name()),
        license_model: owned(s.license_model()),
        source_region: owned(s.source_region()),
        source_db_snapshot_identifier: owned(s.source_db_snapshot_identifier()),
        dbi_resource_id: owned(s.dbi_resource_id()),
        percent_progress: s.percent_progress(),
    }
}

fn convert_cluster_snapshot(s: &rds::types::DbClusterSnapshot) -> DbClusterSnapshot {
    DbClusterSnapshot {
        db_cluster_snapshot_identifier: s
            .db_cluster_snapshot_identifier()
            .unwrap_or_default()
            .to_string(),
        db_cluster_snapshot_arn: s.db_cluster_snapshot_arn().unwrap_or_default().to_string(),
        db_cluster_identifier: owned(s.db_cluster_identifier()),
        engine: owned(s.engine()),
        snapshot_type: owned(s.snapshot_type()),
        status: owned(s.status()),
        allocated_storage: s.allocated_storage(),
        cluster_create_time: to_chrono(s.cluster_create_time()),
        snapshot_create_time: to_chrono(s.snapshot_create_time()),
        storage_encrypted: s.storage_encrypted(),
        kms_key_id: owned(s.kms_key_id()),
        engine_version: owned(s.engine_version()),
        vpc_id: owned(s.vpc_id()),
        port: s.port(),
        availability_zones: s.availability_zones().to_vec(),
        iam_database_authentication_enabled: s.iam_database_authentication_enabled(),
        master_username: owned(s.master_username()),
        license_model: owned(s.license_model()),
        source_db_cluster_snapshot_arn: owned(s.source_db_cluster_snapshot_arn()),
        percent_progress: s.percent_progress(),
    }
}

fn convert_proxy(p: &rds::types::DbProxy) -> DbProxy {
    DbProxy {
        db_proxy_name: p.db_proxy_name().unwrap_or_default().to_string(),
        db_proxy_arn: p.db_proxy_arn().unwrap_or_default().to_string(),
        engine_family: owned(p.engine_family()),
        status: p.status().map(|s| s.as_str().to_string()),
        endpoint: owned(p.endpoint()),
        vpc_id: owned(p.vpc_id()),
        vpc_subnet_ids: p.vpc_subnet_ids().to_vec(),
        require_tls: p.require_tls(),
        idle_client_timeout: p.idle_client_timeout(),
        created_date: to_chrono(p.created_date()),
        updated_date: to_chrono(p.updated_date()),
        role_arn: owned(p.role_arn()),
        debug_logging: p.debug_logging(),
        vpc_security_group_ids: p.vpc_security_group_ids().to_vec(),
        auth: p
            .auth()
            .iter()
            .map(|a| ProxyAuth {
                description: owned(a.description()),
                user_name: owned(a.user_name()),
                auth_scheme: a.auth_scheme().map(|v| v.as_str().to_string()),
                secret_arn: owned(a.secret_arn()),
                iam_auth: a.iam_auth().map(|v| v.as_str().to_string()),
                client_password_auth_type: a
                    .client_password_auth_type()
                    .map(|v| v.as_str().to_string()),
            })
            .collect(),
    }
}

fn cluster_member_filter(cluster: &str) -> rds::types::Filter {
    rds::types::Filter::builder()
        .name("db-cluster-id")
        .values(cluster)
        .build()
}

#[async_trait]
impl RdsApi for SdkRds {
    async fn describe_db_instances(
        &self,
        filter: InstanceFilter<'_>,
        marker: Option<String>,
    ) -> Result<Page<DbInstance>, ProviderError> {
        let mut req = self.0.describe_db_instances().set_marker(marker);
        if let InstanceFilter::ClusterMembers(cluster) = filter {
            req = req.filters(cluster_member_filter(cluster));
        }
        let resp = req.send().await.map_err(ProviderError::from_sdk)?;
        Ok(Page {
            items: resp.db_instances().iter().map(convert_instance).collect(),
            marker: owned(resp.marker()),
        })
    }

    async fn describe_db_clusters(
        &self,
        marker: Option<String>,
    ) -> Result<Page<DbCluster>, ProviderError> {
        let resp = self
            .0
            .describe_db_clusters()
            .set_marker(marker)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(Page {
            items: resp.db_clusters().iter().map(convert_cluster).collect(),
            marker: owned(resp.marker()),
        })
    }

    async fn describe_db_snapshots(
        &self,
        db_instance_identifier: Option<&str>,
        marker: Option<String>,
    ) -> Result<Page<DbSnapshot>, ProviderError> {
        let resp = self
            .0
            .describe_db_snapshots()
            .set_db_instance_identifier(owned(db_instance_identifier))
            .include_shared(true)
            .include_public(false)
            .set_marker(marker)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(Page {
            items: resp.db_snapshots().iter().map(convert_snapshot).collect(),
            marker: owned(resp.marker()),
        })
    }

    async fn describe_db_cluster_snapshots(
        &self,
        db_cluster_identifier: Option<&str>,
        marker: Option<String>,
    ) -> Result<Page<DbClusterSnapshot>, ProviderError> {
        let resp = self
            .0
            .describe_db_cluster_snapshots()
            .set_db_cluster_identifier(owned(db_cluster_identifier))
            .include_shared(true)
            .include_public(false)
            .set_marker(marker)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(Page {
            items: resp
                .db_cluster_snapshots()
                .iter()
                .map(convert_cluster_snapshot)
                .collect(),
            marker: owned(resp.marker()),
        })
    }

    async fn describe_db_proxies(
        &self,
        db_proxy_name: Option<&str>,
        marker: Option<String>,
    ) -> Result<Page<DbProxy>, ProviderError> {
        let resp = self
            .0
            .describe_db_proxies()
            .set_db_proxy_name(owned(db_proxy_name))
            .set_marker(marker)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(Page {
            items: resp.db_proxies().iter().map(convert_proxy).collect(),
            marker: owned(resp.marker()),
        })
    }

    async fn list_tags_for_resource(&self, resource_arn: &str) -> Result<Vec<Tag>, ProviderError> {
        let resp = self
            .0
            .list_tags_for_resource()
            .resource_name(resource_arn)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(resp
            .tag_list()
            .iter()
            .filter_map(|t| Some(Tag::new(t.key()?, t.value().unwrap_or_default())))
            .collect())
    }
}

pub struct SdkCloudWatch(cloudwatch::Client);

fn to_sdk_statistic(statistic: Statistic) -> cloudwatch::types::Statistic {
    match statistic {
        Statistic::Minimum => cloudwatch::types::Statistic::Minimum,
        Statistic::Maximum => cloudwatch::types::Statistic::Maximum,
        Statistic::Average => cloudwatch::types::Statistic::Average,
        Statistic::Sum => cloudwatch::types::Statistic::Sum,
    }
}

#[async_trait]
impl CloudWatchApi for SdkCloudWatch {
    async fn get_metric_statistics(
        &self,
        query: &MetricQuery,
    ) -> Result<Vec<MetricPoint>, ProviderError> {
        let dimensions = query
            .dimensions
            .iter()
            .map(|d| {
                cloudwatch::types::Dimension::builder()
                    .name(&d.name)
                    .value(&d.value)
                    .build()
            })
            .collect::<Vec<_>>();

        let resp = self
            .0
            .get_metric_statistics()
            .namespace(&query.namespace)
            .metric_name(&query.metric_name)
            .set_dimensions(Some(dimensions))
            .start_time(AwsDateTime::from_secs(query.start_time.timestamp()))
            .end_time(AwsDateTime::from_secs(query.end_time.timestamp()))
            .period(query.period_secs)
            .statistics(to_sdk_statistic(query.statistic))
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;

        Ok(resp
            .datapoints()
            .iter()
            .map(|dp| MetricPoint {
                timestamp: to_chrono(dp.timestamp()),
                minimum: dp.minimum(),
                maximum: dp.maximum(),
                average: dp.average(),
                sum: dp.sum(),
            })
            .collect())
    }
}

pub struct SdkBackup(backup::Client);

#[async_trait]
impl BackupApi for SdkBackup {
    async fn list_backup_jobs(
        &self,
        resource_arn: &str,
        next_token: Option<String>,
    ) -> Result<Page<BackupJob>, ProviderError> {
        let resp = self
            .0
            .list_backup_jobs()
            .by_resource_arn(resource_arn)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(ProviderError::from_sdk)?;
        Ok(Page {
            items: resp
                .backup_jobs()
                .iter()
                .map(|j| BackupJob {
                    backup_job_id: j.backup_job_id().unwrap_or_default().to_string(),
                    backup_vault_name: owned(j.backup_vault_name()),
                    resource_arn: owned(j.resource_arn()),
                    state: j.state().map(|s| s.as_str().to_string()),
                    status_message: owned(j.status_message()),
                    creation_date: to_chrono(j.creation_date()),
                    completion_date: to_chrono(j.completion_date()),
                    backup_size_in_bytes: j.backup_size_in_bytes(),
                    recovery_point_arn: owned(j.recovery_point_arn()),
                })
                .collect(),
            marker: owned(resp.next_token()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_member_filter_targets_one_cluster() {
        let filter = cluster_member_filter("arn:aws:rds:us-east-1:111122223333:cluster:aurora-1");
        assert_eq!(filter.name(), Some("db-cluster-id"));
        assert_eq!(
            filter.values(),
            ["arn:aws:rds:us-east-1:111122223333:cluster:aurora-1".to_string()]
        );
    }

    #[test]
    fn instance_keeps_policy_relevant_settings() {
        let db = rds::types::DbInstance::builder()
            .db_instance_identifier("pg-1")
            .db_instance_arn("arn:aws:rds:us-east-1:111122223333:db:pg-1")
            .engine("postgres")
            .ca_certificate_identifier("rds-ca-rsa2048-g1")
            .performance_insights_enabled(true)
            .auto_minor_version_upgrade(false)
            .enabled_cloudwatch_logs_exports("postgresql")
            .db_subnet_group(
                rds::types::DbSubnetGroup::builder()
                    .db_subnet_group_name("private")
                    .vpc_id("vpc-1")
                    .subnets(rds::types::Subnet::builder().subnet_identifier("subnet-a").build())
                    .build(),
            )
            .db_parameter_groups(
                rds::types::DbParameterGroupStatus::builder()
                    .db_parameter_group_name("default.postgres16")
                    .parameter_apply_status("in-sync")
                    .build(),
            )
            .build();

        let converted = convert_instance(&db);

        assert_eq!(converted.ca_certificate_identifier.as_deref(), Some("rds-ca-rsa2048-g1"));
        assert_eq!(converted.performance_insights_enabled, Some(true));
        assert_eq!(converted.auto_minor_version_upgrade, Some(false));
        assert_eq!(converted.enabled_cloudwatch_logs_exports, vec!["postgresql"]);
        let subnet_group = converted.db_subnet_group.as_ref().unwrap();
        assert_eq!(subnet_group.db_subnet_group_name.as_deref(), Some("private"));
        assert_eq!(subnet_group.subnet_ids, vec!["subnet-a"]);
        assert_eq!(
            converted.db_parameter_groups[0].db_parameter_group_name.as_deref(),
            Some("default.postgres16")
        );

        let configuration = serde_json::to_value(&converted).unwrap();
        assert_eq!(configuration["caCertificateIdentifier"], "rds-ca-rsa2048-g1");
        assert_eq!(configuration["dbSubnetGroup"]["vpcId"], "vpc-1");
    }

    #[test]
    fn cluster_keeps_parameter_group_and_roles() {
        let cluster = rds::types::DbCluster::builder()
            .db_cluster_identifier("aurora-1")
            .db_cluster_arn("arn:aws:rds:us-east-1:111122223333:cluster:aurora-1")
            .engine("aurora-postgresql")
            .db_subnet_group("private")
            .db_cluster_parameter_group("default.aurora-postgresql16")
            .associated_roles(
                rds::types::DbClusterRole::builder()
                    .role_arn("arn:aws:iam::111122223333:role/s3-import")
                    .build(),
            )
            .build();

        let converted = convert_cluster(&cluster);

        assert_eq!(converted.db_subnet_group.as_deref(), Some("private"));
        assert_eq!(
            converted.db_cluster_parameter_group.as_deref(),
            Some("default.aurora-postgresql16")
        );
        assert_eq!(
            converted.associated_role_arns,
            vec!["arn:aws:iam::111122223333:role/s3-import"]
        );
    }
}
