//! Normalized resource envelope.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::error::EnvelopeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResourceType {
    #[serde(rename = "AWS::RDS::DBInstance")]
    DbInstance,
    #[serde(rename = "AWS::RDS::DBCluster")]
    DbCluster,
    #[serde(rename = "AWS::RDS::DBSnapshot")]
    DbSnapshot,
    #[serde(rename = "AWS::RDS::DBProxy")]
    DbProxy,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::DbInstance => "AWS::RDS::DBInstance",
            ResourceType::DbCluster => "AWS::RDS::DBCluster",
            ResourceType::DbSnapshot => "AWS::RDS::DBSnapshot",
            ResourceType::DbProxy => "AWS::RDS::DBProxy",
        }
    }

    /// Tag the emitter files the document under.
    pub fn emit_tag(&self) -> &'static str {
        match self {
            ResourceType::DbInstance => "aws.rds:dbInstance",
            ResourceType::DbCluster => "aws.rds:dbCluster",
            ResourceType::DbSnapshot => "aws.rds:dbSnapshot",
            ResourceType::DbProxy => "aws.rds:dbProxy",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything an envelope is built from.
#[derive(Debug, Clone)]
pub struct EnvelopeConfig {
    pub identity: String,
    pub display_name: String,
    pub resource_type: ResourceType,
    pub account_id: String,
    pub region: String,
    pub configuration: Value,
    pub creation_timestamp: Option<DateTime<Utc>>,
}

/// Snapshot a raw provider resource as a configuration document.
pub fn configuration_of<T: Serialize>(identity: &str, raw: &T) -> Result<Value, EnvelopeError> {
    serde_json::to_value(raw).map_err(|source| EnvelopeError::Configuration {
        identity: identity.to_string(),
        source,
    })
}

/// One discovered resource.
///
/// Identity, type, account and region are fixed at construction. Tags and
/// supplementary configuration only ever gain or overwrite keys.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEnvelope {
    document_id: Uuid,
    #[serde(rename = "arn")]
    identity: String,
    #[serde(rename = "resourceName")]
    display_name: String,
    resource_type: ResourceType,
    #[serde(rename = "awsAccountId")]
    account_id: String,
    #[serde(rename = "awsRegion")]
    region: String,
    #[serde(rename = "createdIso")]
    creation_timestamp: Option<DateTime<Utc>>,
    #[serde(rename = "updatedIso")]
    discovered_at: DateTime<Utc>,
    configuration: Value,
    supplementary_configuration: Map<String, Value>,
    tags: BTreeMap<String, String>,
    size_in_bytes: Option<i64>,
    max_size_in_bytes: Option<i64>,
}

impl ResourceEnvelope {
    pub fn new(config: EnvelopeConfig) -> Result<Self, EnvelopeError> {
        if config.identity.trim().is_empty() {
            return Err(EnvelopeError::EmptyIdentity {
                resource_type: config.resource_type.as_str(),
                display_name: config.display_name,
            });
        }
        Ok(Self {
            document_id: Uuid::new_v5(&Uuid::NAMESPACE_URL, config.identity.as_bytes()),
            identity: config.identity,
            display_name: config.display_name,
            resource_type: config.resource_type,
            account_id: config.account_id,
            region: config.region,
            creation_timestamp: config.creation_timestamp,
            discovered_at: Utc::now(),
            configuration: config.configuration,
            supplementary_configuration: Map::new(),
            tags: BTreeMap::new(),
            size_in_bytes: None,
            max_size_in_bytes: None,
        })
    }

    pub fn document_id(&self) -> Uuid {
        self.document_id
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn creation_timestamp(&self) -> Option<DateTime<Utc>> {
        self.creation_timestamp
    }

    pub fn configuration(&self) -> &Value {
        &self.configuration
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn supplementary(&self) -> &Map<String, Value> {
        &self.supplementary_configuration
    }

    pub fn size_in_bytes(&self) -> Option<i64> {
        self.size_in_bytes
    }

    pub fn max_size_in_bytes(&self) -> Option<i64> {
        self.max_size_in_bytes
    }

    /// Later pairs win on duplicate keys.
    pub fn merge_tags<I>(&mut self, tags: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.tags.extend(tags);
    }

    pub fn merge_supplementary(&mut self, key: &str, value: Value) {
        self.supplementary_configuration.insert(key.to_string(), value);
    }

    pub fn record_size(&mut self, size_in_bytes: i64, max_size_in_bytes: Option<i64>) {
        self.size_in_bytes = Some(size_in_bytes);
        self.max_size_in_bytes = max_size_in_bytes;
    }

    /// JSON document handed to the emitter.
    pub fn to_document(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
