//! Output and diagnostics channels of a discovery pass.

use serde_json::Value;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::error;

use super::envelope::ResourceType;
use crate::error::ProviderError;

/// Receives each envelope document once.
pub trait Emitter: Send + Sync {
    fn emit(&self, resource_type_tag: &str, document: Value);
}

/// Receives category-level failures.
pub trait DiscoveryExceptions: Send + Sync {
    fn on_discovery_exception(
        &self,
        resource_type: ResourceType,
        resource_id: Option<&str>,
        region: &str,
        error: &ProviderError,
    );
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    pub tag: String,
    pub document: Value,
}

/// Keeps emitted documents in memory.
#[derive(Debug, Default)]
pub struct MemoryEmitter {
    emitted: Mutex<Vec<Emission>>,
}

impl MemoryEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emissions(&self) -> Vec<Emission> {
        lock(&self.emitted).clone()
    }

    pub fn documents(&self, tag: &str) -> Vec<Value> {
        lock(&self.emitted)
            .iter()
            .filter(|e| e.tag == tag)
            .map(|e| e.document.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.emitted).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn take(&self) -> Vec<Emission> {
        std::mem::take(&mut *lock(&self.emitted))
    }
}

impl Emitter for MemoryEmitter {
    fn emit(&self, resource_type_tag: &str, document: Value) {
        lock(&self.emitted).push(Emission {
            tag: resource_type_tag.to_string(),
            document,
        });
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryException {
    pub resource_type: ResourceType,
    pub resource_id: Option<String>,
    pub region: String,
    pub error: ProviderError,
}

/// Logs category failures and keeps them for the end-of-run summary.
#[derive(Debug, Default)]
pub struct ExceptionLog {
    entries: Mutex<Vec<DiscoveryException>>,
}

impl ExceptionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<DiscoveryException> {
        lock(&self.entries).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiscoveryExceptions for ExceptionLog {
    fn on_discovery_exception(
        &self,
        resource_type: ResourceType,
        resource_id: Option<&str>,
        region: &str,
        err: &ProviderError,
    ) {
        error!(
            resource_type = %resource_type,
            resource_id = resource_id.unwrap_or("-"),
            region = %region,
            error_kind = err.kind(),
            error = %err,
            "Discovery failed"
        );
        lock(&self.entries).push(DiscoveryException {
            resource_type,
            resource_id: resource_id.map(str::to_string),
            region: region.to_string(),
            error: err.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn memory_emitter_keeps_order_and_tags() {
        let emitter = MemoryEmitter::new();
        emitter.emit("aws.rds:dbProxy", json!({"arn": "p"}));
        emitter.emit("aws.rds:dbInstance", json!({"arn": "i"}));
        assert_eq!(emitter.len(), 2);
        assert_eq!(emitter.documents("aws.rds:dbInstance"), vec![json!({"arn": "i"})]);
        assert_eq!(emitter.take().len(), 2);
        assert!(emitter.is_empty());
    }

    #[test]
    fn exception_log_records_each_failure() {
        let log = ExceptionLog::new();
        log.on_discovery_exception(
            ResourceType::DbCluster,
            None,
            "eu-west-1",
            &ProviderError::client("timeout"),
        );
        let entries = log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].resource_type, ResourceType::DbCluster);
        assert_eq!(entries[0].resource_id, None);
        assert_eq!(entries[0].region, "eu-west-1");
    }
}
