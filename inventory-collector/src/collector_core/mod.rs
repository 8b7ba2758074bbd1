pub mod envelope;
pub mod sink;

use async_trait::async_trait;
use anyhow::Result;

pub use envelope::{configuration_of, EnvelopeConfig, ResourceEnvelope, ResourceType};
pub use sink::{
    DiscoveryException, DiscoveryExceptions, Emission, Emitter, ExceptionLog, MemoryEmitter,
};

/// Where one service pass runs and where its output goes.
pub struct DiscoveryContext<'a> {
    pub region: &'a str,
    pub account_id: &'a str,
    pub emitter: &'a dyn Emitter,
    pub exceptions: &'a dyn DiscoveryExceptions,
}

/// Counts for one service pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoverySummary {
    pub emitted: usize,
    pub failed_categories: Vec<ResourceType>,
}

// Collector 인터페이스
#[async_trait]
pub trait Collector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Run every category of this service in `ctx.region`. Category failures
    /// go to `ctx.exceptions`; an `Err` means the pass could not start.
    async fn discover(&self, ctx: &DiscoveryContext<'_>) -> Result<DiscoverySummary>;
}
