mod rds;

pub use rds::RdsCollector;

use crate::collector_core::Collector;
use crate::error::ConfigError;
use crate::metrics::MetricWindows;
use crate::provider::ClientProvider;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Rds,
}

impl ServiceKind {
    pub fn parse_list(s: &str) -> Result<Vec<ServiceKind>, ConfigError> {
        s.split(',')
            .map(|x| x.trim().to_lowercase())
            .filter(|x| !x.is_empty())
            .map(|x| match x.as_str() {
                "rds" => Ok(ServiceKind::Rds),
                _ => Err(ConfigError::UnknownService(x)),
            })
            .collect()
    }
}

pub fn build_collectors(
    services: &[ServiceKind],
    provider: Arc<dyn ClientProvider>,
    windows: &MetricWindows,
) -> Vec<Arc<dyn Collector>> {
    let mut v: Vec<Arc<dyn Collector>> = vec![];
    for svc in services {
        match svc {
            ServiceKind::Rds => v.push(Arc::new(RdsCollector::new(
                Arc::clone(&provider),
                windows.clone(),
            ))),
        }
    }
    v
}
