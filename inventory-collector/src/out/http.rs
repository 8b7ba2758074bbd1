use crate::collector_core::Emitter;
use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::Value;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

const CONNECT_TIMEOUT: u64 = 5;
const READ_TIMEOUT: u64 = 60;
const RETRIES: usize = 3;

/// A batch failed after its retries. Records before `sent` were delivered.
#[derive(Debug, Error)]
#[error("posted {sent} of {total} records: {reason}")]
pub struct PartialPost {
    pub sent: usize,
    pub total: usize,
    pub reason: anyhow::Error,
}

/// Buffers emitted documents and posts them in batches on `flush`.
pub struct BatchEmitter {
    endpoint: String,
    batch_size: usize,
    batch_flush_ms: u64,
    buffer: Mutex<Vec<Value>>,
}

impl BatchEmitter {
    pub fn new(endpoint: impl Into<String>, batch_size: usize, batch_flush_ms: u64) -> Self {
        Self {
            endpoint: endpoint.into(),
            batch_size: batch_size.max(1),
            batch_flush_ms,
            buffer: Mutex::new(Vec::new()),
        }
    }

    pub fn pending(&self) -> usize {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Post every buffered record; returns how many were sent.
    ///
    /// On failure the unsent records go back to the front of the buffer and
    /// the error is a [`PartialPost`] carrying the delivered count.
    pub async fn flush(&self) -> Result<usize> {
        let records = std::mem::take(&mut *self.buffer.lock().unwrap_or_else(PoisonError::into_inner));
        match post_batches(&self.endpoint, &records, self.batch_size, self.batch_flush_ms).await {
            Ok(sent) => Ok(sent),
            Err(failed) => {
                let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
                let later = std::mem::take(&mut *buffer);
                buffer.extend(records.into_iter().skip(failed.sent));
                buffer.extend(later);
                warn!(sent = failed.sent, requeued = buffer.len(), "Flush stopped early");
                Err(failed.into())
            }
        }
    }
}

impl Emitter for BatchEmitter {
    fn emit(&self, resource_type_tag: &str, document: Value) {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(super::record(resource_type_tag, document));
    }
}

/// Posts `records` in order, stopping at the first batch that exhausts its
/// retries. Returns the number of records delivered.
pub async fn post_batches(
    endpoint: &str,
    records: &[Value],
    batch_size: usize,
    batch_flush_ms: u64,
) -> Result<usize, PartialPost> {
    let total = records.len();
    if total == 0 {
        return Ok(0);
    }

    let client = Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT))
        .timeout(Duration::from_secs(READ_TIMEOUT))
        .build()
        .map_err(|e| PartialPost { sent: 0, total, reason: e.into() })?;

    let mut sent = 0;
    for (n, batch) in records.chunks(batch_size.max(1)).enumerate() {
        if let Err(reason) = post_with_retry(&client, endpoint, batch).await {
            return Err(PartialPost { sent, total, reason });
        }
        sent += batch.len();
        info!(batch = n, size = batch.len(), total, "Posted batch");

        // flush 간격
        if batch_flush_ms > 0 {
            tokio::time::sleep(Duration::from_millis(batch_flush_ms)).await;
        }
    }
    Ok(sent)
}

async fn post_with_retry(client: &Client, endpoint: &str, batch: &[Value]) -> Result<()> {
    let mut last = None;
    for attempt in 1..=RETRIES {
        let res = client.post(endpoint).json(batch).send().await;
        match res {
            Ok(r) if r.status().is_success() => return Ok(()),
            Ok(r) => {
                last = Some(anyhow!("HTTP {} {}", r.status(), r.text().await.unwrap_or_default()))
            }
            Err(e) => last = Some(anyhow!("POST send error: {e}")),
        }
        warn!(attempt, endpoint, "Batch post failed, retrying");
        tokio::time::sleep(Duration::from_millis(300 * attempt as u64)).await;
    }
    Err(last.unwrap_or_else(|| anyhow!("batch post failed")))
}
