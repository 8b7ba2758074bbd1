use crate::collector_core::Emitter;
use anyhow::Result;
use serde_json::{json, Value};

pub mod http;

pub use http::{BatchEmitter, PartialPost};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutMode {
    Stdout,
    Http,
}

impl OutMode {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "http" => OutMode::Http,
            _ => OutMode::Stdout,
        }
    }
}

/// Wire record for one emitted document.
pub fn record(resource_type_tag: &str, document: Value) -> Value {
    json!({
        "types": [resource_type_tag],
        "contents": document,
    })
}

/// One JSON line per document.
#[derive(Debug, Default)]
pub struct StdoutEmitter;

impl Emitter for StdoutEmitter {
    fn emit(&self, resource_type_tag: &str, document: Value) {
        println!("{}", record(resource_type_tag, document));
    }
}

/// Output selected by `OUT_MODE`.
pub enum Sink {
    Stdout(StdoutEmitter),
    Http(BatchEmitter),
}

impl Sink {
    /// Push out anything still buffered.
    pub async fn finish(&self) -> Result<usize> {
        match self {
            Sink::Stdout(_) => Ok(0),
            Sink::Http(batch) => batch.flush().await,
        }
    }
}

impl Emitter for Sink {
    fn emit(&self, resource_type_tag: &str, document: Value) {
        match self {
            Sink::Stdout(s) => s.emit(resource_type_tag, document),
            Sink::Http(h) => h.emit(resource_type_tag, document),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_mode_defaults_to_stdout() {
        assert_eq!(OutMode::parse("HTTP"), OutMode::Http);
        assert_eq!(OutMode::parse("stdout"), OutMode::Stdout);
        assert_eq!(OutMode::parse("whatever"), OutMode::Stdout);
    }

    #[test]
    fn record_wraps_the_document() {
        let line = record("aws.rds:dbInstance", json!({"arn": "arn:a"}));
        assert_eq!(line, json!({"types": ["aws.rds:dbInstance"], "contents": {"arn": "arn:a"}}));
    }

    #[tokio::test]
    async fn stdout_sink_has_nothing_to_flush() {
        let sink = Sink::Stdout(StdoutEmitter);
        sink.emit("aws.rds:dbProxy", json!({}));
        assert_eq!(sink.finish().await.unwrap(), 0);
    }
}
