//! Event stream written by `--stream`.
//!
//! A run is framed by `start` and `end`. Between them every titled result
//! is its own `result` event in catalogue order, followed by one `failure`
//! event per failed entry or table. Commands that produce no titled results
//! send their payload as a single `payload` event.

use std::io::Write;

use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::envelope::Envelope;
use crate::error::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Ok,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StreamEvent<'a> {
    Start {
        request_id: &'a str,
        trace_id: &'a str,
        schema_version: &'a str,
        database: &'a str,
    },
    Result {
        position: usize,
        total: usize,
        result: &'a Value,
    },
    Payload {
        data: &'a Value,
    },
    Failure {
        code: &'a str,
        message: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        target: Option<&'a str>,
    },
    End {
        status: RunStatus,
        latency_ms: u64,
        warnings: &'a [String],
        failures: usize,
    },
}

impl<'a> StreamEvent<'a> {
    /// Events describing `envelope`, given the titled results found in its data.
    pub fn sequence(envelope: &'a Envelope<Value>, results: &[&'a Value]) -> Vec<Self> {
        let meta = &envelope.meta;
        let mut events = Vec::with_capacity(results.len() + envelope.errors.len() + 2);

        events.push(Self::Start {
            request_id: &meta.request_id,
            trace_id: &meta.trace_id,
            schema_version: &meta.schema_version,
            database: &meta.database,
        });

        if results.is_empty() {
            events.push(Self::Payload {
                data: &envelope.data,
            });
        }
        events.extend(results.iter().copied().enumerate().map(|(index, result)| Self::Result {
            position: index + 1,
            total: results.len(),
            result,
        }));

        events.extend(envelope.errors.iter().map(|error| Self::Failure {
            code: &error.code,
            message: &error.message,
            target: error.target.as_deref(),
        }));

        events.push(Self::End {
            status: if envelope.errors.is_empty() {
                RunStatus::Ok
            } else {
                RunStatus::Failed
            },
            latency_ms: meta.latency_ms,
            warnings: &meta.warnings,
            failures: envelope.errors.len(),
        });

        events
    }
}

#[derive(Serialize)]
struct StreamLine<'a> {
    seq: u64,
    #[serde(with = "time::serde::rfc3339")]
    ts: OffsetDateTime,
    #[serde(flatten)]
    event: &'a StreamEvent<'a>,
}

/// Writes one JSON line per event, flushing after each.
pub struct EventStream<W: Write> {
    writer: W,
    next_seq: u64,
}

impl<W: Write> EventStream<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            next_seq: 1,
        }
    }

    pub fn send(&mut self, event: &StreamEvent<'_>) -> Result<(), CliError> {
        let line = StreamLine {
            seq: self.next_seq,
            ts: OffsetDateTime::now_utc(),
            event,
        };
        let payload = serde_json::to_string(&line)?;
        self.writer.write_all(payload.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.next_seq += 1;
        Ok(())
    }
}
