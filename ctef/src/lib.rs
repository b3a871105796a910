//! Chrome Trace Event Format (CTEF) envelope types.
//!
//! This library models the subset of the trace event format that DevTools-class
//! viewers need to render a V8 CPU profile as a timeline: complete (`X`),
//! instant (`I`), metadata (`M`) and profile (`P`) events, plus the document
//! envelope that wraps them with a `metadata` record.
//!
//! # Example
//!
//! ```no_run
//! use ctef::{TraceDocument, TraceMetadata, TraceWriter};
//! use std::fs::File;
//!
//! let document = TraceDocument::new(
//!     Vec::new(),
//!     TraceMetadata::devtools("2025-06-01T19:10:07.000Z".to_string()),
//! );
//!
//! let file = File::create("Trace.json").unwrap();
//! let mut writer = TraceWriter::new(file);
//! writer.write_document(&document).unwrap();
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{Read, Write};
use thiserror::Error;

/// Errors that can occur while reading or writing a trace document.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for trace document operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `source` value DevTools writes into exported traces.
pub const SOURCE_DEVTOOLS: &str = "DevTools";

/// `dataOrigin` value marking the document as trace events rather than a raw profile.
pub const DATA_ORIGIN_TRACE_EVENTS: &str = "TraceEvents";

// ============================================================================
// Phases and scopes
// ============================================================================

/// Event phase. Serialized as the single-letter code viewers dispatch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Complete event with an explicit duration.
    #[serde(rename = "X")]
    Complete,
    /// Instant event. DevTools still emits the legacy capital form.
    #[serde(rename = "I")]
    Instant,
    /// Process/thread naming.
    #[serde(rename = "M")]
    Metadata,
    /// V8 sampling profile and its chunks.
    #[serde(rename = "P")]
    Profile,
}

/// Scope of an instant event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstantScope {
    #[serde(rename = "g")]
    Global,
    #[serde(rename = "p")]
    Process,
    #[serde(rename = "t")]
    Thread,
}

// ============================================================================
// Events
// ============================================================================

/// An event with a known duration (`ph = 'X'`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteEvent {
    pub cat: String,
    pub name: String,
    pub ph: Phase,
    pub pid: u32,
    pub tid: u32,
    /// Timestamp in microseconds.
    pub ts: u64,
    /// Duration in microseconds.
    pub dur: u64,
    #[serde(default)]
    pub args: Value,
}

/// A point-in-time marker (`ph = 'I'`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstantEvent {
    pub cat: String,
    pub name: String,
    pub ph: Phase,
    pub pid: u32,
    pub tid: u32,
    pub ts: u64,
    pub s: InstantScope,
    #[serde(default)]
    pub args: Value,
}

/// Names a process or thread swimlane (`ph = 'M'`). `ts` is always 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEvent {
    pub cat: String,
    pub name: String,
    pub ph: Phase,
    pub pid: u32,
    pub tid: u32,
    pub ts: u64,
    pub args: NameArgs,
}

/// Arguments of a `process_name` / `thread_name` metadata event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameArgs {
    pub name: String,
}

/// A `Profile` or `ProfileChunk` event (`ph = 'P'`).
///
/// Every chunk of one profiling session must carry the `id` of the `Profile`
/// event that opened it, otherwise viewers cannot stitch the samples together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileEvent {
    pub cat: String,
    pub name: String,
    pub id: String,
    pub ph: Phase,
    pub pid: u32,
    pub tid: u32,
    pub ts: u64,
    #[serde(default)]
    pub args: Value,
}

/// A single trace event.
///
/// Deserialization picks the variant from the fields present: `dur` marks a
/// complete event, `s` an instant event, `id` a profile event; anything else
/// is metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TraceEvent {
    Complete(CompleteEvent),
    Instant(InstantEvent),
    Profile(ProfileEvent),
    Metadata(MetadataEvent),
}

impl TraceEvent {
    pub fn cat(&self) -> &str {
        match self {
            TraceEvent::Complete(e) => &e.cat,
            TraceEvent::Instant(e) => &e.cat,
            TraceEvent::Profile(e) => &e.cat,
            TraceEvent::Metadata(e) => &e.cat,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TraceEvent::Complete(e) => &e.name,
            TraceEvent::Instant(e) => &e.name,
            TraceEvent::Profile(e) => &e.name,
            TraceEvent::Metadata(e) => &e.name,
        }
    }

    pub fn ph(&self) -> Phase {
        match self {
            TraceEvent::Complete(e) => e.ph,
            TraceEvent::Instant(e) => e.ph,
            TraceEvent::Profile(e) => e.ph,
            TraceEvent::Metadata(e) => e.ph,
        }
    }

    pub fn pid(&self) -> u32 {
        match self {
            TraceEvent::Complete(e) => e.pid,
            TraceEvent::Instant(e) => e.pid,
            TraceEvent::Profile(e) => e.pid,
            TraceEvent::Metadata(e) => e.pid,
        }
    }

    pub fn tid(&self) -> u32 {
        match self {
            TraceEvent::Complete(e) => e.tid,
            TraceEvent::Instant(e) => e.tid,
            TraceEvent::Profile(e) => e.tid,
            TraceEvent::Metadata(e) => e.tid,
        }
    }

    pub fn ts(&self) -> u64 {
        match self {
            TraceEvent::Complete(e) => e.ts,
            TraceEvent::Instant(e) => e.ts,
            TraceEvent::Profile(e) => e.ts,
            TraceEvent::Metadata(e) => e.ts,
        }
    }

    /// Duration, for complete events only.
    pub fn dur(&self) -> Option<u64> {
        match self {
            TraceEvent::Complete(e) => Some(e.dur),
            _ => None,
        }
    }

    /// Correlation id, for profile events only.
    pub fn id(&self) -> Option<&str> {
        match self {
            TraceEvent::Profile(e) => Some(&e.id),
            _ => None,
        }
    }
}

impl From<CompleteEvent> for TraceEvent {
    fn from(event: CompleteEvent) -> Self {
        TraceEvent::Complete(event)
    }
}

impl From<InstantEvent> for TraceEvent {
    fn from(event: InstantEvent) -> Self {
        TraceEvent::Instant(event)
    }
}

impl From<MetadataEvent> for TraceEvent {
    fn from(event: MetadataEvent) -> Self {
        TraceEvent::Metadata(event)
    }
}

impl From<ProfileEvent> for TraceEvent {
    fn from(event: ProfileEvent) -> Self {
        TraceEvent::Profile(event)
    }
}

// ============================================================================
// Document envelope
// ============================================================================

/// Document-level metadata record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceMetadata {
    /// Generator of the trace.
    pub source: String,
    /// ISO-8601 wall-clock start of the trace.
    pub start_time: String,
    /// Number of logical cores of the recording machine.
    pub hardware_concurrency: u32,
    /// Kind of data held by the document.
    pub data_origin: String,
}

impl TraceMetadata {
    /// Metadata shaped like a DevTools export with the given start time.
    pub fn devtools(start_time: String) -> Self {
        Self {
            source: SOURCE_DEVTOOLS.to_string(),
            start_time,
            hardware_concurrency: 1,
            data_origin: DATA_ORIGIN_TRACE_EVENTS.to_string(),
        }
    }
}

/// The JSON object form of a trace: `{"traceEvents": [...], "metadata": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceDocument {
    pub trace_events: Vec<TraceEvent>,
    pub metadata: TraceMetadata,
}

impl TraceDocument {
    pub fn new(trace_events: Vec<TraceEvent>, metadata: TraceMetadata) -> Self {
        Self {
            trace_events,
            metadata,
        }
    }

    /// Parse a trace document from a reader.
    pub fn parse<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Iterate over the events belonging to one (pid, tid) lane.
    pub fn events_for(&self, pid: u32, tid: u32) -> impl Iterator<Item = &TraceEvent> {
        self.trace_events
            .iter()
            .filter(move |e| e.pid() == pid && e.tid() == tid)
    }
}

// ============================================================================
// Writer
// ============================================================================

/// Writer for trace documents.
///
/// # Example
///
/// ```
/// use ctef::{TraceDocument, TraceMetadata, TraceWriter};
///
/// let document = TraceDocument::new(Vec::new(), TraceMetadata::devtools(String::new()));
/// let mut writer = TraceWriter::new(Vec::new()).pretty(true);
/// writer.write_document(&document).unwrap();
/// assert!(!writer.into_inner().is_empty());
/// ```
pub struct TraceWriter<W: Write> {
    writer: W,
    pretty: bool,
}

impl<W: Write> TraceWriter<W> {
    /// Create a new trace writer producing compact JSON.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            pretty: false,
        }
    }

    /// Indent the output for human consumption.
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Write a whole document followed by a newline.
    pub fn write_document(&mut self, document: &TraceDocument) -> Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut self.writer, document)?;
        } else {
            serde_json::to_writer(&mut self.writer, document)?;
        }
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Get a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Consume this writer and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
