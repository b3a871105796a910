//! Constructors for the trace events a CPU profile needs to render in DevTools.
//!
//! Every function here builds one event from its arguments and nothing else.
//! The order events end up in is decided by the caller; see
//! [`crate::session::SessionBuilder`] for the order viewers expect.

use crate::ids::{self, IdScheme};
use crate::profile::CpuProfileInfo;
use chrono::{SecondsFormat, Utc};
use ctef::{
    CompleteEvent, InstantEvent, InstantScope, MetadataEvent, NameArgs, Phase, ProfileEvent,
    TraceMetadata,
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::path::Path;

pub const CATEGORY_V8: &str = "v8";
pub const CATEGORY_CPU_PROFILER: &str = "v8.cpu_profiler";
pub const CATEGORY_METADATA: &str = "__metadata";
pub const CATEGORY_TIMELINE: &str = "devtools.timeline";

/// Duration given to the synthetic `CommitLoad` event.
pub const COMMIT_LOAD_DURATION_US: u64 = 10;

/// The slice of a CPU profile carried by one `ProfileChunk`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CpuProfileFragment<'a> {
    pub nodes: &'a [Value],
    pub samples: &'a [u64],
}

/// Time span of a synthetic scheduler task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSpan {
    pub ts: u64,
    pub dur: u64,
}

pub fn start_profiling_event(pid: u32, tid: u32, start_time: u64) -> CompleteEvent {
    CompleteEvent {
        cat: CATEGORY_V8.to_string(),
        name: "CpuProfiler::StartProfiling".to_string(),
        ph: Phase::Complete,
        pid,
        tid,
        ts: start_time,
        dur: 0,
        args: json!({ "data": { "startTime": start_time } }),
    }
}

/// Open a profile series. Without an explicit `id` (or with an empty one) the
/// series id is `0x<pid><tid>`, which is a decimal concatenation and not a hex
/// number.
pub fn profile_event(pid: u32, tid: u32, start_time: u64, id: Option<&str>) -> ProfileEvent {
    let id = match id {
        Some(id) if !id.is_empty() => format!("0x{id}"),
        _ => format!("0x{}", ids::default_profile_id(pid, tid)),
    };

    ProfileEvent {
        cat: CATEGORY_CPU_PROFILER.to_string(),
        name: "Profile".to_string(),
        id,
        ph: Phase::Profile,
        pid,
        tid,
        ts: start_time,
        args: json!({ "data": { "startTime": start_time } }),
    }
}

/// Append samples to the series opened by [`profile_event`] with the same `id`.
pub fn profile_chunk_event(
    pid: u32,
    tid: u32,
    start_time: u64,
    id: &str,
    fragment: CpuProfileFragment<'_>,
    time_deltas: Option<&[i64]>,
) -> ProfileEvent {
    let mut data = Map::new();
    data.insert("cpuProfile".to_string(), json!(fragment));
    if let Some(time_deltas) = time_deltas {
        data.insert("timeDeltas".to_string(), json!(time_deltas));
    }

    ProfileEvent {
        cat: CATEGORY_CPU_PROFILER.to_string(),
        name: "ProfileChunk".to_string(),
        id: format!("0x{id}"),
        ph: Phase::Profile,
        pid,
        tid,
        ts: start_time,
        args: json!({ "data": data }),
    }
}

pub fn stop_profiling_event(pid: u32, tid: u32, end_time: u64) -> CompleteEvent {
    CompleteEvent {
        cat: CATEGORY_V8.to_string(),
        name: "CpuProfiler::StopProfiling".to_string(),
        ph: Phase::Complete,
        pid,
        tid,
        ts: end_time,
        dur: 0,
        args: json!({ "data": { "endTime": end_time } }),
    }
}

pub fn thread_name_event(pid: u32, tid: u32, name: &str) -> MetadataEvent {
    name_event("thread_name", pid, tid, name)
}

pub fn process_name_event(pid: u32, tid: u32, name: &str) -> MetadataEvent {
    name_event("process_name", pid, tid, name)
}

fn name_event(kind: &str, pid: u32, tid: u32, name: &str) -> MetadataEvent {
    MetadataEvent {
        cat: CATEGORY_METADATA.to_string(),
        name: kind.to_string(),
        ph: Phase::Metadata,
        pid,
        tid,
        ts: 0,
        args: NameArgs {
            name: name.to_string(),
        },
    }
}

/// A `RunTask` slice so the viewer shows the thread as busy.
pub fn run_task_event(pid: u32, tid: u32, span: TaskSpan) -> CompleteEvent {
    CompleteEvent {
        cat: CATEGORY_TIMELINE.to_string(),
        name: "RunTask".to_string(),
        ph: Phase::Complete,
        pid,
        tid,
        ts: span.ts,
        dur: span.dur,
        args: json!({}),
    }
}

/// `TracingStartedInBrowser` with a single main frame, using legacy frame ids.
pub fn tracing_started_event(pid: u32, tid: u32, trace_start_ts: u64, url: &str) -> InstantEvent {
    tracing_started_event_with_scheme(IdScheme::Concatenated, pid, tid, trace_start_ts, url)
}

pub fn tracing_started_event_with_scheme(
    scheme: IdScheme,
    pid: u32,
    tid: u32,
    trace_start_ts: u64,
    url: &str,
) -> InstantEvent {
    InstantEvent {
        cat: CATEGORY_TIMELINE.to_string(),
        name: "TracingStartedInBrowser".to_string(),
        ph: Phase::Instant,
        pid,
        tid,
        ts: trace_start_ts,
        s: InstantScope::Thread,
        args: json!({
            "data": {
                "frameTreeNodeId": json_integer(scheme.frame_tree_node_id(pid, tid)),
                "frames": [{
                    "frame": ids::frame_name(pid, tid),
                    "isInPrimaryMainFrame": true,
                    "isOutermostMainFrame": true,
                    "name": "",
                    "processId": pid,
                    "url": url,
                }],
                "persistentIds": true,
            }
        }),
    }
}

/// `CommitLoad` for the virtual main frame announced by [`tracing_started_event`].
pub fn commit_load_event(pid: u32, tid: u32, ts: u64, url: &str) -> CompleteEvent {
    let frame = ids::frame_name(pid, tid);
    CompleteEvent {
        cat: CATEGORY_TIMELINE.to_string(),
        name: "CommitLoad".to_string(),
        ph: Phase::Complete,
        pid,
        tid,
        ts,
        dur: COMMIT_LOAD_DURATION_US,
        args: json!({
            "data": {
                "frame": frame,
                "isMainFrame": true,
                "isOutermostMainFrame": true,
                "name": "",
                "page": frame,
                "url": url,
            }
        }),
    }
}

/// `<basename of source file> <exec args joined by spaces>`.
///
/// Missing parts are treated as empty; the separating space is always present.
pub fn thread_label(info: &CpuProfileInfo) -> String {
    let base = info
        .source_file_path
        .as_deref()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let args = info
        .exec_args
        .as_deref()
        .map(|args| args.join(" "))
        .unwrap_or_default();

    format!("{base} {args}")
}

/// Document metadata, stamped with the capture's start date or the current time.
pub fn document_metadata(info: Option<&CpuProfileInfo>) -> TraceMetadata {
    let start = info
        .and_then(|info| info.start_date)
        .unwrap_or_else(Utc::now);

    TraceMetadata::devtools(start.to_rfc3339_opts(SecondsFormat::Millis, true))
}

// Numbers past u64 only fit JSON as doubles.
fn json_integer(n: u128) -> Value {
    match u64::try_from(n) {
        Ok(n) => Value::from(n),
        Err(_) => Value::from(n as f64),
    }
}
