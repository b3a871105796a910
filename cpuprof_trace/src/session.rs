//! Assembling captures into a trace document in the order viewers expect.
//!
//! For a batch of captures the document is laid out as:
//!
//! 1. `process_name` (once per pid) and `thread_name` (once per capture)
//! 2. `TracingStartedInBrowser` and `CommitLoad` for the primary capture
//! 3. per capture: `CpuProfiler::StartProfiling`, `Profile`, one or more
//!    `ProfileChunk`s sharing the profile's id, `CpuProfiler::StopProfiling`
//! 4. optional `RunTask` slices
//!
//! Captures are visited in `(pid, tid)` order, so the primary capture always
//! comes first.

use crate::error::Result;
use crate::events::{self, CpuProfileFragment, TaskSpan};
use crate::ids::IdScheme;
use crate::profile::CpuProfileInfo;
use crate::selection::select_primary;
use ctef::{TraceDocument, TraceEvent};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::debug;

/// Knobs for document assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// URL of the virtual page. Defaults to `file://<source file>` of the
    /// primary capture, or empty when it has none.
    pub url: Option<String>,
    pub id_scheme: IdScheme,
    /// Maximum samples per `ProfileChunk`. `None` (or `Some(0)`) puts the whole
    /// profile, deltas included, in one chunk.
    pub chunk_size: Option<usize>,
    /// Emit a `RunTask` spanning each profile.
    pub run_tasks: bool,
    /// Label for every process lane. Defaults to `Process <pid>`.
    pub process_name: Option<String>,
}

/// Collects captures and emits them as one ordered trace document.
#[derive(Debug, Clone, Default)]
pub struct SessionBuilder<'a> {
    options: SessionOptions,
    captures: Vec<&'a CpuProfileInfo>,
}

impl<'a> SessionBuilder<'a> {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options,
            captures: Vec::new(),
        }
    }

    pub fn add(&mut self, info: &'a CpuProfileInfo) -> &mut Self {
        self.captures.push(info);
        self
    }

    pub fn extend<I>(&mut self, infos: I) -> &mut Self
    where
        I: IntoIterator<Item = &'a CpuProfileInfo>,
    {
        self.captures.extend(infos);
        self
    }

    /// Build the document. Fails with `EmptyInput` if no capture was added.
    pub fn build(&self) -> Result<TraceDocument> {
        let primary = select_primary(self.captures.iter().copied())?;

        let mut ordered = self.captures.clone();
        ordered.sort_by_key(|info| info.key());

        let mut trace_events: Vec<TraceEvent> = Vec::new();

        let mut named_processes = HashSet::new();
        for info in &ordered {
            if named_processes.insert(info.pid) {
                let name = self.process_name(info);
                trace_events.push(events::process_name_event(info.pid, info.tid, &name).into());
            }
            let label = events::thread_label(info);
            trace_events.push(events::thread_name_event(info.pid, info.tid, &label).into());
        }

        let url = self.url(primary);
        let trace_start = primary.cpu_profile.start_time;
        trace_events.push(
            events::tracing_started_event_with_scheme(
                self.options.id_scheme,
                primary.pid,
                primary.tid,
                trace_start,
                &url,
            )
            .into(),
        );
        trace_events
            .push(events::commit_load_event(primary.pid, primary.tid, trace_start, &url).into());

        for info in &ordered {
            self.push_profiling_session(info, &mut trace_events);
        }

        if self.options.run_tasks {
            for info in &ordered {
                let profile = &info.cpu_profile;
                let span = TaskSpan {
                    ts: profile.start_time,
                    dur: profile.end_time.saturating_sub(profile.start_time),
                };
                trace_events.push(events::run_task_event(info.pid, info.tid, span).into());
            }
        }

        debug!(
            captures = ordered.len(),
            events = trace_events.len(),
            primary_pid = primary.pid,
            primary_tid = primary.tid,
            "assembled trace document"
        );

        Ok(TraceDocument::new(
            trace_events,
            events::document_metadata(Some(primary)),
        ))
    }

    fn push_profiling_session(&self, info: &CpuProfileInfo, out: &mut Vec<TraceEvent>) {
        let (pid, tid) = info.key();
        let profile = &info.cpu_profile;
        let id = self.options.id_scheme.profile_id(pid, tid);

        out.push(events::start_profiling_event(pid, tid, profile.start_time).into());
        out.push(events::profile_event(pid, tid, profile.start_time, Some(id.as_str())).into());

        let samples = &profile.samples;
        let deltas = profile.time_deltas.as_deref();
        let Some(chunk_size) = self.options.chunk_size.filter(|&n| n > 0) else {
            out.push(
                events::profile_chunk_event(
                    pid,
                    tid,
                    profile.start_time,
                    &id,
                    CpuProfileFragment {
                        nodes: &profile.nodes,
                        samples,
                    },
                    deltas,
                )
                .into(),
            );
            out.push(events::stop_profiling_event(pid, tid, profile.end_time).into());
            debug!(pid, tid, chunks = 1, samples = samples.len(), "synthesized profiling session");
            return;
        };

        let mut start = 0;
        let mut elapsed: i64 = 0;
        let mut ts = profile.start_time;
        let mut chunks = 0;
        loop {
            let end = (start + chunk_size).min(samples.len());
            let last = end >= samples.len();
            let nodes: &[serde_json::Value] = if start == 0 {
                profile.nodes.as_slice()
            } else {
                &[]
            };
            // The last chunk also takes any deltas past the final sample.
            let chunk_deltas = deltas.map(|d| {
                let delta_end = if last { d.len() } else { end.min(d.len()) };
                &d[start.min(d.len())..delta_end]
            });

            // Negative deltas can occur; chunk timestamps must not go backwards.
            let offset = u64::try_from(elapsed).unwrap_or(0);
            ts = ts.max(profile.start_time.saturating_add(offset));

            out.push(
                events::profile_chunk_event(
                    pid,
                    tid,
                    ts,
                    &id,
                    CpuProfileFragment {
                        nodes,
                        samples: &samples[start..end],
                    },
                    chunk_deltas,
                )
                .into(),
            );
            chunks += 1;

            if let Some(chunk_deltas) = chunk_deltas {
                elapsed = elapsed.saturating_add(chunk_deltas.iter().sum::<i64>());
            }
            start = end;
            if last {
                break;
            }
        }

        out.push(events::stop_profiling_event(pid, tid, profile.end_time).into());

        debug!(pid, tid, chunks, samples = samples.len(), "synthesized profiling session");
    }

    fn process_name(&self, info: &CpuProfileInfo) -> String {
        match &self.options.process_name {
            Some(name) => name.clone(),
            None => format!("Process {}", info.pid),
        }
    }

    fn url(&self, primary: &CpuProfileInfo) -> String {
        if let Some(url) = &self.options.url {
            return url.clone();
        }
        primary
            .source_file_path
            .as_ref()
            .map(|path| {
                let path = std::path::absolute(path).unwrap_or_else(|_| path.clone());
                format!("file://{}", path.display())
            })
            .unwrap_or_default()
    }
}
