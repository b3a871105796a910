//! Capture records and the V8 CPU profile payload.

use crate::error::{Result, TraceError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A V8 CPU profile as written to a `.cpuprofile` file.
///
/// Nodes are passed through untouched; only the sample list and time deltas
/// are sliced when a profile is split into chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuProfile {
    /// Call tree nodes, opaque.
    pub nodes: Vec<serde_json::Value>,
    /// Profile start time in microseconds.
    pub start_time: u64,
    /// Profile end time in microseconds.
    pub end_time: u64,
    /// Node ID at the top of the stack for each sample.
    #[serde(default)]
    pub samples: Vec<u64>,
    /// Microsecond gaps between consecutive samples.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_deltas: Option<Vec<i64>>,
}

/// One captured profile and where it came from.
///
/// `(pid, tid)` is the capture key and is expected to be unique within a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct CpuProfileInfo {
    pub pid: u32,
    pub tid: u32,
    /// Script or profile file the capture belongs to. Only used for labels.
    pub source_file_path: Option<PathBuf>,
    /// Arguments the profiled process was started with. Only used for labels.
    pub exec_args: Option<Vec<String>>,
    /// Wall-clock start of the capture.
    pub start_date: Option<DateTime<Utc>>,
    pub cpu_profile: CpuProfile,
}

impl CpuProfileInfo {
    pub fn new(pid: u32, tid: u32, cpu_profile: CpuProfile) -> Self {
        Self {
            pid,
            tid,
            source_file_path: None,
            exec_args: None,
            start_date: None,
            cpu_profile,
        }
    }

    /// Build a capture from untrusted signed ids, rejecting anything that is
    /// not a valid process or thread id.
    pub fn try_new(pid: i64, tid: i64, cpu_profile: CpuProfile) -> Result<Self> {
        Ok(Self::new(
            checked_id("pid", pid)?,
            checked_id("tid", tid)?,
            cpu_profile,
        ))
    }

    pub fn with_source_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_file_path = Some(path.into());
        self
    }

    pub fn with_exec_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exec_args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_start_date(mut self, start_date: DateTime<Utc>) -> Self {
        self.start_date = Some(start_date);
        self
    }

    /// The capture key, ordered by pid first, then tid.
    pub fn key(&self) -> (u32, u32) {
        (self.pid, self.tid)
    }
}

/// Narrow a signed identifier to a process/thread id.
pub fn checked_id(field: &'static str, value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| TraceError::InvalidIdentifier { field, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_profile() -> CpuProfile {
        CpuProfile {
            nodes: Vec::new(),
            start_time: 0,
            end_time: 0,
            samples: Vec::new(),
            time_deltas: None,
        }
    }

    #[test]
    fn parse_cpuprofile() {
        let data = r#"{
            "nodes": [{"id": 1, "callFrame": {"functionName": "(root)"}, "children": [2]}],
            "startTime": 1000,
            "endTime": 2000,
            "samples": [1, 1],
            "timeDeltas": [10, 20]
        }"#;

        let profile: CpuProfile = serde_json::from_str(data).unwrap();

        assert_eq!(profile.nodes.len(), 1);
        assert_eq!(profile.nodes[0]["callFrame"]["functionName"], "(root)");
        assert_eq!(profile.start_time, 1000);
        assert_eq!(profile.end_time, 2000);
        assert_eq!(profile.samples, vec![1, 1]);
        assert_eq!(profile.time_deltas, Some(vec![10, 20]));
    }

    #[test]
    fn missing_samples_and_deltas_default() {
        let data = r#"{"nodes": [], "startTime": 5, "endTime": 6}"#;

        let profile: CpuProfile = serde_json::from_str(data).unwrap();

        assert!(profile.samples.is_empty());
        assert_eq!(profile.time_deltas, None);
    }

    #[test]
    fn try_new_rejects_negative_ids() {
        let result = CpuProfileInfo::try_new(-1, 0, empty_profile());
        assert!(matches!(
            result,
            Err(TraceError::InvalidIdentifier {
                field: "pid",
                value: -1
            })
        ));

        let result = CpuProfileInfo::try_new(1, -7, empty_profile());
        assert!(matches!(
            result,
            Err(TraceError::InvalidIdentifier {
                field: "tid",
                value: -7
            })
        ));
    }

    #[test]
    fn try_new_rejects_oversized_ids() {
        let result = CpuProfileInfo::try_new(i64::from(u32::MAX) + 1, 0, empty_profile());
        assert!(matches!(
            result,
            Err(TraceError::InvalidIdentifier { field: "pid", .. })
        ));
    }

    #[test]
    fn builder_methods_fill_optional_fields() {
        let info = CpuProfileInfo::try_new(12, 3, empty_profile())
            .unwrap()
            .with_source_file_path("/a/b/worker.js")
            .with_exec_args(["--flag", "x"]);

        assert_eq!(info.key(), (12, 3));
        assert_eq!(
            info.source_file_path.as_deref(),
            Some(std::path::Path::new("/a/b/worker.js"))
        );
        assert_eq!(
            info.exec_args,
            Some(vec!["--flag".to_string(), "x".to_string()])
        );
        assert_eq!(info.start_date, None);
    }
}
