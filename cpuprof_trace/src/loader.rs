//! Reading `.cpuprofile` files from disk.
//!
//! `node --cpu-prof` names its output
//! `CPU.<YYYYMMDD>.<HHMMSS>.<pid>.<tid>.<seq>.cpuprofile`; when a file follows
//! that pattern the capture key and start date are taken from the name.
//! Other files get pid 1 and their load position as tid.

use crate::error::{Result, TraceError};
use crate::profile::{CpuProfile, CpuProfileInfo, checked_id};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extension of V8 CPU profile files.
pub const PROFILE_EXTENSION: &str = "cpuprofile";

/// Pid assigned to files whose name carries no process id.
pub const SYNTHETIC_PID: u32 = 1;

/// Fields encoded in a Node.js CPU profile file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileFileName {
    pub start_date: DateTime<Utc>,
    pub pid: u32,
    pub tid: u32,
    pub sequence: u32,
}

/// Parse a Node.js CPU profile file name.
///
/// Returns `Ok(None)` for names that do not follow the pattern, and an error
/// only when the pattern matches but carries an out-of-range id.
pub fn parse_file_name(name: &str) -> Result<Option<ProfileFileName>> {
    let parts: Vec<&str> = name.split('.').collect();
    let [prefix, date, time, pid, tid, sequence, ext] = parts.as_slice() else {
        return Ok(None);
    };
    if *prefix != "CPU" || *ext != PROFILE_EXTENSION {
        return Ok(None);
    }

    let (Ok(date), Ok(time)) = (
        NaiveDate::parse_from_str(date, "%Y%m%d"),
        NaiveTime::parse_from_str(time, "%H%M%S"),
    ) else {
        return Ok(None);
    };
    let (Ok(pid), Ok(tid), Ok(sequence)) =
        (pid.parse::<i64>(), tid.parse::<i64>(), sequence.parse::<u32>())
    else {
        return Ok(None);
    };

    Ok(Some(ProfileFileName {
        start_date: date.and_time(time).and_utc(),
        pid: checked_id("pid", pid)?,
        tid: checked_id("tid", tid)?,
        sequence,
    }))
}

/// Read a V8 CPU profile.
pub fn load_profile(path: &Path) -> Result<CpuProfile> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Read one profile file into a capture record.
///
/// `position` is the file's index in the load order and becomes the tid when
/// the name does not carry one.
pub fn load_profile_info(path: &Path, position: usize) -> Result<CpuProfileInfo> {
    let profile = load_profile(path)?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let info = match parse_file_name(&name)? {
        Some(parsed) => {
            debug!(
                path = %path.display(),
                pid = parsed.pid,
                tid = parsed.tid,
                sequence = parsed.sequence,
                "loaded profile"
            );
            CpuProfileInfo::new(parsed.pid, parsed.tid, profile).with_start_date(parsed.start_date)
        }
        None => {
            let tid = u32::try_from(position).map_err(|_| TraceError::InvalidIdentifier {
                field: "tid",
                value: i64::try_from(position).unwrap_or(i64::MAX),
            })?;
            warn!(
                path = %path.display(),
                pid = SYNTHETIC_PID,
                tid,
                "file name carries no pid/tid, using synthetic ids"
            );
            CpuProfileInfo::new(SYNTHETIC_PID, tid, profile)
        }
    };

    Ok(info.with_source_file_path(path))
}

/// Expand inputs into profile files. Directories contribute their
/// `.cpuprofile` entries sorted by name; files are taken as given.
pub fn collect_profile_paths(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for input in inputs {
        if !input.is_dir() {
            paths.push(input.clone());
            continue;
        }

        let mut found = Vec::new();
        for entry in fs::read_dir(input)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == PROFILE_EXTENSION) {
                found.push(path);
            }
        }
        if found.is_empty() {
            return Err(TraceError::NoProfiles(input.clone()));
        }
        found.sort();
        paths.extend(found);
    }

    Ok(paths)
}

/// Load every profile named by `inputs`.
pub fn load_all(inputs: &[PathBuf]) -> Result<Vec<CpuProfileInfo>> {
    let paths = collect_profile_paths(inputs)?;
    if paths.is_empty() {
        return Err(TraceError::EmptyInput);
    }

    paths
        .iter()
        .enumerate()
        .map(|(position, path)| load_profile_info(path, position))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    const PROFILE: &str = r#"{
        "nodes": [
            {"id": 1, "callFrame": {"functionName": "(root)", "scriptId": "0", "url": "", "lineNumber": -1, "columnNumber": -1}, "hitCount": 0, "children": [2]},
            {"id": 2, "callFrame": {"functionName": "main", "scriptId": "1", "url": "file:///app.js", "lineNumber": 0, "columnNumber": 0}, "hitCount": 2}
        ],
        "startTime": 1000,
        "endTime": 1300,
        "samples": [2, 2, 1],
        "timeDeltas": [100, 100, 100]
    }"#;

    fn write(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, PROFILE).unwrap();
        path
    }

    #[test]
    fn parse_node_file_name() {
        let parsed = parse_file_name("CPU.20250601.191007.42154.0.001.cpuprofile")
            .unwrap()
            .unwrap();

        assert_eq!(parsed.pid, 42154);
        assert_eq!(parsed.tid, 0);
        assert_eq!(parsed.sequence, 1);
        assert_eq!(
            parsed.start_date,
            Utc.with_ymd_and_hms(2025, 6, 1, 19, 10, 7).unwrap()
        );
    }

    #[test]
    fn non_matching_names_are_ignored() {
        for name in [
            "profile.cpuprofile",
            "CPU.20250601.191007.42154.0.001.json",
            "HEAP.20250601.191007.42154.0.001.cpuprofile",
            "CPU.2025-06-01.191007.42154.0.001.cpuprofile",
            "CPU.20250601.191007.main.0.001.cpuprofile",
        ] {
            assert_eq!(parse_file_name(name).unwrap(), None, "{name}");
        }
    }

    #[test]
    fn negative_pid_in_name_is_rejected() {
        let result = parse_file_name("CPU.20250601.191007.-5.0.001.cpuprofile");
        assert!(matches!(
            result,
            Err(TraceError::InvalidIdentifier {
                field: "pid",
                value: -5
            })
        ));
    }

    #[test]
    fn load_named_profile() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "CPU.20250601.191007.42154.3.001.cpuprofile");

        let info = load_profile_info(&path, 7).unwrap();

        assert_eq!(info.key(), (42154, 3));
        assert!(info.start_date.is_some());
        assert_eq!(info.source_file_path.as_deref(), Some(path.as_path()));
        assert_eq!(info.cpu_profile.samples, vec![2, 2, 1]);
        assert_eq!(info.cpu_profile.nodes.len(), 2);
    }

    #[test]
    fn load_unnamed_profile_uses_position() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "app.cpuprofile");

        let info = load_profile_info(&path, 4).unwrap();

        assert_eq!(info.key(), (SYNTHETIC_PID, 4));
        assert_eq!(info.start_date, None);
    }

    #[test]
    fn invalid_json_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.cpuprofile");
        fs::write(&path, "{not json").unwrap();

        assert!(matches!(load_profile(&path), Err(TraceError::Json(_))));
    }

    #[test]
    fn missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.cpuprofile");

        assert!(matches!(load_profile(&path), Err(TraceError::Io(_))));
    }

    #[test]
    fn directories_expand_sorted() {
        let dir = TempDir::new().unwrap();
        write(&dir, "CPU.20250601.191007.2.1.002.cpuprofile");
        write(&dir, "CPU.20250601.191007.1.5.001.cpuprofile");
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let paths = collect_profile_paths(&[dir.path().to_path_buf()]).unwrap();

        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("CPU.20250601.191007.1.5.001.cpuprofile"));
        assert!(paths[1].ends_with("CPU.20250601.191007.2.1.002.cpuprofile"));
    }

    #[test]
    fn empty_directory_fails() {
        let dir = TempDir::new().unwrap();
        let result = collect_profile_paths(&[dir.path().to_path_buf()]);
        assert!(matches!(result, Err(TraceError::NoProfiles(_))));
    }

    #[test]
    fn load_all_reads_every_input() {
        let dir = TempDir::new().unwrap();
        write(&dir, "CPU.20250601.191007.2.1.002.cpuprofile");
        write(&dir, "CPU.20250601.191007.1.5.001.cpuprofile");

        let infos = load_all(&[dir.path().to_path_buf()]).unwrap();

        let keys: Vec<_> = infos.iter().map(CpuProfileInfo::key).collect();
        assert_eq!(keys, vec![(1, 5), (2, 1)]);
    }

    #[test]
    fn load_all_without_inputs_fails() {
        assert!(matches!(load_all(&[]), Err(TraceError::EmptyInput)));
    }
}
