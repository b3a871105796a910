//! Choosing the primary capture of a batch.

use crate::error::{Result, TraceError};
use crate::profile::CpuProfileInfo;

/// Pick the capture with the smallest pid, then the smallest tid.
///
/// This is a left-to-right reduction: on a full `(pid, tid)` tie the earliest
/// capture wins. The returned reference always points into `profiles`.
pub fn select_primary<'a, I>(profiles: I) -> Result<&'a CpuProfileInfo>
where
    I: IntoIterator<Item = &'a CpuProfileInfo>,
{
    let mut iter = profiles.into_iter();
    let first = iter.next().ok_or(TraceError::EmptyInput)?;

    Ok(iter.fold(first, |best, current| {
        if current.key() < best.key() {
            current
        } else {
            best
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::CpuProfile;

    fn info(pid: u32, tid: u32) -> CpuProfileInfo {
        CpuProfileInfo::new(
            pid,
            tid,
            CpuProfile {
                nodes: Vec::new(),
                start_time: 0,
                end_time: 0,
                samples: Vec::new(),
                time_deltas: None,
            },
        )
    }

    #[test]
    fn empty_input_fails() {
        let profiles: Vec<CpuProfileInfo> = Vec::new();
        assert!(matches!(
            select_primary(&profiles),
            Err(TraceError::EmptyInput)
        ));
    }

    #[test]
    fn single_profile_is_primary() {
        let profiles = vec![info(7, 9)];
        let primary = select_primary(&profiles).unwrap();
        assert!(std::ptr::eq(primary, &profiles[0]));
    }

    #[test]
    fn smallest_pid_wins() {
        let profiles = vec![info(2, 1), info(1, 5), info(3, 0)];
        let primary = select_primary(&profiles).unwrap();
        assert_eq!(primary.key(), (1, 5));
    }

    #[test]
    fn tid_breaks_pid_ties() {
        let profiles = vec![info(4, 9), info(4, 2), info(4, 3), info(5, 0)];
        let primary = select_primary(&profiles).unwrap();
        assert_eq!(primary.key(), (4, 2));
    }

    #[test]
    fn full_tie_keeps_earliest() {
        let profiles = vec![
            info(3, 1).with_source_file_path("second.js"),
            info(1, 1).with_source_file_path("first.js"),
            info(1, 1).with_source_file_path("duplicate.js"),
        ];

        let primary = select_primary(&profiles).unwrap();

        assert!(std::ptr::eq(primary, &profiles[1]));
    }

    #[test]
    fn selection_is_idempotent() {
        let profiles = vec![info(9, 9), info(2, 8), info(2, 8), info(6, 1)];

        let first = select_primary(&profiles).unwrap();
        let second = select_primary(&profiles).unwrap();

        assert!(std::ptr::eq(first, second));
        assert!(profiles.iter().any(|p| std::ptr::eq(p, first)));
    }

    #[test]
    fn accepts_borrowed_collections() {
        let a = info(5, 5);
        let b = info(5, 4);
        let refs = vec![&a, &b];

        let primary = select_primary(refs.iter().copied()).unwrap();

        assert!(std::ptr::eq(primary, &b));
    }
}
