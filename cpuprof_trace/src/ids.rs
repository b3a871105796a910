//! Synthetic identifiers for the virtual page frame and profile series.
//!
//! Existing consumers expect ids built by gluing the decimal pid and tid
//! together. Those collide once digit counts vary: pid 1 / tid 23 and
//! pid 12 / tid 3 both yield profile id `0x123`, and pid 1 / tid 203 collides
//! with pid 102 / tid 3 on frame id `10203`. [`IdScheme::Packed`] avoids that
//! at the cost of producing different strings than older tools.

use serde::{Deserialize, Serialize};

/// How synthetic ids are derived from a `(pid, tid)` pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdScheme {
    /// Decimal concatenation, compatible with traces produced by older tools.
    #[default]
    Concatenated,
    /// Pid in the high 32 bits, tid in the low 32 bits. Collision-free.
    Packed,
}

impl IdScheme {
    /// Profile series id, without the `0x` prefix the events add.
    pub fn profile_id(self, pid: u32, tid: u32) -> String {
        match self {
            IdScheme::Concatenated => default_profile_id(pid, tid),
            IdScheme::Packed => format!("{:x}", (u64::from(pid) << 32) | u64::from(tid)),
        }
    }

    /// Frame tree node id of the virtual main frame.
    pub fn frame_tree_node_id(self, pid: u32, tid: u32) -> u128 {
        match self {
            IdScheme::Concatenated => frame_tree_node_id(pid, tid),
            IdScheme::Packed => (u128::from(pid) << 32) | u128::from(tid),
        }
    }
}

/// `<pid><tid>` as a decimal string.
pub fn default_profile_id(pid: u32, tid: u32) -> String {
    format!("{pid}{tid}")
}

/// The integer spelled by `<pid>0<tid>`.
///
/// Computed arithmetically so it cannot overflow for any pair of `u32`s.
pub fn frame_tree_node_id(pid: u32, tid: u32) -> u128 {
    let tid_digits = tid.checked_ilog10().unwrap_or(0) + 1;
    u128::from(pid) * 10u128.pow(tid_digits + 1) + u128::from(tid)
}

/// Label of the virtual main frame, `FRAME0P<pid>T<tid>`.
pub fn frame_name(pid: u32, tid: u32) -> String {
    format!("FRAME0P{pid}T{tid}")
}
