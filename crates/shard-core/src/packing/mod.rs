//! Bin-packing engines: the LPT fast path and the CKK anytime optimizer.
//!
//! Both share one cost function parameterized by the file-affinity penalty
//! `p` rather than maintaining two code paths (see DESIGN.md "Polymorphism").

mod ckk;
mod lpt;

pub use ckk::{ckk_schedule, CkkResult};
pub use lpt::{lpt_pack, PackResult, PackableTest};

use crate::timing::DurationMs;

/// The effective per-shard cost used to pick a destination shard: the raw
/// load plus the candidate's own duration, plus the affinity penalty only
/// when the candidate's file is not already present on that shard.
pub(crate) fn effective_cost(raw_load: DurationMs, duration: DurationMs, joins_new_file: bool, penalty: DurationMs) -> DurationMs {
    raw_load + duration + if joins_new_file { penalty } else { 0 }
}
