//! Signal observers: pure projections from a [`Summary`] snapshot to the
//! observed [`Quantity`] for each [`Signal`], plus the violation check.

use evictor_utils::Quantity;

use crate::model::{Signal, Summary, Threshold};

/// Observe `signal` in `summary`. Returns `None` if the backing field is
/// absent ("observation unavailable") — callers must treat that as "not
/// observed this cycle", never as zero.
///
/// `has_dedicated_image_fs` controls whether image-fs signals are read
/// from `summary.node.runtime.image_fs` or redirected to
/// `summary.node.fs` when the filesystem is shared.
pub fn observe(signal: Signal, summary: &Summary, has_dedicated_image_fs: bool) -> Option<Quantity> {
    let bytes = match signal {
        Signal::MemoryAvailable => summary.node.memory.available_bytes,
        Signal::NodeFsAvailable => summary.node.fs.available_bytes,
        Signal::NodeFsInodesFree => summary.node.fs.inodes_free,
        Signal::ImageFsAvailable => {
            if has_dedicated_image_fs {
                summary.node.runtime.image_fs.available_bytes
            } else {
                summary.node.fs.available_bytes
            }
        }
        Signal::ImageFsInodesFree => {
            if has_dedicated_image_fs {
                summary.node.runtime.image_fs.inodes_free
            } else {
                summary.node.fs.inodes_free
            }
        }
    };
    bytes.map(Quantity::from)
}

/// A threshold observed as violated this cycle, with its observed value
/// (kept for ranking/logging, not part of the threshold's own identity).
#[derive(Debug, Clone, Copy)]
pub struct Violation {
    pub threshold: Threshold,
    pub observed: Quantity,
}

/// The result of evaluating one threshold against the current summary.
///
/// `Unavailable` and `Cleared` both mean "no violation this cycle", but
/// they are bookkept differently: per spec.md §4.1/§7, a missing signal
/// field is "skipped" — the threshold's first-observed timestamp is
/// preserved, not dropped — while an observed-and-not-violated threshold
/// is actively cleared.
#[derive(Debug, Clone, Copy)]
pub enum ThresholdState {
    /// The backing summary field was absent this cycle.
    Unavailable,
    /// Observed and below the threshold value.
    Violated(Quantity),
    /// Observed and at or above the threshold value.
    Cleared,
}

/// Evaluate every configured threshold against `summary` for this cycle.
pub fn evaluate_thresholds(
    thresholds: &[Threshold],
    summary: &Summary,
    has_dedicated_image_fs: bool,
) -> Vec<(Threshold, ThresholdState)> {
    thresholds
        .iter()
        .map(|t| {
            let state = match observe(t.signal, summary, has_dedicated_image_fs) {
                None => ThresholdState::Unavailable,
                Some(observed) if observed < t.value => ThresholdState::Violated(observed),
                Some(_) => ThresholdState::Cleared,
            };
            (*t, state)
        })
        .collect()
}

/// Compute the set of thresholds violated in the current cycle:
/// `observed < threshold.value`, signal unavailable => skipped.
pub fn violated_thresholds(
    thresholds: &[Threshold],
    summary: &Summary,
    has_dedicated_image_fs: bool,
) -> Vec<Violation> {
    evaluate_thresholds(thresholds, summary, has_dedicated_image_fs)
        .into_iter()
        .filter_map(|(threshold, state)| match state {
            ThresholdState::Violated(observed) => Some(Violation { threshold, observed }),
            _ => None,
        })
        .collect()
}
