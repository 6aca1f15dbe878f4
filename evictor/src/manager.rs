//! The eviction manager control loop.
//!
//! `EvictionManager::synchronize` is the single entry point that fetches
//! a stats snapshot, updates threshold/condition bookkeeping, and — if a
//! threshold has been continuously violated past its grace period —
//! selects and kills exactly one victim pod. `is_under_memory_pressure`,
//! `is_under_disk_pressure`, and `admit` are read-only and safe to call
//! from any thread while a synchronization is in flight.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::admission::admit as admission_admit;
use crate::clock::Clock;
use crate::model::{
    ActivePodsSource, Config, DiskInfoProvider, EventType, EvictionStatus, NodeCondition,
    PodAdmitAttributes, PodAdmitResult, PodKiller, Recorder, SummaryProvider, Threshold,
};
use crate::ranking::{classify_qos, pick_victim};
use crate::signals::{evaluate_thresholds, ThresholdState, Violation};

/// Bookkeeping mutated only by `synchronize`, read by the admission-facing
/// queries. Guarded by a single reader-writer lock.
#[derive(Default)]
struct State {
    /// Timestamp of first continuous violation, per threshold. Cleared on
    /// any cycle that observes the threshold as not violated; preserved
    /// (neither refreshed nor cleared) on a cycle where the backing signal
    /// is unavailable.
    thresholds_first_observed_at: HashMap<Threshold, Instant>,
    /// Last time each condition was observed raw-true.
    node_conditions_last_observed_at: HashMap<NodeCondition, Instant>,
    /// The most recently computed raw(c, t) per condition, used by the
    /// read-only queries between synchronizations.
    raw_conditions: HashMap<NodeCondition, bool>,
}

pub struct EvictionManager {
    config: Config,
    clock: Arc<dyn Clock>,
    summary_provider: Arc<dyn SummaryProvider>,
    active_pods_source: Arc<dyn ActivePodsSource>,
    disk_info_provider: Arc<dyn DiskInfoProvider>,
    pod_killer: Arc<dyn PodKiller>,
    recorder: Arc<dyn Recorder>,
    state: RwLock<State>,
}

impl EvictionManager {
    pub fn new(
        config: Config,
        clock: Arc<dyn Clock>,
        summary_provider: Arc<dyn SummaryProvider>,
        active_pods_source: Arc<dyn ActivePodsSource>,
        disk_info_provider: Arc<dyn DiskInfoProvider>,
        pod_killer: Arc<dyn PodKiller>,
        recorder: Arc<dyn Recorder>,
    ) -> Self {
        EvictionManager {
            config,
            clock,
            summary_provider,
            active_pods_source,
            disk_info_provider,
            pod_killer,
            recorder,
            state: RwLock::new(State::default()),
        }
    }

    pub fn is_under_memory_pressure(&self) -> bool {
        self.reported(NodeCondition::MemoryPressure)
    }

    pub fn is_under_disk_pressure(&self) -> bool {
        self.reported(NodeCondition::DiskPressure)
    }

    /// `reported(c, t) = raw(c, t) OR (now - lastObserved[c] < transition)`.
    /// Takes only a shared lock; never blocks on `synchronize` longer than
    /// a read acquisition.
    fn reported(&self, condition: NodeCondition) -> bool {
        let now = self.clock.now();
        let guard = self.state.read();
        let raw = guard.raw_conditions.get(&condition).copied().unwrap_or(false);
        if raw {
            return true;
        }
        match guard.node_conditions_last_observed_at.get(&condition) {
            Some(last) => now.saturating_duration_since(*last) < self.config.pressure_transition_period,
            None => false,
        }
    }

    /// Admission gate. Read-only; never blocks.
    pub fn admit(&self, attrs: PodAdmitAttributes) -> PodAdmitResult {
        let mut reported = std::collections::HashSet::new();
        if self.is_under_memory_pressure() {
            reported.insert(NodeCondition::MemoryPressure);
        }
        if self.is_under_disk_pressure() {
            reported.insert(NodeCondition::DiskPressure);
        }
        admission_admit(&reported, attrs)
    }

    /// One control-loop iteration. Fetches a stats snapshot, updates
    /// bookkeeping, and kills at most one pod.
    #[instrument(skip_all)]
    pub fn synchronize(&self) {
        let summary = match self.summary_provider.get_summary() {
            Ok(summary) => summary,
            Err(e) => {
                warn!("failed to fetch summary, skipping cycle: {e:#}");
                return;
            }
        };

        let has_dedicated_image_fs = match self.disk_info_provider.has_dedicated_image_fs() {
            Ok(v) => v,
            Err(e) => {
                warn!("failed to probe disk info, skipping cycle: {e:#}");
                return;
            }
        };

        let now = self.clock.now();
        let threshold_states = evaluate_thresholds(&self.config.thresholds, &summary, has_dedicated_image_fs);
        let violations: Vec<Violation> = threshold_states
            .iter()
            .filter_map(|(threshold, state)| match state {
                ThresholdState::Violated(observed) => Some(Violation {
                    threshold: *threshold,
                    observed: *observed,
                }),
                _ => None,
            })
            .collect();

        let actionable = {
            let mut guard = self.state.write();
            self.update_bookkeeping(&mut guard, &threshold_states, now);
            self.compute_actionable(&guard, &violations, now)
        };

        if actionable.is_empty() {
            return;
        }

        let pressure_summary = actionable
            .iter()
            .map(|v| format!("{:?}<{} (observed {})", v.threshold.signal, v.threshold.value, v.observed))
            .collect::<Vec<_>>()
            .join(", ");
        self.recorder.eventf(
            None,
            EventType::Warning,
            "EvictionThresholdMet",
            format!("node is under pressure: {pressure_summary}"),
        );
        info!(thresholds = %pressure_summary, "eviction thresholds actionable");

        let Some(triggering) = self.pick_triggering_threshold(&actionable) else {
            return;
        };

        let resource = triggering.threshold.signal.resource_name();
        let active_pods = self.active_pods_source.active_pods();

        let Some(victim) = pick_victim(&active_pods, resource) else {
            self.recorder.eventf(
                None,
                EventType::Warning,
                "EvictionThresholdMet",
                "threshold actionable but no active pods to evict".to_string(),
            );
            warn!("actionable threshold but no active pods to evict");
            return;
        };

        let grace_override = if triggering.threshold.is_hard() {
            0
        } else {
            self.config.max_pod_grace_period_seconds
        };
        let status = EvictionStatus::OutOfResource(triggering.threshold.signal.condition());

        debug!(
            pod = %victim.pod_ref(),
            qos = ?classify_qos(victim),
            grace_override,
            "selected eviction victim"
        );

        match self.pod_killer.kill_pod(victim, status, grace_override) {
            Ok(()) => {
                self.recorder.eventf(
                    Some(victim),
                    EventType::Normal,
                    "EvictionThresholdMet",
                    format!("evicted pod to relieve pressure on {resource:?}"),
                );
            }
            Err(e) => {
                warn!(pod = %victim.pod_ref(), "kill_pod failed: {e:#}");
                self.recorder.eventf(
                    Some(victim),
                    EventType::Warning,
                    "EvictionThresholdMet",
                    format!("failed to evict pod: {e:#}"),
                );
            }
        }
    }

    /// `Violated` records (or keeps) a first-observed timestamp; `Cleared`
    /// drops it. `Unavailable` touches nothing — a transient missing-field
    /// gap must not restart a grace-period clock already in progress.
    fn update_bookkeeping(
        &self,
        state: &mut State,
        threshold_states: &[(Threshold, ThresholdState)],
        now: Instant,
    ) {
        for (threshold, threshold_state) in threshold_states {
            match threshold_state {
                ThresholdState::Violated(_) => {
                    state.thresholds_first_observed_at.entry(*threshold).or_insert(now);
                }
                ThresholdState::Cleared => {
                    state.thresholds_first_observed_at.remove(threshold);
                }
                ThresholdState::Unavailable => {}
            }
        }

        for condition in [NodeCondition::MemoryPressure, NodeCondition::DiskPressure] {
            let raw = threshold_states.iter().any(|(threshold, threshold_state)| {
                matches!(threshold_state, ThresholdState::Violated(_))
                    && threshold.signal.condition() == condition
            });
            state.raw_conditions.insert(condition, raw);
            if raw {
                state.node_conditions_last_observed_at.insert(condition, now);
            }
        }
    }

    fn compute_actionable(&self, state: &State, violations: &[Violation], now: Instant) -> Vec<Violation> {
        violations
            .iter()
            .filter(|v| {
                state
                    .thresholds_first_observed_at
                    .get(&v.threshold)
                    .map(|first| now.saturating_duration_since(*first) >= v.threshold.grace_period)
                    .unwrap_or(false)
            })
            .copied()
            .collect()
    }

    /// Prefer hard thresholds over soft; among equals, prefer the one
    /// violated longest.
    fn pick_triggering_threshold<'a>(&self, actionable: &'a [Violation]) -> Option<&'a Violation> {
        let guard = self.state.read();
        actionable.iter().min_by_key(|v| {
            let hard_rank = if v.threshold.is_hard() { 0 } else { 1 };
            let first_observed = guard
                .thresholds_first_observed_at
                .get(&v.threshold)
                .copied()
                .unwrap_or_else(|| self.clock.now());
            (hard_rank, first_observed)
        })
    }
}
