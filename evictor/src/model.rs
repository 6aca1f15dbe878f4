//! Data model: value types for signals, thresholds, configuration, the
//! stats snapshot, and the collaborator traits the control loop is
//! parameterized over (stats provider, active-pods source, disk-info
//! probe, pod killer, event recorder).
//!
//! These traits are the seams for collaborators that live outside this
//! crate: only their interfaces matter here, not their implementations.

use std::time::Duration;

use evictor_utils::Quantity;
use serde::{Deserialize, Serialize};

/// An observable quantity. The associated resource name (used for pod
/// ranking) is returned by [`Signal::resource_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    MemoryAvailable,
    NodeFsAvailable,
    NodeFsInodesFree,
    ImageFsAvailable,
    ImageFsInodesFree,
}

impl Signal {
    pub fn resource_name(&self) -> ResourceName {
        match self {
            Signal::MemoryAvailable => ResourceName::Memory,
            Signal::NodeFsAvailable | Signal::ImageFsAvailable => ResourceName::EphemeralStorage,
            Signal::NodeFsInodesFree | Signal::ImageFsInodesFree => ResourceName::Inodes,
        }
    }

    pub fn condition(&self) -> NodeCondition {
        match self {
            Signal::MemoryAvailable => NodeCondition::MemoryPressure,
            Signal::NodeFsAvailable
            | Signal::NodeFsInodesFree
            | Signal::ImageFsAvailable
            | Signal::ImageFsInodesFree => NodeCondition::DiskPressure,
        }
    }

    pub fn parse(name: &str) -> Option<Signal> {
        match name {
            "memory.available" => Some(Signal::MemoryAvailable),
            "nodefs.available" => Some(Signal::NodeFsAvailable),
            "nodefs.inodesFree" => Some(Signal::NodeFsInodesFree),
            "imagefs.available" => Some(Signal::ImageFsAvailable),
            "imagefs.inodesFree" => Some(Signal::ImageFsInodesFree),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceName {
    Memory,
    EphemeralStorage,
    Inodes,
}

/// Comparison direction. Only `LessThan` exists today: observed value
/// below the threshold value triggers a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    LessThan,
}

/// A single configured threshold. A zero `grace_period` is a *hard*
/// threshold (immediate eviction, grace override 0); a positive one is
/// *soft* (eviction only after continuous violation, grace override
/// `max_pod_grace_period_seconds`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Threshold {
    pub signal: Signal,
    pub operator: Operator,
    pub value: Quantity,
    #[serde(with = "humantime_serde")]
    pub grace_period: Duration,
}

impl Threshold {
    pub fn is_hard(&self) -> bool {
        self.grace_period.is_zero()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub max_pod_grace_period_seconds: i64,
    #[serde(with = "humantime_serde")]
    pub pressure_transition_period: Duration,
    pub thresholds: Vec<Threshold>,
}

/// Node condition derived from the set of currently-violated thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeCondition {
    MemoryPressure,
    DiskPressure,
}

/// QoS class, derived from how a pod's containers declare requests and
/// limits. `BestEffort < Burstable < Guaranteed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QosClass {
    BestEffort,
    Burstable,
    Guaranteed,
}

/// Grace override passed to [`PodKiller::kill_pod`]: an absent override
/// would mean "use the pod's own termination grace period", but this
/// manager always supplies an explicit one (0 for hard thresholds,
/// `max_pod_grace_period_seconds` for soft).
pub type GraceOverrideSeconds = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionStatus {
    /// The triggering condition that caused this pod to be selected.
    OutOfResource(NodeCondition),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Normal,
    Warning,
}

/// Per-container resource accounting used for QoS classification and
/// ranking.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceAmounts {
    pub request: u64,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Container {
    pub name: String,
    /// Keyed by [`ResourceName`]; absent entries mean "no request/limit
    /// declared for this resource" for this container.
    pub memory: ResourceAmounts,
    pub ephemeral_storage: ResourceAmounts,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PodMemoryStats {
    pub working_set_bytes: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PodEphemeralStorageStats {
    pub used_bytes: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Pod {
    pub uid: String,
    pub namespace: String,
    pub name: String,
    pub containers: Vec<Container>,
    pub memory_stats: PodMemoryStats,
    pub ephemeral_storage_stats: PodEphemeralStorageStats,
}

impl Pod {
    pub fn pod_ref(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Sum of a named resource's requests across containers. Returns 0 if
    /// no container declares a request for that resource (best-effort
    /// for that resource).
    pub fn total_request(&self, resource: ResourceName) -> u64 {
        self.containers
            .iter()
            .map(|c| match resource {
                ResourceName::Memory => c.memory.request,
                ResourceName::EphemeralStorage => c.ephemeral_storage.request,
                ResourceName::Inodes => 0,
            })
            .sum()
    }

    /// Measured usage of a named resource (only memory working-set and
    /// ephemeral-storage are reported per pod).
    pub fn measured_usage(&self, resource: ResourceName) -> u64 {
        match resource {
            ResourceName::Memory => self.memory_stats.working_set_bytes.unwrap_or(0),
            ResourceName::EphemeralStorage => self.ephemeral_storage_stats.used_bytes.unwrap_or(0),
            ResourceName::Inodes => 0,
        }
    }
}

/// Node-level memory stats subset consumed by this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryStats {
    pub available_bytes: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FsStats {
    pub available_bytes: Option<u64>,
    pub inodes_free: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeStats {
    pub image_fs: FsStats,
}

#[derive(Debug, Clone, Default)]
pub struct NodeStats {
    pub memory: MemoryStats,
    pub fs: FsStats,
    pub runtime: RuntimeStats,
}

/// Opaque point-in-time snapshot produced by the (external) stats
/// collector. This crate only ever reads the `node` subset and the
/// `pods` list; it never mutates or persists a `Summary`.
#[derive(Debug, Clone, Default)]
pub struct Summary {
    pub node: NodeStats,
    pub pods: Vec<Pod>,
}

/// Result of an admission decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodAdmitResult {
    pub admit: bool,
    pub reason: &'static str,
    pub message: &'static str,
}

/// Minimal attributes the admission gate needs about a candidate pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PodAdmitAttributes {
    pub qos_class: QosClass,
}

/// Snapshot of the node and pod stats collaborator.
pub trait SummaryProvider: Send + Sync {
    fn get_summary(&self) -> anyhow::Result<Summary>;
}

/// Snapshot of pods currently scheduled on this node.
pub trait ActivePodsSource: Send + Sync {
    fn active_pods(&self) -> Vec<Pod>;
}

/// Whether the configured tenants/image directory lives on a dedicated
/// filesystem, separate from the node root filesystem.
pub trait DiskInfoProvider: Send + Sync {
    fn has_dedicated_image_fs(&self) -> anyhow::Result<bool>;
}

/// The actual pod-kill mechanics (signal + reap) live outside this crate;
/// this trait is the seam.
pub trait PodKiller: Send + Sync {
    fn kill_pod(
        &self,
        pod: &Pod,
        status: EvictionStatus,
        grace_override: GraceOverrideSeconds,
    ) -> anyhow::Result<()>;
}

/// Fire-and-forget audit trail.
pub trait Recorder: Send + Sync {
    fn eventf(&self, pod: Option<&Pod>, event_type: EventType, reason: &str, message: String);
}
