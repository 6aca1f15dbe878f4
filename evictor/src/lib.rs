//! Node-local eviction manager.
//!
//! Observes memory and filesystem pressure against operator-configured
//! thresholds, ranks candidate pods for eviction, kills at most one pod
//! per cycle to relieve pressure, and gates admission of new pods while
//! pressure is in effect.

pub mod admission;
pub mod clock;
pub mod config_parser;
pub mod driver;
pub mod error;
pub mod manager;
pub mod model;
pub mod ranking;
pub mod signals;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config_parser::parse_config;
pub use error::ConfigError;
pub use manager::EvictionManager;
pub use model::{
    ActivePodsSource, Config, Container, DiskInfoProvider, EventType, EvictionStatus, FsStats,
    GraceOverrideSeconds, MemoryStats, NodeCondition, NodeStats, Operator, Pod,
    PodAdmitAttributes, PodAdmitResult, PodEphemeralStorageStats, PodKiller, PodMemoryStats,
    QosClass, Recorder, ResourceAmounts, ResourceName, RuntimeStats, Signal, Summary, Threshold,
};
pub use ranking::{classify_qos, pick_victim, rank_for_eviction};

pub use evictor_utils::{Quantity, QuantityParseError};
