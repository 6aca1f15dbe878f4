//! End-to-end scenarios driving the eviction manager through a sequence of
//! synchronizations with a fake clock and fake collaborators.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use evictor::{
    ActivePodsSource, Config, Container, DiskInfoProvider, EventType, EvictionManager,
    EvictionStatus, FakeClock, FsStats, GraceOverrideSeconds, MemoryStats, NodeCondition,
    NodeStats, Operator, Pod, PodAdmitAttributes, PodEphemeralStorageStats, PodKiller,
    PodMemoryStats, QosClass, Quantity, Recorder, ResourceAmounts, RuntimeStats, Signal, Summary,
    Threshold,
};

struct FakeSummaryProvider {
    summary: Mutex<Summary>,
}

impl FakeSummaryProvider {
    fn new(summary: Summary) -> Self {
        FakeSummaryProvider {
            summary: Mutex::new(summary),
        }
    }

    fn set_memory_available(&self, bytes: u64) {
        self.summary.lock().unwrap().node.memory.available_bytes = Some(bytes);
    }

    fn set_nodefs_available(&self, bytes: u64) {
        self.summary.lock().unwrap().node.fs.available_bytes = Some(bytes);
    }
}

impl evictor::model::SummaryProvider for FakeSummaryProvider {
    fn get_summary(&self) -> anyhow::Result<Summary> {
        Ok(self.summary.lock().unwrap().clone())
    }
}

struct FakeActivePods(Vec<Pod>);

impl ActivePodsSource for FakeActivePods {
    fn active_pods(&self) -> Vec<Pod> {
        self.0.clone()
    }
}

struct FakeDiskInfo(bool);

impl DiskInfoProvider for FakeDiskInfo {
    fn has_dedicated_image_fs(&self) -> anyhow::Result<bool> {
        Ok(self.0)
    }
}

#[derive(Clone)]
struct KillCall {
    pod_ref: String,
    status: EvictionStatus,
    grace_override: GraceOverrideSeconds,
}

struct FakePodKiller {
    calls: Mutex<Vec<KillCall>>,
}

impl FakePodKiller {
    fn new() -> Self {
        FakePodKiller {
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<KillCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl PodKiller for FakePodKiller {
    fn kill_pod(
        &self,
        pod: &Pod,
        status: EvictionStatus,
        grace_override: GraceOverrideSeconds,
    ) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(KillCall {
            pod_ref: pod.pod_ref(),
            status,
            grace_override,
        });
        Ok(())
    }
}

struct NoopRecorder;

impl Recorder for NoopRecorder {
    fn eventf(&self, _pod: Option<&Pod>, _event_type: EventType, _reason: &str, _message: String) {}
}

fn memory_pod(name: &str, qos: QosClass, working_set: u64) -> Pod {
    let (request, limit) = match qos {
        QosClass::BestEffort => (0, None),
        QosClass::Burstable => (100 * 1024 * 1024, Some(500 * 1024 * 1024)),
        QosClass::Guaranteed => (500 * 1024 * 1024, Some(500 * 1024 * 1024)),
    };
    Pod {
        uid: name.to_string(),
        namespace: "default".to_string(),
        name: name.to_string(),
        containers: vec![Container {
            name: "main".to_string(),
            memory: ResourceAmounts { request, limit },
            ephemeral_storage: ResourceAmounts::default(),
        }],
        memory_stats: PodMemoryStats {
            working_set_bytes: Some(working_set),
        },
        ephemeral_storage_stats: PodEphemeralStorageStats::default(),
    }
}

fn ephemeral_pod(name: &str, qos: QosClass, used: u64) -> Pod {
    let (request, limit) = match qos {
        QosClass::BestEffort => (0, None),
        QosClass::Burstable => (1024 * 1024 * 1024, Some(4 * 1024 * 1024 * 1024)),
        QosClass::Guaranteed => (4 * 1024 * 1024 * 1024, Some(4 * 1024 * 1024 * 1024)),
    };
    Pod {
        uid: name.to_string(),
        namespace: "default".to_string(),
        name: name.to_string(),
        containers: vec![Container {
            name: "main".to_string(),
            memory: ResourceAmounts::default(),
            ephemeral_storage: ResourceAmounts { request, limit },
        }],
        memory_stats: PodMemoryStats::default(),
        ephemeral_storage_stats: PodEphemeralStorageStats {
            used_bytes: Some(used),
        },
    }
}

fn memory_config() -> Config {
    Config {
        max_pod_grace_period_seconds: 5,
        pressure_transition_period: Duration::from_secs(5 * 60),
        thresholds: vec![
            Threshold {
                signal: Signal::MemoryAvailable,
                operator: Operator::LessThan,
                value: Quantity::parse("1Gi").unwrap(),
                grace_period: Duration::ZERO,
            },
            Threshold {
                signal: Signal::MemoryAvailable,
                operator: Operator::LessThan,
                value: Quantity::parse("2Gi").unwrap(),
                grace_period: Duration::from_secs(2 * 60),
            },
        ],
    }
}

fn nodefs_config() -> Config {
    Config {
        max_pod_grace_period_seconds: 5,
        pressure_transition_period: Duration::from_secs(5 * 60),
        thresholds: vec![
            Threshold {
                signal: Signal::NodeFsAvailable,
                operator: Operator::LessThan,
                value: Quantity::parse("1Gi").unwrap(),
                grace_period: Duration::ZERO,
            },
            Threshold {
                signal: Signal::NodeFsAvailable,
                operator: Operator::LessThan,
                value: Quantity::parse("2Gi").unwrap(),
                grace_period: Duration::from_secs(2 * 60),
            },
        ],
    }
}

const GIB: u64 = 1024 * 1024 * 1024;
const MIB: u64 = 1024 * 1024;

#[test]
fn memory_pressure_scenarios_s1_through_s6() {
    let pods = vec![
        memory_pod("best-effort-low", QosClass::BestEffort, 50 * MIB),
        memory_pod("best-effort-high", QosClass::BestEffort, 900 * MIB),
        memory_pod("burstable-low", QosClass::Burstable, 150 * MIB),
        memory_pod("burstable-high", QosClass::Burstable, 450 * MIB),
        memory_pod("guaranteed-low", QosClass::Guaranteed, 200 * MIB),
        memory_pod("guaranteed-high", QosClass::Guaranteed, 480 * MIB),
    ];

    let clock = Arc::new(FakeClock::new());
    let summary_provider = Arc::new(FakeSummaryProvider::new(Summary {
        node: NodeStats {
            memory: MemoryStats {
                available_bytes: Some(2 * GIB),
            },
            fs: FsStats::default(),
            runtime: RuntimeStats::default(),
        },
        pods: vec![],
    }));
    let active_pods = Arc::new(FakeActivePods(pods));
    let disk_info = Arc::new(FakeDiskInfo(true));
    let pod_killer = Arc::new(FakePodKiller::new());
    let recorder = Arc::new(NoopRecorder);

    let manager = EvictionManager::new(
        memory_config(),
        clock.clone(),
        summary_provider.clone(),
        active_pods.clone(),
        disk_info,
        pod_killer.clone(),
        recorder,
    );

    let best_effort = || PodAdmitAttributes {
        qos_class: QosClass::BestEffort,
    };
    let burstable = || PodAdmitAttributes {
        qos_class: QosClass::Burstable,
    };

    // Before any synchronization, no pressure is reported.
    assert!(!manager.is_under_memory_pressure());

    // S1 - no pressure.
    summary_provider.set_memory_available(2 * GIB);
    manager.synchronize();
    assert!(!manager.is_under_memory_pressure());
    assert!(manager.admit(best_effort()).admit);
    assert!(manager.admit(burstable()).admit);
    assert!(pod_killer.calls().is_empty());

    // S2 - soft trip, within grace.
    clock.advance(Duration::from_secs(60));
    summary_provider.set_memory_available(1500 * MIB);
    manager.synchronize();
    assert!(manager.is_under_memory_pressure());
    assert!(pod_killer.calls().is_empty());

    // S3 - soft trip, past grace: kill best-effort-high with grace override 5.
    clock.advance(Duration::from_secs(3 * 60));
    summary_provider.set_memory_available(1500 * MIB);
    manager.synchronize();
    let calls = pod_killer.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].pod_ref, "default/best-effort-high");
    assert_eq!(calls[0].grace_override, 5);
    assert_eq!(
        calls[0].status,
        EvictionStatus::OutOfResource(NodeCondition::MemoryPressure)
    );

    // S4 - reset: advance past the transition period with ample memory, then
    // hard-trip. Kill occurs immediately with grace override 0.
    clock.advance(Duration::from_secs(20 * 60));
    summary_provider.set_memory_available(3 * GIB);
    manager.synchronize();
    assert!(!manager.is_under_memory_pressure());

    summary_provider.set_memory_available(500 * MIB);
    manager.synchronize();
    let calls = pod_killer.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].pod_ref, "default/best-effort-high");
    assert_eq!(calls[1].grace_override, 0);
    assert!(!manager.admit(best_effort()).admit);
    assert!(manager.admit(burstable()).admit);

    // S5 - transition dampening: pressure persists even once memory recovers.
    summary_provider.set_memory_available(2 * GIB);
    manager.synchronize();
    assert!(manager.is_under_memory_pressure());
    assert_eq!(pod_killer.calls().len(), 2);
    assert!(!manager.admit(best_effort()).admit);

    // S6 - transition elapsed: pressure clears, admission resumes.
    clock.advance(Duration::from_secs(5 * 60));
    summary_provider.set_memory_available(2 * GIB);
    manager.synchronize();
    assert!(!manager.is_under_memory_pressure());
    assert!(manager.admit(best_effort()).admit);
    assert!(manager.admit(burstable()).admit);
}

#[test]
fn nodefs_pressure_scenarios_s1_through_s6_deny_all_qos() {
    let pods = vec![
        ephemeral_pod("best-effort-low", QosClass::BestEffort, 50 * MIB),
        ephemeral_pod("best-effort-high", QosClass::BestEffort, 900 * MIB),
        ephemeral_pod("burstable-low", QosClass::Burstable, 150 * MIB),
        ephemeral_pod("burstable-high", QosClass::Burstable, 450 * MIB),
        ephemeral_pod("guaranteed-low", QosClass::Guaranteed, 200 * MIB),
        ephemeral_pod("guaranteed-high", QosClass::Guaranteed, 480 * MIB),
    ];

    let clock = Arc::new(FakeClock::new());
    let summary_provider = Arc::new(FakeSummaryProvider::new(Summary {
        node: NodeStats {
            memory: MemoryStats::default(),
            fs: FsStats {
                available_bytes: Some(2 * GIB),
                inodes_free: Some(1_000_000),
            },
            runtime: RuntimeStats::default(),
        },
        pods: vec![],
    }));
    let active_pods = Arc::new(FakeActivePods(pods));
    let disk_info = Arc::new(FakeDiskInfo(false));
    let pod_killer = Arc::new(FakePodKiller::new());
    let recorder = Arc::new(NoopRecorder);

    let manager = EvictionManager::new(
        nodefs_config(),
        clock.clone(),
        summary_provider.clone(),
        active_pods.clone(),
        disk_info,
        pod_killer.clone(),
        recorder,
    );

    let attrs = |qos| PodAdmitAttributes { qos_class: qos };

    // S1 - no pressure: all QoS tiers admitted.
    manager.synchronize();
    assert!(!manager.is_under_disk_pressure());
    for qos in [QosClass::BestEffort, QosClass::Burstable, QosClass::Guaranteed] {
        assert!(manager.admit(attrs(qos)).admit);
    }

    // S2 - soft trip, within grace.
    clock.advance(Duration::from_secs(60));
    summary_provider.set_nodefs_available(1500 * MIB);
    manager.synchronize();
    assert!(manager.is_under_disk_pressure());
    assert!(pod_killer.calls().is_empty());

    // S3 - soft trip, past grace: disk pressure denies every QoS tier.
    clock.advance(Duration::from_secs(3 * 60));
    summary_provider.set_nodefs_available(1500 * MIB);
    manager.synchronize();
    assert_eq!(pod_killer.calls().len(), 1);
    assert_eq!(pod_killer.calls()[0].pod_ref, "default/best-effort-high");
    assert_eq!(
        pod_killer.calls()[0].status,
        EvictionStatus::OutOfResource(NodeCondition::DiskPressure)
    );
    for qos in [QosClass::BestEffort, QosClass::Burstable, QosClass::Guaranteed] {
        assert!(!manager.admit(attrs(qos)).admit);
        assert_eq!(manager.admit(attrs(qos)).reason, "OutOfDisk");
    }

    // S4 - reset, then hard trip.
    clock.advance(Duration::from_secs(20 * 60));
    summary_provider.set_nodefs_available(3 * GIB);
    manager.synchronize();
    assert!(!manager.is_under_disk_pressure());

    summary_provider.set_nodefs_available(500 * MIB);
    manager.synchronize();
    assert_eq!(pod_killer.calls().len(), 2);
    assert_eq!(pod_killer.calls()[1].grace_override, 0);

    // S5 - dampening: even with available space restored, pressure persists.
    summary_provider.set_nodefs_available(2 * GIB);
    manager.synchronize();
    assert!(manager.is_under_disk_pressure());
    assert!(!manager.admit(attrs(QosClass::Guaranteed)).admit);

    // S6 - transition elapsed: admission resumes for everyone.
    clock.advance(Duration::from_secs(5 * 60));
    summary_provider.set_nodefs_available(2 * GIB);
    manager.synchronize();
    assert!(!manager.is_under_disk_pressure());
    for qos in [QosClass::BestEffort, QosClass::Burstable, QosClass::Guaranteed] {
        assert!(manager.admit(attrs(qos)).admit);
    }
}
