//! Admission gate: a pure function from the currently reported pressure
//! set and a candidate pod's QoS class to an admit/deny decision. Reads
//! the dampened `reported(c, t)` state, never raw observations.

use std::collections::HashSet;

use crate::model::{NodeCondition, PodAdmitAttributes, PodAdmitResult, QosClass};

const ADMIT: PodAdmitResult = PodAdmitResult {
    admit: true,
    reason: "",
    message: "",
};

/// Decide whether to admit a candidate pod, given the set of node
/// conditions currently reported as true.
///
/// | condition          | QoS                    | decision |
/// |--------------------|-------------------------|----------|
/// | none                | any                     | admit    |
/// | MemoryPressure only | BestEffort              | deny (OutOfMemory) |
/// | MemoryPressure only | Burstable/Guaranteed    | admit    |
/// | DiskPressure        | any                     | deny (OutOfDisk)   |
pub fn admit(
    reported_conditions: &HashSet<NodeCondition>,
    attrs: PodAdmitAttributes,
) -> PodAdmitResult {
    if reported_conditions.contains(&NodeCondition::DiskPressure) {
        return PodAdmitResult {
            admit: false,
            reason: "OutOfDisk",
            message: "node is under disk pressure",
        };
    }

    if reported_conditions.contains(&NodeCondition::MemoryPressure)
        && attrs.qos_class == QosClass::BestEffort
    {
        return PodAdmitResult {
            admit: false,
            reason: "OutOfMemory",
            message: "node is under memory pressure and pod has no memory request/limit",
        };
    }

    ADMIT
}
