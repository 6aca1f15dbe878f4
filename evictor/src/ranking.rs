//! Victim ranking: QoS classification plus the composite comparator used
//! to pick the pod evicted for a pressured resource. Comparators are
//! composed from small, independently testable predicates.

use std::cmp::Ordering;

use crate::model::{Pod, QosClass, ResourceName};

/// Classify a pod's QoS class from its containers' declared requests and
/// limits.
///
/// - `BestEffort`: no container declares a request or limit for any
///   tracked resource.
/// - `Guaranteed`: every resource any container constrains (declares a
///   request or limit for) has an equal request and limit.
/// - `Burstable`: anything in between.
pub fn classify_qos(pod: &Pod) -> QosClass {
    let mut any_constrained = false;
    let mut all_equal = true;

    for container in &pod.containers {
        for amounts in [container.memory, container.ephemeral_storage] {
            let constrained = amounts.request > 0 || amounts.limit.is_some();
            if !constrained {
                continue;
            }
            any_constrained = true;
            match amounts.limit {
                Some(limit) if limit == amounts.request => {}
                _ => all_equal = false,
            }
        }
    }

    if !any_constrained {
        QosClass::BestEffort
    } else if all_equal {
        QosClass::Guaranteed
    } else {
        QosClass::Burstable
    }
}

fn by_qos(a: &Pod, b: &Pod) -> Ordering {
    classify_qos(a).cmp(&classify_qos(b))
}

fn by_usage_over_request(resource: ResourceName) -> impl Fn(&Pod, &Pod) -> Ordering {
    move |a, b| {
        let over_a = a.measured_usage(resource).saturating_sub(a.total_request(resource));
        let over_b = b.measured_usage(resource).saturating_sub(b.total_request(resource));
        // Descending: pods further over their own request are worse (evicted first).
        over_b.cmp(&over_a)
    }
}

fn by_absolute_usage(resource: ResourceName) -> impl Fn(&Pod, &Pod) -> Ordering {
    move |a, b| b.measured_usage(resource).cmp(&a.measured_usage(resource))
}

/// Rank `pods` from "evict first" to "evict last" for pressure on
/// `resource`. The sort is stable, so pods tying on every criterion keep
/// their relative input order.
pub fn rank_for_eviction<'a>(pods: &'a [Pod], resource: ResourceName) -> Vec<&'a Pod> {
    let usage_cmp = by_usage_over_request(resource);
    let abs_cmp = by_absolute_usage(resource);

    let mut ranked: Vec<&Pod> = pods.iter().collect();
    ranked.sort_by(|a, b| by_qos(a, b).then_with(|| usage_cmp(a, b)).then_with(|| abs_cmp(a, b)));
    ranked
}

/// The single worst-ranked pod for `resource`, i.e. the eviction victim.
pub fn pick_victim<'a>(pods: &'a [Pod], resource: ResourceName) -> Option<&'a Pod> {
    rank_for_eviction(pods, resource).into_iter().next()
}
