//! Operator-facing configuration parser.
//!
//! Accepts kubelet-style eviction flag syntax: comma-separated
//! `signal<value` pairs for threshold expressions (e.g.
//! `memory.available<1Gi,nodefs.available<500Mi`) and a parallel
//! comma-separated `signal=duration` mapping for soft-threshold grace
//! periods (e.g. `memory.available=2m,nodefs.available=90s`).

use std::collections::HashMap;
use std::time::Duration;

use evictor_utils::Quantity;

use crate::error::ConfigError;
use crate::model::{Config, Operator, Signal, Threshold};

/// Parse a `signal<value` threshold expression list. Rejects unknown
/// signal names and any operator other than `<`.
fn parse_threshold_expr(expr: &str) -> Result<Vec<(Signal, Quantity)>, ConfigError> {
    let mut out = Vec::new();
    for raw in expr.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (signal_name, rest) = raw
            .split_once('<')
            .ok_or_else(|| ConfigError::MalformedExpression(raw.to_string()))?;

        // Anything left before `rest` that still contains a comparison
        // character is an operator we don't support.
        if rest.contains(['<', '>', '=']) {
            return Err(ConfigError::InvalidOperator(rest.to_string(), signal_name.to_string()));
        }

        let signal = Signal::parse(signal_name)
            .ok_or_else(|| ConfigError::UnknownSignal(signal_name.to_string()))?;
        let value = Quantity::parse(rest)
            .map_err(|e| ConfigError::InvalidQuantity(raw.to_string(), e))?;
        out.push((signal, value));
    }
    Ok(out)
}

/// Parse a `signal=duration` grace-period mapping.
fn parse_grace_periods(expr: &str) -> Result<HashMap<Signal, Duration>, ConfigError> {
    let mut out = HashMap::new();
    for raw in expr.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (signal_name, duration_str) = raw
            .split_once('=')
            .ok_or_else(|| ConfigError::MalformedExpression(raw.to_string()))?;
        let signal = Signal::parse(signal_name)
            .ok_or_else(|| ConfigError::UnknownSignal(signal_name.to_string()))?;
        let duration = humantime::parse_duration(duration_str)
            .map_err(|_| ConfigError::MalformedExpression(raw.to_string()))?;
        if duration.is_zero() {
            return Err(ConfigError::NonPositiveGracePeriod(signal, duration_str.to_string()));
        }
        out.insert(signal, duration);
    }
    Ok(out)
}

/// Build a [`Config`] from the hard-threshold expression, the
/// soft-threshold expression, and the soft-threshold grace-period
/// mapping. Duplicate signals are allowed only if their grace periods
/// differ.
pub fn parse_config(
    hard_thresholds_expr: &str,
    soft_thresholds_expr: &str,
    soft_grace_periods_expr: &str,
    max_pod_grace_period_seconds: i64,
    pressure_transition_period: Duration,
) -> Result<Config, ConfigError> {
    let hard = parse_threshold_expr(hard_thresholds_expr)?;
    let soft = parse_threshold_expr(soft_thresholds_expr)?;
    let grace_periods = parse_grace_periods(soft_grace_periods_expr)?;

    let mut thresholds = Vec::with_capacity(hard.len() + soft.len());

    for (signal, value) in hard {
        thresholds.push(Threshold {
            signal,
            operator: Operator::LessThan,
            value,
            grace_period: Duration::ZERO,
        });
    }

    for (signal, value) in soft {
        let grace_period = *grace_periods
            .get(&signal)
            .ok_or(ConfigError::GracePeriodWithoutThreshold(
                format!("{signal:?}"),
            ))?;
        thresholds.push(Threshold {
            signal,
            operator: Operator::LessThan,
            value,
            grace_period,
        });
    }

    for i in 0..thresholds.len() {
        for j in (i + 1)..thresholds.len() {
            let (a, b) = (thresholds[i], thresholds[j]);
            if a.signal == b.signal && a.grace_period == b.grace_period {
                return Err(ConfigError::DuplicateSignalSameGrace(a.signal));
            }
        }
    }

    Ok(Config {
        max_pod_grace_period_seconds,
        pressure_transition_period,
        thresholds,
    })
}
