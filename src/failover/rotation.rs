//! Active endpoint selection.
//!
//! Ranking among healthy endpoints, best first:
//! 1. lowest latest latency (never-measured endpoints rank after measured ones)
//! 2. higher configured priority
//! 3. earlier position in the configuration

use std::cmp::Reverse;

use crate::failover::registry::HealthRegistry;
use crate::failover::EndpointConfig;

/// Index of the highest-priority endpoint, first in configuration order on ties.
pub fn initial_active(endpoints: &[EndpointConfig]) -> Option<usize> {
    (0..endpoints.len()).min_by_key(|&i| (Reverse(endpoints[i].priority), i))
}

/// Best healthy endpoint, or `None` if every endpoint is unhealthy.
pub fn select_best(registry: &HealthRegistry, endpoints: &[EndpointConfig]) -> Option<usize> {
    (0..endpoints.len())
        .filter(|&i| registry.is_healthy_at(i))
        .min_by_key(|&i| {
            let latency = registry
                .get_at(i)
                .and_then(|r| r.latency_ms)
                .unwrap_or(u64::MAX);
            (latency, Reverse(endpoints[i].priority), i)
        })
}

/// Decide whether the active endpoint must change.
///
/// Returns the new active index only when it differs from `active`. A healthy
/// active endpoint is never replaced, even by a faster one.
pub fn rotate_if_needed(
    active: Option<usize>,
    registry: &HealthRegistry,
    endpoints: &[EndpointConfig],
) -> Option<usize> {
    if let Some(current) = active {
        if registry.is_healthy_at(current) {
            return None;
        }
    }

    let best = select_best(registry, endpoints)?;
    (Some(best) != active).then_some(best)
}
