//! Per-endpoint health bookkeeping.
//!
//! # State Transitions
//! ```text
//! failure: failure_count += 1
//! success: failure_count -= 1 (floored at 0), latency stored
//! reset:   failure_count = 0
//! healthy  <=> failure_count < threshold
//! ```
//!
//! # Design Decisions
//! - Healthy is derived from the count after every update, so the flag and the
//!   count can never disagree
//! - Records are never removed; the endpoint list is fixed at construction
//! - Latency is the latest sample only, no smoothing
//! - A duplicated name resolves to its first entry

use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::failover::probe::ProbeResult;

/// Milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Health state of a single endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthRecord {
    pub healthy: bool,
    /// Epoch milliseconds of the last probe, report, or reset.
    pub last_check_ms: u64,
    /// Latest successful probe latency; `None` until the first success.
    pub latency_ms: Option<u64>,
    pub failure_count: u32,
}

impl HealthRecord {
    fn new(now_ms: u64) -> Self {
        Self {
            healthy: true,
            last_check_ms: now_ms,
            latency_ms: None,
            failure_count: 0,
        }
    }
}

/// Rolling failure counts for a fixed, ordered set of endpoints.
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    threshold: u32,
    records: Vec<HealthRecord>,
    index: HashMap<String, usize>,
}

impl HealthRegistry {
    /// Create a registry with every endpoint healthy.
    pub fn new<I, S>(names: I, threshold: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let now = now_millis();
        let mut records = Vec::new();
        let mut index = HashMap::new();
        for (i, name) in names.into_iter().enumerate() {
            match index.entry(name.into()) {
                Entry::Vacant(slot) => {
                    slot.insert(i);
                }
                Entry::Occupied(slot) => {
                    tracing::warn!(
                        endpoint = %slot.key(),
                        position = i,
                        "Duplicate endpoint name, lookups by name resolve to the first entry"
                    );
                }
            }
            records.push(HealthRecord::new(now));
        }

        Self {
            threshold: threshold.max(1),
            records,
            index,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&HealthRecord> {
        self.index_of(name).map(|i| &self.records[i])
    }

    pub fn get_at(&self, index: usize) -> Option<&HealthRecord> {
        self.records.get(index)
    }

    pub fn is_healthy_at(&self, index: usize) -> bool {
        self.records.get(index).is_some_and(|r| r.healthy)
    }

    pub fn records(&self) -> &[HealthRecord] {
        &self.records
    }

    /// Record a probe outcome by endpoint name.
    ///
    /// Returns the updated record, or `None` if the name is unknown.
    pub fn record_result(&mut self, name: &str, result: &ProbeResult) -> Option<&HealthRecord> {
        let index = self.index_of(name)?;
        self.record_result_at(index, result)
    }

    pub fn record_result_at(&mut self, index: usize, result: &ProbeResult) -> Option<&HealthRecord> {
        let threshold = self.threshold;
        let record = self.records.get_mut(index)?;

        match result {
            Ok(latency) => {
                record.failure_count = record.failure_count.saturating_sub(1);
                record.latency_ms = Some(latency.as_millis() as u64);
            }
            Err(_) => {
                record.failure_count = record.failure_count.saturating_add(1);
            }
        }
        record.healthy = record.failure_count < threshold;
        record.last_check_ms = now_millis();

        Some(record)
    }

    /// Clear the failure state of an endpoint. Returns false for unknown names.
    pub fn reset(&mut self, name: &str) -> bool {
        match self.index_of(name) {
            Some(index) => self.reset_at(index),
            None => false,
        }
    }

    pub fn reset_at(&mut self, index: usize) -> bool {
        let Some(record) = self.records.get_mut(index) else {
            return false;
        };
        record.failure_count = 0;
        record.healthy = true;
        record.last_check_ms = now_millis();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::jsonrpc::EndpointError;
    use std::time::Duration;

    fn fail() -> ProbeResult {
        Err(EndpointError::Timeout(100))
    }

    fn ok(ms: u64) -> ProbeResult {
        Ok(Duration::from_millis(ms))
    }

    #[test]
    fn test_unhealthy_after_threshold() {
        let mut registry = HealthRegistry::new(["a"], 3);

        registry.record_result("a", &fail());
        registry.record_result("a", &fail());
        assert!(registry.get("a").unwrap().healthy);

        let record = registry.record_result("a", &fail()).unwrap();
        assert_eq!(record.failure_count, 3);
        assert!(!record.healthy);
    }

    #[test]
    fn test_success_decrements_and_floors_at_zero() {
        let mut registry = HealthRegistry::new(["a"], 3);
        for _ in 0..4 {
            registry.record_result("a", &fail());
        }
        assert_eq!(registry.get("a").unwrap().failure_count, 4);

        let mut previous = 4;
        for _ in 0..6 {
            let record = registry.record_result("a", &ok(20)).unwrap();
            assert!(record.failure_count <= previous);
            previous = record.failure_count;
        }
        let record = registry.get("a").unwrap();
        assert_eq!(record.failure_count, 0);
        assert!(record.healthy);
        assert_eq!(record.latency_ms, Some(20));
    }

    #[test]
    fn test_recovery_needs_count_below_threshold() {
        let mut registry = HealthRegistry::new(["a"], 3);
        for _ in 0..4 {
            registry.record_result("a", &fail());
        }
        // 4 -> 3: still at threshold
        assert!(!registry.record_result("a", &ok(5)).unwrap().healthy);
        // 3 -> 2: below threshold
        assert!(registry.record_result("a", &ok(5)).unwrap().healthy);
    }

    #[test]
    fn test_failure_keeps_last_latency() {
        let mut registry = HealthRegistry::new(["a"], 3);
        registry.record_result("a", &ok(42));
        let record = registry.record_result("a", &fail()).unwrap();
        assert_eq!(record.latency_ms, Some(42));
        assert_eq!(record.failure_count, 1);
    }

    #[test]
    fn test_reset() {
        let mut registry = HealthRegistry::new(["a", "b"], 3);
        for _ in 0..5 {
            registry.record_result("a", &fail());
        }
        let before = registry.get("a").unwrap().last_check_ms;

        assert!(registry.reset("a"));
        let record = registry.get("a").unwrap();
        assert_eq!(record.failure_count, 0);
        assert!(record.healthy);
        assert!(record.last_check_ms >= before);

        assert!(!registry.reset("missing"));
    }

    #[test]
    fn test_unknown_name_ignored() {
        let mut registry = HealthRegistry::new(["a"], 3);
        assert!(registry.record_result("nope", &fail()).is_none());
        assert_eq!(registry.get("a").unwrap().failure_count, 0);
    }

    #[test]
    fn test_last_check_updated_on_every_result() {
        let mut registry = HealthRegistry::new(["a"], 3);
        let created = registry.get("a").unwrap().last_check_ms;
        let updated = registry.record_result("a", &ok(1)).unwrap().last_check_ms;
        assert!(updated >= created);
    }

    #[test]
    fn test_duplicate_name_resolves_to_first_entry() {
        let mut registry = HealthRegistry::new(["x", "x", "y"], 3);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.index_of("x"), Some(0));
        assert_eq!(registry.index_of("y"), Some(2));

        registry.record_result("x", &fail());
        assert_eq!(registry.get_at(0).unwrap().failure_count, 1);
        assert_eq!(registry.get_at(1).unwrap().failure_count, 0);
    }
}
