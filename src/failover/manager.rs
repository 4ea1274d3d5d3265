//! Failover manager: owns the endpoint list, the health registry and the
//! active-endpoint selection, and drives periodic health checks.

use serde::Serialize;
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::KickoffConfig;
use crate::failover::probe::{HttpProbe, Probe, ProbeResult};
use crate::failover::registry::{now_millis, HealthRecord, HealthRegistry};
use crate::failover::{rotation, EndpointConfig, FailoverError, FailoverResult};
use crate::observability::metrics;

/// Point-in-time view of one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointHealth {
    pub name: String,
    pub url: String,
    pub priority: u32,
    pub active: bool,
    #[serde(flatten)]
    pub record: HealthRecord,
}

#[derive(Debug)]
struct FailoverState {
    registry: HealthRegistry,
    active: Option<usize>,
    last_rotation_ms: Option<u64>,
}

struct PeriodicChecks {
    stop: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

/// RPC provider failover manager.
///
/// Share it as `Arc<FailoverManager>`; periodic checks need the `Arc`.
pub struct FailoverManager {
    endpoints: Vec<EndpointConfig>,
    probe: Arc<dyn Probe>,
    state: RwLock<FailoverState>,
    periodic: Mutex<Option<PeriodicChecks>>,
}

impl FailoverManager {
    /// Create a manager. The highest-priority endpoint starts active and every
    /// endpoint starts healthy.
    pub fn new(endpoints: Vec<EndpointConfig>, unhealthy_threshold: u32, probe: Arc<dyn Probe>) -> Self {
        let registry = HealthRegistry::new(endpoints.iter().map(|e| e.name.clone()), unhealthy_threshold);
        let active = rotation::initial_active(&endpoints);

        match active {
            Some(i) => tracing::info!(
                endpoints = endpoints.len(),
                active = %endpoints[i].name,
                threshold = registry.threshold(),
                "Failover manager initialized"
            ),
            None => tracing::warn!("Failover manager initialized without endpoints"),
        }

        for endpoint in &endpoints {
            metrics::record_endpoint_health(&endpoint.name, true);
        }

        Self {
            endpoints,
            probe,
            state: RwLock::new(FailoverState {
                registry,
                active,
                last_rotation_ms: None,
            }),
            periodic: Mutex::new(None),
        }
    }

    /// Build a manager probing over HTTP from the loaded configuration.
    pub fn from_config(config: &KickoffConfig) -> FailoverResult<Self> {
        let endpoints = config
            .endpoints
            .iter()
            .map(|spec| EndpointConfig::from_spec(spec, &config.failover))
            .collect::<FailoverResult<Vec<_>>>()?;

        Ok(Self::new(
            endpoints,
            config.failover.unhealthy_threshold,
            Arc::new(HttpProbe::new()),
        ))
    }

    pub fn endpoints(&self) -> &[EndpointConfig] {
        &self.endpoints
    }

    /// The endpoint downstream callers should use.
    ///
    /// When every endpoint is unhealthy this is still the last active one;
    /// `None` only when no endpoints are configured.
    pub fn active_endpoint(&self) -> Option<EndpointConfig> {
        let state = self.read_state();
        state.active.map(|i| self.endpoints[i].clone())
    }

    /// Epoch milliseconds of the most recent rotation.
    pub fn last_rotation(&self) -> Option<u64> {
        self.read_state().last_rotation_ms
    }

    /// Snapshot of every endpoint, in configuration order.
    pub fn health_status(&self) -> Vec<EndpointHealth> {
        let state = self.read_state();
        self.endpoints
            .iter()
            .zip(state.registry.records())
            .enumerate()
            .map(|(i, (endpoint, record))| EndpointHealth {
                name: endpoint.name.clone(),
                url: endpoint.url.to_string(),
                priority: endpoint.priority,
                active: state.active == Some(i),
                record: record.clone(),
            })
            .collect()
    }

    /// Probe every endpoint one after another, then re-evaluate the active
    /// endpoint. Probe failures are recorded, never returned.
    pub async fn run_health_checks(&self) -> Vec<EndpointHealth> {
        tracing::debug!(endpoints = self.endpoints.len(), "Running health checks");

        for (i, endpoint) in self.endpoints.iter().enumerate() {
            let result = self.probe.probe(endpoint).await;
            if let Err(e) = &result {
                tracing::debug!(endpoint = %endpoint.name, error = %e, "Health check failed");
            }
            metrics::record_probe(&endpoint.name, &result);

            let mut state = self.write_state();
            self.apply_result(&mut state, i, &result);
        }

        {
            let mut state = self.write_state();
            self.rotate(&mut state, "health check");
        }

        self.health_status()
    }

    /// Record a failure observed by a caller, without probing.
    ///
    /// If the endpoint is the active one, rotation is evaluated immediately.
    pub fn report_failure(&self, name: &str) -> FailoverResult<()> {
        let index = self.index_of(name)?;
        metrics::record_failure_report(name);

        let mut state = self.write_state();
        let result: ProbeResult = Err(crate::rpc::jsonrpc::EndpointError::Transport(
            "reported by caller".to_string(),
        ));
        self.apply_result(&mut state, index, &result);

        if state.active == Some(index) {
            self.rotate(&mut state, "failure report");
        }
        Ok(())
    }

    /// Clear an endpoint's failure state (operator override).
    ///
    /// A healthy active endpoint is never displaced. If the active endpoint
    /// is unhealthy, rotation is evaluated so the reset one can take over.
    pub fn reset_endpoint(&self, name: &str) -> FailoverResult<()> {
        let index = self.index_of(name)?;
        let mut state = self.write_state();
        state.registry.reset_at(index);
        tracing::info!(endpoint = %self.endpoints[index].name, "Endpoint reset");
        metrics::record_endpoint_health(name, true);

        self.rotate(&mut state, "endpoint reset");
        Ok(())
    }

    /// Start probing every `interval`. Returns false if checks are already
    /// running for this manager or `interval` is zero.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_periodic_checks(self: &Arc<Self>, interval: Duration) -> bool {
        if interval.is_zero() {
            tracing::warn!("Refusing to start periodic health checks with a zero interval");
            return false;
        }

        let mut periodic = self.periodic.lock().expect("periodic checks mutex poisoned");
        if periodic.as_ref().is_some_and(|p| !p.handle.is_finished()) {
            tracing::debug!("Periodic health checks already running");
            return false;
        }

        let (stop, mut stop_rx) = broadcast::channel(1);
        let manager: Weak<Self> = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.recv() => break,
                    _ = ticker.tick() => {
                        let Some(manager) = manager.upgrade() else {
                            break;
                        };
                        manager.run_health_checks().await;
                    }
                }
            }
            tracing::info!("Periodic health checks stopped");
        });

        tracing::info!(interval_ms = interval.as_millis() as u64, "Periodic health checks started");
        *periodic = Some(PeriodicChecks { stop, handle });
        true
    }

    /// Stop periodic checks. A sweep already in progress runs to completion.
    /// Returns false if checks were not running.
    pub fn stop_periodic_checks(&self) -> bool {
        let taken = self.periodic.lock().expect("periodic checks mutex poisoned").take();
        match taken {
            Some(periodic) => {
                let _ = periodic.stop.send(());
                true
            }
            None => false,
        }
    }

    pub fn periodic_checks_running(&self) -> bool {
        self.periodic
            .lock()
            .expect("periodic checks mutex poisoned")
            .as_ref()
            .is_some_and(|p| !p.handle.is_finished())
    }

    fn index_of(&self, name: &str) -> FailoverResult<usize> {
        self.read_state()
            .registry
            .index_of(name)
            .ok_or_else(|| FailoverError::UnknownEndpoint(name.to_string()))
    }

    fn apply_result(&self, state: &mut FailoverState, index: usize, result: &ProbeResult) {
        let was_healthy = state.registry.is_healthy_at(index);
        let Some(record) = state.registry.record_result_at(index, result) else {
            return;
        };
        let name = &self.endpoints[index].name;

        if was_healthy && !record.healthy {
            tracing::warn!(
                endpoint = %name,
                failure_count = record.failure_count,
                "Endpoint marked unhealthy"
            );
        } else if !was_healthy && record.healthy {
            tracing::info!(endpoint = %name, "Endpoint recovered");
        }
        metrics::record_endpoint_health(name, record.healthy);
    }

    fn rotate(&self, state: &mut FailoverState, reason: &'static str) {
        let Some(next) = rotation::rotate_if_needed(state.active, &state.registry, &self.endpoints) else {
            if state.active.is_some_and(|i| !state.registry.is_healthy_at(i)) {
                tracing::error!(reason, "No healthy RPC endpoints available, keeping last active");
            }
            return;
        };

        let from = state.active.map(|i| self.endpoints[i].name.as_str()).unwrap_or("none");
        let to = self.endpoints[next].name.as_str();
        tracing::warn!(from, to, reason, "Rotating active RPC endpoint");
        metrics::record_rotation(from, to);

        state.active = Some(next);
        state.last_rotation_ms = Some(now_millis());
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, FailoverState> {
        self.state.read().expect("failover state lock poisoned")
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, FailoverState> {
        self.state.write().expect("failover state lock poisoned")
    }
}

impl std::fmt::Debug for FailoverManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailoverManager")
            .field("endpoints", &self.endpoints.len())
            .field("active", &self.active_endpoint().map(|e| e.name))
            .finish()
    }
}
