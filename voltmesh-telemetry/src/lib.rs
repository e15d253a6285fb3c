//! Telemetry facade for voltmesh components. Counters and numeric samples
//! stay in process so tests can assert on instrumentation without an
//! exporter.

use std::{collections::BTreeMap, sync::Arc, time::SystemTime};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct TelemetryConfig {
    /// Logical component name attached to every snapshot.
    pub component: String,
    /// Extra labels attached to every snapshot.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl TelemetryConfig {
    pub fn sample(component: &str) -> Self {
        Self {
            component: component.to_owned(),
            labels: BTreeMap::new(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::sample("voltmesh")
    }
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("counter overflow for metric {0}")]
    CounterOverflow(String),
    #[error("non-finite sample for metric {0}")]
    NonFiniteSample(String),
}

/// Running summary of one sample series.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SeriesSummary {
    pub count: u64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub last: f64,
}

impl SeriesSummary {
    fn first(value: f64) -> Self {
        Self {
            count: 1,
            mean: value,
            min: value,
            max: value,
            last: value,
        }
    }

    fn push(&mut self, value: f64) {
        self.count += 1;
        self.mean += (value - self.mean) / self.count as f64;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.last = value;
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct TelemetrySnapshot {
    pub timestamp: SystemTime,
    pub component: String,
    pub labels: BTreeMap<String, String>,
    pub counters: BTreeMap<String, u64>,
    pub series: BTreeMap<String, SeriesSummary>,
}

#[derive(Default)]
struct TelemetryState {
    counters: BTreeMap<String, u64>,
    series: BTreeMap<String, SeriesSummary>,
}

#[derive(Clone)]
pub struct TelemetryHandle {
    config: TelemetryConfig,
    state: Arc<Mutex<TelemetryState>>,
}

impl TelemetryHandle {
    pub fn from_config(config: TelemetryConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(TelemetryState::default())),
        }
    }

    pub fn component(&self) -> &str {
        &self.config.component
    }

    pub fn record_counter(&self, name: &str, delta: u64) -> Result<(), TelemetryError> {
        let mut guard = self.state.lock();
        let entry = guard.counters.entry(name.to_owned()).or_default();
        *entry = entry
            .checked_add(delta)
            .ok_or_else(|| TelemetryError::CounterOverflow(name.to_owned()))?;
        Ok(())
    }

    pub fn record_sample(&self, name: &str, value: f64) -> Result<(), TelemetryError> {
        if !value.is_finite() {
            return Err(TelemetryError::NonFiniteSample(name.to_owned()));
        }
        let mut guard = self.state.lock();
        guard
            .series
            .entry(name.to_owned())
            .and_modify(|summary| summary.push(value))
            .or_insert_with(|| SeriesSummary::first(value));
        Ok(())
    }

    /// Current counter value without clearing state.
    pub fn counter(&self, name: &str) -> u64 {
        self.state.lock().counters.get(name).copied().unwrap_or(0)
    }

    pub fn flush(&self) -> TelemetrySnapshot {
        let mut guard = self.state.lock();
        TelemetrySnapshot {
            timestamp: SystemTime::now(),
            component: self.config.component.clone(),
            labels: self.config.labels.clone(),
            counters: std::mem::take(&mut guard.counters),
            series: std::mem::take(&mut guard.series),
        }
    }
}

impl Default for TelemetryHandle {
    fn default() -> Self {
        Self::from_config(TelemetryConfig::default())
    }
}

impl std::fmt::Debug for TelemetryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryHandle")
            .field("component", &self.config.component)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn handle() -> TelemetryHandle {
        TelemetryHandle::from_config(TelemetryConfig::sample("coordinator"))
    }

    #[test]
    fn records_counters_and_samples() {
        let handle = handle();
        handle.record_counter("rounds.executed", 1).unwrap();
        handle.record_counter("rounds.executed", 2).unwrap();
        handle.record_sample("round.network_effect", 0.2).unwrap();
        handle.record_sample("round.network_effect", 0.4).unwrap();
        let snapshot = handle.flush();
        assert_eq!(snapshot.counters["rounds.executed"], 3);
        let series = &snapshot.series["round.network_effect"];
        assert_eq!(series.count, 2);
        assert!((series.mean - 0.3).abs() < 1e-12);
        assert_eq!(series.min, 0.2);
        assert_eq!(series.max, 0.4);
        assert_eq!(series.last, 0.4);
    }

    #[test]
    fn detects_counter_overflow() {
        let handle = handle();
        handle.record_counter("hub.packets_shared", u64::MAX).unwrap();
        let err = handle.record_counter("hub.packets_shared", 1).unwrap_err();
        assert!(matches!(err, TelemetryError::CounterOverflow(_)));
    }

    #[test]
    fn rejects_non_finite_samples() {
        let err = handle().record_sample("x", f64::NAN).unwrap_err();
        assert!(matches!(err, TelemetryError::NonFiniteSample(_)));
    }

    #[test]
    fn flush_clears_state() {
        let handle = handle();
        handle.record_counter("tasks.created", 1).unwrap();
        assert_eq!(handle.counter("tasks.created"), 1);
        handle.flush();
        let second = handle.flush();
        assert!(second.counters.is_empty());
        assert!(second.series.is_empty());
        assert_eq!(handle.counter("tasks.created"), 0);
    }

    #[test]
    fn config_labels_default_and_snapshot_serializes() {
        let config: TelemetryConfig =
            serde_json::from_str(r#"{"component": "hub"}"#).unwrap();
        assert_eq!(config, TelemetryConfig::sample("hub"));

        let handle = TelemetryHandle::from_config(config);
        handle.record_counter("hub.packets_shared", 2).unwrap();
        let json = serde_json::to_value(handle.flush()).unwrap();
        assert_eq!(json["component"], "hub");
        assert_eq!(json["counters"]["hub.packets_shared"], 2);
        assert_eq!(handle.counter("hub.packets_shared"), 0);
    }
}
