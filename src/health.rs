// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-helios project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Health checks
//!
//! The queue worker and the metrics exporter each keep a health flag that flips
//! to unhealthy when their loop stops on a transport failure. [`HealthCheck`]
//! gives both a common face, and [`HealthRegistry`] aggregates them for
//! whatever surface reports health to a supervisor.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::exporter::ExporterState;
use crate::queue::ProcessorState;

/// Outcome of a health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl From<bool> for HealthStatus {
    fn from(healthy: bool) -> Self {
        if healthy {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }
}

/// A component able to report its own health.
pub trait HealthCheck: Send + Sync {
    /// Name under which the check is reported.
    fn name(&self) -> &'static str;

    fn status(&self) -> HealthStatus;

    /// Time of the last status change.
    fn last_update(&self) -> DateTime<Utc>;
}

impl HealthCheck for ProcessorState {
    fn name(&self) -> &'static str {
        "helios_queue"
    }

    fn status(&self) -> HealthStatus {
        self.is_healthy().into()
    }

    fn last_update(&self) -> DateTime<Utc> {
        ProcessorState::last_update(self)
    }
}

impl HealthCheck for ExporterState {
    fn name(&self) -> &'static str {
        "helios_exporter"
    }

    fn status(&self) -> HealthStatus {
        self.is_healthy().into()
    }

    fn last_update(&self) -> DateTime<Utc> {
        ExporterState::last_update(self)
    }
}

/// Result of one check, as reported by [`HealthRegistry::report`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub name: &'static str,
    pub status: HealthStatus,
    pub last_update: DateTime<Utc>,
}

/// Set of registered health checks.
#[derive(Clone, Default)]
pub struct HealthRegistry {
    checks: Vec<Arc<dyn HealthCheck>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, check: Arc<dyn HealthCheck>) {
        self.checks.push(check);
    }

    pub fn report(&self) -> Vec<HealthReport> {
        self.checks
            .iter()
            .map(|check| HealthReport {
                name: check.name(),
                status: check.status(),
                last_update: check.last_update(),
            })
            .collect()
    }

    /// Healthy when every registered check is healthy.
    pub fn status(&self) -> HealthStatus {
        self.checks
            .iter()
            .all(|check| check.status() == HealthStatus::Healthy)
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_aggregates_checks() {
        let processor = ProcessorState::new();
        let exporter = ExporterState::new();

        let mut registry = HealthRegistry::new();
        registry.register(Arc::new(processor.clone()));
        registry.register(Arc::new(exporter.clone()));
        assert_eq!(registry.status(), HealthStatus::Healthy);

        exporter.set_healthy(false);
        assert_eq!(registry.status(), HealthStatus::Unhealthy);

        let report = registry.report();
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].name, "helios_queue");
        assert_eq!(report[0].status, HealthStatus::Healthy);
        assert_eq!(report[1].name, "helios_exporter");
        assert_eq!(report[1].status, HealthStatus::Unhealthy);
    }

    #[test]
    fn test_empty_registry_is_healthy() {
        assert_eq!(HealthRegistry::new().status(), HealthStatus::Healthy);
    }
}
