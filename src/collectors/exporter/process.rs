use crate::collectors::Collector;
use anyhow::Result;
use futures::future::BoxFuture;
use prometheus::{Gauge, IntGauge, Opts, Registry};
use sqlx::MySqlPool;
use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::{instrument, warn};

/// Monitors the `sphinx_exporter` process itself.
#[derive(Clone)]
pub struct ProcessCollector {
    cpu_percent: Gauge,
    resident_memory_bytes: IntGauge,
    virtual_memory_bytes: IntGauge,
    open_fds: IntGauge,
    start_time_seconds: Gauge,
    system: Arc<Mutex<SystemState>>,
    pid: Pid,
}

struct SystemState {
    system: System,
    last_cpu_refresh: Option<Instant>,
}

impl Default for ProcessCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessCollector {
    #[must_use]
    #[allow(clippy::expect_used)]
    ///
    /// # Panics
    ///
    /// Panics if metric creation fails.
    pub fn new() -> Self {
        let cpu_percent = Gauge::with_opts(Opts::new(
            "sphinx_exporter_process_cpu_percent",
            "Current CPU usage percentage (matches ps %cpu, can exceed 100%)",
        ))
        .expect("sphinx_exporter_process_cpu_percent");

        let resident_memory_bytes = IntGauge::with_opts(Opts::new(
            "sphinx_exporter_process_resident_memory_bytes",
            "Resident memory size in bytes (RSS)",
        ))
        .expect("sphinx_exporter_process_resident_memory_bytes");

        let virtual_memory_bytes = IntGauge::with_opts(Opts::new(
            "sphinx_exporter_process_virtual_memory_bytes",
            "Virtual memory size in bytes (VSZ)",
        ))
        .expect("sphinx_exporter_process_virtual_memory_bytes");

        let open_fds = IntGauge::with_opts(Opts::new(
            "sphinx_exporter_process_open_fds",
            "Number of open file descriptors",
        ))
        .expect("sphinx_exporter_process_open_fds");

        let start_time_seconds = Gauge::with_opts(Opts::new(
            "sphinx_exporter_process_start_time_seconds",
            "Start time of the process since unix epoch in seconds",
        ))
        .expect("sphinx_exporter_process_start_time_seconds");

        let start_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        start_time_seconds.set(start_time);

        #[allow(clippy::cast_possible_truncation)]
        let pid = Pid::from(std::process::id() as usize);

        Self {
            cpu_percent,
            resident_memory_bytes,
            virtual_memory_bytes,
            open_fds,
            start_time_seconds,
            system: Arc::new(Mutex::new(SystemState {
                system: System::new(),
                last_cpu_refresh: None,
            })),
            pid,
        }
    }

    fn collect_stats(&self) {
        let mut state = match self.system.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("SystemState mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        };

        state
            .system
            .refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);

        let now = Instant::now();
        // CPU usage needs two samples spaced far enough apart; keep the old
        // reading between refreshes.
        let cpu_ready = state
            .last_cpu_refresh
            .is_none_or(|last| now.duration_since(last) >= sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);

        if let Some(process) = state.system.process(self.pid) {
            self.resident_memory_bytes
                .set(i64::try_from(process.memory()).unwrap_or(0));
            self.virtual_memory_bytes
                .set(i64::try_from(process.virtual_memory()).unwrap_or(0));

            if cpu_ready {
                self.cpu_percent.set(f64::from(process.cpu_usage()));
            }
        }

        if cpu_ready {
            state.last_cpu_refresh = Some(now);
        }

        #[cfg(target_os = "linux")]
        {
            if let Ok(entries) = std::fs::read_dir(format!("/proc/{}/fd", self.pid)) {
                self.open_fds
                    .set(i64::try_from(entries.count()).unwrap_or(0));
            }
        }
    }
}

impl Collector for ProcessCollector {
    fn name(&self) -> &'static str {
        "metrics.process"
    }

    fn register_metrics(&self, registry: &Registry) -> Result<()> {
        registry.register(Box::new(self.cpu_percent.clone()))?;
        registry.register(Box::new(self.resident_memory_bytes.clone()))?;
        registry.register(Box::new(self.virtual_memory_bytes.clone()))?;
        registry.register(Box::new(self.open_fds.clone()))?;
        registry.register(Box::new(self.start_time_seconds.clone()))?;
        Ok(())
    }

    #[instrument(skip(self, _pool), level = "debug")]
    fn collect<'a>(&'a self, _pool: &'a MySqlPool) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.collect_stats();
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registers_without_error() {
        let collector = ProcessCollector::new();
        let registry = Registry::new();
        assert!(collector.register_metrics(&registry).is_ok());
    }

    #[test]
    fn test_collect_stats_sets_memory() {
        let collector = ProcessCollector::new();
        collector.collect_stats();
        assert!(collector.resident_memory_bytes.get() > 0);
    }

    #[test]
    fn test_start_time_is_set() {
        let collector = ProcessCollector::new();
        assert!(collector.start_time_seconds.get() > 0.0);
    }
}
