//! Immutable mapping from lowercase `SHOW STATUS` keys to their metrics.
//!
//! The table is built once when the collector is constructed and only read
//! afterwards; per-key mutable state is limited to the last-seen atomics that
//! back the monotonic counters.

use anyhow::Result;
use prometheus::{Counter, CounterVec, Gauge, IntCounter, Opts, Registry};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

const NAMESPACE: &str = "sphinx";
const SUBSYSTEM: &str = "status";

/// Commands reported by `searchd` as `command_<name>` status keys. Only these
/// exact keys match; the suffix becomes the `command` label value.
const COMMANDS: &[&str] = &[
    "search",
    "excerpt",
    "update",
    "delete",
    "keywords",
    "persist",
    "status",
    "flushattrs",
];

fn opts(name: &str, help: &str) -> Opts {
    Opts::new(name, help)
        .namespace(NAMESPACE)
        .subsystem(SUBSYSTEM)
}

enum StatusMetric {
    /// Instantaneous value, overwritten on every scrape.
    Gauge(Gauge),
    /// Monotonic server counter. The exposed counter advances by the delta
    /// between consecutive observations and starts over when the server
    /// value regresses (server restart).
    Counter { counter: Counter, last: AtomicU64 },
    /// Entry of the shared `command` family.
    Command {
        command: &'static str,
        last: AtomicU64,
    },
}

pub struct StatusRegistry {
    entries: HashMap<String, StatusMetric>,
    commands: CounterVec,
    unhandled: IntCounter,
}

impl StatusRegistry {
    #[must_use]
    #[allow(clippy::expect_used)]
    /// Build the key table.
    ///
    /// # Panics
    ///
    /// Panics if metric creation fails (static names, should never happen).
    pub fn new() -> Self {
        let gauge = |name: &str, help: &str| {
            StatusMetric::Gauge(Gauge::with_opts(opts(name, help)).expect("valid metric name"))
        };
        let counter = |name: &str, help: &str| StatusMetric::Counter {
            counter: Counter::with_opts(opts(name, help)).expect("valid metric name"),
            last: AtomicU64::new(0),
        };

        let mut entries = HashMap::new();

        // Instantaneous server state.
        entries.insert("uptime".to_string(), gauge("uptime", "Uptime of the Sphinx server in seconds."));
        entries.insert("connections".to_string(), gauge("connections", "Connections to the Sphinx server."));
        entries.insert("maxed_out".to_string(), gauge("maxed_out", "Queries rejected because all workers were busy."));

        // Agent traffic.
        entries.insert("agent_connect".to_string(), counter("agent_connect", "Agent connects."));
        entries.insert("agent_retry".to_string(), counter("agent_retry", "Agent retries."));

        // Query counts and timing.
        entries.insert("queries".to_string(), counter("queries", "Queries."));
        entries.insert("dist_queries".to_string(), counter("dist_queries", "Distributed queries."));
        entries.insert("query_wall".to_string(), counter("query_wall", "Wall time spent on queries."));
        entries.insert("query_cpu".to_string(), counter("query_cpu", "CPU time spent on queries."));
        entries.insert("dist_wall".to_string(), counter("dist_wall", "Wall time spent on distributed queries."));
        entries.insert("dist_local".to_string(), counter("dist_local", "Time spent on the local part of distributed queries."));
        entries.insert("dist_wait".to_string(), counter("dist_wait", "Total time spent waiting on agents."));

        // Read I/O.
        entries.insert("query_reads".to_string(), counter("query_reads", "Query read operations."));
        entries.insert("query_readkb".to_string(), counter("query_readkb", "Kilobytes read by queries."));
        entries.insert("query_readtime".to_string(), counter("query_readtime", "Time spent reading for queries."));

        for &command in COMMANDS {
            entries.insert(
                format!("command_{command}"),
                StatusMetric::Command {
                    command,
                    last: AtomicU64::new(0),
                },
            );
        }

        let commands = CounterVec::new(opts("command", "Commands."), &["command"])
            .expect("valid metric name");

        let unhandled = IntCounter::with_opts(opts(
            "unhandled_total",
            "Status rows dropped because the key or value was not recognized.",
        ))
        .expect("valid metric name");

        Self {
            entries,
            commands,
            unhandled,
        }
    }

    /// Register every metric family owned by the table.
    ///
    /// Registered families are part of every exposition from then on: they
    /// report 0 until a scrape populates them and keep their last value when
    /// a later scrape fails. Consumers must gate on `sphinx_up` to tell live
    /// samples from leftovers.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric fails to register.
    pub fn register(&self, registry: &Registry) -> Result<()> {
        for metric in self.entries.values() {
            match metric {
                StatusMetric::Gauge(g) => registry.register(Box::new(g.clone()))?,
                StatusMetric::Counter { counter, .. } => {
                    registry.register(Box::new(counter.clone()))?;
                }
                // The command family is shared; registered once below.
                StatusMetric::Command { .. } => {}
            }
        }
        registry.register(Box::new(self.commands.clone()))?;
        registry.register(Box::new(self.unhandled.clone()))?;
        Ok(())
    }

    /// Record one status row. Returns `false` when the key has no entry; the
    /// caller decides how to account for dropped rows.
    ///
    /// Keys must already be lowercase.
    #[must_use]
    pub fn record(&self, key: &str, value: f64) -> bool {
        match self.entries.get(key) {
            Some(StatusMetric::Gauge(g)) => g.set(value),
            Some(StatusMetric::Counter { counter, last }) => Self::advance(counter, last, value),
            Some(StatusMetric::Command { command, last }) => {
                Self::advance(&self.commands.with_label_values(&[command]), last, value);
            }
            None => return false,
        }
        true
    }

    /// Count a row dropped by parse failure or registry miss. The drop stays
    /// silent at the scrape level; this counter is the only trace.
    pub fn count_unhandled(&self) {
        self.unhandled.inc();
    }

    fn advance(counter: &Counter, last: &AtomicU64, value: f64) {
        if value < 0.0 {
            return;
        }
        let previous = f64::from_bits(last.swap(value.to_bits(), Ordering::Relaxed));
        if previous <= 0.0 || value < previous {
            // First observation, or the server counter went backwards
            // (restart): expose the absolute value again.
            counter.reset();
            counter.inc_by(value);
        } else {
            counter.inc_by(value - previous);
        }
    }
}

impl Default for StatusRegistry {
    fn default() -> Self {
        Self::new()
    }
}
