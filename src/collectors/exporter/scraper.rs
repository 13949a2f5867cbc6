use anyhow::Result;
use prometheus::{Counter, CounterVec, Gauge, IntCounter, Opts, Registry};
use std::time::Instant;

/// Scrape-cycle bookkeeping: duration, totals, error flags and the `searchd`
/// up gauge.
///
/// These metrics are emitted on every cycle regardless of whether the status
/// scrape succeeds; the registry makes sure one instance is always
/// registered, even when the `exporter` collector is disabled.
#[derive(Clone)]
pub struct ScraperCollector {
    last_scrape_duration: Gauge,
    last_scrape_error: Gauge,
    scrapes_total: IntCounter,
    scrape_errors_total: CounterVec,
    up: Gauge,
}

impl Default for ScraperCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ScraperCollector {
    #[must_use]
    #[allow(clippy::expect_used)]
    ///
    /// # Panics
    ///
    /// Panics if metric creation fails.
    pub fn new() -> Self {
        let last_scrape_duration = Gauge::with_opts(Opts::new(
            "sphinx_exporter_last_scrape_duration_seconds",
            "Duration of the last scrape of metrics from Sphinx.",
        ))
        .expect("sphinx_exporter_last_scrape_duration_seconds");

        let last_scrape_error = Gauge::with_opts(Opts::new(
            "sphinx_exporter_last_scrape_error",
            "Whether the last scrape of metrics from Sphinx resulted in an error (1 for error, 0 for success).",
        ))
        .expect("sphinx_exporter_last_scrape_error");

        let scrapes_total = IntCounter::with_opts(Opts::new(
            "sphinx_exporter_scrapes_total",
            "Total number of times Sphinx was scraped for metrics.",
        ))
        .expect("sphinx_exporter_scrapes_total");

        let scrape_errors_total = CounterVec::new(
            Opts::new(
                "sphinx_exporter_scrape_errors_total",
                "Total number of times an error occurred scraping Sphinx.",
            ),
            &["collector"],
        )
        .expect("sphinx_exporter_scrape_errors_total");

        let up = Gauge::with_opts(Opts::new("sphinx_up", "Whether the Sphinx server is up."))
            .expect("sphinx_up");

        Self {
            last_scrape_duration,
            last_scrape_error,
            scrapes_total,
            scrape_errors_total,
            up,
        }
    }

    /// Register the bookkeeping metrics.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails.
    pub fn register(&self, registry: &Registry) -> Result<()> {
        registry.register(Box::new(self.last_scrape_duration.clone()))?;
        registry.register(Box::new(self.last_scrape_error.clone()))?;
        registry.register(Box::new(self.scrapes_total.clone()))?;
        registry.register(Box::new(self.scrape_errors_total.clone()))?;
        registry.register(Box::new(self.up.clone()))?;
        Ok(())
    }

    /// Begin one scrape cycle. The total-scrapes counter advances here so it
    /// counts attempts, not completions.
    #[must_use]
    pub fn start_cycle(&self) -> ScrapeCycle {
        self.scrapes_total.inc();
        ScrapeCycle {
            start: Instant::now(),
            scraper: self.clone(),
        }
    }

    pub fn set_up(&self, up: bool) {
        self.up.set(if up { 1.0 } else { 0.0 });
    }

    /// Count a sub-collector failure. These are tracked per collector and do
    /// not flip the top-level error flag: that flag is reserved for
    /// connection-level problems.
    pub fn collector_error(&self, name: &str) {
        self.error_counter(name).inc();
    }

    fn error_counter(&self, name: &str) -> Counter {
        self.scrape_errors_total
            .with_label_values(&[&format!("collect.{name}")])
    }
}

/// Handle for one in-flight scrape cycle. `finish` records the elapsed time
/// and the connection-level error flag; every code path of the orchestrator
/// must call it so the meta metrics are updated exactly once per cycle.
pub struct ScrapeCycle {
    start: Instant,
    scraper: ScraperCollector,
}

impl ScrapeCycle {
    pub fn finish(self, connection_error: bool) {
        self.scraper
            .last_scrape_duration
            .set(self.start.elapsed().as_secs_f64());
        self.scraper
            .last_scrape_error
            .set(if connection_error { 1.0 } else { 0.0 });
    }
}
