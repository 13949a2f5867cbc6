use crate::collectors::Collector;
use crate::collectors::util::parse_status_value;
use anyhow::Result;
use futures::future::BoxFuture;
use prometheus::Registry;
use sqlx::{MySqlPool, Row};
use std::sync::Arc;
use tracing::{debug, info_span, instrument};
use tracing_futures::Instrument as _;

pub mod registry;
use registry::StatusRegistry;

const STATUS_QUERY: &str = "SHOW STATUS";

/// Scrapes `SHOW STATUS` from `searchd` (default-on).
///
/// The scrape is a pure read: every row is visited, values the parser or the
/// key table cannot place are dropped without failing the cycle. An error is
/// returned only when the query itself or a row decode fails.
#[derive(Clone)]
pub struct GlobalStatusCollector {
    registry: Arc<StatusRegistry>,
}

impl GlobalStatusCollector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Arc::new(StatusRegistry::new()),
        }
    }

    async fn scrape_status(table: &StatusRegistry, pool: &MySqlPool) -> Result<()> {
        let span = info_span!(
            "db.query",
            db.system = "mysql",
            db.operation = "SHOW",
            db.statement = STATUS_QUERY,
        );
        let rows = sqlx::query(STATUS_QUERY)
            .fetch_all(pool)
            .instrument(span)
            .await?;

        for row in rows {
            // Column names differ across Sphinx and Manticore builds;
            // decode by position.
            let key: String = row.try_get(0)?;
            let raw: String = row.try_get(1)?;
            let key = key.to_ascii_lowercase();

            let Some(value) = parse_status_value(&raw) else {
                debug!(key, value = raw, "skipping unparsable status value");
                table.count_unhandled();
                continue;
            };
            if !table.record(&key, value) {
                debug!(key, "skipping unrecognized status key");
                table.count_unhandled();
            }
        }

        Ok(())
    }
}

impl Collector for GlobalStatusCollector {
    fn name(&self) -> &'static str {
        "global_status"
    }

    #[instrument(
        skip(self, registry),
        level = "info",
        err,
        fields(collector = "global_status")
    )]
    fn register_metrics(&self, registry: &Registry) -> Result<()> {
        self.registry.register(registry)
    }

    #[instrument(skip(self, pool), level = "info", err, fields(collector = "global_status"))]
    fn collect<'a>(&'a self, pool: &'a MySqlPool) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { Self::scrape_status(&self.registry, pool).await })
    }

    fn enabled_by_default(&self) -> bool {
        true
    }
}

impl Default for GlobalStatusCollector {
    fn default() -> Self {
        Self::new()
    }
}
