use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::Result;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::{debug, info};

static METRICS_INSTANCE: OnceLock<Metrics> = OnceLock::new();

/// Process-wide metrics, initialized on first use.
pub fn get_metrics() -> &'static Metrics {
    METRICS_INSTANCE.get_or_init(|| {
        debug!("Initializing Metrics ...");
        Metrics::new()
    })
}

pub const LOOKUP_HIT: &str = "hit";
pub const LOOKUP_MISS: &str = "miss";
pub const LOOKUP_UNREADABLE: &str = "unreadable";

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Cache metrics
    pub cache_lookups: IntCounterVec,
    pub corrupt_records: IntCounter,

    // Mint metrics
    pub mint_attempts: IntCounter,
    pub mint_failures: IntCounterVec,
    pub mint_duration: Histogram,
}

impl Metrics {
    fn new() -> Self {
        let registry = Registry::new_custom(Some("tokensheller".into()), None).expect("valid registry prefix");

        let metrics = Self {
            cache_lookups: IntCounterVec::new(Opts::new("cache_lookups_total", "Token cache lookups by result"), &["result"]).expect("metric"),
            corrupt_records: IntCounter::new("corrupt_records_total", "Token records skipped because they could not be read or decoded").expect("metric"),

            mint_attempts: IntCounter::new("mint_attempts_total", "External tool invocations").expect("metric"),
            mint_failures: IntCounterVec::new(Opts::new("mint_failures_total", "Mint failures by reason"), &["reason"]).expect("metric"),
            mint_duration: Histogram::with_opts(HistogramOpts::new("mint_duration_seconds", "External tool run time").buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0])).expect("metric"),

            registry,
        };

        let reg = &metrics.registry;
        reg.register(Box::new(metrics.cache_lookups.clone())).expect("register");
        reg.register(Box::new(metrics.corrupt_records.clone())).expect("register");
        reg.register(Box::new(metrics.mint_attempts.clone())).expect("register");
        reg.register(Box::new(metrics.mint_failures.clone())).expect("register");
        reg.register(Box::new(metrics.mint_duration.clone())).expect("register");

        metrics
    }

    /// Prometheus text exposition of everything registered.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Write the text exposition for a node-exporter textfile collector.
    /// Written to a temp sibling and renamed so the collector never reads a
    /// partial file.
    pub fn write_textfile(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("prom.tmp");
        fs::write(&tmp, self.render()?)?;
        fs::rename(&tmp, path)?;
        info!(path = %path.display(), "metrics written");
        Ok(())
    }
}
