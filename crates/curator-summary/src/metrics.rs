
use lazy_static::lazy_static;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;
use tracing::warn;

lazy_static! {
    static ref REGISTRY: Registry = Registry::new();
}

static SUMMARIZE_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();
static GENERATION_SECONDS: OnceLock<Histogram> = OnceLock::new();

/// Register collectors. Safe to call more than once.
pub fn init_metrics() -> prometheus::Result<()> {
    if SUMMARIZE_COUNTER.get().is_none() {
        let counter = IntCounterVec::new(
            Opts::new("summarize_requests_total", "Summarize requests by outcome"),
            &["outcome"],
        )?;
        if SUMMARIZE_COUNTER.set(counter.clone()).is_ok() {
            REGISTRY.register(Box::new(counter))?;
        }
    }

    if GENERATION_SECONDS.get().is_none() {
        let histogram = Histogram::with_opts(
            HistogramOpts::new(
                "summary_generation_seconds",
                "Time spent waiting on the generation backend",
            )
            .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 40.0, 80.0]),
        )?;
        if GENERATION_SECONDS.set(histogram.clone()).is_ok() {
            REGISTRY.register(Box::new(histogram))?;
        }
    }

    Ok(())
}

pub fn inc_summarize(outcome: &str) {
    if let Some(counter) = SUMMARIZE_COUNTER.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

pub fn observe_generation(seconds: f64) {
    if let Some(histogram) = GENERATION_SECONDS.get() {
        histogram.observe(seconds);
    }
}

/// Prometheus text exposition of everything registered.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
