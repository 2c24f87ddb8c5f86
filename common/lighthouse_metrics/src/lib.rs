//! A thin wrapper around `prometheus` so every crate in the workspace registers metrics against
//! the same default registry with the same fallible, log-and-continue style: a metric that fails
//! to register (almost always a duplicate name caught during development) should never take the
//! node down, so every `try_create_*` returns a `Result` callers are expected to match on once,
//! at startup, and otherwise ignore.

pub use prometheus::{
    Encoder, Gauge, GaugeVec, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec,
    IntGauge, IntGaugeVec, Opts, Result, TextEncoder,
};

/// Collects every metric registered in the default registry and renders it in the Prometheus
/// text exposition format, for an HTTP `/metrics` handler to return verbatim.
pub fn gather() -> Vec<u8> {
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return vec![];
    }
    buffer
}

pub fn try_create_int_counter(name: &str, help: &str) -> Result<IntCounter> {
    let opts = Opts::new(name, help);
    let counter = IntCounter::with_opts(opts)?;
    prometheus::register(Box::new(counter.clone()))?;
    Ok(counter)
}

pub fn try_create_int_counter_vec(
    name: &str,
    help: &str,
    label_names: &[&str],
) -> Result<IntCounterVec> {
    let opts = Opts::new(name, help);
    let counter_vec = IntCounterVec::new(opts, label_names)?;
    prometheus::register(Box::new(counter_vec.clone()))?;
    Ok(counter_vec)
}

pub fn try_create_int_gauge(name: &str, help: &str) -> Result<IntGauge> {
    let opts = Opts::new(name, help);
    let gauge = IntGauge::with_opts(opts)?;
    prometheus::register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

pub fn try_create_int_gauge_vec(
    name: &str,
    help: &str,
    label_names: &[&str],
) -> Result<IntGaugeVec> {
    let opts = Opts::new(name, help);
    let gauge_vec = IntGaugeVec::new(opts, label_names)?;
    prometheus::register(Box::new(gauge_vec.clone()))?;
    Ok(gauge_vec)
}

pub fn try_create_float_gauge(name: &str, help: &str) -> Result<Gauge> {
    let opts = Opts::new(name, help);
    let gauge = Gauge::with_opts(opts)?;
    prometheus::register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

pub fn try_create_histogram(name: &str, help: &str) -> Result<Histogram> {
    let opts = HistogramOpts::new(name, help);
    let histogram = Histogram::with_opts(opts)?;
    prometheus::register(Box::new(histogram.clone()))?;
    Ok(histogram)
}

pub fn try_create_histogram_vec(
    name: &str,
    help: &str,
    label_names: &[&str],
) -> Result<HistogramVec> {
    let opts = HistogramOpts::new(name, help);
    let histogram_vec = HistogramVec::new(opts, label_names)?;
    prometheus::register(Box::new(histogram_vec.clone()))?;
    Ok(histogram_vec)
}

/// Starts a timer for a `Histogram` and returns an RAII guard that records the elapsed time into
/// the histogram when dropped. `metric` is typically the `Result` returned by `try_create_*` so
/// call sites can chain straight off it without an intermediate `match`.
pub fn start_timer(metric: &Result<Histogram>) -> Option<prometheus::HistogramTimer> {
    metric.as_ref().ok().map(Histogram::start_timer)
}

pub fn inc_counter(metric: &Result<IntCounter>) {
    if let Ok(counter) = metric {
        counter.inc();
    }
}

pub fn inc_counter_vec(metric: &Result<IntCounterVec>, label_values: &[&str]) {
    if let Ok(counter_vec) = metric {
        counter_vec.with_label_values(label_values).inc();
    }
}

pub fn set_gauge(metric: &Result<IntGauge>, value: i64) {
    if let Ok(gauge) = metric {
        gauge.set(value);
    }
}

pub fn set_gauge_vec(metric: &Result<IntGaugeVec>, label_values: &[&str], value: i64) {
    if let Ok(gauge_vec) = metric {
        gauge_vec.with_label_values(label_values).set(value);
    }
}

pub fn inc_gauge(metric: &Result<IntGauge>) {
    if let Ok(gauge) = metric {
        gauge.inc();
    }
}

pub fn dec_gauge(metric: &Result<IntGauge>) {
    if let Ok(gauge) = metric {
        gauge.dec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauge_roundtrip() {
        let gauge = try_create_int_gauge("lighthouse_metrics_test_gauge", "test gauge").unwrap();
        gauge.set(7);
        assert_eq!(gauge.get(), 7);
    }
}
