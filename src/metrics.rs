//! Prometheus metrics shared by the scanner, traders, ingestor and HTTP server.

use prometheus::{Counter, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder};

pub struct Metrics {
    registry: Registry,

    pub instruments_scanned_total: Counter,
    pub instruments_skipped_total: Counter,
    pub signals_emitted_total: Counter,
    pub provider_errors_total: Counter,
    pub notify_errors_total: Counter,
    pub scan_pass_duration_seconds: Histogram,

    pub stream_messages_total: Counter,
    pub stream_messages_discarded_total: Counter,
    pub active_traders: Gauge,

    pub bars_ingested_total: Counter,

    pub http_requests_total: Counter,
    pub http_requests_in_flight: Gauge,
    pub http_request_duration_seconds: Histogram,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let instruments_scanned_total = counter(
            &registry,
            "instruments_scanned_total",
            "Instruments evaluated by the scanner",
        )?;
        let instruments_skipped_total = counter(
            &registry,
            "instruments_skipped_total",
            "Instruments skipped for missing or empty data",
        )?;
        let signals_emitted_total =
            counter(&registry, "signals_emitted_total", "Non-void chain results delivered")?;
        let provider_errors_total = counter(
            &registry,
            "provider_errors_total",
            "Per-instrument provider or store failures",
        )?;
        let notify_errors_total =
            counter(&registry, "notify_errors_total", "Failed notification deliveries")?;
        let scan_pass_duration_seconds = histogram(
            &registry,
            "scan_pass_duration_seconds",
            "Wall time of one full scan pass",
            vec![1.0, 10.0, 60.0, 300.0, 900.0, 1800.0, 3600.0],
        )?;

        let stream_messages_total =
            counter(&registry, "stream_messages_total", "Stream payloads received by traders")?;
        let stream_messages_discarded_total = counter(
            &registry,
            "stream_messages_discarded_total",
            "Malformed stream payloads discarded",
        )?;
        let active_traders = gauge(&registry, "active_traders", "Traders currently streaming")?;

        let bars_ingested_total =
            counter(&registry, "bars_ingested_total", "Bars written to the historical store")?;

        let http_requests_total = counter(&registry, "http_requests_total", "HTTP requests served")?;
        let http_requests_in_flight =
            gauge(&registry, "http_requests_in_flight", "HTTP requests in flight")?;
        let http_request_duration_seconds = histogram(
            &registry,
            "http_request_duration_seconds",
            "HTTP request latency",
            prometheus::DEFAULT_BUCKETS.to_vec(),
        )?;

        Ok(Self {
            registry,
            instruments_scanned_total,
            instruments_skipped_total,
            signals_emitted_total,
            provider_errors_total,
            notify_errors_total,
            scan_pass_duration_seconds,
            stream_messages_total,
            stream_messages_discarded_total,
            active_traders,
            bars_ingested_total,
            http_requests_total,
            http_requests_in_flight,
            http_request_duration_seconds,
        })
    }

    /// Render every metric in the Prometheus text format.
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<Counter, prometheus::Error> {
    let counter = Counter::with_opts(Opts::new(name, help))?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<Gauge, prometheus::Error> {
    let gauge = Gauge::with_opts(Opts::new(name, help))?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

fn histogram(
    registry: &Registry,
    name: &str,
    help: &str,
    buckets: Vec<f64>,
) -> Result<Histogram, prometheus::Error> {
    let histogram = Histogram::with_opts(HistogramOpts::new(name, help).buckets(buckets))?;
    registry.register(Box::new(histogram.clone()))?;
    Ok(histogram)
}
