use lazy_static::lazy_static;
use prometheus::{exponential_buckets, GaugeVec, HistogramVec, IntCounterVec, Opts, Registry};

lazy_static! {
    pub static ref NOTIFY_CYCLE_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("notify_cycles", "notify cycle outcomes per topic"),
        &["topic", "outcome"]
    )
    .expect("Should succeed to create metric");

    pub static ref NOTIFY_DURATION_METRIC: HistogramVec = HistogramVec::new(
        prometheus::HistogramOpts::new(
            "notify_duration_metric",
            "Histogram of notify cycle duration in ms"
        )
        .buckets(exponential_buckets(1.0, 2.0, 14).unwrap()),
        &["topic"]
    )
    .expect("metric can not be created");

    pub static ref REGISTERED_OBSERVERS_METRIC: GaugeVec = GaugeVec::new(
        Opts::new("registered_observers_metric", "registered_observers_metric"),
        &["topic"]
    )
    .expect("metric can not be created");

    pub static ref WATCH_DELIVERY_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("watch_deliveries", "payload deliveries per topic and result"),
        &["topic", "result"]
    )
    .expect("Should succeed to create metric");

    pub static ref REGISTRY: Registry = Registry::new();
}

pub fn register_custom_metrics() {
    REGISTRY
        .register(Box::new(NOTIFY_CYCLE_METRIC.clone()))
        .expect("collector can be registered");
    REGISTRY
        .register(Box::new(NOTIFY_DURATION_METRIC.clone()))
        .expect("collector can be registered");
    REGISTRY
        .register(Box::new(REGISTERED_OBSERVERS_METRIC.clone()))
        .expect("collector can be registered");
    REGISTRY
        .register(Box::new(WATCH_DELIVERY_METRIC.clone()))
        .expect("collector can be registered");
}
