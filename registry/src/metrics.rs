use lazy_static::lazy_static;
use prometheus::core::Collector;
use prometheus::{Counter, Encoder, Opts, Registry, TextEncoder};
use tracing::error;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref GATEWAYS_CREATED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "registry_gateways_created_total",
        "Total gateways created"
    ))
    .unwrap();
    pub static ref GATEWAYS_DELETED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "registry_gateways_deleted_total",
        "Total gateways deleted"
    ))
    .unwrap();
    pub static ref DEVICES_ADDED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "registry_devices_added_total",
        "Total devices attached to a gateway"
    ))
    .unwrap();
    pub static ref DEVICES_REMOVED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "registry_devices_removed_total",
        "Total devices removed from a gateway"
    ))
    .unwrap();
    pub static ref VALIDATION_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "registry_validation_failures_total",
        "Total requests rejected by field validation"
    ))
    .unwrap();
    pub static ref CAPACITY_REJECTIONS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "registry_capacity_rejections_total",
        "Total devices rejected because the gateway was full"
    ))
    .unwrap();
    pub static ref STORE_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "registry_store_failures_total",
        "Total operations failed by the record store"
    ))
    .unwrap();
}

pub fn init_metrics() {
    let collectors: Vec<Box<dyn Collector>> = vec![
        Box::new(GATEWAYS_CREATED_TOTAL.clone()),
        Box::new(GATEWAYS_DELETED_TOTAL.clone()),
        Box::new(DEVICES_ADDED_TOTAL.clone()),
        Box::new(DEVICES_REMOVED_TOTAL.clone()),
        Box::new(VALIDATION_FAILURES_TOTAL.clone()),
        Box::new(CAPACITY_REJECTIONS_TOTAL.clone()),
        Box::new(STORE_FAILURES_TOTAL.clone()),
    ];

    for collector in collectors {
        if let Err(e) = REGISTRY.register(collector) {
            error!("Failed to register metric: {}", e);
        }
    }
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
