use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref QUESTIONS_TOTAL: IntCounter = IntCounter::new(
        "kube_sleuth_questions_total",
        "Total number of questions received."
    )
    .unwrap();
    pub static ref QUESTIONS_FAILED_TOTAL: IntCounter = IntCounter::new(
        "kube_sleuth_questions_failed_total",
        "Questions that ended in an error instead of an answer."
    )
    .unwrap();
    pub static ref MODEL_CALLS_TOTAL: IntCounter = IntCounter::new(
        "kube_sleuth_model_calls_total",
        "Completion requests sent to the reasoning model."
    )
    .unwrap();
    pub static ref TOOL_INVOCATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "kube_sleuth_tool_invocations_total",
            "Tool invocations by tool name and outcome."
        ),
        &["tool", "outcome"]
    )
    .unwrap();
    pub static ref REQUEST_DURATION_SECONDS: Histogram = Histogram::with_opts(HistogramOpts::new(
        "kube_sleuth_request_duration_seconds",
        "End-to-end question handling duration."
    ))
    .unwrap();
}

pub fn register_metrics() {
    REGISTRY
        .register(Box::new(QUESTIONS_TOTAL.clone()))
        .expect("Failed to register QUESTIONS_TOTAL");
    REGISTRY
        .register(Box::new(QUESTIONS_FAILED_TOTAL.clone()))
        .expect("Failed to register QUESTIONS_FAILED_TOTAL");
    REGISTRY
        .register(Box::new(MODEL_CALLS_TOTAL.clone()))
        .expect("Failed to register MODEL_CALLS_TOTAL");
    REGISTRY
        .register(Box::new(TOOL_INVOCATIONS_TOTAL.clone()))
        .expect("Failed to register TOOL_INVOCATIONS_TOTAL");
    REGISTRY
        .register(Box::new(REQUEST_DURATION_SECONDS.clone()))
        .expect("Failed to register REQUEST_DURATION_SECONDS");
}

// Function to gather metrics for exposition
pub fn gather_metrics() -> String {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    encoder
        .encode(&metric_families, &mut buffer)
        .expect("Failed to encode metrics");
    String::from_utf8(buffer).expect("Failed to convert metrics to string")
}
