use prometheus::{
    Encoder, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub transitions_total: IntCounterVec,
    pub deliveries_awaiting_assignment: IntGauge,
    pub assignment_latency_seconds: HistogramVec,
    pub points_resolved_total: IntCounterVec,
    pub proof_rejections_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let transitions_total = IntCounterVec::new(
            Opts::new(
                "transitions_total",
                "Delivery state transitions by action and outcome",
            ),
            &["action", "outcome"],
        )
        .expect("valid transitions_total metric");

        let deliveries_awaiting_assignment = IntGauge::new(
            "deliveries_awaiting_assignment",
            "Deliveries currently queued for courier assignment",
        )
        .expect("valid deliveries_awaiting_assignment metric");

        let assignment_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "assignment_latency_seconds",
                "Latency of coordinator assignment attempts in seconds",
            ),
            &["outcome"],
        )
        .expect("valid assignment_latency_seconds metric");

        let points_resolved_total = IntCounterVec::new(
            Opts::new(
                "points_resolved_total",
                "Delivery point resolutions by result",
            ),
            &["result"],
        )
        .expect("valid points_resolved_total metric");

        let proof_rejections_total = IntCounterVec::new(
            Opts::new(
                "proof_rejections_total",
                "Rejected proof-of-delivery submissions by reason",
            ),
            &["reason"],
        )
        .expect("valid proof_rejections_total metric");

        registry
            .register(Box::new(transitions_total.clone()))
            .expect("register transitions_total");
        registry
            .register(Box::new(deliveries_awaiting_assignment.clone()))
            .expect("register deliveries_awaiting_assignment");
        registry
            .register(Box::new(assignment_latency_seconds.clone()))
            .expect("register assignment_latency_seconds");
        registry
            .register(Box::new(points_resolved_total.clone()))
            .expect("register points_resolved_total");
        registry
            .register(Box::new(proof_rejections_total.clone()))
            .expect("register proof_rejections_total");

        Self {
            registry,
            transitions_total,
            deliveries_awaiting_assignment,
            assignment_latency_seconds,
            points_resolved_total,
            proof_rejections_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
