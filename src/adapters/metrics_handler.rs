use prometheus::{Counter, CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

pub struct MetricsCollector {
    registry: Registry,

    // Validation chain metrics
    pub validations_total: CounterVec,
    pub validation_duration: HistogramVec,

    // Form metrics
    pub forms_rendered: Counter,
    pub form_submissions: CounterVec,

    pub config_reloads: CounterVec,
}

impl MetricsCollector {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let validations_total = CounterVec::new(
            Opts::new("agentcloud_validations_total", "Validation chains evaluated"),
            &["ruleset", "outcome"],
        )?;
        registry.register(Box::new(validations_total.clone()))?;

        let validation_duration = HistogramVec::new(
            HistogramOpts::new(
                "agentcloud_validation_duration_seconds",
                "Validation chain duration in seconds",
            )
            .buckets(vec![0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01]),
            &["ruleset"],
        )?;
        registry.register(Box::new(validation_duration.clone()))?;

        let forms_rendered = Counter::new("agentcloud_forms_rendered_total", "Forms rendered")?;
        registry.register(Box::new(forms_rendered.clone()))?;

        let form_submissions = CounterVec::new(
            Opts::new("agentcloud_form_submissions_total", "Form submissions"),
            &["outcome"],
        )?;
        registry.register(Box::new(form_submissions.clone()))?;

        let config_reloads = CounterVec::new(
            Opts::new("agentcloud_config_reloads_total", "Configuration reload attempts"),
            &["outcome"],
        )?;
        registry.register(Box::new(config_reloads.clone()))?;

        Ok(Self {
            registry,
            validations_total,
            validation_duration,
            forms_rendered,
            form_submissions,
            config_reloads,
        })
    }

    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

pub struct MetricsHandler {
    collector: Arc<MetricsCollector>,
}

impl MetricsHandler {
    pub fn new(collector: Arc<MetricsCollector>) -> Self {
        Self { collector }
    }

    pub async fn metrics(&self) -> String {
        self.collector.encode().unwrap_or_else(|e| {
            tracing::error!("Failed to encode metrics: {}", e);
            String::from("# Error encoding metrics\n")
        })
    }
}
