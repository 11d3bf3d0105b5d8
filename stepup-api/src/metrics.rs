use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Counters for the 3-D Secure handshake, exposed at `/metrics`.
pub struct Metrics {
    registry: Registry,
    pub enrollment_checks: IntCounterVec,
    pub verifications: IntCounterVec,
    pub gateway_unavailable: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let enrollment_checks = IntCounterVec::new(
            Opts::new("stepup_enrollment_checks_total", "3-D Secure enrollment checks by outcome"),
            &["outcome"],
        )?;
        let verifications = IntCounterVec::new(
            Opts::new("stepup_verifications_total", "3-D Secure verifications by outcome"),
            &["outcome"],
        )?;
        let gateway_unavailable = IntCounterVec::new(
            Opts::new("stepup_gateway_unavailable_total", "Gateway failures by operation"),
            &["operation"],
        )?;

        registry.register(Box::new(enrollment_checks.clone()))?;
        registry.register(Box::new(verifications.clone()))?;
        registry.register(Box::new(gateway_unavailable.clone()))?;

        Ok(Self {
            registry,
            enrollment_checks,
            verifications,
            gateway_unavailable,
        })
    }

    /// Prometheus text exposition of every registered counter.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
