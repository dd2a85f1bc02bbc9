use opentelemetry_sdk::trace::Sampler;

/// Share of root spans kept in the cloud branch
pub const CLOUD_SAMPLE_RATIO: f64 = 0.01;

/// Cloud: honor the caller's decision, sample new roots at [`CLOUD_SAMPLE_RATIO`].
/// Local: keep everything.
pub fn select_sampler(is_cloud: bool) -> Sampler {
    if is_cloud {
        Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(CLOUD_SAMPLE_RATIO)))
    } else {
        Sampler::AlwaysOn
    }
}
