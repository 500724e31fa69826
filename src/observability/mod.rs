use anyhow::Result;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Meter, MeterProvider},
};
use opentelemetry_sdk::metrics::SdkMeterProvider;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cache::CacheTier;

const METER_NAME: &str = "brand-logo-cache";

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(level: &str, json: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(fmt::layer().json()).try_init()?;
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()?;
    }
    Ok(())
}

/// Install a local meter provider as the global one
///
/// Instruments created before this call stay bound to the no-op provider.
pub fn init_metrics() -> SdkMeterProvider {
    let provider = SdkMeterProvider::builder().build();
    global::set_meter_provider(provider.clone());
    info!("OpenTelemetry configured: local metrics only");
    provider
}

/// Counters for the resolution pipeline
#[derive(Clone)]
pub struct LogoMetrics {
    lookups: Counter<u64>,
    cache_hits: Counter<u64>,
    origin_calls: Counter<u64>,
    origin_failures: Counter<u64>,
    assets_rejected: Counter<u64>,
}

impl Default for LogoMetrics {
    fn default() -> Self {
        Self::from_meter(&global::meter(METER_NAME))
    }
}

impl LogoMetrics {
    pub fn from_provider(provider: &SdkMeterProvider) -> Self {
        Self::from_meter(&provider.meter(METER_NAME))
    }

    pub fn from_meter(meter: &Meter) -> Self {
        let lookups = meter
            .u64_counter("logo_lookups_total")
            .with_description("Logo resolution requests")
            .build();
        let cache_hits = meter
            .u64_counter("logo_cache_hits_total")
            .with_description("Cache hits by tier")
            .build();
        let origin_calls = meter
            .u64_counter("logo_origin_calls_total")
            .with_description("Requests sent to the brand-data API or image hosts")
            .build();
        let origin_failures = meter
            .u64_counter("logo_origin_failures_total")
            .with_description("Failed origin requests")
            .build();
        let assets_rejected = meter
            .u64_counter("logo_assets_rejected_total")
            .with_description("Downloaded assets rejected as non-image or oversized")
            .build();

        Self {
            lookups,
            cache_hits,
            origin_calls,
            origin_failures,
            assets_rejected,
        }
    }

    pub fn record_lookup(&self) {
        self.lookups.add(1, &[]);
    }

    pub fn record_cache_hit(&self, tier: CacheTier) {
        self.cache_hits
            .add(1, &[KeyValue::new("tier", tier.to_string())]);
    }

    pub fn record_origin_call(&self, kind: &'static str) {
        self.origin_calls.add(1, &[KeyValue::new("kind", kind)]);
    }

    pub fn record_origin_failure(&self, kind: &'static str) {
        self.origin_failures.add(1, &[KeyValue::new("kind", kind)]);
    }

    pub fn record_asset_rejected(&self) {
        self.assets_rejected.add(1, &[]);
    }
}
