use anyhow::Result;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{LogExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::TelemetryConfig;

pub fn init(config: &TelemetryConfig) -> Result<()> {
    let filter = environment_filter(&config.log_level, &config.excluded_modules)?;
    let fmt_layer = tracing_subscriber::fmt::layer().with_thread_names(true);

    if !config.enabled {
        tracing_subscriber::registry().with(filter).with(fmt_layer).init();
        return Ok(());
    }

    let logger_provider = logger_provider(config)?;
    let tracer_provider = tracer_provider(config)?;
    let tracer = tracer_provider.tracer(config.service_name.clone());

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(OpenTelemetryTracingBridge::new(&logger_provider))
        .with(OpenTelemetryLayer::new(tracer))
        .init();

    Ok(())
}

fn environment_filter(log_level: &str, excluded_modules: &[String]) -> Result<EnvFilter> {
    let mut filter = EnvFilter::new(log_level);
    for module in excluded_modules {
        filter = filter.add_directive(format!("{}=off", module).parse()?);
    }
    Ok(filter)
}

fn service_resource(service_name: String) -> Resource {
    Resource::builder().with_service_name(service_name).build()
}

fn tracer_provider(config: &TelemetryConfig) -> Result<SdkTracerProvider> {
    let exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.otlp_endpoint)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create span exporter: {}", e))?;

    Ok(SdkTracerProvider::builder()
        .with_resource(service_resource(config.service_name.clone()))
        .with_batch_exporter(exporter)
        .build())
}

fn logger_provider(config: &TelemetryConfig) -> Result<SdkLoggerProvider> {
    let exporter = LogExporter::builder()
        .with_tonic()
        .with_endpoint(&config.otlp_endpoint)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create log exporter: {}", e))?;

    Ok(SdkLoggerProvider::builder()
        .with_resource(service_resource(config.service_name.clone()))
        .with_batch_exporter(exporter)
        .build())
}
