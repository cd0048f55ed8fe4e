use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;

use crate::config::PrometheusConfig;

static EXPORTER: OnceCell<()> = OnceCell::new();
static PROMETHEUS_ENABLED: AtomicBool = AtomicBool::new(false);

/// 按配置启动 Prometheus exporter，重复调用无副作用。
pub fn init_from_config(config: &PrometheusConfig) -> Result<()> {
    if !config.enable {
        return Ok(());
    }
    try_init_prometheus(&config.listen)
}

pub fn try_init_prometheus(listen: &str) -> Result<()> {
    EXPORTER
        .get_or_try_init(|| {
            let addr: SocketAddr = listen
                .parse()
                .with_context(|| format!("invalid prometheus listen address: {listen}"))?;
            PrometheusBuilder::new()
                .with_http_listener(addr)
                .install()
                .context("failed to install prometheus exporter")?;
            describe();
            PROMETHEUS_ENABLED.store(true, Ordering::Relaxed);
            Ok(())
        })
        .map(|_| ())
}

pub fn prometheus_enabled() -> bool {
    PROMETHEUS_ENABLED.load(Ordering::Relaxed)
}

fn describe() {
    describe_counter!("flotilla_batches_total", "已启动的批次数");
    describe_counter!("flotilla_units_total", "按类型与结果统计的单元数");
    describe_counter!("flotilla_units_skipped_total", "预检失败被跳过的单元数");
    describe_histogram!("flotilla_unit_duration_ms", "单元 execute 耗时");
    describe_histogram!("flotilla_batch_duration_ms", "批次总耗时");
}
