use std::time::Duration;

use metrics::{counter, histogram};
use tracing::{error, info, warn};

use crate::engine::{BatchReport, FailureStage, OperationKind};

use super::metrics::prometheus_enabled;

pub fn batch_started(batch_id: &str, group: &str, units: usize) {
    info!(
        target: "monitoring::batch",
        event = "started",
        batch_id,
        group,
        units,
        "批次开始"
    );

    if prometheus_enabled() {
        counter!("flotilla_batches_total", "group" => group.to_string()).increment(1);
    }
}

pub fn unit_skipped(batch_id: &str, index: usize, label: &str, kind: OperationKind, reason: &str) {
    warn!(
        target: "monitoring::batch",
        event = "skipped",
        batch_id,
        index,
        label,
        kind = %kind,
        stage = FailureStage::Preflight.as_str(),
        reason,
        "单元预检失败，已跳过"
    );

    if prometheus_enabled() {
        counter!("flotilla_units_skipped_total", "kind" => kind.to_string()).increment(1);
    }
}

pub fn unit_finished(
    batch_id: &str,
    index: usize,
    label: &str,
    kind: OperationKind,
    elapsed: Duration,
    outcome: Result<&[String], &str>,
) {
    let elapsed_ms = elapsed.as_secs_f64() * 1_000.0;
    match outcome {
        Ok(receipts) => info!(
            target: "monitoring::batch",
            event = "unit_success",
            batch_id,
            index,
            label,
            kind = %kind,
            elapsed_ms,
            receipts = ?receipts,
            "单元执行成功"
        ),
        Err(reason) => error!(
            target: "monitoring::batch",
            event = "unit_failure",
            batch_id,
            index,
            label,
            kind = %kind,
            elapsed_ms,
            stage = FailureStage::Execute.as_str(),
            reason,
            "单元执行失败"
        ),
    }

    if prometheus_enabled() {
        let kind_label = kind.to_string();
        let result = if outcome.is_ok() { "success" } else { "failure" };
        counter!(
            "flotilla_units_total",
            "kind" => kind_label.clone(),
            "result" => result
        )
        .increment(1);
        histogram!("flotilla_unit_duration_ms", "kind" => kind_label).record(elapsed_ms);
    }
}

pub fn batch_completed(report: &BatchReport) {
    let elapsed_ms = report.elapsed.as_secs_f64() * 1_000.0;
    info!(
        target: "monitoring::batch",
        event = "completed",
        batch_id = %report.batch_id,
        group = %report.group,
        total = report.total(),
        success = report.success_count,
        failed = report.fail_count,
        elapsed_ms,
        "批次完成"
    );

    if prometheus_enabled() {
        histogram!("flotilla_batch_duration_ms", "group" => report.group.clone())
            .record(elapsed_ms);
    }
}
