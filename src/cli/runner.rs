use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{info, warn};

use crate::bundle::{BundlePipeline, HttpBundleBuilder};
use crate::cli::args::{BalancesCmd, CapacityCmd, Cli, Command, FanoutCmd, RunCmd};
use crate::cli::context::{build_http_client, init_configs, load_wallets, resolve_rpc_client};
use crate::config::FlotillaConfig;
use crate::engine::{BatchPlan, BatchReport, CapacityTable, SequentialExecutor, allocate};
use crate::lander::LanderFactory;
use crate::protocol::validation::check_percentage;
use crate::protocol::{AdapterContext, AdapterRegistry};
use crate::wallet::{RpcBalanceSource, refresh_snapshot};

pub async fn run(cli: Cli, config: FlotillaConfig) -> Result<()> {
    crate::monitoring::init_from_config(&config.prometheus)?;

    match cli.command {
        Command::Capacity(cmd) => show_capacity(cmd, &config),
        Command::Fanout(cmd) => show_fanout(cmd),
        Command::Balances(cmd) => show_balances(cmd, &config).await,
        Command::Run(cmd) => run_plan(cmd, &config).await,
        Command::Init(args) => init_configs(args),
    }
}

fn show_capacity(cmd: CapacityCmd, config: &FlotillaConfig) -> Result<()> {
    let table = CapacityTable::with_overrides(&config.capacity)?;
    if !table.contains(cmd.kind) {
        return Err(anyhow!("操作类型 {} 未配置容量上限", cmd.kind));
    }
    println!("{}: 上限 {}", cmd.kind, table.ceiling(cmd.kind));

    if config.global.wallets_file.is_some() {
        let wallets = load_wallets(config)?;
        let check = table.validate(wallets.iter(), cmd.kind);
        println!(
            "已导入钱包: 活跃 {} / 上限 {} -> {}",
            check.active_count,
            check.ceiling,
            if check.ok { "通过" } else { "超出上限" }
        );
    }
    Ok(())
}

fn show_fanout(cmd: FanoutCmd) -> Result<()> {
    if cmd.buyers == 0 {
        return Err(anyhow!("买方数量必须大于 0"));
    }
    check_percentage(cmd.percent).map_err(|err| anyhow!("卖出比例非法: {err}"))?;
    println!(
        "每个买方分得卖方 {:.4}% 的持仓（共 {} 个买方）",
        allocate(cmd.percent, cmd.buyers),
        cmd.buyers
    );
    Ok(())
}

async fn show_balances(cmd: BalancesCmd, config: &FlotillaConfig) -> Result<()> {
    let wallets = load_wallets(config)?;
    let rpc_client = resolve_rpc_client(&config.global);
    let snapshot = refresh_snapshot(
        Arc::new(RpcBalanceSource::new(rpc_client)),
        &wallets.addresses(),
        &cmd.mint,
        config.executor.balance_concurrency,
    )
    .await;

    for handle in wallets.iter() {
        let native = snapshot
            .native(&handle.address)
            .map(|lamports| lamports.to_string())
            .unwrap_or_else(|| "未知".to_string());
        let mut line = format!("{} native={native}", handle.display_name());
        for mint in &cmd.mint {
            let amount = snapshot
                .token(&handle.address, mint)
                .map(|amount| amount.to_string())
                .unwrap_or_else(|| "未知".to_string());
            line.push_str(&format!(" {mint}={amount}"));
        }
        if !handle.is_active {
            line.push_str(" (未激活)");
        }
        println!("{line}");
    }
    Ok(())
}

async fn run_plan(cmd: RunCmd, config: &FlotillaConfig) -> Result<()> {
    let plan = BatchPlan::from_path(&cmd.plan)?;
    let mints = plan.mints();
    let batch = plan.into_batch();
    let wallets = load_wallets(config)?;

    let rpc_client = resolve_rpc_client(&config.global);
    let lander_client = build_http_client(config.lander.timeout_ms)?;
    let lander = LanderFactory::new(Arc::clone(&rpc_client), lander_client)
        .build(&config.lander, cmd.dry_run)?;
    let source = HttpBundleBuilder::new(&config.builder, config.lander.encoding)?;
    let pipeline = BundlePipeline::new(Arc::new(source), lander);
    let context = AdapterContext::new(pipeline, config.executor.fee_reserve_lamports);
    let registry = AdapterRegistry::with_defaults(context);

    let capacity = CapacityTable::with_overrides(&config.capacity)?;
    let executor = SequentialExecutor::new(
        Arc::new(registry),
        Arc::new(capacity),
        Duration::from_millis(config.executor.unit_delay_ms),
    );

    let balances = refresh_snapshot(
        Arc::new(RpcBalanceSource::new(rpc_client)),
        &wallets.addresses(),
        &mints,
        config.executor.balance_concurrency,
    )
    .await;

    info!(
        target: "cli",
        plan = %cmd.plan.display(),
        group = %batch.group,
        units = batch.units.len(),
        dry_run = cmd.dry_run,
        "开始执行批次计划"
    );
    let report = executor.run(&batch, &wallets, &balances).await?;
    print_report(&report);

    if report.fail_count > 0 {
        warn!(
            target: "cli",
            failed = report.fail_count,
            "批次存在失败单元"
        );
    }
    Ok(())
}

fn print_report(report: &BatchReport) {
    println!(
        "批次 {} [{}]: 成功 {} / 失败 {} / 耗时 {:.2}s",
        report.batch_id,
        report.group,
        report.success_count,
        report.fail_count,
        report.elapsed.as_secs_f64()
    );
    for failure in &report.failures {
        println!(
            "  #{} {} [{}] {}",
            failure.index,
            failure.label,
            failure.stage.as_str(),
            failure.error
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fanout_rejects_percent_outside_open_range() {
        let fanout = |percent: f64, buyers: usize| show_fanout(FanoutCmd { percent, buyers });
        assert!(fanout(0.0, 3).is_err());
        assert!(fanout(-5.0, 3).is_err());
        assert!(fanout(100.5, 3).is_err());
        assert!(fanout(60.0, 0).is_err());
        assert!(fanout(100.0, 3).is_ok());
    }
}
