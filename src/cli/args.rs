use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use solana_sdk::pubkey::Pubkey;

use crate::engine::OperationKind;

#[derive(Parser, Debug)]
#[command(name = "flotilla", version, about = "多钱包批量操作编排器")]
pub struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "配置文件路径（默认查找 flotilla.yaml 或 config/flotilla.yaml）"
    )]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 查看操作类型的容量上限，并用已导入的钱包做一次校验
    Capacity(CapacityCmd),
    /// 计算轮换时每个买方分得的卖出比例
    Fanout(FanoutCmd),
    /// 刷新并打印钱包余额快照
    Balances(BalancesCmd),
    /// 执行批次计划文件
    Run(RunCmd),
    /// 输出配置模板
    Init(InitCmd),
}

#[derive(Args, Debug)]
pub struct CapacityCmd {
    #[arg(long, value_name = "KIND", help = "操作类型，如 buy@pumpfun、transfer")]
    pub kind: OperationKind,
}

#[derive(Args, Debug)]
pub struct FanoutCmd {
    #[arg(long, value_name = "PCT", help = "卖方卖出比例（0-100）")]
    pub percent: f64,
    #[arg(long, value_name = "N", help = "买方数量")]
    pub buyers: usize,
}

#[derive(Args, Debug)]
pub struct BalancesCmd {
    #[arg(long, value_name = "MINT", help = "同时查询该 mint 的代币余额，可重复")]
    pub mint: Vec<Pubkey>,
}

#[derive(Args, Debug)]
pub struct RunCmd {
    #[arg(long, value_name = "FILE", help = "批次计划文件（YAML）")]
    pub plan: PathBuf,
    #[arg(long, help = "只签名不发送，覆盖 lander.kind")]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct InitCmd {
    #[arg(long, value_name = "DIR", help = "可选输出目录（默认当前目录）")]
    pub output: Option<PathBuf>,
    #[arg(long, help = "若文件存在则覆盖")]
    pub force: bool,
}
