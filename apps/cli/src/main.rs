//! # Artus CLI
//!
//! Command-line interface for Artus robotic hands.
//!
//! 每个命令独立执行（连接 → 操作 → 断开），适合脚本与调试：
//!
//! ```bash
//! # 配置默认手部
//! artus-cli config set --product talos --side left --ssid ArtusTalosLeft --password secret
//!
//! # 查询状态、回零、移动
//! artus-cli status
//! artus-cli home
//! artus-cli move --joint index_flex=45 --joint thumb_flex=30
//!
//! # 不连接硬件，使用模拟总线
//! artus-cli --sim feedback --kind temperature
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod commands;
mod utils;

use commands::{CalibrateCommand, ConfigCommand, FeedbackCommand, FlashCommand, MoveCommand};

/// Artus CLI - 灵巧手命令行工具
#[derive(Parser, Debug)]
#[command(name = "artus-cli")]
#[command(about = "Command-line interface for Artus robotic hands", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件（默认 <config_dir>/artus/config.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 使用模拟总线，不访问硬件
    #[arg(long, global = true)]
    sim: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 查询执行器状态
    Status,

    /// 回到默认位置
    Home,

    /// 设置关节目标
    Move {
        #[command(flatten)]
        args: MoveCommand,
    },

    /// 读取反馈
    Feedback {
        #[command(flatten)]
        args: FeedbackCommand,
    },

    /// 标定
    Calibrate {
        #[command(flatten)]
        args: CalibrateCommand,
    },

    /// 固件升级
    Flash {
        #[command(flatten)]
        args: FlashCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志（输出到 stderr，保持 stdout 可供脚本解析）
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = utils::config_path(cli.config.as_deref())?;

    match cli.command {
        Commands::Config(cmd) => cmd.execute(&config_path),
        command => run_hand_command(command, &config_path, cli.sim),
    }
}

/// 连接手部、执行命令并断开
fn run_hand_command(command: Commands, config_path: &Path, sim: bool) -> Result<()> {
    let config = utils::load_config(config_path)?;
    let mut hand = utils::open_hand(config, sim)?;

    let result = match command {
        Commands::Config(_) => Ok(()),
        Commands::Status => commands::hand::status(&mut hand),
        Commands::Home => commands::hand::home(&mut hand),
        Commands::Move { args } => args.execute(&mut hand),
        Commands::Feedback { args } => args.execute(&mut hand),
        Commands::Calibrate { args } => args.execute(&mut hand),
        Commands::Flash { args } => args.execute(&mut hand),
    };

    if let Err(e) = hand.disconnect() {
        tracing::warn!("disconnect failed: {e}");
    }
    result
}
