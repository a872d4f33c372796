//! 配置管理命令
//!
//! 读写 CLI 默认配置（型号、左右手、协议版本、通道等）

use crate::utils::load_config;
use anyhow::{Context, Result};
use artus_sdk::driver::ChannelConfig;
use artus_sdk::protocol::ProtocolRevision;
use artus_sdk::{HandProduct, HandSide};
use clap::Subcommand;
use std::path::Path;

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 设置配置项
    Set {
        /// 产品型号（lite, talos, scorpion）
        #[arg(long)]
        product: Option<HandProduct>,

        /// 左右手（left, right）
        #[arg(long)]
        side: Option<HandSide>,

        /// 协议版本（legacy, expanded）
        #[arg(long, value_parser = parse_revision)]
        revision: Option<ProtocolRevision>,

        /// 最大指令频率（Hz）
        #[arg(long)]
        frequency: Option<f64>,

        /// 串口设备（切换到串口通道）
        #[arg(long, conflicts_with = "ssid")]
        port: Option<String>,

        /// 串口波特率（默认 115200）
        #[arg(long, requires = "port")]
        baud_rate: Option<u32>,

        /// 从站地址（1..=247，默认 1）
        #[arg(long, requires = "port")]
        slave_address: Option<u8>,

        /// 无线网络名（切换到 UDP 通道）
        #[arg(long)]
        ssid: Option<String>,

        /// 无线网络密码
        #[arg(long, requires = "ssid")]
        password: Option<String>,

        /// 设备发现时问候语需包含的标记（如 left）
        #[arg(long, requires = "ssid")]
        side_tag: Option<String>,

        /// 设备已唤醒，连接时跳过唤醒
        #[arg(long)]
        awake: Option<bool>,
    },

    /// 获取配置项
    Get {
        /// 配置项名称（支持 `retry.max_attempts` 形式）
        #[arg(default_value = "all")]
        key: String,
    },
}

fn parse_revision(s: &str) -> Result<ProtocolRevision, String> {
    match s.to_ascii_lowercase().as_str() {
        "legacy" => Ok(ProtocolRevision::Legacy),
        "expanded" => Ok(ProtocolRevision::Expanded),
        other => Err(format!("unknown protocol revision: {other}")),
    }
}

impl ConfigCommand {
    pub fn execute(self, path: &Path) -> Result<()> {
        match self {
            ConfigCommand::Set {
                product,
                side,
                revision,
                frequency,
                port,
                baud_rate,
                slave_address,
                ssid,
                password,
                side_tag,
                awake,
            } => {
                let mut config = load_config(path)?;
                if let Some(product) = product {
                    config.product = product;
                }
                if let Some(side) = side {
                    config.side = side;
                }
                if let Some(revision) = revision {
                    config.revision = revision;
                }
                if let Some(frequency) = frequency {
                    config.frequency_hz = frequency;
                }
                if let Some(awake) = awake {
                    config.awake = awake;
                }
                if let Some(port) = port {
                    config.channel = ChannelConfig::Serial {
                        port,
                        baud_rate: baud_rate.unwrap_or(115_200),
                        slave_address: slave_address.unwrap_or(1),
                    };
                }
                if let Some(ssid) = ssid {
                    config.channel = ChannelConfig::Udp {
                        ssid: Some(ssid),
                        password,
                        local_port: artus_sdk::transport::udp::DEFAULT_LOCAL_PORT,
                        device_port: artus_sdk::transport::udp::DEFAULT_DEVICE_PORT,
                        side_tag,
                    };
                }

                config.validate().context("配置无效")?;
                config.save(path).context("写入配置文件失败")?;
                println!("✅ 配置已保存: {}", path.display());
                Ok(())
            },

            ConfigCommand::Get { key } => {
                let config = load_config(path)?;
                let content = config.to_toml_string()?;
                if key == "all" {
                    println!("# {}", path.display());
                    print!("{content}");
                    return Ok(());
                }

                let table: toml::Table = toml::from_str(&content).context("解析配置失败")?;
                let mut value: Option<&toml::Value> = None;
                for (i, segment) in key.split('.').enumerate() {
                    value = match (i, value) {
                        (0, _) => table.get(segment),
                        (_, Some(toml::Value::Table(t))) => t.get(segment),
                        _ => None,
                    };
                }
                match value {
                    Some(toml::Value::String(s)) => println!("{s}"),
                    Some(other) => println!("{other}"),
                    None => anyhow::bail!("未知配置项: {key}"),
                }
                Ok(())
            },
        }
    }
}
