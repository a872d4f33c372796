//! 配置加载与连接工具

use anyhow::{Context, Result};
use artus_sdk::driver::HandConfig;
use artus_sdk::transport::SimulatedBus;
use artus_sdk::{Artus, ArtusBuilder};
use std::path::{Path, PathBuf};
use tracing::info;

/// 配置文件路径：命令行指定优先，否则为 `<config_dir>/artus/config.toml`
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;
    path.push("artus");
    path.push("config.toml");
    Ok(path)
}

/// 加载配置，文件不存在时使用默认值
pub fn load_config(path: &Path) -> Result<HandConfig> {
    if !path.exists() {
        return Ok(HandConfig::default());
    }
    HandConfig::load(path).with_context(|| format!("加载配置失败: {}", path.display()))
}

/// 按配置创建并连接手部
///
/// `sim` 为真时使用模拟总线（立即唤醒、立即应答固件页）。
pub fn open_hand(mut config: HandConfig, sim: bool) -> Result<Artus> {
    let builder = if sim {
        config.firmware.settle_ms = 0;
        let bus = SimulatedBus::new(config.revision)
            .with_auto_wake()
            .with_firmware_acks();
        ArtusBuilder::from_config(config).register_bus(bus)
    } else {
        ArtusBuilder::from_config(config)
    };

    let mut hand = builder.build().context("创建手部实例失败")?;
    hand.connect().context("连接失败")?;
    info!(
        product = %hand.config().product,
        side = %hand.config().side,
        sim,
        "hand connected"
    );
    Ok(hand)
}

/// 解析 `NAME=ANGLE`
pub fn parse_joint_assignment(s: &str) -> Result<(String, f32), String> {
    let (name, angle) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=ANGLE, got `{s}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing joint name in `{s}`"));
    }
    let angle = angle
        .trim()
        .parse::<f32>()
        .map_err(|e| format!("invalid angle in `{s}`: {e}"))?;
    if !angle.is_finite() {
        return Err(format!("angle must be finite in `{s}`"));
    }
    Ok((name.to_string(), angle))
}
