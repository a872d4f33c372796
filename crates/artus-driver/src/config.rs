//! 手部配置
//!
//! 从 TOML 文件或字符串加载。
//!
//! ```toml
//! product = "artus_talos"
//! side = "left"
//! revision = "expanded"
//! frequency_hz = 50.0
//!
//! [channel]
//! type = "udp"
//! ssid = "ArtusTalosLeft"
//! password = "secret"
//! side_tag = "left"
//!
//! [retry]
//! max_attempts = 3
//! delay_ms = 10
//! ```

use crate::models::{HandProduct, HandSide};
use artus_protocol::ProtocolRevision;
use artus_transport::{RetryPolicy, SerialSettings, UdpConfig, min_period_from_frequency};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// 配置加载错误
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Configuration validation failed: {0}")]
    Invalid(String),
}

/// 物理通道选择
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelConfig {
    /// 串口寄存器协议（总线实现由调用方注入）
    Serial {
        port: String,
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
        #[serde(default = "default_slave_address")]
        slave_address: u8,
    },
    /// Wi-Fi + UDP
    Udp {
        #[serde(default)]
        ssid: Option<String>,
        #[serde(default)]
        password: Option<String>,
        #[serde(default = "default_local_port")]
        local_port: u16,
        #[serde(default = "default_device_port")]
        device_port: u16,
        /// 问候语中需包含的标记（如 `left`），为空时接受任意设备
        #[serde(default)]
        side_tag: Option<String>,
    },
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_slave_address() -> u8 {
    1
}

fn default_local_port() -> u16 {
    artus_transport::udp::DEFAULT_LOCAL_PORT
}

fn default_device_port() -> u16 {
    artus_transport::udp::DEFAULT_DEVICE_PORT
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig::Serial {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: default_baud_rate(),
            slave_address: default_slave_address(),
        }
    }
}

impl ChannelConfig {
    /// UDP 通道配置（非 UDP 通道返回 `None`）
    pub fn udp_config(&self) -> Option<UdpConfig> {
        match self {
            ChannelConfig::Udp {
                ssid,
                password,
                local_port,
                device_port,
                side_tag,
            } => Some(UdpConfig {
                ssid: ssid.clone(),
                password: password.clone(),
                local_port: *local_port,
                device_port: *device_port,
                side_tag: side_tag.clone(),
                ..UdpConfig::default()
            }),
            ChannelConfig::Serial { .. } => None,
        }
    }

    /// 串口参数（非串口通道返回 `None`）
    pub fn serial_settings(&self) -> Option<SerialSettings> {
        match self {
            ChannelConfig::Serial {
                port,
                baud_rate,
                slave_address,
            } => Some(SerialSettings {
                port: port.clone(),
                baud_rate: *baud_rate,
                slave_address: *slave_address,
            }),
            ChannelConfig::Udp { .. } => None,
        }
    }
}

/// 重试配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 10,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: Duration::from_millis(self.delay_ms),
        }
    }
}

/// 状态等待配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            poll_interval_ms: 100,
        }
    }
}

impl WaitConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// 固件升级配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirmwareConfig {
    /// 单页确认的最长等待
    pub ack_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// 进入升级模式后、等待擦除确认前的静置时间
    pub settle_ms: u64,
}

impl Default for FirmwareConfig {
    fn default() -> Self {
        Self {
            ack_timeout_ms: 5_000,
            poll_interval_ms: 100,
            settle_ms: 1_000,
        }
    }
}

impl FirmwareConfig {
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// 手部配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandConfig {
    pub product: HandProduct,
    pub side: HandSide,
    pub revision: ProtocolRevision,
    /// 最大指令频率（Hz）
    pub frequency_hz: f64,
    /// 回零时使用的默认速度
    pub default_velocity: u16,
    /// 设备已唤醒，连接时跳过唤醒
    pub awake: bool,
    pub channel: ChannelConfig,
    pub retry: RetryConfig,
    pub wait: WaitConfig,
    pub firmware: FirmwareConfig,
}

impl Default for HandConfig {
    fn default() -> Self {
        Self {
            product: HandProduct::default(),
            side: HandSide::default(),
            revision: ProtocolRevision::default(),
            frequency_hz: 50.0,
            default_velocity: 80,
            awake: false,
            channel: ChannelConfig::default(),
            retry: RetryConfig::default(),
            wait: WaitConfig::default(),
            firmware: FirmwareConfig::default(),
        }
    }
}

impl HandConfig {
    /// 从 TOML 字符串加载并校验
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: HandConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载并校验
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// 保存到文件（自动创建父目录）
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::Io(format!("{}: {e}", parent.display())))?;
        }
        std::fs::write(path, self.to_toml_string()?)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))
    }

    /// 语义校验
    ///
    /// # Errors
    /// - 频率非正或非有限值
    /// - `retry.max_attempts` 为 0
    /// - `wait.poll_interval_ms` 为 0
    /// - 串口为空、波特率为 0 或从站地址超出 1..=247
    pub fn validate(&self) -> Result<(), ConfigError> {
        if min_period_from_frequency(self.frequency_hz).is_none() {
            return Err(ConfigError::Invalid(format!(
                "frequency_hz must be a positive number, got {}",
                self.frequency_hz
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.wait.poll_interval_ms == 0 || self.firmware.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if let ChannelConfig::Serial {
            port,
            baud_rate,
            slave_address,
        } = &self.channel
        {
            if port.is_empty() {
                return Err(ConfigError::Invalid("serial port cannot be empty".to_string()));
            }
            if *baud_rate == 0 {
                return Err(ConfigError::Invalid("baud_rate must be greater than 0".to_string()));
            }
            if !(1..=247).contains(slave_address) {
                return Err(ConfigError::Invalid(format!(
                    "slave_address must be within 1..=247, got {slave_address}"
                )));
            }
        }
        Ok(())
    }

    /// 最小发送间隔
    pub fn min_period(&self) -> Duration {
        min_period_from_frequency(self.frequency_hz).unwrap_or_default()
    }
}
