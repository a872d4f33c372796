//! 驱动层错误类型定义

use crate::config::ConfigError;
use artus_protocol::{ActuatorState, ProtocolError};
use artus_transport::TransportError;
use std::path::PathBuf;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 协议编解码错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 传输层错误
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// 等待状态超时
    #[error("Timed out after {timeout_ms} ms waiting for actuator state (last observed: {last:?})")]
    Timeout {
        timeout_ms: u64,
        last: Option<ActuatorState>,
    },

    /// 等待超时且最后一次观测到执行器忙
    #[error("Actuator still busy after {timeout_ms} ms")]
    ActuatorBusy { timeout_ms: u64 },

    /// 固件传输失败，设备处于不确定的烧录状态，只能整体重启
    #[error("Firmware transfer failed at page {page}/{total_pages}: {reason}")]
    FirmwareTransferFailed {
        page: usize,
        total_pages: usize,
        reason: String,
    },

    /// 固件文件读取失败（发送前）
    #[error("Failed to read firmware image {path}: {source}")]
    FirmwareIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 尚未唤醒
    #[error("Hand is not awake; call wake_up() first")]
    NotAwake,

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl DriverError {
    /// 调用方可通过重新发起高层操作恢复
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DriverError::Timeout { .. } | DriverError::ActuatorBusy { .. } | DriverError::NotAwake
        )
    }
}
