//! Artus SDK - Artus 灵巧手 Rust SDK
//!
//! # 架构设计
//!
//! 本 SDK 采用分层架构，从底层到高层：
//!
//! - **协议层** (`protocol`): 寄存器映射、指令编码、反馈解码、固件分页
//! - **传输层** (`transport`): 串口寄存器通道 / UDP 数据报通道，限速与重试
//! - **驱动层** (`driver`): 手部模型、执行器状态机、固件升级、`Artus` 高层接口
//!
//! # 快速开始
//!
//! ```no_run
//! use artus_sdk::prelude::*;
//!
//! artus_sdk::init_logger();
//! let mut hand = ArtusBuilder::new()
//!     .product(HandProduct::ArtusTalos)
//!     .side(HandSide::Right)
//!     .udp(Some("ArtusTalosRight"), Some("password"))
//!     .build()?;
//! hand.connect()?;
//! hand.set_joint_angles([("index_flex", JointTargetUpdate::angle(45.0))])?;
//! let feedback = hand.get_feedback(FeedbackKind::Position)?;
//! # Ok::<(), DriverError>(())
//! ```

pub mod prelude;

pub use artus_driver as driver;
pub use artus_protocol as protocol;
pub use artus_transport as transport;

pub use artus_driver::{
    Artus, ArtusBuilder, DriverError, FirmwareProgress, HandConfig, HandModel, HandProduct,
    HandSide, JointTargetUpdate,
};
pub use artus_protocol::{ActuatorState, FeedbackKind, FlashTarget, ProtocolError};
pub use artus_transport::TransportError;

use tracing_subscriber::EnvFilter;

/// 安装全局日志订阅器
///
/// 过滤规则取自 `RUST_LOG`，缺省为 `info`；`log` 记录经 `tracing-log` 转发。
/// 重复调用时保留已安装的订阅器，返回 `false`。
pub fn init_logger() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return false;
    }
    // 已有 log 记录器时不覆盖
    if let Err(e) = tracing_log::LogTracer::init() {
        tracing::debug!(error = %e, "log records not bridged; a logger is already installed");
    }
    true
}
