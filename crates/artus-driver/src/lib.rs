//! # Artus Driver
//!
//! 手部模型、执行器状态机、固件升级与高层 `Artus` 接口。
//!
//! ## 模块
//!
//! - `models`: 产品型号与静态关节表
//! - `hand`: 手部模型（目标/反馈）
//! - `actuator`: 执行器状态机与状态等待
//! - `firmware`: 固件分页传输
//! - `config`: TOML 配置
//! - `builder`: `ArtusBuilder`
//! - `artus`: 高层手部接口

pub mod actuator;
pub mod artus;
pub mod builder;
pub mod config;
pub mod error;
pub mod firmware;
pub mod hand;
pub mod models;

pub use actuator::ActuatorStateMachine;
pub use artus::{Artus, BoxedChannel};
pub use builder::ArtusBuilder;
pub use config::{ChannelConfig, ConfigError, FirmwareConfig, HandConfig, RetryConfig, WaitConfig};
pub use error::DriverError;
pub use firmware::{FirmwareProgress, FirmwareTransfer};
pub use hand::{ForceSensor, HandModel, Joint, JointTargetUpdate};
pub use models::{ForceSensorSpec, HandProduct, HandSide, JointSpec, joint_table, sensor_table};
