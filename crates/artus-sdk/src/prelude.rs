//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use artus_sdk::prelude::*;
//! ```

// 高层接口
pub use artus_driver::{Artus, ArtusBuilder, HandConfig, JointTargetUpdate};
pub use artus_driver::{HandModel, HandProduct, HandSide};

// 协议类型
pub use artus_protocol::{ActuatorState, ControlMask, FeedbackKind, FeedbackValues, FlashTarget};

// 传输层（自定义串口总线）
pub use artus_transport::{Channel, RegisterBus};

// 错误类型
pub use artus_driver::DriverError;
pub use artus_protocol::ProtocolError;
pub use artus_transport::TransportError;
