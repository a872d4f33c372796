//! # Artus Protocol
//!
//! Artus 灵巧手寄存器协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `registers`: 寄存器映射表（逻辑名 → 地址 + 元素类型）
//! - `constants`: 协议常量定义（控制操作码、固件分页尺寸等）
//! - `state`: 执行器状态码与状态字
//! - `control`: 控制指令与寄存器写消息
//! - `encoder`: 关节目标 → 寄存器写消息
//! - `feedback`: 寄存器读结果 → 类型化反馈
//! - `firmware`: 固件镜像分页
//!
//! ## 字节序
//!
//! 寄存器为 16 位字。位置类数据每字打包两个有符号字节（偶数关节在高字节），
//! 浮点数据按 IEEE-754 binary32 拆分为两个字（高字在前）。

pub mod constants;
pub mod control;
pub mod encoder;
pub mod feedback;
pub mod firmware;
pub mod registers;
pub mod state;

// 重新导出常用类型
pub use constants::*;
pub use control::*;
pub use encoder::*;
pub use feedback::*;
pub use firmware::*;
pub use registers::*;
pub use state::*;

use thiserror::Error;

/// 协议编解码错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Unknown register: {name}")]
    UnknownRegister { name: String },

    #[error("Feedback length mismatch for {kind}: expected {expected}, got {actual}")]
    DecodeMismatch {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Unrecognized feedback length: {words} words for {expected} elements")]
    UnrecognizedFeedbackLength { words: usize, expected: usize },

    #[error("Feedback {kind} is not available in protocol revision {revision}")]
    UnsupportedFeedback {
        kind: &'static str,
        revision: &'static str,
    },

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: String, value: u16 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// 将两个有符号字节打包为一个 16 位字（`high` 在高字节）
pub fn pack_byte_pair(high: i8, low: i8) -> u16 {
    ((high as u8 as u16) << 8) | (low as u8 as u16)
}

/// 将 16 位字拆分为两个有符号字节（二进制补码：≥128 → value-256）
pub fn unpack_byte_pair(word: u16) -> [i8; 2] {
    let [high, low] = word.to_be_bytes();
    [high as i8, low as i8]
}

/// f32 → 两个 16 位字（高字在前）
pub fn f32_to_words(value: f32) -> [u16; 2] {
    let bits = value.to_bits();
    [(bits >> 16) as u16, bits as u16]
}

/// 两个 16 位字（高字在前）→ f32
pub fn words_to_f32(high: u16, low: u16) -> f32 {
    f32::from_bits(((high as u32) << 16) | low as u32)
}

/// 四舍五入到两位小数（在 f64 中计算，避免 f32 乘法误差）
pub fn round_to_hundredths(value: f32) -> f32 {
    ((value as f64 * 100.0).round() / 100.0) as f32
}
