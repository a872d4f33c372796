//! 执行器状态码
//!
//! 状态寄存器的低字节为执行器状态码，高字节保留。

use bilge::prelude::*;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// 执行器生命周期状态
///
/// 状态迁移只由设备上报的状态字驱动，本地只维护乐观预期。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, TryFromPrimitive, IntoPrimitive,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ActuatorState {
    /// 上电初始化
    #[default]
    Initializing = 0,
    /// 空闲，可设置控制类型与模式
    Idle = 1,
    /// FOC 转子位置标定
    CalibratingLowLevel = 2,
    /// 手指行程标定
    CalibratingStroke = 3,
    Sleep = 4,
    WaitAck = 5,
    /// 可接收指令
    Ready = 6,
    /// 处于控制模式，正在接收指令
    Active = 7,
    /// 忙，等待执行器就绪
    Busy = 8,
    Error = 9,
    AllCalibrate = 10,
    /// 固件烧录中
    Flashing = 11,
    /// 固件页确认
    FlashingAck = 12,
}

impl ActuatorState {
    pub fn code(self) -> u8 {
        self.into()
    }

    pub fn is_calibrating(self) -> bool {
        matches!(
            self,
            ActuatorState::CalibratingLowLevel
                | ActuatorState::CalibratingStroke
                | ActuatorState::AllCalibrate
        )
    }

    /// 是否属于固件升级流程
    pub fn is_flashing(self) -> bool {
        matches!(self, ActuatorState::Flashing | ActuatorState::FlashingAck)
    }

    /// 是否为有文档记录的迁移
    ///
    /// 仅用于诊断日志：设备上报的状态始终被接受。
    pub fn is_documented_transition(self, next: ActuatorState) -> bool {
        use ActuatorState::*;

        if self == next || next == Error {
            return true;
        }
        match self {
            Initializing => matches!(next, Idle),
            Idle => next.is_calibrating() || matches!(next, Ready | Active | Sleep | Flashing),
            CalibratingLowLevel | CalibratingStroke | AllCalibrate => {
                next.is_calibrating() || matches!(next, Idle | Ready)
            },
            Ready | Active => matches!(next, Ready | Active | Busy | Idle | Sleep | Flashing),
            Busy => matches!(next, Ready | Active),
            Flashing => matches!(next, FlashingAck),
            FlashingAck => matches!(next, Flashing | Ready | Idle),
            Sleep | WaitAck => matches!(next, Idle | Ready | Initializing),
            Error => true,
        }
    }
}

impl fmt::Display for ActuatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

/// 状态字（状态寄存器的 16 位值）
///
/// bilge 默认 LSB first：第一个字段占低字节。
#[bitsize(16)]
#[derive(FromBits, DebugBits, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusWord {
    pub state_code: u8, // 低字节：执行器状态码
    pub reserved: u8,   // 高字节：保留
}

impl StatusWord {
    /// 状态对 `[高字节, 低字节]`
    pub fn to_pair(self) -> [u8; 2] {
        u16::from(self).to_be_bytes()
    }

    /// 解析状态码，未知状态码返回 `None`
    pub fn state(self) -> Option<ActuatorState> {
        ActuatorState::try_from(self.state_code()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_code() {
        assert_eq!(ActuatorState::try_from(0u8).unwrap(), ActuatorState::Initializing);
        assert_eq!(ActuatorState::try_from(8u8).unwrap(), ActuatorState::Busy);
        assert_eq!(ActuatorState::try_from(12u8).unwrap(), ActuatorState::FlashingAck);
        assert!(ActuatorState::try_from(13u8).is_err());
    }

    #[test]
    fn test_status_word_low_byte_is_state() {
        let word = StatusWord::from(0xAB06u16);
        assert_eq!(word.state_code(), 6);
        assert_eq!(word.state(), Some(ActuatorState::Ready));
        assert_eq!(word.to_pair(), [0xAB, 0x06]);
    }

    #[test]
    fn test_status_word_unknown_code() {
        let word = StatusWord::from(0x00FEu16);
        assert_eq!(word.state(), None);
    }

    #[test]
    fn test_documented_transitions() {
        use ActuatorState::*;
        assert!(Initializing.is_documented_transition(Idle));
        assert!(Idle.is_documented_transition(CalibratingStroke));
        assert!(CalibratingStroke.is_documented_transition(Ready));
        assert!(Ready.is_documented_transition(Busy));
        assert!(Busy.is_documented_transition(Active));
        assert!(Flashing.is_documented_transition(FlashingAck));
        assert!(FlashingAck.is_documented_transition(Ready));
        assert!(Active.is_documented_transition(Error));
        assert!(!Initializing.is_documented_transition(Active));
        assert!(!Flashing.is_documented_transition(Active));
    }
}
