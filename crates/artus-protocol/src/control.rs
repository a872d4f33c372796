//! 控制指令与寄存器写消息
//!
//! 所有出站数据都表示为 [`RegisterWrite`]：消息类型标签决定传输层
//! 使用单寄存器写（控制操作码）还是多寄存器写（目标值/固件数据）。

use crate::constants::*;
use crate::registers::{RegisterMap, RegisterName};
use crate::ProtocolError;
use bilge::prelude::*;

/// 消息类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// 控制操作码，单寄存器写（功能码 0x06）
    Control,
    /// 关节目标值，多寄存器写（功能码 0x10）
    Target,
    /// 固件数据，多寄存器写
    Firmware,
}

impl MessageKind {
    /// 底层寄存器协议使用的功能码
    pub fn function_code(self) -> u8 {
        match self {
            MessageKind::Control => 0x06,
            MessageKind::Target | MessageKind::Firmware => 0x10,
        }
    }

    pub fn is_single_register(self) -> bool {
        matches!(self, MessageKind::Control)
    }
}

/// 一条出站寄存器写消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterWrite {
    pub kind: MessageKind,
    /// 起始地址（固件突发时为固件数据操作码）
    pub start: u16,
    pub values: Vec<u16>,
}

impl RegisterWrite {
    pub fn new(kind: MessageKind, start: u16, values: Vec<u16>) -> Self {
        Self {
            kind,
            start,
            values,
        }
    }

    /// 扁平表示：`[start, values...]`
    pub fn to_words(&self) -> Vec<u16> {
        let mut words = Vec::with_capacity(self.values.len() + 1);
        words.push(self.start);
        words.extend_from_slice(&self.values);
        words
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// 固件烧录目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FlashTarget {
    /// 指定关节对应的执行器
    Actuator(u8),
    /// 全部执行器
    All,
}

impl FlashTarget {
    pub fn code(self) -> u8 {
        match self {
            FlashTarget::Actuator(index) => index,
            FlashTarget::All => FLASH_TARGET_ALL,
        }
    }
}

/// 写入命令寄存器的控制指令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// 唤醒
    Start,
    /// 标定，`None` 表示全部关节
    Calibrate { joint: Option<u8> },
    Sleep,
    SetZero,
    /// 进入固件升级
    FirmwareUpdate { target: FlashTarget },
    /// 复位，`None` 表示全部执行器
    Reset { joint: Option<u8> },
    GetFeedback,
}

impl ControlCommand {
    pub fn opcode(self) -> u8 {
        match self {
            ControlCommand::Start => OPCODE_START,
            ControlCommand::Calibrate { .. } => OPCODE_CALIBRATE,
            ControlCommand::Sleep => OPCODE_SLEEP,
            ControlCommand::SetZero => OPCODE_SET_ZERO,
            ControlCommand::FirmwareUpdate { .. } => OPCODE_FIRMWARE_UPDATE,
            ControlCommand::Reset { .. } => OPCODE_RESET,
            ControlCommand::GetFeedback => OPCODE_GET_FEEDBACK,
        }
    }

    pub fn argument(self) -> u8 {
        match self {
            ControlCommand::Calibrate { joint } | ControlCommand::Reset { joint } => {
                joint.unwrap_or(0)
            },
            ControlCommand::FirmwareUpdate { target } => target.code(),
            _ => 0,
        }
    }

    /// 命令字：高字节操作码，低字节参数
    pub fn to_word(self) -> u16 {
        ((self.opcode() as u16) << 8) | self.argument() as u16
    }

    /// 转换为命令寄存器的单寄存器写
    ///
    /// # Errors
    /// - `ProtocolError::InvalidInput`: 烧录目标序号与"全部执行器"编码冲突
    pub fn to_message(self, map: &RegisterMap) -> Result<RegisterWrite, ProtocolError> {
        match self {
            ControlCommand::FirmwareUpdate {
                target: FlashTarget::Actuator(index),
            } if index >= FLASH_TARGET_ALL => {
                return Err(ProtocolError::InvalidInput(format!(
                    "flash target {index} out of range (0..{FLASH_TARGET_ALL})"
                )));
            },
            _ => {},
        }
        let command = map.get(RegisterName::Command)?;
        Ok(RegisterWrite::new(
            MessageKind::Control,
            command.address,
            vec![self.to_word()],
        ))
    }
}

/// 控制通道掩码
///
/// 位 2：角度，位 1：速度，位 0：力矩/力。
#[bitsize(8)]
#[derive(FromBits, DebugBits, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlMask {
    pub effort: bool,   // Bit 0: 力矩/力
    pub velocity: bool, // Bit 1: 速度
    pub position: bool, // Bit 2: 角度
    pub reserved: u5,   // Bit 3-7: 保留
}

impl ControlMask {
    pub fn bits(self) -> u8 {
        u8::from(self)
    }

    pub fn is_empty(self) -> bool {
        self.bits() == 0
    }

    pub fn union(self, other: ControlMask) -> ControlMask {
        ControlMask::from(self.bits() | other.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::ProtocolRevision;

    #[test]
    fn test_control_word_layout() {
        let cmd = ControlCommand::Calibrate { joint: Some(3) };
        assert_eq!(cmd.to_word(), ((OPCODE_CALIBRATE as u16) << 8) | 3);
        assert_eq!(ControlCommand::Start.to_word(), (OPCODE_START as u16) << 8);
    }

    #[test]
    fn test_firmware_target_argument() {
        let all = ControlCommand::FirmwareUpdate {
            target: FlashTarget::All,
        };
        assert_eq!(all.argument(), 6);
        assert_eq!(all.to_word(), 0x3406);
        let one = ControlCommand::FirmwareUpdate {
            target: FlashTarget::Actuator(2),
        };
        assert_eq!(one.argument(), 2);
    }

    #[test]
    fn test_flash_target_colliding_with_all_rejected() {
        let map = RegisterMap::new(ProtocolRevision::Expanded);
        let cmd = ControlCommand::FirmwareUpdate {
            target: FlashTarget::Actuator(FLASH_TARGET_ALL),
        };
        assert!(matches!(cmd.to_message(&map), Err(ProtocolError::InvalidInput(_))));
        let cmd = ControlCommand::FirmwareUpdate {
            target: FlashTarget::Actuator(5),
        };
        assert_eq!(cmd.to_message(&map).unwrap().values, vec![0x3405]);
    }

    #[test]
    fn test_control_message_targets_command_register() {
        let map = RegisterMap::new(ProtocolRevision::Expanded);
        let msg = ControlCommand::Sleep.to_message(&map).unwrap();
        assert_eq!(msg.kind, MessageKind::Control);
        assert_eq!(msg.start, 0);
        assert_eq!(msg.values.len(), 1);
        assert!(msg.kind.is_single_register());
    }

    #[test]
    fn test_register_write_flat_words() {
        let msg = RegisterWrite::new(MessageKind::Target, 7, vec![1, 2]);
        assert_eq!(msg.to_words(), vec![7, 1, 2]);
    }

    #[test]
    fn test_control_mask_bits() {
        let mut mask = ControlMask::default();
        assert!(mask.is_empty());
        mask.set_position(true);
        assert_eq!(mask.bits(), 0b100);
        mask.set_velocity(true);
        assert_eq!(mask.bits(), 0b110);
        mask.set_effort(true);
        assert_eq!(mask.bits(), 0b111);
    }

    #[test]
    fn test_control_mask_union() {
        let a = ControlMask::from(0b001u8);
        let b = ControlMask::from(0b100u8);
        assert_eq!(a.union(b).bits(), 0b101);
    }
}
