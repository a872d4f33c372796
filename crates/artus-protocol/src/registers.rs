//! 寄存器映射表
//!
//! 逻辑寄存器名 → (起始地址, 元素类型)。映射表在构造时由协议版本决定，
//! 之后不可变。

use crate::ProtocolError;
use std::fmt;
use std::str::FromStr;

/// 协议版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ProtocolRevision {
    /// 早期 RS485 布局：单一浮点寄存器组，反馈块紧邻
    Legacy,
    /// 扩展布局：力/速度/温度/错误/模式/指尖力传感器分组
    #[default]
    Expanded,
}

impl ProtocolRevision {
    pub fn as_str(self) -> &'static str {
        match self {
            ProtocolRevision::Legacy => "legacy",
            ProtocolRevision::Expanded => "expanded",
        }
    }
}

impl fmt::Display for ProtocolRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 寄存器元素在线上的打包方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// 原始 16 位字
    Raw16,
    /// 每字两个有符号字节
    BytePair,
    /// IEEE-754 binary32 拆分为两个 16 位字（高字在前）
    Float32AsTwoU16,
}

impl ElementKind {
    /// `n` 个元素占用的寄存器数
    pub fn words_for(self, n: usize) -> usize {
        match self {
            ElementKind::Raw16 => n,
            ElementKind::BytePair => n.div_ceil(2),
            ElementKind::Float32AsTwoU16 => n * 2,
        }
    }
}

/// 逻辑寄存器名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterName {
    Command,
    TargetPosition,
    TargetTorque,
    TargetForce,
    TargetVelocity,
    Feedback,
    FeedbackPosition,
    FeedbackTorque,
    FeedbackForce,
    FeedbackVelocity,
    FeedbackTemperature,
    FeedbackActuatorError,
    FeedbackMotorMode,
    FeedbackForceSensor,
}

impl RegisterName {
    pub const ALL: [RegisterName; 14] = [
        RegisterName::Command,
        RegisterName::TargetPosition,
        RegisterName::TargetTorque,
        RegisterName::TargetForce,
        RegisterName::TargetVelocity,
        RegisterName::Feedback,
        RegisterName::FeedbackPosition,
        RegisterName::FeedbackTorque,
        RegisterName::FeedbackForce,
        RegisterName::FeedbackVelocity,
        RegisterName::FeedbackTemperature,
        RegisterName::FeedbackActuatorError,
        RegisterName::FeedbackMotorMode,
        RegisterName::FeedbackForceSensor,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RegisterName::Command => "command",
            RegisterName::TargetPosition => "target_position",
            RegisterName::TargetTorque => "target_torque",
            RegisterName::TargetForce => "target_force",
            RegisterName::TargetVelocity => "target_velocity",
            RegisterName::Feedback => "feedback",
            RegisterName::FeedbackPosition => "feedback_position",
            RegisterName::FeedbackTorque => "feedback_torque",
            RegisterName::FeedbackForce => "feedback_force",
            RegisterName::FeedbackVelocity => "feedback_velocity",
            RegisterName::FeedbackTemperature => "feedback_temperature",
            RegisterName::FeedbackActuatorError => "feedback_actuator_error",
            RegisterName::FeedbackMotorMode => "feedback_motor_mode",
            RegisterName::FeedbackForceSensor => "feedback_force_sensor",
        }
    }
}

impl fmt::Display for RegisterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegisterName {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RegisterName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownRegister {
                name: s.to_string(),
            })
    }
}

/// 映射表条目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterEntry {
    pub address: u16,
    pub kind: ElementKind,
}

const LEGACY_LAYOUT: &[(RegisterName, u16, ElementKind)] = &[
    (RegisterName::Command, 0, ElementKind::Raw16),
    (RegisterName::TargetPosition, 1, ElementKind::BytePair),
    (RegisterName::TargetTorque, 4, ElementKind::Float32AsTwoU16),
    (RegisterName::Feedback, 100, ElementKind::Raw16),
    (RegisterName::FeedbackPosition, 101, ElementKind::BytePair),
    (RegisterName::FeedbackTorque, 104, ElementKind::Float32AsTwoU16),
    (RegisterName::FeedbackTemperature, 116, ElementKind::BytePair),
];

const EXPANDED_LAYOUT: &[(RegisterName, u16, ElementKind)] = &[
    (RegisterName::Command, 0, ElementKind::Raw16),
    (RegisterName::TargetPosition, 1, ElementKind::BytePair),
    (RegisterName::TargetForce, 50, ElementKind::Float32AsTwoU16),
    (RegisterName::TargetVelocity, 150, ElementKind::Raw16),
    (RegisterName::Feedback, 200, ElementKind::Raw16),
    (RegisterName::FeedbackPosition, 201, ElementKind::BytePair),
    (RegisterName::FeedbackForce, 250, ElementKind::Float32AsTwoU16),
    (RegisterName::FeedbackVelocity, 350, ElementKind::Raw16),
    (RegisterName::FeedbackTemperature, 400, ElementKind::BytePair),
    (RegisterName::FeedbackActuatorError, 500, ElementKind::BytePair),
    (RegisterName::FeedbackMotorMode, 600, ElementKind::BytePair),
    (RegisterName::FeedbackForceSensor, 650, ElementKind::Float32AsTwoU16),
];

/// 寄存器映射表
///
/// 由协议版本参数化的单一组件，两个版本共享同一套查询逻辑。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterMap {
    revision: ProtocolRevision,
    entries: &'static [(RegisterName, u16, ElementKind)],
}

impl RegisterMap {
    pub fn new(revision: ProtocolRevision) -> Self {
        let entries = match revision {
            ProtocolRevision::Legacy => LEGACY_LAYOUT,
            ProtocolRevision::Expanded => EXPANDED_LAYOUT,
        };
        Self { revision, entries }
    }

    pub fn revision(&self) -> ProtocolRevision {
        self.revision
    }

    /// 按逻辑名字符串解析
    ///
    /// # Errors
    /// - `ProtocolError::UnknownRegister`: 名称未知或当前版本不含该寄存器
    pub fn resolve(&self, logical_name: &str) -> Result<RegisterEntry, ProtocolError> {
        let name = logical_name.parse::<RegisterName>()?;
        self.get(name)
    }

    /// 按类型化名称查询
    pub fn get(&self, name: RegisterName) -> Result<RegisterEntry, ProtocolError> {
        self.entries
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|&(_, address, kind)| RegisterEntry { address, kind })
            .ok_or_else(|| ProtocolError::UnknownRegister {
                name: format!("{} (revision {})", name, self.revision),
            })
    }

    pub fn contains(&self, name: RegisterName) -> bool {
        self.entries.iter().any(|(n, _, _)| *n == name)
    }

    /// 力矩/力目标寄存器组（legacy 为 torque，expanded 为 force）
    pub fn target_effort(&self) -> Result<RegisterEntry, ProtocolError> {
        match self.revision {
            ProtocolRevision::Legacy => self.get(RegisterName::TargetTorque),
            ProtocolRevision::Expanded => self.get(RegisterName::TargetForce),
        }
    }

    /// 力矩/力反馈寄存器组
    pub fn feedback_effort(&self) -> Result<RegisterEntry, ProtocolError> {
        match self.revision {
            ProtocolRevision::Legacy => self.get(RegisterName::FeedbackTorque),
            ProtocolRevision::Expanded => self.get(RegisterName::FeedbackForce),
        }
    }

    /// 遍历当前版本的全部条目
    pub fn iter(&self) -> impl Iterator<Item = (RegisterName, RegisterEntry)> + '_ {
        self.entries
            .iter()
            .map(|&(name, address, kind)| (name, RegisterEntry { address, kind }))
    }
}

impl Default for RegisterMap {
    fn default() -> Self {
        Self::new(ProtocolRevision::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_register() {
        let map = RegisterMap::new(ProtocolRevision::Expanded);
        let entry = map.resolve("target_force").unwrap();
        assert_eq!(entry.address, 50);
        assert_eq!(entry.kind, ElementKind::Float32AsTwoU16);
    }

    #[test]
    fn test_resolve_unknown_name() {
        let map = RegisterMap::new(ProtocolRevision::Expanded);
        let err = map.resolve("does_not_exist").unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownRegister { .. }));
    }

    #[test]
    fn test_resolve_missing_in_revision() {
        let legacy = RegisterMap::new(ProtocolRevision::Legacy);
        assert!(matches!(
            legacy.resolve("feedback_force_sensor"),
            Err(ProtocolError::UnknownRegister { .. })
        ));
        assert!(legacy.resolve("target_torque").is_ok());
    }

    #[test]
    fn test_effort_blocks_follow_revision() {
        let legacy = RegisterMap::new(ProtocolRevision::Legacy);
        assert_eq!(legacy.target_effort().unwrap().address, 4);
        assert_eq!(legacy.feedback_effort().unwrap().address, 104);

        let expanded = RegisterMap::new(ProtocolRevision::Expanded);
        assert_eq!(expanded.target_effort().unwrap().address, 50);
        assert_eq!(expanded.feedback_effort().unwrap().address, 250);
    }

    #[test]
    fn test_register_name_roundtrip() {
        for name in RegisterName::ALL {
            assert_eq!(name.as_str().parse::<RegisterName>().unwrap(), name);
        }
    }

    #[test]
    fn test_addresses_strictly_increasing() {
        for revision in [ProtocolRevision::Legacy, ProtocolRevision::Expanded] {
            let map = RegisterMap::new(revision);
            let addresses: Vec<u16> = map.iter().map(|(_, e)| e.address).collect();
            assert!(addresses.windows(2).all(|w| w[0] < w[1]), "{revision}");
        }
    }

    #[test]
    fn test_words_for() {
        assert_eq!(ElementKind::BytePair.words_for(5), 3);
        assert_eq!(ElementKind::BytePair.words_for(16), 8);
        assert_eq!(ElementKind::Float32AsTwoU16.words_for(6), 12);
        assert_eq!(ElementKind::Raw16.words_for(4), 4);
    }
}
