//! 反馈解析
//!
//! 从已知起始地址读取的字序列，按声明的元素类型解析为类型化的逐关节数据。
//! 解析失败时不产生任何部分结果。

use crate::registers::{ElementKind, ProtocolRevision, RegisterMap, RegisterName};
use crate::state::StatusWord;
use crate::{ProtocolError, unpack_byte_pair, words_to_f32};
use std::fmt;
use std::str::FromStr;

/// 反馈查询类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FeedbackKind {
    /// 仅状态字
    Status,
    /// 状态字 + 位置
    Position,
    /// 状态字 + 位置 + 力矩（legacy 连续布局）
    PositionTorque,
    /// 力矩/力
    Torque,
    /// 速度（expanded）
    Velocity,
    Temperature,
    /// 执行器错误码（expanded）
    ActuatorError,
    /// 电机模式（expanded）
    MotorMode,
    /// 指尖力传感器（expanded）
    ForceSensor,
}

impl FeedbackKind {
    pub const ALL: [FeedbackKind; 9] = [
        FeedbackKind::Status,
        FeedbackKind::Position,
        FeedbackKind::PositionTorque,
        FeedbackKind::Torque,
        FeedbackKind::Velocity,
        FeedbackKind::Temperature,
        FeedbackKind::ActuatorError,
        FeedbackKind::MotorMode,
        FeedbackKind::ForceSensor,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackKind::Status => "status",
            FeedbackKind::Position => "position",
            FeedbackKind::PositionTorque => "position_torque",
            FeedbackKind::Torque => "torque",
            FeedbackKind::Velocity => "velocity",
            FeedbackKind::Temperature => "temperature",
            FeedbackKind::ActuatorError => "actuator_error",
            FeedbackKind::MotorMode => "motor_mode",
            FeedbackKind::ForceSensor => "force_sensor",
        }
    }

    /// 计算本类型的读请求（起始地址 + 寄存器数）
    ///
    /// # Errors
    /// - `ProtocolError::UnknownRegister`: 当前版本缺少对应寄存器组
    /// - `ProtocolError::UnsupportedFeedback`: 寄存器组在当前版本中不连续
    pub fn request(
        self,
        map: &RegisterMap,
        joint_count: usize,
        sensor_count: usize,
    ) -> Result<FeedbackRequest, ProtocolError> {
        let position_words = ElementKind::BytePair.words_for(joint_count);
        let effort_words = ElementKind::Float32AsTwoU16.words_for(joint_count);

        let (start, count) = match self {
            FeedbackKind::Status => (map.get(RegisterName::Feedback)?.address, 1),
            FeedbackKind::Position => (map.get(RegisterName::Feedback)?.address, 1 + position_words),
            FeedbackKind::PositionTorque => {
                // 只有 legacy 布局中力矩块紧跟位置块
                if map.revision() != ProtocolRevision::Legacy {
                    return Err(ProtocolError::UnsupportedFeedback {
                        kind: self.as_str(),
                        revision: map.revision().as_str(),
                    });
                }
                (
                    map.get(RegisterName::Feedback)?.address,
                    1 + position_words + effort_words,
                )
            },
            FeedbackKind::Torque => (map.feedback_effort()?.address, effort_words),
            FeedbackKind::Velocity => (map.get(RegisterName::FeedbackVelocity)?.address, joint_count),
            FeedbackKind::Temperature => (
                map.get(RegisterName::FeedbackTemperature)?.address,
                position_words,
            ),
            FeedbackKind::ActuatorError => (
                map.get(RegisterName::FeedbackActuatorError)?.address,
                position_words,
            ),
            FeedbackKind::MotorMode => (
                map.get(RegisterName::FeedbackMotorMode)?.address,
                position_words,
            ),
            FeedbackKind::ForceSensor => (
                map.get(RegisterName::FeedbackForceSensor)?.address,
                ElementKind::Float32AsTwoU16.words_for(sensor_count * 3),
            ),
        };

        let count = u16::try_from(count)
            .map_err(|_| ProtocolError::InvalidInput(format!("{count} registers requested")))?;
        Ok(FeedbackRequest {
            kind: self,
            start,
            count,
            joint_count,
            sensor_count,
        })
    }
}

impl fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeedbackKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ProtocolError::InvalidInput(format!("unknown feedback kind: {s}")))
    }
}

/// 反馈读请求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackRequest {
    pub kind: FeedbackKind,
    pub start: u16,
    pub count: u16,
    pub joint_count: usize,
    pub sensor_count: usize,
}

/// 按元素类型解析后的原始元素
#[derive(Debug, Clone, PartialEq)]
pub enum Elements {
    /// Raw16 状态字：`[高字节, 低字节]`
    Status([u8; 2]),
    Bytes(Vec<i8>),
    Floats(Vec<f32>),
}

/// 按元素类型解析字序列
///
/// - `Raw16`：首字的高低字节组成状态对
/// - `BytePair`：每字拆成两个有符号字节；若结果长度 ≠ `expected` 且非空，
///   丢弃最后一个元素（奇数组协议会填充一个字节）
/// - `Float32AsTwoU16`：相邻两字拼成一个 f32
///
/// # Errors
/// - `ProtocolError::UnrecognizedFeedbackLength`: 字数与期望元素数不符
pub fn decode_elements(
    kind: ElementKind,
    words: &[u16],
    expected: usize,
) -> Result<Elements, ProtocolError> {
    match kind {
        ElementKind::Raw16 => words
            .first()
            .map(|&w| Elements::Status(StatusWord::from(w).to_pair()))
            .ok_or(ProtocolError::UnrecognizedFeedbackLength {
                words: 0,
                expected: 1,
            }),
        ElementKind::BytePair => decode_byte_pairs(words, expected).map(Elements::Bytes),
        ElementKind::Float32AsTwoU16 => decode_floats(words, expected).map(Elements::Floats),
    }
}

/// BytePair 解析（含奇数组裁剪）
pub fn decode_byte_pairs(words: &[u16], expected: usize) -> Result<Vec<i8>, ProtocolError> {
    let mut values: Vec<i8> = words.iter().flat_map(|&w| unpack_byte_pair(w)).collect();
    if values.len() != expected && !values.is_empty() {
        values.pop();
    }
    if values.len() != expected {
        return Err(ProtocolError::UnrecognizedFeedbackLength {
            words: words.len(),
            expected,
        });
    }
    Ok(values)
}

/// Float32AsTwoU16 解析
pub fn decode_floats(words: &[u16], expected: usize) -> Result<Vec<f32>, ProtocolError> {
    if words.len() != expected * 2 {
        return Err(ProtocolError::UnrecognizedFeedbackLength {
            words: words.len(),
            expected,
        });
    }
    Ok(words
        .chunks_exact(2)
        .map(|pair| words_to_f32(pair[0], pair[1]))
        .collect())
}

/// 类型化反馈数据
#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackValues {
    /// 仅状态，无逐关节数据
    None,
    Angles(Vec<i8>),
    AnglesAndTorques { angles: Vec<i8>, torques: Vec<f32> },
    Torques(Vec<f32>),
    Velocities(Vec<i16>),
    Temperatures(Vec<i8>),
    ActuatorErrors(Vec<i8>),
    MotorModes(Vec<i8>),
    /// 按传感器顺序排列的 (x, y, z) 扁平序列
    ForceSensors(Vec<f32>),
}

impl FeedbackValues {
    /// 逐关节元素数（力传感器返回扁平元素数）
    pub fn len(&self) -> usize {
        match self {
            FeedbackValues::None => 0,
            FeedbackValues::Angles(v)
            | FeedbackValues::Temperatures(v)
            | FeedbackValues::ActuatorErrors(v)
            | FeedbackValues::MotorModes(v) => v.len(),
            FeedbackValues::AnglesAndTorques { angles, .. } => angles.len(),
            FeedbackValues::Torques(v) | FeedbackValues::ForceSensors(v) => v.len(),
            FeedbackValues::Velocities(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            FeedbackValues::None => "status",
            FeedbackValues::Angles(_) => "position",
            FeedbackValues::AnglesAndTorques { .. } => "position_torque",
            FeedbackValues::Torques(_) => "torque",
            FeedbackValues::Velocities(_) => "velocity",
            FeedbackValues::Temperatures(_) => "temperature",
            FeedbackValues::ActuatorErrors(_) => "actuator_error",
            FeedbackValues::MotorModes(_) => "motor_mode",
            FeedbackValues::ForceSensors(_) => "force_sensor",
        }
    }
}

/// 一次反馈读取的解析结果
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFeedback {
    pub kind: FeedbackKind,
    /// 状态字（仅当查询包含状态寄存器时）
    pub status: Option<StatusWord>,
    pub values: FeedbackValues,
}

/// 解析一次反馈读取
///
/// # Errors
/// - `ProtocolError::UnrecognizedFeedbackLength`: 字数与请求不符
pub fn decode_feedback(
    request: &FeedbackRequest,
    words: &[u16],
) -> Result<DecodedFeedback, ProtocolError> {
    if words.len() != request.count as usize {
        return Err(ProtocolError::UnrecognizedFeedbackLength {
            words: words.len(),
            expected: request.count as usize,
        });
    }

    let n = request.joint_count;
    let position_words = ElementKind::BytePair.words_for(n);
    let mut status = None;

    let values = match request.kind {
        FeedbackKind::Status => {
            status = Some(StatusWord::from(words[0]));
            FeedbackValues::None
        },
        FeedbackKind::Position => {
            status = Some(StatusWord::from(words[0]));
            FeedbackValues::Angles(decode_byte_pairs(&words[1..], n)?)
        },
        FeedbackKind::PositionTorque => {
            status = Some(StatusWord::from(words[0]));
            let (positions, torques) = words[1..].split_at(position_words);
            FeedbackValues::AnglesAndTorques {
                angles: decode_byte_pairs(positions, n)?,
                torques: decode_floats(torques, n)?,
            }
        },
        FeedbackKind::Torque => FeedbackValues::Torques(decode_floats(words, n)?),
        FeedbackKind::Velocity => {
            FeedbackValues::Velocities(words.iter().map(|&w| w as i16).collect())
        },
        FeedbackKind::Temperature => FeedbackValues::Temperatures(decode_byte_pairs(words, n)?),
        FeedbackKind::ActuatorError => {
            FeedbackValues::ActuatorErrors(decode_byte_pairs(words, n)?)
        },
        FeedbackKind::MotorMode => FeedbackValues::MotorModes(decode_byte_pairs(words, n)?),
        FeedbackKind::ForceSensor => {
            FeedbackValues::ForceSensors(decode_floats(words, request.sensor_count * 3)?)
        },
    };

    Ok(DecodedFeedback {
        kind: request.kind,
        status,
        values,
    })
}

/// 当前版本可用的反馈类型
pub fn available_feedback(revision: ProtocolRevision) -> &'static [FeedbackKind] {
    match revision {
        ProtocolRevision::Legacy => &[
            FeedbackKind::Status,
            FeedbackKind::Position,
            FeedbackKind::PositionTorque,
            FeedbackKind::Torque,
            FeedbackKind::Temperature,
        ],
        ProtocolRevision::Expanded => &[
            FeedbackKind::Status,
            FeedbackKind::Position,
            FeedbackKind::Torque,
            FeedbackKind::Velocity,
            FeedbackKind::Temperature,
            FeedbackKind::ActuatorError,
            FeedbackKind::MotorMode,
            FeedbackKind::ForceSensor,
        ],
    }
}
