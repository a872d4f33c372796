//! 关节目标编码
//!
//! 将关节目标值转换为寄存器写消息。
//!
//! # 全有或全无
//!
//! 多寄存器写要求数据连续且同质：只有**每个**关节都携带的字段才参与本周期的消息。
//! 若只有部分关节给出了力矩/力，本周期不产生力矩消息（部分数据被丢弃）。

use crate::constants::{POSITION_MAX, POSITION_MIN};
use crate::control::{MessageKind, RegisterWrite};
use crate::registers::{ProtocolRevision, RegisterMap, RegisterName};
use crate::{ProtocolError, f32_to_words, pack_byte_pair, round_to_hundredths};
use tracing::{debug, warn};

/// 单个关节的待编码目标
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointCommand {
    /// 关节序号（寄存器顺序）
    pub index: u8,
    /// 目标角度（已按旋转方向和限位处理）
    pub angle: Option<f32>,
    /// 目标力矩/力
    pub effort: Option<f32>,
}

/// 编码结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodedCommands {
    /// 出站消息，0 条也是合法结果（此时不得发送）
    pub messages: Vec<RegisterWrite>,
    /// 因超出 8 位有符号范围被截断的关节序号
    pub clamped: Vec<u8>,
}

impl EncodedCommands {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// 8 位有符号位置编码，返回 (值, 是否截断)
///
/// 小数部分向零截断；NaN 视为 0 并记为截断。
pub fn encode_position(angle: f32) -> (i8, bool) {
    if angle.is_nan() {
        return (0, true);
    }
    let truncated = angle.trunc();
    if truncated > POSITION_MAX as f32 {
        (POSITION_MAX, true)
    } else if truncated < POSITION_MIN as f32 {
        (POSITION_MIN, true)
    } else {
        (truncated as i8, false)
    }
}

/// 力矩/力编码：四舍五入到两位小数后拆成两个字
pub fn encode_effort(value: f32) -> [u16; 2] {
    f32_to_words(round_to_hundredths(value))
}

/// 打包一组（按序号排序的）位置值
///
/// 第 `i` 个关节落在 `i/2 - first/2` 号字，偶数序号占高字节，奇数序号占低字节。
/// 未被任何关节占用的字节为 0。
pub fn pack_positions(sorted: &[(u8, i8)]) -> Vec<u16> {
    let (Some(first), Some(last)) = (sorted.first(), sorted.last()) else {
        return Vec::new();
    };
    let base = first.0 as usize / 2;
    let mut bytes = vec![[0i8; 2]; last.0 as usize / 2 - base + 1];
    for &(index, value) in sorted {
        let slot = &mut bytes[index as usize / 2 - base];
        slot[index as usize % 2] = value;
    }
    bytes.into_iter().map(|[hi, lo]| pack_byte_pair(hi, lo)).collect()
}

/// 关节目标编码器
#[derive(Debug, Clone)]
pub struct CommandEncoder<'a> {
    map: &'a RegisterMap,
}

impl<'a> CommandEncoder<'a> {
    pub fn new(map: &'a RegisterMap) -> Self {
        Self { map }
    }

    /// 编码本周期的关节目标
    ///
    /// # Errors
    /// - `ProtocolError::InvalidInput`: 关节序号重复
    /// - `ProtocolError::UnknownRegister`: 当前协议版本缺少目标寄存器组
    pub fn encode(&self, joints: &[JointCommand]) -> Result<EncodedCommands, ProtocolError> {
        let mut sorted: Vec<JointCommand> = joints.to_vec();
        sorted.sort_by_key(|j| j.index);
        if sorted.windows(2).any(|w| w[0].index == w[1].index) {
            return Err(ProtocolError::InvalidInput(
                "duplicate joint index in command set".to_string(),
            ));
        }

        let mut encoded = EncodedCommands::default();
        let Some(first) = sorted.first().map(|j| j.index) else {
            return Ok(encoded);
        };

        let all_angle = sorted.iter().all(|j| j.angle.is_some());
        let all_effort = sorted.iter().all(|j| j.effort.is_some());
        if !all_effort && sorted.iter().any(|j| j.effort.is_some()) {
            debug!("effort targets present on a subset of joints; effort block skipped this cycle");
        }

        let mut position_message = None;
        if all_angle {
            let mut packed = Vec::with_capacity(sorted.len());
            for joint in &sorted {
                let (value, clamped) = encode_position(joint.angle.unwrap_or_default());
                if clamped {
                    warn!(
                        joint = joint.index,
                        angle = ?joint.angle,
                        value,
                        "target angle outside signed 8-bit range, clamped"
                    );
                    encoded.clamped.push(joint.index);
                }
                packed.push((joint.index, value));
            }
            let block = self.map.get(RegisterName::TargetPosition)?;
            position_message = Some(RegisterWrite::new(
                MessageKind::Target,
                block.address + first as u16 / 2,
                pack_positions(&packed),
            ));
        }

        let effort_words: Option<Vec<u16>> = all_effort.then(|| {
            sorted
                .iter()
                .flat_map(|j| encode_effort(j.effort.unwrap_or_default()))
                .collect()
        });

        match (position_message, effort_words) {
            // legacy：力矩块紧跟在位置块之后，合并为一次写入
            (Some(mut position), Some(words))
                if self.map.revision() == ProtocolRevision::Legacy =>
            {
                position.values.extend(words);
                encoded.messages.push(position);
            },
            (position, effort) => {
                if let Some(position) = position {
                    encoded.messages.push(position);
                }
                if let Some(words) = effort {
                    let block = self.map.target_effort()?;
                    encoded.messages.push(RegisterWrite::new(
                        MessageKind::Target,
                        block.address + first as u16 * 2,
                        words,
                    ));
                }
            },
        }

        Ok(encoded)
    }
}
