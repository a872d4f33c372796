//! 手部模型
//!
//! 关节按寄存器序号排列，目标字段用 `Option` 表达"本周期是否携带"。
//! 反馈写入前先校验长度，失败时模型保持不变。

use crate::models::{HandProduct, HandSide, joint_table, sensor_table};
use artus_protocol::{ControlMask, FeedbackValues, JointCommand, ProtocolError};
use tracing::{Span, debug, trace, warn};

/// 单个关节
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub name: &'static str,
    pub index: u8,
    pub min_angle: f32,
    pub max_angle: f32,
    pub default_angle: f32,
    pub rotation_direction: i8,

    /// 目标角度（已乘旋转方向并限位）
    pub target_angle: f32,
    /// 目标力矩/力，未提供时为空
    pub target_effort: Option<f32>,
    pub target_velocity: Option<u16>,

    pub feedback_angle: f32,
    pub feedback_velocity: i16,
    pub feedback_current: f32,
    pub feedback_effort: f32,
    pub feedback_temperature: i8,
    pub feedback_error: i8,
    pub feedback_mode: i8,
}

impl Joint {
    fn clamp_target(&mut self) -> bool {
        let clamped = self.target_angle.clamp(self.min_angle, self.max_angle);
        let changed = clamped != self.target_angle;
        self.target_angle = clamped;
        changed
    }
}

/// 单个关节的部分目标更新
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JointTargetUpdate {
    pub angle: Option<f32>,
    pub effort: Option<f32>,
    pub velocity: Option<u16>,
}

impl JointTargetUpdate {
    pub fn angle(angle: f32) -> Self {
        Self {
            angle: Some(angle),
            ..Self::default()
        }
    }

    pub fn with_effort(mut self, effort: f32) -> Self {
        self.effort = Some(effort);
        self
    }

    pub fn with_velocity(mut self, velocity: u16) -> Self {
        self.velocity = Some(velocity);
        self
    }
}

/// 指尖力传感器
#[derive(Debug, Clone, PartialEq)]
pub struct ForceSensor {
    pub name: &'static str,
    pub indices: [usize; 3],
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// 手部模型
#[derive(Debug, Clone)]
pub struct HandModel {
    product: HandProduct,
    side: HandSide,
    joints: Vec<Joint>,
    sensors: Vec<ForceSensor>,
    span: Span,
}

impl HandModel {
    pub fn new(product: HandProduct, side: HandSide) -> Self {
        let joints = joint_table(product, side)
            .iter()
            .enumerate()
            .map(|(index, spec)| Joint {
                name: spec.name,
                index: index as u8,
                min_angle: spec.min_angle,
                max_angle: spec.max_angle,
                default_angle: spec.default_angle,
                rotation_direction: spec.rotation_direction,
                target_angle: spec.default_angle,
                target_effort: None,
                target_velocity: None,
                feedback_angle: 0.0,
                feedback_velocity: 0,
                feedback_current: 0.0,
                feedback_effort: 0.0,
                feedback_temperature: 0,
                feedback_error: 0,
                feedback_mode: 0,
            })
            .collect();
        let sensors = sensor_table(product)
            .iter()
            .map(|spec| ForceSensor {
                name: spec.name,
                indices: spec.indices,
                x: 0.0,
                y: 0.0,
                z: 0.0,
            })
            .collect();

        Self {
            product,
            side,
            joints,
            sensors,
            span: Span::none(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn product(&self) -> HandProduct {
        self.product
    }

    pub fn side(&self) -> HandSide {
        self.side
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn joint(&self, name: &str) -> Option<&Joint> {
        self.joints.iter().find(|j| j.name == name)
    }

    pub fn joint_by_index(&self, index: u8) -> Option<&Joint> {
        self.joints.get(index as usize)
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn sensors(&self) -> &[ForceSensor] {
        &self.sensors
    }

    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    /// 应用部分目标更新，返回本次触及的控制通道
    ///
    /// - 未知关节名静默跳过
    /// - 角度乘以旋转方向后存储；未提供时保持原值
    /// - NaN 角度被忽略（保持原值，不计入掩码）；无穷大按限位处理
    /// - 力矩/力未提供时清空
    /// - 最后所有关节的目标角度限位到 `[min, max]`
    pub fn set_targets<I, S>(&mut self, updates: I) -> ControlMask
    where
        I: IntoIterator<Item = (S, JointTargetUpdate)>,
        S: AsRef<str>,
    {
        let _guard = self.span.enter();
        let mut mask = ControlMask::default();

        for (name, update) in updates {
            let name = name.as_ref();
            let Some(joint) = self.joints.iter_mut().find(|j| j.name == name) else {
                trace!(joint = name, "unknown joint skipped");
                continue;
            };

            match update.angle {
                Some(angle) if angle.is_nan() => {
                    warn!(joint = name, "NaN target angle ignored");
                },
                Some(angle) => {
                    joint.target_angle = angle * joint.rotation_direction as f32;
                    mask.set_position(true);
                },
                None => {},
            }
            if let Some(velocity) = update.velocity {
                joint.target_velocity = Some(velocity);
                mask.set_velocity(true);
            }
            joint.target_effort = update.effort;
            if update.effort.is_some() {
                mask.set_effort(true);
            }
        }

        for joint in &mut self.joints {
            if joint.clamp_target() {
                debug!(
                    joint = joint.name,
                    target = joint.target_angle,
                    "target angle clamped to joint limits"
                );
            }
        }

        mask
    }

    /// 所有关节回到默认角度，速度取配置默认值
    pub fn set_home(&mut self, default_velocity: u16) -> ControlMask {
        let updates: Vec<(&'static str, JointTargetUpdate)> = self
            .joints
            .iter()
            .map(|j| {
                (
                    j.name,
                    JointTargetUpdate::angle(j.default_angle).with_velocity(default_velocity),
                )
            })
            .collect();
        self.set_targets(updates)
    }

    /// 供编码器使用的关节目标
    pub fn joint_commands(&self) -> Vec<JointCommand> {
        self.joints
            .iter()
            .map(|j| JointCommand {
                index: j.index,
                angle: Some(j.target_angle),
                effort: j.target_effort,
            })
            .collect()
    }

    /// 写入已解析的反馈
    ///
    /// # Errors
    /// - `ProtocolError::DecodeMismatch`: 元素数与关节数（或传感器通道数）不符
    pub fn apply_feedback(&mut self, values: &FeedbackValues) -> Result<(), ProtocolError> {
        let n = self.joints.len();
        let kind = values.kind_name();
        let check = |actual: usize, expected: usize| {
            if actual == expected {
                Ok(())
            } else {
                Err(ProtocolError::DecodeMismatch {
                    kind,
                    expected,
                    actual,
                })
            }
        };

        match values {
            FeedbackValues::None => {},
            FeedbackValues::Angles(angles) => {
                check(angles.len(), n)?;
                for (joint, &angle) in self.joints.iter_mut().zip(angles) {
                    joint.feedback_angle = angle as f32;
                }
            },
            FeedbackValues::AnglesAndTorques { angles, torques } => {
                check(angles.len(), n)?;
                check(torques.len(), n)?;
                for ((joint, &angle), &torque) in self.joints.iter_mut().zip(angles).zip(torques) {
                    joint.feedback_angle = angle as f32;
                    joint.feedback_effort = torque;
                }
            },
            FeedbackValues::Torques(torques) => {
                check(torques.len(), n)?;
                for (joint, &torque) in self.joints.iter_mut().zip(torques) {
                    joint.feedback_effort = torque;
                }
            },
            FeedbackValues::Velocities(velocities) => {
                check(velocities.len(), n)?;
                for (joint, &velocity) in self.joints.iter_mut().zip(velocities) {
                    joint.feedback_velocity = velocity;
                }
            },
            FeedbackValues::Temperatures(temperatures) => {
                check(temperatures.len(), n)?;
                for (joint, &t) in self.joints.iter_mut().zip(temperatures) {
                    joint.feedback_temperature = t;
                }
            },
            FeedbackValues::ActuatorErrors(errors) => {
                check(errors.len(), n)?;
                for (joint, &e) in self.joints.iter_mut().zip(errors) {
                    joint.feedback_error = e;
                }
            },
            FeedbackValues::MotorModes(modes) => {
                check(modes.len(), n)?;
                for (joint, &m) in self.joints.iter_mut().zip(modes) {
                    joint.feedback_mode = m;
                }
            },
            FeedbackValues::ForceSensors(data) => {
                check(data.len(), self.sensors.len() * 3)?;
                for sensor in &mut self.sensors {
                    let [x, y, z] = sensor.indices;
                    sensor.x = data[x];
                    sensor.y = data[y];
                    sensor.z = data[z];
                }
            },
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn talos_left() -> HandModel {
        HandModel::new(HandProduct::ArtusTalos, HandSide::Left)
    }

    #[test]
    fn test_indices_are_permutation() {
        let hand = HandModel::new(HandProduct::ArtusLite, HandSide::Right);
        let indices: Vec<u8> = hand.joints().iter().map(|j| j.index).collect();
        assert_eq!(indices, (0..16).collect::<Vec<u8>>());
    }

    #[test]
    fn test_set_targets_mask_and_direction() {
        let mut hand = talos_left();
        let mask = hand.set_targets([
            ("thumb_spread", JointTargetUpdate::angle(10.0)),
            ("index_flex", JointTargetUpdate::angle(45.0).with_effort(1.5)),
        ]);
        assert_eq!(mask.bits(), 0b101);
        assert_eq!(hand.joint("thumb_spread").unwrap().target_angle, -10.0);
        assert_eq!(hand.joint("index_flex").unwrap().target_angle, 45.0);
        assert_eq!(hand.joint("index_flex").unwrap().target_effort, Some(1.5));
    }

    #[test]
    fn test_unknown_joint_skipped() {
        let mut hand = talos_left();
        let before = hand.joints().to_vec();
        let mask = hand.set_targets([("wrist", JointTargetUpdate::angle(10.0))]);
        assert!(mask.is_empty());
        assert_eq!(hand.joints(), before.as_slice());
    }

    #[test]
    fn test_effort_cleared_when_not_supplied() {
        let mut hand = talos_left();
        hand.set_targets([("ring_flex", JointTargetUpdate::angle(10.0).with_effort(2.0))]);
        hand.set_targets([("ring_flex", JointTargetUpdate::angle(20.0))]);
        assert_eq!(hand.joint("ring_flex").unwrap().target_effort, None);
    }

    #[test]
    fn test_angle_untouched_when_not_supplied() {
        let mut hand = talos_left();
        hand.set_targets([("middle_flex", JointTargetUpdate::angle(30.0))]);
        let mask = hand.set_targets([(
            "middle_flex",
            JointTargetUpdate::default().with_velocity(50),
        )]);
        assert_eq!(mask.bits(), 0b010);
        let joint = hand.joint("middle_flex").unwrap();
        assert_eq!(joint.target_angle, 30.0);
        assert_eq!(joint.target_velocity, Some(50));
    }

    #[test]
    fn test_out_of_range_clamped() {
        let mut hand = talos_left();
        hand.set_targets([
            ("thumb_flex", JointTargetUpdate::angle(500.0)),
            ("pinky_flex", JointTargetUpdate::angle(-20.0)),
        ]);
        assert_eq!(hand.joint("thumb_flex").unwrap().target_angle, 90.0);
        assert_eq!(hand.joint("pinky_flex").unwrap().target_angle, 0.0);
    }

    #[test]
    fn test_set_home() {
        let mut hand = HandModel::new(HandProduct::ArtusLite, HandSide::Right);
        hand.set_targets([("index_flex", JointTargetUpdate::angle(60.0))]);
        let mask = hand.set_home(80);
        assert_eq!(mask.bits(), 0b110);
        assert!(hand.joints().iter().all(|j| j.target_angle == 0.0));
        assert!(hand.joints().iter().all(|j| j.target_velocity == Some(80)));
    }

    #[test]
    fn test_set_home_applies_rotation_direction() {
        let mut hand = talos_left();
        hand.joints[0].default_angle = 10.0;
        assert_eq!(hand.joints[0].rotation_direction, -1);
        hand.set_home(80);
        assert_eq!(hand.joints[0].target_angle, -10.0);
    }

    #[test]
    fn test_nan_angle_ignored() {
        let mut hand = talos_left();
        hand.set_targets([("index_flex", JointTargetUpdate::angle(40.0))]);
        let mask = hand.set_targets([
            ("index_flex", JointTargetUpdate::angle(f32::NAN)),
            ("thumb_flex", JointTargetUpdate::angle(f32::INFINITY)),
            ("pinky_flex", JointTargetUpdate::angle(f32::NEG_INFINITY)),
        ]);
        assert!(mask.position());
        assert_eq!(hand.joint("index_flex").unwrap().target_angle, 40.0);
        assert_eq!(hand.joint("thumb_flex").unwrap().target_angle, 90.0);
        assert_eq!(hand.joint("pinky_flex").unwrap().target_angle, 0.0);

        let mask = hand.set_targets([("ring_flex", JointTargetUpdate::angle(f32::NAN))]);
        assert!(mask.is_empty());
    }

    #[test]
    fn test_apply_position_feedback() {
        let mut hand = talos_left();
        hand.apply_feedback(&FeedbackValues::Angles(vec![1, 2, 3, 4, 5, 6]))
            .unwrap();
        assert_eq!(hand.joint("pinky_flex").unwrap().feedback_angle, 6.0);
    }

    #[test]
    fn test_mismatched_feedback_leaves_model_untouched() {
        let mut hand = talos_left();
        let before = hand.joints().to_vec();
        let err = hand
            .apply_feedback(&FeedbackValues::AnglesAndTorques {
                angles: vec![1; 6],
                torques: vec![0.5; 5],
            })
            .unwrap_err();
        assert_eq!(
            err,
            ProtocolError::DecodeMismatch {
                kind: "position_torque",
                expected: 6,
                actual: 5
            }
        );
        assert_eq!(hand.joints(), before.as_slice());
    }

    #[test]
    fn test_force_sensor_demux() {
        let mut hand = talos_left();
        let data: Vec<f32> = (0..15).map(|i| i as f32).collect();
        hand.apply_feedback(&FeedbackValues::ForceSensors(data)).unwrap();
        let index = &hand.sensors()[1];
        assert_eq!((index.x, index.y, index.z), (3.0, 4.0, 5.0));

        assert!(hand
            .apply_feedback(&FeedbackValues::ForceSensors(vec![0.0; 3]))
            .is_err());
    }

    #[test]
    fn test_joint_commands_follow_targets() {
        let mut hand = HandModel::new(HandProduct::ArtusScorpion, HandSide::Right);
        hand.set_targets([("gripper_joint", JointTargetUpdate::angle(12.5).with_effort(3.0))]);
        let commands = hand.joint_commands();
        assert_eq!(
            commands,
            vec![JointCommand {
                index: 0,
                angle: Some(12.5),
                effort: Some(3.0)
            }]
        );
    }
}
