//! 手部操作命令
//!
//! 每个命令独立执行：读取配置 → 连接 → 执行 → 断开

use crate::utils::parse_joint_assignment;
use anyhow::{Context, Result};
use artus_sdk::protocol::FeedbackValues;
use artus_sdk::{Artus, FeedbackKind, FirmwareProgress, FlashTarget, JointTargetUpdate};
use clap::Args;
use std::path::PathBuf;
use std::thread;

/// 移动命令参数
#[derive(Args, Debug)]
pub struct MoveCommand {
    /// 关节目标，`NAME=ANGLE`（度），可重复
    #[arg(short, long = "joint", value_parser = parse_joint_assignment, required = true)]
    pub joints: Vec<(String, f32)>,

    /// 目标力矩/力，施加到所有指定关节
    #[arg(long)]
    pub effort: Option<f32>,

    /// 目标速度
    #[arg(long)]
    pub velocity: Option<u16>,
}

impl MoveCommand {
    pub fn execute(self, hand: &mut Artus) -> Result<()> {
        for (name, _) in &self.joints {
            if hand.hand().joint(name).is_none() {
                let known: Vec<&str> = hand.hand().joints().iter().map(|j| j.name).collect();
                anyhow::bail!("未知关节: {name}（可用: {}）", known.join(", "));
            }
        }

        let updates: Vec<(String, JointTargetUpdate)> = self
            .joints
            .into_iter()
            .map(|(name, angle)| {
                let mut update = JointTargetUpdate::angle(angle);
                update.effort = self.effort;
                update.velocity = self.velocity;
                (name, update)
            })
            .collect();
        let mask = hand.set_joint_angles(updates)?;

        for joint in hand.hand().joints() {
            println!("{:<16} {:>8.1}", joint.name, joint.target_angle);
        }
        println!("✅ 目标已发送 (mask=0b{:03b})", mask.bits());
        Ok(())
    }
}

/// 反馈查询参数
#[derive(Args, Debug)]
pub struct FeedbackCommand {
    /// 反馈类型（status, position, torque, velocity, temperature, ...）
    #[arg(short, long, default_value = "position")]
    pub kind: FeedbackKind,
}

impl FeedbackCommand {
    pub fn execute(self, hand: &mut Artus) -> Result<()> {
        let decoded = hand.get_feedback(self.kind)?;
        if let Some(state) = decoded.status.and_then(|s| s.state()) {
            println!("state: {state}");
        }

        let model = hand.hand();
        match &decoded.values {
            FeedbackValues::None => {},
            FeedbackValues::ForceSensors(_) => {
                for sensor in model.sensors() {
                    println!(
                        "{:<16} x={:>8.2} y={:>8.2} z={:>8.2}",
                        sensor.name, sensor.x, sensor.y, sensor.z
                    );
                }
            },
            values => {
                for joint in model.joints() {
                    let value = match values {
                        FeedbackValues::Angles(_) => format!("{:.0}", joint.feedback_angle),
                        FeedbackValues::AnglesAndTorques { .. } => format!(
                            "{:.0} / {:.2}",
                            joint.feedback_angle, joint.feedback_effort
                        ),
                        FeedbackValues::Torques(_) => format!("{:.2}", joint.feedback_effort),
                        FeedbackValues::Velocities(_) => joint.feedback_velocity.to_string(),
                        FeedbackValues::Temperatures(_) => joint.feedback_temperature.to_string(),
                        FeedbackValues::ActuatorErrors(_) => joint.feedback_error.to_string(),
                        FeedbackValues::MotorModes(_) => joint.feedback_mode.to_string(),
                        FeedbackValues::None | FeedbackValues::ForceSensors(_) => String::new(),
                    };
                    println!("{:<16} {value}", joint.name);
                }
            },
        }
        Ok(())
    }
}

/// 标定参数
#[derive(Args, Debug)]
pub struct CalibrateCommand {
    /// 关节序号，缺省为全部关节
    #[arg(short, long)]
    pub joint: Option<u8>,
}

impl CalibrateCommand {
    pub fn execute(self, hand: &mut Artus) -> Result<()> {
        let state = hand.calibrate(self.joint)?;
        match self.joint {
            Some(index) => println!("✅ 关节 {index} 标定完成 ({state})"),
            None => println!("✅ 标定完成 ({state})"),
        }
        Ok(())
    }
}

/// 固件升级参数
#[derive(Args, Debug)]
pub struct FlashCommand {
    /// 固件镜像（无头二进制）
    pub file: PathBuf,

    /// 烧录目标：执行器序号或 `all`
    #[arg(short, long, default_value = "all", value_parser = parse_flash_target)]
    pub target: FlashTarget,
}

fn parse_flash_target(s: &str) -> Result<FlashTarget, String> {
    if s.eq_ignore_ascii_case("all") {
        return Ok(FlashTarget::All);
    }
    s.parse::<u8>()
        .map(FlashTarget::Actuator)
        .map_err(|e| format!("expected actuator index or `all`, got `{s}`: {e}"))
}

impl FlashCommand {
    pub fn execute(self, hand: &mut Artus) -> Result<()> {
        let (tx, rx) = crossbeam_channel::unbounded::<FirmwareProgress>();
        let printer = thread::spawn(move || {
            for event in rx {
                eprintln!("page {}/{}", event.page, event.total_pages);
            }
        });

        let result = hand
            .update_firmware(&self.file, self.target, Some(tx))
            .with_context(|| format!("固件升级失败: {}", self.file.display()));
        // 发送端随传输结束释放，打印线程随之退出
        let _ = printer.join();

        let pages = result?;
        println!("✅ 固件升级完成，共 {pages} 页；设备需重新唤醒");
        Ok(())
    }
}

/// 查询状态
pub fn status(hand: &mut Artus) -> Result<()> {
    let state = hand.robot_status()?;
    println!("product: {}", hand.config().product);
    println!("side: {}", hand.config().side);
    println!("revision: {}", hand.register_map().revision());
    println!("state: {state}");
    Ok(())
}

/// 回到默认位置
pub fn home(hand: &mut Artus) -> Result<()> {
    hand.set_home_position()?;
    println!("✅ 已回到默认位置");
    Ok(())
}
