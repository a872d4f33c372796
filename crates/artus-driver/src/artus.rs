//! 高层手部接口
//!
//! `Artus` 独占一个传输会话、一个手部模型和一个状态机。不同的手使用
//! 不同的实例，彼此无共享状态，可在不同线程中并发使用。

use crate::actuator::ActuatorStateMachine;
use crate::config::HandConfig;
use crate::error::DriverError;
use crate::firmware::{FirmwareProgress, FirmwareTransfer};
use crate::hand::{HandModel, JointTargetUpdate};
use artus_protocol::{
    ActuatorState, CommandEncoder, ControlCommand, ControlMask, DecodedFeedback, FeedbackKind,
    FlashTarget, ProtocolError, RegisterMap, RegisterName, StatusWord, decode_feedback,
};
use artus_transport::{Channel, TransportSession};
use crossbeam_channel::Sender;
use std::path::Path;
use std::time::Duration;
use tracing::{Span, debug, info, warn};

/// 类型擦除后的通道
pub type BoxedChannel = Box<dyn Channel>;

/// 一只灵巧手
pub struct Artus<C: Channel = BoxedChannel> {
    config: HandConfig,
    map: RegisterMap,
    hand: HandModel,
    session: TransportSession<C>,
    state: ActuatorStateMachine,
    awake: bool,
    span: Span,
}

impl<C: Channel> Artus<C> {
    /// 由已构造的通道创建（不打开通道）
    pub fn new(config: HandConfig, channel: C, span: Span) -> Result<Self, DriverError> {
        config.validate()?;
        let map = RegisterMap::new(config.revision);
        let status_address = map.get(RegisterName::Feedback)?.address;
        let session = TransportSession::new(channel, config.min_period())
            .with_retry(config.retry.policy())
            .with_span(span.clone());
        let hand = HandModel::new(config.product, config.side).with_span(span.clone());
        let state = ActuatorStateMachine::new(status_address).with_span(span.clone());

        Ok(Self {
            config,
            map,
            hand,
            session,
            state,
            awake: false,
            span,
        })
    }

    pub fn config(&self) -> &HandConfig {
        &self.config
    }

    pub fn register_map(&self) -> &RegisterMap {
        &self.map
    }

    pub fn hand(&self) -> &HandModel {
        &self.hand
    }

    pub fn session(&self) -> &TransportSession<C> {
        &self.session
    }

    pub fn state(&self) -> &ActuatorStateMachine {
        &self.state
    }

    pub fn is_awake(&self) -> bool {
        self.awake
    }

    /// 打开通道；除非配置声明设备已唤醒，否则随后执行唤醒
    pub fn connect(&mut self) -> Result<(), DriverError> {
        self.session.open()?;
        info!(parent: &self.span, revision = %self.map.revision(), "connected");
        if self.config.awake {
            self.awake = true;
            Ok(())
        } else {
            self.wake_up().map(|_| ())
        }
    }

    pub fn disconnect(&mut self) -> Result<(), DriverError> {
        self.awake = false;
        self.session.close()?;
        info!(parent: &self.span, "disconnected");
        Ok(())
    }

    /// 发送唤醒指令并等待 `Ready`/`Active`
    pub fn wake_up(&mut self) -> Result<ActuatorState, DriverError> {
        self.send_control(ControlCommand::Start, Some(ActuatorState::Ready))?;
        let reached = self.wait_until_ready()?;
        self.awake = true;
        info!(parent: &self.span, state = %reached, "hand awake");
        Ok(reached)
    }

    /// 标定（`None` 为全部关节），完成后回到 `Ready`
    pub fn calibrate(&mut self, joint: Option<u8>) -> Result<ActuatorState, DriverError> {
        self.ensure_awake()?;
        if let Some(index) = joint {
            self.ensure_joint_index(index)?;
        }
        self.send_control(
            ControlCommand::Calibrate { joint },
            Some(ActuatorState::CalibratingStroke),
        )?;
        self.wait_until_ready()
    }

    /// 进入休眠，之后需重新唤醒
    ///
    /// 不要求本会话已唤醒：上一会话留下的运行中设备也可直接休眠。
    pub fn sleep(&mut self) -> Result<(), DriverError> {
        self.send_control(ControlCommand::Sleep, Some(ActuatorState::Idle))?;
        self.awake = false;
        Ok(())
    }

    /// 以当前位置为零点
    pub fn set_zero(&mut self) -> Result<(), DriverError> {
        self.ensure_awake()?;
        self.send_control(ControlCommand::SetZero, None)
    }

    /// 复位执行器（`None` 为全部）
    pub fn reset(&mut self, joint: Option<u8>) -> Result<(), DriverError> {
        self.ensure_awake()?;
        if let Some(index) = joint {
            self.ensure_joint_index(index)?;
        }
        self.send_control(ControlCommand::Reset { joint }, Some(ActuatorState::Ready))
    }

    /// 设置关节目标并下发，返回触及的控制通道
    pub fn set_joint_angles<I, S>(&mut self, updates: I) -> Result<ControlMask, DriverError>
    where
        I: IntoIterator<Item = (S, JointTargetUpdate)>,
        S: AsRef<str>,
    {
        self.ensure_awake()?;
        let mask = self.hand.set_targets(updates);
        self.send_targets()?;
        Ok(mask)
    }

    /// 全部关节回到默认角度
    pub fn set_home_position(&mut self) -> Result<ControlMask, DriverError> {
        self.ensure_awake()?;
        let mask = self.hand.set_home(self.config.default_velocity);
        self.send_targets()?;
        Ok(mask)
    }

    /// 读取一类反馈并写入手部模型
    ///
    /// 含状态字的反馈同时更新状态机。
    pub fn get_feedback(&mut self, kind: FeedbackKind) -> Result<DecodedFeedback, DriverError> {
        self.ensure_awake()?;
        let request = kind.request(&self.map, self.hand.joint_count(), self.hand.sensor_count())?;
        let words = self.session.receive(request.start, request.count)?;
        let decoded = decode_feedback(&request, &words)?;
        self.hand.apply_feedback(&decoded.values)?;
        if let Some(status) = decoded.status {
            self.state.observe(status);
        }
        debug!(parent: &self.span, kind = %kind, elements = decoded.values.len(), "feedback applied");
        Ok(decoded)
    }

    /// 读取一次状态寄存器
    pub fn robot_status(&mut self) -> Result<ActuatorState, DriverError> {
        let word = self.session.receive_register(self.state.status_address())?;
        let status = StatusWord::from(word);
        self.state.observe(status).ok_or_else(|| {
            ProtocolError::InvalidValue {
                field: "actuator_state".to_string(),
                value: status.state_code() as u16,
            }
            .into()
        })
    }

    /// 等待进入 `acceptable` 中的任一状态
    pub fn wait_for_state(
        &mut self,
        acceptable: &[ActuatorState],
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<ActuatorState, DriverError> {
        self.state
            .wait_for_state(&mut self.session, acceptable, timeout, poll_interval)
    }

    /// 按配置的超时等待 `Ready`/`Active`
    pub fn wait_until_ready(&mut self) -> Result<ActuatorState, DriverError> {
        let wait = self.config.wait;
        self.wait_for_state(
            &[ActuatorState::Ready, ActuatorState::Active],
            wait.timeout(),
            wait.poll_interval(),
        )
    }

    /// 固件升级，返回发送的页数
    ///
    /// 失败后设备需整体重启，调用方只能从头重新升级。
    pub fn update_firmware(
        &mut self,
        path: &Path,
        target: FlashTarget,
        progress: Option<Sender<FirmwareProgress>>,
    ) -> Result<usize, DriverError> {
        let mut transfer =
            FirmwareTransfer::from_file(path, self.config.firmware)?.with_span(self.span.clone());
        if let Some(tx) = progress {
            transfer = transfer.with_progress(tx);
        }
        let result = transfer.run(&mut self.session, &mut self.state, &self.map, target);
        self.awake = false;
        result
    }

    fn ensure_awake(&self) -> Result<(), DriverError> {
        if self.awake {
            Ok(())
        } else {
            Err(DriverError::NotAwake)
        }
    }

    fn ensure_joint_index(&self, index: u8) -> Result<(), DriverError> {
        if self.hand.joint_by_index(index).is_some() {
            Ok(())
        } else {
            Err(ProtocolError::InvalidInput(format!(
                "joint index {index} out of range for {}",
                self.hand.product()
            ))
            .into())
        }
    }

    fn send_control(
        &mut self,
        command: ControlCommand,
        expected: Option<ActuatorState>,
    ) -> Result<(), DriverError> {
        let message = command.to_message(&self.map)?;
        debug!(parent: &self.span, ?command, word = message.values[0], "control command");
        self.session.send(&message)?;
        if let Some(state) = expected {
            self.state.expect(state);
        }
        Ok(())
    }

    /// 编码并发送当前目标，返回消息数（零条时不发送）
    fn send_targets(&mut self) -> Result<usize, DriverError> {
        let encoded = CommandEncoder::new(&self.map).encode(&self.hand.joint_commands())?;
        if !encoded.clamped.is_empty() {
            warn!(parent: &self.span, joints = ?encoded.clamped, "targets clamped during encoding");
        }
        if encoded.is_empty() {
            debug!(parent: &self.span, "no complete target block this cycle");
            return Ok(0);
        }
        for message in &encoded.messages {
            self.session.send(message)?;
        }
        Ok(encoded.messages.len())
    }
}
