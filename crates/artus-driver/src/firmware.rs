//! 固件升级
//!
//! 流程：进入升级模式 → 等待擦除确认 → 逐页发送（每页两次突发）并等待
//! `FlashingAck` → 发送结束标记。页级不重试，失败后设备处于不确定的烧录
//! 状态，只能从第 0 页重新开始。

use crate::actuator::ActuatorStateMachine;
use crate::config::FirmwareConfig;
use crate::error::DriverError;
use artus_protocol::{
    ActuatorState, ControlCommand, FirmwareImage, FlashTarget, RegisterMap, end_of_image,
};
use artus_transport::{Channel, TransportSession};
use crossbeam_channel::Sender;
use std::path::Path;
use tracing::{Span, debug, error, info, trace};

/// 进度事件：已确认 `page` 页，共 `total_pages` 页
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareProgress {
    pub page: usize,
    pub total_pages: usize,
}

/// 一次固件传输
pub struct FirmwareTransfer {
    image: FirmwareImage,
    current_page: usize,
    config: FirmwareConfig,
    progress: Option<Sender<FirmwareProgress>>,
    span: Span,
}

impl FirmwareTransfer {
    pub fn new(image: FirmwareImage, config: FirmwareConfig) -> Self {
        Self {
            image,
            current_page: 0,
            config,
            progress: None,
            span: Span::none(),
        }
    }

    /// 读取本地镜像文件，失败时不会发送任何数据
    pub fn from_file(path: &Path, config: FirmwareConfig) -> Result<Self, DriverError> {
        let bytes = std::fs::read(path).map_err(|source| DriverError::FirmwareIo {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(FirmwareImage::from_bytes(bytes)?, config))
    }

    /// 进度事件发送端（接收端断开时静默丢弃）
    pub fn with_progress(mut self, sender: Sender<FirmwareProgress>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn image(&self) -> &FirmwareImage {
        &self.image
    }

    pub fn total_pages(&self) -> usize {
        self.image.total_pages()
    }

    /// 已确认的整页数
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// 执行传输，返回发送的页数
    ///
    /// # Errors
    /// - `DriverError::FirmwareTransferFailed`: 设备报告 `Error` 或确认超时
    /// - `DriverError::Transport`: 发送重试耗尽或通道故障
    pub fn run<C: Channel>(
        &mut self,
        session: &mut TransportSession<C>,
        state: &mut ActuatorStateMachine,
        map: &RegisterMap,
        target: FlashTarget,
    ) -> Result<usize, DriverError> {
        let span = self.span.clone();
        let _guard = span.enter();
        let total_pages = self.total_pages();
        self.current_page = 0;
        info!(
            bytes = self.image.len(),
            total_pages,
            target = target.code(),
            "starting firmware transfer"
        );

        session.send(&ControlCommand::FirmwareUpdate { target }.to_message(map)?)?;
        state.expect(ActuatorState::Flashing);

        // 擦除需要时间，先静置再轮询
        spin_sleep::sleep(self.config.settle());
        self.await_ack(session, state, "erase")?;
        debug!("flash erased");

        for page in self.image.pages() {
            for burst in page.bursts() {
                session.send(&burst)?;
            }
            trace!(page = page.index, "page sent");
            self.await_ack(session, state, "page")?;

            self.current_page += 1;
            self.publish_progress();
        }

        session.send(&end_of_image())?;
        state.expect(ActuatorState::Ready);
        info!(total_pages, "firmware transfer complete");
        Ok(total_pages)
    }

    fn await_ack<C: Channel>(
        &self,
        session: &mut TransportSession<C>,
        state: &mut ActuatorStateMachine,
        stage: &str,
    ) -> Result<(), DriverError> {
        let result = state.wait_for_state(
            session,
            &[ActuatorState::FlashingAck, ActuatorState::Error],
            self.config.ack_timeout(),
            self.config.poll_interval(),
        );
        let reason = match result {
            Ok(ActuatorState::Error) => "actuator reported error status".to_string(),
            Ok(_) => return Ok(()),
            Err(DriverError::Timeout { timeout_ms, last }) => {
                format!("no {stage} acknowledgement within {timeout_ms} ms (last: {last:?})")
            },
            Err(DriverError::ActuatorBusy { timeout_ms }) => {
                format!("actuator busy for {timeout_ms} ms awaiting {stage} acknowledgement")
            },
            Err(other) => return Err(other),
        };

        error!(
            page = self.current_page,
            total_pages = self.total_pages(),
            %reason,
            "firmware transfer failed; device must be restarted"
        );
        Err(DriverError::FirmwareTransferFailed {
            page: self.current_page,
            total_pages: self.total_pages(),
            reason,
        })
    }

    fn publish_progress(&self) {
        if let Some(tx) = &self.progress {
            let event = FirmwareProgress {
                page: self.current_page,
                total_pages: self.total_pages(),
            };
            if tx.send(event).is_err() {
                trace!("progress receiver dropped");
            }
        }
    }
}
