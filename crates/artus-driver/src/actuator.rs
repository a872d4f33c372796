//! 执行器状态机
//!
//! 状态只由设备上报的状态字驱动。发出改变状态的指令时记录一个乐观预期，
//! 下一次 `wait_for_state` 成功后以观测值为准。

use crate::error::DriverError;
use artus_protocol::{ActuatorState, StatusWord};
use artus_transport::{Channel, TransportSession};
use std::time::{Duration, Instant};
use tracing::{Span, debug, trace, warn};

/// 执行器状态机
#[derive(Debug, Clone)]
pub struct ActuatorStateMachine {
    observed: ActuatorState,
    expected: Option<ActuatorState>,
    status_address: u16,
    span: Span,
}

impl ActuatorStateMachine {
    /// `status_address`: 状态寄存器地址
    pub fn new(status_address: u16) -> Self {
        Self {
            observed: ActuatorState::Initializing,
            expected: None,
            status_address,
            span: Span::none(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// 最近一次观测到的状态
    pub fn observed(&self) -> ActuatorState {
        self.observed
    }

    /// 尚未确认的乐观预期
    pub fn expected(&self) -> Option<ActuatorState> {
        self.expected
    }

    pub fn status_address(&self) -> u16 {
        self.status_address
    }

    /// 发出改变状态的指令后记录预期
    pub fn expect(&mut self, state: ActuatorState) {
        trace!(parent: &self.span, expected = %state, "optimistic state expectation");
        self.expected = Some(state);
    }

    /// 记录一次状态字观测，未知状态码返回 `None` 且不改变状态
    pub fn observe(&mut self, status: StatusWord) -> Option<ActuatorState> {
        let _guard = self.span.enter();
        let Some(state) = status.state() else {
            warn!(code = status.state_code(), "unknown actuator state code");
            return None;
        };
        if state != self.observed {
            if !self.observed.is_documented_transition(state) {
                debug!(from = %self.observed, to = %state, "undocumented state transition");
            } else {
                trace!(from = %self.observed, to = %state, "state transition");
            }
            self.observed = state;
        }
        Some(state)
    }

    /// 轮询状态直到进入 `acceptable` 中的任一状态
    ///
    /// 每隔 `poll_interval` 读取一次状态寄存器，超过 `timeout` 后失败；
    /// 最后一次观测为 `Busy` 时返回 `ActuatorBusy`，否则返回 `Timeout`。
    pub fn wait_for_state<C: Channel>(
        &mut self,
        session: &mut TransportSession<C>,
        acceptable: &[ActuatorState],
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<ActuatorState, DriverError> {
        let start = Instant::now();
        let mut last = None;

        loop {
            let word = session.receive_register(self.status_address)?;
            if let Some(state) = self.observe(StatusWord::from(word)) {
                last = Some(state);
                if acceptable.contains(&state) {
                    if self.expected.is_some_and(|e| e != state) {
                        debug!(parent: &self.span, expected = ?self.expected, observed = %state, "expectation corrected");
                    }
                    self.expected = None;
                    return Ok(state);
                }
            }

            // 检查剩余时间，避免不必要的 sleep
            let remaining = timeout.saturating_sub(start.elapsed());
            let sleep_duration = poll_interval.min(remaining);
            if start.elapsed() > timeout || sleep_duration.is_zero() {
                return Err(Self::timeout_error(timeout, last));
            }
            spin_sleep::sleep(sleep_duration);
        }
    }

    fn timeout_error(timeout: Duration, last: Option<ActuatorState>) -> DriverError {
        let timeout_ms = timeout.as_millis() as u64;
        match last {
            Some(ActuatorState::Busy) => DriverError::ActuatorBusy { timeout_ms },
            _ => DriverError::Timeout { timeout_ms, last },
        }
    }
}
