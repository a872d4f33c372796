//! 传输会话
//!
//! 持有一个物理通道，提供限速、重试的发送/接收。
//!
//! # 限速
//!
//! 每次发送尝试前阻塞等待，直到距上一次发送至少经过 `min_period`。
//! 等待使用让出线程的 `spin_sleep`，不丢弃消息。
//!
//! # 重试
//!
//! 瞬时故障（无应答、应答格式错误）按固定间隔重试，最多 `max_attempts` 次；
//! 通道故障立即返回。

use crate::channel::Channel;
use crate::TransportError;
use artus_protocol::RegisterWrite;
use spin_sleep::{SpinSleeper, SpinStrategy};
use std::time::{Duration, Instant};
use tracing::{Span, debug, trace, warn};

/// 重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 最大尝试次数（含首次），至少为 1
    pub max_attempts: u32,
    /// 两次尝试之间的固定间隔
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(10),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }
}

/// 指令频率（Hz）→ 最小发送间隔
///
/// 非正数或非有限值返回 `None`。
pub fn min_period_from_frequency(frequency_hz: f64) -> Option<Duration> {
    if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(1.0 / frequency_hz).ok()
}

/// 传输会话
///
/// 半双工请求/应答：一次发送必须完成对应接收后才能进行下一次发送，
/// 因此会话只能由一个调用方独占使用（`&mut self`）。
pub struct TransportSession<C> {
    channel: C,
    min_period: Duration,
    last_send: Option<Instant>,
    retry: RetryPolicy,
    sleeper: SpinSleeper,
    is_open: bool,
    span: Span,
}

impl<C: Channel> TransportSession<C> {
    pub fn new(channel: C, min_period: Duration) -> Self {
        Self {
            channel,
            min_period,
            last_send: None,
            retry: RetryPolicy::default(),
            sleeper: SpinSleeper::default().with_spin_strategy(SpinStrategy::YieldThread),
            is_open: false,
            span: Span::none(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = RetryPolicy {
            max_attempts: retry.max_attempts.max(1),
            ..retry
        };
        self
    }

    /// 日志上下文
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn min_period(&self) -> Duration {
        self.min_period
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// 打开通道（通道故障不重试）
    pub fn open(&mut self) -> Result<(), TransportError> {
        let _guard = self.span.enter();
        self.channel.open()?;
        self.is_open = true;
        debug!("transport session opened");
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), TransportError> {
        let _guard = self.span.enter();
        if !self.is_open {
            return Ok(());
        }
        self.is_open = false;
        self.channel.close()?;
        debug!("transport session closed");
        Ok(())
    }

    /// 发送一条消息（限速 + 重试）
    ///
    /// # Errors
    /// - `TransportError::EmptyMessage`: 消息不含任何值
    /// - `TransportError::Channel`: 通道故障，未重试
    /// - `TransportError::Exhausted`: 瞬时故障重试耗尽
    pub fn send(&mut self, message: &RegisterWrite) -> Result<(), TransportError> {
        if message.is_empty() {
            return Err(TransportError::EmptyMessage);
        }
        let span = self.span.clone();
        let _guard = span.enter();
        trace!(kind = ?message.kind, start = message.start, words = message.values.len(), "send");

        self.with_retry_loop("send", |session| {
            session.wait_for_slot();
            let result = session.channel.transmit(message);
            session.last_send = Some(Instant::now());
            result
        })
    }

    /// 读取寄存器序列（重试）
    pub fn receive(&mut self, start: u16, count: u16) -> Result<Vec<u16>, TransportError> {
        let span = self.span.clone();
        let _guard = span.enter();
        trace!(start, count, "receive");

        self.with_retry_loop("receive", |session| session.channel.fetch(start, count))
    }

    /// 读取单个寄存器
    pub fn receive_register(&mut self, address: u16) -> Result<u16, TransportError> {
        let words = self.receive(address, 1)?;
        words.first().copied().ok_or(TransportError::NoResponse)
    }

    /// 阻塞等待直到允许下一次发送
    fn wait_for_slot(&self) {
        let Some(last) = self.last_send else {
            return;
        };
        let elapsed = last.elapsed();
        if elapsed < self.min_period {
            self.sleeper.sleep(self.min_period - elapsed);
        }
    }

    fn with_retry_loop<T>(
        &mut self,
        operation: &'static str,
        mut attempt: impl FnMut(&mut Self) -> Result<T, TransportError>,
    ) -> Result<T, TransportError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_error = TransportError::NoResponse;

        for n in 1..=max_attempts {
            match attempt(self) {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() => {
                    warn!(operation, attempt = n, max_attempts, error = %err, "transient transport fault");
                    last_error = err;
                    if n < max_attempts && !self.retry.delay.is_zero() {
                        self.sleeper.sleep(self.retry.delay);
                    }
                },
                Err(err) => return Err(err),
            }
        }

        Err(TransportError::Exhausted {
            attempts: max_attempts,
            last: Box::new(last_error),
        })
    }
}
