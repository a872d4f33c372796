//! # Artus Transport Layer
//!
//! 物理通道抽象层：寄存器总线（串口）与数据报（UDP）两种通道，
//! 以及在其上提供限速与重试的 [`TransportSession`]。
//!
//! 底层帧格式/CRC/字节时序由外部实现的 [`RegisterBus`] / [`DatagramBus`] 负责。

use thiserror::Error;

pub mod channel;
pub mod session;
pub mod udp;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use channel::{Channel, DatagramChannel, RegisterChannel};
pub use session::{RetryPolicy, TransportSession, min_period_from_frequency};
pub use udp::{UdpConfig, UdpDatagramBus};

#[cfg(any(test, feature = "mock"))]
pub use mock::{RecordedWrite, SimulatedBus};

/// 传输层统一错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// 通道级故障（不可重试）
    #[error("Channel fault: {0}")]
    Channel(#[from] ChannelFault),

    /// 设备无应答（可重试）
    #[error("No response from device")]
    NoResponse,

    /// 应答格式错误（可重试）
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// 重试次数耗尽
    #[error("Transport exhausted after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        last: Box<TransportError>,
    },

    /// 空消息不得发送
    #[error("Refusing to transmit an empty message")]
    EmptyMessage,

    /// 请求超出通道能力
    #[error("Invalid request: {0}")]
    InvalidInput(String),
}

impl TransportError {
    /// 是否为可重试的瞬时故障
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::NoResponse | TransportError::MalformedResponse(_)
        )
    }
}

/// 通道故障的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelFaultKind {
    Unknown,
    /// 端口/设备不存在
    NotFound,
    AccessDenied,
    /// 端口被占用
    Busy,
    /// 网络不可用或未发现设备
    Network,
    Io,
    /// 通道未打开
    Closed,
}

/// 结构化通道故障
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind:?}: {message}")]
pub struct ChannelFault {
    pub kind: ChannelFaultKind,
    pub message: String,
}

impl ChannelFault {
    pub fn new(kind: ChannelFaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn closed() -> Self {
        Self::new(ChannelFaultKind::Closed, "channel is not open")
    }
}

impl From<std::io::Error> for ChannelFault {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let kind = match err.kind() {
            ErrorKind::NotFound => ChannelFaultKind::NotFound,
            ErrorKind::PermissionDenied => ChannelFaultKind::AccessDenied,
            ErrorKind::AddrInUse => ChannelFaultKind::Busy,
            ErrorKind::AddrNotAvailable
            | ErrorKind::ConnectionRefused
            | ErrorKind::NetworkUnreachable
            | ErrorKind::HostUnreachable => ChannelFaultKind::Network,
            _ => ChannelFaultKind::Io,
        };
        Self::new(kind, err.to_string())
    }
}

/// 串口参数，交给外部 [`RegisterBus`] 实现用于打开端口与寻址从站
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    pub port: String,
    pub baud_rate: u32,
    /// 从站地址（1..=247）
    pub slave_address: u8,
}

/// 寄存器总线（串口寄存器协议，外部实现）
pub trait RegisterBus: Send {
    fn open(&mut self) -> Result<(), TransportError>;
    fn close(&mut self) -> Result<(), TransportError>;
    fn write_single_register(&mut self, address: u16, value: u16) -> Result<(), TransportError>;
    fn write_multiple_registers(&mut self, start: u16, values: &[u16])
    -> Result<(), TransportError>;
    fn read_registers(&mut self, start: u16, count: u16) -> Result<Vec<u16>, TransportError>;
}

/// 数据报总线
pub trait DatagramBus: Send {
    fn open(&mut self) -> Result<(), TransportError>;
    fn close(&mut self) -> Result<(), TransportError>;
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError>;
    /// 接收一个定长应答，长度不足时返回 `None`（不返回部分缓冲）
    fn receive(&mut self, expected_size: usize) -> Result<Option<Vec<u8>>, TransportError>;
}

impl<B: RegisterBus + ?Sized> RegisterBus for Box<B> {
    fn open(&mut self) -> Result<(), TransportError> {
        (**self).open()
    }

    fn close(&mut self) -> Result<(), TransportError> {
        (**self).close()
    }

    fn write_single_register(&mut self, address: u16, value: u16) -> Result<(), TransportError> {
        (**self).write_single_register(address, value)
    }

    fn write_multiple_registers(
        &mut self,
        start: u16,
        values: &[u16],
    ) -> Result<(), TransportError> {
        (**self).write_multiple_registers(start, values)
    }

    fn read_registers(&mut self, start: u16, count: u16) -> Result<Vec<u16>, TransportError> {
        (**self).read_registers(start, count)
    }
}
