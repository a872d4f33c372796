//! 通道接口与两种实现
//!
//! - [`RegisterChannel`]：按消息类型标签映射为单寄存器写或多寄存器写
//! - [`DatagramChannel`]：将寄存器访问封装为数据报请求/应答
//!
//! # 数据报格式
//!
//! 请求：`[功能码 u8][起始地址 u16 BE][数量 u16 BE][值 u16 BE ...]`
//!
//! 应答：固定 65 字节，`[功能码回显 u8][32 × u16 BE]`

use crate::{DatagramBus, RegisterBus, TransportError};
use artus_protocol::RegisterWrite;
use tracing::trace;

/// 读寄存器功能码
pub const FUNCTION_READ: u8 = 0x03;
/// 数据报应答长度
pub const DATAGRAM_REPLY_SIZE: usize = 65;
/// 单个数据报应答可承载的最大寄存器数
pub const DATAGRAM_MAX_READ: u16 = 32;

/// 通道接口
///
/// 命令编码与状态机只依赖本接口，不感知物理通道类型。
pub trait Channel: Send {
    fn open(&mut self) -> Result<(), TransportError>;
    fn close(&mut self) -> Result<(), TransportError>;
    /// 发送一条寄存器写消息
    fn transmit(&mut self, message: &RegisterWrite) -> Result<(), TransportError>;
    /// 读取 `count` 个寄存器
    fn fetch(&mut self, start: u16, count: u16) -> Result<Vec<u16>, TransportError>;
}

impl<C: Channel + ?Sized> Channel for Box<C> {
    fn open(&mut self) -> Result<(), TransportError> {
        (**self).open()
    }

    fn close(&mut self) -> Result<(), TransportError> {
        (**self).close()
    }

    fn transmit(&mut self, message: &RegisterWrite) -> Result<(), TransportError> {
        (**self).transmit(message)
    }

    fn fetch(&mut self, start: u16, count: u16) -> Result<Vec<u16>, TransportError> {
        (**self).fetch(start, count)
    }
}

/// 串口寄存器通道
#[derive(Debug)]
pub struct RegisterChannel<B> {
    bus: B,
}

impl<B: RegisterBus> RegisterChannel<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn into_inner(self) -> B {
        self.bus
    }
}

impl<B: RegisterBus> Channel for RegisterChannel<B> {
    fn open(&mut self) -> Result<(), TransportError> {
        self.bus.open()
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.bus.close()
    }

    fn transmit(&mut self, message: &RegisterWrite) -> Result<(), TransportError> {
        if message.kind.is_single_register() {
            let [value] = message.values.as_slice() else {
                return Err(TransportError::InvalidInput(format!(
                    "single-register write carries {} values",
                    message.values.len()
                )));
            };
            self.bus.write_single_register(message.start, *value)
        } else {
            self.bus.write_multiple_registers(message.start, &message.values)
        }
    }

    fn fetch(&mut self, start: u16, count: u16) -> Result<Vec<u16>, TransportError> {
        let words = self.bus.read_registers(start, count)?;
        if words.len() != count as usize {
            return Err(TransportError::MalformedResponse(format!(
                "requested {count} registers, got {}",
                words.len()
            )));
        }
        Ok(words)
    }
}

/// 编码数据报请求
pub fn encode_request(function: u8, start: u16, count: u16, values: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(5 + values.len() * 2);
    bytes.push(function);
    bytes.extend_from_slice(&start.to_be_bytes());
    bytes.extend_from_slice(&count.to_be_bytes());
    for value in values {
        bytes.extend_from_slice(&value.to_be_bytes());
    }
    bytes
}

/// 解析数据报应答，取前 `count` 个字
pub fn decode_reply(function: u8, reply: &[u8], count: u16) -> Result<Vec<u16>, TransportError> {
    if reply.len() < DATAGRAM_REPLY_SIZE {
        return Err(TransportError::NoResponse);
    }
    if reply[0] != function {
        return Err(TransportError::MalformedResponse(format!(
            "function echo 0x{:02X}, expected 0x{function:02X}",
            reply[0]
        )));
    }
    Ok(reply[1..DATAGRAM_REPLY_SIZE]
        .chunks_exact(2)
        .take(count as usize)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect())
}

/// UDP 数据报通道
#[derive(Debug)]
pub struct DatagramChannel<D> {
    bus: D,
}

impl<D: DatagramBus> DatagramChannel<D> {
    pub fn new(bus: D) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &D {
        &self.bus
    }
}

impl<D: DatagramBus> Channel for DatagramChannel<D> {
    fn open(&mut self) -> Result<(), TransportError> {
        self.bus.open()
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.bus.close()
    }

    fn transmit(&mut self, message: &RegisterWrite) -> Result<(), TransportError> {
        let count = u16::try_from(message.values.len())
            .map_err(|_| TransportError::InvalidInput("message too long".to_string()))?;
        let request = encode_request(
            message.kind.function_code(),
            message.start,
            count,
            &message.values,
        );
        trace!(bytes = request.len(), start = message.start, "datagram write");
        self.bus.send(&request)
    }

    fn fetch(&mut self, start: u16, count: u16) -> Result<Vec<u16>, TransportError> {
        if count > DATAGRAM_MAX_READ {
            return Err(TransportError::InvalidInput(format!(
                "datagram read of {count} registers exceeds {DATAGRAM_MAX_READ}"
            )));
        }
        self.bus.send(&encode_request(FUNCTION_READ, start, count, &[]))?;
        match self.bus.receive(DATAGRAM_REPLY_SIZE)? {
            Some(reply) => decode_reply(FUNCTION_READ, &reply, count),
            None => Err(TransportError::NoResponse),
        }
    }
}
