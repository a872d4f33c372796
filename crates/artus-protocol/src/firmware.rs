//! 固件镜像分页
//!
//! 镜像按 256 字节分页，末页用 0xFF 填充。每页拆成两次 128 字节突发，
//! 每次突发为 64 个大端字，首字为固件数据操作码。

use crate::constants::*;
use crate::control::{MessageKind, RegisterWrite};
use crate::ProtocolError;

/// 固件镜像（只读字节序列）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareImage {
    bytes: Vec<u8>,
}

impl FirmwareImage {
    /// 从字节构造，空镜像返回错误
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, ProtocolError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(ProtocolError::InvalidInput("firmware image is empty".to_string()));
        }
        Ok(Self { bytes })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// 总页数 `ceil(len / 256)`
    pub fn total_pages(&self) -> usize {
        self.bytes.len().div_ceil(FIRMWARE_PAGE_SIZE)
    }

    /// 第 `index` 页（从 0 开始），越界返回 `None`
    pub fn page(&self, index: usize) -> Option<FirmwarePage> {
        let start = index.checked_mul(FIRMWARE_PAGE_SIZE)?;
        if start >= self.bytes.len() {
            return None;
        }
        let end = (start + FIRMWARE_PAGE_SIZE).min(self.bytes.len());
        let mut data = [FIRMWARE_PAD_BYTE; FIRMWARE_PAGE_SIZE];
        data[..end - start].copy_from_slice(&self.bytes[start..end]);
        Some(FirmwarePage { index, data })
    }

    pub fn pages(&self) -> impl Iterator<Item = FirmwarePage> + '_ {
        (0..self.total_pages()).filter_map(|i| self.page(i))
    }
}

/// 一页固件数据（已填充到 256 字节）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwarePage {
    pub index: usize,
    pub data: [u8; FIRMWARE_PAGE_SIZE],
}

impl FirmwarePage {
    /// 页内 128 个大端字
    pub fn words(&self) -> Vec<u16> {
        self.data
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect()
    }

    /// 拆分为两次突发写
    pub fn bursts(&self) -> Vec<RegisterWrite> {
        self.words()
            .chunks(FIRMWARE_WORDS_PER_BURST)
            .map(|chunk| RegisterWrite::new(MessageKind::Firmware, FIRMWARE_DATA_OPCODE, chunk.to_vec()))
            .collect()
    }
}

/// 镜像结束标记：扁平表示为 `[0, 0]`
pub fn end_of_image() -> RegisterWrite {
    RegisterWrite::new(MessageKind::Firmware, 0, vec![0])
}
