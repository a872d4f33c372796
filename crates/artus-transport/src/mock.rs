//! 模拟寄存器总线
//!
//! 1024 个寄存器的内存寄存器文件，记录全部写操作，支持：
//! - 预置状态序列（每次读状态寄存器弹出一个状态码，最后一个保持）
//! - 注入瞬时故障（接下来 N 次操作返回 `NoResponse`）
//! - 注入打开失败（通道故障）
//! - 固件升级应答（擦除完成和每页两次突发后置 `FlashingAck`）
//!
//! 句柄可克隆，测试在会话持有总线时仍可检查内部状态。

use crate::{ChannelFault, ChannelFaultKind, RegisterBus, TransportError};
use artus_protocol::{
    ActuatorState, FIRMWARE_BURSTS_PER_PAGE, FIRMWARE_DATA_OPCODE, OPCODE_FIRMWARE_UPDATE,
    OPCODE_START, ProtocolRevision, RegisterMap, RegisterName,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// 寄存器文件大小
pub const SIMULATED_REGISTERS: usize = 1024;

/// 一次被记录的写操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    pub start: u16,
    pub values: Vec<u16>,
    /// 是否为单寄存器写
    pub single: bool,
}

#[derive(Debug)]
struct SimState {
    registers: Vec<u16>,
    writes: Vec<RecordedWrite>,
    status_script: VecDeque<u8>,
    pending_failures: u32,
    open_failure: Option<ChannelFault>,
    is_open: bool,
    reads: u64,
    auto_wake: bool,
    firmware_acks: bool,
    flashing: bool,
    bursts: usize,
}

/// 模拟总线句柄
#[derive(Debug, Clone)]
pub struct SimulatedBus {
    state: Arc<Mutex<SimState>>,
    command_address: u16,
    status_address: u16,
}

impl SimulatedBus {
    /// 按协议版本创建（决定命令/状态寄存器地址）
    pub fn new(revision: ProtocolRevision) -> Self {
        let map = RegisterMap::new(revision);
        let address = |name| map.get(name).map(|e| e.address).unwrap_or_default();
        Self {
            state: Arc::new(Mutex::new(SimState {
                registers: vec![0; SIMULATED_REGISTERS],
                writes: Vec::new(),
                status_script: VecDeque::new(),
                pending_failures: 0,
                open_failure: None,
                is_open: false,
                reads: 0,
                auto_wake: false,
                firmware_acks: false,
                flashing: false,
                bursts: 0,
            })),
            command_address: address(RegisterName::Command),
            status_address: address(RegisterName::Feedback),
        }
    }

    /// 收到唤醒指令后状态置为 `Ready`
    pub fn with_auto_wake(self) -> Self {
        self.state.lock().auto_wake = true;
        self
    }

    /// 模拟固件升级的擦除/页确认
    pub fn with_firmware_acks(self) -> Self {
        self.state.lock().firmware_acks = true;
        self
    }

    /// 追加预置状态序列
    pub fn script_status(&self, states: impl IntoIterator<Item = ActuatorState>) {
        self.state
            .lock()
            .status_script
            .extend(states.into_iter().map(ActuatorState::code));
    }

    /// 直接设置状态寄存器
    pub fn set_status(&self, state: ActuatorState) {
        let address = self.status_address as usize;
        self.state.lock().registers[address] = state.code() as u16;
    }

    /// 接下来 `count` 次操作返回 `NoResponse`
    pub fn inject_failures(&self, count: u32) {
        self.state.lock().pending_failures = count;
    }

    /// 下一次打开返回通道故障
    pub fn fail_open(&self, kind: ChannelFaultKind) {
        self.state.lock().open_failure =
            Some(ChannelFault::new(kind, "simulated port unavailable"));
    }

    pub fn set_registers(&self, start: u16, values: &[u16]) {
        let mut state = self.state.lock();
        let start = start as usize;
        state.registers[start..start + values.len()].copy_from_slice(values);
    }

    pub fn register(&self, address: u16) -> u16 {
        self.state.lock().registers[address as usize]
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.state.lock().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state.lock().writes.clear();
    }

    pub fn read_count(&self) -> u64 {
        self.state.lock().reads
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().is_open
    }

    fn check_ready(state: &mut SimState) -> Result<(), TransportError> {
        if !state.is_open {
            return Err(ChannelFault::closed().into());
        }
        if state.pending_failures > 0 {
            state.pending_failures -= 1;
            return Err(TransportError::NoResponse);
        }
        Ok(())
    }

    fn set_state(&self, state: &mut SimState, actuator: ActuatorState) {
        state.registers[self.status_address as usize] = actuator.code() as u16;
    }

    fn on_write(&self, state: &mut SimState, start: u16, values: &[u16], single: bool) {
        if single && start == self.command_address {
            let opcode = (values[0] >> 8) as u8;
            if state.auto_wake && opcode == OPCODE_START {
                self.set_state(state, ActuatorState::Ready);
            }
            if state.firmware_acks && opcode == OPCODE_FIRMWARE_UPDATE {
                state.flashing = true;
                state.bursts = 0;
                self.set_state(state, ActuatorState::FlashingAck);
            }
            return;
        }

        if !(state.firmware_acks && state.flashing) {
            return;
        }
        if start == FIRMWARE_DATA_OPCODE {
            state.bursts += 1;
            let acked = if state.bursts % FIRMWARE_BURSTS_PER_PAGE == 0 {
                ActuatorState::FlashingAck
            } else {
                ActuatorState::Flashing
            };
            self.set_state(state, acked);
        } else if start == 0 && values.iter().all(|&v| v == 0) {
            state.flashing = false;
            self.set_state(state, ActuatorState::Ready);
        }
    }
}

impl RegisterBus for SimulatedBus {
    fn open(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if let Some(fault) = state.open_failure.take() {
            return Err(fault.into());
        }
        state.is_open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.state.lock().is_open = false;
        Ok(())
    }

    fn write_single_register(&mut self, address: u16, value: u16) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        Self::check_ready(&mut state)?;
        if address as usize >= SIMULATED_REGISTERS {
            return Err(TransportError::MalformedResponse(format!(
                "illegal address {address}"
            )));
        }
        state.registers[address as usize] = value;
        state.writes.push(RecordedWrite {
            start: address,
            values: vec![value],
            single: true,
        });
        self.on_write(&mut state, address, &[value], true);
        Ok(())
    }

    fn write_multiple_registers(
        &mut self,
        start: u16,
        values: &[u16],
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        Self::check_ready(&mut state)?;
        let begin = start as usize;
        let end = begin + values.len();
        if end > SIMULATED_REGISTERS {
            return Err(TransportError::MalformedResponse(format!(
                "illegal range {begin}..{end}"
            )));
        }
        let firmware = state.firmware_acks && state.flashing;
        // 固件突发的首字是操作码而非真实地址，不落入寄存器文件
        if !firmware {
            state.registers[begin..end].copy_from_slice(values);
        }
        state.writes.push(RecordedWrite {
            start,
            values: values.to_vec(),
            single: false,
        });
        self.on_write(&mut state, start, values, false);
        Ok(())
    }

    fn read_registers(&mut self, start: u16, count: u16) -> Result<Vec<u16>, TransportError> {
        let mut state = self.state.lock();
        Self::check_ready(&mut state)?;
        let begin = start as usize;
        let end = begin + count as usize;
        if end > SIMULATED_REGISTERS {
            return Err(TransportError::MalformedResponse(format!(
                "illegal range {begin}..{end}"
            )));
        }
        state.reads += 1;
        if (begin..end).contains(&(self.status_address as usize)) {
            if let Some(code) = state.status_script.pop_front() {
                state.registers[self.status_address as usize] = code as u16;
            }
        }
        Ok(state.registers[begin..end].to_vec())
    }
}
