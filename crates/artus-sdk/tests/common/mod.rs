//! 集成测试公共设施：基于模拟总线的手部实例

use artus_sdk::driver::{FirmwareConfig, WaitConfig};
use artus_sdk::prelude::*;
use artus_sdk::protocol::ProtocolRevision;
use artus_sdk::transport::SimulatedBus;

/// 测试配置：高频、短超时
#[allow(dead_code)]
pub fn test_config(product: HandProduct, side: HandSide, revision: ProtocolRevision) -> HandConfig {
    HandConfig {
        product,
        side,
        revision,
        frequency_hz: 1000.0,
        wait: WaitConfig {
            timeout_ms: 500,
            poll_interval_ms: 1,
        },
        firmware: FirmwareConfig {
            ack_timeout_ms: 200,
            poll_interval_ms: 1,
            settle_ms: 0,
        },
        ..HandConfig::default()
    }
}

/// 已连接并唤醒的手，连接期间的写记录已清空
#[allow(dead_code)]
pub fn connected_hand(config: HandConfig, bus: &SimulatedBus) -> Artus {
    let mut hand = ArtusBuilder::from_config(config)
        .register_bus(bus.clone())
        .build()
        .unwrap();
    hand.connect().unwrap();
    bus.clear_writes();
    hand
}
