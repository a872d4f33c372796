//! 时序测试：限速与状态等待
//!
//! 依赖墙钟时间，串行执行以减少调度干扰。

mod common;

use artus_sdk::prelude::*;
use artus_sdk::protocol::ProtocolRevision;
use artus_sdk::transport::SimulatedBus;
use common::{connected_hand, test_config};
use serial_test::serial;
use std::time::{Duration, Instant};

#[test]
#[serial]
fn test_command_frequency_is_enforced() {
    let bus = SimulatedBus::new(ProtocolRevision::Expanded).with_auto_wake();
    let config = HandConfig {
        frequency_hz: 50.0,
        ..test_config(HandProduct::ArtusLite, HandSide::Right, ProtocolRevision::Expanded)
    };
    let mut hand = connected_hand(config, &bus);
    let period = hand.session().min_period();
    assert_eq!(period, Duration::from_millis(20));

    let n = 6;
    let start = Instant::now();
    for i in 0..n {
        hand.set_joint_angles([("index_flex", JointTargetUpdate::angle(i as f32 * 10.0))])
            .unwrap();
    }
    let elapsed = start.elapsed();

    assert_eq!(bus.writes().len(), n);
    // n 次发送至少跨越 n-1 个周期
    assert!(
        elapsed >= period * (n as u32 - 1),
        "elapsed {elapsed:?} for {n} sends at {period:?}"
    );
}

#[test]
#[serial]
fn test_wait_for_state_returns_promptly() {
    let bus = SimulatedBus::new(ProtocolRevision::Expanded).with_auto_wake();
    let mut hand = connected_hand(
        test_config(HandProduct::ArtusTalos, HandSide::Left, ProtocolRevision::Expanded),
        &bus,
    );
    bus.script_status([
        ActuatorState::Busy,
        ActuatorState::Busy,
        ActuatorState::Active,
    ]);

    let timeout = Duration::from_millis(500);
    let poll = Duration::from_millis(5);
    let start = Instant::now();
    let state = hand
        .wait_for_state(&[ActuatorState::Active], timeout, poll)
        .unwrap();
    assert_eq!(state, ActuatorState::Active);
    assert!(start.elapsed() < timeout + poll);
}

#[test]
#[serial]
fn test_wait_for_state_never_hangs() {
    let bus = SimulatedBus::new(ProtocolRevision::Expanded).with_auto_wake();
    let mut hand = connected_hand(
        test_config(HandProduct::ArtusLite, HandSide::Right, ProtocolRevision::Expanded),
        &bus,
    );
    bus.set_status(ActuatorState::CalibratingStroke);

    let timeout = Duration::from_millis(60);
    let poll = Duration::from_millis(10);
    let start = Instant::now();
    let err = hand
        .wait_for_state(&[ActuatorState::Ready], timeout, poll)
        .unwrap_err();
    let elapsed = start.elapsed();

    assert!(matches!(
        err,
        DriverError::Timeout {
            last: Some(ActuatorState::CalibratingStroke),
            ..
        }
    ));
    assert!(elapsed >= timeout);
    assert!(elapsed < timeout + poll + Duration::from_millis(100));
    assert!(err.is_recoverable());
}

#[test]
#[serial]
fn test_transient_faults_are_retried_then_exhausted() {
    let bus = SimulatedBus::new(ProtocolRevision::Expanded).with_auto_wake();
    let mut hand = connected_hand(
        test_config(HandProduct::ArtusLite, HandSide::Right, ProtocolRevision::Expanded),
        &bus,
    );

    // 默认 3 次尝试：两次故障后成功
    bus.inject_failures(2);
    assert_eq!(hand.robot_status().unwrap(), ActuatorState::Ready);

    bus.inject_failures(10);
    let err = hand.robot_status().unwrap_err();
    assert!(matches!(
        err,
        DriverError::Transport(TransportError::Exhausted { attempts: 3, .. })
    ));
}
