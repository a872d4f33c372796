//! 端到端场景测试：编码、解码、固件分页

mod common;

use artus_sdk::prelude::*;
use artus_sdk::protocol::{
    FeedbackRequest, FirmwareImage, ProtocolRevision, RegisterMap, RegisterName, decode_feedback,
    pack_byte_pair,
};
use artus_sdk::transport::SimulatedBus;
use common::{connected_hand, test_config};

/// 16 关节手回零：一条位置消息，8 个全零打包字
#[test]
fn test_lite_home_position_block() {
    let bus = SimulatedBus::new(ProtocolRevision::Expanded).with_auto_wake();
    let mut hand = connected_hand(
        test_config(HandProduct::ArtusLite, HandSide::Right, ProtocolRevision::Expanded),
        &bus,
    );

    hand.set_home_position().unwrap();

    let map = RegisterMap::new(ProtocolRevision::Expanded);
    let base = map.get(RegisterName::TargetPosition).unwrap().address;
    let writes = bus.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].start, base);
    assert_eq!(writes[0].values.len(), 8);
    for (k, &word) in writes[0].values.iter().enumerate() {
        let joints = hand.hand().joints();
        let expected = pack_byte_pair(
            joints[2 * k].target_angle as i8,
            joints[2 * k + 1].target_angle as i8,
        );
        assert_eq!(word, expected);
        assert_eq!(word, 0);
    }
}

/// 字节对解码：`[0x1234, 0x5678]` → `[0x12, 0x34, 0x56, 0x78]`
#[test]
fn test_byte_pair_feedback_decode() {
    let request = FeedbackRequest {
        kind: FeedbackKind::Temperature,
        start: 400,
        count: 2,
        joint_count: 4,
        sensor_count: 0,
    };
    let decoded = decode_feedback(&request, &[0x1234, 0x5678]).unwrap();
    assert_eq!(
        decoded.values,
        FeedbackValues::Temperatures(vec![0x12, 0x34, 0x56, 0x78])
    );
}

/// 300 字节镜像：两页，第二页以 0xFF 补齐
#[test]
fn test_firmware_paging_three_hundred_bytes() {
    let bytes: Vec<u8> = (0..300u32).map(|i| (i % 251) as u8).collect();
    let image = FirmwareImage::from_bytes(bytes.clone()).unwrap();
    assert_eq!(image.total_pages(), 2);

    let first = image.page(0).unwrap();
    assert_eq!(&first.data[..], &bytes[..256]);

    let second = image.page(1).unwrap();
    assert_eq!(&second.data[..44], &bytes[256..]);
    assert!(second.data[44..].iter().all(|&b| b == 0xFF));
    assert!(image.page(2).is_none());
}

/// 越界角度限位到关节范围后再编码
#[test]
fn test_out_of_range_targets_are_clamped_before_encoding() {
    let bus = SimulatedBus::new(ProtocolRevision::Expanded).with_auto_wake();
    let mut hand = connected_hand(
        test_config(HandProduct::ArtusTalos, HandSide::Right, ProtocolRevision::Expanded),
        &bus,
    );

    hand.set_joint_angles([
        ("thumb_spread", JointTargetUpdate::angle(80.0)),
        ("index_flex", JointTargetUpdate::angle(-20.0)),
        ("no_such_joint", JointTargetUpdate::angle(10.0)),
    ])
    .unwrap();

    let thumb = hand.hand().joint("thumb_spread").unwrap();
    assert_eq!(thumb.target_angle, thumb.max_angle);
    let index = hand.hand().joint("index_flex").unwrap();
    assert_eq!(index.target_angle, index.min_angle);

    let writes = bus.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].values[0], pack_byte_pair(35, 0));
    assert_eq!(writes[0].values[1], pack_byte_pair(0, 0));
}

/// legacy 布局：位置与力矩合并为一条消息
#[test]
fn test_legacy_combines_position_and_torque() {
    let bus = SimulatedBus::new(ProtocolRevision::Legacy).with_auto_wake();
    let mut hand = connected_hand(
        test_config(HandProduct::ArtusScorpion, HandSide::Right, ProtocolRevision::Legacy),
        &bus,
    );

    hand.set_joint_angles([(
        "gripper_joint",
        JointTargetUpdate::angle(12.0).with_effort(1.25),
    )])
    .unwrap();

    let writes = bus.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].start, 1);
    // 1 个位置字 + 2 个浮点字
    assert_eq!(writes[0].values.len(), 3);
    assert_eq!(writes[0].values[0] >> 8, 12);
}

/// legacy 布局的位置+力矩联合反馈
#[test]
fn test_legacy_position_torque_feedback() {
    let bus = SimulatedBus::new(ProtocolRevision::Legacy).with_auto_wake();
    let mut hand = connected_hand(
        test_config(HandProduct::ArtusScorpion, HandSide::Right, ProtocolRevision::Legacy),
        &bus,
    );
    let torque = 2.5f32.to_bits();
    bus.set_registers(
        100,
        &[
            ActuatorState::Active.code() as u16,
            pack_byte_pair(7, 0),
            (torque >> 16) as u16,
            torque as u16,
        ],
    );

    let decoded = hand.get_feedback(FeedbackKind::PositionTorque).unwrap();
    assert_eq!(
        decoded.values,
        FeedbackValues::AnglesAndTorques {
            angles: vec![7],
            torques: vec![2.5],
        }
    );
    let joint = &hand.hand().joints()[0];
    assert_eq!(joint.feedback_angle, 7.0);
    assert_eq!(joint.feedback_effort, 2.5);
}

/// 力传感器反馈按静态序号表分配到各指尖
#[test]
fn test_force_sensor_feedback_demux() {
    let bus = SimulatedBus::new(ProtocolRevision::Expanded).with_auto_wake();
    let mut hand = connected_hand(
        test_config(HandProduct::ArtusTalos, HandSide::Left, ProtocolRevision::Expanded),
        &bus,
    );
    let mut words = Vec::new();
    for i in 0..15 {
        let bits = (i as f32 * 0.5).to_bits();
        words.push((bits >> 16) as u16);
        words.push(bits as u16);
    }
    bus.set_registers(650, &words);

    hand.get_feedback(FeedbackKind::ForceSensor).unwrap();
    let sensors = hand.hand().sensors();
    assert_eq!(sensors.len(), 5);
    assert_eq!(sensors[1].name, "index");
    assert_eq!((sensors[1].x, sensors[1].y, sensors[1].z), (1.5, 2.0, 2.5));
    assert_eq!(sensors[4].z, 7.0);
}

/// 力矩块起始地址随首个关节序号偏移（每关节两个字）
#[test]
fn test_effort_block_offset_by_first_index() {
    use artus_sdk::protocol::{CommandEncoder, JointCommand, words_to_f32};

    let map = RegisterMap::new(ProtocolRevision::Expanded);
    let joints: Vec<JointCommand> = (3..7)
        .map(|index| JointCommand {
            index,
            angle: Some(10.0),
            effort: Some(1.25),
        })
        .collect();

    let encoded = CommandEncoder::new(&map).encode(&joints).unwrap();
    assert_eq!(encoded.messages.len(), 2);

    let position = &encoded.messages[0];
    let position_base = map.get(RegisterName::TargetPosition).unwrap().address;
    assert_eq!(position.start, position_base + 1);
    assert_eq!(
        position.values,
        vec![pack_byte_pair(0, 10), pack_byte_pair(10, 10), pack_byte_pair(10, 0)]
    );

    let effort = &encoded.messages[1];
    let effort_base = map.target_effort().unwrap().address;
    assert_eq!(effort.start, effort_base + 3 * 2);
    assert_eq!(effort.values.len(), 8);
    for pair in effort.values.chunks_exact(2) {
        assert_eq!(words_to_f32(pair[0], pair[1]), 1.25);
    }
}

/// 截断多寄存器读取的通道，用于模拟长度异常的反馈
struct TruncatingChannel<C>(C);

impl<C: Channel> Channel for TruncatingChannel<C> {
    fn open(&mut self) -> Result<(), TransportError> {
        self.0.open()
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.0.close()
    }

    fn transmit(&mut self, message: &artus_sdk::protocol::RegisterWrite) -> Result<(), TransportError> {
        self.0.transmit(message)
    }

    fn fetch(&mut self, start: u16, count: u16) -> Result<Vec<u16>, TransportError> {
        let mut words = self.0.fetch(start, count)?;
        if count > 1 {
            words.pop();
        }
        Ok(words)
    }
}

/// 反馈字数不符时报错，手部模型保持不变
#[test]
fn test_feedback_length_mismatch_leaves_hand_untouched() {
    use artus_sdk::transport::RegisterChannel;

    let bus = SimulatedBus::new(ProtocolRevision::Expanded).with_auto_wake();
    let config = test_config(HandProduct::ArtusTalos, HandSide::Left, ProtocolRevision::Expanded);
    let mut hand = Artus::new(
        config,
        TruncatingChannel(RegisterChannel::new(bus.clone())),
        tracing::Span::none(),
    )
    .unwrap();
    hand.connect().unwrap();
    bus.set_registers(
        200,
        &[
            ActuatorState::Active.code() as u16,
            pack_byte_pair(10, 20),
            pack_byte_pair(30, 40),
            pack_byte_pair(50, 60),
        ],
    );
    let before = hand.hand().joints().to_vec();

    let err = hand.get_feedback(FeedbackKind::Position).unwrap_err();
    assert!(matches!(
        err,
        DriverError::Protocol(ProtocolError::UnrecognizedFeedbackLength {
            words: 3,
            expected: 4
        })
    ));
    assert_eq!(hand.hand().joints(), before.as_slice());
    assert_eq!(hand.state().observed(), ActuatorState::Ready);
}
