//! 数据报通道经会话层的读写：请求编码、读取上限、短应答重试

use std::collections::VecDeque;
use std::time::Duration;

use artus_sdk::prelude::*;
use artus_sdk::protocol::{MessageKind, RegisterWrite};
use artus_sdk::transport::channel::{DATAGRAM_MAX_READ, DATAGRAM_REPLY_SIZE, FUNCTION_READ};
use artus_sdk::transport::{DatagramBus, DatagramChannel, RetryPolicy, TransportSession};

/// 按脚本返回应答的数据报总线
#[derive(Default)]
struct ScriptedDatagrams {
    sent: Vec<Vec<u8>>,
    replies: VecDeque<Option<Vec<u8>>>,
    opened: bool,
}

impl DatagramBus for ScriptedDatagrams {
    fn open(&mut self) -> Result<(), TransportError> {
        self.opened = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.opened = false;
        Ok(())
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.sent.push(bytes.to_vec());
        Ok(())
    }

    fn receive(&mut self, _expected_size: usize) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.replies.pop_front().flatten())
    }
}

fn reply(words: &[u16]) -> Vec<u8> {
    let mut bytes = vec![0u8; DATAGRAM_REPLY_SIZE];
    bytes[0] = FUNCTION_READ;
    for (k, word) in words.iter().enumerate() {
        bytes[1 + 2 * k..3 + 2 * k].copy_from_slice(&word.to_be_bytes());
    }
    bytes
}

fn session(
    replies: impl IntoIterator<Item = Option<Vec<u8>>>,
) -> TransportSession<DatagramChannel<ScriptedDatagrams>> {
    let bus = ScriptedDatagrams {
        replies: replies.into_iter().collect(),
        ..ScriptedDatagrams::default()
    };
    let mut session = TransportSession::new(DatagramChannel::new(bus), Duration::ZERO).with_retry(
        RetryPolicy {
            max_attempts: 3,
            delay: Duration::ZERO,
        },
    );
    session.open().unwrap();
    session
}

#[test]
fn test_read_request_and_reply_words() {
    let mut session = session([Some(reply(&[0x0007, 0x0A14, 0xF6EC]))]);

    let words = session.receive(200, 3).unwrap();

    assert_eq!(words, vec![0x0007, 0x0A14, 0xF6EC]);
    let bus = session.channel().bus();
    assert!(bus.opened);
    assert_eq!(bus.sent, vec![vec![FUNCTION_READ, 0x00, 0xC8, 0x00, 0x03]]);
}

#[test]
fn test_read_at_cap_accepted() {
    let full: Vec<u16> = (0..DATAGRAM_MAX_READ).collect();
    let mut session = session([Some(reply(&full))]);

    assert_eq!(session.receive(200, DATAGRAM_MAX_READ).unwrap(), full);
}

#[test]
fn test_read_over_cap_rejected_without_sending() {
    let mut session = session([]);

    let err = session.receive(200, DATAGRAM_MAX_READ + 1).unwrap_err();

    assert!(matches!(err, TransportError::InvalidInput(_)));
    assert!(session.channel().bus().sent.is_empty());
}

#[test]
fn test_short_reply_retried_then_exhausted() {
    let mut session = session([
        Some(vec![FUNCTION_READ; 10]),
        None,
        Some(vec![FUNCTION_READ; DATAGRAM_REPLY_SIZE - 1]),
    ]);

    let err = session.receive(200, 4).unwrap_err();

    match err {
        TransportError::Exhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last, TransportError::NoResponse));
        },
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(session.channel().bus().sent.len(), 3);
}

#[test]
fn test_short_reply_recovers_on_retry() {
    let mut session = session([Some(vec![FUNCTION_READ; 10]), Some(reply(&[0x0007]))]);

    assert_eq!(session.receive_register(200).unwrap(), 0x0007);
    assert_eq!(session.channel().bus().sent.len(), 2);
}

#[test]
fn test_target_write_encoded_with_function_code() {
    let mut session = session([]);
    let message = RegisterWrite::new(MessageKind::Target, 18, vec![0x0A14, 0x1E28]);

    session.send(&message).unwrap();

    assert_eq!(
        session.channel().bus().sent,
        vec![vec![
            MessageKind::Target.function_code(),
            0x00,
            0x12,
            0x00,
            0x02,
            0x0A,
            0x14,
            0x1E,
            0x28,
        ]]
    );
}
