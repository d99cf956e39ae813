//! Protocol engine integration tests
//!
//! Drives the connection engine over a scripted in-memory channel standing
//! in for the serial port.

use pretty_assertions::assert_eq;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use zaberlink_core::protocol::{
    Channel, Connection, ConnectionConfig, ConnectionState, DeviceStatus, ProtocolError,
};

/// Shared state behind the mock channel
#[derive(Default)]
struct MockState {
    /// Everything the engine wrote
    sent: Vec<u8>,
    /// Queued reply buffers, consumed front to back; an empty buffer
    /// scripts a timeout
    replies: Vec<Vec<u8>>,
    fail_write: bool,
    fail_read: bool,
    /// Number of times the channel factory was invoked
    opens: usize,
}

struct MockChannel {
    state: Arc<Mutex<MockState>>,
}

impl Read for MockChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut st = self.state.lock().unwrap();
        if st.fail_read {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"));
        }
        if st.replies.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "read timed out"));
        }
        if st.replies[0].is_empty() {
            st.replies.remove(0);
            return Err(io::Error::new(io::ErrorKind::TimedOut, "read timed out"));
        }
        let n = st.replies[0].len().min(buf.len());
        buf[..n].copy_from_slice(&st.replies[0][..n]);
        st.replies[0].drain(..n);
        if st.replies[0].is_empty() {
            st.replies.remove(0);
        }
        Ok(n)
    }
}

impl Write for MockChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut st = self.state.lock().unwrap();
        if st.fail_write {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "write failed"));
        }
        st.sent.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Channel for MockChannel {
    fn set_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
        Ok(())
    }

    fn clear_input_buffer(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn mock_connection(state: Arc<Mutex<MockState>>) -> Connection {
    let opener_state = state;
    Connection::with_opener(ConnectionConfig::new("mock"), move |_config| {
        let mut st = opener_state.lock().unwrap();
        st.opens += 1;
        drop(st);
        Ok(Box::new(MockChannel {
            state: opener_state.clone(),
        }) as Box<dyn Channel>)
    })
}

fn queue_reply(state: &Arc<Mutex<MockState>>, motor_id: u8, command: u8, data: i32) {
    let mut bytes = vec![motor_id, command];
    bytes.extend_from_slice(&data.to_le_bytes());
    state.lock().unwrap().replies.push(bytes);
}

#[test]
fn test_move_absolute_wire_exchange() {
    let state = Arc::new(Mutex::new(MockState::default()));
    let mut conn = mock_connection(state.clone());
    conn.connect().unwrap();

    queue_reply(&state, 0, 20, 100_000);
    let pos = conn.move_absolute(100_000.0, 0).unwrap();

    assert_eq!(pos, Some(100_000));
    assert_eq!(
        state.lock().unwrap().sent,
        vec![0x00, 0x14, 0xA0, 0x86, 0x01, 0x00]
    );
}

#[test]
fn test_fractional_position_is_truncated() {
    let state = Arc::new(Mutex::new(MockState::default()));
    let mut conn = mock_connection(state.clone());
    conn.connect().unwrap();

    queue_reply(&state, 1, 21, -42);
    let pos = conn.move_relative(-42.9, 1).unwrap();

    assert_eq!(pos, Some(-42));
    // data word holds -42, truncated toward zero
    let sent = state.lock().unwrap().sent.clone();
    assert_eq!(&sent[..2], &[1, 21]);
    assert_eq!(i32::from_le_bytes([sent[2], sent[3], sent[4], sent[5]]), -42);
}

#[test]
fn test_get_status_idle() {
    let state = Arc::new(Mutex::new(MockState::default()));
    let mut conn = mock_connection(state.clone());
    conn.connect().unwrap();

    queue_reply(&state, 0, 54, 0);
    let status = conn.status(0).unwrap().unwrap();

    assert_eq!(status, DeviceStatus::Idle);
    assert_eq!((status.code(), status.label()), (0, "idle"));
}

#[test]
fn test_get_status_unrecognized_reads_single_frame() {
    let state = Arc::new(Mutex::new(MockState::default()));
    let mut conn = mock_connection(state.clone());
    conn.connect().unwrap();

    queue_reply(&state, 0, 54, 77);
    let status = conn.status(0).unwrap().unwrap();

    assert_eq!(status, DeviceStatus::Unrecognized(77));
    // Exactly one request went out and no extra reply was consumed
    assert_eq!(state.lock().unwrap().sent.len(), 6);
    assert!(state.lock().unwrap().replies.is_empty());
}

#[test]
fn test_query_setting_sends_meta_command() {
    let state = Arc::new(Mutex::new(MockState::default()));
    let mut conn = mock_connection(state.clone());
    conn.connect().unwrap();

    queue_reply(&state, 0, 53, 294);
    let speed = conn.target_speed(0).unwrap();

    assert_eq!(speed, Some(294));
    // Request: command 53, data selects setting 42
    let sent = state.lock().unwrap().sent.clone();
    assert_eq!(&sent[..2], &[0, 53]);
    assert_eq!(i32::from_le_bytes([sent[2], sent[3], sent[4], sent[5]]), 42);
}

#[test]
fn test_timeout_returns_none() {
    let state = Arc::new(Mutex::new(MockState::default()));
    let mut conn = mock_connection(state.clone());
    conn.connect().unwrap();

    // No reply queued: the read times out with zero bytes
    let pos = conn.position(0).unwrap();
    assert_eq!(pos, None);
    assert_eq!(conn.state(), ConnectionState::Connected);
}

#[test]
fn test_partial_reply_is_malformed() {
    let state = Arc::new(Mutex::new(MockState::default()));
    let mut conn = mock_connection(state.clone());
    conn.connect().unwrap();

    state.lock().unwrap().replies.push(vec![0x00, 0x3C, 0xFF]);
    match conn.position(0) {
        Err(ProtocolError::MalformedReply { len }) => assert_eq!(len, 3),
        other => panic!("expected MalformedReply, got {:?}", other),
    }
}

#[test]
fn test_controller_fault_known_code() {
    let state = Arc::new(Mutex::new(MockState::default()));
    let mut conn = mock_connection(state.clone());
    conn.connect().unwrap();

    // Reply command 255, data = error code 20 (absolute position invalid)
    queue_reply(&state, 0, 255, 20);
    match conn.move_absolute(1e9, 0) {
        Err(ProtocolError::ControllerFault {
            code,
            name,
            description,
        }) => {
            assert_eq!(code, 20);
            assert_eq!(name, "absolute position invalid");
            assert!(!description.is_empty());
        }
        other => panic!("expected ControllerFault, got {:?}", other),
    }
}

#[test]
fn test_controller_fault_unknown_code() {
    let state = Arc::new(Mutex::new(MockState::default()));
    let mut conn = mock_connection(state.clone());
    conn.connect().unwrap();

    queue_reply(&state, 0, 255, 12345);
    match conn.home(0) {
        Err(ProtocolError::ControllerFault { code, name, description }) => {
            assert_eq!(code, 12345);
            assert_eq!(name, "unknown");
            assert!(description.contains("12345"));
        }
        other => panic!("expected ControllerFault, got {:?}", other),
    }
}

#[test]
fn test_lazy_reconnect_on_send() {
    let state = Arc::new(Mutex::new(MockState::default()));
    let mut conn = mock_connection(state.clone());

    // Never connected explicitly: the first command opens the channel
    queue_reply(&state, 0, 50, 6210);
    let id = conn.device_id(0).unwrap();
    assert_eq!(id, Some(6210));
    assert_eq!(state.lock().unwrap().opens, 1);
    assert_eq!(conn.state(), ConnectionState::Connected);

    // After an explicit close, the next command reconnects again
    conn.close();
    queue_reply(&state, 0, 51, 299);
    let fw = conn.firmware_version(0).unwrap();
    assert_eq!(fw, Some(299));
    assert_eq!(state.lock().unwrap().opens, 2);
}

#[test]
fn test_write_failure_surfaces_and_disconnects() {
    let state = Arc::new(Mutex::new(MockState::default()));
    let mut conn = mock_connection(state.clone());
    conn.connect().unwrap();

    state.lock().unwrap().fail_write = true;
    match conn.position(0) {
        Err(ProtocolError::Transport(_)) => {}
        other => panic!("expected Transport error, got {:?}", other),
    }
    assert_eq!(conn.state(), ConnectionState::Disconnected);
}

#[test]
fn test_read_failure_surfaces_and_disconnects() {
    let state = Arc::new(Mutex::new(MockState::default()));
    let mut conn = mock_connection(state.clone());
    conn.connect().unwrap();

    state.lock().unwrap().fail_read = true;
    match conn.position(0) {
        Err(ProtocolError::Transport(_)) => {}
        other => panic!("expected Transport error, got {:?}", other),
    }
    assert_eq!(conn.state(), ConnectionState::Disconnected);
}

#[test]
fn test_running_current_lossy_roundtrip() {
    let state = Arc::new(Mutex::new(MockState::default()));
    let mut conn = mock_connection(state.clone());
    conn.connect().unwrap();

    // Below the representable minimum: encodes to 0 on the wire, reads
    // back as 0.0, not the requested value
    queue_reply(&state, 0, 38, 0);
    let applied = conn.set_running_current(0.05, 0).unwrap();
    assert_eq!(applied, Some(0.0));
    let sent = state.lock().unwrap().sent.clone();
    assert_eq!(i32::from_le_bytes([sent[2], sent[3], sent[4], sent[5]]), 0);

    // 2.5 A encodes to code 4 = trunc(10 / 2.5) and round-trips exactly
    queue_reply(&state, 0, 38, 4);
    let applied = conn.set_running_current(2.5, 0).unwrap();
    assert_eq!(applied, Some(2.5));
}

#[test]
fn test_hold_current_query_decodes() {
    let state = Arc::new(Mutex::new(MockState::default()));
    let mut conn = mock_connection(state.clone());
    conn.connect().unwrap();

    queue_reply(&state, 0, 53, 5);
    let amps = conn.hold_current(0).unwrap();
    assert_eq!(amps, Some(2.0));
}

#[test]
fn test_reset_discards_reply_value() {
    let state = Arc::new(Mutex::new(MockState::default()));
    let mut conn = mock_connection(state.clone());
    conn.connect().unwrap();

    queue_reply(&state, 0, 0, 0);
    conn.reset(0).unwrap();
    // A reset with no reply at all is also fine
    conn.reset(0).unwrap();
}

#[test]
fn test_stop_reports_final_position() {
    let state = Arc::new(Mutex::new(MockState::default()));
    let mut conn = mock_connection(state.clone());
    conn.connect().unwrap();

    queue_reply(&state, 0, 23, 4321);
    assert_eq!(conn.stop(0).unwrap(), Some(4321));
}

#[test]
fn test_reply_delivered_across_split_reads() {
    let state = Arc::new(Mutex::new(MockState::default()));
    let mut conn = mock_connection(state.clone());
    conn.connect().unwrap();

    // The serial layer may deliver a frame in pieces; the engine keeps
    // reading until a full frame or a timeout
    {
        let mut st = state.lock().unwrap();
        st.replies.push(vec![0x00, 0x3C]);
        st.replies.push(vec![0x10, 0x27, 0x00, 0x00]);
    }
    assert_eq!(conn.position(0).unwrap(), Some(10_000));
}
