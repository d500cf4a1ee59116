use crate::client::{AtClient, CommandError, MatchStatus};
use crate::commands::Command;
use crate::tests::mock::{MockTimer, MockTransport, MockWatchdog, MockedReply};
use embedded_io::ErrorKind;

type ClientType<const N: usize> = AtClient<MockTransport, MockTimer, MockWatchdog, 1_000, N>;

fn client<const N: usize>(transport: MockTransport) -> ClientType<N> {
    AtClient::new(transport, MockTimer::default(), MockWatchdog::idle(), 5_000)
}

#[test]
fn test_execute_strips_framing() {
    let mut transport = MockTransport::new();
    transport.add_ok("AT");

    let mut client: ClientType<64> = client(transport);
    let response = client.execute(&Command::sync()).unwrap();

    assert_eq!(Some("OK"), response.as_str());
    assert_eq!(&["AT".to_string()], client.transport.commands());
}

#[test]
fn test_execute_strips_only_one_terminator() {
    let mut transport = MockTransport::new();
    transport.add_reply(MockedReply::new(Some("AT+GSN"), b"\r\n\r\n869170031234567\r\n\r\nOK\r\n"));

    let mut client: ClientType<64> = client(transport);
    let response = client.execute(&Command::imei()).unwrap();

    assert_eq!(Some("\r\n869170031234567\r\n\r\nOK"), response.as_str());
}

#[test]
fn test_execute_failure_marker() {
    let mut transport = MockTransport::new();
    transport.add_error("AT+HTTPINIT");

    let mut client: ClientType<64> = client(transport);
    let result = client.execute(&Command::http_init()).unwrap_err();

    assert_eq!(CommandError::Rejected, result);
}

#[test]
fn test_execute_success_before_failure() {
    let mut transport = MockTransport::new();
    transport.add_reply(MockedReply::new(Some("AT"), b"\r\nOK\r\n\r\nERROR\r\n"));

    let mut client: ClientType<64> = client(transport);
    assert!(client.execute(&Command::sync()).is_ok());
}

#[test]
fn test_execute_timeout() {
    let mut transport = MockTransport::new();
    transport.add_reply(MockedReply::new(Some("AT"), b"\r\nO"));

    let mut client: ClientType<64> = client(transport);
    let result = client.execute(&Command::sync()).unwrap_err();

    assert_eq!(CommandError::Timeout, result);
}

#[test]
fn test_execute_timeout_respects_command_deadline() {
    let mut transport = MockTransport::new();
    transport.add_reply(MockedReply::silent("AT"));

    let mut client: ClientType<64> = client(transport);
    let result = client.execute(&Command::sync().timeout_ms(300)).unwrap_err();

    assert_eq!(CommandError::Timeout, result);
    assert!(client.timer.ticks() < 1_000);
}

#[test]
fn test_execute_drains_stale_bytes() {
    let mut transport = MockTransport::new();
    transport.push_rx(b"\r\nOK\r\n");
    transport.add_error("AT+CIICR");

    let mut client: ClientType<64> = client(transport);
    let result = client.execute(&Command::bring_up_wireless()).unwrap_err();

    assert_eq!(CommandError::Rejected, result);
}

#[test]
fn test_execute_bytes_trickling_in() {
    let mut transport = MockTransport::new().trickle();
    transport.add_reply(MockedReply::new(Some("AT+CIFSR"), b"\r\n10.0.0.5\r\n\r\nOK\r\n"));

    let mut client: ClientType<64> = client(transport);
    let response = client.execute(&Command::local_address()).unwrap();

    assert_eq!(Some("10.0.0.5\r\n\r\nOK"), response.as_str());
}

#[test]
fn test_execute_buffer_full() {
    let mut transport = MockTransport::new();
    transport.add_reply(MockedReply::new(Some("AT"), b"0123456789abcdefghij"));

    let mut client: ClientType<8> = client(transport);
    let result = client.execute(&Command::sync()).unwrap_err();

    assert_eq!(CommandError::BufferFull, result);
}

#[test]
fn test_receive_accepts_capacity_minus_one() {
    let mut transport = MockTransport::new();
    transport.push_rx(b"0123456789abcdefghij");

    let mut client: ClientType<8> = client(transport);
    let exchange = client.receive(1_000, Some("OK"), Some("ERROR")).unwrap();

    assert_eq!(MatchStatus::Full, exchange.status);
    assert_eq!(b"0123456", exchange.reply.as_slice());
    assert_eq!(13, client.transport.pending_rx());
}

#[test]
fn test_receive_without_markers_runs_to_deadline() {
    let mut transport = MockTransport::new();
    transport.push_rx(b"\r\nOK\r\n");

    let mut client: ClientType<64> = client(transport);
    let exchange = client.receive(200, None, None).unwrap();

    assert_eq!(MatchStatus::Unmatched, exchange.status);
    assert_eq!(b"\r\nOK\r\n", exchange.reply.as_slice());
    assert!(client.timer.ticks() >= 200);
}

#[test]
fn test_receive_exact() {
    let mut transport = MockTransport::new();
    transport.push_rx(b"hello world");

    let mut client: ClientType<64> = client(transport);
    let mut buffer = [0x0; 5];
    client.receive_exact(1_000, &mut buffer).unwrap();

    assert_eq!(b"hello", &buffer);
    assert_eq!(6, client.transport.pending_rx());
}

#[test]
fn test_receive_exact_ignores_markers() {
    let mut transport = MockTransport::new();
    transport.push_rx(b"OK\r\nERROR");

    let mut client: ClientType<64> = client(transport);
    let mut buffer = [0x0; 9];
    client.receive_exact(1_000, &mut buffer).unwrap();

    assert_eq!(b"OK\r\nERROR", &buffer);
}

#[test]
fn test_receive_exact_timeout() {
    let mut transport = MockTransport::new();
    transport.push_rx(b"abc");

    let mut client: ClientType<64> = client(transport);
    let mut buffer = [0x0; 5];

    assert_eq!(CommandError::Timeout, client.receive_exact(100, &mut buffer).unwrap_err());
}

#[test]
fn test_next_line_skips_framing_and_echo() {
    let mut transport = MockTransport::new();
    transport.push_rx(b"AT+CIFSR\r\r\n\r\n10.0.0.5\r\n");

    let mut client: ClientType<64> = client(transport);
    let line = client.next_line(1_000).unwrap();

    assert_eq!(Some("10.0.0.5"), line.as_str());
    assert_eq!(0, client.transport.pending_rx());
}

#[test]
fn test_read_line_returns_blank_lines() {
    let mut transport = MockTransport::new();
    transport.push_rx(b"\r\nCONNECT\r\n");

    let mut client: ClientType<64> = client(transport);

    assert!(client.read_line(1_000).unwrap().is_empty());
    assert_eq!(Some("CONNECT"), client.read_line(1_000).unwrap().as_str());
}

#[test]
fn test_next_line_timeout() {
    let mut transport = MockTransport::new();
    transport.push_rx(b"\r\n+HTTPACTION: 0,2");

    let mut client: ClientType<64> = client(transport);

    assert_eq!(CommandError::Timeout, client.next_line(500).unwrap_err());
}

#[test]
fn test_write_error() {
    let transport = MockTransport::new().write_error(ErrorKind::BrokenPipe);

    let mut client: ClientType<64> = client(transport);
    let result = client.execute(&Command::sync()).unwrap_err();

    assert_eq!(CommandError::Transport(ErrorKind::BrokenPipe), result);
}

#[test]
fn test_delay_feeds_watchdog() {
    let mut watchdog = MockWatchdog::new();
    watchdog.expect_feed().times(5_000).return_const(());

    let mut client: ClientType<64> = AtClient::new(MockTransport::new(), MockTimer::default(), watchdog, 5_000);
    client.delay_ms(5_000).unwrap();
}

#[test]
fn test_receive_feeds_watchdog() {
    let mut watchdog = MockWatchdog::new();
    watchdog.expect_feed().times(50..).return_const(());

    let mut client: ClientType<64> = AtClient::new(MockTransport::new(), MockTimer::default(), watchdog, 5_000);
    client.receive(100, Some("OK"), None).unwrap();
}
