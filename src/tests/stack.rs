use crate::client::CommandError;
use crate::state::SessionKind;
use crate::stack::StreamError;
use crate::tests::mock::{initialized_modem, MockTransport, MockedReply, ModemType};
use core::net::SocketAddr;
use core::str::FromStr;
use embedded_nal::{TcpClientStack, TcpError, TcpErrorKind};

const CONNECT: &str = "AT+CIPSTART=\"TCP\",\"10.0.0.1\",\"21\"";

fn registered_modem(transport: MockTransport) -> ModemType {
    let mut modem = initialized_modem(transport);
    modem.state.set_session(SessionKind::RawTcp);
    modem
}

fn connected_modem(transport: MockTransport) -> ModemType {
    let mut modem = registered_modem(transport);
    modem.state.set_context_open();
    modem
}

fn add_connect(transport: &mut MockTransport) {
    transport.add_reply(MockedReply::new(Some(CONNECT), b"\r\nOK\r\n\r\nCONNECT\r\n"));
}

fn add_stop(transport: &mut MockTransport) {
    transport.add_ok("AT");
    transport.add_reply(MockedReply::new(Some("AT+CIPCLOSE=0"), b"\r\nCLOSE OK\r\n"));
}

#[test]
fn test_connect() {
    let mut transport = MockTransport::new();
    add_connect(&mut transport);

    let mut modem = registered_modem(transport);
    modem.stream().connect("10.0.0.1", 21).unwrap();

    assert!(modem.stream().connected());
    modem.client.transport.assert_all_cmds_sent();
}

#[test]
fn test_connect_hostname() {
    let mut transport = MockTransport::new();
    transport.add_reply(MockedReply::new(
        Some("AT+CIPSTART=\"TCP\",\"example.org\",\"8080\""),
        b"\r\nOK\r\n\r\nCONNECT\r\n",
    ));

    let mut modem = registered_modem(transport);
    modem.stream().connect("example.org", 8080).unwrap();
    assert!(modem.stream().connected());
}

#[test]
fn test_connect_refused() {
    let mut transport = MockTransport::new();
    transport.add_reply(MockedReply::new(Some(CONNECT), b"\r\nOK\r\n\r\nCONNECT FAIL\r\n"));

    let mut modem = registered_modem(transport);
    let result = modem.stream().connect("10.0.0.1", 21).unwrap_err();

    assert_eq!(StreamError::ConnectFailed(CommandError::Rejected), result);
    assert!(!modem.stream().connected());
}

#[test]
fn test_connect_rejected() {
    let mut transport = MockTransport::new();
    transport.add_error(CONNECT);

    let mut modem = registered_modem(transport);
    let result = modem.stream().connect("10.0.0.1", 21).unwrap_err();

    assert_eq!(StreamError::ConnectFailed(CommandError::Rejected), result);
}

#[test]
fn test_connect_confirmation_timeout() {
    let mut transport = MockTransport::new();
    transport.add_ok(CONNECT);

    let mut modem = registered_modem(transport);
    let result = modem.stream().connect("10.0.0.1", 21).unwrap_err();

    assert_eq!(StreamError::ConnectFailed(CommandError::Timeout), result);
    assert!(modem.client.timer.ticks() >= 10_000);
}

#[test]
fn test_connect_without_ip_context() {
    let mut modem = initialized_modem(MockTransport::new());

    let result = modem.stream().connect("10.0.0.1", 21).unwrap_err();
    assert_eq!(StreamError::NotRegistered, result);
    assert!(modem.client.transport.commands().is_empty());
}

#[test]
fn test_connect_already_connected() {
    let mut modem = connected_modem(MockTransport::new());

    let result = modem.stream().connect("10.0.0.1", 21).unwrap_err();
    assert_eq!(StreamError::AlreadyConnected, result);
}

#[test]
fn test_write() {
    let mut modem = connected_modem(MockTransport::new());

    assert_eq!(6, modem.stream().write(b"hallo!").unwrap());
    modem.stream().write_byte(b'\n').unwrap();
    modem.stream().flush().unwrap();

    assert_eq!(b"hallo!\n", modem.client.transport.data());
}

#[test]
fn test_read() {
    let mut transport = MockTransport::new();
    transport.push_rx(b"nice to see you!");

    let mut modem = connected_modem(transport);
    assert!(modem.stream().available().unwrap());
    assert_eq!(Some(b'n'), modem.stream().read_byte().unwrap());

    let mut buffer = [0x0; 64];
    let length = modem.stream().read(&mut buffer).unwrap();

    assert_eq!(b"ice to see you!", &buffer[..length]);
    assert!(!modem.stream().available().unwrap());
    assert_eq!(None, modem.stream().read_byte().unwrap());
}

#[test]
fn test_read_limited_by_buffer() {
    let mut transport = MockTransport::new();
    transport.push_rx(b"nice to see you!");

    let mut modem = connected_modem(transport);
    let mut buffer = [0x0; 4];

    assert_eq!(4, modem.stream().read(&mut buffer).unwrap());
    assert_eq!(b"nice", &buffer);
    assert_eq!(12, modem.client.transport.pending_rx());
}

#[test]
fn test_read_write_unconnected() {
    let mut modem = registered_modem(MockTransport::new());

    let mut buffer = [0x0; 4];
    assert_eq!(StreamError::SocketUnconnected, modem.stream().read(&mut buffer).unwrap_err());
    assert_eq!(StreamError::SocketUnconnected, modem.stream().write(b"data").unwrap_err());
    assert_eq!(StreamError::SocketUnconnected, modem.stream().available().unwrap_err());
    assert!(modem.client.transport.data().is_empty());
}

#[test]
fn test_escape() {
    let mut transport = MockTransport::new();
    transport.add_ok("AT");

    let mut modem = connected_modem(transport);
    modem.stream().escape().unwrap();

    assert_eq!(b"+++", modem.client.transport.data());
    assert!(modem.client.timer.ticks() >= 2_000);
}

#[test]
fn test_escape_not_confirmed() {
    let mut transport = MockTransport::new();
    transport.add_reply(MockedReply::silent("AT"));

    let mut modem = connected_modem(transport);
    let result = modem.stream().escape().unwrap_err();

    assert_eq!(StreamError::EscapeFailed(CommandError::Timeout), result);
}

#[test]
fn test_resume() {
    let mut transport = MockTransport::new();
    transport.add_reply(MockedReply::new(Some("ATO0"), b"\r\nCONNECT\r\n"));

    let mut modem = registered_modem(transport);
    modem.stream().resume().unwrap();

    assert!(modem.stream().connected());
}

#[test]
fn test_resume_failed() {
    let mut transport = MockTransport::new();
    transport.add_error("ATO0");

    let mut modem = registered_modem(transport);
    let result = modem.stream().resume().unwrap_err();

    assert_eq!(StreamError::ResumeFailed(CommandError::Rejected), result);
    assert!(!modem.stream().connected());
}

#[test]
fn test_stop() {
    let mut transport = MockTransport::new();
    add_stop(&mut transport);

    let mut modem = connected_modem(transport);
    modem.stream().stop();

    assert!(!modem.stream().connected());
    assert_eq!(b"+++", modem.client.transport.data());
    assert!(modem.is_registered());
    modem.client.transport.assert_all_cmds_sent();
}

#[test]
fn test_stop_twice() {
    let mut transport = MockTransport::new();
    add_stop(&mut transport);
    add_stop(&mut transport);

    let mut modem = connected_modem(transport);

    modem.stream().stop();
    assert!(!modem.stream().connected());

    modem.stream().stop();
    assert!(!modem.stream().connected());

    assert_eq!(b"++++++", modem.client.transport.data());
    modem.client.transport.assert_all_cmds_sent();
}

#[test]
fn test_stop_silent_modem() {
    let mut modem = connected_modem(MockTransport::new());

    modem.stream().stop();
    modem.stream().stop();

    assert!(!modem.stream().connected());
    assert_eq!(
        &["AT", "AT+CIPCLOSE=0", "AT", "AT+CIPCLOSE=0"],
        modem.client.transport.commands()
    );
}

#[test]
fn test_socket() {
    let mut modem = registered_modem(MockTransport::new());

    let socket = modem.socket().unwrap();
    assert_eq!(StreamError::NoSocketAvailable, modem.socket().unwrap_err());

    modem.close(socket).unwrap();
    modem.socket().unwrap();
    assert!(modem.client.transport.commands().is_empty());
}

#[test]
fn test_socket_without_ip_context() {
    let mut modem = initialized_modem(MockTransport::new());
    assert_eq!(StreamError::NotRegistered, modem.socket().unwrap_err());
}

#[test]
fn test_stack_connect_send_receive() {
    let mut transport = MockTransport::new();
    add_connect(&mut transport);

    let mut modem = registered_modem(transport);
    let mut socket = modem.socket().unwrap();
    modem
        .connect(&mut socket, SocketAddr::from_str("10.0.0.1:21").unwrap())
        .unwrap();

    assert_eq!(6, modem.send(&mut socket, b"hallo!").unwrap());
    assert_eq!(b"hallo!", modem.client.transport.data());

    let mut buffer = [0x0; 32];
    assert_eq!(nb::Error::WouldBlock, modem.receive(&mut socket, &mut buffer).unwrap_err());

    modem.client.transport.push_rx(b"nice to see you!");
    let length = modem.receive(&mut socket, &mut buffer).unwrap();
    assert_eq!(b"nice to see you!", &buffer[..length]);
}

#[test]
fn test_stack_connect_ipv6() {
    let mut modem = registered_modem(MockTransport::new());
    let mut socket = modem.socket().unwrap();

    let result = modem
        .connect(&mut socket, SocketAddr::from_str("[2001:db8::1]:21").unwrap())
        .unwrap_err();

    assert_eq!(nb::Error::Other(StreamError::UnsupportedAddress), result);
    assert!(modem.client.transport.commands().is_empty());
}

#[test]
fn test_stack_send_unconnected() {
    let mut modem = registered_modem(MockTransport::new());
    let mut socket = modem.socket().unwrap();

    let result = modem.send(&mut socket, b"hallo!").unwrap_err();
    assert_eq!(nb::Error::Other(StreamError::SocketUnconnected), result);
    assert_eq!(TcpErrorKind::PipeClosed, StreamError::SocketUnconnected.kind());
    assert_eq!(TcpErrorKind::Other, StreamError::NoSocketAvailable.kind());
}

#[test]
fn test_stack_close_stops_connection() {
    let mut transport = MockTransport::new();
    add_connect(&mut transport);
    add_stop(&mut transport);

    let mut modem = registered_modem(transport);
    let mut socket = modem.socket().unwrap();
    modem
        .connect(&mut socket, SocketAddr::from_str("10.0.0.1:21").unwrap())
        .unwrap();

    modem.close(socket).unwrap();

    assert!(!modem.stream().connected());
    assert!(modem.socket().is_ok());
    modem.client.transport.assert_all_cmds_sent();
}
