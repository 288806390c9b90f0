//! Live TCP round-trips against an in-process server.

use instrument_server::command::PluginRegistry;
use instrument_server::device::{DeviceRegistry, MockDevice, MockFailure};
use instrument_server::dispatch::Dispatcher;
use instrument_server::server::CommandServer;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

const RS_IDN: &str = "ROHDE&SCHWARZ,NGE100,5601.3800k02,1.50";

async fn spawn_server(devices: DeviceRegistry) -> std::net::SocketAddr {
    let dispatcher = Arc::new(Dispatcher::new(
        PluginRegistry::with_builtins(),
        Arc::new(devices),
    ));
    let server = CommandServer::bind("127.0.0.1:0", dispatcher).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

async fn send_line(
    reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>,
    writer: &mut tokio::net::tcp::OwnedWriteHalf,
    line: &[u8],
) -> String {
    writer.write_all(line).await.unwrap();
    let mut response = String::new();
    reader.read_line(&mut response).await.unwrap();
    response.trim_end().to_string()
}

#[tokio::test]
async fn round_trip_over_tcp() {
    let mut devices = DeviceRegistry::new();
    devices
        .insert(Arc::new(MockDevice::new(
            "psu1".to_string(),
            RS_IDN.to_string(),
        )))
        .unwrap();
    devices
        .insert(Arc::new(MockDevice::new(
            "osc1".to_string(),
            "Rohde&Schwarz,RTO2044,1329.7002k44,3.70".to_string(),
        )))
        .unwrap();
    let addr = spawn_server(devices).await;

    let stream = TcpStream::connect(addr).await.unwrap();
    let (read, mut write) = stream.into_split();
    let mut read = BufReader::new(read);

    let response = send_line(&mut read, &mut write, b"is_rs_devices?\n").await;
    assert_eq!(response, "true");

    let response = send_line(&mut read, &mut write, b"devices?\n").await;
    assert_eq!(response, "osc1,psu1");

    let response = send_line(&mut read, &mut write, b"idn? psu1\n").await;
    assert_eq!(response, RS_IDN);
}

#[tokio::test]
async fn session_survives_failures() {
    let mut devices = DeviceRegistry::new();
    devices
        .insert(Arc::new(MockDevice::failing(
            "dead1".to_string(),
            MockFailure::Unavailable,
        )))
        .unwrap();
    let addr = spawn_server(devices).await;

    let stream = TcpStream::connect(addr).await.unwrap();
    let (read, mut write) = stream.into_split();
    let mut read = BufReader::new(read);

    // Unknown command: defined response, connection stays open.
    let response = send_line(&mut read, &mut write, b"unknown_cmd?\n").await;
    assert_eq!(response, "error: unknown command");

    // Device failure: error line, connection still stays open.
    let response = send_line(&mut read, &mut write, b"is_rs_devices?\n").await;
    assert!(response.starts_with("error:"));
    assert!(response.contains("dead1"));

    // The same session keeps answering afterwards.
    let response = send_line(&mut read, &mut write, b"devices?\n").await;
    assert_eq!(response, "dead1");
}

#[tokio::test]
async fn concurrent_connections_share_one_registry() {
    let mut devices = DeviceRegistry::new();
    devices
        .insert(Arc::new(MockDevice::new(
            "psu1".to_string(),
            RS_IDN.to_string(),
        )))
        .unwrap();
    let addr = spawn_server(devices).await;

    let mut tasks = Vec::new();
    for _ in 0..4 {
        tasks.push(tokio::spawn(async move {
            let stream = TcpStream::connect(addr).await.unwrap();
            let (read, mut write) = stream.into_split();
            let mut read = BufReader::new(read);
            send_line(&mut read, &mut write, b"is_rs_devices?\n").await
        }));
    }

    for task in tasks {
        assert_eq!(task.await.unwrap(), "true");
    }
}
