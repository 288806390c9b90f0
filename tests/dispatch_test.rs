//! Dispatcher and command semantics against mock devices.

use bytes::Bytes;
use instrument_server::command::{CommandPlugin, IsRsDevices, PluginRegistry};
use instrument_server::device::{DeviceRegistry, MockDevice, MockFailure};
use instrument_server::dispatch::{
    Dispatcher, MALFORMED_COMMAND_RESPONSE, UNKNOWN_COMMAND_RESPONSE,
};
use instrument_server::error::AppResult;
use std::sync::Arc;
use std::time::Duration;

const RS_IDN: &str = "Rohde&Schwarz,RTO2044,1329.7002k44,3.70";
const OTHER_IDN: &str = "Keysight Technologies,33500B,MY57300123,5.02";

fn rs_device(name: &str) -> Arc<MockDevice> {
    Arc::new(MockDevice::new(name.to_string(), RS_IDN.to_string()))
}

fn other_device(name: &str) -> Arc<MockDevice> {
    Arc::new(MockDevice::new(name.to_string(), OTHER_IDN.to_string()))
}

fn dispatcher(devices: DeviceRegistry) -> Dispatcher {
    Dispatcher::new(PluginRegistry::with_builtins(), Arc::new(devices))
}

#[tokio::test]
async fn all_rs_devices_answer_true() {
    let mut devices = DeviceRegistry::new();
    devices.insert(rs_device("osc1")).unwrap();
    devices.insert(rs_device("psu1")).unwrap();

    let result = IsRsDevices.execute(b"is_rs_devices?", &devices).await.unwrap();
    assert_eq!(&result[..], b"true");
}

#[tokio::test]
async fn vendor_marker_is_case_insensitive() {
    let mut devices = DeviceRegistry::new();
    devices
        .insert(Arc::new(MockDevice::new(
            "osc1".to_string(),
            "rohde&schwarz,RTB2004,1333.1005k04,2.4".to_string(),
        )))
        .unwrap();

    let result = IsRsDevices.execute(b"is_rs_devices?", &devices).await.unwrap();
    assert_eq!(&result[..], b"true");
}

#[tokio::test]
async fn scan_stops_at_first_mismatch() {
    // Ascending name order: a_osc (R&S), b_gen (other), c_psu (R&S).
    let a = rs_device("a_osc");
    let b = other_device("b_gen");
    let c = rs_device("c_psu");

    let mut devices = DeviceRegistry::new();
    devices.insert(a.clone()).unwrap();
    devices.insert(b.clone()).unwrap();
    devices.insert(c.clone()).unwrap();

    let result = IsRsDevices.execute(b"is_rs_devices?", &devices).await.unwrap();
    assert_eq!(&result[..], b"false");

    assert_eq!(a.query_count(), 1);
    assert_eq!(b.query_count(), 1);
    // The device after the mismatch was never asked.
    assert_eq!(c.query_count(), 0);
}

#[tokio::test]
async fn empty_registry_answers_true() {
    // Vacuous truth, matching the original server's behavior.
    let devices = DeviceRegistry::new();
    let result = IsRsDevices.execute(b"is_rs_devices?", &devices).await.unwrap();
    assert_eq!(&result[..], b"true");
}

#[tokio::test]
async fn device_failure_aborts_the_command() {
    let a = rs_device("a_osc");
    let b = Arc::new(MockDevice::failing(
        "b_gen".to_string(),
        MockFailure::Timeout(Duration::from_millis(100)),
    ));
    let c = rs_device("c_psu");

    let mut devices = DeviceRegistry::new();
    devices.insert(a).unwrap();
    devices.insert(b).unwrap();
    devices.insert(c.clone()).unwrap();

    let err = IsRsDevices
        .execute(b"is_rs_devices?", &devices)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("timed out"));
    // A failed query is not treated as a mismatch; the scan aborts.
    assert_eq!(c.query_count(), 0);
}

#[tokio::test]
async fn handle_round_trip() {
    let mut devices = DeviceRegistry::new();
    devices.insert(rs_device("osc1")).unwrap();
    devices.insert(rs_device("psu1")).unwrap();
    let dispatcher = dispatcher(devices);

    let response = dispatcher.handle(b"is_rs_devices?\n").await;
    assert_eq!(&response[..], b"true");

    let mut devices = DeviceRegistry::new();
    devices.insert(rs_device("osc1")).unwrap();
    devices.insert(other_device("psu1")).unwrap();
    let dispatcher = Dispatcher::new(PluginRegistry::with_builtins(), Arc::new(devices));

    let response = dispatcher.handle(b"is_rs_devices?\n").await;
    assert_eq!(&response[..], b"false");
}

#[tokio::test]
async fn handle_reports_timeouts_as_errors() {
    let mut devices = DeviceRegistry::new();
    devices
        .insert(Arc::new(MockDevice::failing(
            "dead1".to_string(),
            MockFailure::Timeout(Duration::from_millis(100)),
        )))
        .unwrap();
    let dispatcher = dispatcher(devices);

    let response = dispatcher.handle(b"is_rs_devices?\n").await;
    assert!(response.starts_with(b"error:"));
    assert_ne!(&response[..], b"true");
    assert_ne!(&response[..], b"false");
}

#[tokio::test]
async fn handle_unknown_command() {
    let mut devices = DeviceRegistry::new();
    devices.insert(rs_device("osc1")).unwrap();
    let dispatcher = dispatcher(devices);

    let response = dispatcher.handle(b"unknown_cmd?\n").await;
    assert_eq!(&response[..], UNKNOWN_COMMAND_RESPONSE);
}

#[tokio::test]
async fn handle_malformed_line() {
    let dispatcher = dispatcher(DeviceRegistry::new());
    let response = dispatcher.handle(&[0xff, 0xfe, b'?', b'\n']).await;
    assert_eq!(&response[..], MALFORMED_COMMAND_RESPONSE);
}

#[tokio::test]
async fn first_registered_plugin_wins() {
    struct Always(&'static str);

    #[async_trait::async_trait]
    impl CommandPlugin for Always {
        fn name(&self) -> &str {
            self.0
        }
        fn is_match(&self, raw: &[u8]) -> bool {
            raw == b"overlap?"
        }
        async fn execute(&self, _raw: &[u8], _devices: &DeviceRegistry) -> AppResult<Bytes> {
            Ok(Bytes::from(self.0))
        }
    }

    let mut plugins = PluginRegistry::new();
    plugins.register(Box::new(Always("first")));
    plugins.register(Box::new(Always("second")));
    let dispatcher = Dispatcher::new(plugins, Arc::new(DeviceRegistry::new()));

    for _ in 0..5 {
        let response = dispatcher.handle(b"overlap?\n").await;
        assert_eq!(&response[..], b"first");
    }
}
