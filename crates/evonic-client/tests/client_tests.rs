//! Client Library Tests (evonic-client)
//!
//! Tests for the high-level Evonic client API including:
//! - Builder pattern and configuration
//! - Session lifecycle and state-machine misuse
//! - Command validation and wire output
//! - Event dispatch ordering and observer isolation
//! - Concurrent command serialization
//! - Connection-loss notification

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use evonic_client::{ClientError, Evonic, Observer};
use evonic_core::{codec, Error as CoreError, Event, PowerCommand, TempUnit};
use evonic_test_utils::{EventCollector, TestFire, DEFAULT_TIMEOUT};

const STATUS_CELSIUS: &str = r#"{"modules":["rgb0","rgb1","light_box","temperature"],"configs":"v630","fahrenheit":0,"Fire":1,"brightnessRGB0":128,"speedRGB0":50}"#;
const STATUS_FAHRENHEIT: &str = r#"{"modules":["rgb0","rgb1","light_box","temperature"],"configs":"v630","fahrenheit":1}"#;

async fn connect_client(fire: &TestFire) -> Evonic {
    let client = Evonic::builder(fire.host())
        .port(fire.port())
        .connect()
        .await
        .expect("Connect failed");
    assert!(
        fire.wait_for_client(DEFAULT_TIMEOUT).await,
        "Device never saw the client"
    );
    client
}

/// Connect, start listening, and feed the client one status frame. Waits
/// until every event of the frame has been applied, so command validation
/// sees the complete snapshot.
async fn connect_with_status(fire: &TestFire, status: &str) -> (Evonic, EventCollector) {
    let client = connect_client(fire).await;
    let collector = EventCollector::new();
    client.listen(collector.clone()).expect("Listen failed");

    let expected = codec::decode(status).expect("test status frame is valid").len();
    fire.push(status).await;
    assert!(
        collector.wait_for_count(expected, DEFAULT_TIMEOUT).await,
        "Status frame never fully dispatched"
    );
    (client, collector)
}

// ============================================================================
// Builder Tests
// ============================================================================

#[tokio::test]
async fn test_builder_default() {
    let fire = TestFire::start().await;

    let client = Evonic::builder(fire.host())
        .port(fire.port())
        .connect()
        .await
        .expect("Connect failed");

    assert!(client.is_connected(), "Client not connected");

    client.disconnect().await;
}

#[tokio::test]
async fn test_builder_chained() {
    let fire = TestFire::start().await;

    let client = Evonic::builder(fire.host())
        .port(fire.port())
        .connect_timeout(Duration::from_secs(2))
        .connect()
        .await
        .expect("Connect failed");

    assert!(client.is_connected(), "Client not connected");

    client.disconnect().await;
}

#[tokio::test]
async fn test_build_without_connect() {
    let client = Evonic::new("192.168.1.190");
    assert!(!client.is_connected(), "Fresh client should be disconnected");
}

// ============================================================================
// Connection Lifecycle Tests
// ============================================================================

#[tokio::test]
async fn test_connect_twice_fails() {
    let fire = TestFire::start().await;
    let client = connect_client(&fire).await;

    let result = client.connect().await;
    assert!(
        matches!(result, Err(ClientError::AlreadyConnected)),
        "Second connect should fail AlreadyConnected, got {:?}",
        result
    );

    client.disconnect().await;
}

#[tokio::test]
async fn test_connect_unreachable() {
    let client = Evonic::builder("127.0.0.1")
        .port(1)
        .connect_timeout(Duration::from_secs(2))
        .build();

    let result = client.connect().await;
    assert!(
        matches!(result, Err(ClientError::ConnectionFailed(_))),
        "Expected ConnectionFailed, got {:?}",
        result
    );
    assert!(!client.is_connected(), "Failed connect must end Disconnected");
}

#[tokio::test]
async fn test_disconnect_idempotent() {
    let fire = TestFire::start().await;
    let client = connect_client(&fire).await;

    client.disconnect().await;
    assert!(!client.is_connected(), "Should be disconnected");

    // Second disconnect is a no-op
    client.disconnect().await;
    assert!(!client.is_connected(), "Still disconnected");
}

#[tokio::test]
async fn test_reconnect_after_disconnect() {
    let fire = TestFire::start().await;
    let client = connect_client(&fire).await;

    client.disconnect().await;

    client.connect().await.expect("Reconnect failed");
    assert!(client.is_connected(), "Client not connected after reconnect");

    client.disconnect().await;
}

#[tokio::test]
async fn test_listen_requires_connection() {
    let client = Evonic::new("192.168.1.190");

    let result = client.listen(EventCollector::new());
    assert!(matches!(result, Err(ClientError::NotConnected)));
}

#[tokio::test]
async fn test_listen_twice_fails() {
    let fire = TestFire::start().await;
    let client = connect_client(&fire).await;

    client.listen(EventCollector::new()).expect("Listen failed");

    let result = client.listen(EventCollector::new());
    assert!(
        matches!(result, Err(ClientError::AlreadyListening)),
        "Second listen should fail AlreadyListening, got {:?}",
        result
    );

    client.disconnect().await;
}

// ============================================================================
// Command Wire Output Tests
// ============================================================================

#[tokio::test]
async fn test_light_power_on_wire() {
    let fire = TestFire::start().await;
    let client = connect_client(&fire).await;

    client
        .light_power(PowerCommand::On)
        .await
        .expect("Command failed");
    client
        .light_power(PowerCommand::Toggle)
        .await
        .expect("Command failed");
    client
        .heater_power(PowerCommand::Off)
        .await
        .expect("Command failed");

    assert!(fire.wait_for_frames(3, DEFAULT_TIMEOUT).await, "Frames missing");
    assert_eq!(
        fire.frames(),
        vec![
            r#"{"voice":"Fire_ON"}"#,
            r#"{"voice":"Fire_ON/OFF"}"#,
            r#"{"voice":"Heater_OFF"}"#,
        ]
    );

    client.disconnect().await;
}

#[tokio::test]
async fn test_parameter_commands_on_wire() {
    let fire = TestFire::start().await;
    let (client, _collector) = connect_with_status(&fire, STATUS_CELSIUS).await;

    client
        .set_light_brightness(0, 200)
        .await
        .expect("Brightness failed");
    client
        .set_animation_speed(1, 30)
        .await
        .expect("Speed failed");
    client.set_temperature(21).await.expect("Temperature failed");
    client.set_effect("Eos").await.expect("Effect failed");

    assert!(fire.wait_for_frames(4, DEFAULT_TIMEOUT).await, "Frames missing");
    assert_eq!(
        fire.frames(),
        vec![
            r#"{"cmd":"rgb set 0 - - 200 -"}"#,
            r#"{"cmd":"rgb set 1 - 30 - -"}"#,
            r#"{"cmd":"templevel 21"}"#,
            r#"{"voice":"Eos"}"#,
        ]
    );

    client.disconnect().await;
}

// ============================================================================
// Command Validation Tests
// ============================================================================

#[tokio::test]
async fn test_commands_before_connect_fail() {
    let client = Evonic::new("192.168.1.190");

    assert!(matches!(
        client.light_power(PowerCommand::On).await,
        Err(ClientError::NotConnected)
    ));
    assert!(matches!(
        client.set_temperature(70).await,
        Err(ClientError::NotConnected)
    ));
    assert!(matches!(
        client.set_light_brightness(0, 100).await,
        Err(ClientError::NotConnected)
    ));
}

#[tokio::test]
async fn test_commands_after_disconnect_fail() {
    let fire = TestFire::start().await;
    let client = connect_client(&fire).await;

    client.disconnect().await;

    assert!(matches!(
        client.light_power(PowerCommand::On).await,
        Err(ClientError::NotConnected)
    ));
}

#[tokio::test]
async fn test_temperature_not_ready_before_device_info() {
    let fire = TestFire::start().await;
    let client = connect_client(&fire).await;

    let result = client.set_temperature(70).await;
    assert!(
        matches!(result, Err(ClientError::Command(CoreError::NotReady(_)))),
        "Expected NotReady, got {:?}",
        result
    );

    client.disconnect().await;
}

#[tokio::test]
async fn test_temperature_fahrenheit_validation() {
    let fire = TestFire::start().await;
    let (client, _collector) = connect_with_status(&fire, STATUS_FAHRENHEIT).await;

    client.set_temperature(75).await.expect("75°F should pass");

    let result = client.set_temperature(95).await;
    assert!(
        matches!(result, Err(ClientError::Command(CoreError::InvalidArgument(_)))),
        "95°F should be rejected, got {:?}",
        result
    );

    client.disconnect().await;
}

#[tokio::test]
async fn test_brightness_validation() {
    let fire = TestFire::start().await;
    let (client, _collector) = connect_with_status(&fire, STATUS_CELSIUS).await;

    client
        .set_light_brightness(0, 0)
        .await
        .expect("0 should pass");
    client
        .set_light_brightness(1, 255)
        .await
        .expect("255 should pass");

    assert!(matches!(
        client.set_light_brightness(0, 256).await,
        Err(ClientError::Command(CoreError::InvalidArgument(_)))
    ));
    assert!(matches!(
        client.set_light_brightness(0, -1).await,
        Err(ClientError::Command(CoreError::InvalidArgument(_)))
    ));
    assert!(matches!(
        client.set_light_brightness(9, 100).await,
        Err(ClientError::Command(CoreError::InvalidArgument(_)))
    ));

    client.disconnect().await;
}

#[tokio::test]
async fn test_feature_light_unsupported() {
    let fire = TestFire::start().await;
    let (client, _collector) = connect_with_status(
        &fire,
        r#"{"modules":["rgb0","temperature"],"fahrenheit":0}"#,
    )
    .await;

    let result = client.toggle_feature_light().await;
    assert!(
        matches!(result, Err(ClientError::Command(CoreError::Unsupported(_)))),
        "Expected Unsupported, got {:?}",
        result
    );

    client.disconnect().await;
}

#[tokio::test]
async fn test_effect_validation() {
    let fire = TestFire::start().await;
    let client = connect_client(&fire).await;

    // No configs reported yet
    assert!(matches!(
        client.set_effect("Vero").await,
        Err(ClientError::Command(CoreError::NotReady(_)))
    ));

    let collector = EventCollector::new();
    client.listen(collector.clone()).expect("Listen failed");
    fire.push(r#"{"configs":"e500"}"#).await;
    collector.wait_for_count(1, DEFAULT_TIMEOUT).await;

    client.set_effect("Evoflame").await.expect("Evoflame is valid");
    assert!(matches!(
        client.set_effect("Vero").await,
        Err(ClientError::Command(CoreError::Unsupported(_)))
    ));

    client.disconnect().await;
}

// ============================================================================
// Event Dispatch Tests
// ============================================================================

#[tokio::test]
async fn test_events_dispatched_in_frame_order() {
    let fire = TestFire::start().await;
    let client = connect_client(&fire).await;

    let collector = EventCollector::new();
    client.listen(collector.clone()).expect("Listen failed");

    fire.push(r#"{"Fire":1}"#).await;
    fire.push(r#"{"templevel":23}"#).await;
    fire.push(r#"{"effect":"Embers"}"#).await;

    assert!(
        collector.wait_for_count(3, DEFAULT_TIMEOUT).await,
        "Did not receive all 3 events"
    );
    assert_eq!(
        collector.events(),
        vec![
            Event::MainLightPower(true),
            Event::TargetTemperature(23),
            Event::Effect("Embers".to_string()),
        ]
    );

    client.disconnect().await;
}

#[tokio::test]
async fn test_device_snapshot_tracks_events() {
    let fire = TestFire::start().await;
    let (client, _collector) = connect_with_status(&fire, STATUS_CELSIUS).await;

    let device = client.device();
    assert_eq!(device.unit, Some(TempUnit::Celsius));
    assert_eq!(device.main_light, Some(true));
    assert_eq!(device.modules[&0].brightness, Some(128));
    assert_eq!(device.modules[&0].speed, Some(50));

    client.disconnect().await;
}

#[tokio::test]
async fn test_decode_error_drops_frame_and_continues() {
    let fire = TestFire::start().await;
    let client = connect_client(&fire).await;

    let collector = EventCollector::new();
    client.listen(collector.clone()).expect("Listen failed");

    fire.push("not json at all").await;
    fire.push(r#"{"Fire":1}"#).await;

    assert!(
        collector.wait_for_count(1, DEFAULT_TIMEOUT).await,
        "Loop died on the corrupt frame"
    );
    assert_eq!(collector.events(), vec![Event::MainLightPower(true)]);
    assert_eq!(collector.decode_errors().len(), 1);

    client.disconnect().await;
}

#[tokio::test]
async fn test_panicking_observer_does_not_kill_loop() {
    struct PanicOnFirst {
        panicked: Arc<AtomicBool>,
        collector: EventCollector,
    }

    impl Observer for PanicOnFirst {
        fn on_event(&self, event: &Event, device: &evonic_core::Device) {
            if !self.panicked.swap(true, Ordering::SeqCst) {
                panic!("observer blew up");
            }
            self.collector.on_event(event, device);
        }
    }

    let fire = TestFire::start().await;
    let client = connect_client(&fire).await;

    let collector = EventCollector::new();
    client
        .listen(PanicOnFirst {
            panicked: Arc::new(AtomicBool::new(false)),
            collector: collector.clone(),
        })
        .expect("Listen failed");

    fire.push(r#"{"Fire":1}"#).await; // panics
    fire.push(r#"{"Fire":0}"#).await; // must still be dispatched

    assert!(
        collector.wait_for_count(1, DEFAULT_TIMEOUT).await,
        "Loop died with the panicking observer"
    );
    assert_eq!(collector.events(), vec![Event::MainLightPower(false)]);

    client.disconnect().await;
}

// ============================================================================
// Connection Loss Tests
// ============================================================================

#[tokio::test]
async fn test_connection_lost_notifies_observer() {
    let fire = TestFire::start().await;
    let client = connect_client(&fire).await;

    let collector = EventCollector::new();
    client.listen(collector.clone()).expect("Listen failed");

    fire.kick().await;

    assert!(
        collector.wait_for_lost(DEFAULT_TIMEOUT).await,
        "No connection-lost notification"
    );
    assert!(!client.is_connected(), "State should be Disconnected");
    assert!(matches!(
        client.light_power(PowerCommand::On).await,
        Err(ClientError::NotConnected)
    ));
}

#[tokio::test]
async fn test_clean_disconnect_is_not_reported_lost() {
    let fire = TestFire::start().await;
    let client = connect_client(&fire).await;

    let collector = EventCollector::new();
    client.listen(collector.clone()).expect("Listen failed");

    client.disconnect().await;

    // Give the loop a moment to wind down; no lost notification may appear
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(
        !collector.connection_lost(),
        "Clean disconnect must not be reported as lost"
    );
}

#[tokio::test]
async fn test_reconnect_after_connection_lost() {
    let fire = TestFire::start().await;
    let client = connect_client(&fire).await;

    let collector = EventCollector::new();
    client.listen(collector.clone()).expect("Listen failed");

    fire.kick().await;
    assert!(collector.wait_for_lost(DEFAULT_TIMEOUT).await);

    client.connect().await.expect("Reconnect failed");
    assert!(client.is_connected());

    client.disconnect().await;
}

// ============================================================================
// Concurrency Tests
// ============================================================================

#[tokio::test]
async fn test_concurrent_commands_never_interleave() {
    let fire = TestFire::start().await;
    let client = Arc::new(connect_client(&fire).await);

    let tasks: Vec<_> = (0..100)
        .map(|_| {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.light_power(PowerCommand::On).await })
        })
        .collect();

    for task in tasks {
        task.await.expect("Task panicked").expect("Command failed");
    }

    assert!(
        fire.wait_for_frames(100, DEFAULT_TIMEOUT).await,
        "Device received only {} of 100 frames",
        fire.frames().len()
    );

    let frames = fire.frames();
    assert_eq!(frames.len(), 100);
    for frame in frames {
        // Every frame must be complete and well-formed on its own
        let parsed: serde_json::Value =
            serde_json::from_str(&frame).expect("Interleaved or corrupt frame");
        assert_eq!(parsed["voice"], "Fire_ON");
    }

    client.disconnect().await;
}

#[tokio::test]
async fn test_commands_concurrent_with_event_stream() {
    let fire = TestFire::start().await;
    let client = Arc::new(connect_client(&fire).await);

    let collector = EventCollector::new();
    client.listen(collector.clone()).expect("Listen failed");

    // Device chatters while commands are in flight
    for i in 0..20 {
        fire.push(&format!(r#"{{"templevel":{}}}"#, 10 + (i % 20))).await;
        client
            .heater_power(PowerCommand::Toggle)
            .await
            .expect("Command failed");
    }

    assert!(collector.wait_for_count(20, DEFAULT_TIMEOUT).await);
    assert!(fire.wait_for_frames(20, DEFAULT_TIMEOUT).await);

    client.disconnect().await;
}
