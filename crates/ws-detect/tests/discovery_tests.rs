//! Integration tests for exchange and discovery against simulated devices
//!
//! All tests run on paused tokio time, so settle delays, read timeouts and
//! backoff pauses complete instantly while still being measurable.

use std::time::Duration;

use tokio::time::Instant;
use ws_detect::{
    discover, AttemptFailure, DetectError, DeviceBus, DiscoveryConfig, LineParity, RetryPolicy,
    Role,
};
use ws_protocol::{Command, LaserId};
use ws_sim::{SimBus, VirtualLaser, VirtualScale};

fn laser_id(id: &str) -> LaserId {
    LaserId::from_device_token(id).unwrap()
}

fn ports(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Response protocol
// ============================================================================

#[tokio::test(start_paused = true)]
async fn send_and_await_returns_first_valid_reply() {
    let sim = SimBus::new();
    let laser = sim.attach("/dev/ttyUSB1", VirtualLaser::new("LDM058", 1.2));
    let bus = DeviceBus::new(sim);

    let reply = bus
        .send_and_await("/dev/ttyUSB1", Command::Identify, &RetryPolicy::standard())
        .await
        .unwrap();

    assert_eq!(reply, "V:LDM058,1.02");
    assert_eq!(laser.commands_received(Command::Identify), 1);
    assert_eq!(laser.opens(), 1);
}

#[tokio::test(start_paused = true)]
async fn send_and_await_retries_with_linear_backoff() {
    let sim = SimBus::new();
    let silent = sim.attach_silent("/dev/ttyUSB1");
    let bus = DeviceBus::new(sim);

    let start = Instant::now();
    let result = bus
        .send_and_await("/dev/ttyUSB1", Command::Distance, &RetryPolicy::standard())
        .await;

    match result {
        Err(DetectError::ProtocolTimeout {
            attempts, last, ..
        }) => {
            assert_eq!(attempts, 5);
            assert_eq!(last, AttemptFailure::NoReply);
        }
        other => panic!("expected timeout, got {:?}", other),
    }

    // Five attempts of 0.5 s settle + 1 s read timeout, plus 1+2+3+4 s of backoff
    assert_eq!(start.elapsed(), Duration::from_millis(17_500));
    assert_eq!(silent.commands_received(Command::Distance), 5);
    assert_eq!(silent.opens(), 5);
}

#[tokio::test(start_paused = true)]
async fn send_and_await_reports_malformed_reply() {
    let sim = SimBus::new();
    let laser = sim.attach("/dev/ttyUSB1", VirtualLaser::new("LDM058", 1.2));
    laser.set_distance_reply(Some("E:overrange"));
    let bus = DeviceBus::new(sim);

    let retry = RetryPolicy {
        attempts: 2,
        backoff_step: Duration::from_secs(1),
    };
    let err = bus
        .send_and_await("/dev/ttyUSB1", Command::Distance, &retry)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DetectError::ProtocolTimeout { last: AttemptFailure::Malformed(ref line), .. }
            if line == "E:overrange"
    ));
    assert_eq!(laser.commands_received(Command::Distance), 2);
}

#[tokio::test(start_paused = true)]
async fn send_and_await_recovers_after_transient_failure() {
    let sim = SimBus::new();
    let laser = sim.attach("/dev/ttyUSB1", VirtualLaser::new("LDM058", 1.2));
    laser.set_unplugged(true);
    let bus = DeviceBus::new(sim);

    let handle = laser.clone();
    let replug = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1_200)).await;
        handle.set_unplugged(false);
    });

    let reply = bus
        .send_and_await("/dev/ttyUSB1", Command::Distance, &RetryPolicy::standard())
        .await
        .unwrap();
    replug.await.unwrap();

    assert_eq!(reply, "D:1.200m,ok");
    assert_eq!(laser.opens(), 1);
}

#[tokio::test(start_paused = true)]
async fn send_and_await_reports_open_failure() {
    let bus = DeviceBus::new(SimBus::new());

    let err = bus
        .send_and_await("/dev/ttyUSB7", Command::Identify, &RetryPolicy::probe())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DetectError::ProtocolTimeout {
            attempts: 1,
            last: AttemptFailure::Open(_),
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn measure_distance_parses_reply() {
    let sim = SimBus::new();
    sim.attach("/dev/ttyUSB1", VirtualLaser::new("LDM058", 0.703));
    let bus = DeviceBus::new(sim);

    let reply = bus
        .measure_distance("/dev/ttyUSB1", &RetryPolicy::standard())
        .await
        .unwrap();
    assert_eq!(reply.meters, 0.703);
    assert_eq!(reply.accuracy, "ok");
}

#[tokio::test(start_paused = true)]
async fn measure_distance_rejects_unparsable_value() {
    let sim = SimBus::new();
    let laser = sim.attach("/dev/ttyUSB1", VirtualLaser::new("LDM058", 1.2));
    laser.set_distance_reply(Some("D:----m,ok"));
    let bus = DeviceBus::new(sim);

    let err = bus
        .measure_distance("/dev/ttyUSB1", &RetryPolicy::standard())
        .await
        .unwrap_err();
    assert!(matches!(err, DetectError::MalformedResponse { .. }));
    // Shape was valid, so the first attempt was accepted
    assert_eq!(laser.commands_received(Command::Distance), 1);
}

// ============================================================================
// Mass read
// ============================================================================

#[tokio::test(start_paused = true)]
async fn read_mass_decodes_signed_sample() {
    let sim = SimBus::new();
    let scale = sim.attach("/dev/ttyUSB0", VirtualScale::new(-30));
    let bus = DeviceBus::new(sim);

    let sample = bus.read_mass("/dev/ttyUSB0").await.unwrap();
    assert_eq!(sample.grams(), -30);
    assert_eq!(scale.commands_received(Command::Mass), 1);
    assert_eq!(scale.last_settings().unwrap().parity, LineParity::Space);
}

#[tokio::test(start_paused = true)]
async fn read_mass_discards_stale_input() {
    let sim = SimBus::new();
    sim.attach(
        "/dev/ttyUSB0",
        VirtualScale::new(1250).with_stale_input(&[0x00, 0x80, 0x13]),
    );
    let bus = DeviceBus::new(sim);

    let sample = bus.read_mass("/dev/ttyUSB0").await.unwrap();
    assert_eq!(sample.grams(), 1250);
}

#[tokio::test(start_paused = true)]
async fn read_mass_gives_up_after_window() {
    let sim = SimBus::new();
    let scale = sim.attach("/dev/ttyUSB0", VirtualScale::new(500));
    scale.set_responsive(false);
    let bus = DeviceBus::new(sim);

    let start = Instant::now();
    let err = bus.read_mass("/dev/ttyUSB0").await.unwrap_err();

    assert!(matches!(
        err,
        DetectError::ProtocolTimeout {
            command: Command::Mass,
            attempts: 1,
            ..
        }
    ));
    assert_eq!(start.elapsed(), Duration::from_secs(1));
    assert_eq!(scale.commands_received(Command::Mass), 1);
}

#[tokio::test(start_paused = true)]
async fn read_mass_reports_unavailable_port() {
    let bus = DeviceBus::new(SimBus::new());
    let err = bus.read_mass("/dev/ttyUSB0").await.unwrap_err();
    assert!(matches!(err, DetectError::PortUnavailable { .. }));
}

// ============================================================================
// Discovery
// ============================================================================

#[tokio::test(start_paused = true)]
async fn discovers_scale_and_calibrated_lasers() {
    let sim = SimBus::new();
    let scale = sim.attach("/dev/ttyUSB0", VirtualScale::new(0));
    let laser_a = sim.attach("/dev/ttyUSB1", VirtualLaser::new("LDM058", 1.2));
    sim.attach("/dev/ttyUSB2", VirtualLaser::new("LDM095", 0.85));
    let bus = DeviceBus::new(sim.clone());

    let station = discover(&bus, &sim.ports(), &DiscoveryConfig::default())
        .await
        .unwrap();

    assert_eq!(station.scale_port(), "/dev/ttyUSB0");
    assert_eq!(station.laser_count(), 2);
    assert_eq!(station.baseline(&laser_id("058")), Some(1.2));
    assert_eq!(station.baseline(&laser_id("095")), Some(0.85));

    // One identify probe per port, one calibration distance per laser
    assert_eq!(scale.commands_received(Command::Identify), 1);
    assert_eq!(scale.commands_received(Command::Distance), 0);
    assert_eq!(laser_a.commands_received(Command::Identify), 1);
    assert_eq!(laser_a.commands_received(Command::Distance), 1);

    let lasers: Vec<_> = station
        .lasers()
        .map(|(id, port)| (id.as_str().to_string(), port.to_string()))
        .collect();
    assert_eq!(
        lasers,
        vec![
            ("058".to_string(), "/dev/ttyUSB1".to_string()),
            ("095".to_string(), "/dev/ttyUSB2".to_string()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn second_silent_port_is_ignored() {
    let sim = SimBus::new();
    let first = sim.attach("/dev/ttyUSB0", VirtualScale::new(0));
    sim.attach("/dev/ttyUSB1", VirtualScale::new(0));
    let bus = DeviceBus::new(sim.clone());

    let station = discover(&bus, &sim.ports(), &DiscoveryConfig::default())
        .await
        .unwrap();

    assert_eq!(station.scale_port(), "/dev/ttyUSB0");
    assert_eq!(station.laser_count(), 0);
    let devices = station.devices();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].role, Role::Scale);
    assert_eq!(first.commands_received(Command::Identify), 1);
}

#[tokio::test(start_paused = true)]
async fn no_scale_is_fatal() {
    let sim = SimBus::new();
    sim.attach("/dev/ttyUSB0", VirtualLaser::new("LDM058", 1.2));
    let bus = DeviceBus::new(sim.clone());

    let err = discover(&bus, &sim.ports(), &DiscoveryConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DetectError::NoScaleFound(1)));
}

#[tokio::test(start_paused = true)]
async fn no_ports_is_fatal() {
    let bus = DeviceBus::new(SimBus::new());
    let err = discover(&bus, &[], &DiscoveryConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DetectError::NoScaleFound(0)));
}

#[tokio::test(start_paused = true)]
async fn calibration_failure_leaves_laser_without_baseline() {
    let sim = SimBus::new();
    sim.attach("/dev/ttyUSB0", VirtualScale::new(0));
    let laser = sim.attach("/dev/ttyUSB1", VirtualLaser::new("LDM058", 1.2));
    laser.set_distance_reply(Some("D:overflow,ok"));
    let bus = DeviceBus::new(sim.clone());

    let station = discover(&bus, &sim.ports(), &DiscoveryConfig::default())
        .await
        .unwrap();

    assert_eq!(station.laser_count(), 1);
    assert_eq!(station.baseline(&laser_id("058")), None);
    assert!(station.calibration().is_empty());
}

#[tokio::test(start_paused = true)]
async fn duplicate_laser_id_is_ignored() {
    let sim = SimBus::new();
    sim.attach("/dev/ttyUSB0", VirtualScale::new(0));
    sim.attach("/dev/ttyUSB1", VirtualLaser::new("LDM058", 1.2));
    let twin = sim.attach("/dev/ttyUSB2", VirtualLaser::new("XYZ058", 0.9));
    let bus = DeviceBus::new(sim.clone());

    let station = discover(&bus, &sim.ports(), &DiscoveryConfig::default())
        .await
        .unwrap();

    assert_eq!(station.laser_count(), 1);
    assert_eq!(station.baseline(&laser_id("058")), Some(1.2));
    // The twin was identified but never calibrated
    assert_eq!(twin.commands_received(Command::Distance), 0);
}

#[tokio::test(start_paused = true)]
async fn unopenable_port_counts_as_silent() {
    let sim = SimBus::new();
    let dead = sim.attach("/dev/ttyUSB0", VirtualScale::new(0));
    dead.set_unplugged(true);
    let bus = DeviceBus::new(sim.clone());

    let station = discover(&bus, &sim.ports(), &DiscoveryConfig::default())
        .await
        .unwrap();
    assert_eq!(station.scale_port(), "/dev/ttyUSB0");
    assert_eq!(dead.opens(), 0);
}

#[tokio::test(start_paused = true)]
async fn unopenable_port_first_wins_scale() {
    let sim = SimBus::new();
    let dead = sim.attach("/dev/ttyUSB0", VirtualScale::new(0));
    dead.set_unplugged(true);
    let live = sim.attach("/dev/ttyUSB1", VirtualScale::new(0));
    let bus = DeviceBus::new(sim.clone());

    let station = discover(&bus, &sim.ports(), &DiscoveryConfig::default())
        .await
        .unwrap();
    assert_eq!(station.scale_port(), "/dev/ttyUSB0");
    assert_eq!(station.devices().len(), 1);
    // the second silent port was still probed, then ignored
    assert_eq!(live.commands_received(Command::Identify), 1);
}
