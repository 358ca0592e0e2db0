//! Integration tests for the token-gated command channel.
//!
//! The channel is driven synchronously through `push_chunk`, exactly as
//! its run loop does with each captured command write.

use febina::app::DeviceSession;
use febina::app::events::SessionEvent;
use febina::command::{CommandChannel, INVALID_TOKEN, ProgramStore, StimulationType};
use febina::config::{DeviceConfig, ResponseNotify, TokenPolicy};
use febina::error::{Error, FrameError};
use febina::gatt::codec::ZERO_SENTINEL;
use febina::gatt::{GattServer, uuids};
use febina::stepper::StepperController;

use crate::mock_ble::{self, MockBackend, PEER, RecordingSink};

struct Rig {
    config: DeviceConfig,
    server: GattServer<MockBackend>,
    events: RecordingSink,
    programs: ProgramStore,
    session: DeviceSession,
}

impl Rig {
    fn new(config: DeviceConfig) -> Self {
        let server = mock_ble::server(&config);
        server.on_connect(PEER);
        Self {
            config,
            server,
            events: RecordingSink::new(),
            programs: ProgramStore::default(),
            session: DeviceSession::bind(mock_ble::authenticated(0x5A), PEER),
        }
    }

    fn token(&self) -> String {
        self.session.token.as_str().to_string()
    }

    /// Send `frame` in 20-byte chunks through a fresh channel.
    fn send<'r>(
        &'r self,
        stepper: &'r StepperController<'r, MockBackend, RecordingSink>,
        frame: &str,
    ) {
        let mut channel = CommandChannel::new(
            stepper,
            &self.programs,
            &self.events,
            &self.config,
            &self.session,
        );
        for chunk in mock_ble::chunks(frame) {
            channel.push_chunk(&chunk);
        }
    }

    fn response(&self) -> String {
        String::from_utf8(self.server.run.response.value()).unwrap()
    }
}

#[test]
fn run_with_valid_token_starts_stepper() {
    let rig = Rig::new(DeviceConfig::default());
    let stepper = StepperController::new(&rig.server, &rig.events, &rig.config);

    let frame = format!(r#"{{"token":"{}","command":"RUN","info":{{}}}}"#, rig.token());
    assert!(frame.len() > 20, "frame must span several writes");
    rig.send(&stepper, &frame);

    assert!(stepper.snapshot().run);
    assert_eq!(rig.response(), "RUN");
    assert_eq!(
        rig.server.backend().notified(uuids::STEPPER_GET_RUN),
        vec![vec![1, 0]]
    );
    assert_eq!(
        rig.events
            .count(|e| matches!(e, SessionEvent::Command { name, token_valid: Some(true) } if name == "RUN")),
        1
    );
}

#[test]
fn compat_response_notifies_token_characteristic() {
    let rig = Rig::new(DeviceConfig::default());
    let stepper = StepperController::new(&rig.server, &rig.events, &rig.config);

    rig.send(&stepper, &format!(r#"{{"token":"{}","command":"PING"}}"#, rig.token()));

    assert_eq!(rig.response(), "PING");
    assert_eq!(
        rig.server.backend().notified(uuids::AUTH_TOKEN),
        vec![ZERO_SENTINEL.to_vec()]
    );
    assert!(rig.server.backend().notified(uuids::RUN_RESPONSE).is_empty());
}

#[test]
fn response_characteristic_mode_notifies_the_response() {
    let rig = Rig::new(DeviceConfig {
        response_notify: ResponseNotify::ResponseCharacteristic,
        ..DeviceConfig::default()
    });
    let stepper = StepperController::new(&rig.server, &rig.events, &rig.config);

    rig.send(&stepper, &format!(r#"{{"token":"{}","command":"PING"}}"#, rig.token()));

    assert_eq!(
        rig.server.backend().notified(uuids::RUN_RESPONSE),
        vec![b"PING".to_vec()]
    );
    assert!(rig.server.backend().notified(uuids::AUTH_TOKEN).is_empty());
}

#[test]
fn lenient_policy_echoes_but_never_actuates_on_bad_token() {
    let rig = Rig::new(DeviceConfig::default());
    let stepper = StepperController::new(&rig.server, &rig.events, &rig.config);

    rig.send(&stepper, r#"{"token":"deadbeef","command":"RUN"}"#);

    assert!(!stepper.snapshot().run);
    assert_eq!(rig.response(), "RUN");
    assert_eq!(
        rig.events
            .count(|e| matches!(e, SessionEvent::Command { token_valid: Some(false), .. })),
        1
    );
}

#[test]
fn strict_policy_answers_invalid_token() {
    let rig = Rig::new(DeviceConfig {
        token_policy: TokenPolicy::Strict,
        ..DeviceConfig::default()
    });
    let stepper = StepperController::new(&rig.server, &rig.events, &rig.config);

    rig.send(&stepper, r#"{"command":"RUN"}"#);

    assert!(!stepper.snapshot().run);
    assert_eq!(rig.response(), INVALID_TOKEN);
}

#[test]
fn stop_literal_halts_without_token() {
    let rig = Rig::new(DeviceConfig::default());
    let stepper = StepperController::new(&rig.server, &rig.events, &rig.config);
    stepper.set_run(1);

    rig.send(&stepper, "STOP");

    assert!(!stepper.snapshot().run);
    assert_eq!(rig.response(), "STOP");
}

#[test]
fn json_stop_is_never_gated() {
    let rig = Rig::new(DeviceConfig {
        token_policy: TokenPolicy::Strict,
        ..DeviceConfig::default()
    });
    let stepper = StepperController::new(&rig.server, &rig.events, &rig.config);
    stepper.set_run(1);

    rig.send(&stepper, r#"{"token":"stale","command":"STOP"}"#);

    assert!(!stepper.snapshot().run);
    assert_eq!(rig.response(), INVALID_TOKEN);
}

#[test]
fn set_with_double_encoded_info_updates_program() {
    let rig = Rig::new(DeviceConfig::default());
    let stepper = StepperController::new(&rig.server, &rig.events, &rig.config);

    let info = r#"{\"stimulationType\":\"TENS\",\"frequency\":80,\"pulseWidth\":150,\"onTime\":2.5}"#;
    let frame = format!(
        r#"{{"token":"{}","command":"SET","info":"{info}"}}"#,
        rig.token()
    );
    rig.send(&stepper, &frame);

    let program = rig.programs.get();
    assert_eq!(program.stimulation_type, StimulationType::Tens);
    assert_eq!(program.frequency_hz, 80);
    assert_eq!(program.pulse_width_us, 150);
    assert_eq!(program.on_time_ds, 25);
    assert_eq!(rig.response(), "SET");
    assert_eq!(rig.events.count(|e| *e == SessionEvent::ProgramUpdated), 1);
}

#[test]
fn invalid_program_is_rejected_and_kept() {
    let rig = Rig::new(DeviceConfig::default());
    let stepper = StepperController::new(&rig.server, &rig.events, &rig.config);
    let before = rig.programs.get();

    let frame = format!(
        r#"{{"token":"{}","command":"SET","info":{{"frequency":550}}}}"#,
        rig.token()
    );
    rig.send(&stepper, &frame);

    assert_eq!(rig.programs.get(), before);
    assert_eq!(
        rig.events
            .count(|e| *e == SessionEvent::ProgramRejected("frequency")),
        1
    );
}

#[test]
fn malformed_frame_is_dropped_and_channel_continues() {
    let rig = Rig::new(DeviceConfig::default());
    let stepper = StepperController::new(&rig.server, &rig.events, &rig.config);
    let mut channel = CommandChannel::new(
        &stepper,
        &rig.programs,
        &rig.events,
        &rig.config,
        &rig.session,
    );

    channel.push_chunk(b"{not json}\n");
    let good = format!("{{\"token\":\"{}\",\"command\":\"RUN\"}}\n", rig.token());
    channel.push_chunk(good.as_bytes());

    assert_eq!(
        rig.events
            .count(|e| matches!(e, SessionEvent::FrameDropped(Error::Command(_)))),
        1
    );
    assert!(stepper.snapshot().run);
}

#[test]
fn oversized_frame_reports_overflow_then_resyncs() {
    let rig = Rig::new(DeviceConfig {
        max_frame_len: 128,
        ..DeviceConfig::default()
    });
    let stepper = StepperController::new(&rig.server, &rig.events, &rig.config);
    let mut channel = CommandChannel::new(
        &stepper,
        &rig.programs,
        &rig.events,
        &rig.config,
        &rig.session,
    );

    for _ in 0..10 {
        channel.push_chunk(&[b'x'; 20]);
    }
    channel.push_chunk(b"tail\nSTOP\n");

    assert_eq!(
        rig.events.count(|e| *e
            == SessionEvent::FrameDropped(Error::Frame(FrameError::Overflow { limit: 128 }))),
        1
    );
    assert_eq!(rig.response(), "STOP");
}

#[test]
fn two_frames_in_one_write_are_handled_in_order() {
    let rig = Rig::new(DeviceConfig {
        response_notify: ResponseNotify::ResponseCharacteristic,
        ..DeviceConfig::default()
    });
    let stepper = StepperController::new(&rig.server, &rig.events, &rig.config);
    let mut channel = CommandChannel::new(
        &stepper,
        &rig.programs,
        &rig.events,
        &rig.config,
        &rig.session,
    );

    let t = rig.token();
    let both = format!(
        "{{\"token\":\"{t}\",\"command\":\"RUN\"}}\n{{\"token\":\"{t}\",\"command\":\"STOP\"}}\n"
    );
    channel.push_chunk(both.as_bytes());

    assert_eq!(
        rig.server.backend().notified(uuids::RUN_RESPONSE),
        vec![b"RUN".to_vec(), b"STOP".to_vec()]
    );
    assert!(!stepper.snapshot().run);
}
