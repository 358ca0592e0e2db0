//! Integration tests for the stepper controller and its device-lifetime
//! tasks, driven through the set characteristics as a peer would.

use febina::app::events::SessionEvent;
use febina::config::DeviceConfig;
use febina::gatt::codec::{decode_i16, encode_i16};
use febina::gatt::uuids;
use febina::stepper::tasks::{control_loop, writer_task};
use febina::stepper::{Setting, StepperController};
use futures_lite::future;

use crate::mock_ble::{self, MockBackend, PEER, RecordingSink};

fn decoded(backend: &MockBackend, uuid: u16) -> Vec<i16> {
    backend
        .notified(uuid)
        .iter()
        .filter_map(|v| decode_i16(v))
        .collect()
}

#[test]
fn peer_writes_drive_a_full_cycle() {
    let config = DeviceConfig {
        initial_step: 2,
        initial_count: 10,
        writer_yield_ms: 1,
        control_tick_ms: 2,
        ..DeviceConfig::default()
    };
    let server = mock_ble::server(&config);
    server.on_connect(PEER);
    let events = RecordingSink::new();
    let stepper = StepperController::new(&server, &events, &config);

    let executor: edge_executor::LocalExecutor<'_, 8> = edge_executor::LocalExecutor::new();
    for setting in Setting::ALL {
        executor
            .spawn(writer_task(&stepper, setting, config.writer_yield_ms))
            .detach();
    }
    executor
        .spawn(control_loop(&stepper, config.control_tick_ms))
        .detach();

    server
        .on_write(uuids::STEPPER_SET_COUNT, &encode_i16(3))
        .unwrap();
    server.on_write(uuids::STEPPER_SET_RUN, &encode_i16(1)).unwrap();

    future::block_on(executor.run(mock_ble::eventually(|| {
        events.count(|e| matches!(e, SessionEvent::RunChanged { run: false, .. })) == 1
    })));

    let backend = server.backend();
    assert_eq!(decoded(backend, uuids::STEPPER_GET_COUNT), vec![3]);
    assert_eq!(decoded(backend, uuids::STEPPER_GET_STATE), vec![0, 2, 4]);
    assert_eq!(decoded(backend, uuids::STEPPER_GET_RUN), vec![1, 0]);
    let s = stepper.snapshot();
    assert_eq!((s.state, s.current_step, s.run), (6, 3, false));
}

#[test]
fn pause_keeps_progress_and_resume_continues() {
    let config = DeviceConfig {
        initial_step: 1,
        initial_count: 5,
        ..DeviceConfig::default()
    };
    let server = mock_ble::server(&config);
    server.on_connect(PEER);
    let events = RecordingSink::new();
    let stepper = StepperController::new(&server, &events, &config);

    stepper.apply_write(Setting::Run, &encode_i16(1)).unwrap();
    stepper.tick();
    stepper.tick();
    stepper.apply_write(Setting::Run, &encode_i16(0)).unwrap();
    stepper.tick();
    assert_eq!(stepper.snapshot().current_step, 2);

    stepper.apply_write(Setting::Run, &encode_i16(1)).unwrap();
    stepper.tick();
    assert_eq!(
        decoded(server.backend(), uuids::STEPPER_GET_STATE),
        vec![0, 1, 2]
    );
    assert_eq!(stepper.snapshot().current_step, 3);
}

#[test]
fn finished_cycle_restarts_on_next_run() {
    let config = DeviceConfig {
        initial_step: 1,
        initial_count: 2,
        ..DeviceConfig::default()
    };
    let server = mock_ble::server(&config);
    server.on_connect(PEER);
    let events = RecordingSink::new();
    let stepper = StepperController::new(&server, &events, &config);

    stepper.set_run(1);
    stepper.tick();
    stepper.tick();
    assert!(!stepper.snapshot().run);

    stepper.set_run(1);
    let s = stepper.snapshot();
    assert!(s.run);
    assert_eq!(s.current_step, 0);
}

#[test]
fn stale_reset_values_are_ignored() {
    let config = DeviceConfig::default();
    let server = mock_ble::server(&config);
    let events = RecordingSink::new();
    let stepper = StepperController::new(&server, &events, &config);

    stepper.set_run(1);
    stepper.tick();
    stepper.tick();

    stepper.apply_write(Setting::Reset, &encode_i16(1)).unwrap();
    assert_eq!(stepper.snapshot().current_step, 0);
    assert_eq!(stepper.snapshot().reset_counter, 1);

    stepper.tick();
    stepper.apply_write(Setting::Reset, &encode_i16(1)).unwrap();
    assert_eq!(stepper.snapshot().current_step, 1, "replayed reset ignored");
    assert_eq!(
        events.count(|e| matches!(e, SessionEvent::StepperReset { .. })),
        1
    );
}

#[test]
fn state_saturates_instead_of_wrapping() {
    let config = DeviceConfig {
        initial_state: i16::MAX - 1,
        initial_step: 10,
        initial_count: 3,
        ..DeviceConfig::default()
    };
    let server = mock_ble::server(&config);
    let events = RecordingSink::new();
    let stepper = StepperController::new(&server, &events, &config);

    stepper.set_run(1);
    for _ in 0..3 {
        stepper.tick();
    }
    assert_eq!(stepper.snapshot().state, i16::MAX);
}

#[test]
fn failed_notification_does_not_block_state_change() {
    let config = DeviceConfig::default();
    let server = mock_ble::server(&config);
    server.on_connect(PEER);
    server
        .backend()
        .fail_notify
        .store(true, std::sync::atomic::Ordering::Relaxed);
    let events = RecordingSink::new();
    let stepper = StepperController::new(&server, &events, &config);

    stepper.apply_write(Setting::Step, &encode_i16(4)).unwrap();
    assert_eq!(stepper.snapshot().step, 4);
    assert_eq!(decode_i16(&server.stepper.get_step.value()), Some(4));
}

#[test]
fn control_timer_fires_on_host() {
    let start = std::time::Instant::now();
    future::block_on(async_io_mini::Timer::after(std::time::Duration::from_millis(5)));
    assert!(start.elapsed() >= std::time::Duration::from_millis(5));
}
