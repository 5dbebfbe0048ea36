// ==========================================
// 后台任务测试（节拍 / 传感器订阅 / 计划订阅）
// ==========================================


use std::time::Duration;

use batching_plant::app::{ProcessTicker, ScheduleFeed, SensorFeed};
use batching_plant::domain::types::ControlMode;
use batching_plant::domain::WeightReading;
use batching_plant::engine::{AutoState, ProcessState};
use test_helpers::{create_seeded_state, schedule_row};

/// 轮询直到条件成立或超时
async fn wait_until<F: Fn() -> bool>(cond: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

#[tokio::test]
async fn test_ticker_drives_auto_sequence_to_completion() {
    let (_tmp, state) = create_seeded_state().expect("Failed to create state");
    let api = state.control_panel_api.clone();

    api.power_on();
    api.set_mode(ControlMode::Auto);
    api.set_req_no("A1");
    api.set_target_volume(3.0);
    assert!(api.start().accepted);

    let ticker = ProcessTicker::spawn_with_period(api.clone(), Duration::from_millis(10));
    let completed = wait_until(
        || api.process_state() == ProcessState::Auto(AutoState::Complete),
        Duration::from_secs(5),
    )
    .await;
    ticker.shutdown().await;

    assert!(completed, "auto sequence did not complete");
    assert_eq!(state.history_repo.list_by_req_no("A1").unwrap().len(), 1);
    let a1 = state.schedule_api.load_records().unwrap().remove(0);
    assert_eq!(a1.terkirim, "3.00");
}

#[tokio::test]
async fn test_ticker_shutdown_stops_ticks() {
    let (_tmp, state) = create_seeded_state().expect("Failed to create state");
    let api = state.control_panel_api.clone();

    api.power_on();
    api.set_req_no("A1");
    api.set_target_volume(2.0);
    assert!(api.start().accepted);

    let ticker = ProcessTicker::spawn_with_period(api.clone(), Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(50)).await;
    ticker.shutdown().await;

    let frozen = api.process_state();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(api.process_state(), frozen);
}

#[tokio::test]
async fn test_sensor_feed_overrides_simulation() {
    let (_tmp, state) = create_seeded_state().expect("Failed to create state");
    let api = state.control_panel_api.clone();
    let feed = SensorFeed::spawn(api.clone(), state.sensor_repo.subscribe());

    api.power_on();
    api.set_req_no("A1");
    api.set_target_volume(2.0);
    assert!(api.start().accepted);

    state
        .sensor_repo
        .write(&WeightReading {
            aggregate: 1400.0,
            air: 350.0,
            semen: 690.0,
        })
        .unwrap();

    let merged = wait_until(
        || batching_plant::api::StatusPanel::build(&api).channels.iter().any(|c| c.current == 690.0),
        Duration::from_secs(2),
    )
    .await;
    assert!(merged, "sensor reading was not merged");

    let done = api.stop().finalized.expect("batch should finalize");
    feed.shutdown().await;

    assert_eq!(done.entry.actual_weights.semen, 690.0);
    assert_eq!(done.entry.actual_weights.pasir1, 1400.0);
    assert_eq!(done.entry.deviations.semen, -10.0);
}

#[tokio::test]
async fn test_schedule_feed_unlocks_cancelled_row() {
    let (_tmp, state) = create_seeded_state().expect("Failed to create state");
    let api = state.control_panel_api.clone();
    let feed = ScheduleFeed::spawn(api.clone(), state.schedule_repo.subscribe());

    api.set_req_no("A1");
    assert!(api.job().locked);

    let mut cancelled = schedule_row("A1", "K225", 10.0, 0.0);
    cancelled.status = Some(batching_plant::ScheduleStatus::Batal);
    state.schedule_repo.save(&[cancelled]).unwrap();

    let unlocked = wait_until(|| !api.job().locked, Duration::from_secs(2)).await;
    feed.shutdown().await;
    assert!(unlocked, "job should unlock after the row is cancelled");
}
