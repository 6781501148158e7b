mod common;

use common::*;
use helpsathi::alert::{start_alert_loop, StatusObserver, StatusView};
use std::time::Duration;

async fn next(observer: &mut StatusObserver) -> Option<StatusView> {
    tokio::time::timeout(Duration::from_secs(1), observer.next_change())
        .await
        .expect("observer stalled")
}

#[tokio::test(start_paused = true)]
async fn observer_follows_start_and_stop() {
    let h = harness().build().await;
    let alerts = start_alert_loop(loop_cfg(), h.platform.clone(), h.store.clone());
    let mut observer = StatusObserver::attach(&alerts);

    let initial = observer.view();
    assert!(!initial.recurring_active);
    assert_eq!(initial.label(), "Recurring SMS: Inactive");
    assert!(!initial.show_stop_control());

    alerts.start();
    let view = next(&mut observer).await.unwrap();
    assert_eq!(view.label(), "Recurring SMS: Active");
    assert!(view.show_stop_control());

    alerts.stop();
    let view = next(&mut observer).await.unwrap();
    assert_eq!(view.label(), "Recurring SMS: Inactive");
    assert!(!view.show_stop_control());

    alerts.shutdown().await;
    assert_eq!(next(&mut observer).await, Some(StatusView::from_state(Default::default())));
    assert_eq!(next(&mut observer).await, None);
}

#[tokio::test(start_paused = true)]
async fn late_observer_sees_current_state() {
    let h = harness().build().await;
    let alerts = start_alert_loop(loop_cfg(), h.platform.clone(), h.store.clone());
    alerts.start();
    // Snapshot round-trip guarantees the start was processed
    alerts.snapshot().await.unwrap();

    let observer = StatusObserver::attach(&alerts);
    assert!(observer.view().recurring_active);
}
