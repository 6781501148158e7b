mod common;

use common::*;
use helpsathi::alert::{AlertEvent, LoopState};
use helpsathi::config::Config;
use helpsathi::service::AlertService;
use std::time::Duration;

async fn service_for(h: &Harness) -> AlertService {
    let mut config = Config::default();
    config.storage.data_dir = h.tmp.path().to_str().unwrap().to_string();
    AlertService::with_platform(config, h.platform.clone())
        .await
        .unwrap()
}

fn collect_events(rx: &mut tokio::sync::broadcast::Receiver<AlertEvent>) -> Vec<AlertEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = rx.try_recv() {
        seen.push(event);
    }
    seen
}

#[tokio::test(start_paused = true)]
async fn volume_presses_on_input_start_the_loop() {
    let mut h = harness().build().await;
    h.store.save_contacts(&[asha()]).await.unwrap();
    let mut service = service_for(&h).await;
    let mut events = service.alerts().subscribe();

    let input: &[u8] = b"VOLUME_UP\nvolume_down\nVOLUME_UP\n";
    service
        .run_until(input, tokio::time::sleep(Duration::from_secs(10)))
        .await
        .unwrap();

    assert!(next_sent(&mut h.sent, Duration::from_secs(1)).await.is_some());
    assert_eq!(
        collect_events(&mut events),
        vec![AlertEvent::Started, AlertEvent::Stopped]
    );
    assert_eq!(service.alerts().state(), LoopState::Idle);
}

#[tokio::test(start_paused = true)]
async fn end_of_input_keeps_the_loop_running() {
    let mut h = harness().build().await;
    h.store.save_contacts(&[asha()]).await.unwrap();
    let mut service = service_for(&h).await;

    let input: &[u8] = b"START_RECURRING_ALERT\n";
    service
        .run_until(input, tokio::time::sleep(Duration::from_secs(301)))
        .await
        .unwrap();

    assert!(next_sent(&mut h.sent, Duration::from_secs(1)).await.is_some());
    assert!(next_sent(&mut h.sent, Duration::from_secs(1)).await.is_some());
}

#[tokio::test(start_paused = true)]
async fn send_alert_line_sends_once_and_stays_idle() {
    let mut h = harness().no_location().build().await;
    h.store.save_contacts(&[asha(), ravi()]).await.unwrap();
    let mut service = service_for(&h).await;
    let mut events = service.alerts().subscribe();

    let input: &[u8] = b"# one-shot\nSEND_ALERT\nSTATUS\n";
    service
        .run_until(input, tokio::time::sleep(Duration::from_secs(900)))
        .await
        .unwrap();

    let mut numbers = Vec::new();
    while let Ok(sent) = h.sent.try_recv() {
        numbers.push(sent.number);
    }
    assert_eq!(numbers, vec!["+15550001", "+15550002"]);
    // Only the shutdown notice; the recurring loop never started
    assert_eq!(collect_events(&mut events), vec![AlertEvent::Stopped]);
    assert_eq!(h.presence.shown(), 0);
}

#[tokio::test(start_paused = true)]
async fn stop_line_ends_the_loop() {
    let h = harness().build().await;
    let mut service = service_for(&h).await;
    let mut events = service.alerts().subscribe();

    let input: &[u8] = b"START_RECURRING_ALERT\nSTOP_RECURRING_ALERT\nSTOP_RECURRING_ALERT\n";
    service
        .run_until(input, tokio::time::sleep(Duration::from_secs(5)))
        .await
        .unwrap();

    assert_eq!(
        collect_events(&mut events),
        vec![AlertEvent::Started, AlertEvent::Stopped, AlertEvent::Stopped]
    );
    assert_eq!(h.presence.shown(), 1);
    assert_eq!(h.presence.hidden(), 1);
}

#[tokio::test(start_paused = true)]
async fn key_presses_are_handled_while_a_one_shot_waits_for_a_fix() {
    let h = harness()
        .location(SlowLocation {
            delay: Duration::from_secs(25),
            fix: HOME,
        })
        .build()
        .await;
    h.store.save_contacts(&[asha()]).await.unwrap();
    let mut service = service_for(&h).await;
    let mut events = service.alerts().subscribe();

    let input: &[u8] = b"SEND_ALERT\nVOLUME_UP\nVOLUME_UP\nVOLUME_UP\n";
    let began = tokio::time::Instant::now();
    let started_after = async {
        let event = tokio::time::timeout(Duration::from_secs(60), events.recv()).await;
        assert!(matches!(event, Ok(Ok(AlertEvent::Started))));
        began.elapsed()
    };
    let (result, elapsed) = tokio::join!(
        service.run_until(input, tokio::time::sleep(Duration::from_secs(60))),
        started_after
    );
    result.unwrap();

    // Debounce window only; not the 25 s fix
    assert!(elapsed < Duration::from_secs(2), "started after {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn shutdown_is_not_blocked_by_an_unanswered_one_shot() {
    let h = harness().location(HangingLocation).build().await;
    h.store.save_contacts(&[asha()]).await.unwrap();
    let mut config = Config::default();
    config.storage.data_dir = h.tmp.path().to_str().unwrap().to_string();
    config.alert.location_timeout_secs = 0;
    let mut service = AlertService::with_platform(config, h.platform.clone())
        .await
        .unwrap();

    let input: &[u8] = b"SEND_ALERT\n";
    tokio::time::timeout(
        Duration::from_secs(60),
        service.run_until(input, tokio::time::sleep(Duration::from_secs(5))),
    )
    .await
    .expect("service wedged behind the one-shot")
    .unwrap();
    assert_eq!(service.alerts().state(), LoopState::Idle);
}

#[cfg(target_os = "linux")]
async fn write_fifo(path: &std::path::Path, text: &str) {
    use tokio::io::AsyncWriteExt;
    let mut writer = tokio::net::unix::pipe::OpenOptions::new()
        .read_write(true)
        .open_sender(path)
        .unwrap();
    writer.write_all(text.as_bytes()).await.unwrap();
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn fifo_input_survives_writers_coming_and_going() {
    let h = harness().build().await;
    let fifo = h.tmp.path().join("input.fifo");
    let made = std::process::Command::new("mkfifo")
        .arg(&fifo)
        .status()
        .unwrap();
    assert!(made.success());

    let mut service = service_for(&h).await;
    let mut events = service.alerts().subscribe();
    let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();

    let driver = async {
        // First writer: the trigger, then disconnect
        write_fifo(&fifo, "VOLUME_UP\nVOLUME_UP\nVOLUME_UP\n").await;
        let first = tokio::time::timeout(Duration::from_secs(5), events.recv()).await;
        assert!(matches!(first, Ok(Ok(AlertEvent::Started))));

        // A later writer still reaches the service
        write_fifo(&fifo, "STOP_RECURRING_ALERT\n").await;
        let second = tokio::time::timeout(Duration::from_secs(5), events.recv()).await;
        assert!(matches!(second, Ok(Ok(AlertEvent::Stopped))));
        let _ = done_tx.send(());
    };
    let shutdown = async {
        let _ = done_rx.await;
    };
    let (result, ()) = tokio::join!(service.run_fifo_until(&fifo, shutdown), driver);
    result.unwrap();
}

#[tokio::test]
async fn missing_fifo_is_reported() {
    let h = harness().build().await;
    let mut service = service_for(&h).await;
    let absent = h.tmp.path().join("no-such.fifo");
    assert!(service
        .run_fifo_until(&absent, std::future::pending())
        .await
        .is_err());
    service.shutdown().await;
}
