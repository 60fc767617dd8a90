use api_client::{DamBackend, ThumbnailStatus};
use mocks::{sample_asset, ScriptedBackend};
use preview::ThumbnailState;
use std::sync::{Arc, Mutex};
use tasks::{PollConfig, PollController, PollOutcome};
use tokio::sync::Notify;
use tokio::time::{pause, sleep, Duration, Instant};

fn recorder() -> (Arc<Mutex<Vec<ThumbnailStatus>>>, impl FnMut(api_client::Asset) + Send + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (seen, move |asset: api_client::Asset| {
        sink.lock().unwrap().push(asset.thumbnail_status)
    })
}

#[tokio::test]
async fn test_polls_until_available() {
    pause();
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_asset(sample_asset("a1", "image/jpeg", ThumbnailStatus::Processing, 1));
    backend.push_asset(sample_asset("a1", "image/jpeg", ThumbnailStatus::Completed, 2));

    let initial = sample_asset("a1", "image/jpeg", ThumbnailStatus::Pending, 0);
    let (seen, on_update) = recorder();
    let started = Instant::now();
    let handle = PollController::start(
        backend.clone() as Arc<dyn DamBackend>,
        &initial,
        0,
        PollConfig::new(Duration::from_secs(3), None),
        on_update,
    );
    assert!(handle.is_active());

    let outcome = handle.finished().await;
    assert_eq!(outcome, PollOutcome::Settled(ThumbnailState::Available));
    assert_eq!(started.elapsed(), Duration::from_secs(6));
    assert_eq!(
        *seen.lock().unwrap(),
        vec![ThumbnailStatus::Processing, ThumbnailStatus::Completed]
    );
    assert_eq!(backend.call_count("get:"), 2);
}

#[tokio::test]
async fn test_terminal_initial_state_never_fetches() {
    pause();
    let backend = Arc::new(ScriptedBackend::new());
    for status in [ThumbnailStatus::Completed, ThumbnailStatus::Skipped] {
        let initial = sample_asset("a1", "image/jpeg", status, 0);
        let (seen, on_update) = recorder();
        let handle = PollController::start(
            backend.clone() as Arc<dyn DamBackend>,
            &initial,
            0,
            PollConfig::default(),
            on_update,
        );
        assert!(!handle.is_active());
        assert!(matches!(handle.finished().await, PollOutcome::Settled(_)));
        assert!(seen.lock().unwrap().is_empty());
    }
    assert_eq!(backend.call_count("get:"), 0);
}

#[tokio::test]
async fn test_failed_ticks_are_swallowed() {
    pause();
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_asset_error("a1", 500);
    backend.push_asset_error("a1", 502);
    backend.push_asset(sample_asset("a1", "image/jpeg", ThumbnailStatus::Completed, 1));

    let initial = sample_asset("a1", "image/jpeg", ThumbnailStatus::Processing, 0);
    let (seen, on_update) = recorder();
    let handle = PollController::start(
        backend.clone() as Arc<dyn DamBackend>,
        &initial,
        0,
        PollConfig::default(),
        on_update,
    );
    assert_eq!(
        handle.finished().await,
        PollOutcome::Settled(ThumbnailState::Available)
    );
    assert_eq!(*seen.lock().unwrap(), vec![ThumbnailStatus::Completed]);
    assert_eq!(backend.call_count("get:"), 3);
}

#[tokio::test]
async fn test_failed_with_retries_left_keeps_polling() {
    pause();
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_asset(sample_asset("a1", "image/jpeg", ThumbnailStatus::Failed, 1));
    backend.push_asset(sample_asset("a1", "image/jpeg", ThumbnailStatus::Processing, 2));
    backend.push_asset(sample_asset("a1", "image/jpeg", ThumbnailStatus::Completed, 3));

    let initial = sample_asset("a1", "image/jpeg", ThumbnailStatus::Processing, 0);
    let (seen, on_update) = recorder();
    let handle = PollController::start(
        backend.clone() as Arc<dyn DamBackend>,
        &initial,
        0,
        PollConfig::default(),
        on_update,
    );
    assert_eq!(
        handle.finished().await,
        PollOutcome::Settled(ThumbnailState::Available)
    );
    assert_eq!(seen.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_failed_without_retries_settles() {
    pause();
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_asset(sample_asset("a1", "image/jpeg", ThumbnailStatus::Failed, 1));

    let initial = sample_asset("a1", "image/jpeg", ThumbnailStatus::Processing, 0);
    let (_seen, on_update) = recorder();
    let handle = PollController::start(
        backend.clone() as Arc<dyn DamBackend>,
        &initial,
        2,
        PollConfig::default(),
        on_update,
    );
    assert_eq!(
        handle.finished().await,
        PollOutcome::Settled(ThumbnailState::Failed)
    );
}

#[tokio::test]
async fn test_max_polls_exhausts() {
    pause();
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_asset(sample_asset("a1", "image/jpeg", ThumbnailStatus::Pending, 0));

    let initial = sample_asset("a1", "image/jpeg", ThumbnailStatus::Pending, 0);
    let (seen, on_update) = recorder();
    let handle = PollController::start(
        backend.clone() as Arc<dyn DamBackend>,
        &initial,
        0,
        PollConfig::new(Duration::from_millis(500), Some(3)),
        on_update,
    );
    assert_eq!(handle.finished().await, PollOutcome::Exhausted);
    assert_eq!(backend.call_count("get:"), 3);
    assert_eq!(seen.lock().unwrap().len(), 3);
}

#[test]
fn test_interval_is_clamped() {
    let config = PollConfig::new(Duration::from_millis(10), Some(0));
    assert_eq!(config.interval, Duration::from_millis(250));
    assert_eq!(config.max_polls, None);
    assert_eq!(PollConfig::default().interval, Duration::from_millis(3000));
}

#[tokio::test]
async fn test_fetch_resolving_after_cancel_is_ignored() {
    pause();
    let gate = Arc::new(Notify::new());
    let backend = Arc::new(ScriptedBackend::gated(gate.clone()));
    backend.push_asset(sample_asset("a1", "image/jpeg", ThumbnailStatus::Completed, 1));
    let started = backend.fetch_started();

    let initial = sample_asset("a1", "image/jpeg", ThumbnailStatus::Pending, 0);
    let (seen, on_update) = recorder();
    let mut handle = PollController::start(
        backend.clone() as Arc<dyn DamBackend>,
        &initial,
        0,
        PollConfig::default(),
        on_update,
    );

    started.notified().await;
    handle.cancel();
    gate.notify_one();
    sleep(Duration::from_secs(30)).await;

    assert!(seen.lock().unwrap().is_empty());
    assert!(!handle.is_active());
    assert_eq!(handle.finished().await, PollOutcome::Cancelled);
}

#[tokio::test]
async fn test_dropping_handle_stops_polling() {
    pause();
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_asset(sample_asset("a1", "image/jpeg", ThumbnailStatus::Processing, 1));

    let initial = sample_asset("a1", "image/jpeg", ThumbnailStatus::Pending, 0);
    let (seen, on_update) = recorder();
    let handle = PollController::start(
        backend.clone() as Arc<dyn DamBackend>,
        &initial,
        0,
        PollConfig::new(Duration::from_secs(1), None),
        on_update,
    );
    sleep(Duration::from_millis(2500)).await;
    let polled = backend.call_count("get:");
    assert_eq!(polled, 2);

    drop(handle);
    sleep(Duration::from_secs(10)).await;
    assert_eq!(backend.call_count("get:"), polled);
    assert_eq!(seen.lock().unwrap().len(), polled);
}

#[tokio::test]
async fn test_switching_assets_cancels_previous() {
    pause();
    let backend = Arc::new(ScriptedBackend::new());
    backend.push_asset(sample_asset("a1", "image/jpeg", ThumbnailStatus::Processing, 1));
    backend.push_asset(sample_asset("a2", "image/jpeg", ThumbnailStatus::Processing, 1));
    backend.push_asset(sample_asset("a2", "image/jpeg", ThumbnailStatus::Completed, 2));

    let (seen_a1, on_a1) = recorder();
    let mut current = PollController::start(
        backend.clone() as Arc<dyn DamBackend>,
        &sample_asset("a1", "image/jpeg", ThumbnailStatus::Pending, 0),
        0,
        PollConfig::new(Duration::from_secs(1), None),
        on_a1,
    );
    sleep(Duration::from_millis(1500)).await;
    assert_eq!(current.asset_id(), "a1");

    let (seen_a2, on_a2) = recorder();
    current = PollController::start(
        backend.clone() as Arc<dyn DamBackend>,
        &sample_asset("a2", "image/jpeg", ThumbnailStatus::Pending, 0),
        0,
        PollConfig::new(Duration::from_secs(1), None),
        on_a2,
    );
    assert_eq!(current.asset_id(), "a2");
    assert_eq!(
        current.finished().await,
        PollOutcome::Settled(ThumbnailState::Available)
    );
    assert_eq!(seen_a1.lock().unwrap().len(), 1);
    assert_eq!(seen_a2.lock().unwrap().len(), 2);
    assert_eq!(backend.call_count("get:a1"), 1);
}
