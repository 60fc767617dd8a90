use api_client::{ActionFailure, Asset, AssetMetrics, AssetPage, DamBackend, Permissions, ThumbnailSize, ThumbnailStatus};
use iced::Application;
use mocks::{sample_asset, sample_field, ScriptedBackend};
use preview::PreviewFrame;
use serial_test::serial;
use std::path::Path;
use std::sync::Arc;
use tasks::{BatchCall, BatchFailure, BatchReport, Loadable};
use tempfile::tempdir;
use ui::{AppConfig, AssetDeskUI, DrawerAction, DrawerMessage, DrawerView, EditorMessage, EditorPhase, Message, UiFlags};

const EDITOR: Permissions = Permissions {
    can_edit: true,
    is_admin: false,
};
const ADMIN: Permissions = Permissions {
    can_edit: true,
    is_admin: true,
};
const VIEWER: Permissions = Permissions {
    can_edit: false,
    is_admin: false,
};

fn flags(backend: Arc<ScriptedBackend>, dir: &Path, permissions: Permissions) -> UiFlags {
    UiFlags {
        backend,
        config: AppConfig {
            cache_path: dir.to_path_buf(),
            ..AppConfig::default()
        },
        config_path: Some(dir.join("config")),
        permissions,
    }
}

fn page(assets: Vec<Asset>) -> AssetPage {
    AssetPage {
        total: assets.len() as u64,
        data: assets,
        current_page: 1,
        last_page: 1,
    }
}

fn library() -> Vec<Asset> {
    vec![
        sample_asset("img1", "image/jpeg", ThumbnailStatus::Completed, 0),
        sample_asset("pdf1", "application/pdf", ThumbnailStatus::Skipped, 0),
        sample_asset("vid1", "video/mp4", ThumbnailStatus::Skipped, 0),
        sample_asset("img2", "image/png", ThumbnailStatus::Processing, 0),
    ]
}

fn loaded_ui(dir: &Path, permissions: Permissions) -> (AssetDeskUI, Arc<ScriptedBackend>) {
    let backend = Arc::new(ScriptedBackend::new());
    let (mut ui, _) = AssetDeskUI::new(flags(backend.clone(), dir, permissions));
    let _ = ui.update(Message::PageLoaded(Ok(page(library()))));
    (ui, backend)
}

#[tokio::test]
#[serial]
async fn test_initial_state() {
    let dir = tempdir().unwrap();
    let backend = Arc::new(ScriptedBackend::new());
    let (ui, _) = AssetDeskUI::new(flags(backend, dir.path(), EDITOR));
    assert_eq!(ui.asset_count(), 0);
    assert!(ui.is_loading());
    assert_eq!(ui.top_surface(), "Grid");
}

#[tokio::test]
#[serial]
async fn test_page_load_failure_is_reported_and_logged() {
    let dir = tempdir().unwrap();
    let backend = Arc::new(ScriptedBackend::new());
    let (mut ui, _) = AssetDeskUI::new(flags(backend, dir.path(), EDITOR));
    let _ = ui.update(Message::PageLoaded(Err("HTTP 500".into())));
    assert!(!ui.is_loading());
    assert_eq!(ui.error_count(), 1);
    let log = std::fs::read_to_string(dir.path().join("ui_errors.log")).unwrap();
    assert!(log.contains("HTTP 500"));

    let _ = ui.update(Message::DismissError(0));
    assert_eq!(ui.error_count(), 0);
}

#[tokio::test]
#[serial]
async fn test_open_and_close_drawer() {
    let dir = tempdir().unwrap();
    let (mut ui, backend) = loaded_ui(dir.path(), EDITOR);
    assert_eq!(ui.asset_count(), 4);

    let _ = ui.update(Message::OpenAsset("img1".into()));
    assert_eq!(ui.top_surface(), "Drawer");
    let drawer = ui.drawer().unwrap();
    assert_eq!(drawer.asset().id, "img1");
    // the video is not previewable and stays out of the carousel
    assert_eq!(drawer.carousel().len(), 3);
    assert!(!drawer.is_polling());
    assert!(matches!(drawer.frame(), PreviewFrame::Image { fade_in: false, .. }));
    assert!(backend.calls().is_empty());

    let _ = ui.update(Message::EscapePressed);
    assert_eq!(ui.top_surface(), "Grid");
    assert!(ui.drawer().is_none());
}

#[tokio::test]
#[serial]
async fn test_polled_snapshot_fades_in_without_touching_grid() {
    let dir = tempdir().unwrap();
    let (mut ui, _) = loaded_ui(dir.path(), EDITOR);

    let _ = ui.update(Message::OpenAsset("img2".into()));
    let drawer = ui.drawer().unwrap();
    assert_eq!(drawer.frame(), PreviewFrame::InProgress);
    assert!(drawer.is_polling());

    let generation = drawer.poll_generation();
    let completed = sample_asset("img2", "image/png", ThumbnailStatus::Completed, 1);
    let _ = ui.update(Message::Drawer(DrawerMessage::Polled(generation, completed)));
    let drawer = ui.drawer().unwrap();
    assert_eq!(
        drawer.frame(),
        PreviewFrame::Image {
            url: "https://cdn.test/img2/thumb.jpg".into(),
            fade_in: true
        }
    );
    assert!(drawer.is_animating());
    assert_eq!(ui.assets()[3].thumbnail_status, ThumbnailStatus::Processing);

    for _ in 0..12 {
        let _ = ui.update(Message::Drawer(DrawerMessage::FadeTick));
    }
    assert!(!ui.drawer().unwrap().is_animating());
}

#[tokio::test]
#[serial]
async fn test_snapshot_for_other_asset_is_ignored() {
    let dir = tempdir().unwrap();
    let (mut ui, _) = loaded_ui(dir.path(), EDITOR);
    let _ = ui.update(Message::OpenAsset("img2".into()));

    let generation = ui.drawer().unwrap().poll_generation();
    let other = sample_asset("img1", "image/jpeg", ThumbnailStatus::Failed, 5);
    let _ = ui.update(Message::Drawer(DrawerMessage::Polled(generation, other)));
    assert_eq!(ui.drawer().unwrap().frame(), PreviewFrame::InProgress);
}

#[tokio::test]
#[serial]
async fn test_generate_hides_button_until_answer() {
    let dir = tempdir().unwrap();
    let (mut ui, _) = loaded_ui(dir.path(), EDITOR);
    let _ = ui.update(Message::OpenAsset("pdf1".into()));
    let now = std::time::Instant::now();
    assert!(ui.drawer().unwrap().affordances(EDITOR, now).show_generate);

    let _ = ui.update(Message::Drawer(DrawerMessage::Generate));
    let drawer = ui.drawer().unwrap();
    assert_eq!(drawer.view_state(), &DrawerView::Busy(DrawerAction::Generate));
    assert!(!drawer.affordances(EDITOR, std::time::Instant::now()).show_generate);

    let _ = ui.update(Message::Drawer(DrawerMessage::ActionFinished(
        DrawerAction::Generate,
        "pdf1".into(),
        Err(ActionFailure::AlreadyInProgress),
    )));
    let drawer = ui.drawer().unwrap();
    assert_eq!(drawer.view_state(), &DrawerView::Details);
    assert_eq!(drawer.action_error(), Some(&ActionFailure::AlreadyInProgress));
    assert!(drawer.affordances(EDITOR, std::time::Instant::now()).show_generate);
}

#[tokio::test]
#[serial]
async fn test_successful_generate_keeps_skipped_state_and_polls() {
    let dir = tempdir().unwrap();
    let (mut ui, _) = loaded_ui(dir.path(), EDITOR);
    let _ = ui.update(Message::OpenAsset("pdf1".into()));
    assert!(!ui.drawer().unwrap().is_polling());

    let _ = ui.update(Message::Drawer(DrawerMessage::Generate));
    let _ = ui.update(Message::Drawer(DrawerMessage::ActionFinished(
        DrawerAction::Generate,
        "pdf1".into(),
        Ok(()),
    )));
    let drawer = ui.drawer().unwrap();
    assert!(drawer.is_polling());
    assert!(matches!(drawer.frame(), PreviewFrame::Placeholder(_)));
    // still guarded until the server reports a new status
    assert!(!drawer.affordances(EDITOR, std::time::Instant::now()).show_generate);

    let generation = drawer.poll_generation();
    let processing = sample_asset("pdf1", "application/pdf", ThumbnailStatus::Processing, 1);
    let _ = ui.update(Message::Drawer(DrawerMessage::Polled(generation, processing)));
    assert_eq!(ui.drawer().unwrap().frame(), PreviewFrame::InProgress);
}

#[tokio::test]
#[serial]
async fn test_viewer_cannot_trigger_actions() {
    let dir = tempdir().unwrap();
    let (mut ui, backend) = loaded_ui(dir.path(), VIEWER);
    let _ = ui.update(Message::OpenAsset("pdf1".into()));
    let _ = ui.update(Message::Drawer(DrawerMessage::Generate));
    assert_eq!(ui.drawer().unwrap().view_state(), &DrawerView::Details);
    assert_eq!(backend.call_count("generate"), 0);

    let _ = ui.update(Message::FieldIdChanged("7".into()));
    let _ = ui.update(Message::OpenFieldEditor);
    assert!(ui.editor().is_none());
    assert_eq!(ui.error_count(), 1);
}

#[tokio::test]
#[serial]
async fn test_retry_counts_and_resets_with_drawer() {
    let dir = tempdir().unwrap();
    let backend = Arc::new(ScriptedBackend::new());
    let (mut ui, _) = AssetDeskUI::new(flags(backend, dir.path(), EDITOR));
    let failed = sample_asset("img9", "image/jpeg", ThumbnailStatus::Failed, 0);
    let _ = ui.update(Message::PageLoaded(Ok(page(vec![failed]))));
    let _ = ui.update(Message::OpenAsset("img9".into()));
    assert!(matches!(ui.drawer().unwrap().frame(), PreviewFrame::Retry { .. }));

    let _ = ui.update(Message::Drawer(DrawerMessage::Retry));
    assert_eq!(ui.drawer().unwrap().ui_retry_count(), 1);
    assert_eq!(
        ui.drawer().unwrap().view_state(),
        &DrawerView::Busy(DrawerAction::Retry)
    );
    // a second click while the first is in flight is ignored
    let _ = ui.update(Message::Drawer(DrawerMessage::Retry));
    assert_eq!(ui.drawer().unwrap().ui_retry_count(), 1);

    let _ = ui.update(Message::CloseDrawer);
    let _ = ui.update(Message::OpenAsset("img9".into()));
    assert_eq!(ui.drawer().unwrap().ui_retry_count(), 0);
}

#[tokio::test]
#[serial]
async fn test_accepted_retry_stays_guarded_until_status_moves() {
    let dir = tempdir().unwrap();
    let backend = Arc::new(ScriptedBackend::new());
    let (mut ui, _) = AssetDeskUI::new(flags(backend.clone(), dir.path(), EDITOR));
    let failed = sample_asset("img9", "image/jpeg", ThumbnailStatus::Failed, 0);
    let _ = ui.update(Message::PageLoaded(Ok(page(vec![failed]))));
    let _ = ui.update(Message::OpenAsset("img9".into()));

    let _ = ui.update(Message::Drawer(DrawerMessage::Retry));
    let _ = ui.update(Message::Drawer(DrawerMessage::ActionFinished(
        DrawerAction::Retry,
        "img9".into(),
        Ok(()),
    )));
    let drawer = ui.drawer().unwrap();
    assert_eq!(drawer.view_state(), &DrawerView::Details);
    assert!(!drawer.affordances(EDITOR, std::time::Instant::now()).show_retry);

    // no second request while the first one has not shown up in a snapshot
    let _ = ui.update(Message::Drawer(DrawerMessage::Retry));
    let drawer = ui.drawer().unwrap();
    assert_eq!(drawer.ui_retry_count(), 1);
    assert_eq!(drawer.view_state(), &DrawerView::Details);

    let generation = drawer.poll_generation();
    let processing = sample_asset("img9", "image/jpeg", ThumbnailStatus::Processing, 1);
    let _ = ui.update(Message::Drawer(DrawerMessage::Polled(generation, processing)));
    let failed_again = sample_asset("img9", "image/jpeg", ThumbnailStatus::Failed, 2);
    let _ = ui.update(Message::Drawer(DrawerMessage::Polled(generation, failed_again)));
    assert!(ui.drawer().unwrap().affordances(EDITOR, std::time::Instant::now()).show_retry);
}

#[tokio::test]
#[serial]
async fn test_rejected_retry_releases_guard() {
    let dir = tempdir().unwrap();
    let backend = Arc::new(ScriptedBackend::new());
    let (mut ui, _) = AssetDeskUI::new(flags(backend, dir.path(), EDITOR));
    let failed = sample_asset("img9", "image/jpeg", ThumbnailStatus::Failed, 0);
    let _ = ui.update(Message::PageLoaded(Ok(page(vec![failed]))));
    let _ = ui.update(Message::OpenAsset("img9".into()));

    let _ = ui.update(Message::Drawer(DrawerMessage::Retry));
    let _ = ui.update(Message::Drawer(DrawerMessage::ActionFinished(
        DrawerAction::Retry,
        "img9".into(),
        Err(ActionFailure::AlreadyInProgress),
    )));
    let drawer = ui.drawer().unwrap();
    assert_eq!(drawer.action_error(), Some(&ActionFailure::AlreadyInProgress));
    assert!(drawer.affordances(EDITOR, std::time::Instant::now()).show_retry);
}

#[tokio::test]
#[serial]
async fn test_snapshot_from_replaced_poll_is_dropped() {
    let dir = tempdir().unwrap();
    let (mut ui, _) = loaded_ui(dir.path(), EDITOR);
    let _ = ui.update(Message::OpenAsset("img2".into()));
    let stale_generation = ui.drawer().unwrap().poll_generation();

    let _ = ui.update(Message::CloseDrawer);
    let _ = ui.update(Message::OpenAsset("img2".into()));
    let generation = ui.drawer().unwrap().poll_generation();
    assert_ne!(generation, stale_generation);

    // queued by the first drawer's poll before it was cancelled
    let stale = sample_asset("img2", "image/png", ThumbnailStatus::Completed, 1);
    let _ = ui.update(Message::Drawer(DrawerMessage::Polled(stale_generation, stale)));
    assert_eq!(ui.drawer().unwrap().frame(), PreviewFrame::InProgress);

    let completed = sample_asset("img2", "image/png", ThumbnailStatus::Completed, 2);
    let _ = ui.update(Message::Drawer(DrawerMessage::Polled(generation, completed)));
    assert!(matches!(ui.drawer().unwrap().frame(), PreviewFrame::Image { .. }));
}

#[tokio::test]
#[serial]
async fn test_action_answer_for_previous_asset_is_dropped() {
    let dir = tempdir().unwrap();
    let (mut ui, _) = loaded_ui(dir.path(), EDITOR);
    let _ = ui.update(Message::OpenAsset("img1".into()));
    let _ = ui.update(Message::Drawer(DrawerMessage::ActionFinished(
        DrawerAction::Generate,
        "pdf1".into(),
        Err(ActionFailure::PermissionDenied),
    )));
    assert!(ui.drawer().unwrap().action_error().is_none());
}

#[tokio::test]
#[serial]
async fn test_metrics_for_stale_asset_are_dropped() {
    let dir = tempdir().unwrap();
    let (mut ui, _) = loaded_ui(dir.path(), EDITOR);
    let _ = ui.update(Message::OpenAsset("img1".into()));
    assert!(ui.drawer().unwrap().metrics().is_loading());

    let metrics = AssetMetrics { views: 12, downloads: 3 };
    let _ = ui.update(Message::Drawer(DrawerMessage::MetricsLoaded("pdf1".into(), Ok(metrics))));
    assert!(ui.drawer().unwrap().metrics().is_loading());

    let _ = ui.update(Message::Drawer(DrawerMessage::MetricsLoaded("img1".into(), Ok(metrics))));
    assert_eq!(ui.drawer().unwrap().metrics(), &Loadable::Loaded(metrics));
}

#[tokio::test]
#[serial]
async fn test_carousel_first_click_wins() {
    let dir = tempdir().unwrap();
    let (mut ui, _) = loaded_ui(dir.path(), EDITOR);
    let _ = ui.update(Message::OpenAsset("img1".into()));

    let _ = ui.update(Message::Drawer(DrawerMessage::Next));
    let _ = ui.update(Message::Drawer(DrawerMessage::Next));
    assert_eq!(ui.drawer().unwrap().carousel().current(), Some("pdf1"));
    assert!(ui.drawer().unwrap().carousel().is_transitioning());

    // a stale answer for an id that is no longer current changes nothing
    let stale = sample_asset("img2", "image/png", ThumbnailStatus::Processing, 0);
    let _ = ui.update(Message::Drawer(DrawerMessage::AssetLoaded("img2".into(), Ok(stale))));
    assert_eq!(ui.drawer().unwrap().asset().id, "img1");

    let fresh = sample_asset("pdf1", "application/pdf", ThumbnailStatus::Skipped, 3);
    let _ = ui.update(Message::Drawer(DrawerMessage::AssetLoaded("pdf1".into(), Ok(fresh))));
    let _ = ui.update(Message::Drawer(DrawerMessage::TransitionFinished));
    let drawer = ui.drawer().unwrap();
    assert_eq!(drawer.asset().id, "pdf1");
    assert!(!drawer.carousel().is_transitioning());
    assert!(drawer.metrics().is_loading());

    let _ = ui.update(Message::Drawer(DrawerMessage::Previous));
    assert_eq!(ui.drawer().unwrap().carousel().current(), Some("img1"));
}

#[tokio::test]
#[serial]
async fn test_regenerate_styles_form_is_admin_only() {
    let dir = tempdir().unwrap();
    let (mut ui, _) = loaded_ui(dir.path(), EDITOR);
    let _ = ui.update(Message::OpenAsset("img1".into()));
    let _ = ui.update(Message::Drawer(DrawerMessage::ShowRegenerateStyles));
    assert_eq!(ui.drawer().unwrap().view_state(), &DrawerView::Details);

    let (mut ui, _) = loaded_ui(dir.path(), ADMIN);
    let _ = ui.update(Message::OpenAsset("img1".into()));
    let _ = ui.update(Message::Drawer(DrawerMessage::ShowRegenerateStyles));
    let _ = ui.update(Message::Drawer(DrawerMessage::ToggleStyle(ThumbnailSize::Medium)));
    let _ = ui.update(Message::Drawer(DrawerMessage::ToggleForceImagick));
    assert_eq!(
        ui.drawer().unwrap().view_state(),
        &DrawerView::RegenerateStyles {
            styles: vec![ThumbnailSize::Thumb, ThumbnailSize::Large],
            force_imagick: true,
        }
    );

    // Escape closes the form before the drawer
    let _ = ui.update(Message::EscapePressed);
    assert_eq!(ui.drawer().unwrap().view_state(), &DrawerView::Details);
    let _ = ui.update(Message::EscapePressed);
    assert!(ui.drawer().is_none());
}

#[tokio::test]
#[serial]
async fn test_metadata_editor_flow() {
    let dir = tempdir().unwrap();
    let (mut ui, backend) = loaded_ui(dir.path(), EDITOR);
    let (field, categories) = sample_field(7);
    backend.set_field(field, categories);

    let _ = ui.update(Message::FieldIdChanged("seven".into()));
    let _ = ui.update(Message::OpenFieldEditor);
    assert!(ui.editor().is_none());
    assert_eq!(ui.error_count(), 1);

    let _ = ui.update(Message::FieldIdChanged("7".into()));
    let _ = ui.update(Message::OpenFieldEditor);
    assert_eq!(ui.top_surface(), "FieldEditor");
    assert_eq!(ui.editor().unwrap().phase(), &EditorPhase::Loading);

    let data = tasks::load_field_editor(backend.clone() as Arc<dyn DamBackend>, 7).await;
    let _ = ui.update(Message::Editor(EditorMessage::Loaded(data)));
    assert_eq!(ui.editor().unwrap().phase(), &EditorPhase::Editing);

    let _ = ui.update(Message::Editor(EditorMessage::ToggleCategory(2)));
    let _ = ui.update(Message::Editor(EditorMessage::NewOptionChanged("Press Kit".into())));
    let _ = ui.update(Message::Editor(EditorMessage::AddOption));
    let edit = ui.editor().unwrap().edit().unwrap();
    assert!(edit.enabled.contains(&2));
    assert_eq!(edit.field.options.last().unwrap().value, "press_kit");

    let _ = ui.update(Message::Editor(EditorMessage::Submit));
    assert_eq!(ui.editor().unwrap().phase(), &EditorPhase::Saving);

    let failed = BatchReport {
        attempted: vec![BatchCall::UpdateField, BatchCall::Unsuppress(2)],
        failures: vec![BatchFailure {
            call: BatchCall::Unsuppress(2),
            message: "HTTP 500".into(),
        }],
    };
    let _ = ui.update(Message::Editor(EditorMessage::Submitted(failed)));
    let editor = ui.editor().unwrap();
    assert_eq!(editor.phase(), &EditorPhase::Editing);
    assert!(editor.error().unwrap().contains("HTTP 500"));

    let _ = ui.update(Message::Editor(EditorMessage::Submit));
    let _ = ui.update(Message::Editor(EditorMessage::Submitted(BatchReport::default())));
    assert!(ui.editor().is_none());
    assert_eq!(ui.top_surface(), "Grid");
}

#[tokio::test]
#[serial]
async fn test_settings_validate_and_save() {
    let dir = tempdir().unwrap();
    let (mut ui, _) = loaded_ui(dir.path(), EDITOR);

    let _ = ui.update(Message::ShowSettings);
    assert_eq!(ui.top_surface(), "Settings");
    let _ = ui.update(Message::SettingsPollIntervalChanged("soon".into()));
    let _ = ui.update(Message::SaveSettings);
    assert!(ui.settings_open());
    assert_eq!(ui.error_count(), 1);
    assert_eq!(ui.config().poll_interval_ms, 3000);

    let _ = ui.update(Message::SettingsPollIntervalChanged("1000".into()));
    let _ = ui.update(Message::SettingsLogLevelChanged("debug".into()));
    let _ = ui.update(Message::SaveSettings);
    assert!(!ui.settings_open());
    assert_eq!(ui.config().poll_interval_ms, 1000);
    assert_eq!(ui.config().log_level, "debug");

    let saved = std::fs::read_to_string(dir.path().join("config")).unwrap();
    assert!(saved.contains("poll_interval_ms = 1000"));
}
