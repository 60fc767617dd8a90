//! Asset detail drawer.
//!
//! Shows the preview of one asset with carousel navigation across its grid
//! siblings, view and download counts, recent activity, tag lookup and the
//! manual thumbnail actions. Thumbnail progress arrives from a
//! [`PollController`] whose snapshots are forwarded through the application
//! subscription as [`DrawerMessage::Polled`], tagged with the poll generation
//! that produced them.

use crate::icon::Icon;
use crate::image_loader::ImageLoader;
use crate::style::{self, Palette};
use crate::Message;
use api_client::{
    ActionFailure, ActivityEvent, Asset, AssetMetrics, DamBackend, Permissions, SuggestionKind,
    TagSuggestion, ThumbnailSize, ThumbnailStatus,
};
use iced::widget::image::Handle;
use iced::widget::{button, column, container, image, row, text, text_input, Column, Space};
use iced::{Alignment, Command, Element, Length};
use preview::{affordances, Affordances, Carousel, FileKind, PreviewFrame, PreviewRenderer};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tasks::{GenerateGuard, Loadable, PerAsset, PollConfig, PollController, PollHandle, TagAutocomplete, TaskError};
use tokio::sync::mpsc;

/// Navigation is locked for this long after a carousel step.
pub const TRANSITION: Duration = Duration::from_millis(250);
const PREVIEW_SIZE: f32 = 480.0;
const FADE_STEP: f32 = 0.1;
const ACTIVITY_LIMIT: usize = 10;

static POLL_GENERATION: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawerAction {
    Retry,
    Generate,
    RegenerateStyles,
}

impl DrawerAction {
    fn label(&self) -> &'static str {
        match self {
            DrawerAction::Retry => "Retrying thumbnail",
            DrawerAction::Generate => "Requesting thumbnail",
            DrawerAction::RegenerateStyles => "Regenerating styles",
        }
    }
}

/// What the drawer body currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawerView {
    Details,
    RegenerateStyles {
        styles: Vec<ThumbnailSize>,
        force_imagick: bool,
    },
    /// A manual action was sent and has not answered yet.
    Busy(DrawerAction),
}

#[derive(Debug, Clone)]
pub enum DrawerMessage {
    AssetLoaded(String, Result<Asset, String>),
    /// Snapshot from the poll with the given generation.
    Polled(u64, Asset),
    ImageLoaded(String, Result<Handle, String>),
    MetricsLoaded(String, Result<AssetMetrics, TaskError>),
    ActivityLoaded(String, Result<Vec<ActivityEvent>, TaskError>),
    Next,
    Previous,
    TransitionFinished,
    Retry,
    Generate,
    ActionFinished(DrawerAction, String, Result<(), ActionFailure>),
    ActionTimeout(String),
    ShowRegenerateStyles,
    ToggleStyle(ThumbnailSize),
    ToggleForceImagick,
    SubmitRegenerateStyles,
    CancelRegenerateStyles,
    TagQueryChanged(String),
    TagSuggestions(Option<Result<Vec<TagSuggestion>, TaskError>>),
    FadeTick,
}

/// Everything the drawer borrows from the application.
pub struct DrawerContext<'a> {
    pub backend: &'a Arc<dyn DamBackend>,
    pub updates: &'a mpsc::UnboundedSender<(u64, Asset)>,
    pub poll: PollConfig,
    pub images: &'a ImageLoader,
    pub tags: &'a TagAutocomplete,
    pub permissions: Permissions,
    pub generate_timeout: Duration,
}

pub struct DrawerState {
    asset: Asset,
    renderer: PreviewRenderer,
    carousel: Carousel,
    view: DrawerView,
    poll: Option<PollHandle>,
    poll_generation: u64,
    guard: GenerateGuard,
    metrics: PerAsset<AssetMetrics>,
    activity: PerAsset<Vec<ActivityEvent>>,
    action_error: Option<ActionFailure>,
    load_error: Option<String>,
    images: HashMap<String, Handle>,
    tag_query: String,
    tag_suggestions: Vec<TagSuggestion>,
    fade: f32,
}

fn drawer(message: DrawerMessage) -> Message {
    Message::Drawer(message)
}

fn load_image(loader: ImageLoader, url: String) -> Command<Message> {
    Command::perform(
        async move {
            let result = loader.load_url(&url).await.map_err(|e| e.to_string());
            (url, result)
        },
        |(url, result)| drawer(DrawerMessage::ImageLoaded(url, result)),
    )
}

impl DrawerState {
    /// Open the drawer on `asset`; `siblings` are the assets currently in the grid.
    pub fn open(asset: Asset, siblings: &[Asset], ctx: &DrawerContext<'_>) -> (Self, Command<Message>) {
        let mut state = Self {
            carousel: Carousel::new(siblings, &asset.id),
            asset: asset.clone(),
            renderer: PreviewRenderer::new(),
            view: DrawerView::Details,
            poll: None,
            poll_generation: 0,
            guard: GenerateGuard::new(ctx.generate_timeout),
            metrics: PerAsset::default(),
            activity: PerAsset::default(),
            action_error: None,
            load_error: None,
            images: HashMap::new(),
            tag_query: String::new(),
            tag_suggestions: Vec::new(),
            fade: 1.0,
        };
        let command = state.show(asset, ctx);
        (state, command)
    }

    /// Point the drawer at `asset`, dropping everything tied to the previous one.
    fn show(&mut self, asset: Asset, ctx: &DrawerContext<'_>) -> Command<Message> {
        tracing::debug!(asset = %asset.id, status = %asset.thumbnail_status, "drawer showing asset");
        self.poll = None;
        self.renderer = PreviewRenderer::new();
        self.renderer.observe(&asset);
        self.asset = asset;
        self.view = DrawerView::Details;
        self.action_error = None;
        self.load_error = None;
        self.guard.clear();
        self.images.clear();
        self.fade = 1.0;

        let seed = self.asset.clone();
        self.start_poll(&seed, ctx);

        let id = self.asset.id.clone();
        let mut commands = vec![self.load_frame_images(ctx)];
        if self.metrics.begin(&id) {
            let for_id = id.clone();
            commands.push(Command::perform(
                tasks::fetch_metrics(ctx.backend.clone(), id.clone()),
                move |result| drawer(DrawerMessage::MetricsLoaded(for_id, result)),
            ));
        }
        if self.activity.begin(&id) {
            let for_id = id.clone();
            commands.push(Command::perform(
                tasks::fetch_activity(ctx.backend.clone(), id),
                move |result| drawer(DrawerMessage::ActivityLoaded(for_id, result)),
            ));
        }
        Command::batch(commands)
    }

    /// Replaces any running poll, which cancels it. Snapshots the old poll
    /// already queued carry its generation and are dropped on arrival.
    fn start_poll(&mut self, seed: &Asset, ctx: &DrawerContext<'_>) {
        let generation = POLL_GENERATION.fetch_add(1, Ordering::Relaxed) + 1;
        self.poll_generation = generation;
        let updates = ctx.updates.clone();
        self.poll = Some(PollController::start(
            ctx.backend.clone(),
            seed,
            self.renderer.ui_retry_count(),
            ctx.poll,
            move |asset| {
                let _ = updates.send((generation, asset));
            },
        ));
    }

    fn load_frame_images(&self, ctx: &DrawerContext<'_>) -> Command<Message> {
        let urls = match self.renderer.frame() {
            PreviewFrame::Image { url, .. } => vec![url],
            PreviewFrame::Blurred { low_res, high_res } => vec![low_res, high_res],
            _ => Vec::new(),
        };
        Command::batch(
            urls.into_iter()
                .filter(|url| !url.is_empty() && !self.images.contains_key(url))
                .map(|url| load_image(ctx.images.clone(), url)),
        )
    }

    fn apply_snapshot(&mut self, generation: u64, asset: Asset, ctx: &DrawerContext<'_>) -> Command<Message> {
        if generation != self.poll_generation || asset.id != self.asset.id {
            tracing::trace!(asset = %asset.id, generation, "dropping snapshot from a replaced poll");
            return Command::none();
        }
        if self.guard.observe(&asset) {
            tracing::debug!(asset = %asset.id, status = %asset.thumbnail_status, "thumbnail status moved after action");
        }
        if !self.renderer.observe(&asset) {
            return Command::none();
        }
        self.asset = asset;
        if self.renderer.fade_in() {
            self.fade = 0.0;
        }
        self.load_frame_images(ctx)
    }

    pub fn update(&mut self, message: DrawerMessage, ctx: &DrawerContext<'_>) -> Command<Message> {
        match message {
            DrawerMessage::Polled(generation, asset) => self.apply_snapshot(generation, asset, ctx),
            DrawerMessage::AssetLoaded(id, result) => {
                if self.carousel.current() != Some(id.as_str()) {
                    return Command::none();
                }
                match result {
                    Ok(asset) => self.show(asset, ctx),
                    Err(e) => {
                        tracing::warn!(asset = %id, error = %e, "failed to load asset for drawer");
                        self.load_error = Some(e);
                        Command::none()
                    }
                }
            }
            DrawerMessage::ImageLoaded(url, Ok(handle)) => {
                self.images.insert(url.clone(), handle);
                self.renderer.mark_high_res_loaded(&url);
                Command::none()
            }
            DrawerMessage::ImageLoaded(url, Err(e)) => {
                tracing::warn!(%url, error = %e, "preview image failed to load");
                Command::none()
            }
            DrawerMessage::MetricsLoaded(id, result) => {
                self.metrics.finish(&id, result);
                Command::none()
            }
            DrawerMessage::ActivityLoaded(id, result) => {
                self.activity.finish(&id, result);
                Command::none()
            }
            DrawerMessage::Next | DrawerMessage::Previous => {
                let target = if matches!(message, DrawerMessage::Next) {
                    self.carousel.next()
                } else {
                    self.carousel.previous()
                }
                .map(str::to_string);
                let Some(id) = target else {
                    return Command::none();
                };
                let backend = ctx.backend.clone();
                let for_id = id.clone();
                Command::batch([
                    Command::perform(
                        async move { backend.get_asset(&id).await.map_err(|e| e.to_string()) },
                        move |result| drawer(DrawerMessage::AssetLoaded(for_id, result)),
                    ),
                    Command::perform(tokio::time::sleep(TRANSITION), |_| {
                        drawer(DrawerMessage::TransitionFinished)
                    }),
                ])
            }
            DrawerMessage::TransitionFinished => {
                self.carousel.finish_transition();
                Command::none()
            }
            DrawerMessage::Retry => {
                if !self.affordances(ctx.permissions, Instant::now()).show_retry
                    || !self.renderer.register_retry()
                {
                    return Command::none();
                }
                self.guard.begin(&self.asset, Instant::now());
                self.view = DrawerView::Busy(DrawerAction::Retry);
                self.action_error = None;
                let id = self.asset.id.clone();
                let timeout_id = id.clone();
                Command::batch([
                    Command::perform(tasks::retry_thumbnail(ctx.backend.clone(), id.clone()), move |result| {
                        drawer(DrawerMessage::ActionFinished(DrawerAction::Retry, id, result))
                    }),
                    Command::perform(tokio::time::sleep(self.guard.timeout()), move |_| {
                        drawer(DrawerMessage::ActionTimeout(timeout_id))
                    }),
                ])
            }
            DrawerMessage::Generate => {
                if !self.affordances(ctx.permissions, Instant::now()).show_generate {
                    return Command::none();
                }
                self.guard.begin(&self.asset, Instant::now());
                self.view = DrawerView::Busy(DrawerAction::Generate);
                self.action_error = None;
                let id = self.asset.id.clone();
                let timeout_id = id.clone();
                Command::batch([
                    Command::perform(tasks::generate_thumbnail(ctx.backend.clone(), id.clone()), move |result| {
                        drawer(DrawerMessage::ActionFinished(DrawerAction::Generate, id, result))
                    }),
                    Command::perform(tokio::time::sleep(self.guard.timeout()), move |_| {
                        drawer(DrawerMessage::ActionTimeout(timeout_id))
                    }),
                ])
            }
            DrawerMessage::ActionFinished(action, id, result) => {
                if id != self.asset.id {
                    return Command::none();
                }
                self.view = DrawerView::Details;
                match result {
                    Ok(()) => {
                        tracing::info!(asset = %id, ?action, "thumbnail action accepted");
                        // The server owns the outcome; watch it from a pending seed
                        // so terminal snapshots such as skipped are polled again.
                        let mut seed = self.asset.clone();
                        seed.thumbnail_status = ThumbnailStatus::Pending;
                        self.start_poll(&seed, ctx);
                    }
                    Err(failure) => {
                        tracing::warn!(asset = %id, ?action, error = %failure, "thumbnail action failed");
                        if action != DrawerAction::RegenerateStyles {
                            self.guard.clear();
                        }
                        self.action_error = Some(failure);
                    }
                }
                Command::none()
            }
            DrawerMessage::ActionTimeout(id) => {
                if id == self.asset.id && self.guard.expire(Instant::now()) {
                    tracing::warn!(asset = %id, "no status change after action, re-enabling controls");
                }
                Command::none()
            }
            DrawerMessage::ShowRegenerateStyles => {
                if ctx.permissions.is_admin && !matches!(self.view, DrawerView::Busy(_)) {
                    self.view = DrawerView::RegenerateStyles {
                        styles: ThumbnailSize::ALL.to_vec(),
                        force_imagick: false,
                    };
                }
                Command::none()
            }
            DrawerMessage::ToggleStyle(size) => {
                if let DrawerView::RegenerateStyles { styles, .. } = &mut self.view {
                    if let Some(pos) = styles.iter().position(|s| *s == size) {
                        styles.remove(pos);
                    } else {
                        styles.push(size);
                        styles.sort_by_key(|s| ThumbnailSize::ALL.iter().position(|a| a == s));
                    }
                }
                Command::none()
            }
            DrawerMessage::ToggleForceImagick => {
                if let DrawerView::RegenerateStyles { force_imagick, .. } = &mut self.view {
                    *force_imagick = !*force_imagick;
                }
                Command::none()
            }
            DrawerMessage::SubmitRegenerateStyles => {
                let (styles, force_imagick) = match &self.view {
                    DrawerView::RegenerateStyles { styles, force_imagick } => (
                        styles.iter().map(|s| s.as_str().to_string()).collect::<Vec<_>>(),
                        *force_imagick,
                    ),
                    _ => return Command::none(),
                };
                self.view = DrawerView::Busy(DrawerAction::RegenerateStyles);
                self.action_error = None;
                let id = self.asset.id.clone();
                Command::perform(
                    tasks::regenerate_styles(ctx.backend.clone(), id.clone(), styles, force_imagick),
                    move |result| drawer(DrawerMessage::ActionFinished(DrawerAction::RegenerateStyles, id, result)),
                )
            }
            DrawerMessage::CancelRegenerateStyles => {
                if matches!(self.view, DrawerView::RegenerateStyles { .. }) {
                    self.view = DrawerView::Details;
                }
                Command::none()
            }
            DrawerMessage::TagQueryChanged(query) => {
                self.tag_query = query.clone();
                let tags = ctx.tags.clone();
                Command::perform(async move { tags.query(query).await }, |result| {
                    drawer(DrawerMessage::TagSuggestions(result))
                })
            }
            DrawerMessage::TagSuggestions(None) => Command::none(),
            DrawerMessage::TagSuggestions(Some(Ok(suggestions))) => {
                self.tag_suggestions = suggestions;
                Command::none()
            }
            DrawerMessage::TagSuggestions(Some(Err(e))) => {
                tracing::warn!(error = %e, "tag autocomplete failed");
                self.tag_suggestions.clear();
                Command::none()
            }
            DrawerMessage::FadeTick => {
                self.fade = (self.fade + FADE_STEP).min(1.0);
                Command::none()
            }
        }
    }

    pub fn affordances(&self, permissions: Permissions, now: Instant) -> Affordances {
        let in_flight = matches!(self.view, DrawerView::Busy(_)) || self.guard.is_pending(now);
        affordances(&self.asset, self.renderer.ui_retry_count(), permissions, in_flight)
    }

    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    pub fn frame(&self) -> PreviewFrame {
        self.renderer.frame()
    }

    pub fn view_state(&self) -> &DrawerView {
        &self.view
    }

    pub fn carousel(&self) -> &Carousel {
        &self.carousel
    }

    pub fn metrics(&self) -> &Loadable<AssetMetrics> {
        self.metrics.state()
    }

    pub fn activity(&self) -> &Loadable<Vec<ActivityEvent>> {
        self.activity.state()
    }

    pub fn action_error(&self) -> Option<&ActionFailure> {
        self.action_error.as_ref()
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn is_polling(&self) -> bool {
        self.poll.as_ref().map_or(false, PollHandle::is_active)
    }

    /// Generation of the poll whose snapshots are accepted.
    pub fn poll_generation(&self) -> u64 {
        self.poll_generation
    }

    pub fn ui_retry_count(&self) -> u32 {
        self.renderer.ui_retry_count()
    }

    pub fn tag_suggestions(&self) -> &[TagSuggestion] {
        &self.tag_suggestions
    }

    pub fn is_animating(&self) -> bool {
        self.fade < 1.0
    }

    pub fn view(&self, permissions: Permissions) -> Element<'_, Message> {
        let header = row![
            text(&self.asset.filename).size(20),
            Space::with_width(Length::Fill),
            button("✕").on_press(Message::CloseDrawer),
        ]
        .align_items(Alignment::Center);

        let can_step = self.carousel.can_navigate() && !self.carousel.is_transitioning();
        let mut previous = button("‹");
        let mut next = button("›");
        if can_step {
            previous = previous.on_press(drawer(DrawerMessage::Previous));
            next = next.on_press(drawer(DrawerMessage::Next));
        }
        let position = match self.carousel.position() {
            Some(i) => format!("{} / {}", i + 1, self.carousel.len()),
            None => String::new(),
        };
        let stage = row![previous, self.preview_view(), next]
            .spacing(8)
            .align_items(Alignment::Center);

        let mut body = column![header, stage, text(position).size(12).style(Palette::MUTED)]
            .spacing(Palette::SPACING);
        if let Some(e) = &self.load_error {
            body = body.push(text(e).style(Palette::ERROR));
        }
        body = body
            .push(self.actions_view(permissions))
            .push(self.metrics_view())
            .push(self.tags_view())
            .push(self.activity_view());

        container(body)
            .padding(Palette::SPACING)
            .width(Length::Fixed(PREVIEW_SIZE + 120.0))
            .style(style::card())
            .into()
    }

    fn preview_view(&self) -> Element<'_, Message> {
        let kind = FileKind::from_asset(&self.asset);
        let content: Element<'_, Message> = match self.renderer.frame() {
            PreviewFrame::Placeholder(kind) => column![
                Icon::new(kind).size(Palette::PLACEHOLDER_ICON_SIZE),
                text(self.asset.mime_type.clone()).size(12).style(Palette::MUTED),
            ]
            .align_items(Alignment::Center)
            .into(),
            PreviewFrame::InProgress => column![
                text("⏳").size(48),
                text("Generating thumbnail…").style(Palette::MUTED),
            ]
            .align_items(Alignment::Center)
            .into(),
            PreviewFrame::Blurred { low_res, .. } => match self.images.get(&low_res) {
                Some(handle) => column![
                    image(handle.clone()).width(Length::Fixed(PREVIEW_SIZE * 0.5)),
                    text("Loading full resolution…").size(12).style(Palette::MUTED),
                ]
                .align_items(Alignment::Center)
                .into(),
                None => text("Loading…").into(),
            },
            PreviewFrame::Image { url, fade_in } => match self.images.get(&url) {
                Some(handle) => {
                    let scale = if fade_in { 0.9 + 0.1 * self.fade } else { 1.0 };
                    image(handle.clone()).width(Length::Fixed(PREVIEW_SIZE * scale)).into()
                }
                None => text("Loading…").into(),
            },
            PreviewFrame::Retry { error_message } => column![
                Icon::new(kind).size(Palette::PLACEHOLDER_ICON_SIZE),
                text(error_message.unwrap_or_else(|| "Thumbnail generation failed".to_string()))
                    .style(Palette::ERROR),
            ]
            .align_items(Alignment::Center)
            .spacing(8)
            .into(),
        };
        container(content)
            .width(Length::Fixed(PREVIEW_SIZE))
            .height(Length::Fixed(PREVIEW_SIZE))
            .center_x()
            .center_y()
            .into()
    }

    fn actions_view(&self, permissions: Permissions) -> Element<'_, Message> {
        let shown = self.affordances(permissions, Instant::now());
        let mut actions = row![].spacing(8).align_items(Alignment::Center);
        if shown.show_retry {
            actions = actions.push(
                button("Retry thumbnail")
                    .style(style::button_primary())
                    .on_press(drawer(DrawerMessage::Retry)),
            );
        }
        if shown.show_generate {
            actions = actions.push(
                button("Generate thumbnail")
                    .style(style::button_primary())
                    .on_press(drawer(DrawerMessage::Generate)),
            );
        }
        match &self.view {
            DrawerView::Busy(action) => {
                actions = actions.push(text(format!("{}…", action.label())).style(Palette::MUTED));
            }
            DrawerView::Details if permissions.is_admin => {
                actions = actions.push(button("Regenerate styles").on_press(drawer(DrawerMessage::ShowRegenerateStyles)));
            }
            _ => {}
        }

        let mut section = column![actions].spacing(8);
        if let DrawerView::RegenerateStyles { styles, force_imagick } = &self.view {
            let mut sizes = row![].spacing(8);
            for size in ThumbnailSize::ALL {
                sizes = sizes.push(
                    button(text(size.as_str()))
                        .style(style::button_toggle(styles.contains(&size)))
                        .on_press(drawer(DrawerMessage::ToggleStyle(size))),
                );
            }
            section = section.push(sizes).push(
                row![
                    button("Force ImageMagick")
                        .style(style::button_toggle(*force_imagick))
                        .on_press(drawer(DrawerMessage::ToggleForceImagick)),
                    button("Regenerate")
                        .style(style::button_primary())
                        .on_press(drawer(DrawerMessage::SubmitRegenerateStyles)),
                    button("Cancel").on_press(drawer(DrawerMessage::CancelRegenerateStyles)),
                ]
                .spacing(8),
            );
        }
        if let Some(failure) = &self.action_error {
            section = section.push(text(failure.to_string()).style(Palette::ERROR));
        }
        section.into()
    }

    fn metrics_view(&self) -> Element<'_, Message> {
        let line = match self.metrics.state() {
            Loadable::Idle | Loadable::Loading => "Loading metrics…".to_string(),
            Loadable::Loaded(m) => format!("{} views · {} downloads", m.views, m.downloads),
            Loadable::Failed(e) => format!("Metrics unavailable: {}", e),
        };
        text(line).size(14).into()
    }

    fn tags_view(&self) -> Element<'_, Message> {
        let mut list = Column::new().spacing(4);
        for suggestion in &self.tag_suggestions {
            let label = match suggestion.kind {
                SuggestionKind::Existing => suggestion.name.clone(),
                SuggestionKind::New => format!("{} (new)", suggestion.name),
            };
            list = list.push(text(label).size(12));
        }
        column![
            text_input("Find tags", &self.tag_query)
                .on_input(|q| drawer(DrawerMessage::TagQueryChanged(q))),
            list,
        ]
        .spacing(4)
        .into()
    }

    fn activity_view(&self) -> Element<'_, Message> {
        let mut list = Column::new().spacing(4).push(text("Activity").size(16));
        match self.activity.state() {
            Loadable::Loaded(events) if events.is_empty() => {
                list = list.push(text("No activity yet").size(12).style(Palette::MUTED));
            }
            Loadable::Loaded(events) => {
                for event in events.iter().take(ACTIVITY_LIMIT) {
                    list = list.push(
                        text(format!(
                            "{}  {}  {}",
                            event.created_at.format("%Y-%m-%d %H:%M"),
                            event.action,
                            event.user_name.as_deref().unwrap_or("system"),
                        ))
                        .size(12),
                    );
                }
            }
            Loadable::Failed(e) => {
                list = list.push(text(format!("Activity unavailable: {}", e)).size(12).style(Palette::ERROR));
            }
            Loadable::Idle | Loadable::Loading => {
                list = list.push(text("Loading activity…").size(12).style(Palette::MUTED));
            }
        }
        list.into()
    }
}
