//! Desktop front-end for browsing assets and managing their thumbnails.

pub mod drawer;
mod icon;
pub mod image_loader;
pub mod metadata_editor;
mod settings;
mod style;

#[path = "../../app/src/config.rs"]
mod app_config;

pub use app_config::{AppConfig, AppConfigOverrides};
pub use drawer::{DrawerAction, DrawerMessage, DrawerState, DrawerView};
pub use metadata_editor::{EditorMessage, EditorPhase, EditorState};

use api_client::{Asset, AssetPage, DamBackend, Permissions};
use drawer::DrawerContext;
use icon::Icon;
use iced::widget::image::Handle;
use iced::widget::{button, column, container, image, row, scrollable, text, text_input, Column, Row, Space};
use iced::{executor, keyboard, subscription, Alignment, Application, Command, Element, Length, Settings, Subscription, Theme};
use image_loader::ImageLoader;
use preview::{resolve, FileKind, ThumbnailState};
use settings::SettingsForm;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use style::Palette;
use tasks::{PollConfig, TagAutocomplete};
use tokio::sync::{mpsc, Mutex};
use tokio::time::sleep;

const ERROR_DISPLAY_DURATION: Duration = Duration::from_secs(5);
const FADE_FRAME: Duration = Duration::from_millis(30);
const PER_PAGE: u32 = 40;
const GRID_COLUMNS: usize = 5;
const TILE_SIZE: f32 = 160.0;
const MAX_CONCURRENT_IMAGES: usize = 4;

/// Open the main window and block until it closes.
pub fn run(flags: UiFlags) -> iced::Result {
    AssetDeskUI::run(Settings::with_flags(flags))
}

/// Startup values handed over by the binary.
pub struct UiFlags {
    pub backend: Arc<dyn DamBackend>,
    pub config: AppConfig,
    pub config_path: Option<PathBuf>,
    pub permissions: Permissions,
}

#[derive(Debug, Clone)]
pub enum Message {
    LoadPage(u32),
    PageLoaded(Result<AssetPage, String>),
    ThumbnailLoaded(String, Result<Handle, String>),
    OpenAsset(String),
    CloseDrawer,
    Drawer(DrawerMessage),
    FieldIdChanged(String),
    OpenFieldEditor,
    CloseFieldEditor,
    Editor(EditorMessage),
    ShowSettings,
    CloseSettings,
    SettingsLogLevelChanged(String),
    SettingsApiUrlChanged(String),
    SettingsPollIntervalChanged(String),
    SaveSettings,
    EscapePressed,
    DismissError(usize),
    ClearErrors,
}

pub struct AssetDeskUI {
    backend: Arc<dyn DamBackend>,
    config: AppConfig,
    config_path: Option<PathBuf>,
    permissions: Permissions,
    image_loader: ImageLoader,
    tags: TagAutocomplete,
    assets: Vec<Asset>,
    page: u32,
    last_page: u32,
    total: u64,
    loading: bool,
    thumbnails: HashMap<String, Handle>,
    drawer: Option<DrawerState>,
    editor: Option<EditorState>,
    field_id_input: String,
    settings: Option<SettingsForm>,
    poll_sender: mpsc::UnboundedSender<(u64, Asset)>,
    poll_receiver: Arc<Mutex<mpsc::UnboundedReceiver<(u64, Asset)>>>,
    errors: Vec<String>,
    error_log_path: PathBuf,
}

impl AssetDeskUI {
    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    pub fn current_page(&self) -> u32 {
        self.page
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn drawer(&self) -> Option<&DrawerState> {
        self.drawer.as_ref()
    }

    pub fn editor(&self) -> Option<&EditorState> {
        self.editor.as_ref()
    }

    pub fn settings_open(&self) -> bool {
        self.settings.is_some()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Name of the surface Escape would close.
    pub fn top_surface(&self) -> &'static str {
        if self.settings.is_some() {
            "Settings"
        } else if self.editor.is_some() {
            "FieldEditor"
        } else if self.drawer.is_some() {
            "Drawer"
        } else {
            "Grid"
        }
    }

    fn poll_config(&self) -> PollConfig {
        PollConfig::new(self.config.poll_interval(), self.config.max_polls())
    }

    fn load_page(&mut self, page: u32) -> Command<Message> {
        self.loading = true;
        let backend = self.backend.clone();
        Command::perform(
            async move { backend.list_assets(page, PER_PAGE).await.map_err(|e| e.to_string()) },
            Message::PageLoaded,
        )
    }

    fn load_grid_thumbnails(&self) -> Command<Message> {
        let urls: Vec<String> = self
            .assets
            .iter()
            .take(self.config.thumbnails_preload)
            .filter_map(|asset| {
                let resolved = resolve(asset, 0);
                (resolved.state == ThumbnailState::Available)
                    .then_some(resolved.thumbnail_url)
                    .flatten()
            })
            .filter(|url| !self.thumbnails.contains_key(url))
            .collect();
        Command::batch(urls.into_iter().map(|url| {
            let loader = self.image_loader.clone();
            Command::perform(
                async move {
                    let result = loader.load_url(&url).await.map_err(|e| e.to_string());
                    (url, result)
                },
                |(url, result)| Message::ThumbnailLoaded(url, result),
            )
        }))
    }

    /// Run `f` against the open drawer with a context built from `self`.
    fn with_drawer<F>(&mut self, f: F) -> Command<Message>
    where
        F: FnOnce(&mut DrawerState, &DrawerContext<'_>) -> Command<Message>,
    {
        let Some(mut drawer) = self.drawer.take() else {
            return Command::none();
        };
        let ctx = DrawerContext {
            backend: &self.backend,
            updates: &self.poll_sender,
            poll: self.poll_config(),
            images: &self.image_loader,
            tags: &self.tags,
            permissions: self.permissions,
            generate_timeout: self.config.generate_timeout(),
        };
        let command = f(&mut drawer, &ctx);
        self.drawer = Some(drawer);
        command
    }

    fn log_error(&self, msg: &str) {
        if let Ok(mut file) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.error_log_path)
        {
            let _ = writeln!(file, "{}", msg);
        }
    }

    fn push_error(&mut self, msg: String) -> Command<Message> {
        tracing::error!("{}", msg);
        self.log_error(&msg);
        self.errors.push(msg);
        Self::error_timeout()
    }

    fn error_timeout() -> Command<Message> {
        Command::perform(
            async {
                sleep(ERROR_DISPLAY_DURATION).await;
            },
            |_| Message::ClearErrors,
        )
    }
}

impl Application for AssetDeskUI {
    type Executor = executor::Default;
    type Message = Message;
    type Theme = Theme;
    type Flags = UiFlags;

    fn new(flags: UiFlags) -> (Self, Command<Message>) {
        let base_dir = flags.config.cache_path.clone();
        if let Err(e) = std::fs::create_dir_all(&base_dir) {
            tracing::warn!(error = %e, dir = %base_dir.display(), "could not create cache directory");
        }
        let (poll_sender, poll_receiver) = mpsc::unbounded_channel();
        let tags = TagAutocomplete::new(flags.backend.clone(), flags.config.tag_debounce());

        let mut ui = Self {
            image_loader: ImageLoader::new(base_dir.clone(), MAX_CONCURRENT_IMAGES),
            backend: flags.backend,
            config: flags.config,
            config_path: flags.config_path,
            permissions: flags.permissions,
            tags,
            assets: Vec::new(),
            page: 1,
            last_page: 1,
            total: 0,
            loading: false,
            thumbnails: HashMap::new(),
            drawer: None,
            editor: None,
            field_id_input: String::new(),
            settings: None,
            poll_sender,
            poll_receiver: Arc::new(Mutex::new(poll_receiver)),
            errors: Vec::new(),
            error_log_path: base_dir.join("ui_errors.log"),
        };
        let command = ui.load_page(1);
        (ui, command)
    }

    fn title(&self) -> String {
        String::from("AssetDesk")
    }

    fn update(&mut self, message: Message) -> Command<Message> {
        match message {
            Message::LoadPage(page) => {
                let page = page.clamp(1, self.last_page.max(1));
                self.load_page(page)
            }
            Message::PageLoaded(Ok(page)) => {
                self.loading = false;
                tracing::info!(page = page.current_page, count = page.data.len(), "assets loaded");
                self.page = page.current_page;
                self.last_page = page.last_page;
                self.total = page.total;
                self.assets = page.data;
                self.load_grid_thumbnails()
            }
            Message::PageLoaded(Err(e)) => {
                self.loading = false;
                self.push_error(format!("Failed to load assets: {}", e))
            }
            Message::ThumbnailLoaded(url, Ok(handle)) => {
                self.thumbnails.insert(url, handle);
                Command::none()
            }
            Message::ThumbnailLoaded(url, Err(e)) => {
                tracing::warn!(%url, error = %e, "grid thumbnail failed to load");
                Command::none()
            }
            Message::OpenAsset(id) => {
                let Some(asset) = self.assets.iter().find(|a| a.id == id).cloned() else {
                    return self.push_error(format!("Asset {} is not on this page", id));
                };
                let ctx = DrawerContext {
                    backend: &self.backend,
                    updates: &self.poll_sender,
                    poll: self.poll_config(),
                    images: &self.image_loader,
                    tags: &self.tags,
                    permissions: self.permissions,
                    generate_timeout: self.config.generate_timeout(),
                };
                let (drawer, command) = DrawerState::open(asset, &self.assets, &ctx);
                self.drawer = Some(drawer);
                command
            }
            Message::CloseDrawer => {
                self.drawer = None;
                Command::none()
            }
            // Polled snapshots stay in the drawer; the grid catches up on its next page load.
            Message::Drawer(msg) => self.with_drawer(|drawer, ctx| drawer.update(msg, ctx)),
            Message::FieldIdChanged(value) => {
                self.field_id_input = value;
                Command::none()
            }
            Message::OpenFieldEditor => {
                if !self.permissions.can_edit {
                    return self.push_error("You do not have permission to edit metadata fields".into());
                }
                match self.field_id_input.trim().parse::<u64>() {
                    Ok(field_id) => {
                        let (editor, command) = EditorState::open(self.backend.clone(), field_id);
                        self.editor = Some(editor);
                        command
                    }
                    Err(_) => self.push_error(format!("Invalid field id '{}'", self.field_id_input)),
                }
            }
            Message::CloseFieldEditor => {
                self.editor = None;
                Command::none()
            }
            Message::Editor(msg) => {
                let Some(editor) = self.editor.as_mut() else {
                    return Command::none();
                };
                let command = editor.update(msg, &self.backend);
                if editor.is_saved() {
                    tracing::info!(field = editor.field_id(), "metadata field editor closed after save");
                    self.editor = None;
                }
                command
            }
            Message::ShowSettings => {
                self.settings = Some(SettingsForm::from_config(&self.config));
                Command::none()
            }
            Message::CloseSettings => {
                self.settings = None;
                Command::none()
            }
            Message::SettingsLogLevelChanged(level) => {
                if let Some(form) = &mut self.settings {
                    form.log_level = level;
                }
                Command::none()
            }
            Message::SettingsApiUrlChanged(url) => {
                if let Some(form) = &mut self.settings {
                    form.api_base_url = url;
                }
                Command::none()
            }
            Message::SettingsPollIntervalChanged(value) => {
                if let Some(form) = &mut self.settings {
                    form.poll_interval_ms = value;
                }
                Command::none()
            }
            Message::SaveSettings => {
                let Some(form) = self.settings.clone() else {
                    return Command::none();
                };
                let mut config = self.config.clone();
                if let Err(e) = form.apply(&mut config) {
                    return self.push_error(e);
                }
                if let Err(e) = config.save_to(self.config_path.clone()) {
                    return self.push_error(format!("Failed to save settings: {}", e));
                }
                self.config = config;
                self.settings = None;
                Command::none()
            }
            Message::EscapePressed => {
                if self.settings.is_some() {
                    self.settings = None;
                } else if self.editor.is_some() {
                    self.editor = None;
                } else if let Some(drawer) = &self.drawer {
                    if matches!(drawer.view_state(), DrawerView::RegenerateStyles { .. }) {
                        return self.with_drawer(|drawer, ctx| {
                            drawer.update(DrawerMessage::CancelRegenerateStyles, ctx)
                        });
                    }
                    self.drawer = None;
                }
                Command::none()
            }
            Message::DismissError(index) => {
                if index < self.errors.len() {
                    self.errors.remove(index);
                }
                Command::none()
            }
            Message::ClearErrors => {
                self.errors.clear();
                Command::none()
            }
        }
    }

    fn subscription(&self) -> Subscription<Message> {
        let mut subs: Vec<Subscription<Message>> = Vec::new();

        let poll_rx = self.poll_receiver.clone();
        subs.push(subscription::unfold("thumbnail-poll", poll_rx, |rx| async move {
            let mut lock = rx.lock().await;
            let next = lock.recv().await;
            drop(lock);
            match next {
                Some((generation, asset)) => (Message::Drawer(DrawerMessage::Polled(generation, asset)), rx),
                None => futures::future::pending().await,
            }
        }));

        subs.push(keyboard::on_key_press(|key, _modifiers| match key {
            keyboard::Key::Named(keyboard::key::Named::Escape) => Some(Message::EscapePressed),
            _ => None,
        }));

        if self.drawer.as_ref().map_or(false, DrawerState::is_animating) {
            subs.push(iced::time::every(FADE_FRAME).map(|_| Message::Drawer(DrawerMessage::FadeTick)));
        }

        Subscription::batch(subs)
    }

    fn view(&self) -> Element<Message> {
        let mut edit_field = button("Edit field");
        if self.permissions.can_edit {
            edit_field = edit_field.on_press(Message::OpenFieldEditor);
        }
        let header = row![
            text("AssetDesk").size(24),
            Space::with_width(Length::Fill),
            text_input("Field id", &self.field_id_input)
                .on_input(Message::FieldIdChanged)
                .width(Length::Fixed(100.0)),
            edit_field,
            button("Settings")
                .style(style::button_primary())
                .on_press(Message::ShowSettings),
        ]
        .spacing(10)
        .align_items(Alignment::Center);

        let mut page = column![header].spacing(Palette::SPACING).padding(Palette::SPACING);

        if !self.errors.is_empty() {
            let mut banner = Column::new().spacing(4);
            for (i, err) in self.errors.iter().enumerate() {
                banner = banner.push(
                    row![
                        text(err),
                        Space::with_width(Length::Fill),
                        button("Dismiss").on_press(Message::DismissError(i)),
                    ]
                    .align_items(Alignment::Center),
                );
            }
            banner = banner.push(button("Clear all").on_press(Message::ClearErrors));
            page = page.push(
                container(banner)
                    .padding(8)
                    .width(Length::Fill)
                    .style(style::error_banner()),
            );
        }

        let body: Element<Message> = if let Some(form) = &self.settings {
            container(settings::dialog(form))
                .padding(Palette::SPACING)
                .style(style::card())
                .into()
        } else if let Some(editor) = &self.editor {
            editor.view()
        } else if let Some(drawer) = &self.drawer {
            row![
                container(self.grid_view()).width(Length::Fill),
                drawer.view(self.permissions),
            ]
            .spacing(Palette::SPACING)
            .into()
        } else {
            self.grid_view()
        };

        page.push(body).into()
    }
}

impl AssetDeskUI {
    fn tile(&self, asset: &Asset) -> Element<'_, Message> {
        let resolved = resolve(asset, 0);
        let preview: Element<Message> = match (&resolved.state, &resolved.thumbnail_url) {
            (ThumbnailState::Available, Some(url)) => match self.thumbnails.get(url) {
                Some(handle) => image(handle.clone()).width(Length::Fixed(TILE_SIZE - 20.0)).into(),
                None => Icon::new(FileKind::from_asset(asset)).size(Palette::PLACEHOLDER_ICON_SIZE).into(),
            },
            (ThumbnailState::Pending, _) => text("⏳").size(Palette::PLACEHOLDER_ICON_SIZE).into(),
            _ => Icon::new(FileKind::from_asset(asset)).size(Palette::PLACEHOLDER_ICON_SIZE).into(),
        };
        button(
            column![
                container(preview)
                    .height(Length::Fixed(TILE_SIZE - 40.0))
                    .center_x()
                    .center_y(),
                text(&asset.filename).size(12),
                text(resolved.state.to_string()).size(10).style(Palette::MUTED),
            ]
            .align_items(Alignment::Center)
            .spacing(4),
        )
        .width(Length::Fixed(TILE_SIZE))
        .style(style::button_tile())
        .on_press(Message::OpenAsset(asset.id.clone()))
        .into()
    }

    fn grid_view(&self) -> Element<'_, Message> {
        if self.loading && self.assets.is_empty() {
            return text("Loading assets…").into();
        }
        if self.assets.is_empty() {
            return text("No assets").style(Palette::MUTED).into();
        }

        let mut grid = Column::new().spacing(Palette::SPACING);
        for chunk in self.assets.chunks(GRID_COLUMNS) {
            let tiles = chunk
                .iter()
                .fold(Row::new().spacing(Palette::SPACING), |row, asset| row.push(self.tile(asset)));
            grid = grid.push(tiles);
        }

        let mut previous = button("Previous");
        if self.page > 1 && !self.loading {
            previous = previous.on_press(Message::LoadPage(self.page - 1));
        }
        let mut next = button("Next");
        if self.page < self.last_page && !self.loading {
            next = next.on_press(Message::LoadPage(self.page + 1));
        }
        let pager = row![
            previous,
            text(format!("Page {} of {} · {} assets", self.page, self.last_page, self.total)).size(12),
            next,
        ]
        .spacing(10)
        .align_items(Alignment::Center);

        column![scrollable(grid).height(Length::Fill), pager]
            .spacing(Palette::SPACING)
            .into()
    }
}
