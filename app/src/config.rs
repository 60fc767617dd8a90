use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

fn default_base_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".assetdesk")
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    pub log_level: String,
    pub api_base_url: String,
    pub poll_interval_ms: u64,
    /// 0 polls until the thumbnail settles.
    pub max_polls: u32,
    pub generate_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub tag_debounce_ms: u64,
    pub thumbnails_preload: usize,
    pub debug_console: bool,
    pub trace_spans: bool,
    pub cache_path: PathBuf,
}

#[derive(Debug, Default)]
pub struct AppConfigOverrides {
    pub log_level: Option<String>,
    pub api_base_url: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub max_polls: Option<u32>,
    pub thumbnails_preload: Option<usize>,
    pub debug_console: bool,
    pub trace_spans: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            poll_interval_ms: 3000,
            max_polls: 0,
            generate_timeout_secs: 30,
            request_timeout_secs: 30,
            tag_debounce_ms: 300,
            thumbnails_preload: 20,
            debug_console: false,
            trace_spans: false,
            cache_path: default_base_dir(),
        }
    }
}

impl AppConfig {
    pub fn default_path() -> PathBuf {
        default_base_dir().join("config")
    }

    pub fn load_from(path: Option<PathBuf>) -> Self {
        let path = path.unwrap_or_else(Self::default_path);
        let cfg = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Toml).required(false))
            .add_source(config::Environment::with_prefix("ASSETDESK").try_parsing(true))
            .build()
            .unwrap_or_default();
        let defaults = Self::default();

        let int = |key: &str, fallback: u64| -> u64 {
            cfg.get_int(key)
                .ok()
                .and_then(|v| u64::try_from(v).ok())
                .unwrap_or(fallback)
        };

        Self {
            log_level: cfg.get_string("log_level").unwrap_or(defaults.log_level),
            api_base_url: cfg.get_string("api_base_url").unwrap_or(defaults.api_base_url),
            poll_interval_ms: int("poll_interval_ms", defaults.poll_interval_ms),
            max_polls: int("max_polls", defaults.max_polls as u64) as u32,
            generate_timeout_secs: int("generate_timeout_secs", defaults.generate_timeout_secs),
            request_timeout_secs: int("request_timeout_secs", defaults.request_timeout_secs),
            tag_debounce_ms: int("tag_debounce_ms", defaults.tag_debounce_ms),
            thumbnails_preload: int("thumbnails_preload", defaults.thumbnails_preload as u64) as usize,
            debug_console: cfg.get_bool("debug_console").unwrap_or(defaults.debug_console),
            trace_spans: cfg.get_bool("trace_spans").unwrap_or(defaults.trace_spans),
            cache_path: cfg
                .get_string("cache_path")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_path),
        }
    }

    pub fn apply_overrides(mut self, ov: &AppConfigOverrides) -> Self {
        if let Some(l) = &ov.log_level {
            self.log_level = l.clone();
        }
        if let Some(url) = &ov.api_base_url {
            self.api_base_url = url.clone();
        }
        if let Some(ms) = ov.poll_interval_ms {
            self.poll_interval_ms = ms;
        }
        if let Some(n) = ov.max_polls {
            self.max_polls = n;
        }
        if let Some(t) = ov.thumbnails_preload {
            self.thumbnails_preload = t;
        }
        if ov.debug_console {
            self.debug_console = true;
        }
        if ov.trace_spans {
            self.trace_spans = true;
        }
        self
    }

    pub fn save_to(&self, path: Option<PathBuf>) -> std::io::Result<()> {
        let path = path.unwrap_or_else(Self::default_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = toml::to_string(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, data)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_polls(&self) -> Option<u32> {
        (self.max_polls > 0).then_some(self.max_polls)
    }

    pub fn generate_timeout(&self) -> Duration {
        Duration::from_secs(self.generate_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn tag_debounce(&self) -> Duration {
        Duration::from_millis(self.tag_debounce_ms)
    }
}
