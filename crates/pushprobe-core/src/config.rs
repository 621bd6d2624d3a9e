//! Persistent configuration for pushprobe.
//!
//! Stores settings in `~/.pushprobe/config.json`: the push API credentials,
//! which device and app to drive, and the timing budget of the scenarios.
//! Environment variables override the file, and CLI flags override both.
//!
//! # Example
//!
//! ```no_run
//! use pushprobe_core::config::ProbeConfig;
//!
//! // Load (returns defaults if file doesn't exist), then apply env overrides
//! let config = ProbeConfig::load().with_env_overrides();
//!
//! if config.has_credentials() {
//!     println!("Sending through {}", config.api_base_url);
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

const CONFIG_FILENAME: &str = "config.json";

/// Environment variable holding the application key.
pub const ENV_APP_KEY: &str = "PUSHPROBE_APP_KEY";
/// Environment variable holding the master secret.
pub const ENV_MASTER_SECRET: &str = "PUSHPROBE_MASTER_SECRET";
/// Environment variable overriding the push API base URL.
pub const ENV_API_URL: &str = "PUSHPROBE_API_URL";
/// Environment variable selecting the device, shared with adb itself.
pub const ENV_SERIAL: &str = "ANDROID_SERIAL";

/// Default push API endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://go.urbanairship.com";
/// Package of the sample application under test.
pub const DEFAULT_APP_PACKAGE: &str = "com.urbanairship.richpush.sample";
/// Launcher label of the sample application under test.
pub const DEFAULT_APP_LABEL: &str = "Rich Push Sample";

/// Returns the pushprobe data directory (`~/.pushprobe`), creating it if needed.
pub fn probe_dir() -> PathBuf {
    let dir = dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".pushprobe");
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// Returns the run log directory (`~/.pushprobe/logs`), creating it if needed.
pub fn logs_dir() -> PathBuf {
    let dir = probe_dir().join("logs");
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// Persistent pushprobe configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Application key of the push project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_key: Option<String>,

    /// Master secret of the push project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_secret: Option<String>,

    /// Base URL of the push API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// adb serial of the device under test.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_serial: Option<String>,

    /// Package name of the app under test.
    #[serde(default = "default_app_package")]
    pub app_package: String,

    /// Launcher label of the app under test.
    #[serde(default = "default_app_label")]
    pub app_label: String,

    /// Wait and settle durations.
    #[serde(default)]
    pub timings: Timings,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_app_package() -> String {
    DEFAULT_APP_PACKAGE.to_string()
}

fn default_app_label() -> String {
    DEFAULT_APP_LABEL.to_string()
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            app_key: None,
            master_secret: None,
            api_base_url: default_api_base_url(),
            device_serial: None,
            app_package: default_app_package(),
            app_label: default_app_label(),
            timings: Timings::default(),
        }
    }
}

impl ProbeConfig {
    /// The default config file location.
    pub fn default_path() -> PathBuf {
        probe_dir().join(CONFIG_FILENAME)
    }

    /// Load config from `~/.pushprobe/config.json`.
    ///
    /// Returns [`Default`] if the file does not exist or cannot be parsed.
    pub fn load() -> Self {
        Self::load_from(&Self::default_path())
    }

    /// Load config from an explicit path, with the same fallback as [`load`](Self::load).
    pub fn load_from(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Save config to `~/.pushprobe/config.json`.
    pub fn save(&self) -> std::io::Result<()> {
        self.save_to(&Self::default_path())
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }

    /// Applies overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    ///
    /// Empty values are ignored.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = get(ENV_APP_KEY) {
            self.app_key = Some(v);
        }
        if let Some(v) = get(ENV_MASTER_SECRET) {
            self.master_secret = Some(v);
        }
        if let Some(v) = get(ENV_API_URL) {
            self.api_base_url = v;
        }
        if let Some(v) = get(ENV_SERIAL) {
            self.device_serial = Some(v);
        }
        self
    }

    /// Returns true if both halves of the credential pair are present.
    pub fn has_credentials(&self) -> bool {
        self.app_key.is_some() && self.master_secret.is_some()
    }
}

/// Wait and settle durations, in milliseconds.
///
/// The notification wait is long because segment-targeted delivery is much
/// slower than delivery to a single device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Budget for a notification to show up in the shade.
    pub notification_wait_ms: u64,
    /// Interval between notification checks.
    pub poll_interval_ms: u64,
    /// Settle time after enabling push, for backend registration.
    pub registration_settle_ms: u64,
    /// Settle time after navigation and content loads.
    pub window_update_ms: u64,
    /// Settle time after inbox actions.
    pub inbox_update_ms: u64,
    /// Settle time after ordinary clicks and key presses.
    pub action_settle_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            notification_wait_ms: 60_000,
            poll_interval_ms: 1_000,
            registration_settle_ms: 5_000,
            window_update_ms: 1_000,
            inbox_update_ms: 5_000,
            action_settle_ms: 500,
        }
    }
}

impl Timings {
    /// Timings with every settle removed and a short notification budget.
    ///
    /// Intended for in-memory devices where nothing is asynchronous.
    pub fn immediate() -> Self {
        Self {
            notification_wait_ms: 50,
            poll_interval_ms: 1,
            registration_settle_ms: 0,
            window_update_ms: 0,
            inbox_update_ms: 0,
            action_settle_ms: 0,
        }
    }

    /// The notification budget as a [`Duration`].
    pub fn notification_wait(&self) -> Duration {
        Duration::from_millis(self.notification_wait_ms)
    }

    /// The poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// The registration settle as a [`Duration`].
    pub fn registration_settle(&self) -> Duration {
        Duration::from_millis(self.registration_settle_ms)
    }

    /// The window update settle as a [`Duration`].
    pub fn window_update(&self) -> Duration {
        Duration::from_millis(self.window_update_ms)
    }

    /// The inbox update settle as a [`Duration`].
    pub fn inbox_update(&self) -> Duration {
        Duration::from_millis(self.inbox_update_ms)
    }

    /// The post-action settle as a [`Duration`].
    pub fn action_settle(&self) -> Duration {
        Duration::from_millis(self.action_settle_ms)
    }
}
