//! Android device backend built on the `adb` command-line tool.
//!
//! [`AdbDriver`] implements [`DeviceDriver`] by shelling out to adb:
//! window dumps come from `uiautomator dump`, gestures and keys from the
//! `input` command, and the display size from `wm size`. [`Adb`] holds the
//! static helpers that do not need a device (listing attached devices).
//!
//! # Requirements
//!
//! The Android platform tools must be installed and `adb` must be on `PATH`
//! (or passed explicitly with [`AdbDriver::with_adb_path`]).
//!
//! # Example
//!
//! ```no_run
//! use pushprobe_core::adb::AdbDriver;
//! use pushprobe_core::driver::DeviceDriver;
//!
//! # async fn demo() -> Result<(), pushprobe_core::driver::DriverError> {
//! let mut driver = AdbDriver::new(Some("emulator-5554".to_string()));
//! driver.connect().await?;
//! let tree = driver.dump_tree().await?;
//! println!("{} root node(s)", tree.len());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::debug;

use crate::driver::{DeviceDriver, DeviceKey, DriverConfig, DriverError};
use crate::element::UiNode;
use crate::hierarchy::{parse_dump, HierarchyError};

/// Device-side path used when dumping straight to the terminal is refused.
const DUMP_FALLBACK_PATH: &str = "/sdcard/pushprobe_window_dump.xml";

/// Milliseconds per swipe step, matching UiAutomator's step pacing.
const SWIPE_STEP_MS: u32 = 5;

/// An attached device as reported by `adb devices -l`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdbDevice {
    /// The adb serial.
    pub serial: String,
    /// The connection state (e.g. "device", "offline", "unauthorized").
    pub state: String,
    /// The model name, when adb reports one.
    pub model: Option<String>,
}

/// Static helpers around the adb binary.
pub struct Adb;

impl Adb {
    /// Lists attached devices.
    ///
    /// # Errors
    ///
    /// - [`DriverError::Io`] if adb cannot be executed
    /// - [`DriverError::CommandFailed`] if adb exits with a failure status
    pub async fn list_devices(adb: &Path) -> Result<Vec<AdbDevice>, DriverError> {
        let output = Command::new(adb).args(["devices", "-l"]).output().await?;
        if !output.status.success() {
            return Err(DriverError::CommandFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(parse_devices_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parses the output of `adb devices -l`.
pub fn parse_devices_output(output: &str) -> Vec<AdbDevice> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("List of devices") && !line.starts_with('*'))
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let serial = fields.next()?.to_string();
            let state = fields.next()?.to_string();
            let model = fields
                .find_map(|f| f.strip_prefix("model:"))
                .map(String::from);
            Some(AdbDevice { serial, state, model })
        })
        .collect()
}

/// Parses the output of `wm size`, preferring an override size when set.
pub fn parse_wm_size(output: &str) -> Option<(i32, i32)> {
    let parse_line = |prefix: &str| {
        output.lines().find_map(|line| {
            let rest = line.trim().strip_prefix(prefix)?.trim();
            let (w, h) = rest.split_once('x')?;
            Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
        })
    };
    parse_line("Override size:").or_else(|| parse_line("Physical size:"))
}

/// [`DeviceDriver`] backed by the adb command-line tool.
pub struct AdbDriver {
    adb: PathBuf,
    serial: Option<String>,
    tcp_endpoint: Option<String>,
    connected: bool,
}

impl AdbDriver {
    /// Creates a driver for the device with the given serial (or the only
    /// attached device when `None`). The driver is **not** connected yet.
    pub fn new(serial: Option<String>) -> Self {
        Self {
            adb: PathBuf::from("adb"),
            serial,
            tcp_endpoint: None,
            connected: false,
        }
    }

    /// Creates a driver that runs `adb connect host:port` on connect.
    pub fn over_tcp(host: impl Into<String>, port: u16) -> Self {
        let endpoint = format!("{}:{}", host.into(), port);
        Self {
            adb: PathBuf::from("adb"),
            serial: Some(endpoint.clone()),
            tcp_endpoint: Some(endpoint),
            connected: false,
        }
    }

    /// Creates a driver from a [`DriverConfig`].
    pub fn from_config(config: DriverConfig) -> Self {
        match config {
            DriverConfig::Adb { serial } => Self::new(serial),
            DriverConfig::AdbTcp { host, port } => Self::over_tcp(host, port),
        }
    }

    /// Uses an explicit adb binary instead of the one on `PATH`.
    pub fn with_adb_path(mut self, adb: impl Into<PathBuf>) -> Self {
        self.adb = adb.into();
        self
    }

    /// The serial this driver targets, if any.
    pub fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    /// Leading arguments selecting the target device.
    fn device_args(&self) -> Vec<String> {
        match &self.serial {
            Some(serial) => vec!["-s".to_string(), serial.clone()],
            None => Vec::new(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<String, DriverError> {
        debug!(args = ?args, "adb");
        let output = Command::new(&self.adb)
            .args(self.device_args())
            .args(args)
            .output()
            .await?;

        if !output.status.success() {
            return Err(DriverError::CommandFailed(format!(
                "adb {}: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn shell(&self, args: &[&str]) -> Result<String, DriverError> {
        self.ensure_connected()?;
        let mut full = vec!["shell"];
        full.extend_from_slice(args);
        self.run(&full).await
    }

    fn ensure_connected(&self) -> Result<(), DriverError> {
        if self.connected {
            Ok(())
        } else {
            Err(DriverError::NotConnected)
        }
    }
}

#[async_trait]
impl DeviceDriver for AdbDriver {
    async fn connect(&mut self) -> Result<(), DriverError> {
        if let Some(endpoint) = self.tcp_endpoint.clone() {
            let output = Command::new(&self.adb)
                .args(["connect", &endpoint])
                .output()
                .await?;
            let stdout = String::from_utf8_lossy(&output.stdout);
            if !output.status.success() || !stdout.contains("connected to") {
                return Err(DriverError::DeviceUnavailable(format!(
                    "{}: {}",
                    endpoint,
                    stdout.trim()
                )));
            }
        }

        let state = self
            .run(&["get-state"])
            .await
            .map_err(|e| DriverError::DeviceUnavailable(e.to_string()))?;
        let state = state.trim();
        if state != "device" {
            let target = self.serial.clone().unwrap_or_else(|| "default device".to_string());
            return Err(DriverError::DeviceUnavailable(format!("{} is {}", target, state)));
        }

        self.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn dump_tree(&self) -> Result<Vec<UiNode>, DriverError> {
        self.ensure_connected()?;
        let direct = self.run(&["exec-out", "uiautomator", "dump", "/dev/tty"]).await?;
        match parse_dump(&direct) {
            Ok(tree) => Ok(tree),
            Err(HierarchyError::NoHierarchy(reason)) => {
                debug!(%reason, "direct dump refused, dumping to file");
                self.shell(&["uiautomator", "dump", DUMP_FALLBACK_PATH]).await?;
                let xml = self.run(&["exec-out", "cat", DUMP_FALLBACK_PATH]).await?;
                Ok(parse_dump(&xml)?)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn tap(&self, x: i32, y: i32) -> Result<(), DriverError> {
        self.shell(&["input", "tap", &x.to_string(), &y.to_string()])
            .await
            .map(|_| ())
    }

    async fn swipe(
        &self,
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        steps: u32,
    ) -> Result<(), DriverError> {
        let duration_ms = steps.max(1) * SWIPE_STEP_MS;
        self.shell(&[
            "input",
            "swipe",
            &start_x.to_string(),
            &start_y.to_string(),
            &end_x.to_string(),
            &end_y.to_string(),
            &duration_ms.to_string(),
        ])
        .await
        .map(|_| ())
    }

    async fn press_key(&self, key: DeviceKey) -> Result<(), DriverError> {
        self.shell(&["input", "keyevent", &key.keycode().to_string()])
            .await
            .map(|_| ())
    }

    async fn display_size(&self) -> Result<(i32, i32), DriverError> {
        let output = self.shell(&["wm", "size"]).await?;
        parse_wm_size(&output).ok_or_else(|| {
            DriverError::CommandFailed(format!("unexpected `wm size` output: {}", output.trim()))
        })
    }

    async fn launch_app(&self, package: &str) -> Result<(), DriverError> {
        let output = self
            .shell(&[
                "monkey",
                "-p",
                package,
                "-c",
                "android.intent.category.LAUNCHER",
                "1",
            ])
            .await?;
        if output.contains("No activities found") {
            return Err(DriverError::CommandFailed(format!(
                "no launchable activity in {}",
                package
            )));
        }
        Ok(())
    }
}
