//! Device driver trait for backend-agnostic UI automation.
//!
//! This module defines the [`DeviceDriver`] trait, the capability surface the
//! rest of the crate depends on: dumping the view hierarchy, tapping,
//! swiping, pressing keys and querying the display. Scenario, navigation and
//! verification code only ever talks to this trait, never to a concrete
//! automation stack.
//!
//! # Backend Selection
//!
//! Use [`DriverConfig`] to specify which backend to use at runtime:
//!
//! ```no_run
//! use pushprobe_core::driver::DriverConfig;
//!
//! // A USB-attached device or a local emulator, picked by serial
//! let config = DriverConfig::Adb {
//!     serial: Some("emulator-5554".to_string()),
//! };
//!
//! // A device reachable over adb-over-TCP
//! let config = DriverConfig::AdbTcp {
//!     host: "192.168.1.20".to_string(),
//!     port: 5555,
//! };
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::element::UiNode;
use crate::hierarchy::HierarchyError;
use crate::selector::{resolve_path, Selector};

/// Errors that can occur during device driver operations.
///
/// This enum unifies errors from all backends behind a single type,
/// allowing consumers to handle errors uniformly regardless of the
/// underlying automation backend.
#[derive(Error, Debug)]
pub enum DriverError {
    /// A device command failed with the given message.
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// The backend has not been connected yet.
    #[error("Not connected to device")]
    NotConnected,

    /// The requested device is not attached or not in the `device` state.
    #[error("Device not available: {0}")]
    DeviceUnavailable(String),

    /// The backend does not implement the operation.
    #[error("Operation not supported by this backend: {0}")]
    Unsupported(&'static str),

    /// An I/O error occurred while talking to the device.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The window dump could not be parsed.
    #[error("Hierarchy error: {0}")]
    Hierarchy(#[from] HierarchyError),
}

/// Configuration for selecting a device backend at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverConfig {
    /// Drive a device through the local adb server.
    ///
    /// With no serial, adb picks the single attached device.
    Adb {
        /// The adb serial of the device.
        serial: Option<String>,
    },
    /// Drive a device over adb-over-TCP, connecting to it first.
    AdbTcp {
        /// Hostname or IP address of the device.
        host: String,
        /// The adbd TCP port (typically 5555).
        port: u16,
    },
}

/// Hardware keys the scenarios press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKey {
    /// The back key.
    Back,
    /// The home key.
    Home,
    /// Wakes the screen if it is off.
    WakeUp,
}

impl DeviceKey {
    /// The Android key code for this key.
    pub fn keycode(self) -> u32 {
        match self {
            DeviceKey::Back => 4,
            DeviceKey::Home => 3,
            DeviceKey::WakeUp => 224,
        }
    }
}

/// Trait for backend-agnostic device UI automation.
///
/// Implementors provide the primitive capabilities; the trait supplies
/// default element lookup on top of [`dump_tree`](DeviceDriver::dump_tree).
/// Backends that can search on the device may override the lookups.
///
/// All device-facing methods are async so that process-based backends (adb)
/// and in-memory fakes share one surface.
#[async_trait]
pub trait DeviceDriver: Send + Sync {
    /// Establish the connection to the device and verify it is ready.
    async fn connect(&mut self) -> Result<(), DriverError>;

    /// Check whether [`connect`](DeviceDriver::connect) has succeeded.
    fn is_connected(&self) -> bool;

    /// Get the view hierarchy of the current window.
    async fn dump_tree(&self) -> Result<Vec<UiNode>, DriverError>;

    /// Tap at screen coordinates.
    async fn tap(&self, x: i32, y: i32) -> Result<(), DriverError>;

    /// Swipe between two points.
    ///
    /// `steps` controls the gesture speed; each step takes roughly 5 ms.
    async fn swipe(
        &self,
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        steps: u32,
    ) -> Result<(), DriverError>;

    /// Press a hardware key.
    async fn press_key(&self, key: DeviceKey) -> Result<(), DriverError>;

    /// The display size as `(width, height)` in pixels.
    async fn display_size(&self) -> Result<(i32, i32), DriverError>;

    /// Launch an application by package name.
    ///
    /// Not all backends support this. The default implementation returns
    /// [`DriverError::Unsupported`].
    async fn launch_app(&self, package: &str) -> Result<(), DriverError> {
        let _ = package;
        Err(DriverError::Unsupported("launch_app"))
    }

    /// Find the node at the end of a selector path.
    ///
    /// The default implementation calls [`dump_tree`](Self::dump_tree) and
    /// resolves the path locally.
    async fn find(&self, path: &[Selector]) -> Result<Option<UiNode>, DriverError> {
        let tree = self.dump_tree().await?;
        Ok(resolve_path(&tree, path).cloned())
    }
}
