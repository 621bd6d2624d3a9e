//! High-level device handle used by navigation, verification and scenarios.
//!
//! [`Device`] wraps an [`Arc<dyn DeviceDriver>`](DeviceDriver) together with
//! the run's [`Timings`], and hands out [`UiObject`] locators. A `UiObject`
//! is lazy: it stores a selector path and re-resolves it against a fresh
//! window dump on every query, the same way a UiAutomator `UiObject` does.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pushprobe_core::adb::AdbDriver;
//! use pushprobe_core::config::Timings;
//! use pushprobe_core::device::Device;
//! use pushprobe_core::driver::DeviceDriver;
//! use pushprobe_core::selector::Selector;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut driver = AdbDriver::new(None);
//! driver.connect().await?;
//! let device = Device::new(Arc::new(driver), Timings::default());
//!
//! let push = device.locator(Selector::new().description("PUSH_ENABLE"));
//! if push.exists().await? && !push.is_checked().await? {
//!     push.click().await?;
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::Timings;
use crate::driver::{DeviceDriver, DeviceKey, DriverConfig, DriverError};
use crate::element::UiNode;
use crate::error::ProbeError;
use crate::selector::{describe_path, Selector};

/// The device under test.
#[derive(Clone)]
pub struct Device {
    driver: Arc<dyn DeviceDriver>,
    timings: Timings,
}

impl Device {
    /// Creates a device over any [`DeviceDriver`] backend.
    pub fn new(driver: Arc<dyn DeviceDriver>, timings: Timings) -> Self {
        Self { driver, timings }
    }

    /// Builds the adb backend for `config`, connects it, and wraps it.
    pub async fn from_config_connected(
        config: DriverConfig,
        timings: Timings,
    ) -> Result<Self, DriverError> {
        let mut driver = crate::adb::AdbDriver::from_config(config);
        driver.connect().await?;
        Ok(Self::new(Arc::new(driver), timings))
    }

    /// Returns a reference to the underlying driver.
    pub fn driver(&self) -> &Arc<dyn DeviceDriver> {
        &self.driver
    }

    /// The timing budget of this run.
    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    /// A lazy handle on the first view matching `selector`.
    pub fn locator(&self, selector: Selector) -> UiObject {
        UiObject {
            driver: Arc::clone(&self.driver),
            path: vec![selector],
        }
    }

    /// Shortcut for a locator by accessibility description.
    pub fn by_description(&self, description: &str) -> UiObject {
        self.locator(Selector::new().description(description))
    }

    /// Shortcut for a locator by displayed text.
    pub fn by_text(&self, text: &str) -> UiObject {
        self.locator(Selector::new().text(text))
    }

    /// Shortcut for a locator by widget class.
    pub fn by_class(&self, class_name: &str) -> UiObject {
        self.locator(Selector::new().class_name(class_name))
    }

    /// Dumps the current window.
    pub async fn dump(&self) -> Result<Vec<UiNode>, DriverError> {
        self.driver.dump_tree().await
    }

    /// Presses Back and waits for the post-action settle.
    pub async fn press_back(&self) -> Result<(), DriverError> {
        self.press(DeviceKey::Back).await
    }

    /// Presses Home and waits for the post-action settle.
    pub async fn press_home(&self) -> Result<(), DriverError> {
        self.press(DeviceKey::Home).await
    }

    /// Wakes the screen.
    pub async fn wake_up(&self) -> Result<(), DriverError> {
        self.press(DeviceKey::WakeUp).await
    }

    async fn press(&self, key: DeviceKey) -> Result<(), DriverError> {
        debug!(?key, "press key");
        self.driver.press_key(key).await?;
        self.settle().await;
        Ok(())
    }

    /// Swipes between two points.
    pub async fn swipe(
        &self,
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        steps: u32,
    ) -> Result<(), DriverError> {
        self.driver.swipe(start_x, start_y, end_x, end_y, steps).await?;
        self.settle().await;
        Ok(())
    }

    /// Height of the display in pixels.
    pub async fn display_height(&self) -> Result<i32, DriverError> {
        Ok(self.driver.display_size().await?.1)
    }

    /// Launches the app by package, if the backend supports it.
    pub async fn launch_app(&self, package: &str) -> Result<(), DriverError> {
        self.driver.launch_app(package).await?;
        self.wait_for_window_update().await;
        Ok(())
    }

    /// Sleeps for `duration`, letting the UI catch up.
    ///
    /// The automation surface has no idle signal, so this is a fixed delay.
    pub async fn wait_for_idle(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }

    /// Post-action settle.
    pub async fn settle(&self) {
        self.wait_for_idle(self.timings.action_settle()).await;
    }

    /// Settle after navigation or content loads.
    pub async fn wait_for_window_update(&self) {
        self.wait_for_idle(self.timings.window_update()).await;
    }

    /// Settle after inbox list changes.
    pub async fn wait_for_inbox_update(&self) {
        self.wait_for_idle(self.timings.inbox_update()).await;
    }

    /// Settle after enabling push, while the app registers with the backend.
    pub async fn wait_for_registration(&self) {
        self.wait_for_idle(self.timings.registration_settle()).await;
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device").field("timings", &self.timings).finish()
    }
}

/// A lazily resolved view handle.
///
/// Every query dumps the window and resolves the selector path again, so a
/// handle stays valid across screen changes and simply reports absence when
/// its view is gone.
#[derive(Clone)]
pub struct UiObject {
    driver: Arc<dyn DeviceDriver>,
    path: Vec<Selector>,
}

impl UiObject {
    /// A handle on the first descendant of this view matching `selector`.
    pub fn child(&self, selector: Selector) -> UiObject {
        let mut path = self.path.clone();
        path.push(selector);
        UiObject {
            driver: Arc::clone(&self.driver),
            path,
        }
    }

    /// The selector path of this handle.
    pub fn path(&self) -> &[Selector] {
        &self.path
    }

    /// Human readable form of the selector path.
    pub fn describe(&self) -> String {
        describe_path(&self.path)
    }

    /// Resolves the view, if it is on screen.
    pub async fn resolve(&self) -> Result<Option<UiNode>, DriverError> {
        self.driver.find(&self.path).await
    }

    /// Resolves the view, failing with [`ProbeError::ElementNotFound`].
    pub async fn require(&self) -> Result<UiNode, ProbeError> {
        self.resolve()
            .await?
            .ok_or_else(|| ProbeError::ElementNotFound {
                selector: self.describe(),
            })
    }

    /// Whether the view is currently on screen.
    pub async fn exists(&self) -> Result<bool, DriverError> {
        Ok(self.resolve().await?.is_some())
    }

    /// The view's checked state.
    pub async fn is_checked(&self) -> Result<bool, ProbeError> {
        Ok(self.require().await?.checked)
    }

    /// The view's enabled flag.
    pub async fn is_enabled(&self) -> Result<bool, ProbeError> {
        Ok(self.require().await?.enabled)
    }

    /// The view's text, empty when it has none.
    pub async fn text(&self) -> Result<String, ProbeError> {
        Ok(self.require().await?.text.unwrap_or_default())
    }

    /// Taps the center of the view.
    pub async fn click(&self) -> Result<(), ProbeError> {
        let node = self.require().await?;
        let bounds = node.bounds.ok_or_else(|| {
            DriverError::CommandFailed(format!("{} has no bounds to tap", self.describe()))
        })?;
        let (x, y) = bounds.center();
        debug!(target = %self.describe(), x, y, "click");
        self.driver.tap(x, y).await?;
        Ok(())
    }
}

impl std::fmt::Debug for UiObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiObject").field("path", &self.describe()).finish()
    }
}
