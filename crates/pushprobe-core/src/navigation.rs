//! Click sequences that move between the screens of the app under test.
//!
//! Every helper is fail-fast: a view that must be clicked and is missing
//! ends the scenario with [`ProbeError::ElementNotFound`].

use tracing::{debug, info, warn};

use crate::device::Device;
use crate::driver::DriverError;
use crate::error::{ensure, ProbeError};
use crate::selector::Selector;

const NAVIGATE_HOME: &str = "Navigate home";
const NAVIGATE_UP: &str = "Navigate up";
const PREFERENCES: &str = "Preferences";
const INBOX: &str = "Inbox";
const ALL_APPS: &str = "Apps";
const CLEAR_ALL: &str = "Clear all notifications.";
const SPINNER_CLASS: &str = "android.widget.Spinner";
const TEXT_VIEW_CLASS: &str = "android.widget.TextView";

/// Upper bound on launcher pages scrolled while looking for the app.
const MAX_LAUNCHER_PAGES: usize = 10;

/// Moves the device between the launcher, the app's screens and the
/// notification shade.
#[derive(Debug, Clone)]
pub struct Navigator {
    device: Device,
    app_package: String,
    app_label: String,
}

impl Navigator {
    /// Creates a navigator for the app with the given package and launcher label.
    pub fn new(device: Device, app_package: impl Into<String>, app_label: impl Into<String>) -> Self {
        Self {
            device,
            app_package: app_package.into(),
            app_label: app_label.into(),
        }
    }

    /// The device being navigated.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Brings the app to the foreground from wherever the device is.
    ///
    /// Wakes the screen, presses Home three times to get past any welcome
    /// overlay, opens the all-apps drawer and scrolls its horizontal list to
    /// the app's label. Launchers without an "Apps" button fall back to
    /// launching the package directly. Either way the app's package must be
    /// on screen afterwards.
    pub async fn open_app(&self) -> Result<(), ProbeError> {
        info!(package = %self.app_package, "opening app");
        self.device.wake_up().await?;
        for _ in 0..3 {
            self.device.press_home().await?;
        }

        let all_apps = self.device.by_description(ALL_APPS);
        if all_apps.exists().await? {
            all_apps.click().await?;
            self.device.wait_for_window_update().await;
            self.device.by_text(ALL_APPS).click().await?;
            self.device.settle().await;
            self.scroll_to_app_icon().await?;
            self.device.wait_for_window_update().await;
        } else {
            warn!("launcher has no all-apps button, launching by package");
            match self.device.launch_app(&self.app_package).await {
                Ok(()) => {}
                Err(DriverError::Unsupported(_)) => {
                    return Err(ProbeError::ElementNotFound {
                        selector: all_apps.describe(),
                    })
                }
                Err(e) => return Err(e.into()),
            }
        }

        let in_app = self
            .device
            .locator(Selector::new().package(self.app_package.as_str()))
            .exists()
            .await?;
        ensure(in_app, format!("Unable to detect {}", self.app_label))
    }

    /// Pages through the scrollable app list until the app's icon shows up,
    /// then clicks it.
    async fn scroll_to_app_icon(&self) -> Result<(), ProbeError> {
        let list = self.device.locator(Selector::new().scrollable(true));
        let icon = list.child(
            Selector::new()
                .class_name(TEXT_VIEW_CLASS)
                .text(self.app_label.as_str()),
        );

        for page in 0..MAX_LAUNCHER_PAGES {
            if icon.exists().await? {
                debug!(page, "found app icon");
                return icon.click().await;
            }
            let bounds = list.require().await?.bounds.ok_or_else(|| {
                DriverError::CommandFailed("scrollable app list has no bounds".to_string())
            })?;
            let (_, y) = bounds.center();
            let margin = bounds.width() / 10;
            self.device
                .swipe(bounds.right - margin, y, bounds.left + margin, y, 20)
                .await?;
        }

        Err(ProbeError::ElementNotFound {
            selector: icon.describe(),
        })
    }

    /// Returns to the app's home screen.
    ///
    /// Clicks "Navigate home" when it is showing; from a nested screen clicks
    /// "Navigate up" first. Anywhere else the screen is unrecognized.
    pub async fn navigate_to_app_home(&self) -> Result<(), ProbeError> {
        let home = self.device.by_description(NAVIGATE_HOME);
        let up = self.device.by_description(NAVIGATE_UP);

        if home.exists().await? {
            home.click().await?;
        } else if up.exists().await? {
            up.click().await?;
            self.device.wait_for_window_update().await;
            home.click().await?;
        } else {
            return Err(ProbeError::UnknownScreen("Where are we?".to_string()));
        }
        self.device.wait_for_window_update().await;
        debug!("at app home");
        Ok(())
    }

    /// Opens the preferences screen from the app's action bar.
    pub async fn go_to_preferences(&self) -> Result<(), ProbeError> {
        self.device.by_description(PREFERENCES).click().await?;
        self.device.wait_for_window_update().await;
        Ok(())
    }

    /// Leaves the preferences screen with Back and opens it again.
    pub async fn reenter_preferences(&self) -> Result<(), ProbeError> {
        self.device.press_back().await?;
        self.go_to_preferences().await
    }

    /// Goes home, then picks "Inbox" from the navigation spinner.
    pub async fn navigate_to_inbox(&self) -> Result<(), ProbeError> {
        self.navigate_to_app_home().await?;
        self.device.by_class(SPINNER_CLASS).click().await?;
        self.device.wait_for_window_update().await;
        self.device.by_text(INBOX).click().await?;
        self.device.wait_for_window_update().await;
        Ok(())
    }

    /// Pulls the notification shade down from the top edge.
    pub async fn open_notification_area(&self) -> Result<(), ProbeError> {
        let height = self.device.display_height().await?;
        self.device.swipe(50, 2, 50, height, 5).await?;
        Ok(())
    }

    /// Opens the shade and dismisses every notification in it.
    ///
    /// When there is nothing to clear the shade is closed with Back instead.
    pub async fn clear_notifications(&self) -> Result<(), ProbeError> {
        self.open_notification_area().await?;
        let clear = self.device.by_description(CLEAR_ALL);
        if clear.exists().await? {
            clear.click().await?;
            self.device.settle().await;
        } else {
            warn!("no clear-all button in the notification shade");
            self.device.press_back().await?;
        }
        Ok(())
    }
}
