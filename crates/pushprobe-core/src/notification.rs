//! The rich push notification as seen in the notification shade.
//!
//! A notification is only considered present when both its title and its
//! alert text are on screen. Either one alone can belong to something else:
//! the title doubles as the app's launcher label.

use tracing::{debug, info};

use crate::device::Device;
use crate::error::{ensure, ProbeError};
use crate::push::{DEFAULT_ALERT, DEFAULT_TITLE};
use crate::selector::Selector;
use crate::wait::{poll_until, PollOutcome, WaitOptions};

/// Widget class of the views that render message content.
pub const WEB_VIEW_CLASS: &str = "android.webkit.WebView";
/// Description of the web view inside the in-app message dialog.
pub const MESSAGE_DIALOG_DESCRIPTION: &str = "Rich push message dialog";

/// Locates the rich push notification in the shade.
#[derive(Debug, Clone)]
pub struct RichPushNotification {
    device: Device,
    title: String,
    alert: String,
}

impl RichPushNotification {
    /// The notification every push sent by [`AirshipSender`] produces.
    ///
    /// [`AirshipSender`]: crate::push::AirshipSender
    pub fn new(device: Device) -> Self {
        Self {
            device,
            title: DEFAULT_TITLE.to_string(),
            alert: DEFAULT_ALERT.to_string(),
        }
    }

    /// True iff the title and the alert text are both on screen.
    ///
    /// Both are looked up in the same window dump.
    pub async fn exists(&self) -> Result<bool, ProbeError> {
        let tree = self.device.dump().await?;
        let title = crate::selector::find_first(&tree, &Selector::new().text(self.title.as_str()));
        let alert = crate::selector::find_first(&tree, &Selector::new().text(self.alert.as_str()));
        Ok(title.is_some() && alert.is_some())
    }

    /// Polls the open shade until the notification shows up or the
    /// notification budget runs out.
    ///
    /// A timeout is returned, not raised: the caller knows whether it
    /// expected the notification. A failed window dump counts as "not there
    /// yet", so one bad dump does not end the wait.
    pub async fn wait_for_arrival(&self) -> Result<PollOutcome, ProbeError> {
        let timings = self.device.timings();
        let options = WaitOptions {
            timeout: timings.notification_wait(),
            interval: timings.poll_interval(),
        };
        let outcome = poll_until(options, move || async move {
            match self.exists().await {
                Ok(present) => Ok::<_, ProbeError>(present),
                Err(e) => {
                    debug!(error = %e, "window dump failed during notification wait");
                    Ok(false)
                }
            }
        })
        .await?;
        debug!(?outcome, "notification wait finished");
        Ok(outcome)
    }

    /// Opens the notification by clicking its alert text.
    pub async fn open(&self) -> Result<(), ProbeError> {
        ensure(self.exists().await?, "No push notifications to open")?;
        info!(alert = %self.alert, "opening notification");
        self.device.by_text(&self.alert).click().await
    }
}

/// Whether a standalone message web view is on screen.
pub async fn web_view_displayed(device: &Device) -> Result<bool, ProbeError> {
    Ok(device.by_class(WEB_VIEW_CLASS).exists().await?)
}

/// Whether the in-app message dialog is on screen.
pub async fn message_dialog_displayed(device: &Device) -> Result<bool, ProbeError> {
    Ok(device
        .locator(
            Selector::new()
                .class_name(WEB_VIEW_CLASS)
                .description(MESSAGE_DIALOG_DESCRIPTION),
        )
        .exists()
        .await?)
}
