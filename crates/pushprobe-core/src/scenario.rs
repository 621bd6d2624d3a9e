//! End-to-end scenarios and the suite runner.
//!
//! Each scenario is a linear, fail-fast sequence of steps: the first error
//! ends it, and nothing is retried. Before every scenario the suite brings
//! the app to the foreground and navigates to its home screen, so scenarios
//! do not depend on each other's final screen.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pushprobe_core::config::ProbeConfig;
//! use pushprobe_core::device::Device;
//! use pushprobe_core::driver::DriverConfig;
//! use pushprobe_core::push::AirshipSender;
//! use pushprobe_core::scenario::{ScenarioContext, Suite};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ProbeConfig::load().with_env_overrides();
//! let device = Device::from_config_connected(
//!     DriverConfig::Adb { serial: config.device_serial.clone() },
//!     config.timings,
//! )
//! .await?;
//! let sender = Arc::new(AirshipSender::from_config(&config)?);
//!
//! let report = Suite::new(ScenarioContext::from_config(device, sender, &config))
//!     .run()
//!     .await;
//! println!("{}", report.to_text());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn, Instrument};

use crate::config::ProbeConfig;
use crate::device::Device;
use crate::error::{ensure, ensure_eq, ProbeError};
use crate::inbox::Inbox;
use crate::navigation::Navigator;
use crate::notification::{message_dialog_displayed, web_view_displayed, RichPushNotification};
use crate::push::{Audience, PushSender};
use crate::report::{RunReport, ScenarioReport};
use crate::settings::{
    SettingsVerifier, LOCATION_BACKGROUND_ENABLE, LOCATION_ENABLE, LOCATION_FOREGROUND_ENABLE,
    PUSH_ENABLE, QUIET_TIME_ENABLE, QUIET_TIME_END, QUIET_TIME_START, SOUND_ENABLE,
    VIBRATE_ENABLE,
};
use crate::wait::PollOutcome;

/// Segment targeted by the in-app delivery step.
pub const HOME_SEGMENT: &str = "home";

/// The scenarios of the suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Notification delivery, display, and suppression while push is off.
    Notification,
    /// Inbox message arrival, read/unread transitions, and deletion.
    Inbox,
    /// Persistence of every preference and the enabled state of dependents.
    Preferences,
}

impl ScenarioKind {
    /// All scenarios in default execution order.
    pub const ALL: [ScenarioKind; 3] = [
        ScenarioKind::Notification,
        ScenarioKind::Inbox,
        ScenarioKind::Preferences,
    ];

    /// The scenario's command-line name.
    pub fn name(self) -> &'static str {
        match self {
            ScenarioKind::Notification => "notification",
            ScenarioKind::Inbox => "inbox",
            ScenarioKind::Preferences => "preferences",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScenarioKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScenarioKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown scenario '{}' (expected one of: notification, inbox, preferences)",
                    s
                )
            })
    }
}

/// Everything a scenario needs: the device, navigation, and a push sender.
#[derive(Clone)]
pub struct ScenarioContext {
    navigator: Navigator,
    sender: Arc<dyn PushSender>,
}

impl ScenarioContext {
    pub fn new(navigator: Navigator, sender: Arc<dyn PushSender>) -> Self {
        Self { navigator, sender }
    }

    /// Builds a context for the app named in `config`.
    pub fn from_config(device: Device, sender: Arc<dyn PushSender>, config: &ProbeConfig) -> Self {
        Self::new(
            Navigator::new(device, config.app_package.clone(), config.app_label.clone()),
            sender,
        )
    }

    pub fn device(&self) -> &Device {
        self.navigator.device()
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn settings(&self) -> SettingsVerifier {
        SettingsVerifier::new(self.navigator.clone())
    }

    pub fn notification(&self) -> RichPushNotification {
        RichPushNotification::new(self.device().clone())
    }

    pub fn inbox(&self) -> Inbox {
        Inbox::new(self.device().clone())
    }

    /// Sends a rich push to `audience`.
    pub async fn send(&self, audience: Audience) -> Result<(), ProbeError> {
        info!(%audience, "sending push");
        self.sender.send(&audience).await?;
        Ok(())
    }

    /// Opens preferences, sets `PUSH_ENABLE`, and backs out again.
    pub async fn set_push_enabled(&self, enabled: bool) -> Result<(), ProbeError> {
        self.navigator.go_to_preferences().await?;
        self.settings().set_enabled(PUSH_ENABLE, enabled).await?;
        self.device().press_back().await?;
        Ok(())
    }

    /// Opens the shade and waits for the notification, failing if it never shows.
    async fn await_notification(&self) -> Result<(), ProbeError> {
        self.navigator.open_notification_area().await?;
        let outcome = self.notification().wait_for_arrival().await?;
        ensure(
            outcome.is_satisfied(),
            format!(
                "Rich push notification did not arrive within {}ms",
                self.device().timings().notification_wait_ms
            ),
        )
    }
}

impl fmt::Debug for ScenarioContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioContext")
            .field("navigator", &self.navigator)
            .field("sender", &"<dyn PushSender>")
            .finish()
    }
}

/// Delivery to all devices opens a standalone message view, delivery to the
/// `home` segment opens the in-app dialog, and nothing arrives while push is
/// disabled.
pub async fn notification_delivery(ctx: &ScenarioContext) -> Result<(), ProbeError> {
    let device = ctx.device();
    let notification = ctx.notification();

    ctx.set_push_enabled(true).await?;
    device.wait_for_registration().await;
    ctx.navigator().clear_notifications().await?;

    ctx.send(Audience::All).await?;
    ctx.await_notification().await?;
    notification.open().await?;
    device.wait_for_window_update().await;
    ensure(
        web_view_displayed(device).await?,
        "Failed to display notification in a webview",
    )?;

    ctx.send(Audience::Segment(HOME_SEGMENT.to_string())).await?;
    ctx.await_notification().await?;
    notification.open().await?;
    device.wait_for_window_update().await;
    ensure(
        message_dialog_displayed(device).await?,
        "Failed to display notification in the rich push dialog",
    )?;
    device.press_back().await?;

    ctx.set_push_enabled(false).await?;
    ctx.send(Audience::All).await?;
    ctx.navigator().open_notification_area().await?;
    let outcome = notification.wait_for_arrival().await?;
    ensure(
        outcome == PollOutcome::TimedOut && !notification.exists().await?,
        "Received push notification when push is disabled",
    )?;
    device.press_back().await?;
    Ok(())
}

/// A delivered message grows the inbox by one, starts unread, flips between
/// read and unread, and deleting it restores the original count.
pub async fn inbox_lifecycle(ctx: &ScenarioContext) -> Result<(), ProbeError> {
    let device = ctx.device();
    let inbox = ctx.inbox();

    ctx.navigator().navigate_to_inbox().await?;
    ctx.set_push_enabled(true).await?;
    device.wait_for_registration().await;

    let baseline = inbox.message_count().await?;
    info!(baseline, "inbox baseline");

    ctx.send(Audience::All).await?;
    ctx.await_notification().await?;
    device.press_back().await?;
    device.wait_for_inbox_update().await;

    ensure_eq(baseline + 1, inbox.message_count().await?, "inbox count after delivery")?;

    let message = inbox.first_message();
    ensure(
        message.shows_unread().await? && !message.shows_read().await?,
        "New message is not marked unread",
    )?;

    message.mark_read().await?;
    ensure(
        message.shows_read().await? && !message.shows_unread().await?,
        "Message did not switch to read",
    )?;

    message.mark_unread().await?;
    ensure(
        message.shows_unread().await? && !message.shows_read().await?,
        "Message did not switch back to unread",
    )?;

    message.delete().await?;
    ensure_eq(baseline, inbox.message_count().await?, "inbox count after delete")?;
    Ok(())
}

/// Every preference persists across leaving the screen, and dependents are
/// disabled while their governing toggle is off.
pub async fn preferences_persistence(ctx: &ScenarioContext) -> Result<(), ProbeError> {
    let settings = ctx.settings();
    ctx.navigator().go_to_preferences().await?;

    settings.verify_toggle(PUSH_ENABLE).await?;
    settings.set_enabled(PUSH_ENABLE, true).await?;

    settings.verify_toggle(SOUND_ENABLE).await?;
    settings.verify_toggle(VIBRATE_ENABLE).await?;
    settings.verify_toggle(QUIET_TIME_ENABLE).await?;

    settings.set_enabled(QUIET_TIME_ENABLE, true).await?;
    settings.verify_time_picker(QUIET_TIME_START).await?;
    settings.verify_time_picker(QUIET_TIME_END).await?;

    settings.set_enabled(QUIET_TIME_ENABLE, false).await?;
    settings.assert_dependents_disabled(QUIET_TIME_ENABLE).await?;

    settings.set_enabled(PUSH_ENABLE, false).await?;
    settings.assert_dependents_disabled(PUSH_ENABLE).await?;

    settings.verify_toggle(LOCATION_ENABLE).await?;
    settings.set_enabled(LOCATION_ENABLE, true).await?;
    settings.verify_toggle(LOCATION_FOREGROUND_ENABLE).await?;
    settings.verify_toggle(LOCATION_BACKGROUND_ENABLE).await?;

    settings.set_enabled(LOCATION_ENABLE, false).await?;
    settings.assert_dependents_disabled(LOCATION_ENABLE).await?;
    Ok(())
}

/// Per-scenario setup followed by the scenario body.
pub async fn run_scenario(ctx: &ScenarioContext, kind: ScenarioKind) -> Result<(), ProbeError> {
    ctx.navigator().open_app().await?;
    ctx.navigator().navigate_to_app_home().await?;
    match kind {
        ScenarioKind::Notification => notification_delivery(ctx).await,
        ScenarioKind::Inbox => inbox_lifecycle(ctx).await,
        ScenarioKind::Preferences => preferences_persistence(ctx).await,
    }
}

/// Runs scenarios one after another and collects a [`RunReport`].
///
/// A failing scenario is recorded and the suite moves on to the next one.
pub struct Suite {
    ctx: ScenarioContext,
    scenarios: Vec<ScenarioKind>,
    device_label: Option<String>,
}

impl Suite {
    /// A suite running every scenario in default order.
    pub fn new(ctx: ScenarioContext) -> Self {
        Self {
            ctx,
            scenarios: ScenarioKind::ALL.to_vec(),
            device_label: None,
        }
    }

    /// Restricts the suite to the given scenarios, in the given order.
    ///
    /// An empty list keeps the default selection.
    pub fn with_scenarios(mut self, scenarios: Vec<ScenarioKind>) -> Self {
        if !scenarios.is_empty() {
            self.scenarios = scenarios;
        }
        self
    }

    /// Names the device in the report.
    pub fn with_device_label(mut self, label: Option<String>) -> Self {
        self.device_label = label;
        self
    }

    /// The scenarios this suite will run.
    pub fn scenarios(&self) -> &[ScenarioKind] {
        &self.scenarios
    }

    /// Runs every selected scenario sequentially.
    pub async fn run(&self) -> RunReport {
        let mut report = RunReport::new(self.device_label.clone());

        for &kind in &self.scenarios {
            let span = info_span!("scenario", name = kind.name());
            let started_at = Utc::now();
            let start = Instant::now();

            let result = async {
                info!("scenario started");
                run_scenario(&self.ctx, kind).await
            }
            .instrument(span.clone())
            .await;

            let duration_ms = start.elapsed().as_millis() as u64;
            let scenario_report = span.in_scope(|| match result {
                Ok(()) => {
                    info!(duration_ms, "scenario passed");
                    ScenarioReport::passed(kind, started_at, duration_ms)
                }
                Err(e) => {
                    warn!(duration_ms, kind = e.kind(), error = %e, "scenario failed");
                    ScenarioReport::failed(kind, started_at, duration_ms, &e)
                }
            });
            report.push(scenario_report);
        }

        report.finish();
        report
    }
}
