//! Preference catalogue and the settings round-trip verifier.
//!
//! Preferences form a small forest: `PUSH_ENABLE` governs the sound,
//! vibrate and quiet-time toggles, `QUIET_TIME_ENABLE` governs the two
//! quiet-time pickers, and `LOCATION_ENABLE` governs the foreground and
//! background location toggles. A preference is only enabled in the UI
//! while every ancestor toggle is on (see [`effective_enabled`]).
//!
//! [`SettingsVerifier`] checks that values survive leaving and re-entering
//! the preferences screen.

use tracing::{debug, info};

use crate::device::{Device, UiObject};
use crate::error::{ProbeError, SettingValue};
use crate::navigation::Navigator;
use crate::selector::Selector;

const CHECK_BOX_CLASS: &str = "android.widget.CheckBox";
const NUMBER_PICKER_CLASS: &str = "android.widget.NumberPicker";
const BUTTON_CLASS: &str = "android.widget.Button";
const EDIT_TEXT_CLASS: &str = "android.widget.EditText";
const OK: &str = "OK";

/// Number of fields in a time picker (hour, minute, AM/PM).
pub const TIME_PICKER_FIELDS: usize = 3;

/// How a preference is edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    /// A checkbox preference.
    Toggle,
    /// A time-of-day picker dialog.
    TimeOfDay,
}

/// A preference row on the preferences screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingDescriptor {
    /// Accessibility description of the row.
    pub key: &'static str,
    /// How the preference is edited.
    pub kind: SettingKind,
    /// The toggle that must be on for this row to be enabled.
    pub parent: Option<&'static str>,
}

pub const PUSH_ENABLE: &str = "PUSH_ENABLE";
pub const SOUND_ENABLE: &str = "SOUND_ENABLE";
pub const VIBRATE_ENABLE: &str = "VIBRATE_ENABLE";
pub const QUIET_TIME_ENABLE: &str = "QUIET_TIME_ENABLE";
pub const QUIET_TIME_START: &str = "QUIET_TIME_START";
pub const QUIET_TIME_END: &str = "QUIET_TIME_END";
pub const LOCATION_ENABLE: &str = "LOCATION_ENABLE";
pub const LOCATION_FOREGROUND_ENABLE: &str = "LOCATION_FOREGROUND_ENABLE";
pub const LOCATION_BACKGROUND_ENABLE: &str = "LOCATION_BACKGROUND_ENABLE";

const fn toggle(key: &'static str, parent: Option<&'static str>) -> SettingDescriptor {
    SettingDescriptor {
        key,
        kind: SettingKind::Toggle,
        parent,
    }
}

const fn time_of_day(key: &'static str, parent: &'static str) -> SettingDescriptor {
    SettingDescriptor {
        key,
        kind: SettingKind::TimeOfDay,
        parent: Some(parent),
    }
}

/// Every preference of the app, in screen order.
pub const CATALOGUE: &[SettingDescriptor] = &[
    toggle(PUSH_ENABLE, None),
    toggle(SOUND_ENABLE, Some(PUSH_ENABLE)),
    toggle(VIBRATE_ENABLE, Some(PUSH_ENABLE)),
    toggle(QUIET_TIME_ENABLE, Some(PUSH_ENABLE)),
    time_of_day(QUIET_TIME_START, QUIET_TIME_ENABLE),
    time_of_day(QUIET_TIME_END, QUIET_TIME_ENABLE),
    toggle(LOCATION_ENABLE, None),
    toggle(LOCATION_FOREGROUND_ENABLE, Some(LOCATION_ENABLE)),
    toggle(LOCATION_BACKGROUND_ENABLE, Some(LOCATION_ENABLE)),
];

/// Looks up a preference by key.
pub fn descriptor(key: &str) -> Option<&'static SettingDescriptor> {
    CATALOGUE.iter().find(|d| d.key == key)
}

/// The governing toggles of `key`, nearest first.
pub fn ancestors(key: &str) -> Vec<&'static str> {
    let mut chain = Vec::new();
    let mut current = descriptor(key).and_then(|d| d.parent);
    while let Some(parent) = current {
        chain.push(parent);
        current = descriptor(parent).and_then(|d| d.parent);
    }
    chain
}

/// Preferences directly governed by `key`.
pub fn dependents(key: &str) -> Vec<&'static SettingDescriptor> {
    CATALOGUE.iter().filter(|d| d.parent == Some(key)).collect()
}

/// Whether the row for `key` is enabled in the UI, given the on/off state
/// of the toggles.
///
/// True iff `key` is a known preference and every ancestor toggle is on.
/// The row's own value does not matter.
pub fn effective_enabled(key: &str, is_on: impl Fn(&str) -> bool) -> bool {
    descriptor(key).is_some() && ancestors(key).into_iter().all(|a| is_on(a))
}

/// Drives the preferences screen and checks that values persist.
///
/// All operations expect the preferences screen to be showing and leave it
/// showing.
#[derive(Debug, Clone)]
pub struct SettingsVerifier {
    navigator: Navigator,
}

impl SettingsVerifier {
    pub fn new(navigator: Navigator) -> Self {
        Self { navigator }
    }

    fn device(&self) -> &Device {
        self.navigator.device()
    }

    fn row(&self, key: &str) -> UiObject {
        self.device().by_description(key)
    }

    fn checkbox(&self, key: &str) -> UiObject {
        self.row(key).child(Selector::new().class_name(CHECK_BOX_CLASS))
    }

    fn ok_button(&self) -> UiObject {
        self.device()
            .locator(Selector::new().class_name(BUTTON_CLASS).text(OK))
    }

    fn number_picker(&self, field: usize) -> UiObject {
        self.device()
            .locator(Selector::new().class_name(NUMBER_PICKER_CLASS).index(field))
    }

    /// Current checked state of a toggle preference.
    pub async fn is_checked(&self, key: &str) -> Result<bool, ProbeError> {
        self.checkbox(key).is_checked().await
    }

    /// Sets a toggle preference, clicking only when its state differs.
    pub async fn set_enabled(&self, key: &str, enabled: bool) -> Result<(), ProbeError> {
        let checkbox = self.checkbox(key);
        if checkbox.is_checked().await? != enabled {
            debug!(key, enabled, "toggling preference");
            checkbox.click().await?;
            self.device().settle().await;
        }
        Ok(())
    }

    /// Round-trips a toggle preference twice.
    ///
    /// Each round clicks the row, reads the new state, leaves and re-enters
    /// the preferences screen, and requires the same state to be read back.
    /// Two rounds bring the toggle back to where it started, which is
    /// checked as well.
    pub async fn verify_toggle(&self, key: &str) -> Result<(), ProbeError> {
        let original = self.is_checked(key).await?;

        for _ in 0..2 {
            self.row(key).click().await?;
            self.device().settle().await;
            let expected = self.is_checked(key).await?;

            self.navigator.reenter_preferences().await?;

            let actual = self.is_checked(key).await?;
            if actual != expected {
                return Err(ProbeError::PersistenceViolation {
                    setting: key.to_string(),
                    expected: SettingValue::Toggle(expected),
                    actual: SettingValue::Toggle(actual),
                });
            }
        }

        let restored = self.is_checked(key).await?;
        if restored != original {
            return Err(ProbeError::PersistenceViolation {
                setting: key.to_string(),
                expected: SettingValue::Toggle(original),
                actual: SettingValue::Toggle(restored),
            });
        }
        info!(key, "toggle persisted");
        Ok(())
    }

    /// Round-trips a time-of-day preference.
    ///
    /// Bumps each picker field once and confirms, then reopens the picker to
    /// capture the committed time (the fields only show it after a reopen).
    /// After leaving and re-entering the screen the picker must show the
    /// identical text.
    pub async fn verify_time_picker(&self, key: &str) -> Result<(), ProbeError> {
        let picker = self.row(key);
        let ok = self.ok_button();

        picker.click().await?;
        self.device().wait_for_window_update().await;
        for field in 0..TIME_PICKER_FIELDS {
            self.number_picker(field)
                .child(Selector::new().class_name(BUTTON_CLASS))
                .click()
                .await?;
            self.device().settle().await;
        }
        ok.click().await?;
        self.device().settle().await;

        picker.click().await?;
        self.device().wait_for_window_update().await;
        let captured = self.read_time().await?;
        ok.click().await?;
        self.device().settle().await;

        self.navigator.reenter_preferences().await?;

        picker.click().await?;
        self.device().wait_for_window_update().await;
        let reread = self.read_time().await?;
        ok.click().await?;
        self.device().settle().await;

        if captured != reread {
            return Err(ProbeError::PersistenceViolation {
                setting: key.to_string(),
                expected: SettingValue::Time(captured),
                actual: SettingValue::Time(reread),
            });
        }
        info!(key, time = %captured, "time picker persisted");
        Ok(())
    }

    /// Concatenated text of the open picker's fields.
    async fn read_time(&self) -> Result<String, ProbeError> {
        let mut time = String::new();
        for field in 0..TIME_PICKER_FIELDS {
            let text = self
                .number_picker(field)
                .child(Selector::new().class_name(EDIT_TEXT_CLASS))
                .text()
                .await?;
            time.push_str(&text);
        }
        Ok(time)
    }

    /// Requires the row for `key` to be disabled.
    pub async fn assert_disabled(&self, key: &str) -> Result<(), ProbeError> {
        if self.row(key).is_enabled().await? {
            return Err(ProbeError::AssertionFailed(format!(
                "preference {} is enabled while {} is off",
                key,
                ancestors(key).first().copied().unwrap_or("its parent")
            )));
        }
        Ok(())
    }

    /// Requires every preference directly governed by `parent` to be disabled.
    pub async fn assert_dependents_disabled(&self, parent: &str) -> Result<(), ProbeError> {
        for dependent in dependents(parent) {
            self.assert_disabled(dependent.key).await?;
        }
        Ok(())
    }
}
