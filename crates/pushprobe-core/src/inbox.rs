//! The app's message inbox.

use tracing::debug;

use crate::device::{Device, UiObject};
use crate::error::ProbeError;
use crate::selector::Selector;

const LIST_VIEW_CLASS: &str = "android.widget.ListView";
const CHECK_BOX_CLASS: &str = "android.widget.CheckBox";
const INBOX_MESSAGE: &str = "Inbox message";
const MESSAGE_READ: &str = "Message read";
const MESSAGE_UNREAD: &str = "Message unread";
const MARK_READ: &str = "Mark Read";
const MARK_UNREAD: &str = "Mark Unread";
const DELETE: &str = "Delete";

/// The inbox screen.
#[derive(Debug, Clone)]
pub struct Inbox {
    device: Device,
}

impl Inbox {
    pub fn new(device: Device) -> Self {
        Self { device }
    }

    /// Number of messages in the list.
    ///
    /// The app removes the list view entirely while the inbox is empty, so a
    /// missing list counts as zero.
    pub async fn message_count(&self) -> Result<usize, ProbeError> {
        match self.device.by_class(LIST_VIEW_CLASS).resolve().await? {
            Some(list) => Ok(list.children.len()),
            None => Ok(0),
        }
    }

    /// The message at `position` in the list.
    pub fn message(&self, position: usize) -> InboxMessage {
        InboxMessage {
            device: self.device.clone(),
            row: self
                .device
                .locator(Selector::new().description(INBOX_MESSAGE).index(position)),
        }
    }

    /// The newest message.
    pub fn first_message(&self) -> InboxMessage {
        self.message(0)
    }
}

/// One row of the inbox list.
#[derive(Debug, Clone)]
pub struct InboxMessage {
    device: Device,
    row: UiObject,
}

impl InboxMessage {
    /// Whether the row shows the read indicator.
    pub async fn shows_read(&self) -> Result<bool, ProbeError> {
        Ok(self.indicator(MESSAGE_READ).exists().await?)
    }

    /// Whether the row shows the unread indicator.
    pub async fn shows_unread(&self) -> Result<bool, ProbeError> {
        Ok(self.indicator(MESSAGE_UNREAD).exists().await?)
    }

    fn indicator(&self, description: &str) -> UiObject {
        self.row.child(Selector::new().description(description))
    }

    /// Selects the row and marks it read.
    pub async fn mark_read(&self) -> Result<(), ProbeError> {
        self.select_and_apply(MARK_READ).await
    }

    /// Selects the row and marks it unread.
    pub async fn mark_unread(&self) -> Result<(), ProbeError> {
        self.select_and_apply(MARK_UNREAD).await
    }

    /// Selects the row and deletes it.
    pub async fn delete(&self) -> Result<(), ProbeError> {
        self.select_and_apply(DELETE).await
    }

    /// Checks the row's checkbox to enter selection mode, then clicks the
    /// action with the given description.
    async fn select_and_apply(&self, action: &str) -> Result<(), ProbeError> {
        debug!(action, "inbox action");
        self.row
            .child(Selector::new().class_name(CHECK_BOX_CLASS))
            .click()
            .await?;
        self.device.settle().await;
        self.device.by_description(action).click().await?;
        self.device.wait_for_inbox_update().await;
        Ok(())
    }
}
