//! UI node types for accessibility-based automation.
//!
//! This module defines the data structures representing one window's view
//! hierarchy as reported by the device. They are independent of the backend
//! that produced them; the adb adapter fills them from a UiAutomator window
//! dump and the test fakes build them by hand.

use serde::{Deserialize, Serialize};

/// Represents one view from the accessibility hierarchy.
///
/// Nodes form a tree via the `children` field. The `index` is the node's
/// position among its siblings, which is what an index selector matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiNode {
    /// Position of this node among its siblings.
    #[serde(default)]
    pub index: usize,

    /// The displayed text, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// The view's resource identifier (e.g. `com.example:id/title`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,

    /// The fully qualified widget class (e.g. `android.widget.CheckBox`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,

    /// The package owning the window this node belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,

    /// The accessibility description (content-desc).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_desc: Option<String>,

    /// Whether the view can hold a checked state.
    #[serde(default)]
    pub checkable: bool,

    /// Whether the view is currently checked.
    #[serde(default)]
    pub checked: bool,

    /// Whether the view accepts clicks.
    #[serde(default)]
    pub clickable: bool,

    /// Whether the view is enabled.
    #[serde(default)]
    pub enabled: bool,

    /// Whether the view scrolls.
    #[serde(default)]
    pub scrollable: bool,

    /// On-screen bounds in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,

    /// Child nodes nested within this node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<UiNode>,
}

impl UiNode {
    /// Creates an enabled node of the given widget class.
    pub fn with_class(class_name: impl Into<String>) -> Self {
        Self {
            class_name: Some(class_name.into()),
            enabled: true,
            ..Self::default()
        }
    }

    /// Sets the accessibility description.
    pub fn desc(mut self, desc: impl Into<String>) -> Self {
        self.content_desc = Some(desc.into());
        self
    }

    /// Sets the displayed text.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the resource identifier.
    pub fn resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    /// Sets the owning package.
    pub fn package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    /// Sets the sibling index.
    pub fn index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Marks the node checkable with the given checked state.
    pub fn checked(mut self, checked: bool) -> Self {
        self.checkable = true;
        self.checked = checked;
        self
    }

    /// Sets the enabled flag.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the scrollable flag.
    pub fn scrollable(mut self, scrollable: bool) -> Self {
        self.scrollable = scrollable;
        self
    }

    /// Sets the bounds.
    pub fn bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Appends a child, assigning its sibling index.
    pub fn child(mut self, child: UiNode) -> Self {
        let index = self.children.len();
        self.children.push(child.index(index));
        self
    }

    /// Returns a one-line human readable summary, used by `dump` output.
    pub fn summary(&self) -> String {
        let class = self
            .class_name
            .as_deref()
            .and_then(|c| c.rsplit('.').next())
            .unwrap_or("?");
        let mut parts = vec![class.to_string()];
        if let Some(desc) = &self.content_desc {
            parts.push(format!("desc=\"{}\"", desc));
        }
        if let Some(text) = self.text.as_deref().filter(|t| !t.is_empty()) {
            parts.push(format!("text=\"{}\"", text));
        }
        if self.checkable {
            parts.push(format!("checked={}", self.checked));
        }
        if !self.enabled {
            parts.push("disabled".to_string());
        }
        parts.join(" ")
    }
}

/// The bounds of a view, in screen pixels.
///
/// Matches the `[left,top][right,bottom]` form used by UiAutomator dumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    /// Left edge.
    pub left: i32,
    /// Top edge.
    pub top: i32,
    /// Right edge (exclusive).
    pub right: i32,
    /// Bottom edge (exclusive).
    pub bottom: i32,
}

impl Bounds {
    /// Creates bounds from the four edges.
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// The point a click on this view lands on.
    pub fn center(&self) -> (i32, i32) {
        ((self.left + self.right) / 2, (self.top + self.bottom) / 2)
    }

    /// Width in pixels.
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    /// Height in pixels.
    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Returns true if the point lies within these bounds.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
}
