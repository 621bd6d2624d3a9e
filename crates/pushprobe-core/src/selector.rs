//! Selectors for locating views in a hierarchy.
//!
//! A [`Selector`] is a conjunction of optional criteria, mirroring the way
//! UiAutomator selectors are built: description, class name, text, sibling
//! index, package, resource id and a few boolean flags. String criteria
//! match exactly, the way `UiSelector.text()` and `description()` do.
//!
//! Hierarchical lookups ("the CheckBox inside the PUSH_ENABLE row") are
//! expressed as a path of selectors and resolved with [`resolve_path`].
//!
//! ```
//! use pushprobe_core::selector::Selector;
//!
//! let row = Selector::new().description("PUSH_ENABLE");
//! let checkbox = Selector::new().class_name("android.widget.CheckBox");
//! assert_eq!(row.to_string(), "description=\"PUSH_ENABLE\"");
//! assert_eq!(checkbox.to_string(), "class=\"android.widget.CheckBox\"");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::element::UiNode;

/// A set of criteria a node must satisfy. Unset criteria match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    /// Accessibility description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Widget class name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Displayed text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Resource id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    /// Package name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    /// Exact sibling index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// Required checkable flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkable: Option<bool>,
    /// Required scrollable flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrollable: Option<bool>,
}

impl Selector {
    /// Creates a selector that matches every node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires the accessibility description to match.
    pub fn description(mut self, value: impl Into<String>) -> Self {
        self.description = Some(value.into());
        self
    }

    /// Requires the widget class to match.
    pub fn class_name(mut self, value: impl Into<String>) -> Self {
        self.class_name = Some(value.into());
        self
    }

    /// Requires the displayed text to match.
    pub fn text(mut self, value: impl Into<String>) -> Self {
        self.text = Some(value.into());
        self
    }

    /// Requires the resource id to match.
    pub fn resource_id(mut self, value: impl Into<String>) -> Self {
        self.resource_id = Some(value.into());
        self
    }

    /// Requires the owning package to match.
    pub fn package(mut self, value: impl Into<String>) -> Self {
        self.package = Some(value.into());
        self
    }

    /// Requires the node's sibling index.
    pub fn index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Requires the checkable flag.
    pub fn checkable(mut self, checkable: bool) -> Self {
        self.checkable = Some(checkable);
        self
    }

    /// Requires the scrollable flag.
    pub fn scrollable(mut self, scrollable: bool) -> Self {
        self.scrollable = Some(scrollable);
        self
    }

    /// Returns true if `node` satisfies every criterion of this selector.
    pub fn matches(&self, node: &UiNode) -> bool {
        field_matches(self.description.as_deref(), node.content_desc.as_deref())
            && field_matches(self.class_name.as_deref(), node.class_name.as_deref())
            && field_matches(self.text.as_deref(), node.text.as_deref())
            && field_matches(self.resource_id.as_deref(), node.resource_id.as_deref())
            && field_matches(self.package.as_deref(), node.package.as_deref())
            && self.index.map_or(true, |i| node.index == i)
            && self.checkable.map_or(true, |c| node.checkable == c)
            && self.scrollable.map_or(true, |s| node.scrollable == s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(d) = &self.description {
            parts.push(format!("description=\"{}\"", d));
        }
        if let Some(c) = &self.class_name {
            parts.push(format!("class=\"{}\"", c));
        }
        if let Some(t) = &self.text {
            parts.push(format!("text=\"{}\"", t));
        }
        if let Some(r) = &self.resource_id {
            parts.push(format!("resource-id=\"{}\"", r));
        }
        if let Some(p) = &self.package {
            parts.push(format!("package=\"{}\"", p));
        }
        if let Some(i) = self.index {
            parts.push(format!("index={}", i));
        }
        if let Some(c) = self.checkable {
            parts.push(format!("checkable={}", c));
        }
        if let Some(s) = self.scrollable {
            parts.push(format!("scrollable={}", s));
        }
        if parts.is_empty() {
            write!(f, "<any>")
        } else {
            write!(f, "{}", parts.join(" "))
        }
    }
}

/// Formats a selector path as `outer > inner`.
pub fn describe_path(path: &[Selector]) -> String {
    path.iter()
        .map(Selector::to_string)
        .collect::<Vec<_>>()
        .join(" > ")
}

fn field_matches(expected: Option<&str>, value: Option<&str>) -> bool {
    match expected {
        None => true,
        Some(e) => value == Some(e),
    }
}

/// Depth-first, pre-order search for the first node matching `selector`.
pub fn find_first<'a>(nodes: &'a [UiNode], selector: &Selector) -> Option<&'a UiNode> {
    for node in nodes {
        if selector.matches(node) {
            return Some(node);
        }
        if let Some(found) = find_first(&node.children, selector) {
            return Some(found);
        }
    }
    None
}

/// Resolves a path of selectors, each one searched among the descendants of
/// the previous match.
///
/// Only the first match at each level is followed, the way a child lookup
/// on a resolved parent view behaves. An empty path resolves to nothing.
pub fn resolve_path<'a>(nodes: &'a [UiNode], path: &[Selector]) -> Option<&'a UiNode> {
    let (first, rest) = path.split_first()?;
    let mut current = find_first(nodes, first)?;
    for selector in rest {
        current = find_first(&current.children, selector)?;
    }
    Some(current)
}
