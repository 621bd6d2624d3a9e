//! Parser for UiAutomator window dumps.
//!
//! `uiautomator dump` writes the active window as XML: a `<hierarchy>` root
//! holding nested `<node>` elements whose attributes carry the view state.
//! The format is flat enough that a tag scanner is sufficient; this module
//! turns it into a [`UiNode`] forest.
//!
//! ```
//! use pushprobe_core::hierarchy::parse_dump;
//!
//! let xml = r#"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?>
//! <hierarchy rotation="0">
//!   <node index="0" text="" class="android.widget.FrameLayout" content-desc="Preferences"
//!         enabled="true" bounds="[0,0][1080,1920]" />
//! </hierarchy>"#;
//!
//! let roots = parse_dump(xml).unwrap();
//! assert_eq!(roots[0].content_desc.as_deref(), Some("Preferences"));
//! ```

use std::sync::OnceLock;

use regex::{Captures, Regex};
use thiserror::Error;

use crate::element::{Bounds, UiNode};

/// Errors produced while parsing a window dump.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    /// The dump did not contain a `<hierarchy>` element.
    ///
    /// UiAutomator prints a one-line error instead of XML when the window
    /// is not ready; that line is carried here.
    #[error("no window hierarchy in dump: {0}")]
    NoHierarchy(String),

    /// A `</node>` appeared without a matching opening tag.
    #[error("unbalanced closing tag at byte {0}")]
    Unbalanced(usize),

    /// The dump ended with nodes still open.
    #[error("dump ended with {0} unclosed node(s)")]
    Unclosed(usize),
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"<(/?)node((?:\s+[\w:.-]+\s*=\s*"[^"]*")*)\s*(/?)>"#)
            .expect("node tag pattern is valid")
    })
}

fn attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"([\w:.-]+)\s*=\s*"([^"]*)""#).expect("attribute pattern is valid"))
}

fn bounds_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[(-?\d+),(-?\d+)\]\[(-?\d+),(-?\d+)\]").expect("bounds pattern is valid")
    })
}

fn entity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"&(#x[0-9a-fA-F]+|#[0-9]+|lt|gt|quot|apos|amp);").expect("entity pattern is valid")
    })
}

/// Parses a UiAutomator XML dump into the root nodes of the window.
///
/// Text surrounding the XML (such as the "UI hierchary dumped to" trailer
/// that `dump /dev/tty` appends) is ignored.
///
/// # Errors
///
/// - [`HierarchyError::NoHierarchy`] if the input has no `<hierarchy>` root
/// - [`HierarchyError::Unbalanced`] / [`HierarchyError::Unclosed`] for
///   malformed nesting
pub fn parse_dump(xml: &str) -> Result<Vec<UiNode>, HierarchyError> {
    if !xml.contains("<hierarchy") {
        let first_line = xml.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim();
        return Err(HierarchyError::NoHierarchy(first_line.to_string()));
    }

    let mut roots = Vec::new();
    let mut stack: Vec<UiNode> = Vec::new();

    for caps in tag_regex().captures_iter(xml) {
        let closing = !caps[1].is_empty();
        let self_closing = !caps[3].is_empty();

        if closing {
            let node = stack.pop().ok_or_else(|| {
                HierarchyError::Unbalanced(caps.get(0).map_or(0, |m| m.start()))
            })?;
            attach(&mut stack, &mut roots, node);
            continue;
        }

        let node = node_from_attributes(&caps[2]);
        if self_closing {
            attach(&mut stack, &mut roots, node);
        } else {
            stack.push(node);
        }
    }

    if !stack.is_empty() {
        return Err(HierarchyError::Unclosed(stack.len()));
    }
    Ok(roots)
}

fn attach(stack: &mut [UiNode], roots: &mut Vec<UiNode>, node: UiNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

fn node_from_attributes(attrs: &str) -> UiNode {
    let mut node = UiNode::default();
    for caps in attr_regex().captures_iter(attrs) {
        let value = unescape(&caps[2]);
        match &caps[1] {
            "index" => node.index = value.parse().unwrap_or(0),
            "text" => node.text = non_empty(value),
            "resource-id" => node.resource_id = non_empty(value),
            "class" => node.class_name = non_empty(value),
            "package" => node.package = non_empty(value),
            "content-desc" => node.content_desc = non_empty(value),
            "checkable" => node.checkable = value == "true",
            "checked" => node.checked = value == "true",
            "clickable" => node.clickable = value == "true",
            "enabled" => node.enabled = value == "true",
            "scrollable" => node.scrollable = value == "true",
            "bounds" => node.bounds = parse_bounds(&value),
            _ => {}
        }
    }
    node
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Parses `[left,top][right,bottom]`.
pub fn parse_bounds(value: &str) -> Option<Bounds> {
    let caps = bounds_regex().captures(value)?;
    let n = |i: usize| caps[i].parse::<i32>().ok();
    Some(Bounds::new(n(1)?, n(2)?, n(3)?, n(4)?))
}

fn unescape(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    entity_regex()
        .replace_all(value, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "amp" => Some('&'),
                _ if entity.starts_with("#x") => {
                    u32::from_str_radix(&entity[2..], 16).ok().and_then(char::from_u32)
                }
                _ => entity[1..].parse::<u32>().ok().and_then(char::from_u32),
            };
            decoded.map_or_else(|| caps[0].to_string(), |c| c.to_string())
        })
        .into_owned()
}
