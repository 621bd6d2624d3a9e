//! Shared test helpers for pushprobe-core integration tests.
//!
//! This module provides an in-memory stand-in for a device running the rich
//! push sample app ([`FakeApp`]), a recording push sender wired to it
//! ([`FakeSender`]), and a fixed-window driver ([`StaticScreen`]).

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use pushprobe_core::config::{Timings, DEFAULT_APP_LABEL, DEFAULT_APP_PACKAGE};
use pushprobe_core::device::Device;
use pushprobe_core::driver::{DeviceDriver, DeviceKey, DriverError};
use pushprobe_core::element::{Bounds, UiNode};
use pushprobe_core::navigation::Navigator;
use pushprobe_core::push::{Audience, DeliveryError, PushSender};
use pushprobe_core::scenario::ScenarioContext;
use pushprobe_core::settings::{effective_enabled, SettingKind, CATALOGUE};

pub const DISPLAY_WIDTH: i32 = 1080;
pub const DISPLAY_HEIGHT: i32 = 2000;

const LAUNCHER_PACKAGE: &str = "com.android.launcher";
const SYSTEM_UI_PACKAGE: &str = "com.android.systemui";

/// Launcher pages of the all-apps drawer. The sample app is on the second page.
const LAUNCHER_PAGES: &[&[&str]] = &[
    &["Calculator", "Camera", "Clock", "Contacts"],
    &["Gallery", DEFAULT_APP_LABEL, "Settings"],
];

/// Number of window dumps a push stays in flight before it lands.
const DELIVERY_POLLS: u32 = 2;

/// Resource id prefix of views the fake reacts to.
const ACTION_PREFIX: &str = "fake:";

// ---------------------------------------------------------------------------
// Fake app model
// ---------------------------------------------------------------------------

/// A time-of-day value as the picker shows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTime {
    pub hour: u32,
    pub minute: u32,
    pub pm: bool,
}

impl ClockTime {
    pub const fn new(hour: u32, minute: u32, pm: bool) -> Self {
        Self { hour, minute, pm }
    }

    fn bump(&mut self, field: usize) {
        match field {
            0 => self.hour = self.hour % 12 + 1,
            1 => self.minute = (self.minute + 1) % 60,
            _ => self.pm = !self.pm,
        }
    }

    fn field_text(&self, field: usize) -> String {
        match field {
            0 => self.hour.to_string(),
            1 => format!("{:02}", self.minute),
            _ => (if self.pm { "PM" } else { "AM" }).to_string(),
        }
    }

    /// The concatenation of the three picker fields.
    pub fn text(&self) -> String {
        (0..3).map(|f| self.field_text(f)).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Screen {
    Launcher,
    AllApps { page: usize },
    Home,
    Inbox,
    Preferences,
    TimePicker { key: &'static str, working: ClockTime },
    MessageView,
}

impl Screen {
    fn name(&self) -> &'static str {
        match self {
            Screen::Launcher => "launcher",
            Screen::AllApps { .. } => "all_apps",
            Screen::Home => "home",
            Screen::Inbox => "inbox",
            Screen::Preferences => "preferences",
            Screen::TimePicker { .. } => "time_picker",
            Screen::MessageView => "message_view",
        }
    }
}

/// Which pushes the fake lets through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    WhileEnabled,
    Always,
    Never,
}

/// Values captured when the preferences screen is entered.
#[derive(Debug, Clone)]
struct Snapshot {
    toggles: HashMap<&'static str, bool>,
    times: HashMap<&'static str, ClockTime>,
}

#[derive(Debug)]
struct State {
    stack: Vec<Screen>,
    shade_open: bool,
    spinner_open: bool,
    dialog_open: bool,
    toggles: HashMap<&'static str, bool>,
    times: HashMap<&'static str, ClockTime>,
    snapshot: Option<Snapshot>,
    /// Notifications in the shade, oldest first.
    shade: Vec<Audience>,
    /// In-flight pushes with the dumps left before they land.
    pending: Vec<(Audience, u32)>,
    dropped: usize,
    /// Inbox messages, newest first; `true` means read.
    inbox: Vec<bool>,
    selected: Option<usize>,
    forget_on_reenter: Option<&'static str>,
    /// A toggle that turns on but never back off.
    latched: Option<&'static str>,
    delivery: Delivery,
    /// Copies of each push that land.
    copies: usize,
    ignores_mark_read: bool,
    has_all_apps_button: bool,
    supports_launch: bool,
    launched: Vec<String>,
    taps: usize,
}

impl State {
    fn top(&self) -> &Screen {
        self.stack.last().unwrap_or(&Screen::Launcher)
    }

    fn reset_to_home(&mut self) {
        self.stack = vec![Screen::Launcher, Screen::Home];
        self.spinner_open = false;
        self.selected = None;
    }

    fn settle_pending(&mut self) {
        let mut landed = Vec::new();
        for (audience, polls) in self.pending.iter_mut() {
            *polls = polls.saturating_sub(1);
            if *polls == 0 {
                landed.push(audience.clone());
            }
        }
        self.pending.retain(|(_, polls)| *polls > 0);
        for audience in landed {
            self.shade.push(audience);
            self.inbox.insert(0, false);
        }
    }

    fn enter_preferences(&mut self) {
        self.snapshot = Some(Snapshot {
            toggles: self.toggles.clone(),
            times: self.times.clone(),
        });
        self.stack.push(Screen::Preferences);
    }

    fn leave_preferences(&mut self) {
        self.stack.pop();
        if let (Some(key), Some(snapshot)) = (self.forget_on_reenter, self.snapshot.take()) {
            // Toggles never written yet read as unchecked.
            if self.toggles.contains_key(key) || snapshot.toggles.contains_key(key) {
                self.toggles
                    .insert(key, snapshot.toggles.get(key).copied().unwrap_or(false));
            }
            if let Some(t) = snapshot.times.get(key) {
                self.times.insert(key, *t);
            }
        }
    }

    fn press_key(&mut self, key: DeviceKey) {
        match key {
            DeviceKey::WakeUp => {}
            DeviceKey::Home => {
                self.stack = vec![Screen::Launcher];
                self.shade_open = false;
                self.spinner_open = false;
                self.dialog_open = false;
                self.selected = None;
            }
            DeviceKey::Back => self.press_back(),
        }
    }

    fn press_back(&mut self) {
        if self.shade_open {
            self.shade_open = false;
            return;
        }
        if self.spinner_open {
            self.spinner_open = false;
            return;
        }
        match self.top().clone() {
            Screen::Home if self.dialog_open => self.dialog_open = false,
            Screen::Inbox if self.selected.is_some() => self.selected = None,
            Screen::Preferences => self.leave_preferences(),
            Screen::Launcher => {}
            _ => {
                self.stack.pop();
            }
        }
    }

    fn apply(&mut self, action: &str) {
        let (verb, arg) = action.split_once(':').unwrap_or((action, ""));
        match verb {
            "all_apps" => self.stack.push(Screen::AllApps { page: 0 }),
            "apps_tab" => {}
            "icon" => {
                if arg == DEFAULT_APP_LABEL {
                    self.reset_to_home();
                }
            }
            "nav_home" | "nav_up" => self.reset_to_home(),
            "spinner" => self.spinner_open = true,
            "spinner_home" => self.reset_to_home(),
            "spinner_inbox" => {
                self.reset_to_home();
                self.stack.push(Screen::Inbox);
            }
            "preferences" => self.enter_preferences(),
            "pref" => self.click_preference(arg),
            "bump" => {
                let field: usize = arg.parse().unwrap();
                if let Some(Screen::TimePicker { working, .. }) = self.stack.last_mut() {
                    working.bump(field);
                }
            }
            "ok" => {
                if let Some(Screen::TimePicker { key, working }) = self.stack.pop() {
                    self.times.insert(key, working);
                }
            }
            "cancel" => {
                self.stack.pop();
            }
            "clear_all" => {
                self.shade.clear();
                self.shade_open = false;
            }
            "open_notification" => {
                let index: usize = arg.parse().unwrap();
                let audience = self.shade.remove(index);
                self.shade_open = false;
                match audience {
                    Audience::Segment(_) => {
                        self.reset_to_home();
                        self.dialog_open = true;
                    }
                    Audience::All => self.stack.push(Screen::MessageView),
                }
            }
            "select" => self.selected = Some(arg.parse().unwrap()),
            "mark_read" | "mark_unread" => {
                if let Some(i) = self.selected.take() {
                    if verb == "mark_unread" || !self.ignores_mark_read {
                        self.inbox[i] = verb == "mark_read";
                    }
                }
            }
            "delete" => {
                if let Some(i) = self.selected.take() {
                    self.inbox.remove(i);
                }
            }
            other => panic!("fake app has no action {:?}", other),
        }
    }

    fn click_preference(&mut self, key: &str) {
        let Some(descriptor) = CATALOGUE.iter().find(|d| d.key == key) else {
            return;
        };
        if !self.is_enabled(descriptor.key) {
            return;
        }
        match descriptor.kind {
            SettingKind::Toggle => {
                let latched = self.latched == Some(descriptor.key);
                let value = self.toggles.entry(descriptor.key).or_insert(false);
                *value = !*value || latched;
            }
            SettingKind::TimeOfDay => {
                let working = self.times[descriptor.key];
                self.stack.push(Screen::TimePicker {
                    key: descriptor.key,
                    working,
                });
            }
        }
    }

    fn is_enabled(&self, key: &str) -> bool {
        effective_enabled(key, |k: &str| self.toggles.get(k).copied().unwrap_or(false))
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    fn render(&self) -> Vec<UiNode> {
        let mut roots = if self.shade_open {
            vec![self.render_shade()]
        } else {
            match self.top() {
                Screen::Launcher => vec![self.render_launcher()],
                Screen::AllApps { page } => vec![render_all_apps(*page)],
                Screen::Home => vec![self.render_home()],
                Screen::Inbox => vec![self.render_inbox()],
                Screen::Preferences => vec![self.render_preferences()],
                Screen::TimePicker { working, .. } => vec![render_time_picker(working)],
                Screen::MessageView => vec![render_message_view()],
            }
        };
        let mut slot = 0;
        for root in &mut roots {
            assign_bounds(root, &mut slot);
        }
        roots
    }

    fn render_launcher(&self) -> UiNode {
        let mut root = UiNode::with_class("android.widget.FrameLayout").package(LAUNCHER_PACKAGE);
        if self.has_all_apps_button {
            root = root.child(action(UiNode::with_class("android.widget.TextView").desc("Apps"), "all_apps"));
        }
        root
    }

    fn render_shade(&self) -> UiNode {
        let mut root = UiNode::with_class("android.widget.FrameLayout").package(SYSTEM_UI_PACKAGE);
        for (i, _) in self.shade.iter().enumerate() {
            root = root.child(
                UiNode::with_class("android.widget.LinearLayout")
                    .child(UiNode::with_class("android.widget.TextView").text(DEFAULT_APP_LABEL))
                    .child(action(
                        UiNode::with_class("android.widget.TextView").text("Rich Push Alert"),
                        &format!("open_notification:{}", i),
                    )),
            );
        }
        if !self.shade.is_empty() {
            root = root.child(action(
                UiNode::with_class("android.widget.ImageView").desc("Clear all notifications."),
                "clear_all",
            ));
        }
        root
    }

    fn app_bar(&self, spinner_label: &str, nav: &str) -> Vec<UiNode> {
        let (nav_desc, nav_action) = if nav == "home" {
            ("Navigate home", "nav_home")
        } else {
            ("Navigate up", "nav_up")
        };
        let mut nodes = vec![
            action(UiNode::with_class("android.widget.ImageView").desc(nav_desc), nav_action),
            action(
                UiNode::with_class("android.widget.Spinner")
                    .child(UiNode::with_class("android.widget.TextView").text(spinner_label)),
                "spinner",
            ),
            action(UiNode::with_class("android.widget.TextView").desc("Preferences"), "preferences"),
        ];
        if self.spinner_open {
            nodes.push(
                UiNode::with_class("android.widget.FrameLayout")
                    .child(action(UiNode::with_class("android.widget.TextView").text("Home"), "spinner_home"))
                    .child(action(UiNode::with_class("android.widget.TextView").text("Inbox"), "spinner_inbox")),
            );
        }
        nodes
    }

    fn render_home(&self) -> UiNode {
        let mut root = app_root();
        for node in self.app_bar("Home", "home") {
            root = root.child(node);
        }
        if self.dialog_open {
            root = root.child(
                UiNode::with_class("android.widget.FrameLayout")
                    .child(UiNode::with_class("android.webkit.WebView").desc("Rich push message dialog")),
            );
        }
        root
    }

    fn render_inbox(&self) -> UiNode {
        let mut root = app_root();
        for node in self.app_bar("Inbox", "up") {
            root = root.child(node);
        }
        if self.selected.is_some() {
            root = root
                .child(action(UiNode::with_class("android.widget.TextView").desc("Mark Read"), "mark_read"))
                .child(action(UiNode::with_class("android.widget.TextView").desc("Mark Unread"), "mark_unread"))
                .child(action(UiNode::with_class("android.widget.TextView").desc("Delete"), "delete"));
        }
        if !self.inbox.is_empty() {
            let mut list = UiNode::with_class("android.widget.ListView");
            for (i, read) in self.inbox.iter().enumerate() {
                let indicator = if *read { "Message read" } else { "Message unread" };
                list = list.child(
                    UiNode::with_class("android.widget.LinearLayout")
                        .desc("Inbox message")
                        .child(action(
                            UiNode::with_class("android.widget.CheckBox").checked(self.selected == Some(i)),
                            &format!("select:{}", i),
                        ))
                        .child(UiNode::with_class("android.view.View").desc(indicator))
                        .child(UiNode::with_class("android.widget.TextView").text(DEFAULT_APP_LABEL)),
                );
            }
            root = root.child(list);
        }
        root
    }

    fn render_preferences(&self) -> UiNode {
        let mut list = UiNode::with_class("android.widget.ListView");
        for descriptor in CATALOGUE {
            let enabled = self.is_enabled(descriptor.key);
            let mut row = action(
                UiNode::with_class("android.widget.LinearLayout").desc(descriptor.key),
                &format!("pref:{}", descriptor.key),
            )
            .enabled(enabled)
            .child(UiNode::with_class("android.widget.TextView").text(descriptor.key).enabled(enabled));
            match descriptor.kind {
                SettingKind::Toggle => {
                    let checked = self.toggles.get(descriptor.key).copied().unwrap_or(false);
                    row = row.child(
                        action(
                            UiNode::with_class("android.widget.CheckBox").checked(checked),
                            &format!("pref:{}", descriptor.key),
                        )
                        .enabled(enabled),
                    );
                }
                SettingKind::TimeOfDay => {
                    row = row.child(
                        UiNode::with_class("android.widget.TextView")
                            .text(self.times[descriptor.key].text())
                            .enabled(enabled),
                    );
                }
            }
            list = list.child(row);
        }

        app_root()
            .child(action(UiNode::with_class("android.widget.ImageView").desc("Navigate up"), "nav_up"))
            .child(list)
    }
}

fn app_root() -> UiNode {
    UiNode::with_class("android.widget.FrameLayout").package(DEFAULT_APP_PACKAGE)
}

fn action(node: UiNode, name: &str) -> UiNode {
    let mut node = node.resource_id(format!("{}{}", ACTION_PREFIX, name));
    node.clickable = true;
    node
}

fn render_all_apps(page: usize) -> UiNode {
    let mut list = UiNode::with_class("android.widget.HorizontalScrollView")
        .scrollable(true)
        .bounds(Bounds::new(0, 200, DISPLAY_WIDTH, 1800));
    for label in LAUNCHER_PAGES[page] {
        list = list.child(action(
            UiNode::with_class("android.widget.TextView").text(*label),
            &format!("icon:{}", label),
        ));
    }
    UiNode::with_class("android.widget.FrameLayout")
        .package(LAUNCHER_PACKAGE)
        .child(action(UiNode::with_class("android.widget.TextView").text("Apps"), "apps_tab"))
        .child(list)
}

fn render_time_picker(time: &ClockTime) -> UiNode {
    let mut pickers = UiNode::with_class("android.widget.LinearLayout");
    for field in 0..3 {
        pickers = pickers.child(
            UiNode::with_class("android.widget.NumberPicker")
                .child(action(UiNode::with_class("android.widget.Button"), &format!("bump:{}", field)))
                .child(UiNode::with_class("android.widget.EditText").text(time.field_text(field))),
        );
    }
    UiNode::with_class("android.widget.FrameLayout")
        .package(DEFAULT_APP_PACKAGE)
        .child(pickers)
        .child(action(UiNode::with_class("android.widget.Button").text("Cancel"), "cancel"))
        .child(action(UiNode::with_class("android.widget.Button").text("OK"), "ok"))
}

fn render_message_view() -> UiNode {
    app_root()
        .child(action(UiNode::with_class("android.widget.ImageView").desc("Navigate up"), "nav_up"))
        .child(UiNode::with_class("android.webkit.WebView"))
}

/// Gives every actionable view its own horizontal band, in pre-order.
fn assign_bounds(node: &mut UiNode, slot: &mut i32) {
    if is_actionable(node) {
        let top = 100 + *slot * 60;
        node.bounds = Some(Bounds::new(0, top, DISPLAY_WIDTH, top + 50));
        *slot += 1;
    }
    for child in &mut node.children {
        assign_bounds(child, slot);
    }
}

fn is_actionable(node: &UiNode) -> bool {
    node.resource_id
        .as_deref()
        .map_or(false, |id| id.starts_with(ACTION_PREFIX))
}

fn hit_test<'a>(nodes: &'a [UiNode], x: i32, y: i32) -> Option<&'a UiNode> {
    let mut hit = None;
    for node in nodes {
        if is_actionable(node) && node.bounds.map_or(false, |b| b.contains(x, y)) {
            hit = Some(node);
        }
        if let Some(inner) = hit_test(&node.children, x, y) {
            hit = Some(inner);
        }
    }
    hit
}

/// In-memory device running the rich push sample app.
///
/// Every window dump advances in-flight pushes; a push lands (in the shade
/// and the inbox) on the second dump after it was sent, and only while
/// `PUSH_ENABLE` is on at send time. The builder switches below break that
/// model in the ways a misbehaving app would.
pub struct FakeApp {
    state: Mutex<State>,
}

impl FakeApp {
    pub fn new() -> Self {
        let mut times = HashMap::new();
        times.insert("QUIET_TIME_START", ClockTime::new(10, 0, true));
        times.insert("QUIET_TIME_END", ClockTime::new(7, 0, false));

        Self {
            state: Mutex::new(State {
                stack: vec![Screen::Launcher],
                shade_open: false,
                spinner_open: false,
                dialog_open: false,
                toggles: HashMap::new(),
                times,
                snapshot: None,
                shade: Vec::new(),
                pending: Vec::new(),
                dropped: 0,
                inbox: Vec::new(),
                selected: None,
                forget_on_reenter: None,
                latched: None,
                delivery: Delivery::WhileEnabled,
                copies: 1,
                ignores_mark_read: false,
                has_all_apps_button: true,
                supports_launch: true,
                launched: Vec::new(),
                taps: 0,
            }),
        }
    }

    /// Pre-populates the inbox (newest first, `true` = read).
    pub fn with_inbox(self, messages: &[bool]) -> Self {
        self.state.lock().unwrap().inbox = messages.to_vec();
        self
    }

    pub fn with_toggle(self, key: &'static str, on: bool) -> Self {
        self.state.lock().unwrap().toggles.insert(key, on);
        self
    }

    /// Leaves a stale notification in the shade.
    pub fn with_stale_notification(self) -> Self {
        self.state.lock().unwrap().shade.push(Audience::All);
        self
    }

    /// Launcher without an all-apps button.
    pub fn without_all_apps_button(self) -> Self {
        self.state.lock().unwrap().has_all_apps_button = false;
        self
    }

    /// Backend that cannot launch apps by package.
    pub fn without_launch_support(self) -> Self {
        self.state.lock().unwrap().supports_launch = false;
        self
    }

    /// Makes `key` lose its value whenever the preferences screen is left.
    pub fn forgetting_on_reenter(self, key: &'static str) -> Self {
        self.state.lock().unwrap().forget_on_reenter = Some(key);
        self
    }

    /// Makes `key` stay on once it has been switched on.
    pub fn latching(self, key: &'static str) -> Self {
        self.state.lock().unwrap().latched = Some(key);
        self
    }

    /// Lands pushes even while `PUSH_ENABLE` is off.
    pub fn delivering_while_disabled(self) -> Self {
        self.state.lock().unwrap().delivery = Delivery::Always;
        self
    }

    /// Drops every push.
    pub fn never_delivering(self) -> Self {
        self.state.lock().unwrap().delivery = Delivery::Never;
        self
    }

    /// Lands every push twice.
    pub fn delivering_twice(self) -> Self {
        self.state.lock().unwrap().copies = 2;
        self
    }

    /// Mark Read leaves the message unread.
    pub fn ignoring_mark_read(self) -> Self {
        self.state.lock().unwrap().ignores_mark_read = true;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Queues a push for delivery, or drops it while push is disabled.
    pub fn deliver(&self, audience: &Audience) {
        let mut state = self.state.lock().unwrap();
        let enabled = state.toggles.get("PUSH_ENABLE").copied().unwrap_or(false);
        let lands = match state.delivery {
            Delivery::WhileEnabled => enabled,
            Delivery::Always => true,
            Delivery::Never => false,
        };
        if lands {
            for _ in 0..state.copies {
                state.pending.push((audience.clone(), DELIVERY_POLLS));
            }
        } else {
            state.dropped += 1;
        }
    }

    pub fn screen(&self) -> &'static str {
        let state = self.state.lock().unwrap();
        if state.shade_open {
            "shade"
        } else {
            state.top().name()
        }
    }

    pub fn toggle(&self, key: &str) -> bool {
        self.state.lock().unwrap().toggles.get(key).copied().unwrap_or(false)
    }

    pub fn time(&self, key: &str) -> ClockTime {
        self.state.lock().unwrap().times[key]
    }

    pub fn inbox(&self) -> Vec<bool> {
        self.state.lock().unwrap().inbox.clone()
    }

    pub fn shade_len(&self) -> usize {
        self.state.lock().unwrap().shade.len()
    }

    pub fn dropped(&self) -> usize {
        self.state.lock().unwrap().dropped
    }

    pub fn launched(&self) -> Vec<String> {
        self.state.lock().unwrap().launched.clone()
    }

    pub fn taps(&self) -> usize {
        self.state.lock().unwrap().taps
    }
}

#[async_trait]
impl DeviceDriver for FakeApp {
    async fn connect(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }

    async fn dump_tree(&self) -> Result<Vec<UiNode>, DriverError> {
        let mut state = self.state.lock().unwrap();
        state.settle_pending();
        Ok(state.render())
    }

    async fn tap(&self, x: i32, y: i32) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        state.taps += 1;
        let tree = state.render();
        let Some(node) = hit_test(&tree, x, y) else {
            return Ok(());
        };
        if !node.enabled {
            return Ok(());
        }
        let id = node.resource_id.clone().unwrap_or_default();
        state.apply(&id[ACTION_PREFIX.len()..]);
        Ok(())
    }

    async fn swipe(
        &self,
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        _steps: u32,
    ) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        if start_y <= 10 && end_y > start_y {
            state.shade_open = true;
        } else if let Some(Screen::AllApps { page }) = state.stack.last_mut() {
            if start_x > end_x {
                *page = (*page + 1).min(LAUNCHER_PAGES.len() - 1);
            } else if *page > 0 {
                *page -= 1;
            }
        }
        Ok(())
    }

    async fn press_key(&self, key: DeviceKey) -> Result<(), DriverError> {
        self.state.lock().unwrap().press_key(key);
        Ok(())
    }

    async fn display_size(&self) -> Result<(i32, i32), DriverError> {
        Ok((DISPLAY_WIDTH, DISPLAY_HEIGHT))
    }

    async fn launch_app(&self, package: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        if !state.supports_launch {
            return Err(DriverError::Unsupported("launch_app"));
        }
        state.launched.push(package.to_string());
        if package != DEFAULT_APP_PACKAGE {
            return Err(DriverError::CommandFailed(format!("No activities found for {}", package)));
        }
        state.reset_to_home();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fake push sender
// ---------------------------------------------------------------------------

/// Push sender that records requests and hands them to a [`FakeApp`].
pub struct FakeSender {
    app: Arc<FakeApp>,
    sent: Mutex<Vec<Audience>>,
    reject_with: Option<u16>,
}

impl FakeSender {
    pub fn new(app: Arc<FakeApp>) -> Self {
        Self {
            app,
            sent: Mutex::new(Vec::new()),
            reject_with: None,
        }
    }

    /// A sender whose every request is rejected with `status`.
    pub fn rejecting(app: Arc<FakeApp>, status: u16) -> Self {
        Self {
            reject_with: Some(status),
            ..Self::new(app)
        }
    }

    pub fn sent(&self) -> Vec<Audience> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushSender for FakeSender {
    async fn send(&self, audience: &Audience) -> Result<(), DeliveryError> {
        self.sent.lock().unwrap().push(audience.clone());
        if let Some(status) = self.reject_with {
            return Err(DeliveryError::Rejected {
                status,
                body: "{\"ok\":false}".to_string(),
            });
        }
        self.app.deliver(audience);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixed window
// ---------------------------------------------------------------------------

/// Driver that always shows the same window.
pub struct StaticScreen {
    pub tree: Vec<UiNode>,
}

#[async_trait]
impl DeviceDriver for StaticScreen {
    async fn connect(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
    fn is_connected(&self) -> bool {
        true
    }
    async fn dump_tree(&self) -> Result<Vec<UiNode>, DriverError> {
        Ok(self.tree.clone())
    }
    async fn tap(&self, _x: i32, _y: i32) -> Result<(), DriverError> {
        Ok(())
    }
    async fn swipe(&self, _: i32, _: i32, _: i32, _: i32, _: u32) -> Result<(), DriverError> {
        Ok(())
    }
    async fn press_key(&self, _key: DeviceKey) -> Result<(), DriverError> {
        Ok(())
    }
    async fn display_size(&self) -> Result<(i32, i32), DriverError> {
        Ok((DISPLAY_WIDTH, DISPLAY_HEIGHT))
    }
}

/// Driver whose first `failures` window dumps fail, then shows `tree`.
pub struct FlakyScreen {
    pub tree: Vec<UiNode>,
    failures: Mutex<usize>,
}

impl FlakyScreen {
    pub fn new(tree: Vec<UiNode>, failures: usize) -> Self {
        Self {
            tree,
            failures: Mutex::new(failures),
        }
    }
}

#[async_trait]
impl DeviceDriver for FlakyScreen {
    async fn connect(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
    fn is_connected(&self) -> bool {
        true
    }
    async fn dump_tree(&self) -> Result<Vec<UiNode>, DriverError> {
        let mut failures = self.failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(DriverError::CommandFailed(
                "ERROR: could not get idle state.".to_string(),
            ));
        }
        Ok(self.tree.clone())
    }
    async fn tap(&self, _x: i32, _y: i32) -> Result<(), DriverError> {
        Ok(())
    }
    async fn swipe(&self, _: i32, _: i32, _: i32, _: i32, _: u32) -> Result<(), DriverError> {
        Ok(())
    }
    async fn press_key(&self, _key: DeviceKey) -> Result<(), DriverError> {
        Ok(())
    }
    async fn display_size(&self) -> Result<(i32, i32), DriverError> {
        Ok((DISPLAY_WIDTH, DISPLAY_HEIGHT))
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// A device over `driver` with every settle removed.
pub fn device(driver: Arc<dyn DeviceDriver>) -> Device {
    Device::new(driver, Timings::immediate())
}

pub fn navigator(app: &Arc<FakeApp>) -> Navigator {
    Navigator::new(device(app.clone()), DEFAULT_APP_PACKAGE, DEFAULT_APP_LABEL)
}

/// A scenario context over `app` with a recording sender.
pub fn context(app: &Arc<FakeApp>) -> (ScenarioContext, Arc<FakeSender>) {
    let sender = Arc::new(FakeSender::new(app.clone()));
    (ScenarioContext::new(navigator(app), sender.clone()), sender)
}
