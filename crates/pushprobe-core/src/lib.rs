//! # pushprobe-core
//!
//! Core library for end-to-end UI testing of a rich push inbox on Android.
//!
//! This crate drives a device through accessibility selectors to check that
//! push notifications arrive and open correctly, that inbox messages move
//! through their read/unread/deleted states, and that preferences persist.
//! It also sends the pushes it waits for.
//!
//! ## Modules
//!
//! - [`driver`] - The [`DeviceDriver`](driver::DeviceDriver) capability trait every backend implements
//! - [`adb`] - Android backend built on the `adb` CLI and `uiautomator dump`
//! - [`hierarchy`], [`element`], [`selector`] - Window dumps, view nodes and selector matching
//! - [`device`] - Device facade and lazily resolved view handles
//! - [`wait`] - Bounded fixed-interval polling
//! - [`push`] - Push sender trait and the HTTP implementation
//! - [`navigation`], [`notification`], [`settings`], [`inbox`] - Screen-level helpers
//! - [`scenario`] - The three scenarios and the suite runner
//! - [`report`] - Run reports and their JSON lines history
//! - [`config`] - Persistent configuration in `~/.pushprobe/`
//!
//! ## External Dependencies
//!
//! The Android backend requires the **Android platform tools** (`adb`) on
//! `PATH`, and a device or emulator with the sample app installed.
//!
//! ## Example
//!
//! ```no_run
//! use pushprobe_core::adb::Adb;
//! use pushprobe_core::hierarchy::parse_dump;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! for device in Adb::list_devices("adb".as_ref()).await? {
//!     println!("{} ({})", device.serial, device.state);
//! }
//!
//! let nodes = parse_dump(r#"<hierarchy><node index="0" text="Inbox" /></hierarchy>"#)?;
//! assert_eq!(nodes[0].text.as_deref(), Some("Inbox"));
//! # Ok(())
//! # }
//! ```

pub mod adb;
pub mod config;
pub mod device;
pub mod driver;
pub mod element;
pub mod error;
pub mod hierarchy;
pub mod inbox;
pub mod navigation;
pub mod notification;
pub mod push;
pub mod report;
pub mod scenario;
pub mod selector;
pub mod settings;
pub mod wait;
