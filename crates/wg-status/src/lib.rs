//! `WireGuard` interface and peer status.
//!
//! This crate queries a `WireGuard` control interface for its interfaces,
//! peers, kernel module state and version, and renders them as four
//! plain-text panels for a status page.
//!
//! # Backends
//!
//! - [`ToolControl`] runs `wg show all dump` (or reads a saved dump)
//! - `KernelControl` reads the kernel over netlink (`linux` feature)
//! - [`FakeControl`] is an in-memory backend for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use wg_status::{StatusAggregator, ToolControl};
//!
//! # async fn example() {
//! let report = StatusAggregator::new(ToolControl::new()).collect().await;
//! println!("{}", report.connection);
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod control;
pub mod dump;
pub mod error;
pub mod format;
mod keys;
#[cfg(feature = "linux")]
pub mod linux;
pub mod normalize;
pub mod report;
pub mod sysfs;
pub mod tool;
pub mod types;

pub use config::{Backend, ConfigError, StatusConfig};
pub use control::{ControlInterface, FakeControl, FakeFailure};
pub use error::{QueryError, Result};
pub use keys::{PublicKey, KEY_SIZE};
#[cfg(feature = "linux")]
pub use linux::KernelControl;
pub use normalize::{normalize, Handshake, InterfaceView, PeerView, StatusView};
pub use report::{Panel, QueryFailure, StatusAggregator, StatusDocument, StatusReport};
pub use tool::ToolControl;
pub use types::{AllowedIp, Endpoint, InterfaceSnapshot, OperState, PeerSnapshot, VersionInfo};
