//! Device models that mirror node state held by a remote compute.
//!
//! The compute is the source of truth for every node. Models in this crate
//! keep a local snapshot, push setting changes over the compute's REST API
//! and fold the replies back in. The editor layers (palette, dialogs, info
//! panel) read everything they need from here without the crate depending
//! on any UI toolkit.

pub mod catalog;
pub mod compute;
pub mod error;
pub mod node;
pub mod types;

pub use compute::{ComputeClient, HttpComputeClient};
pub use error::ComputeError;
pub use node::cloud::{CloudNode, CloudSettings};
pub use types::{HostInterface, NodeSyncResponse, PortMapping, SettingsPatch};
