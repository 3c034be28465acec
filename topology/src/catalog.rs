//! Registry of built-in device types for the editor palette.

use crate::node::cloud::CloudNode;
use crate::node::{ConfigPageId, DeviceMetadata, NodeCategory};

/// One device type as presented in the palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceEntry {
    pub symbol_name: &'static str,
    pub symbol: &'static str,
    pub categories: &'static [NodeCategory],
    pub configuration_page: ConfigPageId,
}

impl DeviceEntry {
    fn of<D: DeviceMetadata>() -> Self {
        Self {
            symbol_name: D::symbol_name(),
            symbol: D::default_symbol(),
            categories: D::categories(),
            configuration_page: D::configuration_page(),
        }
    }
}

/// Every built-in device type, in palette order.
pub fn builtin_devices() -> Vec<DeviceEntry> {
    vec![DeviceEntry::of::<CloudNode>()]
}

/// Built-in device types shown under one palette category.
pub fn devices_in_category(category: NodeCategory) -> Vec<DeviceEntry> {
    builtin_devices()
        .into_iter()
        .filter(|entry| entry.categories.contains(&category))
        .collect()
}
