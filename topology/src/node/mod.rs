pub mod cloud;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a node as tracked by the designer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Stopped,
    Started,
    Suspended,
}

/// Groups the editor palette sorts device types into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    Router,
    Switch,
    EndDevice,
    SecurityDevice,
}

impl NodeCategory {
    pub const ALL: [NodeCategory; 4] = [
        NodeCategory::Router,
        NodeCategory::Switch,
        NodeCategory::EndDevice,
        NodeCategory::SecurityDevice,
    ];

    /// Palette group label shown to the user.
    pub fn label(&self) -> &'static str {
        match self {
            NodeCategory::Router => "Routers",
            NodeCategory::Switch => "Switches",
            NodeCategory::EndDevice => "End devices",
            NodeCategory::SecurityDevice => "Security devices",
        }
    }
}

/// Opaque token the presentation layer resolves to a configuration dialog.
/// Keeps device models free of any dependency on a UI toolkit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigPageId(pub &'static str);

/// Static descriptive data the editor needs to offer a device type.
pub trait DeviceMetadata {
    /// Icon resource path for new nodes of this type.
    fn default_symbol() -> &'static str;

    /// Display name in the device palette.
    fn symbol_name() -> &'static str;

    /// Palette categories this device type belongs to.
    fn categories() -> &'static [NodeCategory];

    /// Token for the settings dialog of this device type.
    fn configuration_page() -> ConfigPageId;
}

/// A connection point on a node. A port is free until a link occupies it;
/// the description is supplied by the link layer (e.g. "connected to R1
/// on Ethernet0").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    name: String,
    description: Option<String>,
}

impl Port {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_free(&self) -> bool {
        self.description.is_none()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn occupy(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    pub fn release(&mut self) {
        self.description = None;
    }
}

/// The compute a node is assigned to run on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeBinding {
    pub compute_id: String,
    /// Host name shown to the user.
    pub name: String,
}

impl ComputeBinding {
    pub fn new(compute_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            compute_id: compute_id.into(),
            name: name.into(),
        }
    }
}

/// State shared by every device model: identity, lifecycle status, the
/// port list and the compute the node is assigned to.
#[derive(Debug, Clone)]
pub struct NodeBase {
    node_id: Uuid,
    project_id: Uuid,
    name: String,
    status: NodeStatus,
    always_on: bool,
    ports: Vec<Port>,
    compute: ComputeBinding,
}

impl NodeBase {
    /// State for a node freshly placed in a project. Always-on nodes are
    /// live from the moment they are placed; everything else starts stopped.
    pub fn new(
        name: impl Into<String>,
        project_id: Uuid,
        compute: ComputeBinding,
        always_on: bool,
    ) -> Self {
        Self::restore(Uuid::new_v4(), name, project_id, compute, always_on)
    }

    /// State for a node that already exists on a compute (project open).
    pub fn restore(
        node_id: Uuid,
        name: impl Into<String>,
        project_id: Uuid,
        compute: ComputeBinding,
        always_on: bool,
    ) -> Self {
        let status = if always_on {
            NodeStatus::Started
        } else {
            NodeStatus::Stopped
        };
        Self {
            node_id,
            project_id,
            name: name.into(),
            status,
            always_on,
            ports: Vec::new(),
            compute,
        }
    }

    pub fn node_id(&self) -> Uuid {
        self.node_id
    }

    pub fn project_id(&self) -> Uuid {
        self.project_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> NodeStatus {
        self.status
    }

    pub fn is_always_on(&self) -> bool {
        self.always_on
    }

    pub fn compute(&self) -> &ComputeBinding {
        &self.compute
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn port(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name() == name)
    }

    /// Mutable access for the link layer to occupy or release a port.
    pub fn port_mut(&mut self, name: &str) -> Option<&mut Port> {
        self.ports.iter_mut().find(|p| p.name() == name)
    }

    pub(crate) fn set_ports(&mut self, ports: Vec<Port>) {
        self.ports = ports;
    }

    pub(crate) fn take_ports(&mut self) -> Vec<Port> {
        std::mem::take(&mut self.ports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_base(always_on: bool) -> NodeBase {
        NodeBase::new(
            "node-1",
            Uuid::new_v4(),
            ComputeBinding::new("local", "lab-server"),
            always_on,
        )
    }

    #[test]
    fn test_always_on_node_starts_started() {
        assert_eq!(test_base(true).status(), NodeStatus::Started);
        assert_eq!(test_base(false).status(), NodeStatus::Stopped);
    }

    #[test]
    fn test_port_occupancy() {
        let mut port = Port::new("eth0");
        assert!(port.is_free());
        assert!(port.description().is_none());

        port.occupy("connected to R1 on Ethernet0");
        assert!(!port.is_free());
        assert_eq!(port.description(), Some("connected to R1 on Ethernet0"));

        port.release();
        assert!(port.is_free());
    }

    #[test]
    fn test_port_lookup_by_name() {
        let mut base = test_base(true);
        base.set_ports(vec![Port::new("eth0"), Port::new("eth1")]);

        assert!(base.port("eth1").is_some());
        assert!(base.port("eth2").is_none());

        base.port_mut("eth0").unwrap().occupy("used");
        assert!(!base.ports()[0].is_free());
        assert!(base.ports()[1].is_free());
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(NodeCategory::EndDevice.label(), "End devices");
        assert_eq!(NodeCategory::ALL.len(), 4);
    }
}
