use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

// ============================================================================
// Port Mappings
// ============================================================================

/// One entry of a cloud node's `ports_mapping`: binds a simulated port to an
/// attachment point on the compute host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PortMapping {
    /// Bridge the port to a physical host interface.
    Ethernet {
        name: String,
        interface: String,
        port_number: u32,
    },
    /// Bridge the port to a TAP device on the host.
    Tap {
        name: String,
        interface: String,
        port_number: u32,
    },
    /// Tunnel the port's traffic to a remote endpoint over UDP.
    Udp {
        name: String,
        port_number: u32,
        lport: u16,
        rhost: String,
        rport: u16,
    },
}

impl PortMapping {
    /// Name of the simulated port this entry backs.
    pub fn name(&self) -> &str {
        match self {
            PortMapping::Ethernet { name, .. } => name,
            PortMapping::Tap { name, .. } => name,
            PortMapping::Udp { name, .. } => name,
        }
    }

    pub fn port_number(&self) -> u32 {
        match self {
            PortMapping::Ethernet { port_number, .. } => *port_number,
            PortMapping::Tap { port_number, .. } => *port_number,
            PortMapping::Udp { port_number, .. } => *port_number,
        }
    }
}

// ============================================================================
// Host Interfaces
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceKind {
    Ethernet,
    Tap,
    Loopback,
}

impl InterfaceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterfaceKind::Ethernet => "ethernet",
            InterfaceKind::Tap => "tap",
            InterfaceKind::Loopback => "loopback",
        }
    }
}

/// A network interface present on a compute host, as reported by the
/// compute. Keyed by interface name in [`NodeSyncResponse::interfaces`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInterface {
    #[serde(rename = "type")]
    pub kind: InterfaceKind,
    /// Reserved interfaces (bridges, virtual NICs of other tools) that the
    /// mapping editor should hide by default.
    #[serde(default)]
    pub special: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

// ============================================================================
// Settings Patches
// ============================================================================

/// Option-name/value pairs submitted by a configuration dialog.
///
/// Patches stay dynamic on purpose: a dialog may submit options a given
/// node does not carry, and those must be ignored rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsPatch(BTreeMap<String, Value>);

impl SettingsPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, option: &str) -> Option<&Value> {
        self.0.get(option)
    }

    pub fn set(&mut self, option: impl Into<String>, value: Value) {
        self.0.insert(option.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Request a new display name for the node.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.set("name", Value::String(name.into()));
        self
    }

    /// Request a full replacement of the node's port mappings.
    pub fn with_ports_mapping(mut self, mapping: &[PortMapping]) -> Self {
        let value = serde_json::to_value(mapping).expect("port mappings always serialize");
        self.set("ports_mapping", value);
        self
    }
}

// ============================================================================
// Compute Requests / Responses
// ============================================================================

/// Body for node creation; carries the node's full settings snapshot so the
/// compute can come up with the node already configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateNodeRequest {
    pub node_id: Uuid,
    pub name: String,
    pub ports_mapping: Vec<PortMapping>,
}

/// Fields a compute may include when it echoes node state back after a
/// create or update request.
///
/// Absent fields stay `None` and are not applied. A field that is present
/// but malformed also decodes to `None`, so one bad entry never aborts the
/// rest of the reply. Unknown fields are ignored outright.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeSyncResponse {
    #[serde(
        default,
        deserialize_with = "lenient_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub ports_mapping: Option<Vec<PortMapping>>,
    #[serde(
        default,
        deserialize_with = "lenient_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub interfaces: Option<BTreeMap<String, HostInterface>>,
}

/// Decode a field by way of `Value` so a malformed value yields `None`
/// instead of failing the whole response.
fn lenient_opt<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ethernet_mapping_wire_shape() {
        let mapping = PortMapping::Ethernet {
            name: "eth0".to_string(),
            interface: "eth0".to_string(),
            port_number: 0,
        };

        let value = serde_json::to_value(&mapping).unwrap();
        assert_eq!(
            value,
            json!({"type": "ethernet", "name": "eth0", "interface": "eth0", "port_number": 0})
        );
    }

    #[test]
    fn test_udp_mapping_round_trip() {
        let raw = json!({
            "type": "udp",
            "name": "udp-20000",
            "port_number": 2,
            "lport": 20000,
            "rhost": "127.0.0.1",
            "rport": 30000
        });

        let mapping: PortMapping = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(mapping.name(), "udp-20000");
        assert_eq!(mapping.port_number(), 2);
        assert_eq!(serde_json::to_value(&mapping).unwrap(), raw);
    }

    #[test]
    fn test_response_missing_fields_decode_to_none() {
        let resp: NodeSyncResponse = serde_json::from_value(json!({})).unwrap();
        assert!(resp.ports_mapping.is_none());
        assert!(resp.interfaces.is_none());
    }

    #[test]
    fn test_response_malformed_field_is_dropped() {
        // ports_mapping is not a list here; the field must decode to None
        // while the well-formed interfaces field still comes through.
        let resp: NodeSyncResponse = serde_json::from_value(json!({
            "ports_mapping": 42,
            "interfaces": {
                "eth0": {"type": "ethernet", "special": false}
            },
            "console_host": "127.0.0.1"
        }))
        .unwrap();

        assert!(resp.ports_mapping.is_none());
        let interfaces = resp.interfaces.unwrap();
        assert_eq!(interfaces.len(), 1);
        assert_eq!(interfaces["eth0"].kind, InterfaceKind::Ethernet);
    }

    #[test]
    fn test_host_interface_defaults() {
        let iface: HostInterface =
            serde_json::from_value(json!({"type": "loopback"})).unwrap();
        assert_eq!(iface.kind, InterfaceKind::Loopback);
        assert!(!iface.special);
        assert!(iface.mac_address.is_none());
        assert!(iface.ip_address.is_none());
    }

    #[test]
    fn test_patch_builders() {
        let mapping = vec![PortMapping::Tap {
            name: "tap0".to_string(),
            interface: "tap0".to_string(),
            port_number: 0,
        }];
        let patch = SettingsPatch::new()
            .with_name("Cloud 2")
            .with_ports_mapping(&mapping);

        assert_eq!(patch.len(), 2);
        assert_eq!(patch.get("name"), Some(&json!("Cloud 2")));
        assert_eq!(
            patch.get("ports_mapping"),
            Some(&json!([{"type": "tap", "name": "tap0", "interface": "tap0", "port_number": 0}]))
        );
    }

    #[test]
    fn test_patch_serializes_as_plain_object() {
        let patch = SettingsPatch::new().with_name("Cloud 1");
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"name": "Cloud 1"})
        );
        assert_eq!(serde_json::to_value(&SettingsPatch::new()).unwrap(), json!({}));
    }
}
