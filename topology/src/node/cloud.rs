//! Cloud node device model.
//!
//! A cloud node bridges a project topology to real interfaces of the host
//! the compute runs on. The compute owns the authoritative state; this
//! model mirrors it, pushing setting changes up and folding the compute's
//! replies back into the local snapshot.

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::compute::ComputeClient;
use crate::error::ComputeError;
use crate::node::{
    ComputeBinding, ConfigPageId, DeviceMetadata, NodeBase, NodeCategory, NodeStatus, Port,
};
use crate::types::{CreateNodeRequest, HostInterface, NodeSyncResponse, PortMapping, SettingsPatch};

/// Option key for the node name in a settings patch.
const OPTION_NAME: &str = "name";
/// Option key for the port mapping list in a settings patch.
const OPTION_PORTS_MAPPING: &str = "ports_mapping";

// ============================================================================
// Settings
// ============================================================================

/// Settings a cloud node owns. The port mapping list is the only tunable;
/// it ties topology ports to host interfaces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudSettings {
    #[serde(default)]
    pub ports_mapping: Vec<PortMapping>,
}

// ============================================================================
// Node
// ============================================================================

/// A cloud node in a project.
///
/// Cloud nodes are always-on: they report [`NodeStatus::Started`] from the
/// moment they are placed and expose no way to stop or suspend them.
#[derive(Debug, Clone)]
pub struct CloudNode {
    base: NodeBase,
    settings: CloudSettings,
    /// Host interfaces as last reported by the compute, keyed by name.
    interfaces: BTreeMap<String, HostInterface>,
}

impl CloudNode {
    /// A cloud node freshly placed in a project, before it exists on the
    /// compute. Follow up with [`CloudNode::create`] to register it.
    pub fn new(name: impl Into<String>, project_id: Uuid, compute: ComputeBinding) -> Self {
        Self::with_settings(name, project_id, compute, CloudSettings::default())
    }

    /// A cloud node placed with an initial port mapping already filled in,
    /// e.g. from a device template.
    pub fn with_settings(
        name: impl Into<String>,
        project_id: Uuid,
        compute: ComputeBinding,
        settings: CloudSettings,
    ) -> Self {
        let mut node = Self {
            base: NodeBase::new(name, project_id, compute, true),
            settings,
            interfaces: BTreeMap::new(),
        };
        node.refresh_ports();
        node
    }

    /// A cloud node restored from saved project state. Host interfaces are
    /// not persisted; the next sync with the compute repopulates them.
    pub fn restore(
        node_id: Uuid,
        name: impl Into<String>,
        project_id: Uuid,
        compute: ComputeBinding,
        settings: CloudSettings,
    ) -> Self {
        let mut node = Self {
            base: NodeBase::restore(node_id, name, project_id, compute, true),
            settings,
            interfaces: BTreeMap::new(),
        };
        node.refresh_ports();
        node
    }

    pub fn node_id(&self) -> Uuid {
        self.base.node_id()
    }

    pub fn project_id(&self) -> Uuid {
        self.base.project_id()
    }

    pub fn name(&self) -> &str {
        self.base.name()
    }

    pub fn status(&self) -> NodeStatus {
        self.base.status()
    }

    pub fn compute(&self) -> &ComputeBinding {
        self.base.compute()
    }

    pub fn ports(&self) -> &[Port] {
        self.base.ports()
    }

    pub fn port(&self, name: &str) -> Option<&Port> {
        self.base.port(name)
    }

    /// Mutable access for the link layer to occupy or release a port.
    pub fn port_mut(&mut self, name: &str) -> Option<&mut Port> {
        self.base.port_mut(name)
    }

    pub fn settings(&self) -> &CloudSettings {
        &self.settings
    }

    /// Host interfaces as last reported by the compute.
    pub fn interfaces(&self) -> &BTreeMap<String, HostInterface> {
        &self.interfaces
    }

    /// Registers the node on the compute and folds the reply into the
    /// local snapshot.
    pub async fn create<C>(&mut self, client: &C) -> Result<(), ComputeError>
    where
        C: ComputeClient + ?Sized,
    {
        let request = CreateNodeRequest {
            node_id: self.node_id(),
            name: self.name().to_string(),
            ports_mapping: self.settings.ports_mapping.clone(),
        };
        info!(node = %self.name(), node_id = %self.node_id(), "creating cloud node on compute");
        let response = client.create_node(self.project_id(), &request).await?;
        self.apply_create_response(response);
        Ok(())
    }

    /// Pushes changed settings to the compute and folds the reply into the
    /// local snapshot. Only options whose value differs from the current
    /// one are sent; unknown options are ignored. Returns whether a request
    /// was sent at all. `force` sends the request even when nothing changed.
    pub async fn update<C>(
        &mut self,
        client: &C,
        patch: &SettingsPatch,
        force: bool,
    ) -> Result<bool, ComputeError>
    where
        C: ComputeClient + ?Sized,
    {
        let changed = self.changed_options(patch);
        if changed.is_empty() && !force {
            debug!(node = %self.name(), "no settings changed, skipping compute update");
            return Ok(false);
        }
        info!(
            node = %self.name(),
            node_id = %self.node_id(),
            options = changed.len(),
            "updating cloud node on compute"
        );
        let response = client
            .update_node(self.project_id(), self.node_id(), &changed)
            .await?;
        self.apply_update_response(response);
        Ok(true)
    }

    /// Removes the node from the compute. Local state is left untouched so
    /// the caller can still inspect it afterwards.
    pub async fn delete<C>(&self, client: &C) -> Result<(), ComputeError>
    where
        C: ComputeClient + ?Sized,
    {
        info!(node = %self.name(), node_id = %self.node_id(), "deleting cloud node from compute");
        client.delete_node(self.project_id(), self.node_id()).await
    }

    /// Folds a creation reply into the local snapshot.
    pub fn apply_create_response(&mut self, response: NodeSyncResponse) {
        self.apply_sync_response(response);
    }

    /// Folds an update reply into the local snapshot.
    pub fn apply_update_response(&mut self, response: NodeSyncResponse) {
        self.apply_sync_response(response);
    }

    fn apply_sync_response(&mut self, response: NodeSyncResponse) {
        if let Some(ports_mapping) = response.ports_mapping {
            self.settings.ports_mapping = ports_mapping;
            self.refresh_ports();
        }
        if let Some(interfaces) = response.interfaces {
            self.interfaces = interfaces;
        }
    }

    /// Options from the patch whose value differs from the node's current
    /// settings. Keys the node does not recognise are dropped.
    fn changed_options(&self, patch: &SettingsPatch) -> SettingsPatch {
        let mut changed = SettingsPatch::new();
        for (option, value) in patch.iter() {
            match self.option_value(option) {
                Some(current) if &current != value => {
                    changed.set(option.clone(), value.clone());
                }
                _ => {}
            }
        }
        changed
    }

    /// Current value of a recognised option, in patch representation.
    fn option_value(&self, option: &str) -> Option<Value> {
        match option {
            OPTION_NAME => Some(Value::String(self.base.name().to_string())),
            OPTION_PORTS_MAPPING => serde_json::to_value(&self.settings.ports_mapping).ok(),
            _ => None,
        }
    }

    /// Rebuilds the port list from the port mapping, one port per mapping
    /// entry in mapping order. Ports that keep their name keep their
    /// occupancy; mappings with no previous port get a fresh free port.
    fn refresh_ports(&mut self) {
        let mut old: BTreeMap<String, Port> = self
            .base
            .take_ports()
            .into_iter()
            .map(|port| (port.name().to_string(), port))
            .collect();
        let ports = self
            .settings
            .ports_mapping
            .iter()
            .map(|mapping| {
                old.remove(mapping.name())
                    .unwrap_or_else(|| Port::new(mapping.name()))
            })
            .collect();
        self.base.set_ports(ports);
    }

    /// Human-readable summary for the editor's info panel.
    pub fn describe(&self) -> String {
        let mut text = format!(
            "Cloud {name} is always-on\n\
             This is a node for external connections\n\
             Running on compute {compute}\n",
            name = self.name(),
            compute = self.compute().name,
        );
        for port in self.ports() {
            match port.description() {
                None => {
                    let _ = writeln!(text, "   Port {} is empty", port.name());
                }
                Some(description) => {
                    let _ = writeln!(text, "   Port {} {}", port.name(), description);
                }
            }
        }
        text
    }
}

impl DeviceMetadata for CloudNode {
    fn default_symbol() -> &'static str {
        "symbols/cloud.svg"
    }

    fn symbol_name() -> &'static str {
        "Cloud"
    }

    fn categories() -> &'static [NodeCategory] {
        &[NodeCategory::EndDevice]
    }

    fn configuration_page() -> ConfigPageId {
        ConfigPageId("cloud-configuration")
    }
}

impl fmt::Display for CloudNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cloud")
    }
}
