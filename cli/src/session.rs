use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use wirelab_topology::{HostInterface, PortMapping};

/// Node state the CLI keeps between invocations, so `update` can diff a new
/// mapping against what the compute already has.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub node_id: Uuid,
    pub compute_id: String,
    pub compute_name: String,
    pub ports_mapping: Vec<PortMapping>,
    #[serde(default)]
    pub interfaces: BTreeMap<String, HostInterface>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    pub compute_url: Option<String>,
    pub project_id: Option<Uuid>,
    // Key: node name -> last synced state
    pub nodes: BTreeMap<String, NodeRecord>,
}

impl Session {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read session {:?}", path))?;
        let session = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        Ok(session)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create dir {:?}", parent))?;
        }
        let bytes = serde_json::to_vec_pretty(self).context("Failed to serialize session")?;
        fs::write(path, bytes).with_context(|| format!("Failed to write {:?}", path))?;
        Ok(())
    }
}

pub fn default_session_path() -> PathBuf {
    let mut dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.push("wirelabc");
    dir.push("session.json");
    dir
}
