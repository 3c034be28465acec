mod session;

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

use wirelab_topology::catalog;
use wirelab_topology::node::{ComputeBinding, NodeCategory};
use wirelab_topology::{
    CloudNode, CloudSettings, HostInterface, HttpComputeClient, PortMapping, SettingsPatch,
};

use session::{default_session_path, NodeRecord, Session};

#[derive(Parser, Debug)]
#[command(name = "wirelabc")]
#[command(about = "Wirelab cloud node operator tool", long_about = None)]
struct Args {
    /// Compute URL, e.g. http://127.0.0.1:3080
    #[arg(long, env = "WIRELAB_COMPUTE_URL")]
    compute_url: Option<String>,

    /// Project the nodes belong to
    #[arg(long, env = "WIRELAB_PROJECT_ID")]
    project_id: Option<Uuid>,

    /// Session file path
    #[arg(long)]
    session: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a cloud node on the compute
    Create {
        /// Node name, unique within the session
        name: String,
        #[command(flatten)]
        mappings: MappingArgs,
    },
    /// Push changed settings for an existing cloud node
    Update {
        name: String,
        #[command(flatten)]
        mappings: MappingArgs,
        /// Ask the compute for a new display name
        #[arg(long)]
        rename: Option<String>,
        /// Send the update even when nothing changed
        #[arg(long)]
        force: bool,
    },
    /// Print a node's description and last reported host interfaces
    Show { name: String },
    /// Remove a cloud node from the compute
    Delete { name: String },
    /// List the built-in device types by palette category
    Devices,
}

/// Port mapping flags shared by `create` and `update`. Port numbers are
/// assigned in flag order: all ethernet bindings first, then TAP, then UDP.
#[derive(clap::Args, Debug, Default)]
struct MappingArgs {
    /// Bridge a port to a physical host interface (repeatable)
    #[arg(long = "ethernet", value_name = "INTERFACE")]
    ethernet: Vec<String>,

    /// Bridge a port to a TAP device on the host (repeatable)
    #[arg(long = "tap", value_name = "INTERFACE")]
    tap: Vec<String>,

    /// Tunnel a port over UDP (repeatable)
    #[arg(long = "udp", value_name = "LPORT:RHOST:RPORT")]
    udp: Vec<String>,
}

impl MappingArgs {
    fn is_empty(&self) -> bool {
        self.ethernet.is_empty() && self.tap.is_empty() && self.udp.is_empty()
    }

    fn to_ports_mapping(&self) -> Result<Vec<PortMapping>> {
        let mut mapping = Vec::new();
        for interface in &self.ethernet {
            mapping.push(PortMapping::Ethernet {
                name: interface.clone(),
                interface: interface.clone(),
                port_number: mapping.len() as u32,
            });
        }
        for interface in &self.tap {
            mapping.push(PortMapping::Tap {
                name: interface.clone(),
                interface: interface.clone(),
                port_number: mapping.len() as u32,
            });
        }
        for spec in &self.udp {
            let (lport, rhost, rport) = parse_udp(spec)?;
            mapping.push(PortMapping::Udp {
                name: format!("udp-{}", lport),
                port_number: mapping.len() as u32,
                lport,
                rhost,
                rport,
            });
        }
        Ok(mapping)
    }
}

fn parse_udp(spec: &str) -> Result<(u16, String, u16)> {
    let mut parts = spec.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(lport), Some(rhost), Some(rport)) if !rhost.is_empty() => {
            let lport = lport
                .parse()
                .with_context(|| format!("Invalid local port in {:?}", spec))?;
            let rport = rport
                .parse()
                .with_context(|| format!("Invalid remote port in {:?}", spec))?;
            Ok((lport, rhost.to_string(), rport))
        }
        _ => bail!("Expected LPORT:RHOST:RPORT, got {:?}", spec),
    }
}

/// Host part of a compute URL, shown to the user as the compute's name.
fn host_of(url: &str) -> String {
    let rest = url.split("://").nth(1).unwrap_or(url);
    let rest = rest.split('/').next().unwrap_or(rest);
    rest.split(':').next().unwrap_or(rest).to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let session_path = args.session.clone().unwrap_or_else(default_session_path);
    let mut session = Session::load(&session_path)?;

    match args.command {
        Command::Create { name, mappings } => {
            let (compute_url, project_id) = resolve_target(&args.compute_url, args.project_id, &session)?;
            if session.nodes.contains_key(&name) {
                bail!("Node {:?} already exists in the session", name);
            }
            let client = HttpComputeClient::new(&compute_url)?;
            let settings = CloudSettings {
                ports_mapping: mappings.to_ports_mapping()?,
            };
            let mut node = CloudNode::with_settings(
                &name,
                project_id,
                ComputeBinding::new("local", host_of(&compute_url)),
                settings,
            );
            node.create(&client).await?;
            info!(node_id = %node.node_id(), "cloud node created");

            print!("{}", node.describe());
            print_interfaces(node.interfaces());

            session.nodes.insert(
                name,
                NodeRecord {
                    node_id: node.node_id(),
                    compute_id: node.compute().compute_id.clone(),
                    compute_name: node.compute().name.clone(),
                    ports_mapping: node.settings().ports_mapping.clone(),
                    interfaces: node.interfaces().clone(),
                },
            );
            session.compute_url = Some(compute_url);
            session.project_id = Some(project_id);
            session.save(&session_path)?;
        }

        Command::Update {
            name,
            mappings,
            rename,
            force,
        } => {
            let (compute_url, project_id) = resolve_target(&args.compute_url, args.project_id, &session)?;
            let mut record = session
                .nodes
                .get(&name)
                .with_context(|| format!("Unknown node {:?}; create it first", name))?
                .clone();
            let client = HttpComputeClient::new(&compute_url)?;
            let mut node = restore_node(&name, project_id, &record);

            let mut patch = SettingsPatch::new();
            if !mappings.is_empty() {
                patch = patch.with_ports_mapping(&mappings.to_ports_mapping()?);
            }
            if let Some(new_name) = &rename {
                patch = patch.with_name(new_name);
            }

            let sent = node.update(&client, &patch, force).await?;
            if !sent {
                println!("Nothing changed, no request sent");
                return Ok(());
            }
            println!("Updated {}", name);

            record.ports_mapping = node.settings().ports_mapping.clone();
            if !node.interfaces().is_empty() {
                record.interfaces = node.interfaces().clone();
            }
            // The compute accepted the rename; track the node under it.
            session.nodes.remove(&name);
            let key = rename.unwrap_or(name);
            session.nodes.insert(key, record);
            session.save(&session_path)?;
        }

        Command::Show { name } => {
            let (_, project_id) = resolve_target(&args.compute_url, args.project_id, &session)?;
            let record = session
                .nodes
                .get(&name)
                .with_context(|| format!("Unknown node {:?}", name))?;
            let node = restore_node(&name, project_id, record);
            print!("{}", node.describe());
            print_interfaces(&record.interfaces);
        }

        Command::Delete { name } => {
            let (compute_url, project_id) = resolve_target(&args.compute_url, args.project_id, &session)?;
            let record = session
                .nodes
                .get(&name)
                .with_context(|| format!("Unknown node {:?}", name))?;
            let client = HttpComputeClient::new(&compute_url)?;
            let node = restore_node(&name, project_id, record);
            node.delete(&client).await?;
            println!("Deleted {}", name);

            session.nodes.remove(&name);
            session.save(&session_path)?;
        }

        Command::Devices => {
            for category in NodeCategory::ALL {
                let entries = catalog::devices_in_category(category);
                if entries.is_empty() {
                    continue;
                }
                println!("{}:", category.label());
                for entry in entries {
                    println!("  {} ({})", entry.symbol_name, entry.symbol);
                }
            }
        }
    }

    Ok(())
}

/// Compute URL and project id from the flags, falling back to the session.
fn resolve_target(
    compute_url: &Option<String>,
    project_id: Option<Uuid>,
    session: &Session,
) -> Result<(String, Uuid)> {
    let compute_url = compute_url
        .clone()
        .or_else(|| session.compute_url.clone())
        .context("No compute URL; pass --compute-url")?;
    let project_id = project_id
        .or(session.project_id)
        .context("No project id; pass --project-id")?;
    Ok((compute_url, project_id))
}

fn restore_node(name: &str, project_id: Uuid, record: &NodeRecord) -> CloudNode {
    CloudNode::restore(
        record.node_id,
        name,
        project_id,
        ComputeBinding::new(&record.compute_id, &record.compute_name),
        CloudSettings {
            ports_mapping: record.ports_mapping.clone(),
        },
    )
}

fn print_interfaces(interfaces: &BTreeMap<String, HostInterface>) {
    if interfaces.is_empty() {
        return;
    }
    println!("Host interfaces:");
    for (name, interface) in interfaces {
        let mut line = format!("  {} ({})", name, interface.kind.as_str());
        if let Some(ip) = &interface.ip_address {
            line.push_str(&format!(" {}", ip));
        }
        if interface.special {
            line.push_str(" [special]");
        }
        println!("{}", line);
    }
}
