use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::domain::value_objects::{HostInterface, NodeSettings, Tags};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "nmos-node",
    version = "0.1.0",
    about = "NMOS node exposing RTP senders and receivers from session descriptions"
)]
pub struct Config {
    /// Seed for resource ids; ids are stable across restarts with the same seed
    #[arg(long, env = "NODE_SEED")]
    pub seed: Option<String>,

    /// Host name advertised in Connection API urls
    #[arg(long, env = "NODE_HOST_NAME", default_value = "localhost")]
    pub host_name: String,

    /// Node API and Connection API port
    #[arg(long, env = "NODE_HTTP_PORT", default_value = "8080")]
    pub http_port: u16,

    /// Node and device label
    #[arg(long, env = "NODE_LABEL", default_value = "nmos-node")]
    pub label: String,

    /// Node and device description
    #[arg(long, env = "NODE_DESCRIPTION", default_value = "")]
    pub description: String,

    /// Node and device tag as KEY=VALUE; repeat a key for several values
    #[arg(long = "tag", value_name = "KEY=VALUE")]
    pub tags: Vec<String>,

    /// Session description file of a sender to add at startup
    #[arg(long = "sender-sdp", value_name = "FILE")]
    pub sender_sdps: Vec<PathBuf>,

    /// Session description file of a receiver to add at startup
    #[arg(long = "receiver-sdp", value_name = "FILE")]
    pub receiver_sdps: Vec<PathBuf>,

    /// Host interface as NAME=ADDR[,ADDR]; replaces interface enumeration
    #[arg(long = "interface", value_name = "NAME=ADDR[,ADDR]")]
    pub interfaces: Vec<String>,

    /// Metrics server port
    #[arg(long, env = "METRICS_PORT", default_value = "9003")]
    pub metrics_port: u16,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Minimum allowed port (ports below 1024 are privileged)
const MIN_USER_PORT: u16 = 1024;

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        Self::validate_port(self.http_port, "HTTP")?;
        Self::validate_port(self.metrics_port, "metrics")?;

        if self.http_port == self.metrics_port {
            anyhow::bail!("HTTP port and metrics port cannot be the same");
        }

        for path in self.sender_sdps.iter().chain(self.receiver_sdps.iter()) {
            if !path.is_file() {
                anyhow::bail!("Session description file not found: {:?}", path);
            }
        }

        self.host_interfaces()?;
        self.node_tags()?;
        Ok(())
    }

    fn validate_port(port: u16, name: &str) -> anyhow::Result<()> {
        if port == 0 {
            anyhow::bail!("Invalid {} port: port cannot be 0", name);
        }
        if port < MIN_USER_PORT {
            anyhow::bail!(
                "Invalid {} port: {} is a privileged port (< {}). Use a port >= {}",
                name,
                port,
                MIN_USER_PORT,
                MIN_USER_PORT
            );
        }
        Ok(())
    }

    /// Interfaces given with `--interface`, empty when the host should be asked.
    pub fn host_interfaces(&self) -> anyhow::Result<Vec<HostInterface>> {
        self.interfaces.iter().map(String::as_str).map(parse_interface).collect()
    }

    /// Seed from the command line, or a random one that will not survive a restart.
    pub fn seed(&self) -> String {
        match &self.seed {
            Some(seed) => seed.clone(),
            None => {
                let seed = uuid::Uuid::new_v4().to_string();
                tracing::warn!(seed = %seed, "No seed configured, resource ids will change on restart");
                seed
            }
        }
    }

    pub fn node_tags(&self) -> anyhow::Result<Tags> {
        let mut tags = Tags::new();
        for arg in &self.tags {
            let Some((key, value)) = arg.split_once('=') else {
                anyhow::bail!("Tag must be KEY=VALUE: {}", arg);
            };
            if key.is_empty() {
                anyhow::bail!("Tag key cannot be empty: {}", arg);
            }
            tags.entry(key.to_string()).or_default().push(value.to_string());
        }
        Ok(tags)
    }

    pub fn to_node_settings(&self, seed: &str) -> anyhow::Result<NodeSettings> {
        let tags = self.node_tags()?;
        let settings = NodeSettings::new(seed, &self.host_name, self.http_port)
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        Ok(settings
            .with_node_label(&self.label, &self.description)
            .with_device_label(&self.label, &self.description)
            .with_node_tags(tags.clone())
            .with_device_tags(tags))
    }

    pub fn read_sender_sdps(&self) -> anyhow::Result<Vec<String>> {
        read_all(&self.sender_sdps)
    }

    pub fn read_receiver_sdps(&self) -> anyhow::Result<Vec<String>> {
        read_all(&self.receiver_sdps)
    }
}

fn read_all(paths: &[PathBuf]) -> anyhow::Result<Vec<String>> {
    paths
        .iter()
        .map(|path| {
            std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("Failed to read {:?}: {}", path, e))
        })
        .collect()
}

fn parse_interface(arg: &str) -> anyhow::Result<HostInterface> {
    let Some((name, addresses)) = arg.split_once('=') else {
        anyhow::bail!("Interface must be NAME=ADDR[,ADDR]: {}", arg);
    };
    if name.is_empty() {
        anyhow::bail!("Interface name cannot be empty: {}", arg);
    }
    let addresses = addresses
        .split(',')
        .map(|address| {
            address
                .trim()
                .parse::<IpAddr>()
                .map_err(|_| anyhow::anyhow!("Invalid address {:?} for interface {}", address, name))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(HostInterface::new(name, addresses))
}
