use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

fn default_link_base() -> u16 {
    0x0140
}

fn default_operation() -> String {
    "max".to_string()
}

fn default_latency() -> u32 {
    1
}

fn default_operand() -> u16 {
    64
}

/// Location and behavior of the coprocessor register block.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct LinkDescriptor {
    #[serde(default = "default_link_base")]
    pub base: u16,
    /// "max", "echo-first", "echo-second" or "sum"
    #[serde(default = "default_operation")]
    pub operation: String,
    /// Polls of control-out before the model acknowledges a toggle.
    #[serde(default = "default_latency")]
    pub latency: u32,
}

impl Default for LinkDescriptor {
    fn default() -> Self {
        Self {
            base: default_link_base(),
            operation: default_operation(),
            latency: default_latency(),
        }
    }
}

/// A display device mounted next to the coprocessor block.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    pub id: String,
    /// "hex-display" or "output-port"
    pub r#type: String,
    pub base: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    /// First operand runs 0..count.
    pub count: u16,
    /// Fixed second operand.
    #[serde(default = "default_operand")]
    pub operand: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct BenchManifest {
    pub schema_version: String,
    pub name: String,
    #[serde(default)]
    pub link: LinkDescriptor,
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
    pub sweep: SweepConfig,
    #[serde(default)]
    pub delay_ms: u64,
}

impl BenchManifest {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open bench manifest at {:?}", path.as_ref()))?;
        let manifest: Self =
            serde_yaml::from_reader(f).context("Failed to parse bench manifest YAML")?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Built-in bench: the shipped max coprocessor swept 0..128 against
    /// a fixed 64, results on the low digit pair.
    pub fn demo() -> Self {
        Self {
            schema_version: "1.0".to_string(),
            name: "demo-max-sweep".to_string(),
            link: LinkDescriptor::default(),
            devices: vec![
                DeviceConfig {
                    id: "hex0".to_string(),
                    r#type: "hex-display".to_string(),
                    base: 0x0190,
                },
                DeviceConfig {
                    id: "port1".to_string(),
                    r#type: "output-port".to_string(),
                    base: 0x0200,
                },
            ],
            sweep: SweepConfig {
                count: 128,
                operand: 64,
            },
            delay_ms: 0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '1.0'",
                self.schema_version
            );
        }

        if self.name.trim().is_empty() {
            anyhow::bail!("Bench 'name' cannot be empty");
        }

        if self.sweep.count == 0 {
            anyhow::bail!("Sweep 'count' must be greater than zero");
        }

        // Device windows are 4 bytes, the link block is 8; check both
        // kinds of collision in u32 to dodge address wraparound.
        let link = self.link.base as u32..self.link.base as u32 + 8;
        let mut ids = HashSet::new();
        for (i, dev) in self.devices.iter().enumerate() {
            if !ids.insert(dev.id.as_str()) {
                anyhow::bail!("Duplicate device id '{}'", dev.id);
            }
            let window = dev.base as u32..dev.base as u32 + 4;
            if window.start < link.end && link.start < window.end {
                anyhow::bail!(
                    "Device '{}' at {:#06x} overlaps the coprocessor block",
                    dev.id,
                    dev.base
                );
            }
            for other in &self.devices[i + 1..] {
                let other_window = other.base as u32..other.base as u32 + 4;
                if window.start < other_window.end && other_window.start < window.end {
                    anyhow::bail!(
                        "Devices '{}' and '{}' overlap at {:#06x}",
                        dev.id,
                        other.id,
                        other.base
                    );
                }
            }
        }

        Ok(())
    }
}
