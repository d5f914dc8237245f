use crate::copro::{Coprocessor, Operation, Responsiveness};
use crate::display::{HexDisplay, OutputPort};
use crate::regmap;
use crate::{Device, LinkError, LinkResult, RegisterBus};
use coprolink_config::BenchManifest;

pub struct DeviceEntry {
    pub name: String,
    pub base: u16,
    pub size: u16,
    pub dev: Box<dyn Device>,
}

/// Simulation backend of [`RegisterBus`]: routes register accesses to
/// mounted device models by address window.
pub struct DeviceBus {
    pub devices: Vec<DeviceEntry>,
}

impl DeviceBus {
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
        }
    }

    /// Build the bus a manifest describes: the coprocessor block plus
    /// any display devices.
    pub fn from_manifest(manifest: &BenchManifest) -> anyhow::Result<Self> {
        let operation = Operation::from_name(&manifest.link.operation).ok_or_else(|| {
            anyhow::anyhow!("Unknown coprocessor operation '{}'", manifest.link.operation)
        })?;
        let responsiveness = Responsiveness::Acknowledge {
            latency: manifest.link.latency,
        };

        let mut bus = Self::new();
        bus.mount(
            "copro",
            manifest.link.base,
            regmap::BLOCK_SIZE,
            Box::new(Coprocessor::new(operation, responsiveness)),
        );

        for dev in &manifest.devices {
            match dev.r#type.as_str() {
                "hex-display" => bus.mount(
                    &dev.id,
                    dev.base,
                    HexDisplay::WINDOW,
                    Box::new(HexDisplay::new()),
                ),
                "output-port" => bus.mount(
                    &dev.id,
                    dev.base,
                    OutputPort::WINDOW,
                    Box::new(OutputPort::new()),
                ),
                other => anyhow::bail!("Unknown device type '{}' for '{}'", other, dev.id),
            }
        }

        Ok(bus)
    }

    pub fn mount(&mut self, name: &str, base: u16, size: u16, dev: Box<dyn Device>) {
        tracing::debug!("bus: mount '{}' at {:#06x} (+{:#x})", name, base, size);
        self.devices.push(DeviceEntry {
            name: name.to_string(),
            base,
            size,
            dev,
        });
    }

    pub fn device(&self, name: &str) -> Option<&dyn Device> {
        self.devices
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.dev.as_ref())
    }

    pub fn device_mut(&mut self, name: &str) -> Option<&mut (dyn Device + 'static)> {
        self.devices
            .iter_mut()
            .find(|e| e.name == name)
            .map(|e| e.dev.as_mut())
    }

    /// JSON view of every mounted device, for trace dumps.
    pub fn snapshot(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .devices
            .iter()
            .map(|e| (e.name.clone(), e.dev.snapshot()))
            .collect();
        serde_json::Value::Object(map)
    }

    fn route(&mut self, addr: u16) -> Option<(&mut DeviceEntry, u16)> {
        self.devices
            .iter_mut()
            .find(|e| addr >= e.base && addr - e.base < e.size)
            .map(|e| {
                let offset = addr - e.base;
                (e, offset)
            })
    }
}

impl Default for DeviceBus {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterBus for DeviceBus {
    fn read_u16(&mut self, addr: u16) -> LinkResult<u16> {
        match self.route(addr) {
            Some((entry, offset)) => entry.dev.read(offset),
            None => Err(LinkError::Unmapped(addr)),
        }
    }

    fn write_u16(&mut self, addr: u16, value: u16) -> LinkResult<()> {
        match self.route(addr) {
            Some((entry, offset)) => entry.dev.write(offset, value),
            None => Err(LinkError::Unmapped(addr)),
        }
    }
}
