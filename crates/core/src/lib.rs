pub mod bus;
pub mod channel;
pub mod copro;
pub mod display;
pub mod metrics;
pub mod mmio;
pub mod regmap;
pub mod trace;

use std::any::Any;

mod tests;

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("No device mapped at {0:#x}")]
    Unmapped(u16),
    #[error("Write to read-only register at offset {0:#x}")]
    ReadOnly(u16),
}

pub type LinkResult<T> = Result<T, LinkError>;

/// Trait for observing link transactions in a modular way.
pub trait LinkObserver: std::fmt::Debug + Send + Sync {
    fn on_transaction_start(&self, _a: u16, _b: u16) {}
    fn on_data_write(&self, _value: u16) {}
    fn on_control_edge(&self, _level: bool) {}
    fn on_ack(&self, _level: bool) {}
    fn on_poll(&self) {}
    fn on_transaction_end(&self, _result: u16) {}
}

/// Trait representing a memory-mapped device model on the simulated bus.
///
/// Registers are 16 bits wide and addressed by byte offset from the
/// device base. Reads take `&mut self`: polled devices advance their
/// internal state when the controller observes them.
pub trait Device: std::fmt::Debug + Send {
    fn read(&mut self, offset: u16) -> LinkResult<u16>;
    fn write(&mut self, offset: u16, value: u16) -> LinkResult<()>;
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }
    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }
    fn snapshot(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}

/// Trait representing register-level access to the hardware.
///
/// Production code talks to real memory-mapped registers through
/// [`mmio::MmioBus`]; tests and the bench talk to [`bus::DeviceBus`]
/// models. The bit accessors exist for the two control registers, which
/// carry a single logical level.
pub trait RegisterBus {
    fn read_u16(&mut self, addr: u16) -> LinkResult<u16>;
    fn write_u16(&mut self, addr: u16, value: u16) -> LinkResult<()>;

    fn read_bit(&mut self, addr: u16) -> LinkResult<bool> {
        Ok(self.read_u16(addr)? & 1 != 0)
    }

    fn write_bit(&mut self, addr: u16, value: bool) -> LinkResult<()> {
        self.write_u16(addr, value as u16)
    }
}
