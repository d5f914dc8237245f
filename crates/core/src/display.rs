use crate::{Device, LinkResult};
use std::any::Any;
use std::io::{self, Write};

/// Seven-segment display block: two digit pairs, `lo` at +0x0 and `hi`
/// at +0x2. Writes render to stdout, which is the bench's stand-in for
/// the board.
#[derive(Debug, Default, serde::Serialize)]
pub struct HexDisplay {
    lo: u16,
    hi: u16,
}

impl HexDisplay {
    /// Byte span of the register window.
    pub const WINDOW: u16 = 0x4;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn digits(&self) -> (u16, u16) {
        (self.lo, self.hi)
    }
}

impl Device for HexDisplay {
    fn read(&mut self, offset: u16) -> LinkResult<u16> {
        match offset {
            0x0 => Ok(self.lo),
            0x2 => Ok(self.hi),
            _ => Ok(0),
        }
    }

    fn write(&mut self, offset: u16, value: u16) -> LinkResult<()> {
        match offset {
            0x0 => {
                self.lo = value;
                println!("7seg lo={:04x}", value);
                io::stdout().flush().unwrap();
            }
            0x2 => {
                self.hi = value;
                println!("7seg hi={:04x}", value);
                io::stdout().flush().unwrap();
            }
            _ => {}
        }
        Ok(())
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        Some(self)
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Parallel output port with a direction register at +0x0 and the
/// output register at +0x2. Only pins configured as outputs are driven.
#[derive(Debug, Default, serde::Serialize)]
pub struct OutputPort {
    dir: u16,
    out: u16,
}

impl OutputPort {
    /// Byte span of the register window.
    pub const WINDOW: u16 = 0x4;

    pub fn new() -> Self {
        Self::default()
    }

    /// Externally visible pin levels.
    pub fn pins(&self) -> u16 {
        self.out & self.dir
    }
}

impl Device for OutputPort {
    fn read(&mut self, offset: u16) -> LinkResult<u16> {
        match offset {
            0x0 => Ok(self.dir),
            0x2 => Ok(self.out),
            _ => Ok(0),
        }
    }

    fn write(&mut self, offset: u16, value: u16) -> LinkResult<()> {
        match offset {
            0x0 => self.dir = value,
            0x2 => {
                self.out = value;
                tracing::debug!("port: out={:#06x} driven={:#06x}", value, self.pins());
            }
            _ => {}
        }
        Ok(())
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        Some(self)
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
