use crate::{LinkResult, RegisterBus};

/// Production backend of [`RegisterBus`]: raw volatile loads and stores
/// relative to a base pointer.
///
/// On target hardware the base is the start of the peripheral address
/// space; tests point it at a plain buffer.
pub struct MmioBus {
    base: *mut u8,
}

impl MmioBus {
    /// # Safety
    ///
    /// `base` must point to a mapped, 2-byte-aligned region covering
    /// every register address accessed through this bus for as long as
    /// the bus lives, and nothing else may concurrently access that
    /// region.
    pub unsafe fn new(base: *mut u8) -> Self {
        Self { base }
    }
}

impl RegisterBus for MmioBus {
    fn read_u16(&mut self, addr: u16) -> LinkResult<u16> {
        let ptr = unsafe { self.base.add(addr as usize) } as *const u16;
        Ok(unsafe { core::ptr::read_volatile(ptr) })
    }

    fn write_u16(&mut self, addr: u16, value: u16) -> LinkResult<()> {
        let ptr = unsafe { self.base.add(addr as usize) } as *mut u16;
        unsafe { core::ptr::write_volatile(ptr, value) };
        Ok(())
    }
}
