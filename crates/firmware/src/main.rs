#![no_main]
#![no_std]

use cortex_m::asm;
use cortex_m_rt::entry;
use panic_halt as _;

// Offload coprocessor block.
//      Din  16-bit  write-only  0x0140
//      Cin  1-bit   write-only  0x0142
//      Dout 16-bit  read-only   0x0144
//      Cout 1-bit   read-only   0x0146
const COPRO_DIN: *mut u16 = 0x0140 as *mut u16;
const COPRO_CIN: *mut u16 = 0x0142 as *mut u16;
const COPRO_DOUT: *const u16 = 0x0144 as *const u16;
const COPRO_COUT: *const u16 = 0x0146 as *const u16;

// Board output devices.
const HEX_LO: *mut u16 = 0x0190 as *mut u16;
const HEX_HI: *mut u16 = 0x0192 as *mut u16;
const PORT1_DIR: *mut u16 = 0x0200 as *mut u16;
const PORT1_OUT: *mut u16 = 0x0202 as *mut u16;

const SWEEP_LEN: u16 = 128;
const FIXED_OPERAND: u16 = 64;

fn write_reg(reg: *mut u16, value: u16) {
    unsafe {
        core::ptr::write_volatile(reg, value);
    }
}

fn read_reg(reg: *const u16) -> u16 {
    unsafe { core::ptr::read_volatile(reg) }
}

/// Drive control-in and spin until the coprocessor mirrors it back.
fn sync(level: u16) {
    write_reg(COPRO_CIN, level);
    while read_reg(COPRO_COUT) != level {}
}

/// One full four-toggle transaction: submit both operands, fetch the
/// result. Operand data goes out before the control edge announcing it.
fn offload(a: u16, b: u16) -> u16 {
    write_reg(COPRO_DIN, a);
    sync(1);

    write_reg(COPRO_DIN, b);
    sync(0);

    sync(1);
    let result = read_reg(COPRO_DOUT);

    sync(0);

    result
}

fn delay(cycles: u32) {
    for _ in 0..cycles {
        asm::nop();
    }
}

#[entry]
fn main() -> ! {
    // All port-1 pins as outputs before the first result lands on them.
    write_reg(PORT1_DIR, 0x00FF);

    loop {
        for i in 0..SWEEP_LEN {
            let result = offload(i, FIXED_OPERAND);
            write_reg(HEX_LO, result);
            write_reg(HEX_HI, i);
            write_reg(PORT1_OUT, result);
            delay(500);
        }
    }
}
