use crate::regmap::{CONTROL_IN_OFFSET, CONTROL_OUT_OFFSET, DATA_IN_OFFSET, DATA_OUT_OFFSET};
use crate::{Device, LinkError, LinkResult};
use std::any::Any;

/// Computation performed by the modeled coprocessor.
///
/// The shipped silicon computes `max`; the other operations exist for
/// benches and for tests that need to see which operand came through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    Max,
    EchoFirst,
    EchoSecond,
    Sum,
}

impl Operation {
    /// Name used in bench manifests.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "max" => Some(Operation::Max),
            "echo-first" => Some(Operation::EchoFirst),
            "echo-second" => Some(Operation::EchoSecond),
            "sum" => Some(Operation::Sum),
            _ => None,
        }
    }

    fn apply(self, a: u16, b: u16) -> u16 {
        match self {
            Operation::Max => a.max(b),
            Operation::EchoFirst => a,
            Operation::EchoSecond => b,
            // Sum wraps at the register width, like the hardware would.
            Operation::Sum => a.wrapping_add(b),
        }
    }
}

/// How the model acknowledges control toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Responsiveness {
    /// Mirror control-out after the pending toggle has been polled
    /// `latency` more times, so the controller's busy-wait really
    /// iterates. Zero means acknowledge on the first poll.
    Acknowledge { latency: u32 },
    /// Never acknowledge. The controller's polling loop spins forever;
    /// liveness tests use this to pin down the no-timeout contract.
    Stuck,
}

impl Default for Responsiveness {
    fn default() -> Self {
        Responsiveness::Acknowledge { latency: 1 }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingToggle {
    level: bool,
    polls_left: u32,
}

/// Handshake slave model of the offload coprocessor.
///
/// Mirrors the four-toggle cycle from the far side: the first rising
/// edge of Cin latches Din as operand A, the falling edge latches Din
/// as operand B and computes, the second rising edge presents the
/// result on Dout, and the second falling edge completes the
/// transaction. Acknowledgment happens when the controller polls Cout,
/// which is what lets a synchronous model satisfy a busy-waiting
/// master.
#[derive(Debug, serde::Serialize)]
pub struct Coprocessor {
    operation: Operation,
    responsiveness: Responsiveness,
    din: u16,
    dout: u16,
    cin: bool,
    cout: bool,
    #[serde(skip)]
    pending: Option<PendingToggle>,
    step: u8,
    a: u16,
    b: u16,
    result: u16,
    transactions: u64,
}

impl Coprocessor {
    pub fn new(operation: Operation, responsiveness: Responsiveness) -> Self {
        Self {
            operation,
            responsiveness,
            din: 0,
            dout: 0,
            cin: false,
            cout: false,
            pending: None,
            step: 0,
            a: 0,
            b: 0,
            result: 0,
            transactions: 0,
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn control_out(&self) -> bool {
        self.cout
    }

    /// Completed four-toggle cycles since reset.
    pub fn transactions(&self) -> u64 {
        self.transactions
    }

    fn poll(&mut self) {
        if let Some(p) = self.pending {
            if p.polls_left > 0 {
                self.pending = Some(PendingToggle {
                    level: p.level,
                    polls_left: p.polls_left - 1,
                });
            } else {
                self.acknowledge(p.level);
                self.pending = None;
            }
        }
    }

    fn acknowledge(&mut self, level: bool) {
        match self.step {
            0 => self.a = self.din,
            1 => {
                self.b = self.din;
                // The result is latched internally here; it reaches
                // Dout only after one more toggle.
                self.result = self.operation.apply(self.a, self.b);
            }
            2 => self.dout = self.result,
            _ => {
                self.transactions += 1;
                tracing::debug!(
                    "copro: transaction {} complete ({:?})",
                    self.transactions,
                    self.operation
                );
            }
        }
        self.cout = level;
        self.step = (self.step + 1) % 4;
    }
}

impl Device for Coprocessor {
    fn read(&mut self, offset: u16) -> LinkResult<u16> {
        match offset {
            DATA_OUT_OFFSET => Ok(self.dout),
            CONTROL_OUT_OFFSET => {
                self.poll();
                Ok(self.cout as u16)
            }
            // Din and Cin are write-only on silicon; reads return zero.
            _ => Ok(0),
        }
    }

    fn write(&mut self, offset: u16, value: u16) -> LinkResult<()> {
        match offset {
            DATA_IN_OFFSET => {
                self.din = value;
                Ok(())
            }
            CONTROL_IN_OFFSET => {
                let level = value & 1 != 0;
                if level != self.cin {
                    self.cin = level;
                    self.pending = match self.responsiveness {
                        Responsiveness::Acknowledge { latency } => Some(PendingToggle {
                            level,
                            polls_left: latency,
                        }),
                        Responsiveness::Stuck => None,
                    };
                }
                Ok(())
            }
            DATA_OUT_OFFSET | CONTROL_OUT_OFFSET => Err(LinkError::ReadOnly(offset)),
            _ => Ok(()),
        }
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
