use crate::regmap::RegisterMap;
use crate::{LinkObserver, LinkResult, RegisterBus};
use std::sync::Arc;

/// Where the controller stands in the four-toggle handshake cycle.
///
/// Each phase is entered by driving the named control-in level and left
/// once the coprocessor mirrors that level on control-out, so the two
/// sides are never more than one toggle apart. Writing a new level
/// before the previous one was acknowledged is the one way to corrupt
/// the link; [`HandshakeChannel::compute`] is the only caller of the
/// transition primitive, which makes a half-driven cycle
/// unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    FirstOperand,
    SecondOperand,
    ResultReady,
}

impl Phase {
    /// Control-in level that enters this phase.
    pub fn level(self) -> bool {
        matches!(self, Phase::FirstOperand | Phase::ResultReady)
    }

    fn next(self) -> Phase {
        match self {
            Phase::Idle => Phase::FirstOperand,
            Phase::FirstOperand => Phase::SecondOperand,
            Phase::SecondOperand => Phase::ResultReady,
            Phase::ResultReady => Phase::Idle,
        }
    }
}

/// Blocking two-operand offload channel over four memory-mapped
/// registers.
///
/// One transaction per [`compute`](Self::compute) call: both operands
/// are delivered, exactly one result is fetched, and the channel is
/// back at [`Phase::Idle`] on return. The channel trusts hardware reset
/// for the initial idle state and does not re-verify control-out before
/// a new cycle. There is no timeout anywhere: an unresponsive
/// coprocessor blocks the calling thread forever, which is the accepted
/// failure mode of a dedicated point-to-point link.
pub struct HandshakeChannel<B: RegisterBus> {
    bus: B,
    map: RegisterMap,
    phase: Phase,
    observers: Vec<Arc<dyn LinkObserver>>,
}

impl<B: RegisterBus> HandshakeChannel<B> {
    pub fn new(bus: B, map: RegisterMap) -> Self {
        Self {
            bus,
            map,
            phase: Phase::Idle,
            observers: Vec::new(),
        }
    }

    pub fn add_observer(&mut self, observer: Arc<dyn LinkObserver>) {
        self.observers.push(observer);
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn into_bus(self) -> B {
        self.bus
    }

    /// Submit `a` and `b`, block until the coprocessor hands back its
    /// result.
    ///
    /// The channel is agnostic to the operation the coprocessor
    /// performs; it only guarantees faithful delivery of the operands
    /// and retrieval of one result per full cycle. Errors surface only
    /// from the register backend (an unmapped address in simulation);
    /// protocol non-response is a hang, never an `Err`.
    pub fn compute(&mut self, a: u16, b: u16) -> LinkResult<u16> {
        for obs in &self.observers {
            obs.on_transaction_start(a, b);
        }
        tracing::debug!("link: submit a={:#06x} b={:#06x}", a, b);

        // Operand data must be stable before the control edge that
        // announces it; the coprocessor samples Din only after it has
        // observed the toggle.
        self.write_data(a)?;
        self.advance()?;

        self.write_data(b)?;
        self.advance()?;

        self.advance()?;
        let result = self.bus.read_u16(self.map.data_out)?;

        self.advance()?;

        tracing::debug!("link: result {:#06x}", result);
        for obs in &self.observers {
            obs.on_transaction_end(result);
        }
        Ok(result)
    }

    fn write_data(&mut self, value: u16) -> LinkResult<()> {
        self.bus.write_u16(self.map.data_in, value)?;
        for obs in &self.observers {
            obs.on_data_write(value);
        }
        Ok(())
    }

    /// Drive control-in to the next phase's level, then spin until the
    /// coprocessor mirrors it on control-out.
    fn advance(&mut self) -> LinkResult<()> {
        let target = self.phase.next();
        let level = target.level();

        self.bus.write_bit(self.map.control_in, level)?;
        for obs in &self.observers {
            obs.on_control_edge(level);
        }

        while self.bus.read_bit(self.map.control_out)? != level {
            for obs in &self.observers {
                obs.on_poll();
            }
            std::hint::spin_loop();
        }

        for obs in &self.observers {
            obs.on_ack(level);
        }
        self.phase = target;
        Ok(())
    }
}
