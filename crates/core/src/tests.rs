#[cfg(test)]
mod tests {
    use crate::bus::DeviceBus;
    use crate::channel::{HandshakeChannel, Phase};
    use crate::copro::{Coprocessor, Operation, Responsiveness};
    use crate::display::{HexDisplay, OutputPort};
    use crate::metrics::LinkMetrics;
    use crate::mmio::MmioBus;
    use crate::regmap::{self, RegisterMap};
    use crate::trace::TraceRecorder;
    use crate::{LinkError, LinkObserver, RegisterBus};
    use std::sync::{mpsc, Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    fn copro_channel(
        operation: Operation,
        responsiveness: Responsiveness,
    ) -> HandshakeChannel<DeviceBus> {
        let mut bus = DeviceBus::new();
        bus.mount(
            "copro",
            regmap::DEFAULT_BASE,
            regmap::BLOCK_SIZE,
            Box::new(Coprocessor::new(operation, responsiveness)),
        );
        HandshakeChannel::new(bus, RegisterMap::default())
    }

    #[test]
    fn test_compute_max_scenarios() {
        let mut channel = copro_channel(Operation::Max, Responsiveness::default());

        assert_eq!(channel.compute(5, 64).unwrap(), 64);
        assert_eq!(channel.compute(100, 64).unwrap(), 100);
        assert_eq!(channel.compute(64, 64).unwrap(), 64);
    }

    #[test]
    fn test_echo_first_round_trip() {
        let mut channel = copro_channel(Operation::EchoFirst, Responsiveness::default());

        for a in [0u16, 1, 0x00FF, 0x7FFF, 0x8000, 0xFFFF] {
            assert_eq!(channel.compute(a, 0x1234).unwrap(), a);
        }
    }

    #[test]
    fn test_consecutive_calls_compose() {
        let mut channel = copro_channel(Operation::Max, Responsiveness::default());

        assert_eq!(channel.compute(5, 64).unwrap(), 64);
        assert_eq!(channel.phase(), Phase::Idle);

        // The second transaction must be independent of the first.
        assert_eq!(channel.compute(100, 64).unwrap(), 100);
        assert_eq!(channel.phase(), Phase::Idle);

        let copro = channel
            .bus_mut()
            .device("copro")
            .unwrap()
            .as_any()
            .unwrap()
            .downcast_ref::<Coprocessor>()
            .unwrap();
        assert_eq!(copro.transactions(), 2);
        assert!(!copro.control_out());
    }

    #[derive(Debug, PartialEq, Clone, Copy)]
    enum WireEvent {
        Data(u16),
        Edge(bool),
        Ack(bool),
    }

    #[derive(Debug, Default)]
    struct WireRecorder {
        events: Mutex<Vec<WireEvent>>,
    }

    impl LinkObserver for WireRecorder {
        fn on_data_write(&self, value: u16) {
            self.events.lock().unwrap().push(WireEvent::Data(value));
        }

        fn on_control_edge(&self, level: bool) {
            self.events.lock().unwrap().push(WireEvent::Edge(level));
        }

        fn on_ack(&self, level: bool) {
            self.events.lock().unwrap().push(WireEvent::Ack(level));
        }
    }

    #[test]
    fn test_wire_order_per_transaction() {
        let mut channel = copro_channel(Operation::Max, Responsiveness::default());
        let recorder = Arc::new(WireRecorder::default());
        channel.add_observer(recorder.clone());

        channel.compute(7, 9).unwrap();

        // Four edges in the fixed 1,0,1,0 order, each acknowledged
        // before the next, and each operand written before its edge.
        let events = recorder.events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                WireEvent::Data(7),
                WireEvent::Edge(true),
                WireEvent::Ack(true),
                WireEvent::Data(9),
                WireEvent::Edge(false),
                WireEvent::Ack(false),
                WireEvent::Edge(true),
                WireEvent::Ack(true),
                WireEvent::Edge(false),
                WireEvent::Ack(false),
            ]
        );
    }

    #[test]
    fn test_deferred_ack_exercises_polling() {
        let mut channel =
            copro_channel(Operation::Max, Responsiveness::Acknowledge { latency: 3 });
        let metrics = Arc::new(LinkMetrics::new());
        channel.add_observer(metrics.clone());

        assert_eq!(channel.compute(2, 3).unwrap(), 3);

        assert_eq!(metrics.get_transactions(), 1);
        assert_eq!(metrics.get_edges(), 4);
        // Three unanswered polls per phase, four phases.
        assert_eq!(metrics.get_polls(), 12);
    }

    #[test]
    fn test_zero_latency_acks_on_first_poll() {
        let mut channel =
            copro_channel(Operation::Max, Responsiveness::Acknowledge { latency: 0 });
        let metrics = Arc::new(LinkMetrics::new());
        channel.add_observer(metrics.clone());

        assert_eq!(channel.compute(40, 2).unwrap(), 40);
        assert_eq!(metrics.get_polls(), 0);
    }

    #[test]
    fn test_stuck_coprocessor_never_completes() {
        let mut channel = copro_channel(Operation::Max, Responsiveness::Stuck);

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(channel.compute(1, 2));
        });

        // The call must still be spinning when the deadline expires;
        // the worker is leaked, pinning the no-timeout contract.
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn test_sum_wraps_at_register_width() {
        let mut channel = copro_channel(Operation::Sum, Responsiveness::default());

        assert_eq!(channel.compute(0xFFFF, 0x0002).unwrap(), 0x0001);
        assert_eq!(channel.compute(0x8000, 0x8000).unwrap(), 0x0000);
    }

    #[test]
    fn test_unmapped_access_errors() {
        let bus = DeviceBus::new();
        let mut channel = HandshakeChannel::new(bus, RegisterMap::default());

        match channel.compute(1, 2) {
            Err(LinkError::Unmapped(addr)) => assert_eq!(addr, regmap::DEFAULT_BASE),
            other => panic!("expected Unmapped, got {:?}", other),
        }
    }

    #[test]
    fn test_result_registers_reject_writes() {
        let mut bus = DeviceBus::new();
        bus.mount(
            "copro",
            regmap::DEFAULT_BASE,
            regmap::BLOCK_SIZE,
            Box::new(Coprocessor::new(Operation::Max, Responsiveness::default())),
        );

        let addr = regmap::DEFAULT_BASE + regmap::DATA_OUT_OFFSET;
        match bus.write_u16(addr, 0xBEEF) {
            Err(LinkError::ReadOnly(offset)) => assert_eq!(offset, regmap::DATA_OUT_OFFSET),
            other => panic!("expected ReadOnly, got {:?}", other),
        }
    }

    #[test]
    fn test_mmio_round_trip() {
        // u16-backed so the base is aligned for 16-bit register access.
        let mut backing = vec![0u16; 0x200];
        let mut bus = unsafe { MmioBus::new(backing.as_mut_ptr() as *mut u8) };

        bus.write_u16(0x0140, 0xBEEF).unwrap();
        assert_eq!(bus.read_u16(0x0140).unwrap(), 0xBEEF);

        bus.write_bit(0x0142, true).unwrap();
        assert!(bus.read_bit(0x0142).unwrap());
        bus.write_bit(0x0142, false).unwrap();
        assert!(!bus.read_bit(0x0142).unwrap());
    }

    #[test]
    fn test_display_devices() {
        let mut bus = DeviceBus::new();
        bus.mount("hex0", 0x0190, HexDisplay::WINDOW, Box::new(HexDisplay::new()));
        bus.mount("port1", 0x0200, OutputPort::WINDOW, Box::new(OutputPort::new()));

        bus.write_u16(0x0190, 0x0040).unwrap();
        bus.write_u16(0x0192, 0x0005).unwrap();
        let hex = bus
            .device("hex0")
            .unwrap()
            .as_any()
            .unwrap()
            .downcast_ref::<HexDisplay>()
            .unwrap();
        assert_eq!(hex.digits(), (0x0040, 0x0005));

        // Only pins configured as outputs are driven.
        bus.write_u16(0x0200, 0x00FF).unwrap();
        bus.write_u16(0x0202, 0x0141).unwrap();
        let port = bus
            .device("port1")
            .unwrap()
            .as_any()
            .unwrap()
            .downcast_ref::<OutputPort>()
            .unwrap();
        assert_eq!(port.pins(), 0x0041);
    }

    #[test]
    fn test_trace_recorder() {
        let mut channel =
            copro_channel(Operation::Max, Responsiveness::Acknowledge { latency: 2 });
        let recorder = Arc::new(TraceRecorder::new());
        channel.add_observer(recorder.clone());

        channel.compute(5, 64).unwrap();
        channel.compute(100, 64).unwrap();

        let trace = recorder.take_trace();
        assert_eq!(trace.transactions.len(), 2);

        let first = &trace.transactions[0];
        assert_eq!((first.a, first.b, first.result), (5, 64, 64));
        assert_eq!(first.edges, vec![true, false, true, false]);
        assert_eq!(first.polls, 8);

        let json = serde_json::to_string(&trace).unwrap();
        assert!(json.contains("\"result\":64"));
    }

    #[test]
    fn test_bus_snapshot_lists_devices() {
        let mut bus = DeviceBus::new();
        bus.mount(
            "copro",
            regmap::DEFAULT_BASE,
            regmap::BLOCK_SIZE,
            Box::new(Coprocessor::new(Operation::Max, Responsiveness::default())),
        );
        bus.mount("hex0", 0x0190, HexDisplay::WINDOW, Box::new(HexDisplay::new()));

        let snapshot = bus.snapshot();
        assert!(snapshot.get("copro").is_some());
        assert_eq!(snapshot["copro"]["operation"], "max");
        assert!(snapshot.get("hex0").is_some());
    }
}
