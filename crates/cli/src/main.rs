use clap::Parser;
use coprolink_config::BenchManifest;
use coprolink_core::bus::DeviceBus;
use coprolink_core::channel::HandshakeChannel;
use coprolink_core::metrics::LinkMetrics;
use coprolink_core::regmap::RegisterMap;
use coprolink_core::trace::TraceRecorder;
use coprolink_core::RegisterBus;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the bench manifest (YAML)
    #[arg(short, long)]
    bench: Option<PathBuf>,

    /// Number of sweep iterations (overrides the manifest)
    #[arg(long)]
    count: Option<u16>,

    /// Fixed second operand (overrides the manifest)
    #[arg(long)]
    operand: Option<u16>,

    /// Delay between iterations in milliseconds (overrides the manifest)
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Enable handshake-level execution tracing
    #[arg(short, long)]
    trace: bool,

    /// Write the recorded transaction trace to a JSON file
    #[arg(long)]
    trace_out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    info!("Starting CoproLink bench");

    let mut manifest = match &args.bench {
        Some(path) => {
            info!("Loading bench manifest: {:?}", path);
            BenchManifest::from_file(path)?
        }
        None => {
            info!("Using built-in demo bench");
            BenchManifest::demo()
        }
    };
    if let Some(count) = args.count {
        manifest.sweep.count = count;
    }
    if let Some(operand) = args.operand {
        manifest.sweep.operand = operand;
    }
    if let Some(delay_ms) = args.delay_ms {
        manifest.delay_ms = delay_ms;
    }

    let bus = DeviceBus::from_manifest(&manifest)?;
    let map = RegisterMap::at_base(manifest.link.base);
    let mut channel = HandshakeChannel::new(bus, map);

    let metrics = Arc::new(LinkMetrics::new());
    channel.add_observer(metrics.clone());
    let recorder = args.trace_out.as_ref().map(|_| Arc::new(TraceRecorder::new()));
    if let Some(recorder) = &recorder {
        channel.add_observer(recorder.clone());
    }

    let hex_base = manifest
        .devices
        .iter()
        .find(|d| d.r#type == "hex-display")
        .map(|d| d.base);
    let port_base = manifest
        .devices
        .iter()
        .find(|d| d.r#type == "output-port")
        .map(|d| d.base);

    // Output devices come up before the first transaction: all port
    // pins configured as outputs, the way the board init routine does.
    if let Some(base) = port_base {
        channel.bus_mut().write_u16(base, 0x00FF)?;
    }

    info!(
        "Bench '{}': sweeping {} inputs against operand {} ({})",
        manifest.name, manifest.sweep.count, manifest.sweep.operand, manifest.link.operation
    );

    for i in 0..manifest.sweep.count {
        let result = channel.compute(i, manifest.sweep.operand)?;

        let bus = channel.bus_mut();
        if let Some(base) = hex_base {
            bus.write_u16(base, result)?;
            bus.write_u16(base + 2, i)?;
        }
        if let Some(base) = port_base {
            bus.write_u16(base + 2, result)?;
        }

        if manifest.delay_ms > 0 {
            std::thread::sleep(std::time::Duration::from_millis(manifest.delay_ms));
        }
    }

    info!(
        "Sweep finished: {} transactions, {} control edges, {} polls",
        metrics.get_transactions(),
        metrics.get_edges(),
        metrics.get_polls()
    );

    if let (Some(path), Some(recorder)) = (&args.trace_out, &recorder) {
        let trace = recorder.take_trace();
        std::fs::write(path, serde_json::to_string_pretty(&trace)?)?;
        info!("Transaction trace written to {:?}", path);
    }

    Ok(())
}
