//! Tessera - Serialization Latency Benchmark
//!
//! Mengukur latency tiap pass (size / pack / unpack) untuk:
//! - Directly serializable value (raw-copy path)
//! - Composite value dengan variable-length data (custom encoder path)
//! - Value besar yang direkonstruksi lewat heap storage
//!
//! Usage:
//!   cargo run --release --bin tessera_bench -- [--iterations N] [--payload N]
//!
//! Set `RUST_LOG=tessera=trace` untuk melihat event per pass.

use std::env;
use std::hint::black_box;
use std::time::Instant;

use tessera::core::{DynamicSerializationBuffer, SystemAllocator};
use tessera::protocol::{
    Decode, Encode, PackingArchive, SerializationHandler, SizingArchive, UnpackingArchive,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Benchmark configuration
struct BenchConfig {
    iterations: usize,
    payload_size: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            iterations: 1_000_000,
            payload_size: 64,
        }
    }
}

impl BenchConfig {
    fn from_args() -> Self {
        let mut config = Self::default();
        let args: Vec<String> = env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--iterations" | "-n" => {
                    if let Some(v) = args.get(i + 1).and_then(|s| s.parse().ok()) {
                        config.iterations = v;
                    }
                    i += 1;
                }
                "--payload" | "-p" => {
                    if let Some(v) = args.get(i + 1).and_then(|s| s.parse().ok()) {
                        config.payload_size = v;
                    }
                    i += 1;
                }
                "--help" | "-h" => {
                    println!("Usage: tessera_bench [--iterations N] [--payload N]");
                    std::process::exit(0);
                }
                _ => {}
            }
            i += 1;
        }

        config
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = BenchConfig::from_args();

    println!("🧱 Tessera Serialization - Three-Phase Benchmark");
    println!("================================================\n");
    info!(
        iterations = config.iterations,
        payload = config.payload_size,
        "starting benchmark"
    );

    let pair = (1i64, 2i64);
    bench_value("Raw-Copy Pair (i64, i64)", &pair, config.iterations);

    let composite = ("x".repeat(config.payload_size), 3.5f64);
    bench_value("Composite (String, f64)", &composite, config.iterations);

    let large = [0x5Au8; 4096];
    bench_value("Large Array [u8; 4096] (heap unpack)", &large, config.iterations / 10);

    println!("\n✅ All benchmarks complete!");
}

fn bench_value<T>(label: &str, value: &T, iterations: usize)
where
    T: Encode + Decode + PartialEq,
{
    println!("📊 {}", label);
    println!("{}", "-".repeat(label.len() + 3));

    let iterations = iterations.max(1);

    // Sizing
    let start = Instant::now();
    let mut size = 0;
    for _ in 0..iterations {
        let mut ar = SizingArchive::new();
        ar.feed(black_box(value));
        size = ar.size();
    }
    let size_duration = start.elapsed();

    // Packing ke buffer yang di-reuse
    let mut buffer = match DynamicSerializationBuffer::new(size) {
        Ok(buffer) => buffer,
        Err(err) => {
            eprintln!("  ❌ buffer allocation failed: {}", err);
            return;
        }
    };
    let start = Instant::now();
    for _ in 0..iterations {
        let mut ar = PackingArchive::new(buffer);
        ar.feed(black_box(value));
        buffer = ar.into_buffer();
    }
    let pack_duration = start.elapsed();

    // Unpacking
    let start = Instant::now();
    let mut matched = true;
    for _ in 0..iterations {
        let mut ar = UnpackingArchive::new(buffer.as_ref(), &SystemAllocator);
        match ar.unpack_next_item_as::<T>() {
            Ok(output) => matched &= black_box(output) == *value,
            Err(err) => {
                eprintln!("  ❌ unpack failed: {}", err);
                return;
            }
        }
    }
    let unpack_duration = start.elapsed();

    let per_op = |d: std::time::Duration| d.as_nanos() as f64 / iterations as f64;

    println!("  Encoded size:    {} bytes", size);
    println!("  Operations:      {}", iterations);
    println!("  Size latency:    {:.2} ns/op", per_op(size_duration));
    println!("  Pack latency:    {:.2} ns/op", per_op(pack_duration));
    println!("  Unpack latency:  {:.2} ns/op", per_op(unpack_duration));
    println!(
        "  Pack throughput: {:.2} MB/sec",
        (iterations * size) as f64 / pack_duration.as_secs_f64() / 1_000_000.0
    );
    println!(
        "  Round trip:      {}\n",
        if matched { "OK" } else { "MISMATCH ⚠️" }
    );

    // One-shot handler path sebagai pembanding
    let handler = SerializationHandler::new();
    if let Ok(encoded) = handler.serialize(value) {
        info!(label, bytes = encoded.as_ref().len(), "handler serialize");
    }
}
