//! mqueue - latency benchmark
//!
//! Measures:
//! - Raw ring buffer write/read of small byte records
//! - Framed queue write/read through a single reader/writer handle pair
//! - Ping-pong between two threads over a pair of queues

use std::thread;
use std::time::Instant;

use anyhow::Result;
use mqueue::core::RingBuffer;
use mqueue::{Handle, OpenFlags};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    init_tracing();

    println!("🚀 mqueue - latency benchmark");
    println!("=============================\n");

    benchmark_ring_buffer()?;
    benchmark_queue()?;
    benchmark_ping_pong()?;

    println!("\n✅ All benchmarks complete!");
    println!("\nDemos: cargo run --release --bin prodcon | --bin multiprod");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(env_filter).try_init();
}

fn benchmark_ring_buffer() -> Result<()> {
    println!("📊 Ring Buffer Benchmark (bytes)");
    println!("--------------------------------");

    const ITERATIONS: usize = 1_000_000;
    const RECORD: usize = 16;
    let mut rb = RingBuffer::new(64 * 1024)?;
    let record = [0xABu8; RECORD];
    let mut out = [0u8; RECORD];

    let start = Instant::now();
    for _ in 0..ITERATIONS {
        if !rb.write(&record) {
            rb.read(&mut out);
            rb.write(&record);
        }
    }
    let write_duration = start.elapsed();

    while rb.read(&mut out) {}

    for _ in 0..(rb.capacity() / RECORD) {
        rb.write(&record);
    }
    let start = Instant::now();
    for _ in 0..ITERATIONS {
        if !rb.read(&mut out) {
            rb.write(&record);
            rb.read(&mut out);
        }
    }
    let read_duration = start.elapsed();

    report("Write", ITERATIONS, write_duration.as_nanos());
    report("Read ", ITERATIONS, read_duration.as_nanos());
    println!();
    Ok(())
}

fn benchmark_queue() -> Result<()> {
    println!("📊 Queue Benchmark (framed, single thread)");
    println!("------------------------------------------");

    const ITERATIONS: usize = 1_000_000;
    const PAYLOAD: usize = 64;
    let reader = Handle::create(1024 * 1024, OpenFlags::READER)?;
    let writer = reader.open(OpenFlags::WRITER | OpenFlags::NONBLOCK)?;
    let payload = [0u8; PAYLOAD];
    let mut buf = [0u8; PAYLOAD];

    let start = Instant::now();
    for _ in 0..ITERATIONS {
        writer.write(&payload)?;
        reader.read(&mut buf)?;
    }
    let duration = start.elapsed();

    println!("  Payload size: {} bytes", PAYLOAD);
    report("Write+Read", ITERATIONS, duration.as_nanos());
    println!(
        "  Throughput:   {:.2} M msgs/sec\n",
        ITERATIONS as f64 / duration.as_secs_f64() / 1_000_000.0
    );
    Ok(())
}

fn benchmark_ping_pong() -> Result<()> {
    println!("📊 Ping-Pong Benchmark (two threads, blocking)");
    println!("----------------------------------------------");

    const ROUNDS: usize = 100_000;
    let ping_rx = Handle::create(4096, OpenFlags::READER)?;
    let mut ping_tx = ping_rx.open(OpenFlags::WRITER)?;
    let pong_rx = Handle::create(4096, OpenFlags::READER)?;
    let pong_tx = pong_rx.open(OpenFlags::WRITER)?;

    let echo = thread::spawn(move || -> mqueue::MqResult<()> {
        let mut buf = [0u8; 8];
        loop {
            match ping_rx.read(&mut buf)? {
                0 => return Ok(()),
                n => pong_tx.write(&buf[..n])?,
            }
        }
    });

    let mut buf = [0u8; 8];
    let start = Instant::now();
    for i in 0..ROUNDS as u64 {
        ping_tx.write(&i.to_le_bytes())?;
        pong_rx.read(&mut buf)?;
    }
    let duration = start.elapsed();
    ping_tx.close()?;

    match echo.join() {
        Ok(result) => result?,
        Err(_) => anyhow::bail!("echo thread panicked"),
    }

    report("Round trip", ROUNDS, duration.as_nanos());
    Ok(())
}

fn report(label: &str, iterations: usize, total_ns: u128) {
    let ns = total_ns as f64 / iterations as f64;
    println!(
        "  {} latency: {:.2} ns/op ({:.3} μs/op)",
        label,
        ns,
        ns / 1000.0
    );
}
