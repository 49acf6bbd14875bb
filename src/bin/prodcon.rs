//! Producer/consumer demo over one queue
//!
//! The producer announces how many numbers it will send, sends them, and
//! keeps a running sum. The consumer (main thread) reads the announced count
//! of numbers and sums them too; the two sums must match.
//!
//! Usage:
//!   cargo run --release --bin prodcon -- [OPTIONS]

use std::thread;
use std::time::Instant;

use anyhow::{bail, Result};
use mqueue::{Handle, MqError, OpenFlags};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const NUMBER_SIZE: usize = std::mem::size_of::<u32>();

/// Demo configuration
struct Config {
    /// Queue capacity in bytes
    capacity: usize,
    /// How many numbers the producer sends
    count: u32,
    /// Seed for the number generator
    seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 256,
            count: 10_000,
            seed: 369,
        }
    }
}

fn parse_args() -> Config {
    let args: Vec<String> = std::env::args().collect();
    let mut config = Config::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--capacity" | "-c" => {
                if i + 1 < args.len() {
                    config.capacity = args[i + 1].parse().unwrap_or(config.capacity);
                    i += 1;
                }
            }
            "--count" | "-n" => {
                if i + 1 < args.len() {
                    config.count = args[i + 1].parse().unwrap_or(config.count);
                    i += 1;
                }
            }
            "--seed" => {
                if i + 1 < args.len() {
                    config.seed = args[i + 1].parse().unwrap_or(config.seed);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("prodcon - one producer, one consumer\n");
                println!("Usage: prodcon [OPTIONS]\n");
                println!("Options:");
                println!("  -c, --capacity <BYTES>  Queue capacity (default: 256)");
                println!("  -n, --count <N>         Numbers to transfer (default: 10000)");
                println!("      --seed <N>          Generator seed (default: 369)");
                println!("  -h, --help              Show this help");
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
            }
        }
        i += 1;
    }

    config
}

/// Small LCG, enough to make the payloads vary between runs with
/// different seeds
fn next_number(state: &mut u64) -> u32 {
    *state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
    ((*state >> 33) % 64) as u32
}

fn producer(mut queue: Handle, count: u32, seed: u64) -> Result<u64> {
    queue.write(&count.to_le_bytes())?;

    let mut state = seed;
    let mut sum = 0u64;
    for _ in 0..count {
        let number = next_number(&mut state);
        match queue.write(&number.to_le_bytes()) {
            Ok(()) => sum += u64::from(number),
            Err(MqError::BrokenPipe) => {
                warn!("broken pipe, consumer closed");
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }

    queue.close()?;
    info!("producer done");
    Ok(sum)
}

fn run(config: Config) -> Result<()> {
    let mut queue = Handle::create(config.capacity, OpenFlags::READER)?;
    let writer = queue.open(OpenFlags::WRITER)?;

    let (count, seed) = (config.count, config.seed);
    let producer = thread::spawn(move || producer(writer, count, seed));

    let start = Instant::now();
    let mut buf = [0u8; NUMBER_SIZE];
    let len = queue.read(&mut buf)?;
    if len != NUMBER_SIZE {
        bail!("expected a {}-byte count message, got {} bytes", NUMBER_SIZE, len);
    }
    let announced = u32::from_le_bytes(buf);

    let mut sum = 0u64;
    for _ in 0..announced {
        match queue.read(&mut buf)? {
            0 => {
                warn!("end of stream, producer closed early");
                break;
            }
            _ => sum += u64::from(u32::from_le_bytes(buf)),
        }
    }
    let elapsed = start.elapsed();
    queue.close()?;

    let expected = match producer.join() {
        Ok(result) => result?,
        Err(_) => bail!("producer thread panicked"),
    };

    println!("\n📊 prodcon");
    println!("   Capacity:        {} bytes", config.capacity);
    println!("   Numbers:         {}", announced);
    println!("   Producer's sum:  {}", expected);
    println!("   Consumer's sum:  {}", sum);
    println!("   Elapsed:         {:.2} ms", elapsed.as_secs_f64() * 1000.0);

    if expected != sum {
        bail!("producer's sum ({}) and consumer's sum ({}) don't match", expected, sum);
    }
    println!("\n✅ Finished");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(env_filter).try_init();
}

fn main() {
    init_tracing();
    let config = parse_args();

    if let Err(e) = run(config) {
        eprintln!("❌ prodcon error: {:#}", e);
        std::process::exit(1);
    }
}
