//! Multi-producer poll demo
//!
//! Each producer owns one queue and writes a fixed number of messages with
//! short random pauses in between. A single consumer holds a reader handle
//! on every queue, waits on all of them with `poll`, and reads one message
//! from each queue reported readable. When a queue reports end of stream the
//! consumer checks the "no writers" latch and closes its handle.
//!
//! Time spent in `poll` should dwarf time spent in `read`.
//!
//! Usage:
//!   cargo run --release --bin multiprod -- [OPTIONS]

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use mqueue::protocol::HEADER_SIZE;
use mqueue::{poll, Handle, OpenFlags, PollEntry, PollEvents};
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

const MESSAGE_SIZE: usize = std::mem::size_of::<u32>();

/// Demo configuration
struct Config {
    /// Queue capacity, in messages
    queue_size: usize,
    /// Number of producer threads (and queues)
    producers: usize,
    /// Messages per producer
    messages: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            queue_size: 4,
            producers: 4,
            messages: 200,
        }
    }
}

fn parse_args() -> Config {
    let args: Vec<String> = std::env::args().collect();
    let mut config = Config::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--queue-size" | "-q" => {
                if i + 1 < args.len() {
                    config.queue_size = args[i + 1].parse().unwrap_or(config.queue_size);
                    i += 1;
                }
            }
            "--producers" | "-p" => {
                if i + 1 < args.len() {
                    config.producers = args[i + 1].parse().unwrap_or(config.producers);
                    i += 1;
                }
            }
            "--messages" | "-m" => {
                if i + 1 < args.len() {
                    config.messages = args[i + 1].parse().unwrap_or(config.messages);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("multiprod - N producers, one polling consumer\n");
                println!("Usage: multiprod [OPTIONS]\n");
                println!("Options:");
                println!("  -q, --queue-size <N>  Queue capacity in messages (default: 4)");
                println!("  -p, --producers <N>   Producer threads (default: 4)");
                println!("  -m, --messages <N>    Messages per producer (default: 200)");
                println!("  -h, --help            Show this help");
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

fn next_random(state: &mut u64) -> u64 {
    *state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
    *state >> 33
}

fn producer(mut queue: Handle, messages: usize, seed: u64) -> Result<u64> {
    let mut state = seed;
    let mut sum = 0u64;

    for _ in 0..messages {
        thread::sleep(Duration::from_nanos(next_random(&mut state) % 1_000_000));

        let value = (next_random(&mut state) % 1000) as u32;
        queue.write(&value.to_le_bytes())?;
        sum += u64::from(value);
    }

    queue.close()?;
    Ok(sum)
}

struct ConsumerReport {
    sum: u64,
    poll_time: Duration,
    read_time: Duration,
    iterations: u64,
}

/// Polls and reads until every writer has gone away. Closes each reader
/// handle at end of stream.
fn consumer(mut queues: Vec<Handle>) -> Result<ConsumerReport> {
    let mut report = ConsumerReport {
        sum: 0,
        poll_time: Duration::ZERO,
        read_time: Duration::ZERO,
        iterations: 0,
    };

    while queues.iter().any(|q| !q.is_null()) {
        let start = Instant::now();
        let ready: Vec<(usize, PollEvents)> = {
            let mut entries: Vec<PollEntry<'_>> = Vec::with_capacity(queues.len());
            let mut index = Vec::with_capacity(queues.len());
            for (i, queue) in queues.iter().enumerate().filter(|(_, q)| !q.is_null()) {
                entries.push(PollEntry::new(queue, PollEvents::READABLE));
                index.push(i);
            }

            let count = poll(&mut entries)?;
            if count == 0 {
                bail!("poll returned without any ready queue");
            }
            entries
                .iter()
                .zip(index)
                .filter(|(entry, _)| !entry.revents().is_empty())
                .map(|(entry, i)| (i, entry.revents()))
                .collect()
        };
        report.poll_time += start.elapsed();
        report.iterations += 1;

        for (i, revents) in ready {
            if revents.contains(PollEvents::NO_READERS) {
                bail!("queue {} reported no readers while the consumer holds one", i);
            }
            if revents.contains(PollEvents::NO_WRITERS) && !revents.contains(PollEvents::READABLE)
            {
                bail!("queue {} reported no writers without being readable", i);
            }
            if !revents.contains(PollEvents::READABLE) {
                continue;
            }

            let mut buf = [0u8; MESSAGE_SIZE];
            let start = Instant::now();
            let len = queues[i].read(&mut buf)?;
            report.read_time += start.elapsed();

            match len {
                0 => {
                    // Reader handles get NO_WRITERS implicitly
                    let mut check = [PollEntry::new(&queues[i], PollEvents::empty())];
                    poll(&mut check)?;
                    if !check[0].revents().contains(PollEvents::NO_WRITERS) {
                        bail!("queue {} hit end of stream but still has writers", i);
                    }
                    debug!(queue = i, "end of stream");
                    queues[i].close()?;
                }
                MESSAGE_SIZE => report.sum += u64::from(u32::from_le_bytes(buf)),
                other => bail!("queue {} delivered a {}-byte message", i, other),
            }
        }
    }

    Ok(report)
}

fn run(config: Config) -> Result<()> {
    if config.producers == 0 {
        bail!("at least one producer is required");
    }

    let capacity = config.queue_size * (MESSAGE_SIZE + HEADER_SIZE);
    let queues = (0..config.producers)
        .map(|_| Handle::create(capacity, OpenFlags::empty()))
        .collect::<Result<Vec<_>, _>>()?;
    info!(
        queues = queues.len(),
        capacity, "created queues without read/write capability"
    );

    let readers = queues
        .iter()
        .map(|q| q.open(OpenFlags::READER))
        .collect::<Result<Vec<_>, _>>()?;
    let consumer = thread::spawn(move || consumer(readers));

    let start = Instant::now();
    let mut producers = Vec::with_capacity(config.producers);
    for (i, queue) in queues.iter().enumerate() {
        let writer = queue.open(OpenFlags::WRITER)?;
        let messages = config.messages;
        let seed = 0x5EED ^ i as u64;
        producers.push(thread::spawn(move || producer(writer, messages, seed)));
    }

    let mut produced = 0u64;
    for producer in producers {
        match producer.join() {
            Ok(result) => produced += result?,
            Err(_) => bail!("producer thread panicked"),
        }
    }
    let report = match consumer.join() {
        Ok(result) => result?,
        Err(_) => bail!("consumer thread panicked"),
    };
    let elapsed = start.elapsed();

    // Every reader and writer handle is gone; only the creators remain
    let mut entries: Vec<PollEntry<'_>> = queues
        .iter()
        .map(|q| PollEntry::new(q, PollEvents::NO_READERS | PollEvents::NO_WRITERS))
        .collect();
    let ready = poll(&mut entries)?;
    let all_closed = entries
        .iter()
        .all(|e| e.revents() == PollEvents::NO_READERS | PollEvents::NO_WRITERS);
    if ready != queues.len() || !all_closed {
        bail!("{} of {} queues report both latches", ready, queues.len());
    }

    println!("\n📊 multiprod");
    println!("   Producers:       {}", config.producers);
    println!("   Messages each:   {}", config.messages);
    println!("   Queue capacity:  {} bytes", capacity);
    println!("   Producers' sum:  {}", produced);
    println!("   Consumer's sum:  {}", report.sum);
    println!("   Poll calls:      {}", report.iterations);
    println!("   Poll time:       {:.3} ms", report.poll_time.as_secs_f64() * 1000.0);
    println!("   Read time:       {:.3} ms", report.read_time.as_secs_f64() * 1000.0);
    println!("   Elapsed:         {:.2} ms", elapsed.as_secs_f64() * 1000.0);

    if produced != report.sum {
        bail!("producers' sum ({}) and consumer's sum ({}) don't match", produced, report.sum);
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
        eprintln!("❌ multiprod error: {:#}", e);
        std::process::exit(1);
    }
}
