//! Criterion benchmarks for the ring buffer and framed queue
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use mqueue::core::RingBuffer;
use mqueue::protocol::HEADER_SIZE;
use mqueue::{poll, Handle, OpenFlags, PollEntry, PollEvents};

fn bench_ring_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_buffer");
    group.throughput(Throughput::Bytes(16));

    group.bench_function("write", |b| {
        let mut rb = RingBuffer::new(65536).unwrap();
        let record = [0xABu8; 16];
        let mut out = [0u8; 16];
        b.iter(|| {
            if !rb.write(black_box(&record)) {
                rb.read(&mut out);
                rb.write(black_box(&record));
            }
        });
    });

    group.bench_function("read", |b| {
        let mut rb = RingBuffer::new(65536).unwrap();
        let record = [0xABu8; 16];
        let mut out = [0u8; 16];
        // Half full
        for _ in 0..2048 {
            rb.write(&record);
        }
        b.iter(|| {
            if rb.read(&mut out) {
                rb.write(black_box(&out));
            }
        });
    });

    group.bench_function("write_read_cycle", |b| {
        let mut rb = RingBuffer::new(65536).unwrap();
        let record = [0xABu8; 16];
        let mut out = [0u8; 16];
        b.iter(|| {
            rb.write(black_box(&record));
            black_box(rb.read(&mut out));
        });
    });

    group.finish();
}

fn bench_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue");
    group.throughput(Throughput::Elements(1));

    for size in [8usize, 64, 512] {
        group.bench_function(format!("write_read_{}", size), |b| {
            let reader = Handle::create(65536, OpenFlags::READER).unwrap();
            let writer = reader.open(OpenFlags::WRITER).unwrap();
            let payload = vec![0x5Au8; size];
            let mut buf = vec![0u8; size];
            b.iter(|| {
                writer.write(black_box(&payload)).unwrap();
                black_box(reader.read(&mut buf).unwrap());
            });
        });
    }

    group.bench_function("poll_ready", |b| {
        let readers: Vec<Handle> = (0..8)
            .map(|_| Handle::create(4096, OpenFlags::READER).unwrap())
            .collect();
        let writer = readers[7].open(OpenFlags::WRITER).unwrap();
        writer.write(b"ready").unwrap();
        let mut entries: Vec<PollEntry<'_>> = readers
            .iter()
            .map(|r| PollEntry::new(r, PollEvents::READABLE))
            .collect();
        b.iter(|| black_box(poll(&mut entries).unwrap()));
    });

    group.finish();
}

fn bench_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("throughput");

    for batch_size in [100usize, 1000] {
        group.throughput(Throughput::Elements(batch_size as u64));
        group.bench_function(format!("batch_{}", batch_size), |b| {
            let capacity = batch_size * (HEADER_SIZE + 8);
            let reader = Handle::create(capacity, OpenFlags::READER).unwrap();
            let writer = reader.open(OpenFlags::WRITER | OpenFlags::NONBLOCK).unwrap();
            let mut buf = [0u8; 8];
            b.iter(|| {
                for i in 0..batch_size as u64 {
                    writer.write(black_box(&i.to_le_bytes())).unwrap();
                }
                for _ in 0..batch_size {
                    black_box(reader.read(&mut buf).unwrap());
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_ring_buffer, bench_queue, bench_throughput);
criterion_main!(benches);
