//! Throughput benchmark: write-flush-read-advance cycles over a warm pool.

use bytepipe_rs::{channel, Config};
use criterion::{criterion_group, criterion_main, Criterion, Throughput};

const CHUNK: usize = 4096;
const CHUNKS: usize = 64;

fn bench_roundtrip(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");

    let mut group = c.benchmark_group("bytepipe");
    group.throughput(Throughput::Bytes((CHUNK * CHUNKS) as u64));

    group.bench_function("write_through_read_4k", |b| {
        b.iter(|| {
            rt.block_on(async {
                let (mut writer, mut reader) = channel(Config::default());
                let chunk = vec![0xAB_u8; CHUNK];
                for _ in 0..CHUNKS {
                    writer.write_through(&chunk).unwrap();
                    let result = reader.read().await.unwrap();
                    reader.advance(result.buffer.end()).unwrap();
                }
                writer.complete(None).unwrap();
                let done = reader.read().await.unwrap();
                assert!(done.is_completed);
            });
        });
    });

    group.bench_function("write_in_frame_read_4k", |b| {
        b.iter(|| {
            rt.block_on(async {
                let (mut writer, mut reader) = channel(Config::default());
                let chunk = vec![0xCD_u8; CHUNK];
                for _ in 0..CHUNKS {
                    writer.write(&chunk, |frame| frame.flush()).unwrap();
                    let result = reader.read().await.unwrap();
                    reader.advance(result.buffer.end()).unwrap();
                }
                writer.complete(None).unwrap();
                let done = reader.read().await.unwrap();
                assert!(done.is_completed);
            });
        });
    });

    group.finish();
}

criterion_group!(benches, bench_roundtrip);
criterion_main!(benches);
