//! Throughput benchmarks

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;
use xyeshark_core::core::codec::to_hex;
use xyeshark_core::{encode_datagram, DecoderConfig, FrameDecoder, FrameSink};

/// Counts frames without keeping them
struct Count(usize);

impl FrameSink for Count {
    fn emit(&mut self, frame: &[u8]) {
        self.0 += black_box(frame).len();
    }
}

fn bus_traffic() -> Vec<u8> {
    // Query/response pairs as they appear on the Xye bus
    let query = [0xAA, 0xC0, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x3F, 0x81, 0x55];
    let mut data = Vec::new();
    while data.len() < 64 * 1024 {
        data.extend_from_slice(&query);
        data.extend((0u8..16).map(|i| i.wrapping_mul(7) | 0x01));
    }
    data
}

fn decoder_benchmark(c: &mut Criterion) {
    let data = bus_traffic();

    let mut group = c.benchmark_group("decoder");
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("process", |b| {
        let mut decoder = FrameDecoder::new(DecoderConfig::default()).unwrap();
        b.iter(|| {
            let mut sink = Count(0);
            decoder.process(black_box(&data), &mut sink, &mut ());
            black_box(sink.0)
        })
    });

    group.finish();
}

fn datagram_benchmark(c: &mut Criterion) {
    let frame: Vec<u8> = (0..32).collect();

    let mut group = c.benchmark_group("frame_output");

    group.bench_function("encode_datagram", |b| {
        b.iter(|| black_box(encode_datagram(1, 0, black_box(&frame))))
    });

    group.bench_function("hex_line", |b| b.iter(|| black_box(to_hex(black_box(&frame)))));

    group.finish();
}

criterion_group!(benches, decoder_benchmark, datagram_benchmark);
criterion_main!(benches);
