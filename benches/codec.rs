use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use cmpp::protocol::{
    ActiveTest, CommandId, Connect, FrameBuffer, RawPdu, SourceAddr, Timestamp, decode,
    source_digest,
};
use cmpp::{Message, Pdu, Version};

fn sample_connect() -> Connect {
    Connect::new(
        1,
        SourceAddr::new("901234").unwrap(),
        b"secret",
        Version::V2_0,
        Timestamp::from_u32(1_001_235_010),
    )
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    let connect = sample_connect();
    group.throughput(Throughput::Bytes(39));
    group.bench_function("encode_connect", |b| {
        b.iter(|| {
            black_box(connect.encode());
        });
    });

    let heartbeat = ActiveTest::new(7);
    group.throughput(Throughput::Bytes(12));
    group.bench_function("encode_active_test", |b| {
        b.iter(|| {
            black_box(heartbeat.encode());
        });
    });

    // Submit-sized opaque body
    let submit = RawPdu::new(CommandId::Submit, 9, vec![0u8; 256]).unwrap();
    group.throughput(Throughput::Bytes(268));
    group.bench_function("encode_payload_256b", |b| {
        b.iter(|| {
            black_box(submit.encode());
        });
    });

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    let connect = sample_connect().encode();
    group.throughput(Throughput::Bytes(39));
    group.bench_function("decode_connect", |b| {
        b.iter(|| {
            black_box(decode(&connect).unwrap());
        });
    });

    let submit = Pdu::from(RawPdu::new(CommandId::Submit, 9, vec![0u8; 256]).unwrap()).encode();
    group.throughput(Throughput::Bytes(268));
    group.bench_function("decode_payload_256b", |b| {
        b.iter(|| {
            black_box(decode(&submit).unwrap());
        });
    });

    group.finish();
}

fn bench_reassembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    // 64 heartbeats delivered in 7-byte chunks
    let stream: Vec<u8> = (1..=64u32)
        .flat_map(|seq| ActiveTest::new(seq).encode().to_vec())
        .collect();
    group.throughput(Throughput::Bytes(stream.len() as u64));
    group.bench_function("reassemble_chunked", |b| {
        b.iter(|| {
            let mut frames = FrameBuffer::new();
            let mut count = 0;
            for chunk in stream.chunks(7) {
                count += frames.push(chunk).unwrap().len();
            }
            black_box(count);
        });
    });

    group.finish();
}

fn bench_digest(c: &mut Criterion) {
    let mut group = c.benchmark_group("digest");

    group.bench_function("source_digest", |b| {
        b.iter(|| {
            black_box(source_digest(
                black_box(b"901234"),
                black_box(b"secret"),
                black_box(1_001_235_010),
            ));
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_encode,
    bench_decode,
    bench_reassembly,
    bench_digest
);
criterion_main!(benches);
