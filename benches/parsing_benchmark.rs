use criterion::{black_box, criterion_group, criterion_main, Criterion};
use disto_rs::disto::session::SessionOutput;
use disto_rs::{parse_token, LineAssembler, ProtocolSession, SessionConfig};
use std::time::Instant;

fn tracking_stream(lines: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(lines * 16);
    for i in 0..lines {
        data.extend_from_slice(format!("31..00+{:07}\r\n", 1000 + i).as_bytes());
    }
    data
}

fn benchmark_parse_token(c: &mut Criterion) {
    c.bench_function("parse_token", |b| {
        b.iter(|| {
            let word = parse_token(black_box("31..00+0012345"));
            let _ = black_box(word);
        })
    });

    c.bench_function("parse_token_reject", |b| {
        b.iter(|| {
            let word = parse_token(black_box("@E203"));
            let _ = black_box(word);
        })
    });
}

fn benchmark_line_assembler(c: &mut Criterion) {
    let data = tracking_stream(256);

    c.bench_function("line_assembler_64b_chunks", |b| {
        b.iter(|| {
            let mut assembler = LineAssembler::new();
            let mut count = 0;
            for chunk in data.chunks(64) {
                count += assembler.feed(black_box(chunk)).count();
            }
            black_box(count)
        })
    });
}

fn benchmark_session(c: &mut Criterion) {
    let data = tracking_stream(256);
    let text = String::from_utf8_lossy(&data).into_owned();
    let lines: Vec<&str> = text.lines().collect();

    c.bench_function("session_handle_line", |b| {
        b.iter(|| {
            let mut session = ProtocolSession::new(&SessionConfig::default());
            let mut out = SessionOutput::new();
            let now = Instant::now();
            for line in &lines {
                session.handle_line(black_box(line), now, &mut out);
            }
            black_box(out.events.len())
        })
    });
}

criterion_group!(
    benches,
    benchmark_parse_token,
    benchmark_line_assembler,
    benchmark_session
);
criterion_main!(benches);
