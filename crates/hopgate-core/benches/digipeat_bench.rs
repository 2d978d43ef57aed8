use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use hopgate_core::{
    Address, AddressMode, AddressPatterns, DedupeCache, Packet, PreemptMode, RepeatRule,
    digipeat_match,
};
use std::time::{Duration, Instant};

const ALIAS: &str = r"^WIDE[4-7]-[1-7]|CITYD$";
const WIDE: &str = r"^WIDE[1-7]-[1-7]$|^TRACE[1-7]-[1-7]$|^MA[1-7]-[1-7]$";

fn bench_packet_parse(c: &mut Criterion) {
    let text = "W1ABC-5>APRS,WIDE1-1*,WIDE2-1:!4237.14N/07120.83W-PHG7140 Mount Wachusett";

    let mut group = c.benchmark_group("packet_parse");
    group.throughput(Throughput::Bytes(text.len() as u64));

    group.bench_function("strict", |b| {
        b.iter(|| Packet::from_text(black_box(text), AddressMode::Strict))
    });
    group.bench_function("relaxed", |b| {
        b.iter(|| Packet::from_text(black_box(text), AddressMode::Relaxed))
    });

    group.finish();
}

fn bench_digipeat_match(c: &mut Criterion) {
    let mycall: Address = "WB2OSZ-9".parse().unwrap();
    let patterns = AddressPatterns::compile(ALIAS, WIDE).unwrap();
    // Window of zero so earlier iterations never suppress later ones.
    let history = DedupeCache::new(25, Duration::ZERO);

    let cases = [
        ("wide_decrement", "W1ABC>APRS,WIDE2-2:hello", PreemptMode::Off),
        ("wide_last_hop", "W1ABC>APRS,WIDE1-1:hello", PreemptMode::Off),
        ("alias", "W1ABC>APRS,CITYD:hello", PreemptMode::Off),
        (
            "preempt_trace",
            "W1ABC>APRS,CITYA*,CITYB,CITYC,CITYD,CITYE:hello",
            PreemptMode::Trace,
        ),
        ("no_match", "W1ABC>APRS,N0CALL:hello", PreemptMode::Off),
    ];

    let mut group = c.benchmark_group("digipeat_match");

    for (name, text, preempt) in cases {
        let packet = Packet::from_text(text, AddressMode::Strict).unwrap();
        let rule = RepeatRule {
            receive_call: &mycall,
            transmit_call: &mycall,
            patterns: &patterns,
            preempt,
            history: &history,
        };
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut p = packet.clone();
                digipeat_match(black_box(&mut p), &rule, Instant::now())
            })
        });
    }

    group.finish();
}

fn bench_dedupe(c: &mut Criterion) {
    let cache = DedupeCache::new(50, Duration::from_secs(60));
    let packets: Vec<Packet> = (0..50)
        .map(|i| Packet::from_text(&format!("W1ABC>APRS:msg{i}"), AddressMode::Strict).unwrap())
        .collect();
    let now = Instant::now();
    for p in &packets {
        cache.remember_at(p.fingerprint(), now);
    }
    let miss = Packet::from_text("W1ABC>APRS:absent", AddressMode::Strict)
        .unwrap()
        .fingerprint();

    let mut group = c.benchmark_group("dedupe");
    group.bench_function("fingerprint", |b| b.iter(|| black_box(&packets[0]).fingerprint()));
    group.bench_function("contains_miss_50", |b| {
        b.iter(|| cache.contains_at(black_box(miss), now))
    });
    group.bench_function("count_within_50", |b| {
        b.iter(|| cache.count_within(black_box(Duration::from_secs(300)), now))
    });
    group.finish();
}

criterion_group!(benches, bench_packet_parse, bench_digipeat_match, bench_dedupe);
criterion_main!(benches);
