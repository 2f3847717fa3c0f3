//! Benchmarks for the overlay roles over the in-memory network

use std::time::Duration;

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use emyz_core::{ChannelRole, Clock, ManualClock, MicroTime};
use emyz_crypto::{Authorizer, KeyPair};
use emyz_runtime::{ConnpointVotes, EfunguzConfig};
use emyz_test::{pump, random_payload, Overlay};

fn bench_emit_and_poll(c: &mut Criterion) {
    let overlay = Overlay::new();
    let mut alice = overlay.peer(1, EfunguzConfig::default()).unwrap();
    let mut bob = overlay.peer(2, EfunguzConfig::default()).unwrap();
    let (ehypha, _) = bob
        .efunguz
        .add_ehypha(alice.key(), &alice.connpoint(), None)
        .unwrap();
    let _ = ehypha.add_topic("life").unwrap();
    pump(&mut [&mut alice, &mut bob], &mut [], 2);

    let parts = vec![
        Bytes::from_static(b"64"),
        Bytes::from_static(b"48"),
        random_payload(64 * 48),
    ];

    let mut group = c.benchmark_group("emit_and_poll");
    group.throughput(Throughput::Bytes((64 * 48 + 4) as u64));
    group.bench_function("3072_bytes", |b| {
        b.iter(|| {
            alice.efunguz.emit("life", black_box(parts.clone())).unwrap();
            bob.efunguz.update();
        })
    });
    group.finish();
}

fn bench_vote_resolve(c: &mut Criterion) {
    let clock = ManualClock::new(MicroTime::from_millis(1_000_000));
    let mut votes = ConnpointVotes::new();
    for i in 0..16u16 {
        let catalog = KeyPair::generate().public_key().clone();
        let connpoint = format!("tcp://10.0.0.{}:60847", i % 3);
        votes.update(catalog, connpoint, clock.now());
        clock.advance(Duration::from_secs(5));
    }

    c.bench_function("vote_resolve_16", |b| {
        b.iter(|| {
            black_box(votes.resolve(clock.now(), Some(Duration::from_secs(60))));
        })
    });
}

fn bench_authorize(c: &mut Criterion) {
    let mut auth = Authorizer::new();
    let whitelist = auth.declare(ChannelRole::Pubsub);
    let keys: Vec<_> = (0..256).map(|_| KeyPair::generate().public_key().clone()).collect();
    whitelist.extend(keys.iter().map(|k| k.as_str()));
    let candidate = keys[128].clone();

    c.bench_function("authorize_256", |b| {
        b.iter(|| black_box(auth.authorize(black_box(&candidate), ChannelRole::Pubsub)))
    });
}

criterion_group!(benches, bench_emit_and_poll, bench_vote_resolve, bench_authorize);
criterion_main!(benches);
