//! Benchmarks for book reconstruction performance.

use auction_book::{
    BookBuilder, BookConfig, BookOutput, BookSnapshot, CanonicalEvent, ImpliedBookEngine, Side,
    TradeRecord,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

const TICK: i64 = 250_000; // 0.25 in fixed-point

fn create_test_events(count: usize) -> Vec<CanonicalEvent> {
    let mut events = Vec::with_capacity(count);
    let base_price: i64 = 1_234_000_000;

    for i in 0..count {
        let order_id = (i + 1) as u64;
        let sequence = (i + 1) as i64;
        let timestamp = 1_000 + sequence;
        let is_bid = i % 2 == 0;
        let price_offset = ((i % 20) as i64) * TICK;

        let event = if i % 7 == 6 {
            // Pull an order placed a few events ago
            CanonicalEvent::delete(order_id - 6, sequence, timestamp)
        } else if is_bid {
            CanonicalEvent::add(order_id, Side::Bid, base_price - price_offset, 5, sequence, timestamp)
        } else {
            CanonicalEvent::add(
                order_id,
                Side::Ask,
                base_price + TICK + price_offset,
                5,
                sequence,
                timestamp,
            )
        };
        events.push(event);
    }

    events
}

fn bench_reconstruction(c: &mut Criterion) {
    let _ = env_logger::builder().is_test(true).try_init();
    let events = create_test_events(10_000);

    let mut group = c.benchmark_group("reconstruction");
    group.throughput(Throughput::Elements(events.len() as u64));

    group.bench_function("apply_events", |b| {
        b.iter(|| {
            let mut book = BookBuilder::new("ESZ1");
            for event in &events {
                let _ = black_box(book.apply_event(event));
            }
        })
    });

    group.finish();
}

fn bench_implied(c: &mut Criterion) {
    let events = create_test_events(10_000);
    let mut book =
        BookBuilder::with_config("ESZ1", BookConfig::default().with_logging(false)).unwrap();
    let snapshots: Vec<BookSnapshot> = events
        .iter()
        .filter_map(|event| match book.apply_event(event) {
            Ok(Some(BookOutput::Snapshot(snapshot))) => Some(snapshot),
            _ => None,
        })
        .collect();

    // One print at the top bid between each pair of snapshots
    let trades: Vec<TradeRecord> = snapshots
        .windows(2)
        .filter_map(|pair| {
            let price = pair[0].best_bid()?;
            Some(TradeRecord {
                timestamp: pair[1].timestamp,
                timestamp_string: String::new(),
                sequence: pair[1].sequence,
                price,
                quantity: 3,
                trade_type: 0,
                aggressor_side: Some(Side::Ask),
            })
        })
        .collect();

    let mut group = c.benchmark_group("implied");
    group.throughput(Throughput::Elements((snapshots.len() + trades.len()) as u64));

    group.bench_function("merge", |b| {
        b.iter(|| {
            let engine = ImpliedBookEngine::from_vecs(snapshots.clone(), trades.clone());
            for view in engine {
                let _ = black_box(view);
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_reconstruction, bench_implied);
criterion_main!(benches);
