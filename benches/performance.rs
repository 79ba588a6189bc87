use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rust_decimal::Decimal;
use wallet_core::core::services::{
    ExportFormat, ExportService, ProcessMode, QueryService, RecurringService, TransactionFilter,
    TransactionService,
};
use wallet_core::ledger::{Account, Frequency, LedgerState, RecurringDraft, SeedData, Transaction};

const CATEGORIES: [&str; 4] = ["Food", "Rent", "Travel", "Salary"];

fn build_sample_state(txn_count: usize, templates: usize) -> LedgerState {
    let mut state = LedgerState::from_seed(SeedData::new(
        vec![
            Account::new("main", "Main Account", Decimal::from(100_000)),
            Account::new("savings", "Savings", Decimal::from(50_000)),
        ],
        Vec::new(),
    ));
    let start = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();

    for idx in 0..txn_count {
        let at = start + Duration::hours(idx as i64);
        let amount = Decimal::new(-((idx % 9_000) as i64 + 100), 2);
        let account = if idx % 2 == 0 { "main" } else { "savings" };
        let txn = Transaction::new(account, "Shop", CATEGORIES[idx % CATEGORIES.len()], amount, at);
        TransactionService::add(&mut state, txn, at).expect("add transaction");
    }
    for idx in 0..templates {
        let draft = RecurringDraft::new(
            format!("Subscription {idx}"),
            "Bills",
            Decimal::new(-999, 2),
            "main",
            Frequency::Monthly,
            start,
        );
        RecurringService::add(&mut state, draft).expect("add template");
    }
    state
}

fn bench_recurring_processing(c: &mut Criterion) {
    let state = build_sample_state(1_000, 200);
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();

    c.bench_function("process_recurring_200", |b| {
        b.iter_batched(
            || state.clone(),
            |mut working| {
                let summary = RecurringService::process(&mut working, ProcessMode::All, now);
                black_box(summary);
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_queries(c: &mut Criterion) {
    let state = build_sample_state(black_box(10_000), 0);
    let filter = TransactionFilter::new()
        .category("Food")
        .amount_range(Some(Decimal::from(10)), Some(Decimal::from(60)));

    c.bench_function("filter_10k", |b| {
        b.iter(|| black_box(QueryService::filter(&state, &filter)))
    });

    c.bench_function("export_csv_10k", |b| {
        b.iter(|| black_box(ExportService::export_in(&state, ExportFormat::Csv, &Utc)))
    });

    c.bench_function("export_json_10k", |b| {
        b.iter(|| black_box(ExportService::export_in(&state, ExportFormat::Json, &Utc)))
    });
}

criterion_group!(benches, bench_recurring_processing, bench_queries);
criterion_main!(benches);
