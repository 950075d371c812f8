//! Benchmarks for the filter engine and a full conversation turn.
//!
//! Uses a synthetic catalog of 10,000 products by default. Set
//! `BENCH_FULL_SCALE=1` to run against 100,000 products:
//!
//! ```bash
//! BENCH_FULL_SCALE=1 cargo bench -p grocer-chat
//! ```

use std::sync::Arc;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};

use grocer_catalog::CatalogStore;
use grocer_chat::{FilterEngine, RuleOracle, SessionOrchestrator};
use grocer_core::config::ChatConfig;
use grocer_core::types::{
    Price, PriceFilter, PriceOperator, ProductRecord, SortKey, StructuredQuery,
};

const CI_PRODUCT_COUNT: usize = 10_000;
const FULL_SCALE_PRODUCT_COUNT: usize = 100_000;

const VENDORS: &[&str] = &["ASDA", "Subway", "Tesco", "Pret", "Sainsbury's"];
const CATEGORIES: &[&str] = &["drink", "sandwich", "bagel", "snack", "salad"];
const BRANDS: &[&str] = &["Coca-Cola", "Pepsi", "Walkers", "Subway", "Pret"];
const TAGS: &[&str] = &["vegan", "vegetarian", "gluten-free", "low-calorie"];

fn product_count() -> usize {
    if std::env::var("BENCH_FULL_SCALE").is_ok() {
        FULL_SCALE_PRODUCT_COUNT
    } else {
        CI_PRODUCT_COUNT
    }
}

fn generate_product(i: usize) -> ProductRecord {
    ProductRecord {
        id: i.to_string(),
        name: format!("{} Item {}", BRANDS[i % BRANDS.len()], i),
        brand: BRANDS[i % BRANDS.len()].to_string(),
        price: Price::from_pence(50 + (i as u64 * 37) % 950),
        vendor: VENDORS[(i / 3) % VENDORS.len()].to_string(),
        category: CATEGORIES[(i / 7) % CATEGORIES.len()].to_string(),
        tags: (0..TAGS.len())
            .filter(|t| (i >> t) & 1 == 1)
            .map(|t| TAGS[t].to_string())
            .collect(),
        calories: Some((i % 800) as u32),
        image: None,
    }
}

fn build_catalog(count: usize) -> CatalogStore {
    CatalogStore::from_records((0..count).map(generate_product).collect())
        .expect("synthetic catalog has unique ids")
}

fn bench_filter_engine(c: &mut Criterion) {
    let count = product_count();
    let catalog = build_catalog(count);
    let engine = FilterEngine::new();

    let mut group = c.benchmark_group("filter_engine");
    group.sample_size(50);
    group.measurement_time(Duration::from_secs(5));

    let sorted = StructuredQuery {
        product_types: vec!["drink".to_string(), "snack".to_string()],
        sort_by: Some(SortKey::PriceAsc),
        ..Default::default()
    };
    group.bench_function(format!("types_sorted_top3_{}products", count), |b| {
        b.iter(|| engine.search(&sorted, catalog.products(), 3));
    });

    let narrow = StructuredQuery {
        exclude_vendors: vec!["ASDA".to_string()],
        tags: vec!["vegan".to_string()],
        price_filter: Some(PriceFilter::new(PriceOperator::Le, Price::from_pence(300))),
        keywords: vec!["pepsi".to_string(), "walkers".to_string()],
        ..Default::default()
    };
    group.bench_function(format!("all_clauses_top3_{}products", count), |b| {
        b.iter(|| engine.search(&narrow, catalog.products(), 3));
    });

    group.finish();
}

fn bench_conversation_turn(c: &mut Criterion) {
    let count = product_count();
    let catalog = Arc::new(build_catalog(count));
    let oracle = Arc::new(RuleOracle::from_catalog(&catalog));
    let orchestrator = SessionOrchestrator::new(ChatConfig::default(), catalog, oracle);

    let mut group = c.benchmark_group("conversation_turn");
    group.sample_size(30);
    group.measurement_time(Duration::from_secs(5));

    group.bench_function(format!("rule_oracle_turn_{}products", count), |b| {
        b.iter(|| {
            orchestrator
                .handle_turn("cheap vegan Pepsi not from ASDA under £5")
                .expect("turn failed")
        });
    });

    group.finish();
}

criterion_group!(benches, bench_filter_engine, bench_conversation_turn);
criterion_main!(benches);
