// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use flipdeck_app::{DealRecord, ResultBatch};
use std::fmt::Write as _;
use std::path::PathBuf;

const BRANDS: [&str; 10] = [
    "Milwaukee",
    "DeWalt",
    "Makita",
    "Bosch",
    "Ryobi",
    "Anker",
    "Sony",
    "Dyson",
    "KitchenAid",
    "Weber",
];

const CATEGORIES: [&str; 4] = ["Tools", "Electronics", "Kitchen", "Outdoor"];

const PRODUCTS: [&str; 12] = [
    "Hammer Drill",
    "Impact Driver",
    "Circular Saw",
    "Orbital Sander",
    "Noise Cancelling Headphones",
    "Portable Speaker",
    "Stand Mixer",
    "Espresso Machine",
    "Cordless Vacuum",
    "Pellet Grill",
    "Router Table",
    "Laser Level",
];

struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Deterministic deal generator. The same seed always produces the same
/// sequence, so fixtures are reproducible across test runs.
pub struct DealFaker {
    rng: DeterministicRng,
    serial: usize,
}

impl DealFaker {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: DeterministicRng::new(if seed == 0 { 1 } else { seed }),
            serial: 0,
        }
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    /// One deal with every canonical field populated. Profitability is
    /// steered by `roi`, expressed as a fraction.
    pub fn deal(&mut self, roi: f64) -> DealRecord {
        self.serial += 1;
        let brand = self.pick(&BRANDS);
        let product = self.pick(&PRODUCTS);
        let category = self.pick(&CATEGORIES);
        let buy = 20.0 + self.rng.int_n(180) as f64;
        let sell = buy * (1.0 + roi);
        let comps = 3 + self.rng.int_n(40);
        let slug = format!("{}-{}", product.to_lowercase().replace(' ', "-"), self.serial);
        DealRecord::from_keyed(vec![
            ("title".to_owned(), format!("{brand} {product}")),
            ("brand".to_owned(), brand.to_owned()),
            ("category".to_owned(), category.to_owned()),
            ("woot_price".to_owned(), format!("{buy:.2}")),
            ("ebay_price".to_owned(), format!("{sell:.2}")),
            ("net_profit".to_owned(), format!("{:.2}", sell - buy)),
            ("roi".to_owned(), format!("{roi:.2}")),
            ("sold_comps".to_owned(), comps.to_string()),
            ("woot_url".to_owned(), format!("https://www.woot.com/offers/{slug}")),
            (
                "ebay_url".to_owned(),
                format!("https://www.ebay.com/sch/i.html?_nkw={slug}"),
            ),
        ])
    }

    pub fn passed_deal(&mut self) -> DealRecord {
        let roi = 0.3 + self.rng.int_n(50) as f64 / 100.0;
        self.deal(roi)
    }

    pub fn nearmiss_deal(&mut self) -> DealRecord {
        let roi = 0.15 + self.rng.int_n(10) as f64 / 100.0;
        self.deal(roi)
    }

    pub fn dud_deal(&mut self) -> DealRecord {
        let roi = -0.2 + self.rng.int_n(25) as f64 / 100.0;
        self.deal(roi)
    }
}

/// A full three-set batch the way a finished scan produces one: the all set
/// contains every record, passed and near-miss are disjoint subsets.
pub fn sample_batch(seed: u64) -> ResultBatch {
    let mut faker = DealFaker::new(seed);
    let passed: Vec<DealRecord> = (0..4).map(|_| faker.passed_deal()).collect();
    let nearmiss: Vec<DealRecord> = (0..3).map(|_| faker.nearmiss_deal()).collect();
    let duds: Vec<DealRecord> = (0..5).map(|_| faker.dud_deal()).collect();

    let mut all = passed.clone();
    all.extend(nearmiss.iter().cloned());
    all.extend(duds);
    ResultBatch {
        passed,
        nearmiss,
        all,
        source: Some("sample data".to_owned()),
    }
}

/// CSV text in the shape report files actually use, including aliased
/// column names the resolver has to map.
pub fn sample_csv(seed: u64, rows: usize) -> String {
    let mut faker = DealFaker::new(seed);
    let mut out = String::from("Product,Brand,Category,Woot_Price,eBay_Price,Net_Profit,ROI,Sold_Comps,Woot_URL\n");
    for _ in 0..rows {
        let deal = faker.passed_deal();
        let field = |value: &Option<String>| value.clone().unwrap_or_default();
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{}",
            field(&deal.title),
            field(&deal.brand),
            field(&deal.category),
            field(&deal.buy_price),
            field(&deal.sell_price),
            field(&deal.profit),
            field(&deal.roi),
            field(&deal.sold_comps),
            field(&deal.url_source),
        );
    }
    out
}

/// Writes a sample report into a fresh temp dir. The dir guard must stay
/// alive as long as the path is in use.
pub fn temp_report(seed: u64, rows: usize) -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("report_passed.csv");
    std::fs::write(&path, sample_csv(seed, rows)).context("write sample report")?;
    Ok((dir, path))
}
