//! Feature extraction and the price-prediction heuristic
//!
//! The prediction is deliberately simple: a book's expected price is
//! its category's mean price, nudged by how far the rating sits from
//! the middle of the scale. Everything here is a pure function over the
//! loaded snapshot, so the math is testable without a server.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dataset::Snapshot;

#[derive(Debug, Deserialize)]
pub struct PredictionRequestItem {
    pub category: Option<String>,
    pub rating: Option<f64>,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct PredictionResponseItem {
    pub predicted_price: f64,
    pub details: PredictionDetails,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct PredictionDetails {
    pub base: f64,
    pub rating: f64,
    pub category: String,
}

/// One row of model-ready features derived from a record
#[derive(Debug, Serialize)]
pub struct FeatureRow {
    pub id: u32,
    pub title: String,
    /// Numeric price, zero-filled when the raw text does not parse
    pub price_num: f64,
    /// Star rating, zero-filled when absent
    pub rating: u8,
    pub category: Option<String>,
    /// 1 when the availability text says the book is in stock
    pub in_stock: u8,
}

/// Training dataset: explicit column list plus one row per record
#[derive(Debug, Serialize)]
pub struct TrainingData {
    pub columns: Vec<&'static str>,
    pub records: Vec<TrainingRow>,
}

#[derive(Debug, Serialize)]
pub struct TrainingRow {
    pub price_num: Option<f64>,
    pub rating: u8,
    pub category: String,
    pub in_stock: u8,
}

fn in_stock(availability: &str) -> u8 {
    u8::from(availability.to_lowercase().contains("in stock"))
}

pub fn feature_rows(snapshot: &Snapshot) -> Vec<FeatureRow> {
    snapshot
        .books
        .iter()
        .map(|book| FeatureRow {
            id: book.id,
            title: book.title.clone(),
            price_num: book.price_num().unwrap_or(0.0),
            rating: book.rating.unwrap_or(0),
            category: book.category.clone(),
            in_stock: in_stock(&book.availability),
        })
        .collect()
}

pub fn training_data(snapshot: &Snapshot) -> TrainingData {
    TrainingData {
        columns: vec!["price_num", "rating", "category", "in_stock"],
        records: snapshot
            .books
            .iter()
            .map(|book| TrainingRow {
                price_num: book.price_num(),
                rating: book.rating.unwrap_or(0),
                category: book
                    .category
                    .clone()
                    .unwrap_or_else(|| "Unknown".to_string()),
                in_stock: in_stock(&book.availability),
            })
            .collect(),
    }
}

/// Predicts a price for each requested item
///
/// Base is the mean price of the item's category (global mean when the
/// category is unknown), scaled by `1 + (rating - 3) * 0.03`. Results
/// are sanitized against non-finite values and rounded to two decimals.
pub fn predict_prices(
    snapshot: &Snapshot,
    items: &[PredictionRequestItem],
) -> Vec<PredictionResponseItem> {
    let priced: Vec<(Option<&str>, f64)> = snapshot
        .books
        .iter()
        .filter_map(|b| b.price_num().map(|p| (b.category.as_deref(), p)))
        .collect();

    let global_mean = if priced.is_empty() {
        0.0
    } else {
        priced.iter().map(|(_, p)| p).sum::<f64>() / priced.len() as f64
    };
    let global_mean = if global_mean.is_finite() {
        global_mean
    } else {
        0.0
    };

    let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();
    for (category, price) in &priced {
        if let Some(category) = category {
            let entry = sums.entry(category).or_insert((0.0, 0));
            entry.0 += price;
            entry.1 += 1;
        }
    }
    let category_means: HashMap<&str, f64> = sums
        .into_iter()
        .map(|(category, (sum, count))| (category, sum / count as f64))
        .collect();

    items
        .iter()
        .map(|item| {
            let category = item
                .category
                .clone()
                .unwrap_or_else(|| "Unknown".to_string());
            let mut base = category_means
                .get(category.as_str())
                .copied()
                .unwrap_or(global_mean);
            if !base.is_finite() {
                base = global_mean;
            }

            let rating = item.rating.unwrap_or(0.0);
            let mut predicted = base * (1.0 + (rating - 3.0) * 0.03);
            if !predicted.is_finite() {
                predicted = global_mean;
            }

            PredictionResponseItem {
                predicted_price: round2(predicted),
                details: PredictionDetails {
                    base: round2(base),
                    rating,
                    category,
                },
            }
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
