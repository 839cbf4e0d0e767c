//! Catalog products and their cached form

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cart::Money;

/// Catalog product as shown on product pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Product {
    pub fn new(id: impl Into<String>, title: impl Into<String>, price: Money) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            price,
            images: Vec::new(),
            available: true,
            tags: Vec::new(),
        }
    }
}

/// A product in the recently-viewed cache.
///
/// `cached_at` moves on every write, `viewed_at` on every display, so
/// "recently viewed" ordering does not depend on refresh order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedProduct {
    #[serde(flatten)]
    pub product: Product,
    pub cached_at: DateTime<Utc>,
    pub viewed_at: DateTime<Utc>,
}

impl CachedProduct {
    pub fn new(product: Product, now: DateTime<Utc>) -> Self {
        Self {
            product,
            cached_at: now,
            viewed_at: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.product.id
    }
}
