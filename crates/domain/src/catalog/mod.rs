//! Read-only product catalog.
//!
//! Orders copy name and price from here when they are placed; nothing in the
//! workflow writes back.

mod memory;

pub use memory::InMemoryCatalog;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value_objects::{Money, ProductId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    pub price: Money,

    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl Product {
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Money) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            price,
            available: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Product is not available: {0}")]
    ProductUnavailable(ProductId),

    #[error("Invalid catalog data: {0}")]
    InvalidData(#[from] serde_json::Error),
}

/// Product lookups used when pricing an order.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, CatalogError>;

    /// Products currently offered, sorted by name.
    async fn list_available(&self) -> Result<Vec<Product>, CatalogError>;
}
