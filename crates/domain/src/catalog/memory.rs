use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::value_objects::ProductId;

use super::{CatalogError, CatalogReader, Product};

/// Catalog held in memory, seeded at startup.
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let products = products.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self {
            products: Arc::new(RwLock::new(products)),
        }
    }

    /// Parses a JSON array of products.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let products: Vec<Product> = serde_json::from_str(json)?;
        Ok(Self::with_products(products))
    }

    /// Inserts or replaces a product.
    pub async fn upsert(&self, product: Product) {
        self.products
            .write()
            .await
            .insert(product.id.clone(), product);
    }

    pub async fn len(&self) -> usize {
        self.products.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.products.read().await.is_empty()
    }
}

#[async_trait]
impl CatalogReader for InMemoryCatalog {
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, CatalogError> {
        Ok(self.products.read().await.get(id).cloned())
    }

    async fn list_available(&self) -> Result<Vec<Product>, CatalogError> {
        let mut products: Vec<_> = self
            .products
            .read()
            .await
            .values()
            .filter(|p| p.available)
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(products)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::Money;

    #[tokio::test]
    async fn lists_available_products_by_name() {
        let catalog = InMemoryCatalog::with_products([
            Product::new("latte", "Latte", Money::from_minor(45000)),
            Product::new("bagel", "Bagel", Money::from_minor(30000)).unavailable(),
            Product::new("americano", "Americano", Money::from_minor(35000)),
        ]);

        let names: Vec<_> = catalog
            .list_available()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Americano", "Latte"]);
    }

    #[tokio::test]
    async fn upsert_replaces_price() {
        let catalog = InMemoryCatalog::new();
        catalog
            .upsert(Product::new("tea", "Tea", Money::from_minor(100)))
            .await;
        catalog
            .upsert(Product::new("tea", "Tea", Money::from_minor(150)))
            .await;

        let tea = catalog
            .get_product(&ProductId::new("tea"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tea.price, Money::from_minor(150));
        assert_eq!(catalog.len().await, 1);
    }

    #[test]
    fn parses_json_with_defaults() {
        let catalog = InMemoryCatalog::from_json(
            r#"[{"id": "mocha", "name": "Mocha", "price": 52000}]"#,
        )
        .unwrap();
        let products = catalog.products.try_read().unwrap();
        let mocha = &products[&ProductId::new("mocha")];
        assert!(mocha.available);
        assert!(mocha.description.is_none());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            InMemoryCatalog::from_json("{not json"),
            Err(CatalogError::InvalidData(_))
        ));
    }
}
