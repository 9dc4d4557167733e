//! # Product Catalog
//!
//! The catalog is a fixed seed list held for the process lifetime. Create
//! requests are validated and echoed but never inserted, so every read
//! sees exactly the seed entries.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ValidationError;

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    /// Caller-supplied identifier, unique within the catalog.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Unit price. Must be finite and non-negative.
    pub price: f64,
}

impl Product {
    /// Build a product, enforcing the same rules as [`Product::validate`].
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        price: f64,
    ) -> Result<Self, ValidationError> {
        let product = Self {
            id: id.into(),
            name: name.into(),
            price,
        };
        product.validate()?;
        Ok(product)
    }

    /// Check the business rules serde cannot express.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyField("id"));
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        if !self.price.is_finite() {
            return Err(ValidationError::NonFinitePrice);
        }
        if self.price < 0.0 {
            return Err(ValidationError::NegativePrice(self.price));
        }
        Ok(())
    }
}

/// Read-only product catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    /// The catalog every deployment starts with.
    pub fn seeded() -> Self {
        Self {
            products: vec![
                seed("1", "Laptop", 1200.00),
                seed("2", "Keyboard", 75.00),
                seed("3", "Mouse", 25.00),
            ],
        }
    }

    /// All products in seed order.
    pub fn list(&self) -> &[Product] {
        &self.products
    }

    /// First product whose id matches exactly.
    pub fn find(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::seeded()
    }
}

fn seed(id: &str, name: &str, price: f64) -> Product {
    Product {
        id: id.to_string(),
        name: name.to_string(),
        price,
    }
}
