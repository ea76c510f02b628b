//! Product operation inputs.

use common::{Category, Money};
use serde::Deserialize;
use store::Product;

use crate::error::{DomainError, Result};

pub const MAX_NAME_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 2000;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProduct {
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub description: Option<String>,
    pub image_url: String,
    /// Price in cents.
    pub price: i64,
    pub count_in_stock: i64,
}

/// A validated [`CreateProduct`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub category: Category,
    pub description: Option<String>,
    pub image_url: String,
    pub price: Money,
    pub count_in_stock: u32,
}

impl CreateProduct {
    pub fn validate(self) -> Result<NewProduct> {
        Ok(NewProduct {
            name: validate_name(&self.name)?,
            category: self.category,
            description: validate_description(self.description)?,
            image_url: validate_image_url(&self.image_url)?,
            price: validate_price(self.price)?,
            count_in_stock: validate_stock(self.count_in_stock)?,
        })
    }
}

/// Full-record edit. Absent fields keep their current value; an empty
/// description clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProduct {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub price: Option<i64>,
    #[serde(default)]
    pub count_in_stock: Option<i64>,
}

impl UpdateProduct {
    /// Validates every present field, then writes them onto `product`.
    ///
    /// Nothing is written unless all fields are valid.
    pub fn apply_to(&self, product: &mut Product) -> Result<()> {
        let name = self.name.as_deref().map(validate_name).transpose()?;
        let description = self
            .description
            .clone()
            .map(|d| validate_description(Some(d)))
            .transpose()?;
        let image_url = self
            .image_url
            .as_deref()
            .map(validate_image_url)
            .transpose()?;
        let price = self.price.map(validate_price).transpose()?;
        let count_in_stock = self.count_in_stock.map(validate_stock).transpose()?;

        if let Some(name) = name {
            product.name = name;
        }
        if let Some(category) = self.category {
            product.category = category;
        }
        if let Some(description) = description {
            product.description = description;
        }
        if let Some(image_url) = image_url {
            product.image_url = image_url;
        }
        if let Some(price) = price {
            product.price = price;
        }
        if let Some(count_in_stock) = count_in_stock {
            product.count_in_stock = count_in_stock;
        }
        Ok(())
    }
}

/// Body of the dedicated stock-adjustment operation.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStock {
    pub count_in_stock: i64,
}

/// Filters for catalog listings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProducts {
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub name_contains: Option<String>,
    /// Only products created by the caller. Requires authentication.
    #[serde(default)]
    pub mine: bool,
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::invalid(format!(
            "product name must be between 1 and {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

fn validate_description(description: Option<String>) -> Result<Option<String>> {
    match description.map(|d| d.trim().to_string()) {
        Some(d) if d.chars().count() > MAX_DESCRIPTION_LEN => Err(DomainError::invalid(
            format!("description must be at most {MAX_DESCRIPTION_LEN} characters"),
        )),
        Some(d) if d.is_empty() => Ok(None),
        other => Ok(other),
    }
}

fn validate_image_url(url: &str) -> Result<String> {
    let url = url.trim();
    if url.is_empty() {
        return Err(DomainError::invalid("image URL must not be empty"));
    }
    Ok(url.to_string())
}

fn validate_price(cents: i64) -> Result<Money> {
    if cents < 0 {
        return Err(DomainError::invalid("price must not be negative"));
    }
    Ok(Money::from_cents(cents))
}

/// Checks a requested stock level and narrows it to the stored width.
pub fn validate_stock(count: i64) -> Result<u32> {
    if count < 0 {
        return Err(DomainError::invalid(format!(
            "stock count must not be negative (got {count})"
        )));
    }
    u32::try_from(count)
        .map_err(|_| DomainError::invalid(format!("stock count {count} is too large")))
}
