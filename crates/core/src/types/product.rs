//! Product records as served by the storefront backend.
//!
//! Only the fields the stores reason about are typed; everything else the
//! backend sends is kept in `extra` so a denormalized record survives a
//! round trip through the stores untouched.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::cart::DEFAULT_MAX_QUANTITY;
use super::id::{ProductId, VariantId};

/// Text keyed by language code (e.g., `{"en": "Mug", "ar": "كوب"}`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(BTreeMap<String, String>);

impl LocalizedText {
    /// Text for `lang`, falling back to English and then to any translation.
    #[must_use]
    pub fn get(&self, lang: &str) -> Option<&str> {
        self.0
            .get(lang)
            .or_else(|| self.0.get("en"))
            .or_else(|| self.0.values().next())
            .map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LocalizedText {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A purchasable configuration of a product with its own price and stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    /// Variant ID.
    #[serde(rename = "_id", alias = "id")]
    pub id: VariantId,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<LocalizedText>,
    /// List price.
    pub price: Decimal,
    /// Sale price, when the variant is discounted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_price: Option<Decimal>,
    /// Units in stock. `None` when the backend does not track stock.
    #[serde(
        default,
        deserialize_with = "deserialize_stock",
        skip_serializing_if = "Option::is_none"
    )]
    pub in_stock: Option<u32>,
}

impl Variant {
    /// Price charged when the variant is added to a cart.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        self.discount_price.unwrap_or(self.price)
    }

    /// Largest quantity a single cart line may hold.
    #[must_use]
    pub fn max_quantity(&self) -> u32 {
        self.in_stock.unwrap_or(DEFAULT_MAX_QUANTITY)
    }
}

/// Stock arrives either as a count or, from older endpoints, as a flag.
/// `false` means nothing left; `true` means in stock with no count.
fn deserialize_stock<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stock {
        Count(u32),
        Flag(bool),
    }

    Ok(match Option::<Stock>::deserialize(deserializer)? {
        Some(Stock::Count(n)) => Some(n),
        Some(Stock::Flag(false)) => Some(0),
        Some(Stock::Flag(true)) | None => None,
    })
}

/// A full product record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product ID.
    #[serde(rename = "_id", alias = "id")]
    pub id: ProductId,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<LocalizedText>,
    /// Purchasable variants.
    #[serde(default)]
    pub variants: Vec<Variant>,
    /// Remaining fields (images, description, ratings, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Product {
    /// Look up a variant by ID.
    #[must_use]
    pub fn variant(&self, id: &VariantId) -> Option<&Variant> {
        self.variants.iter().find(|v| &v.id == id)
    }

    /// The default variant shown on listing pages.
    #[must_use]
    pub fn first_variant(&self) -> Option<&Variant> {
        self.variants.first()
    }
}

/// A reference to a product that is either a bare ID or a populated record.
///
/// The backend populates product references inconsistently (wishlist entries
/// and cart lines both come in either shape).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductRef {
    /// Bare product ID.
    Id(ProductId),
    /// Populated product record.
    Record(Box<Product>),
}

impl ProductRef {
    /// The referenced product's ID, whichever shape arrived.
    #[must_use]
    pub fn product_id(&self) -> &ProductId {
        match self {
            Self::Id(id) => id,
            Self::Record(product) => &product.id,
        }
    }

    /// The populated record, if any.
    #[must_use]
    pub fn record(&self) -> Option<&Product> {
        match self {
            Self::Id(_) => None,
            Self::Record(product) => Some(product),
        }
    }
}
