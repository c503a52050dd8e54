//! Type-safe price representation using decimal arithmetic.
//!
//! Cart totals follow the storefront's checkout summary: a subtotal over all
//! line items, a percentage discount, and a flat delivery fee.

use std::ops::{Add, Mul};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Format for display (e.g., "320.00 USD").
    #[must_use]
    pub fn display(&self) -> String {
        format!("{:.2} {}", self.amount, self.currency_code.code())
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        debug_assert_eq!(self.currency_code, rhs.currency_code);
        Self::new(self.amount + rhs.amount, self.currency_code)
    }
}

impl Mul<u32> for Price {
    type Output = Self;

    fn mul(self, quantity: u32) -> Self {
        Self::new(self.amount * Decimal::from(quantity), self.currency_code)
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    EGP,
    SAR,
}

impl CurrencyCode {
    /// The three-letter code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::EGP => "EGP",
            Self::SAR => "SAR",
        }
    }
}

/// Pricing rules applied on top of the line-item subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingRules {
    /// Fraction of the subtotal taken off (e.g., `0.10` for 10%).
    pub discount_rate: Decimal,
    /// Flat fee added to every non-empty cart.
    pub delivery_fee: Decimal,
    /// Currency the totals are reported in.
    pub currency_code: CurrencyCode,
}

impl Default for PricingRules {
    fn default() -> Self {
        Self {
            discount_rate: Decimal::new(10, 2),
            delivery_fee: Decimal::from(50),
            currency_code: CurrencyCode::USD,
        }
    }
}

/// Computed order summary for a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSummary {
    /// Sum of `unit_price_at_addition * quantity` over all lines.
    pub subtotal: Price,
    /// Discount taken off the subtotal.
    pub discount: Price,
    /// Delivery fee (zero for an empty cart).
    pub delivery_fee: Price,
    /// `subtotal - discount + delivery_fee`.
    pub total: Price,
}

impl CartSummary {
    /// Build a summary from a subtotal.
    ///
    /// The discount is rounded to cents. An empty cart (zero subtotal and no
    /// lines) carries no delivery fee.
    #[must_use]
    pub fn from_subtotal(subtotal: Decimal, is_empty: bool, rules: &PricingRules) -> Self {
        let currency = rules.currency_code;
        let discount = (subtotal * rules.discount_rate).round_dp(2);
        let delivery_fee = if is_empty {
            Decimal::ZERO
        } else {
            rules.delivery_fee
        };
        let total = subtotal - discount + delivery_fee;

        Self {
            subtotal: Price::new(subtotal, currency),
            discount: Price::new(discount, currency),
            delivery_fee: Price::new(delivery_fee, currency),
            total: Price::new(total, currency),
        }
    }
}
