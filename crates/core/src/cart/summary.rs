//! Order summary and the cart page projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::line_item::CartLine;
use crate::catalog::Product;
use crate::types::{Price, ProductId};

/// Default subtotal at which shipping becomes free.
pub const DEFAULT_FREE_SHIPPING_THRESHOLD: i64 = 3000;

/// Default flat shipping fee below the threshold.
pub const DEFAULT_SHIPPING_FEE: i64 = 300;

/// Flat-rate shipping with a free-shipping threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingPolicy {
    pub free_threshold: Price,
    pub flat_fee: Price,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            free_threshold: Price::from_units(DEFAULT_FREE_SHIPPING_THRESHOLD),
            flat_fee: Price::from_units(DEFAULT_SHIPPING_FEE),
        }
    }
}

/// Shipping charged for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shipping {
    Free,
    Flat { fee: Price },
}

impl Shipping {
    /// Amount added to the subtotal.
    #[must_use]
    pub const fn cost(&self) -> Price {
        match self {
            Self::Free => Price::ZERO,
            Self::Flat { fee } => *fee,
        }
    }

    #[must_use]
    pub const fn is_free(&self) -> bool {
        matches!(self, Self::Free)
    }
}

/// Totals shown next to the cart contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    /// Sum of quantities over every stored item.
    pub item_count: u64,
    /// Sum of line totals over items still in the catalog.
    pub subtotal: Price,
    pub shipping: Shipping,
    /// How much more to spend for free shipping, if not reached yet.
    pub remaining_for_free_shipping: Option<Price>,
    pub grand_total: Price,
}

impl OrderSummary {
    #[must_use]
    pub fn compute(item_count: u64, subtotal: Price, policy: &ShippingPolicy) -> Self {
        let (shipping, remaining) = if subtotal >= policy.free_threshold {
            (Shipping::Free, None)
        } else {
            (
                Shipping::Flat {
                    fee: policy.flat_fee,
                },
                Some(policy.free_threshold - subtotal),
            )
        };

        Self {
            item_count,
            subtotal,
            shipping,
            remaining_for_free_shipping: remaining,
            grand_total: subtotal + shipping.cost(),
        }
    }
}

/// One rendered cart row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartPageLine {
    pub id: ProductId,
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
    pub product: Product,
    pub line_total: Price,
}

impl From<CartLine<'_>> for CartPageLine {
    fn from(line: CartLine<'_>) -> Self {
        Self {
            id: line.item.id,
            quantity: line.item.quantity,
            added_at: line.item.added_at,
            product: line.product.clone(),
            line_total: line.line_total,
        }
    }
}

/// Everything needed to render the cart page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartPage {
    pub lines: Vec<CartPageLine>,
    pub summary: OrderSummary,
}

impl CartPage {
    /// Whether there is nothing to show (orphaned items are not shown).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_threshold_charges_flat_fee_and_reports_remaining() {
        let summary =
            OrderSummary::compute(1, Price::from_units(1000), &ShippingPolicy::default());

        assert_eq!(
            summary.shipping,
            Shipping::Flat {
                fee: Price::from_units(300)
            }
        );
        assert_eq!(
            summary.remaining_for_free_shipping,
            Some(Price::from_units(2000))
        );
        assert_eq!(summary.grand_total, Price::from_units(1300));
    }

    #[test]
    fn threshold_is_inclusive() {
        let summary =
            OrderSummary::compute(2, Price::from_units(3000), &ShippingPolicy::default());
        assert!(summary.shipping.is_free());
        assert_eq!(summary.remaining_for_free_shipping, None);
        assert_eq!(summary.grand_total, Price::from_units(3000));
    }

    #[test]
    fn custom_policy_is_respected() {
        let policy = ShippingPolicy {
            free_threshold: Price::from_units(100),
            flat_fee: Price::from_units(15),
        };
        let summary = OrderSummary::compute(1, Price::from_units(40), &policy);
        assert_eq!(summary.grand_total, Price::from_units(55));
        assert_eq!(
            summary.remaining_for_free_shipping,
            Some(Price::from_units(60))
        );
    }

    #[test]
    fn shipping_serializes_with_kind_tag() {
        let json = serde_json::to_value(Shipping::Free).unwrap_or_default();
        assert_eq!(json["kind"], "free");
    }
}
