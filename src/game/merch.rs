//! Fan merchandise orders.
//!
//! # Order lifecycle
//! ```text
//! Pending ──mark_paid──▶ Paid ──mark_shipped──▶ Shipped ──mark_delivered──▶ Delivered
//!    │                     │
//!    └──────cancel─────────┴──▶ Cancelled
//! ```

use alloy::primitives::{Address, B256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

use crate::observability::metrics::record_game_event;
use crate::store::{Repository, StoreError};

#[derive(Debug, Error)]
pub enum MerchError {
    #[error("order {0} not found")]
    OrderNotFound(Uuid),

    #[error("order has no items")]
    EmptyOrder,

    #[error("item {0} has zero quantity")]
    InvalidQuantity(String),

    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type MerchResult<T> = Result<T, MerchError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub sku: String,
    pub size: Option<String>,
    pub quantity: u32,
    pub unit_price_cents: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    /// ISO 3166-1 alpha-2.
    pub country: String,
}

/// Order state. Each stage after `Pending` carries the data it introduced;
/// the placement time lives on the order itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid {
        tx_hash: B256,
        paid_at: DateTime<Utc>,
    },
    Shipped {
        carrier: String,
        tracking_number: String,
        shipped_at: DateTime<Utc>,
    },
    Delivered {
        delivered_at: DateTime<Utc>,
    },
    Cancelled {
        reason: String,
        cancelled_at: DateTime<Utc>,
    },
}

impl OrderStatus {
    pub fn name(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid { .. } => "paid",
            OrderStatus::Shipped { .. } => "shipped",
            OrderStatus::Delivered { .. } => "delivered",
            OrderStatus::Cancelled { .. } => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub buyer: Address,
    pub items: Vec<OrderItem>,
    pub shipping: ShippingAddress,
    pub placed_at: DateTime<Utc>,
    pub status: OrderStatus,
}

impl Order {
    pub fn total_cents(&self) -> u64 {
        self.items
            .iter()
            .map(|i| i.unit_price_cents.saturating_mul(i.quantity as u64))
            .sum()
    }
}

pub struct MerchStore {
    orders: Arc<dyn Repository<Order>>,
    write_lock: Mutex<()>,
}

impl MerchStore {
    pub fn new(orders: Arc<dyn Repository<Order>>) -> Self {
        Self {
            orders,
            write_lock: Mutex::new(()),
        }
    }

    pub fn place_order(
        &self,
        buyer: Address,
        items: Vec<OrderItem>,
        shipping: ShippingAddress,
    ) -> MerchResult<Order> {
        if items.is_empty() {
            return Err(MerchError::EmptyOrder);
        }
        if let Some(item) = items.iter().find(|i| i.quantity == 0) {
            return Err(MerchError::InvalidQuantity(item.sku.clone()));
        }

        let order = Order {
            id: Uuid::new_v4(),
            buyer,
            items,
            shipping,
            placed_at: Utc::now(),
            status: OrderStatus::Pending,
        };
        self.orders.put(&order.id.to_string(), order.clone())?;

        record_game_event("merch_order_placed");
        tracing::info!(
            order_id = %order.id,
            buyer = %buyer,
            total_cents = order.total_cents(),
            "Merch order placed"
        );
        Ok(order)
    }

    pub fn order(&self, id: Uuid) -> MerchResult<Order> {
        self.orders
            .get(&id.to_string())?
            .ok_or(MerchError::OrderNotFound(id))
    }

    /// Orders placed by `buyer`, oldest first.
    pub fn orders_for(&self, buyer: Address) -> MerchResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .orders
            .values()?
            .into_iter()
            .filter(|o| o.buyer == buyer)
            .collect();
        orders.sort_by_key(|o| o.placed_at);
        Ok(orders)
    }

    /// Apply `next` if `allowed` accepts the current status.
    fn transition(
        &self,
        id: Uuid,
        next: OrderStatus,
        allowed: impl Fn(&OrderStatus) -> bool,
    ) -> MerchResult<Order> {
        let _guard = self.write_lock.lock().expect("merch mutex poisoned");
        let mut order = self.order(id)?;
        if !allowed(&order.status) {
            return Err(MerchError::InvalidTransition {
                from: order.status.name(),
                to: next.name(),
            });
        }

        let from = order.status.name();
        order.status = next;
        self.orders.put(&id.to_string(), order.clone())?;

        record_game_event("merch_order_updated");
        tracing::info!(order_id = %id, from, to = order.status.name(), "Merch order updated");
        Ok(order)
    }

    pub fn mark_paid(&self, id: Uuid, tx_hash: B256) -> MerchResult<Order> {
        let next = OrderStatus::Paid {
            tx_hash,
            paid_at: Utc::now(),
        };
        self.transition(id, next, |s| matches!(s, OrderStatus::Pending))
    }

    pub fn mark_shipped(
        &self,
        id: Uuid,
        carrier: impl Into<String>,
        tracking_number: impl Into<String>,
    ) -> MerchResult<Order> {
        let next = OrderStatus::Shipped {
            carrier: carrier.into(),
            tracking_number: tracking_number.into(),
            shipped_at: Utc::now(),
        };
        self.transition(id, next, |s| matches!(s, OrderStatus::Paid { .. }))
    }

    pub fn mark_delivered(&self, id: Uuid) -> MerchResult<Order> {
        let next = OrderStatus::Delivered {
            delivered_at: Utc::now(),
        };
        self.transition(id, next, |s| matches!(s, OrderStatus::Shipped { .. }))
    }

    /// Cancel a pending or paid order.
    pub fn cancel(&self, id: Uuid, reason: impl Into<String>) -> MerchResult<Order> {
        let next = OrderStatus::Cancelled {
            reason: reason.into(),
            cancelled_at: Utc::now(),
        };
        self.transition(id, next, |s| {
            matches!(s, OrderStatus::Pending | OrderStatus::Paid { .. })
        })
    }
}

impl std::fmt::Debug for MerchStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MerchStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRepository;

    fn store() -> MerchStore {
        MerchStore::new(Arc::new(MemoryRepository::new()))
    }

    fn shipping() -> ShippingAddress {
        ShippingAddress {
            name: "Sam Keeper".into(),
            line1: "1 Stadium Way".into(),
            line2: None,
            city: "Manchester".into(),
            postal_code: "M16 0RA".into(),
            country: "GB".into(),
        }
    }

    fn jersey(quantity: u32) -> OrderItem {
        OrderItem {
            sku: "JERSEY-HOME-26".into(),
            size: Some("L".into()),
            quantity,
            unit_price_cents: 6_500,
        }
    }

    #[test]
    fn test_place_order() {
        let store = store();
        let buyer = Address::repeat_byte(9);
        let order = store.place_order(buyer, vec![jersey(2)], shipping()).unwrap();

        assert_eq!(order.total_cents(), 13_000);
        assert!(matches!(order.status, OrderStatus::Pending));
        assert_eq!(store.orders_for(buyer).unwrap(), vec![order]);

        assert!(matches!(
            store.place_order(buyer, vec![], shipping()),
            Err(MerchError::EmptyOrder)
        ));
        assert!(matches!(
            store.place_order(buyer, vec![jersey(0)], shipping()),
            Err(MerchError::InvalidQuantity(_))
        ));
    }

    #[test]
    fn test_full_lifecycle() {
        let store = store();
        let order = store
            .place_order(Address::repeat_byte(1), vec![jersey(1)], shipping())
            .unwrap();

        let paid = store.mark_paid(order.id, B256::repeat_byte(0xab)).unwrap();
        assert!(matches!(paid.status, OrderStatus::Paid { tx_hash, .. } if tx_hash == B256::repeat_byte(0xab)));

        let shipped = store.mark_shipped(order.id, "DHL", "JD0146").unwrap();
        assert!(matches!(
            &shipped.status,
            OrderStatus::Shipped { carrier, .. } if carrier == "DHL"
        ));

        let delivered = store.mark_delivered(order.id).unwrap();
        assert_eq!(delivered.status.name(), "delivered");
        assert_eq!(delivered.placed_at, order.placed_at);
        assert_eq!(store.order(order.id).unwrap(), delivered);
    }

    #[test]
    fn test_pending_serializes_without_stage_data() {
        let store = store();
        let order = store
            .place_order(Address::repeat_byte(1), vec![jersey(1)], shipping())
            .unwrap();

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["status"], serde_json::json!({ "status": "pending" }));
        assert!(json["placed_at"].is_string());

        let back: Order = serde_json::from_value(json).unwrap();
        assert_eq!(back, order);
    }

    #[test]
    fn test_invalid_transitions() {
        let store = store();
        let order = store
            .place_order(Address::repeat_byte(1), vec![jersey(1)], shipping())
            .unwrap();

        assert!(matches!(
            store.mark_shipped(order.id, "DHL", "X"),
            Err(MerchError::InvalidTransition { from: "pending", to: "shipped" })
        ));

        store.mark_paid(order.id, B256::ZERO).unwrap();
        store.mark_shipped(order.id, "DHL", "X").unwrap();
        assert!(matches!(
            store.cancel(order.id, "changed my mind"),
            Err(MerchError::InvalidTransition { from: "shipped", to: "cancelled" })
        ));
    }

    #[test]
    fn test_cancel_from_paid() {
        let store = store();
        let order = store
            .place_order(Address::repeat_byte(1), vec![jersey(1)], shipping())
            .unwrap();
        store.mark_paid(order.id, B256::ZERO).unwrap();

        let cancelled = store.cancel(order.id, "out of stock").unwrap();
        assert!(matches!(
            &cancelled.status,
            OrderStatus::Cancelled { reason, .. } if reason == "out of stock"
        ));
        assert!(matches!(
            store.mark_paid(order.id, B256::ZERO),
            Err(MerchError::InvalidTransition { from: "cancelled", .. })
        ));
    }

    #[test]
    fn test_unknown_order() {
        let store = store();
        assert!(matches!(
            store.mark_delivered(Uuid::new_v4()),
            Err(MerchError::OrderNotFound(_))
        ));
    }
}
