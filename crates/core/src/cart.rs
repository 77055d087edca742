//! The session cart: a single shared mutable store with an explicit mutation
//! API and a subscription channel. Constructed once per application lifetime
//! and injected; screens never reach into the line list directly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{watch, RwLock};

use crate::domain::product::ProductId;
use crate::domain::promotion::Promotion;
use crate::pricing;
use crate::selection::LineSelection;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    pub lines: Vec<LineSelection>,
    pub promotion: Option<Promotion>,
    pub total_price: Decimal,
    /// Monotonic mutation counter; checkout uses it to reject stale snapshots.
    pub version: u64,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("cart has no line for product `{0}`")]
    UnknownLine(String),
    #[error("line for product `{0}` has a fixed quantity of 1")]
    FixedQuantityLine(String),
    #[error("promotion `{0}` is not active")]
    InactivePromotion(String),
}

#[derive(Debug, Default)]
struct CartState {
    lines: Vec<LineSelection>,
    promotion: Option<Promotion>,
    version: u64,
}

impl CartState {
    fn snapshot(&self) -> CartSnapshot {
        let subtotal = pricing::subtotal(&self.lines);
        let tax = pricing::tax_total(&self.lines);
        let combined = subtotal + tax;
        // The stored promotion was window-checked when it was applied; the
        // checkout flow re-validates it against the collaborator before any
        // payment session is created.
        let discount = self
            .promotion
            .as_ref()
            .map(|promotion| pricing::percentage_discount(combined, promotion.discount_percentage))
            .unwrap_or(Decimal::ZERO);

        CartSnapshot {
            lines: self.lines.clone(),
            promotion: self.promotion.clone(),
            total_price: combined - discount,
            version: self.version,
        }
    }
}

#[derive(Debug)]
pub struct Cart {
    state: RwLock<CartState>,
    notify: watch::Sender<CartSnapshot>,
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

impl Cart {
    pub fn new() -> Self {
        let (notify, _) = watch::channel(CartSnapshot::default());
        Self { state: RwLock::new(CartState::default()), notify }
    }

    /// Rebuilds a cart from persisted state, e.g. after a page reload. The
    /// promotion is restored as applied; the checkout flow re-validates it
    /// before anything is charged.
    pub fn from_parts(lines: Vec<LineSelection>, promotion: Option<Promotion>) -> Self {
        let state = CartState { lines, promotion, version: 0 };
        let (notify, _) = watch::channel(state.snapshot());
        Self { state: RwLock::new(state), notify }
    }

    pub async fn snapshot(&self) -> CartSnapshot {
        self.state.read().await.snapshot()
    }

    /// Observe every mutation as a fresh snapshot.
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.notify.subscribe()
    }

    /// Inserts the selection, or replaces the existing line for the same
    /// product. Replace, not merge: a new range or platform choice supersedes
    /// the old line wholesale.
    pub async fn add(&self, selection: LineSelection) -> CartSnapshot {
        let mut state = self.state.write().await;
        match state.lines.iter().position(|line| line.product_id == selection.product_id) {
            Some(position) => state.lines[position] = selection,
            None => state.lines.push(selection),
        }
        self.commit(&mut state)
    }

    /// Valid for flat lines only; ranged lines have a fixed quantity of 1.
    pub async fn increase(&self, product_id: &ProductId) -> Result<CartSnapshot, CartError> {
        let mut state = self.state.write().await;
        let line = state
            .lines
            .iter_mut()
            .find(|line| &line.product_id == product_id)
            .ok_or_else(|| CartError::UnknownLine(product_id.0.clone()))?;
        if line.is_ranged() {
            return Err(CartError::FixedQuantityLine(product_id.0.clone()));
        }
        line.quantity = line.quantity.saturating_add(1);
        line.item_qty = i64::from(line.quantity);
        Ok(self.commit(&mut state))
    }

    /// Valid for flat lines only. Decreasing below 1 removes the line.
    pub async fn decrease(&self, product_id: &ProductId) -> Result<CartSnapshot, CartError> {
        let mut state = self.state.write().await;
        let position = state
            .lines
            .iter()
            .position(|line| &line.product_id == product_id)
            .ok_or_else(|| CartError::UnknownLine(product_id.0.clone()))?;
        if state.lines[position].is_ranged() {
            return Err(CartError::FixedQuantityLine(product_id.0.clone()));
        }
        if state.lines[position].quantity <= 1 {
            state.lines.remove(position);
        } else {
            let line = &mut state.lines[position];
            line.quantity -= 1;
            line.item_qty = i64::from(line.quantity);
        }
        Ok(self.commit(&mut state))
    }

    pub async fn remove(&self, product_id: &ProductId) -> Result<CartSnapshot, CartError> {
        let mut state = self.state.write().await;
        let position = state
            .lines
            .iter()
            .position(|line| &line.product_id == product_id)
            .ok_or_else(|| CartError::UnknownLine(product_id.0.clone()))?;
        state.lines.remove(position);
        Ok(self.commit(&mut state))
    }

    /// Empties the cart. Also the fail-safe for a cart line whose product no
    /// longer resolves: checkout empties everything rather than partially
    /// failing.
    pub async fn clear(&self) -> CartSnapshot {
        let mut state = self.state.write().await;
        state.lines.clear();
        state.promotion = None;
        self.commit(&mut state)
    }

    /// Applies a promotion after verifying its window against `now`.
    pub async fn apply_promotion(
        &self,
        promotion: Promotion,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<CartSnapshot, CartError> {
        if !promotion.is_active_at(now) {
            return Err(CartError::InactivePromotion(promotion.code));
        }
        let mut state = self.state.write().await;
        state.promotion = Some(promotion);
        Ok(self.commit(&mut state))
    }

    pub async fn clear_promotion(&self) -> CartSnapshot {
        let mut state = self.state.write().await;
        state.promotion = None;
        self.commit(&mut state)
    }

    fn commit(&self, state: &mut CartState) -> CartSnapshot {
        state.version += 1;
        let snapshot = state.snapshot();
        let _ = self.notify.send(snapshot.clone());
        snapshot
    }
}
