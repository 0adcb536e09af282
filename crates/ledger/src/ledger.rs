use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use home_inventory_shared::{
    Clock, Error, IdKind, IdProvider, IdempotencyStore, InventoryEventType, ItemCategory,
    ReceiptItemInput, Result, Unit, new_id,
};
use tokio::sync::Mutex;
use tracing::debug;

use crate::expiry::estimate_lot_expiry;
use crate::model::{InventoryEvent, InventoryLot};
use crate::requests::{
    AddManualItemsRequest, ManualEntryOutcome, OverrideLotExpiryRequest, ReviewMode,
    ReviewOutcome, ReviewReceiptRequest,
};

const RECEIPT_REVIEW_SCOPE: &str = "receipt_review";
const MANUAL_ENTRY_SCOPE: &str = "manual_entry";

/// A line to deplete from the ledger FEFO-style, used by the check-in
/// engine for both consumed and wasted quantities.
#[derive(Debug, Clone)]
pub struct DepletionLine {
    pub item_key: String,
    pub unit: Unit,
    pub quantity: f64,
}

#[derive(Debug, Clone, Default)]
pub struct DepletionResult {
    pub events: Vec<InventoryEvent>,
    /// Quantity that could not be depleted because stock ran out.
    pub shortfall: f64,
}

type ClusterKey = (String, Unit, ItemCategory);

struct HouseholdLedger {
    lots: HashMap<String, InventoryLot>,
    events: Vec<InventoryEvent>,
    /// Tracks the single lot each receipt-intake cluster merges into, kept
    /// separate from manually-added lots so a cluster can hold the one
    /// receipt lot plus any number of distinct manual lots: a cluster may
    /// hold multiple lots when `purchasedAt` differs.
    receipt_cluster_index: HashMap<ClusterKey, String>,
    /// Items most recently applied for a given receipt upload, used to
    /// compute `reviewReceipt(mode=overwrite)` deltas.
    receipt_items_cache: HashMap<String, Vec<ReceiptItemInput>>,
    price_history: HashMap<String, Vec<(DateTime<Utc>, f64)>>,
    review_idempotency: IdempotencyStore<ReviewOutcome>,
    manual_idempotency: IdempotencyStore<ManualEntryOutcome>,
}

impl HouseholdLedger {
    fn new() -> Self {
        Self {
            lots: HashMap::new(),
            events: Vec::new(),
            receipt_cluster_index: HashMap::new(),
            receipt_items_cache: HashMap::new(),
            price_history: HashMap::new(),
            review_idempotency: IdempotencyStore::new(),
            manual_idempotency: IdempotencyStore::new(),
        }
    }
}

/// Per-household lot/event ledger. One coarse lock per household,
/// acquired for the entirety of each public operation.
pub struct Ledger {
    households: Mutex<HashMap<String, Arc<Mutex<HouseholdLedger>>>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdProvider>,
}

impl Ledger {
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdProvider>) -> Self {
        Self {
            households: Mutex::new(HashMap::new()),
            clock,
            ids,
        }
    }

    async fn household(&self, household_id: &str) -> Arc<Mutex<HouseholdLedger>> {
        let mut map = self.households.lock().await;
        map.entry(household_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(HouseholdLedger::new())))
            .clone()
    }

    fn record_price(
        state: &mut HouseholdLedger,
        item_key: &str,
        at: DateTime<Utc>,
        unit_price: Option<f64>,
    ) {
        if let Some(price) = unit_price {
            state
                .price_history
                .entry(item_key.to_string())
                .or_default()
                .push((at, price));
        }
    }

    fn emit_event(
        &self,
        state: &mut HouseholdLedger,
        household_id: &str,
        lot_id: &str,
        event_type: InventoryEventType,
        quantity: f64,
        unit: Unit,
        source: &str,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> InventoryEvent {
        let event = InventoryEvent {
            event_id: new_id(IdKind::Event, &self.ids.token()),
            household_id: household_id.to_string(),
            lot_id: lot_id.to_string(),
            event_type,
            quantity,
            unit,
            source: source.to_string(),
            reason,
            created_at: now,
        };
        state.events.push(event.clone());
        event
    }

    /// `receipt_upload_id` is used only to seed the review-delta cache
    /// for a later `reviewReceipt` call.
    pub async fn apply_receipt(
        &self,
        household_id: &str,
        receipt_upload_id: &str,
        items: &[ReceiptItemInput],
        purchased_at: Option<DateTime<Utc>>,
        source: &str,
    ) -> Result<Vec<InventoryEvent>> {
        let handle = self.household(household_id).await;
        let mut state = handle.lock().await;
        let now = self.clock.now();

        let mut events = Vec::with_capacity(items.len());
        for item in items {
            let reason = format!("receipt item: {}", item.raw_name);
            let event = self.merge_into_receipt_cluster(
                &mut state,
                household_id,
                item,
                purchased_at,
                source,
                &reason,
                now,
            );
            events.push(event);
            Self::record_price(&mut state, &item.item_key, now, item.unit_price);
        }
        state
            .receipt_items_cache
            .insert(receipt_upload_id.to_string(), items.to_vec());

        debug!(household_id, receipt_upload_id, count = events.len(), "applied receipt items");
        Ok(events)
    }

    #[allow(clippy::too_many_arguments)]
    fn merge_into_receipt_cluster(
        &self,
        state: &mut HouseholdLedger,
        household_id: &str,
        item: &ReceiptItemInput,
        purchased_at: Option<DateTime<Utc>>,
        source: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> InventoryEvent {
        let key = (item.item_key.clone(), item.unit, item.category);
        let lot_id = state.receipt_cluster_index.get(&key).cloned();

        let lot_id = match lot_id {
            Some(id) if state.lots.contains_key(&id) => {
                let lot = state.lots.get_mut(&id).unwrap();
                lot.quantity_remaining += item.quantity;
                lot.item_name = item.normalized_name.clone();
                if let Some(p) = purchased_at {
                    lot.purchased_at = Some(p);
                }
                lot.updated_at = now;
                id
            }
            _ => {
                let estimate = estimate_lot_expiry(item.category, purchased_at, now);
                let new_lot_id = new_id(IdKind::Lot, &self.ids.token());
                let lot = InventoryLot {
                    lot_id: new_lot_id.clone(),
                    household_id: household_id.to_string(),
                    item_key: item.item_key.clone(),
                    item_name: item.normalized_name.clone(),
                    quantity_remaining: item.quantity,
                    unit: item.unit,
                    category: item.category,
                    purchased_at,
                    expires_at: Some(estimate.expires_at),
                    expiry_estimated_at: Some(estimate.expiry_estimated_at),
                    expiry_source: Some(estimate.expiry_source),
                    expiry_confidence: Some(estimate.expiry_confidence),
                    created_at: now,
                    updated_at: now,
                };
                state.lots.insert(new_lot_id.clone(), lot);
                state.receipt_cluster_index.insert(key, new_lot_id.clone());
                new_lot_id
            }
        };

        self.emit_event(
            state,
            household_id,
            &lot_id,
            InventoryEventType::Add,
            item.quantity,
            item.unit,
            source,
            Some(reason.to_string()),
            now,
        )
    }

    /// The `overwrite` mode expresses the correction as paired
    /// `consume`/`add` events: the net per-cluster delta between the
    /// prior and new item lists determines one `add` (positive delta) or
    /// one `consume` (negative delta, clamped at the cluster lot's
    /// remaining quantity) event.
    pub async fn review_receipt(
        &self,
        household_id: &str,
        receipt_upload_id: &str,
        req: ReviewReceiptRequest,
    ) -> Result<ReviewOutcome> {
        let handle = self.household(household_id).await;
        let mut state = handle.lock().await;

        if let Some(key) = &req.idempotency_key {
            if let Some(cached) = state.review_idempotency.get(RECEIPT_REVIEW_SCOPE, key) {
                return Ok(cached);
            }
        }

        let now = self.clock.now();
        let prior_items = state
            .receipt_items_cache
            .get(receipt_upload_id)
            .cloned()
            .unwrap_or_default();

        let outcome = match req.mode {
            ReviewMode::Append => {
                let mut events_created = 0;
                for item in &req.items {
                    let reason = format!("receipt review: added {}", item.raw_name);
                    self.merge_into_receipt_cluster(
                        &mut state,
                        household_id,
                        item,
                        None,
                        "receipt_review",
                        &reason,
                        now,
                    );
                    Self::record_price(&mut state, &item.item_key, now, item.unit_price);
                    events_created += 1;
                }
                let mut merged = prior_items;
                merged.extend(req.items.clone());
                state
                    .receipt_items_cache
                    .insert(receipt_upload_id.to_string(), merged);
                ReviewOutcome {
                    applied: true,
                    events_created,
                }
            }
            ReviewMode::Overwrite => {
                let old_totals = cluster_totals(&prior_items);
                let new_totals = cluster_totals(&req.items);
                let mut events_created = 0;

                let mut keys: Vec<ClusterKey> = old_totals.keys().cloned().collect();
                for k in new_totals.keys() {
                    if !keys.contains(k) {
                        keys.push(k.clone());
                    }
                }

                for key in keys {
                    let old_qty = old_totals.get(&key).copied().unwrap_or(0.0);
                    let new_qty = new_totals.get(&key).copied().unwrap_or(0.0);
                    let delta = new_qty - old_qty;
                    if delta.abs() < f64::EPSILON {
                        continue;
                    }

                    let lot_id = state.receipt_cluster_index.get(&key).cloned();
                    if delta > 0.0 {
                        let item_name = req
                            .items
                            .iter()
                            .find(|i| (i.item_key.clone(), i.unit, i.category) == key)
                            .map(|i| i.normalized_name.clone())
                            .unwrap_or_else(|| key.0.clone());
                        let lot_id = match lot_id {
                            Some(id) if state.lots.contains_key(&id) => {
                                let lot = state.lots.get_mut(&id).unwrap();
                                lot.quantity_remaining += delta;
                                lot.item_name = item_name;
                                lot.updated_at = now;
                                id
                            }
                            _ => {
                                let estimate = estimate_lot_expiry(key.2, None, now);
                                let new_lot_id = new_id(IdKind::Lot, &self.ids.token());
                                let lot = InventoryLot {
                                    lot_id: new_lot_id.clone(),
                                    household_id: household_id.to_string(),
                                    item_key: key.0.clone(),
                                    item_name,
                                    quantity_remaining: delta,
                                    unit: key.1,
                                    category: key.2,
                                    purchased_at: None,
                                    expires_at: Some(estimate.expires_at),
                                    expiry_estimated_at: Some(estimate.expiry_estimated_at),
                                    expiry_source: Some(estimate.expiry_source),
                                    expiry_confidence: Some(estimate.expiry_confidence),
                                    created_at: now,
                                    updated_at: now,
                                };
                                state.lots.insert(new_lot_id.clone(), lot);
                                state
                                    .receipt_cluster_index
                                    .insert(key.clone(), new_lot_id.clone());
                                new_lot_id
                            }
                        };
                        self.emit_event(
                            &mut state,
                            household_id,
                            &lot_id,
                            InventoryEventType::Add,
                            delta,
                            key.1,
                            "receipt_review",
                            Some(format!("receipt review: increased {}", key.0)),
                            now,
                        );
                    } else if let Some(id) = lot_id {
                        if let Some(lot) = state.lots.get_mut(&id) {
                            let take = (-delta).min(lot.quantity_remaining);
                            lot.quantity_remaining -= take;
                            lot.updated_at = now;
                            self.emit_event(
                                &mut state,
                                household_id,
                                &id,
                                InventoryEventType::Consume,
                                take,
                                key.1,
                                "receipt_review",
                                Some(format!("receipt review: decreased {}", key.0)),
                                now,
                            );
                        }
                    }
                    events_created += 1;
                }

                state
                    .receipt_items_cache
                    .insert(receipt_upload_id.to_string(), req.items.clone());
                ReviewOutcome {
                    applied: true,
                    events_created,
                }
            }
        };

        if let Some(key) = &req.idempotency_key {
            state
                .review_idempotency
                .put(RECEIPT_REVIEW_SCOPE, key, outcome.clone());
        }
        Ok(outcome)
    }

    /// Always creates a new lot per item, with no cluster merging, so
    /// distinct purchase dates stay distinct lots for FEFO.
    pub async fn add_manual_items(
        &self,
        household_id: &str,
        req: AddManualItemsRequest,
    ) -> Result<ManualEntryOutcome> {
        let handle = self.household(household_id).await;
        let mut state = handle.lock().await;

        if let Some(key) = &req.idempotency_key {
            if let Some(cached) = state.manual_idempotency.get(MANUAL_ENTRY_SCOPE, key) {
                return Ok(cached);
            }
        }

        if req.items.is_empty() {
            return Err(Error::InvalidRequest(
                "addManualItems requires at least one item".to_string(),
            ));
        }

        let now = self.clock.now();
        let mut lot_ids = Vec::with_capacity(req.items.len());
        for item in &req.items {
            let estimate = estimate_lot_expiry(item.category, req.purchased_at, now);
            let lot_id = new_id(IdKind::Lot, &self.ids.token());
            let lot = InventoryLot {
                lot_id: lot_id.clone(),
                household_id: household_id.to_string(),
                item_key: item.item_key.clone(),
                item_name: item.normalized_name.clone(),
                quantity_remaining: item.quantity,
                unit: item.unit,
                category: item.category,
                purchased_at: req.purchased_at,
                expires_at: Some(estimate.expires_at),
                expiry_estimated_at: Some(estimate.expiry_estimated_at),
                expiry_source: Some(estimate.expiry_source),
                expiry_confidence: Some(estimate.expiry_confidence),
                created_at: now,
                updated_at: now,
            };
            state.lots.insert(lot_id.clone(), lot);

            let reason = req
                .notes
                .clone()
                .unwrap_or_else(|| format!("manual item: {}", item.raw_name));
            self.emit_event(
                &mut state,
                household_id,
                &lot_id,
                InventoryEventType::Add,
                item.quantity,
                item.unit,
                "manual",
                Some(reason),
                now,
            );
            lot_ids.push(lot_id);
        }

        let outcome = ManualEntryOutcome {
            applied: true,
            lot_ids,
        };
        if let Some(key) = &req.idempotency_key {
            state
                .manual_idempotency
                .put(MANUAL_ENTRY_SCOPE, key, outcome.clone());
        }
        Ok(outcome)
    }

    /// No inventory event: expiry metadata isn't a quantity movement.
    pub async fn override_lot_expiry(
        &self,
        household_id: &str,
        lot_id: &str,
        req: OverrideLotExpiryRequest,
    ) -> Result<InventoryLot> {
        let handle = self.household(household_id).await;
        let mut state = handle.lock().await;
        let now = self.clock.now();

        let lot = state
            .lots
            .get_mut(lot_id)
            .ok_or_else(|| Error::NotFound(format!("lot {lot_id}")))?;
        lot.expires_at = Some(req.expires_at);
        lot.expiry_source = Some(home_inventory_shared::ExpirySource::Exact);
        lot.expiry_confidence = Some(1.0);
        lot.updated_at = now;
        Ok(lot.clone())
    }

    /// Used by the check-in engine for both consumed and wasted
    /// quantities; category is ignored for candidate selection to
    /// tolerate planner recommendations that omit it.
    pub async fn deplete_fefo(
        &self,
        household_id: &str,
        line: DepletionLine,
        event_type: InventoryEventType,
        source: &str,
        reason: &str,
    ) -> Result<DepletionResult> {
        let handle = self.household(household_id).await;
        let mut state = handle.lock().await;
        let now = self.clock.now();

        let mut candidates: Vec<String> = state
            .lots
            .values()
            .filter(|l| {
                l.item_key == line.item_key && l.unit == line.unit && l.quantity_remaining > 0.0
            })
            .map(|l| l.lot_id.clone())
            .collect();

        candidates.sort_by(|a, b| {
            let la = &state.lots[a];
            let lb = &state.lots[b];
            let exp_a = la.expires_at.unwrap_or(DateTime::<Utc>::MAX_UTC);
            let exp_b = lb.expires_at.unwrap_or(DateTime::<Utc>::MAX_UTC);
            exp_a
                .cmp(&exp_b)
                .then_with(|| {
                    let pa = la.purchased_at.unwrap_or(DateTime::<Utc>::MAX_UTC);
                    let pb = lb.purchased_at.unwrap_or(DateTime::<Utc>::MAX_UTC);
                    pa.cmp(&pb)
                })
                .then_with(|| la.created_at.cmp(&lb.created_at))
        });

        let mut remaining = line.quantity;
        let mut events = Vec::new();
        let mut last_lot_id: Option<String> = None;

        for lot_id in candidates {
            if remaining <= 0.0 {
                break;
            }
            let lot = state.lots.get_mut(&lot_id).unwrap();
            let take = lot.quantity_remaining.min(remaining);
            if take <= 0.0 {
                continue;
            }
            lot.quantity_remaining -= take;
            lot.updated_at = now;
            let zeroed = lot.quantity_remaining <= f64::EPSILON;
            remaining -= take;
            last_lot_id = Some(lot_id.clone());

            let event = self.emit_event(
                &mut state,
                household_id,
                &lot_id,
                event_type,
                take,
                line.unit,
                source,
                Some(reason.to_string()),
                now,
            );
            events.push(event);

            if zeroed {
                state.lots.remove(&lot_id);
            }
        }

        let shortfall = remaining.max(0.0);
        if shortfall > 0.0 {
            if let Some(lot_id) = last_lot_id {
                let event = self.emit_event(
                    &mut state,
                    household_id,
                    &lot_id,
                    event_type,
                    shortfall,
                    line.unit,
                    source,
                    Some(format!("{reason} (stock exhausted)")),
                    now,
                );
                events.push(event);
            }
        }

        Ok(DepletionResult { events, shortfall })
    }

    pub async fn list_lots(&self, household_id: &str) -> Vec<InventoryLot> {
        let handle = self.household(household_id).await;
        let state = handle.lock().await;
        state.lots.values().cloned().collect()
    }

    pub async fn get_lot(&self, household_id: &str, lot_id: &str) -> Result<InventoryLot> {
        let handle = self.household(household_id).await;
        let state = handle.lock().await;
        state
            .lots
            .get(lot_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("lot {lot_id}")))
    }

    pub async fn list_events(&self, household_id: &str) -> Vec<InventoryEvent> {
        let handle = self.household(household_id).await;
        let state = handle.lock().await;
        state.events.clone()
    }

    pub async fn price_series(&self, household_id: &str, item_key: &str) -> Vec<(DateTime<Utc>, f64)> {
        let handle = self.household(household_id).await;
        let state = handle.lock().await;
        state
            .price_history
            .get(item_key)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use home_inventory_shared::test_support::{FixedClock, SequentialIds};
    use home_inventory_shared::{ItemCategory, Unit};

    fn ledger() -> Ledger {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new("2026-02-08T12:00:00Z".parse().unwrap()));
        let ids: Arc<dyn IdProvider> = Arc::new(SequentialIds::new());
        Ledger::new(clock, ids)
    }

    fn manual_item(item_key: &str, quantity: f64) -> ReceiptItemInput {
        ReceiptItemInput {
            item_key: item_key.to_string(),
            raw_name: item_key.to_string(),
            normalized_name: item_key.to_string(),
            quantity,
            unit: Unit::Count,
            category: ItemCategory::Produce,
            unit_price: None,
        }
    }

    /// Given two same-item lots with different expiries, consumption
    /// depletes the earlier-expiring lot first.
    #[tokio::test]
    async fn fefo_depletes_earlier_expiring_lot_first() {
        let ledger = ledger();
        let household = "house_fefo";

        let older = ledger
            .add_manual_items(
                household,
                AddManualItemsRequest {
                    items: vec![manual_item("tomato", 4.0)],
                    purchased_at: Some("2026-02-01T00:00:00Z".parse().unwrap()),
                    notes: None,
                    idempotency_key: None,
                },
            )
            .await
            .unwrap();
        let newer = ledger
            .add_manual_items(
                household,
                AddManualItemsRequest {
                    items: vec![manual_item("tomato", 4.0)],
                    purchased_at: Some("2026-02-05T00:00:00Z".parse().unwrap()),
                    notes: None,
                    idempotency_key: None,
                },
            )
            .await
            .unwrap();

        let older_lot_id = &older.lot_ids[0];
        let newer_lot_id = &newer.lot_ids[0];
        ledger
            .override_lot_expiry(
                household,
                older_lot_id,
                OverrideLotExpiryRequest {
                    expires_at: "2026-02-10T00:00:00Z".parse().unwrap(),
                    notes: None,
                },
            )
            .await
            .unwrap();
        ledger
            .override_lot_expiry(
                household,
                newer_lot_id,
                OverrideLotExpiryRequest {
                    expires_at: "2026-02-20T00:00:00Z".parse().unwrap(),
                    notes: None,
                },
            )
            .await
            .unwrap();

        let result = ledger
            .deplete_fefo(
                household,
                DepletionLine {
                    item_key: "tomato".to_string(),
                    unit: Unit::Count,
                    quantity: 3.0,
                },
                InventoryEventType::Consume,
                "checkin",
                "dinner",
            )
            .await
            .unwrap();

        assert_eq!(result.events.len(), 2);
        assert_eq!(result.shortfall, 0.0);
        assert!(ledger.get_lot(household, older_lot_id).await.is_err());
        let remaining = ledger.get_lot(household, newer_lot_id).await.unwrap();
        assert_eq!(remaining.quantity_remaining, 1.0);
    }

    /// A repeated `idempotencyKey` on `addManualItems` is a no-op replay
    /// of the first call's outcome.
    #[tokio::test]
    async fn manual_items_idempotency_key_prevents_double_apply() {
        let ledger = ledger();
        let household = "house_manual";
        let req = AddManualItemsRequest {
            items: vec![manual_item("paper_towel", 2.0)],
            purchased_at: None,
            notes: None,
            idempotency_key: Some("manual-main-1".to_string()),
        };

        let first = ledger.add_manual_items(household, req.clone()).await.unwrap();
        assert!(first.applied);
        let second = ledger.add_manual_items(household, req).await.unwrap();
        assert_eq!(second.lot_ids, first.lot_ids);

        let lots = ledger.list_lots(household).await;
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].quantity_remaining, 2.0);
    }
}

fn cluster_totals(items: &[ReceiptItemInput]) -> HashMap<ClusterKey, f64> {
    let mut totals = HashMap::new();
    for item in items {
        *totals
            .entry((item.item_key.clone(), item.unit, item.category))
            .or_insert(0.0) += item.quantity;
    }
    totals
}
