use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use home_inventory_ledger::Ledger;
use home_inventory_planner::WeeklyRun;
use home_inventory_shared::{
    Clock, Error, IdKind, IdProvider, IdempotencyStore, Result, ShoppingDraftItemStatus,
    ShoppingDraftStatus, new_id,
};
use tokio::sync::Mutex;
use tracing::debug;

use crate::model::{PatchOutcome, ShoppingDraft, ShoppingDraftItem};
use crate::pricing::compute_price_intelligence;
use crate::requests::{GenerateShoppingDraftRequest, PatchShoppingDraftItemsRequest};

const SHOPPING_PATCH_SCOPE: &str = "shopping_patch";

struct HouseholdState {
    drafts: HashMap<String, ShoppingDraft>,
    /// Current non-finalized draft id per `weekOf`. At most one
    /// non-finalized draft exists per `(householdId, weekOf)`.
    active_by_week: HashMap<NaiveDate, String>,
    latest_draft_id: Option<String>,
    patch_idempotency: IdempotencyStore<PatchOutcome>,
}

impl HouseholdState {
    fn new() -> Self {
        Self {
            drafts: HashMap::new(),
            active_by_week: HashMap::new(),
            latest_draft_id: None,
            patch_idempotency: IdempotencyStore::new(),
        }
    }
}

/// Shopping draft store: draft generation from a weekly run, price
/// intelligence, and the patch/finalize lifecycle.
pub struct ShoppingStore {
    households: Mutex<HashMap<String, Arc<Mutex<HouseholdState>>>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdProvider>,
}

impl ShoppingStore {
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdProvider>) -> Self {
        Self {
            households: Mutex::new(HashMap::new()),
            clock,
            ids,
        }
    }

    async fn household(&self, household_id: &str) -> Arc<Mutex<HouseholdState>> {
        let mut map = self.households.lock().await;
        map.entry(household_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(HouseholdState::new())))
            .clone()
    }

    async fn price_for(
        &self,
        ledger: &Ledger,
        household_id: &str,
        item_key: &str,
        as_of: DateTime<Utc>,
    ) -> crate::pricing::PriceIntelligence {
        let series = ledger.price_series(household_id, item_key).await;
        compute_price_intelligence(&series, as_of)
    }

    /// `week_of` defaults to the weekly run's `targetDate` when omitted.
    /// Reuses the same `draftId` in place unless `regenerate=true` or the
    /// current active draft for the week is already finalized, in which
    /// case a new `draftId` is minted.
    pub async fn generate_draft(
        &self,
        ledger: &Ledger,
        household_id: &str,
        weekly_run: &WeeklyRun,
        req: GenerateShoppingDraftRequest,
    ) -> Result<ShoppingDraft> {
        let week_of = req.week_of.unwrap_or(weekly_run.run.target_date);
        let now = self.clock.now();

        let mut items = Vec::with_capacity(weekly_run.items.len());
        for rec in &weekly_run.items {
            let price = self.price_for(ledger, household_id, &rec.item_key, now).await;
            items.push(ShoppingDraftItem {
                draft_item_id: new_id(IdKind::DraftItem, &self.ids.token()),
                item_key: rec.item_key.clone(),
                item_name: rec.item_name.clone(),
                quantity: rec.quantity,
                unit: rec.unit,
                priority: rec.priority,
                item_status: ShoppingDraftItemStatus::Planned,
                price,
            });
        }

        let handle = self.household(household_id).await;
        let mut state = handle.lock().await;

        let active_id = state.active_by_week.get(&week_of).cloned();
        let reuse_id = match &active_id {
            Some(id) => match state.drafts.get(id) {
                Some(existing)
                    if existing.status == ShoppingDraftStatus::Draft
                        && !req.regenerate.unwrap_or(false) =>
                {
                    Some(id.clone())
                }
                _ => None,
            },
            None => None,
        };

        let draft_id = reuse_id.unwrap_or_else(|| new_id(IdKind::Draft, &self.ids.token()));
        let created_at = state
            .drafts
            .get(&draft_id)
            .map(|d| d.created_at)
            .unwrap_or(now);

        let draft = ShoppingDraft {
            draft_id: draft_id.clone(),
            household_id: household_id.to_string(),
            week_of,
            status: ShoppingDraftStatus::Draft,
            source_run_id: weekly_run.run.run_id.clone(),
            items,
            created_at,
            updated_at: now,
            finalized_at: None,
        };

        state.drafts.insert(draft_id.clone(), draft.clone());
        state.active_by_week.insert(week_of, draft_id.clone());
        state.latest_draft_id = Some(draft_id);

        debug!(household_id, week_of = %week_of, draft_id = %draft.draft_id, "generated shopping draft");
        Ok(draft)
    }

    pub async fn latest(&self, household_id: &str) -> Option<ShoppingDraft> {
        let handle = self.household(household_id).await;
        let state = handle.lock().await;
        let id = state.latest_draft_id.as_ref()?;
        state.drafts.get(id).cloned()
    }

    /// Applies status/quantity patches to matching draft items. Finalized
    /// drafts accept the call but never mutate (`updated=false`).
    pub async fn patch_items(
        &self,
        household_id: &str,
        draft_id: &str,
        req: PatchShoppingDraftItemsRequest,
    ) -> Result<PatchOutcome> {
        let handle = self.household(household_id).await;
        let mut state = handle.lock().await;

        if let Some(key) = &req.idempotency_key {
            if let Some(cached) = state.patch_idempotency.get(SHOPPING_PATCH_SCOPE, key) {
                return Ok(cached);
            }
        }

        let now = self.clock.now();
        let draft = state
            .drafts
            .get_mut(draft_id)
            .ok_or_else(|| Error::NotFound(format!("shopping draft {draft_id}")))?;
        if draft.household_id != household_id {
            return Err(Error::HouseholdMismatch);
        }

        let outcome = if draft.status == ShoppingDraftStatus::Finalized {
            PatchOutcome {
                updated: false,
                draft: draft.clone(),
            }
        } else {
            let mut any_changed = false;
            for patch in &req.items {
                if let Some(item) = draft
                    .items
                    .iter_mut()
                    .find(|i| i.draft_item_id == patch.draft_item_id)
                {
                    if let Some(status) = patch.item_status {
                        item.item_status = status;
                        any_changed = true;
                    }
                    if let Some(quantity) = patch.quantity {
                        item.quantity = quantity;
                        any_changed = true;
                    }
                }
            }
            if any_changed {
                draft.updated_at = now;
            }
            PatchOutcome {
                updated: any_changed,
                draft: draft.clone(),
            }
        };

        if let Some(key) = &req.idempotency_key {
            state
                .patch_idempotency
                .put(SHOPPING_PATCH_SCOPE, key, outcome.clone());
        }
        Ok(outcome)
    }

    /// Marks the draft finalized, locking it against further item patches.
    pub async fn finalize(&self, household_id: &str, draft_id: &str) -> Result<ShoppingDraft> {
        let handle = self.household(household_id).await;
        let mut state = handle.lock().await;
        let now = self.clock.now();
        let draft = state
            .drafts
            .get_mut(draft_id)
            .ok_or_else(|| Error::NotFound(format!("shopping draft {draft_id}")))?;
        if draft.household_id != household_id {
            return Err(Error::HouseholdMismatch);
        }
        if draft.status != ShoppingDraftStatus::Finalized {
            draft.status = ShoppingDraftStatus::Finalized;
            draft.finalized_at = Some(now);
            draft.updated_at = now;
        }
        Ok(draft.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use home_inventory_ledger::Ledger;
    use home_inventory_planner::{RecommendationRun, RunType, WeeklyRecommendationItem};
    use home_inventory_shared::test_support::{FixedClock, SequentialIds};
    use home_inventory_shared::{RecommendationPriority, Unit};

    fn store_and_ledger() -> (ShoppingStore, Ledger) {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new("2026-02-08T12:00:00Z".parse().unwrap()));
        let ids: Arc<dyn IdProvider> = Arc::new(SequentialIds::new());
        let ledger = Ledger::new(clock.clone(), Arc::new(SequentialIds::new()));
        (ShoppingStore::new(clock, ids), ledger)
    }

    fn sample_run() -> WeeklyRun {
        WeeklyRun {
            run: RecommendationRun {
                run_id: "run_1".to_string(),
                household_id: "house_shop".to_string(),
                run_type: RunType::Weekly,
                model: "heuristic".to_string(),
                created_at: "2026-02-08T12:00:00Z".parse().unwrap(),
                target_date: NaiveDate::from_ymd_opt(2026, 2, 15).unwrap(),
            },
            items: vec![WeeklyRecommendationItem {
                recommendation_id: "rec_1".to_string(),
                item_key: "tomato".to_string(),
                item_name: "Tomato".to_string(),
                quantity: 4.0,
                unit: Unit::Count,
                priority: RecommendationPriority::High,
                score: 0.9,
            }],
        }
    }

    /// Generates a draft, patches it idempotently, finalizes it, then
    /// confirms post-finalize patches are no-ops.
    #[tokio::test]
    async fn draft_patch_and_finalize_lifecycle() {
        let (store, ledger) = store_and_ledger();
        let run = sample_run();
        let household_id = "house_shop";

        let draft = store
            .generate_draft(
                &ledger,
                household_id,
                &run,
                GenerateShoppingDraftRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(draft.items.len(), 1);
        let draft_item_id = draft.items[0].draft_item_id.clone();

        let patch_req = PatchShoppingDraftItemsRequest {
            household_id: household_id.to_string(),
            items: vec![crate::requests::ShoppingDraftItemPatch {
                draft_item_id: draft_item_id.clone(),
                item_status: Some(home_inventory_shared::ShoppingDraftItemStatus::Purchased),
                quantity: None,
            }],
            idempotency_key: Some("patch-1".to_string()),
        };
        let first = store
            .patch_items(household_id, &draft.draft_id, patch_req.clone())
            .await
            .unwrap();
        assert!(first.updated);

        let second = store
            .patch_items(household_id, &draft.draft_id, patch_req)
            .await
            .unwrap();
        assert!(!second.updated);

        let finalized = store.finalize(household_id, &draft.draft_id).await.unwrap();
        assert_eq!(finalized.status, ShoppingDraftStatus::Finalized);

        let post_finalize_patch = PatchShoppingDraftItemsRequest {
            household_id: household_id.to_string(),
            items: vec![crate::requests::ShoppingDraftItemPatch {
                draft_item_id,
                item_status: Some(home_inventory_shared::ShoppingDraftItemStatus::Skipped),
                quantity: None,
            }],
            idempotency_key: None,
        };
        let after_finalize = store
            .patch_items(household_id, &draft.draft_id, post_finalize_patch)
            .await
            .unwrap();
        assert!(!after_finalize.updated);
    }
}
