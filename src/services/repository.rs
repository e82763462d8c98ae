//! Payment intent store.
//!
//! Intents are compliance records: there is no delete operation, and the
//! audit payload only ever grows. Payload updates are expressed as dotted
//! `$set` paths inside a single `update_one`, so each top-level payload key
//! is replaced independently while sibling keys survive, atomically per
//! intent document.

use crate::models::{IntentStatus, PaymentIntent};
use anyhow::Result;
use mongodb::options::IndexOptions;
use mongodb::{
    bson::{self, doc, Document},
    Collection, Database, IndexModel,
};
use uuid::Uuid;

#[derive(Clone)]
pub struct IntentRepository {
    intents: Collection<PaymentIntent>,
}

/// Partial update applied to a stored intent.
#[derive(Debug, Default)]
pub struct IntentUpdate {
    pub status: Option<IntentStatus>,
    pub provider_payment_id: Option<String>,
    /// Per-key audit patch; each key replaces only itself.
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl IntentRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            intents: db.collection("payment_intents"),
        }
    }

    pub async fn init_indexes(&self) -> Result<()> {
        let reference_index = IndexModel::builder()
            .keys(doc! { "reference": 1 })
            .options(
                IndexOptions::builder()
                    .name("intent_reference_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        let case_index = IndexModel::builder()
            .keys(doc! { "case_id": 1, "customer_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("intent_case_customer_idx".to_string())
                    .build(),
            )
            .build();

        let status_index = IndexModel::builder()
            .keys(doc! { "status": 1 })
            .options(
                IndexOptions::builder()
                    .name("intent_status_idx".to_string())
                    .build(),
            )
            .build();

        self.intents
            .create_indexes([reference_index, case_index, status_index], None)
            .await?;

        tracing::info!("payment intent indexes initialized");
        Ok(())
    }

    pub async fn create_intent(&self, intent: &PaymentIntent) -> Result<()> {
        self.intents.insert_one(intent, None).await?;
        Ok(())
    }

    pub async fn get_intent(&self, id: Uuid) -> Result<Option<PaymentIntent>> {
        let filter = doc! { "_id": id.to_string() };
        Ok(self.intents.find_one(filter, None).await?)
    }

    /// Owner-scoped lookup for the polling endpoint.
    pub async fn get_intent_for_customer(
        &self,
        id: Uuid,
        customer_id: i64,
    ) -> Result<Option<PaymentIntent>> {
        let filter = doc! { "_id": id.to_string(), "customer_id": customer_id };
        Ok(self.intents.find_one(filter, None).await?)
    }

    pub async fn find_by_reference(&self, reference: &str) -> Result<Option<PaymentIntent>> {
        let filter = doc! { "reference": reference };
        Ok(self.intents.find_one(filter, None).await?)
    }

    /// Apply a partial update. With `expected_status` the write is a
    /// compare-and-set: it only lands while the stored status still matches,
    /// so a racing writer cannot push an intent out of a terminal state.
    /// Returns `false` when no intent matched the filter.
    pub async fn update_intent(
        &self,
        id: Uuid,
        expected_status: Option<IntentStatus>,
        update: IntentUpdate,
    ) -> Result<bool> {
        let filter = intent_filter(id, expected_status)?;
        let update_doc = update_document(&update)?;
        let result = self.intents.update_one(filter, update_doc, None).await?;
        Ok(result.matched_count > 0)
    }
}

fn intent_filter(id: Uuid, expected_status: Option<IntentStatus>) -> Result<Document> {
    let mut filter = doc! { "_id": id.to_string() };
    if let Some(expected) = expected_status {
        filter.insert("status", bson::to_bson(&expected)?);
    }
    Ok(filter)
}

/// Translate an [`IntentUpdate`] into a `$set` document. Payload keys become
/// dotted paths so the patch merges per key instead of overwriting the whole
/// payload.
fn update_document(update: &IntentUpdate) -> Result<Document> {
    let mut set = doc! { "updated_at": bson::DateTime::now() };

    if let Some(status) = update.status {
        set.insert("status", bson::to_bson(&status)?);
    }
    if let Some(provider_payment_id) = &update.provider_payment_id {
        set.insert("provider_payment_id", provider_payment_id.clone());
    }
    for (key, value) in &update.payload {
        set.insert(format!("payload.{}", key), bson::to_bson(value)?);
    }

    Ok(doc! { "$set": set })
}
