//! Lead admission into the queue.

use chrono::Utc;
use tracing::{info, info_span, Instrument};

use crate::models::lead::{Lead, NewLead};
use crate::persistence::store::LeadStore;
use crate::{AppError, Result};

/// Admit a freshly arrived lead with zero attempts.
///
/// # Errors
///
/// Returns `AppError::Db` if the store rejects the insert.
pub async fn admit_lead(store: &dyn LeadStore, contact: NewLead) -> Result<Lead> {
    let lead = Lead::new(contact, Utc::now());
    let span = info_span!("admit_lead", lead_id = %lead.id);

    async {
        store.admit(&lead).await?;
        info!(source = ?lead.source, "lead admitted");
        Ok::<(), AppError>(())
    }
    .instrument(span)
    .await?;

    Ok(lead)
}

/// Synthesize a single demo lead so an empty queue has something to show.
///
/// Development affordance only; not part of the production surface.
///
/// # Errors
///
/// Returns `AppError::Db` if the store rejects the insert.
#[cfg(feature = "test-leads")]
pub async fn request_test_lead(store: &dyn LeadStore) -> Result<Lead> {
    let contact = NewLead {
        first_name: Some("Test".into()),
        last_name: Some("Lead".into()),
        email: Some("test.lead@example.com".into()),
        phone: Some("+15555550100".into()),
        company: Some("Example Co".into()),
        address: None,
        source: Some("test".into()),
        origin_label: Some("Test Lead".into()),
    };
    admit_lead(store, contact).await
}
