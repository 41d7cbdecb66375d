//! Pure derivation of a write-ready fact from one event.

use kpi_client::{Event, Fact, Tag, TagAssignment};

/// Every synced fact carries one enrichment tag: the acting user, filed
/// under the "client" classification dimension.
const CLIENT_TAG_NAME: &str = "Клиент";
const CLIENT_TAG_KEY: &str = "client";

/// Caller-supplied constants for the fact fields not derived from the event.
#[derive(Debug, Clone)]
pub struct FactTemplate {
    pub period_key: String,
    pub indicator_to_mo_id: String,
    pub auth_user_id: String,
    pub value: String,
    pub is_plan: String,
    pub comment: String,
}

/// Build the fact for one event.
///
/// No I/O and no failure modes: every input is an already-parsed field, so
/// identical input always yields an identical fact.
pub fn fact_from_event(template: &FactTemplate, event: &Event) -> Fact {
    let assignment = TagAssignment {
        tag: Tag {
            id: event.author.user_id,
            name: CLIENT_TAG_NAME.to_string(),
            key: CLIENT_TAG_KEY.to_string(),
            values_source: 0,
        },
        value: event.author.user_name.clone(),
    };

    // Inner JSON first; the encoded text becomes a single form field value
    // when the fact is written.
    let supertags = serde_json::to_string(&[assignment])
        .expect("tag assignment serialization is infallible");

    Fact {
        period_start: event.params.period.start.clone(),
        period_end: event.params.period.end.clone(),
        period_key: template.period_key.clone(),
        indicator_to_mo_id: template.indicator_to_mo_id.clone(),
        indicator_to_mo_fact_id: event.params.indicator_to_mo_id.to_string(),
        value: template.value.clone(),
        fact_time: event.time.date_only(),
        is_plan: template.is_plan.clone(),
        supertags,
        auth_user_id: template.auth_user_id.clone(),
        comment: template.comment.clone(),
    }
}
