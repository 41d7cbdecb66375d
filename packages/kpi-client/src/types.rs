use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use url::form_urlencoded;

/// Success marker carried in the envelope's `STATUS` field.
pub const STATUS_OK: &str = "OK";

/// Substitute text for a failure envelope whose error list is empty.
pub const UNKNOWN_ERROR: &str = "unknown error (server reported failure without a message)";

/// Wrapper returned by every KPI Drive endpoint.
///
/// `DATA` varies per endpoint (a paginated listing for queries, a single
/// created-id payload for writes). Failure responses may omit fields, so
/// everything decodes with a default fallback.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct ResponseEnvelope<T> {
    #[serde(rename = "MESSAGES", default)]
    pub messages: Messages,
    #[serde(rename = "DATA", default)]
    pub data: T,
    #[serde(rename = "STATUS", default)]
    pub status: String,
}

impl<T> ResponseEnvelope<T> {
    /// Whether the server marked the call successful.
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    /// First business-level error message. The error list is only
    /// meaningful when `is_ok()` is false, and may be empty even then.
    pub fn error_message(&self) -> &str {
        self.messages
            .error
            .first()
            .map(String::as_str)
            .unwrap_or(UNKNOWN_ERROR)
    }
}

/// Human-readable messages attached to an envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Messages {
    #[serde(default)]
    pub error: Vec<String>,
    #[serde(default)]
    pub warning: Vec<String>,
    #[serde(default)]
    pub info: Vec<String>,
}

/// Paginated listing payload for query endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Paginated<T> {
    #[serde(default)]
    pub page: i64,
    #[serde(default)]
    pub pages_count: i64,
    #[serde(default)]
    pub rows_count: i64,
    #[serde(default)]
    pub rows: Vec<T>,
}

impl<T> Default for Paginated<T> {
    fn default() -> Self {
        Self {
            page: 0,
            pages_count: 0,
            rows_count: 0,
            rows: Vec::new(),
        }
    }
}

/// A source occurrence record fetched from the events endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub author: EventAuthor,
    pub time: EventTime,
    pub params: EventParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventAuthor {
    pub mo_id: i64,
    pub user_id: i64,
    pub user_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventParams {
    pub indicator_to_mo_id: i64,
    #[serde(default)]
    pub platform: String,
    pub period: EventPeriod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventPeriod {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub type_id: i64,
    #[serde(default)]
    pub type_key: String,
}

/// Event timestamp in the API's fixed textual layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventTime(pub NaiveDateTime);

impl EventTime {
    /// Calendar date component, formatted `YYYY-MM-DD`.
    pub fn date_only(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }
}

/// Parses the timestamp layout the events endpoint emits:
/// `YYYY-MM-DDTHH:MM:SS[.fraction]Z`, where the fraction is optional (up to
/// nine digits) and the trailing `Z` is a literal. Anything else is an
/// error; a single bad row fails the whole batch decode.
pub fn parse_event_time(raw: &str) -> chrono::format::ParseResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.fZ")
}

impl<'de> Deserialize<'de> for EventTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_event_time(&raw).map(EventTime).map_err(|e| {
            serde::de::Error::custom(format!("invalid event time {:?}: {}", raw, e))
        })
    }
}

/// Payload returned by a successful fact write.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FactSaved {
    #[serde(default)]
    pub indicator_to_mo_fact_id: i64,
}

/// A metric data point ready for write-back.
///
/// All fields travel as text in a form-encoded body.
/// `indicator_to_mo_fact_id` of `"0"` means "create a new fact"; any other
/// value addresses an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fact {
    pub period_start: String,
    pub period_end: String,
    pub period_key: String,
    pub indicator_to_mo_id: String,
    pub indicator_to_mo_fact_id: String,
    pub value: String,
    pub fact_time: String,
    pub is_plan: String,
    pub supertags: String,
    pub auth_user_id: String,
    pub comment: String,
}

impl Fact {
    /// Encodes the fact as an `application/x-www-form-urlencoded` body.
    ///
    /// `supertags` is already JSON text at this point; the form layer treats
    /// it as an opaque field value.
    pub fn form_body(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("period_start", &self.period_start)
            .append_pair("period_end", &self.period_end)
            .append_pair("period_key", &self.period_key)
            .append_pair("indicator_to_mo_id", &self.indicator_to_mo_id)
            .append_pair("indicator_to_mo_fact_id", &self.indicator_to_mo_fact_id)
            .append_pair("value", &self.value)
            .append_pair("fact_time", &self.fact_time)
            .append_pair("is_plan", &self.is_plan)
            .append_pair("supertags", &self.supertags)
            .append_pair("auth_user_id", &self.auth_user_id)
            .append_pair("comment", &self.comment)
            .finish()
    }
}

/// A classification dimension attachable to a fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub key: String,
    pub values_source: i64,
}

/// A concrete value bound to a tag for one fact.
///
/// A fact's `supertags` form field holds the JSON-serialized array of these
/// assignments. The JSON encode happens before form encoding; the two layers
/// must stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagAssignment {
    pub tag: Tag,
    pub value: String,
}

/// Filter/sort/limit specification for the events endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct EventQuery {
    pub filter: EventFilter,
    pub sort: EventSort,
    pub limit: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventFilter {
    pub field: FieldClause,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldClause {
    pub key: String,
    pub sign: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventSort {
    pub fields: Vec<String>,
    pub direction: String,
}

impl EventQuery {
    /// The fixed query the sync job runs: matrix-request events, newest
    /// first, capped at `limit` rows. The envelope carries paging metadata
    /// but the API offers no cursor, so the cap is the entire window.
    pub fn matrix_requests(limit: u32) -> Self {
        Self {
            filter: EventFilter {
                field: FieldClause {
                    key: "type".to_string(),
                    sign: "LIKE".to_string(),
                    values: vec!["MATRIX_REQUEST".to_string()],
                },
            },
            sort: EventSort {
                fields: vec!["time".to_string()],
                direction: "DESC".to_string(),
            },
            limit,
        }
    }
}
