//! Typed client for the KPI Drive platform API.
//!
//! Covers the three endpoints the fact sync pipeline touches: cookie-based
//! login, the filtered event listing, and the form-encoded fact write.
//! Every reply arrives inside the platform's uniform `{MESSAGES, DATA,
//! STATUS}` envelope.
//!
//! # Example
//!
//! ```rust,ignore
//! use kpi_client::{EventQuery, KpiClient};
//!
//! let client = KpiClient::new("https://development.kpi-drive.ru")?;
//! client.login("admin", "admin").await?;
//!
//! let events = client.events(&EventQuery::matrix_requests(10)).await?;
//! for event in &events.data.rows {
//!     println!("{} at {}", event.author.user_name, event.time.date_only());
//! }
//! ```

pub mod error;
pub mod types;

pub use error::{KpiError, Result};
pub use types::{
    Event, EventQuery, EventTime, Fact, FactSaved, Messages, Paginated, ResponseEnvelope, Tag,
    TagAssignment,
};

use std::time::Duration;

use reqwest::header;
use url::form_urlencoded;

const LOGIN_PATH: &str = "/_api/auth/login";
const EVENTS_PATH: &str = "/_api/events";
const SAVE_FACT_PATH: &str = "/_api/facts/save_fact";

/// One authenticated session against a KPI Drive instance.
///
/// The underlying cookie store holds the login session, so calls made
/// through one client share authentication state and two clients never do.
pub struct KpiClient {
    http: reqwest::Client,
    base_url: String,
}

impl KpiClient {
    /// Create a client for the given base URL. The HTTP client carries a
    /// cookie store and a 30-second per-request deadline.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send one request and read the raw body. A connection failure or an
    /// unreadable body is a transport error; decoding is the caller's step.
    async fn dispatch(&self, request: reqwest::RequestBuilder) -> Result<Vec<u8>> {
        let resp = request.send().await?;
        Ok(resp.bytes().await?.to_vec())
    }

    /// Log in with form-encoded credentials. On success the session cookie
    /// lands in the cookie store and authorizes later calls.
    ///
    /// The reply is decoded and its `STATUS` checked; a readable body with a
    /// non-OK status is a login failure, not a success.
    pub async fn login(&self, login: &str, password: &str) -> Result<()> {
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("login", login)
            .append_pair("password", password)
            .finish();

        let bytes = self
            .dispatch(
                self.http
                    .post(self.endpoint(LOGIN_PATH))
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(body),
            )
            .await?;

        let envelope: ResponseEnvelope<serde_json::Value> = serde_json::from_slice(&bytes)?;
        if !envelope.is_ok() {
            return Err(KpiError::Auth(envelope.error_message().to_string()));
        }

        tracing::debug!(login, "session established");
        Ok(())
    }

    /// Fetch the event window described by `query`.
    ///
    /// The endpoint takes its specification as a JSON body on a GET request.
    /// Zero rows decodes fine and is not an error.
    pub async fn events(&self, query: &EventQuery) -> Result<ResponseEnvelope<Paginated<Event>>> {
        let bytes = self
            .dispatch(self.http.get(self.endpoint(EVENTS_PATH)).json(query))
            .await?;

        let envelope: ResponseEnvelope<Paginated<Event>> = serde_json::from_slice(&bytes)?;
        tracing::debug!(rows = envelope.data.rows.len(), status = %envelope.status, "event query done");
        Ok(envelope)
    }

    /// Write one fact, authorized by the static bearer token.
    ///
    /// Returns the decoded envelope without judging its `STATUS`; whether a
    /// non-OK write halts anything is the caller's policy.
    pub async fn save_fact(&self, token: &str, fact: &Fact) -> Result<ResponseEnvelope<FactSaved>> {
        let body = fact.form_body();

        let bytes = self
            .dispatch(
                self.http
                    .post(self.endpoint(SAVE_FACT_PATH))
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .header(header::CONTENT_LENGTH, body.len())
                    .bearer_auth(token)
                    .body(body),
            )
            .await?;

        Ok(serde_json::from_slice(&bytes)?)
    }
}
