//! Batch orchestration: authenticate, fetch, transform, write, fail fast.

use kpi_client::{EventQuery, KpiError, Result};
use tracing::{info, warn};

use crate::api::KpiApi;
use crate::config::Config;
use crate::transform::{fact_from_event, FactTemplate};

/// One end-to-end run of the sync pipeline.
#[derive(Debug, Clone)]
pub struct SyncJob {
    pub login: String,
    pub password: String,
    pub api_token: String,
    pub event_limit: u32,
    pub template: FactTemplate,
}

/// What a run accomplished before it finished or halted.
///
/// Kept explicit rather than folded into the error channel so callers and
/// tests can see exactly which facts landed before any halt.
#[derive(Debug, Default)]
pub struct SyncOutcome {
    /// Server-assigned fact ids, in write order.
    pub saved: Vec<i64>,
    /// First application error, when the batch stopped early. Rows after
    /// the failing one were never attempted.
    pub halted: Option<String>,
}

impl SyncOutcome {
    pub fn is_complete(&self) -> bool {
        self.halted.is_none()
    }
}

impl SyncJob {
    pub fn from_config(config: &Config) -> Self {
        Self {
            login: config.login.clone(),
            password: config.password.clone(),
            api_token: config.api_token.clone(),
            event_limit: config.event_limit,
            template: config.template.clone(),
        }
    }

    /// Run the pipeline: login once, fetch the event window once, then
    /// transform and write row by row in server order.
    ///
    /// Transport and decode failures abort with `Err`. A write whose
    /// envelope reports a non-OK status halts the batch; already-written
    /// facts stay written and the outcome records the server's message.
    /// No retries anywhere.
    pub async fn run<A: KpiApi>(&self, api: &A) -> Result<SyncOutcome> {
        api.login(&self.login, &self.password).await?;

        let events = api.events(&EventQuery::matrix_requests(self.event_limit)).await?;
        if !events.is_ok() {
            return Err(KpiError::Application(events.error_message().to_string()));
        }

        let rows = events.data.rows;
        info!(count = rows.len(), "fetched event batch");

        let mut outcome = SyncOutcome::default();
        for event in &rows {
            let fact = fact_from_event(&self.template, event);
            let saved = api.save_fact(&self.api_token, &fact).await?;

            if saved.is_ok() {
                let fact_id = saved.data.indicator_to_mo_fact_id;
                info!(fact_id, "fact saved");
                outcome.saved.push(fact_id);
            } else {
                let message = saved.error_message().to_string();
                warn!(%message, "fact save rejected, halting batch");
                outcome.halted = Some(message);
                break;
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kpi_client::{
        Event, EventQuery, Fact, FactSaved, Messages, Paginated, ResponseEnvelope,
    };
    use std::sync::Mutex;

    /// Scripted stand-in for the real client. Records every call.
    struct FakeApi {
        events_response: ResponseEnvelope<Paginated<Event>>,
        save_responses: Mutex<Vec<Result<ResponseEnvelope<FactSaved>>>>,
        login_calls: Mutex<u32>,
        events_calls: Mutex<u32>,
        save_calls: Mutex<Vec<Fact>>,
    }

    impl FakeApi {
        fn new(
            events_response: ResponseEnvelope<Paginated<Event>>,
            save_responses: Vec<Result<ResponseEnvelope<FactSaved>>>,
        ) -> Self {
            Self {
                events_response,
                save_responses: Mutex::new(save_responses),
                login_calls: Mutex::new(0),
                events_calls: Mutex::new(0),
                save_calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl KpiApi for FakeApi {
        async fn login(&self, _login: &str, _password: &str) -> Result<()> {
            *self.login_calls.lock().unwrap() += 1;
            Ok(())
        }

        async fn events(
            &self,
            _query: &EventQuery,
        ) -> Result<ResponseEnvelope<Paginated<Event>>> {
            *self.events_calls.lock().unwrap() += 1;
            Ok(self.events_response.clone())
        }

        async fn save_fact(
            &self,
            _token: &str,
            fact: &Fact,
        ) -> Result<ResponseEnvelope<FactSaved>> {
            self.save_calls.lock().unwrap().push(fact.clone());
            self.save_responses.lock().unwrap().remove(0)
        }
    }

    fn event(user_id: i64, user_name: &str, indicator: i64) -> Event {
        let body = format!(
            r#"{{
                "author": {{"mo_id": 1, "user_id": {user_id}, "user_name": "{user_name}"}},
                "time": "2024-02-01T08:15:00.123456Z",
                "params": {{
                    "indicator_to_mo_id": {indicator},
                    "period": {{"start": "2024-01-01T00:00:00Z", "end": "2024-01-31T23:59:59Z"}}
                }}
            }}"#
        );
        serde_json::from_str(&body).unwrap()
    }

    fn event_batch(rows: Vec<Event>) -> ResponseEnvelope<Paginated<Event>> {
        ResponseEnvelope {
            messages: Messages::default(),
            data: Paginated {
                page: 1,
                pages_count: 1,
                rows_count: rows.len() as i64,
                rows,
            },
            status: "OK".to_string(),
        }
    }

    fn save_ok(fact_id: i64) -> ResponseEnvelope<FactSaved> {
        ResponseEnvelope {
            messages: Messages::default(),
            data: FactSaved {
                indicator_to_mo_fact_id: fact_id,
            },
            status: "OK".to_string(),
        }
    }

    fn save_rejected(errors: Vec<&str>) -> ResponseEnvelope<FactSaved> {
        ResponseEnvelope {
            messages: Messages {
                error: errors.into_iter().map(String::from).collect(),
                ..Messages::default()
            },
            data: FactSaved::default(),
            status: "ERROR".to_string(),
        }
    }

    fn job() -> SyncJob {
        SyncJob {
            login: "admin".to_string(),
            password: "admin".to_string(),
            api_token: "token".to_string(),
            event_limit: 10,
            template: FactTemplate {
                period_key: "month".to_string(),
                indicator_to_mo_id: "315914".to_string(),
                auth_user_id: "40".to_string(),
                value: "1".to_string(),
                is_plan: String::new(),
                comment: String::new(),
            },
        }
    }

    #[tokio::test]
    async fn empty_batch_logs_in_queries_once_and_writes_nothing() {
        let api = FakeApi::new(event_batch(vec![]), vec![]);

        let outcome = job().run(&api).await.unwrap();

        assert!(outcome.is_complete());
        assert!(outcome.saved.is_empty());
        assert_eq!(*api.login_calls.lock().unwrap(), 1);
        assert_eq!(*api.events_calls.lock().unwrap(), 1);
        assert!(api.save_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn writes_every_row_in_server_order() {
        let api = FakeApi::new(
            event_batch(vec![event(7, "Ivan", 42), event(8, "Olga", 43)]),
            vec![Ok(save_ok(100)), Ok(save_ok(101))],
        );

        let outcome = job().run(&api).await.unwrap();

        assert!(outcome.is_complete());
        assert_eq!(outcome.saved, vec![100, 101]);

        let calls = api.save_calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].indicator_to_mo_fact_id, "42");
        assert_eq!(calls[1].indicator_to_mo_fact_id, "43");
    }

    #[tokio::test]
    async fn halts_on_first_rejected_write() {
        let api = FakeApi::new(
            event_batch(vec![
                event(7, "Ivan", 42),
                event(8, "Olga", 43),
                event(9, "Petr", 44),
            ]),
            vec![
                Ok(save_ok(100)),
                Ok(save_rejected(vec!["quota exceeded"])),
                Ok(save_ok(102)),
            ],
        );

        let outcome = job().run(&api).await.unwrap();

        assert_eq!(outcome.saved, vec![100]);
        assert_eq!(outcome.halted.as_deref(), Some("quota exceeded"));
        // The third event was never attempted.
        assert_eq!(api.save_calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rejection_without_a_message_does_not_panic() {
        let api = FakeApi::new(
            event_batch(vec![event(7, "Ivan", 42)]),
            vec![Ok(save_rejected(vec![]))],
        );

        let outcome = job().run(&api).await.unwrap();

        assert!(outcome.saved.is_empty());
        assert_eq!(outcome.halted.as_deref(), Some(kpi_client::types::UNKNOWN_ERROR));
    }

    #[tokio::test]
    async fn decode_failure_during_a_write_aborts_the_run() {
        let bad_decode = serde_json::from_str::<i64>("not json").unwrap_err();
        let api = FakeApi::new(
            event_batch(vec![event(7, "Ivan", 42), event(8, "Olga", 43)]),
            vec![Err(bad_decode.into())],
        );

        let result = job().run(&api).await;

        assert!(matches!(result, Err(KpiError::Decode(_))));
        assert_eq!(api.save_calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejected_event_query_is_an_application_error() {
        let mut batch = event_batch(vec![]);
        batch.status = "ERROR".to_string();
        batch.messages.error.push("session expired".to_string());
        let api = FakeApi::new(batch, vec![]);

        let result = job().run(&api).await;

        match result {
            Err(KpiError::Application(message)) => assert_eq!(message, "session expired"),
            other => panic!("expected application error, got {:?}", other.map(|o| o.saved)),
        }
    }
}
