//! Seam between the sync runner and the KPI Drive API.
//!
//! `KpiClient` is the production implementation; tests inject a scripted
//! fake to exercise ordering and halting behavior without a server.

use async_trait::async_trait;
use kpi_client::{
    Event, EventQuery, Fact, FactSaved, KpiClient, Paginated, ResponseEnvelope, Result,
};

/// The API calls the sync runner makes, in the order it makes them.
#[async_trait]
pub trait KpiApi {
    async fn login(&self, login: &str, password: &str) -> Result<()>;

    async fn events(&self, query: &EventQuery) -> Result<ResponseEnvelope<Paginated<Event>>>;

    async fn save_fact(&self, token: &str, fact: &Fact) -> Result<ResponseEnvelope<FactSaved>>;
}

#[async_trait]
impl KpiApi for KpiClient {
    async fn login(&self, login: &str, password: &str) -> Result<()> {
        KpiClient::login(self, login, password).await
    }

    async fn events(&self, query: &EventQuery) -> Result<ResponseEnvelope<Paginated<Event>>> {
        KpiClient::events(self, query).await
    }

    async fn save_fact(&self, token: &str, fact: &Fact) -> Result<ResponseEnvelope<FactSaved>> {
        KpiClient::save_fact(self, token, fact).await
    }
}
