use tracing::info;

use crate::api::envelope::{decode, decode_page};
use crate::api::{ApiClient, ApiError};
use crate::models::{Contact, ContactQuery, ContactUpdate, NewContact, Page};

/// `/contacts` endpoints.
#[derive(Debug, Clone)]
pub struct ContactService {
    client: ApiClient,
}

impl ContactService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// One page of contacts. Only the query parts that are set are sent.
    pub async fn list(&self, query: &ContactQuery) -> Result<Page<Contact>, ApiError> {
        let body = self
            .client
            .get_with_query("/contacts", &query.to_params())
            .await?;
        Ok(decode_page(body, query.page, query.limit))
    }

    pub async fn create(&self, request: &NewContact) -> Result<Contact, ApiError> {
        info!(name = %request.name, "Creating contact");
        let body = self.client.post("/contacts", request).await?;
        decode(body)
    }

    pub async fn update(&self, id: &str, request: &ContactUpdate) -> Result<Contact, ApiError> {
        let body = self
            .client
            .put(&format!("/contacts/{}", id), request)
            .await?;
        decode(body)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&format!("/contacts/{}", id)).await
    }

    /// Remove every contact on the account.
    pub async fn delete_all(&self) -> Result<(), ApiError> {
        info!("Deleting all contacts");
        self.client.delete("/contacts").await
    }
}
