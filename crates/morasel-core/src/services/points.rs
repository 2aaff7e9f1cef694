use crate::api::envelope::{decode, decode_page};
use crate::api::{ApiClient, ApiError};
use crate::models::{MyPoints, Page, PointsStats, Transaction, TransactionQuery};

/// `/points` endpoints for the signed-in account.
#[derive(Debug, Clone)]
pub struct PointsService {
    client: ApiClient,
}

impl PointsService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn my_points(&self) -> Result<MyPoints, ApiError> {
        let body = self.client.get("/points/my-points").await?;
        decode(body)
    }

    pub async fn my_stats(&self) -> Result<PointsStats, ApiError> {
        let body = self.client.get("/points/my-stats").await?;
        decode(body)
    }

    pub async fn transactions(&self, query: &TransactionQuery) -> Result<Page<Transaction>, ApiError> {
        let body = self
            .client
            .get_with_query("/points/my-transactions-paginated", &query.to_params())
            .await?;
        Ok(decode_page(body, query.page, query.limit))
    }
}
