use reqwest::multipart::{Form, Part};
use tracing::info;

use crate::api::envelope::{decode, decode_list};
use crate::api::{ApiClient, ApiError};
use crate::models::{Campaign, CampaignImage, DashboardStats, NewCampaign};

/// `/campaigns` endpoints.
#[derive(Debug, Clone)]
pub struct CampaignService {
    client: ApiClient,
}

impl CampaignService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<Campaign>, ApiError> {
        let body = self.client.get("/campaigns").await?;
        Ok(decode_list(body))
    }

    pub async fn create(&self, request: &NewCampaign) -> Result<Campaign, ApiError> {
        info!(name = %request.name, contacts = request.contact_ids.len(), "Creating campaign");
        let body = self.client.post("/campaigns", request).await?;
        decode(body)
    }

    /// Create a campaign with an attached image, sent as `multipart/form-data`.
    pub async fn create_with_image(
        &self,
        request: &NewCampaign,
        image: CampaignImage,
    ) -> Result<Campaign, ApiError> {
        info!(
            name = %request.name,
            contacts = request.contact_ids.len(),
            image = %image.file_name,
            "Creating campaign with image"
        );
        let form = campaign_form(request, image)?;
        let body = self.client.post_multipart("/campaigns", form).await?;
        decode(body)
    }

    pub async fn get(&self, id: &str) -> Result<Campaign, ApiError> {
        let body = self.client.get(&format!("/campaigns/{}", id)).await?;
        decode(body)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        info!(id = %id, "Deleting campaign");
        self.client.delete(&format!("/campaigns/{}", id)).await
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        let body = self.client.get("/campaigns/dashboard-stats").await?;
        decode(body)
    }
}

/// Scalars as text parts, one `contactIds[]` part per recipient, then the image.
fn campaign_form(request: &NewCampaign, image: CampaignImage) -> Result<Form, ApiError> {
    let mut form = Form::new()
        .text("name", request.name.clone())
        .text("message", request.message.clone())
        .text("channelId", request.channel_id.clone())
        .text("protectionEnabled", request.protection_enabled.to_string())
        .text("protectionType", request.protection_type.as_str())
        .text("delayBetweenMessages", request.delay_between_messages.to_string())
        .text("batchSize", request.batch_size.to_string())
        .text("batchDelay", request.batch_delay.to_string())
        .text("sendImageFirst", request.send_image_first.to_string());

    for id in &request.contact_ids {
        form = form.text("contactIds[]", id.clone());
    }

    let part = Part::bytes(image.bytes)
        .file_name(image.file_name)
        .mime_str(&image.mime_type)
        .map_err(ApiError::Http)?;
    Ok(form.part("image", part))
}
