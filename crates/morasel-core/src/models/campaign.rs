use serde::{Deserialize, Serialize};

/// Default pause between two messages, in seconds.
pub const DEFAULT_DELAY_BETWEEN_MESSAGES: u32 = 30;
/// Default number of messages per batch.
pub const DEFAULT_BATCH_SIZE: u32 = 10;
/// Default pause between batches, in seconds.
pub const DEFAULT_BATCH_DELAY: u32 = 180;

/// A bulk WhatsApp send.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Campaign {
    #[serde(deserialize_with = "super::string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "super::null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "super::null_as_default")]
    pub message: String,
    #[serde(deserialize_with = "super::null_as_default")]
    pub channel_id: String,
    #[serde(deserialize_with = "super::null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "super::null_as_default")]
    pub protection_enabled: bool,
    pub protection_type: Option<String>,
    #[serde(deserialize_with = "super::lenient_opt_u32")]
    pub delay_between_messages: Option<u32>,
    #[serde(deserialize_with = "super::lenient_opt_u32")]
    pub batch_size: Option<u32>,
    #[serde(deserialize_with = "super::lenient_opt_u32")]
    pub batch_delay: Option<u32>,
    #[serde(deserialize_with = "super::null_as_default")]
    pub send_image_first: bool,
    #[serde(deserialize_with = "super::lenient_u64")]
    pub sent_count: u64,
    #[serde(deserialize_with = "super::lenient_u64")]
    pub total_count: u64,
    #[serde(deserialize_with = "super::lenient_u64")]
    pub failed_count: u64,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub channel: Option<CampaignChannel>,
}

impl Campaign {
    pub fn status(&self) -> CampaignStatus {
        CampaignStatus::parse(&self.status)
    }

    /// Share of recipients already sent to, 0-100.
    pub fn progress_percent(&self) -> f64 {
        if self.total_count == 0 {
            0.0
        } else {
            (self.sent_count as f64 / self.total_count as f64) * 100.0
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct CampaignChannel {
    #[serde(deserialize_with = "super::string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "super::null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "super::null_as_default")]
    pub phone_number: String,
}

/// Campaign lifecycle as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CampaignStatus {
    Draft,
    Running,
    Paused,
    Completed,
    Failed,
    Other(String),
}

impl CampaignStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "draft" => CampaignStatus::Draft,
            "running" | "in_progress" => CampaignStatus::Running,
            "paused" => CampaignStatus::Paused,
            "completed" => CampaignStatus::Completed,
            "failed" => CampaignStatus::Failed,
            _ => CampaignStatus::Other(raw.to_string()),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, CampaignStatus::Running)
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CampaignStatus::Draft => write!(f, "Draft"),
            CampaignStatus::Running => write!(f, "Running"),
            CampaignStatus::Paused => write!(f, "Paused"),
            CampaignStatus::Completed => write!(f, "Completed"),
            CampaignStatus::Failed => write!(f, "Failed"),
            CampaignStatus::Other(s) => write!(f, "{}", s),
        }
    }
}

/// How recipient lists are obfuscated against spam detection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum ProtectionType {
    #[default]
    Numbers,
    Names,
}

impl ProtectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtectionType::Numbers => "numbers",
            ProtectionType::Names => "names",
        }
    }
}

impl std::str::FromStr for ProtectionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "numbers" => Ok(ProtectionType::Numbers),
            "names" => Ok(ProtectionType::Names),
            other => Err(format!("unknown protection type: {}", other)),
        }
    }
}

/// Body for `POST /campaigns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct NewCampaign {
    pub name: String,
    pub message: String,
    pub channel_id: String,
    pub protection_enabled: bool,
    pub protection_type: ProtectionType,
    pub delay_between_messages: u32,
    pub batch_size: u32,
    pub batch_delay: u32,
    pub send_image_first: bool,
    pub contact_ids: Vec<String>,
}

impl NewCampaign {
    /// Campaign with the default pacing and protection settings.
    pub fn new(
        name: impl Into<String>,
        message: impl Into<String>,
        channel_id: impl Into<String>,
        contact_ids: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            channel_id: channel_id.into(),
            protection_enabled: true,
            protection_type: ProtectionType::Numbers,
            delay_between_messages: DEFAULT_DELAY_BETWEEN_MESSAGES,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
            send_image_first: true,
            contact_ids,
        }
    }
}

/// Image attached to a campaign, sent as a multipart file part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignImage {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl CampaignImage {
    /// Build from a file name, guessing the MIME type from its extension.
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        let mime_type = match extension.as_str() {
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "jpg" | "jpeg" => "image/jpeg",
            _ => "application/octet-stream",
        };
        Self {
            file_name,
            mime_type: mime_type.to_string(),
            bytes,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ChartDataItem {
    #[serde(deserialize_with = "super::null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "super::lenient_f64")]
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct RecentCampaign {
    #[serde(deserialize_with = "super::string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "super::null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "super::null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "super::lenient_u64")]
    pub sent_count: u64,
    #[serde(deserialize_with = "super::lenient_u64")]
    pub total_count: u64,
    pub created_at: Option<String>,
}

/// Totals shown on the home dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct DashboardStats {
    #[serde(deserialize_with = "super::lenient_u64")]
    pub total_sent: u64,
    #[serde(deserialize_with = "super::lenient_u64")]
    pub total_failed: u64,
    #[serde(deserialize_with = "super::lenient_u64")]
    pub total_messages: u64,
    #[serde(deserialize_with = "super::lenient_u64")]
    pub total_replied: u64,
    #[serde(deserialize_with = "super::lenient_f64")]
    pub delivery_rate: f64,
    #[serde(deserialize_with = "super::lenient_u64")]
    pub campaign_count: u64,
    #[serde(deserialize_with = "super::lenient_u64")]
    pub total_channels: u64,
    #[serde(deserialize_with = "super::lenient_u64")]
    pub connected_channels: u64,
    #[serde(deserialize_with = "super::lenient_i64")]
    pub points: i64,
    #[serde(deserialize_with = "super::null_as_default")]
    pub chart_data: Vec<ChartDataItem>,
    #[serde(deserialize_with = "super::null_as_default")]
    pub recent_campaigns: Vec<RecentCampaign>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!(CampaignStatus::parse("in_progress"), CampaignStatus::Running);
        assert_eq!(CampaignStatus::parse("COMPLETED"), CampaignStatus::Completed);
        assert_eq!(CampaignStatus::parse("queued"), CampaignStatus::Other("queued".into()));
        assert!(CampaignStatus::parse("running").is_active());
        assert!(!CampaignStatus::parse("paused").is_active());
    }

    #[test]
    fn test_progress_percent() {
        let campaign = Campaign { sent_count: 25, total_count: 100, ..Default::default() };
        assert!((campaign.progress_percent() - 25.0).abs() < f64::EPSILON);
        assert_eq!(Campaign::default().progress_percent(), 0.0);
    }

    #[test]
    fn test_new_campaign_wire_shape() {
        let campaign = NewCampaign::new("Promo", "Hello", "ch1", vec!["c1".into(), "c2".into()]);
        let json = serde_json::to_value(&campaign).unwrap();
        assert_eq!(json["channelId"], "ch1");
        assert_eq!(json["protectionType"], "numbers");
        assert_eq!(json["delayBetweenMessages"], 30);
        assert_eq!(json["batchSize"], 10);
        assert_eq!(json["batchDelay"], 180);
        assert_eq!(json["contactIds"][1], "c2");
    }

    #[test]
    fn test_image_mime_guess() {
        assert_eq!(CampaignImage::from_bytes("promo.PNG", vec![]).mime_type, "image/png");
        assert_eq!(CampaignImage::from_bytes("a.jpeg", vec![]).mime_type, "image/jpeg");
        assert_eq!(
            CampaignImage::from_bytes("blob", vec![]).mime_type,
            "application/octet-stream"
        );
    }

    #[test]
    fn test_dashboard_stats_tolerates_nulls() {
        let stats: DashboardStats =
            serde_json::from_str(r#"{"totalSent":5,"chartData":null,"points":12}"#).unwrap();
        assert_eq!(stats.total_sent, 5);
        assert!(stats.chart_data.is_empty());
        assert_eq!(stats.points, 12);
    }

    #[test]
    fn test_dashboard_stats_coerces_drifted_numbers() {
        let stats: DashboardStats = serde_json::from_str(
            r#"{"totalSent":null,"totalFailed":"3","deliveryRate":"97.5","points":12.5,
                "recentCampaigns":[{"id":1,"name":"A","sentCount":4.0,"totalCount":null}]}"#,
        )
        .unwrap();
        assert_eq!(stats.total_sent, 0);
        assert_eq!(stats.total_failed, 3);
        assert_eq!(stats.delivery_rate, 97.5);
        assert_eq!(stats.points, 13);
        assert_eq!(stats.recent_campaigns[0].sent_count, 4);
        assert_eq!(stats.recent_campaigns[0].total_count, 0);
    }

    #[test]
    fn test_campaign_pacing_tolerates_floats() {
        let campaign: Campaign =
            serde_json::from_str(r#"{"id":"k","delayBetweenMessages":30.0,"batchSize":null}"#)
                .unwrap();
        assert_eq!(campaign.delay_between_messages, Some(30));
        assert_eq!(campaign.batch_size, None);
    }
}
