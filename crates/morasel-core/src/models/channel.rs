use serde::{Deserialize, Serialize};

/// A WhatsApp number linked to the account.
///
/// Creation and single-channel fetches return the QR code the user must scan;
/// list responses carry connection status instead. Both decode here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Channel {
    #[serde(deserialize_with = "super::string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "super::null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "super::null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "super::null_as_default")]
    pub phone_number: String,
    pub connection_status: Option<String>,
    #[serde(deserialize_with = "super::null_as_default")]
    pub is_connected: bool,
    pub qr_code: Option<String>,
    pub last_connected: Option<String>,
    pub is_active: Option<bool>,
    pub created_at: Option<String>,
}

impl Channel {
    /// Whether the WhatsApp session behind this channel is live.
    pub fn is_online(&self) -> bool {
        self.is_connected
            || matches!(self.status.to_ascii_lowercase().as_str(), "connected" | "open")
    }

    /// QR payload to show while the channel is still pairing.
    pub fn pending_qr(&self) -> Option<&str> {
        if self.is_online() {
            return None;
        }
        self.qr_code.as_deref().filter(|qr| !qr.is_empty())
    }
}

/// Body for `POST /channels`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct NewChannel {
    pub name: String,
    pub phone_number: String,
}
