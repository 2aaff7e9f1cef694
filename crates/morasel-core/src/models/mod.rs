//! Data models for Morasel entities.
//!
//! This module contains the wire shapes exchanged with the backend:
//!
//! - `User`: the account behind a session
//! - `Channel`: a connected WhatsApp number
//! - `Contact`: a campaign recipient
//! - `Campaign`, `DashboardStats`: bulk sends and their totals
//! - `MyPoints`, `PointsStats`, `Transaction`: the points wallet
//! - `Page`: the normalized paginated list
//!
//! Every field decodes leniently (defaults for missing values, ids that
//! may be strings or numbers) so backend drift never breaks a list.

pub mod campaign;
pub mod channel;
pub mod contact;
pub mod page;
pub mod points;
pub mod user;

pub use campaign::{
    Campaign, CampaignChannel, CampaignImage, CampaignStatus, ChartDataItem, DashboardStats,
    NewCampaign, ProtectionType, RecentCampaign,
};
pub use channel::{Channel, NewChannel};
pub use contact::{Contact, ContactChannel, ContactQuery, ContactUpdate, NewContact};
pub use page::Page;
pub use points::{MyPoints, PointsStats, Transaction, TransactionQuery, TransactionType};
pub use user::User;

use serde::{Deserialize, Deserializer};

/// Accept an identifier sent either as a string or as a number.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Float(f64),
        Null,
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(f) => f.to_string(),
        Raw::Null => String::new(),
    })
}

/// Any JSON value, read as a number where possible.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Other(serde::de::IgnoredAny),
}

impl RawNumber {
    fn into_f64(self) -> Option<f64> {
        let value = match self {
            RawNumber::Int(n) => n as f64,
            RawNumber::UInt(n) => n as f64,
            RawNumber::Float(f) => f,
            RawNumber::Str(s) => s.trim().parse::<f64>().ok()?,
            RawNumber::Other(_) => return None,
        };
        value.is_finite().then_some(value)
    }

    fn into_i64(self) -> Option<i64> {
        match self {
            RawNumber::Int(n) => Some(n),
            RawNumber::UInt(n) => Some(i64::try_from(n).unwrap_or(i64::MAX)),
            RawNumber::Str(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| RawNumber::Str(s.to_string()).into_rounded())
            }
            other => other.into_rounded(),
        }
    }

    /// Float casts saturate at the i64 bounds.
    fn into_rounded(self) -> Option<i64> {
        self.into_f64().map(|f| f.round() as i64)
    }
}

/// Signed count that may arrive as null, a float or a numeric string.
/// Fractions are rounded; anything else reads as 0.
pub(crate) fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(RawNumber::deserialize(deserializer)?.into_i64().unwrap_or_default())
}

/// Like `lenient_i64`, with negatives clamped to 0.
pub(crate) fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let n = RawNumber::deserialize(deserializer)?.into_i64().unwrap_or_default();
    Ok(u64::try_from(n).unwrap_or(0))
}

/// Optional setting such as a pacing value; unreadable values read as unset.
pub(crate) fn lenient_opt_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let n = RawNumber::deserialize(deserializer)?.into_i64();
    Ok(n.and_then(|n| u32::try_from(n).ok()))
}

pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(RawNumber::deserialize(deserializer)?.into_f64().unwrap_or_default())
}

/// Treat `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Counts {
        #[serde(deserialize_with = "lenient_i64")]
        signed: i64,
        #[serde(deserialize_with = "lenient_u64")]
        unsigned: u64,
        #[serde(deserialize_with = "lenient_f64")]
        rate: f64,
        #[serde(deserialize_with = "lenient_opt_u32")]
        setting: Option<u32>,
    }

    fn counts(json: &str) -> Counts {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_nulls_read_as_defaults() {
        let c = counts(r#"{"signed":null,"unsigned":null,"rate":null,"setting":null}"#);
        assert_eq!(c.signed, 0);
        assert_eq!(c.unsigned, 0);
        assert_eq!(c.rate, 0.0);
        assert_eq!(c.setting, None);
    }

    #[test]
    fn test_fractions_are_rounded() {
        let c = counts(r#"{"signed":12.5,"unsigned":2.4,"rate":97.5,"setting":30.0}"#);
        assert_eq!(c.signed, 13);
        assert_eq!(c.unsigned, 2);
        assert_eq!(c.rate, 97.5);
        assert_eq!(c.setting, Some(30));
    }

    #[test]
    fn test_numeric_strings_and_garbage() {
        let c = counts(r#"{"signed":" -7 ","unsigned":"1.6","rate":"abc","setting":"10"}"#);
        assert_eq!(c.signed, -7);
        assert_eq!(c.unsigned, 2);
        assert_eq!(c.rate, 0.0);
        assert_eq!(c.setting, Some(10));

        let c = counts(r#"{"signed":{"n":1},"unsigned":-4,"rate":[1],"setting":-1}"#);
        assert_eq!(c.signed, 0);
        assert_eq!(c.unsigned, 0);
        assert_eq!(c.rate, 0.0);
        assert_eq!(c.setting, None);
    }
}
