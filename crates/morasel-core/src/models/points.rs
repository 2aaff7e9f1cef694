use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct MyPoints {
    #[serde(deserialize_with = "super::lenient_i64")]
    pub points: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PointsStats {
    #[serde(deserialize_with = "super::lenient_i64")]
    pub current_points: i64,
    #[serde(deserialize_with = "super::lenient_i64")]
    pub total_spent: i64,
    #[serde(deserialize_with = "super::lenient_i64")]
    pub total_received: i64,
    #[serde(deserialize_with = "super::lenient_u64")]
    pub transaction_count: u64,
}

/// Kind of ledger movement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionType {
    AdminAdd,
    AdminDeduct,
    CampaignDeduct,
    Other(String),
}

impl TransactionType {
    pub fn as_str(&self) -> &str {
        match self {
            TransactionType::AdminAdd => "admin_add",
            TransactionType::AdminDeduct => "admin_deduct",
            TransactionType::CampaignDeduct => "campaign_deduct",
            TransactionType::Other(s) => s,
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "admin_add" => TransactionType::AdminAdd,
            "admin_deduct" => TransactionType::AdminDeduct,
            "campaign_deduct" => TransactionType::CampaignDeduct,
            other => TransactionType::Other(other.to_string()),
        }
    }

    /// Whether this movement adds to the balance.
    pub fn is_credit(&self) -> bool {
        matches!(self, TransactionType::AdminAdd)
    }
}

impl Default for TransactionType {
    fn default() -> Self {
        TransactionType::Other(String::new())
    }
}

impl Serialize for TransactionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TransactionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(TransactionType::parse(&raw))
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match TransactionType::parse(s) {
            TransactionType::Other(other) => Err(format!("unknown transaction type: {}", other)),
            known => Ok(known),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Transaction {
    #[serde(deserialize_with = "super::string_or_number")]
    pub id: String,
    #[serde(rename = "type")]
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub kind: TransactionType,
    #[serde(deserialize_with = "super::lenient_i64")]
    pub amount: i64,
    #[serde(deserialize_with = "super::lenient_i64")]
    pub balance_after: i64,
    pub description: Option<String>,
    pub created_at: Option<String>,
}

/// Query for `GET /points/my-transactions-paginated`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub kind: Option<TransactionType>,
}

impl TransactionQuery {
    /// Query parameters for the parts that are set.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(page) = self.page.filter(|p| *p > 0) {
            params.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit.filter(|l| *l > 0) {
            params.push(("limit", limit.to_string()));
        }
        if let Some(ref kind) = self.kind {
            params.push(("type", kind.as_str().to_string()));
        }
        params
    }
}
