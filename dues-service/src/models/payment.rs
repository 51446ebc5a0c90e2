use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-member tracking document under a due.
///
/// `created_at` is stamped by the store when the record is committed and is
/// therefore absent on records built by the fan-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: String,
    pub due_id: String,
    pub user_id: String,
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default, with = "opt_chrono_datetime_as_bson_datetime")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "opt_chrono_datetime_as_bson_datetime"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl PaymentRecord {
    /// A fresh, unpaid record for `uid`.
    pub fn unpaid(due_id: &str, uid: &str, amount: f64) -> Self {
        Self {
            id: uid.to_string(),
            due_id: due_id.to_string(),
            user_id: uid.to_string(),
            transaction_id: String::new(),
            amount,
            paid_at: None,
            created_at: None,
        }
    }
}

// Optional DateTime<Utc> as BSON DateTime; `None` is written as null.
mod opt_chrono_datetime_as_bson_datetime {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => bson::DateTime::from_chrono(*d).serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt = Option::<bson::DateTime>::deserialize(deserializer)?;
        Ok(opt.map(|d| d.to_chrono()))
    }
}
