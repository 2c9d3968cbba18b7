//! Financial records (income and expense entries).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::Entity;
use crate::error::PocketResult;
use crate::validate;

const REQUIRED: &str = "All fields are required";

/// A financial entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    pub date: String,
    pub item: String,
    pub amount: f64,
    /// Category such as "income" or "expense"
    #[serde(rename = "type")]
    pub kind: String,
}

/// A validated record that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub date: String,
    pub item: String,
    pub amount: f64,
    pub kind: String,
}

impl Entity for Record {
    type Draft = NewRecord;

    const KIND: &'static str = "Record";

    fn with_id(id: u64, draft: NewRecord) -> Self {
        Record {
            id,
            date: draft.date,
            item: draft.item,
            amount: draft.amount,
            kind: draft.kind,
        }
    }

    fn parse_draft(body: Value) -> PocketResult<NewRecord> {
        let mut fields = validate::object(body, REQUIRED)?;

        Ok(NewRecord {
            date: validate::required_str(&mut fields, "date", REQUIRED)?,
            item: validate::required_str(&mut fields, "item", REQUIRED)?,
            amount: validate::required_number(&mut fields, "amount", REQUIRED)?,
            kind: validate::required_str(&mut fields, "type", REQUIRED)?,
        })
    }
}
