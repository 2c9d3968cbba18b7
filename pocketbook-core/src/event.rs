//! Calendar events.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::Entity;
use crate::error::PocketResult;
use crate::validate;

const REQUIRED: &str = "Event title and start are required";

/// A calendar entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub title: String,
    /// Start date or date-time, kept as the client sent it
    pub start: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub title: String,
    pub start: String,
    pub color: Option<String>,
}

impl Entity for Event {
    type Draft = NewEvent;

    const KIND: &'static str = "Event";

    fn with_id(id: u64, draft: NewEvent) -> Self {
        Event {
            id,
            title: draft.title,
            start: draft.start,
            color: draft.color,
        }
    }

    fn parse_draft(body: Value) -> PocketResult<NewEvent> {
        let mut fields = validate::object(body, REQUIRED)?;

        Ok(NewEvent {
            title: validate::required_str(&mut fields, "title", REQUIRED)?,
            start: validate::required_str(&mut fields, "start", REQUIRED)?,
            color: validate::optional_str(&mut fields, "color")?,
        })
    }
}
