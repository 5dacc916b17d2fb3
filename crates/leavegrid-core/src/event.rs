use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::datetime::event_datetime_serde;
use crate::interval::{DayRange, is_same_day};

/// Backend identifiers are either numeric or opaque strings. Numeric ids sort before text ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventId {
    Number(u64),
    Text(String),
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventId::Number(n) => write!(f, "{n}"),
            EventId::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for EventId {
    fn from(value: u64) -> Self {
        EventId::Number(value)
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        EventId::Text(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: EventId,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(
        rename = "start_date",
        alias = "start",
        alias = "startDate",
        with = "event_datetime_serde"
    )]
    pub start: NaiveDateTime,

    #[serde(
        rename = "end_date",
        alias = "end",
        alias = "endDate",
        with = "event_datetime_serde"
    )]
    pub end: NaiveDateTime,
}

impl CalendarEvent {
    pub fn new(
        id: impl Into<EventId>,
        title: impl Into<String>,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            category: None,
            start,
            end,
        }
    }

    #[must_use]
    pub fn start_day(&self) -> NaiveDate {
        self.start.date()
    }

    #[must_use]
    pub fn end_day(&self) -> NaiveDate {
        self.end.date()
    }

    /// Start and end fall on the same calendar day; such events never take a lane.
    #[must_use]
    pub fn is_single_day(&self) -> bool {
        is_same_day(self.start, self.end)
    }

    /// Days covered, or `None` for a malformed event.
    #[must_use]
    pub fn day_range(&self) -> Option<DayRange> {
        DayRange::new(self.start_day(), self.end_day())
    }

    pub fn check(&self) -> Result<(), EventError> {
        if self.end < self.start {
            return Err(EventError::EndBeforeStart {
                id: self.id.clone(),
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("event {id} ends ({end}) before it starts ({start})")]
    EndBeforeStart {
        id: EventId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("duplicate event id {0}; keeping the first occurrence")]
    DuplicateId(EventId),
}

impl EventError {
    pub fn id(&self) -> &EventId {
        match self {
            EventError::EndBeforeStart { id, .. } => id,
            EventError::DuplicateId(id) => id,
        }
    }
}
