use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::event::{CalendarEvent, EventError};
use crate::interval::DayRange;

#[derive(Debug, Clone, Default)]
pub struct ValidatedEvents {
    pub events: Vec<CalendarEvent>,
    pub rejected: Vec<EventError>,
}

/// Reads a JSON array of events or, when the file does not start with `[`,
/// one JSON event per non-empty line.
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn load_events(path: &Path) -> anyhow::Result<Vec<CalendarEvent>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;

    let events = if text.trim_start().starts_with('[') {
        serde_json::from_str::<Vec<CalendarEvent>>(&text)
            .with_context(|| format!("invalid event array in {}", path.display()))?
    } else {
        parse_jsonl(&text).with_context(|| format!("invalid event lines in {}", path.display()))?
    };

    info!(count = events.len(), "loaded events");
    Ok(events)
}

fn parse_jsonl(text: &str) -> anyhow::Result<Vec<CalendarEvent>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let event: CalendarEvent = serde_json::from_str(trimmed)
            .with_context(|| format!("line {}: invalid event json", idx + 1))?;
        out.push(event);
    }
    Ok(out)
}

/// Drops malformed events so one bad record cannot blank the calendar.
/// Input order is preserved; for repeated ids the first occurrence wins.
#[tracing::instrument(skip_all, fields(input = events.len()))]
pub fn validate_events(events: Vec<CalendarEvent>) -> ValidatedEvents {
    let mut seen = BTreeSet::new();
    let mut validated = ValidatedEvents::default();

    for event in events {
        if let Err(err) = event.check() {
            warn!(error = %err, "skipping malformed event");
            validated.rejected.push(err);
            continue;
        }
        if !seen.insert(event.id.clone()) {
            let err = EventError::DuplicateId(event.id.clone());
            warn!(error = %err, "skipping duplicate event");
            validated.rejected.push(err);
            continue;
        }
        validated.events.push(event);
    }

    debug!(
        kept = validated.events.len(),
        rejected = validated.rejected.len(),
        "validated events"
    );
    validated
}

/// Events whose days intersect `window`, typically the grid's visible span.
pub fn events_in_window(events: &[CalendarEvent], window: &DayRange) -> Vec<CalendarEvent> {
    events
        .iter()
        .filter(|event| {
            event
                .day_range()
                .is_some_and(|range| range.overlaps(window))
        })
        .cloned()
        .collect()
}
