use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, trace};

use crate::event::{CalendarEvent, EventId};
use crate::grid::{CalendarCell, MonthGrid};
use crate::interval::{DayRange, days_between};

pub const DEFAULT_MAX_VISIBLE_PER_DAY: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutOptions {
    /// Single-day events shown per cell before the rest collapse into "+N more".
    pub max_visible_per_day: usize,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            max_visible_per_day: DEFAULT_MAX_VISIBLE_PER_DAY,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PartitionedEvents<'a> {
    pub single_day: Vec<&'a CalendarEvent>,
    pub multi_day: Vec<&'a CalendarEvent>,
}

/// A multi-day event's banner within one week row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanePlacement<'a> {
    pub event: &'a CalendarEvent,
    pub lane: usize,
    /// The event's days clamped to the week.
    pub span: DayRange,
    pub first_column: usize,
    pub columns: usize,
    pub continues_before: bool,
    pub continues_after: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekLayout<'a> {
    pub index: usize,
    pub range: DayRange,
    pub lane_count: usize,
    pub placements: Vec<LanePlacement<'a>>,
}

impl WeekLayout<'_> {
    pub fn lane_of(&self, id: &EventId) -> Option<usize> {
        self.placements
            .iter()
            .find(|placement| &placement.event.id == id)
            .map(|placement| placement.lane)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayEvents<'a> {
    pub date: NaiveDate,
    pub in_selected_month: bool,
    pub visible: Vec<&'a CalendarEvent>,
    pub overflow: usize,
}

impl DayEvents<'_> {
    #[must_use]
    pub fn total(&self) -> usize {
        self.visible.len() + self.overflow
    }

    pub fn overflow_label(&self) -> Option<String> {
        (self.overflow > 0).then(|| format!("+{} more", self.overflow))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthLayout<'a> {
    pub grid: MonthGrid,
    pub weeks: Vec<WeekLayout<'a>>,
    pub days: Vec<DayEvents<'a>>,
}

impl<'a> MonthLayout<'a> {
    pub fn lane_of(&self, week: usize, id: &EventId) -> Option<usize> {
        self.weeks.get(week).and_then(|layout| layout.lane_of(id))
    }

    /// Lane per (week row, event id).
    pub fn positions(&self) -> BTreeMap<(usize, EventId), usize> {
        self.weeks
            .iter()
            .flat_map(|week| {
                week.placements
                    .iter()
                    .map(move |placement| ((week.index, placement.event.id.clone()), placement.lane))
            })
            .collect()
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DayEvents<'a>> {
        let offset = days_between(self.grid.first_cell(), date);
        usize::try_from(offset).ok().and_then(|idx| self.days.get(idx))
    }
}

/// Splits events by whether they start and end on the same calendar day.
pub fn partition_events(events: &[CalendarEvent]) -> PartitionedEvents<'_> {
    let mut partitioned = PartitionedEvents::default();
    for event in events {
        debug_assert!(
            event.check().is_ok(),
            "malformed event {} reached the layout engine",
            event.id
        );
        if event.day_range().is_none() {
            continue;
        }
        if event.is_single_day() {
            partitioned.single_day.push(event);
        } else {
            partitioned.multi_day.push(event);
        }
    }
    partitioned
}

/// First-fit lane packing for one week row.
///
/// Events intersecting `week` are ordered by start day, then longer events
/// first, then id; equal keys keep input order. Each event takes the lowest
/// lane whose occupied spans in this week do not overlap its own (inclusive),
/// so the lanes in use are always `0..lane_count`.
pub fn assign_week_lanes<'a>(
    index: usize,
    week: DayRange,
    multi_day: &[&'a CalendarEvent],
) -> WeekLayout<'a> {
    let mut candidates = multi_day
        .iter()
        .filter_map(|event| {
            let full = event.day_range()?;
            let span = full.clamp_to(&week)?;
            Some((*event, full, span))
        })
        .collect::<Vec<_>>();

    candidates.sort_by(|(a, a_full, _), (b, b_full, _)| {
        a_full
            .start
            .cmp(&b_full.start)
            .then_with(|| b_full.len_days().cmp(&a_full.len_days()))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut lanes: Vec<Vec<DayRange>> = Vec::new();
    let mut placements = Vec::with_capacity(candidates.len());

    for (event, full, span) in candidates {
        let lane = first_free_lane(&lanes, &span);
        if lane == lanes.len() {
            lanes.push(Vec::new());
        }
        lanes[lane].push(span);

        let first_column = usize::try_from(days_between(week.start, span.start)).unwrap_or(0);
        let columns = usize::try_from(span.len_days()).unwrap_or(0);
        trace!(
            week = index,
            id = %event.id,
            lane,
            first_column,
            columns,
            "placed multi-day event"
        );

        placements.push(LanePlacement {
            event,
            lane,
            span,
            first_column,
            columns,
            continues_before: full.start < week.start,
            continues_after: full.end > week.end,
        });
    }

    WeekLayout {
        index,
        range: week,
        lane_count: lanes.len(),
        placements,
    }
}

fn first_free_lane(lanes: &[Vec<DayRange>], span: &DayRange) -> usize {
    lanes
        .iter()
        .position(|occupied| !occupied.iter().any(|taken| taken.overlaps(span)))
        .unwrap_or(lanes.len())
}

/// Single-day events on `cell`, ordered by start time then id, capped at `max_visible`.
pub fn collect_day_events<'a>(
    cell: &CalendarCell,
    single_day: &[&'a CalendarEvent],
    max_visible: usize,
) -> DayEvents<'a> {
    let mut on_day = single_day
        .iter()
        .copied()
        .filter(|event| event.start_day() == cell.date)
        .collect::<Vec<_>>();
    on_day.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));

    let overflow = on_day.len().saturating_sub(max_visible);
    on_day.truncate(max_visible);

    DayEvents {
        date: cell.date,
        in_selected_month: cell.in_selected_month,
        visible: on_day,
        overflow,
    }
}

/// Lays out `events` on `grid`. Each week row is packed independently, so a
/// long event may sit in different lanes in different weeks.
#[tracing::instrument(skip_all, fields(year = grid.year, month = grid.month, events = events.len()))]
pub fn layout_month<'a>(
    grid: &MonthGrid,
    events: &'a [CalendarEvent],
    options: &LayoutOptions,
) -> MonthLayout<'a> {
    let partitioned = partition_events(events);

    let weeks = grid
        .week_ranges()
        .into_iter()
        .enumerate()
        .map(|(index, week)| assign_week_lanes(index, week, &partitioned.multi_day))
        .collect::<Vec<_>>();

    let days = grid
        .cells
        .iter()
        .map(|cell| collect_day_events(cell, &partitioned.single_day, options.max_visible_per_day))
        .collect::<Vec<_>>();

    debug!(
        single_day = partitioned.single_day.len(),
        multi_day = partitioned.multi_day.len(),
        max_lanes = weeks.iter().map(|w| w.lane_count).max().unwrap_or(0),
        hidden = days.iter().map(|d| d.overflow).sum::<usize>(),
        "laid out month"
    );

    MonthLayout {
        grid: grid.clone(),
        weeks,
        days,
    }
}
