use std::io::Write;

use chrono::{NaiveDate, Weekday};
use leavegrid_core::datetime::add_days;
use leavegrid_core::event::{CalendarEvent, EventId};
use leavegrid_core::grid::build_month_grid;
use leavegrid_core::interval::ranges_overlap;
use leavegrid_core::layout::{LayoutOptions, layout_month};
use leavegrid_core::source::{events_in_window, load_events, validate_events};
use tempfile::NamedTempFile;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Deterministic pseudo-random multi-day events around March 2024.
fn scattered_events(seed: u64, count: u64) -> Vec<CalendarEvent> {
    let mut state = seed;
    let mut next = move || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        state >> 33
    };
    let base = ymd(2024, 2, 20);
    (0..count)
        .map(|id| {
            let start = add_days(base, (next() % 45) as i64);
            let end = add_days(start, 1 + (next() % 12) as i64);
            let start = start.and_hms_opt(9, 0, 0).expect("time");
            let end = end.and_hms_opt(17, 0, 0).expect("time");
            CalendarEvent::new(id, format!("leave {id}"), start, end)
        })
        .collect()
}

#[test]
fn overlapping_events_never_share_a_lane_and_lanes_are_contiguous() {
    let grid = build_month_grid(ymd(2024, 3, 1), Weekday::Sun);
    for seed in 1..40 {
        let events = scattered_events(seed, 25);
        let layout = layout_month(&grid, &events, &LayoutOptions::default());

        for week in &layout.weeks {
            for (i, a) in week.placements.iter().enumerate() {
                for b in &week.placements[i + 1..] {
                    if ranges_overlap(a.span.start, a.span.end, b.span.start, b.span.end) {
                        assert_ne!(a.lane, b.lane, "seed {seed} week {}", week.index);
                    }
                }
            }
            for lane in 0..week.lane_count {
                assert!(
                    week.placements.iter().any(|p| p.lane == lane),
                    "seed {seed} week {} has empty lane {lane}",
                    week.index
                );
            }
            assert!(week.placements.iter().all(|p| p.lane < week.lane_count));
        }
    }
}

#[test]
fn layout_is_idempotent() {
    let grid = build_month_grid(ymd(2024, 3, 1), Weekday::Sun);
    let events = scattered_events(7, 30);
    let first = layout_month(&grid, &events, &LayoutOptions::default());
    let second = layout_month(&grid, &events, &LayoutOptions::default());
    assert_eq!(first.positions(), second.positions());
    assert_eq!(first, second);
}

#[test]
fn loads_validates_and_lays_out_event_file() {
    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        r#"{{"id": 1, "title": "Vacation", "start_date": "2024-01-01", "end_date": "2024-01-03", "category": "leave"}}
{{"id": 2, "title": "Training", "start_date": "2024-01-02", "end_date": "2024-01-04"}}
{{"id": 3, "title": "Broken", "start_date": "2024-01-05", "end_date": "2024-01-01"}}

{{"id": "n-1", "title": "Notice", "start_date": "2024-01-10T09:00", "end_date": "2024-01-10T09:00"}}
{{"id": 4, "title": "Old trip", "start_date": "2023-06-01", "end_date": "2023-06-03"}}"#
    )
    .expect("write events");

    let loaded = load_events(file.path()).expect("load events");
    assert_eq!(loaded.len(), 5);

    let validated = validate_events(loaded);
    assert_eq!(validated.rejected.len(), 1);
    assert_eq!(validated.rejected[0].id(), &EventId::Number(3));

    let grid = build_month_grid(ymd(2024, 1, 15), Weekday::Sun);
    let visible = events_in_window(&validated.events, &grid.window());
    assert_eq!(visible.len(), 3);

    let layout = layout_month(&grid, &visible, &LayoutOptions::default());
    assert_eq!(layout.lane_of(0, &EventId::Number(1)), Some(0));
    assert_eq!(layout.lane_of(0, &EventId::Number(2)), Some(1));

    let notice_day = layout.day(ymd(2024, 1, 10)).expect("day in grid");
    assert_eq!(notice_day.visible.len(), 1);
    assert_eq!(notice_day.visible[0].id, EventId::Text("n-1".to_string()));

    let json = serde_json::to_value(&layout).expect("serialize layout");
    assert_eq!(json["days"].as_array().map(Vec::len), Some(42));
    assert_eq!(json["weeks"][0]["placements"][1]["lane"], 1);
}

#[test]
fn loads_event_array_files() {
    let mut file = NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"[{{"id": 10, "start": "2024-02-05", "end": "2024-02-05"}}]"#
    )
    .expect("write events");
    let loaded = load_events(file.path()).expect("load events");
    assert_eq!(loaded.len(), 1);
    assert!(loaded[0].is_single_day());
    assert!(loaded[0].title.is_empty());
}

#[test]
fn malformed_event_file_reports_line() {
    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(file, r#"{{"id": 1, "start_date": "2024-01-01", "end_date": "2024-01-02"}}"#)
        .expect("write");
    writeln!(file, r#"{{"id": 2, "start_date": "yesterday", "end_date": "2024-01-02"}}"#)
        .expect("write");
    let err = load_events(file.path()).expect_err("bad timestamp");
    assert!(format!("{err:#}").contains("line 2"));
}
