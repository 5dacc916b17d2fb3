use std::io::{self, IsTerminal, Write};

use chrono::{Datelike, Weekday};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::config::Config;
use crate::grid::{CalendarCell, DAYS_PER_WEEK, MonthGrid};
use crate::layout::{DayEvents, LanePlacement, MonthLayout, WeekLayout};

const GRID_COLUMN_WIDTH: usize = 5;
const LAYOUT_COLUMN_WIDTH: usize = 14;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> Self {
        Self { color: cfg.color }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip_all)]
    pub fn print_grid(&self, grid: &MonthGrid) -> anyhow::Result<()> {
        self.write_grid(io::stdout().lock(), grid)
    }

    #[tracing::instrument(skip_all)]
    pub fn print_layout(&self, layout: &MonthLayout<'_>) -> anyhow::Result<()> {
        self.write_layout(io::stdout().lock(), layout)
    }

    pub fn print_json<T: serde::Serialize>(&self, value: &T) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        serde_json::to_writer_pretty(&mut out, value)?;
        writeln!(out)?;
        Ok(())
    }

    pub fn write_grid<W: Write>(&self, mut out: W, grid: &MonthGrid) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint(&month_title(grid), "1"))?;
        write_weekday_header(&mut out, grid.week_start, GRID_COLUMN_WIDTH)?;

        for week in grid.weeks() {
            let line = week
                .iter()
                .map(|cell| self.day_label(cell, GRID_COLUMN_WIDTH))
                .collect::<String>();
            writeln!(out, "{}", line.trim_end())?;
        }
        Ok(())
    }

    pub fn write_layout<W: Write>(
        &self,
        mut out: W,
        layout: &MonthLayout<'_>,
    ) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint(&month_title(&layout.grid), "1"))?;
        write_weekday_header(&mut out, layout.grid.week_start, LAYOUT_COLUMN_WIDTH)?;

        for (week, days) in layout.weeks.iter().zip(layout.days.chunks(DAYS_PER_WEEK)) {
            let dates = days
                .iter()
                .map(|day| {
                    self.day_label(
                        &CalendarCell {
                            date: day.date,
                            in_selected_month: day.in_selected_month,
                        },
                        LAYOUT_COLUMN_WIDTH,
                    )
                })
                .collect::<String>();
            writeln!(out, "{}", dates.trim_end())?;

            for lane in 0..week.lane_count {
                writeln!(out, "{}", self.lane_line(week, lane).trim_end())?;
            }

            for line in day_list_lines(days) {
                writeln!(out, "{}", line.trim_end())?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    fn day_label(&self, cell: &CalendarCell, width: usize) -> String {
        let label = fit(&format!("{:>2}", cell.date.day()), width);
        if cell.in_selected_month {
            label
        } else {
            self.paint(&label, "2")
        }
    }

    fn lane_line(&self, week: &WeekLayout<'_>, lane: usize) -> String {
        let mut banners = week
            .placements
            .iter()
            .filter(|placement| placement.lane == lane)
            .collect::<Vec<_>>();
        banners.sort_by_key(|placement| placement.first_column);

        let mut line = String::new();
        let mut column = 0;
        for placement in banners {
            let gap = placement.first_column.saturating_sub(column);
            line.push_str(&" ".repeat(gap * LAYOUT_COLUMN_WIDTH));
            let text = fit(
                &banner_text(placement),
                placement.columns * LAYOUT_COLUMN_WIDTH,
            );
            line.push_str(&self.paint(&text, "7"));
            column = placement.first_column + placement.columns;
        }
        line
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn month_title(grid: &MonthGrid) -> String {
    let name = chrono::Month::try_from(grid.month as u8)
        .map(|month| month.name())
        .unwrap_or("?");
    format!("{name} {}", grid.year)
}

fn write_weekday_header<W: Write>(out: &mut W, week_start: Weekday, width: usize) -> anyhow::Result<()> {
    let mut day = week_start;
    let mut line = String::new();
    for _ in 0..DAYS_PER_WEEK {
        line.push_str(&fit(&format!("{day}"), width));
        day = day.succ();
    }
    writeln!(out, "{}", line.trim_end())?;
    Ok(())
}

fn banner_text(placement: &LanePlacement<'_>) -> String {
    let open = if placement.continues_before { '<' } else { '[' };
    let close = if placement.continues_after { '>' } else { ']' };
    format!("{open}{}{close}", placement.event.title)
}

fn day_list_lines(days: &[DayEvents<'_>]) -> Vec<String> {
    let rows = days
        .iter()
        .map(|day| day.visible.len() + usize::from(day.overflow > 0))
        .max()
        .unwrap_or(0);

    (0..rows)
        .map(|row| {
            days.iter()
                .map(|day| {
                    let text = if let Some(event) = day.visible.get(row) {
                        format!("- {}", event.title)
                    } else if row == day.visible.len() {
                        day.overflow_label().unwrap_or_default()
                    } else {
                        String::new()
                    };
                    fit(&text, LAYOUT_COLUMN_WIDTH)
                })
                .collect::<String>()
        })
        .collect()
}

/// Truncates to `width - 1` display columns (with an ellipsis) and pads to `width`.
fn fit(text: &str, width: usize) -> String {
    let budget = width.saturating_sub(1);
    let mut out = String::new();
    let mut used = 0;

    if UnicodeWidthStr::width(text) <= budget {
        out.push_str(text);
        used = UnicodeWidthStr::width(text);
    } else {
        for ch in text.chars() {
            let w = UnicodeWidthChar::width(ch).unwrap_or(0);
            if used + w + 1 > budget {
                break;
            }
            out.push(ch);
            used += w;
        }
        out.push('…');
        used += 1;
    }

    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Weekday};

    use super::*;
    use crate::event::CalendarEvent;
    use crate::grid::build_month_grid;
    use crate::layout::{LayoutOptions, layout_month};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn fit_pads_and_truncates_by_display_width() {
        assert_eq!(fit("ab", 5), "ab   ");
        assert_eq!(fit("abcdefgh", 5), "abc… ");
        assert_eq!(UnicodeWidthStr::width(fit("休暇申請の承認", 8).as_str()), 8);
    }

    #[test]
    fn grid_output_has_header_and_six_weeks() {
        let grid = build_month_grid(ymd(2024, 2, 1), Weekday::Sun);
        let mut buf = Vec::new();
        Renderer::plain().write_grid(&mut buf, &grid).expect("render grid");
        let text = String::from_utf8(buf).expect("utf8");
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "February 2024");
        assert!(lines[1].starts_with("Sun"));
        assert_eq!(lines.len(), 8);
        assert!(lines[2].starts_with("28"));
        assert!(lines[7].trim_end().ends_with('9'));
    }

    #[test]
    fn layout_output_shows_banners_and_overflow() {
        let day = |d: u32| ymd(2024, 1, d).and_hms_opt(9, 0, 0).expect("time");
        let mut events = vec![CalendarEvent::new(1_u64, "Vacation", day(1), day(3))];
        for id in 2_u64..=6 {
            events.push(CalendarEvent::new(id, format!("Mtg {id}"), day(10), day(10)));
        }
        let grid = build_month_grid(ymd(2024, 1, 1), Weekday::Sun);
        let layout = layout_month(&grid, &events, &LayoutOptions::default());

        let mut buf = Vec::new();
        Renderer::plain().write_layout(&mut buf, &layout).expect("render layout");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.contains("[Vacation]"));
        assert!(text.contains("- Mtg 2"));
        assert!(!text.contains("- Mtg 5"));
        assert!(text.contains("+2 more"));
    }
}
