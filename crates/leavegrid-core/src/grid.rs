use chrono::{
  Datelike,
  NaiveDate,
  Weekday
};
use serde::Serialize;

use crate::datetime::{
  add_days,
  first_day_of_month,
  start_of_week
};
use crate::interval::DayRange;

pub const DAYS_PER_WEEK: usize = 7;
pub const WEEKS_PER_GRID: usize = 6;
pub const GRID_CELLS: usize =
  DAYS_PER_WEEK * WEEKS_PER_GRID;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
)]
pub struct CalendarCell {
  pub date:              NaiveDate,
  pub in_selected_month: bool
}

/// Six full weeks covering the selected
/// month, padded with overflow days from
/// the neighbouring months.
#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct MonthGrid {
  pub year:       i32,
  pub month:      u32,
  pub week_start: Weekday,
  pub cells:      Vec<CalendarCell>
}

impl MonthGrid {
  #[must_use]
  pub fn first_cell(&self) -> NaiveDate {
    self.cells[0].date
  }

  #[must_use]
  pub fn last_cell(&self) -> NaiveDate {
    self.cells[GRID_CELLS - 1].date
  }

  /// Visible span; also the period to
  /// fetch events for.
  #[must_use]
  pub fn window(&self) -> DayRange {
    DayRange {
      start: self.first_cell(),
      end:   self.last_cell()
    }
  }

  pub fn weeks(
    &self
  ) -> impl Iterator<Item = &[CalendarCell]>
  {
    self.cells.chunks(DAYS_PER_WEEK)
  }

  #[must_use]
  pub fn week_ranges(
    &self
  ) -> Vec<DayRange> {
    self
      .weeks()
      .map(|week| DayRange {
        start: week[0].date,
        end:   week[DAYS_PER_WEEK - 1]
          .date
      })
      .collect()
  }

  pub fn cell(
    &self,
    date: NaiveDate
  ) -> Option<&CalendarCell> {
    let offset = crate::interval::days_between(
      self.first_cell(),
      date
    );
    usize::try_from(offset)
      .ok()
      .and_then(|idx| self.cells.get(idx))
  }
}

/// Builds the 42-cell grid for the month
/// containing `reference`. Starts on the
/// `week_start` day on or before the 1st,
/// so a month beginning on that weekday
/// has no leading overflow row.
#[tracing::instrument(skip_all, fields(reference = %reference))]
#[must_use]
pub fn build_month_grid(
  reference: NaiveDate,
  week_start: Weekday
) -> MonthGrid {
  let year = reference.year();
  let month = reference.month();
  let first =
    first_day_of_month(year, month);
  let grid_start =
    start_of_week(first, week_start);

  let cells = (0..GRID_CELLS as i64)
    .map(|offset| {
      let date =
        add_days(grid_start, offset);
      CalendarCell {
        date,
        in_selected_month: date.year()
          == year
          && date.month() == month
      }
    })
    .collect::<Vec<_>>();

  tracing::debug!(
    year,
    month,
    first_cell = %grid_start,
    last_cell = %cells[GRID_CELLS - 1].date,
    "built month grid"
  );

  MonthGrid {
    year,
    month,
    week_start,
    cells
  }
}
