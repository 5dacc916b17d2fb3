use anyhow::{
  Context,
  anyhow
};
use chrono::NaiveDate;
use tracing::{
  debug,
  info,
  warn
};

use crate::cli::{
  CanArgs,
  Command,
  LayoutArgs,
  MonthArg
};
use crate::config::Config;
use crate::datetime::{
  parse_month_expr,
  today_in_timezone
};
use crate::grid::build_month_grid;
use crate::layout::layout_month;
use crate::permissions::PermissionCode;
use crate::render::Renderer;
use crate::source::{
  events_in_window,
  load_events,
  validate_events
};

#[tracing::instrument(skip_all)]
pub fn dispatch(
  cfg: &Config,
  renderer: &Renderer,
  command: Command
) -> anyhow::Result<()> {
  match command {
    | Command::Grid(month) => {
      cmd_grid(cfg, renderer, &month)
    }
    | Command::Layout(args) => {
      cmd_layout(cfg, renderer, &args)
    }
    | Command::Can(args) => {
      cmd_can(cfg, &args)
    }
  }
}

fn resolve_month(
  cfg: &Config,
  month: &MonthArg
) -> anyhow::Result<NaiveDate> {
  let today =
    today_in_timezone(cfg.timezone());
  let reference =
    parse_month_expr(&month.month, today)
      .with_context(|| {
        format!(
          "invalid month argument: {}",
          month.month
        )
      })?;
  debug!(%today, %reference, "resolved month");
  Ok(reference)
}

fn cmd_grid(
  cfg: &Config,
  renderer: &Renderer,
  month: &MonthArg
) -> anyhow::Result<()> {
  let reference =
    resolve_month(cfg, month)?;
  let grid = build_month_grid(
    reference,
    cfg.week_start()
  );
  renderer.print_grid(&grid)
}

fn cmd_layout(
  cfg: &Config,
  renderer: &Renderer,
  args: &LayoutArgs
) -> anyhow::Result<()> {
  let reference =
    resolve_month(cfg, &args.month)?;
  let grid = build_month_grid(
    reference,
    cfg.week_start()
  );

  let loaded = load_events(&args.events)?;
  let validated = validate_events(loaded);
  if !validated.rejected.is_empty() {
    warn!(
      rejected = validated.rejected.len(),
      "some events were skipped"
    );
  }
  let visible = events_in_window(
    &validated.events,
    &grid.window()
  );

  let mut options = cfg.layout_options();
  if let Some(max) = args.max_visible {
    if max == 0 {
      return Err(anyhow!(
        "--max-visible must be at \
         least 1"
      ));
    }
    options.max_visible_per_day = max;
  }

  let layout =
    layout_month(&grid, &visible, &options);
  info!(
    events = visible.len(),
    weeks = layout.weeks.len(),
    "month laid out"
  );

  if args.json {
    renderer.print_json(&layout)
  } else {
    renderer.print_layout(&layout)
  }
}

fn cmd_can(
  cfg: &Config,
  args: &CanArgs
) -> anyhow::Result<()> {
  let perms =
    cfg.role_table().permissions(&args.role);
  let wanted = args
    .codes
    .iter()
    .map(|code| PermissionCode::new(code))
    .collect::<Vec<_>>();

  let missing = wanted
    .iter()
    .filter(|code| !perms.has(code))
    .map(PermissionCode::to_string)
    .collect::<Vec<_>>();

  if missing.is_empty() {
    println!(
      "role {} holds {}",
      args.role,
      args.codes.join(", ")
    );
    return Ok(());
  }

  Err(anyhow!(
    "role {} lacks {}",
    args.role,
    missing.join(", ")
  ))
}
