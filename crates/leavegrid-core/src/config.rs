use std::collections::BTreeMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono::Weekday;
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::{
  debug,
  info,
  warn
};

use crate::datetime::{
  parse_timezone,
  parse_week_start
};
use crate::layout::{
  DEFAULT_MAX_VISIBLE_PER_DAY,
  LayoutOptions
};
use crate::permissions::RoleTable;

pub const CONFIG_ENV_VAR: &str =
  "LEAVEGRID_CONFIG";
const CONFIG_DIR_NAME: &str =
  "leavegrid";
const CONFIG_FILE_NAME: &str =
  "leavegrid.toml";

#[derive(
  Debug, Clone, PartialEq, Deserialize,
)]
#[serde(deny_unknown_fields)]
pub struct Config {
  #[serde(default)]
  pub timezone:     Option<String>,
  #[serde(default = "config_true")]
  pub color:        bool,
  #[serde(default)]
  pub calendar:     CalendarSettings,
  #[serde(default)]
  pub roles:
    BTreeMap<String, Vec<String>>,
  #[serde(skip)]
  pub loaded_files: Vec<PathBuf>
}

#[derive(
  Debug, Clone, PartialEq, Deserialize,
)]
#[serde(deny_unknown_fields)]
pub struct CalendarSettings {
  #[serde(
    default = "default_week_start"
  )]
  pub week_start:          String,
  #[serde(
    default = "default_max_visible_per_day"
  )]
  pub max_visible_per_day: usize
}

impl Default for CalendarSettings {
  fn default() -> Self {
    Self {
      week_start: default_week_start(),
      max_visible_per_day:
        default_max_visible_per_day()
    }
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      timezone:     None,
      color:        true,
      calendar:
        CalendarSettings::default(),
      roles:        BTreeMap::new(),
      loaded_files: vec![]
    }
  }
}

fn config_true() -> bool {
  true
}

fn default_week_start() -> String {
  "sunday".to_string()
}

fn default_max_visible_per_day() -> usize
{
  DEFAULT_MAX_VISIBLE_PER_DAY
}

impl Config {
  #[tracing::instrument(skip(
    override_path
  ))]
  pub fn load(
    override_path: Option<&Path>
  ) -> anyhow::Result<Self> {
    let Some(path) =
      resolve_config_path(override_path)
    else {
      warn!(
        "no leavegrid.toml found; \
         using defaults"
      );
      return Ok(Self::default());
    };

    info!(config = %path.display(), "loading config");
    let path = expand_tilde(&path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    let mut cfg = Self::from_toml_str(
      &text,
      &path.display().to_string()
    )?;
    cfg.loaded_files.push(path);
    Ok(cfg)
  }

  pub fn from_toml_str(
    raw: &str,
    source: &str
  ) -> anyhow::Result<Self> {
    let mut cfg =
      toml::from_str::<Config>(raw)
        .with_context(|| {
          format!(
            "failed parsing config \
             {source}"
          )
        })?;
    cfg.sanitize();
    Ok(cfg)
  }

  /// Applies `key=value` overrides on
  /// top of the loaded file.
  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) -> anyhow::Result<()>
  where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k.trim();
      let value = v.trim();
      debug!(key = %key, value = %value, "applying override");

      match key {
        | "timezone" => {
          self.timezone =
            Some(value.to_string());
        }
        | "color" => {
          self.color = parse_bool(value);
        }
        | "calendar.week_start" => {
          self.calendar.week_start =
            value.to_string();
        }
        | "calendar.max_visible_per_day" => {
          self
            .calendar
            .max_visible_per_day = value
            .parse()
            .with_context(|| {
              format!(
                "invalid {key}: {value}"
              )
            })?;
        }
        | other => {
          let Some(role) =
            other.strip_prefix("roles.")
          else {
            return Err(anyhow!(
              "unknown config key: \
               {other}"
            ));
          };
          let codes = value
            .split(',')
            .map(str::trim)
            .filter(|code| {
              !code.is_empty()
            })
            .map(str::to_string)
            .collect();
          self
            .roles
            .insert(role.to_string(), codes);
        }
      }
    }

    self.sanitize();
    Ok(())
  }

  fn sanitize(&mut self) {
    if parse_week_start(
      &self.calendar.week_start
    )
    .is_none()
    {
      warn!(
        week_start = %self.calendar.week_start,
        "unsupported week start; using sunday"
      );
      self.calendar.week_start =
        default_week_start();
    }

    if self.calendar.max_visible_per_day
      == 0
    {
      self.calendar.max_visible_per_day =
        default_max_visible_per_day();
    }
  }

  #[must_use]
  pub fn week_start(&self) -> Weekday {
    parse_week_start(
      &self.calendar.week_start
    )
    .unwrap_or(Weekday::Sun)
  }

  /// Configured timezone, UTC when
  /// unset or invalid.
  #[must_use]
  pub fn timezone(&self) -> Tz {
    self
      .timezone
      .as_deref()
      .and_then(|raw| {
        parse_timezone(raw, "config")
      })
      .unwrap_or(chrono_tz::UTC)
  }

  #[must_use]
  pub fn layout_options(
    &self
  ) -> LayoutOptions {
    LayoutOptions {
      max_visible_per_day: self
        .calendar
        .max_visible_per_day
    }
  }

  #[must_use]
  pub fn role_table(&self) -> RoleTable {
    RoleTable::from_config(&self.roles)
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_config_path(
  override_path: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = override_path {
    return Some(path.to_path_buf());
  }

  if let Ok(raw) =
    std::env::var(CONFIG_ENV_VAR)
  {
    let trimmed = raw.trim();
    if trimmed == "/dev/null" {
      return None;
    }
    if !trimmed.is_empty() {
      return Some(PathBuf::from(
        trimmed
      ));
    }
  }

  let candidate = dirs::config_dir()?
    .join(CONFIG_DIR_NAME)
    .join(CONFIG_FILE_NAME);
  if candidate.exists() {
    return Some(candidate);
  }

  debug!(candidate = %candidate.display(), "default config file missing");
  None
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use chrono::Weekday;

  use super::Config;

  #[test]
  fn defaults_apply_to_missing_sections()
  {
    let cfg = Config::from_toml_str(
      "", "inline"
    )
    .expect("empty config");
    assert_eq!(
      cfg.week_start(),
      Weekday::Sun
    );
    assert_eq!(
      cfg
        .layout_options()
        .max_visible_per_day,
      3
    );
    assert!(cfg.color);
    assert_eq!(
      cfg.timezone(),
      chrono_tz::UTC
    );
  }

  #[test]
  fn sanitize_repairs_bad_values() {
    let cfg = Config::from_toml_str(
      r#"
timezone = "Not/AZone"

[calendar]
week_start = "wednesday"
max_visible_per_day = 0
"#,
      "inline"
    )
    .expect("parse config");
    assert_eq!(
      cfg.calendar.week_start,
      "sunday"
    );
    assert_eq!(
      cfg.calendar.max_visible_per_day,
      3
    );
    assert_eq!(
      cfg.timezone(),
      chrono_tz::UTC
    );
  }

  #[test]
  fn overrides_replace_file_values() {
    let mut cfg = Config::from_toml_str(
      r#"
[calendar]
week_start = "monday"
max_visible_per_day = 5
"#,
      "inline"
    )
    .expect("parse config");
    cfg
      .apply_overrides([
        (
          "calendar.week_start"
            .to_string(),
          "sun".to_string()
        ),
        (
          "calendar.max_visible_per_day"
            .to_string(),
          "2".to_string()
        ),
        (
          "roles.hr".to_string(),
          "vacation.approve, dues.edit"
            .to_string()
        ),
        (
          "color".to_string(),
          "off".to_string()
        )
      ])
      .expect("apply overrides");
    assert_eq!(
      cfg.week_start(),
      Weekday::Sun
    );
    assert_eq!(
      cfg.calendar.max_visible_per_day,
      2
    );
    assert!(!cfg.color);
    assert_eq!(
      cfg
        .role_table()
        .permissions("hr")
        .len(),
      2
    );
  }

  #[test]
  fn unknown_file_key_is_an_error() {
    let err = Config::from_toml_str(
      r#"
[calendar]
max_visible_per_dy = 5
"#,
      "inline"
    )
    .expect_err("unknown key");
    assert!(
      format!("{err:#}")
        .contains("max_visible_per_dy")
    );
  }

  #[test]
  fn unknown_override_key_is_an_error()
  {
    let mut cfg = Config::default();
    let err = cfg
      .apply_overrides([(
        "calendar.colour".to_string(),
        "red".to_string()
      )])
      .expect_err("unknown key");
    assert!(
      err
        .to_string()
        .contains("calendar.colour")
    );
  }

  #[test]
  fn load_reads_explicit_file() {
    let mut file =
      tempfile::NamedTempFile::new()
        .expect("temp file");
    writeln!(
      file,
      "timezone = \"Europe/Madrid\"\n\n[roles]\nadmin = [\"notice.publish\"]"
    )
    .expect("write config");

    let cfg =
      Config::load(Some(file.path()))
        .expect("load config");
    assert_eq!(
      cfg.timezone(),
      chrono_tz::Europe::Madrid
    );
    assert_eq!(cfg.loaded_files.len(), 1);
    assert!(
      !cfg
        .role_table()
        .permissions("admin")
        .is_empty()
    );
  }
}
