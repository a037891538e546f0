use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  LocalResult,
  NaiveDate,
  TimeZone,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;

use crate::config::Config;

const TIMEZONE_ENV_VAR: &str =
  "TASKFLOW_TIMEZONE";
const DEFAULT_TIMEZONE: &str = "UTC";

/// Resolves the zone in which due dates
/// start. `TASKFLOW_TIMEZONE` wins over
/// the `timezone` config key.
pub fn resolve_timezone(
  cfg: &Config
) -> Tz {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) =
      parse_timezone(&raw, TIMEZONE_ENV_VAR)
  {
    return tz;
  }

  if let Some(raw) = cfg.get("timezone")
    && let Some(tz) =
      parse_timezone(&raw, "config")
  {
    return tz;
  }

  parse_timezone(
    DEFAULT_TIMEZONE,
    "DEFAULT_TIMEZONE"
  )
  .unwrap_or(chrono_tz::UTC)
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::debug!(
        source,
        timezone = %trimmed,
        "configured due-date timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::warn!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

/// The moment a due date begins: local
/// midnight in `tz`, as UTC.
#[must_use]
pub fn due_instant(
  date: NaiveDate,
  tz: &Tz
) -> Option<DateTime<Utc>> {
  let midnight =
    date.and_hms_opt(0, 0, 0)?;
  match tz.from_local_datetime(&midnight)
  {
    | LocalResult::Single(dt) => {
      Some(dt.with_timezone(&Utc))
    }
    | LocalResult::Ambiguous(
      first,
      second
    ) => {
      let chosen = if first <= second {
        first
      } else {
        second
      };
      Some(chosen.with_timezone(&Utc))
    }
    | LocalResult::None => {
      // midnight skipped by a DST jump
      let one_am =
        date.and_hms_opt(1, 0, 0)?;
      tz.from_local_datetime(&one_am)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
    }
  }
}

#[must_use]
pub fn today_in(
  now: DateTime<Utc>,
  tz: &Tz
) -> NaiveDate {
  now.with_timezone(tz).date_naive()
}

#[must_use]
pub fn format_due(
  date: NaiveDate
) -> String {
  date.format("%Y-%m-%d").to_string()
}

/// Parses a due-date expression relative
/// to `today`. `Ok(None)` clears the
/// date.
#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_due_date(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<Option<NaiveDate>> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  let offset_days = match lower.as_str()
  {
    | "" | "none" | "-" => {
      return Ok(None);
    }
    | "today" => Some(0),
    | "tomorrow" => Some(1),
    | "yesterday" => Some(-1),
    | _ => relative_offset(&lower)?
  };
  if let Some(days) = offset_days {
    return Duration::try_days(days)
      .and_then(|shift| {
        today.checked_add_signed(shift)
      })
      .map(Some)
      .ok_or_else(|| {
        anyhow!(
          "date out of range: {input}"
        )
      });
  }

  if let Ok(weekday) =
    lower.parse::<Weekday>()
  {
    return Ok(Some(next_weekday(
      today, weekday
    )));
  }

  NaiveDate::parse_from_str(
    token, "%Y-%m-%d"
  )
  .map(Some)
  .map_err(|_| {
    anyhow!(
      "unrecognized date: {input}"
    )
  })
  .context(
    "use today, tomorrow, \
     yesterday, a weekday name, \
     +Nd, -Nd, +Nw, YYYY-MM-DD or \
     none"
  )
}

/// `+3d`, `-1d`, `+2w` as a signed
/// day count.
fn relative_offset(
  token: &str
) -> anyhow::Result<Option<i64>> {
  let re = Regex::new(
    r"^([+-])(\d+)([dw])$"
  )?;
  let Some(caps) = re.captures(token)
  else {
    return Ok(None);
  };

  let amount: i64 = caps[2]
    .parse()
    .with_context(|| {
      format!(
        "offset too large: {token}"
      )
    })?;
  let per_unit =
    if &caps[3] == "w" { 7 } else { 1 };
  let sign =
    if &caps[1] == "-" { -1 } else { 1 };

  amount
    .checked_mul(per_unit * sign)
    .map(Some)
    .ok_or_else(|| {
      anyhow!(
        "offset too large: {token}"
      )
    })
}

/// The next `target` strictly after
/// `from`; a week out when they match.
fn next_weekday(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let ahead = (7
    + target.num_days_from_monday()
    - from
      .weekday()
      .num_days_from_monday())
    % 7;
  let ahead =
    if ahead == 0 { 7 } else { ahead };
  from
    .checked_add_signed(Duration::days(
      i64::from(ahead)
    ))
    .unwrap_or(from)
}
