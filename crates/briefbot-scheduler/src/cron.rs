//! Five-field cron expressions evaluated in a fixed timezone.
//! Format: "MIN HOUR DOM MON DOW", no seconds.
//! Each field takes `*`, `*/N`, `N`, `A-B`, `A-B/N` and comma lists of those.
//! Day of week runs 0-7 with both 0 and 7 meaning Sunday. When both day
//! fields are restricted a day matches if either does, as in classic cron.

use briefbot_core::{BriefError, Result};
use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Search horizon for the next fire time.
const HORIZON_DAYS: i64 = 366;

#[derive(Debug, Clone, PartialEq)]
pub struct CronExpr {
    source: String,
    minutes: Vec<u32>,
    hours: Vec<u32>,
    days_of_month: Vec<u32>,
    months: Vec<u32>,
    days_of_week: Vec<u32>,
    dom_any: bool,
    dow_any: bool,
}

impl CronExpr {
    pub fn parse(expression: &str) -> Result<Self> {
        let parts: Vec<&str> = expression.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(BriefError::Config(format!(
                "Invalid cron expression '{expression}' (need 5 fields: MIN HOUR DOM MON DOW)"
            )));
        }
        let field = |idx: usize, min: u32, max: u32| {
            parse_field(parts[idx], min, max).ok_or_else(|| {
                BriefError::Config(format!(
                    "Invalid cron field '{}' in '{expression}' (range {min}-{max})",
                    parts[idx]
                ))
            })
        };

        let mut days_of_week = field(4, 0, 7)?;
        // 7 is Sunday too
        if days_of_week.contains(&7) {
            days_of_week.retain(|d| *d != 7);
            if !days_of_week.contains(&0) {
                days_of_week.insert(0, 0);
            }
        }

        Ok(Self {
            source: expression.to_string(),
            minutes: field(0, 0, 59)?,
            hours: field(1, 0, 23)?,
            days_of_month: field(2, 1, 31)?,
            months: field(3, 1, 12)?,
            days_of_week,
            dom_any: parts[2] == "*",
            dow_any: parts[4] == "*",
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    fn day_matches(&self, date: NaiveDate) -> bool {
        let dom = self.days_of_month.contains(&date.day());
        let dow = self
            .days_of_week
            .contains(&date.weekday().num_days_from_sunday());
        match (self.dom_any, self.dow_any) {
            (true, true) => true,
            (false, true) => dom,
            (true, false) => dow,
            (false, false) => dom || dow,
        }
    }

    /// First fire time strictly after `after`, reading the fields as wall
    /// clock time in `tz`. Wall times skipped by a DST jump never fire.
    pub fn next_after(&self, after: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        let start = after.with_timezone(&tz).naive_local();
        let mut candidate = truncate_to_minute(start) + Duration::minutes(1);
        let limit = candidate + Duration::days(HORIZON_DAYS);

        while candidate <= limit {
            let date = candidate.date();
            if !self.months.contains(&date.month()) {
                candidate = first_of_next_month(date)?;
                continue;
            }
            if !self.day_matches(date) {
                candidate = date.succ_opt()?.and_hms_opt(0, 0, 0)?;
                continue;
            }
            if !self.hours.contains(&candidate.hour()) {
                candidate = truncate_to_hour(candidate) + Duration::hours(1);
                continue;
            }
            if !self.minutes.contains(&candidate.minute()) {
                candidate += Duration::minutes(1);
                continue;
            }

            let fire = match tz.from_local_datetime(&candidate) {
                LocalResult::Single(t) => Some(t),
                LocalResult::Ambiguous(earliest, _) => Some(earliest),
                LocalResult::None => None,
            };
            if let Some(t) = fire {
                let t = t.with_timezone(&Utc);
                if t > after {
                    return Some(t);
                }
            }
            candidate += Duration::minutes(1);
        }
        None
    }
}

/// The fire times of one job, possibly from several expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    exprs: Vec<CronExpr>,
}

impl Schedule {
    pub fn parse_all(expressions: &[String]) -> Result<Self> {
        if expressions.is_empty() {
            return Err(BriefError::Config("Schedule has no cron expressions".into()));
        }
        let exprs = expressions
            .iter()
            .map(|e| CronExpr::parse(e))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { exprs })
    }

    pub fn expressions(&self) -> &[CronExpr] {
        &self.exprs
    }

    /// Earliest fire time across all expressions.
    pub fn next_after(&self, after: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        self.exprs.iter().filter_map(|e| e.next_after(after, tz)).min()
    }
}

fn truncate_to_minute(t: NaiveDateTime) -> NaiveDateTime {
    t.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}

fn truncate_to_hour(t: NaiveDateTime) -> NaiveDateTime {
    truncate_to_minute(t).with_minute(0).unwrap_or(t)
}

fn first_of_next_month(date: NaiveDate) -> Option<NaiveDateTime> {
    let (y, m) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1)?.and_hms_opt(0, 0, 0)
}

/// Parse one field into its sorted matching values.
fn parse_field(field: &str, min: u32, max: u32) -> Option<Vec<u32>> {
    let mut values = Vec::new();
    for part in field.split(',') {
        let part = part.trim();
        let (range, step) = match part.split_once('/') {
            Some((r, s)) => (r, s.parse::<u32>().ok().filter(|n| *n > 0)?),
            None => (part, 1),
        };
        let (lo, hi) = if range == "*" {
            (min, max)
        } else if let Some((a, b)) = range.split_once('-') {
            (a.parse().ok()?, b.parse().ok()?)
        } else {
            let n: u32 = range.parse().ok()?;
            // "N/S" runs from N to the end of the range
            if part.contains('/') { (n, max) } else { (n, n) }
        };
        if lo < min || hi > max || lo > hi {
            return None;
        }
        values.extend((lo..=hi).step_by(step as usize));
    }
    values.sort_unstable();
    values.dedup();
    if values.is_empty() { None } else { Some(values) }
}
