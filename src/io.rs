use crate::model::{ScheduleId, Shift, UserId, UserOverride};
use anyhow::{bail, Context};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use csv::{ReaderBuilder, WriterBuilder};
use std::io::Write;
use std::path::Path;

/// Import de remplacements depuis CSV: header `add_user,remove_user,start,end`
///
/// `start`/`end` en RFC3339, ou une date `YYYY-MM-DD` (minuit UTC ; une date
/// de fin couvre toute la journée).
pub fn import_overrides_csv<P: AsRef<Path>>(
    path: P,
    schedule_id: &ScheduleId,
) -> anyhow::Result<Vec<UserOverride>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut out = Vec::new();
    for (line, rec) in rdr.records().enumerate() {
        let rec = rec?;
        let add = optional_user(rec.get(0));
        let remove = optional_user(rec.get(1));
        if add.is_none() && remove.is_none() {
            bail!("override row {}: add_user or remove_user required", line + 1);
        }
        let (start, _) = parse_point(rec.get(2).context("missing start")?.trim())
            .with_context(|| format!("override row {}: start", line + 1))?;
        let (mut end, end_was_date) = parse_point(rec.get(3).context("missing end")?.trim())
            .with_context(|| format!("override row {}: end", line + 1))?;
        if end_was_date {
            end += Duration::days(1);
        }
        let o = UserOverride::new(schedule_id.clone(), add, remove, start, end)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("override row {}", line + 1))?;
        out.push(o);
    }
    Ok(out)
}

fn optional_user(raw: Option<&str>) -> Option<UserId> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(UserId::new)
}

fn parse_point(raw: &str) -> anyhow::Result<(DateTime<Utc>, bool)> {
    if let Ok(dt) = raw.parse::<DateTime<Utc>>() {
        return Ok((dt, false));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid date/datetime: {raw}"))?;
    let datetime = date
        .and_hms_opt(0, 0, 0)
        .context("invalid midnight conversion")?;
    Ok((Utc.from_utc_datetime(&datetime), true))
}

/// Export CSV des shifts: header `start,end,user_id,minutes`
pub fn export_shifts_csv<P: AsRef<Path>>(path: P, shifts: &[Shift]) -> anyhow::Result<()> {
    let file = std::fs::File::create(path.as_ref())
        .with_context(|| format!("creating {}", path.as_ref().display()))?;
    write_shifts_csv(file, shifts)
}

pub fn write_shifts_csv<W: Write>(out: W, shifts: &[Shift]) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_writer(out);
    w.write_record(["start", "end", "user_id", "minutes"])?;
    for s in shifts {
        let start = s.start.to_rfc3339();
        let end = s.end.to_rfc3339();
        let minutes = s.duration_minutes().to_string();
        w.write_record([
            start.as_str(),
            end.as_str(),
            s.user_id.as_str(),
            minutes.as_str(),
        ])?;
    }
    w.flush()?;
    Ok(())
}
