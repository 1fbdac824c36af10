//! Cron schedule validation.
//!
//! Accepts classic 5-field lines and 6-field lines with a leading seconds
//! field. Anything else is rejected, including 7-field lines with a year.
//! Day-of-week numbers follow Unix cron: 0 is Sunday, 6 is Saturday.

use std::str::FromStr;

use singularity_wire::ScheduleType;

use super::JobError;

/// The only schedule grammar this client submits.
pub const ACCEPTED_SCHEDULE_KIND: ScheduleType = ScheduleType::Cron;

/// Parse a schedule kind name. Only `CRON` (any case) is accepted.
pub fn parse_schedule_kind(value: &str) -> Result<ScheduleType, JobError> {
    match ScheduleType::from_str(value) {
        Ok(kind) if kind == ACCEPTED_SCHEDULE_KIND => Ok(kind),
        _ => Err(JobError::InvalidScheduleKind(value.to_string())),
    }
}

/// Validate a cron line, returning it trimmed.
pub fn validate_cron(expr: &str) -> Result<String, JobError> {
    let trimmed = expr.trim();
    let fields = trimmed.split_whitespace().count();

    if fields != 5 && fields != 6 {
        return Err(JobError::InvalidCronExpression {
            expr: expr.to_string(),
            reason: format!("expected 5 or 6 fields, got {}", fields),
        });
    }

    let mut parts: Vec<String> = trimmed.split_whitespace().map(str::to_string).collect();
    if fields == 5 {
        parts.insert(0, "0".to_string());
    }
    if let Some(day_of_week) = parts.last_mut() {
        *day_of_week = shift_day_of_week(day_of_week).map_err(|reason| JobError::InvalidCronExpression {
            expr: expr.to_string(),
            reason,
        })?;
    }
    let normalized = parts.join(" ");

    cron::Schedule::from_str(&normalized).map_err(|e| JobError::InvalidCronExpression {
        expr: expr.to_string(),
        reason: e.to_string(),
    })?;

    Ok(trimmed.to_string())
}

/// Rewrite a day-of-week field from Unix numbering (0 = Sunday) to the
/// parser's (1 = Sunday). Names and `*` pass through; step values are kept.
fn shift_day_of_week(field: &str) -> Result<String, String> {
    let items = field
        .split(',')
        .map(|item| {
            let (range, step) = match item.split_once('/') {
                Some((range, step)) => (range, Some(step)),
                None => (item, None),
            };
            let range = range
                .split('-')
                .map(shift_day)
                .collect::<Result<Vec<_>, _>>()?
                .join("-");
            Ok(match step {
                Some(step) => format!("{}/{}", range, step),
                None => range,
            })
        })
        .collect::<Result<Vec<String>, String>>()?;
    Ok(items.join(","))
}

fn shift_day(token: &str) -> Result<String, String> {
    match token.parse::<u8>() {
        Ok(day @ 0..=6) => Ok((day + 1).to_string()),
        Ok(day) => Err(format!("day of week {} out of range 0-6", day)),
        Err(_) => Ok(token.to_string()),
    }
}
