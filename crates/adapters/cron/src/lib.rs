//! # whoshome-adapter-cron
//!
//! Cron-expression implementation of the cycle gate port. Standard
//! five-field expressions (`min hour dom month dow`) are accepted and
//! normalised by prepending a seconds field; matching truncates the current
//! time to the minute, so an expression covers the whole minute it names.
//!
//! Expressions should be rejected at configuration load via [`validate`].
//! If an invalid expression still reaches the gate it fails closed: the
//! section stays gated and the problem is logged.

use std::borrow::Cow;
use std::str::FromStr;

use chrono::Timelike;
use cron::Schedule;

use whoshome_app::ports::CycleGate;
use whoshome_domain::error::ValidationError;
use whoshome_domain::time::Timestamp;

/// Cron gate over section `cron` expressions.
#[derive(Debug, Clone, Copy, Default)]
pub struct CronGate;

impl CronGate {
    /// Create a new gate.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl CycleGate for CronGate {
    fn permits(&self, expression: &str, now: Timestamp) -> bool {
        match parse(expression) {
            Ok(schedule) => schedule.includes(truncate_to_minute(now)),
            Err(err) => {
                tracing::warn!(
                    %expression,
                    error = %err,
                    "unparsable cron expression, section stays gated"
                );
                false
            }
        }
    }
}

/// Parse a cron expression, accepting the standard five-field form.
///
/// # Errors
///
/// Returns the parser error when the expression is not valid cron syntax.
pub fn parse(expression: &str) -> Result<Schedule, cron::error::Error> {
    Schedule::from_str(&normalise(expression))
}

/// Check an expression at configuration load time.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidCron`] when the expression does not
/// parse.
pub fn validate(expression: &str) -> Result<(), ValidationError> {
    parse(expression)
        .map(drop)
        .map_err(|err| ValidationError::InvalidCron {
            expression: expression.to_owned(),
            reason: err.to_string(),
        })
}

fn normalise(expression: &str) -> Cow<'_, str> {
    if expression.split_whitespace().count() == 5 {
        Cow::Owned(format!("0 {expression}"))
    } else {
        Cow::Borrowed(expression)
    }
}

fn truncate_to_minute(now: Timestamp) -> Timestamp {
    now.with_second(0)
        .and_then(|ts| ts.with_nanosecond(0))
        .unwrap_or(now)
}
