use logos::Logos;
use std::{fmt, str::FromStr, time};
use thiserror::Error;

/// A human readable span of time, e.g. `500ms` or `1s 200ms`.
///
/// Used to configure periodic drivers and to display latencies.
///
/// ```
/// # use flowsim_core::Interval;
/// # use std::time::Duration;
/// let interval: Interval = "1s 250ms".parse().unwrap();
/// assert_eq!(interval.into_duration(), Duration::from_millis(1_250));
/// assert_eq!(interval.to_string(), "1.25s");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Interval(time::Duration);

/// Error returned when parsing an [`Interval`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntervalParseError {
    #[error("empty interval")]
    Empty,
    #[error("unexpected token at `{0}'")]
    UnexpectedToken(String),
    #[error("expected a unit after `{0}'")]
    MissingUnit(String),
    #[error("number `{0}' is out of range")]
    OutOfRange(String),
}

impl Interval {
    pub const ZERO: Self = Self(time::Duration::ZERO);

    #[inline]
    pub const fn new(duration: time::Duration) -> Self {
        Self(duration)
    }

    #[inline]
    pub const fn into_duration(self) -> time::Duration {
        self.0
    }
}

impl From<time::Duration> for Interval {
    fn from(value: time::Duration) -> Self {
        Self(value)
    }
}

impl From<Interval> for time::Duration {
    fn from(value: Interval) -> Self {
        value.0
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <time::Duration as fmt::Debug>::fmt(&self.0, f)
    }
}

impl FromStr for Interval {
    type Err = IntervalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lex = Unit::lexer(s);
        let mut total = time::Duration::ZERO;
        let mut any = false;

        while let Some(token) = lex.next() {
            let slice = lex.slice().to_owned();
            if token != Ok(Unit::Value) {
                return Err(IntervalParseError::UnexpectedToken(slice));
            }
            let number: u64 = slice
                .parse()
                .map_err(|_| IntervalParseError::OutOfRange(slice.clone()))?;

            let span = match lex.next() {
                Some(Ok(Unit::NanoSeconds)) => time::Duration::from_nanos(number),
                Some(Ok(Unit::MicroSeconds)) => time::Duration::from_micros(number),
                Some(Ok(Unit::MilliSeconds)) => time::Duration::from_millis(number),
                Some(Ok(Unit::Seconds)) => time::Duration::from_secs(number),
                Some(Ok(Unit::Minutes)) => number
                    .checked_mul(60)
                    .map(time::Duration::from_secs)
                    .ok_or(IntervalParseError::OutOfRange(slice))?,
                _ => return Err(IntervalParseError::MissingUnit(slice)),
            };
            total = total
                .checked_add(span)
                .ok_or_else(|| IntervalParseError::OutOfRange(s.to_owned()))?;
            any = true;
        }

        if !any {
            return Err(IntervalParseError::Empty);
        }
        Ok(Self(total))
    }
}

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\n\f]+")]
enum Unit {
    #[token("ns")]
    NanoSeconds,
    #[regex("us|µs|μs")]
    MicroSeconds,
    #[token("ms")]
    MilliSeconds,
    #[token("s")]
    Seconds,
    #[token("m")]
    Minutes,

    #[regex("[0-9]+")]
    Value,
}
