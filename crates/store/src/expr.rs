//! Natural-language time expressions
//!
//! Turns strings like `"10 minutes ago"`, `"in 2 days"` or
//! `"1 hour 30 minutes from now"` into absolute instants relative to a
//! reference time. Absolute dates (`2024-01-03`, RFC 3339, stored display
//! strings) are accepted too. Unrecognized input resolves to `None`.

use crate::timestamp::parse_timestamp;
use chrono::{DateTime, Duration, Local, Months};

/// Resolves an expression to an instant, relative to `reference`
pub trait ExpressionParser: Send + Sync {
    fn parse(&self, text: &str, reference: DateTime<Local>) -> Option<DateTime<Local>>;
}

/// Default parser for relative English time expressions
#[derive(Debug, Default, Clone, Copy)]
pub struct NaturalParser;

impl ExpressionParser for NaturalParser {
    fn parse(&self, text: &str, reference: DateTime<Local>) -> Option<DateTime<Local>> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        if let Some(absolute) = parse_timestamp(text) {
            return Some(absolute);
        }

        let lowered = text.to_lowercase().replace(',', " ");
        let tokens: Vec<&str> = lowered.split_whitespace().collect();
        parse_relative(&tokens, reference)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Millisecond,
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Fortnight,
    Month,
    Year,
}

impl Unit {
    fn parse(token: &str) -> Option<Self> {
        let unit = match token {
            "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => Unit::Millisecond,
            "s" | "sec" | "secs" | "second" | "seconds" => Unit::Second,
            "m" | "min" | "mins" | "minute" | "minutes" => Unit::Minute,
            "h" | "hr" | "hrs" | "hour" | "hours" => Unit::Hour,
            "d" | "day" | "days" => Unit::Day,
            "w" | "wk" | "wks" | "week" | "weeks" => Unit::Week,
            "fortnight" | "fortnights" => Unit::Fortnight,
            "mo" | "mos" | "month" | "months" => Unit::Month,
            "y" | "yr" | "yrs" | "year" | "years" => Unit::Year,
            _ => return None,
        };
        Some(unit)
    }
}

/// A parsed sum of spans, split into calendar months and fixed time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Offset {
    months: u32,
    fixed: Duration,
}

impl Default for Offset {
    fn default() -> Self {
        Self {
            months: 0,
            fixed: Duration::zero(),
        }
    }
}

impl Offset {
    fn add(&mut self, amount: u32, unit: Unit) -> Option<()> {
        let amount = i64::from(amount);
        let fixed = match unit {
            Unit::Millisecond => Duration::try_milliseconds(amount)?,
            Unit::Second => Duration::try_seconds(amount)?,
            Unit::Minute => Duration::try_minutes(amount)?,
            Unit::Hour => Duration::try_hours(amount)?,
            Unit::Day => Duration::try_days(amount)?,
            Unit::Week => Duration::try_weeks(amount)?,
            Unit::Fortnight => Duration::try_weeks(amount.checked_mul(2)?)?,
            Unit::Month => {
                self.months = self.months.checked_add(u32::try_from(amount).ok()?)?;
                return Some(());
            }
            Unit::Year => {
                let months = u32::try_from(amount.checked_mul(12)?).ok()?;
                self.months = self.months.checked_add(months)?;
                return Some(());
            }
        };
        self.fixed = self.fixed.checked_add(&fixed)?;
        Some(())
    }

    fn apply(&self, reference: DateTime<Local>, forward: bool) -> Option<DateTime<Local>> {
        let months = Months::new(self.months);
        if forward {
            reference
                .checked_add_months(months)?
                .checked_add_signed(self.fixed)
        } else {
            reference
                .checked_sub_months(months)?
                .checked_sub_signed(self.fixed)
        }
    }
}

fn parse_relative(tokens: &[&str], reference: DateTime<Local>) -> Option<DateTime<Local>> {
    match tokens {
        ["now"] | ["right", "now"] | ["today"] => return Some(reference),
        ["yesterday"] => return reference.checked_sub_signed(Duration::days(1)),
        ["tomorrow"] => return reference.checked_add_signed(Duration::days(1)),
        ["last", unit] => return single_unit(unit, reference, false),
        ["next", unit] => return single_unit(unit, reference, true),
        _ => {}
    }

    let (spans, forward) = match tokens {
        ["in", rest @ ..] => (rest, true),
        [rest @ .., "ago"] => (rest, false),
        [rest @ .., "from", "now"] => (rest, true),
        [rest @ .., "later"] | [rest @ .., "hence"] => (rest, true),
        _ => return None,
    };

    parse_spans(spans)?.apply(reference, forward)
}

fn single_unit(token: &str, reference: DateTime<Local>, forward: bool) -> Option<DateTime<Local>> {
    let mut offset = Offset::default();
    offset.add(1, Unit::parse(token)?)?;
    offset.apply(reference, forward)
}

/// Parse `<amount> <unit>` pairs, optionally joined by "and"
///
/// Compact forms such as `10m` or `2hrs` are split into amount and unit.
fn parse_spans(tokens: &[&str]) -> Option<Offset> {
    let mut expanded: Vec<&str> = Vec::with_capacity(tokens.len() * 2);
    for &token in tokens {
        match token.find(|c: char| !c.is_ascii_digit()) {
            Some(split) if split > 0 => {
                expanded.push(&token[..split]);
                expanded.push(&token[split..]);
            }
            _ => expanded.push(token),
        }
    }

    let mut offset = Offset::default();
    let mut seen = false;
    let mut iter = expanded.into_iter().filter(|t| *t != "and");
    while let Some(token) = iter.next() {
        let amount = parse_amount(token)?;
        let unit = Unit::parse(iter.next()?)?;
        offset.add(amount, unit)?;
        seen = true;
    }

    seen.then_some(offset)
}

fn parse_amount(token: &str) -> Option<u32> {
    if let Ok(n) = token.parse::<u32>() {
        return Some(n);
    }
    let n = match token {
        "a" | "an" | "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        "fifteen" => 15,
        "twenty" => 20,
        "thirty" => 30,
        "forty" => 40,
        "fifty" => 50,
        "sixty" => 60,
        "hundred" => 100,
        _ => return None,
    };
    Some(n)
}
