use crate::error::OrderError;
use chrono::{DateTime, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// Text form of a Postgres tsrange, e.g. `["2024-01-01 10:00:00","2024-01-01 12:00:00")`.
// Each bound is either fully quoted or bare; either bracket style is allowed.
static STORED_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^[\(\[](?:"([^"]*)"|([^",\(\)\[\]]*)),(?:"([^"]*)"|([^",\(\)\[\]]*))[\)\]]$"#,
    )
    .expect("stored range pattern is valid")
});

const STORED_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"];
const API_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
const SQL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Visit time as exposed by the API: two UTC instants in date-time form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitTime {
    pub start: String,
    pub end: String,
}

/// Validated visit interval, half-open `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitTimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl VisitTime {
    /// Reshapes the stored range encoding into API form, keeping the stored
    /// precision: `(2024-01-01 10:00,2024-01-01 12:00)` becomes
    /// `2024-01-01T10:00Z` / `2024-01-01T12:00Z`.
    pub fn from_stored(raw: &str) -> Result<Self, OrderError> {
        let malformed = || OrderError::MalformedVisitTime(raw.to_string());

        let captures = STORED_RANGE.captures(raw.trim()).ok_or_else(malformed)?;
        let mut bounds = [String::new(), String::new()];
        for (i, bound) in bounds.iter_mut().enumerate() {
            let text = captures
                .get(2 * i + 1)
                .or_else(|| captures.get(2 * i + 2))
                .map(|m| m.as_str().trim())
                .ok_or_else(malformed)?;
            if parse_with(text, &STORED_FORMATS).is_none() {
                return Err(malformed());
            }
            *bound = format!("{}Z", text.replacen(' ', "T", 1));
        }

        let [start, end] = bounds;
        Ok(VisitTime { start, end })
    }

    /// Parses API input into a range. Accepts RFC 3339 instants and the
    /// minute-precision form this service emits (`2024-01-01T10:00Z`).
    pub fn to_range(&self) -> Result<VisitTimeRange, OrderError> {
        let start = parse_api_instant(&self.start)?;
        let end = parse_api_instant(&self.end)?;
        if start >= end {
            return Err(OrderError::IncorrectOrderParameters(format!(
                "visit time start {} is not before end {}",
                self.start, self.end
            )));
        }
        Ok(VisitTimeRange { start, end })
    }
}

impl VisitTimeRange {
    /// Literal accepted by a `$n::tsrange` placeholder.
    pub fn to_sql_literal(&self) -> String {
        format!(
            "[{},{})",
            self.start.format(SQL_FORMAT),
            self.end.format(SQL_FORMAT)
        )
    }
}

fn parse_with(text: &str, formats: &[&str]) -> Option<NaiveDateTime> {
    formats
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
}

fn parse_api_instant(text: &str) -> Result<NaiveDateTime, OrderError> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Ok(instant.naive_utc());
    }
    text.strip_suffix('Z')
        .and_then(|naive| parse_with(naive, &API_FORMATS))
        .ok_or_else(|| {
            OrderError::IncorrectOrderParameters(format!("visit time '{}' is not a UTC date-time", text))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reshapes_parenthesized_minutes() {
        let visit = VisitTime::from_stored("(2024-01-01 10:00,2024-01-01 12:00)").unwrap();
        assert_eq!(visit.start, "2024-01-01T10:00Z");
        assert_eq!(visit.end, "2024-01-01T12:00Z");
    }

    #[test]
    fn reshapes_postgres_tsrange_text() {
        let visit =
            VisitTime::from_stored(r#"["2024-03-05 18:30:00","2024-03-05 20:00:00")"#).unwrap();
        assert_eq!(visit.start, "2024-03-05T18:30:00Z");
        assert_eq!(visit.end, "2024-03-05T20:00:00Z");
    }

    #[test]
    fn rejects_missing_comma() {
        let err = VisitTime::from_stored("(2024-01-01 10:00 2024-01-01 12:00)").unwrap_err();
        assert!(matches!(err, OrderError::MalformedVisitTime(_)));
    }

    #[test]
    fn rejects_extra_bounds_and_bad_quoting() {
        for raw in [
            "(2024-01-01 10:00,2024-01-01 12:00,2024-01-01 13:00)",
            "(\"2024-01-01 10:00,2024-01-01 12:00)",
            "2024-01-01 10:00,2024-01-01 12:00",
            "(2024-01-01 10:00,)",
            "(2024-13-01 10:00,2024-01-01 12:00)",
            "",
        ] {
            assert!(VisitTime::from_stored(raw).is_err(), "accepted {:?}", raw);
        }
    }

    #[test]
    fn api_round_trip_into_sql_literal() {
        let visit = VisitTime {
            start: "2024-01-01T10:00Z".to_string(),
            end: "2024-01-01T12:30:00+00:00".to_string(),
        };
        let range = visit.to_range().unwrap();
        assert_eq!(range.to_sql_literal(), "[2024-01-01 10:00:00,2024-01-01 12:30:00)");
    }

    #[test]
    fn inverted_range_is_incorrect() {
        let visit = VisitTime {
            start: "2024-01-01T12:00Z".to_string(),
            end: "2024-01-01T10:00Z".to_string(),
        };
        assert!(matches!(visit.to_range(), Err(OrderError::IncorrectOrderParameters(_))));
    }
}
