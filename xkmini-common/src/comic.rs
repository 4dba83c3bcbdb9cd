//! Comic as served by the upstream JSON endpoint
//!
//! Comics are never stored locally except as favorites; every view fetches a
//! fresh copy.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One comic from the upstream source
///
/// `year`, `month` and `day` arrive as strings on the real endpoint and as
/// integers from some mirrors; both are accepted and anything else is
/// treated as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comic {
    pub num: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub img: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub alt: String,
    #[serde(default, deserialize_with = "lenient_int")]
    pub year: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub month: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub day: Option<i64>,
}

impl Comic {
    /// Publication date, if the upstream fields form a real calendar date
    pub fn publication_date(&self) -> Option<NaiveDate> {
        calendar_date(self.year, self.month, self.day)
    }

    /// Date line shown under the comic
    ///
    /// Falls back to the raw fields when they do not form a valid date so the
    /// page still shows what upstream sent.
    pub fn display_date(&self) -> String {
        match self.publication_date() {
            Some(date) => date.format("%Y-%m-%d").to_string(),
            None => {
                let part = |v: Option<i64>| v.map(|n| n.to_string()).unwrap_or_else(|| "?".to_string());
                format!("{}-{}-{}", part(self.year), part(self.month), part(self.day))
            }
        }
    }
}

/// Build a date from optional year/month/day parts
pub fn calendar_date(year: Option<i64>, month: Option<i64>, day: Option<i64>) -> Option<NaiveDate> {
    let year = i32::try_from(year?).ok().filter(|y| *y > 0)?;
    let month = u32::try_from(month?).ok()?;
    let day = u32::try_from(day?).ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_upstream_payload_with_string_dates() {
        let comic: Comic = serde_json::from_value(json!({
            "month": "1",
            "num": 2500,
            "link": "",
            "year": "2021",
            "news": "",
            "safe_title": "Vaccine Effectiveness",
            "transcript": "",
            "alt": "Alt text",
            "img": "https://imgs.xkcd.com/comics/x.png",
            "title": "Vaccine Effectiveness",
            "day": "4"
        }))
        .unwrap();

        assert_eq!(comic.num, 2500);
        assert_eq!(comic.year, Some(2021));
        assert_eq!(comic.month, Some(1));
        assert_eq!(comic.day, Some(4));
        assert_eq!(comic.publication_date(), NaiveDate::from_ymd_opt(2021, 1, 4));
        assert_eq!(comic.display_date(), "2021-01-04");
    }

    #[test]
    fn test_missing_and_garbage_fields() {
        let comic: Comic = serde_json::from_value(json!({
            "num": 7,
            "title": null,
            "year": "MMXX",
            "month": 13,
            "day": {}
        }))
        .unwrap();

        assert_eq!(comic.title, "");
        assert_eq!(comic.img, "");
        assert_eq!(comic.year, None);
        assert_eq!(comic.month, Some(13));
        assert_eq!(comic.day, None);
        assert!(comic.publication_date().is_none());
        assert_eq!(comic.display_date(), "?-13-?");
    }

    #[test]
    fn test_calendar_date_rejects_impossible_dates() {
        assert!(calendar_date(Some(2021), Some(2), Some(30)).is_none());
        assert!(calendar_date(Some(0), Some(1), Some(1)).is_none());
        assert!(calendar_date(Some(2021), None, Some(1)).is_none());
        assert!(calendar_date(Some(2020), Some(2), Some(29)).is_some());
    }

    #[test]
    fn test_num_is_required() {
        let parsed = serde_json::from_value::<Comic>(json!({"title": "No number"}));
        assert!(parsed.is_err());
    }
}
