/// Course data structures and the lenient ingestion of the remote JSON payload
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SiaError};

/// Identity of a course as shown by the portal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CourseInfo {
    pub kode: String,
    pub nama: String,
}

/// The scraper writes `null` where a link or header was missing
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A downloadable file attached to a meeting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MaterialLink {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Empty when the portal row had no link
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
}

/// An assignment entry attached to a meeting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TaskItem {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub pengumpulan_title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl TaskItem {
    /// Submission label, if present and non-blank
    pub fn submission_label(&self) -> Option<&str> {
        self.pengumpulan_title
            .as_deref()
            .map(str::trim)
            .filter(|label| !label.is_empty())
    }
}

/// A course meeting ("pertemuan")
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Meeting {
    pub key: String,
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub files: Vec<MaterialLink>,
    #[serde(default)]
    pub tugas: Vec<TaskItem>,
}

/// One validated course. Meetings keep the document order of the source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CourseSnapshot {
    pub course_info: CourseInfo,
    #[serde(default)]
    pub meetings: Vec<Meeting>,
}

/// Which course, meeting and submission link the content script should reach
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NavigationTarget {
    #[serde(default)]
    pub kode: String,
    #[serde(default)]
    pub pertemuan: String,
    #[serde(default)]
    pub pengumpulan: String,
}

impl NavigationTarget {
    pub fn new(kode: &str, pertemuan: &str, pengumpulan: &str) -> Self {
        NavigationTarget {
            kode: kode.to_string(),
            pertemuan: pertemuan.to_string(),
            pengumpulan: pengumpulan.to_string(),
        }
    }

    /// All three fields must be populated before any dispatcher step runs
    pub fn is_complete(&self) -> bool {
        !self.kode.trim().is_empty()
            && !self.pertemuan.trim().is_empty()
            && !self.pengumpulan.trim().is_empty()
    }
}

/// Parse a meeting timestamp. Accepts RFC 3339 with an offset, a naive
/// `YYYY-MM-DDTHH:MM:SS[.fff]` interpreted in `tz`, or a bare date.
pub fn parse_meeting_date_in<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `date_iso` is either a string or an array whose first element counts
fn effective_date_string(value: Option<&Value>) -> Option<&str> {
    match value? {
        Value::String(s) => Some(s.as_str()),
        Value::Array(items) => items.first().and_then(Value::as_str),
        _ => None,
    }
}

fn ingest_list<T: for<'de> Deserialize<'de>>(value: Option<&Value>) -> Vec<T> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

fn ingest_meeting<Tz: TimeZone>(key: &str, value: &Value, tz: &Tz) -> Option<Meeting> {
    let obj = value.as_object()?;
    Some(Meeting {
        key: key.to_string(),
        date: effective_date_string(obj.get("date_iso")).and_then(|s| parse_meeting_date_in(s, tz)),
        files: ingest_list(obj.get("files")),
        tugas: ingest_list(obj.get("tugas")),
    })
}

fn ingest_course<Tz: TimeZone>(index: usize, value: Value, tz: &Tz) -> Option<CourseSnapshot> {
    let Value::Object(mut obj) = value else {
        log::warn!("Skipping course #{}: not an object", index);
        return None;
    };

    let course_info = obj
        .remove("course_info")
        .map(serde_json::from_value::<CourseInfo>);
    let course_info = match course_info {
        Some(Ok(info)) => info,
        _ => {
            log::warn!("Skipping course #{}: missing or malformed course_info", index);
            return None;
        }
    };

    let pertemuan: Map<String, Value> = match obj.remove("pertemuan") {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };

    let meetings = pertemuan
        .iter()
        .filter_map(|(key, meeting)| {
            let parsed = ingest_meeting(key, meeting, tz);
            if parsed.is_none() {
                log::warn!("Skipping {} in {}: not an object", key, course_info.kode);
            }
            parsed
        })
        .collect();

    Some(CourseSnapshot {
        course_info,
        meetings,
    })
}

/// Validate a decoded payload. The top level must be an array; individual
/// malformed courses, meetings, files and tasks are dropped.
pub fn ingest_courses_in<Tz: TimeZone>(payload: Value, tz: &Tz) -> Result<Vec<CourseSnapshot>> {
    let Value::Array(items) = payload else {
        return Err(SiaError::NotAnArray);
    };

    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| ingest_course(idx, item, tz))
        .collect())
}

/// Decode and validate a raw response body, using the browser's time zone
pub fn ingest_courses(body: &[u8]) -> Result<Vec<CourseSnapshot>> {
    let payload: Value = serde_json::from_slice(body)?;
    ingest_courses_in(payload, &Local)
}
