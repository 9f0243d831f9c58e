/// Activity classification: which materials and submissions are worth showing
use std::sync::LazyLock;

use chrono::{DateTime, Months, Utc};
use regex::Regex;

use crate::deadline::{is_deadline_active, parse_deadline};
use crate::model::{CourseInfo, CourseSnapshot, Meeting, NavigationTarget};

static MATERIAL_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[BAHAN AJAR\]|\[Tugas\]").expect("material tag pattern is valid")
});

static ACTIVITY_DETAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Detail Aktivitas Pembelajaran").expect("activity detail pattern is valid")
});

static DEADLINE_BANNER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[Batas Waktu Pengumpulan Tugas").expect("deadline banner pattern is valid")
});

static MEETING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Pertemuan(\d+)").expect("meeting number pattern is valid"));

/// A link shown in one of the material lists
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialEntry {
    pub label: String,
    pub url: Option<String>,
}

/// An open submission the user can jump to
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionEntry {
    pub label: String,
    pub pengumpulan_title: String,
    pub course_info: CourseInfo,
    pub meeting_key: String,
    pub meeting_date: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
}

impl SubmissionEntry {
    pub fn navigation_target(&self) -> NavigationTarget {
        NavigationTarget::new(&self.course_info.kode, &self.meeting_key, &self.pengumpulan_title)
    }

    pub fn completion_key(&self) -> String {
        completion_key(&self.course_info.kode, &self.meeting_key, &self.pengumpulan_title)
    }
}

/// All tagged materials of one meeting, for the per-course listing
#[derive(Debug, Clone, PartialEq)]
pub struct MeetingListing {
    pub title: String,
    pub date: Option<DateTime<Utc>>,
    pub items: Vec<MaterialEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseListing {
    pub course_info: CourseInfo,
    pub meetings: Vec<MeetingListing>,
}

/// Tagged as teaching material or assignment, and not an activity-detail link
/// or a deadline banner. Exclusions win over inclusions.
pub fn is_listed_material(title: &str) -> bool {
    MATERIAL_TAG.is_match(title)
        && !ACTIVITY_DETAIL.is_match(title)
        && !DEADLINE_BANNER.is_match(title)
}

/// Key of the per-submission completion checkmark
pub fn completion_key(kode: &str, meeting_key: &str, label: &str) -> String {
    format!("{}__{}__{}", kode, meeting_key, label)
}

/// "Pertemuan12" -> "Pertemuan 12"
pub fn display_meeting_key(key: &str) -> String {
    MEETING_NUMBER.replace(key, "Pertemuan $1").into_owned()
}

/// Meeting dated no earlier than one calendar month before `now`
fn in_window(meeting: &Meeting, now: DateTime<Utc>) -> bool {
    let Some(date) = meeting.date else {
        return false;
    };
    match now.checked_sub_months(Months::new(1)) {
        Some(month_ago) => date >= month_ago,
        None => true,
    }
}

fn has_active_task(meeting: &Meeting, now: DateTime<Utc>) -> bool {
    meeting
        .tugas
        .iter()
        .any(|task| is_deadline_active(task.deadline.as_deref(), now))
}

fn listed_items(meeting: &Meeting, course_name: &str) -> Vec<MaterialEntry> {
    let files = meeting
        .files
        .iter()
        .filter(|file| is_listed_material(&file.title))
        .map(|file| MaterialEntry {
            label: format!("{} - {}", file.title, course_name),
            url: Some(file.url.clone()).filter(|url| !url.is_empty()),
        });

    let tasks = meeting
        .tugas
        .iter()
        .filter(|task| is_listed_material(&task.title))
        .map(|task| MaterialEntry {
            label: format!("{} - {}", task.title, course_name),
            url: task.url.clone().filter(|url| !url.is_empty()),
        });

    files.chain(tasks).collect()
}

/// Materials of recent meetings that still have something open, or that have
/// not happened yet. Traversal order: course, meeting, files then tasks.
pub fn relevant_materials(courses: &[CourseSnapshot], now: DateTime<Utc>) -> Vec<MaterialEntry> {
    courses
        .iter()
        .flat_map(|course| {
            course
                .meetings
                .iter()
                .filter(move |meeting| in_window(meeting, now))
                .filter(move |meeting| {
                    has_active_task(meeting, now) || meeting.date.is_some_and(|date| date > now)
                })
                .flat_map(move |meeting| listed_items(meeting, &course.course_info.nama))
        })
        .collect()
}

/// Open submissions of recent meetings, sorted by meeting date ascending
pub fn active_submissions(courses: &[CourseSnapshot], now: DateTime<Utc>) -> Vec<SubmissionEntry> {
    let mut entries: Vec<SubmissionEntry> = Vec::new();

    for course in courses {
        for meeting in course.meetings.iter().filter(|m| in_window(m, now)) {
            for task in &meeting.tugas {
                let open = task.active == Some(true)
                    || is_deadline_active(task.deadline.as_deref(), now);
                let Some(label) = task.submission_label() else {
                    continue;
                };
                if !open || ACTIVITY_DETAIL.is_match(&task.title) {
                    continue;
                }

                entries.push(SubmissionEntry {
                    label: format!("{} - {}", label, course.course_info.nama),
                    pengumpulan_title: label.to_string(),
                    course_info: course.course_info.clone(),
                    meeting_key: meeting.key.clone(),
                    meeting_date: meeting.date,
                    deadline: parse_deadline(task.deadline.as_deref())
                        .map(|d| d.with_timezone(&Utc)),
                });
            }
        }
    }

    entries.sort_by(|a, b| a.meeting_date.cmp(&b.meeting_date));
    entries
}

/// Every tagged material of a course regardless of date, newest meeting first
pub fn course_materials(course: &CourseSnapshot) -> CourseListing {
    let mut meetings: Vec<MeetingListing> = course
        .meetings
        .iter()
        .map(|meeting| MeetingListing {
            title: display_meeting_key(&meeting.key),
            date: meeting.date,
            items: listed_items(meeting, &course.course_info.nama),
        })
        .collect();

    meetings.sort_by(|a, b| b.date.cmp(&a.date));

    CourseListing {
        course_info: course.course_info.clone(),
        meetings,
    }
}
