/// GitHub Actions artifacts holding the scraper's per-course JSON files
use std::io::{Cursor, Read};

use serde::Deserialize;
use serde_json::Value;
use zip::ZipArchive;

use crate::error::{Result, SiaError};

/// One entry of `GET /repos/{owner}/{repo}/actions/artifacts`
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Artifact {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub expired: bool,
    pub archive_download_url: String,
}

#[derive(Debug, Deserialize)]
struct ArtifactList {
    #[serde(default)]
    artifacts: Vec<Artifact>,
}

/// The newest artifact that can still be downloaded. GitHub lists newest first.
pub fn latest_artifact(list_body: &[u8]) -> Result<Artifact> {
    let list: ArtifactList = serde_json::from_slice(list_body)?;
    list.artifacts
        .into_iter()
        .find(|artifact| !artifact.expired)
        .ok_or(SiaError::NoArtifact)
}

/// Every course object found in the archive's `.json` entries, in archive
/// order. A file may hold one course or an array of them. Unreadable
/// entries are skipped.
pub fn unpack_courses(archive: &[u8]) -> Result<Vec<Value>> {
    let mut archive = ZipArchive::new(Cursor::new(archive))?;
    let mut courses = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let name = entry.name().to_string();
        if entry.is_dir() || !name.to_lowercase().ends_with(".json") {
            continue;
        }

        let mut text = String::new();
        if let Err(e) = entry.read_to_string(&mut text) {
            log::warn!("Skipping {}: {}", name, e);
            continue;
        }

        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Array(items)) => courses.extend(items),
            Ok(course) => courses.push(course),
            Err(e) => log::warn!("Skipping {}: {}", name, e),
        }
    }

    log::debug!("Unpacked {} course records", courses.len());
    Ok(courses)
}


#[cfg(test)]
mod tests {
    use super::testing::zip_files;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_latest_artifact_skips_expired() {
        let body = json!({
            "total_count": 2,
            "artifacts": [
                {
                    "id": 9,
                    "name": "courses-data",
                    "expired": true,
                    "archive_download_url": "https://x/9/zip"
                },
                {
                    "id": 7,
                    "name": "courses-data",
                    "expired": false,
                    "archive_download_url": "https://x/7/zip"
                }
            ]
        });

        let artifact = latest_artifact(body.to_string().as_bytes()).unwrap();

        assert_eq!(artifact.id, 7);
        assert_eq!(artifact.archive_download_url, "https://x/7/zip");
    }

    #[test]
    fn test_no_artifact() {
        let empty = json!({"total_count": 0, "artifacts": []}).to_string();
        assert_eq!(latest_artifact(empty.as_bytes()), Err(SiaError::NoArtifact));
        assert!(matches!(latest_artifact(b"<html>"), Err(SiaError::MalformedJson(_))));
    }

    #[test]
    fn test_unpack_merges_course_files() {
        let archive = zip_files(&[
            ("data/Algoritma.json", r#"{"course_info": {"kode": "TI101", "nama": "Algoritma"}}"#),
            ("README.txt", "scraped nightly"),
            (
                "data/Basis_Data.json",
                r#"[{"course_info": {"kode": "TI202", "nama": "Basis Data"}}]"#,
            ),
            ("data/broken.json", "{oops"),
        ]);

        let courses = unpack_courses(&archive).unwrap();

        assert_eq!(courses.len(), 2);
        assert_eq!(courses[0]["course_info"]["kode"], "TI101");
        assert_eq!(courses[1]["course_info"]["kode"], "TI202");
    }

    #[test]
    fn test_unpack_rejects_non_zip() {
        assert!(matches!(unpack_courses(b"[]"), Err(SiaError::Archive(_))));
    }
}
