use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::store::{lenient, timestamp};

pub const DEFAULT_PHOTO: &str = "/images/default.jpg";

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StudentStatus {
    #[default]
    Studying,
    Graduated,
    Expelled,
    AcademicLeave,
    /// Stored verbatim; not counted by any statistics bucket.
    Other(String),
}

impl StudentStatus {
    pub const BUCKETS: [StudentStatus; 4] = [
        StudentStatus::Studying,
        StudentStatus::Graduated,
        StudentStatus::Expelled,
        StudentStatus::AcademicLeave,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            StudentStatus::Studying => "studying",
            StudentStatus::Graduated => "graduated",
            StudentStatus::Expelled => "expelled",
            StudentStatus::AcademicLeave => "academic_leave",
            StudentStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for StudentStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "studying" => StudentStatus::Studying,
            "graduated" => StudentStatus::Graduated,
            "expelled" => StudentStatus::Expelled,
            "academic_leave" => StudentStatus::AcademicLeave,
            _ => StudentStatus::Other(raw),
        }
    }
}

impl From<StudentStatus> for String {
    fn from(status: StudentStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for StudentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Links {
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub github: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub portfolio: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub linkedin: Option<String>,
    /// Any other link kinds, kept as sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Links {
    /// Links arrive as an object or as a JSON-encoded string; anything that
    /// does not parse becomes an empty set of links.
    pub fn coerce(value: Value) -> Self {
        match value {
            Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
            Value::String(s) if !s.trim().is_empty() => {
                serde_json::from_str(&s).unwrap_or_default()
            }
            _ => Links::default(),
        }
    }
}

fn coerce_links<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Links, D::Error> {
    Ok(Links::coerce(Value::deserialize(deserializer)?))
}

/// Student card as persisted in `students.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default = "default_course", deserialize_with = "lenient::course")]
    pub course: i64,
    #[serde(default, deserialize_with = "status_or_default")]
    pub status: StudentStatus,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub full_info: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub institution: String,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub skills: Vec<String>,
    #[serde(default, deserialize_with = "coerce_links")]
    pub links: Links,
    #[serde(default = "default_photo", deserialize_with = "photo_or_default")]
    pub photo: String,
    #[serde(
        default = "timestamp::epoch",
        serialize_with = "timestamp::serialize",
        deserialize_with = "timestamp::deserialize_or_epoch"
    )]
    pub created_at: OffsetDateTime,
    #[serde(
        default = "timestamp::epoch",
        serialize_with = "timestamp::serialize",
        deserialize_with = "timestamp::deserialize_or_epoch"
    )]
    pub updated_at: OffsetDateTime,
    #[serde(default, deserialize_with = "lenient::optional_int")]
    pub user_id: Option<i64>,
}

fn default_course() -> i64 {
    1
}

fn default_photo() -> String {
    DEFAULT_PHOTO.to_string()
}

fn status_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<StudentStatus, D::Error> {
    let raw = lenient::text(deserializer)?;
    Ok(if raw.is_empty() {
        StudentStatus::default()
    } else {
        StudentStatus::from(raw)
    })
}

fn photo_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = lenient::text(deserializer)?;
    Ok(if raw.is_empty() { default_photo() } else { raw })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_known_and_unknown_values() {
        let parsed: Vec<StudentStatus> =
            serde_json::from_str(r#"["academic_leave", "on_exchange"]"#).unwrap();
        assert_eq!(parsed[0], StudentStatus::AcademicLeave);
        assert_eq!(parsed[1], StudentStatus::Other("on_exchange".into()));
        assert_eq!(
            serde_json::to_string(&parsed).unwrap(),
            r#"["academic_leave","on_exchange"]"#
        );
    }

    #[test]
    fn sparse_legacy_record_gets_defaults() {
        let raw = r#"{
            "id": 5,
            "name": "Old Record",
            "description": "imported",
            "createdAt": "2023-09-01T08:00:00.000001",
            "userId": null
        }"#;
        let s: Student = serde_json::from_str(raw).unwrap();
        assert_eq!(s.course, 1);
        assert_eq!(s.status, StudentStatus::Studying);
        assert_eq!(s.photo, DEFAULT_PHOTO);
        assert!(s.skills.is_empty());
        assert_eq!(s.links, Links::default());
        assert_eq!(s.user_id, None);
        assert_eq!(s.updated_at, OffsetDateTime::UNIX_EPOCH);
    }

    #[test]
    fn serializes_camel_case_with_null_owner() {
        let s = Student {
            id: 1,
            name: "A".into(),
            course: 2,
            status: StudentStatus::Graduated,
            description: "d".into(),
            full_info: "f".into(),
            institution: "i".into(),
            skills: vec!["Rust".into()],
            links: Links::default(),
            photo: DEFAULT_PHOTO.into(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
            user_id: None,
        };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["fullInfo"], "f");
        assert_eq!(v["status"], "graduated");
        assert!(v["userId"].is_null());
        assert_eq!(v["createdAt"], "1970-01-01T00:00:00Z");
    }

    #[test]
    fn hand_edited_record_still_decodes() {
        let raw = r#"{
            "id": 9,
            "name": null,
            "course": "3",
            "status": null,
            "skills": "Rust, Go",
            "links": "{\"github\": \"https://github.com/x\"}",
            "photo": "",
            "createdAt": "last week",
            "userId": "4"
        }"#;
        let s: Student = serde_json::from_str(raw).unwrap();
        assert_eq!(s.name, "");
        assert_eq!(s.course, 3);
        assert_eq!(s.status, StudentStatus::Studying);
        assert_eq!(s.skills, vec!["Rust", "Go"]);
        assert_eq!(s.links.github.as_deref(), Some("https://github.com/x"));
        assert_eq!(s.photo, DEFAULT_PHOTO);
        assert_eq!(s.created_at, OffsetDateTime::UNIX_EPOCH);
        assert_eq!(s.user_id, Some(4));
    }

    #[test]
    fn unknown_link_kinds_survive_a_rewrite() {
        let raw = r#"{"id": 1, "links": {"github": "g", "telegram": "@ada", "site": {"url": "u"}}}"#;
        let s: Student = serde_json::from_str(raw).unwrap();
        assert_eq!(s.links.github.as_deref(), Some("g"));
        assert_eq!(s.links.extra["telegram"], "@ada");

        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["links"]["telegram"], "@ada");
        assert_eq!(v["links"]["site"]["url"], "u");
        assert_eq!(v["links"]["github"], "g");
    }

    #[test]
    fn garbage_links_become_empty() {
        assert_eq!(Links::coerce(Value::from(17)), Links::default());
        assert_eq!(Links::coerce(Value::from("not json")), Links::default());
        assert_eq!(Links::coerce(Value::Null), Links::default());
    }
}
