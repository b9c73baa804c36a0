use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::AppError,
    store::lenient::split_list,
    students::repo_types::{Links, DEFAULT_PHOTO},
};

/// Fields a client may supply when creating or updating a card. `None` means
/// "not supplied"; for `photo`, `Some(None)` is an explicit null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentPatch {
    pub name: Option<String>,
    pub course: Option<Value>,
    pub status: Option<String>,
    pub description: Option<String>,
    pub full_info: Option<String>,
    pub institution: Option<String>,
    pub skills: Option<Vec<String>>,
    pub links: Option<Links>,
    pub photo: Option<Option<String>>,
}

impl StudentPatch {
    pub fn from_json(body: Value) -> Result<Self, AppError> {
        let map = match body {
            Value::Object(map) if !map.is_empty() => map,
            _ => return Err(AppError::validation("No data provided")),
        };

        let mut patch = Self::default();
        for (key, value) in map {
            match key.as_str() {
                "name" => patch.name = Some(text(&key, value)?),
                "course" => patch.course = Some(value),
                "status" => patch.status = Some(text(&key, value)?),
                "description" => patch.description = Some(text(&key, value)?),
                "fullInfo" => patch.full_info = Some(text(&key, value)?),
                "institution" => patch.institution = Some(text(&key, value)?),
                "skills" => patch.skills = Some(skills(value)?),
                "links" => patch.links = Some(Links::coerce(value)),
                "photo" => patch.photo = Some(optional_text(&key, value)?),
                _ => {}
            }
        }
        Ok(patch)
    }

    /// Multipart forms always describe a whole card; absent inputs fall back
    /// to the form defaults.
    pub fn from_form(mut fields: HashMap<String, String>) -> Self {
        let mut take = |k: &str| fields.remove(k);
        let description = take("description").unwrap_or_default().trim().to_string();
        let link = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        Self {
            name: Some(take("name").unwrap_or_default().trim().to_string()),
            course: Some(Value::String(take("course").unwrap_or_else(|| "1".into()))),
            status: Some(take("status").unwrap_or_else(|| "studying".into())),
            full_info: Some(take("fullInfo").unwrap_or_else(|| description.clone())),
            description: Some(description),
            institution: Some(take("institution").unwrap_or_default().trim().to_string()),
            skills: Some(split_list(&take("skills").unwrap_or_default())),
            links: Some(Links {
                github: link(take("github")),
                portfolio: link(take("portfolio")),
                linkedin: link(take("linkedin")),
                ..Links::default()
            }),
            photo: Some(Some(take("photo").unwrap_or_else(|| DEFAULT_PHOTO.into()))),
        }
    }
}

fn text(field: &str, value: Value) -> Result<String, AppError> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(AppError::validation(format!("Field '{field}' must be text"))),
    }
}

fn optional_text(field: &str, value: Value) -> Result<Option<String>, AppError> {
    match value {
        Value::Null => Ok(None),
        other => text(field, other).map(Some),
    }
}

fn skills(value: Value) -> Result<Vec<String>, AppError> {
    match value {
        Value::String(s) => Ok(split_list(&s)),
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect()),
        Value::Null => Ok(Vec::new()),
        _ => Err(AppError::validation(
            "Field 'skills' must be a list or a comma-separated string",
        )),
    }
}


/// True for strings that are empty once trimmed. Non-string values are never
/// blank.
pub fn is_blank(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.trim().is_empty())
}

/// Course coercion used on create: anything that is not an integer fails.
pub fn course_strict(value: &Value) -> Result<i64, AppError> {
    let invalid = || AppError::validation("Field 'course' must be an integer");
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .ok_or_else(invalid),
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| invalid()),
        Value::Bool(b) => Ok(i64::from(*b)),
        _ => Err(invalid()),
    }
}

/// Course coercion used on update: anything that is not an integer becomes 1.
pub fn course_lenient(value: &Value) -> i64 {
    course_strict(value).unwrap_or(1)
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub course: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub institution: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    #[serde(default)]
    pub course: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub institution: String,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total: usize,
    pub by_course: BTreeMap<String, usize>,
    pub by_status: BTreeMap<String, usize>,
    pub institutions: Vec<String>,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardStatus {
    pub has_card: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub success: bool,
    pub message: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_patch_keeps_only_supplied_fields() {
        let patch = StudentPatch::from_json(json!({ "name": "New", "unknown": 1 })).unwrap();
        assert_eq!(patch.name.as_deref(), Some("New"));
        assert_eq!(patch.course, None);
        assert_eq!(patch.photo, None);
    }

    #[test]
    fn empty_or_non_object_body_is_rejected() {
        assert!(StudentPatch::from_json(json!({})).is_err());
        assert!(StudentPatch::from_json(json!([1, 2])).is_err());
        assert!(StudentPatch::from_json(Value::Null).is_err());
    }

    #[test]
    fn explicit_null_photo_is_distinguished_from_absent() {
        let patch = StudentPatch::from_json(json!({ "photo": null })).unwrap();
        assert_eq!(patch.photo, Some(None));
    }

    #[test]
    fn skills_accept_string_or_list() {
        let a = StudentPatch::from_json(json!({ "skills": " Rust, SQL ,, Go" })).unwrap();
        assert_eq!(a.skills.unwrap(), vec!["Rust", "SQL", "Go"]);
        let b = StudentPatch::from_json(json!({ "skills": ["Rust", 7, null] })).unwrap();
        assert_eq!(b.skills.unwrap(), vec!["Rust", "7"]);
        assert!(StudentPatch::from_json(json!({ "skills": { "a": 1 } })).is_err());
    }

    #[test]
    fn links_accept_object_or_encoded_string_and_fall_back_to_empty() {
        let obj = StudentPatch::from_json(json!({ "links": { "github": "https://g" } })).unwrap();
        assert_eq!(obj.links.unwrap().github.as_deref(), Some("https://g"));

        let encoded =
            StudentPatch::from_json(json!({ "links": "{\"linkedin\": \"https://l\"}" })).unwrap();
        assert_eq!(encoded.links.unwrap().linkedin.as_deref(), Some("https://l"));

        let broken = StudentPatch::from_json(json!({ "links": "{oops" })).unwrap();
        assert_eq!(broken.links.unwrap(), Links::default());
    }

    #[test]
    fn text_fields_reject_null_and_objects() {
        assert!(StudentPatch::from_json(json!({ "name": null })).is_err());
        assert!(StudentPatch::from_json(json!({ "institution": {} })).is_err());
        let n = StudentPatch::from_json(json!({ "status": 3 })).unwrap();
        assert_eq!(n.status.as_deref(), Some("3"));
    }

    #[test]
    fn course_coercion_strict_vs_lenient() {
        assert_eq!(course_strict(&json!(3)).unwrap(), 3);
        assert_eq!(course_strict(&json!(" 2 ")).unwrap(), 2);
        assert_eq!(course_strict(&json!(2.9)).unwrap(), 2);
        assert!(course_strict(&json!("second")).is_err());
        assert!(course_strict(&Value::Null).is_err());

        assert_eq!(course_lenient(&json!("4")), 4);
        assert_eq!(course_lenient(&json!("second")), 1);
        assert_eq!(course_lenient(&Value::Null), 1);
    }

    #[test]
    fn blank_means_whitespace_only_string() {
        assert!(is_blank(&json!("   ")));
        assert!(!is_blank(&json!(0)));
        assert!(!is_blank(&Value::Null));
    }

    #[test]
    fn form_fills_defaults_for_a_whole_card() {
        let mut fields = HashMap::new();
        fields.insert("name".to_string(), "  Ada  ".to_string());
        fields.insert("description".to_string(), " Compilers ".to_string());
        fields.insert("skills".to_string(), "Rust, OCaml".to_string());
        fields.insert("github".to_string(), "  ".to_string());
        fields.insert("portfolio".to_string(), "https://ada.dev".to_string());

        let patch = StudentPatch::from_form(fields);
        assert_eq!(patch.name.as_deref(), Some("Ada"));
        assert_eq!(patch.course, Some(json!("1")));
        assert_eq!(patch.status.as_deref(), Some("studying"));
        assert_eq!(patch.full_info.as_deref(), Some("Compilers"));
        assert_eq!(patch.institution.as_deref(), Some(""));
        assert_eq!(patch.skills.unwrap(), vec!["Rust", "OCaml"]);
        let links = patch.links.unwrap();
        assert_eq!(links.github, None);
        assert_eq!(links.portfolio.as_deref(), Some("https://ada.dev"));
        assert_eq!(patch.photo, Some(Some(DEFAULT_PHOTO.to_string())));
    }

    #[test]
    fn card_status_omits_absent_fields() {
        let none = CardStatus {
            has_card: false,
            student_id: None,
            student_name: None,
        };
        assert_eq!(serde_json::to_value(&none).unwrap(), json!({ "hasCard": false }));
    }
}
