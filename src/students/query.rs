//! Read-side operations over the student collection: viewer ordering,
//! free-text search, exact filters and aggregate statistics. All of them are
//! linear scans over an in-memory snapshot.

use std::collections::{BTreeMap, BTreeSet};

use crate::students::{
    dto::{FilterParams, SearchParams, Statistics},
    repo_types::{Student, StudentStatus},
};

/// Puts the viewer's own card(s) first, then everything else by ascending id.
/// Without a viewer the collection order is left alone.
pub fn order_for_viewer(students: &mut [Student], viewer: Option<i64>) {
    if let Some(user_id) = viewer {
        students.sort_by_key(|s| (s.user_id != Some(user_id), s.id));
    }
}

pub fn search(students: Vec<Student>, params: &SearchParams) -> Vec<Student> {
    let query = params.search.to_lowercase();
    let institution = params.institution.to_lowercase();
    students
        .into_iter()
        .filter(|s| {
            matches_query(s, &query)
                && course_matches(s, &params.course)
                && status_matches(s, &params.status)
                && (institution.is_empty() || s.institution.to_lowercase().contains(&institution))
        })
        .collect()
}

pub fn filter(students: Vec<Student>, params: &FilterParams) -> Vec<Student> {
    students
        .into_iter()
        .filter(|s| {
            course_matches(s, &params.course)
                && status_matches(s, &params.status)
                && (params.institution.is_empty()
                    || params.institution == "all"
                    || s.institution == params.institution)
        })
        .collect()
}

/// `query` must already be lowercased. A numeric query that equals the id
/// matches outright; otherwise name, description, skills and institution are
/// searched for the query as a substring.
fn matches_query(student: &Student, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    if query.chars().all(|c| c.is_ascii_digit()) && query.parse::<i64>().ok() == Some(student.id) {
        return true;
    }
    student.name.to_lowercase().contains(query)
        || student.description.to_lowercase().contains(query)
        || student
            .skills
            .iter()
            .any(|skill| skill.to_lowercase().contains(query))
        || student.institution.to_lowercase().contains(query)
}

fn course_matches(student: &Student, course: &str) -> bool {
    course.is_empty() || course == "all" || student.course.to_string() == course
}

fn status_matches(student: &Student, status: &str) -> bool {
    status.is_empty() || status == "all" || student.status.as_str() == status
}

/// Counts per course (1-4) and per known status. Cards outside those buckets
/// count towards `total` only.
pub fn statistics(students: &[Student]) -> Statistics {
    let mut by_course: BTreeMap<String, usize> =
        (1..=4).map(|course: i64| (course.to_string(), 0)).collect();
    let mut by_status: BTreeMap<String, usize> = StudentStatus::BUCKETS
        .iter()
        .map(|status| (status.as_str().to_string(), 0))
        .collect();
    let mut institutions = BTreeSet::new();

    for student in students {
        if let Some(n) = by_course.get_mut(&student.course.to_string()) {
            *n += 1;
        }
        if let Some(n) = by_status.get_mut(student.status.as_str()) {
            *n += 1;
        }
        if !student.institution.is_empty() {
            institutions.insert(student.institution.clone());
        }
    }

    Statistics {
        total: students.len(),
        by_course,
        by_status,
        institutions: institutions.into_iter().collect(),
    }
}
