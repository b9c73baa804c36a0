use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::{
    auth::extractors::Identity,
    error::AppError,
    storage::PhotoStorage,
    store::{self, RecordStore},
    students::{
        dto::{course_lenient, course_strict, is_blank, StudentPatch},
        repo_types::{Student, StudentStatus, DEFAULT_PHOTO},
    },
};

/// Admins may change any card; everyone else only the card they own.
pub fn can_mutate(student: &Student, identity: &Identity) -> bool {
    identity.is_admin() || student.user_id == Some(identity.user_id)
}

fn required(field: &str) -> AppError {
    AppError::validation(format!("Field '{field}' is required"))
}

fn required_text(value: Option<String>, field: &str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| required(field))
}

fn photo_or_default(photo: Option<Option<String>>) -> String {
    photo
        .flatten()
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| DEFAULT_PHOTO.to_string())
}

/// Builds a card from a create payload and appends it to `students`.
///
/// Non-admins may own at most one card. Admin-created cards have no owner.
/// An unparseable course fails the request here, unlike on update.
pub fn apply_create(
    students: &mut Vec<Student>,
    patch: StudentPatch,
    identity: &Identity,
    now: OffsetDateTime,
) -> Result<Student, AppError> {
    if !identity.is_admin() {
        if let Some(existing) = students.iter().find(|s| s.user_id == Some(identity.user_id)) {
            return Err(AppError::CardExists {
                student_id: existing.id,
            });
        }
    }

    let name = required_text(patch.name, "name")?;
    let course = patch
        .course
        .filter(|c| !is_blank(c))
        .ok_or_else(|| required("course"))?;
    let description = required_text(patch.description, "description")?;
    let institution = required_text(patch.institution, "institution")?;
    let course = course_strict(&course)?;

    let student = Student {
        id: store::next_id(students.iter().map(|s| s.id)),
        name,
        course,
        status: patch.status.map(StudentStatus::from).unwrap_or_default(),
        full_info: patch.full_info.unwrap_or_else(|| description.clone()),
        description,
        institution,
        skills: patch.skills.unwrap_or_default(),
        links: patch.links.unwrap_or_default(),
        photo: photo_or_default(patch.photo),
        created_at: now,
        updated_at: now,
        user_id: (!identity.is_admin()).then_some(identity.user_id),
    };
    students.push(student.clone());
    Ok(student)
}

/// Applies only the supplied fields. Required fields may be omitted but not
/// blanked; a course that is not an integer becomes 1.
pub fn apply_update(
    student: &mut Student,
    patch: StudentPatch,
    now: OffsetDateTime,
) -> Result<(), AppError> {
    let blank = |v: &Option<String>| v.as_deref().is_some_and(|s| s.trim().is_empty());
    for (field, is_empty) in [
        ("name", blank(&patch.name)),
        ("course", patch.course.as_ref().is_some_and(is_blank)),
        ("description", blank(&patch.description)),
        ("institution", blank(&patch.institution)),
    ] {
        if is_empty {
            return Err(AppError::validation(format!("Field '{field}' cannot be empty")));
        }
    }

    if let Some(name) = patch.name {
        student.name = name;
    }
    if let Some(course) = patch.course {
        student.course = course_lenient(&course);
    }
    if let Some(status) = patch.status {
        student.status = StudentStatus::from(status);
    }
    if let Some(description) = patch.description {
        student.description = description;
    }
    if let Some(full_info) = patch.full_info {
        student.full_info = full_info;
    }
    if let Some(institution) = patch.institution {
        student.institution = institution.trim().to_string();
    }
    if let Some(skills) = patch.skills {
        student.skills = skills;
    }
    if let Some(links) = patch.links {
        student.links = links;
    }
    if let Some(photo) = patch.photo {
        student.photo = photo_or_default(Some(photo));
    }
    student.updated_at = now;
    Ok(())
}

pub async fn create_student(
    store: &dyn RecordStore,
    identity: &Identity,
    patch: StudentPatch,
) -> Result<Student, AppError> {
    let mut students = Student::load_for_update(store).await?;
    let student = apply_create(&mut students, patch, identity, OffsetDateTime::now_utc())?;
    if !Student::save_all(store, &students).await {
        return Err(AppError::Persistence("students"));
    }
    info!(student_id = student.id, user_id = identity.user_id, name = %student.name, "student created");
    Ok(student)
}

pub async fn update_student(
    store: &dyn RecordStore,
    identity: &Identity,
    id: i64,
    patch: StudentPatch,
) -> Result<Student, AppError> {
    let mut students = Student::load_for_update(store).await?;
    let student = students
        .iter_mut()
        .find(|s| s.id == id)
        .ok_or_else(|| AppError::not_found("Student not found"))?;

    if !can_mutate(student, identity) {
        warn!(student_id = id, user_id = identity.user_id, "update denied");
        return Err(AppError::Forbidden("You can only edit your own card".into()));
    }

    apply_update(student, patch, OffsetDateTime::now_utc())?;
    let updated = student.clone();

    if !Student::save_all(store, &students).await {
        return Err(AppError::Persistence("students"));
    }
    info!(student_id = id, user_id = identity.user_id, "student updated");
    Ok(updated)
}

pub async fn delete_student(
    store: &dyn RecordStore,
    photos: &dyn PhotoStorage,
    identity: &Identity,
    id: i64,
) -> Result<(), AppError> {
    let mut students = Student::load_for_update(store).await?;
    let idx = students
        .iter()
        .position(|s| s.id == id)
        .ok_or_else(|| AppError::not_found("Student not found"))?;

    if !can_mutate(&students[idx], identity) {
        warn!(student_id = id, user_id = identity.user_id, "delete denied");
        return Err(AppError::Forbidden("You can only delete your own card".into()));
    }

    let removed = students.remove(idx);
    remove_photo(photos, &removed.photo).await;

    if !Student::save_all(store, &students).await {
        return Err(AppError::Persistence("students"));
    }
    info!(student_id = id, user_id = identity.user_id, "student deleted");
    Ok(())
}

/// Best effort: failures are logged and otherwise ignored.
async fn remove_photo(photos: &dyn PhotoStorage, url: &str) {
    if url.is_empty() || url.ends_with("default.jpg") {
        return;
    }
    let Some(key) = photos.key_from_url(url) else {
        debug!(%url, "photo is not an upload; leaving it in place");
        return;
    };
    match photos.delete_object(&key).await {
        Ok(true) => info!(%key, "student photo deleted"),
        Ok(false) => debug!(%key, "student photo already gone"),
        Err(e) => warn!(%key, error = %e, "failed to delete student photo"),
    }
}
