use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{debug, instrument};

use crate::{
    auth::extractors::{RequiredIdentity, Session},
    error::AppError,
    state::AppState,
    students::{
        dto::{CardStatus, Deleted, FilterParams, SearchParams, Statistics},
        extractors::StudentForm,
        query,
        repo_types::Student,
        services,
    },
};

pub fn lookup_routes() -> Router<AppState> {
    Router::new()
        .route("/students/search", get(search_students))
        .route("/students/filter", get(filter_students))
        .route("/students/statistics", get(statistics))
        .route("/my-student", get(my_student))
        .route("/check-card", get(check_card))
}

pub fn record_routes() -> Router<AppState> {
    Router::new()
        .route("/students", get(list_students).post(create_student))
        .route(
            "/students/:id",
            get(get_student).put(update_student).delete(delete_student),
        )
}

/// Ids that are not integers name no student.
fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.parse()
        .map_err(|_| AppError::not_found("Student not found"))
}

#[instrument(skip(state, session))]
pub async fn list_students(
    State(state): State<AppState>,
    session: Session,
) -> Json<Vec<Student>> {
    let mut students = Student::load_all(&*state.store).await;
    query::order_for_viewer(&mut students, session.user_id());
    debug!(count = students.len(), "listing students");
    Json(students)
}

#[instrument(skip(state, session))]
pub async fn search_students(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<SearchParams>,
) -> Json<Vec<Student>> {
    let students = Student::load_all(&*state.store).await;
    let mut found = query::search(students, &params);
    query::order_for_viewer(&mut found, session.user_id());
    Json(found)
}

#[instrument(skip(state, session))]
pub async fn filter_students(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<FilterParams>,
) -> Json<Vec<Student>> {
    let students = Student::load_all(&*state.store).await;
    let mut found = query::filter(students, &params);
    query::order_for_viewer(&mut found, session.user_id());
    Json(found)
}

#[instrument(skip(state))]
pub async fn statistics(State(state): State<AppState>) -> Json<Statistics> {
    let students = Student::load_all(&*state.store).await;
    Json(query::statistics(&students))
}

#[instrument(skip(state))]
pub async fn get_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Student>, AppError> {
    let id = parse_id(&id)?;
    Student::find_by_id(&*state.store, id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found("Student not found"))
}

#[instrument(skip(state, identity, form))]
pub async fn create_student(
    State(state): State<AppState>,
    RequiredIdentity(identity): RequiredIdentity,
    StudentForm(form): StudentForm,
) -> Result<(StatusCode, Json<Student>), AppError> {
    let student = services::create_student(&*state.store, &identity, form).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

#[instrument(skip(state, identity, form))]
pub async fn update_student(
    State(state): State<AppState>,
    RequiredIdentity(identity): RequiredIdentity,
    Path(id): Path<String>,
    StudentForm(form): StudentForm,
) -> Result<Json<Student>, AppError> {
    let id = parse_id(&id)?;
    let student = services::update_student(&*state.store, &identity, id, form).await?;
    Ok(Json(student))
}

#[instrument(skip(state, identity))]
pub async fn delete_student(
    State(state): State<AppState>,
    RequiredIdentity(identity): RequiredIdentity,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, AppError> {
    let id = parse_id(&id)?;
    services::delete_student(&*state.store, &*state.photos, &identity, id).await?;
    Ok(Json(Deleted {
        success: true,
        message: "Student deleted",
    }))
}

#[instrument(skip(state, session))]
pub async fn my_student(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Student>, AppError> {
    let identity = session.require()?;
    Student::find_by_owner(&*state.store, identity.user_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found("You don't have a card yet"))
}

/// Anonymous callers simply have no card.
#[instrument(skip(state, session))]
pub async fn check_card(State(state): State<AppState>, session: Session) -> Json<CardStatus> {
    let owned = match session.user_id() {
        Some(user_id) => Student::find_by_owner(&*state.store, user_id).await,
        None => None,
    };
    Json(match owned {
        Some(student) => CardStatus {
            has_card: true,
            student_id: Some(student.id),
            student_name: Some(student.name),
        },
        None => CardStatus {
            has_card: false,
            student_id: None,
            student_name: None,
        },
    })
}
