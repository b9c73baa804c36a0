use std::collections::HashMap;

use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header,
    Json,
};
use serde_json::Value;
use tracing::debug;

use super::dto::StudentPatch;
use crate::error::AppError;

/// Create/update payload, sent either as a JSON object or as a
/// `multipart/form-data` form. File parts of a form are ignored.
#[derive(Debug)]
pub struct StudentForm(pub StudentPatch);

#[async_trait]
impl<S> FromRequest<S> for StudentForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if is_form {
            let mut mp = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::validation(e.body_text()))?;
            let mut fields = HashMap::new();
            while let Some(field) = mp.next_field().await? {
                let Some(name) = field.name().map(str::to_string) else {
                    continue;
                };
                if field.file_name().is_some() {
                    debug!(%name, "skipping file part in student form");
                    continue;
                }
                fields.insert(name, field.text().await?);
            }
            return Ok(Self(StudentPatch::from_form(fields)));
        }

        let Json(body) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;
        Ok(Self(StudentPatch::from_json(body)?))
    }
}
