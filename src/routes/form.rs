//! Request bodies for the write endpoints.
//!
//! Blog and category writes accept `multipart/form-data` (with image files
//! under `images`), JSON objects and urlencoded forms. All three land in a
//! [`FormBody`] so the handlers validate one shape.

use std::collections::HashMap;

use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::media::{self, UploadFile, MAX_IMAGES};

/// The multipart field carrying blog images.
pub const IMAGES_FIELD: &str = "images";

#[derive(Debug, Default)]
pub struct FormBody {
    /// `None` marks a field sent as JSON `null`.
    fields: HashMap<String, Option<String>>,
    pub files: Vec<UploadFile>,
}

impl FormBody {
    /// Absent: `None`. Present: `Some(None)` for null, else the trimmed text.
    pub fn field(&self, name: &str) -> Option<Option<String>> {
        self.fields
            .get(name)
            .map(|value| value.as_deref().map(|v| v.trim().to_string()))
    }

    /// Untrimmed text of a field, treating null like absence.
    pub fn raw(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned().flatten()
    }

    /// Trimmed text of a field, treating null like absence.
    pub fn text(&self, name: &str) -> Option<String> {
        self.field(name).flatten()
    }
}

fn json_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<FormBody, AppError> {
    let mut body = FormBody::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::rejected(e.status(), e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        let file_name = field.file_name().map(str::to_string);
        let Some(file_name) = file_name else {
            let text = field
                .text()
                .await
                .map_err(|e| AppError::rejected(e.status(), e.body_text()))?;
            body.fields.insert(name, Some(text));
            continue;
        };

        if name != IMAGES_FIELD {
            return Err(AppError::BadRequest(format!("Unexpected field: {name}")));
        }
        if body.files.len() == MAX_IMAGES {
            return Err(AppError::BadRequest("Too many files".to_string()));
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::rejected(e.status(), e.body_text()))?;

        let file = UploadFile {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        };
        media::check_upload(&file).map_err(AppError::BadRequest)?;
        body.files.push(file);
    }

    Ok(body)
}

impl<S> FromRequest<S> for FormBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::rejected(e.status(), e.body_text()))?;
            read_multipart(multipart).await
        } else if content_type.starts_with("application/json") {
            let Json(object) = Json::<Map<String, Value>>::from_request(req, state)
                .await
                .map_err(|e| AppError::rejected(e.status(), e.body_text()))?;
            Ok(FormBody {
                fields: object
                    .into_iter()
                    .map(|(k, v)| (k, json_text(v)))
                    .collect(),
                files: Vec::new(),
            })
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(pairs) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| AppError::rejected(e.status(), e.body_text()))?;
            Ok(FormBody {
                fields: pairs.into_iter().map(|(k, v)| (k, Some(v))).collect(),
                files: Vec::new(),
            })
        } else {
            // No recognised body: every field is absent.
            Ok(FormBody::default())
        }
    }
}
