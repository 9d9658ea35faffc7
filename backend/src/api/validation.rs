//! Shared input validation helpers.

use axum::extract::Multipart;
use bytes::Bytes;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::submission::Stage;

/// A parsed multipart form: text fields plus uploaded files.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: Vec<(String, String)>,
    pub files: Vec<UploadedPart>,
}

#[derive(Debug)]
pub struct UploadedPart {
    pub field: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub content: Bytes,
}

impl UploadForm {
    /// Drain a multipart body. Parts carrying a file name are files.
    pub async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Invalid multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let content = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::Validation(format!("Failed to read upload: {}", e)))?;
                    form.files.push(UploadedPart {
                        field: name,
                        file_name,
                        content_type,
                        content,
                    });
                }
                None => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(format!("Invalid form field: {}", e)))?;
                    form.fields.push((name, value));
                }
            }
        }
        Ok(form)
    }

    /// Trimmed, non-empty text field.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedPart> {
        let index = self.files.iter().position(|f| f.field == name)?;
        Some(self.files.remove(index))
    }

    pub fn take_files(&mut self, name: &str) -> Vec<UploadedPart> {
        let (matching, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|f| f.field == name);
        self.files = rest;
        matching
    }
}

/// Parse a stage value, naming the field in the error.
pub fn parse_stage(raw: Option<&str>, label: &str) -> Result<Stage> {
    raw.and_then(|value| value.parse::<Stage>().ok())
        .ok_or_else(|| AppError::Validation(format!("Invalid {}", label)))
}

/// HTML-form style boolean: `true`, `1`, `on`, `yes`.
pub fn parse_form_bool(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("true" | "1" | "on" | "yes")
    )
}

/// Positive round number, defaulting to 1.
pub fn parse_round(raw: Option<&str>) -> Result<i32> {
    match raw {
        None => Ok(1),
        Some(value) => value
            .trim()
            .parse::<i32>()
            .ok()
            .filter(|round| *round >= 1)
            .ok_or_else(|| AppError::Validation("Round must be a positive number".to_string())),
    }
}

pub fn parse_optional_uuid(raw: Option<&str>, label: &str) -> Result<Option<Uuid>> {
    raw.map(|value| {
        Uuid::parse_str(value.trim())
            .map_err(|_| AppError::Validation(format!("Invalid {}", label)))
    })
    .transpose()
}
