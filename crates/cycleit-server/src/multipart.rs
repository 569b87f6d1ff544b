//! Buffering of multipart form submissions.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::Multipart;

use crate::error::ServerError;

/// A file part of a multipart form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedFile {
    /// Parts that declare a non-image content type are not images.
    pub fn looks_like_image(&self) -> bool {
        self.content_type
            .as_deref()
            .map_or(true, |ct| ct.starts_with("image/") || ct == "application/octet-stream")
    }
}

/// Text fields by name plus every file part in submission order.
#[derive(Debug, Default)]
pub struct FormData {
    pub fields: HashMap<String, String>,
    pub files: Vec<(String, UploadedFile)>,
}

impl FormData {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ServerError> {
        let mut form = FormData::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| ServerError::BadRequest(format!("Failed to read field: {}", e)))?;

            match file_name {
                Some(file_name) => form.files.push((
                    name,
                    UploadedFile {
                        file_name,
                        content_type,
                        data,
                    },
                )),
                None => {
                    let text = String::from_utf8(data.to_vec()).map_err(|_| {
                        ServerError::BadRequest(format!("Field '{name}' is not valid UTF-8"))
                    })?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn required(&self, name: &str) -> Result<&str, ServerError> {
        self.text(name)
            .ok_or_else(|| ServerError::BadRequest(format!("Missing '{name}' field")))
    }

    /// Remove and return every file submitted under `name`.
    pub fn take_files(&mut self, name: &str) -> Vec<UploadedFile> {
        let (matching, rest): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.files).into_iter().partition(|(n, _)| n == name);
        self.files = rest;
        matching.into_iter().map(|(_, f)| f).collect()
    }
}
