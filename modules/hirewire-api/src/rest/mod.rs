pub mod auth;
pub mod jobs;
pub mod notifications;
pub mod posts;
pub mod profiles;
pub mod social;

use std::collections::HashMap;

use axum::extract::Multipart;
use axum::response::Json;
use serde::Serialize;

use hirewire_common::error::Result;
use hirewire_common::Error;

/// Standard collection envelope.
pub fn listing<T: Serialize>(total_count: i64, results: T) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "total_count": total_count,
        "results": results,
    }))
}

/// Standard mutation envelope.
pub fn detail(message: &str) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "detail": message }))
}

/// A file part lifted out of a multipart body.
pub struct UploadedFile {
    pub field: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Text fields and file parts from a multipart form, in arrival order for
/// the files (image order follows upload order).
pub struct FormData {
    pub fields: HashMap<String, String>,
    pub files: Vec<UploadedFile>,
}

pub async fn read_multipart(mut multipart: Multipart) -> Result<FormData> {
    let mut fields = HashMap::new();
    let mut files = Vec::new();

    while let Some(part) = multipart
        .next_field()
        .await
        .map_err(|e| Error::validation(format!("malformed multipart body: {e}")))?
    {
        let name = part.name().unwrap_or_default().to_string();

        // File parts carry a filename; everything else is a text field.
        if part.file_name().is_some() {
            let content_type = part
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = part
                .bytes()
                .await
                .map_err(|e| Error::validation(format!("failed to read upload: {e}")))?;
            files.push(UploadedFile {
                field: name,
                content_type,
                bytes: bytes.to_vec(),
            });
        } else {
            let text = part
                .text()
                .await
                .map_err(|e| Error::validation(format!("failed to read field: {e}")))?;
            fields.insert(name, text);
        }
    }

    Ok(FormData { fields, files })
}
