use anyhow::Context;
use axum::extract::Multipart;
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use super::dto::FileDescriptor;
use crate::{error::ApiError, storage::StorageClient};

pub(crate) const PHOTO_FIELD: &str = "image";
pub(crate) const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

pub(crate) struct UploadItem {
    pub file_name: String,
    pub content_type: String,
    pub body: Bytes,
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        _ => None,
    }
}

/// Human readable size in decimal units, e.g. `12.34 KB`.
pub(crate) fn format_file_size(bytes: usize) -> String {
    const UNITS: [&str; 7] = ["Bytes", "KB", "MB", "GB", "TB", "PB", "EB"];
    if bytes == 0 {
        return "0 Bytes".into();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    let rendered = format!("{:.2}", value);
    let rendered = rendered.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", rendered, UNITS[unit])
}

/// Pulls the photo field out of a multipart body.
pub(crate) async fn read_photo(mut mp: Multipart) -> Result<UploadItem, ApiError> {
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| ApiError::validation(e.body_text()))?
    {
        if field.name() != Some(PHOTO_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        if ext_from_mime(&content_type).is_none() {
            return Err(ApiError::validation(
                "Only png, jpg and jpeg images are allowed",
            ));
        }
        let body = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation(e.body_text()))?;
        if body.is_empty() {
            return Err(ApiError::validation("Uploaded file is empty"));
        }
        return Ok(UploadItem {
            file_name,
            content_type,
            body,
        });
    }
    Err(ApiError::validation("Please attach an image"))
}

/// Stores the item under the user's prefix and describes where it went.
pub(crate) async fn store_photo(
    storage: &dyn StorageClient,
    user_id: Uuid,
    item: UploadItem,
) -> anyhow::Result<FileDescriptor> {
    let ext = ext_from_mime(&item.content_type).unwrap_or("bin");
    let key = format!("users/{}/{}.{}", user_id, Uuid::new_v4(), ext);
    let size = item.body.len();
    storage
        .put_object(&key, item.body, &item.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    info!(user_id = %user_id, key = %key, size, "photo stored");

    Ok(FileDescriptor {
        file_name: item.file_name,
        file_path: storage.public_url(&key),
        file_type: item.content_type,
        file_size: format_file_size(size),
    })
}
