use axum::{extract::State, http::StatusCode, Json};
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use std::path::PathBuf;
use uuid::Uuid;

use crate::{
    api::{
        extract::{ApiJson, AuthUser},
        ApiError, ApiResult,
    },
    db::repositories::{public_url, ProfileRepository, UploadRepository},
    state::AppState,
};
use orkut_types::{Upload, UploadPhotoRequest, UploadPhotoResponse};

/// Accepted image types and the extension they are stored with
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

/// POST /api/upload-photo - Store a profile photo and point the profile at it
pub async fn upload_photo(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<UploadPhotoRequest>,
) -> ApiResult<(StatusCode, Json<UploadPhotoResponse>)> {
    let content_type = payload.content_type.trim().to_lowercase();
    let extension = extension_for(&content_type).ok_or_else(|| {
        ApiError::BadRequest(
            "Invalid file type. Only JPEG, PNG, GIF, and WEBP are allowed.".to_string(),
        )
    })?;

    let max_bytes = state.settings.uploads.max_bytes;
    let bytes = decode_payload(&payload.data, max_bytes)?;

    let upload_id = Uuid::new_v4();
    let uploads_dir = PathBuf::from(&state.settings.uploads.dir);
    tokio::fs::create_dir_all(&uploads_dir).await?;

    let stored_path = uploads_dir.join(format!("{}.{}", upload_id, extension));
    tokio::fs::write(&stored_path, &bytes).await?;
    let stored_path = stored_path.to_string_lossy().into_owned();

    let upload = Upload {
        id: upload_id,
        user_id: auth.user_id,
        file_name: payload.file_name.trim().to_string(),
        content_type,
        size_bytes: bytes.len() as i64,
        url: public_url(&stored_path),
        created_at: Utc::now(),
    };

    let pool = state.db.pool.clone();
    let recorded = UploadRepository::new(pool.clone())
        .create(&upload, &stored_path)
        .and_then(|_| ProfileRepository::new(pool).set_photo_url(&auth.user_id, &upload.url));

    if let Err(e) = recorded {
        // the file is useless without its row
        let _ = tokio::fs::remove_file(&stored_path).await;
        return Err(e.into());
    }

    tracing::info!("Stored {} byte photo for {}", upload.size_bytes, auth.user_id);
    let photo_url = upload.url.clone();
    Ok((StatusCode::CREATED, Json(UploadPhotoResponse { upload, photo_url })))
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    ALLOWED_TYPES
        .iter()
        .find(|(mime, _)| *mime == content_type)
        .map(|(_, ext)| *ext)
}

/// Decode base64 data, with or without a `data:<type>;base64,` prefix
fn decode_payload(data: &str, max_bytes: usize) -> ApiResult<Vec<u8>> {
    let encoded = match data.split_once(',') {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    }
    .trim();

    if encoded.is_empty() {
        return Err(ApiError::BadRequest("Image data is empty".to_string()));
    }

    // reject before decoding when the encoded size already rules it out
    if encoded.len() / 4 * 3 > max_bytes + 2 {
        return Err(too_large(max_bytes));
    }

    let bytes = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| ApiError::BadRequest("Invalid base64 image data".to_string()))?;

    if bytes.len() > max_bytes {
        return Err(too_large(max_bytes));
    }
    Ok(bytes)
}

fn too_large(max_bytes: usize) -> ApiError {
    ApiError::PayloadTooLarge(format!("Images are limited to {} bytes", max_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_data_url_prefix() {
        let encoded = general_purpose::STANDARD.encode(b"GIF89a");
        let data = format!("data:image/gif;base64,{}", encoded);
        assert_eq!(decode_payload(&data, 1024).unwrap(), b"GIF89a");
        assert_eq!(decode_payload(&encoded, 1024).unwrap(), b"GIF89a");
    }

    #[test]
    fn rejects_bad_and_oversized_payloads() {
        assert!(matches!(decode_payload("", 10), Err(ApiError::BadRequest(_))));
        assert!(matches!(decode_payload("%%%not base64", 1024), Err(ApiError::BadRequest(_))));

        let big = general_purpose::STANDARD.encode(vec![0u8; 64]);
        assert!(matches!(decode_payload(&big, 63), Err(ApiError::PayloadTooLarge(_))));
        assert!(decode_payload(&big, 64).is_ok());
    }

    #[test]
    fn only_images_are_allowed() {
        assert_eq!(extension_for("image/png"), Some("png"));
        assert_eq!(extension_for("image/jpg"), Some("jpg"));
        assert_eq!(extension_for("application/pdf"), None);
    }
}
