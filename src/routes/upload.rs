use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::post;
use axum::Router;
use serde::Serialize;
use uuid::Uuid;

use crate::app_state::SharedState;
use crate::error::ApiError;
use crate::media::MediaError;
use crate::response::ApiResponse;

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_FOLDER: &str = "uploads";

/// Accepted image types and the extension they are stored under.
const IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
    ("image/avif", "avif"),
];

#[derive(Debug, Serialize)]
pub struct UploadedMedia {
    pub url: String,
    pub key: String,
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    IMAGE_TYPES
        .iter()
        .find(|(mime, _)| mime.eq_ignore_ascii_case(essence))
        .map(|(_, ext)| *ext)
}

/// Lowercases and keeps `[a-z0-9_-]`; falls back to `uploads`.
pub fn sanitize_folder(folder: &str) -> String {
    let cleaned: String = folder
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-'))
        .collect();
    if cleaned.is_empty() {
        DEFAULT_FOLDER.to_string()
    } else {
        cleaned
    }
}

async fn upload(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<ApiResponse<UploadedMedia>, ApiError> {
    let media = state.media.clone().ok_or(MediaError::NotConfigured)?;

    let mut file: Option<(Vec<u8>, String)> = None;
    let mut folder = DEFAULT_FOLDER.to_string();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                file = Some((bytes.to_vec(), content_type));
            }
            "folder" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                folder = sanitize_folder(&text);
            }
            _ => {}
        }
    }

    let (bytes, content_type) = file.ok_or_else(|| ApiError::bad_request("No file uploaded"))?;
    if bytes.is_empty() {
        return Err(ApiError::bad_request("Uploaded file is empty"));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError::bad_request("File too large. Maximum size is 10MB"));
    }
    let ext = extension_for(&content_type).ok_or_else(|| {
        ApiError::bad_request("Invalid file type. Allowed: jpeg, png, webp, gif, avif")
    })?;

    let key = format!("{}/{}.{}", folder, Uuid::new_v4(), ext);
    let size = bytes.len();
    let url = media.put(&key, bytes, &content_type).await?;
    tracing::info!(%key, size, "media uploaded");

    Ok(ApiResponse::created(UploadedMedia { url, key }).message("File uploaded successfully"))
}

pub fn upload_routes() -> Router<SharedState> {
    // multipart framing needs some room above the file limit
    Router::new().route(
        "/upload",
        post(upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 1024 * 1024)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{body_json, TestApp};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};

    const BOUNDARY: &str = "estato-test-boundary";

    fn multipart_request(folder: Option<&str>, content_type: &str, data: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        if let Some(folder) = folder {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"folder\"\r\n\r\n{}\r\n",
                    BOUNDARY, folder
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"photo\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

        Request::post("/api/admin/upload")
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", TestApp::admin_token()),
            )
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn stores_image_under_folder() {
        let app = TestApp::new().await;
        let response = app
            .send(multipart_request(Some("Banners"), "image/png", b"\x89PNG fake"))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        let key = body["data"]["key"].as_str().unwrap().to_string();
        assert!(key.starts_with("banners/"));
        assert!(key.ends_with(".png"));
        assert_eq!(
            body["data"]["url"],
            format!("https://media.estato.test/{}", key)
        );

        let uploads = app.media.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0], (key, "image/png".to_string(), 9));
    }

    #[tokio::test]
    async fn rejects_non_images() {
        let app = TestApp::new().await;
        let response = app
            .send(multipart_request(None, "application/pdf", b"%PDF-1.7"))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(
            body["error"],
            "Invalid file type. Allowed: jpeg, png, webp, gif, avif"
        );
        assert!(app.media.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fails_without_media_store() {
        let app = TestApp::without_media().await;
        let response = app
            .send(multipart_request(None, "image/jpeg", b"jpeg"))
            .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Media uploads are not configured");
    }

    #[test]
    fn folder_is_sanitized() {
        assert_eq!(sanitize_folder("Banners"), "banners");
        assert_eq!(sanitize_folder("../../etc"), "etc");
        assert_eq!(sanitize_folder("blog covers!"), "blogcovers");
        assert_eq!(sanitize_folder(" ./ "), "uploads");
    }

    #[test]
    fn only_images_are_accepted() {
        assert_eq!(extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for("IMAGE/PNG"), Some("png"));
        assert_eq!(extension_for("image/webp; q=1"), Some("webp"));
        assert_eq!(extension_for("application/pdf"), None);
        assert_eq!(extension_for(""), None);
    }
}
