use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, header},
    response::IntoResponse,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeFile;

use super::types::{PhotoDto, SearchQuery, SearchResponse};
use super::{ApiError, AppState};

/// GET /search?partCode=
/// List the image files in a part's indexed directory. Each photo is
/// returned with the URL it can be streamed from. Order follows the
/// directory listing and is not sorted.
pub async fn search_photos(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let part_code = query
        .part_code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing partCode query parameter"))?;

    let entry = state
        .store()
        .get_catalog_entry(part_code)
        .await?
        .ok_or_else(|| ApiError::not_found("Unknown part code"))?;

    let photos = list_image_files(&entry.directory_path)
        .await?
        .into_iter()
        .map(|filename| PhotoDto {
            url: format!("/photo/{part_code}/{filename}"),
            filename,
        })
        .collect();

    Ok(Json(SearchResponse {
        part_code: part_code.to_string(),
        photos,
    }))
}

/// GET /photo/{partCode}/{filename}
/// Stream one photo's bytes. The content type is inferred from the
/// filename extension, falling back to JPEG. A `Range` header, when
/// present, is honored for partial content.
pub async fn stream_photo(
    State(state): State<Arc<AppState>>,
    Path((part_code, filename)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let entry = state
        .store()
        .get_catalog_entry(&part_code)
        .await?
        .ok_or_else(|| ApiError::not_found("Unknown part code"))?;

    let path = resolve_photo_path(&entry.directory_path, &filename).await?;
    let mime = mime_guess::from_path(&filename).first_or(mime_guess::mime::IMAGE_JPEG);

    let mut builder = axum::http::Request::builder();
    if let Some(range) = headers.get(header::RANGE) {
        builder = builder.header(header::RANGE, range);
    }
    let req = builder
        .body(Body::empty())
        .map_err(|e| ApiError::internal(format!("Failed to build request: {e}")))?;

    match ServeFile::new_with_mime(&path, &mime).try_call(req).await {
        Ok(response) => Ok(response),
        Err(e) => Err(ApiError::io(
            format!("Failed to stream {}", path.display()),
            &e,
        )),
    }
}

/// Join `filename` onto the indexed directory and canonicalize both
/// sides. The resolved file must stay inside the directory, so `..`
/// segments cannot reach files the index never exposed.
async fn resolve_photo_path(directory: &str, filename: &str) -> Result<PathBuf, ApiError> {
    let root = tokio::fs::canonicalize(directory)
        .await
        .map_err(|e| ApiError::io(format!("Cannot open photo directory {directory}"), &e))?;

    let candidate = root.join(filename);
    let resolved = tokio::fs::canonicalize(&candidate)
        .await
        .map_err(|e| ApiError::io(format!("Cannot open photo {}", candidate.display()), &e))?;

    if !resolved.starts_with(&root) {
        tracing::warn!(requested = %filename, "Rejected photo path outside its indexed directory");
        return Err(ApiError::bad_request(
            "Filename escapes the photo directory",
        ));
    }

    Ok(resolved)
}

async fn list_image_files(directory: &str) -> Result<Vec<String>, ApiError> {
    let mut entries = tokio::fs::read_dir(directory)
        .await
        .map_err(|e| ApiError::io(format!("Cannot read photo directory {directory}"), &e))?;

    let mut photos = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ApiError::io(format!("Cannot read photo directory {directory}"), &e))?
    {
        // Non-UTF-8 filenames cannot appear in a JSON listing, skip them.
        let Ok(filename) = entry.file_name().into_string() else {
            continue;
        };
        if is_image(&filename) {
            photos.push(filename);
        }
    }
    Ok(photos)
}

fn is_image(filename: &str) -> bool {
    mime_guess::from_path(filename)
        .first()
        .is_some_and(|mime| mime.type_() == mime_guess::mime::IMAGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_extensions_are_recognized() {
        assert!(is_image("front.jpg"));
        assert!(is_image("back.PNG"));
        assert!(is_image("detail.webp"));
        assert!(!is_image("notes.txt"));
        assert!(!is_image("clip.mp4"));
        assert!(!is_image("no_extension"));
    }

    #[tokio::test]
    async fn traversal_outside_the_directory_is_rejected() {
        let base = std::env::temp_dir().join(format!("partpix-photos-{}", std::process::id()));
        let inside = base.join("inside");
        std::fs::create_dir_all(&inside).unwrap();
        std::fs::write(base.join("secret.txt"), b"outside").unwrap();
        std::fs::write(inside.join("ok.jpg"), b"inside").unwrap();

        let dir = inside.to_str().unwrap();

        let ok = resolve_photo_path(dir, "ok.jpg").await.unwrap();
        assert!(ok.ends_with("ok.jpg"));

        let err = resolve_photo_path(dir, "../secret.txt").await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        std::fs::remove_dir_all(&base).unwrap();
    }

    #[tokio::test]
    async fn missing_photo_reports_an_io_failure() {
        let base = std::env::temp_dir().join(format!("partpix-missing-{}", std::process::id()));
        std::fs::create_dir_all(&base).unwrap();

        let err = resolve_photo_path(base.to_str().unwrap(), "nope.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Internal { .. }));

        std::fs::remove_dir_all(&base).unwrap();
    }
}
