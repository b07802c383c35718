//! HTTP handlers for the image endpoints.
//!
//! Every JSON endpoint answers with the `{success, message, data}` envelope.
//! Validation and write failures are `success: false` envelopes at 200;
//! unresolved ids are plain 404s; only the download and static routes
//! return raw bytes.

use crate::{
    errors::AppError,
    models::{image::ImageRecord, response::ApiResponse},
    services::{
        file_store::file_extension,
        image_service::{ImageError, ImageService, mime_for},
    },
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use bytes::Bytes;
use tokio_util::io::ReaderStream;

/// `POST /api/images` — multipart upload with a single `file` field.
pub async fn upload_image(
    State(service): State<ImageService>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<ImageRecord>>, AppError> {
    let mut upload: Option<(String, Option<String>, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("reading multipart body: {}", err)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|err| AppError::bad_request(format!("reading upload payload: {}", err)))?;
        upload = Some((filename, content_type, bytes));
        break;
    }

    let Some((filename, content_type, bytes)) = upload else {
        return Ok(Json(ApiResponse::fail("missing multipart field `file`")));
    };

    // Coarse pre-check; the filename extension is the authoritative gate.
    if !content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("image/"))
    {
        return Ok(Json(ApiResponse::fail("only image files may be uploaded")));
    }

    match service.upload(&filename, bytes).await {
        Ok(record) => Ok(Json(ApiResponse::ok("image uploaded", record))),
        Err(ImageError::Validation(msg)) => Ok(Json(ApiResponse::fail(msg))),
        Err(ImageError::Io(err)) => Ok(Json(ApiResponse::fail(format!(
            "failed to store file: {}",
            err
        )))),
        Err(err) => Err(AppError::internal(err.to_string())),
    }
}

/// `GET /api/images` — records for every stored file.
pub async fn list_images(
    State(service): State<ImageService>,
) -> Result<Json<ApiResponse<Vec<ImageRecord>>>, AppError> {
    let records = service.list().await.map_err(into_app_error)?;
    Ok(Json(ApiResponse::ok("image list retrieved", records)))
}

/// `GET /api/images/{id}` — single record, 404 when the id resolves to nothing.
pub async fn get_image(
    State(service): State<ImageService>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ImageRecord>>, AppError> {
    let record = service.get(&id).await.map_err(into_app_error)?;
    Ok(Json(ApiResponse::ok("image retrieved", record)))
}

/// `GET /api/images/{id}/download` — stream the raw bytes as an attachment.
pub async fn download_image(
    State(service): State<ImageService>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let (record, file) = service.open_download(&id).await.map_err(into_app_error)?;

    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    *response.status_mut() = StatusCode::OK;
    set_file_headers(response.headers_mut(), &record.mime_type, record.size_bytes);
    let disposition = format!("attachment; filename=\"{}\"", record.filename);
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, value);
    }

    Ok(response)
}

/// `DELETE /api/images/{id}` — envelope with no payload on success.
pub async fn delete_image(
    State(service): State<ImageService>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    match service.delete(&id).await {
        Ok(()) => Ok(Json(ApiResponse::ok_empty("image deleted"))),
        Err(ImageError::NotFound(_)) => {
            Err(AppError::not_found(format!("image `{}` not found", id)))
        }
        Err(ImageError::Io(err)) => Ok(Json(ApiResponse::fail(format!(
            "failed to delete file: {}",
            err
        )))),
        Err(err) => Err(AppError::internal(err.to_string())),
    }
}

/// `GET /static/images/{filename}` — direct static serving of a stored file,
/// matching the `url` field of each record.
pub async fn serve_image(
    State(service): State<ImageService>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let (size_bytes, _) = service
        .store()
        .stat(&filename)
        .await
        .map_err(|err| into_app_error(err.into()))?;
    let file = service
        .store()
        .open(&filename)
        .await
        .map_err(|err| into_app_error(err.into()))?;

    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    *response.status_mut() = StatusCode::OK;
    set_file_headers(
        response.headers_mut(),
        mime_for(&file_extension(&filename)),
        size_bytes,
    );
    Ok(response)
}

fn set_file_headers(headers: &mut HeaderMap, mime_type: &str, size_bytes: u64) {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&size_bytes.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
}

fn into_app_error(err: ImageError) -> AppError {
    match err {
        ImageError::NotFound(_) => AppError::not_found(err.to_string()),
        other => AppError::internal(other.to_string()),
    }
}
