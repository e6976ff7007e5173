use axum::{
    Json,
    body::Body,
    extract::{
        Multipart, Path, Request, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{error, info, warn};

use crate::{
    error::AppError,
    models::*,
    state::AppState,
    storage::{STAGING_DIR, StagedUpload, StorageError},
    utils::{attachment_disposition, generate_filename, is_image_extension, is_image_mime_type},
};

/// Multipart field carrying the target folder name.
pub const FOLDER_FIELD: &str = "folderName";

/// Multipart field carrying the image parts.
pub const IMAGES_FIELD: &str = "images";

/// Path prefixes owned by the API; the UI fallback never answers for them.
const API_PREFIXES: [&str; 3] = ["/folders", "/upload", "/download"];

fn multipart_error(e: MultipartError) -> AppError {
    error!("Error parsing multipart: {}", e);
    AppError::MultipartError(format!("Failed to parse multipart form: {}", e.body_text()))
}

fn upload_error(e: StorageError) -> AppError {
    match e {
        StorageError::InvalidName(_) => e.into(),
        other => AppError::internal("Error uploading files", other),
    }
}

/// Upload one or more images into a named folder using multipart/form-data.
///
/// Every part is streamed into the staging area first, so the folder name may
/// arrive before or after the files. Nothing reaches the folder unless the
/// whole form is accepted.
pub async fn upload_files(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart.map_err(|e| {
        error!("Rejected upload body: {}", e);
        AppError::MultipartError(e.body_text())
    })?;

    let max_file_size = state.config.max_file_size;
    let mut folder_name: Option<String> = None;
    let mut staged: Vec<(StagedUpload, String)> = Vec::new();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or("").to_string();

        // Parts without a filename are plain form values
        if field.file_name().is_none() {
            if field_name == FOLDER_FIELD {
                folder_name = Some(field.text().await.map_err(multipart_error)?);
            }
            continue;
        }

        if field_name != IMAGES_FIELD {
            warn!("Rejected file part in unexpected field {}", field_name);
            return Err(AppError::BadRequest(format!(
                "Unexpected field \"{}\"",
                field_name
            )));
        }

        let mimetype = field.content_type().unwrap_or("").to_string();
        if !is_image_mime_type(&mimetype) {
            warn!("Rejected upload with content type {:?}", mimetype);
            return Err(AppError::UnSupportedMediaType(
                "Not an image! Please upload only images.".into(),
            ));
        }

        let original_filename = field.file_name().unwrap_or("").to_string();
        let mut upload = state
            .storage
            .stage(generate_filename(&field_name, &original_filename))
            .await
            .map_err(upload_error)?;

        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            if upload.size() + chunk.len() as u64 > max_file_size {
                warn!(
                    "File {} exceeds maximum limit of {} bytes",
                    original_filename, max_file_size
                );
                return Err(AppError::PayloadTooLarge(format!(
                    "File \"{}\" exceeds maximum limit of {} bytes",
                    original_filename, max_file_size
                )));
            }
            upload.write_chunk(&chunk).await.map_err(upload_error)?;
        }
        upload.finish().await.map_err(upload_error)?;

        staged.push((upload, mimetype));
    }

    if staged.is_empty() {
        return Err(AppError::BadRequest("No files uploaded".into()));
    }

    let folder_name = folder_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::BadRequest("Folder name is required".into()))?;

    state
        .storage
        .create_folder(&folder_name)
        .await
        .map_err(upload_error)?;

    let count = staged.len();
    let mut files = Vec::with_capacity(count);
    for (upload, mimetype) in staged {
        let filename = upload.filename().to_string();
        let size = upload.size();
        let path = state
            .storage
            .commit(upload, &folder_name)
            .await
            .map_err(upload_error)?;

        files.push(UploadedFile {
            filename,
            size,
            mimetype,
            path,
        });
    }

    info!("{} files uploaded to folder {}", count, folder_name);

    Ok(Json(UploadResponse {
        success: true,
        message: format!(
            "{} files uploaded successfully to folder \"{}\"",
            count, folder_name
        ),
        files,
    }))
}

/// List every folder under the storage root.
pub async fn list_folders(
    State(state): State<AppState>,
) -> Result<Json<FolderListResponse>, AppError> {
    let folders = state
        .storage
        .list_folders()
        .await
        .map_err(|e| AppError::internal("Error listing folders", e))?;

    Ok(Json(FolderListResponse {
        success: true,
        folders: folders.into_iter().map(FolderResponse::from).collect(),
    }))
}

/// List the files of one folder.
pub async fn get_folder(
    State(state): State<AppState>,
    Path(folder_name): Path<String>,
) -> Result<Json<FolderContentsResponse>, AppError> {
    let files = state
        .storage
        .list_files(&folder_name)
        .await
        .map_err(|e| match e {
            StorageError::NotFound(_) => {
                AppError::NotFound(format!("Folder \"{}\" not found", folder_name))
            }
            other => AppError::internal("Error listing files", other),
        })?;

    let files = files
        .into_iter()
        .map(|file| {
            let is_image = is_image_extension(&file.name);
            FileResponse::new(&folder_name, file, is_image)
        })
        .collect();

    Ok(Json(FolderContentsResponse {
        success: true,
        folder: folder_name,
        files,
    }))
}

/// Stream a stored file back as an attachment.
pub async fn download_file(
    State(state): State<AppState>,
    Path((folder_name, file_name)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let (file, length) = state
        .storage
        .open_file(&folder_name, &file_name)
        .await
        .map_err(|e| match e {
            StorageError::NotFound(_) => AppError::NotFound(format!(
                "File \"{}\" not found in folder \"{}\"",
                file_name, folder_name
            )),
            other => AppError::internal("Error downloading file", other),
        })?;

    let content_type = mime_guess::from_path(&file_name).first_or_octet_stream();

    // Force a download while keeping the stored filename
    let disposition = HeaderValue::from_str(&attachment_disposition(&file_name))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(header::CONTENT_LENGTH, length)
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::internal("Error downloading file", e))
}

fn is_api_path(path: &str) -> bool {
    API_PREFIXES.iter().any(|prefix| {
        path.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

/// True when a path below `/uploads` points into the staging area.
fn is_staging_path(path: &str) -> bool {
    let Ok(decoded) = urlencoding::decode(path) else {
        return true;
    };
    std::path::Path::new(decoded.trim_start_matches('/'))
        .components()
        .find(|c| matches!(c, std::path::Component::Normal(_)))
        .is_some_and(|c| c.as_os_str() == STAGING_DIR)
}

/// Serve stored files inline under `/uploads`, hiding uploads still in staging.
pub async fn serve_stored(State(state): State<AppState>, request: Request) -> Response {
    if is_staging_path(request.uri().path()) {
        return AppError::NotFound("File not found".into()).into_response();
    }

    match ServeDir::new(state.storage.base_path()).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

/// Serve the browser UI, answering unknown client-side routes with its entry page.
pub async fn serve_ui(State(state): State<AppState>, request: Request) -> Response {
    let path = request.uri().path();
    let is_read = matches!(*request.method(), Method::GET | Method::HEAD);

    if !is_read || is_api_path(path) {
        return AppError::NotFound(format!("Route {} not found", path)).into_response();
    }

    let static_dir = &state.config.static_dir;
    let index = ServeFile::new(static_dir.join("index.html"));

    match ServeDir::new(static_dir).fallback(index).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

pub async fn health_check() -> &'static str {
    "OK"
}
