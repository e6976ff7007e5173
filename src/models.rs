use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{FileInfo, FolderInfo};

/// One stored file as reported back by `POST /upload`.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadedFile {
    pub filename: String,
    pub size: u64,
    pub mimetype: String,
    /// Location relative to the storage root (`<folder>/<filename>`).
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderResponse {
    pub name: String,
    pub path: String,
    pub file_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FolderInfo> for FolderResponse {
    fn from(folder: FolderInfo) -> Self {
        Self {
            path: folder.name.clone(),
            name: folder.name,
            file_count: folder.file_count,
            created_at: folder.created_at,
            updated_at: folder.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FolderListResponse {
    pub success: bool,
    pub folders: Vec<FolderResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub is_image: bool,
    pub url: String,
    pub download_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileResponse {
    pub fn new(folder: &str, file: FileInfo, is_image: bool) -> Self {
        let encoded_folder = urlencoding::encode(folder);
        let encoded_file = urlencoding::encode(&file.name);

        Self {
            path: format!("{}/{}", folder, file.name),
            url: format!("/uploads/{}/{}", encoded_folder, encoded_file),
            download_url: format!("/download/{}/{}", encoded_folder, encoded_file),
            name: file.name,
            size: file.size,
            is_image,
            created_at: file.created_at,
            updated_at: file.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FolderContentsResponse {
    pub success: bool,
    pub folder: String,
    pub files: Vec<FileResponse>,
}

/// Body shared by every failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
