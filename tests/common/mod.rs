//! Shared helpers for the HTTP API tests.

#![allow(dead_code)]

use std::path::PathBuf;

use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use imageuploadservice::storage::LocalStorage;
use imageuploadservice::{AppState, Config, create_router};
use serde_json::Value;
use tempfile::TempDir;

pub const INDEX_HTML: &str = "<!doctype html><title>Image Uploader</title>";

/// A running router backed by throwaway directories.
pub struct TestApp {
    pub server: TestServer,
    /// Holds the storage root (`uploads/`) and anything tests place beside it.
    pub workspace: TempDir,
    pub static_dir: TempDir,
}

impl TestApp {
    pub fn upload_dir(&self) -> PathBuf {
        self.workspace.path().join("uploads")
    }

    /// Upload `parts` into `folder` and return the JSON body.
    pub async fn upload(&self, folder: &str, parts: Vec<Part>) -> Value {
        let response = self
            .server
            .post("/upload")
            .multipart(upload_form(folder, parts))
            .await;
        response.assert_status_ok();
        response.json::<Value>()
    }

    pub async fn folders(&self) -> Vec<Value> {
        let response = self.server.get("/folders").await;
        response.assert_status_ok();
        response.json::<Value>()["folders"]
            .as_array()
            .cloned()
            .unwrap_or_default()
    }

    /// Number of entries left in the staging area.
    pub fn staged_count(&self) -> usize {
        std::fs::read_dir(self.upload_dir().join("temp"))
            .unwrap()
            .count()
    }
}

/// Create a test server with empty storage and a stub UI.
pub async fn spawn_app() -> TestApp {
    let workspace = TempDir::new().expect("Failed to create workspace");
    let static_dir = TempDir::new().expect("Failed to create static dir");
    std::fs::write(static_dir.path().join("index.html"), INDEX_HTML).unwrap();
    std::fs::write(static_dir.path().join("app.js"), "console.log('ui');").unwrap();

    let config = Config {
        upload_dir: workspace.path().join("uploads"),
        static_dir: static_dir.path().to_path_buf(),
        ..Config::default()
    };

    let storage = LocalStorage::new(&config.upload_dir)
        .await
        .expect("Failed to create storage");

    let server = TestServer::new(create_router(AppState { storage, config }))
        .expect("Failed to create test server");

    TestApp {
        server,
        workspace,
        static_dir,
    }
}

/// A file part with the given bytes, filename and declared content type.
pub fn file_part(content: Vec<u8>, file_name: &str, mime_type: &str) -> Part {
    Part::bytes(content)
        .file_name(file_name.to_string())
        .mime_type(mime_type.to_string())
}

pub fn png_part(content: Vec<u8>, file_name: &str) -> Part {
    file_part(content, file_name, "image/png")
}

/// Multipart form with the folder name first, then every part under `images`.
pub fn upload_form(folder: &str, parts: Vec<Part>) -> MultipartForm {
    parts.into_iter().fold(
        MultipartForm::new().add_text("folderName", folder.to_string()),
        |form, part| form.add_part("images", part),
    )
}
