use std::{
    fs::Metadata,
    io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use tempfile::{Builder, TempPath};
use tokio::{fs, io::AsyncWriteExt};
use tracing::warn;

use super::{FileInfo, FolderInfo, STAGING_DIR, StorageError};
use crate::utils::is_safe_path_segment;

// Local filesystem storage
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf, // Storage root; folders are its immediate subdirectories
}

/// An upload being streamed into the staging area.
///
/// The staged file is removed when this value is dropped, unless it was
/// committed into a folder first.
#[derive(Debug)]
pub struct StagedUpload {
    file: fs::File,
    path: TempPath,
    filename: String,
    size: u64,
}

impl StagedUpload {
    /// Final filename the upload will get inside its folder.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Bytes written so far.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        self.file.write_all(chunk).await?;
        self.size += chunk.len() as u64;
        Ok(())
    }

    /// Flushes buffered bytes to disk once the part has been fully received.
    pub async fn finish(&mut self) -> Result<(), StorageError> {
        self.file.flush().await?;
        Ok(())
    }
}

impl LocalStorage {
    /// Creates the storage root and its staging directory if they are missing.
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_path = base_path.into();
        fs::create_dir_all(base_path.join(STAGING_DIR)).await?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn staging_path(&self) -> PathBuf {
        self.base_path.join(STAGING_DIR)
    }

    /// Resolves a folder name to its directory, refusing anything that is not
    /// a single plain component or that names the staging area.
    fn folder_path(&self, folder: &str) -> Result<PathBuf, StorageError> {
        if !is_safe_path_segment(folder) || folder == STAGING_DIR {
            return Err(StorageError::InvalidName(folder.to_string()));
        }
        Ok(self.base_path.join(folder))
    }

    /// Lists every folder under the root, sorted by name.
    pub async fn list_folders(&self) -> Result<Vec<FolderInfo>, StorageError> {
        let mut folders = Vec::new();
        let mut entries = fs::read_dir(&self.base_path).await?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }

            let Ok(name) = entry.file_name().into_string() else {
                warn!("Skipping folder with non UTF-8 name: {:?}", entry.path());
                continue;
            };
            if name == STAGING_DIR {
                continue;
            }

            let metadata = entry.metadata().await?;
            let (created_at, updated_at) = timestamps(&metadata)?;
            let file_count = count_files(&entry.path()).await?;

            folders.push(FolderInfo {
                name,
                file_count,
                created_at,
                updated_at,
            });
        }

        folders.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(folders)
    }

    /// Lists the regular files of a folder, sorted by name.
    pub async fn list_files(&self, folder: &str) -> Result<Vec<FileInfo>, StorageError> {
        let folder_path = self.existing_folder(folder).await?;
        let mut files = Vec::new();
        let mut entries = fs::read_dir(&folder_path).await?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }

            let Ok(name) = entry.file_name().into_string() else {
                warn!("Skipping file with non UTF-8 name: {:?}", entry.path());
                continue;
            };

            let metadata = entry.metadata().await?;
            let (created_at, updated_at) = timestamps(&metadata)?;

            files.push(FileInfo {
                name,
                size: metadata.len(),
                created_at,
                updated_at,
            });
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Opens a stored file for streaming, returning it with its length.
    pub async fn open_file(
        &self,
        folder: &str,
        file: &str,
    ) -> Result<(fs::File, u64), StorageError> {
        let folder_path = self.existing_folder(folder).await?;
        if !is_safe_path_segment(file) {
            return Err(StorageError::NotFound(format!("{}/{}", folder, file)));
        }

        let file_path = folder_path.join(file);
        let metadata = match fs::symlink_metadata(&file_path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(StorageError::NotFound(format!("{}/{}", folder, file))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(format!("{}/{}", folder, file)));
            }
            Err(e) => return Err(e.into()),
        };

        let handle = fs::File::open(&file_path).await?;
        Ok((handle, metadata.len()))
    }

    /// Creates the folder if needed and returns its directory.
    pub async fn create_folder(&self, folder: &str) -> Result<PathBuf, StorageError> {
        let folder_path = self.folder_path(folder)?;
        fs::create_dir_all(&folder_path).await?;
        Ok(folder_path)
    }

    /// Opens a new staged upload that will be stored as `filename`.
    pub async fn stage(&self, filename: String) -> Result<StagedUpload, StorageError> {
        let staging = self.staging_path();
        let temp = tokio::task::spawn_blocking(move || {
            Builder::new().prefix(".upload-").tempfile_in(staging)
        })
        .await
        .map_err(io::Error::other)??;

        let (file, path) = temp.into_parts();
        Ok(StagedUpload {
            file: fs::File::from_std(file),
            path,
            filename,
            size: 0,
        })
    }

    /// Moves a staged upload into `folder` and returns its path relative to the root.
    ///
    /// An existing file with the same name is never overwritten.
    pub async fn commit(&self, staged: StagedUpload, folder: &str) -> Result<String, StorageError> {
        let target = self.folder_path(folder)?.join(&staged.filename);
        let StagedUpload {
            mut file,
            path,
            filename,
            ..
        } = staged;

        file.flush().await?;
        drop(file);

        tokio::task::spawn_blocking(move || path.persist_noclobber(target))
            .await
            .map_err(io::Error::other)??;

        Ok(format!("{}/{}", folder, filename))
    }

    /// Resolves a folder that must already exist as a real directory.
    async fn existing_folder(&self, folder: &str) -> Result<PathBuf, StorageError> {
        let folder_path = self
            .folder_path(folder)
            .map_err(|_| StorageError::NotFound(folder.to_string()))?;

        match fs::symlink_metadata(&folder_path).await {
            Ok(metadata) if metadata.is_dir() => Ok(folder_path),
            Ok(_) => Err(StorageError::NotFound(folder.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(folder.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Creation and modification times; filesystems without birth times report
/// the modification time for both.
fn timestamps(metadata: &Metadata) -> io::Result<(DateTime<Utc>, DateTime<Utc>)> {
    let modified = metadata.modified()?;
    let created = metadata.created().unwrap_or(modified);
    Ok((created.into(), modified.into()))
}

async fn count_files(dir: &Path) -> io::Result<usize> {
    let mut count = 0;
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn storage() -> (TempDir, LocalStorage) {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().join("uploads")).await.unwrap();
        (dir, storage)
    }

    async fn store(storage: &LocalStorage, folder: &str, filename: &str, content: &[u8]) -> String {
        storage.create_folder(folder).await.unwrap();
        let mut staged = storage.stage(filename.to_string()).await.unwrap();
        staged.write_chunk(content).await.unwrap();
        staged.finish().await.unwrap();
        storage.commit(staged, folder).await.unwrap()
    }

    #[tokio::test]
    async fn test_new_creates_root_and_staging() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("nested").join("uploads");

        let storage = LocalStorage::new(&root).await.unwrap();
        assert!(root.join(STAGING_DIR).is_dir());

        // Idempotent
        LocalStorage::new(&root).await.unwrap();
        assert_eq!(storage.base_path(), root.as_path());
    }

    #[tokio::test]
    async fn test_list_folders_empty_hides_staging() {
        let (_dir, storage) = storage().await;
        assert!(storage.list_folders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_folders_sorted_with_counts() {
        let (_dir, storage) = storage().await;
        store(&storage, "beta", "one.png", b"1").await;
        store(&storage, "alpha", "one.png", b"1").await;
        store(&storage, "alpha", "two.png", b"22").await;
        std::fs::write(storage.base_path().join("stray.txt"), b"not a folder").unwrap();
        std::fs::create_dir(storage.base_path().join("alpha").join("sub")).unwrap();

        let folders = storage.list_folders().await.unwrap();
        let names: Vec<&str> = folders.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert_eq!(folders[0].file_count, 2);
        assert_eq!(folders[1].file_count, 1);
    }

    #[tokio::test]
    async fn test_list_files_skips_directories() {
        let (_dir, storage) = storage().await;
        store(&storage, "pics", "b.png", b"bb").await;
        store(&storage, "pics", "a.txt", b"a").await;
        std::fs::create_dir(storage.base_path().join("pics").join("nested")).unwrap();

        let files = storage.list_files("pics").await.unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].name, "a.txt");
        assert_eq!(files[0].size, 1);
        assert_eq!(files[1].name, "b.png");
        assert_eq!(files[1].size, 2);
    }

    #[tokio::test]
    async fn test_list_files_not_found() {
        let (_dir, storage) = storage().await;
        std::fs::write(storage.base_path().join("plain"), b"x").unwrap();

        for folder in ["missing", "plain", STAGING_DIR, "..", "../uploads", ""] {
            assert!(
                matches!(
                    storage.list_files(folder).await,
                    Err(StorageError::NotFound(_))
                ),
                "{:?}",
                folder
            );
        }
    }

    #[tokio::test]
    async fn test_open_file() {
        let (_dir, storage) = storage().await;
        let path = store(&storage, "docs", "note.png", b"hello").await;
        assert_eq!(path, "docs/note.png");

        let (_handle, len) = storage.open_file("docs", "note.png").await.unwrap();
        assert_eq!(len, 5);

        assert!(matches!(
            storage.open_file("docs", "missing.png").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            storage.open_file("docs", "../docs/note.png").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_open_file_outside_root() {
        let (dir, storage) = storage().await;
        std::fs::write(dir.path().join("secret.txt"), b"secret").unwrap();

        assert!(matches!(
            storage.open_file("..", "secret.txt").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_dropped_stage_leaves_nothing() {
        let (_dir, storage) = storage().await;
        let mut staged = storage.stage("images-1-2.png".to_string()).await.unwrap();
        staged.write_chunk(b"partial").await.unwrap();
        assert_eq!(staged.size(), 7);
        drop(staged);

        let leftovers = std::fs::read_dir(storage.base_path().join(STAGING_DIR))
            .unwrap()
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_commit_does_not_overwrite() {
        let (_dir, storage) = storage().await;
        store(&storage, "pics", "same.png", b"first").await;

        let mut staged = storage.stage("same.png".to_string()).await.unwrap();
        staged.write_chunk(b"second").await.unwrap();
        assert!(storage.commit(staged, "pics").await.is_err());

        let content = std::fs::read(storage.base_path().join("pics").join("same.png")).unwrap();
        assert_eq!(content, b"first");
    }

    #[tokio::test]
    async fn test_create_folder_rejects_unsafe_names() {
        let (_dir, storage) = storage().await;
        for folder in ["", "..", "a/b", STAGING_DIR] {
            assert!(matches!(
                storage.create_folder(folder).await,
                Err(StorageError::InvalidName(_))
            ));
        }
    }
}
