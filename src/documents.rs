//! File-system document store.
//!
//! Every operation takes a bare file name plus a [`Folder`] and resolves it
//! under the configured documents root. Names are validated before any path
//! is built, so nothing a client sends can escape its folder.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use futures::stream::{self, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio_stream::wrappers::ReadDirStream;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, DocumentPaths};
use crate::error::SowError;
use crate::model::FileData;

/// Concurrent `stat` calls while listing a folder.
const LIST_CONCURRENCY: usize = 16;

/// Upper bound on `name_N.ext` attempts before giving up.
const MAX_UNIQUE_ATTEMPTS: u32 = 10_000;

/// The folders under the documents root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Folder {
    Input,
    GeneratedSows,
    ConvertedPdf,
    ConvertedDocx,
    Temp,
}

impl Folder {
    /// Noun used in "not found" messages.
    fn label(self) -> &'static str {
        match self {
            Folder::Input => "File",
            Folder::GeneratedSows => "DOCX file",
            Folder::ConvertedPdf => "PDF file",
            Folder::ConvertedDocx => "DOCX file",
            Folder::Temp => "Temporary file",
        }
    }
}

/// Reject anything that is not a single, ordinary path component.
pub fn validate_file_name(name: &str) -> Result<&str, SowError> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(SowError::InvalidFileName {
            name: name.to_string(),
        });
    }
    Ok(name)
}

/// Split `report.final.pptx` into (`report.final`, `.pptx`).
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

async fn stat_entry(name: String, entry: tokio::fs::DirEntry, folder: String) -> Option<FileData> {
    let meta = entry.metadata().await.ok()?;
    if !meta.is_file() {
        return None;
    }
    let modified: DateTime<Local> = meta
        .modified()
        .map(DateTime::from)
        .unwrap_or_else(|_| Local::now());
    Some(FileData::new(&name, &folder, meta.len(), modified))
}

/// Last component of a client-supplied name, treating `\` as a separator too.
fn final_component(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name).trim()
}

/// Document store rooted at [`DocumentPaths::base`].
#[derive(Debug, Clone)]
pub struct DocumentStore {
    paths: DocumentPaths,
    input_folder: String,
    allowed_extensions: Vec<String>,
    allowed_label: String,
    max_upload_mb: u64,
    max_upload_bytes: u64,
}

impl DocumentStore {
    pub fn new(config: &AppConfig) -> Result<Self, SowError> {
        Ok(Self {
            paths: DocumentPaths::resolve(config)?,
            input_folder: config.input_folder.clone(),
            allowed_extensions: config.allowed_extensions.clone(),
            allowed_label: config.allowed_extensions_label(),
            max_upload_mb: config.max_upload_mb,
            max_upload_bytes: config.max_upload_bytes(),
        })
    }

    pub fn paths(&self) -> &DocumentPaths {
        &self.paths
    }

    pub fn dir(&self, folder: Folder) -> &Path {
        match folder {
            Folder::Input => &self.paths.input,
            Folder::GeneratedSows => &self.paths.generated_sows,
            Folder::ConvertedPdf => &self.paths.converted_pdf,
            Folder::ConvertedDocx => &self.paths.converted_docx,
            Folder::Temp => &self.paths.temp,
        }
    }

    fn is_allowed(&self, name: &str) -> bool {
        let (_, ext) = split_extension(name);
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        !ext.is_empty() && self.allowed_extensions.iter().any(|a| *a == ext)
    }

    /// Create the root and every subfolder that does not exist yet.
    pub async fn ensure_directories(&self) -> Result<(), SowError> {
        for dir in self.paths.all() {
            if tokio::fs::try_exists(dir).await.unwrap_or(false) {
                continue;
            }
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| SowError::io(format!("Failed to create {}", dir.display()), e))?;
            info!("Created directory: {}", dir.display());
        }
        Ok(())
    }

    /// Full path of `name` in `folder` after validating the name.
    pub fn path_of(&self, folder: Folder, name: &str) -> Result<PathBuf, SowError> {
        Ok(self.dir(folder).join(validate_file_name(name)?))
    }

    /// Like [`Self::path_of`], but 404s when the file does not exist.
    pub async fn resolve_existing(&self, folder: Folder, name: &str) -> Result<PathBuf, SowError> {
        let path = self.path_of(folder, name)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(self.not_found(folder, name)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(self.not_found(folder, name)),
            Err(e) => Err(SowError::io(format!("Failed to stat {}", path.display()), e)),
        }
    }

    pub async fn exists(&self, folder: Folder, name: &str) -> bool {
        self.resolve_existing(folder, name).await.is_ok()
    }

    pub async fn read(&self, folder: Folder, name: &str) -> Result<Vec<u8>, SowError> {
        let path = self.resolve_existing(folder, name).await?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| SowError::io(format!("Failed to read {}", path.display()), e))
    }

    fn not_found(&self, folder: Folder, name: &str) -> SowError {
        SowError::FileNotFound {
            label: folder.label(),
            name: name.to_string(),
        }
    }

    /// `full` relative to the documents root, `/`-separated.
    pub fn relative_path(&self, full: &Path) -> String {
        full.strip_prefix(&self.paths.base)
            .unwrap_or(full)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    // ── Input folder ─────────────────────────────────────────────────────

    /// Allowed files in the input folder, sorted by name.
    pub async fn list_inputs(&self) -> Result<Vec<FileData>, SowError> {
        let dir = &self.paths.input;
        let read_dir = match tokio::fs::read_dir(dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Input folder {} does not exist yet", dir.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(SowError::io(format!("Failed to list {}", dir.display()), e));
            }
        };

        // Collect owned entries first; the stat futures below borrow nothing.
        let mut entries = ReadDirStream::new(read_dir);
        let mut pending = Vec::new();
        while let Some(entry) = entries.next().await {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable directory entry: {e}");
                    continue;
                }
            };
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if self.is_allowed(&name) {
                pending.push(stat_entry(name, entry, self.input_folder.clone()));
            }
        }

        let mut files: Vec<FileData> = stream::iter(pending)
            .buffer_unordered(LIST_CONCURRENCY)
            .filter_map(std::future::ready)
            .collect()
            .await;

        files.sort_by(|a, b| a.name.cmp(&b.name));
        debug!("Listed {} input files", files.len());
        Ok(files)
    }

    /// Validate and store an upload under a name that does not collide.
    ///
    /// Size is checked before extension. The first free name among `name.ext`,
    /// `name_1.ext`, `name_2.ext`… is claimed with an exclusive create.
    pub async fn save_upload(&self, original_name: &str, bytes: &[u8]) -> Result<FileData, SowError> {
        if bytes.len() as u64 > self.max_upload_bytes {
            return Err(SowError::FileTooLarge {
                limit_mb: self.max_upload_mb,
            });
        }
        let name = validate_file_name(final_component(original_name))?;
        if !self.is_allowed(name) {
            return Err(SowError::ExtensionNotAllowed {
                allowed: self.allowed_label.clone(),
            });
        }

        self.ensure_directories().await?;
        let (stem, ext) = split_extension(name);

        let mut candidate = name.to_string();
        let mut counter = 0u32;
        let (final_name, mut file) = loop {
            let path = self.paths.input.join(&candidate);
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => break (candidate, file),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    counter += 1;
                    if counter > MAX_UNIQUE_ATTEMPTS {
                        return Err(SowError::Internal(format!(
                            "No free file name for '{name}' after {MAX_UNIQUE_ATTEMPTS} attempts"
                        )));
                    }
                    candidate = format!("{stem}_{counter}{ext}");
                }
                Err(e) => {
                    return Err(SowError::io(format!("Failed to create {}", path.display()), e));
                }
            }
        };

        let path = self.paths.input.join(&final_name);
        let write = async {
            file.write_all(bytes).await?;
            file.flush().await
        };
        if let Err(e) = write.await {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(SowError::io(format!("Failed to write {}", path.display()), e));
        }

        info!("Stored upload '{}' as '{}' ({} bytes)", original_name, final_name, bytes.len());
        Ok(FileData::new(
            &final_name,
            &self.input_folder,
            bytes.len() as u64,
            Local::now(),
        ))
    }

    /// Remove a file from the input folder.
    pub async fn delete_input(&self, name: &str) -> Result<(), SowError> {
        let path = self.resolve_existing(Folder::Input, name).await?;
        tokio::fs::remove_file(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => self.not_found(Folder::Input, name),
            _ => SowError::io(format!("Failed to delete {}", path.display()), e),
        })?;
        info!("Deleted input file '{name}'");
        Ok(())
    }

    // ── Generated SOWs ───────────────────────────────────────────────────

    /// Write a generated DOCX, replacing any file of the same name.
    ///
    /// Returns the full path and whether an older file was replaced.
    pub async fn write_generated(&self, name: &str, bytes: &[u8]) -> Result<(PathBuf, bool), SowError> {
        self.ensure_directories().await?;
        let path = self.path_of(Folder::GeneratedSows, name)?;
        let replaced = match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!("Removed existing file: {name}");
                true
            }
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                return Err(SowError::io(format!("Failed to replace {}", path.display()), e));
            }
        };
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| SowError::io(format!("Failed to write {}", path.display()), e))?;
        Ok((path, replaced))
    }
}
