//! Local storage for synthesized audio served to the telephony provider.
//!
//! In file delivery mode the provider fetches synthesized speech over HTTP.
//! Each call gets its own file, so concurrent calls never overwrite each
//! other's audio. The most recently written file is also tracked for the
//! legacy single-file endpoint.

use arc_swap::ArcSwapOption;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Extension of stored audio files (file profile is MP3).
pub const AUDIO_FILE_EXTENSION: &str = "mp3";

/// Directory-backed store for per-call synthesized audio files.
#[derive(Debug)]
pub struct AudioFileStore {
    dir: PathBuf,
    latest: ArcSwapOption<PathBuf>,
}

impl AudioFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            latest: ArcSwapOption::empty(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name used for a call's audio, with unsafe characters replaced.
    pub fn file_name_for(call_id: &str) -> String {
        let safe: String = call_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("{safe}.{AUDIO_FILE_EXTENSION}")
    }

    /// Persist `audio` for `call_id` and return the stored file name.
    ///
    /// The file is written to a temporary name first and renamed into place so
    /// a concurrent fetch never observes a partially written file.
    pub async fn store(&self, call_id: &str, audio: &[u8]) -> io::Result<String> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let file_name = Self::file_name_for(call_id);
        let final_path = self.dir.join(&file_name);
        let tmp_path = self
            .dir
            .join(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

        tokio::fs::write(&tmp_path, audio).await?;
        tokio::fs::rename(&tmp_path, &final_path).await?;

        debug!(path = %final_path.display(), bytes = audio.len(), "Stored synthesized audio");
        self.latest.store(Some(Arc::new(final_path)));

        Ok(file_name)
    }

    /// Resolve a requested file name to a path inside the store directory.
    ///
    /// Returns `None` for names that could escape the directory.
    pub fn resolve(&self, file_name: &str) -> Option<PathBuf> {
        if !is_valid_file_name(file_name) {
            return None;
        }
        Some(self.dir.join(file_name))
    }

    /// Delete the audio stored for `call_id` once its call is over.
    ///
    /// The most recently stored file is kept for the single-file endpoint.
    /// Returns whether a file was removed.
    pub async fn remove(&self, call_id: &str) -> io::Result<bool> {
        let path = self.dir.join(Self::file_name_for(call_id));
        if self.latest().is_some_and(|latest| latest.as_path() == path) {
            debug!(path = %path.display(), "Keeping latest audio file");
            return Ok(false);
        }

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Removed call audio");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Path of the most recently stored file, if any.
    pub fn latest(&self) -> Option<Arc<PathBuf>> {
        self.latest.load_full()
    }
}

fn is_valid_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
}
