// Score library - Score documents available in the scores folder

use super::LoadResult;
use super::loader::DocumentSource;
use crate::score::SheetLayout;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extension of score documents
pub const SCORE_EXTENSION: &str = "ron";

pub struct ScoreLibrary {
    folder: PathBuf,
}

impl ScoreLibrary {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Score documents of the folder and its subfolders, sorted by path
    /// A missing folder is an empty library
    pub fn list(&self) -> LoadResult<Vec<PathBuf>> {
        if !self.folder.exists() {
            return Ok(Vec::new());
        }

        let mut scores = Vec::new();
        for entry in WalkDir::new(&self.folder).follow_links(true) {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == SCORE_EXTENSION) {
                scores.push(path.to_path_buf());
            }
        }
        scores.sort();
        Ok(scores)
    }

    /// Loader source for a score, relative paths resolve inside the folder
    pub fn source(&self, score: impl AsRef<Path>, layout: SheetLayout) -> DocumentSource {
        DocumentSource::new(self.folder.join(score), layout)
    }
}
