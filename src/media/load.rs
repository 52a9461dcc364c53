// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use thiserror::Error;

use crate::error::Fallible;
use crate::error::fail;

/// The media loader takes audio filenames from card records and returns the
/// absolute path to the file inside the media directory, if it exists.
///
/// Filenames come from the card producer, so we have to ensure there's no
/// possibility of directory traversals. Anki stores media flat, so nested
/// paths are rejected as well.
pub struct MediaLoader {
    /// Absolute path to the media directory.
    root: PathBuf,
}

/// Errors that can occur when locating a media file.
#[derive(Debug, Error, PartialEq)]
pub enum MediaPathError {
    #[error("media name is empty")]
    Empty,
    #[error("media name is an absolute path")]
    Absolute,
    #[error("media name contains a parent (`..`) component")]
    ParentComponent,
    #[error("media name contains a directory")]
    Nested,
    #[error("media file does not exist")]
    NotFound,
    #[error("media path is not a file")]
    NotFile,
    #[error("media path is a symbolic link")]
    SymbolicLink,
}

impl MediaLoader {
    /// Construct a new [`MediaLoader`] rooted at an existing directory.
    pub fn new(root: &Path) -> Fallible<Self> {
        if !root.is_dir() {
            return fail(format!(
                "media directory does not exist: {}",
                root.display()
            ));
        }
        let root = root.canonicalize()?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check that a file with this name exists directly inside the media
    /// directory.
    ///
    /// Symbolic links, absolute paths and nested paths are rejected.
    pub fn validate(&self, name: &str) -> Result<PathBuf, MediaPathError> {
        if name.trim().is_empty() {
            return Err(MediaPathError::Empty);
        }
        let path: PathBuf = PathBuf::from(name);
        if path.components().any(|c| c == Component::ParentDir) {
            return Err(MediaPathError::ParentComponent);
        }
        if path.is_absolute() {
            return Err(MediaPathError::Absolute);
        }
        if path.components().count() != 1 {
            return Err(MediaPathError::Nested);
        }
        let path: PathBuf = self.root.join(path);
        if path.is_symlink() {
            return Err(MediaPathError::SymbolicLink);
        }
        if !path.exists() {
            return Err(MediaPathError::NotFound);
        }
        if !path.is_file() {
            return Err(MediaPathError::NotFile);
        }
        Ok(path)
    }

    /// Resolve every registered filename. Names that cannot be resolved are
    /// logged and left out; the cards keep their `[sound:...]` reference.
    pub fn resolve_all(&self, names: &[String]) -> Vec<(String, PathBuf)> {
        let mut found = Vec::with_capacity(names.len());
        for name in names {
            match self.validate(name) {
                Ok(path) => found.push((name.clone(), path)),
                Err(e) => log::warn!("Skipping media '{name}': {e}."),
            }
        }
        found
    }
}
