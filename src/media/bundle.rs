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

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::fs::read;
use std::path::PathBuf;

use crate::error::Fallible;

/// One audio file as stored in the archive.
#[derive(Debug, PartialEq)]
pub struct MediaEntry {
    /// Numeric zip entry name: "0", "1", ...
    pub key: String,
    /// The name cards refer to in `[sound:...]`.
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// The media carried by a package, in zip-entry order.
#[derive(Debug, Default, PartialEq)]
pub struct MediaManifest {
    entries: Vec<MediaEntry>,
}

impl MediaManifest {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[MediaEntry] {
        &self.entries
    }

    /// The `media` file: numeric entry name to filename.
    pub fn to_json(&self) -> Fallible<String> {
        let map: BTreeMap<&str, &str> = self
            .entries
            .iter()
            .map(|entry| (entry.key.as_str(), entry.filename.as_str()))
            .collect();
        Ok(serde_json::to_string(&map)?)
    }

    fn push(&mut self, filename: String, bytes: Vec<u8>) {
        let key = self.entries.len().to_string();
        self.entries.push(MediaEntry {
            key,
            filename,
            bytes,
        });
    }
}

/// Read every referenced file into a manifest. A file that cannot be read is
/// logged and left out; the rest of the package is unaffected.
pub fn bundle(files: &[(String, PathBuf)]) -> MediaManifest {
    let mut manifest = MediaManifest::empty();
    let mut seen: HashSet<&str> = HashSet::new();
    for (filename, path) in files {
        if !seen.insert(filename.as_str()) {
            continue;
        }
        match read(path) {
            Ok(bytes) => {
                log::debug!("Bundled media '{filename}' ({} bytes).", bytes.len());
                manifest.push(filename.clone(), bytes);
            }
            Err(e) => {
                log::warn!(
                    "Omitting media '{filename}': cannot read {}: {e}.",
                    path.display()
                );
            }
        }
    }
    manifest
}

#[cfg(test)]
mod tests {
    use std::fs::write;

    use super::*;
    use crate::helper::create_tmp_directory;

    #[test]
    fn test_empty_manifest() -> Fallible<()> {
        let manifest = bundle(&[]);
        assert!(manifest.is_empty());
        assert_eq!(manifest.to_json()?, "{}");
        Ok(())
    }

    #[test]
    fn test_sequential_keys_and_missing_file() -> Fallible<()> {
        let dir = create_tmp_directory()?;
        let a = dir.path().join("a.mp3");
        let b = dir.path().join("b.mp3");
        write(&a, b"aaa")?;
        write(&b, b"bb")?;
        let files = vec![
            ("a.mp3".to_string(), a.clone()),
            ("missing.mp3".to_string(), dir.path().join("missing.mp3")),
            ("b.mp3".to_string(), b),
            ("a.mp3".to_string(), a),
        ];
        let manifest = bundle(&files);
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.entries()[0].key, "0");
        assert_eq!(manifest.entries()[0].bytes, b"aaa");
        assert_eq!(manifest.entries()[1].key, "1");
        assert_eq!(manifest.entries()[1].filename, "b.mp3");
        assert_eq!(manifest.to_json()?, r#"{"0":"a.mp3","1":"b.mp3"}"#);
        Ok(())
    }
}
