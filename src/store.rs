// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, SecondsFormat};
use tracing::debug;

use crate::error::StoreError;

/// Replace the characters that delimit GUID file entries with spaces
///
/// Applied to GUIDs when a feed is parsed and again when they are recorded,
/// so the in-memory set and the file always hold the same value.
pub fn normalize_guid(guid: &str) -> String {
    guid.replace(['\t', '\r', '\n'], " ")
}

/// Append-only log of episode GUIDs that were downloaded and tagged
///
/// Each entry is a line `guid<TAB>title`; lines starting with `#` are comments.
/// The file is held open for the whole run and closed when the store is
/// dropped or [`GuidStore::finish`] is called.
#[derive(Debug)]
pub struct GuidStore {
    path: PathBuf,
    file: Option<File>,
    tracking: bool,
    wrote_any: bool,
}

impl GuidStore {
    /// Open the GUID file for this run
    ///
    /// With `tracking` enabled the file is created if absent and opened for
    /// appending. Without it the file is only read, and a missing file simply
    /// means nothing is known yet.
    pub fn open(path: &Path, tracking: bool) -> Result<Self, StoreError> {
        let file = if tracking {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::OpenFailed {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            }

            let file = OpenOptions::new()
                .read(true)
                .append(true)
                .create(true)
                .open(path)
                .map_err(|e| StoreError::OpenFailed {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            Some(file)
        } else {
            match File::open(path) {
                Ok(file) => Some(file),
                Err(e) if e.kind() == ErrorKind::NotFound => None,
                Err(e) => {
                    return Err(StoreError::OpenFailed {
                        path: path.to_path_buf(),
                        source: e,
                    });
                }
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            file,
            tracking,
            wrote_any: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every GUID recorded by previous runs
    ///
    /// Comment lines are ignored. A line without a tab is taken whole as the GUID.
    pub fn load(&mut self) -> Result<HashSet<String>, StoreError> {
        let mut known = HashSet::new();

        let Some(file) = self.file.as_mut() else {
            return Ok(known);
        };

        let read_err = |e| StoreError::ReadFailed {
            path: self.path.clone(),
            source: e,
        };

        file.seek(SeekFrom::Start(0)).map_err(read_err)?;

        for line in BufReader::new(&*file).split(b'\n') {
            let line = line.map_err(read_err)?;
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches('\r');

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let guid = line.split_once('\t').map_or(line, |(guid, _)| guid);
            known.insert(guid.to_string());
        }

        debug!(path = %self.path.display(), count = known.len(), "loaded known guids");

        Ok(known)
    }

    /// Append `guid<TAB>title`; a no-op when tracking is disabled
    pub fn record(&mut self, guid: &str, title: &str) -> Result<(), StoreError> {
        if !self.tracking {
            return Ok(());
        }

        let guid = normalize_guid(guid);
        let title = title.replace(['\r', '\n'], " ");
        self.append(&format!("{guid}\t{title}\n"))?;
        self.wrote_any = true;
        Ok(())
    }

    /// Close the store, first appending a completion marker if anything was recorded
    pub fn finish(mut self) -> Result<(), StoreError> {
        if self.tracking && self.wrote_any {
            let stamp = Local::now().to_rfc3339_opts(SecondsFormat::Secs, false);
            self.append(&format!("# {stamp}\n"))?;
        }

        if let Some(file) = self.file.as_mut() {
            file.flush().map_err(|e| StoreError::WriteFailed {
                path: self.path.clone(),
                source: e,
            })?;
        }

        Ok(())
    }

    fn append(&mut self, line: &str) -> Result<(), StoreError> {
        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };

        file.write_all(line.as_bytes())
            .map_err(|e| StoreError::WriteFailed {
                path: self.path.clone(),
                source: e,
            })
    }
}
