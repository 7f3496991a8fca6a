//! Auxiliary candidate files
//!
//! Each path is either a file, or a directory whose regular files and
//! symlinks (not subdirectories) are read in file name order. Unreadable
//! paths are reported and contribute nothing.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::ui;

use super::Candidate;

struct OpenFile {
    path: PathBuf,
    reader: BufReader<File>,
    line_number: usize,
}

/// Lazily reads candidate lines from auxiliary files.
pub struct AuxiliaryLines {
    pending: VecDeque<PathBuf>,
    current: Option<OpenFile>,
    comment_marker: String,
    buf: Vec<u8>,
}

impl AuxiliaryLines {
    pub fn new(paths: &[PathBuf], comment_marker: &str) -> Self {
        let pending = paths.iter().flat_map(|path| expand_path(path)).collect();
        Self {
            pending,
            current: None,
            comment_marker: comment_marker.to_string(),
            buf: Vec::new(),
        }
    }

    fn open_next(&mut self) -> bool {
        while let Some(path) = self.pending.pop_front() {
            match File::open(&path) {
                Ok(file) => {
                    ui::debug("aux.open", &format!("reading {}", path.display()));
                    self.current = Some(OpenFile {
                        path,
                        reader: BufReader::new(file),
                        line_number: 0,
                    });
                    return true;
                }
                Err(e) => {
                    ui::warn(
                        "aux.open_failed",
                        &format!("cannot open {}: {}", path.display(), e),
                    );
                }
            }
        }
        false
    }

    /// Next kept line of the open file, or `None` once it is exhausted.
    fn next_line(&mut self) -> Option<String> {
        let file = self.current.as_mut()?;
        loop {
            self.buf.clear();
            match file.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    file.line_number += 1;
                    if self.buf.last() == Some(&b'\n') {
                        self.buf.pop();
                    }
                    if self.buf.is_empty() || self.buf.starts_with(self.comment_marker.as_bytes()) {
                        continue;
                    }
                    return Some(String::from_utf8_lossy(&self.buf).into_owned());
                }
                Err(e) => {
                    ui::warn(
                        "aux.read_failed",
                        &format!(
                            "error reading {} after line {}: {}",
                            file.path.display(),
                            file.line_number,
                            e
                        ),
                    );
                    return None;
                }
            }
        }
    }
}

impl Iterator for AuxiliaryLines {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        loop {
            if self.current.is_none() && !self.open_next() {
                return None;
            }
            match self.next_line() {
                Some(line) => return Some(Candidate::line(line)),
                None => self.current = None,
            }
        }
    }
}

/// Files contributed by one path.
fn expand_path(path: &Path) -> Vec<PathBuf> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => {
            ui::warn(
                "aux.stat_failed",
                &format!("cannot access {}: {}", path.display(), e),
            );
            return Vec::new();
        }
    };

    if !metadata.is_dir() {
        return vec![path.to_path_buf()];
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        match entry {
            Ok(entry) => {
                let file_type = entry.file_type();
                if file_type.is_file() || file_type.is_symlink() {
                    files.push(entry.into_path());
                }
            }
            Err(e) => ui::warn(
                "aux.list_failed",
                &format!("cannot list {}: {}", path.display(), e),
            ),
        }
    }
    files
}
