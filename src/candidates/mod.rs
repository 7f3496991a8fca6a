//! Candidate stream fed to the chooser
//!
//! A candidate is written as one line, `payload + separator + description`.
//! Lines coming from auxiliary files already follow that convention and are
//! written as-is. The stream is produced lazily: Unicode symbols in ascending
//! code point order first, then auxiliary lines in the order the paths were
//! given.

mod aux_file;
mod unicode;

pub use aux_file::AuxiliaryLines;
pub use unicode::{EmojiDatabase, SymbolCandidates, SymbolDatabase};

use std::io::{self, Write};

use crate::config::Settings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub payload: String,
    /// Absent for auxiliary lines, which carry their own description
    pub description: Option<String>,
}

impl Candidate {
    pub fn symbol(payload: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            description: Some(description.into()),
        }
    }

    pub fn line(text: impl Into<String>) -> Self {
        Self {
            payload: text.into(),
            description: None,
        }
    }

    /// Write the candidate as one newline-terminated line.
    pub fn write_line<W: Write + ?Sized>(&self, out: &mut W, separator: &str) -> io::Result<()> {
        out.write_all(self.payload.as_bytes())?;
        if let Some(description) = &self.description {
            out.write_all(separator.as_bytes())?;
            out.write_all(description.as_bytes())?;
        }
        out.write_all(b"\n")
    }

    #[cfg(test)]
    pub fn to_line(&self, separator: &str) -> String {
        match &self.description {
            Some(description) => format!("{}{}{}\n", self.payload, separator, description),
            None => format!("{}\n", self.payload),
        }
    }
}

/// Every candidate of one run, produced in a single forward pass.
pub struct CandidateSource<'a> {
    symbols: Option<SymbolCandidates<'a>>,
    aux: AuxiliaryLines,
}

impl<'a> CandidateSource<'a> {
    pub fn new(symbols: Option<SymbolCandidates<'a>>, aux: AuxiliaryLines) -> Self {
        Self { symbols, aux }
    }

    pub fn from_settings(database: &'a dyn SymbolDatabase, settings: &Settings) -> Self {
        let symbols = settings
            .include_unicode
            .then(|| SymbolCandidates::new(database, settings.low_water_mark));
        let aux = AuxiliaryLines::new(&settings.aux_paths, &settings.comment_marker);
        Self::new(symbols, aux)
    }
}

impl Iterator for CandidateSource<'_> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        if let Some(symbols) = self.symbols.as_mut() {
            match symbols.next() {
                Some(candidate) => return Some(candidate),
                None => self.symbols = None,
            }
        }
        self.aux.next()
    }
}

/// Write every candidate to `out`, returning how many were written.
pub fn write_all<W, I>(out: &mut W, candidates: I, separator: &str) -> io::Result<usize>
where
    W: Write + ?Sized,
    I: IntoIterator<Item = Candidate>,
{
    let mut count = 0;
    for candidate in candidates {
        candidate.write_line(out, separator)?;
        count += 1;
    }
    out.flush()?;
    Ok(count)
}
