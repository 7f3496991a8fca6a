use unicode_properties::UnicodeEmoji;

use crate::ui;

use super::Candidate;

/// Last valid Unicode code point.
const MAX_CODE_POINT: u32 = char::MAX as u32;

/// One entry of a Unicode property set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyItem {
    /// Inclusive range of code points
    Range(u32, u32),
    /// Multi-code-point string, e.g. an emoji sequence
    Sequence(String),
}

/// Source of symbols and their display names.
pub trait SymbolDatabase {
    /// Items of the property set in ascending order.
    fn items(&self) -> Box<dyn Iterator<Item = PropertyItem> + '_>;

    /// Canonical Unicode name of `c`.
    fn name(&self, c: char) -> Option<String> {
        unicode_names2::name(c).map(|name| name.to_string())
    }
}

/// Code points with the `Emoji` property.
///
/// The property is tested one character at a time, so this provider never
/// reports [`PropertyItem::Sequence`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EmojiDatabase;

impl SymbolDatabase for EmojiDatabase {
    fn items(&self) -> Box<dyn Iterator<Item = PropertyItem> + '_> {
        Box::new(PropertyRanges::new(|c: char| c.is_emoji_char()))
    }
}

/// Coalesces a per-character predicate into contiguous ranges.
struct PropertyRanges<F> {
    next: u32,
    has_property: F,
}

impl<F: Fn(char) -> bool> PropertyRanges<F> {
    fn new(has_property: F) -> Self {
        Self {
            next: 0,
            has_property,
        }
    }

    fn test(&self, cp: u32) -> bool {
        char::from_u32(cp).is_some_and(|c| (self.has_property)(c))
    }
}

impl<F: Fn(char) -> bool> Iterator for PropertyRanges<F> {
    type Item = PropertyItem;

    fn next(&mut self) -> Option<PropertyItem> {
        while self.next <= MAX_CODE_POINT && !self.test(self.next) {
            self.next += 1;
        }
        if self.next > MAX_CODE_POINT {
            return None;
        }

        let start = self.next;
        while self.next <= MAX_CODE_POINT && self.test(self.next) {
            self.next += 1;
        }
        Some(PropertyItem::Range(start, self.next - 1))
    }
}

/// Expands a property set into one candidate per code point.
///
/// Code points below `low_water_mark` are dropped. Sequences are not
/// supported and are skipped with a warning.
pub struct SymbolCandidates<'a> {
    database: &'a dyn SymbolDatabase,
    items: Box<dyn Iterator<Item = PropertyItem> + 'a>,
    low_water_mark: u32,
    current: Option<(u32, u32)>,
    emitted: usize,
}

impl<'a> SymbolCandidates<'a> {
    pub fn new(database: &'a dyn SymbolDatabase, low_water_mark: u32) -> Self {
        Self {
            database,
            items: database.items(),
            low_water_mark,
            current: None,
            emitted: 0,
        }
    }

    fn next_range(&mut self) -> Option<(u32, u32)> {
        loop {
            match self.items.next()? {
                PropertyItem::Range(start, end) => {
                    let start = start.max(self.low_water_mark);
                    let end = end.min(MAX_CODE_POINT);
                    if start <= end {
                        ui::debug(
                            "unicode.range",
                            &format!("range U+{start:04X}..U+{end:04X} ({} items)", end - start + 1),
                        );
                        return Some((start, end));
                    }
                }
                PropertyItem::Sequence(text) => {
                    ui::emit(
                        ui::Level::Warn,
                        "unicode.sequence_unsupported",
                        &format!(
                            "skipping multi-code-point item '{}' ({} code points): not supported",
                            text,
                            text.chars().count()
                        ),
                        None,
                    );
                }
            }
        }
    }

    fn describe(&self, cp: u32) -> Option<Candidate> {
        let Some(c) = char::from_u32(cp) else {
            ui::warn(
                "unicode.invalid_code_point",
                &format!("U+{cp:04X} is not a Unicode scalar value, skipping it"),
            );
            return None;
        };
        let Some(name) = self.database.name(c) else {
            ui::warn(
                "unicode.unnamed",
                &format!("no name for U+{cp:04X}, skipping it"),
            );
            return None;
        };
        Some(Candidate::symbol(c.to_string(), name))
    }
}

impl Iterator for SymbolCandidates<'_> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        loop {
            let (cp, end) = match self.current {
                Some(range) => range,
                None => {
                    let range = self.next_range();
                    if range.is_none() {
                        ui::debug("unicode.total", &format!("{} symbols listed", self.emitted));
                    }
                    range?
                }
            };
            self.current = (cp < end).then(|| (cp + 1, end));

            if let Some(candidate) = self.describe(cp) {
                self.emitted += 1;
                return Some(candidate);
            }
        }
    }
}
