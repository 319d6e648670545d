//! Title edits as minimal splices.
//!
//! [`diff`] keeps the common prefix and suffix of the old and new text
//! untouched and describes only the changed middle as a [`Splice`]. The
//! store applies that splice to the title's text container, so replicas
//! editing different parts of a title never overwrite each other.

/// A single contiguous text edit, measured in `char`s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    /// Position of the first affected character.
    pub index: usize,
    /// Number of characters removed at `index`.
    pub delete: usize,
    /// Text inserted at `index` after the removal.
    pub insert: String,
}

impl Splice {
    /// Applies the splice to plain text. Out-of-range positions are clamped.
    #[must_use]
    pub fn apply_to(&self, text: &str) -> String {
        let chars: Vec<char> = text.chars().collect();
        let start = self.index.min(chars.len());
        let end = start.saturating_add(self.delete).min(chars.len());
        chars[..start]
            .iter()
            .copied()
            .chain(self.insert.chars())
            .chain(chars[end..].iter().copied())
            .collect()
    }
}

/// Computes the minimal single splice turning `old` into `new`.
///
/// Returns `None` when the texts are equal.
#[must_use]
pub fn diff(old: &str, new: &str) -> Option<Splice> {
    if old == new {
        return None;
    }
    let old: Vec<char> = old.chars().collect();
    let new: Vec<char> = new.chars().collect();

    let prefix = old.iter().zip(&new).take_while(|(a, b)| a == b).count();
    let max_suffix = old.len().min(new.len()) - prefix;
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    Some(Splice {
        index: prefix,
        delete: old.len() - prefix - suffix,
        insert: new[prefix..new.len() - suffix].iter().collect(),
    })
}
