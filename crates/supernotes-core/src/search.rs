//! Client-side note search.
//!
//! Matching runs over the user's full note list after it is fetched. There is
//! no server-side text index, so cost is linear in the number of notes.

use crate::models::Note;

/// Case-insensitive substring match against title, content, and tags.
///
/// The term is used as typed (no trimming); an empty term matches every note.
pub fn matches_term(note: &Note, term: &str) -> bool {
    let needle = term.to_lowercase();
    note.title.to_lowercase().contains(&needle)
        || note.content.to_lowercase().contains(&needle)
        || note
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(&needle))
}
