//! Suggested category palette shown by the composition form.
//!
//! Categories are stored as free text on each note; this palette only drives
//! the picker and its colors. Unknown labels are valid.

use serde::Serialize;

/// A suggested category with its display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Category {
    pub name: &'static str,
    /// Hex RGB color, e.g. `"#6C63FF"`.
    pub color: &'static str,
}

pub const CATEGORY_PALETTE: [Category; 6] = [
    Category { name: "Personal", color: "#6C63FF" },
    Category { name: "Work", color: "#FF6B6B" },
    Category { name: "Study", color: "#4ECDC4" },
    Category { name: "Ideas", color: "#FFE66D" },
    Category { name: "Travel", color: "#95E1D3" },
    Category { name: "Health", color: "#F38181" },
];

impl Category {
    /// Look up a palette entry by name (case-insensitive).
    pub fn find(name: &str) -> Option<&'static Category> {
        CATEGORY_PALETTE
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name.trim()))
    }
}
