//! Input validation run before any gateway call.
//!
//! Lengths count characters, not bytes. Blank means empty after trimming.

use crate::defaults::{
    MAX_CATEGORY_LEN, MAX_NOTE_CONTENT_LEN, MAX_NOTE_TITLE_LEN, MAX_TAG_LEN, MAX_USER_EMAIL_LEN,
    MAX_USER_NAME_LEN,
};
use crate::error::{Error, Result};
use crate::models::{NoteDraft, NotePatch, UserPatch};

fn too_long(value: &str, max: usize) -> bool {
    value.chars().count() > max
}

fn check_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::InvalidInput("Title cannot be empty".to_string()));
    }
    if too_long(title, MAX_NOTE_TITLE_LEN) {
        return Err(Error::InvalidInput(format!(
            "Title must be {} characters or less",
            MAX_NOTE_TITLE_LEN
        )));
    }
    Ok(())
}

fn check_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(Error::InvalidInput("Content cannot be empty".to_string()));
    }
    if too_long(content, MAX_NOTE_CONTENT_LEN) {
        return Err(Error::InvalidInput(format!(
            "Content must be {} characters or less",
            MAX_NOTE_CONTENT_LEN
        )));
    }
    Ok(())
}

fn check_category(category: &str) -> Result<()> {
    if too_long(category, MAX_CATEGORY_LEN) {
        return Err(Error::InvalidInput(format!(
            "Category must be {} characters or less",
            MAX_CATEGORY_LEN
        )));
    }
    Ok(())
}

fn check_tags(tags: &[String]) -> Result<()> {
    for tag in tags {
        if tag.trim().is_empty() {
            return Err(Error::InvalidInput("Tag cannot be empty".to_string()));
        }
        if too_long(tag, MAX_TAG_LEN) {
            return Err(Error::InvalidInput(format!(
                "Tag '{}' must be {} characters or less",
                tag, MAX_TAG_LEN
            )));
        }
    }
    Ok(())
}

/// Validate a new note. Title and content are required.
pub fn validate_draft(draft: &NoteDraft) -> Result<()> {
    check_title(&draft.title)?;
    check_content(&draft.content)?;
    check_category(&draft.category)?;
    check_tags(&draft.tags)
}

/// Validate a note update. Only fields present in the patch are checked, but
/// a present title or content must not be blank.
pub fn validate_patch(patch: &NotePatch) -> Result<()> {
    if let Some(title) = &patch.title {
        check_title(title)?;
    }
    if let Some(content) = &patch.content {
        check_content(content)?;
    }
    if let Some(category) = &patch.category {
        check_category(category)?;
    }
    if let Some(tags) = &patch.tags {
        check_tags(tags)?;
    }
    Ok(())
}

/// Validate a profile edit.
pub fn validate_user_patch(patch: &UserPatch) -> Result<()> {
    if let Some(name) = &patch.name {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("Please enter your name".to_string()));
        }
        if too_long(name, MAX_USER_NAME_LEN) {
            return Err(Error::InvalidInput(format!(
                "Name must be {} characters or less",
                MAX_USER_NAME_LEN
            )));
        }
    }
    Ok(())
}

/// Validate the sign-in / sign-up form. `name` is only checked when given
/// (registration).
pub fn validate_credentials(email: &str, password: &str, name: Option<&str>) -> Result<()> {
    if email.trim().is_empty() || password.trim().is_empty() {
        return Err(Error::InvalidInput("Please fill in all fields".to_string()));
    }
    if too_long(email.trim(), MAX_USER_EMAIL_LEN) {
        return Err(Error::InvalidInput(format!(
            "Email must be {} characters or less",
            MAX_USER_EMAIL_LEN
        )));
    }
    if let Some(name) = name {
        validate_user_patch(&UserPatch {
            name: Some(name.to_string()),
            avatar: None,
        })?;
    }
    Ok(())
}
