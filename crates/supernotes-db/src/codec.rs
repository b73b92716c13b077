//! Mapping between domain records and stored documents.
//!
//! Decoding normalizes sparse documents written by older clients: missing
//! `tags` become empty, missing `isFavorite` is false, missing `category` is
//! the default label, missing `preview` is derived from `content`, and missing
//! timestamps read as "now".

use chrono::{DateTime, Utc};
use supernotes_core::defaults::DEFAULT_CATEGORY;
use supernotes_core::{
    compute_preview, fields, Document, FieldValue, Fields, Note, NoteDraft, NotePatch, User,
    UserPatch,
};

fn text(doc: &Document, field: &str) -> String {
    doc.get_str(field).unwrap_or_default().to_string()
}

fn timestamp_or_now(doc: &Document, field: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    doc.get_timestamp(field).unwrap_or(now)
}

/// Decode a `notes` document.
pub fn note_from_document(doc: &Document) -> Note {
    let now = Utc::now();
    let content = text(doc, fields::CONTENT);
    let preview = doc
        .get_str(fields::PREVIEW)
        .map(str::to_string)
        .unwrap_or_else(|| compute_preview(&content));
    let category = doc
        .get_str(fields::CATEGORY)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CATEGORY)
        .to_string();

    tracing::trace!(note_id = %doc.id, "Decoding note document");

    Note {
        id: doc.id.clone(),
        title: text(doc, fields::TITLE),
        content,
        preview,
        category,
        tags: doc.get_string_array(fields::TAGS).unwrap_or_default(),
        image: doc
            .get_str(fields::IMAGE)
            .filter(|url| !url.is_empty())
            .map(str::to_string),
        is_favorite: doc.get_bool(fields::IS_FAVORITE).unwrap_or(false),
        user_id: text(doc, fields::USER_ID),
        created_at: timestamp_or_now(doc, fields::CREATED_AT, now),
        updated_at: timestamp_or_now(doc, fields::UPDATED_AT, now),
    }
}

/// Fields of a new note. Both timestamps are server-assigned.
pub fn draft_to_fields(user_id: &str, draft: NoteDraft) -> Fields {
    let mut out = Fields::new();
    out.insert(
        fields::PREVIEW.to_string(),
        compute_preview(&draft.content).into(),
    );
    out.insert(fields::TITLE.to_string(), draft.title.into());
    out.insert(fields::CONTENT.to_string(), draft.content.into());
    out.insert(fields::CATEGORY.to_string(), draft.category.into());
    out.insert(fields::TAGS.to_string(), draft.tags.into());
    if let Some(image) = draft.image {
        out.insert(fields::IMAGE.to_string(), image.into());
    }
    out.insert(fields::IS_FAVORITE.to_string(), draft.is_favorite.into());
    out.insert(fields::USER_ID.to_string(), user_id.into());
    out.insert(fields::CREATED_AT.to_string(), FieldValue::ServerTimestamp);
    out.insert(fields::UPDATED_AT.to_string(), FieldValue::ServerTimestamp);
    out
}

/// Merge fields for a note update.
///
/// Always re-stamps `updatedAt`. `preview` is included only when `content`
/// changes. A cleared image maps to `Null`, which removes the field. Owner and
/// `createdAt` are never written.
pub fn patch_to_fields(patch: NotePatch) -> Fields {
    let mut out = Fields::new();
    if let Some(title) = patch.title {
        out.insert(fields::TITLE.to_string(), title.into());
    }
    if let Some(content) = patch.content {
        out.insert(fields::PREVIEW.to_string(), compute_preview(&content).into());
        out.insert(fields::CONTENT.to_string(), content.into());
    }
    if let Some(category) = patch.category {
        out.insert(fields::CATEGORY.to_string(), category.into());
    }
    if let Some(tags) = patch.tags {
        out.insert(fields::TAGS.to_string(), tags.into());
    }
    if let Some(image) = patch.image {
        out.insert(fields::IMAGE.to_string(), image.into());
    }
    if let Some(is_favorite) = patch.is_favorite {
        out.insert(fields::IS_FAVORITE.to_string(), is_favorite.into());
    }
    out.insert(fields::UPDATED_AT.to_string(), FieldValue::ServerTimestamp);
    out
}

/// Decode a `users` document.
pub fn user_from_document(doc: &Document) -> User {
    User {
        id: doc.id.clone(),
        name: text(doc, fields::NAME),
        email: text(doc, fields::EMAIL),
        avatar: doc
            .get_str(fields::AVATAR)
            .filter(|url| !url.is_empty())
            .map(str::to_string),
        created_at: timestamp_or_now(doc, fields::CREATED_AT, Utc::now()),
    }
}

/// Fields of a new profile.
pub fn profile_fields(name: &str, email: &str, avatar: Option<&str>) -> Fields {
    let mut out = Fields::new();
    out.insert(fields::NAME.to_string(), name.into());
    out.insert(fields::EMAIL.to_string(), email.into());
    if let Some(avatar) = avatar {
        out.insert(fields::AVATAR.to_string(), avatar.into());
    }
    out.insert(fields::CREATED_AT.to_string(), FieldValue::ServerTimestamp);
    out
}

/// Fields that write an existing profile back unchanged, keeping its
/// original creation time.
pub fn user_to_fields(user: &User) -> Fields {
    let mut out = profile_fields(&user.name, &user.email, user.avatar.as_deref());
    out.insert(fields::CREATED_AT.to_string(), user.created_at.into());
    out
}

/// Merge fields for a profile edit. Only name and avatar are writable.
pub fn user_patch_to_fields(patch: &UserPatch) -> Fields {
    let mut out = Fields::new();
    if let Some(name) = &patch.name {
        out.insert(fields::NAME.to_string(), name.as_str().into());
    }
    if let Some(avatar) = &patch.avatar {
        out.insert(fields::AVATAR.to_string(), avatar.as_str().into());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_note_document_is_normalized() {
        let mut f = Fields::new();
        f.insert(fields::TITLE.to_string(), "Old note".into());
        f.insert(fields::CONTENT.to_string(), "x".repeat(120).into());
        f.insert(fields::USER_ID.to_string(), "u1".into());
        let note = note_from_document(&Document::new("n1", f));

        assert_eq!(note.category, DEFAULT_CATEGORY);
        assert!(note.tags.is_empty());
        assert!(!note.is_favorite);
        assert_eq!(note.preview, format!("{}...", "x".repeat(100)));
        assert!(note.image.is_none());
    }

    #[test]
    fn test_user_fields_keep_creation_time() {
        let created_at = chrono::DateTime::parse_from_rfc3339("2024-02-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let user = User {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            avatar: None,
            created_at,
        };
        let f = user_to_fields(&user);
        assert_eq!(f[fields::CREATED_AT], FieldValue::Timestamp(created_at));
        assert_eq!(f[fields::NAME], FieldValue::from("Ada"));
        assert!(!f.contains_key(fields::AVATAR));
        assert_eq!(user_from_document(&Document::new("u1", f)), user);
    }

    #[test]
    fn test_draft_fields_carry_owner_and_server_timestamps() {
        let f = draft_to_fields("u1", NoteDraft::new("T", "C").with_image("https://i/x.png"));
        assert_eq!(f[fields::USER_ID], FieldValue::from("u1"));
        assert_eq!(f[fields::PREVIEW], FieldValue::from("C"));
        assert_eq!(f[fields::CREATED_AT], FieldValue::ServerTimestamp);
        assert_eq!(f[fields::UPDATED_AT], FieldValue::ServerTimestamp);
        assert_eq!(f[fields::IMAGE], FieldValue::from("https://i/x.png"));
    }

    #[test]
    fn test_patch_fields_only_touch_changed_fields() {
        let f = patch_to_fields(NotePatch::default().title("New"));
        assert!(f.contains_key(fields::TITLE));
        assert!(!f.contains_key(fields::PREVIEW));
        assert!(!f.contains_key(fields::CONTENT));
        assert!(!f.contains_key(fields::USER_ID));
        assert!(!f.contains_key(fields::CREATED_AT));
        assert_eq!(f[fields::UPDATED_AT], FieldValue::ServerTimestamp);
    }

    #[test]
    fn test_patch_content_recomputes_preview() {
        let f = patch_to_fields(NotePatch::default().content("y".repeat(101)));
        assert_eq!(
            f[fields::PREVIEW],
            FieldValue::from(format!("{}...", "y".repeat(100)))
        );
    }

    #[test]
    fn test_patch_clearing_image_writes_null() {
        let f = patch_to_fields(NotePatch::default().image(None));
        assert_eq!(f[fields::IMAGE], FieldValue::Null);
    }

    #[test]
    fn test_user_patch_fields() {
        let f = user_patch_to_fields(&UserPatch {
            name: Some("Ann".to_string()),
            avatar: None,
        });
        assert_eq!(f.len(), 1);
        assert_eq!(f[fields::NAME], FieldValue::from("Ann"));
    }
}
