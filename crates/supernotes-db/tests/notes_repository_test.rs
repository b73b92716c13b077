//! Note data-access behaviour against the in-memory document store.

use std::sync::Arc;

use supernotes_db::{
    DocumentNoteRepository, DocumentStore, Error, MemoryDocumentStore, NoteDraft, NotePatch,
    NoteRepository, NoteSort,
};

fn setup() -> (Arc<MemoryDocumentStore>, DocumentNoteRepository) {
    let store = Arc::new(MemoryDocumentStore::new());
    let repo = DocumentNoteRepository::new(store.clone() as Arc<dyn DocumentStore>);
    (store, repo)
}

#[tokio::test]
async fn test_create_then_list_round_trip() {
    let (_, repo) = setup();
    let id = repo
        .create(
            "alice",
            NoteDraft::new("Groceries", "Milk and eggs").with_category("Personal"),
        )
        .await
        .unwrap();
    assert!(!id.is_empty());

    let notes = repo.list_notes("alice").await.unwrap();
    assert_eq!(notes.len(), 1);
    let note = &notes[0];
    assert_eq!(note.id, id);
    assert_eq!(note.title, "Groceries");
    assert_eq!(note.content, "Milk and eggs");
    assert_eq!(note.category, "Personal");
    assert_eq!(note.user_id, "alice");
    assert!(!note.is_favorite);
    assert!(note.updated_at >= note.created_at);
}

#[tokio::test]
async fn test_list_for_user_with_no_notes_is_empty() {
    let (_, repo) = setup();
    assert!(repo.list_notes("nobody").await.unwrap().is_empty());
    assert!(repo.list_favorites("nobody").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_preview_follows_content_length() {
    let (_, repo) = setup();
    let short_id = repo
        .create("alice", NoteDraft::new("Short", "tiny body"))
        .await
        .unwrap();
    let long_content = "L".repeat(250);
    let long_id = repo
        .create("alice", NoteDraft::new("Long", long_content.clone()))
        .await
        .unwrap();

    assert_eq!(repo.fetch(&short_id).await.unwrap().preview, "tiny body");
    assert_eq!(
        repo.fetch(&long_id).await.unwrap().preview,
        format!("{}...", &long_content[..100])
    );
}

#[tokio::test]
async fn test_update_content_recomputes_preview_and_keeps_other_fields() {
    let (_, repo) = setup();
    let id = repo
        .create(
            "alice",
            NoteDraft::new("Title", "Body")
                .with_category("Work")
                .with_tags(vec!["q3".to_string()])
                .favorite(true),
        )
        .await
        .unwrap();
    let before = repo.fetch(&id).await.unwrap();

    let new_content = "n".repeat(140);
    repo.update(&id, NotePatch::default().content(new_content.clone()))
        .await
        .unwrap();
    let after = repo.fetch(&id).await.unwrap();

    assert_eq!(after.content, new_content);
    assert_eq!(after.preview, format!("{}...", "n".repeat(100)));
    assert_eq!(after.title, before.title);
    assert_eq!(after.category, before.category);
    assert_eq!(after.tags, before.tags);
    assert_eq!(after.is_favorite, before.is_favorite);
    assert_eq!(after.user_id, before.user_id);
    assert_eq!(after.created_at, before.created_at);
    assert!(after.updated_at > before.updated_at);
}

#[tokio::test]
async fn test_update_title_leaves_preview_alone() {
    let (_, repo) = setup();
    let id = repo
        .create("alice", NoteDraft::new("Old", "Body text"))
        .await
        .unwrap();
    repo.update(&id, NotePatch::default().title("New"))
        .await
        .unwrap();

    let note = repo.fetch(&id).await.unwrap();
    assert_eq!(note.title, "New");
    assert_eq!(note.preview, "Body text");
}

#[tokio::test]
async fn test_update_can_set_and_clear_image() {
    let (_, repo) = setup();
    let id = repo
        .create("alice", NoteDraft::new("Pic", "Body"))
        .await
        .unwrap();

    repo.update(
        &id,
        NotePatch::default().image(Some("https://cdn.example/p.jpg".to_string())),
    )
    .await
    .unwrap();
    assert_eq!(
        repo.fetch(&id).await.unwrap().image.as_deref(),
        Some("https://cdn.example/p.jpg")
    );

    repo.update(&id, NotePatch::default().image(None))
        .await
        .unwrap();
    assert!(repo.fetch(&id).await.unwrap().image.is_none());
}

#[tokio::test]
async fn test_toggle_favorite_twice_restores_flag() {
    let (_, repo) = setup();
    let id = repo
        .create("alice", NoteDraft::new("Fav", "Body"))
        .await
        .unwrap();

    assert!(repo.toggle_favorite(&id).await.unwrap());
    assert!(repo.fetch(&id).await.unwrap().is_favorite);
    assert!(!repo.toggle_favorite(&id).await.unwrap());
    assert!(!repo.fetch(&id).await.unwrap().is_favorite);
}

#[tokio::test]
async fn test_set_favorite_is_explicit() {
    let (_, repo) = setup();
    let id = repo
        .create("alice", NoteDraft::new("Fav", "Body"))
        .await
        .unwrap();
    repo.set_favorite(&id, true).await.unwrap();
    repo.set_favorite(&id, true).await.unwrap();
    assert!(repo.fetch(&id).await.unwrap().is_favorite);
}

#[tokio::test]
async fn test_search_is_case_insensitive_substring() {
    let (_, repo) = setup();
    repo.create("alice", NoteDraft::new("Meeting Notes", "Quarterly review"))
        .await
        .unwrap();
    repo.create("alice", NoteDraft::new("Shopping", "Bread"))
        .await
        .unwrap();
    repo.create("bob", NoteDraft::new("Meeting Notes", "Other owner"))
        .await
        .unwrap();

    for term in ["meeting", "NOTES", "ing no"] {
        let hits = repo.search("alice", term).await.unwrap();
        assert_eq!(hits.len(), 1, "term {:?}", term);
        assert_eq!(hits[0].title, "Meeting Notes");
        assert_eq!(hits[0].user_id, "alice");
    }

    let by_tag_or_content = repo.search("alice", "bread").await.unwrap();
    assert_eq!(by_tag_or_content.len(), 1);
}

#[tokio::test]
async fn test_favorites_scenario_and_ordering() {
    let (_, repo) = setup();
    let plain = repo
        .create("alice", NoteDraft::new("Plain", "Body"))
        .await
        .unwrap();
    let starred = repo
        .create("alice", NoteDraft::new("Starred", "Body").favorite(true))
        .await
        .unwrap();

    let favorites = repo.list_favorites("alice").await.unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].id, starred);

    let all: Vec<String> = repo
        .list_notes("alice")
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(all, vec![starred.clone(), plain.clone()]);

    // Touching the older note moves it to the front.
    repo.update(&plain, NotePatch::default().title("Plain v2"))
        .await
        .unwrap();
    let all: Vec<String> = repo
        .list_notes("alice")
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(all, vec![plain, starred]);
}

#[tokio::test]
async fn test_created_at_sort_ignores_updates() {
    let (_, repo) = setup();
    let first = repo
        .create("alice", NoteDraft::new("First", "Body"))
        .await
        .unwrap();
    let second = repo
        .create("alice", NoteDraft::new("Second", "Body"))
        .await
        .unwrap();
    repo.update(&first, NotePatch::default().content("edited"))
        .await
        .unwrap();

    let by_created: Vec<String> = repo
        .list_notes_sorted("alice", NoteSort::CreatedAt)
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(by_created, vec![second, first]);
}

#[tokio::test]
async fn test_category_listing() {
    let (_, repo) = setup();
    repo.create("alice", NoteDraft::new("A", "x").with_category("Work"))
        .await
        .unwrap();
    repo.create("alice", NoteDraft::new("B", "x").with_category("Travel"))
        .await
        .unwrap();

    let work = repo.list_by_category("alice", "Work").await.unwrap();
    assert_eq!(work.len(), 1);
    assert_eq!(work[0].title, "A");
    assert!(repo
        .list_by_category("alice", "Health")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_delete_removes_from_every_listing() {
    let (_, repo) = setup();
    let id = repo
        .create(
            "alice",
            NoteDraft::new("Gone", "Body")
                .with_category("Ideas")
                .favorite(true),
        )
        .await
        .unwrap();
    assert_eq!(repo.list_favorites("alice").await.unwrap().len(), 1);

    repo.delete(&id).await.unwrap();

    assert!(repo.list_notes("alice").await.unwrap().is_empty());
    assert!(repo.list_favorites("alice").await.unwrap().is_empty());
    assert!(repo
        .list_by_category("alice", "Ideas")
        .await
        .unwrap()
        .is_empty());
    assert!(matches!(
        repo.fetch(&id).await.unwrap_err(),
        Error::NoteNotFound(_)
    ));
}

#[tokio::test]
async fn test_update_vanished_note_fails_with_not_found_cause() {
    let (_, repo) = setup();
    let err = repo
        .update("missing", NotePatch::default().title("x"))
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Failed to update note. Please try again.");
    assert!(err.is_not_found());

    let err = repo.delete("missing").await.unwrap_err();
    assert_eq!(err.user_message(), "Failed to delete note. Please try again.");

    let err = repo.toggle_favorite("missing").await.unwrap_err();
    assert_eq!(
        err.user_message(),
        "Failed to update favorite status. Please try again."
    );
}

#[tokio::test]
async fn test_network_failure_is_wrapped_with_message() {
    let (store, repo) = setup();
    store.set_offline(true);

    let err = repo
        .create("alice", NoteDraft::new("T", "C"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Failed to create note. Please try again.");
    assert!(matches!(err.root_cause(), Error::Request(_)));

    let err = repo.list_notes("alice").await.unwrap_err();
    assert_eq!(
        err.user_message(),
        "Failed to fetch notes. Please check your connection and try again."
    );

    let err = repo.search("alice", "x").await.unwrap_err();
    assert_eq!(err.user_message(), "Failed to search notes. Please try again.");
}

#[tokio::test]
async fn test_repository_does_not_validate() {
    let (_, repo) = setup();
    let id = repo.create("alice", NoteDraft::new("", "")).await.unwrap();
    let note = repo.fetch(&id).await.unwrap();
    assert_eq!(note.title, "");
    assert_eq!(note.preview, "");
}

#[tokio::test]
async fn test_delete_all_for_user_only_touches_owner() {
    let (store, repo) = setup();
    for i in 0..3 {
        repo.create("alice", NoteDraft::new(format!("a{}", i), "x"))
            .await
            .unwrap();
    }
    repo.create("bob", NoteDraft::new("b", "x")).await.unwrap();

    assert_eq!(repo.delete_all_for_user("alice").await.unwrap(), 3);
    assert!(repo.list_notes("alice").await.unwrap().is_empty());
    assert_eq!(repo.list_notes("bob").await.unwrap().len(), 1);
    assert_eq!(store.len("notes").await, 1);
}
