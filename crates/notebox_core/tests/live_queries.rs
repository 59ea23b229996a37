use notebox_core::db::open_db_in_memory;
use notebox_core::editor::notes_list::{self, NotesCommand, NotesScreenState};
use notebox_core::{
    ContentItem, Note, NoteQueries, NoteStore, NotesEngine, SqliteNoteStore,
};

fn store() -> SqliteNoteStore {
    SqliteNoteStore::try_new(open_db_in_memory().unwrap()).unwrap()
}

fn text_note(title: &str, text: &str, updated_at: i64) -> Note {
    Note::new(title, vec![ContentItem::text(text)], false, updated_at)
}

fn titles(notes: &[Note]) -> Vec<&str> {
    notes.iter().map(|note| note.title.as_str()).collect()
}

#[tokio::test]
async fn first_emission_is_current_snapshot() {
    let store = store();
    store.add_note_with_content(&text_note("a", "x", 1)).unwrap();

    let mut live = store.all_notes();
    let first = live.next().await.unwrap().unwrap();
    assert_eq!(titles(&first), vec!["a"]);
    assert!(!live.has_pending_change());
}

#[tokio::test]
async fn pin_toggle_re_emits_with_new_flag() {
    let store = store();
    let id = store.add_note_with_content(&text_note("a", "x", 1)).unwrap();
    let mut live = store.all_notes();
    assert!(!live.next().await.unwrap().unwrap()[0].is_pinned);

    store.switch_pinned(id).unwrap();

    assert!(live.has_pending_change());
    let next = live.next().await.unwrap().unwrap();
    assert!(next[0].is_pinned);
    assert_eq!(next[0].updated_at, 1);
}

#[tokio::test]
async fn live_search_picks_up_new_matches() {
    let store = store();
    store
        .add_note_with_content(&text_note("Shopping", "milk", 1))
        .unwrap();
    let mut live = store.search_notes("eggs");
    assert!(live.next().await.unwrap().unwrap().is_empty());

    store
        .add_note_with_content(&text_note("Breakfast", "eggs and toast", 2))
        .unwrap();
    assert_eq!(
        titles(&live.next().await.unwrap().unwrap()),
        vec!["Breakfast"]
    );

    store
        .add_note_with_content(&text_note("Unrelated", "tea", 3))
        .unwrap();
    assert_eq!(
        titles(&live.next().await.unwrap().unwrap()),
        vec!["Breakfast"]
    );
}

#[tokio::test]
async fn bursts_of_writes_coalesce_into_latest_snapshot() {
    let store = store();
    let mut live = store.all_notes();
    assert!(live.next().await.unwrap().unwrap().is_empty());

    store.add_note_with_content(&text_note("a", "x", 1)).unwrap();
    store.add_note_with_content(&text_note("b", "y", 2)).unwrap();
    store.add_note_with_content(&text_note("c", "z", 3)).unwrap();

    assert_eq!(
        titles(&live.next().await.unwrap().unwrap()),
        vec!["c", "b", "a"]
    );
    assert!(!live.has_pending_change());
}

#[tokio::test]
async fn failed_write_does_not_emit() {
    let store = store();
    let mut live = store.all_notes();
    live.next().await.unwrap().unwrap();

    assert!(store.switch_pinned(42).is_err());
    assert!(store.delete_note(42).is_err());

    assert!(!live.has_pending_change());
}

#[tokio::test]
async fn subscription_ends_when_store_is_dropped() {
    let store = store();
    let mut live = store.all_notes();
    live.next().await.unwrap().unwrap();

    drop(store);

    assert!(live.next().await.is_none());
    assert!(live.snapshot().is_err());
}

#[tokio::test]
async fn cancelled_subscription_does_not_block_writes() {
    let store = store();
    let live = store.all_notes();
    live.cancel();

    store.add_note_with_content(&text_note("a", "x", 1)).unwrap();
    assert_eq!(store.all_notes().snapshot().unwrap().len(), 1);
}

#[tokio::test]
async fn engine_queries_observe_service_writes() {
    let root = tempfile::tempdir().unwrap();
    let engine = NotesEngine::open_in_memory(root.path().join("images")).unwrap();

    let mut live = engine.queries.all_notes();
    assert!(live.next().await.unwrap().unwrap().is_empty());

    let id = engine
        .notes
        .add_note("Hello", vec![ContentItem::text("world")], false, 1)
        .unwrap();
    let notes = live.next().await.unwrap().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].id, id);
}

#[tokio::test]
async fn notes_screen_splits_live_results_by_pin() {
    let root = tempfile::tempdir().unwrap();
    let engine = NotesEngine::open_in_memory(root.path().join("images")).unwrap();
    let mut state = NotesScreenState::default();

    for (title, at) in [("first", 1), ("second", 2)] {
        let (next, write) = notes_list::reduce(
            state,
            NotesCommand::AddNote {
                title: title.to_string(),
                text: "body".to_string(),
            },
        );
        state = next;
        engine.notes.apply(write.unwrap(), at).unwrap();
    }
    let first_id = engine.notes.search_note("first").snapshot().unwrap()[0].id;

    let (next, write) = notes_list::reduce(state, NotesCommand::SwitchPinnedStatus(first_id));
    state = next;
    engine.notes.apply(write.unwrap(), 3).unwrap();

    let mut live = notes_list::subscribe(&engine.queries, &state.query);
    state = notes_list::apply_snapshot(state, live.next().await.unwrap().unwrap());
    assert_eq!(titles(&state.pinned), vec!["first"]);
    assert_eq!(titles(&state.others), vec!["second"]);

    let (next, _) = notes_list::reduce(state, NotesCommand::SearchNote("  sec ".to_string()));
    state = next;
    let mut live = notes_list::subscribe(&engine.queries, &state.query);
    state = notes_list::apply_snapshot(state, live.next().await.unwrap().unwrap());
    assert!(state.pinned.is_empty());
    assert_eq!(titles(&state.others), vec!["second"]);
}
