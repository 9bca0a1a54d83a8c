use bookshelf_core::{
    Author, BookCollection, BookWrite, CommitEvent, LibraryService, SqliteBookRepository,
    StoreError,
};
use std::sync::{Arc, Mutex};

#[test]
fn create_then_lookup_by_natural_key() {
    let service = LibraryService::open_in_memory().unwrap();

    let created = service.create_author("John", "Doe").unwrap();
    assert!(created.is_persisted());
    assert_eq!(created.book_count(), Some(0));

    let found = service.author_by_name("John", "Doe").unwrap().unwrap();
    assert_eq!(found.id, created.id);
    assert_eq!(found.book_count(), Some(0), "books are eagerly loaded");

    assert!(service.author_by_name("Jane", "Doe").unwrap().is_none());
}

#[test]
fn open_persists_across_service_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("library.db");

    let first = LibraryService::open(&path).unwrap();
    let mut author = first.create_author("John", "Doe").unwrap();
    first.add_book_to_author(&mut author, "My Story Part 1").unwrap();
    drop(first);

    let second = LibraryService::open(&path).unwrap();
    let found = second.author_by_name("John", "Doe").unwrap().unwrap();
    assert_eq!(found.book_count(), Some(1));
}

#[test]
fn add_book_appends_exactly_one_with_matching_fk() {
    let service = LibraryService::open_in_memory().unwrap();
    let mut author = service.create_author("John", "Doe").unwrap();
    let before = author.book_count().unwrap();

    let outcome = service
        .add_book_to_author(&mut author, "My Story Part 1")
        .unwrap();
    let book = match outcome {
        BookWrite::Created(book) => book,
        other => panic!("expected a created book, got {other:?}"),
    };
    assert_eq!(book.author_id, author.id);
    assert!(book.is_persisted());

    let requeried = service.author_by_name("John", "Doe").unwrap().unwrap();
    assert_eq!(requeried.book_count(), Some(before + 1));
    let shelved = requeried.book_by_title("My Story Part 1").unwrap();
    assert_eq!(shelved.author_id, requeried.id);
}

#[test]
fn duplicate_title_is_a_persisted_noop() {
    let service = LibraryService::open_in_memory().unwrap();
    let mut author = service.create_author("John", "Doe").unwrap();

    service
        .add_book_to_author(&mut author, "My Story Part 1")
        .unwrap();
    let outcome = service
        .add_book_to_author(&mut author, "My Story Part 1")
        .unwrap();

    match outcome {
        BookWrite::AlreadyShelved(book) => assert_eq!(book.title, "My Story Part 1"),
        other => panic!("expected already-shelved, got {other:?}"),
    }

    let requeried = service.author_by_name("John", "Doe").unwrap().unwrap();
    assert_eq!(requeried.book_count(), Some(1));
}

#[test]
fn add_book_materializes_an_unloaded_shelf_first() {
    let service = LibraryService::open_in_memory().unwrap();
    let mut author = service.create_author("John", "Doe").unwrap();
    service
        .add_book_to_author(&mut author, "My Story Part 1")
        .unwrap();

    // Simulate a caller holding a bare author; the existing book must
    // survive the re-attach.
    author.books = BookCollection::Unloaded;
    service
        .add_book_to_author(&mut author, "My Story Part 2")
        .unwrap();

    let requeried = service.author_by_name("John", "Doe").unwrap().unwrap();
    assert_eq!(requeried.book_count(), Some(2));
}

#[test]
fn add_book_to_unpersisted_author_is_not_found() {
    let service = LibraryService::open_in_memory().unwrap();
    let mut detached = Author::new("John", "Doe");

    match service.add_book_to_author(&mut detached, "My Story Part 1") {
        Err(StoreError::NotFound(_)) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn clear_books_deletes_every_referencing_row() {
    let service = LibraryService::open_in_memory().unwrap();
    let mut author = service.create_author("John", "Doe").unwrap();
    service
        .add_book_to_author(&mut author, "My Story Part 1")
        .unwrap();
    service
        .add_book_to_author(&mut author, "My Story Part 2")
        .unwrap();

    let deleted = service.clear_books_of_author(&mut author).unwrap();
    assert_eq!(deleted, 2);
    assert_eq!(author.book_count(), Some(0));

    let requeried = service.author_by_name("John", "Doe").unwrap().unwrap();
    assert_eq!(requeried.book_count(), Some(0));
}

#[test]
fn commit_hook_fires_only_after_durable_commits() {
    let events: Arc<Mutex<Vec<CommitEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);

    let mut service = LibraryService::open_in_memory().unwrap();
    service.set_commit_hook(Box::new(move |event| {
        sink.lock().unwrap().push(event.clone());
    }));

    let mut author = service.create_author("John", "Doe").unwrap();
    service
        .add_book_to_author(&mut author, "My Story Part 1")
        .unwrap();
    // Duplicate write path commits nothing, so it must notify nothing.
    service
        .add_book_to_author(&mut author, "My Story Part 1")
        .unwrap();
    service.clear_books_of_author(&mut author).unwrap();

    let events = events.lock().unwrap();
    let counts: Vec<usize> = events.iter().map(|event| event.book_count).collect();
    assert_eq!(counts, [0, 1, 0]);
    assert!(events.iter().all(|event| event.display_name == "John Doe"));
}

#[test]
fn john_doe_scenario_ends_with_an_empty_shelf() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scenario.db");
    let service = LibraryService::open(&path).unwrap();

    let mut author = service.create_author("John", "Doe").unwrap();
    service
        .add_book_to_author(&mut author, "My Story Part 1")
        .unwrap();
    service
        .add_book_to_author(&mut author, "My Story Part 2")
        .unwrap();
    let author_id = author.id.unwrap();

    let rows_after_adds = count_book_rows(&path, author_id);
    assert_eq!(rows_after_adds, 2);

    service.clear_books_of_author(&mut author).unwrap();
    service.reload().unwrap();

    let found = service.author_by_name("John", "Doe").unwrap().unwrap();
    assert_eq!(found.book_count(), Some(0));
    // No Book rows anywhere may still reference the author's identity.
    assert_eq!(count_book_rows(&path, author_id), rows_after_adds - 2);
}

#[test]
fn reload_sees_externally_made_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.db");

    let service = LibraryService::open(&path).unwrap();
    service.create_author("John", "Doe").unwrap();

    // A second writer modifies the file behind the service's back.
    let external = rusqlite::Connection::open(&path).unwrap();
    external
        .execute(
            "INSERT INTO authors (first_name, last_name) VALUES ('Jane', 'Roe');",
            [],
        )
        .unwrap();
    drop(external);

    service.reload().unwrap();
    assert!(service.author_by_name("Jane", "Roe").unwrap().is_some());
}

#[test]
fn reload_fails_when_database_file_vanished() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vanishing.db");

    let service = LibraryService::open(&path).unwrap();
    service.create_author("John", "Doe").unwrap();

    std::fs::remove_file(&path).unwrap();

    match service.reload() {
        Err(StoreError::Db(_)) => {}
        other => panic!("unexpected result: {other:?}"),
    }

    // The old handle survives a failed reload; committed state stays
    // readable.
    let found = service.author_by_name("John", "Doe").unwrap().unwrap();
    assert_eq!(found.book_count(), Some(0));
}

// Counts FK references over a raw connection so cascade bugs cannot hide
// behind the eager-loaded view.
fn count_book_rows(path: &std::path::Path, author_id: i64) -> usize {
    let conn = rusqlite::Connection::open(path).unwrap();
    SqliteBookRepository::new(&conn)
        .count_referencing(author_id)
        .unwrap()
}
