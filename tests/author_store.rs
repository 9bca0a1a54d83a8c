use bookshelf_core::db::open_db_in_memory;
use bookshelf_core::{
    Author, AuthorRepository, Book, BookCollection, BookLoad, ChangeSet, SqliteAuthorRepository,
    SqliteBookRepository, StoreError,
};

#[test]
fn insert_assigns_identity_to_author_and_books() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAuthorRepository::new(&conn);

    let mut author = Author::new("John", "Doe");
    author
        .books
        .as_loaded_mut()
        .unwrap()
        .push(Book::new("My Story Part 1"));

    let mut changes = ChangeSet::new();
    changes.insert_author(author).unwrap();
    let report = repo.save(&mut changes).unwrap();

    assert!(changes.is_empty(), "successful save clears the change set");
    assert_eq!(report.inserted_books, 1);

    let saved = &report.authors[0];
    let author_id = saved.id.expect("save assigns the author id");
    let books = saved.books.as_loaded().unwrap();
    assert_eq!(books.len(), 1);
    assert!(books[0].id.is_some(), "save assigns book ids");
    assert_eq!(books[0].author_id, Some(author_id));

    let rows = SqliteBookRepository::new(&conn)
        .books_of_author(author_id)
        .unwrap();
    assert_eq!(rows, *books);
}

#[test]
fn bare_lookup_yields_unloaded_collection() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAuthorRepository::new(&conn);

    let mut changes = ChangeSet::new();
    changes.insert_author(Author::new("John", "Doe")).unwrap();
    repo.save(&mut changes).unwrap();

    let bare = repo
        .author_by_name("John", "Doe", BookLoad::Bare)
        .unwrap()
        .unwrap();
    assert_eq!(bare.books, BookCollection::Unloaded);
    assert_eq!(bare.book_count(), None);

    let eager = repo
        .author_by_name("John", "Doe", BookLoad::WithBooks)
        .unwrap()
        .unwrap();
    assert_eq!(eager.book_count(), Some(0), "confirmed zero, not unloaded");
}

#[test]
fn lookup_misses_return_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAuthorRepository::new(&conn);

    assert!(repo
        .author_by_name("Jane", "Roe", BookLoad::WithBooks)
        .unwrap()
        .is_none());
    assert!(repo.author_by_id(42, BookLoad::Bare).unwrap().is_none());
}

#[test]
fn whole_graph_update_applies_collection_diff() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAuthorRepository::new(&conn);

    let mut author = Author::new("John", "Doe");
    {
        let books = author.books.as_loaded_mut().unwrap();
        books.push(Book::new("Kept"));
        books.push(Book::new("Dropped"));
        books.push(Book::new("Renamed"));
    }
    let mut changes = ChangeSet::new();
    changes.insert_author(author).unwrap();
    let mut saved = changes_saved_author(&repo, &mut changes);
    let kept_id = saved.book_by_title("Kept").unwrap().id;

    // Net-new insert, net removal, title change, one untouched.
    {
        let books = saved.books.as_loaded_mut().unwrap();
        books.retain(|book| book.title != "Dropped");
        books
            .iter_mut()
            .find(|book| book.title == "Renamed")
            .unwrap()
            .title = "Renamed II".to_string();
        books.push(Book::new("Added"));
    }
    let mut changes = ChangeSet::new();
    changes.update_author(saved).unwrap();
    let report = repo.save(&mut changes).unwrap();

    assert_eq!(report.inserted_books, 1);
    assert_eq!(report.deleted_books, 1);
    assert_eq!(report.updated_books, 1);

    let reloaded = repo
        .author_by_name("John", "Doe", BookLoad::WithBooks)
        .unwrap()
        .unwrap();
    let titles: Vec<&str> = reloaded
        .books
        .as_loaded()
        .unwrap()
        .iter()
        .map(|book| book.title.as_str())
        .collect();
    assert_eq!(titles, ["Kept", "Renamed II", "Added"]);
    assert_eq!(
        reloaded.book_by_title("Kept").unwrap().id,
        kept_id,
        "unchanged rows keep their identity"
    );
}

#[test]
fn unloaded_collection_leaves_book_rows_alone() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAuthorRepository::new(&conn);

    let mut author = Author::new("John", "Doe");
    author
        .books
        .as_loaded_mut()
        .unwrap()
        .push(Book::new("My Story Part 1"));
    let mut changes = ChangeSet::new();
    changes.insert_author(author).unwrap();
    let saved = changes_saved_author(&repo, &mut changes);
    let author_id = saved.id.unwrap();

    let mut bare = repo
        .author_by_id(author_id, BookLoad::Bare)
        .unwrap()
        .unwrap();
    bare.first_name = "Jonathan".to_string();
    let mut changes = ChangeSet::new();
    changes.update_author(bare).unwrap();
    let report = repo.save(&mut changes).unwrap();

    assert_eq!(report.deleted_books, 0);
    assert_eq!(report.inserted_books, 0);
    assert_eq!(
        SqliteBookRepository::new(&conn)
            .count_referencing(author_id)
            .unwrap(),
        1
    );
}

#[test]
fn failed_save_preserves_staged_changes_for_retry() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAuthorRepository::new(&conn);

    let mut ghost = Author::new("No", "Row");
    ghost.id = Some(999);

    let mut changes = ChangeSet::new();
    changes.update_author(ghost).unwrap();

    match repo.save(&mut changes) {
        Err(StoreError::NotFound(_)) => {}
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(changes.len(), 1, "failure leaves the change set untouched");

    // A retry with the same staged state hits the same deterministic error.
    assert!(repo.save(&mut changes).is_err());
    assert_eq!(changes.len(), 1);
}

#[test]
fn failed_save_rolls_back_earlier_staged_changes() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAuthorRepository::new(&conn);

    let mut ghost = Author::new("No", "Row");
    ghost.id = Some(999);

    let mut changes = ChangeSet::new();
    changes.insert_author(Author::new("John", "Doe")).unwrap();
    changes.update_author(ghost).unwrap();

    assert!(repo.save(&mut changes).is_err());

    // The first staged insert must not have leaked past the rollback.
    assert!(repo
        .author_by_name("John", "Doe", BookLoad::Bare)
        .unwrap()
        .is_none());
    assert_eq!(changes.len(), 2);
}

#[test]
fn blank_author_fails_validation_before_sql() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAuthorRepository::new(&conn);

    let mut changes = ChangeSet::new();
    changes.insert_author(Author::new(" ", "")).unwrap();

    match repo.save(&mut changes) {
        Err(StoreError::Validation(_)) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn stale_book_identity_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAuthorRepository::new(&conn);

    let mut changes = ChangeSet::new();
    changes.insert_author(Author::new("John", "Doe")).unwrap();
    let mut saved = changes_saved_author(&repo, &mut changes);

    let mut stale = Book::new("Phantom");
    stale.id = Some(12345);
    saved.books.as_loaded_mut().unwrap().push(stale);

    let mut changes = ChangeSet::new();
    changes.update_author(saved).unwrap();
    match repo.save(&mut changes) {
        Err(StoreError::NotFound(message)) => {
            assert!(message.contains("12345"), "message was: {message}");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

fn changes_saved_author(repo: &SqliteAuthorRepository<'_>, changes: &mut ChangeSet) -> Author {
    let report = repo.save(changes).unwrap();
    report.authors.into_iter().next().unwrap()
}
