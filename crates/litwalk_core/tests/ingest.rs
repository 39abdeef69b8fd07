use litwalk_core::{
    open_db_in_memory, parse_file, Article, ArticleRepository, EventKind, EventRepository,
    IngestError, IngestService, ParseOptions, SqliteArticleRepository, SqliteEventRepository,
};
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

#[test]
fn add_imports_fixture_and_reports_counts() {
    let mut conn = open_db_in_memory().unwrap();

    let summary = IngestService::new(&mut conn, ParseOptions::default())
        .add(fixture("sample.bib"))
        .unwrap();

    assert_eq!(summary.added, 3);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.total(), 3);

    let repo = SqliteArticleRepository::new(&conn);
    assert_eq!(repo.count().unwrap(), 3);
    let stats = repo.stats().unwrap();
    assert_eq!(stats.missing_doi, 2);
    assert_eq!(stats.missing_abstract, 2);
    assert_eq!(stats.missing_keywords, 2);
}

#[test]
fn re_adding_same_file_is_idempotent() {
    let mut conn = open_db_in_memory().unwrap();
    let first = IngestService::new(&mut conn, ParseOptions::default())
        .add(fixture("sample.bib"))
        .unwrap();
    let before = SqliteArticleRepository::new(&conn).list().unwrap();

    let second = IngestService::new(&mut conn, ParseOptions::default())
        .add(fixture("sample.bib"))
        .unwrap();

    assert_eq!(first.added, 3);
    assert_eq!(second.added, 0);
    assert_eq!(second.updated, 0);
    assert_eq!(second.unchanged, 3);
    assert_eq!(SqliteArticleRepository::new(&conn).list().unwrap(), before);
}

#[test]
fn stored_articles_round_trip_parsed_values() {
    let mut conn = open_db_in_memory().unwrap();
    IngestService::new(&mut conn, ParseOptions::default())
        .add(fixture("sample.bib"))
        .unwrap();

    let parsed = parse_file(fixture("sample.bib"), &ParseOptions::default()).unwrap();
    let repo = SqliteArticleRepository::new(&conn);
    for article in &parsed.articles {
        assert_eq!(repo.get(&article.id).unwrap().as_ref(), Some(article));
    }
}

#[test]
fn changed_records_are_updated_in_place_and_keep_history() {
    let mut conn = open_db_in_memory().unwrap();
    IngestService::new(&mut conn, ParseOptions::default())
        .add(fixture("sample.bib"))
        .unwrap();
    SqliteEventRepository::new(&conn)
        .record_event("doe2019folding", EventKind::Walked)
        .unwrap();

    let summary = IngestService::new(&mut conn, ParseOptions::default())
        .add(fixture("sample_updated.bib"))
        .unwrap();

    assert_eq!(summary.added, 1);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.unchanged, 1);

    let repo = SqliteArticleRepository::new(&conn);
    assert_eq!(repo.count().unwrap(), 4);
    let doe = repo.get("doe2019folding").unwrap().unwrap();
    assert_eq!(doe.title, "Protein Folding at Planetary Scale");
    assert_eq!(doe.authors, ["Doe, John", "Roe, Richard"]);
    assert_eq!(doe.doi.as_deref(), Some("10.1000/fold.2019"));

    let events = SqliteEventRepository::new(&conn)
        .events_for("doe2019folding")
        .unwrap();
    assert_eq!(events.len(), 1);
}

#[test]
fn duplicate_identifiers_within_one_batch_keep_last_entry() {
    let mut conn = open_db_in_memory().unwrap();
    let summary = IngestService::new(&mut conn, ParseOptions::default())
        .ingest_articles(vec![
            Article::new("dup", "Draft title"),
            Article::new("dup", "Final title"),
        ])
        .unwrap();

    assert_eq!(summary.added, 1);
    assert_eq!(summary.duplicates, 1);
    let stored = SqliteArticleRepository::new(&conn).get("dup").unwrap().unwrap();
    assert_eq!(stored.title, "Final title");
}

#[test]
fn failed_write_rolls_back_whole_batch() {
    let mut conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TRIGGER reject_second BEFORE INSERT ON articles
         WHEN NEW.id = 'second'
         BEGIN SELECT RAISE(ABORT, 'rejected by test trigger'); END;",
    )
    .unwrap();

    let err = IngestService::new(&mut conn, ParseOptions::default())
        .ingest_articles(vec![
            Article::new("first", "First"),
            Article::new("second", "Second"),
            Article::new("third", "Third"),
        ])
        .unwrap_err();

    assert!(matches!(err, IngestError::Store(_)));
    assert_eq!(SqliteArticleRepository::new(&conn).count().unwrap(), 0);
}

#[test]
fn unreadable_file_leaves_store_untouched() {
    let mut conn = open_db_in_memory().unwrap();
    let err = IngestService::new(&mut conn, ParseOptions::default())
        .add(fixture("missing.bib"))
        .unwrap_err();

    assert!(matches!(err, IngestError::Parse(_)));
    assert_eq!(SqliteArticleRepository::new(&conn).count().unwrap(), 0);
}
