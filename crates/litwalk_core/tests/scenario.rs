use litwalk_core::{
    open_db, ArticleRepository, EventKind, EventRepository, IngestService, NoteSession,
    ParseOptions, QueryService, SqliteArticleRepository, SqliteEventRepository, WalkService,
};
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

#[test]
fn add_search_walk_and_reopen_store() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("db.sqlite");

    let mut conn = open_db(&db_path).unwrap();
    let summary = IngestService::new(&mut conn, ParseOptions::default())
        .add(fixture("two_studies.bib"))
        .unwrap();
    assert_eq!(summary.added, 2);

    let stats = SqliteArticleRepository::new(&conn).stats().unwrap();
    assert_eq!(stats.articles, 2);

    let notes = NoteSession::new(dir.path().join("notes"));
    let query = QueryService::new(SqliteArticleRepository::new(&conn), &notes);
    let ids: Vec<String> = query
        .search("Study", false)
        .unwrap()
        .into_iter()
        .map(|article| article.id)
        .collect();
    assert_eq!(ids, ["key1", "key2"]);

    let walk = WalkService::new(
        SqliteArticleRepository::new(&conn),
        SqliteEventRepository::new(&conn),
    );
    for _ in 0..2 {
        let picked = walk.walk().unwrap().article;
        assert!(["key1", "key2"].contains(&picked.id.as_str()));
    }
    drop(walk);
    drop(query);
    drop(conn);

    let conn = open_db(&db_path).unwrap();
    let events = SqliteEventRepository::new(&conn);
    assert_eq!(events.count_events(Some(EventKind::Walked)).unwrap(), 2);

    let repo = SqliteArticleRepository::new(&conn);
    let key1 = repo.get("key1").unwrap().unwrap();
    assert_eq!(key1.title, "A Study of X");
    assert_eq!(key1.year, Some(2020));
    assert_eq!(key1.doi.as_deref(), Some("10.1000/x.2020"));
    let key2 = repo.get("key2").unwrap().unwrap();
    assert_eq!(key2.title, "A Study of Y");
    assert_eq!(key2.year, Some(2021));
    assert_eq!(key2.doi.as_deref(), Some("10.1000/y.2021"));
}

#[test]
fn entries_on_one_line_are_all_imported() {
    let dir = tempfile::tempdir().unwrap();
    let bib = dir.path().join("one_line.bib");
    std::fs::write(
        &bib,
        "@article{key1, title={A Study of X}, year={2020}} @article{key2, title={A Study of Y}, year={2021}}\n",
    )
    .unwrap();

    let mut conn = open_db(dir.path().join("db.sqlite")).unwrap();
    let summary = IngestService::new(&mut conn, ParseOptions::default())
        .add(&bib)
        .unwrap();

    assert_eq!(summary.added, 2);
    assert_eq!(summary.skipped, 0);
    assert_eq!(SqliteArticleRepository::new(&conn).count().unwrap(), 2);
}
