use litwalk_core::{
    open_db_in_memory, Article, ArticleRepository, EventKind, EventRepository,
    SqliteArticleRepository, SqliteEventRepository, WalkError, WalkService,
};
use rusqlite::Connection;
use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

fn seed(conn: &Connection) {
    let repo = SqliteArticleRepository::new(conn);
    let mut graphs = Article::new("graphs", "Random Walks on Graphs");
    graphs.keywords = vec!["markov chains".to_string()];
    let mut folding = Article::new("folding", "Protein Folding");
    folding.abstract_text = Some("Energy landscapes of proteins.".to_string());
    let mut survey = Article::new("survey", "A Survey");
    survey.authors = vec!["Markov, Andrey".to_string()];

    for article in [graphs, folding, survey] {
        repo.upsert(&article).unwrap();
    }
}

fn service(conn: &Connection) -> WalkService<SqliteArticleRepository<'_>, SqliteEventRepository<'_>> {
    WalkService::new(
        SqliteArticleRepository::new(conn),
        SqliteEventRepository::new(conn),
    )
}

#[test]
fn walking_an_empty_store_fails_without_logging_an_event() {
    let conn = open_db_in_memory().unwrap();

    let err = service(&conn).walk().unwrap_err();
    assert!(matches!(err, WalkError::EmptyCollection));
    let err = service(&conn).walk_filtered("anything").unwrap_err();
    assert!(matches!(err, WalkError::EmptyCollection));

    let events = SqliteEventRepository::new(&conn);
    assert_eq!(events.count_events(None).unwrap(), 0);
}

#[test]
fn each_walk_appends_one_event_for_the_chosen_article() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);

    let result = service(&conn).walk().unwrap();
    assert_eq!(result.num_total, 3);
    assert_eq!(result.num_included, 3);

    let events = SqliteEventRepository::new(&conn);
    assert_eq!(events.count_events(Some(EventKind::Walked)).unwrap(), 1);
    let logged = events.events_for(&result.article.id).unwrap();
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].kind, EventKind::Walked);
}

#[test]
fn repeated_walks_reach_every_article() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let service = service(&conn);

    let seen: HashSet<String> = (0..200)
        .map(|_| service.walk().unwrap().article.id)
        .collect();

    assert_eq!(seen.len(), 3);
    let events = SqliteEventRepository::new(&conn);
    assert_eq!(events.count_events(None).unwrap(), 200);
}

#[test]
fn filtered_walk_searches_all_text_fields() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let service = service(&conn);

    for _ in 0..20 {
        let result = service.walk_filtered("MARKOV").unwrap();
        assert_eq!(result.num_included, 2);
        assert_eq!(result.num_total, 3);
        assert!(["graphs", "survey"].contains(&result.article.id.as_str()));
    }

    let result = service.walk_filtered("landscapes").unwrap();
    assert_eq!(result.article.id, "folding");
    assert_eq!(result.num_included, 1);
}

#[test]
fn filtered_walk_without_matches_logs_nothing() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);

    let err = service(&conn).walk_filtered("quantum").unwrap_err();
    match err {
        WalkError::NoMatches { query } => assert_eq!(query, "quantum"),
        other => panic!("unexpected error: {other}"),
    }
    let events = SqliteEventRepository::new(&conn);
    assert_eq!(events.count_events(None).unwrap(), 0);
}

fn epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

#[test]
fn events_are_stamped_with_millisecond_epoch_time() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);

    let before = epoch_millis();
    let result = service(&conn).walk().unwrap();
    let after = epoch_millis();

    let logged = SqliteEventRepository::new(&conn)
        .events_for(&result.article.id)
        .unwrap();
    let stamp = logged[0].occurred_at;
    assert!(
        stamp >= before - 2 && stamp <= after + 2,
        "occurred_at {stamp} outside [{before}, {after}]"
    );
}
