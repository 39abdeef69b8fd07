use litwalk_core::bibtex::SkipReason;
use litwalk_core::{parse_file, ParseError, ParseOptions};
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

#[test]
fn parses_fixture_into_normalized_articles() {
    let parsed = parse_file(fixture("sample.bib"), &ParseOptions::default()).unwrap();

    let ids: Vec<&str> = parsed.articles.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, ["smith2020walks", "doe2019folding", "lee2021notes"]);

    let smith = &parsed.articles[0];
    assert_eq!(smith.entry_type, "article");
    assert_eq!(smith.title, "Random Walks on Citation Graphs");
    assert_eq!(smith.authors, ["Smith, Jane", "Müller, Hans"]);
    assert_eq!(
        smith.abstract_text.as_deref(),
        Some("We study random walks over citation networks.")
    );
    assert_eq!(smith.year, Some(2020));
    assert_eq!(smith.doi.as_deref(), Some("10.1000/walks.2020"));
    assert_eq!(smith.journal.as_deref(), Some("Nature"));
    assert_eq!(smith.keywords, ["graphs", "random walks"]);
    assert!(smith
        .raw_entry
        .as_deref()
        .is_some_and(|raw| raw.starts_with("@article{smith2020walks")));

    let doe = &parsed.articles[1];
    assert_eq!(doe.year, Some(2019));
    assert_eq!(doe.journal.as_deref(), Some("Proceedings of Folding"));
    assert!(doe.keywords.is_empty());
    assert_eq!(doe.abstract_text, None);
}

#[test]
fn reports_entries_without_title_as_skipped() {
    let parsed = parse_file(fixture("sample.bib"), &ParseOptions::default()).unwrap();

    assert_eq!(parsed.skipped.len(), 1);
    let skipped = &parsed.skipped[0];
    assert_eq!(skipped.key.as_deref(), Some("untitled2001"));
    assert_eq!(skipped.reason, SkipReason::MissingTitle);
}

#[test]
fn raw_mode_keeps_latex_markup() {
    let options = ParseOptions {
        normalize_text: false,
    };
    let parsed = parse_file(fixture("sample.bib"), &options).unwrap();

    let title = &parsed.articles[0].title;
    assert!(title.starts_with("Random {Walks} on "));
    assert!(title.ends_with("Citation Graphs"));
    assert!(!title.contains('\n'));
    assert!(parsed.articles[0].authors[1].contains("\\\""));
}

#[test]
fn missing_file_is_an_io_error() {
    let err = parse_file(fixture("does_not_exist.bib"), &ParseOptions::default()).unwrap_err();
    assert!(matches!(err, ParseError::Io { .. }));
    assert!(err.to_string().contains("does_not_exist.bib"));
}

#[test]
fn file_without_usable_entries_is_rejected() {
    let err = parse_file(fixture("no_entries.bib"), &ParseOptions::default()).unwrap_err();
    match err {
        ParseError::NoEntries { skipped, .. } => assert_eq!(skipped, 1),
        other => panic!("unexpected error: {other}"),
    }
}
