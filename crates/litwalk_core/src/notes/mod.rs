//! Per-article markdown notes.
//!
//! # Responsibility
//! - Map an article to a deterministic note path under the notes directory.
//! - Create missing notes with a metadata header.
//! - Hand the note to an external editor and wait for it to exit.
//!
//! # Invariants
//! - Note paths depend only on the article title (or id) and the notes dir.
//! - Existing note content is never rewritten or parsed.
//! - A note created for a session that never reached the editor, or whose
//!   editor failed before touching it, is removed again.

mod editor;

pub use editor::{CommandEditor, Editor};

use crate::model::article::Article;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

const NOTE_EXTENSION: &str = "md";
const MAX_SLUG_CHARS: usize = 80;

static NON_ALNUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("valid slug regex"));

/// Note session failure.
#[derive(Debug)]
pub enum NoteError {
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    EditorLaunch {
        command: String,
        source: std::io::Error,
    },
    EditorWait {
        command: String,
        source: std::io::Error,
    },
    /// Editor exited unsuccessfully; `code` is `None` when killed by a signal.
    EditorFailed {
        command: String,
        code: Option<i32>,
    },
}

impl Display for NoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreateDir { path, source } => {
                write!(f, "cannot create notes directory `{}`: {source}", path.display())
            }
            Self::Write { path, source } => {
                write!(f, "cannot write note `{}`: {source}", path.display())
            }
            Self::EditorLaunch { command, source } => write!(
                f,
                "cannot launch editor `{command}`: {source}; set `editor` in the config or $EDITOR"
            ),
            Self::EditorWait { command, source } => {
                write!(f, "lost track of editor `{command}`: {source}")
            }
            Self::EditorFailed { command, code } => match code {
                Some(code) => write!(f, "editor `{command}` exited with status {code}"),
                None => write!(f, "editor `{command}` was terminated by a signal"),
            },
        }
    }
}

impl Error for NoteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. }
            | Self::Write { source, .. }
            | Self::EditorLaunch { source, .. }
            | Self::EditorWait { source, .. } => Some(source),
            Self::EditorFailed { .. } => None,
        }
    }
}

/// Resolved note file for one article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteFile {
    pub path: PathBuf,
    /// Whether this call created the file.
    pub created: bool,
}

/// Note manager rooted at one notes directory.
#[derive(Debug, Clone)]
pub struct NoteSession {
    notes_dir: PathBuf,
}

impl NoteSession {
    pub fn new(notes_dir: impl Into<PathBuf>) -> Self {
        Self {
            notes_dir: notes_dir.into(),
        }
    }

    /// Deterministic note path for `article`.
    pub fn note_path(&self, article: &Article) -> PathBuf {
        let stem = slugify(&article.title)
            .or_else(|| slugify(&article.id))
            .unwrap_or_else(|| "untitled".to_string());
        self.notes_dir.join(format!("{stem}.{NOTE_EXTENSION}"))
    }

    /// Returns whether a note file already exists for `article`.
    pub fn has_note(&self, article: &Article) -> bool {
        self.note_path(article).is_file()
    }

    /// Creates the note with its header unless it already exists.
    pub fn ensure_note(&self, article: &Article) -> Result<NoteFile, NoteError> {
        std::fs::create_dir_all(&self.notes_dir).map_err(|source| NoteError::CreateDir {
            path: self.notes_dir.clone(),
            source,
        })?;

        let path = self.note_path(article);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                return Ok(NoteFile {
                    path,
                    created: false,
                });
            }
            Err(source) => return Err(NoteError::Write { path, source }),
        };

        if let Err(source) = file.write_all(note_header(article).as_bytes()) {
            drop(file);
            let _ = std::fs::remove_file(&path);
            return Err(NoteError::Write { path, source });
        }

        info!(
            "event=note_create module=notes status=ok id={} path={}",
            article.id,
            path.display()
        );
        Ok(NoteFile {
            path,
            created: true,
        })
    }

    /// Creates the note if needed and blocks until `editor` exits.
    pub fn open_note(&self, article: &Article, editor: &dyn Editor) -> Result<NoteFile, NoteError> {
        let note = self.ensure_note(article)?;

        if let Err(err) = editor.edit(&note.path) {
            if note.created && is_untouched(&note.path, article) {
                warn!(
                    "event=note_cleanup module=notes status=ok id={} path={}",
                    article.id,
                    note.path.display()
                );
                let _ = std::fs::remove_file(&note.path);
            }
            return Err(err);
        }

        info!(
            "event=note_session module=notes status=ok id={} created={}",
            article.id, note.created
        );
        Ok(note)
    }
}

/// Header written into a freshly created note.
pub fn note_header(article: &Article) -> String {
    let mut header = format!("# {}\n\n", article.title);
    header.push_str(&format!("- id: {}\n", article.id));
    if !article.authors.is_empty() {
        header.push_str(&format!("- authors: {}\n", article.authors.join("; ")));
    }
    if let Some(year) = article.year {
        header.push_str(&format!("- year: {year}\n"));
    }
    if let Some(doi) = &article.doi {
        header.push_str(&format!("- doi: {doi}\n"));
    }
    header.push('\n');
    header
}

fn is_untouched(path: &Path, article: &Article) -> bool {
    std::fs::read_to_string(path).is_ok_and(|content| content == note_header(article))
}

/// Lowercase, dash-separated, length-capped file stem; `None` when empty.
pub fn slugify(value: &str) -> Option<String> {
    let lowered = value.to_lowercase();
    let dashed = NON_ALNUM_RE.replace_all(&lowered, "-");
    let capped: String = dashed.trim_matches('-').chars().take(MAX_SLUG_CHARS).collect();
    let slug = capped.trim_end_matches('-');
    if slug.is_empty() {
        None
    } else {
        Some(slug.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn slugify_collapses_punctuation_and_case() {
        assert_eq!(
            slugify("A Study of X: (Re)visited!").as_deref(),
            Some("a-study-of-x-re-visited")
        );
        assert_eq!(slugify("Über Zellen").as_deref(), Some("über-zellen"));
        assert_eq!(slugify("../../etc/passwd").as_deref(), Some("etc-passwd"));
        assert_eq!(slugify("?!"), None);
    }

    #[test]
    fn slugify_caps_length_without_trailing_dash() {
        let long = format!("{} tail", "a".repeat(79));
        let slug = slugify(&long).expect("slug");
        assert_eq!(slug.chars().count(), 79);
        assert!(!slug.ends_with('-'));
    }
}
