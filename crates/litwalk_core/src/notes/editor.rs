//! External editor invocation.
//!
//! # Invariants
//! - A spawned editor is always waited on; a guard kills and reaps it if the
//!   wait is skipped on an early return.

use super::NoteError;
use log::{debug, warn};
use std::path::Path;
use std::process::{Child, Command, ExitStatus};

const FALLBACK_EDITOR: &str = "vi";

/// Something that lets the user edit a file and returns once done.
pub trait Editor {
    fn edit(&self, path: &Path) -> Result<(), NoteError>;
}

/// Editor launched as a child process, e.g. `vim` or `code --wait`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEditor {
    program: String,
    args: Vec<String>,
}

impl CommandEditor {
    /// Splits a command line on whitespace; `None` for a blank command.
    pub fn from_command(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    /// Uses `configured`, then `$VISUAL`, then `$EDITOR`, then `vi`.
    pub fn resolve(configured: Option<&str>) -> Self {
        let from_env = |name: &str| std::env::var(name).ok();
        configured
            .map(str::to_string)
            .into_iter()
            .chain(from_env("VISUAL"))
            .chain(from_env("EDITOR"))
            .find_map(|command| Self::from_command(&command))
            .unwrap_or_else(|| Self {
                program: FALLBACK_EDITOR.to_string(),
                args: Vec::new(),
            })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Editor for CommandEditor {
    fn edit(&self, path: &Path) -> Result<(), NoteError> {
        let command = self.command_line();
        debug!(
            "event=editor_launch module=notes status=start command={} path={}",
            command,
            path.display()
        );

        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .spawn()
            .map_err(|source| NoteError::EditorLaunch {
                command: command.clone(),
                source,
            })?;

        let status = ChildGuard::new(child)
            .wait()
            .map_err(|source| NoteError::EditorWait {
                command: command.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(NoteError::EditorFailed {
                command,
                code: status.code(),
            })
        }
    }
}

struct ChildGuard {
    child: Child,
    reaped: bool,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        Self {
            child,
            reaped: false,
        }
    }

    fn wait(mut self) -> std::io::Result<ExitStatus> {
        let status = self.child.wait()?;
        self.reaped = true;
        Ok(status)
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if self.reaped {
            return;
        }
        warn!(
            "event=editor_cleanup module=notes status=start pid={}",
            self.child.id()
        );
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::CommandEditor;

    #[test]
    fn from_command_splits_arguments() {
        let editor = CommandEditor::from_command("  code --wait  ").expect("editor");
        assert_eq!(editor.program(), "code");
        assert_eq!(editor.args(), ["--wait".to_string()]);
        assert!(CommandEditor::from_command("   ").is_none());
    }

    #[test]
    fn configured_editor_wins() {
        let editor = CommandEditor::resolve(Some("nano -w"));
        assert_eq!(editor.program(), "nano");
    }
}
