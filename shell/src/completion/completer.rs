// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! `Tab` completion. The token left of the cursor is classified (first match wins):
//!
//! 1. The line starts with `./` and this is the first token: entries of the current
//!    directory.
//! 2. The line starts with `/` and this is the first token: entries of the directory
//!    part of the token.
//! 3. Any other first token without a `/`: executables in `PATH`, in `PATH` order.
//! 4. Anything else: like 2, relative to the current directory when the token is not
//!    absolute.
//!
//! The first matching candidate wins. Directories sort before files, then by name.

use std::{fs,
          os::unix::fs::PermissionsExt as _,
          path::{Path, PathBuf}};

use crate::{is_printable_ascii, is_separator};

const PARENT_DIR: &str = "..";

/// What completion needs to know besides the line itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionContext {
    pub cwd: PathBuf,
    /// `:` separated, like `$PATH`.
    pub path_var: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompletionTarget {
    /// Entries of `dir` whose name starts with `key`. Files and directories.
    DirectoryEntries { dir: PathBuf, key: String },
    /// Executable regular files in the `PATH` directories whose name starts with `key`.
    PathExecutables { key: String },
    /// The token is `..`.
    ParentDir,
}

/// The text to insert at the cursor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    pub insertion: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Candidate {
    name: String,
    is_dir: bool,
}

/// Decide what to complete. `None` if the line is empty, the cursor is at the start, or
/// the character left of the cursor is a separator.
#[must_use]
pub fn classify(line: &str, cursor: usize, cwd: &Path) -> Option<CompletionTarget> {
    let left = line.get(..cursor)?;
    let last_char = left.chars().next_back()?;
    if is_separator(last_char) {
        return None;
    }

    let token_start = left.rfind(is_separator).map_or(0, |it| it + 1);
    let token = &left[token_start..];
    let is_first_token = left[..token_start].chars().all(is_separator);

    if token == PARENT_DIR {
        return Some(CompletionTarget::ParentDir);
    }

    let target = match token.strip_prefix("./") {
        Some(key) if is_first_token && !key.contains('/') => {
            CompletionTarget::DirectoryEntries {
                dir: cwd.to_path_buf(),
                key: key.to_string(),
            }
        }
        _ if is_first_token && !token.contains('/') => CompletionTarget::PathExecutables {
            key: token.to_string(),
        },
        _ => split_path_token(token, cwd),
    };
    Some(target)
}

/// `"/usr/lo"` -> (`/usr/`, `lo`), `"src/ma"` -> (`<cwd>/src/`, `ma`), `"ma"` ->
/// (`<cwd>`, `ma`).
fn split_path_token(token: &str, cwd: &Path) -> CompletionTarget {
    let (dir, key) = match token.rsplit_once('/') {
        Some(("", key)) => (PathBuf::from("/"), key),
        Some((dir, key)) if dir.starts_with('/') => (PathBuf::from(dir), key),
        Some((dir, key)) => (cwd.join(dir), key),
        None => (cwd.to_path_buf(), token),
    };
    CompletionTarget::DirectoryEntries {
        dir,
        key: key.to_string(),
    }
}

/// Complete the token left of `cursor`. `None` leaves the line unchanged.
#[must_use]
pub fn complete(line: &str, cursor: usize, ctx: &CompletionContext) -> Option<Completion> {
    let target = classify(line, cursor, &ctx.cwd)?;

    let insertion = match &target {
        CompletionTarget::ParentDir => "/".to_string(),
        CompletionTarget::DirectoryEntries { dir, key } => {
            let candidate = list_directory(dir, key, false).into_iter().next()?;
            suffix_for(&candidate, key)
        }
        CompletionTarget::PathExecutables { key } => ctx
            .path_var
            .split(':')
            .map(|it| if it.is_empty() { Path::new(".") } else { Path::new(it) })
            .find_map(|dir| list_directory(dir, key, true).into_iter().next())
            .map(|candidate| suffix_for(&candidate, key))?,
    };

    tracing::debug!(message = "completion", target = ?target, insertion = %insertion);

    if insertion.is_empty() {
        None
    } else {
        Some(Completion { insertion })
    }
}

fn suffix_for(candidate: &Candidate, key: &str) -> String {
    let mut it = candidate.name[key.len()..].to_string();
    if candidate.is_dir {
        it.push('/');
    }
    it
}

/// Entries of `dir` starting with `key`, directories first, then by name. Hidden entries
/// only match a key that starts with `.`. Names the line editor can't hold (anything
/// besides printable ASCII) are skipped. Unreadable directories have no entries.
fn list_directory(dir: &Path, key: &str, executables_only: bool) -> Vec<Candidate> {
    let Ok(read_dir) = fs::read_dir(dir) else {
        return vec![];
    };
    let show_hidden = key.starts_with('.');

    let mut candidates: Vec<Candidate> = read_dir
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            if !name.starts_with(key) || (name.starts_with('.') && !show_hidden) {
                return None;
            }
            if !name.bytes().all(is_printable_ascii) {
                return None;
            }
            // Follows symlinks.
            let metadata = fs::metadata(entry.path()).ok()?;
            if executables_only {
                let is_executable = metadata.permissions().mode() & 0o111 != 0;
                return (metadata.is_file() && is_executable).then_some(Candidate {
                    name,
                    is_dir: false,
                });
            }
            Some(Candidate {
                name,
                is_dir: metadata.is_dir(),
            })
        })
        .collect();

    candidates.sort_by(|lhs, rhs| {
        rhs.is_dir
            .cmp(&lhs.is_dir)
            .then_with(|| lhs.name.cmp(&rhs.name))
    });
    candidates
}

#[cfg(test)]
mod tests_completer {
    use std::os::unix::fs::PermissionsExt;

    use pretty_assertions::assert_eq;
    use r3bl_test_fixtures::{TempDir, create_temp_dir};

    use super::*;

    /// `hello.sh` (executable), `helpers/`, `.hidden`, `notes.txt`, `src/main.rs`.
    fn setup() -> (TempDir, CompletionContext) {
        let dir = create_temp_dir().unwrap();
        let script = dir.join("hello.sh");
        fs::write(&script, "#!/bin/sh\necho hello\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        fs::create_dir(dir.join("helpers")).unwrap();
        fs::write(dir.join(".hidden"), "").unwrap();
        fs::write(dir.join("notes.txt"), "").unwrap();
        fs::create_dir(dir.join("src")).unwrap();
        fs::write(dir.join("src").join("main.rs"), "").unwrap();

        let ctx = CompletionContext {
            cwd: dir.path.clone(),
            path_var: dir.path.display().to_string(),
        };
        (dir, ctx)
    }

    fn insertion(line: &str, ctx: &CompletionContext) -> Option<String> {
        complete(line, line.len(), ctx).map(|it| it.insertion)
    }

    #[test]
    fn test_dot_slash_prefers_directory() {
        let (_dir, ctx) = setup();
        assert_eq!(insertion("./hel", &ctx), Some("pers/".to_string()));
        assert_eq!(insertion("./hello", &ctx), Some(".sh".to_string()));
        assert_eq!(insertion("./zzz", &ctx), None);
    }

    #[test]
    fn test_absolute_first_token() {
        let (dir, ctx) = setup();
        let line = format!("{}/not", dir.path.display());
        assert_eq!(insertion(&line, &ctx), Some("es.txt".to_string()));
    }

    #[test]
    fn test_first_token_searches_path_executables_only() {
        let (_dir, ctx) = setup();
        assert_eq!(insertion("hel", &ctx), Some("lo.sh".to_string()));
        // `notes.txt` is not executable.
        assert_eq!(insertion("not", &ctx), None);
    }

    #[test]
    fn test_later_token_is_relative_to_cwd() {
        let (_dir, ctx) = setup();
        assert_eq!(insertion("cat not", &ctx), Some("es.txt".to_string()));
        assert_eq!(insertion("cat src/ma", &ctx), Some("in.rs".to_string()));
        assert_eq!(insertion("ls he", &ctx), Some("lpers/".to_string()));
    }

    #[test]
    fn test_hidden_entries_need_a_dot_key() {
        let (_dir, ctx) = setup();
        assert_eq!(insertion("cat .hid", &ctx), Some("den".to_string()));
        assert_eq!(insertion("cat ", &ctx), None);
    }

    #[test]
    fn test_parent_dir_and_no_op_cases() {
        let (_dir, ctx) = setup();
        assert_eq!(insertion("cd ..", &ctx), Some("/".to_string()));
        assert_eq!(insertion("", &ctx), None);
        assert_eq!(insertion("ls ", &ctx), None);
        // Exact directory name gets its slash.
        assert_eq!(insertion("ls helpers", &ctx), Some("/".to_string()));
        // Exact file name has nothing left to add.
        assert_eq!(insertion("cat notes.txt", &ctx), None);
    }

    #[test]
    fn test_cursor_in_the_middle_uses_left_side_only() {
        let (_dir, ctx) = setup();
        let line = "cat not more";
        assert_eq!(
            complete(line, "cat not".len(), &ctx).map(|it| it.insertion),
            Some("es.txt".to_string())
        );
    }

    #[test]
    fn test_non_ascii_names_are_skipped() {
        let (dir, ctx) = setup();
        fs::write(dir.join("caf\u{e9}"), "").unwrap();
        assert_eq!(insertion("cat ./caf", &ctx), None);

        fs::write(dir.join("cafe.txt"), "").unwrap();
        assert_eq!(insertion("cat caf", &ctx), Some("e.txt".to_string()));
    }

    #[test]
    fn test_classify() {
        let cwd = Path::new("/work");
        assert_eq!(
            classify("./a", 3, cwd),
            Some(CompletionTarget::DirectoryEntries {
                dir: PathBuf::from("/work"),
                key: "a".into()
            })
        );
        assert_eq!(
            classify("/usr/lo", 7, cwd),
            Some(CompletionTarget::DirectoryEntries {
                dir: PathBuf::from("/usr"),
                key: "lo".into()
            })
        );
        assert_eq!(
            classify("/b", 2, cwd),
            Some(CompletionTarget::DirectoryEntries {
                dir: PathBuf::from("/"),
                key: "b".into()
            })
        );
        assert_eq!(
            classify("ec", 2, cwd),
            Some(CompletionTarget::PathExecutables { key: "ec".into() })
        );
        assert_eq!(classify("echo ", 5, cwd), None);
    }
}
