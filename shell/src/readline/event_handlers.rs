// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::io::Write;

use super::{DEBUG_READLINE_MOD, DEBUG_READLINE_SHOW_KEYS, Key, LineState, ReadlineError,
            ReadlineEvent};
use crate::{CompletionContext, HistoryNavigator, HistoryRing, HistoryScroll, complete};

/// Everything besides the line that a key can act on.
#[derive(Debug)]
pub struct EditContext<'a> {
    pub history: &'a HistoryRing,
    pub navigator: &'a mut HistoryNavigator,
    pub completion: &'a CompletionContext,
}

/// Apply one decoded key to the line, echoing its effect to `term`. Returns
/// `Some(event)` when the key ends the line.
///
/// # Errors
///
/// Returns an error if writing to `term` fails.
pub fn apply_key(
    line_state: &mut LineState,
    key: Key,
    term: &mut dyn Write,
    ctx: &mut EditContext<'_>,
) -> Result<Option<ReadlineEvent>, ReadlineError> {
    (DEBUG_READLINE_MOD && DEBUG_READLINE_SHOW_KEYS).then(|| {
        // % is Display, ? is Debug.
        tracing::debug!(message = "apply_key", key = ?key, cursor = %line_state.cursor());
    });

    match key {
        Key::Printable(byte) => {
            line_state.insert_byte(byte, term)?;
            Ok(None)
        }
        Key::Enter => handle_enter(line_state, term),
        Key::Abort => handle_abort(line_state, term),
        Key::EndOfInput => handle_end_of_input(line_state, term),
        Key::Tab => handle_tab(line_state, term, ctx.completion),
        Key::Up => handle_history_up(line_state, term, ctx),
        Key::Down => handle_history_down(line_state, term, ctx),
        Key::Backspace => edit(line_state.backspace(term)),
        Key::Delete => edit(line_state.delete_forward(term)),
        Key::Left => edit(line_state.move_left(term)),
        Key::Right => edit(line_state.move_right(term)),
        Key::Home => edit(line_state.move_home(term)),
        Key::End => edit(line_state.move_end(term)),
        Key::KillLine => edit(line_state.kill_line(term)),
        Key::Insert => {
            line_state.toggle_overwrite();
            Ok(None)
        }
        Key::PageUp | Key::PageDown => Ok(None),
    }
}

fn edit(result: std::io::Result<()>) -> Result<Option<ReadlineEvent>, ReadlineError> {
    result?;
    Ok(None)
}

fn handle_enter(
    line_state: &mut LineState,
    term: &mut dyn Write,
) -> Result<Option<ReadlineEvent>, ReadlineError> {
    let line = line_state.finish(term)?;
    Ok(Some(ReadlineEvent::Line(line)))
}

/// `Ctrl+C` drops the line.
fn handle_abort(
    line_state: &mut LineState,
    term: &mut dyn Write,
) -> Result<Option<ReadlineEvent>, ReadlineError> {
    line_state.reset();
    term.write_all(b"\n")?;
    Ok(Some(ReadlineEvent::Interrupted))
}

/// `Ctrl+D` on an empty line is end of input, otherwise it deletes under the cursor.
fn handle_end_of_input(
    line_state: &mut LineState,
    term: &mut dyn Write,
) -> Result<Option<ReadlineEvent>, ReadlineError> {
    if line_state.is_empty() {
        term.write_all(b"\n")?;
        return Ok(Some(ReadlineEvent::Eof));
    }
    line_state.delete_forward(term)?;
    Ok(None)
}

fn handle_tab(
    line_state: &mut LineState,
    term: &mut dyn Write,
    completion: &CompletionContext,
) -> Result<Option<ReadlineEvent>, ReadlineError> {
    let completion = complete(&line_state.line(), line_state.cursor(), completion);
    if let Some(it) = completion {
        line_state.insert_bytes(it.insertion.as_bytes(), term)?;
    }
    Ok(None)
}

fn handle_history_up(
    line_state: &mut LineState,
    term: &mut dyn Write,
    ctx: &mut EditContext<'_>,
) -> Result<Option<ReadlineEvent>, ReadlineError> {
    let scroll = ctx.navigator.scroll_up(ctx.history);
    apply_scroll(line_state, term, scroll)
}

fn handle_history_down(
    line_state: &mut LineState,
    term: &mut dyn Write,
    ctx: &mut EditContext<'_>,
) -> Result<Option<ReadlineEvent>, ReadlineError> {
    let scroll = ctx.navigator.scroll_down(ctx.history);
    apply_scroll(line_state, term, scroll)
}

fn apply_scroll(
    line_state: &mut LineState,
    term: &mut dyn Write,
    scroll: HistoryScroll<'_>,
) -> Result<Option<ReadlineEvent>, ReadlineError> {
    match scroll {
        HistoryScroll::Entry(entry) => line_state.replace_line(entry, term)?,
        HistoryScroll::Cleared => line_state.kill_line(term)?,
        HistoryScroll::Unchanged => {}
    }
    Ok(None)
}
