//! Built-in motion commands
//!
//! A small set of stock cursor motions so the engine is usable out of the
//! box. Each motion is a `Command` owning its literal pattern; counts
//! multiply the motion. Hosts that want different semantics simply register
//! their own commands instead.

use crate::context::{Cursor, EditorContext, Mode};
use crate::engine::Engine;
use crate::registry::Command;

/// Cursor motions covered by the built-in set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    // Character motions
    Left,          // h
    Right,         // l
    Up,            // k
    Down,          // j
    // Word motions
    WordForward,   // w
    WordBackward,  // b
    // Line motions
    LineStart,     // 0
    FirstNonBlank, // ^
    LineEnd,       // $
    // File motions
    FileStart,     // gg
    FileEnd,       // G
}

/// Modes in which the stock motions run
fn motion_modes() -> Vec<Mode> {
    vec![
        Mode::Normal,
        Mode::Visual,
        Mode::VisualLine,
        Mode::VisualBlock,
    ]
}

/// Is this a "word" character (alphanumeric or underscore)?
fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Apply a motion once, returning the new cursor position
fn apply_motion(ctx: &EditorContext, motion: Motion, count: usize) -> Cursor {
    let buffer = ctx.buffer();
    let mut cursor = ctx.cursor();
    let last_line = buffer.len().saturating_sub(1);
    // Columns are char indices throughout, never byte offsets
    let line_len = |line: usize| buffer.get(line).map_or(0, |l| l.chars().count());
    let line_end = |line: usize| line_len(line).saturating_sub(1);

    match motion {
        Motion::Left => {
            cursor.col = cursor.col.saturating_sub(count);
        }
        Motion::Right => {
            cursor.col = (cursor.col + count).min(line_end(cursor.line));
        }
        Motion::Up => {
            cursor.line = cursor.line.saturating_sub(count);
            cursor.col = cursor.col.min(line_end(cursor.line));
        }
        Motion::Down => {
            cursor.line = (cursor.line + count).min(last_line);
            cursor.col = cursor.col.min(line_end(cursor.line));
        }
        Motion::LineStart => {
            cursor.col = 0;
        }
        Motion::FirstNonBlank => {
            cursor.col = buffer
                .get(cursor.line)
                .and_then(|l| l.chars().position(|c| !c.is_whitespace()))
                .unwrap_or(0);
        }
        Motion::LineEnd => {
            cursor.col = line_end(cursor.line);
        }
        Motion::FileStart => {
            // {count}gg goes to that line, plain gg to the first
            cursor.line = if count > 1 {
                (count - 1).min(last_line)
            } else {
                0
            };
            cursor.col = 0;
        }
        Motion::FileEnd => {
            cursor.line = if count > 1 {
                (count - 1).min(last_line)
            } else {
                last_line
            };
            cursor.col = 0;
        }
        Motion::WordForward => {
            for _ in 0..count {
                cursor = next_word_start(buffer, cursor);
            }
        }
        Motion::WordBackward => {
            for _ in 0..count {
                cursor = prev_word_start(buffer, cursor);
            }
        }
    }
    cursor
}

/// Start of the next word, crossing line boundaries
fn next_word_start(buffer: &[String], cursor: Cursor) -> Cursor {
    let Some(line) = buffer.get(cursor.line) else {
        return cursor;
    };
    let chars: Vec<char> = line.chars().collect();
    let mut col = cursor.col;

    // Skip the rest of the current word, then any whitespace
    while col < chars.len() && is_word_char(chars[col]) {
        col += 1;
    }
    while col < chars.len() && chars[col].is_whitespace() {
        col += 1;
    }
    if col < chars.len() {
        return Cursor::new(cursor.line, col);
    }
    // Wrapped off the line end
    if cursor.line + 1 < buffer.len() {
        let next = &buffer[cursor.line + 1];
        let col = next
            .chars()
            .position(|c| !c.is_whitespace())
            .unwrap_or(0);
        return Cursor::new(cursor.line + 1, col);
    }
    Cursor::new(cursor.line, chars.len().saturating_sub(1))
}

/// Start of the previous word, crossing line boundaries
fn prev_word_start(buffer: &[String], cursor: Cursor) -> Cursor {
    if cursor.col > 0 {
        return match buffer.get(cursor.line) {
            Some(line) => prev_word_start_in_line(line, cursor.line, cursor.col),
            None => cursor,
        };
    }
    if cursor.line == 0 {
        return cursor;
    }
    let prev_line = cursor.line - 1;
    match buffer.get(prev_line) {
        Some(line) => prev_word_start_in_line(line, prev_line, line.chars().count()),
        None => cursor,
    }
}

fn prev_word_start_in_line(line: &str, line_no: usize, col: usize) -> Cursor {
    let chars: Vec<char> = line.chars().collect();
    let mut col = col.min(chars.len());

    while col > 0 && chars[col - 1].is_whitespace() {
        col -= 1;
    }
    while col > 0 && is_word_char(chars[col - 1]) {
        col -= 1;
    }
    Cursor::new(line_no, col)
}

/// One stock motion bound to one literal pattern
pub struct MotionCommand {
    name: &'static str,
    pattern: &'static str,
    description: &'static str,
    motion: Motion,
    enabled: bool,
}

impl MotionCommand {
    pub fn new(
        name: &'static str,
        pattern: &'static str,
        description: &'static str,
        motion: Motion,
    ) -> Self {
        Self {
            name,
            pattern,
            description,
            motion,
            enabled: true,
        }
    }
}

impl Command for MotionCommand {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn patterns(&self) -> Vec<String> {
        vec![self.pattern.to_string()]
    }

    fn modes(&self) -> Vec<Mode> {
        motion_modes()
    }

    fn execute(&mut self, ctx: &mut EditorContext) -> anyhow::Result<()> {
        let cursor = apply_motion(ctx, self.motion, ctx.count());
        ctx.set_cursor(cursor);
        Ok(())
    }

    fn enable(&mut self) {
        self.enabled = true;
    }

    fn disable(&mut self) {
        self.enabled = false;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// f{char}: jump to the next occurrence of the target on the current line
///
/// Registers one literal per printable ASCII target. The target itself is
/// recovered from the pattern that produced the dispatch.
pub struct FindCharCommand {
    enabled: bool,
}

impl FindCharCommand {
    pub fn new() -> Self {
        Self { enabled: true }
    }
}

impl Default for FindCharCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl Command for FindCharCommand {
    fn name(&self) -> &str {
        "find_char"
    }

    fn description(&self) -> &str {
        "Find the next occurrence of a character on the current line"
    }

    fn patterns(&self) -> Vec<String> {
        // ' ' through '~'
        (0x20u8..=0x7e).map(|b| format!("f{}", b as char)).collect()
    }

    fn modes(&self) -> Vec<Mode> {
        motion_modes()
    }

    fn execute(&mut self, ctx: &mut EditorContext) -> anyhow::Result<()> {
        let Some(target) = ctx.current_pattern().chars().last() else {
            return Ok(());
        };
        let count = ctx.count();
        let cursor = ctx.cursor();
        let Some(line) = ctx.current_line() else {
            return Ok(());
        };

        let mut remaining = count;
        let mut found = None;
        // Char positions, to stay consistent with the cursor's column unit
        for (i, c) in line.chars().enumerate().skip(cursor.col + 1) {
            if c == target {
                remaining -= 1;
                if remaining == 0 {
                    found = Some(i);
                    break;
                }
            }
        }
        // No hit within count occurrences leaves the cursor in place
        if let Some(col) = found {
            ctx.set_cursor(Cursor::new(cursor.line, col));
        }
        Ok(())
    }

    fn enable(&mut self) {
        self.enabled = true;
    }

    fn disable(&mut self) {
        self.enabled = false;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Register the stock motion set on an engine
pub fn register_builtin_motions(engine: &mut Engine) {
    let motions: [(&'static str, &'static str, &'static str, Motion); 11] = [
        ("move_left", "h", "Move cursor left", Motion::Left),
        ("move_down", "j", "Move cursor down", Motion::Down),
        ("move_up", "k", "Move cursor up", Motion::Up),
        ("move_right", "l", "Move cursor right", Motion::Right),
        ("line_start", "0", "Move to column 0", Motion::LineStart),
        ("first_non_blank", "^", "Move to first non-blank", Motion::FirstNonBlank),
        ("line_end", "$", "Move to end of line", Motion::LineEnd),
        ("word_forward", "w", "Move to next word start", Motion::WordForward),
        ("word_backward", "b", "Move to previous word start", Motion::WordBackward),
        ("file_start", "gg", "Move to first line", Motion::FileStart),
        ("file_end", "G", "Move to last line", Motion::FileEnd),
    ];
    for (name, pattern, description, motion) in motions {
        engine.register_command(Box::new(MotionCommand::new(
            name,
            pattern,
            description,
            motion,
        )));
    }
    engine.register_command(Box::new(FindCharCommand::new()));
}
