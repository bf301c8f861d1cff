//! Execution context handed to dispatched commands
//!
//! The single mutable handle through which a command observes and mutates
//! editor state: buffer lines, cursor, mode, registers, the active repeat
//! count, and the literal pattern that produced the dispatch.

use std::collections::HashMap;

/// Editor mode constraining which commands may execute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Normal,
    Insert,
    Replace,
    Command,
    Visual,
    VisualLine,
    VisualBlock,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Normal => "NORMAL",
            Mode::Insert => "INSERT",
            Mode::Replace => "REPLACE",
            Mode::Command => "COMMAND",
            Mode::Visual => "VISUAL",
            Mode::VisualLine => "VISUAL LINE",
            Mode::VisualBlock => "VISUAL BLOCK",
        }
    }
}

/// Cursor position in the buffer (0-indexed)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    /// Line number (0-indexed)
    pub line: usize,
    /// Column number (0-indexed)
    pub col: usize,
}

impl Cursor {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

/// Register file: named slots plus the unnamed default
///
/// The clipboard is register '*'. Yanks always mirror into the unnamed
/// register '"' so a bare paste sees the last yank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registers {
    slots: HashMap<char, String>,
    unnamed: Option<String>,
}

/// Name of the clipboard register
pub const CLIPBOARD_REGISTER: char = '*';

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: char) -> Option<&str> {
        match name {
            '"' => self.unnamed.as_deref(),
            // Black hole register is always empty
            '_' => None,
            _ => self.slots.get(&name).map(String::as_str),
        }
    }

    pub fn set(&mut self, name: char, content: impl Into<String>) {
        match name {
            '"' => self.unnamed = Some(content.into()),
            '_' => {}
            _ => {
                self.slots.insert(name, content.into());
            }
        }
    }

    /// Store a yank: fills the named register and the unnamed register
    pub fn yank(&mut self, name: char, content: impl Into<String>) {
        let content = content.into();
        if name != '_' {
            self.unnamed = Some(content.clone());
        }
        self.set(name, content);
    }
}

/// Deep snapshot of the editor state a command can observe
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextState {
    pub buffer: Vec<String>,
    pub cursor: Cursor,
    pub mode: Mode,
    pub count: usize,
    pub current_pattern: String,
    pub registers: Registers,
}

/// The execution facade: one live instance per engine, handed to exactly
/// one command at a time
#[derive(Debug, Clone)]
pub struct EditorContext {
    buffer: Vec<String>,
    cursor: Cursor,
    mode: Mode,
    count: usize,
    current_pattern: String,
    registers: Registers,
}

impl Default for EditorContext {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorContext {
    pub fn new() -> Self {
        Self {
            buffer: vec![String::new()],
            cursor: Cursor::default(),
            mode: Mode::Normal,
            count: 1,
            current_pattern: String::new(),
            registers: Registers::new(),
        }
    }

    pub fn state(&self) -> ContextState {
        ContextState {
            buffer: self.buffer.clone(),
            cursor: self.cursor,
            mode: self.mode,
            count: self.count,
            current_pattern: self.current_pattern.clone(),
            registers: self.registers.clone(),
        }
    }

    pub fn set_state(&mut self, state: ContextState) {
        self.buffer = state.buffer;
        self.cursor = state.cursor;
        self.mode = state.mode;
        self.count = state.count.max(1);
        self.current_pattern = state.current_pattern;
        self.registers = state.registers;
    }

    pub fn buffer(&self) -> &[String] {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut Vec<String> {
        &mut self.buffer
    }

    pub fn set_buffer(&mut self, lines: Vec<String>) {
        self.buffer = lines;
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }

    /// Move the cursor by a signed delta on each axis
    ///
    /// Both axes saturate at 0. Clamping to buffer extents is the command's
    /// job; the facade does not know what the motion intends.
    pub fn move_cursor(&mut self, d_line: isize, d_col: isize) {
        self.cursor.line = self.cursor.line.saturating_add_signed(d_line);
        self.cursor.col = self.cursor.col.saturating_add_signed(d_col);
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn is_mode(&self, mode: Mode) -> bool {
        self.mode == mode
    }

    pub fn register(&self, name: char) -> Option<&str> {
        self.registers.get(name)
    }

    pub fn set_register(&mut self, name: char, content: impl Into<String>) {
        self.registers.set(name, content);
    }

    pub fn yank_to_register(&mut self, name: char, content: impl Into<String>) {
        self.registers.yank(name, content);
    }

    pub fn clipboard(&self) -> Option<&str> {
        self.registers.get(CLIPBOARD_REGISTER)
    }

    pub fn set_clipboard(&mut self, content: impl Into<String>) {
        self.registers.set(CLIPBOARD_REGISTER, content);
    }

    /// The line under the cursor, or None if the cursor ran past the buffer
    pub fn current_line(&self) -> Option<&str> {
        self.buffer.get(self.cursor.line).map(String::as_str)
    }

    pub fn line_number(&self) -> usize {
        self.cursor.line
    }

    /// The active repeat count; always at least 1
    pub fn count(&self) -> usize {
        self.count
    }

    /// Set the repeat count; 0 is coerced to 1
    pub fn set_count(&mut self, count: usize) {
        self.count = count.max(1);
    }

    /// The literal token buffer that produced the current dispatch
    ///
    /// Lets a command recover a wildcard trailing character, e.g. the
    /// target of "fa" is the last char of the pattern.
    pub fn current_pattern(&self) -> &str {
        &self.current_pattern
    }

    pub fn set_current_pattern(&mut self, pattern: impl Into<String>) {
        self.current_pattern = pattern.into();
    }
}
