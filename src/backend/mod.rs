//! Backend renderers: turn a [`ClassPlan`] into target-language source text.
//!
//! Renderers are pure. They read the plan and the backend's configuration block
//! and never touch the registry, so every (class, backend) pair renders independently.

use crate::ast::BackendConfig;
use crate::contract::{ClassPlan, GenError};
use std::path::PathBuf;

pub mod java;
pub mod rust;

pub use java::JavaBackend;
pub use rust::RustBackend;

/// One target language.
pub trait Backend: Send + Sync {
    /// Lower-case name; also the schema's configuration block name.
    fn name(&self) -> &'static str;

    /// Output path of `class`, relative to the backend's output directory.
    fn file_path(&self, class: &str, config: &BackendConfig) -> PathBuf;

    fn render(&self, plan: &ClassPlan, config: &BackendConfig) -> Result<String, GenError>;

    /// Optional extra unit listing every generated class (module index and the like).
    fn index(&self, _classes: &[&str], _config: &BackendConfig) -> Option<(PathBuf, String)> {
        None
    }
}

/// Backend by configuration-block name.
pub fn backend_by_name(name: &str) -> Option<Box<dyn Backend>> {
    match name.to_ascii_lowercase().as_str() {
        "rust" => Some(Box::new(RustBackend)),
        "java" => Some(Box::new(JavaBackend)),
        _ => None,
    }
}

/// Indenting line buffer shared by renderers.
#[derive(Debug)]
pub struct CodeWriter {
    buf: String,
    level: usize,
    unit: &'static str,
}

impl CodeWriter {
    pub fn new(unit: &'static str) -> Self {
        CodeWriter {
            buf: String::new(),
            level: 0,
            unit,
        }
    }

    /// One line at the current indentation. Empty text writes a bare newline.
    pub fn line(&mut self, text: impl AsRef<str>) -> &mut Self {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.level {
                self.buf.push_str(self.unit);
            }
            self.buf.push_str(text);
        }
        self.buf.push('\n');
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.line("")
    }

    /// Write `text` and indent what follows.
    pub fn open(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.line(text);
        self.level += 1;
        self
    }

    /// Dedent and write `text`.
    pub fn close(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.level = self.level.saturating_sub(1);
        self.line(text)
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

/// `EntityStatePdu` -> `entity_state_pdu`; acronyms stay together (`sessionID` -> `session_id`).
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut snake = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                let next_lower = chars.get(i + 1).map(|n| n.is_lowercase()).unwrap_or(false);
                if (!prev.is_uppercase() && prev != '_') || (prev.is_uppercase() && next_lower) {
                    snake.push('_');
                }
            }
            snake.extend(c.to_lowercase());
        } else if c == '-' || c == ' ' {
            snake.push('_');
        } else {
            snake.push(c);
        }
    }
    snake
}

/// `entity_state` -> `EntityState`; `entityState` -> `EntityState`.
pub fn to_pascal_case(s: &str) -> String {
    s.split(|c: char| c == '_' || c == '-' || c == ' ')
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect()
}

/// Upper-case the first character only.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}
