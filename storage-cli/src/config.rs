use std::path::PathBuf;

use anyhow::Result;
use serde_derive::{Deserialize, Serialize};

pub const DEFAULT_PROMPT: &str = "storage";

/// Persisted CLI settings, loaded from a YAML/TOML file at `config`
/// (anything `confy` understands) and falling back to [`Default`] when the
/// file is absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigLoad {
    version: u8,

    /// REPL prompt, shown before every line read from the terminal.
    pub prompt: Option<String>,

    /// Print the elapsed time after a one-shot (non-REPL) run.
    pub show_stats: Option<bool>,

    /// Split multi-line pasted input into one command per line rather than
    /// joining it into a single query.
    pub multi_line: Option<bool>,
}

impl Default for ConfigLoad {
    fn default() -> Self {
        ConfigLoad {
            version: 0,
            prompt: Some(DEFAULT_PROMPT.to_string()),
            show_stats: Some(false),
            multi_line: Some(true),
        }
    }
}

impl ConfigLoad {
    /// Loads settings from `path`, falling back to [`Default::default`]
    /// if the file doesn't exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self::default());
        }
        Ok(confy::load_path(path)?)
    }

    pub fn terminal_update(&mut self) {
        self.show_stats = Some(true);
    }
}
