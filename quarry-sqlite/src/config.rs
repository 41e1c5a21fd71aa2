//! SQLite configuration.

use std::path::{Path, PathBuf};

use crate::error::{SqliteError, SqliteResult};

/// SQLite database configuration.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Database path (or ":memory:" for in-memory).
    pub path: DatabasePath,
    /// Enable foreign keys.
    pub foreign_keys: bool,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: Option<u32>,
    /// Journal mode.
    pub journal_mode: JournalMode,
}

/// Database path configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DatabasePath {
    /// In-memory database.
    #[default]
    Memory,
    /// File-based database.
    File(PathBuf),
}

impl DatabasePath {
    /// Get the path string for SQLite.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Memory => ":memory:",
            Self::File(path) => path.to_str().unwrap_or(":memory:"),
        }
    }

    /// Check if this is an in-memory database.
    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

/// SQLite journal mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JournalMode {
    /// DELETE - Default SQLite mode, deletes journal after transaction.
    Delete,
    /// MEMORY - Keep journal in memory.
    Memory,
    /// WAL - Write-Ahead Logging.
    #[default]
    Wal,
}

impl JournalMode {
    /// Get the SQLite pragma value.
    pub fn as_pragma(&self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Memory => "MEMORY",
            Self::Wal => "WAL",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "delete" => Some(Self::Delete),
            "memory" => Some(Self::Memory),
            "wal" => Some(Self::Wal),
            _ => None,
        }
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: DatabasePath::Memory,
            foreign_keys: true,
            busy_timeout_ms: Some(5000),
            journal_mode: JournalMode::Wal,
        }
    }
}

impl SqliteConfig {
    /// Create a new configuration for an in-memory database.
    pub fn memory() -> Self {
        Self {
            path: DatabasePath::Memory,
            journal_mode: JournalMode::Memory,
            ..Default::default()
        }
    }

    /// Create a new configuration for a file-based database.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            path: DatabasePath::File(path.as_ref().to_path_buf()),
            ..Default::default()
        }
    }

    /// Parse a SQLite URL into configuration.
    ///
    /// Supported formats:
    /// - `sqlite::memory:` - In-memory database
    /// - `sqlite://path/to/db.sqlite` - File-based database
    /// - `sqlite:///absolute/path/db.sqlite` - Absolute path
    /// - `file:path/to/db.sqlite` - Alternative format
    ///
    /// Recognized query options are `foreign_keys`, `busy_timeout` and
    /// `journal_mode`; anything else is ignored.
    pub fn from_url(url: impl AsRef<str>) -> SqliteResult<Self> {
        let url_str = url.as_ref().trim();
        let (location, query) = match url_str.split_once('?') {
            Some((location, query)) => (location, Some(query)),
            None => (url_str, None),
        };

        let mut config = if location == "sqlite::memory:" || location == ":memory:" {
            Self::memory()
        } else if let Some(path) = location.strip_prefix("sqlite://") {
            if path.is_empty() {
                return Err(SqliteError::config("database path is required"));
            }
            Self::file(path)
        } else if let Some(path) = location.strip_prefix("sqlite:") {
            if path == ":memory:" {
                Self::memory()
            } else if path.is_empty() {
                return Err(SqliteError::config("database path is required"));
            } else {
                Self::file(path)
            }
        } else if let Some(path) = location.strip_prefix("file:") {
            Self::file(path)
        } else if location.is_empty() {
            return Err(SqliteError::config("database URL is empty"));
        } else {
            Self::file(location)
        };

        for pair in query.into_iter().flat_map(|q| q.split('&')) {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            match key {
                "mode" if value == "memory" => {
                    config.path = DatabasePath::Memory;
                    config.journal_mode = JournalMode::Memory;
                }
                "foreign_keys" => {
                    config.foreign_keys = value == "true" || value == "1" || value == "on";
                }
                "busy_timeout" => {
                    let ms = value.parse().map_err(|_| {
                        SqliteError::config(format!("invalid busy_timeout '{}'", value))
                    })?;
                    config.busy_timeout_ms = Some(ms);
                }
                "journal_mode" => {
                    config.journal_mode = JournalMode::parse(value).ok_or_else(|| {
                        SqliteError::config(format!("unsupported journal_mode '{}'", value))
                    })?;
                }
                _ => {}
            }
        }

        Ok(config)
    }

    /// Get the path string for SQLite.
    pub fn path_str(&self) -> &str {
        self.path.as_str()
    }

    /// Generate the initialization SQL for this configuration.
    pub fn init_sql(&self) -> String {
        let mut sql = String::new();

        if self.foreign_keys {
            sql.push_str("PRAGMA foreign_keys = ON;\n");
        }

        sql.push_str(&format!(
            "PRAGMA journal_mode = {};\n",
            self.journal_mode.as_pragma()
        ));

        if let Some(timeout) = self.busy_timeout_ms {
            sql.push_str(&format!("PRAGMA busy_timeout = {};\n", timeout));
        }

        sql
    }

    /// Enable or disable foreign keys.
    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// Set the busy timeout in milliseconds.
    pub fn busy_timeout(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = Some(ms);
        self
    }

    /// Set the journal mode.
    pub fn journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = mode;
        self
    }
}
