//! Store configuration.

/// Name of the write-ahead log file inside the store directory.
pub const LOG_FILE: &str = "rvm.log";

/// Name of the advisory lock file inside the store directory.
pub const LOCK_FILE: &str = "LOCK";

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the store directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Maximum length in bytes of the store directory path, measured after
    /// making it absolute and resolving its parent.
    ///
    /// Segment file paths are built by joining this prefix with a segment
    /// name, so the prefix is bounded up front.
    pub max_prefix_len: usize,

    /// Maximum length in bytes of a segment name.
    pub max_segment_name_len: usize,

    /// Whether to fsync the log on every commit (safer but slower).
    pub sync_on_commit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            max_prefix_len: 128,
            max_segment_name_len: 128,
            sync_on_commit: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the store directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets the maximum store path length.
    #[must_use]
    pub const fn max_prefix_len(mut self, len: usize) -> Self {
        self.max_prefix_len = len;
        self
    }

    /// Sets the maximum segment name length.
    #[must_use]
    pub const fn max_segment_name_len(mut self, len: usize) -> Self {
        self.max_segment_name_len = len;
        self
    }

    /// Sets whether to sync the log on every commit.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }
}
