//! Descriptor table configuration.

use crate::DEFAULT_MAX_FDS;

/// Descriptor table settings.
#[derive(Debug, Clone, Copy)]
pub struct TableConfig {
    /// Highest number of descriptors the table will hand out.
    pub max_fds: usize,
}

impl TableConfig {
    /// Default settings.
    pub fn new() -> Self {
        Self {
            max_fds: DEFAULT_MAX_FDS,
        }
    }

    /// Sets the descriptor limit, capped at `u32::MAX` numbers.
    pub fn with_max_fds(mut self, max_fds: usize) -> Self {
        self.max_fds = max_fds.min(u32::MAX as usize);
        self
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self::new()
    }
}
