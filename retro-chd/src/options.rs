//! Open-time options for a container.

/// Default number of decompressed hunks kept in memory.
pub const DEFAULT_CACHE_HUNKS: usize = 16;

/// Options applied when a container is opened.
///
/// ```
/// use retro_chd::ChdOptions;
///
/// let options = ChdOptions::new().cache_hunks(64).max_self_ref_depth(8);
/// assert_eq!(options.cache_hunks, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChdOptions {
    /// Hunks kept in the decompressed-hunk cache; 0 disables caching.
    pub cache_hunks: usize,
    /// Longest self-reference chain followed before giving up. `None` allows
    /// one step per hunk in the container.
    pub max_self_ref_depth: Option<usize>,
}

impl Default for ChdOptions {
    fn default() -> Self {
        Self {
            cache_hunks: DEFAULT_CACHE_HUNKS,
            max_self_ref_depth: None,
        }
    }
}

impl ChdOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_hunks(mut self, hunks: usize) -> Self {
        self.cache_hunks = hunks;
        self
    }

    pub fn max_self_ref_depth(mut self, depth: usize) -> Self {
        self.max_self_ref_depth = Some(depth);
        self
    }

    /// Effective self-reference bound for a container of `num_hunks` hunks.
    pub(crate) fn self_ref_limit(&self, num_hunks: u32) -> usize {
        self.max_self_ref_depth.unwrap_or(num_hunks as usize)
    }
}
