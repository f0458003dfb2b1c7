/// Pagination settings for registry listings.
///
/// Callers that omit a limit get [`default_page_size`](Self::default_page_size);
/// larger requested limits are clamped to [`max_page_size`](Self::max_page_size).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl RegistryConfig {
    /// Page size used when the caller does not ask for one.
    pub const DEFAULT_PAGE_SIZE: usize = 10;

    /// Upper bound on any requested page size.
    pub const MAX_PAGE_SIZE: usize = 100;

    pub fn new(default_page_size: usize, max_page_size: usize) -> Self {
        Self {
            default_page_size: default_page_size.min(max_page_size),
            max_page_size,
        }
    }

    /// Resolve a caller-supplied limit against the defaults.
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_page_size)
            .min(self.max_page_size)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PAGE_SIZE, Self::MAX_PAGE_SIZE)
    }
}
