/// Default number of consecutive rejected candidates before a generation
/// call gives up.
pub const DEFAULT_MAX_GENERATION_ATTEMPTS: usize = 1000;
/// Default number of ids read from the store per `get_many` round trip in
/// bulk operations.
pub const DEFAULT_REQUEST_BULK_LIMIT: usize = 1000;

/// Tunables for an [`IdentifierAllocator`](crate::IdentifierAllocator).
///
/// # Example
/// ```
/// use sctid::AllocatorConfig;
///
/// let config = AllocatorConfig::default()
///     .with_max_generation_attempts(50)
///     .with_request_bulk_limit(200);
/// assert_eq!(config.max_generation_attempts(), 50);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct AllocatorConfig {
    max_generation_attempts: usize,
    request_bulk_limit: usize,
}

impl AllocatorConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_generation_attempts: DEFAULT_MAX_GENERATION_ATTEMPTS,
            request_bulk_limit: DEFAULT_REQUEST_BULK_LIMIT,
        }
    }

    /// Sets the attempt budget. Clamped to at least one attempt.
    #[must_use]
    pub const fn with_max_generation_attempts(mut self, attempts: usize) -> Self {
        self.max_generation_attempts = if attempts == 0 { 1 } else { attempts };
        self
    }

    /// Sets the bulk read chunk size. Clamped to at least one id.
    #[must_use]
    pub const fn with_request_bulk_limit(mut self, limit: usize) -> Self {
        self.request_bulk_limit = if limit == 0 { 1 } else { limit };
        self
    }

    #[must_use]
    pub const fn max_generation_attempts(&self) -> usize {
        self.max_generation_attempts
    }

    #[must_use]
    pub const fn request_bulk_limit(&self) -> usize {
        self.request_bulk_limit
    }
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self::new()
    }
}
