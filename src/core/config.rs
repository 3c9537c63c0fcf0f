#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Worker threads in the shared pool
    pub threads: usize,
    /// Maximum number of pages the crawler admits
    pub crawl_limit: usize,
    /// Redirects followed per fetch before giving up
    pub redirects: usize,
    /// Socket timeout for page fetches, in seconds
    pub fetch_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            threads: 5,
            crawl_limit: 1,
            redirects: 3,
            fetch_timeout_secs: 3,
        }
    }
}
