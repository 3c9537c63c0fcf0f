use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use url::Url;

use crate::analysis::{stemmer, tokenizer};
use crate::core::error::Result;
use crate::crawl::fetcher::PageFetcher;
use crate::crawl::html;
use crate::index::concurrent::SharedIndex;
use crate::index::inverted::InvertedIndex;
use crate::parallel::queue::WorkQueue;

/// Bounded breadth-first web crawler feeding the shared index.
///
/// `visited` dedupes URIs at enqueue time and `crawled` bounds admitted
/// pages; both respect the same `total` budget but sit behind separate
/// mutexes so link discovery never stalls page admission. Under
/// contention the fetch count may overshoot by at most one page per
/// extra worker.
pub struct WebCrawler {
    index: Arc<SharedIndex>,
    queue: Arc<WorkQueue>,
    fetcher: PageFetcher,
    visited: Mutex<HashSet<String>>,
    crawled: Mutex<usize>,
    total: usize,
}

impl WebCrawler {
    pub fn new(
        index: Arc<SharedIndex>,
        queue: Arc<WorkQueue>,
        fetcher: PageFetcher,
        total: usize,
    ) -> Arc<Self> {
        Arc::new(WebCrawler {
            index,
            queue,
            fetcher,
            visited: Mutex::new(HashSet::new()),
            crawled: Mutex::new(0),
            total: total.max(1),
        })
    }

    /// Seeds the crawl. Invalid URIs are an error; a seed already seen is
    /// silently ignored. Pair with `queue.finish()` to wait for the full
    /// transitive fan-out.
    pub fn crawl(self: &Arc<Self>, seed: &str) -> Result<()> {
        let mut url = Url::parse(seed)?;
        url.set_fragment(None);
        let normalized = url.to_string();

        let fresh = self.visited.lock().insert(normalized.clone());
        if fresh {
            self.submit(url, normalized);
        }
        Ok(())
    }

    /// Pages admitted so far.
    pub fn num_crawled(&self) -> usize {
        *self.crawled.lock()
    }

    /// Distinct URIs seen so far (admitted or enqueued).
    pub fn num_visited(&self) -> usize {
        self.visited.lock().len()
    }

    fn submit(self: &Arc<Self>, url: Url, original: String) {
        let crawler = Arc::clone(self);
        self.queue.execute(move || crawler.visit(url, original));
    }

    fn visit(self: &Arc<Self>, url: Url, original: String) {
        {
            let mut crawled = self.crawled.lock();
            if *crawled >= self.total {
                return;
            }
            *crawled += 1;
        }

        let body = match self.fetcher.fetch(&url) {
            Some(body) => body,
            None => return,
        };

        self.index_page(&body, &original);
        debug!("indexed {}", original);

        let links = html::extract_links(&url, &body);
        let mut fresh = Vec::new();
        {
            let mut visited = self.visited.lock();
            for mut link in links {
                if visited.len() >= self.total {
                    break;
                }
                link.set_fragment(None);
                let normalized = link.to_string();
                if visited.insert(normalized.clone()) {
                    fresh.push((link, normalized));
                }
            }
        }
        // Submission happens outside the visited lock.
        for (link, normalized) in fresh {
            self.submit(link, normalized);
        }
    }

    /// Tokenizes the page into a local index under `original` as the
    /// location and publishes it with one merge.
    fn index_page(&self, body: &str, original: &str) {
        let text = html::extract_text(body);
        let stemmer = stemmer::english_stemmer();

        let mut local = InvertedIndex::new();
        let mut position = 1u32;
        for word in tokenizer::parse(&text) {
            let stem = stemmer::stem(&word, &stemmer);
            if !stem.is_empty() {
                local.add(&stem, original, position);
                position += 1;
            }
        }
        self.index.merge(local);
    }
}
