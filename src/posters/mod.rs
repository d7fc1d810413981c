//! Poster worker queue for async fetch and decode.
//!
//! - Bounded worker pool fetching `thumbnailUrl` targets (HTTP or local)
//! - Requests prioritized by distance from the active slide
//! - Decoded RGBA results drained on the main thread
//! - Bounded in-memory LRU of decoded posters

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use flume::{Receiver, Sender};
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

/// Maximum number of worker threads.
const MAX_WORKERS: usize = 4;

/// Maximum number of queued requests.
const MAX_QUEUE_SIZE: usize = 64;

/// HTTP fetch timeout per poster.
const FETCH_TIMEOUT_SECS: u64 = 10;

/// A request to fetch and decode one item's poster.
#[derive(Debug, Clone)]
pub struct PosterRequest {
    /// Item id the poster belongs to.
    pub id: String,
    /// Poster URL (http(s), file://, or a plain path).
    pub url: String,
    /// Lower is fetched sooner; callers use distance from the active slide.
    pub priority: u32,
}

/// Decoded poster pixels, cheap to clone.
#[derive(Debug, Clone)]
pub struct PosterPixels {
    pub width: u32,
    pub height: u32,
    pub rgba: Arc<Vec<u8>>,
}

/// Result of one poster request, drained on the main thread.
#[derive(Debug, Clone)]
pub struct PosterResult {
    pub id: String,
    pub pixels: Option<PosterPixels>,
    pub error: Option<String>,
}

/// Worker queue for poster fetch/decode.
pub struct PosterQueue {
    request_tx: Sender<PosterRequest>,
    result_rx: Receiver<PosterResult>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    /// Ids currently in flight, to avoid duplicate fetches.
    pending: Arc<RwLock<HashSet<String>>>,
    cache: Arc<Mutex<LruCache<String, PosterPixels>>>,
}

impl PosterQueue {
    pub fn new(workers: usize, cache_capacity: usize) -> Self {
        let num_workers = workers.clamp(1, MAX_WORKERS);
        let capacity =
            NonZeroUsize::new(cache_capacity.max(1)).expect("capacity is at least one");

        let (request_tx, request_rx) = flume::bounded(MAX_QUEUE_SIZE);
        let (result_tx, result_rx) = flume::unbounded();

        let shutdown = Arc::new(AtomicBool::new(false));
        let pending = Arc::new(RwLock::new(HashSet::new()));

        let mut worker_handles = Vec::with_capacity(num_workers);
        for worker_id in 0..num_workers {
            let rx = request_rx.clone();
            let tx = result_tx.clone();
            let shutdown = Arc::clone(&shutdown);
            let pending = Arc::clone(&pending);

            let handle = thread::Builder::new()
                .name(format!("poster-worker-{}", worker_id))
                .spawn(move || {
                    worker_loop(worker_id, rx, tx, shutdown, pending);
                })
                .expect("Failed to spawn poster worker");
            worker_handles.push(handle);
        }

        debug!(num_workers, "Started poster worker queue");

        Self {
            request_tx,
            result_rx,
            workers: worker_handles,
            shutdown,
            pending,
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    /// Look up an already-decoded poster.
    pub fn cached(&self, id: &str) -> Option<PosterPixels> {
        self.cache.lock().get(id).cloned()
    }

    /// Submit one request. Returns false if it is already cached, already
    /// in flight, or the queue is full.
    pub fn request(&self, req: PosterRequest) -> bool {
        if self.cache.lock().contains(&req.id) {
            trace!(id = %req.id, "Poster already cached");
            return false;
        }
        {
            let pending = self.pending.read();
            if pending.contains(&req.id) {
                trace!(id = %req.id, "Poster request already pending");
                return false;
            }
        }
        self.pending.write().insert(req.id.clone());

        match self.request_tx.try_send(req) {
            Ok(_) => true,
            Err(flume::TrySendError::Full(req)) => {
                warn!("Poster queue full, dropping request");
                self.pending.write().remove(&req.id);
                false
            }
            Err(flume::TrySendError::Disconnected(_)) => {
                warn!("Poster queue disconnected");
                false
            }
        }
    }

    /// Submit a batch, nearest-to-active first.
    pub fn request_batch(&self, mut requests: Vec<PosterRequest>) -> usize {
        requests.sort_by_key(|r| r.priority);
        let mut submitted = 0;
        for req in requests {
            if self.request(req) {
                submitted += 1;
            }
        }
        submitted
    }

    /// Drain completed posters (non-blocking) and feed the cache.
    pub fn poll_results(&self) -> Vec<PosterResult> {
        let mut results = Vec::new();
        while let Ok(result) = self.result_rx.try_recv() {
            if let Some(ref pixels) = result.pixels {
                self.cache.lock().put(result.id.clone(), pixels.clone());
            }
            results.push(result);
        }
        results
    }

    pub fn pending_count(&self) -> usize {
        self.pending.read().len()
    }

    pub fn shutdown(&mut self) {
        debug!("Shutting down poster queue");
        self.shutdown.store(true, Ordering::SeqCst);
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for PosterQueue {
    fn drop(&mut self) {
        if !self.shutdown.load(Ordering::Relaxed) {
            self.shutdown();
        }
    }
}

fn worker_loop(
    worker_id: usize,
    rx: Receiver<PosterRequest>,
    tx: Sender<PosterResult>,
    shutdown: Arc<AtomicBool>,
    pending: Arc<RwLock<HashSet<String>>>,
) {
    debug!(worker_id, "Poster worker started");

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .build()
        .ok();

    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(req) => {
                let result = process_request(&req, client.as_ref());
                pending.write().remove(&req.id);
                if tx.send(result).is_err() {
                    break;
                }
            }
            Err(flume::RecvTimeoutError::Timeout) => continue,
            Err(flume::RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!(worker_id, "Poster worker stopped");
}

fn process_request(
    req: &PosterRequest,
    client: Option<&reqwest::blocking::Client>,
) -> PosterResult {
    trace!(id = %req.id, url = %req.url, "Fetching poster");

    match fetch_and_decode(&req.url, client) {
        Ok(pixels) => PosterResult {
            id: req.id.clone(),
            pixels: Some(pixels),
            error: None,
        },
        Err(err) => {
            warn!(id = %req.id, error = ?err, "Failed to load poster");
            PosterResult {
                id: req.id.clone(),
                pixels: None,
                error: Some(err.to_string()),
            }
        }
    }
}

fn fetch_and_decode(
    url: &str,
    client: Option<&reqwest::blocking::Client>,
) -> anyhow::Result<PosterPixels> {
    let bytes = fetch_bytes(url, client)?;
    let decoded = image::load_from_memory(&bytes)?.to_rgba8();
    let (width, height) = decoded.dimensions();
    Ok(PosterPixels {
        width,
        height,
        rgba: Arc::new(decoded.into_raw()),
    })
}

fn fetch_bytes(url: &str, client: Option<&reqwest::blocking::Client>) -> anyhow::Result<Vec<u8>> {
    if url.starts_with("http://") || url.starts_with("https://") {
        let client = client.ok_or_else(|| anyhow::anyhow!("HTTP client unavailable"))?;
        let response = client.get(url).send()?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    } else {
        let path = url.strip_prefix("file://").unwrap_or(url);
        Ok(std::fs::read(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn png_fixture(dir: &std::path::Path) -> std::path::PathBuf {
        let path = dir.join("poster.png");
        let pixel = image::RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 255]));
        pixel.save(&path).unwrap();
        path
    }

    #[test]
    fn test_local_poster_roundtrip() {
        let dir = tempdir().unwrap();
        let path = png_fixture(dir.path());

        let queue = PosterQueue::new(1, 8);
        assert!(queue.request(PosterRequest {
            id: "v0".into(),
            url: path.to_string_lossy().into_owned(),
            priority: 0,
        }));

        let mut results = Vec::new();
        for _ in 0..100 {
            results.extend(queue.poll_results());
            if !results.is_empty() {
                break;
            }
            std::thread::sleep(Duration::from_millis(20));
        }

        assert_eq!(results.len(), 1);
        let pixels = results[0].pixels.as_ref().expect("decoded poster");
        assert_eq!((pixels.width, pixels.height), (2, 2));
        assert_eq!(pixels.rgba.len(), 16);
        // Now served from cache; a repeat request is refused.
        assert!(queue.cached("v0").is_some());
        assert!(!queue.request(PosterRequest {
            id: "v0".into(),
            url: path.to_string_lossy().into_owned(),
            priority: 0,
        }));
    }

    #[test]
    fn test_missing_file_reports_error() {
        let queue = PosterQueue::new(1, 8);
        queue.request(PosterRequest {
            id: "gone".into(),
            url: "/nonexistent/poster.png".into(),
            priority: 0,
        });

        let mut results = Vec::new();
        for _ in 0..100 {
            results.extend(queue.poll_results());
            if !results.is_empty() {
                break;
            }
            std::thread::sleep(Duration::from_millis(20));
        }

        assert_eq!(results.len(), 1);
        assert!(results[0].pixels.is_none());
        assert!(results[0].error.is_some());
    }

    #[test]
    fn test_batch_orders_by_priority() {
        let queue = PosterQueue::new(1, 8);
        // Both refused: urls do not exist, but ordering/pending bookkeeping
        // is what is under test.
        let submitted = queue.request_batch(vec![
            PosterRequest {
                id: "far".into(),
                url: "/nope/far.png".into(),
                priority: 3,
            },
            PosterRequest {
                id: "near".into(),
                url: "/nope/near.png".into(),
                priority: 0,
            },
        ]);
        assert_eq!(submitted, 2);
    }
}
