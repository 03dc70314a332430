//! Remote labeling server collaborator and image fetch cache.
//!
//! The server client itself is external; `RemoteStore` is the seam it plugs
//! into. `ImageCache` runs fetches on background threads and decodes the bytes
//! with the `image` crate so the annotation can learn the image dimensions.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::model::Task;

/// Which tasks a fetch asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FetchType {
    #[default]
    All,
    Unfinished,
    Finished,
}

impl FetchType {
    pub fn from_finished_flag(include_finished: bool) -> Self {
        if include_finished {
            FetchType::All
        } else {
            FetchType::Unfinished
        }
    }
}

/// Remote server holding tasks, annotations and images.
pub trait RemoteStore: Send + Sync {
    /// Annotation JSON for `anno_id`, or `None` if the server has none yet.
    fn fetch_annotation(&self, anno_id: &str) -> Result<Option<String>, StorageError>;

    fn save_annotation(&self, anno_id: &str, json: &str) -> Result<(), StorageError>;

    fn fetch_tasks(&self, num: usize, fetch_type: FetchType) -> Result<Vec<Task>, StorageError>;

    /// Raw encoded image bytes.
    fn fetch_image(&self, name: &str) -> Result<Vec<u8>, StorageError>;
}

// ============================================================================
// Image Cache
// ============================================================================

/// A fetched and decoded image.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub image: Arc<image::DynamicImage>,
}

impl LoadedImage {
    pub fn decode(name: impl Into<String>, bytes: &[u8]) -> Result<Self, StorageError> {
        let image = image::load_from_memory(bytes)?;
        Ok(Self {
            name: name.into(),
            width: image.width(),
            height: image.height(),
            image: Arc::new(image),
        })
    }
}

/// Outcome of `ImageCache::request`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    /// Already decoded; nothing started.
    Cached,
    /// A background fetch was started.
    Started,
    /// A fetch for this name is in flight; nothing started.
    Pending,
}

/// Finished image fetch, as reported by `ImageCache::poll`.
#[derive(Debug)]
pub struct ImageEvent {
    pub name: String,
    pub result: Result<LoadedImage, StorageError>,
}

/// Decoded images keyed by name, with duplicate in-flight fetches suppressed.
pub struct ImageCache {
    store: Arc<dyn RemoteStore>,
    images: HashMap<String, LoadedImage>,
    in_flight: HashSet<String>,
    result_tx: Sender<ImageEvent>,
    result_rx: Receiver<ImageEvent>,
}

impl ImageCache {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        let (result_tx, result_rx) = mpsc::channel();
        Self {
            store,
            images: HashMap::new(),
            in_flight: HashSet::new(),
            result_tx,
            result_rx,
        }
    }

    pub fn get(&self, name: &str) -> Option<&LoadedImage> {
        self.images.get(name)
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.in_flight.contains(name)
    }

    pub fn pending_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Start fetching `name` unless it is cached or already being fetched.
    pub fn request(&mut self, name: &str) -> Result<FetchStatus, StorageError> {
        if self.images.contains_key(name) {
            return Ok(FetchStatus::Cached);
        }
        if self.in_flight.contains(name) {
            log::debug!("Image '{}' already being fetched", name);
            return Ok(FetchStatus::Pending);
        }

        let store = Arc::clone(&self.store);
        let result_tx = self.result_tx.clone();
        let owned = name.to_string();
        thread::Builder::new()
            .name("image-fetch".to_string())
            .spawn(move || {
                let result = store
                    .fetch_image(&owned)
                    .and_then(|bytes| LoadedImage::decode(owned.clone(), &bytes));
                // The cache may be gone already; nothing to report to then.
                let _ = result_tx.send(ImageEvent { name: owned, result });
            })?;

        self.in_flight.insert(name.to_string());
        log::debug!("Started fetch of image '{}'", name);
        Ok(FetchStatus::Started)
    }

    fn finish(&mut self, event: ImageEvent) -> ImageEvent {
        self.in_flight.remove(&event.name);
        match &event.result {
            Ok(image) => {
                log::info!(
                    "Image '{}' loaded ({}x{})",
                    image.name,
                    image.width,
                    image.height
                );
                self.images.insert(event.name.clone(), image.clone());
            }
            Err(e) => log::warn!("Image '{}' failed to load: {}", event.name, e),
        }
        event
    }

    /// Collect finished fetches without blocking.
    pub fn poll(&mut self) -> Vec<ImageEvent> {
        let mut events = Vec::new();
        loop {
            match self.result_rx.try_recv() {
                Ok(event) => events.push(self.finish(event)),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        events
    }

    /// Wait up to `timeout` for one finished fetch.
    pub fn wait(&mut self, timeout: Duration) -> Option<ImageEvent> {
        let event = self.result_rx.recv_timeout(timeout).ok()?;
        Some(self.finish(event))
    }

    /// Drop cached images whose name fails `keep`. Returns how many were dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) -> usize {
        let before = self.images.len();
        self.images.retain(|name, _| keep(name));
        before - self.images.len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory server. `missing.png` always fails to fetch.
    #[derive(Default)]
    pub(crate) struct MemoryStore {
        pub annotations: Mutex<HashMap<String, String>>,
        pub tasks: Vec<Task>,
        pub image_fetches: AtomicUsize,
    }

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = image::DynamicImage::new_rgb8(width, height);
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("encode png");
        bytes
    }

    impl RemoteStore for MemoryStore {
        fn fetch_annotation(&self, anno_id: &str) -> Result<Option<String>, StorageError> {
            Ok(self.annotations.lock().expect("lock").get(anno_id).cloned())
        }

        fn save_annotation(&self, anno_id: &str, json: &str) -> Result<(), StorageError> {
            self.annotations
                .lock()
                .expect("lock")
                .insert(anno_id.to_string(), json.to_string());
            Ok(())
        }

        fn fetch_tasks(&self, num: usize, fetch_type: FetchType) -> Result<Vec<Task>, StorageError> {
            Ok(self
                .tasks
                .iter()
                .filter(|t| match fetch_type {
                    FetchType::All => true,
                    FetchType::Unfinished => !t.finished,
                    FetchType::Finished => t.finished,
                })
                .take(num)
                .cloned()
                .collect())
        }

        fn fetch_image(&self, name: &str) -> Result<Vec<u8>, StorageError> {
            self.image_fetches.fetch_add(1, Ordering::SeqCst);
            if name == "missing.png" {
                return Err(StorageError::remote("no such image"));
            }
            Ok(png_bytes(4, 3))
        }
    }

    #[test]
    fn test_fetch_decodes_dimensions() {
        let store = Arc::new(MemoryStore::default());
        let mut cache = ImageCache::new(store.clone());

        assert_eq!(cache.request("a.png").expect("request"), FetchStatus::Started);
        let event = cache.wait(Duration::from_secs(5)).expect("fetch finished");
        let image = event.result.expect("decoded");
        assert_eq!((image.width, image.height), (4, 3));

        assert_eq!(cache.request("a.png").expect("request"), FetchStatus::Cached);
        assert_eq!(store.image_fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_duplicate_request_while_pending_is_suppressed() {
        let store = Arc::new(MemoryStore::default());
        let mut cache = ImageCache::new(store.clone());

        assert_eq!(cache.request("a.png").expect("request"), FetchStatus::Started);
        // Nothing has been polled yet, so the key is still in flight.
        assert_eq!(cache.request("a.png").expect("request"), FetchStatus::Pending);
        assert!(cache.is_pending("a.png"));

        cache.wait(Duration::from_secs(5)).expect("fetch finished");
        assert!(!cache.is_pending("a.png"));
        assert_eq!(store.image_fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_fetch_is_retryable() {
        let store = Arc::new(MemoryStore::default());
        let mut cache = ImageCache::new(store.clone());

        cache.request("missing.png").expect("request");
        let event = cache.wait(Duration::from_secs(5)).expect("fetch finished");
        assert!(event.result.is_err());
        assert!(cache.get("missing.png").is_none());
        assert_eq!(cache.request("missing.png").expect("request"), FetchStatus::Started);
    }

    #[test]
    fn test_fetch_type_from_flag() {
        assert_eq!(FetchType::from_finished_flag(false), FetchType::Unfinished);
        assert_eq!(FetchType::from_finished_flag(true), FetchType::All);
    }

    #[test]
    fn test_retain_evicts_unwanted_images() {
        let store = Arc::new(MemoryStore::default());
        let mut cache = ImageCache::new(store.clone());
        for name in ["a.png", "b.png"] {
            cache.request(name).expect("request");
            assert!(cache.wait(Duration::from_secs(5)).is_some());
        }
        assert_eq!(cache.len(), 2);

        assert_eq!(cache.retain(|name| name == "b.png"), 1);
        assert!(cache.get("a.png").is_none());
        assert!(cache.get("b.png").is_some());
        assert_eq!(cache.request("a.png").expect("request"), FetchStatus::Started);
    }
}
