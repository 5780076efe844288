//! Debounced aggregation of multi-photo albums
//!
//! Telegram delivers each photo of an album as its own update sharing a
//! `media_group_id`, with no "album complete" signal. Photos are buffered
//! per album id; a quiet period after the last arrival finalizes the
//! batch and delivers it exactly once. Single (non-album) photos bypass
//! the buffer entirely.

use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

struct AlbumBuffer {
    file_ids: Vec<String>,
    /// Pending finalize timer; aborted and re-armed on every arrival
    timer: Option<JoinHandle<()>>,
}

/// Owns the per-album buffers and the debounce scheduling.
pub struct MediaGroupAggregator {
    entries: Arc<DashMap<String, AlbumBuffer>>,
    debounce: Duration,
}

impl MediaGroupAggregator {
    pub fn new(debounce: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            debounce,
        }
    }

    /// Buffers one album photo and (re)arms the finalize timer.
    ///
    /// When the album goes quiet for the debounce window, the buffer is
    /// removed, deduplicated preserving first-seen order, and handed to
    /// `finalize` exactly once.
    pub fn push<F, Fut>(&self, album_id: String, file_id: String, finalize: F)
    where
        F: FnOnce(Vec<String>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut entry = self.entries.entry(album_id.clone()).or_insert_with(|| AlbumBuffer {
            file_ids: Vec::new(),
            timer: None,
        });
        entry.file_ids.push(file_id);

        if let Some(timer) = entry.timer.take() {
            timer.abort();
        }

        let entries = Arc::clone(&self.entries);
        let debounce = self.debounce;
        entry.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let Some((_, buffer)) = entries.remove(&album_id) else {
                return;
            };
            let batch = dedup_preserving_order(buffer.file_ids);
            log::debug!("Finalizing media group {} with {} photo(s)", album_id, batch.len());
            finalize(batch).await;
        }));
    }

    /// Number of albums currently buffering (used by tests).
    pub fn pending_albums(&self) -> usize {
        self.entries.len()
    }
}

/// Removes duplicate references, keeping the first occurrence of each in
/// its original position.
pub fn dedup_preserving_order(file_ids: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(file_ids.len());
    for id in file_ids {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_dedup_preserves_first_seen_order() {
        assert_eq!(dedup_preserving_order(ids(&["A", "B", "A"])), ids(&["A", "B"]));
        assert_eq!(dedup_preserving_order(ids(&["A", "A", "A"])), ids(&["A"]));
        assert_eq!(dedup_preserving_order(ids(&["C", "B", "A"])), ids(&["C", "B", "A"]));
        assert_eq!(dedup_preserving_order(Vec::new()), Vec::<String>::new());
    }

    #[tokio::test(start_paused = true)]
    async fn test_album_delivered_once_after_quiet_period() {
        let aggregator = MediaGroupAggregator::new(Duration::from_millis(600));
        let batches: Arc<Mutex<Vec<Vec<String>>>> = Arc::new(Mutex::new(Vec::new()));

        for file_id in ["photo1", "photo2", "photo1"] {
            let batches = Arc::clone(&batches);
            aggregator.push("album-1".to_string(), file_id.to_string(), move |batch| async move {
                batches.lock().unwrap().push(batch);
            });
            // Arrivals well inside the debounce window
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        // Nothing fires while photos keep arriving
        assert_eq!(batches.lock().unwrap().len(), 0);
        assert_eq!(aggregator.pending_albums(), 1);

        tokio::time::sleep(Duration::from_millis(700)).await;

        let delivered = batches.lock().unwrap();
        assert_eq!(delivered.len(), 1, "batch must be delivered exactly once");
        assert_eq!(delivered[0], ids(&["photo1", "photo2"]));
        assert_eq!(aggregator.pending_albums(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_arrival_resets_the_timer() {
        let aggregator = MediaGroupAggregator::new(Duration::from_millis(600));
        let batches: Arc<Mutex<Vec<Vec<String>>>> = Arc::new(Mutex::new(Vec::new()));

        // Spread arrivals 400ms apart: each is inside the window measured
        // from the previous one, so the album only fires after the last.
        for (i, file_id) in ["a", "b", "c"].iter().enumerate() {
            let batches = Arc::clone(&batches);
            aggregator.push("album-2".to_string(), file_id.to_string(), move |batch| async move {
                batches.lock().unwrap().push(batch);
            });
            if i < 2 {
                tokio::time::sleep(Duration::from_millis(400)).await;
                assert_eq!(batches.lock().unwrap().len(), 0, "timer should have been reset");
            }
        }

        tokio::time::sleep(Duration::from_millis(700)).await;
        let delivered = batches.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0], ids(&["a", "b", "c"]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_distinct_albums_do_not_mix() {
        let aggregator = MediaGroupAggregator::new(Duration::from_millis(600));
        let batches: Arc<Mutex<Vec<Vec<String>>>> = Arc::new(Mutex::new(Vec::new()));

        for (album, file_id) in [("x", "x1"), ("y", "y1"), ("x", "x2")] {
            let batches = Arc::clone(&batches);
            aggregator.push(album.to_string(), file_id.to_string(), move |batch| async move {
                batches.lock().unwrap().push(batch);
            });
        }

        tokio::time::sleep(Duration::from_millis(700)).await;

        let mut delivered = batches.lock().unwrap().clone();
        delivered.sort();
        assert_eq!(delivered, vec![ids(&["x1", "x2"]), ids(&["y1"])]);
    }
}
