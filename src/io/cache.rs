//! Live decoder readers keyed by clip, with deferred teardown.
//!
//! A reader moves Active -> Stopping -> Reaped. Eviction calls [`MediaReader::stop`] and
//! parks the reader on the stopping list; it is released only once it reports
//! [`MediaReader::has_stopped`], so its own threads never get torn down mid-job.

use std::{collections::HashMap, path::Path, sync::Arc};

use crate::{
    composition::model::{ClipId, Composition},
    eval::walker::Walker,
    foundation::time::TimeRange,
    io::{
        reader::{Info, IoOptions, MediaReader},
        system::IoSystem,
    },
};

/// An opened reader and the metadata read when it was opened.
pub struct ReaderEntry {
    /// The open reader.
    pub reader: Arc<dyn MediaReader>,
    /// Metadata read at open time.
    pub info: Info,
}

/// Reader pool owned by one scheduler thread.
#[derive(Default)]
pub struct ReaderCache {
    readers: HashMap<ClipId, ReaderEntry>,
    stopping: Vec<Arc<dyn MediaReader>>,
}

impl ReaderCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Live entry for `clip`, without opening anything.
    pub fn get(&self, clip: ClipId) -> Option<&ReaderEntry> {
        self.readers.get(&clip)
    }

    /// Live entry for `clip`, opening a reader on first use.
    ///
    /// Blocks on the new reader's metadata. `None` when there is no media path, the open
    /// fails, or the media has no video; nothing is cached then, so the next request retries.
    pub fn acquire(
        &mut self,
        clip: ClipId,
        path: Option<&Path>,
        options: &IoOptions,
        io: &IoSystem,
    ) -> Option<&ReaderEntry> {
        if !self.readers.contains_key(&clip) {
            let entry = self.open(clip, path?, options, io)?;
            self.readers.insert(clip, entry);
        }
        self.get(clip)
    }

    fn open(
        &mut self,
        clip: ClipId,
        path: &Path,
        options: &IoOptions,
        io: &IoSystem,
    ) -> Option<ReaderEntry> {
        let reader = match io.read(path, options) {
            Ok(reader) => reader,
            Err(e) => {
                tracing::warn!(%clip, path = %path.display(), error = %e, "open reader failed");
                return None;
            }
        };
        let info = reader.info().wait();
        match info {
            Some(info) if info.has_video() => {
                tracing::debug!(%clip, path = %path.display(), "read");
                Some(ReaderEntry { reader, info })
            }
            _ => {
                tracing::debug!(%clip, path = %path.display(), "reader has no video");
                reader.stop();
                self.stopping.push(reader);
                None
            }
        }
    }

    /// Stop readers whose clip is outside every active range and that have no queued work.
    ///
    /// Returns how many readers were moved to the stopping list.
    pub fn sweep(&mut self, active: &[TimeRange], comp: &Composition) -> usize {
        let idle: Vec<ClipId> = self
            .readers
            .iter()
            .filter(|(clip, entry)| {
                let in_use = Walker::effective_range(comp, **clip)
                    .is_some_and(|range| active.iter().any(|a| range.intersects(*a)));
                !in_use && !entry.reader.has_video_frames()
            })
            .map(|(clip, _)| *clip)
            .collect();

        for clip in &idle {
            if let Some(entry) = self.readers.remove(clip) {
                tracing::debug!(%clip, path = %entry.reader.path().display(), "stop");
                entry.reader.stop();
                self.stopping.push(entry.reader);
            }
        }
        idle.len()
    }

    /// Release stopping readers that finished. Returns how many were released.
    pub fn reap(&mut self) -> usize {
        let before = self.stopping.len();
        self.stopping.retain(|reader| {
            if reader.has_stopped() {
                tracing::debug!(path = %reader.path().display(), "delete");
                false
            } else {
                true
            }
        });
        before - self.stopping.len()
    }

    /// Ask every live reader to drop its queued video reads.
    pub fn cancel_all(&self) {
        for entry in self.readers.values() {
            entry.reader.cancel_video_frames();
        }
    }

    /// Stop and release everything.
    pub fn shutdown(&mut self) {
        for (clip, entry) in self.readers.drain() {
            tracing::debug!(%clip, path = %entry.reader.path().display(), "stop");
            entry.reader.stop();
            self.stopping.push(entry.reader);
        }
        let pending = self.stopping.iter().filter(|r| !r.has_stopped()).count();
        if pending > 0 {
            tracing::debug!(pending, "releasing readers that are still stopping");
        }
        self.stopping.clear();
    }

    /// Live readers.
    pub fn len(&self) -> usize {
        self.readers.len()
    }

    /// `true` when no reader is live.
    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }

    /// Readers stopped but not yet released.
    pub fn stopping_len(&self) -> usize {
        self.stopping.len()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/io/cache.rs"]
mod tests;
