//! Href registry: stable IDs for linked documents and the queue of
//! documents still to be generated.
//!
//! Every link emitted while rendering passes through [`HrefRegistry::link`].
//! The first link to a document assigns its ID and queues it, so the set of
//! generated pages is exactly the set of reachable pages.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::Error;
use crate::page::{GenPageInfo, PagePathInfo, ResourceType};
use crate::relative::relative_path;
use crate::version::fallback_file_paths;

/// Which optional document types may be linked in this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageFeatures {
    /// Method implementation listings.
    pub implementation_pages: bool,
    /// Symbol usage listings.
    pub reference_pages: bool,
}

impl PageFeatures {
    /// Whether documents of this type may be linked.
    pub const fn allows(self, res_type: ResourceType) -> bool {
        return match res_type {
            ResourceType::Implementation => self.implementation_pages,
            ResourceType::Reference => self.reference_pages,
            _ => true,
        };
    }
}

/// State guarded by the registry mutex. Only the caller whose ID
/// assignment was new enqueues, so a document is queued exactly once.
#[derive(Debug, Default)]
struct RegistryState {
    /// Resource type to (resource path to sequential ID).
    ids: HashMap<ResourceType, HashMap<String, usize>>,
    /// Discovered documents not yet handed to the pipeline, oldest first.
    pending: VecDeque<GenPageInfo>,
}

/// Process-scoped registry of linked documents for one generation run.
#[derive(Debug)]
pub struct HrefRegistry {
    /// Optional document types enabled for this run.
    features: PageFeatures,
    /// IDs and pending queue.
    state: Mutex<RegistryState>,
    /// Version token embedded in versioned asset names.
    version: String,
}

impl HrefRegistry {
    /// An empty registry.
    pub fn new(features: PageFeatures, version: impl Into<String>) -> Self {
        return Self {
            features,
            state: Mutex::new(RegistryState::default()),
            version: version.into(),
        };
    }

    /// Remove and return the oldest pending document. `None` means the queue is drained.
    pub fn dequeue_next(&self) -> Option<GenPageInfo> {
        return self.lock().pending.pop_front();
    }

    /// Optional document types enabled for this run.
    pub const fn features(&self) -> PageFeatures {
        return self.features;
    }

    /// Look up or assign the next sequential ID of a document within its
    /// type. The flag is `true` for exactly one caller per document: the one
    /// whose call assigned the ID.
    pub fn href_id(&self, page: &PagePathInfo) -> (usize, bool) {
        let mut state = self.lock();
        let hrefs = state.ids.entry(page.res_type).or_default();
        if let Some(id) = hrefs.get(&page.res_path) {
            return (*id, false);
        }
        let id = hrefs.len();
        hrefs.insert(page.res_path.clone(), id);
        return (id, true);
    }

    /// Relative href from `current` to `target`, with the fragments appended
    /// after a `#`. Queues `target`, and its previous-version copies, the
    /// first time it is linked.
    ///
    /// # Errors
    ///
    /// Returns `Error::DisabledPageType` if `target`'s type is switched off
    /// for this run, or `Error::InvalidPagePath` if either document lies
    /// outside the page path model's domain.
    pub fn link(
        &self,
        current: &PagePathInfo,
        target: &PagePathInfo,
        fragments: &[&str],
    ) -> Result<String, Error> {
        if !self.features.allows(target.res_type) {
            return Err(Error::DisabledPageType {
                path: target.res_path.clone(),
                res_type: target.res_type.as_str(),
            });
        }
        current.validate()?;
        target.validate()?;

        let current_file = current.file_path();
        let target_file = target.file_path();

        let (_, is_new) = self.href_id(target);
        if is_new {
            self.enqueue(&mut self.lock(), target, &target_file);
        }

        let mut href = relative_path(&current_file, &target_file);
        if !fragments.is_empty() {
            href.push('#');
            href.push_str(&fragments.concat());
        }
        return Ok(href);
    }

    /// Number of documents still queued.
    pub fn pending_len(&self) -> usize {
        return self.lock().pending.len();
    }

    /// Number of distinct documents linked so far.
    pub fn registered(&self) -> usize {
        return self.lock().ids.values().map(HashMap::len).sum();
    }

    /// Queue a newly discovered document, then its previous-version copies.
    fn enqueue(&self, state: &mut RegistryState, target: &PagePathInfo, file_path: &str) {
        let href_path = target.href_path();
        state.pending.push_back(GenPageInfo {
            file_path: file_path.to_owned(),
            href_path: href_path.clone(),
        });
        if target.res_type.is_markup() {
            return;
        }
        for fallback in fallback_file_paths(file_path, &self.version) {
            tracing::debug!(href = %href_path, file = %fallback, "previous-version copy");
            state.pending.push_back(GenPageInfo {
                file_path: fallback,
                href_path: href_path.clone(),
            });
        }
    }

    /// Lock the registry state. A poisoned lock is still consistent: every
    /// critical section is a handful of map and queue operations.
    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        return self.state.lock().unwrap_or_else(PoisonError::into_inner);
    }
}
