use std::{
	collections::HashSet,
	fmt,
	future::Future,
	hash::Hash,
	mem,
	sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tracing::{debug, trace, warn};

use super::{error::Error, fan_out::FanOut};

#[derive(Debug)]
struct Sections<K> {
	loading: HashSet<K>,
	cache_valid: bool,
}

/// Loads the independent sections of a page (featured apps, recent apps, categories...) as a
/// single fan-out, never querying a section that is still loading from a previous batch.
///
/// The page cache becomes valid once a batch that loaded something joins and no section is
/// loading anymore. A batch dropped before joining releases its sections without validating
/// the cache.
#[derive(Debug)]
pub struct SectionLoader<K> {
	sections: Arc<Mutex<Sections<K>>>,
}

impl<K> Default for SectionLoader<K> {
	fn default() -> Self {
		Self {
			sections: Arc::new(Mutex::new(Sections {
				loading: HashSet::new(),
				cache_valid: false,
			})),
		}
	}
}

/// Sections dispatched together by [`SectionLoader::dispatch`].
#[must_use = "dropping a batch cancels the loading of its sections"]
pub struct SectionBatch<'a, K: Hash + Eq + fmt::Debug> {
	fan_out: FanOut<'a>,
	registration: BatchRegistration<K>,
}

#[derive(Debug)]
pub struct LoadOutcome {
	/// Every section finished loading and the page cache is now valid.
	pub refreshed: bool,
	pub result: Result<(), Error>,
}

impl<K: Hash + Eq + Clone + fmt::Debug> SectionLoader<K> {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_loading(&self, key: &K) -> bool {
		lock(&self.sections).loading.contains(key)
	}

	#[must_use]
	pub fn is_cache_valid(&self) -> bool {
		lock(&self.sections).cache_valid
	}

	pub fn invalidate(&self) {
		lock(&self.sections).cache_valid = false;
	}

	/// Nothing is loading and what was loaded before is stale.
	#[must_use]
	pub fn needs_reload(&self) -> bool {
		let sections = lock(&self.sections);

		!sections.cache_valid && sections.loading.is_empty()
	}

	/// Starts loading every given section that isn't already loading, the others are dropped
	/// without being polled.
	pub fn dispatch<'a, F>(&self, sections: impl IntoIterator<Item = (K, F)>) -> SectionBatch<'a, K>
	where
		F: Future<Output = Result<(), Error>> + Send + 'a,
	{
		let mut fan_out = FanOut::new();
		let mut keys = Vec::new();

		{
			let mut state = lock(&self.sections);

			for (key, load) in sections {
				if !state.loading.insert(key.clone()) {
					trace!(?key, "Section already loading, skipping");
					continue;
				}

				fan_out.start(format!("{key:?}"), load);
				keys.push(key);
			}
		}

		SectionBatch {
			fan_out,
			registration: BatchRegistration {
				sections: Arc::clone(&self.sections),
				keys,
			},
		}
	}
}

impl<K: Hash + Eq + fmt::Debug> SectionBatch<'_, K> {
	pub fn keys(&self) -> &[K] {
		&self.registration.keys
	}

	/// Waits for every section of the batch and releases them.
	pub async fn join(self) -> LoadOutcome {
		let Self {
			fan_out,
			mut registration,
		} = self;

		let joined = fan_out.join().await;

		LoadOutcome {
			refreshed: registration.release(),
			result: joined.into_result(),
		}
	}
}

struct BatchRegistration<K: Hash + Eq + fmt::Debug> {
	sections: Arc<Mutex<Sections<K>>>,
	keys: Vec<K>,
}

impl<K: Hash + Eq + fmt::Debug> BatchRegistration<K> {
	/// Clears the loading flags of this batch, returns whether the page cache became valid.
	fn release(&mut self) -> bool {
		let keys = mem::take(&mut self.keys);
		if keys.is_empty() {
			return false;
		}

		let mut sections = lock(&self.sections);

		for key in &keys {
			if !sections.loading.remove(key) {
				warn!(?key, "Finished a section that wasn't loading");
			}
		}

		let refreshed = sections.loading.is_empty();
		if refreshed {
			debug!(sections = keys.len(), "All sections loaded");
			sections.cache_valid = true;
		}

		refreshed
	}
}

impl<K: Hash + Eq + fmt::Debug> Drop for BatchRegistration<K> {
	fn drop(&mut self) {
		if self.keys.is_empty() {
			return;
		}

		debug!(keys = ?self.keys, "Section batch dropped before joining, releasing its sections");

		let mut sections = lock(&self.sections);
		for key in self.keys.drain(..) {
			sections.loading.remove(&key);
		}
	}
}

fn lock<K>(sections: &Mutex<Sections<K>>) -> MutexGuard<'_, Sections<K>> {
	// Never held across an await point, a poisoned lock still has consistent data
	sections.lock().unwrap_or_else(PoisonError::into_inner)
}
