use std::collections::HashMap;
use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use rand::Rng;

use crate::error::StoryError;
use crate::model::{EmojiCount, Page, Pagination, Stats, StoryRecord};

pub const TOP_EMOJI_COUNT: usize = 5;

#[derive(Default)]
struct StoreState {
    /// Insertion order is the canonical order.
    records: Vec<StoryRecord>,
    by_id: HashMap<String, usize>,
    total_generated: u64,
}

/// In-memory story collection. Records are only appended; `likes` is the
/// one field that changes after insertion.
#[derive(Default)]
pub struct StoryStore {
    state: RwLock<StoreState>,
}

impl fmt::Debug for StoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("StoryStore");
        if let Ok(state) = self.state.read() {
            d.field("stored", &state.records.len())
            .field("total_generated", &state.total_generated);
        }
        d.finish()
    }
}

impl StoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>, StoryError> {
        self.state.read().map_err(|_| StoryError::Unexpected("Poisoned Lock".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>, StoryError> {
        self.state.write().map_err(|_| StoryError::Unexpected("Poisoned Lock".into()))
    }

    pub fn append(&self, record: StoryRecord) -> Result<(), StoryError> {
        let mut state = self.write()?;
        if state.by_id.contains_key(&record.id) {
            return Err(StoryError::Unexpected(format!("duplicate story id {}", record.id)));
        }
        let position = state.records.len();
        state.by_id.insert(record.id.clone(), position);
        state.records.push(record);
        state.total_generated += 1;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<StoryRecord, StoryError> {
        let state = self.read()?;
        state.by_id
        .get(id)
        .map(|&i| state.records[i].clone())
        .ok_or_else(story_not_found)
    }

    /// Adds one like and returns the new count.
    pub fn like(&self, id: &str) -> Result<u64, StoryError> {
        let mut state = self.write()?;
        let position = *state.by_id.get(id).ok_or_else(story_not_found)?;
        let record = &mut state.records[position];
        record.likes += 1;
        Ok(record.likes)
    }

    /// Page numbers start at 1. Zero page or limit is treated as 1.
    pub fn paginate(&self, page: usize, limit: usize) -> Result<Page, StoryError> {
        let page = page.max(1);
        let limit = limit.max(1);
        let state = self.read()?;

        let total = state.records.len();
        let start = (page - 1).saturating_mul(limit).min(total);
        let end = page.saturating_mul(limit).min(total);

        Ok(Page {
            stories: state.records[start..end].to_vec(),
           pagination: Pagination {
               total,
               pages: total.div_ceil(limit),
           current_page: page,
           },
        })
    }

    /// Case-insensitive substring match on the story text.
    pub fn search(&self, query: &str) -> Result<Vec<StoryRecord>, StoryError> {
        if query.is_empty() {
            return Err(StoryError::Validation("Search query is required".into()));
        }
        let needle = query.to_lowercase();
        let state = self.read()?;
        Ok(state.records
        .iter()
        .filter(|r| r.story.to_lowercase().contains(&needle))
        .cloned()
        .collect())
    }

    pub fn random_pick(&self) -> Result<StoryRecord, StoryError> {
        let state = self.read()?;
        if state.records.is_empty() {
            return Err(StoryError::NotFound("No stories available at the moment".into()));
        }
        let i = rand::thread_rng().gen_range(0..state.records.len());
        Ok(state.records[i].clone())
    }

    pub fn stats(&self) -> Result<Stats, StoryError> {
        let state = self.read()?;

        // Counts kept in first-seen order so the stable sort breaks ties by it.
        let mut counts: Vec<EmojiCount> = Vec::new();
        let mut slot: HashMap<&str, usize> = HashMap::new();
        for emoji in state.records.iter().flat_map(|r| r.emojis.iter()) {
            match slot.get(emoji.as_str()) {
                Some(&i) => counts[i].count += 1,
                None => {
                    slot.insert(emoji.as_str(), counts.len());
                    counts.push(EmojiCount { emoji: emoji.clone(), count: 1 });
                }
            }
        }
        counts.sort_by(|a, b| b.count.cmp(&a.count));
        counts.truncate(TOP_EMOJI_COUNT);

        Ok(Stats {
            total_stories_generated: state.total_generated,
            stories_in_history: state.records.len(),
            top_emojis: counts,
        })
    }

    pub fn len(&self) -> usize {
        self.read().map(|s| s.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_generated(&self) -> u64 {
        self.read().map(|s| s.total_generated).unwrap_or(0)
    }
}

fn story_not_found() -> StoryError {
    StoryError::NotFound("Story not found".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Genre, StoryLength};

    fn record(emojis: &[&str], story: &str) -> StoryRecord {
        StoryRecord::new(
            emojis.iter().map(|e| e.to_string()).collect(),
                         story.to_string(),
                         Genre::General,
                         StoryLength::Medium,
        )
    }

    fn filled(n: usize) -> (StoryStore, Vec<String>) {
        let store = StoryStore::new();
        let mut ids = Vec::new();
        for i in 0..n {
            let r = record(&["⭐"], &format!("story {}", i));
            ids.push(r.id.clone());
            store.append(r).unwrap();
        }
        (store, ids)
    }

    #[test]
    fn append_and_get() {
        let store = StoryStore::new();
        let r = record(&["🚀", "👽"], "Into orbit.");
        let id = r.id.clone();
        store.append(r.clone()).unwrap();

        assert_eq!(store.get(&id).unwrap(), r);
        assert_eq!(store.total_generated(), 1);
        assert_eq!(store.get("missing"), Err(StoryError::NotFound("Story not found".into())));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let store = StoryStore::new();
        let r = record(&["🚀"], "once");
        store.append(r.clone()).unwrap();
        assert!(matches!(store.append(r), Err(StoryError::Unexpected(_))));
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_generated(), 1);
    }

    #[test]
    fn likes_increment_by_one() {
        let (store, ids) = filled(2);
        for expected in 1..=4 {
            assert_eq!(store.like(&ids[1]).unwrap(), expected);
        }
        assert_eq!(store.get(&ids[1]).unwrap().likes, 4);
        assert_eq!(store.get(&ids[0]).unwrap().likes, 0);
        assert!(matches!(store.like("nope"), Err(StoryError::NotFound(_))));
    }

    #[test]
    fn empty_history_page() {
        let store = StoryStore::new();
        let page = store.paginate(1, 10).unwrap();
        assert!(page.stories.is_empty());
        assert_eq!(page.pagination, Pagination { total: 0, pages: 0, current_page: 1 });
    }

    #[test]
    fn pages_tile_the_store() {
        for n in [0usize, 1, 9, 10, 11, 23] {
            for limit in [1usize, 3, 10] {
                let (store, ids) = filled(n);
                let first = store.paginate(1, limit).unwrap();
                assert_eq!(first.pagination.pages, n.div_ceil(limit));

                let mut seen = Vec::new();
                for p in 1..=first.pagination.pages + 1 {
                    let page = store.paginate(p, limit).unwrap();
                    assert!(page.stories.len() <= limit);
                    assert_eq!(page.pagination.total, n);
                    assert_eq!(page.pagination.current_page, p);
                    seen.extend(page.stories.into_iter().map(|r| r.id));
                }
                assert_eq!(seen, ids);
            }
        }
    }

    #[test]
    fn out_of_range_page_is_empty() {
        let (store, _) = filled(3);
        let page = store.paginate(usize::MAX, usize::MAX).unwrap();
        assert!(page.stories.is_empty());
        assert_eq!(page.pagination.total, 3);
    }

    #[test]
    fn search_is_case_insensitive_on_story_only() {
        let store = StoryStore::new();
        store.append(record(&["🐉"], "The Dragon slept.")).unwrap();
        store.append(record(&["dragon"], "A quiet morning.")).unwrap();

        let hits = store.search("dRaGoN").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].story, "The Dragon slept.");
        assert_eq!(store.search("dRaGoN").unwrap(), hits);
        assert!(store.search("unicorn").unwrap().is_empty());
    }

    #[test]
    fn empty_search_is_a_validation_error() {
        let store = StoryStore::new();
        assert_eq!(store.search(""), Err(StoryError::Validation("Search query is required".into())));
    }

    #[test]
    fn random_pick_needs_stories() {
        let store = StoryStore::new();
        assert!(matches!(store.random_pick(), Err(StoryError::NotFound(_))));

        let (store, ids) = filled(5);
        for _ in 0..20 {
            assert!(ids.contains(&store.random_pick().unwrap().id));
        }
    }

    #[test]
    fn stats_rank_emoji_by_occurrence() {
        let store = StoryStore::new();
        store.append(record(&["😀", "🚀"], "a")).unwrap();
        store.append(record(&["🚀", "🚀"], "b")).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_stories_generated, 2);
        assert_eq!(stats.stories_in_history, 2);
        assert_eq!(
            stats.top_emojis,
            vec![
                EmojiCount { emoji: "🚀".into(), count: 3 },
                EmojiCount { emoji: "😀".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn stats_keep_five_and_break_ties_by_first_seen() {
        let store = StoryStore::new();
        store.append(record(&["a", "b", "c", "d", "e", "f"], "x")).unwrap();
        store.append(record(&["f"], "y")).unwrap();

        let top: Vec<String> = store.stats().unwrap().top_emojis.into_iter().map(|e| e.emoji).collect();
        assert_eq!(top, vec!["f", "a", "b", "c", "d"]);
    }
}
