use std::sync::Arc;
use std::time::Instant;

use rand::seq::SliceRandom;

use crate::error::StoryError;
use crate::generation::{CompletionBackend, GenerationClient};
use crate::model::{
    GenerateRequest, Genre, Health, Likes, Page, RandomRequest, SearchResults, Stats, StoryLength,
    StoryRecord, StoryView,
};
use crate::parser::lenient_positive;
use crate::prompt::build_prompt;
use crate::store::StoryStore;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_LIMIT: usize = 10;
pub const DEFAULT_RANDOM_COUNT: i64 = 3;
pub const MAX_RANDOM_COUNT: i64 = 5;

pub const EMOJI_POOL: [&str; 30] = [
    "😀", "😂", "😍", "🥳", "😎", "🤔", "😱", "😴", "🚀", "🌈",
    "🔥", "💧", "🌊", "🌍", "🌙", "☀️", "⭐", "🍕", "🍦", "🎂",
    "🎁", "🎮", "📱", "💻", "⚽", "🏆", "🎯", "🎭", "🎨", "🚗",
];

/// Ties prompt building, generation and storage together.
pub struct StoryService<B> {
    store: Arc<StoryStore>,
    generator: GenerationClient<B>,
    started: Instant,
}

impl<B: CompletionBackend> StoryService<B> {
    pub fn new(store: Arc<StoryStore>, generator: GenerationClient<B>) -> Self {
        Self { store, generator, started: Instant::now() }
    }

    pub fn store(&self) -> &Arc<StoryStore> {
        &self.store
    }

    pub async fn generate_from_emojis(&self, req: GenerateRequest) -> Result<StoryView, StoryError> {
        let emojis = validate_emojis(req.emojis.as_ref())?;
        let genre = Genre::parse_opt(req.genre.as_deref())?;
        let length = StoryLength::parse_opt(req.length.as_deref())?;

        let record = self.create_story(emojis, genre, length, false).await?;
        Ok(record.view())
    }

    pub async fn generate_from_random(&self, req: RandomRequest) -> Result<StoryView, StoryError> {
        let genre = Genre::parse_opt(req.genre.as_deref())?;
        let length = StoryLength::parse_opt(req.length.as_deref())?;
        let emojis = sample_emojis(requested_count(req.count.as_ref()));

        let record = self.create_story(emojis, genre, length, true).await?;
        Ok(record.view())
    }

    /// Everything after validation. A failed generation still produces a record.
    async fn create_story(
        &self,
        emojis: Vec<String>,
        genre: Genre,
        length: StoryLength,
        randomly_generated: bool,
    ) -> Result<StoryRecord, StoryError> {
        let prompt = build_prompt(&emojis, genre, length);
        let outcome = self.generator.generate(&prompt, length).await;
        let succeeded = outcome.succeeded();

        let mut record = StoryRecord::new(emojis, outcome.into_story(), genre, length);
        record.randomly_generated = randomly_generated;
        record.generation_succeeded = succeeded;

        self.store.append(record.clone())?;
        tracing::info!(
            id = %record.id,
            genre = %genre,
            length = %length,
            random = randomly_generated,
            succeeded,
            "story stored"
        );
        Ok(record)
    }

    pub fn get_story(&self, id: &str) -> Result<StoryRecord, StoryError> {
        self.store.get(id)
    }

    pub fn like_story(&self, id: &str) -> Result<Likes, StoryError> {
        self.store.like(id).map(|likes| Likes { likes })
    }

    pub fn list_history(&self, page: Option<&str>, limit: Option<&str>) -> Result<Page, StoryError> {
        self.store.paginate(
            lenient_positive(page, DEFAULT_PAGE),
            lenient_positive(limit, DEFAULT_LIMIT),
        )
    }

    pub fn random_story(&self) -> Result<StoryRecord, StoryError> {
        self.store.random_pick()
    }

    pub fn search_stories(&self, query: Option<&str>) -> Result<SearchResults, StoryError> {
        let results = self.store.search(query.unwrap_or_default())?;
        Ok(SearchResults { results })
    }

    pub fn stats(&self) -> Result<Stats, StoryError> {
        self.store.stats()
    }

    pub fn health(&self) -> Health {
        Health {
            status: "ok".to_string(),
            uptime: self.started.elapsed().as_secs_f64(),
            version: VERSION.to_string(),
        }
    }
}

fn validate_emojis(raw: Option<&serde_json::Value>) -> Result<Vec<String>, StoryError> {
    let invalid = || StoryError::Validation("Please provide an array of emojis".into());

    let items = raw.and_then(|v| v.as_array()).ok_or_else(invalid)?;
    if items.is_empty() {
        return Err(invalid());
    }
    items
    .iter()
    .map(|v| v.as_str().map(str::to_string).ok_or_else(invalid))
    .collect()
}

/// Numbers and numeric strings count, fractions round up; anything else is the default.
pub fn requested_count(raw: Option<&serde_json::Value>) -> i64 {
    let n = match raw {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n
    .filter(|n| n.is_finite())
    .map(|n| n.ceil() as i64)
    .unwrap_or(DEFAULT_RANDOM_COUNT)
}

/// Draws with replacement; duplicates are kept.
pub fn sample_emojis(requested: i64) -> Vec<String> {
    let count = requested.clamp(1, MAX_RANDOM_COUNT) as usize;
    let mut rng = rand::thread_rng();
    (0..count)
    .filter_map(|_| EMOJI_POOL.choose(&mut rng))
    .map(|e| e.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use crate::generation::FALLBACK_STORY;
    use crate::testing::ScriptedBackend;
    use serde_json::json;

    fn service(backend: ScriptedBackend) -> StoryService<ScriptedBackend> {
        StoryService::new(Arc::new(StoryStore::new()), GenerationClient::new(backend, "test-model"))
    }

    fn request(body: serde_json::Value) -> GenerateRequest {
        serde_json::from_value(body).unwrap()
    }

    #[tokio::test]
    async fn generates_and_stores_in_order() {
        let backend = ScriptedBackend::new().reply("<think>plan</think>\nA rocket met an alien over Earth.");
        let svc = service(backend.clone());

        let view = svc
        .generate_from_emojis(request(json!({ "emojis": ["🚀", "👽", "🌍"], "genre": "sci-fi", "length": "medium" })))
        .await
        .unwrap();

        assert_eq!(view.emojis, vec!["🚀", "👽", "🌍"]);
        assert_eq!(view.genre, Genre::SciFi);
        assert_eq!(view.length, StoryLength::Medium);
        assert_eq!(view.story, "A rocket met an alien over Earth.");

        let stored = svc.get_story(&view.id).unwrap();
        assert_eq!(stored.likes, 0);
        assert!(!stored.randomly_generated);
        assert!(stored.generation_succeeded);
        assert!(!stored.story.contains("<think>"));
        assert_eq!(svc.store().len(), 1);

        let sent = backend.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].max_tokens, 950);
        assert!(sent[0].messages[0].content.contains("🚀 👽 🌍 Make it a sci-fi story."));
    }

    #[tokio::test]
    async fn defaults_apply_when_options_missing() {
        let svc = service(ScriptedBackend::new());
        let view = svc.generate_from_emojis(request(json!({ "emojis": ["🍕"] }))).await.unwrap();
        assert_eq!(view.genre, Genre::General);
        assert_eq!(view.length, StoryLength::Medium);
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_the_model() {
        let backend = ScriptedBackend::new();
        let svc = service(backend.clone());

        for body in [
            json!({ "emojis": [] }),
            json!({}),
            json!({ "emojis": "🚀" }),
            json!({ "emojis": [1, 2] }),
            json!({ "emojis": ["🚀"], "genre": "western" }),
            json!({ "emojis": ["🚀"], "length": "epic" }),
        ] {
            let err = svc.generate_from_emojis(request(body)).await.unwrap_err();
            assert!(matches!(err, StoryError::Validation(_)));
        }

        assert_eq!(backend.calls(), 0);
        assert_eq!(svc.store().len(), 0);
        assert_eq!(svc.stats().unwrap().total_stories_generated, 0);
    }

    #[tokio::test]
    async fn failed_generation_still_stores_a_record() {
        let backend = ScriptedBackend::new().fail(GenerationError::Network("connection reset".into()));
        let svc = service(backend);

        let view = svc.generate_from_emojis(request(json!({ "emojis": ["😱"] }))).await.unwrap();
        assert_eq!(view.story, FALLBACK_STORY);

        let stored = svc.get_story(&view.id).unwrap();
        assert!(!stored.generation_succeeded);
        assert_eq!(svc.stats().unwrap().total_stories_generated, 1);
    }

    #[tokio::test]
    async fn random_emoji_story_is_flagged_and_clamped() {
        let svc = service(ScriptedBackend::new());

        let view = svc
        .generate_from_random(RandomRequest { count: Some(json!(50)), genre: Some("fantasy".into()), length: None })
        .await
        .unwrap();
        assert_eq!(view.emojis.len(), 5);
        assert!(view.emojis.iter().all(|e| EMOJI_POOL.contains(&e.as_str())));
        assert!(svc.get_story(&view.id).unwrap().randomly_generated);

        let view = svc.generate_from_random(RandomRequest::default()).await.unwrap();
        assert_eq!(view.emojis.len(), 3);

        let view = svc.generate_from_random(RandomRequest { count: Some(json!(-2)), ..Default::default() }).await.unwrap();
        assert_eq!(view.emojis.len(), 1);
    }

    #[tokio::test]
    async fn random_emoji_story_validates_options() {
        let backend = ScriptedBackend::new();
        let svc = service(backend.clone());
        let err = svc
        .generate_from_random(RandomRequest { count: None, genre: None, length: Some("huge".into()) })
        .await
        .unwrap_err();
        assert!(matches!(err, StoryError::Validation(_)));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn history_degrades_to_defaults() {
        let svc = service(ScriptedBackend::new());
        for _ in 0..12 {
            svc.generate_from_emojis(request(json!({ "emojis": ["⭐"] }))).await.unwrap();
        }

        let page = svc.list_history(Some("two"), Some("")).unwrap();
        assert_eq!(page.pagination.current_page, 1);
        assert_eq!(page.stories.len(), 10);
        assert_eq!(page.pagination.pages, 2);

        let page = svc.list_history(Some("2"), None).unwrap();
        assert_eq!(page.stories.len(), 2);
    }

    #[tokio::test]
    async fn likes_and_search() {
        let svc = service(ScriptedBackend::new().reply("The moon laughed."));
        let view = svc.generate_from_emojis(request(json!({ "emojis": ["🌙"] }))).await.unwrap();

        assert_eq!(svc.like_story(&view.id).unwrap(), Likes { likes: 1 });
        assert_eq!(svc.like_story(&view.id).unwrap(), Likes { likes: 2 });
        assert_eq!(svc.search_stories(Some("MOON")).unwrap().results.len(), 1);
        assert!(matches!(svc.search_stories(None), Err(StoryError::Validation(_))));
        assert!(matches!(svc.search_stories(Some("")), Err(StoryError::Validation(_))));
    }

    #[test]
    fn sampling_respects_count() {
        for _ in 0..50 {
            let picked = sample_emojis(5);
            assert_eq!(picked.len(), 5);
        }
    }

    #[test]
    fn count_coercion() {
        assert_eq!(requested_count(None), DEFAULT_RANDOM_COUNT);
        assert_eq!(requested_count(Some(&json!(4))), 4);
        assert_eq!(requested_count(Some(&json!(2.5))), 3);
        assert_eq!(requested_count(Some(&json!("4"))), 4);
        assert_eq!(requested_count(Some(&json!(" 2 "))), 2);
        assert_eq!(requested_count(Some(&json!("many"))), DEFAULT_RANDOM_COUNT);
        assert_eq!(requested_count(Some(&json!(null))), DEFAULT_RANDOM_COUNT);
        assert_eq!(requested_count(Some(&json!([1]))), DEFAULT_RANDOM_COUNT);
        assert_eq!(requested_count(Some(&json!(1e300))), i64::MAX);
    }

    #[test]
    fn health_reports_version() {
        let svc = service(ScriptedBackend::new());
        let health = svc.health();
        assert_eq!(health.status, "ok");
        assert_eq!(health.version, VERSION);
        assert!(health.uptime >= 0.0);
    }
}
