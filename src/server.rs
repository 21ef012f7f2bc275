use std::convert::Infallible;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::reply::Response;
use warp::{Buf, Filter, Rejection, Reply};

use crate::error::StoryError;
use crate::generation::CompletionBackend;
use crate::model::{GenerateRequest, HistoryQuery, RandomRequest, SearchQuery};
use crate::service::{StoryService, VERSION};

const MAX_BODY_BYTES: u64 = 16 * 1024;

#[derive(Debug)]
struct BodyTooLarge;

impl warp::reject::Reject for BodyTooLarge {}

#[derive(Debug)]
struct BodyUnreadable;

impl warp::reject::Reject for BodyUnreadable {}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// All HTTP routes, with CORS and JSON error rendering applied.
pub fn routes<B: CompletionBackend>(
    service: Arc<StoryService<B>>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    // GET /health
    let health = warp::path!("health")
    .and(warp::get())
    .and(with_service(service.clone()))
    .map(|svc: Arc<StoryService<B>>| warp::reply::json(&svc.health()).into_response());

    // GET /docs
    let docs = warp::path!("docs")
    .and(warp::get())
    .map(|| warp::reply::json(&api_docs()).into_response());

    // GET /stats
    let stats = warp::path!("stats")
    .and(warp::get())
    .and(with_service(service.clone()))
    .map(|svc: Arc<StoryService<B>>| reply(svc.stats()));

    // GET /history?page=&limit=
    let history = warp::path!("history")
    .and(warp::get())
    .and(warp::query::<HistoryQuery>())
    .and(with_service(service.clone()))
    .map(|q: HistoryQuery, svc: Arc<StoryService<B>>| {
        reply(svc.list_history(q.page.as_deref(), q.limit.as_deref()))
    });

    // POST /generate
    let generate = warp::path!("generate")
    .and(warp::post())
    .and(json_body())
    .and(with_service(service.clone()))
    .and_then(|body: Bytes, svc: Arc<StoryService<B>>| async move {
        let result = match parse_body::<GenerateRequest>(&body) {
            Ok(req) => svc.generate_from_emojis(req).await,
              Err(e) => Err(e),
        };
        Ok::<_, Rejection>(reply(result))
    });

    // POST /random-emoji-story
    let random_emoji = warp::path!("random-emoji-story")
    .and(warp::post())
    .and(json_body())
    .and(with_service(service.clone()))
    .and_then(|body: Bytes, svc: Arc<StoryService<B>>| async move {
        let result = match parse_body::<RandomRequest>(&body) {
            Ok(req) => svc.generate_from_random(req).await,
              Err(e) => Err(e),
        };
        Ok::<_, Rejection>(reply(result))
    });

    // GET /story/:id
    let story = warp::path!("story" / String)
    .and(warp::get())
    .and(with_service(service.clone()))
    .map(|id: String, svc: Arc<StoryService<B>>| reply(svc.get_story(&id)));

    // POST /story/:id/like
    let like = warp::path!("story" / String / "like")
    .and(warp::post())
    .and(with_service(service.clone()))
    .map(|id: String, svc: Arc<StoryService<B>>| reply(svc.like_story(&id)));

    // GET /random
    let random = warp::path!("random")
    .and(warp::get())
    .and(with_service(service.clone()))
    .map(|svc: Arc<StoryService<B>>| reply(svc.random_story()));

    // GET /search?query=
    let search = warp::path!("search")
    .and(warp::get())
    .and(warp::query::<SearchQuery>())
    .and(with_service(service))
    .map(|q: SearchQuery, svc: Arc<StoryService<B>>| reply(svc.search_stories(q.query.as_deref())));

    let cors = warp::cors()
    .allow_any_origin()
    .allow_methods(vec!["GET", "POST", "OPTIONS"])
    .allow_headers(vec!["content-type"]);

    health
    .or(docs)
    .unify()
    .or(stats)
    .unify()
    .or(history)
    .unify()
    .or(generate)
    .unify()
    .or(random_emoji)
    .unify()
    .or(story)
    .unify()
    .or(like)
    .unify()
    .or(random)
    .unify()
    .or(search)
    .unify()
    // error replies must pass through cors too
    .recover(handle_rejection)
    .with(cors)
    .with(warp::trace::request())
    .recover(handle_rejection)
}

fn with_service<B: CompletionBackend>(
    service: Arc<StoryService<B>>,
) -> impl Filter<Extract = (Arc<StoryService<B>>,), Error = Infallible> + Clone {
    warp::any().map(move || service.clone())
}

/// Body bytes, at most `MAX_BODY_BYTES`. A declared content-length over the
/// limit fails early; chunked bodies are cut off while reading.
/// A missing content-length is allowed so bodiless POSTs still work.
fn json_body() -> impl Filter<Extract = (Bytes,), Error = Rejection> + Clone {
    warp::header::optional::<u64>("content-length")
    .and_then(|len: Option<u64>| async move {
        match len {
            Some(n) if n > MAX_BODY_BYTES => Err(warp::reject::custom(BodyTooLarge)),
              _ => Ok(()),
        }
    })
    .untuple_one()
    .and(warp::body::stream())
    .and_then(read_capped)
}

async fn read_capped<S, B>(body: S) -> Result<Bytes, Rejection>
where
    S: Stream<Item = Result<B, warp::Error>>,
    B: Buf,
{
    futures::pin_mut!(body);
    let mut collected = Vec::new();

    while let Some(chunk) = body.next().await {
        let mut chunk = chunk.map_err(|_| warp::reject::custom(BodyUnreadable))?;
        if (collected.len() + chunk.remaining()) as u64 > MAX_BODY_BYTES {
            return Err(warp::reject::custom(BodyTooLarge));
        }
        while chunk.has_remaining() {
            let part = chunk.chunk();
            let n = part.len();
            collected.extend_from_slice(part);
            chunk.advance(n);
        }
    }
    Ok(Bytes::from(collected))
}

/// An empty body means "all defaults"; anything else must be a JSON object.
fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, StoryError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| StoryError::Validation(format!("Invalid JSON body: {}", e)))
}

fn reply<T: Serialize>(result: Result<T, StoryError>) -> Response {
    match result {
        Ok(body) => warp::reply::json(&body).into_response(),
        Err(err) => error_reply(&err),
    }
}

fn error_reply(err: &StoryError) -> Response {
    match err {
        StoryError::Validation(msg) => tracing::warn!(%msg, "rejected request"),
        StoryError::NotFound(_) => {}
        StoryError::Unexpected(detail) => tracing::error!(%detail, "request failed"),
    }
    json_error(err.public_message(), err.status())
}

fn json_error(message: impl Into<String>, status: StatusCode) -> Response {
    let body = ErrorBody { error: message.into() };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let response = if err.is_not_found() {
        json_error("Not found", StatusCode::NOT_FOUND)
    } else if err.find::<BodyTooLarge>().is_some() {
        json_error("Request body too large", StatusCode::PAYLOAD_TOO_LARGE)
    } else if err.find::<BodyUnreadable>().is_some() {
        json_error("Could not read request body", StatusCode::BAD_REQUEST)
    } else if err.find::<warp::reject::InvalidHeader>().is_some() {
        json_error("Invalid request header", StatusCode::BAD_REQUEST)
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        json_error("Invalid query string", StatusCode::BAD_REQUEST)
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        json_error("Method not allowed", StatusCode::METHOD_NOT_ALLOWED)
    } else if err.find::<warp::filters::cors::CorsForbidden>().is_some() {
        json_error("CORS request forbidden", StatusCode::FORBIDDEN)
    } else {
        tracing::error!(?err, "unhandled rejection");
        json_error("Server error occurred", StatusCode::INTERNAL_SERVER_ERROR)
    };
    Ok(response)
}

fn api_docs() -> serde_json::Value {
    serde_json::json!({
        "name": "Emoji Story Generator API",
        "version": VERSION,
        "description": "Generate creative stories based on emoji combinations",
        "endpoints": [
            { "path": "/health", "method": "GET", "description": "Check API health status" },
            {
                "path": "/generate",
                "method": "POST",
                "description": "Generate a story based on provided emojis",
                "parameters": [
                    { "name": "emojis", "type": "array", "required": true },
                    { "name": "genre", "type": "string", "required": false, "default": "general",
                      "options": ["general", "comedy", "romance", "horror", "fantasy", "sci-fi", "mystery"] },
                    { "name": "length", "type": "string", "required": false, "default": "medium",
                      "options": ["short", "medium", "long"] }
                ]
            },
            {
                "path": "/random-emoji-story",
                "method": "POST",
                "description": "Generate a story with randomly selected emojis",
                "parameters": [
                    { "name": "count", "type": "number", "required": false, "default": 3, "max": 5 },
                    { "name": "genre", "type": "string", "required": false, "default": "general" },
                    { "name": "length", "type": "string", "required": false, "default": "medium" }
                ]
            },
            { "path": "/story/:id", "method": "GET", "description": "Retrieve a specific story by ID" },
            { "path": "/story/:id/like", "method": "POST", "description": "Like a specific story" },
            { "path": "/random", "method": "GET", "description": "Get a random story from history" },
            {
                "path": "/history",
                "method": "GET",
                "description": "Retrieve story history with pagination",
                "parameters": [
                    { "name": "page", "type": "number", "in": "query", "default": 1 },
                    { "name": "limit", "type": "number", "in": "query", "default": 10 }
                ]
            },
            {
                "path": "/search",
                "method": "GET",
                "description": "Search stories by content",
                "parameters": [ { "name": "query", "type": "string", "in": "query", "required": true } ]
            },
            { "path": "/stats", "method": "GET", "description": "Get usage statistics" },
            { "path": "/docs", "method": "GET", "description": "API documentation" }
        ]
    })
}
