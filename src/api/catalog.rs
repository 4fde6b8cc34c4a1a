//! Catalog endpoints
//!
//! Index, search, anime detail, and the episode page. The episode page
//! doubles as the comment feed: an XHR request carrying `comment=1`
//! long-polls for comments newer than the `after` cursor instead of
//! returning the page payload.

use axum::{
    Json, Router,
    extract::{Form, Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;

use crate::api::{dto, is_xhr, parse_episode_segment};
use crate::auth::CurrentUser;
use crate::data::{Comment, EntityId, now_micros};
use crate::error::AppError;
use crate::metrics::HTTP_REQUESTS_TOTAL;
use crate::service::feed;
use crate::service::poll::{PollSettings, cursor_lower_bound, parse_cursor, poll_new};
use crate::AppState;

/// Create catalog router
///
/// The dynamic `/:anime_title` routes sit under every static route in the
/// application; axum gives static segments priority.
pub fn catalog_router() -> Router<AppState> {
    Router::new()
        .route("/", get(anime_index))
        .route("/search", get(search))
        .route("/:anime_title", get(anime_detail))
        .route(
            "/:anime_title/:episode",
            get(episode_detail).post(create_comment),
        )
}

fn anime_url(title: &str) -> String {
    format!("/{}", urlencoding::encode(title))
}

fn episode_url(title: &str, number: i64) -> String {
    format!("/{}/episode-{}", urlencoding::encode(title), number)
}

/// GET / - Anime index grouped by category
pub async fn anime_index(
    State(state): State<AppState>,
) -> Result<Json<Vec<dto::CategoryGroup>>, AppError> {
    let groups = state.db.list_categories_with_animes().await?;

    let response = groups
        .into_iter()
        .map(|(category, animes)| dto::CategoryGroup {
            name: category.name,
            animes: animes
                .into_iter()
                .map(|anime| dto::AnimeCard {
                    url: anime_url(&anime.title),
                    image: anime.image_detail.unwrap_or_default(),
                    title: anime.title,
                })
                .collect(),
        })
        .collect();

    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    search: Option<String>,
}

/// GET /search - Title search
///
/// The page's search box queries this asynchronously; XHR requests get the
/// bare result array.
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let query = params.search.unwrap_or_default();
    let animes = if query.is_empty() {
        state.db.list_animes().await?
    } else {
        state.db.search_animes(&query).await?
    };

    let results: Vec<dto::SearchResult> = animes
        .into_iter()
        .map(|anime| dto::SearchResult {
            url: anime_url(&anime.title),
            image: anime.image_card.unwrap_or_default(),
            total_episodes: anime.total_episodes,
            description: anime.description,
            title: anime.title,
        })
        .collect();

    if is_xhr(&headers) {
        return Ok(Json(results).into_response());
    }

    Ok(Json(serde_json::json!({
        "search": query,
        "animes": results,
    }))
    .into_response())
}

/// GET /:anime_title - Anime detail with its episodes
pub async fn anime_detail(
    State(state): State<AppState>,
    CurrentUser(_session): CurrentUser,
    Path(anime_title): Path<String>,
) -> Result<Json<dto::AnimeDetailResponse>, AppError> {
    let anime = state
        .db
        .get_anime(&anime_title)
        .await?
        .ok_or(AppError::NotFound)?;
    let episodes = state.db.list_episodes(&anime.title).await?;

    Ok(Json(dto::AnimeDetailResponse { anime, episodes }))
}

#[derive(Debug, Deserialize)]
pub struct EpisodePageParams {
    /// "1" selects the comment feed on XHR requests
    comment: Option<String>,
    /// Timestamp cursor of the last comment the client has seen
    after: Option<String>,
}

/// GET /:anime_title/episode-:n - Episode page and comment feed
pub async fn episode_detail(
    State(state): State<AppState>,
    CurrentUser(_session): CurrentUser,
    Path((anime_title, episode_segment)): Path<(String, String)>,
    Query(params): Query<EpisodePageParams>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let number = parse_episode_segment(&episode_segment).ok_or(AppError::NotFound)?;
    let anime = state
        .db
        .get_anime(&anime_title)
        .await?
        .ok_or(AppError::NotFound)?;
    let episode = state
        .db
        .get_episode(&anime.title, number)
        .await?
        .ok_or(AppError::NotFound)?;

    if is_xhr(&headers) && params.comment.as_deref() == Some("1") {
        return comment_feed(&state, &episode.id, params.after.as_deref()).await;
    }

    let rows = state.db.new_comments(&episode.id, None).await?;
    let comments = rows.iter().map(feed::comment_event).collect();

    Ok(Json(dto::EpisodePageResponse {
        anime,
        episode,
        comments,
    })
    .into_response())
}

/// Long-poll for comments newer than the client's cursor.
///
/// The guard already ran: any authenticated viewer may poll any episode.
async fn comment_feed(
    state: &AppState,
    episode_id: &str,
    after: Option<&str>,
) -> Result<Response, AppError> {
    let cursor = parse_cursor(after);
    let lower_bound = cursor_lower_bound(cursor);
    let settings = PollSettings::comments(&state.config.polling);

    let db = state.db.clone();
    let episode_id = episode_id.to_string();
    let rows = poll_new(&settings, cursor, move || {
        let db = db.clone();
        let episode_id = episode_id.clone();
        async move { db.new_comments(&episode_id, lower_bound).await }
    })
    .await?;

    let events: Vec<dto::CommentEvent> = rows.iter().map(feed::comment_event).collect();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/:anime_title/episode-:n", "200"])
        .inc();

    Ok(Json(events).into_response())
}

#[derive(Debug, Deserialize)]
pub struct NewCommentForm {
    content: Option<String>,
}

/// POST /:anime_title/episode-:n - Submit a comment
///
/// Empty content is ignored; either way the client is sent back to the
/// episode page, whose feed will pick the new comment up.
pub async fn create_comment(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path((anime_title, episode_segment)): Path<(String, String)>,
    Form(form): Form<NewCommentForm>,
) -> Result<Redirect, AppError> {
    let number = parse_episode_segment(&episode_segment).ok_or(AppError::NotFound)?;
    let episode = state
        .db
        .get_episode(&anime_title, number)
        .await?
        .ok_or(AppError::NotFound)?;

    let content = form.content.unwrap_or_default();
    let content = content.trim();

    if !content.is_empty() {
        let comment = Comment {
            id: EntityId::new().0,
            episode_id: episode.id.clone(),
            anime_title: episode.anime_title.clone(),
            user_id: session.user_id.clone(),
            content: content.to_string(),
            created_at: now_micros(),
        };
        state.db.insert_comment(&comment).await?;

        tracing::debug!(
            user = %session.username,
            episode = %episode.id,
            "comment posted"
        );
    }

    Ok(Redirect::to(&episode_url(
        &episode.anime_title,
        episode.episode_number,
    )))
}
