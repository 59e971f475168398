use crate::api::{error::ApiError, validate::require_non_empty, AppState};
use crate::auth::extract::{AdminCaller, Authenticated};
use crate::db::is_unique_violation;
use crate::models::{Movie, MovieDetails, MovieWithReviews};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;
use uuid::Uuid;

fn title_taken(title: &str) -> ApiError {
    ApiError::Conflict(format!("Movie with title {title} already exists"))
}

fn map_title_conflict(title: &str) -> impl FnOnce(anyhow::Error) -> ApiError + '_ {
    move |e| {
        if is_unique_violation(&e) {
            title_taken(title)
        } else {
            e.into()
        }
    }
}

/// POST /movies - admin only
pub async fn create_movie(
    _admin: AdminCaller,
    State(state): State<AppState>,
    Json(payload): Json<MovieDetails>,
) -> Result<(StatusCode, Json<Movie>), ApiError> {
    require_non_empty("title", &payload.title)?;

    let movie = Movie::new(payload);
    if state.db.find_movie_by_title(&movie.title)?.is_some() {
        return Err(title_taken(&movie.title));
    }

    state
        .db
        .insert_movie(&movie)
        .map_err(map_title_conflict(&movie.title))?;

    info!("Created movie {} ({})", movie.title, movie.id);
    Ok((StatusCode::CREATED, Json(movie)))
}

/// GET /movies
pub async fn list_movies(
    _caller: Authenticated,
    State(state): State<AppState>,
) -> Result<Json<Vec<MovieWithReviews>>, ApiError> {
    let movies = state.db.list_movies()?;
    let mut reviews = state.db.reviews_by_movie()?;

    let listed = movies
        .into_iter()
        .map(|movie| MovieWithReviews {
            reviews: reviews.remove(&movie.id).unwrap_or_default(),
            movie,
        })
        .collect();

    Ok(Json(listed))
}

/// GET /movies/:id
pub async fn get_movie(
    _caller: Authenticated,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MovieWithReviews>, ApiError> {
    let movie = state
        .db
        .find_movie(&id)?
        .ok_or(ApiError::NotFound("Movie"))?;
    let reviews = state.db.reviews_for_movie(&id)?;

    Ok(Json(MovieWithReviews { movie, reviews }))
}

/// PUT /movies/:id - admin only
pub async fn update_movie(
    _admin: AdminCaller,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MovieDetails>,
) -> Result<Json<Movie>, ApiError> {
    let mut movie = state
        .db
        .find_movie(&id)?
        .ok_or(ApiError::NotFound("Movie"))?;

    require_non_empty("title", &payload.title)?;

    movie.apply(payload);
    if let Some(other) = state.db.find_movie_by_title(&movie.title)? {
        if other.id != movie.id {
            return Err(title_taken(&movie.title));
        }
    }

    if !state
        .db
        .update_movie(&movie)
        .map_err(map_title_conflict(&movie.title))?
    {
        return Err(ApiError::NotFound("Movie"));
    }

    info!("Updated movie {}", movie.id);
    Ok(Json(movie))
}

/// DELETE /movies/:id - admin only
pub async fn delete_movie(
    _admin: AdminCaller,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !state.db.delete_movie(&id)? {
        return Err(ApiError::NotFound("Movie"));
    }
    Ok(StatusCode::NO_CONTENT)
}
