use crate::api::{error::ApiError, validate::require_non_empty, AppState};
use crate::auth::{
    account_store::AccountStore,
    extract::{AdminCaller, Authenticated},
};
use crate::models::{
    valid_rating, CreateReviewRequest, Review, ReviewWithAuthor, UpdateReviewRequest, MAX_RATING,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

fn check_review(content: &str, rating: f64) -> Result<(), ApiError> {
    require_non_empty("review", content)?;
    if !valid_rating(rating) {
        return Err(ApiError::Validation(format!(
            "rating must be between 0 and {MAX_RATING}"
        )));
    }
    Ok(())
}

/// POST /reviews - the body's `userId` must be the caller
pub async fn create_review(
    caller: Authenticated,
    State(state): State<AppState>,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    state
        .owners
        .require_owner(Some(&caller.authorization), payload.user_id)
        .into_result()?;

    check_review(&payload.review, payload.rating)?;

    if state.db.find_by_id(&payload.user_id)?.is_none() {
        return Err(ApiError::NotFound("Account"));
    }
    if state.db.find_movie(&payload.movie_id)?.is_none() {
        return Err(ApiError::NotFound("Movie"));
    }

    let review = Review::new(
        payload.movie_id,
        payload.user_id,
        payload.review.trim().to_string(),
        payload.rating,
    );
    state.db.insert_review(&review)?;

    info!(
        "Review {} added to movie {} by {}",
        review.id, review.movie_id, review.user_id
    );
    Ok((StatusCode::CREATED, Json(review)))
}

/// GET /reviews/:id - reviews of movie `:id`
pub async fn reviews_for_movie(
    _caller: Authenticated,
    State(state): State<AppState>,
    Path(movie_id): Path<Uuid>,
) -> Result<Json<Vec<ReviewWithAuthor>>, ApiError> {
    Ok(Json(state.db.reviews_for_movie(&movie_id)?))
}

/// PUT /reviews/:id - author only
pub async fn update_review(
    caller: Authenticated,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateReviewRequest>,
) -> Result<Json<Review>, ApiError> {
    let mut review = state
        .db
        .find_review(&id)?
        .ok_or(ApiError::NotFound("Review"))?;

    state
        .owners
        .require_owner(Some(&caller.authorization), review.user_id)
        .into_result()?;

    check_review(&payload.review, payload.rating)?;

    review.content = payload.review.trim().to_string();
    review.rating = payload.rating;
    review.updated_at = Utc::now();

    if !state.db.update_review(&review)? {
        return Err(ApiError::NotFound("Review"));
    }

    info!("Updated review {}", review.id);
    Ok(Json(review))
}

/// DELETE /reviews/:id - admin only
pub async fn delete_review(
    _admin: AdminCaller,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !state.db.delete_review(&id)? {
        return Err(ApiError::NotFound("Review"));
    }
    Ok(StatusCode::NO_CONTENT)
}
