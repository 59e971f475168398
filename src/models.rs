use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Highest rating a review may give
pub const MAX_RATING: f64 = 10.0;

/// A movie in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: Uuid,
    pub title: String,
    pub language: String,
    pub length: i64, // minutes
    pub year: i64,
    pub director: String,
    pub actors: String,
    pub plot: String,
    pub url: String,
    pub avg_rating: f64,
    pub nr_of_ratings: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Movie {
    pub fn new(details: MovieDetails) -> Self {
        let now = Utc::now();
        let mut movie = Self {
            id: Uuid::new_v4(),
            title: String::new(),
            language: String::new(),
            length: 0,
            year: 0,
            director: String::new(),
            actors: String::new(),
            plot: String::new(),
            url: String::new(),
            avg_rating: 0.0,
            nr_of_ratings: 0,
            created_at: now,
            updated_at: now,
        };
        movie.apply(details);
        movie
    }

    /// Overwrite the editable fields
    pub fn apply(&mut self, details: MovieDetails) {
        self.title = details.title.trim().to_string();
        self.language = details.language;
        self.length = details.length;
        self.year = details.year;
        self.director = details.director;
        self.actors = details.actors;
        self.plot = details.plot;
        self.url = details.url;
        self.updated_at = Utc::now();
    }
}

/// Movie body for create and update
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieDetails {
    pub title: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub length: i64,
    #[serde(default)]
    pub year: i64,
    #[serde(default)]
    pub director: String,
    #[serde(default)]
    pub actors: String,
    #[serde(default)]
    pub plot: String,
    #[serde(default)]
    pub url: String,
}

/// Movie with its reviews, as listed to clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieWithReviews {
    #[serde(flatten)]
    pub movie: Movie,
    pub reviews: Vec<ReviewWithAuthor>,
}

/// A review of a movie by an account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub movie_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub rating: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    pub fn new(movie_id: Uuid, user_id: Uuid, content: String, rating: f64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            movie_id,
            user_id,
            content,
            rating,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Review joined with its author's display name
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewWithAuthor {
    #[serde(flatten)]
    pub review: Review,
    pub author_first_name: String,
    pub author_last_name: String,
}

/// Review creation body; `userId` must be the caller
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub movie_id: Uuid,
    pub user_id: Uuid,
    pub review: String,
    pub rating: f64,
}

/// Review update body
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateReviewRequest {
    pub review: String,
    pub rating: f64,
}

/// Ratings must be finite and within `0..=MAX_RATING`
pub fn valid_rating(rating: f64) -> bool {
    rating.is_finite() && (0.0..=MAX_RATING).contains(&rating)
}
