//! SQLite Storage
//! Mission: Persist accounts, movies and reviews

use crate::auth::account_store::AccountStore;
use crate::auth::models::{Account, Role};
use crate::auth::password::HashedCredential;
use crate::models::{Movie, Review, ReviewWithAuthor};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, types::Type, Connection, ErrorCode, OptionalExtension, Row, Transaction};
use std::collections::HashMap;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

const ACCOUNT_COLUMNS: &str =
    "id, email, password_hash, first_name, last_name, role, last_login, created_at, updated_at";

const MOVIE_COLUMNS: &str = "id, title, language, length, year, director, actors, plot, url, \
                             avg_rating, nr_of_ratings, created_at, updated_at";

const REVIEW_COLUMNS: &str = "id, movie_id, user_id, content, rating, created_at, updated_at";

/// SQLite-backed store for every resource
pub struct Database {
    db_path: String,
}

impl Database {
    /// Open (creating if needed) the database and its schema
    pub fn open(db_path: &str) -> Result<Self> {
        let db = Self {
            db_path: db_path.to_string(),
        };
        db.init_db()?;
        Ok(db)
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)
            .with_context(|| format!("Failed to open database at {}", self.db_path))?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    fn init_db(&self) -> Result<()> {
        let conn = self.connect()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user',
                last_login TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS movies (
                id TEXT PRIMARY KEY,
                title TEXT UNIQUE NOT NULL,
                language TEXT NOT NULL,
                length INTEGER NOT NULL,
                year INTEGER NOT NULL,
                director TEXT NOT NULL,
                actors TEXT NOT NULL,
                plot TEXT NOT NULL,
                url TEXT NOT NULL,
                avg_rating REAL NOT NULL DEFAULT 0,
                nr_of_ratings INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS reviews (
                id TEXT PRIMARY KEY,
                movie_id TEXT NOT NULL REFERENCES movies(id) ON DELETE CASCADE,
                user_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                content TEXT NOT NULL,
                rating REAL NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_reviews_movie ON reviews(movie_id);
            CREATE INDEX IF NOT EXISTS idx_reviews_user ON reviews(user_id);",
        )
        .context("Failed to create schema")?;

        info!("Database ready at {}", self.db_path);
        Ok(())
    }

    // ----- accounts -----

    /// All accounts, oldest first
    pub fn list_accounts(&self) -> Result<Vec<Account>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY created_at"
        ))?;

        let accounts = stmt
            .query_map([], account_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(accounts)
    }

    /// Number of accounts holding the admin role
    pub fn count_admins(&self) -> Result<i64> {
        let conn = self.connect()?;
        let count = conn
            .query_row(
                "SELECT COUNT(*) FROM accounts WHERE role = ?1",
                params![Role::Admin.as_str()],
                |row| row.get(0),
            )
            .context("Failed to count admin accounts")?;
        Ok(count)
    }

    /// Delete an account and its reviews. Returns false if it did not exist.
    pub fn delete_account(&self, id: &Uuid) -> Result<bool> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let touched = movies_reviewed_by(&tx, id)?;
        let rows = tx.execute("DELETE FROM accounts WHERE id = ?1", params![id.to_string()])?;
        for movie_id in &touched {
            recompute_rating(&tx, movie_id)?;
        }

        tx.commit()?;

        if rows > 0 {
            info!("Deleted account {} ({} movies re-rated)", id, touched.len());
        }
        Ok(rows > 0)
    }

    // ----- movies -----

    pub fn insert_movie(&self, movie: &Movie) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            &format!(
                "INSERT INTO movies ({MOVIE_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
            ),
            params![
                movie.id.to_string(),
                movie.title,
                movie.language,
                movie.length,
                movie.year,
                movie.director,
                movie.actors,
                movie.plot,
                movie.url,
                movie.avg_rating,
                movie.nr_of_ratings,
                movie.created_at.to_rfc3339(),
                movie.updated_at.to_rfc3339(),
            ],
        )
        .context("Failed to insert movie")?;
        Ok(())
    }

    /// Persist edited movie fields; ratings are owned by the review path
    pub fn update_movie(&self, movie: &Movie) -> Result<bool> {
        let conn = self.connect()?;
        let rows = conn
            .execute(
                "UPDATE movies SET title = ?2, language = ?3, length = ?4, year = ?5,
                        director = ?6, actors = ?7, plot = ?8, url = ?9, updated_at = ?10
                 WHERE id = ?1",
                params![
                    movie.id.to_string(),
                    movie.title,
                    movie.language,
                    movie.length,
                    movie.year,
                    movie.director,
                    movie.actors,
                    movie.plot,
                    movie.url,
                    movie.updated_at.to_rfc3339(),
                ],
            )
            .context("Failed to update movie")?;
        Ok(rows > 0)
    }

    pub fn find_movie(&self, id: &Uuid) -> Result<Option<Movie>> {
        let conn = self.connect()?;
        let movie = conn
            .query_row(
                &format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE id = ?1"),
                params![id.to_string()],
                movie_from_row,
            )
            .optional()?;
        Ok(movie)
    }

    pub fn find_movie_by_title(&self, title: &str) -> Result<Option<Movie>> {
        let conn = self.connect()?;
        let movie = conn
            .query_row(
                &format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE title = ?1"),
                params![title],
                movie_from_row,
            )
            .optional()?;
        Ok(movie)
    }

    pub fn list_movies(&self) -> Result<Vec<Movie>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies ORDER BY created_at"
        ))?;
        let movies = stmt
            .query_map([], movie_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(movies)
    }

    /// Delete a movie and, by cascade, its reviews
    pub fn delete_movie(&self, id: &Uuid) -> Result<bool> {
        let conn = self.connect()?;
        let rows = conn.execute("DELETE FROM movies WHERE id = ?1", params![id.to_string()])?;
        if rows > 0 {
            info!("Deleted movie {}", id);
        }
        Ok(rows > 0)
    }

    // ----- reviews -----

    /// Insert a review and refresh the movie's rating
    pub fn insert_review(&self, review: &Review) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        tx.execute(
            &format!("INSERT INTO reviews ({REVIEW_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
            params![
                review.id.to_string(),
                review.movie_id.to_string(),
                review.user_id.to_string(),
                review.content,
                review.rating,
                review.created_at.to_rfc3339(),
                review.updated_at.to_rfc3339(),
            ],
        )
        .context("Failed to insert review")?;
        recompute_rating(&tx, &review.movie_id)?;

        tx.commit()?;
        Ok(())
    }

    /// Persist new content/rating and refresh the movie's rating
    pub fn update_review(&self, review: &Review) -> Result<bool> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let rows = tx
            .execute(
                "UPDATE reviews SET content = ?2, rating = ?3, updated_at = ?4 WHERE id = ?1",
                params![
                    review.id.to_string(),
                    review.content,
                    review.rating,
                    review.updated_at.to_rfc3339(),
                ],
            )
            .context("Failed to update review")?;
        recompute_rating(&tx, &review.movie_id)?;

        tx.commit()?;
        Ok(rows > 0)
    }

    pub fn find_review(&self, id: &Uuid) -> Result<Option<Review>> {
        let conn = self.connect()?;
        let review = conn
            .query_row(
                &format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = ?1"),
                params![id.to_string()],
                review_from_row,
            )
            .optional()?;
        Ok(review)
    }

    /// Delete a review and refresh the movie's rating
    pub fn delete_review(&self, id: &Uuid) -> Result<bool> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let movie_id: Option<String> = tx
            .query_row(
                "SELECT movie_id FROM reviews WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        let Some(movie_id) = movie_id else {
            return Ok(false);
        };
        let movie_id = Uuid::parse_str(&movie_id).context("Corrupt movie id on review")?;

        tx.execute("DELETE FROM reviews WHERE id = ?1", params![id.to_string()])?;
        recompute_rating(&tx, &movie_id)?;

        tx.commit()?;
        Ok(true)
    }

    /// Reviews of one movie with author names, oldest first
    pub fn reviews_for_movie(&self, movie_id: &Uuid) -> Result<Vec<ReviewWithAuthor>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT r.id, r.movie_id, r.user_id, r.content, r.rating, r.created_at, r.updated_at,
                    a.first_name, a.last_name
             FROM reviews r JOIN accounts a ON a.id = r.user_id
             WHERE r.movie_id = ?1
             ORDER BY r.created_at",
        )?;
        let reviews = stmt
            .query_map(params![movie_id.to_string()], review_with_author_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reviews)
    }

    /// Every review grouped by movie id
    pub fn reviews_by_movie(&self) -> Result<HashMap<Uuid, Vec<ReviewWithAuthor>>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT r.id, r.movie_id, r.user_id, r.content, r.rating, r.created_at, r.updated_at,
                    a.first_name, a.last_name
             FROM reviews r JOIN accounts a ON a.id = r.user_id
             ORDER BY r.created_at",
        )?;

        let mut grouped: HashMap<Uuid, Vec<ReviewWithAuthor>> = HashMap::new();
        for review in stmt.query_map([], review_with_author_from_row)? {
            let review = review?;
            grouped
                .entry(review.review.movie_id)
                .or_default()
                .push(review);
        }
        Ok(grouped)
    }
}

impl AccountStore for Database {
    fn find_by_id(&self, id: &Uuid) -> Result<Option<Account>> {
        let conn = self.connect()?;
        let account = conn
            .query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
                params![id.to_string()],
                account_from_row,
            )
            .optional()?;
        Ok(account)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let conn = self.connect()?;
        let account = conn
            .query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = ?1"),
                params![email],
                account_from_row,
            )
            .optional()?;
        Ok(account)
    }

    fn save(&self, account: &Account) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            &format!(
                "INSERT INTO accounts ({ACCOUNT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(id) DO UPDATE SET
                    email = excluded.email,
                    password_hash = excluded.password_hash,
                    first_name = excluded.first_name,
                    last_name = excluded.last_name,
                    role = excluded.role,
                    last_login = excluded.last_login,
                    updated_at = excluded.updated_at"
            ),
            params![
                account.id.to_string(),
                account.email,
                account.password_hash.as_str(),
                account.first_name,
                account.last_name,
                account.role.as_str(),
                account.last_login.map(|t| t.to_rfc3339()),
                account.created_at.to_rfc3339(),
                account.updated_at.to_rfc3339(),
            ],
        )
        .context("Failed to save account")?;
        Ok(())
    }
}

/// True when a store error came from a UNIQUE constraint
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<rusqlite::Error>(),
            Some(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation
                    && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    })
}

fn movies_reviewed_by(tx: &Transaction<'_>, user_id: &Uuid) -> Result<Vec<Uuid>> {
    let mut stmt = tx.prepare("SELECT DISTINCT movie_id FROM reviews WHERE user_id = ?1")?;
    let ids = stmt
        .query_map(params![user_id.to_string()], |row| uuid_column(row, 0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

fn recompute_rating(tx: &Transaction<'_>, movie_id: &Uuid) -> Result<()> {
    tx.execute(
        "UPDATE movies SET
            avg_rating = COALESCE((SELECT AVG(rating) FROM reviews WHERE movie_id = ?1), 0),
            nr_of_ratings = (SELECT COUNT(*) FROM reviews WHERE movie_id = ?1)
         WHERE id = ?1",
        params![movie_id.to_string()],
    )
    .context("Failed to recompute movie rating")?;
    Ok(())
}

fn uuid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(idx, &raw)
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    let role_str: String = row.get(5)?;
    let role = Role::parse(&role_str)
        .ok_or_else(|| rusqlite::Error::InvalidColumnType(5, "role".to_string(), Type::Text))?;
    let last_login = row
        .get::<_, Option<String>>(6)?
        .map(|raw| parse_timestamp(6, &raw))
        .transpose()?;

    Ok(Account {
        id: uuid_column(row, 0)?,
        email: row.get(1)?,
        password_hash: HashedCredential::from_stored(row.get(2)?),
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        role,
        last_login,
        created_at: timestamp_column(row, 7)?,
        updated_at: timestamp_column(row, 8)?,
    })
}

fn movie_from_row(row: &Row<'_>) -> rusqlite::Result<Movie> {
    Ok(Movie {
        id: uuid_column(row, 0)?,
        title: row.get(1)?,
        language: row.get(2)?,
        length: row.get(3)?,
        year: row.get(4)?,
        director: row.get(5)?,
        actors: row.get(6)?,
        plot: row.get(7)?,
        url: row.get(8)?,
        avg_rating: row.get(9)?,
        nr_of_ratings: row.get(10)?,
        created_at: timestamp_column(row, 11)?,
        updated_at: timestamp_column(row, 12)?,
    })
}

fn review_from_row(row: &Row<'_>) -> rusqlite::Result<Review> {
    Ok(Review {
        id: uuid_column(row, 0)?,
        movie_id: uuid_column(row, 1)?,
        user_id: uuid_column(row, 2)?,
        content: row.get(3)?,
        rating: row.get(4)?,
        created_at: timestamp_column(row, 5)?,
        updated_at: timestamp_column(row, 6)?,
    })
}

fn review_with_author_from_row(row: &Row<'_>) -> rusqlite::Result<ReviewWithAuthor> {
    Ok(ReviewWithAuthor {
        review: review_from_row(row)?,
        author_first_name: row.get(7)?,
        author_last_name: row.get(8)?,
    })
}
