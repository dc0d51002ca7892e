//! DirectoryService — festival, concert and client records backed by
//! SQLite. All record access goes through here; handlers never touch the
//! pool directly. The service also hosts the two authorization-adjacent
//! pieces of the core: the client permission gate and the festival
//! filter engine.

use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::debug;

use crate::models::{
    client::{Client, InvalidPermissionError, Permission},
    concert::{Concert, NewConcert},
    festival::{Festival, NewFestival},
};
use crate::prices::{self, RangeError};

/// Criteria applied by [`DirectoryService::filter_festivals`]. Absent
/// fields do not constrain the result.
#[derive(Clone, Debug, Default)]
pub struct FestivalFilter {
    pub official: Option<bool>,
    pub name: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub genre: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub artist: Option<String>,
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("festival {0} not found")]
    FestivalNotFound(i64),
    #[error("concert {0} not found")]
    ConcertNotFound(i64),
    #[error("client `{0}` not found")]
    ClientNotFound(String),
    #[error("a festival named `{0}` already exists")]
    NameExists(String),
    #[error("a concert by `{0}` already exists")]
    ArtistExists(String),
    #[error(transparent)]
    InvalidPermission(#[from] InvalidPermissionError),
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

const FESTIVAL_COLUMNS: &str = "id, name, description, country, city, address, genre, prices, \
     owner_id, official, first_uploaded, last_modified";
const CONCERT_COLUMNS: &str =
    "id, festival_id, artist, stage, day, start_time, end_time, first_uploaded, last_modified";
const CLIENT_COLUMNS: &str = "id, name, read_access, write_access, delete_access, vote_access";

#[derive(Clone)]
pub struct DirectoryService {
    /// Shared SQLite connection pool used for all record operations.
    pub db: Arc<SqlitePool>,
}

impl DirectoryService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    // --- clients ---

    async fn client_by_name(&self, name: &str) -> DirectoryResult<Client> {
        sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE name = ?"
        ))
        .bind(name)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => DirectoryError::ClientNotFound(name.to_string()),
            other => DirectoryError::Sqlx(other),
        })
    }

    /// Creates a client with the default capability flags.
    ///
    /// Two requests can race to be the first to name a client; the unique
    /// constraint decides the winner and the loser re-reads the row.
    pub async fn create_client(&self, name: &str) -> DirectoryResult<Client> {
        let inserted = sqlx::query_as::<_, Client>(&format!(
            "INSERT INTO clients (name) VALUES (?) RETURNING {CLIENT_COLUMNS}"
        ))
        .bind(name)
        .fetch_one(&*self.db)
        .await;

        match inserted {
            Ok(client) => {
                debug!("created client `{}` with default permissions", name);
                Ok(client)
            }
            Err(err) if is_unique_violation(&err) => self.client_by_name(name).await,
            Err(err) => Err(err.into()),
        }
    }

    /// The permission gate: resolves (creating if absent) the named client
    /// and answers whether it holds `permission`.
    ///
    /// `permission` must be one of `read`, `write`, `delete`, `vote`;
    /// anything else is an [`InvalidPermissionError`], not a denial.
    pub async fn client_has_permission(
        &self,
        name: &str,
        permission: &str,
    ) -> DirectoryResult<bool> {
        let permission: Permission = permission.parse()?;

        let client = match self.client_by_name(name).await {
            Ok(client) => client,
            Err(DirectoryError::ClientNotFound(_)) => self.create_client(name).await?,
            Err(err) => return Err(err),
        };

        Ok(client.grants(permission))
    }

    // --- festivals ---

    pub async fn festival_by_id(&self, id: i64) -> DirectoryResult<Festival> {
        sqlx::query_as::<_, Festival>(&format!(
            "SELECT {FESTIVAL_COLUMNS} FROM festivals WHERE id = ?"
        ))
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => DirectoryError::FestivalNotFound(id),
            other => DirectoryError::Sqlx(other),
        })
    }

    pub async fn festival_name_exists(&self, name: &str) -> DirectoryResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM festivals WHERE name = ?")
            .bind(name)
            .fetch_one(&*self.db)
            .await?;
        Ok(count != 0)
    }

    pub async fn create_festival(&self, new: NewFestival) -> DirectoryResult<Festival> {
        let now = Utc::now();

        let inserted = sqlx::query_as::<_, Festival>(&format!(
            "INSERT INTO festivals (name, description, owner_id, official, first_uploaded, last_modified)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING {FESTIVAL_COLUMNS}"
        ))
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.owner_id)
        .bind(new.official)
        .bind(now)
        .bind(now)
        .fetch_one(&*self.db)
        .await;

        match inserted {
            Ok(festival) => Ok(festival),
            Err(err) if is_unique_violation(&err) => Err(DirectoryError::NameExists(new.name)),
            Err(err) => Err(err.into()),
        }
    }

    /// Persists the updatable festival fields and stamps `last_modified`.
    pub async fn save_festival(&self, festival: &Festival) -> DirectoryResult<()> {
        let result = sqlx::query(
            "UPDATE festivals
             SET name = ?, description = ?, country = ?, city = ?, address = ?,
                 genre = ?, prices = ?, official = ?, last_modified = ?
             WHERE id = ?",
        )
        .bind(&festival.name)
        .bind(&festival.description)
        .bind(&festival.country)
        .bind(&festival.city)
        .bind(&festival.address)
        .bind(&festival.genre)
        .bind(&festival.prices)
        .bind(festival.official)
        .bind(Utc::now())
        .bind(festival.id)
        .execute(&*self.db)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => {
                Err(DirectoryError::FestivalNotFound(festival.id))
            }
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(DirectoryError::NameExists(festival.name.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn delete_festival(&self, id: i64) -> DirectoryResult<()> {
        let result = sqlx::query("DELETE FROM festivals WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DirectoryError::FestivalNotFound(id));
        }

        Ok(())
    }

    /// All festivals in insertion order.
    pub async fn list_festivals(&self) -> DirectoryResult<Vec<Festival>> {
        Ok(sqlx::query_as::<_, Festival>(&format!(
            "SELECT {FESTIVAL_COLUMNS} FROM festivals ORDER BY id"
        ))
        .fetch_all(&*self.db)
        .await?)
    }

    /// Walks the directory in insertion order, applying every present
    /// criterion conjunctively, and returns the festivals that matched.
    ///
    /// `counter` caps the *scan*, not the result: it goes down once per
    /// visited candidate whether or not it matched, and the walk stops
    /// when it reaches zero.
    ///
    /// A malformed price range fails the whole call; it is never demoted
    /// to a non-match.
    pub async fn filter_festivals(
        &self,
        filter: &FestivalFilter,
        mut counter: i64,
    ) -> DirectoryResult<Vec<Festival>> {
        let mut matches = Vec::new();

        for festival in self.list_festivals().await? {
            if counter == 0 {
                break;
            }
            counter -= 1;

            if let Some(official) = filter.official {
                if official != festival.official {
                    continue;
                }
            }
            if let Some(name) = &filter.name {
                if !festival.name.contains(name.as_str()) {
                    continue;
                }
            }
            if let Some(country) = &filter.country {
                if !festival.country.contains(country.as_str()) {
                    continue;
                }
            }
            if let Some(city) = &filter.city {
                if !festival.city.contains(city.as_str()) {
                    continue;
                }
            }
            if let Some(genre) = &filter.genre {
                if !festival.genre.contains(genre.as_str()) {
                    continue;
                }
            }
            if filter.min_price.is_some() || filter.max_price.is_some() {
                let in_range = prices::price_in_range(
                    &festival.prices,
                    filter.min_price.as_deref(),
                    filter.max_price.as_deref(),
                )?;
                if !in_range {
                    continue;
                }
            }
            if let Some(artist) = &filter.artist {
                let artists = self.concert_artists(festival.id).await?;
                if !artists.iter().any(|name| name.contains(artist.as_str())) {
                    continue;
                }
            }

            matches.push(festival);
        }

        Ok(matches)
    }

    // --- concerts ---

    pub async fn concert_by_id(&self, id: i64) -> DirectoryResult<Concert> {
        sqlx::query_as::<_, Concert>(&format!(
            "SELECT {CONCERT_COLUMNS} FROM concerts WHERE id = ?"
        ))
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => DirectoryError::ConcertNotFound(id),
            other => DirectoryError::Sqlx(other),
        })
    }

    pub async fn concerts_for_festival(&self, festival_id: i64) -> DirectoryResult<Vec<Concert>> {
        Ok(sqlx::query_as::<_, Concert>(&format!(
            "SELECT {CONCERT_COLUMNS} FROM concerts WHERE festival_id = ? ORDER BY id"
        ))
        .bind(festival_id)
        .fetch_all(&*self.db)
        .await?)
    }

    async fn concert_artists(&self, festival_id: i64) -> DirectoryResult<Vec<String>> {
        Ok(
            sqlx::query_scalar("SELECT artist FROM concerts WHERE festival_id = ? ORDER BY id")
                .bind(festival_id)
                .fetch_all(&*self.db)
                .await?,
        )
    }

    pub async fn artist_exists(&self, artist: &str) -> DirectoryResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM concerts WHERE artist = ?")
            .bind(artist)
            .fetch_one(&*self.db)
            .await?;
        Ok(count != 0)
    }

    pub async fn create_concert(&self, new: NewConcert) -> DirectoryResult<Concert> {
        let now = Utc::now();

        let inserted = sqlx::query_as::<_, Concert>(&format!(
            "INSERT INTO concerts (festival_id, artist, stage, day, start_time, end_time, first_uploaded, last_modified)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {CONCERT_COLUMNS}"
        ))
        .bind(new.festival_id)
        .bind(&new.artist)
        .bind(new.stage)
        .bind(new.day)
        .bind(new.start)
        .bind(new.end)
        .bind(now)
        .bind(now)
        .fetch_one(&*self.db)
        .await;

        match inserted {
            Ok(concert) => Ok(concert),
            Err(err) if is_unique_violation(&err) => Err(DirectoryError::ArtistExists(new.artist)),
            Err(err) => Err(err.into()),
        }
    }

    /// Persists the updatable concert fields and stamps `last_modified`.
    pub async fn save_concert(&self, concert: &Concert) -> DirectoryResult<()> {
        let result = sqlx::query(
            "UPDATE concerts
             SET artist = ?, stage = ?, day = ?, start_time = ?, end_time = ?, last_modified = ?
             WHERE id = ?",
        )
        .bind(&concert.artist)
        .bind(concert.stage)
        .bind(concert.day)
        .bind(concert.start)
        .bind(concert.end)
        .bind(Utc::now())
        .bind(concert.id)
        .execute(&*self.db)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => {
                Err(DirectoryError::ConcertNotFound(concert.id))
            }
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(DirectoryError::ArtistExists(concert.artist.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn delete_concert(&self, id: i64) -> DirectoryResult<()> {
        let result = sqlx::query("DELETE FROM concerts WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DirectoryError::ConcertNotFound(id));
        }

        Ok(())
    }

    // --- votes & counts ---

    /// Records `user_id` in the festival's voter set and returns the new
    /// voter count. Voting twice with the same user changes nothing.
    pub async fn vote(&self, festival_id: i64, user_id: i64) -> DirectoryResult<i64> {
        sqlx::query("INSERT OR IGNORE INTO festival_voters (festival_id, user_id) VALUES (?, ?)")
            .bind(festival_id)
            .bind(user_id)
            .execute(&*self.db)
            .await?;

        self.voter_count(festival_id).await
    }

    pub async fn voter_count(&self, festival_id: i64) -> DirectoryResult<i64> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(*) FROM festival_voters WHERE festival_id = ?")
                .bind(festival_id)
                .fetch_one(&*self.db)
                .await?,
        )
    }

    pub async fn download_count(&self, festival_id: i64) -> DirectoryResult<i64> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(*) FROM festival_downloads WHERE festival_id = ?")
                .bind(festival_id)
                .fetch_one(&*self.db)
                .await?,
        )
    }

    /// Username of the user behind `user_id`, for serializing uploaders.
    pub async fn username_of(&self, user_id: i64) -> DirectoryResult<String> {
        Ok(sqlx::query_scalar("SELECT username FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_one(&*self.db)
            .await?)
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}
