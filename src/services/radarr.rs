//! Radarr v3 API client used to remove matched movies from the library
//!
//! Radarr identifies movies by numeric id, so a folder name is first resolved
//! against the full movie list: by folder name on disk, then by normalized
//! title and year.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::text_utils::{normalize_title, split_title_year};

#[derive(Debug, thiserror::Error)]
pub enum DeletionError {
    #[error("Radarr request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Radarr returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("no Radarr movie matches '{0}'")]
    NotFound(String),
}

/// External catalog that can drop a title
#[async_trait]
pub trait LibraryManager: Send + Sync {
    /// Resolve `movie_name` to a catalog entry and delete it
    async fn delete_title(&self, movie_name: &str) -> Result<(), DeletionError>;
}

#[derive(Debug, Clone)]
pub struct RadarrConfig {
    pub url: String,
    pub api_key: String,
    /// Also remove the movie files from disk
    pub delete_files: bool,
    pub timeout_seconds: u64,
}

/// Movie resource as returned by `GET /api/v3/movie` (only the fields we use)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadarrMovie {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub folder_name: Option<String>,
}

impl RadarrMovie {
    /// Last component of the movie folder on disk
    fn folder(&self) -> Option<&str> {
        self.path
            .as_deref()
            .or(self.folder_name.as_deref())
            .map(|p| p.trim_end_matches(['/', '\\']))
            .and_then(|p| p.rsplit(['/', '\\']).next())
            .filter(|f| !f.is_empty())
    }
}

pub struct RadarrClient {
    client: reqwest::Client,
    config: RadarrConfig,
}

impl RadarrClient {
    pub fn new(config: RadarrConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v3/{}", self.config.url.trim_end_matches('/'), path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, DeletionError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(DeletionError::Status { status, body })
    }

    /// Fetch every movie known to Radarr
    pub async fn movies(&self) -> Result<Vec<RadarrMovie>, DeletionError> {
        let response = self
            .client
            .get(self.endpoint("movie"))
            .header("X-Api-Key", &self.config.api_key)
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    pub async fn delete_movie(&self, id: i64) -> Result<(), DeletionError> {
        let delete_files = if self.config.delete_files { "true" } else { "false" };
        let response = self
            .client
            .delete(self.endpoint(&format!("movie/{id}")))
            .header("X-Api-Key", &self.config.api_key)
            .query(&[
                ("deleteFiles", delete_files),
                ("addImportExclusion", "false"),
            ])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

/// Pick the Radarr movie that corresponds to a folder name
pub fn find_movie<'a>(movies: &'a [RadarrMovie], folder_name: &str) -> Option<&'a RadarrMovie> {
    if let Some(movie) = movies
        .iter()
        .find(|m| m.folder().is_some_and(|f| f.eq_ignore_ascii_case(folder_name)))
    {
        return Some(movie);
    }

    let (title, year) = split_title_year(folder_name);
    let mut by_title = movies.iter().filter(|m| normalize_title(&m.title) == title);
    match year {
        Some(year) => by_title.find(|m| m.year == Some(year)),
        None => {
            // Without a year the title alone must be unambiguous
            let first = by_title.next()?;
            by_title.next().is_none().then_some(first)
        }
    }
}

#[async_trait]
impl LibraryManager for RadarrClient {
    async fn delete_title(&self, movie_name: &str) -> Result<(), DeletionError> {
        let movies = self.movies().await?;
        let movie = find_movie(&movies, movie_name)
            .ok_or_else(|| DeletionError::NotFound(movie_name.to_string()))?;

        debug!(movie = %movie_name, radarr_id = movie.id, title = %movie.title, "Resolved Radarr movie");
        self.delete_movie(movie.id).await?;

        info!(
            movie = %movie_name,
            radarr_id = movie.id,
            delete_files = self.config.delete_files,
            "Deleted movie from Radarr"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: i64, title: &str, year: i32, path: &str) -> RadarrMovie {
        RadarrMovie {
            id,
            title: title.to_string(),
            year: Some(year),
            path: Some(path.to_string()),
            folder_name: None,
        }
    }

    fn library() -> Vec<RadarrMovie> {
        vec![
            movie(1, "Inception", 2010, "/movies/Inception (2010)"),
            movie(2, "Pathaan", 2023, "/movies/Pathaan.2023/"),
            movie(3, "Don", 1978, "/movies/Don (1978)"),
            movie(4, "Don", 2006, "/movies/Don (2006)"),
        ]
    }

    #[test]
    fn test_match_by_folder() {
        let movies = library();
        assert_eq!(find_movie(&movies, "Pathaan.2023").map(|m| m.id), Some(2));
        assert_eq!(find_movie(&movies, "inception (2010)").map(|m| m.id), Some(1));
    }

    #[test]
    fn test_match_by_title_and_year() {
        let movies = library();
        assert_eq!(find_movie(&movies, "Don.2006.1080p").map(|m| m.id), Some(4));
        assert_eq!(find_movie(&movies, "Inception.2010").map(|m| m.id), Some(1));
    }

    #[test]
    fn test_ambiguous_title_without_year() {
        let movies = library();
        assert!(find_movie(&movies, "Don").is_none());
        assert_eq!(find_movie(&movies, "Pathaan").map(|m| m.id), Some(2));
    }

    #[test]
    fn test_no_match() {
        assert!(find_movie(&library(), "Lagaan.2001").is_none());
    }

    #[test]
    fn test_folder_from_windows_path() {
        let m = movie(9, "RRR", 2022, "D:\\Movies\\RRR (2022)");
        assert_eq!(m.folder(), Some("RRR (2022)"));
    }
}
