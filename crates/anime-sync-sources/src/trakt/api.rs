use anime_sync_models::{timestamp, MediaKind, WatchProgress, WatchedItem};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::error::SourceError;
use crate::trakt::TraktSession;

const API_BASE: &str = "https://api.trakt.tv";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraktIds {
    pub trakt: Option<u64>,
    pub slug: Option<String>,
    pub imdb: Option<String>,
    pub tmdb: Option<u32>,
    pub tvdb: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TraktMedia {
    title: String,
    year: Option<u32>,
    ids: TraktIds,
}

#[derive(Debug, Serialize, Deserialize)]
struct TraktWatchedEpisode {
    number: u32,
    #[serde(default)]
    plays: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct TraktWatchedSeason {
    number: u32,
    #[serde(default)]
    episodes: Vec<TraktWatchedEpisode>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TraktWatchedShow {
    #[serde(default)]
    last_updated_at: Option<String>,
    show: TraktMedia,
    #[serde(default)]
    seasons: Vec<TraktWatchedSeason>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TraktWatchedMovie {
    #[serde(default)]
    plays: u32,
    #[serde(default)]
    last_updated_at: Option<String>,
    movie: TraktMedia,
}

#[derive(Debug, Serialize, Deserialize)]
struct TraktSummary {
    #[serde(default)]
    genres: Option<Vec<String>>,
}

fn with_trakt_headers(builder: RequestBuilder, session: &TraktSession) -> RequestBuilder {
    with_token_headers(builder, &session.access_token, &session.client_id)
}

fn with_token_headers(builder: RequestBuilder, access_token: &str, client_id: &str) -> RequestBuilder {
    builder
        .header("Authorization", format!("Bearer {}", access_token))
        .header("trakt-api-version", "2")
        .header("trakt-api-key", client_id) // Required for authenticated requests
        .header("Accept", "application/json")
        .header("Accept-Language", "en-US,en;q=0.9")
        .header("Content-Type", "application/json")
        .header("Origin", "https://trakt.tv")
        .header("Referer", "https://trakt.tv/")
}

async fn ensure_success(response: Response, what: &str) -> Result<Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response.text().await.unwrap_or_default();
    Err(SourceError::from_status(what, status.as_u16(), error_text))
}

/// Get encoded username from Trakt API
pub async fn get_encoded_username(
    client: &Client,
    access_token: &str,
    client_id: &str,
) -> Result<String, SourceError> {
    let request = client.get(format!("{}/users/me", API_BASE));
    let response = with_token_headers(request, access_token, client_id).send().await?;
    let response = ensure_success(response, "user lookup").await?;

    let json: serde_json::Value = response.json().await?;
    let username_slug = json["ids"]["slug"]
        .as_str()
        .ok_or_else(|| SourceError::Decode("missing username slug".to_string()))?;

    Ok(urlencoding::encode(username_slug).to_string())
}

/// Fetch every watched show with per-season episode plays
pub async fn get_watched_shows(client: &Client, session: &TraktSession) -> Result<Vec<WatchedItem>, SourceError> {
    let url = format!("{}/users/{}/watched/shows", API_BASE, session.encoded_username);
    let response = with_trakt_headers(client.get(&url), session).send().await?;
    let response = ensure_success(response, "watched shows").await?;

    let shows: Vec<TraktWatchedShow> = response.json().await?;
    let total = shows.len();
    let items: Vec<WatchedItem> = shows.into_iter().filter_map(watched_show_to_item).collect();
    debug!("Trakt watched shows: {} returned, {} usable", total, items.len());
    Ok(items)
}

pub async fn get_watched_movies(client: &Client, session: &TraktSession) -> Result<Vec<WatchedItem>, SourceError> {
    let url = format!("{}/users/{}/watched/movies", API_BASE, session.encoded_username);
    let response = with_trakt_headers(client.get(&url), session).send().await?;
    let response = ensure_success(response, "watched movies").await?;

    let movies: Vec<TraktWatchedMovie> = response.json().await?;
    let total = movies.len();
    let items: Vec<WatchedItem> = movies.into_iter().filter_map(watched_movie_to_item).collect();
    debug!("Trakt watched movies: {} returned, {} usable", total, items.len());
    Ok(items)
}

/// Genres from the extended summary of a show or movie. A missing `genres`
/// field comes back as an empty list.
pub async fn get_genres(
    client: &Client,
    session: &TraktSession,
    kind: MediaKind,
    slug: &str,
) -> Result<Vec<String>, SourceError> {
    let url = format!(
        "{}/{}/{}?extended=full",
        API_BASE,
        kind.plural(),
        urlencoding::encode(slug)
    );
    let response = with_trakt_headers(client.get(&url), session).send().await?;
    let response = ensure_success(response, "item summary").await?;

    let summary: TraktSummary = response.json().await?;
    Ok(summary.genres.unwrap_or_default())
}

fn watched_show_to_item(watched: TraktWatchedShow) -> Option<WatchedItem> {
    let Some(slug) = watched.show.ids.slug.clone() else {
        debug!("Trakt watched shows: skipping '{}' without slug", watched.show.title);
        return None;
    };

    let mut seasons: BTreeMap<u32, BTreeSet<u32>> = BTreeMap::new();
    for season in watched.seasons {
        let episodes: BTreeSet<u32> = season
            .episodes
            .iter()
            .filter(|ep| ep.plays > 0)
            .map(|ep| ep.number)
            .collect();
        if !episodes.is_empty() {
            seasons.entry(season.number).or_default().extend(episodes);
        }
    }

    Some(WatchedItem {
        external_id: slug,
        title: watched.show.title,
        cross_ref_id: watched.show.ids.tvdb.map(|id| id.to_string()),
        last_updated_at: watched.last_updated_at.as_deref().and_then(timestamp::parse),
        progress: WatchProgress::Show { seasons },
    })
}

fn watched_movie_to_item(watched: TraktWatchedMovie) -> Option<WatchedItem> {
    let Some(slug) = watched.movie.ids.slug.clone() else {
        debug!("Trakt watched movies: skipping '{}' without slug", watched.movie.title);
        return None;
    };

    Some(WatchedItem {
        external_id: slug,
        title: watched.movie.title,
        cross_ref_id: watched.movie.ids.tmdb.map(|id| id.to_string()),
        last_updated_at: watched.last_updated_at.as_deref().and_then(timestamp::parse),
        progress: WatchProgress::Movie {
            watched: watched.plays > 0,
        },
    })
}
