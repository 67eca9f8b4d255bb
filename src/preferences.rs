//! Per-user listening signal.
//!
//! A [`PreferenceProfile`] is three counters: a weight per genre, a weight per
//! artist and a play count per song. Plays bump all three by one; explicit
//! likes and dislikes move a genre or artist weight by an arbitrary delta.
//!
//! Rankings are by descending weight. Equal weights keep the order in which
//! the key first picked up any signal, so the same history always produces
//! the same ranking.
//!
//! Genres are compared case-insensitively; the spelling seen first is the one
//! reported back.

use crate::error::{CatalogError, Result, StoreError};
use crate::models::{normalize_genre, ArtistId, SongId};
use crate::store::CatalogStore;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Weight change for an explicit "like".
pub const LIKE_DELTA: i64 = 3;
/// Weight change for an explicit "dislike".
pub const DISLIKE_DELTA: i64 = -3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct GenreWeight {
    label: String,
    weight: i64,
    first_seen: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ArtistWeight {
    weight: i64,
    first_seen: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceProfile {
    /// Keyed by lower-cased genre.
    genres: HashMap<String, GenreWeight>,
    artists: HashMap<ArtistId, ArtistWeight>,
    plays: HashMap<SongId, i64>,
    /// Next first-seen stamp, shared by genres and artists.
    next_seen: u64,
}

impl PreferenceProfile {
    fn stamp(&mut self) -> u64 {
        let seen = self.next_seen;
        self.next_seen += 1;
        seen
    }

    /// Weights saturate at the `i64` bounds.
    pub fn adjust_genre(&mut self, genre: &str, delta: i64) {
        let label = normalize_genre(genre);
        let key = label.to_lowercase();
        if !self.genres.contains_key(&key) {
            let first_seen = self.stamp();
            self.genres.insert(key.clone(), GenreWeight { label, weight: 0, first_seen });
        }
        if let Some(entry) = self.genres.get_mut(&key) {
            entry.weight = entry.weight.saturating_add(delta);
            trace!("Genre `{}' weight now {}.", entry.label, entry.weight);
        }
    }

    pub fn adjust_artist(&mut self, artist_id: ArtistId, delta: i64) {
        if !self.artists.contains_key(&artist_id) {
            let first_seen = self.stamp();
            self.artists.insert(artist_id, ArtistWeight { weight: 0, first_seen });
        }
        if let Some(entry) = self.artists.get_mut(&artist_id) {
            entry.weight = entry.weight.saturating_add(delta);
            trace!("Artist {artist_id} weight now {}.", entry.weight);
        }
    }

    fn count_play(&mut self, song_id: SongId) {
        let plays = self.plays.entry(song_id).or_default();
        *plays = plays.saturating_add(1);
    }

    pub fn genre_weight(&self, genre: &str) -> i64 {
        self.genres.get(&normalize_genre(genre).to_lowercase()).map_or(0, |g| g.weight)
    }

    pub fn artist_weight(&self, artist_id: ArtistId) -> i64 {
        self.artists.get(&artist_id).map_or(0, |a| a.weight)
    }

    pub fn play_count(&self, song_id: SongId) -> i64 {
        self.plays.get(&song_id).copied().unwrap_or(0)
    }

    pub fn total_plays(&self) -> i64 {
        self.plays.values().fold(0, |total, n| total.saturating_add(*n))
    }

    /// Every genre with any signal, heaviest first.
    pub fn top_genres(&self) -> Vec<(String, i64)> {
        let mut ranked: Vec<&GenreWeight> = self.genres.values().collect();
        ranked.sort_by(|a, b| b.weight.cmp(&a.weight).then(a.first_seen.cmp(&b.first_seen)));
        ranked.into_iter().map(|g| (g.label.clone(), g.weight)).collect()
    }

    /// Every artist with any signal, heaviest first.
    pub fn top_artists(&self) -> Vec<(ArtistId, i64)> {
        let mut ranked: Vec<(&ArtistId, &ArtistWeight)> = self.artists.iter().collect();
        ranked.sort_by(|(_, a), (_, b)| {
            b.weight.cmp(&a.weight).then(a.first_seen.cmp(&b.first_seen))
        });
        ranked.into_iter().map(|(id, a)| (*id, a.weight)).collect()
    }
}

/// All users' profiles. Owned by the caller and handed to whatever needs it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceTracker {
    profiles: HashMap<String, PreferenceProfile>,
}

impl PreferenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a tracker saved by [`PreferenceTracker::save`]. A missing file is
    /// an empty tracker.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!("No preferences at {}, starting fresh.", path.display());
            return Ok(Self::new());
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        debug!("Saved preferences for {} users to {}.", self.profiles.len(), path.display());
        Ok(())
    }

    pub fn profile(&self, user_id: &str) -> Option<&PreferenceProfile> {
        self.profiles.get(user_id)
    }

    fn profile_mut(&mut self, user_id: &str) -> &mut PreferenceProfile {
        self.profiles.entry(user_id.to_string()).or_default()
    }

    /// Counts one play of `song_id`, and one point each for its genre and
    /// artist as they are in `store` right now.
    pub fn try_record_play<S: CatalogStore>(
        &mut self,
        user_id: &str,
        song_id: SongId,
        store: &S,
    ) -> Result<()> {
        let song = store.song(song_id)?.ok_or_else(|| CatalogError::not_found("song", song_id))?;

        let profile = self.profile_mut(user_id);
        profile.count_play(song.id);
        profile.adjust_genre(&song.genre, 1);
        profile.adjust_artist(song.artist_id, 1);
        trace!("User `{user_id}' played song {song_id} ({} plays).", profile.play_count(song_id));
        Ok(())
    }

    /// Returns `false` and changes nothing if the song is not in `store`.
    pub fn record_play<S: CatalogStore>(
        &mut self,
        user_id: &str,
        song_id: SongId,
        store: &S,
    ) -> bool {
        match self.try_record_play(user_id, song_id, store) {
            Ok(()) => true,
            Err(err) => {
                warn!("record_play rejected: {err}");
                false
            }
        }
    }

    pub fn update_genre_preference(&mut self, user_id: &str, genre: &str, delta: i64) {
        self.profile_mut(user_id).adjust_genre(genre, delta);
    }

    pub fn update_artist_preference(&mut self, user_id: &str, artist_id: ArtistId, delta: i64) {
        self.profile_mut(user_id).adjust_artist(artist_id, delta);
    }

    pub fn top_genres(&self, user_id: &str) -> Vec<(String, i64)> {
        self.profile(user_id).map(PreferenceProfile::top_genres).unwrap_or_default()
    }

    pub fn top_artists(&self, user_id: &str) -> Vec<(ArtistId, i64)> {
        self.profile(user_id).map(PreferenceProfile::top_artists).unwrap_or_default()
    }

    pub fn play_count(&self, user_id: &str, song_id: SongId) -> i64 {
        self.profile(user_id).map_or(0, |p| p.play_count(song_id))
    }
}
