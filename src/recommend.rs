//! Recommendations derived from a user's profile and the current catalog.
//!
//! Nothing here mutates the tracker or the store. Only positive weights count
//! as interest; a disliked genre or artist never drives a suggestion.

use crate::error::Result;
use crate::models::{normalize_genre, Album, AlbumId, Artist, ArtistId, Song, SongId};
use crate::preferences::PreferenceTracker;
use crate::store::CatalogStore;
use log::{trace, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendConfig {
    /// Result count used by front ends when the caller gives none.
    pub default_limit: usize,
    /// How many of the user's heaviest artists are left out of discovery.
    pub dominant_artists: usize,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self { default_limit: 10, dominant_artists: 3 }
    }
}

pub struct Recommender<'a, S: CatalogStore> {
    tracker: &'a PreferenceTracker,
    store: &'a S,
    config: RecommendConfig,
}

impl<'a, S: CatalogStore> Recommender<'a, S> {
    pub fn new(tracker: &'a PreferenceTracker, store: &'a S) -> Self {
        Self::with_config(tracker, store, RecommendConfig::default())
    }

    pub fn with_config(
        tracker: &'a PreferenceTracker,
        store: &'a S,
        config: RecommendConfig,
    ) -> Self {
        Self { tracker, store, config }
    }

    fn liked_genres(&self, user_id: &str) -> Vec<(String, i64)> {
        let mut genres = self.tracker.top_genres(user_id);
        genres.retain(|(_, weight)| *weight > 0);
        genres
    }

    fn liked_artists(&self, user_id: &str) -> Vec<(ArtistId, i64)> {
        let mut artists = self.tracker.top_artists(user_id);
        artists.retain(|(_, weight)| *weight > 0);
        artists
    }

    /// Songs from the user's liked genres, heaviest genre first and catalog
    /// order within a genre.
    pub fn try_recommend_songs_by_genre(&self, user_id: &str, limit: usize) -> Result<Vec<Song>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let genres = self.liked_genres(user_id);
        if genres.is_empty() {
            return Ok(Vec::new());
        }

        let songs = self.store.songs()?;
        let mut seen: HashSet<SongId> = HashSet::new();
        let mut picked = Vec::new();

        'genres: for (genre, weight) in &genres {
            let key = genre.to_lowercase();
            trace!("Collecting songs for genre `{genre}' (weight {weight}).");
            for song in songs.iter().filter(|s| normalize_genre(&s.genre).to_lowercase() == key) {
                if seen.insert(song.id) {
                    picked.push(song.clone());
                    if picked.len() == limit {
                        break 'genres;
                    }
                }
            }
        }
        Ok(picked)
    }

    pub fn recommend_songs_by_genre(&self, user_id: &str, limit: usize) -> Vec<Song> {
        self.try_recommend_songs_by_genre(user_id, limit).unwrap_or_else(|err| {
            warn!("recommend_songs_by_genre failed: {err}");
            Vec::new()
        })
    }

    /// Albums by the user's liked artists, heaviest artist first.
    pub fn try_recommend_albums_by_artist(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Album>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut seen: HashSet<AlbumId> = HashSet::new();
        let mut picked = Vec::new();

        for (artist_id, weight) in self.liked_artists(user_id) {
            trace!("Collecting albums for artist {artist_id} (weight {weight}).");
            for album in self.store.albums_by_artist(artist_id)? {
                if seen.insert(album.id) {
                    picked.push(album);
                    if picked.len() == limit {
                        return Ok(picked);
                    }
                }
            }
        }
        Ok(picked)
    }

    pub fn recommend_albums_by_artist(&self, user_id: &str, limit: usize) -> Vec<Album> {
        self.try_recommend_albums_by_artist(user_id, limit).unwrap_or_else(|err| {
            warn!("recommend_albums_by_artist failed: {err}");
            Vec::new()
        })
    }

    /// Artists the user does not already favour, ranked by how well their
    /// songs' genres match the user's liked genres.
    ///
    /// The first `dominant_artists` liked artists and every disliked artist
    /// are left out.
    pub fn try_recommend_artists(&self, user_id: &str, limit: usize) -> Result<Vec<Artist>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut excluded: HashSet<ArtistId> = self
            .liked_artists(user_id)
            .into_iter()
            .take(self.config.dominant_artists)
            .map(|(id, _)| id)
            .collect();
        excluded.extend(
            self.tracker
                .top_artists(user_id)
                .into_iter()
                .filter(|(_, weight)| *weight < 0)
                .map(|(id, _)| id),
        );

        let genre_weights: HashMap<String, i64> = self
            .liked_genres(user_id)
            .into_iter()
            .map(|(genre, weight)| (genre.to_lowercase(), weight))
            .collect();

        let mut affinity: HashMap<ArtistId, i64> = HashMap::new();
        for song in self.store.songs()? {
            let key = normalize_genre(&song.genre).to_lowercase();
            if let Some(weight) = genre_weights.get(&key) {
                let score = affinity.entry(song.artist_id).or_default();
                *score = score.saturating_add(*weight);
            }
        }

        let mut candidates: Vec<Artist> =
            self.store.artists()?.into_iter().filter(|a| !excluded.contains(&a.id)).collect();
        // Stable, so equal affinity stays in catalog order.
        candidates.sort_by_key(|a| std::cmp::Reverse(affinity.get(&a.id).copied().unwrap_or(0)));
        candidates.truncate(limit);
        Ok(candidates)
    }

    pub fn recommend_artists(&self, user_id: &str, limit: usize) -> Vec<Artist> {
        self.try_recommend_artists(user_id, limit).unwrap_or_else(|err| {
            warn!("recommend_artists failed: {err}");
            Vec::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::db::SqliteStore;
    use crate::preferences::{DISLIKE_DELTA, LIKE_DELTA};
    use crate::store::MemoryStore;

    const USER: &str = "listener";

    struct Fixture {
        catalog: Catalog<MemoryStore>,
        artists: Vec<ArtistId>,
    }

    /// Four artists, each with one album and two songs:
    /// Rock, Jazz, Rock/Jazz mix, Ambient.
    fn fixture() -> Fixture {
        let mut catalog = Catalog::new(MemoryStore::new());
        let mut artists = Vec::new();
        let layout = [
            ("Rockers", "Rock", "Rock"),
            ("Jazzers", "Jazz", "Jazz"),
            ("Mixers", "Rock", "Jazz"),
            ("Drifters", "Ambient", "Ambient"),
        ];
        for (name, first, second) in layout {
            let artist = catalog.add_artist(name, None).unwrap();
            let album = catalog.add_album(&format!("{name} LP"), artist, 2001, first).unwrap();
            let a = catalog.add_song(&format!("{name} one"), artist, 120, first).unwrap();
            let b = catalog.add_song(&format!("{name} two"), artist, 240, second).unwrap();
            assert!(catalog.add_song_to_album(a, album));
            assert!(catalog.add_song_to_album(b, album));
            artists.push(artist);
        }
        Fixture { catalog, artists }
    }

    #[test]
    fn test_songs_come_only_from_liked_genres_without_duplicates() {
        let fx = fixture();
        let mut tracker = PreferenceTracker::new();
        tracker.update_genre_preference(USER, "rock", 5);
        tracker.update_genre_preference(USER, "Jazz", 2);
        tracker.update_genre_preference(USER, "Ambient", DISLIKE_DELTA);

        let recommender = Recommender::new(&tracker, fx.catalog.store());
        let songs = recommender.recommend_songs_by_genre(USER, 100);
        let names: Vec<&str> = songs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Rockers one",
                "Rockers two",
                "Mixers one",
                "Jazzers one",
                "Jazzers two",
                "Mixers two",
            ]
        );

        let unique: HashSet<SongId> = songs.iter().map(|s| s.id).collect();
        assert_eq!(unique.len(), songs.len());
    }

    #[test]
    fn test_song_limit_is_respected() {
        let fx = fixture();
        let mut tracker = PreferenceTracker::new();
        tracker.update_genre_preference(USER, "Rock", 1);
        tracker.update_genre_preference(USER, "Jazz", 1);
        let recommender = Recommender::new(&tracker, fx.catalog.store());

        for k in 0..8 {
            let songs = recommender.recommend_songs_by_genre(USER, k);
            assert!(songs.len() <= k);
            assert!(songs.iter().all(|s| s.genre == "Rock" || s.genre == "Jazz"));
        }
        assert!(recommender.recommend_songs_by_genre(USER, 0).is_empty());
    }

    #[test]
    fn test_unknown_user_gets_nothing_but_discovery() {
        let fx = fixture();
        let tracker = PreferenceTracker::new();
        let recommender = Recommender::new(&tracker, fx.catalog.store());

        assert!(recommender.recommend_songs_by_genre("nobody", 5).is_empty());
        assert!(recommender.recommend_albums_by_artist("nobody", 5).is_empty());
        assert_eq!(recommender.recommend_artists("nobody", 10).len(), 4);
    }

    #[test]
    fn test_albums_follow_artist_weight() {
        let fx = fixture();
        let mut tracker = PreferenceTracker::new();
        tracker.update_artist_preference(USER, fx.artists[2], LIKE_DELTA);
        tracker.update_artist_preference(USER, fx.artists[0], 1);
        tracker.update_artist_preference(USER, fx.artists[1], DISLIKE_DELTA);

        let recommender = Recommender::new(&tracker, fx.catalog.store());
        let albums = recommender.recommend_albums_by_artist(USER, 10);
        let names: Vec<&str> = albums.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Mixers LP", "Rockers LP"]);

        assert_eq!(recommender.recommend_albums_by_artist(USER, 1).len(), 1);
    }

    #[test]
    fn test_play_history_drives_recommendations() {
        let fx = fixture();
        let store = fx.catalog.store();
        let jazz_song = store.songs_by_artist(fx.artists[1]).unwrap()[0].id;
        let mut tracker = PreferenceTracker::new();
        for _ in 0..3 {
            assert!(tracker.record_play(USER, jazz_song, store));
        }

        let songs = Recommender::new(&tracker, store).recommend_songs_by_genre(USER, 2);
        assert_eq!(songs.len(), 2);
        assert!(songs.iter().all(|s| s.genre == "Jazz"));
    }

    #[test]
    fn test_discovery_skips_dominant_and_disliked_artists() {
        let fx = fixture();
        let mut tracker = PreferenceTracker::new();
        tracker.update_artist_preference(USER, fx.artists[0], 10);
        tracker.update_artist_preference(USER, fx.artists[3], DISLIKE_DELTA);
        tracker.update_genre_preference(USER, "Jazz", 4);

        let config = RecommendConfig { dominant_artists: 1, ..RecommendConfig::default() };
        let recommender = Recommender::with_config(&tracker, fx.catalog.store(), config);
        let artists = recommender.recommend_artists(USER, 10);
        let ids: Vec<ArtistId> = artists.iter().map(|a| a.id).collect();

        // Jazzers have two jazz songs, Mixers one.
        assert_eq!(ids, vec![fx.artists[1], fx.artists[2]]);
        assert_eq!(recommender.recommend_artists(USER, 1).len(), 1);
        assert!(recommender.recommend_artists(USER, 0).is_empty());
    }

    #[test]
    fn test_discovery_ties_keep_catalog_order() {
        let fx = fixture();
        let tracker = PreferenceTracker::new();
        let artists = Recommender::new(&tracker, fx.catalog.store()).recommend_artists(USER, 3);
        let ids: Vec<ArtistId> = artists.iter().map(|a| a.id).collect();
        assert_eq!(ids, fx.artists[..3].to_vec());
    }

    #[test]
    fn test_discovery_affinity_saturates() {
        let fx = fixture();
        let mut tracker = PreferenceTracker::new();
        tracker.update_genre_preference(USER, "Jazz", i64::MAX / 2 + 1);

        let artists = Recommender::new(&tracker, fx.catalog.store()).recommend_artists(USER, 4);
        let ids: Vec<ArtistId> = artists.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![fx.artists[1], fx.artists[2], fx.artists[0], fx.artists[3]]);
    }

    #[test]
    fn test_recommendations_against_sqlite() {
        let mut catalog = Catalog::new(SqliteStore::open_in_memory().unwrap());
        let artist = catalog.add_artist("Low", None).unwrap();
        catalog.add_album("Things We Lost", artist, 2001, "Slowcore").unwrap();
        let song = catalog.add_song("Sunflower", artist, 300, "Slowcore").unwrap();

        let mut tracker = PreferenceTracker::new();
        assert!(tracker.record_play(USER, song, catalog.store()));

        let recommender = Recommender::new(&tracker, catalog.store());
        assert_eq!(recommender.recommend_songs_by_genre(USER, 5)[0].id, song);
        assert_eq!(recommender.recommend_albums_by_artist(USER, 5).len(), 1);
        assert!(recommender.recommend_artists(USER, 5).is_empty());
    }
}
