//! Catalog storage port.
//!
//! [`CatalogStore`] is everything the rest of the crate needs from a
//! persistence backend: per-entity insert / lookup / list / update / delete,
//! playlist membership primitives and an all-or-nothing [`atomically`] hook.
//! The relationship reads (`songs_by_album`, `search_by_name`, ...) come with
//! default implementations built on the primitives; backends may override them
//! with something faster.
//!
//! Listing methods return entities in id order, which is also creation order.
//!
//! [`atomically`]: CatalogStore::atomically

use crate::error::StoreError;
use crate::models::{
    name_matches, Album, AlbumId, Artist, ArtistId, NewAlbum, NewArtist, NewPlaylist, NewSong,
    Playlist, PlaylistId, SearchResults, Song, SongId,
};
use std::collections::BTreeMap;

pub type StoreResult<T> = Result<T, StoreError>;

pub trait CatalogStore {
    // --- artists ---
    fn insert_artist(&mut self, artist: NewArtist) -> StoreResult<ArtistId>;
    fn artist(&self, id: ArtistId) -> StoreResult<Option<Artist>>;
    fn artists(&self) -> StoreResult<Vec<Artist>>;
    /// Returns `false` when no artist has `artist.id`.
    fn update_artist(&mut self, artist: &Artist) -> StoreResult<bool>;
    fn delete_artist(&mut self, id: ArtistId) -> StoreResult<bool>;

    // --- albums ---
    fn insert_album(&mut self, album: NewAlbum) -> StoreResult<AlbumId>;
    fn album(&self, id: AlbumId) -> StoreResult<Option<Album>>;
    fn albums(&self) -> StoreResult<Vec<Album>>;
    fn update_album(&mut self, album: &Album) -> StoreResult<bool>;
    fn delete_album(&mut self, id: AlbumId) -> StoreResult<bool>;

    // --- songs ---
    fn insert_song(&mut self, song: NewSong) -> StoreResult<SongId>;
    fn song(&self, id: SongId) -> StoreResult<Option<Song>>;
    fn songs(&self) -> StoreResult<Vec<Song>>;
    fn update_song(&mut self, song: &Song) -> StoreResult<bool>;
    fn delete_song(&mut self, id: SongId) -> StoreResult<bool>;

    // --- playlists ---
    fn insert_playlist(&mut self, playlist: NewPlaylist) -> StoreResult<PlaylistId>;
    fn playlist(&self, id: PlaylistId) -> StoreResult<Option<Playlist>>;
    fn playlists(&self) -> StoreResult<Vec<Playlist>>;
    fn update_playlist(&mut self, playlist: &Playlist) -> StoreResult<bool>;
    /// Deletes the playlist row only; membership is the caller's business.
    fn delete_playlist(&mut self, id: PlaylistId) -> StoreResult<bool>;

    // --- membership ---
    /// Returns `false` if the song was already a member.
    fn add_membership(&mut self, playlist_id: PlaylistId, song_id: SongId) -> StoreResult<bool>;
    /// Returns `false` if the song was not a member.
    fn remove_membership(&mut self, playlist_id: PlaylistId, song_id: SongId)
        -> StoreResult<bool>;
    /// Member song ids in the order they were added.
    fn playlist_song_ids(&self, playlist_id: PlaylistId) -> StoreResult<Vec<SongId>>;
    fn playlists_containing(&self, song_id: SongId) -> StoreResult<Vec<PlaylistId>>;

    /// Runs `f` as one unit: if it returns `Err`, every change it made
    /// through this store is undone.
    fn atomically<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        Self: Sized,
        E: From<StoreError>,
        F: FnOnce(&mut Self) -> Result<T, E>;

    // --- relationship reads ---

    fn albums_by_artist(&self, artist_id: ArtistId) -> StoreResult<Vec<Album>> {
        Ok(self.albums()?.into_iter().filter(|a| a.artist_id == artist_id).collect())
    }

    fn songs_by_artist(&self, artist_id: ArtistId) -> StoreResult<Vec<Song>> {
        Ok(self.songs()?.into_iter().filter(|s| s.artist_id == artist_id).collect())
    }

    fn songs_by_album(&self, album_id: AlbumId) -> StoreResult<Vec<Song>> {
        Ok(self.songs()?.into_iter().filter(|s| s.album_id == Some(album_id)).collect())
    }

    /// Member songs in membership order. Ids with no song behind them are
    /// skipped.
    fn playlist_songs(&self, playlist_id: PlaylistId) -> StoreResult<Vec<Song>> {
        let mut songs = Vec::new();
        for id in self.playlist_song_ids(playlist_id)? {
            if let Some(song) = self.song(id)? {
                songs.push(song);
            }
        }
        Ok(songs)
    }

    /// Case-insensitive substring match over every entity name.
    /// A blank needle matches nothing.
    fn search_by_name(&self, text: &str) -> StoreResult<SearchResults> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(SearchResults::default());
        }

        Ok(SearchResults {
            artists: self
                .artists()?
                .into_iter()
                .filter(|a| name_matches(&a.name, &needle))
                .collect(),
            albums: self.albums()?.into_iter().filter(|a| name_matches(&a.name, &needle)).collect(),
            songs: self.songs()?.into_iter().filter(|s| name_matches(&s.name, &needle)).collect(),
            playlists: self
                .playlists()?
                .into_iter()
                .filter(|p| name_matches(&p.name, &needle))
                .collect(),
        })
    }

    /// Artists whose name equals `name`, ignoring case and surrounding space.
    fn find_artists_by_name(&self, name: &str) -> StoreResult<Vec<Artist>> {
        let wanted = name.trim().to_lowercase();
        Ok(self
            .artists()?
            .into_iter()
            .filter(|a| a.name.trim().to_lowercase() == wanted)
            .collect())
    }

    /// Picks one artist among same-named duplicates: the one with the most
    /// songs, the earliest created on a tie.
    fn canonical_artist(&self, name: &str) -> StoreResult<Option<ArtistId>> {
        let candidates = self.find_artists_by_name(name)?;
        if candidates.len() <= 1 {
            return Ok(candidates.first().map(|a| a.id));
        }

        let mut song_counts: BTreeMap<ArtistId, usize> = BTreeMap::new();
        for song in self.songs()? {
            *song_counts.entry(song.artist_id).or_default() += 1;
        }

        // `max_by_key` keeps the last maximum, so walk newest first.
        Ok(candidates
            .iter()
            .rev()
            .max_by_key(|a| song_counts.get(&a.id).copied().unwrap_or(0))
            .map(|a| a.id))
    }
}

/// In-process catalog.
///
/// Maps are keyed by id, so iteration order is creation order. Cloning takes
/// a full snapshot, which is how [`CatalogStore::atomically`] rolls back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStore {
    artists: BTreeMap<ArtistId, Artist>,
    albums: BTreeMap<AlbumId, Album>,
    songs: BTreeMap<SongId, Song>,
    playlists: BTreeMap<PlaylistId, Playlist>,
    members: BTreeMap<PlaylistId, Vec<SongId>>,
    next_id: NextIds,
}

#[derive(Debug, Clone, PartialEq)]
struct NextIds {
    artist: i64,
    album: i64,
    song: i64,
    playlist: i64,
}

impl Default for NextIds {
    fn default() -> Self {
        Self { artist: 1, album: 1, song: 1, playlist: 1 }
    }
}

fn take_next(counter: &mut i64) -> i64 {
    let id = *counter;
    *counter += 1;
    id
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CatalogStore for MemoryStore {
    fn insert_artist(&mut self, artist: NewArtist) -> StoreResult<ArtistId> {
        let id = ArtistId(take_next(&mut self.next_id.artist));
        self.artists.insert(id, artist.with_id(id));
        Ok(id)
    }

    fn artist(&self, id: ArtistId) -> StoreResult<Option<Artist>> {
        Ok(self.artists.get(&id).cloned())
    }

    fn artists(&self) -> StoreResult<Vec<Artist>> {
        Ok(self.artists.values().cloned().collect())
    }

    fn update_artist(&mut self, artist: &Artist) -> StoreResult<bool> {
        Ok(match self.artists.get_mut(&artist.id) {
            Some(slot) => {
                *slot = artist.clone();
                true
            }
            None => false,
        })
    }

    fn delete_artist(&mut self, id: ArtistId) -> StoreResult<bool> {
        Ok(self.artists.remove(&id).is_some())
    }

    fn insert_album(&mut self, album: NewAlbum) -> StoreResult<AlbumId> {
        let id = AlbumId(take_next(&mut self.next_id.album));
        self.albums.insert(id, album.with_id(id));
        Ok(id)
    }

    fn album(&self, id: AlbumId) -> StoreResult<Option<Album>> {
        Ok(self.albums.get(&id).cloned())
    }

    fn albums(&self) -> StoreResult<Vec<Album>> {
        Ok(self.albums.values().cloned().collect())
    }

    fn update_album(&mut self, album: &Album) -> StoreResult<bool> {
        Ok(match self.albums.get_mut(&album.id) {
            Some(slot) => {
                *slot = album.clone();
                true
            }
            None => false,
        })
    }

    fn delete_album(&mut self, id: AlbumId) -> StoreResult<bool> {
        Ok(self.albums.remove(&id).is_some())
    }

    fn insert_song(&mut self, song: NewSong) -> StoreResult<SongId> {
        let id = SongId(take_next(&mut self.next_id.song));
        self.songs.insert(id, song.with_id(id));
        Ok(id)
    }

    fn song(&self, id: SongId) -> StoreResult<Option<Song>> {
        Ok(self.songs.get(&id).cloned())
    }

    fn songs(&self) -> StoreResult<Vec<Song>> {
        Ok(self.songs.values().cloned().collect())
    }

    fn update_song(&mut self, song: &Song) -> StoreResult<bool> {
        Ok(match self.songs.get_mut(&song.id) {
            Some(slot) => {
                *slot = song.clone();
                true
            }
            None => false,
        })
    }

    fn delete_song(&mut self, id: SongId) -> StoreResult<bool> {
        Ok(self.songs.remove(&id).is_some())
    }

    fn insert_playlist(&mut self, playlist: NewPlaylist) -> StoreResult<PlaylistId> {
        let id = PlaylistId(take_next(&mut self.next_id.playlist));
        self.playlists.insert(id, playlist.with_id(id));
        Ok(id)
    }

    fn playlist(&self, id: PlaylistId) -> StoreResult<Option<Playlist>> {
        Ok(self.playlists.get(&id).cloned())
    }

    fn playlists(&self) -> StoreResult<Vec<Playlist>> {
        Ok(self.playlists.values().cloned().collect())
    }

    fn update_playlist(&mut self, playlist: &Playlist) -> StoreResult<bool> {
        Ok(match self.playlists.get_mut(&playlist.id) {
            Some(slot) => {
                *slot = playlist.clone();
                true
            }
            None => false,
        })
    }

    fn delete_playlist(&mut self, id: PlaylistId) -> StoreResult<bool> {
        Ok(self.playlists.remove(&id).is_some())
    }

    fn add_membership(&mut self, playlist_id: PlaylistId, song_id: SongId) -> StoreResult<bool> {
        let members = self.members.entry(playlist_id).or_default();
        if members.contains(&song_id) {
            return Ok(false);
        }
        members.push(song_id);
        Ok(true)
    }

    fn remove_membership(
        &mut self,
        playlist_id: PlaylistId,
        song_id: SongId,
    ) -> StoreResult<bool> {
        let Some(members) = self.members.get_mut(&playlist_id) else {
            return Ok(false);
        };
        let before = members.len();
        members.retain(|id| *id != song_id);
        let removed = members.len() != before;
        if members.is_empty() {
            self.members.remove(&playlist_id);
        }
        Ok(removed)
    }

    fn playlist_song_ids(&self, playlist_id: PlaylistId) -> StoreResult<Vec<SongId>> {
        Ok(self.members.get(&playlist_id).cloned().unwrap_or_default())
    }

    fn playlists_containing(&self, song_id: SongId) -> StoreResult<Vec<PlaylistId>> {
        Ok(self
            .members
            .iter()
            .filter(|(_, members)| members.contains(&song_id))
            .map(|(id, _)| *id)
            .collect())
    }

    fn atomically<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        let snapshot = self.clone();
        let result = f(self);
        if result.is_err() {
            *self = snapshot;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_artist(name: &str) -> NewArtist {
        NewArtist { name: name.to_string(), biography: None }
    }

    fn new_song(name: &str, artist_id: ArtistId, genre: &str) -> NewSong {
        NewSong {
            name: name.to_string(),
            artist_id,
            album_id: None,
            duration_secs: 200,
            genre: genre.to_string(),
        }
    }

    #[test]
    fn test_ids_increase_in_creation_order() {
        let mut store = MemoryStore::new();
        let a = store.insert_artist(new_artist("First")).unwrap();
        let b = store.insert_artist(new_artist("Second")).unwrap();
        assert!(a < b);

        let names: Vec<_> = store.artists().unwrap().into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[test]
    fn test_ids_are_not_reused_after_delete() {
        let mut store = MemoryStore::new();
        let a = store.insert_artist(new_artist("Gone")).unwrap();
        assert!(store.delete_artist(a).unwrap());
        let b = store.insert_artist(new_artist("New")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_update_missing_entity_reports_false() {
        let mut store = MemoryStore::new();
        let ghost = Artist { id: ArtistId(99), name: "Ghost".to_string(), biography: None };
        assert!(!store.update_artist(&ghost).unwrap());
        assert!(store.artists().unwrap().is_empty());
    }

    #[test]
    fn test_membership_is_a_set_in_insertion_order() {
        let mut store = MemoryStore::new();
        let artist = store.insert_artist(new_artist("A")).unwrap();
        let s1 = store.insert_song(new_song("One", artist, "Rock")).unwrap();
        let s2 = store.insert_song(new_song("Two", artist, "Rock")).unwrap();
        let list = store
            .insert_playlist(NewPlaylist { name: "Mix".to_string(), description: String::new() })
            .unwrap();

        assert!(store.add_membership(list, s2).unwrap());
        assert!(store.add_membership(list, s1).unwrap());
        assert!(!store.add_membership(list, s2).unwrap());
        assert_eq!(store.playlist_song_ids(list).unwrap(), vec![s2, s1]);
        assert_eq!(store.playlists_containing(s1).unwrap(), vec![list]);

        assert!(store.remove_membership(list, s2).unwrap());
        assert!(!store.remove_membership(list, s2).unwrap());
        assert_eq!(store.playlist_song_ids(list).unwrap(), vec![s1]);
    }

    #[test]
    fn test_search_by_name_is_case_insensitive_substring() {
        let mut store = MemoryStore::new();
        let artist = store.insert_artist(new_artist("The Midnight")).unwrap();
        store.insert_song(new_song("Midnight City", artist, "Synthwave")).unwrap();
        store.insert_song(new_song("Daylight", artist, "Synthwave")).unwrap();

        let hits = store.search_by_name("MIDNIGHT").unwrap();
        assert_eq!(hits.artists.len(), 1);
        assert_eq!(hits.songs.len(), 1);
        assert_eq!(hits.songs[0].name, "Midnight City");
        assert_eq!(hits.len(), 2);

        assert!(store.search_by_name("  ").unwrap().is_empty());
    }

    #[test]
    fn test_canonical_artist_prefers_most_songs_then_earliest() {
        let mut store = MemoryStore::new();
        let first = store.insert_artist(new_artist("Nina")).unwrap();
        let second = store.insert_artist(new_artist("nina ")).unwrap();
        store.insert_artist(new_artist("Someone Else")).unwrap();

        // Tie at zero songs: earliest wins.
        assert_eq!(store.canonical_artist("NINA").unwrap(), Some(first));

        store.insert_song(new_song("Sinnerman", second, "Jazz")).unwrap();
        assert_eq!(store.canonical_artist("Nina").unwrap(), Some(second));

        store.insert_song(new_song("Feeling Good", first, "Jazz")).unwrap();
        assert_eq!(store.canonical_artist("Nina").unwrap(), Some(first));

        assert_eq!(store.canonical_artist("Nobody").unwrap(), None);
    }

    #[test]
    fn test_atomically_rolls_back_on_error() {
        let mut store = MemoryStore::new();
        store.insert_artist(new_artist("Kept")).unwrap();
        let before = store.clone();

        let result: Result<(), StoreError> = store.atomically(|s| {
            s.insert_artist(new_artist("Discarded"))?;
            Err(StoreError::Io(std::io::Error::other("boom")))
        });

        assert!(result.is_err());
        assert_eq!(store, before);
    }

    #[test]
    fn test_relationship_reads_filter_by_parent() {
        let mut store = MemoryStore::new();
        let a = store.insert_artist(new_artist("A")).unwrap();
        let b = store.insert_artist(new_artist("B")).unwrap();
        let album = store
            .insert_album(NewAlbum {
                name: "Record".to_string(),
                artist_id: a,
                release_year: 1999,
                genre: "Rock".to_string(),
            })
            .unwrap();
        let mut on_album = new_song("On", a, "Rock");
        on_album.album_id = Some(album);
        let s1 = store.insert_song(on_album).unwrap();
        store.insert_song(new_song("Loose", a, "Rock")).unwrap();
        store.insert_song(new_song("Other", b, "Pop")).unwrap();

        assert_eq!(store.albums_by_artist(a).unwrap().len(), 1);
        assert!(store.albums_by_artist(b).unwrap().is_empty());
        assert_eq!(store.songs_by_artist(a).unwrap().len(), 2);
        let on: Vec<_> = store.songs_by_album(album).unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(on, vec![s1]);
    }
}
