//! Relationship and consistency manager.
//!
//! [`Catalog`] owns a [`CatalogStore`] and is the only thing that mutates it.
//! Every operation validates first and then runs inside
//! [`CatalogStore::atomically`], so a rejected call leaves the store exactly
//! as it was.
//!
//! Each operation comes in two flavours:
//!
//! - `try_*` returns the precise [`CatalogError`];
//! - the plain form returns `bool` / `Option<Id>` and logs the reason at
//!   `warn` level. This is what front ends call.
//!
//! Deletes that have dependents take a [`Resolution`] chosen by the caller.

use crate::error::{CatalogError, Result};
use crate::models::{
    normalize_genre, Album, AlbumId, Artist, ArtistId, NewAlbum, NewArtist, NewPlaylist, NewSong,
    Playlist, PlaylistId, Resolution, Song, SongId, MAX_SONG_DURATION,
};
use crate::store::CatalogStore;
use log::{debug, info, warn};

pub struct Catalog<S: CatalogStore> {
    store: S,
}

fn report<T>(operation: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("{operation} rejected: {err}");
            None
        }
    }
}

fn validate_name(what: &str, name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogError::Validation(format!("{what} name must not be empty")));
    }
    Ok(name.to_string())
}

fn validate_year(year: i32) -> Result<i32> {
    if year <= 0 {
        let message = format!("release year must be positive, got {year}");
        return Err(CatalogError::Validation(message));
    }
    Ok(year)
}

fn validate_duration(duration_secs: i64) -> Result<u32> {
    if duration_secs <= 0 || duration_secs > i64::from(MAX_SONG_DURATION) {
        return Err(CatalogError::Validation(format!(
            "duration must be within 1..={MAX_SONG_DURATION} seconds, got {duration_secs}"
        )));
    }
    // In range, so it fits.
    Ok(duration_secs as u32)
}

fn optional_text(text: Option<&str>) -> Option<String> {
    text.map(str::trim).filter(|t| !t.is_empty()).map(str::to_string)
}

fn require_artist<S: CatalogStore>(store: &S, id: ArtistId) -> Result<Artist> {
    store.artist(id)?.ok_or_else(|| CatalogError::not_found("artist", id))
}

fn require_album<S: CatalogStore>(store: &S, id: AlbumId) -> Result<Album> {
    store.album(id)?.ok_or_else(|| CatalogError::not_found("album", id))
}

fn require_song<S: CatalogStore>(store: &S, id: SongId) -> Result<Song> {
    store.song(id)?.ok_or_else(|| CatalogError::not_found("song", id))
}

fn require_playlist<S: CatalogStore>(store: &S, id: PlaylistId) -> Result<Playlist> {
    store.playlist(id)?.ok_or_else(|| CatalogError::not_found("playlist", id))
}

/// Drops the song from every playlist, then deletes it.
fn delete_song_everywhere<S: CatalogStore>(store: &mut S, id: SongId) -> Result<()> {
    for playlist_id in store.playlists_containing(id)? {
        store.remove_membership(playlist_id, id)?;
    }
    store.delete_song(id)?;
    Ok(())
}

/// Clears the album reference of whatever songs are still on it, then
/// deletes the album.
fn delete_album_keeping_songs<S: CatalogStore>(store: &mut S, id: AlbumId) -> Result<usize> {
    let songs = store.songs_by_album(id)?;
    let detached = songs.len();
    for mut song in songs {
        song.album_id = None;
        store.update_song(&song)?;
    }
    store.delete_album(id)?;
    Ok(detached)
}

impl<S: CatalogStore> Catalog<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Read access for front ends. All reads go straight to the store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn modify_artist<F>(&mut self, id: ArtistId, edit: F) -> Result<()>
    where
        F: FnOnce(&S, &mut Artist) -> Result<()>,
    {
        self.store.atomically(|store| {
            let mut artist = require_artist(store, id)?;
            edit(&*store, &mut artist)?;
            store.update_artist(&artist)?;
            Ok(())
        })
    }

    fn modify_album<F>(&mut self, id: AlbumId, edit: F) -> Result<()>
    where
        F: FnOnce(&S, &mut Album) -> Result<()>,
    {
        self.store.atomically(|store| {
            let mut album = require_album(store, id)?;
            edit(&*store, &mut album)?;
            store.update_album(&album)?;
            Ok(())
        })
    }

    fn modify_song<F>(&mut self, id: SongId, edit: F) -> Result<()>
    where
        F: FnOnce(&S, &mut Song) -> Result<()>,
    {
        self.store.atomically(|store| {
            let mut song = require_song(store, id)?;
            edit(&*store, &mut song)?;
            store.update_song(&song)?;
            Ok(())
        })
    }

    fn modify_playlist<F>(&mut self, id: PlaylistId, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Playlist) -> Result<()>,
    {
        self.store.atomically(|store| {
            let mut playlist = require_playlist(store, id)?;
            edit(&mut playlist)?;
            store.update_playlist(&playlist)?;
            Ok(())
        })
    }

    // =========================================================================
    // CREATION
    // =========================================================================

    pub fn try_add_artist(&mut self, name: &str, biography: Option<&str>) -> Result<ArtistId> {
        let artist = NewArtist {
            name: validate_name("artist", name)?,
            biography: optional_text(biography),
        };
        let id = self
            .store
            .atomically(|store| Ok::<_, CatalogError>(store.insert_artist(artist)?))?;
        debug!("Added artist {id}.");
        Ok(id)
    }

    pub fn add_artist(&mut self, name: &str, biography: Option<&str>) -> Option<ArtistId> {
        report("add_artist", self.try_add_artist(name, biography))
    }

    /// A blank genre is stored as [`UNKNOWN_GENRE`](crate::models::UNKNOWN_GENRE).
    pub fn try_add_album(
        &mut self,
        name: &str,
        artist_id: ArtistId,
        release_year: i32,
        genre: &str,
    ) -> Result<AlbumId> {
        let name = validate_name("album", name)?;
        let release_year = validate_year(release_year)?;
        let id = self.store.atomically(|store| {
            require_artist(store, artist_id)?;
            Ok::<_, CatalogError>(store.insert_album(NewAlbum {
                name,
                artist_id,
                release_year,
                genre: normalize_genre(genre),
            })?)
        })?;
        debug!("Added album {id} by artist {artist_id}.");
        Ok(id)
    }

    pub fn add_album(
        &mut self,
        name: &str,
        artist_id: ArtistId,
        release_year: i32,
        genre: &str,
    ) -> Option<AlbumId> {
        report("add_album", self.try_add_album(name, artist_id, release_year, genre))
    }

    /// The new song belongs to no album; see [`Catalog::add_song_to_album`].
    pub fn try_add_song(
        &mut self,
        name: &str,
        artist_id: ArtistId,
        duration_secs: i64,
        genre: &str,
    ) -> Result<SongId> {
        let name = validate_name("song", name)?;
        let duration_secs = validate_duration(duration_secs)?;
        let id = self.store.atomically(|store| {
            require_artist(store, artist_id)?;
            Ok::<_, CatalogError>(store.insert_song(NewSong {
                name,
                artist_id,
                album_id: None,
                duration_secs,
                genre: normalize_genre(genre),
            })?)
        })?;
        debug!("Added song {id} by artist {artist_id}.");
        Ok(id)
    }

    pub fn add_song(
        &mut self,
        name: &str,
        artist_id: ArtistId,
        duration_secs: i64,
        genre: &str,
    ) -> Option<SongId> {
        report("add_song", self.try_add_song(name, artist_id, duration_secs, genre))
    }

    pub fn try_add_playlist(&mut self, name: &str, description: &str) -> Result<PlaylistId> {
        let playlist = NewPlaylist {
            name: validate_name("playlist", name)?,
            description: description.trim().to_string(),
        };
        let id = self
            .store
            .atomically(|store| Ok::<_, CatalogError>(store.insert_playlist(playlist)?))?;
        debug!("Added playlist {id}.");
        Ok(id)
    }

    pub fn add_playlist(&mut self, name: &str, description: &str) -> Option<PlaylistId> {
        report("add_playlist", self.try_add_playlist(name, description))
    }

    // =========================================================================
    // EDITS
    // =========================================================================

    /// Fails with `Validation` for a blank name, `NotFound` for an unknown artist.
    pub fn try_rename_artist(&mut self, id: ArtistId, name: &str) -> Result<()> {
        let name = validate_name("artist", name)?;
        self.modify_artist(id, |_, artist| {
            artist.name = name;
            Ok(())
        })
    }

    pub fn rename_artist(&mut self, id: ArtistId, name: &str) -> bool {
        report("rename_artist", self.try_rename_artist(id, name)).is_some()
    }

    /// `None` or blank text clears the biography. Fails with `NotFound` for an
    /// unknown artist.
    pub fn try_set_artist_biography(
        &mut self,
        id: ArtistId,
        biography: Option<&str>,
    ) -> Result<()> {
        let biography = optional_text(biography);
        self.modify_artist(id, |_, artist| {
            artist.biography = biography;
            Ok(())
        })
    }

    pub fn set_artist_biography(&mut self, id: ArtistId, biography: Option<&str>) -> bool {
        report("set_artist_biography", self.try_set_artist_biography(id, biography)).is_some()
    }

    /// Fails with `Validation` for a blank name, `NotFound` for an unknown album.
    pub fn try_rename_album(&mut self, id: AlbumId, name: &str) -> Result<()> {
        let name = validate_name("album", name)?;
        self.modify_album(id, |_, album| {
            album.name = name;
            Ok(())
        })
    }

    pub fn rename_album(&mut self, id: AlbumId, name: &str) -> bool {
        report("rename_album", self.try_rename_album(id, name)).is_some()
    }

    /// Fails with `Validation` unless the year is positive, `NotFound` for an
    /// unknown album.
    pub fn try_set_album_year(&mut self, id: AlbumId, release_year: i32) -> Result<()> {
        let release_year = validate_year(release_year)?;
        self.modify_album(id, |_, album| {
            album.release_year = release_year;
            Ok(())
        })
    }

    pub fn set_album_year(&mut self, id: AlbumId, release_year: i32) -> bool {
        report("set_album_year", self.try_set_album_year(id, release_year)).is_some()
    }

    /// A blank genre becomes [`UNKNOWN_GENRE`](crate::models::UNKNOWN_GENRE).
    /// Fails with `NotFound` for an unknown album.
    pub fn try_set_album_genre(&mut self, id: AlbumId, genre: &str) -> Result<()> {
        let genre = normalize_genre(genre);
        self.modify_album(id, |_, album| {
            album.genre = genre;
            Ok(())
        })
    }

    pub fn set_album_genre(&mut self, id: AlbumId, genre: &str) -> bool {
        report("set_album_genre", self.try_set_album_genre(id, genre)).is_some()
    }

    /// Moves the album to another artist. Its songs keep their own artist.
    /// Fails with `NotFound` if either the album or the artist is unknown.
    pub fn try_reassign_album_artist(&mut self, id: AlbumId, artist_id: ArtistId) -> Result<()> {
        self.modify_album(id, |store, album| {
            require_artist(store, artist_id)?;
            album.artist_id = artist_id;
            Ok(())
        })
    }

    pub fn reassign_album_artist(&mut self, id: AlbumId, artist_id: ArtistId) -> bool {
        report("reassign_album_artist", self.try_reassign_album_artist(id, artist_id)).is_some()
    }

    /// Fails with `Validation` for a blank name, `NotFound` for an unknown song.
    pub fn try_rename_song(&mut self, id: SongId, name: &str) -> Result<()> {
        let name = validate_name("song", name)?;
        self.modify_song(id, |_, song| {
            song.name = name;
            Ok(())
        })
    }

    pub fn rename_song(&mut self, id: SongId, name: &str) -> bool {
        report("rename_song", self.try_rename_song(id, name)).is_some()
    }

    /// A blank genre becomes [`UNKNOWN_GENRE`](crate::models::UNKNOWN_GENRE).
    /// Fails with `NotFound` for an unknown song.
    pub fn try_set_song_genre(&mut self, id: SongId, genre: &str) -> Result<()> {
        let genre = normalize_genre(genre);
        self.modify_song(id, |_, song| {
            song.genre = genre;
            Ok(())
        })
    }

    pub fn set_song_genre(&mut self, id: SongId, genre: &str) -> bool {
        report("set_song_genre", self.try_set_song_genre(id, genre)).is_some()
    }

    /// Fails with `Validation` outside 1 to 3600 seconds, `NotFound` for an
    /// unknown song.
    pub fn try_set_song_duration(&mut self, id: SongId, duration_secs: i64) -> Result<()> {
        let duration_secs = validate_duration(duration_secs)?;
        self.modify_song(id, |_, song| {
            song.duration_secs = duration_secs;
            Ok(())
        })
    }

    pub fn set_song_duration(&mut self, id: SongId, duration_secs: i64) -> bool {
        report("set_song_duration", self.try_set_song_duration(id, duration_secs)).is_some()
    }

    /// Fails with `NotFound` if either the song or the artist is unknown.
    /// The song's album is left as it is.
    pub fn try_reassign_song_artist(&mut self, id: SongId, artist_id: ArtistId) -> Result<()> {
        self.modify_song(id, |store, song| {
            require_artist(store, artist_id)?;
            song.artist_id = artist_id;
            Ok(())
        })
    }

    pub fn reassign_song_artist(&mut self, id: SongId, artist_id: ArtistId) -> bool {
        report("reassign_song_artist", self.try_reassign_song_artist(id, artist_id)).is_some()
    }

    /// Puts the song on `album_id`, replacing any previous album. Fails with
    /// `NotFound` if either id is unknown.
    pub fn try_add_song_to_album(&mut self, song_id: SongId, album_id: AlbumId) -> Result<()> {
        self.modify_song(song_id, |store, song| {
            require_album(store, album_id)?;
            song.album_id = Some(album_id);
            Ok(())
        })
    }

    pub fn add_song_to_album(&mut self, song_id: SongId, album_id: AlbumId) -> bool {
        report("add_song_to_album", self.try_add_song_to_album(song_id, album_id)).is_some()
    }

    /// Fails with `NotFound` for an unknown song; a song without an album is
    /// left unchanged.
    pub fn try_clear_song_album(&mut self, song_id: SongId) -> Result<()> {
        self.modify_song(song_id, |_, song| {
            song.album_id = None;
            Ok(())
        })
    }

    pub fn clear_song_album(&mut self, song_id: SongId) -> bool {
        report("clear_song_album", self.try_clear_song_album(song_id)).is_some()
    }

    /// Fails with `Validation` for a blank name, `NotFound` for an unknown
    /// playlist.
    pub fn try_rename_playlist(&mut self, id: PlaylistId, name: &str) -> Result<()> {
        let name = validate_name("playlist", name)?;
        self.modify_playlist(id, |playlist| {
            playlist.name = name;
            Ok(())
        })
    }

    pub fn rename_playlist(&mut self, id: PlaylistId, name: &str) -> bool {
        report("rename_playlist", self.try_rename_playlist(id, name)).is_some()
    }

    /// The description is trimmed; empty is allowed. Fails with `NotFound`
    /// for an unknown playlist.
    pub fn try_set_playlist_description(
        &mut self,
        id: PlaylistId,
        description: &str,
    ) -> Result<()> {
        let description = description.trim().to_string();
        self.modify_playlist(id, |playlist| {
            playlist.description = description;
            Ok(())
        })
    }

    pub fn set_playlist_description(&mut self, id: PlaylistId, description: &str) -> bool {
        report("set_playlist_description", self.try_set_playlist_description(id, description))
            .is_some()
    }

    // =========================================================================
    // PLAYLIST MEMBERSHIP
    // =========================================================================

    /// Adding a song that is already a member changes nothing and succeeds.
    pub fn try_add_song_to_playlist(
        &mut self,
        song_id: SongId,
        playlist_id: PlaylistId,
    ) -> Result<()> {
        self.store.atomically(|store| {
            require_song(store, song_id)?;
            require_playlist(store, playlist_id)?;
            store.add_membership(playlist_id, song_id)?;
            Ok(())
        })
    }

    pub fn add_song_to_playlist(&mut self, song_id: SongId, playlist_id: PlaylistId) -> bool {
        report("add_song_to_playlist", self.try_add_song_to_playlist(song_id, playlist_id))
            .is_some()
    }

    /// Removing a song that is not a member changes nothing and succeeds.
    pub fn try_remove_song_from_playlist(
        &mut self,
        song_id: SongId,
        playlist_id: PlaylistId,
    ) -> Result<()> {
        self.store.atomically(|store| {
            require_song(store, song_id)?;
            require_playlist(store, playlist_id)?;
            store.remove_membership(playlist_id, song_id)?;
            Ok(())
        })
    }

    pub fn remove_song_from_playlist(&mut self, song_id: SongId, playlist_id: PlaylistId) -> bool {
        report(
            "remove_song_from_playlist",
            self.try_remove_song_from_playlist(song_id, playlist_id),
        )
        .is_some()
    }

    // =========================================================================
    // DELETION
    // =========================================================================

    /// Removes the song from every playlist, then deletes it.
    pub fn try_remove_song(&mut self, id: SongId) -> Result<()> {
        self.store.atomically(|store| {
            require_song(store, id)?;
            delete_song_everywhere(store, id)
        })?;
        info!("Removed song {id}.");
        Ok(())
    }

    pub fn remove_song(&mut self, id: SongId) -> bool {
        report("remove_song", self.try_remove_song(id)).is_some()
    }

    /// - [`Resolution::Cascade`]: the album's songs are deleted with it.
    /// - [`Resolution::Keep`]: the songs stay, with their album cleared.
    /// - [`Resolution::Cancel`]: nothing happens; reported as a conflict.
    pub fn try_remove_album_with(&mut self, id: AlbumId, resolution: Resolution) -> Result<()> {
        let affected = self.store.atomically(|store| {
            require_album(store, id)?;
            match resolution {
                Resolution::Cancel => {
                    Err(CatalogError::Conflict(format!("removal of album {id} was cancelled")))
                }
                Resolution::Cascade => {
                    let songs = store.songs_by_album(id)?;
                    for song in &songs {
                        delete_song_everywhere(store, song.id)?;
                    }
                    store.delete_album(id)?;
                    Ok(songs.len())
                }
                Resolution::Keep => delete_album_keeping_songs(store, id),
            }
        })?;

        if resolution == Resolution::Cascade {
            info!("Removed album {id} and {affected} of its songs.");
        } else {
            info!("Removed album {id}; kept {affected} songs without an album.");
        }
        Ok(())
    }

    pub fn remove_album_with(&mut self, id: AlbumId, resolution: Resolution) -> bool {
        report("remove_album", self.try_remove_album_with(id, resolution)).is_some()
    }

    /// `delete_songs` picks [`Resolution::Cascade`] over [`Resolution::Keep`].
    pub fn remove_album(&mut self, id: AlbumId, delete_songs: bool) -> bool {
        self.remove_album_with(id, Resolution::from_cascade(delete_songs))
    }

    /// - [`Resolution::Cascade`]: deletes the artist's songs (out of every
    ///   playlist), then its albums, then the artist. Songs by other artists
    ///   that sat on those albums are kept with the album cleared.
    /// - [`Resolution::Keep`]: only succeeds when nothing depends on the
    ///   artist; otherwise it is a conflict and nothing changes.
    /// - [`Resolution::Cancel`]: nothing happens; reported as a conflict.
    pub fn try_remove_artist_with(&mut self, id: ArtistId, resolution: Resolution) -> Result<()> {
        let removed = self.store.atomically(|store| {
            require_artist(store, id)?;
            let albums = store.albums_by_artist(id)?;
            let songs = store.songs_by_artist(id)?;

            match resolution {
                Resolution::Cancel => {
                    return Err(CatalogError::Conflict(format!(
                        "removal of artist {id} was cancelled"
                    )));
                }
                Resolution::Keep if !albums.is_empty() || !songs.is_empty() => {
                    return Err(CatalogError::Conflict(format!(
                        "artist {id} still has {} albums and {} songs",
                        albums.len(),
                        songs.len()
                    )));
                }
                Resolution::Keep => {}
                Resolution::Cascade => {
                    for song in &songs {
                        delete_song_everywhere(store, song.id)?;
                    }
                    for album in &albums {
                        delete_album_keeping_songs(store, album.id)?;
                    }
                }
            }

            store.delete_artist(id)?;
            Ok::<_, CatalogError>((albums.len(), songs.len()))
        })?;

        info!("Removed artist {id} with {} albums and {} songs.", removed.0, removed.1);
        Ok(())
    }

    pub fn remove_artist_with(&mut self, id: ArtistId, resolution: Resolution) -> bool {
        report("remove_artist", self.try_remove_artist_with(id, resolution)).is_some()
    }

    /// `cascade` picks [`Resolution::Cascade`] over [`Resolution::Keep`].
    pub fn remove_artist(&mut self, id: ArtistId, cascade: bool) -> bool {
        self.remove_artist_with(id, Resolution::from_cascade(cascade))
    }

    /// Deletes the playlist. Its songs stay in the catalog.
    pub fn try_remove_playlist(&mut self, id: PlaylistId) -> Result<()> {
        self.store.atomically(|store| {
            require_playlist(store, id)?;
            for song_id in store.playlist_song_ids(id)? {
                store.remove_membership(id, song_id)?;
            }
            store.delete_playlist(id)?;
            Ok::<_, CatalogError>(())
        })?;
        info!("Removed playlist {id}.");
        Ok(())
    }

    pub fn remove_playlist(&mut self, id: PlaylistId) -> bool {
        report("remove_playlist", self.try_remove_playlist(id)).is_some()
    }

    // =========================================================================
    // DEDUPLICATION
    // =========================================================================

    /// Folds every artist called `name` (ignoring case) into the canonical
    /// one picked by [`CatalogStore::canonical_artist`]: albums and songs are
    /// moved over, the duplicates deleted. The canonical artist inherits a
    /// biography if it has none. Returns the surviving id.
    pub fn try_merge_duplicate_artists(&mut self, name: &str) -> Result<ArtistId> {
        let (canonical_id, merged) = self.store.atomically(|store| {
            let canonical_id = store
                .canonical_artist(name)?
                .ok_or_else(|| CatalogError::not_found("artist", name.trim()))?;
            let mut canonical = require_artist(store, canonical_id)?;

            let mut merged = 0;
            for duplicate in store.find_artists_by_name(name)? {
                if duplicate.id == canonical_id {
                    continue;
                }
                for mut album in store.albums_by_artist(duplicate.id)? {
                    album.artist_id = canonical_id;
                    store.update_album(&album)?;
                }
                for mut song in store.songs_by_artist(duplicate.id)? {
                    song.artist_id = canonical_id;
                    store.update_song(&song)?;
                }
                if canonical.biography.is_none() && duplicate.biography.is_some() {
                    canonical.biography = duplicate.biography.clone();
                    store.update_artist(&canonical)?;
                }
                store.delete_artist(duplicate.id)?;
                merged += 1;
            }

            Ok::<_, CatalogError>((canonical_id, merged))
        })?;

        if merged > 0 {
            info!("Merged {merged} duplicate artists into {canonical_id}.");
        }
        Ok(canonical_id)
    }

    pub fn merge_duplicate_artists(&mut self, name: &str) -> Option<ArtistId> {
        report("merge_duplicate_artists", self.try_merge_duplicate_artists(name))
    }
}
