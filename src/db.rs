//! SQLite-backed [`CatalogStore`].
//!
//! One file holds the whole catalog. Foreign keys are switched on, so the
//! database itself refuses a song whose artist is gone; the catalog manager
//! deletes dependents in the right order before it gets that far.

use crate::error::StoreError;
use crate::models::{
    Album, AlbumId, Artist, ArtistId, NewAlbum, NewArtist, NewPlaylist, NewSong, Playlist,
    PlaylistId, Song, SongId,
};
use crate::store::{CatalogStore, StoreResult};
use log::{debug, trace, warn};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS artists (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        name      TEXT    NOT NULL,
        biography TEXT
    );
    CREATE TABLE IF NOT EXISTS albums (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        name         TEXT    NOT NULL,
        artist_id    INTEGER NOT NULL REFERENCES artists(id),
        release_year INTEGER NOT NULL,
        genre        TEXT    NOT NULL
    );
    CREATE TABLE IF NOT EXISTS songs (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        name          TEXT    NOT NULL,
        artist_id     INTEGER NOT NULL REFERENCES artists(id),
        album_id      INTEGER REFERENCES albums(id),
        duration_secs INTEGER NOT NULL,
        genre         TEXT    NOT NULL
    );
    CREATE TABLE IF NOT EXISTS playlists (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT    NOT NULL,
        description TEXT    NOT NULL DEFAULT ''
    );
    CREATE TABLE IF NOT EXISTS playlist_songs (
        playlist_id INTEGER NOT NULL REFERENCES playlists(id),
        song_id     INTEGER NOT NULL REFERENCES songs(id),
        PRIMARY KEY (playlist_id, song_id)
    );
    CREATE INDEX IF NOT EXISTS idx_albums_artist ON albums(artist_id);
    CREATE INDEX IF NOT EXISTS idx_songs_artist ON songs(artist_id);
    CREATE INDEX IF NOT EXISTS idx_songs_album ON songs(album_id);
    CREATE INDEX IF NOT EXISTS idx_playlist_songs_song ON playlist_songs(song_id);
";

const SAVEPOINT: &str = "catalog_tx";

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) the catalog database at `path` and makes sure the
    /// schema exists.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        debug!("Opened catalog database at {}", path.display());
        Self::with_connection(conn)
    }

    /// Fresh catalog that lives only as long as the store. Good for testing.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    fn query_all<T>(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
        map: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> StoreResult<Vec<T>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params, map)?;

        let mut items = Vec::new();
        // Could use collect, but this keeps the error per row.
        for item in rows {
            items.push(item?);
        }
        Ok(items)
    }
}

fn artist_from_row(row: &Row<'_>) -> rusqlite::Result<Artist> {
    Ok(Artist { id: ArtistId(row.get(0)?), name: row.get(1)?, biography: row.get(2)? })
}

fn album_from_row(row: &Row<'_>) -> rusqlite::Result<Album> {
    Ok(Album {
        id: AlbumId(row.get(0)?),
        name: row.get(1)?,
        artist_id: ArtistId(row.get(2)?),
        release_year: row.get(3)?,
        genre: row.get(4)?,
    })
}

fn song_from_row(row: &Row<'_>) -> rusqlite::Result<Song> {
    Ok(Song {
        id: SongId(row.get(0)?),
        name: row.get(1)?,
        artist_id: ArtistId(row.get(2)?),
        album_id: row.get::<_, Option<i64>>(3)?.map(AlbumId),
        duration_secs: row.get(4)?,
        genre: row.get(5)?,
    })
}

fn playlist_from_row(row: &Row<'_>) -> rusqlite::Result<Playlist> {
    Ok(Playlist { id: PlaylistId(row.get(0)?), name: row.get(1)?, description: row.get(2)? })
}

const ARTIST_COLUMNS: &str = "SELECT id, name, biography FROM artists";
const ALBUM_COLUMNS: &str = "SELECT id, name, artist_id, release_year, genre FROM albums";
const SONG_COLUMNS: &str =
    "SELECT id, name, artist_id, album_id, duration_secs, genre FROM songs";
const PLAYLIST_COLUMNS: &str = "SELECT id, name, description FROM playlists";

impl CatalogStore for SqliteStore {
    fn insert_artist(&mut self, artist: NewArtist) -> StoreResult<ArtistId> {
        self.conn.execute(
            "INSERT INTO artists (name, biography) VALUES (?1, ?2)",
            params![artist.name, artist.biography],
        )?;
        Ok(ArtistId(self.conn.last_insert_rowid()))
    }

    fn artist(&self, id: ArtistId) -> StoreResult<Option<Artist>> {
        let sql = format!("{ARTIST_COLUMNS} WHERE id = ?1");
        Ok(self.conn.query_row(&sql, [id.0], artist_from_row).optional()?)
    }

    fn artists(&self) -> StoreResult<Vec<Artist>> {
        self.query_all(&format!("{ARTIST_COLUMNS} ORDER BY id"), [], artist_from_row)
    }

    fn update_artist(&mut self, artist: &Artist) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE artists SET name = ?1, biography = ?2 WHERE id = ?3",
            params![artist.name, artist.biography, artist.id.0],
        )?;
        Ok(changed == 1)
    }

    fn delete_artist(&mut self, id: ArtistId) -> StoreResult<bool> {
        Ok(self.conn.execute("DELETE FROM artists WHERE id = ?1", [id.0])? == 1)
    }

    fn insert_album(&mut self, album: NewAlbum) -> StoreResult<AlbumId> {
        self.conn.execute(
            "INSERT INTO albums (name, artist_id, release_year, genre) VALUES (?1, ?2, ?3, ?4)",
            params![album.name, album.artist_id.0, album.release_year, album.genre],
        )?;
        Ok(AlbumId(self.conn.last_insert_rowid()))
    }

    fn album(&self, id: AlbumId) -> StoreResult<Option<Album>> {
        let sql = format!("{ALBUM_COLUMNS} WHERE id = ?1");
        Ok(self.conn.query_row(&sql, [id.0], album_from_row).optional()?)
    }

    fn albums(&self) -> StoreResult<Vec<Album>> {
        self.query_all(&format!("{ALBUM_COLUMNS} ORDER BY id"), [], album_from_row)
    }

    fn update_album(&mut self, album: &Album) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE albums SET name = ?1, artist_id = ?2, release_year = ?3, genre = ?4
             WHERE id = ?5",
            params![album.name, album.artist_id.0, album.release_year, album.genre, album.id.0],
        )?;
        Ok(changed == 1)
    }

    fn delete_album(&mut self, id: AlbumId) -> StoreResult<bool> {
        Ok(self.conn.execute("DELETE FROM albums WHERE id = ?1", [id.0])? == 1)
    }

    fn insert_song(&mut self, song: NewSong) -> StoreResult<SongId> {
        self.conn.execute(
            "INSERT INTO songs (name, artist_id, album_id, duration_secs, genre)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                song.name,
                song.artist_id.0,
                song.album_id.map(AlbumId::as_i64),
                song.duration_secs,
                song.genre
            ],
        )?;
        Ok(SongId(self.conn.last_insert_rowid()))
    }

    fn song(&self, id: SongId) -> StoreResult<Option<Song>> {
        let sql = format!("{SONG_COLUMNS} WHERE id = ?1");
        Ok(self.conn.query_row(&sql, [id.0], song_from_row).optional()?)
    }

    fn songs(&self) -> StoreResult<Vec<Song>> {
        self.query_all(&format!("{SONG_COLUMNS} ORDER BY id"), [], song_from_row)
    }

    fn update_song(&mut self, song: &Song) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE songs SET name = ?1, artist_id = ?2, album_id = ?3, duration_secs = ?4,
             genre = ?5 WHERE id = ?6",
            params![
                song.name,
                song.artist_id.0,
                song.album_id.map(AlbumId::as_i64),
                song.duration_secs,
                song.genre,
                song.id.0
            ],
        )?;
        Ok(changed == 1)
    }

    fn delete_song(&mut self, id: SongId) -> StoreResult<bool> {
        Ok(self.conn.execute("DELETE FROM songs WHERE id = ?1", [id.0])? == 1)
    }

    fn insert_playlist(&mut self, playlist: NewPlaylist) -> StoreResult<PlaylistId> {
        self.conn.execute(
            "INSERT INTO playlists (name, description) VALUES (?1, ?2)",
            params![playlist.name, playlist.description],
        )?;
        Ok(PlaylistId(self.conn.last_insert_rowid()))
    }

    fn playlist(&self, id: PlaylistId) -> StoreResult<Option<Playlist>> {
        let sql = format!("{PLAYLIST_COLUMNS} WHERE id = ?1");
        Ok(self.conn.query_row(&sql, [id.0], playlist_from_row).optional()?)
    }

    fn playlists(&self) -> StoreResult<Vec<Playlist>> {
        self.query_all(&format!("{PLAYLIST_COLUMNS} ORDER BY id"), [], playlist_from_row)
    }

    fn update_playlist(&mut self, playlist: &Playlist) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE playlists SET name = ?1, description = ?2 WHERE id = ?3",
            params![playlist.name, playlist.description, playlist.id.0],
        )?;
        Ok(changed == 1)
    }

    fn delete_playlist(&mut self, id: PlaylistId) -> StoreResult<bool> {
        Ok(self.conn.execute("DELETE FROM playlists WHERE id = ?1", [id.0])? == 1)
    }

    fn add_membership(&mut self, playlist_id: PlaylistId, song_id: SongId) -> StoreResult<bool> {
        let added = self.conn.execute(
            "INSERT OR IGNORE INTO playlist_songs (playlist_id, song_id) VALUES (?1, ?2)",
            [playlist_id.0, song_id.0],
        )?;
        Ok(added == 1)
    }

    fn remove_membership(
        &mut self,
        playlist_id: PlaylistId,
        song_id: SongId,
    ) -> StoreResult<bool> {
        let removed = self.conn.execute(
            "DELETE FROM playlist_songs WHERE playlist_id = ?1 AND song_id = ?2",
            [playlist_id.0, song_id.0],
        )?;
        Ok(removed == 1)
    }

    fn playlist_song_ids(&self, playlist_id: PlaylistId) -> StoreResult<Vec<SongId>> {
        self.query_all(
            "SELECT song_id FROM playlist_songs WHERE playlist_id = ?1 ORDER BY rowid",
            [playlist_id.0],
            |row| Ok(SongId(row.get(0)?)),
        )
    }

    fn playlists_containing(&self, song_id: SongId) -> StoreResult<Vec<PlaylistId>> {
        self.query_all(
            "SELECT playlist_id FROM playlist_songs WHERE song_id = ?1 ORDER BY playlist_id",
            [song_id.0],
            |row| Ok(PlaylistId(row.get(0)?)),
        )
    }

    fn atomically<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        self.conn
            .execute_batch(&format!("SAVEPOINT {SAVEPOINT};"))
            .map_err(|e| E::from(StoreError::from(e)))?;
        trace!("Opened savepoint `{SAVEPOINT}'.");

        match f(self) {
            Ok(value) => {
                self.conn
                    .execute_batch(&format!("RELEASE {SAVEPOINT};"))
                    .map_err(|e| E::from(StoreError::from(e)))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = self
                    .conn
                    .execute_batch(&format!("ROLLBACK TO {SAVEPOINT}; RELEASE {SAVEPOINT};"))
                {
                    warn!("Rolling back savepoint `{SAVEPOINT}' failed: {rollback}");
                }
                Err(err)
            }
        }
    }

    fn albums_by_artist(&self, artist_id: ArtistId) -> StoreResult<Vec<Album>> {
        let sql = format!("{ALBUM_COLUMNS} WHERE artist_id = ?1 ORDER BY id");
        self.query_all(&sql, [artist_id.0], album_from_row)
    }

    fn songs_by_artist(&self, artist_id: ArtistId) -> StoreResult<Vec<Song>> {
        let sql = format!("{SONG_COLUMNS} WHERE artist_id = ?1 ORDER BY id");
        self.query_all(&sql, [artist_id.0], song_from_row)
    }

    fn songs_by_album(&self, album_id: AlbumId) -> StoreResult<Vec<Song>> {
        let sql = format!("{SONG_COLUMNS} WHERE album_id = ?1 ORDER BY id");
        self.query_all(&sql, [album_id.0], song_from_row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_artist() -> (SqliteStore, ArtistId) {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let id = store
            .insert_artist(NewArtist {
                name: "Björk".to_string(),
                biography: Some("Iceland".to_string()),
            })
            .unwrap();
        (store, id)
    }

    fn song(artist_id: ArtistId, album_id: Option<AlbumId>) -> NewSong {
        NewSong {
            name: "Jóga".to_string(),
            artist_id,
            album_id,
            duration_secs: 305,
            genre: "Electronic".to_string(),
        }
    }

    #[test]
    fn test_artist_round_trip() {
        let (store, id) = store_with_artist();
        let artist = store.artist(id).unwrap().unwrap();
        assert_eq!(artist.name, "Björk");
        assert_eq!(artist.biography.as_deref(), Some("Iceland"));
        assert!(store.artist(ArtistId(404)).unwrap().is_none());
    }

    #[test]
    fn test_song_album_reference_survives_storage() {
        let (mut store, artist) = store_with_artist();
        let album = store
            .insert_album(NewAlbum {
                name: "Homogenic".to_string(),
                artist_id: artist,
                release_year: 1997,
                genre: "Electronic".to_string(),
            })
            .unwrap();
        let with = store.insert_song(song(artist, Some(album))).unwrap();
        let without = store.insert_song(song(artist, None)).unwrap();

        assert_eq!(store.song(with).unwrap().unwrap().album_id, Some(album));
        assert_eq!(store.song(without).unwrap().unwrap().album_id, None);
        assert_eq!(store.songs_by_album(album).unwrap().len(), 1);
        assert_eq!(store.songs_by_artist(artist).unwrap().len(), 2);
        assert_eq!(store.albums_by_artist(artist).unwrap().len(), 1);
    }

    #[test]
    fn test_update_and_delete_report_missing_rows() {
        let (mut store, artist) = store_with_artist();
        let mut row = store.artist(artist).unwrap().unwrap();
        row.name = "Bjork".to_string();
        assert!(store.update_artist(&row).unwrap());
        assert_eq!(store.artist(artist).unwrap().unwrap().name, "Bjork");

        assert!(store.delete_artist(artist).unwrap());
        assert!(!store.delete_artist(artist).unwrap());
        assert!(!store.update_artist(&row).unwrap());
    }

    #[test]
    fn test_foreign_keys_reject_orphan_songs() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert!(store.insert_song(song(ArtistId(7), None)).is_err());
    }

    #[test]
    fn test_membership_keeps_insertion_order_and_ignores_repeats() {
        let (mut store, artist) = store_with_artist();
        let s1 = store.insert_song(song(artist, None)).unwrap();
        let s2 = store.insert_song(song(artist, None)).unwrap();
        let list = store
            .insert_playlist(NewPlaylist {
                name: "Cold".to_string(),
                description: "winter".to_string(),
            })
            .unwrap();

        assert!(store.add_membership(list, s2).unwrap());
        assert!(store.add_membership(list, s1).unwrap());
        assert!(!store.add_membership(list, s1).unwrap());
        assert_eq!(store.playlist_song_ids(list).unwrap(), vec![s2, s1]);
        assert_eq!(store.playlists_containing(s2).unwrap(), vec![list]);
        assert!(store.remove_membership(list, s2).unwrap());
        assert!(!store.remove_membership(list, s2).unwrap());
    }

    #[test]
    fn test_atomically_rolls_back_all_statements() {
        let (mut store, artist) = store_with_artist();
        let result: Result<(), StoreError> = store.atomically(|s| {
            s.insert_song(song(artist, None))?;
            s.delete_artist(artist)?; // violates the songs foreign key
            Ok(())
        });

        assert!(result.is_err());
        assert!(store.songs().unwrap().is_empty());
        assert!(store.artist(artist).unwrap().is_some());
    }

    #[test]
    fn test_atomically_commits_on_success() {
        let (mut store, artist) = store_with_artist();
        let id: SongId = store
            .atomically(|s| s.insert_song(song(artist, None)))
            .unwrap();
        assert!(store.song(id).unwrap().is_some());
    }

    #[test]
    fn test_reopen_keeps_catalog_on_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("catalog.db");
        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.insert_artist(NewArtist { name: "Low".to_string(), biography: None }).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.artists().unwrap().len(), 1);
    }
}
