//! Catalog entities and their identifiers.
//!
//! Ids are assigned by the store on insert. An album does not keep its own
//! list of songs: membership is read back through [`Song::album_id`], so the
//! two can never disagree.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Genre assigned when the caller leaves it blank.
pub const UNKNOWN_GENRE: &str = "Unknown";

/// Longest accepted song, in seconds.
pub const MAX_SONG_DURATION: u32 = 3600;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn as_i64(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

entity_id!(
    /// Identifier of an [`Artist`].
    ArtistId
);
entity_id!(
    /// Identifier of an [`Album`].
    AlbumId
);
entity_id!(
    /// Identifier of a [`Song`].
    SongId
);
entity_id!(
    /// Identifier of a [`Playlist`].
    PlaylistId
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: ArtistId,
    /// Never empty.
    pub name: String,
    pub biography: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: AlbumId,
    pub name: String,
    /// Owning artist. Always references an existing artist.
    pub artist_id: ArtistId,
    /// Always > 0.
    pub release_year: i32,
    pub genre: String,
}

/// How a song is stored in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: SongId,
    pub name: String,
    pub artist_id: ArtistId,
    /// Weak reference; cleared when the album goes away without its songs.
    pub album_id: Option<AlbumId>,
    /// In seconds, 1..=[`MAX_SONG_DURATION`].
    pub duration_secs: u32,
    pub genre: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: PlaylistId,
    pub name: String,
    pub description: String,
}

// Insert payloads: an entity before the store has given it an id.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArtist {
    pub name: String,
    pub biography: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAlbum {
    pub name: String,
    pub artist_id: ArtistId,
    pub release_year: i32,
    pub genre: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSong {
    pub name: String,
    pub artist_id: ArtistId,
    pub album_id: Option<AlbumId>,
    pub duration_secs: u32,
    pub genre: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPlaylist {
    pub name: String,
    pub description: String,
}

impl NewArtist {
    pub fn with_id(self, id: ArtistId) -> Artist {
        Artist { id, name: self.name, biography: self.biography }
    }
}

impl NewAlbum {
    pub fn with_id(self, id: AlbumId) -> Album {
        Album {
            id,
            name: self.name,
            artist_id: self.artist_id,
            release_year: self.release_year,
            genre: self.genre,
        }
    }
}

impl NewSong {
    pub fn with_id(self, id: SongId) -> Song {
        Song {
            id,
            name: self.name,
            artist_id: self.artist_id,
            album_id: self.album_id,
            duration_secs: self.duration_secs,
            genre: self.genre,
        }
    }
}

impl NewPlaylist {
    pub fn with_id(self, id: PlaylistId) -> Playlist {
        Playlist { id, name: self.name, description: self.description }
    }
}

/// What to do with an entity's dependents when it is deleted.
///
/// The caller decides up front; deletion never asks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// Keep the dependents. Albums detach their songs; artists refuse to go
    /// while anything still points at them.
    Keep,
    /// Delete the dependents along with the entity.
    Cascade,
    /// Do nothing.
    Cancel,
}

impl Resolution {
    /// `true` maps to [`Resolution::Cascade`], `false` to [`Resolution::Keep`].
    pub fn from_cascade(cascade: bool) -> Self {
        if cascade {
            Resolution::Cascade
        } else {
            Resolution::Keep
        }
    }
}

/// Everything a name search matched, per entity kind, in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    pub artists: Vec<Artist>,
    pub albums: Vec<Album>,
    pub songs: Vec<Song>,
    pub playlists: Vec<Playlist>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.artists.is_empty()
            && self.albums.is_empty()
            && self.songs.is_empty()
            && self.playlists.is_empty()
    }

    pub fn len(&self) -> usize {
        self.artists.len() + self.albums.len() + self.songs.len() + self.playlists.len()
    }
}

/// Trims a genre and substitutes [`UNKNOWN_GENRE`] when nothing is left.
pub fn normalize_genre(genre: &str) -> String {
    let genre = genre.trim();
    if genre.is_empty() {
        UNKNOWN_GENRE.to_string()
    } else {
        genre.to_string()
    }
}

/// Case-insensitive substring test used by every name search.
pub(crate) fn name_matches(name: &str, needle_lower: &str) -> bool {
    name.to_lowercase().contains(needle_lower)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_genre_defaults_blank_to_unknown() {
        assert_eq!(normalize_genre(""), UNKNOWN_GENRE);
        assert_eq!(normalize_genre("   "), UNKNOWN_GENRE);
        assert_eq!(normalize_genre(" Jazz "), "Jazz");
    }

    #[test]
    fn test_resolution_from_cascade_flag() {
        assert_eq!(Resolution::from_cascade(true), Resolution::Cascade);
        assert_eq!(Resolution::from_cascade(false), Resolution::Keep);
    }

    #[test]
    fn test_ids_serialize_as_plain_integers() {
        let json = serde_json::to_string(&SongId(42)).unwrap();
        assert_eq!(json, "42");
        let back: SongId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SongId(42));
    }
}
