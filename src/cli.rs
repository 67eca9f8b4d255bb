//! # Command-Line Interface Module
//!
//! Clap derive definitions for the `setlist` binary. Every catalog mutation,
//! the preference signals and the three recommendation lists have a
//! subcommand; ids are the numeric ids printed by the `list` commands.
//!
//! ## Examples
//!
//! ```bash
//! setlist artist add "Nina Simone" --bio "High Priestess of Soul"
//! setlist album add "Pastel Blues" --artist 1 --year 1965 --genre Jazz
//! setlist song add "Sinnerman" --artist 1 --duration 622 --genre Jazz --album 1
//! setlist play 1
//! setlist recommend songs --limit 5
//! setlist artist remove 1 --resolution cascade
//! ```

use crate::models::Resolution;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// What to do with dependents when removing an album or artist.
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug, Default)]
pub enum ResolutionArg {
    /// Keep dependents: album songs lose their album, artists with
    /// dependents are not removed.
    #[default]
    Keep,
    /// Remove dependents too.
    Cascade,
    /// Do nothing.
    Cancel,
}

impl From<ResolutionArg> for Resolution {
    fn from(arg: ResolutionArg) -> Self {
        match arg {
            ResolutionArg::Keep => Resolution::Keep,
            ResolutionArg::Cascade => Resolution::Cascade,
            ResolutionArg::Cancel => Resolution::Cancel,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum RecommendKind {
    /// Songs from your favourite genres
    Songs,
    /// Albums by your favourite artists
    Albums,
    /// Artists you have not explored yet
    Artists,
}

#[derive(Parser, Debug)]
#[command(name = "setlist")]
#[command(about = "setlist: a personal music catalog that learns what you like")]
#[command(version)]
pub struct Args {
    /// Catalog database file
    #[arg(long, global = true, env = "SETLIST_DB", value_hint = clap::ValueHint::FilePath)]
    pub db: Option<PathBuf>,

    /// Listening preference file
    #[arg(long, global = true, env = "SETLIST_PREFS", value_hint = clap::ValueHint::FilePath)]
    pub prefs: Option<PathBuf>,

    /// Whose preferences to read and update
    #[arg(long, global = true, env = "SETLIST_USER")]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage artists
    Artist {
        #[command(subcommand)]
        action: ArtistAction,
    },

    /// Manage albums
    Album {
        #[command(subcommand)]
        action: AlbumAction,
    },

    /// Manage songs
    Song {
        #[command(subcommand)]
        action: SongAction,
    },

    /// Manage playlists
    Playlist {
        #[command(subcommand)]
        action: PlaylistAction,
    },

    /// Case-insensitive name search across the whole catalog
    Search {
        text: String,
    },

    /// Record that you listened to a song
    ///
    /// Counts the play and strengthens your preference for the song's genre
    /// and artist.
    Play {
        song_id: i64,
    },

    /// Tell setlist you like a genre or an artist
    Like {
        #[command(subcommand)]
        target: PreferenceTarget,
    },

    /// Tell setlist you dislike a genre or an artist
    Dislike {
        #[command(subcommand)]
        target: PreferenceTarget,
    },

    /// Suggest songs, albums or artists from your listening history
    Recommend {
        kind: RecommendKind,

        /// Maximum number of suggestions
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show your heaviest genres and artists
    Top {
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Generate shell completions
    ///
    /// Usage: setlist completion bash > ~/.local/share/bash-completion/completions/setlist
    Completion {
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ArtistAction {
    Add {
        name: String,
        #[arg(long)]
        bio: Option<String>,
    },
    List,
    Rename {
        id: i64,
        name: String,
    },
    /// Remove an artist
    Remove {
        id: i64,
        #[arg(long, value_enum, default_value_t = ResolutionArg::Keep)]
        resolution: ResolutionArg,
    },
    /// Fold every artist with this name into the one with the most songs
    Merge {
        name: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum AlbumAction {
    Add {
        name: String,
        #[arg(long)]
        artist: i64,
        #[arg(long)]
        year: i32,
        #[arg(long, default_value = "")]
        genre: String,
    },
    List {
        /// Only albums by this artist
        #[arg(long)]
        artist: Option<i64>,
    },
    /// Remove an album
    Remove {
        id: i64,
        #[arg(long, value_enum, default_value_t = ResolutionArg::Keep)]
        resolution: ResolutionArg,
    },
}

#[derive(Subcommand, Debug)]
pub enum SongAction {
    Add {
        name: String,
        #[arg(long)]
        artist: i64,
        /// Length in seconds (1 to 3600)
        #[arg(long)]
        duration: i64,
        #[arg(long, default_value = "")]
        genre: String,
        #[arg(long)]
        album: Option<i64>,
    },
    List {
        #[arg(long, conflicts_with = "album")]
        artist: Option<i64>,
        #[arg(long)]
        album: Option<i64>,
    },
    /// Put a song on an album, or take it off with no album given
    Assign {
        song: i64,
        album: Option<i64>,
    },
    /// Remove a song, including from every playlist
    Remove {
        id: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum PlaylistAction {
    Create {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    List,
    /// Show a playlist's songs in order
    Show {
        id: i64,
    },
    Add {
        playlist: i64,
        song: i64,
    },
    RemoveSong {
        playlist: i64,
        song: i64,
    },
    Delete {
        id: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum PreferenceTarget {
    Genre {
        name: String,
    },
    Artist {
        id: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_remove_defaults_to_keep() {
        let args = Args::try_parse_from(["setlist", "album", "remove", "4"]).unwrap();
        match args.command {
            Command::Album { action: AlbumAction::Remove { id, resolution } } => {
                assert_eq!(id, 4);
                assert_eq!(Resolution::from(resolution), Resolution::Keep);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_paths_after_subcommand() {
        let args = Args::try_parse_from([
            "setlist",
            "recommend",
            "songs",
            "--limit",
            "3",
            "--db",
            "/tmp/x.db",
        ])
        .unwrap();
        assert_eq!(args.db, Some(PathBuf::from("/tmp/x.db")));
        match args.command {
            Command::Recommend { kind, limit } => {
                assert_eq!(kind, RecommendKind::Songs);
                assert_eq!(limit, Some(3));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cascade_resolution_parses() {
        let args =
            Args::try_parse_from(["setlist", "artist", "remove", "2", "--resolution", "cascade"])
                .unwrap();
        assert!(matches!(
            args.command,
            Command::Artist {
                action: ArtistAction::Remove { resolution: ResolutionArg::Cascade, .. }
            }
        ));
    }

    #[test]
    fn test_song_assign_without_album_clears() {
        let args = Args::try_parse_from(["setlist", "song", "assign", "7"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Song { action: SongAction::Assign { song: 7, album: None } }
        ));
    }
}
