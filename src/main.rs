//! # setlist
//!
//! Command-line front end for the setlist catalog. Opens the SQLite catalog
//! and the preference file, runs one subcommand and saves preferences back
//! when the subcommand changed them.
//!
//! ```bash
//! setlist artist add "Alice Coltrane"
//! setlist song add "Journey in Satchidananda" --artist 1 --duration 398 --genre Jazz
//! setlist play 1
//! setlist recommend artists
//! ```
//!
//! Logging is controlled with `RUST_LOG`, e.g. `RUST_LOG=setlist=debug`.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::{debug, info};
use setlist::catalog::Catalog;
use setlist::cli::{
    self, AlbumAction, ArtistAction, PlaylistAction, PreferenceTarget, RecommendKind, SongAction,
};
use setlist::completion;
use setlist::config::RuntimeConfig;
use setlist::db::SqliteStore;
use setlist::error::CatalogError;
use setlist::models::{Album, AlbumId, Artist, ArtistId, PlaylistId, Song, SongId};
use setlist::preferences::{PreferenceTracker, DISLIKE_DELTA, LIKE_DELTA};
use setlist::recommend::Recommender;
use setlist::store::CatalogStore;

struct Session {
    config: RuntimeConfig,
    catalog: Catalog<SqliteStore>,
    tracker: PreferenceTracker,
}

impl Session {
    fn open(config: RuntimeConfig) -> Result<Self> {
        let store = SqliteStore::open(&config.db_path)
            .with_context(|| format!("Failed to open catalog at {}", config.db_path.display()))?;
        let tracker = PreferenceTracker::load(&config.preferences_path).with_context(|| {
            format!("Failed to read preferences from {}", config.preferences_path.display())
        })?;
        debug!("Session for `{}' on {}", config.user, config.db_path.display());
        Ok(Self { config, catalog: Catalog::new(store), tracker })
    }

    fn save_preferences(&self) -> Result<()> {
        self.tracker.save(&self.config.preferences_path).with_context(|| {
            format!("Failed to write preferences to {}", self.config.preferences_path.display())
        })
    }

    fn store(&self) -> &SqliteStore {
        self.catalog.store()
    }

    fn artist_name(&self, id: ArtistId) -> Result<String> {
        Ok(self.store().artist(id)?.map_or_else(|| format!("#{id}"), |a| a.name))
    }
}

fn format_duration(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn print_artists(artists: &[Artist]) {
    for artist in artists {
        match &artist.biography {
            Some(bio) => println!("{:>5}  {}  ({bio})", artist.id, artist.name),
            None => println!("{:>5}  {}", artist.id, artist.name),
        }
    }
}

fn print_albums(session: &Session, albums: &[Album]) -> Result<()> {
    for album in albums {
        println!(
            "{:>5}  {} ({}) by {}  [{}]",
            album.id,
            album.name,
            album.release_year,
            session.artist_name(album.artist_id)?,
            album.genre
        );
    }
    Ok(())
}

fn print_songs(session: &Session, songs: &[Song]) -> Result<()> {
    for song in songs {
        println!(
            "{:>5}  {} by {}  [{}, {}]",
            song.id,
            song.name,
            session.artist_name(song.artist_id)?,
            song.genre,
            format_duration(song.duration_secs)
        );
    }
    Ok(())
}

fn run_artist(session: &mut Session, action: ArtistAction) -> Result<()> {
    match action {
        ArtistAction::Add { name, bio } => {
            let id = session.catalog.try_add_artist(&name, bio.as_deref())?;
            println!("Added artist {id}: {}", name.trim());
        }
        ArtistAction::List => print_artists(&session.store().artists()?),
        ArtistAction::Rename { id, name } => {
            session.catalog.try_rename_artist(ArtistId(id), &name)?;
            println!("Renamed artist {id}");
        }
        ArtistAction::Remove { id, resolution } => {
            session.catalog.try_remove_artist_with(ArtistId(id), resolution.into())?;
            println!("Removed artist {id}");
        }
        ArtistAction::Merge { name } => {
            let kept = session.catalog.try_merge_duplicate_artists(&name)?;
            println!("Artists named `{}' merged into {kept}", name.trim());
        }
    }
    Ok(())
}

fn run_album(session: &mut Session, action: AlbumAction) -> Result<()> {
    match action {
        AlbumAction::Add { name, artist, year, genre } => {
            let id = session.catalog.try_add_album(&name, ArtistId(artist), year, &genre)?;
            println!("Added album {id}: {}", name.trim());
        }
        AlbumAction::List { artist } => {
            let albums = match artist {
                Some(id) => session.store().albums_by_artist(ArtistId(id))?,
                None => session.store().albums()?,
            };
            print_albums(session, &albums)?;
        }
        AlbumAction::Remove { id, resolution } => {
            session.catalog.try_remove_album_with(AlbumId(id), resolution.into())?;
            println!("Removed album {id}");
        }
    }
    Ok(())
}

fn run_song(session: &mut Session, action: SongAction) -> Result<()> {
    match action {
        SongAction::Add { name, artist, duration, genre, album } => {
            if let Some(album) = album {
                session.store().album(AlbumId(album))?.ok_or_else(|| CatalogError::NotFound {
                    entity: "album",
                    key: album.to_string(),
                })?;
            }
            let id = session.catalog.try_add_song(&name, ArtistId(artist), duration, &genre)?;
            if let Some(album) = album {
                session.catalog.try_add_song_to_album(id, AlbumId(album))?;
            }
            println!("Added song {id}: {}", name.trim());
        }
        SongAction::List { artist, album } => {
            let songs = match (artist, album) {
                (Some(id), _) => session.store().songs_by_artist(ArtistId(id))?,
                (None, Some(id)) => session.store().songs_by_album(AlbumId(id))?,
                (None, None) => session.store().songs()?,
            };
            print_songs(session, &songs)?;
        }
        SongAction::Assign { song, album: Some(album) } => {
            session.catalog.try_add_song_to_album(SongId(song), AlbumId(album))?;
            println!("Song {song} is now on album {album}");
        }
        SongAction::Assign { song, album: None } => {
            session.catalog.try_clear_song_album(SongId(song))?;
            println!("Song {song} is no longer on an album");
        }
        SongAction::Remove { id } => {
            session.catalog.try_remove_song(SongId(id))?;
            println!("Removed song {id}");
        }
    }
    Ok(())
}

fn run_playlist(session: &mut Session, action: PlaylistAction) -> Result<()> {
    match action {
        PlaylistAction::Create { name, description } => {
            let id = session.catalog.try_add_playlist(&name, &description)?;
            println!("Created playlist {id}: {}", name.trim());
        }
        PlaylistAction::List => {
            for playlist in session.store().playlists()? {
                let count = session.store().playlist_song_ids(playlist.id)?.len();
                println!("{:>5}  {}  ({count} songs)", playlist.id, playlist.name);
            }
        }
        PlaylistAction::Show { id } => {
            let playlist = session
                .store()
                .playlist(PlaylistId(id))?
                .ok_or_else(|| CatalogError::NotFound { entity: "playlist", key: id.to_string() })?;
            println!("{}", playlist.name);
            if !playlist.description.is_empty() {
                println!("{}", playlist.description);
            }
            print_songs(session, &session.store().playlist_songs(playlist.id)?)?;
        }
        PlaylistAction::Add { playlist, song } => {
            session.catalog.try_add_song_to_playlist(SongId(song), PlaylistId(playlist))?;
            println!("Added song {song} to playlist {playlist}");
        }
        PlaylistAction::RemoveSong { playlist, song } => {
            session.catalog.try_remove_song_from_playlist(SongId(song), PlaylistId(playlist))?;
            println!("Removed song {song} from playlist {playlist}");
        }
        PlaylistAction::Delete { id } => {
            session.catalog.try_remove_playlist(PlaylistId(id))?;
            println!("Deleted playlist {id}");
        }
    }
    Ok(())
}

fn run_preference(session: &mut Session, target: PreferenceTarget, delta: i64) -> Result<()> {
    let user = session.config.user.clone();
    match target {
        PreferenceTarget::Genre { name } => {
            session.tracker.update_genre_preference(&user, &name, delta);
            println!("Genre `{}' adjusted by {delta}", name.trim());
        }
        PreferenceTarget::Artist { id } => {
            let artist = session
                .store()
                .artist(ArtistId(id))?
                .ok_or_else(|| CatalogError::NotFound { entity: "artist", key: id.to_string() })?;
            session.tracker.update_artist_preference(&user, artist.id, delta);
            println!("Artist `{}' adjusted by {delta}", artist.name);
        }
    }
    session.save_preferences()
}

fn run_recommend(session: &Session, kind: RecommendKind, limit: Option<usize>) -> Result<()> {
    let recommender =
        Recommender::with_config(&session.tracker, session.store(), session.config.recommend);
    let limit = limit.unwrap_or(session.config.recommend.default_limit);
    let user = session.config.user.as_str();

    match kind {
        RecommendKind::Songs => {
            print_songs(session, &recommender.try_recommend_songs_by_genre(user, limit)?)?
        }
        RecommendKind::Albums => {
            print_albums(session, &recommender.try_recommend_albums_by_artist(user, limit)?)?
        }
        RecommendKind::Artists => print_artists(&recommender.try_recommend_artists(user, limit)?),
    }
    Ok(())
}

fn run_top(session: &Session, limit: usize) -> Result<()> {
    let user = session.config.user.as_str();
    println!("Genres:");
    for (genre, weight) in session.tracker.top_genres(user).into_iter().take(limit) {
        println!("  {weight:>5}  {genre}");
    }
    println!("Artists:");
    for (artist, weight) in session.tracker.top_artists(user).into_iter().take(limit) {
        println!("  {weight:>5}  {}", session.artist_name(artist)?);
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();

    // Completion needs neither the catalog nor the data directory.
    if let cli::Command::Completion { shell } = args.command {
        let mut cmd = cli::Args::command();
        completion::generate_completions(
            completion::shell_to_completion_shell(shell),
            &mut cmd,
            &mut std::io::stdout(),
        );
        return Ok(());
    }

    let config = RuntimeConfig::resolve(args.db, args.prefs, args.user)?;
    let mut session = Session::open(config)?;

    match args.command {
        cli::Command::Artist { action } => run_artist(&mut session, action)?,
        cli::Command::Album { action } => run_album(&mut session, action)?,
        cli::Command::Song { action } => run_song(&mut session, action)?,
        cli::Command::Playlist { action } => run_playlist(&mut session, action)?,
        cli::Command::Search { text } => {
            let results = session.store().search_by_name(&text)?;
            info!("Search for `{text}' matched {} entries", results.len());
            print_artists(&results.artists);
            print_albums(&session, &results.albums)?;
            print_songs(&session, &results.songs)?;
            for playlist in &results.playlists {
                println!("{:>5}  {} (playlist)", playlist.id, playlist.name);
            }
        }
        cli::Command::Play { song_id } => {
            let user = session.config.user.clone();
            session.tracker.try_record_play(&user, SongId(song_id), session.catalog.store())?;
            session.save_preferences()?;
            println!(
                "Recorded play of song {song_id} ({} total)",
                session.tracker.play_count(&user, SongId(song_id))
            );
        }
        cli::Command::Like { target } => run_preference(&mut session, target, LIKE_DELTA)?,
        cli::Command::Dislike { target } => run_preference(&mut session, target, DISLIKE_DELTA)?,
        cli::Command::Recommend { kind, limit } => run_recommend(&session, kind, limit)?,
        cli::Command::Top { limit } => run_top(&session, limit)?,
        cli::Command::Completion { .. } => {}
    }

    Ok(())
}
