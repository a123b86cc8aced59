use color_eyre::eyre::Result;

use crate::config::SongFormat;
use crate::model::{Playlist, PlaylistSnapshot};

/// Options forwarded to the server's `stream` endpoint. Transcoding happens
/// server-side; these only say what to ask for.
#[derive(Debug, Clone, Copy)]
pub struct StreamOptions {
    pub max_bit_rate: Option<u32>,
    pub format: SongFormat,
}

/// Raw bytes of one streamed track.
#[derive(Debug, Clone)]
pub struct StreamedSong {
    pub data: Vec<u8>,
}

/// Port trait wrapping the media server capabilities used by sync logic.
///
/// The production implementation lives in `subsonic`; tests use the mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MediaServer: Send + Sync {
    async fn get_playlists(&self) -> Result<Vec<Playlist>>;
    async fn get_playlist(&self, id: &str) -> Result<PlaylistSnapshot>;
    async fn stream(&self, song_id: &str, options: StreamOptions) -> Result<StreamedSong>;
}
