use color_eyre::eyre::{OptionExt, Result, WrapErr};
use md5::{Digest, Md5};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use url::Url;

use crate::model::{Playlist, PlaylistSnapshot, Song};
use crate::ports::server::{MediaServer, StreamOptions, StreamedSong};

const CLIENT_NAME: &str = "playlist-sync";
const API_VERSION: &str = "1.16.1";
const SALT_LENGTH: usize = 6;

/// Error envelope returned by the server with `"status": "failed"`.
#[derive(Debug, thiserror::Error, Deserialize)]
#[error("subsonic error {code}: {message}")]
pub struct ApiError {
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "subsonic-response")]
    subsonic_response: ResponseBody,
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    status: String,
    error: Option<ApiError>,
    playlists: Option<PlaylistsBody>,
    playlist: Option<PlaylistBody>,
}

#[derive(Debug, Deserialize)]
struct PlaylistsBody {
    #[serde(default)]
    playlist: Vec<Playlist>,
}

#[derive(Debug, Deserialize)]
struct PlaylistBody {
    #[serde(flatten)]
    playlist: Playlist,
    #[serde(default)]
    entry: Vec<Song>,
}

/// Subsonic REST client speaking the JSON variant of the API.
pub struct SubsonicClient {
    http: reqwest::Client,
    base: String,
    user: String,
    password: String,
}

impl SubsonicClient {
    pub fn new(host: String, user: String, password: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: host.trim_end_matches('/').to_string(),
            user,
            password,
        }
    }

    /// Authentication query parameters: random salt plus the salted password
    /// hash, per the standard Subsonic token scheme.
    fn auth_params(&self) -> Vec<(&'static str, String)> {
        let salt: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SALT_LENGTH)
            .map(char::from)
            .collect();
        let token = auth_token(&self.password, &salt);

        vec![
            ("u", self.user.clone()),
            ("t", token),
            ("s", salt),
            ("v", API_VERSION.to_string()),
            ("c", CLIENT_NAME.to_string()),
            ("f", "json".to_string()),
        ]
    }

    fn endpoint(&self, name: &str) -> Result<Url> {
        Url::parse(&format!("{}/rest/{}", self.base, name))
            .wrap_err_with(|| format!("Invalid server address: {}", self.base))
    }

    async fn request(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<reqwest::Response> {
        let url = self.endpoint(endpoint)?;
        self.http
            .get(url)
            .query(&self.auth_params())
            .query(params)
            .send()
            .await
            .wrap_err_with(|| format!("Request to {endpoint} failed"))?
            .error_for_status()
            .wrap_err_with(|| format!("Request to {endpoint} was rejected"))
    }

    async fn call(&self, endpoint: &str, params: &[(&str, String)]) -> Result<ResponseBody> {
        let envelope: Envelope = self
            .request(endpoint, params)
            .await?
            .json()
            .await
            .wrap_err_with(|| format!("Failed to parse {endpoint} response"))?;

        into_checked_body(envelope)
    }
}

fn auth_token(password: &str, salt: &str) -> String {
    hex::encode(Md5::digest(format!("{password}{salt}")))
}

fn into_checked_body(envelope: Envelope) -> Result<ResponseBody> {
    let body = envelope.subsonic_response;
    if body.status != "ok" {
        let error = body.error.unwrap_or(ApiError {
            code: 0,
            message: "unknown server error".to_string(),
        });
        return Err(error.into());
    }
    Ok(body)
}

#[async_trait::async_trait]
impl MediaServer for SubsonicClient {
    async fn get_playlists(&self) -> Result<Vec<Playlist>> {
        let body = self.call("getPlaylists", &[]).await?;
        Ok(body.playlists.map(|p| p.playlist).unwrap_or_default())
    }

    async fn get_playlist(&self, id: &str) -> Result<PlaylistSnapshot> {
        let body = self
            .call("getPlaylist", &[("id", id.to_string())])
            .await?;
        let playlist = body
            .playlist
            .ok_or_eyre(format!("Playlist {id} not found"))?;

        Ok(PlaylistSnapshot {
            playlist: playlist.playlist,
            songs: playlist.entry,
        })
    }

    async fn stream(&self, song_id: &str, options: StreamOptions) -> Result<StreamedSong> {
        let mut params = vec![
            ("id", song_id.to_string()),
            ("format", options.format.as_str().to_string()),
        ];
        if let Some(max_bit_rate) = options.max_bit_rate {
            params.push(("maxBitRate", max_bit_rate.to_string()));
        }

        let response = self.request("stream", &params).await?;

        // Some servers answer stream failures with a 200 and a JSON envelope
        // instead of audio bytes.
        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));
        if is_json {
            let envelope: Envelope = response
                .json()
                .await
                .wrap_err("Failed to parse stream error response")?;
            into_checked_body(envelope)?;
            return Err(color_eyre::eyre::eyre!(
                "Server returned no audio for song {song_id}"
            ));
        }

        let data = response
            .bytes()
            .await
            .wrap_err_with(|| format!("Failed to read stream body for song {song_id}"))?;

        Ok(StreamedSong {
            data: data.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_token_matches_api_reference() {
        // Worked example from the Subsonic API documentation.
        assert_eq!(
            auth_token("sesame", "c19b2d"),
            "26719a1196d2a940705a59634eb18eab"
        );
    }

    #[test]
    fn test_playlist_envelope_parses() {
        let json = r#"{
            "subsonic-response": {
                "status": "ok",
                "version": "1.16.1",
                "playlist": {
                    "id": "800",
                    "name": "On the go",
                    "songCount": 2,
                    "created": "2024-03-01T12:00:00.000Z",
                    "changed": "2024-04-01T12:00:00.000Z",
                    "entry": [
                        {"id": "1", "path": "A/B/one.flac", "title": "One", "artist": "A", "suffix": "flac"},
                        {"id": "2", "path": "A/B/two.flac", "title": "Two", "artist": "A", "suffix": "flac"}
                    ]
                }
            }
        }"#;

        let envelope: Envelope = serde_json::from_str(json).unwrap();
        let body = into_checked_body(envelope).unwrap();
        let playlist = body.playlist.unwrap();

        assert_eq!(playlist.playlist.id, "800");
        assert_eq!(playlist.playlist.song_count, 2);
        assert_eq!(playlist.entry.len(), 2);
        assert_eq!(playlist.entry[0].path, "A/B/one.flac");
    }

    #[test]
    fn test_failed_envelope_maps_to_api_error() {
        let json = r#"{
            "subsonic-response": {
                "status": "failed",
                "version": "1.16.1",
                "error": {"code": 70, "message": "Playlist not found"}
            }
        }"#;

        let envelope: Envelope = serde_json::from_str(json).unwrap();
        let error = into_checked_body(envelope).unwrap_err();
        let api_error = error.downcast_ref::<ApiError>().unwrap();

        assert_eq!(api_error.code, 70);
        assert_eq!(api_error.message, "Playlist not found");
    }

    #[test]
    fn test_empty_playlists_body() {
        let json = r#"{"subsonic-response": {"status": "ok", "version": "1.16.1"}}"#;
        let envelope: Envelope = serde_json::from_str(json).unwrap();
        let body = into_checked_body(envelope).unwrap();

        assert!(body.playlists.is_none());
    }
}
