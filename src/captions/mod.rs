//! Platform caption retrieval (resolution tiers one and two).

use std::cell::RefCell;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT_LANGUAGE;
use serde_json::json;
use tracing::debug;

use crate::course::youtube_url;
use crate::{Error, Result};

pub mod timedtext;
pub mod tracks;

use tracks::{CaptionTrack, PlayerResponse, select_track};

/// Source of provider captions for a video.
pub trait CaptionSource {
    /// Fetch caption text for `video_id`.
    ///
    /// `languages` lists acceptable language codes in preference order; an empty slice means
    /// any language. Implementations return [`Error::NoCaptions`] when nothing matches.
    fn fetch(&self, video_id: &str, languages: &[String]) -> Result<String>;
}

const INNERTUBE_PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player";
const INNERTUBE_CLIENT_NAME: &str = "ANDROID";
const INNERTUBE_CLIENT_VERSION: &str = "20.10.38";

fn api_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).expect("valid api key regex")
    })
}

/// Pull the innertube API key out of a watch page.
pub fn extract_api_key(watch_html: &str) -> Option<&str> {
    api_key_re()
        .captures(watch_html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Track list of the most recently queried video.
///
/// Tier one asks once per language group and tier two once more, all for the same video.
#[derive(Debug, Default)]
struct TrackCache {
    last: RefCell<Option<(String, Vec<CaptionTrack>)>>,
}

impl TrackCache {
    fn get_or_load<F>(&self, video_id: &str, load: F) -> Result<Vec<CaptionTrack>>
    where
        F: FnOnce() -> Result<Vec<CaptionTrack>>,
    {
        let cached = self
            .last
            .borrow()
            .as_ref()
            .filter(|(id, _)| id == video_id)
            .map(|(_, tracks)| tracks.clone());
        if let Some(tracks) = cached {
            return Ok(tracks);
        }

        let tracks = load()?;
        *self.last.borrow_mut() = Some((video_id.to_owned(), tracks.clone()));
        Ok(tracks)
    }
}

/// YouTube captions via the innertube player endpoint.
pub struct YoutubeCaptions {
    client: Client,
    tracks: TrackCache,
}

impl YoutubeCaptions {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("coursescribe/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            tracks: TrackCache::default(),
        })
    }

    /// Caption tracks for `video_id`; empty when the video is not playable.
    fn caption_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>> {
        let player = self.player_response(video_id)?;

        if let Some(reason) = player.unplayable_reason() {
            debug!(video_id, %reason, "video is not playable");
            return Ok(Vec::new());
        }
        Ok(player.into_tracks())
    }

    fn player_response(&self, video_id: &str) -> Result<PlayerResponse> {
        let html = self
            .client
            .get(youtube_url(video_id))
            .header(ACCEPT_LANGUAGE, "en-US")
            .send()?
            .error_for_status()?
            .text()?;

        let api_key = extract_api_key(&html).ok_or_else(|| {
            Error::msg(format!(
                "watch page for '{video_id}' has no innertube API key (consent wall or unavailable video)"
            ))
        })?;

        let body = json!({
            "context": {
                "client": {
                    "clientName": INNERTUBE_CLIENT_NAME,
                    "clientVersion": INNERTUBE_CLIENT_VERSION,
                }
            },
            "videoId": video_id,
        });

        let resp = self
            .client
            .post(format!("{INNERTUBE_PLAYER_URL}?key={api_key}"))
            .json(&body)
            .send()?
            .error_for_status()?
            .json::<PlayerResponse>()?;

        Ok(resp)
    }
}

impl CaptionSource for YoutubeCaptions {
    fn fetch(&self, video_id: &str, languages: &[String]) -> Result<String> {
        let tracks = self
            .tracks
            .get_or_load(video_id, || self.caption_tracks(video_id))?;

        let Some(track) = select_track(&tracks, languages) else {
            debug!(
                video_id,
                available = tracks.len(),
                ?languages,
                "no caption track matched"
            );
            return Err(Error::no_captions(video_id));
        };

        debug!(
            video_id,
            language = %track.language_code,
            generated = track.is_generated(),
            "fetching caption track"
        );

        let xml = self
            .client
            .get(track.xml_url())
            .send()?
            .error_for_status()?
            .text()?;

        timedtext::parse_text(&xml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_api_key_finds_the_key() {
        let html = r#"<script>ytcfg.set({"INNERTUBE_API_KEY": "AIzaSyA-b_c9","OTHER":1});</script>"#;
        assert_eq!(extract_api_key(html), Some("AIzaSyA-b_c9"));
        assert_eq!(extract_api_key("<html></html>"), None);
    }

    fn track(lang: &str) -> CaptionTrack {
        CaptionTrack {
            base_url: format!("https://example.test/timedtext?lang={lang}"),
            language_code: lang.to_owned(),
            kind: None,
        }
    }

    #[test]
    fn track_list_is_loaded_once_per_video() -> anyhow::Result<()> {
        let cache = TrackCache::default();
        let loads = std::cell::Cell::new(0);
        let load = |lang: &str| -> Result<Vec<CaptionTrack>> {
            loads.set(loads.get() + 1);
            Ok(vec![track(lang)])
        };

        for _ in 0..4 {
            let tracks = cache.get_or_load("vid_a", || load("iw"))?;
            assert_eq!(tracks[0].language_code, "iw");
        }
        assert_eq!(loads.get(), 1);

        let tracks = cache.get_or_load("vid_b", || load("en"))?;
        assert_eq!(tracks[0].language_code, "en");
        assert_eq!(loads.get(), 2);
        Ok(())
    }

    #[test]
    fn failed_loads_are_not_cached() -> anyhow::Result<()> {
        let cache = TrackCache::default();

        let err = cache.get_or_load("vid", || Err(Error::msg("offline")));
        assert!(err.is_err());

        let tracks = cache.get_or_load("vid", || Ok(vec![track("he")]))?;
        assert_eq!(tracks.len(), 1);
        Ok(())
    }
}
