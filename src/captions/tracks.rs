//! The slice of YouTube's player response we care about, and caption track selection.

use reqwest::Url;
use serde::Deserialize;

/// A caption track advertised by the player response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    /// `Some("asr")` for auto-generated tracks.
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    pub fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }

    /// Timedtext URL in the plain XML format: any `fmt` query pair is removed.
    pub fn xml_url(&self) -> String {
        let Ok(mut url) = Url::parse(&self.base_url) else {
            return self.base_url.clone();
        };

        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != "fmt")
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
        url.into()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlayerResponse {
    #[serde(default)]
    pub playability_status: Option<PlayabilityStatus>,
    #[serde(default)]
    pub captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlayabilityStatus {
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Captions {
    pub player_captions_tracklist_renderer: TracklistRenderer,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TracklistRenderer {
    #[serde(default)]
    pub caption_tracks: Vec<CaptionTrack>,
}

impl PlayerResponse {
    /// Why the video can't be played, if it can't.
    pub fn unplayable_reason(&self) -> Option<String> {
        let status = self.playability_status.as_ref()?;
        if status.status == "OK" {
            return None;
        }
        Some(
            status
                .reason
                .clone()
                .unwrap_or_else(|| status.status.clone()),
        )
    }

    pub fn into_tracks(self) -> Vec<CaptionTrack> {
        self.captions
            .map(|c| c.player_captions_tracklist_renderer.caption_tracks)
            .unwrap_or_default()
    }
}

/// Pick the track to download.
///
/// Languages are tried in order; within a language a manually created track beats an
/// auto-generated one. With no languages requested, the first manual track wins, else the
/// first track of any kind.
pub fn select_track<'a>(tracks: &'a [CaptionTrack], languages: &[String]) -> Option<&'a CaptionTrack> {
    if languages.is_empty() {
        return tracks
            .iter()
            .find(|t| !t.is_generated())
            .or_else(|| tracks.first());
    }

    languages.iter().find_map(|lang| {
        let mut matching = tracks.iter().filter(|t| t.language_code == *lang);
        let first = matching.clone().next()?;
        Some(matching.find(|t| !t.is_generated()).unwrap_or(first))
    })
}
