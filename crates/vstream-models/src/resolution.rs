//! Resolution tags and the rendition ladder.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Resolution tag of a stored video file.
///
/// `Original` is reserved for the as-uploaded source; every other tag is
/// produced by the transcoding pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "original")]
    Original,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "360p")]
    P360,
    #[serde(rename = "120p")]
    P120,
}

impl Resolution {
    /// All tags, in declaration order.
    pub const ALL: [Resolution; 5] = [
        Resolution::Original,
        Resolution::P1080,
        Resolution::P720,
        Resolution::P360,
        Resolution::P120,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Original => "original",
            Resolution::P1080 => "1080p",
            Resolution::P720 => "720p",
            Resolution::P360 => "360p",
            Resolution::P120 => "120p",
        }
    }

    /// Whether this is the as-uploaded source tag.
    pub fn is_original(&self) -> bool {
        matches!(self, Resolution::Original)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown resolution: {0}")]
pub struct ParseResolutionError(pub String);

impl FromStr for Resolution {
    type Err = ParseResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resolution::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseResolutionError(s.to_string()))
    }
}

/// One entry of the ladder: target height and bitrate tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenditionSpec {
    pub resolution: Resolution,
    /// Target height in pixels; width follows the source aspect ratio.
    pub height: u32,
    /// Video bitrate token passed verbatim to the encoder (e.g. "5000k").
    pub video_bitrate: String,
    /// Audio bitrate token passed verbatim to the encoder (e.g. "192k").
    pub audio_bitrate: String,
}

impl RenditionSpec {
    pub fn new(
        resolution: Resolution,
        height: u32,
        video_bitrate: impl Into<String>,
        audio_bitrate: impl Into<String>,
    ) -> Self {
        Self {
            resolution,
            height,
            video_bitrate: video_bitrate.into(),
            audio_bitrate: audio_bitrate.into(),
        }
    }

    /// Video bitrate in kbps, if the token is in `k`/`M` notation.
    pub fn video_bitrate_kbps(&self) -> Option<u32> {
        parse_bitrate_kbps(&self.video_bitrate)
    }
}

fn parse_bitrate_kbps(token: &str) -> Option<u32> {
    let token = token.trim();
    if let Some(k) = token.strip_suffix(&['k', 'K'][..]) {
        return k.parse().ok();
    }
    if let Some(m) = token.strip_suffix('M') {
        return m.parse::<u32>().ok().map(|v| v * 1000);
    }
    token.parse::<u32>().ok().map(|bps| bps / 1000)
}

/// Ordered list of renditions produced from one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolutionLadder(Vec<RenditionSpec>);

impl Default for ResolutionLadder {
    fn default() -> Self {
        Self(vec![
            RenditionSpec::new(Resolution::P1080, 1080, "5000k", "192k"),
            RenditionSpec::new(Resolution::P720, 720, "2500k", "128k"),
            RenditionSpec::new(Resolution::P360, 360, "800k", "96k"),
            RenditionSpec::new(Resolution::P120, 120, "300k", "64k"),
        ])
    }
}

impl ResolutionLadder {
    pub fn new(entries: Vec<RenditionSpec>) -> Self {
        Self(entries)
    }

    /// Keep only the listed resolutions. Ladder order is preserved
    /// regardless of the order of `names`.
    pub fn restricted_to(&self, names: &[Resolution]) -> Self {
        Self(
            self.0
                .iter()
                .filter(|spec| names.contains(&spec.resolution))
                .cloned()
                .collect(),
        )
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RenditionSpec> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, resolution: Resolution) -> Option<&RenditionSpec> {
        self.0.iter().find(|spec| spec.resolution == resolution)
    }
}

impl<'a> IntoIterator for &'a ResolutionLadder {
    type Item = &'a RenditionSpec;
    type IntoIter = std::slice::Iter<'a, RenditionSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
