use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A subscribed channel, as held by the store and persisted in the mirror.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(rename = "youtubeChannelId")]
    pub channel_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "avatar")]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub videos: Vec<Video>,
}

impl Channel {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            name: None,
            avatar_url: None,
            favorite: false,
            videos: Vec::new(),
        }
    }

    /// Appends every incoming video whose id isn't already in the list.
    ///
    /// Returns how many were added.
    pub fn merge_videos(&mut self, incoming: impl IntoIterator<Item = Video>) -> usize {
        let before = self.videos.len();
        for video in incoming {
            if !self.videos.iter().any(|v| v.video_id == video.video_id) {
                self.videos.push(video);
            }
        }
        self.videos.len() - before
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Video {
    #[serde(default, rename = "videoId")]
    pub video_id: Option<String>,
    #[serde(default, rename = "videoTitle")]
    pub title: Option<String>,
    #[serde(default, rename = "videoThumbnail")]
    pub thumbnail_url: Option<String>,
    #[serde(
        default,
        rename = "publishedAt",
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub published_at: Option<OffsetDateTime>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FavoriteUpdate {
    pub channel_id: String,
    pub favorite: bool,
}

impl FavoriteUpdate {
    pub fn new(channel_id: impl Into<String>, favorite: bool) -> Self {
        Self {
            channel_id: channel_id.into(),
            favorite,
        }
    }
}

/// Appends every incoming channel whose id isn't already present. Existing
/// entries are left as they are.
pub fn merge_channels(
    list: &mut Vec<Channel>,
    incoming: impl IntoIterator<Item = Channel>,
) -> usize {
    let before = list.len();
    for channel in incoming {
        if !list.iter().any(|c| c.channel_id == channel.channel_id) {
            list.push(channel);
        }
    }
    list.len() - before
}

/// Drops later duplicates, keeping the first occurrence of each video id.
pub fn dedup_videos(videos: impl IntoIterator<Item = Video>) -> Vec<Video> {
    let mut out = Vec::new();
    for video in videos {
        if !out.iter().any(|v: &Video| v.video_id == video.video_id) {
            out.push(video);
        }
    }
    out
}
