use std::sync::Arc;

use crate::{channel::dedup_videos, Channel, Mirror, Result, Session, Video};

/// Lists the channels a user is subscribed to.
#[async_trait::async_trait]
pub trait SubscriptionSource: Send + Sync {
    /// Channels come back unfavorited and without videos.
    async fn subscriptions(&self, session: &Session) -> Result<Vec<Channel>>;
}

/// Looks up a channel's videos, most recent first, without duplicate ids.
#[async_trait::async_trait]
pub trait VideoSource: Send + Sync {
    async fn videos(&self, session: &Session, channel_id: &str) -> Result<Vec<Video>>;
}

/// Serves videos from the channel documents already persisted in the mirror.
pub struct CachedVideos {
    mirror: Arc<dyn Mirror>,
}

impl CachedVideos {
    pub fn new(mirror: Arc<dyn Mirror>) -> Self {
        Self { mirror }
    }
}

#[async_trait::async_trait]
impl VideoSource for CachedVideos {
    async fn videos(&self, session: &Session, channel_id: &str) -> Result<Vec<Video>> {
        let videos = self
            .mirror
            .get(session, channel_id)
            .await?
            .map(|channel| channel.videos)
            .unwrap_or_default();
        Ok(dedup_videos(videos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryMirror;

    #[tokio::test]
    async fn cached_videos_read_the_persisted_document() {
        let mirror = Arc::new(MemoryMirror::new());
        let video = Video {
            video_id: Some("v1".into()),
            ..Video::default()
        };
        mirror
            .insert(
                "u",
                [Channel {
                    videos: vec![video.clone(), video.clone()],
                    ..Channel::new("UC1")
                }],
            )
            .await;

        let cached = CachedVideos::new(mirror);
        let session = Session::new("u", "t");

        assert_eq!(cached.videos(&session, "UC1").await.unwrap(), vec![video]);
        assert!(cached.videos(&session, "UC2").await.unwrap().is_empty());
    }
}
