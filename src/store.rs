use std::sync::Arc;

use tokio::task::JoinSet;

use crate::{
    channel::merge_channels, Changes, Channel, Error, FavoriteUpdate, Identity, Mirror, Observers,
    Result, Revision, Session, SubscriptionSource, Video, VideoSource,
};

/// Where [`SubscriptionStore::load_subscriptions`] got its channels from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoadOrigin {
    Mirror,
    Remote,
}

/// The user's subscribed channels, kept in sync with the remote API and the mirror.
///
/// Synchronous methods only touch memory. The `async` ones talk to the collaborators
/// and then apply their result through the synchronous ones, so every change is seen
/// by [`Changes`] handles.
pub struct SubscriptionStore {
    channels: Vec<Channel>,
    observers: Observers,
    identity: Arc<dyn Identity>,
    subscriptions: Arc<dyn SubscriptionSource>,
    videos: Arc<dyn VideoSource>,
    mirror: Arc<dyn Mirror>,
}

impl SubscriptionStore {
    pub fn new(
        identity: Arc<dyn Identity>,
        subscriptions: Arc<dyn SubscriptionSource>,
        videos: Arc<dyn VideoSource>,
        mirror: Arc<dyn Mirror>,
    ) -> Self {
        Self {
            channels: Vec::new(),
            observers: Observers::default(),
            identity,
            subscriptions,
            videos,
            mirror,
        }
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Favorites, then everything else. Relative order is kept within each group.
    pub fn favorites_first(&self) -> Vec<&Channel> {
        let (mut favorites, rest): (Vec<_>, Vec<_>) =
            self.channels.iter().partition(|ch| ch.favorite);
        favorites.extend(rest);
        favorites
    }

    pub fn get(&self, channel_id: &str) -> Option<&Channel> {
        self.channels.iter().find(|ch| ch.channel_id == channel_id)
    }

    pub fn revision(&self) -> Revision {
        self.observers.revision()
    }

    pub fn subscribe(&mut self) -> Changes {
        self.observers.subscribe()
    }

    pub fn replace_all(&mut self, channels: Vec<Channel>) {
        self.channels = channels;
        self.observers.notify();
    }

    /// Returns `false`, changing nothing, when the channel isn't in the store.
    pub fn apply_favorite(&mut self, update: &FavoriteUpdate) -> bool {
        let Some(channel) = self
            .channels
            .iter_mut()
            .find(|ch| ch.channel_id == update.channel_id)
        else {
            return false;
        };

        channel.favorite = update.favorite;
        self.observers.notify();
        true
    }

    /// Appends channels not already present. Known channels aren't updated.
    pub fn merge_discovered_channels(
        &mut self,
        channels: impl IntoIterator<Item = Channel>,
    ) -> usize {
        let added = merge_channels(&mut self.channels, channels);
        if added > 0 {
            self.observers.notify();
        }
        added
    }

    /// Appends videos not already listed under the channel.
    ///
    /// `None` if the channel isn't in the store.
    pub fn merge_discovered_videos(
        &mut self,
        channel_id: &str,
        videos: impl IntoIterator<Item = Video>,
    ) -> Option<usize> {
        let channel = self
            .channels
            .iter_mut()
            .find(|ch| ch.channel_id == channel_id)?;

        let added = channel.merge_videos(videos);
        if added > 0 {
            self.observers.notify();
        }
        Some(added)
    }

    fn session(&self) -> Result<Session> {
        self.identity.session().ok_or_else(|| {
            tracing::warn!("no signed in user");
            Error::Unauthenticated
        })
    }

    /// Populates the store from the mirror, or from the remote API when the
    /// mirror has nothing for this user yet.
    #[tracing::instrument(skip(self))]
    pub async fn load_subscriptions(&mut self) -> Result<LoadOrigin> {
        let session = self.session()?;

        let mut channels = self.mirror.list(&session).await?;
        if channels.is_empty() {
            tracing::info!(uid = %session.uid, "mirror is empty, discovering from remote");
            self.load_subscriptions_from_remote().await?;
            return Ok(LoadOrigin::Remote);
        }

        let ids = channels.iter().map(|ch| ch.channel_id.clone()).collect();
        let videos = self.fetch_videos(&session, ids).await?;
        for (channel, videos) in channels.iter_mut().zip(videos) {
            channel.videos = videos;
        }

        tracing::info!(channels = channels.len(), "loaded subscriptions from mirror");
        self.replace_all(channels);
        Ok(LoadOrigin::Mirror)
    }

    /// Discovers subscriptions from the remote API, restores favorites from the
    /// mirror and writes the result back.
    #[tracing::instrument(skip(self))]
    pub async fn load_subscriptions_from_remote(&mut self) -> Result<()> {
        let session = self.session()?;

        let mut channels = Vec::new();
        merge_channels(
            &mut channels,
            self.subscriptions
                .subscriptions(&session)
                .await?
                .into_iter()
                .map(|ch| Channel {
                    favorite: false,
                    videos: Vec::new(),
                    ..ch
                }),
        );

        let ids = channels.iter().map(|ch| ch.channel_id.clone()).collect();
        let videos = self.fetch_videos(&session, ids).await?;
        for (channel, videos) in channels.iter_mut().zip(videos) {
            channel.videos = videos;
        }

        tracing::info!(channels = channels.len(), "discovered subscriptions");
        self.replace_all(channels);

        self.reconcile_favorites_from_mirror().await?;
        self.persist_all_channels().await?;
        Ok(())
    }

    /// Copies each channel's persisted favorite flag into memory. Channels the
    /// mirror doesn't know about keep their current flag.
    #[tracing::instrument(skip(self))]
    pub async fn reconcile_favorites_from_mirror(&mut self) -> Result<()> {
        let session = self.session()?;

        let mut set = JoinSet::new();
        for (i, channel) in self.channels.iter().enumerate() {
            let mirror = Arc::clone(&self.mirror);
            let session = session.clone();
            let id = channel.channel_id.clone();
            set.spawn(async move { (i, mirror.get(&session, &id).await) });
        }

        let mut favorites = vec![None; self.channels.len()];
        while let Some(joined) = set.join_next().await {
            let (i, persisted) = joined.map_err(Error::persistence)?;
            favorites[i] = persisted?.map(|ch| ch.favorite);
        }

        let channels = self
            .channels
            .iter()
            .zip(favorites)
            .map(|(channel, favorite)| Channel {
                favorite: favorite.unwrap_or(channel.favorite),
                ..channel.clone()
            })
            .collect();

        self.replace_all(channels);
        Ok(())
    }

    /// Writes every channel, videos included, to the mirror.
    ///
    /// All writes have settled when this returns. The first failure is
    /// reported, the other writes still go through.
    #[tracing::instrument(skip(self))]
    pub async fn persist_all_channels(&self) -> Result<usize> {
        let session = self.session()?;

        let mut set = JoinSet::new();
        for channel in &self.channels {
            let mirror = Arc::clone(&self.mirror);
            let session = session.clone();
            let channel = channel.clone();
            set.spawn(async move {
                let res = mirror.set(&session, &channel).await;
                if let Err(err) = &res {
                    tracing::warn!(
                        channel_id = %channel.channel_id,
                        %err,
                        "cannot persist channel"
                    );
                }
                res
            });
        }

        let mut written = 0;
        let mut first_err = None;
        while let Some(joined) = set.join_next().await {
            match joined.map_err(Error::persistence).and_then(|res| res) {
                Ok(()) => written += 1,
                Err(err) => {
                    first_err.get_or_insert(err);
                }
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => {
                tracing::debug!(written, "persisted channels");
                Ok(written)
            }
        }
    }

    /// Sets the flag in memory, then persists just that field.
    ///
    /// Unknown channels are a no-op and return `Ok(false)`.
    #[tracing::instrument(skip(self))]
    pub async fn set_favorite(&mut self, update: FavoriteUpdate) -> Result<bool> {
        if !self.apply_favorite(&update) {
            tracing::debug!(channel_id = %update.channel_id, "no such channel");
            return Ok(false);
        }

        let session = self.session()?;
        self.mirror
            .update_favorite(&session, &update.channel_id, update.favorite)
            .await?;
        Ok(true)
    }

    /// Fetches the channel's latest videos and appends the unseen ones.
    ///
    /// `None` if the channel isn't in the store.
    #[tracing::instrument(skip(self))]
    pub async fn refresh_videos(&mut self, channel_id: &str) -> Result<Option<usize>> {
        let session = self.session()?;
        if self.get(channel_id).is_none() {
            return Ok(None);
        }

        let videos = self.videos.videos(&session, channel_id).await?;
        Ok(self.merge_discovered_videos(channel_id, videos))
    }

    async fn fetch_videos(&self, session: &Session, ids: Vec<String>) -> Result<Vec<Vec<Video>>> {
        let mut set = JoinSet::new();
        let len = ids.len();
        for (i, id) in ids.into_iter().enumerate() {
            let videos = Arc::clone(&self.videos);
            let session = session.clone();
            set.spawn(async move { (i, videos.videos(&session, &id).await) });
        }

        let mut out = vec![Vec::new(); len];
        while let Some(joined) = set.join_next().await {
            let (i, videos) = joined.map_err(Error::remote)?;
            out[i] = videos?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryMirror, StaticIdentity};

    struct NoRemote;

    #[async_trait::async_trait]
    impl SubscriptionSource for NoRemote {
        async fn subscriptions(&self, _: &Session) -> Result<Vec<Channel>> {
            Ok(vec![])
        }
    }

    #[async_trait::async_trait]
    impl VideoSource for NoRemote {
        async fn videos(&self, _: &Session, _: &str) -> Result<Vec<Video>> {
            Ok(vec![])
        }
    }

    fn store() -> SubscriptionStore {
        SubscriptionStore::new(
            Arc::new(StaticIdentity::signed_out()),
            Arc::new(NoRemote),
            Arc::new(NoRemote),
            Arc::new(MemoryMirror::new()),
        )
    }

    fn channel(id: &str, favorite: bool) -> Channel {
        Channel {
            favorite,
            ..Channel::new(id)
        }
    }

    fn ids<'a>(channels: impl IntoIterator<Item = &'a Channel>) -> Vec<&'a str> {
        channels.into_iter().map(|ch| &*ch.channel_id).collect()
    }

    #[test]
    fn favorites_first_is_a_stable_partition() {
        let mut store = store();
        store.replace_all(vec![
            channel("A", false),
            channel("B", true),
            channel("C", false),
            channel("D", true),
        ]);

        assert_eq!(ids(store.favorites_first()), ["B", "D", "A", "C"]);
        assert_eq!(ids(store.channels()), ["A", "B", "C", "D"]);
    }

    #[test]
    fn apply_favorite_on_missing_id_changes_nothing() {
        let mut store = store();
        store.replace_all(vec![channel("A", false), channel("B", true)]);
        let changes = store.subscribe();

        assert!(!store.apply_favorite(&FavoriteUpdate::new("nonexistent", true)));
        assert_eq!(
            store.channels().iter().map(|ch| ch.favorite).collect::<Vec<_>>(),
            [false, true]
        );
        assert_eq!(changes.poll(), None);

        assert!(store.apply_favorite(&FavoriteUpdate::new("A", true)));
        assert!(store.get("A").unwrap().favorite);
        assert_eq!(changes.poll(), Some(store.revision()));
    }

    #[test]
    fn merging_a_known_channel_is_a_no_op() {
        let mut store = store();
        store.replace_all(vec![Channel {
            name: Some("kept".into()),
            ..channel("A", false)
        }]);
        let before = store.revision();

        let added = store.merge_discovered_channels([Channel {
            name: Some("ignored".into()),
            ..channel("A", true)
        }]);

        assert_eq!(added, 0);
        assert_eq!(store.channels().len(), 1);
        assert_eq!(store.get("A").unwrap().name.as_deref(), Some("kept"));
        assert!(!store.get("A").unwrap().favorite);
        assert_eq!(store.revision(), before);
    }

    #[test]
    fn merging_videos_dedups_by_id() {
        let mut store = store();
        store.replace_all(vec![channel("A", false)]);

        let video = |id: &str| Video {
            video_id: Some(id.into()),
            ..Video::default()
        };

        assert_eq!(store.merge_discovered_videos("A", [video("1"), video("2")]), Some(2));
        assert_eq!(store.merge_discovered_videos("A", [video("1")]), Some(0));
        assert_eq!(store.get("A").unwrap().videos.len(), 2);
        assert_eq!(store.merge_discovered_videos("missing", [video("1")]), None);
    }

    #[tokio::test]
    async fn signed_out_actions_report_unauthenticated() {
        let mut store = store();
        store.replace_all(vec![channel("A", false)]);
        let before = store.revision();

        assert!(store.load_subscriptions().await.unwrap_err().is_unauthenticated());
        assert!(store.persist_all_channels().await.unwrap_err().is_unauthenticated());
        assert!(store
            .reconcile_favorites_from_mirror()
            .await
            .unwrap_err()
            .is_unauthenticated());
        assert!(store.refresh_videos("A").await.unwrap_err().is_unauthenticated());

        assert_eq!(ids(store.channels()), ["A"]);
        assert_eq!(store.revision(), before);
    }
}
