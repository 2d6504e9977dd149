use std::collections::{BTreeMap, HashMap};

use tokio::sync::Mutex;

use crate::{Channel, Error, Result, Session};

/// Per-user persisted copy of the channel collection, keyed by channel id.
#[async_trait::async_trait]
pub trait Mirror: Send + Sync {
    /// Every persisted channel for this user.
    async fn list(&self, session: &Session) -> Result<Vec<Channel>>;

    async fn get(&self, session: &Session, channel_id: &str) -> Result<Option<Channel>>;

    /// Creates or fully overwrites the channel's document.
    async fn set(&self, session: &Session, channel: &Channel) -> Result<()>;

    /// Writes only the `favorite` field of an existing document.
    async fn update_favorite(
        &self,
        session: &Session,
        channel_id: &str,
        favorite: bool,
    ) -> Result<()>;
}

/// A mirror that lives in process memory, ordered by channel id like Firestore listings.
#[derive(Default)]
pub struct MemoryMirror {
    users: Mutex<HashMap<String, BTreeMap<String, Channel>>>,
}

impl MemoryMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a user's collection.
    pub async fn insert(&self, uid: &str, channels: impl IntoIterator<Item = Channel>) {
        let mut users = self.users.lock().await;
        let docs = users.entry(uid.to_string()).or_default();
        docs.extend(channels.into_iter().map(|ch| (ch.channel_id.clone(), ch)));
    }

    pub async fn len(&self, uid: &str) -> usize {
        self.users.lock().await.get(uid).map_or(0, BTreeMap::len)
    }
}

#[async_trait::async_trait]
impl Mirror for MemoryMirror {
    async fn list(&self, session: &Session) -> Result<Vec<Channel>> {
        let users = self.users.lock().await;
        Ok(users
            .get(&session.uid)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get(&self, session: &Session, channel_id: &str) -> Result<Option<Channel>> {
        let users = self.users.lock().await;
        Ok(users
            .get(&session.uid)
            .and_then(|docs| docs.get(channel_id))
            .cloned())
    }

    async fn set(&self, session: &Session, channel: &Channel) -> Result<()> {
        let mut users = self.users.lock().await;
        users
            .entry(session.uid.clone())
            .or_default()
            .insert(channel.channel_id.clone(), channel.clone());
        Ok(())
    }

    async fn update_favorite(
        &self,
        session: &Session,
        channel_id: &str,
        favorite: bool,
    ) -> Result<()> {
        let mut users = self.users.lock().await;
        let doc = users
            .get_mut(&session.uid)
            .and_then(|docs| docs.get_mut(channel_id))
            .ok_or_else(|| Error::persistence(anyhow::anyhow!("no document for '{channel_id}'")))?;
        doc.favorite = favorite;
        Ok(())
    }
}
