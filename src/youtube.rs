use ::serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    channel::{dedup_videos, merge_channels},
    Channel, Config, Error, Result, Session, SubscriptionSource, Video, VideoSource,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", bound = "T: Deserialize<'de>")]
struct Page<T> {
    #[serde(default)]
    items: Vec<T>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionItem {
    snippet: SubscriptionSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionSnippet {
    title: Option<String>,
    resource_id: ResourceId,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    channel_id: String,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchId,
    snippet: SearchSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchSnippet {
    title: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    published_at: Option<OffsetDateTime>,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    medium: Option<Thumbnail>,
    high: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

impl Thumbnails {
    fn best(self) -> Option<String> {
        self.medium.or(self.high).or(self.default).map(|t| t.url)
    }
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl From<SubscriptionItem> for Channel {
    fn from(item: SubscriptionItem) -> Self {
        let SubscriptionSnippet {
            title,
            resource_id,
            thumbnails,
        } = item.snippet;
        Self {
            name: title,
            avatar_url: thumbnails.best(),
            ..Self::new(resource_id.channel_id)
        }
    }
}

impl From<SearchItem> for Video {
    fn from(item: SearchItem) -> Self {
        Self {
            video_id: item.id.video_id,
            title: item.snippet.title,
            thumbnail_url: item.snippet.thumbnails.best(),
            published_at: item.snippet.published_at,
        }
    }
}

/// YouTube Data API v3 client.
#[derive(Clone)]
pub struct Client {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    max_results: u8,
    subscription_order: Option<String>,
}

impl Client {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::ClientBuilder::new()
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.youtube_base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            max_results: config.max_results(),
            subscription_order: config.subscription_order.clone(),
        })
    }

    pub async fn get_subscriptions(&self, session: &Session) -> anyhow::Result<Vec<Channel>> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Query<'a> {
            part: &'a str,
            mine: bool,
            max_results: u8,
            #[serde(skip_serializing_if = "Option::is_none")]
            order: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            key: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            page_token: Option<&'a str>,
        }

        let mut out = vec![];
        let mut page_token = None::<String>;
        loop {
            let query = Query {
                part: "snippet",
                mine: true,
                max_results: self.max_results,
                order: self.subscription_order.as_deref(),
                key: self.api_key.as_deref(),
                page_token: page_token.as_deref(),
            };

            let page: Page<SubscriptionItem> = self
                .get_page("subscriptions", query, Some(session))
                .await?;
            merge_channels(&mut out, page.items.into_iter().map(Channel::from));

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token.replace(next),
                _ => break,
            };
        }

        tracing::debug!(channels = out.len(), "fetched subscriptions");
        Ok(out)
    }

    /// The channel's latest uploads, newest first. Only the first page is read.
    pub async fn get_videos(
        &self,
        session: Option<&Session>,
        channel_id: &str,
    ) -> anyhow::Result<Vec<Video>> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Query<'a> {
            part: &'a str,
            channel_id: &'a str,
            max_results: u8,
            order: &'a str,
            r#type: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            key: Option<&'a str>,
        }

        let query = Query {
            part: "snippet",
            channel_id,
            max_results: self.max_results,
            order: "date",
            r#type: "video",
            key: self.api_key.as_deref(),
        };

        // the api key is enough for public search, the token is only a fallback
        let session = session.filter(|_| self.api_key.is_none());
        let page: Page<SearchItem> = self.get_page("search", query, session).await?;
        let videos = dedup_videos(page.items.into_iter().map(Video::from));

        tracing::debug!(channel_id, videos = videos.len(), "fetched videos");
        Ok(videos)
    }

    async fn get_page<T>(
        &self,
        ep: &str,
        query: impl Serialize + Send,
        session: Option<&Session>,
    ) -> anyhow::Result<Page<T>>
    where
        T: for<'de> Deserialize<'de> + Send,
    {
        let mut req = self
            .client
            .get(&format!("{}/{ep}", self.base_url))
            .query(&query);

        if let Some(session) = session {
            req = req.header(reqwest::header::AUTHORIZATION, session.youtube_bearer());
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|body| body.error.message)
                .unwrap_or(body);
            anyhow::bail!("youtube {ep} returned {status}: {message}");
        }

        Ok(resp.json().await?)
    }
}

#[async_trait::async_trait]
impl SubscriptionSource for Client {
    async fn subscriptions(&self, session: &Session) -> Result<Vec<Channel>> {
        self.get_subscriptions(session).await.map_err(Error::remote)
    }
}

#[async_trait::async_trait]
impl VideoSource for Client {
    async fn videos(&self, session: &Session, channel_id: &str) -> Result<Vec<Video>> {
        self.get_videos(Some(session), channel_id)
            .await
            .map_err(Error::remote)
    }
}

pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
