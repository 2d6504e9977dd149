use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};

use crate::{
    document::{Document, Value},
    youtube::USER_AGENT,
    Channel, Config, Error, Mirror, Result, Session,
};

const PAGE_SIZE: u32 = 300;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocuments {
    #[serde(default)]
    documents: Vec<Document>,
    next_page_token: Option<String>,
}

/// Firestore REST client storing channels under `users/{uid}/subscriptions/{channel_id}`.
#[derive(Clone)]
pub struct Client {
    client: reqwest::Client,
    documents: Url,
}

impl Client {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        anyhow::ensure!(
            !config.firestore_project_id.is_empty(),
            "firestore project id was empty"
        );

        let documents = Url::parse(&format!(
            "{}/projects/{}/databases/(default)/documents",
            config.firestore_base_url.trim_end_matches('/'),
            config.firestore_project_id,
        ))?;

        let client = reqwest::ClientBuilder::new()
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client, documents })
    }

    fn url(&self, uid: &str, channel_id: Option<&str>) -> anyhow::Result<Url> {
        let mut url = self.documents.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow::anyhow!("firestore url cannot be a base"))?;
            segments.extend(["users", uid, "subscriptions"]);
            if let Some(id) = channel_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    pub async fn list_channels(&self, session: &Session) -> anyhow::Result<Vec<Channel>> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Query<'a> {
            page_size: u32,
            #[serde(skip_serializing_if = "Option::is_none")]
            page_token: Option<&'a str>,
        }

        let url = self.url(&session.uid, None)?;
        let mut out = vec![];
        let mut page_token = None::<String>;
        loop {
            let query = Query {
                page_size: PAGE_SIZE,
                page_token: page_token.as_deref(),
            };
            let req = self.client.get(url.clone()).query(&query);
            let page: ListDocuments = send(req, session).await?.json().await?;

            for doc in page.documents {
                out.push(doc.into_item()?);
            }

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token.replace(next),
                _ => break,
            };
        }
        Ok(out)
    }

    pub async fn get_channel(
        &self,
        session: &Session,
        channel_id: &str,
    ) -> anyhow::Result<Option<Channel>> {
        let req = self.client.get(self.url(&session.uid, Some(channel_id))?);
        let resp = req
            .header(reqwest::header::AUTHORIZATION, session.firestore_bearer())
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let doc: Document = check(resp).await?.json().await?;
        Ok(Some(doc.into_item()?))
    }

    pub async fn set_channel(&self, session: &Session, channel: &Channel) -> anyhow::Result<()> {
        let doc = Document::from_item(channel)?;
        let req = self
            .client
            .patch(self.url(&session.uid, Some(channel.channel_id.as_str()))?)
            .json(&doc);
        send(req, session).await?;
        Ok(())
    }

    pub async fn patch_favorite(
        &self,
        session: &Session,
        channel_id: &str,
        favorite: bool,
    ) -> anyhow::Result<()> {
        let doc = Document {
            name: None,
            fields: [("favorite".to_string(), Value::BooleanValue(favorite))]
                .into_iter()
                .collect(),
        };
        let req = self
            .client
            .patch(self.url(&session.uid, Some(channel_id))?)
            .query(&[
                ("updateMask.fieldPaths", "favorite"),
                ("currentDocument.exists", "true"),
            ])
            .json(&doc);
        send(req, session).await?;
        Ok(())
    }
}

async fn send(req: RequestBuilder, session: &Session) -> anyhow::Result<Response> {
    let resp = req
        .header(reqwest::header::AUTHORIZATION, session.firestore_bearer())
        .send()
        .await?;
    check(resp).await
}

async fn check(resp: Response) -> anyhow::Result<Response> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let url = resp.url().path().to_string();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|body| body.error.message)
        .unwrap_or(body);
    anyhow::bail!("firestore {url} returned {status}: {message}")
}

#[async_trait::async_trait]
impl Mirror for Client {
    async fn list(&self, session: &Session) -> Result<Vec<Channel>> {
        self.list_channels(session).await.map_err(Error::persistence)
    }

    async fn get(&self, session: &Session, channel_id: &str) -> Result<Option<Channel>> {
        self.get_channel(session, channel_id)
            .await
            .map_err(Error::persistence)
    }

    async fn set(&self, session: &Session, channel: &Channel) -> Result<()> {
        self.set_channel(session, channel)
            .await
            .map_err(Error::persistence)
    }

    async fn update_favorite(
        &self,
        session: &Session,
        channel_id: &str,
        favorite: bool,
    ) -> Result<()> {
        self.patch_favorite(session, channel_id, favorite)
            .await
            .map_err(Error::persistence)
    }
}
