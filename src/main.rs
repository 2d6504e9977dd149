use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use tubesync::{firestore, youtube, Config, FavoriteUpdate, StaticIdentity, SubscriptionStore};

enum Command {
    List,
    Favorite { channel_id: String, favorite: bool },
    Refresh { channel_id: String },
    Sync,
}

impl Command {
    fn parse(mut args: impl Iterator<Item = String>) -> anyhow::Result<Self> {
        const USAGE: &str = "usage: tubesync \
            [list | favorite <channel_id> <on|off> | refresh <channel_id> | sync]";

        let cmd = match args.next().as_deref() {
            None | Some("list") => Self::List,
            Some("favorite") => {
                let channel_id = args.next().ok_or_else(|| anyhow::anyhow!(USAGE))?;
                let favorite = match args.next().as_deref() {
                    Some("on" | "true") => true,
                    Some("off" | "false") => false,
                    _ => anyhow::bail!(USAGE),
                };
                Self::Favorite {
                    channel_id,
                    favorite,
                }
            }
            Some("refresh") => Self::Refresh {
                channel_id: args.next().ok_or_else(|| anyhow::anyhow!(USAGE))?,
            },
            Some("sync") => Self::Sync,
            Some(_) => anyhow::bail!(USAGE),
        };
        Ok(cmd)
    }
}

fn print_channels(store: &SubscriptionStore) {
    for channel in store.favorites_first() {
        let mark = if channel.favorite { '*' } else { ' ' };
        let name = channel.name.as_deref().unwrap_or("<unnamed>");
        println!(
            "{mark} {:<24} {name} ({} videos)",
            channel.channel_id,
            channel.videos.len()
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    simple_env_load::load_env_from([".dev.env", ".secrets.env"]);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let command = Command::parse(std::env::args().skip(1))?;

    let config = match std::env::var("TUBESYNC_CONFIG") {
        Ok(path) => Config::load(path)?,
        Err(_) => Config::from_env()?,
    };
    let youtube = Arc::new(youtube::Client::new(&config)?);
    let mirror = Arc::new(firestore::Client::new(&config)?);

    let mut store = SubscriptionStore::new(
        Arc::new(StaticIdentity::from_env()),
        youtube.clone(),
        youtube,
        mirror,
    );

    match command {
        Command::List => {
            let origin = store.load_subscriptions().await?;
            tracing::info!(?origin, "loaded");
            print_channels(&store);
        }
        Command::Favorite {
            channel_id,
            favorite,
        } => {
            store.load_subscriptions().await?;
            let update = FavoriteUpdate::new(&*channel_id, favorite);
            if !store.set_favorite(update).await? {
                anyhow::bail!("not subscribed to '{channel_id}'");
            }
            print_channels(&store);
        }
        Command::Refresh { channel_id } => {
            store.load_subscriptions().await?;
            let Some(added) = store.refresh_videos(&channel_id).await? else {
                anyhow::bail!("not subscribed to '{channel_id}'");
            };
            eprintln!("{added} new videos");

            let channel = store
                .get(&channel_id)
                .ok_or_else(|| anyhow::anyhow!("channel '{channel_id}' disappeared"))?;
            for video in &channel.videos {
                println!(
                    "{:<12} {}",
                    video.video_id.as_deref().unwrap_or("-"),
                    video.title.as_deref().unwrap_or("<untitled>")
                );
            }
        }
        Command::Sync => {
            store.load_subscriptions_from_remote().await?;
            print_channels(&store);
        }
    }

    Ok(())
}
