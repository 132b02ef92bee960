//! Discord gateway adapter and REST-backed user directory

use async_trait::async_trait;
use serenity::http::Http;
use serenity::model::gateway::Ready;
use serenity::model::id::UserId;
use serenity::model::voice::VoiceState;
use serenity::prelude::*;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::directory::UserDirectory;
use crate::presence::VoiceEvent;

struct VoiceHandler {
    events_tx: mpsc::Sender<VoiceEvent>,
}

#[async_trait]
impl EventHandler for VoiceHandler {
    async fn voice_state_update(&self, _ctx: Context, _old: Option<VoiceState>, new: VoiceState) {
        let event = VoiceEvent::observed_now(
            new.user_id.to_string(),
            new.channel_id.map(|id| id.to_string()),
        );

        debug!(
            user_id = %event.user_id,
            channel_id = ?event.channel_id,
            "Voice state update"
        );

        if let Err(e) = self.events_tx.send(event).await {
            error!("Presence worker unavailable, dropping voice event: {}", e);
        }
    }

    async fn ready(&self, _: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);
    }
}

/// Gateway connection feeding voice state changes to the presence worker
pub struct DiscordAdapter {
    token: String,
}

impl DiscordAdapter {
    pub fn new(token: String) -> Self {
        Self { token }
    }

    /// Connect and forward voice events until the client stops
    ///
    /// Reconnects after gateway drops are handled inside serenity.
    pub async fn start(&self, events_tx: mpsc::Sender<VoiceEvent>) -> anyhow::Result<()> {
        info!("Starting Discord adapter");

        let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES;

        let mut client = Client::builder(&self.token, intents)
            .event_handler(VoiceHandler { events_tx })
            .await?;

        if let Err(why) = client.start().await {
            error!("Client error: {:?}", why);
            anyhow::bail!("Discord client error: {:?}", why);
        }

        Ok(())
    }
}

/// User names looked up through the Discord REST API
pub struct DiscordDirectory {
    http: Arc<Http>,
}

impl DiscordDirectory {
    pub fn new(token: &str) -> Self {
        Self {
            http: Arc::new(Http::new(token)),
        }
    }
}

#[async_trait]
impl UserDirectory for DiscordDirectory {
    async fn display_name(&self, user_id: &str) -> Option<String> {
        let id = parse_user_id(user_id)?;

        match self.http.get_user(id).await {
            Ok(user) => Some(user.name),
            Err(e) => {
                debug!(user_id, "User lookup failed: {}", e);
                None
            }
        }
    }
}

/// Snowflake ids are non-zero integers
fn parse_user_id(raw: &str) -> Option<UserId> {
    raw.parse::<u64>().ok().filter(|id| *id != 0).map(UserId::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_id() {
        assert_eq!(parse_user_id("80351110224678912"), Some(UserId::new(80351110224678912)));
        assert_eq!(parse_user_id("0"), None);
        assert_eq!(parse_user_id("not-a-snowflake"), None);
    }
}
