//! Plugin assembly: wires the API client, registry, poller, deliverer and
//! dispatcher together from a [`Config`].

use crate::api::{MidjourneyClient, MidjourneyService};
use crate::bot::MidjourneyBot;
use crate::chat::{ChannelService, EventOutcome, MessageContext};
use crate::deliver::Deliverer;
use crate::dispatch::CommandDispatcher;
use crate::models::Config;
use crate::poller::Poller;
use crate::registry::TaskRegistry;
use crate::Result;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::info;

/// The assembled plugin as the chat host sees it.
pub struct App {
    dispatcher: CommandDispatcher,
    registry: Arc<TaskRegistry>,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub api: Arc<dyn MidjourneyService>,
    pub channel: Arc<dyn ChannelService>,
}

impl App {
    /// Build an app from concrete service dependencies. Poll jobs are
    /// spawned onto `poll_handle`.
    pub fn with_services(services: AppServices, config: &Config, poll_handle: Handle) -> Self {
        let registry = Arc::new(TaskRegistry::new(config.retention_policy()));
        let deliverer = Arc::new(Deliverer::new(
            registry.clone(),
            services.channel,
            config.trigger_prefix.clone(),
        ));
        let poller = Poller::new(
            services.api.clone(),
            deliverer,
            config.poll_settings(),
            poll_handle,
        );
        let bot = Arc::new(MidjourneyBot::new(
            services.api,
            registry.clone(),
            poller,
            config.task_expiry,
        ));
        let dispatcher =
            CommandDispatcher::new(bot, config.enabled, config.trigger_prefix.clone());

        Self {
            dispatcher,
            registry,
        }
    }

    /// Construct an app talking to the real proxy API.
    pub fn new(
        config: &Config,
        channel: Arc<dyn ChannelService>,
        poll_handle: Handle,
    ) -> Result<Self> {
        let api = MidjourneyClient::new(config.api_key.clone())?
            .with_base_url(config.base_url.clone());
        info!(
            "[MJ] plugin configured, enabled={}, base_url={}, prefix={}",
            config.enabled,
            api.base_url(),
            config.trigger_prefix
        );

        Ok(Self::with_services(
            AppServices {
                api: Arc::new(api),
                channel,
            },
            config,
            poll_handle,
        ))
    }

    pub async fn handle(&self, ctx: &MessageContext) -> EventOutcome {
        self.dispatcher.handle(ctx).await
    }

    pub fn help_text(&self, verbose: bool) -> String {
        self.dispatcher.help_text(verbose)
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::{App, AppServices};
    use crate::api::MockMidjourneyClient;
    use crate::chat::{EventAction, MessageContext, MockChannel, ReplyType};
    use crate::models::Config;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::runtime::Handle;

    fn test_config() -> Config {
        let mut config = Config::from_lookup(|key: &str| match key {
            "LINKAI_API_KEY" => Some("key".to_string()),
            "MJ_ENABLED" => Some("true".to_string()),
            _ => None,
        })
        .unwrap();
        config.poll_interval = Duration::from_millis(1);
        config
    }

    #[tokio::test]
    async fn test_generate_round_trip_through_app() {
        let api = MockMidjourneyClient::new()
            .with_generate_task("T1", None)
            .with_poll_status("IN_PROGRESS")
            .with_poll_finished("I1", "https://img/1.png");
        let channel = MockChannel::new();

        let app = App::with_services(
            AppServices {
                api: Arc::new(api.clone()),
                channel: Arc::new(channel.clone()),
            },
            &test_config(),
            Handle::current(),
        );

        let outcome = app.handle(&MessageContext::text("$mj a cat", "alice")).await;
        assert_eq!(outcome.action, EventAction::BreakPass);

        for _ in 0..200 {
            if channel.get_send_count() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(channel.count_of(ReplyType::ImageUrl), 1);
        assert_eq!(channel.count_of(ReplyType::Info), 1);
        assert_eq!(api.get_poll_count(), 2);
        assert_eq!(app.registry().len(), 1);
    }

    #[tokio::test]
    async fn test_new_builds_real_client() {
        let app = App::new(&test_config(), Arc::new(MockChannel::new()), Handle::current());
        assert!(app.is_ok());
        assert!(app.unwrap().help_text(false).contains("midjourney"));
    }
}
