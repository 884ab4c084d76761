use crate::components::store::StoreActorHandle;
use crate::components::ComponentManager;
use crate::config::Config;
use crate::error::BotResult;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tokio::sync::RwLock;

// Export submodules
pub mod calendar;
pub mod util;

/// Shared context for all commands
pub struct CommandContext {
    pub config: Arc<RwLock<Config>>,
    pub component_manager: Option<Arc<ComponentManager>>,
    pub store_handle: StoreActorHandle,
}

impl std::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("component_manager", &self.component_manager)
            .finish_non_exhaustive()
    }
}

impl CommandContext {
    /// Create a new command context
    pub fn new(config: Arc<RwLock<Config>>, store_handle: StoreActorHandle) -> Self {
        Self {
            config,
            component_manager: None,
            store_handle,
        }
    }

    /// Set the component manager
    pub fn with_component_manager(mut self, component_manager: Arc<ComponentManager>) -> Self {
        self.component_manager = Some(component_manager);
        self
    }
}

/// Type alias for command result
pub type CommandResult = BotResult<()>;

/// Type alias for poise context
pub type Context<'a> = poise::Context<'a, CommandContext, crate::error::Error>;

/// All application commands and event listeners
pub fn get_all_application_commands() -> Vec<poise::Command<CommandContext, crate::error::Error>> {
    vec![
        util::ping(),
        calendar::start(),
        calendar::stop(),
        calendar::refresh(),
    ]
}

/// Build a success embed for command replies
pub fn create_success_embed(title: &str, description: &str) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(title.to_string())
        .description(description.to_string())
        .color(serenity::Color::DARK_GREEN)
}

/// Build an error embed for command replies
pub fn create_error_embed(title: &str, description: &str) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(title.to_string())
        .description(description.to_string())
        .color(serenity::Color::RED)
}
