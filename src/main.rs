use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Discord bot granting server access to registered Tito ticket holders
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the JSON configuration (defaults to $CONFIG_PATH, then config.json)
    #[arg(long, short = 'c')]
    config: Option<String>,

    /// Register slash commands globally instead of in the configured guild
    /// (takes up to an hour to propagate)
    #[arg(long)]
    global_commands: bool,
}

mod commands;
mod config;
mod error;
mod events;
mod logging;
mod managers;
mod messages;
mod tito;
mod verification;

use commands::{button, help, ping};
use config::BotConfig;
use events::handle_interaction;
use managers::{create_shared_verification_manager, run_startup_access_check, SharedVerificationManager};
use tito::TitoClient;

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared application state
pub struct Data {
    pub config: Arc<BotConfig>,
    pub verification_manager: SharedVerificationManager,
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    if let serenity::FullEvent::InteractionCreate { interaction } = event {
        if let Err(e) = handle_interaction(ctx, interaction, data).await {
            error!("Failed to handle interaction: {}", e);
        }
    }
    Ok(())
}

/// Application id encoded in the first segment of a bot token
fn application_id_from_token(token: &str) -> Option<String> {
    use base64::Engine;

    let encoded = token.split('.').next()?;
    // Discord tokens use URL-safe base64 without padding, older ones standard
    let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(encoded)
        .or_else(|_| base64::engine::general_purpose::STANDARD_NO_PAD.decode(encoded))
        .ok()?;
    let id = String::from_utf8(decoded).ok()?;
    (!id.is_empty() && id.chars().all(|c| c.is_ascii_digit())).then_some(id)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    logging::init();

    let config_path = args
        .config
        .or_else(|| std::env::var("CONFIG_PATH").ok())
        .unwrap_or_else(|| "config.json".to_string());

    info!("Loading configuration from {}...", config_path);
    let config = Arc::new(BotConfig::load_from_file(&config_path)?);
    info!(
        "Verifying against Tito {}/{} (question '{}', {:?} matching)",
        config.tito.account_slug,
        config.tito.event_slug,
        config.tito.question_slug,
        config.tito.match_policy
    );

    if let Some(id) = application_id_from_token(&config.discord.token) {
        info!(
            "Bot ID: {} (settings at https://discord.com/developers/applications/{}/bot)",
            id, id
        );
    }

    let tito_client = TitoClient::new(&config.tito)?;
    info!("Ticket answers endpoint: {}", tito_client.answers_url());
    let verification_manager =
        create_shared_verification_manager(config.role_id(), Arc::new(tito_client));

    let global_commands = args.global_commands;
    let setup_config = config.clone();

    // Build framework
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![ping(), help(), button()],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            pre_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' invoked by {} (ID: {}) in {}",
                        ctx.command().qualified_name,
                        ctx.author().name,
                        ctx.author().id,
                        ctx.guild_id().map(|g| g.to_string()).unwrap_or_else(|| "DM".to_string())
                    );
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' completed for {}",
                        ctx.command().qualified_name,
                        ctx.author().name
                    );
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!("Error in command '{}': {}", ctx.command().qualified_name, error);
                            let _ = ctx
                                .send(
                                    poise::CreateReply::default()
                                        .content("Sorry, something went wrong running that command. The error has been logged.")
                                        .ephemeral(true),
                                )
                                .await;
                        }
                        poise::FrameworkError::MissingBotPermissions { missing_permissions, ctx, .. } => {
                            error!("Bot missing permissions for '{}': {:?}", ctx.command().qualified_name, missing_permissions);
                            let _ = ctx.say(format!("Bot is missing permissions: {}", missing_permissions)).await;
                        }
                        poise::FrameworkError::MissingUserPermissions { missing_permissions, ctx, .. } => {
                            warn!("User {} missing permissions for '{}': {:?}", ctx.author().name, ctx.command().qualified_name, missing_permissions);
                        }
                        poise::FrameworkError::GuildOnly { ctx, .. } => {
                            warn!("Command '{}' is guild-only, used in DM by {}", ctx.command().qualified_name, ctx.author().name);
                        }
                        other => {
                            error!("Other framework error: {}", other);
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            let config = setup_config.clone();
            let verification_manager = verification_manager.clone();

            Box::pin(async move {
                info!("Bot logged in as: {}", ready.user.name);

                let guild_id = config.guild_id();
                if !ready.guilds.iter().any(|g| g.id == guild_id) {
                    warn!("Bot is not a member of the configured guild {}", guild_id);
                }

                run_startup_access_check(ctx.http.as_ref(), guild_id, config.role_id()).await;

                if global_commands {
                    info!("Registering commands globally...");
                    if let Err(e) =
                        poise::builtins::register_globally(ctx, &framework.options().commands).await
                    {
                        error!("Failed to register commands globally: {}", e);
                    } else {
                        info!("Successfully registered {} commands globally (may take up to 1 hour to propagate)",
                              framework.options().commands.len());
                    }
                } else {
                    info!("Registering commands to guild: {}", guild_id);
                    if let Err(e) = poise::builtins::register_in_guild(
                        ctx,
                        &framework.options().commands,
                        guild_id,
                    ).await {
                        error!("Failed to register commands for guild {}: {}", guild_id, e);
                    } else {
                        info!("Successfully registered {} commands for guild {}",
                              framework.options().commands.len(), guild_id);
                    }
                }

                info!("Listening for '{}' button presses", commands::ACCESS_BUTTON_ID);

                Ok(Data {
                    config,
                    verification_manager,
                })
            })
        })
        .build();

    // Members and roles are fetched over HTTP, so no privileged intents are needed
    let intents = serenity::GatewayIntents::GUILDS;

    let mut client = serenity::ClientBuilder::new(&config.discord.token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot...");
    if let Err(e) = client.start().await {
        error!("Failed to start bot: {}", e);
        return Err(e.into());
    }
    warn!("Bot ended.");

    Ok(())
}
