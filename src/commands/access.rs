use poise::serenity_prelude::{self as serenity, Mentionable};
use tracing::{error, info, warn};

use crate::messages::access_panel_message;
use crate::verification::types::SUCCESS_COLOUR;
use crate::{Context, Error};

/// Stable id of the access button; buttons posted by earlier runs keep working
pub const ACCESS_BUTTON_ID: &str = "btn-access";

pub fn access_button() -> serenity::CreateButton {
    serenity::CreateButton::new(ACCESS_BUTTON_ID)
        .label("Get Access")
        .style(serenity::ButtonStyle::Success)
}

/// Channel kinds the access panel can be posted into
pub fn accepts_access_panel(kind: serenity::ChannelType) -> bool {
    matches!(
        kind,
        serenity::ChannelType::Text | serenity::ChannelType::News
    )
}

/// Post the access button in the verification channel
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "MANAGE_GUILD",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn button(ctx: Context<'_>) -> Result<(), Error> {
    let config = &ctx.data().config;
    let channel_id = config.channel_id();

    let channel = match channel_id.to_channel(ctx.serenity_context()).await {
        Ok(channel) => channel,
        Err(e) => {
            error!("Failed to fetch verification channel {}: {}", channel_id, e);
            ctx.send(
                poise::CreateReply::default()
                    .content(format!(
                        "I couldn't open the configured verification channel (ID {}). Check 'channel_id' and my access to it.",
                        channel_id
                    ))
                    .ephemeral(true),
            )
            .await?;
            return Ok(());
        }
    };

    let Some(channel) = channel
        .guild()
        .filter(|c| accepts_access_panel(c.kind))
    else {
        warn!(
            "Verification channel {} is not a text channel; access panel not posted",
            channel_id
        );
        ctx.send(
            poise::CreateReply::default()
                .content(format!(
                    "The configured verification channel <#{}> is not a text channel, so I can't post the access button there.",
                    channel_id
                ))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };

    let embed = serenity::CreateEmbed::new()
        .title("Access")
        .description(access_panel_message(
            &config.event_name,
            config.code_of_conduct_url.as_deref(),
        ))
        .color(SUCCESS_COLOUR);

    channel
        .send_message(
            ctx.serenity_context(),
            serenity::CreateMessage::new()
                .embed(embed)
                .components(vec![serenity::CreateActionRow::Buttons(vec![access_button()])]),
        )
        .await?;

    info!(
        "Access panel posted in #{} ({}) by {}",
        channel.name,
        channel.id,
        ctx.author().name
    );

    ctx.send(
        poise::CreateReply::default()
            .content(format!("Message sent to {}", channel.mention()))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}
