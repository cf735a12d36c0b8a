use poise::serenity_prelude as serenity;
use tracing::{debug, info};

use crate::commands::ACCESS_BUTTON_ID;
use crate::verification::SerenityGateway;
use crate::{Data, Error};

/// Route component interactions; slash commands are handled by poise itself
pub async fn handle_interaction(
    ctx: &serenity::Context,
    interaction: &serenity::Interaction,
    data: &Data,
) -> Result<(), Error> {
    let Some(component) = interaction.as_message_component() else {
        return Ok(());
    };

    if component.data.custom_id != ACCESS_BUTTON_ID {
        debug!("Ignoring component with id '{}'", component.data.custom_id);
        return Ok(());
    }

    handle_access_button(ctx, component, data).await
}

/// Verify the member who pressed the access button and reply privately
pub async fn handle_access_button(
    ctx: &serenity::Context,
    component: &serenity::ComponentInteraction,
    data: &Data,
) -> Result<(), Error> {
    let user = &component.user;
    info!("Access button pressed by {} ({})", user.name, user.id);

    // The ticket lookup can outlast Discord's three second reply window
    component
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::Defer(
                serenity::CreateInteractionResponseMessage::new().ephemeral(true),
            ),
        )
        .await?;

    let gateway = SerenityGateway::new(&ctx.http, data.config.guild_id());
    let outcome = data
        .verification_manager
        .verify(&gateway, user.id, &user.name)
        .await;

    let embed = serenity::CreateEmbed::new()
        .description(outcome.user_message())
        .color(outcome.colour());

    component
        .edit_response(&ctx.http, serenity::EditInteractionResponse::new().embed(embed))
        .await?;

    debug!("Verification for {} finished: {:?}", user.id, outcome);
    Ok(())
}
