use crate::{Data, Error};
use poise::serenity_prelude as serenity;
use tracing::{error, info};

/// Dispatch raw gateway events to every module event handler.
///
/// Handlers run sequentially: an event for a member is fully processed
/// before the next one for the same member arrives on this shard, so
/// evaluations never observe a half-applied ledger update of their own
/// making.
pub async fn dispatch(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            info!("Logged in as {}", data_about_bot.user.name);
        }
        serenity::FullEvent::GuildCreate { guild, is_new } => {
            if is_new.unwrap_or(false) {
                info!("Joined new guild: {} ({})", guild.name, guild.id);
            }
        }
        serenity::FullEvent::GuildDelete { incomplete, .. } => {
            info!("Left guild: {}", incomplete.id);
        }
        _ => {}
    }

    for (module_id, handler) in crate::modules::event_handlers() {
        if let Err(e) = handler(ctx, event, data).await {
            error!("Error in event handler for module {}: {:?}", module_id, e);
        }
    }

    Ok(())
}
