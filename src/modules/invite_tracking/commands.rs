use crate::db::entities::invite_records;
use crate::modules::invite_ranks;
use crate::modules::invite_tracking::{records, tracking};
use crate::services::localization::ContextL10nExt;
use crate::{Context, Error};
use poise::serenity_prelude as serenity;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

/// View invite statistics
#[poise::command(
    slash_command,
    guild_only,
    subcommands("stats", "codes", "leaderboard", "config")
)]
pub async fn invites(ctx: Context<'_>) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .content("Please use a subcommand: `/invites stats`, `/invites codes`, `/invites leaderboard` or `/invites config`")
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// View the invite ledger for a user
#[poise::command(slash_command, guild_only)]
pub async fn stats(
    ctx: Context<'_>,
    #[description = "User to check (defaults to you)"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().unwrap();
    let target = user.as_ref().unwrap_or_else(|| ctx.author());

    if tracking::get_config(guild_id, ctx.data()).await?.is_none() {
        ctx.send(
            poise::CreateReply::default()
                .content(ctx.l10n_guild().t("invites-module-disabled", None))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    ctx.defer().await?;

    let record = records::get_record(guild_id, target.id, ctx.data()).await?;

    let mut response = format!("📊 **Invites for {}**\n\n", target.name);

    match record {
        Some(record) => {
            // Effective counts are shown unclamped, negatives included.
            response.push_str(&format!(
                "**{}** invites ({} regular, {} bonus, -{} fake, -{} leaves)\n",
                records::effective_invites(&record),
                record.regular,
                record.bonus,
                record.fake,
                record.leaves
            ));
        }
        None => {
            response.push_str("No invites tracked yet.\n");
        }
    }

    ctx.send(poise::CreateReply::default().content(response))
        .await?;

    Ok(())
}

/// View a user's active invite links (Admin only)
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn codes(
    ctx: Context<'_>,
    #[description = "User to get codes of (defaults to you)"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().unwrap();
    let target = user.as_ref().unwrap_or_else(|| ctx.author());

    if tracking::get_config(guild_id, ctx.data()).await?.is_none() {
        ctx.send(
            poise::CreateReply::default()
                .content(ctx.l10n_guild().t("invites-module-disabled", None))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    ctx.defer_ephemeral().await?;

    let invites = match tracking::fetch_guild_invites(ctx.serenity_context(), guild_id).await {
        Ok(invites) => invites,
        Err(e) => {
            ctx.send(
                poise::CreateReply::default()
                    .content(format!("Failed to fetch invites: {:?}", e))
                    .ephemeral(true),
            )
            .await?;
            return Ok(());
        }
    };

    let user_invites: Vec<_> = invites
        .iter()
        .filter(|inv| inv.inviter_id == Some(target.id))
        .collect();

    let mut response = format!("🔗 **Active invites of {}**\n\n", target.name);

    if user_invites.is_empty() {
        response.push_str("No active invite links.");
    } else {
        let total: i64 = user_invites.iter().map(|inv| i64::from(inv.uses)).sum();

        for invite in &user_invites {
            response.push_str(&format!("**`{}`**", invite.code));
            if let Some(channel_id) = invite.channel_id {
                response.push_str(&format!(" <#{}>", channel_id));
            }
            response.push_str(&format!(" | {} uses", invite.uses));
            if invite.max_uses > 0 {
                response.push_str(&format!("/{}", invite.max_uses));
            }
            response.push('\n');
        }

        response.push_str(&format!("\nTotal: **{}** uses", total));
    }

    ctx.send(poise::CreateReply::default().content(response).ephemeral(true))
        .await?;

    Ok(())
}

/// View the server invite leaderboard
#[poise::command(slash_command, guild_only)]
pub async fn leaderboard(
    ctx: Context<'_>,
    #[description = "Number of users to show (default: 10)"]
    #[min = 1]
    #[max = 50]
    limit: Option<u32>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().unwrap();
    let limit = limit.unwrap_or(10) as usize;

    if tracking::get_config(guild_id, ctx.data()).await?.is_none() {
        ctx.send(
            poise::CreateReply::default()
                .content(ctx.l10n_guild().t("invites-module-disabled", None))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    ctx.defer().await?;

    let mut all_records = invite_records::Entity::find()
        .filter(invite_records::Column::GuildId.eq(guild_id.get() as i64))
        .all(&ctx.data().db)
        .await?;

    // Ranked by effective count, which the database cannot order by directly.
    all_records.sort_by_key(|r| std::cmp::Reverse(records::effective_invites(r)));
    all_records.truncate(limit);

    let mut response = format!("🏆 **Top {} Inviters**\n\n", limit);

    if all_records.is_empty() {
        response.push_str("No invite data available yet.");
    } else {
        for (idx, record) in all_records.iter().enumerate() {
            let medal = match idx {
                0 => "🥇",
                1 => "🥈",
                2 => "🥉",
                _ => "  ",
            };
            response.push_str(&format!(
                "{} **#{}** <@{}> - {} invites ({} regular, {} bonus, -{} fake, -{} leaves)\n",
                medal,
                idx + 1,
                record.user_id,
                records::effective_invites(record),
                record.regular,
                record.bonus,
                record.fake,
                record.leaves
            ));
        }
    }

    ctx.send(poise::CreateReply::default().content(response))
        .await?;

    Ok(())
}

/// Configure invite tracking (Admin only)
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
#[allow(clippy::too_many_arguments)]
pub async fn config(
    ctx: Context<'_>,
    #[description = "Channel for join notifications"] join_channel: Option<serenity::GuildChannel>,
    #[description = "Channel for leave notifications"] leave_channel: Option<serenity::GuildChannel>,
    #[description = "Join message template"] join_message: Option<String>,
    #[description = "Leave message template"] leave_message: Option<String>,
    #[description = "Ignore bot accounts"] ignore_bots: Option<bool>,
    #[description = "Track vanity URL joins"] track_vanity: Option<bool>,
    #[description = "Accounts younger than this many days count as fake"]
    #[min = 0]
    fake_threshold_days: Option<u32>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().unwrap();

    let was_enabled = tracking::get_config(guild_id, ctx.data()).await?.is_some();
    let mut config = tracking::get_config(guild_id, ctx.data())
        .await?
        .unwrap_or_default();

    if let Some(channel) = join_channel {
        config.join_channel_id = Some(channel.id.get() as i64);
    }
    if let Some(channel) = leave_channel {
        config.leave_channel_id = Some(channel.id.get() as i64);
    }
    if let Some(message) = join_message {
        config.join_message = message;
    }
    if let Some(message) = leave_message {
        config.leave_message = message;
    }
    if let Some(value) = ignore_bots {
        config.ignore_bots = value;
    }
    if let Some(value) = track_vanity {
        config.track_vanity = value;
    }
    if let Some(value) = fake_threshold_days {
        config.fake_threshold_days = value;
    }

    tracking::save_config(guild_id, &config, ctx.data()).await?;

    // First enable: take the initial snapshot so the next join can be
    // attributed.
    if !was_enabled {
        tracking::sync_all_guild_invites(ctx.serenity_context(), guild_id, ctx.data()).await?;
    }

    ctx.send(
        poise::CreateReply::default()
            .content("✅ Invite tracking configuration saved.")
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Manage bonus invites (Admin only)
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD", subcommands("add", "remove"))]
pub async fn bonus(ctx: Context<'_>) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .content("Please use a subcommand: `/bonus add` or `/bonus remove`")
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Grant bonus invites to a user
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn add(
    ctx: Context<'_>,
    #[description = "User to grant bonus invites to"] user: serenity::User,
    #[description = "Number of bonus invites"]
    #[min = 1]
    amount: u32,
) -> Result<(), Error> {
    adjust_bonus(ctx, user, amount as i32).await
}

/// Remove bonus invites from a user
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "User to remove bonus invites from"] user: serenity::User,
    #[description = "Number of bonus invites"]
    #[min = 1]
    amount: u32,
) -> Result<(), Error> {
    adjust_bonus(ctx, user, -(amount as i32)).await
}

async fn adjust_bonus(ctx: Context<'_>, user: serenity::User, amount: i32) -> Result<(), Error> {
    let guild_id = ctx.guild_id().unwrap();

    if tracking::get_config(guild_id, ctx.data()).await?.is_none() {
        ctx.send(
            poise::CreateReply::default()
                .content(ctx.l10n_guild().t("invites-module-disabled", None))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    ctx.defer().await?;

    let delta = records::RecordDelta {
        bonus: amount,
        ..Default::default()
    };
    let record = records::adjust_record(guild_id, user.id, delta, ctx.data()).await?;

    // Bonus changes can cross a tier threshold in either direction.
    if let Err(e) =
        invite_ranks::assign::evaluate_member(ctx.serenity_context(), guild_id, user.id, ctx.data())
            .await
    {
        tracing::error!(
            "Failed to evaluate ranks for {} in guild {}: {:?}",
            user.id,
            guild_id,
            e
        );
    }

    ctx.send(poise::CreateReply::default().content(format!(
        "✅ {} now has **{}** bonus invites (**{}** effective).",
        user.name,
        record.bonus,
        records::effective_invites(&record)
    )))
    .await?;

    Ok(())
}

pub fn commands() -> Vec<poise::Command<crate::Data, Error>> {
    vec![invites(), bonus()]
}
