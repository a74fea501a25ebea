use crate::db::entities::rank_tiers;
use crate::modules::invite_ranks::{assign, selection};
use crate::modules::invite_tracking::records;
use crate::services::localization::ContextL10nExt;
use crate::{Context, Error};
use poise::serenity_prelude as serenity;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};

/// View a user's rank progress
#[poise::command(slash_command, guild_only)]
pub async fn rank(
    ctx: Context<'_>,
    #[description = "User to check (defaults to you)"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().unwrap();
    let target = user.as_ref().unwrap_or_else(|| ctx.author()).clone();

    if super::get_config(guild_id, ctx.data()).await?.is_none() {
        ctx.send(
            poise::CreateReply::default()
                .content(ctx.l10n_guild().t("ranks-module-disabled", None))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    ctx.defer().await?;

    let tiers = assign::load_tiers(guild_id, ctx.data()).await?;

    let record = records::get_record(guild_id, target.id, ctx.data()).await?;
    let effective_count = record.as_ref().map(records::effective_invites).unwrap_or(0);

    let http = &ctx.serenity_context().http;
    let member_roles = match guild_id.member(http, target.id).await {
        Ok(member) => member.roles.clone(),
        Err(_) => vec![],
    };

    let guild_roles = guild_id.roles(http).await?;
    let bot_id = ctx.serenity_context().cache.current_user().id;
    let bot_member = guild_id.member(http, bot_id).await?;
    let role_state = assign::GuildRoleState::new(guild_roles, member_roles, &bot_member.roles);

    let available = |role_id| role_state.role_available(role_id);

    let mut response = format!(
        "🎖️ **{}** has **{}** invites.\n",
        target.name, effective_count
    );

    let earned = selection::earned_tiers(effective_count, &tiers, available);
    if !earned.is_empty() {
        let mentions: Vec<String> = earned
            .iter()
            .map(|tier| format!("<@&{}>", tier.role_id))
            .collect();
        response.push_str(&format!("Earned ranks: {}\n", mentions.join(", ")));
    }

    match selection::select_next_tier(effective_count, &tiers, available) {
        Some(next) => {
            let missing = i64::from(next.invite_count) - effective_count;
            response.push_str(&format!(
                "Next rank: <@&{}> at **{}** invites ({} more needed)",
                next.role_id, next.invite_count, missing
            ));
        }
        None => {
            if tiers.is_empty() {
                response.push_str("No ranks are configured on this server.");
            } else {
                response.push_str("All configured ranks are earned. 🎉");
            }
        }
    }

    ctx.send(poise::CreateReply::default().content(response))
        .await?;

    Ok(())
}

/// Manage invite ranks (Admin only)
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    subcommands("add", "remove", "list", "policy")
)]
pub async fn ranks(ctx: Context<'_>) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .content("Please use a subcommand: `/ranks add`, `/ranks remove`, `/ranks list` or `/ranks policy`")
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Add or update a rank tier
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn add(
    ctx: Context<'_>,
    #[description = "Role to grant"] role: serenity::Role,
    #[description = "Invites required to earn the role"] invites: i32,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().unwrap();

    // Adding the first tier enables the module with default policy.
    if super::get_config(guild_id, ctx.data()).await?.is_none() {
        super::save_config(guild_id, &Default::default(), ctx.data()).await?;
    }

    let tiers = assign::load_tiers(guild_id, ctx.data()).await?;
    let existing = tiers.iter().find(|t| t.role_id == role.id.get() as i64);

    match existing {
        Some(tier) => {
            let mut active: rank_tiers::ActiveModel = tier.clone().into();
            active.invite_count = Set(invites);
            active.update(&ctx.data().db).await?;
        }
        None => {
            let position = tiers.iter().map(|t| t.position).max().map_or(0, |p| p + 1);
            let active = rank_tiers::ActiveModel {
                guild_id: Set(guild_id.get() as i64),
                role_id: Set(role.id.get() as i64),
                invite_count: Set(invites),
                position: Set(position),
            };
            active.insert(&ctx.data().db).await?;
        }
    }

    ctx.send(
        poise::CreateReply::default()
            .content(format!(
                "✅ Rank <@&{}> is earned at **{}** invites.",
                role.id, invites
            ))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Remove a rank tier
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Role of the tier to remove"] role: serenity::Role,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().unwrap();

    let deleted = rank_tiers::Entity::delete_many()
        .filter(rank_tiers::Column::GuildId.eq(guild_id.get() as i64))
        .filter(rank_tiers::Column::RoleId.eq(role.id.get() as i64))
        .exec(&ctx.data().db)
        .await?;

    let content = if deleted.rows_affected > 0 {
        format!("✅ Rank <@&{}> removed.", role.id)
    } else {
        format!("<@&{}> is not a configured rank.", role.id)
    };

    ctx.send(poise::CreateReply::default().content(content).ephemeral(true))
        .await?;

    Ok(())
}

/// List configured rank tiers
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().unwrap();

    let mut tiers = assign::load_tiers(guild_id, ctx.data()).await?;
    tiers.sort_by_key(|t| (t.invite_count, t.position));

    let config = super::get_config(guild_id, ctx.data()).await?;

    let mut response = String::from("🎖️ **Rank tiers**\n\n");

    if tiers.is_empty() {
        response.push_str("No ranks configured. Use `/ranks add` to create one.");
    } else {
        for tier in &tiers {
            response.push_str(&format!(
                "<@&{}> — {} invites\n",
                tier.role_id, tier.invite_count
            ));
        }
    }

    if let Some(config) = config {
        response.push_str(&format!(
            "\nPolicy: keep_ranks **{}**, stacked_ranks **{}**",
            config.keep_ranks, config.stacked_ranks
        ));
    }

    ctx.send(poise::CreateReply::default().content(response).ephemeral(true))
        .await?;

    Ok(())
}

/// Change the rank reward policy
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn policy(
    ctx: Context<'_>,
    #[description = "Keep earned ranks when the count drops below the threshold"]
    keep_ranks: Option<bool>,
    #[description = "Hold all earned ranks at once instead of only the highest"]
    stacked_ranks: Option<bool>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().unwrap();

    let mut config = super::get_config(guild_id, ctx.data())
        .await?
        .unwrap_or_default();

    if let Some(value) = keep_ranks {
        config.keep_ranks = value;
    }
    if let Some(value) = stacked_ranks {
        config.stacked_ranks = value;
    }

    super::save_config(guild_id, &config, ctx.data()).await?;

    ctx.send(
        poise::CreateReply::default()
            .content(format!(
                "✅ Rank policy updated: keep_ranks **{}**, stacked_ranks **{}**.",
                config.keep_ranks, config.stacked_ranks
            ))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

pub fn commands() -> Vec<poise::Command<crate::Data, Error>> {
    vec![rank(), ranks()]
}
