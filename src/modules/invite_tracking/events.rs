use crate::db::entities::invite_events;
use crate::modules::invite_ranks;
use crate::modules::invite_tracking::{records, tracking};
use crate::services::format::{self, InviteContext, InviterContext, MessageContext};
use crate::{Data, Error};
use chrono::Utc;
use poise::serenity_prelude as serenity;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};

pub fn handler<'a>(
    ctx: &'a serenity::Context,
    event: &'a serenity::FullEvent,
    data: &'a Data,
) -> poise::BoxFuture<'a, Result<(), Error>> {
    Box::pin(async move { handle_event(ctx, event, data).await })
}

async fn handle_event(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::InviteCreate { data: invite_data } => {
            handle_invite_create(ctx, invite_data, data).await?;
        }
        serenity::FullEvent::InviteDelete { data: invite_data } => {
            handle_invite_delete(invite_data, data).await?;
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            handle_member_join(ctx, new_member, data).await?;
        }
        serenity::FullEvent::GuildMemberRemoval { guild_id, user, .. } => {
            handle_member_leave(ctx, *guild_id, user, data).await?;
        }
        _ => {}
    }

    Ok(())
}

async fn handle_invite_create(
    ctx: &serenity::Context,
    invite_event: &serenity::InviteCreateEvent,
    data: &Data,
) -> Result<(), Error> {
    let guild_id = match invite_event.guild_id {
        Some(id) => id,
        None => return Ok(()),
    };

    if tracking::get_config(guild_id, data).await?.is_none() {
        return Ok(());
    }

    tracing::info!("Invite created: {} in guild {}", invite_event.code, guild_id);

    tracking::sync_all_guild_invites(ctx, guild_id, data).await?;

    log_invite_event(
        guild_id,
        "invite_create",
        Some(&invite_event.code),
        invite_event.inviter.as_ref().map(|u| u.id),
        None,
        None,
        data,
    )
    .await?;

    Ok(())
}

async fn handle_invite_delete(
    invite_event: &serenity::InviteDeleteEvent,
    data: &Data,
) -> Result<(), Error> {
    let guild_id = match invite_event.guild_id {
        Some(id) => id,
        None => return Ok(()),
    };

    if tracking::get_config(guild_id, data).await?.is_none() {
        return Ok(());
    }

    tracing::info!("Invite deleted: {} in guild {}", invite_event.code, guild_id);

    tracking::delete_invite_snapshot(guild_id, &invite_event.code, data).await?;

    log_invite_event(
        guild_id,
        "invite_delete",
        Some(&invite_event.code),
        None,
        None,
        None,
        data,
    )
    .await?;

    Ok(())
}

async fn handle_member_join(
    ctx: &serenity::Context,
    member: &serenity::Member,
    data: &Data,
) -> Result<(), Error> {
    let guild_id = member.guild_id;

    let config = match tracking::get_config(guild_id, data).await? {
        Some(c) => c,
        None => return Ok(()),
    };

    if config.ignore_bots && member.user.bot {
        return Ok(());
    }

    tracing::info!("Member joined: {} in guild {}", member.user.id, guild_id);

    let current_invites = match tracking::fetch_guild_invites(ctx, guild_id).await {
        Ok(invites) => invites,
        Err(e) => {
            tracing::error!("Failed to fetch invites: {:?}", e);
            return Ok(());
        }
    };

    let snapshots = tracking::get_snapshots(guild_id, data).await?;

    let used_invite = tracking::find_used_invite(&current_invites, &snapshots).cloned();

    let (inviter_id, join_type, invite_code) = match &used_invite {
        Some(invite) => (invite.inviter_id, "normal".to_string(), Some(invite.code.clone())),
        None => {
            let (join_type, code) = tracking::determine_special_join_type(ctx, guild_id).await?;

            if join_type == "vanity" && !config.track_vanity {
                tracing::debug!("Skipping vanity join for guild {}", guild_id);
                return Ok(());
            }

            (None, join_type, code)
        }
    };

    log_invite_event(
        guild_id,
        "member_join",
        invite_code.as_deref(),
        inviter_id,
        Some(member.user.id),
        Some(&join_type),
        data,
    )
    .await?;

    // Sync again so the used link's new use count becomes the baseline.
    tracking::sync_invites_to_snapshots(guild_id, &current_invites, data).await?;

    let inviter_record = if let Some(inviter_id) = inviter_id {
        // Accounts younger than the threshold count as fake on top of the
        // regular invite, so the inviter nets zero for them.
        let account_age = Utc::now()
            - chrono::DateTime::from_timestamp(member.user.created_at().unix_timestamp(), 0)
                .unwrap_or_default();
        let is_fake = account_age.num_days() < i64::from(config.fake_threshold_days);

        let delta = records::RecordDelta {
            regular: 1,
            fake: if is_fake { 1 } else { 0 },
            ..Default::default()
        };
        let record = records::adjust_record(guild_id, inviter_id, delta, data).await?;

        if let Err(e) = invite_ranks::assign::evaluate_member(ctx, guild_id, inviter_id, data).await
        {
            tracing::error!(
                "Failed to evaluate ranks for inviter {} in guild {}: {:?}",
                inviter_id,
                guild_id,
                e
            );
        }

        Some(record)
    } else {
        None
    };

    if let Some(channel_id) = config.join_channel_id {
        let num_joins = count_joins(guild_id, member.user.id, data).await?;
        let context = build_message_context(
            ctx,
            guild_id,
            &member.user,
            inviter_id,
            inviter_record.as_ref().map(records::effective_invites),
            used_invite.as_ref(),
            Some(num_joins),
            data,
        )
        .await;

        send_notification(ctx, channel_id, &config.join_message, &context).await;
    }

    Ok(())
}

async fn handle_member_leave(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
    user: &serenity::User,
    data: &Data,
) -> Result<(), Error> {
    let config = match tracking::get_config(guild_id, data).await? {
        Some(c) => c,
        None => return Ok(()),
    };

    if config.ignore_bots && user.bot {
        return Ok(());
    }

    tracing::info!("Member left: {} from guild {}", user.id, guild_id);

    let inviter_id = find_inviter_from_events(guild_id, user.id, data).await?;

    log_invite_event(
        guild_id,
        "member_leave",
        None,
        inviter_id,
        Some(user.id),
        None,
        data,
    )
    .await?;

    let inviter_record = if let Some(inviter_id) = inviter_id {
        let delta = records::RecordDelta {
            leaves: 1,
            ..Default::default()
        };
        let record = records::adjust_record(guild_id, inviter_id, delta, data).await?;

        if let Err(e) = invite_ranks::assign::evaluate_member(ctx, guild_id, inviter_id, data).await
        {
            tracing::error!(
                "Failed to evaluate ranks for inviter {} in guild {}: {:?}",
                inviter_id,
                guild_id,
                e
            );
        }

        Some(record)
    } else {
        None
    };

    if let Some(channel_id) = config.leave_channel_id {
        let context = build_message_context(
            ctx,
            guild_id,
            user,
            inviter_id,
            inviter_record.as_ref().map(records::effective_invites),
            None,
            // Join counts are a join-notification concept; leaves keep the
            // placeholder untouched.
            None,
            data,
        )
        .await;

        send_notification(ctx, channel_id, &config.leave_message, &context).await;
    }

    Ok(())
}

/// Log an invite event to the database.
async fn log_invite_event(
    guild_id: serenity::GuildId,
    event_type: &str,
    invite_code: Option<&str>,
    inviter_id: Option<serenity::UserId>,
    target_user_id: Option<serenity::UserId>,
    join_type: Option<&str>,
    data: &Data,
) -> Result<(), Error> {
    let event = invite_events::ActiveModel {
        guild_id: Set(guild_id.get() as i64),
        event_type: Set(event_type.to_string()),
        invite_code: Set(invite_code.map(|s| s.to_string())),
        inviter_id: Set(inviter_id.map(|id| id.get() as i64)),
        target_user_id: Set(target_user_id.map(|id| id.get() as i64)),
        join_type: Set(join_type.map(|s| s.to_string())),
        ..Default::default()
    };

    event.insert(&data.db).await?;
    Ok(())
}

/// Find who invited a user by looking at their most recent join event.
pub async fn find_inviter_from_events(
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
    data: &Data,
) -> Result<Option<serenity::UserId>, Error> {
    let event = invite_events::Entity::find()
        .filter(invite_events::Column::GuildId.eq(guild_id.get() as i64))
        .filter(invite_events::Column::TargetUserId.eq(user_id.get() as i64))
        .filter(invite_events::Column::EventType.eq("member_join"))
        .order_by_desc(invite_events::Column::CreatedAt)
        .one(&data.db)
        .await?;

    Ok(event
        .and_then(|e| e.inviter_id)
        .map(|id| serenity::UserId::new(id as u64)))
}

/// How many times this user has joined the guild, counting the current join.
async fn count_joins(
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
    data: &Data,
) -> Result<u64, Error> {
    let count = invite_events::Entity::find()
        .filter(invite_events::Column::GuildId.eq(guild_id.get() as i64))
        .filter(invite_events::Column::TargetUserId.eq(user_id.get() as i64))
        .filter(invite_events::Column::EventType.eq("member_join"))
        .count(&data.db)
        .await?;

    Ok(count)
}

#[allow(clippy::too_many_arguments)]
async fn build_message_context(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
    user: &serenity::User,
    inviter_id: Option<serenity::UserId>,
    inviter_invites: Option<i64>,
    used_invite: Option<&tracking::LiveInvite>,
    num_joins: Option<u64>,
    data: &Data,
) -> MessageContext {
    let (guild_name, member_count, locale) = {
        match ctx.cache.guild(guild_id) {
            Some(guild) => (
                guild.name.clone(),
                guild.member_count,
                guild.preferred_locale.clone(),
            ),
            None => (guild_id.to_string(), 0, "en-US".to_string()),
        }
    };

    let created = chrono::DateTime::from_timestamp(user.created_at().unix_timestamp(), 0)
        .unwrap_or_default();
    let user_created_at = format::humanize_since(created, &locale, &data.l10n);

    let inviter = match inviter_id {
        Some(id) => {
            let inviter_user = id.to_user(&ctx.http).await.ok();
            Some(InviterContext {
                mention: format!("<@{}>", id),
                tag: inviter_user
                    .as_ref()
                    .map(|u| u.tag())
                    .unwrap_or_else(|| id.to_string()),
                name: inviter_user
                    .as_ref()
                    .map(|u| u.name.clone())
                    .unwrap_or_else(|| id.to_string()),
                id: id.to_string(),
                invites: inviter_invites.unwrap_or(0),
            })
        }
        None => None,
    };

    let invite = used_invite.map(|invite| InviteContext {
        code: invite.code.clone(),
        uses: i64::from(invite.uses),
        url: invite.url(),
        channel_mention: invite
            .channel_id
            .map(|id| format!("<#{}>", id))
            .unwrap_or_default(),
    });

    MessageContext {
        user_mention: format!("<@{}>", user.id),
        user_name: user.name.clone(),
        user_tag: user.tag(),
        user_id: user.id.to_string(),
        user_created_at,
        guild_name,
        guild_count: member_count.to_string(),
        inviter,
        invite,
        num_joins,
    }
}

async fn send_notification(
    ctx: &serenity::Context,
    channel_id: i64,
    template: &str,
    context: &MessageContext,
) {
    let content = format::format_message(template, context);
    let channel = serenity::ChannelId::new(channel_id as u64);

    if let Err(e) = channel
        .send_message(&ctx.http, serenity::CreateMessage::new().content(content))
        .await
    {
        tracing::error!("Failed to send notification to channel {}: {:?}", channel_id, e);
    }
}
