use crate::db::entities::rank_tiers;
use crate::modules::invite_ranks::engine::{self, RankPolicy, RankTransitions, RoleState};
use crate::modules::invite_tracking::records;
use crate::{Data, Error};
use poise::serenity_prelude as serenity;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::collections::HashMap;
use tracing::{debug, error};

/// Snapshot of the live guild role state for one evaluation, built from the
/// API right before the transition computation.
pub struct GuildRoleState {
    roles: HashMap<serenity::RoleId, serenity::Role>,
    member_roles: Vec<serenity::RoleId>,
    bot_highest_position: i64,
}

impl GuildRoleState {
    pub fn new(
        roles: HashMap<serenity::RoleId, serenity::Role>,
        member_roles: Vec<serenity::RoleId>,
        bot_roles: &[serenity::RoleId],
    ) -> Self {
        let bot_highest_position = bot_roles
            .iter()
            .filter_map(|id| roles.get(id))
            .map(|role| role.position as i64)
            .max()
            .unwrap_or(0);

        Self {
            roles,
            member_roles,
            bot_highest_position,
        }
    }

    pub fn role_available(&self, role_id: serenity::RoleId) -> bool {
        self.role_exists(role_id) && self.role_editable(role_id)
    }
}

impl RoleState for GuildRoleState {
    fn role_exists(&self, role_id: serenity::RoleId) -> bool {
        self.roles.contains_key(&role_id)
    }

    fn role_editable(&self, role_id: serenity::RoleId) -> bool {
        match self.roles.get(&role_id) {
            Some(role) => (role.position as i64) < self.bot_highest_position && !role.managed,
            None => false,
        }
    }

    fn has_role(&self, role_id: serenity::RoleId) -> bool {
        self.member_roles.contains(&role_id)
    }
}

pub async fn load_tiers(
    guild_id: serenity::GuildId,
    data: &Data,
) -> Result<Vec<rank_tiers::Model>, Error> {
    let tiers = rank_tiers::Entity::find()
        .filter(rank_tiers::Column::GuildId.eq(guild_id.get() as i64))
        .order_by_asc(rank_tiers::Column::Position)
        .all(&data.db)
        .await?;

    Ok(tiers)
}

/// Build the live role state for a member from the Discord API.
pub async fn load_role_state(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
    member: &serenity::Member,
) -> Result<GuildRoleState, Error> {
    let guild_roles = guild_id.roles(&ctx.http).await?;

    let bot_id = ctx.cache.current_user().id;
    let bot_member = guild_id.member(&ctx.http, bot_id).await?;

    Ok(GuildRoleState::new(
        guild_roles,
        member.roles.clone(),
        &bot_member.roles,
    ))
}

/// Run one full rank evaluation for a member: ledger read, count
/// resolution, transition computation, role mutation.
///
/// Ledger errors abort the evaluation before any role is touched. Members
/// who already left the guild are skipped silently.
pub async fn evaluate_member(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
    data: &Data,
) -> Result<(), Error> {
    let config = match super::get_config(guild_id, data).await? {
        Some(c) => c,
        None => return Ok(()),
    };

    let tiers = load_tiers(guild_id, data).await?;
    if tiers.is_empty() {
        return Ok(());
    }

    let record = records::get_record(guild_id, user_id, data).await?;
    let effective_count = record.as_ref().map(records::effective_invites).unwrap_or(0);

    let member = match guild_id.member(&ctx.http, user_id).await {
        Ok(member) => member,
        Err(_) => {
            debug!("Member {} not in guild {}, skipping ranks", user_id, guild_id);
            return Ok(());
        }
    };

    let role_state = load_role_state(ctx, guild_id, &member).await?;

    let policy = RankPolicy {
        keep_ranks: config.keep_ranks,
        stacked_ranks: config.stacked_ranks,
    };

    let transitions = engine::compute_transitions(
        member.user.bot,
        effective_count,
        &tiers,
        policy,
        &role_state,
    );

    if !transitions.is_empty() {
        debug!(
            "Rank transitions for {} in guild {} at {} invites: grant {:?}, revoke {:?}",
            user_id, guild_id, effective_count, transitions.grant, transitions.revoke
        );
        apply_transitions(ctx, &member, &transitions).await;
    }

    Ok(())
}

/// Apply computed transitions, grants first so a member swapping between
/// two single-tier roles is never left with none. Failures are reported
/// per role and never abort the rest of the set; the next evaluation
/// converges.
pub async fn apply_transitions(
    ctx: &serenity::Context,
    member: &serenity::Member,
    transitions: &RankTransitions,
) {
    for role_id in &transitions.grant {
        if let Err(e) = member.add_role(&ctx.http, *role_id).await {
            error!(
                "Failed to grant rank role {} to {} in guild {}: {:?}",
                role_id, member.user.id, member.guild_id, e
            );
        }
    }

    for role_id in &transitions.revoke {
        if let Err(e) = member.remove_role(&ctx.http, *role_id).await {
            error!(
                "Failed to revoke rank role {} from {} in guild {}: {:?}",
                role_id, member.user.id, member.guild_id, e
            );
        }
    }
}
