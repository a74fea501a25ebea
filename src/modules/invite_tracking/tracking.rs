use crate::db::entities::{
    invite_snapshots,
    module_configs::{self, InviteTrackingModuleConfig, ModuleType},
};
use crate::{Data, Error};
use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use std::collections::HashMap;

/// Check if the invite tracking module is enabled and get its config.
pub async fn get_config(
    guild_id: serenity::GuildId,
    data: &Data,
) -> Result<Option<InviteTrackingModuleConfig>, Error> {
    let m_config =
        module_configs::Entity::find_by_id((guild_id.get() as i64, ModuleType::InviteTracking))
            .one(&data.db)
            .await?;

    match m_config {
        Some(m) => {
            if !m.enabled {
                return Ok(None);
            }
            let config: InviteTrackingModuleConfig =
                serde_json::from_value(m.config).unwrap_or_default();
            Ok(Some(config))
        }
        None => Ok(None),
    }
}

/// Upsert the module config row, enabling the module.
pub async fn save_config(
    guild_id: serenity::GuildId,
    config: &InviteTrackingModuleConfig,
    data: &Data,
) -> Result<(), Error> {
    let existing =
        module_configs::Entity::find_by_id((guild_id.get() as i64, ModuleType::InviteTracking))
            .one(&data.db)
            .await?;

    let config_json = serde_json::to_value(config)?;

    match existing {
        Some(model) => {
            let mut active: module_configs::ActiveModel = model.into();
            active.enabled = Set(true);
            active.config = Set(config_json);
            active.update(&data.db).await?;
        }
        None => {
            let active = module_configs::ActiveModel {
                guild_id: Set(guild_id.get() as i64),
                module_type: Set(ModuleType::InviteTracking),
                enabled: Set(true),
                config: Set(config_json),
            };
            active.insert(&data.db).await?;
        }
    }

    Ok(())
}

/// An invite link as currently reported by the Discord API, reduced to the
/// fields the tracker compares and records.
#[derive(Debug, Clone)]
pub struct LiveInvite {
    pub code: String,
    pub inviter_id: Option<serenity::UserId>,
    pub channel_id: Option<serenity::ChannelId>,
    pub uses: i32,
    pub max_uses: i32,
    pub max_age: i64,
    pub temporary: bool,
    pub created_at: DateTime<Utc>,
}

impl LiveInvite {
    pub fn url(&self) -> String {
        format!("https://discord.gg/{}", self.code)
    }
}

impl From<&serenity::RichInvite> for LiveInvite {
    fn from(invite: &serenity::RichInvite) -> Self {
        Self {
            code: invite.code.clone(),
            inviter_id: invite.inviter.as_ref().map(|u| u.id),
            channel_id: Some(invite.channel.id),
            uses: invite.uses as i32,
            max_uses: invite.max_uses as i32,
            max_age: invite.max_age as i64,
            temporary: invite.temporary,
            created_at: DateTime::from_timestamp(invite.created_at.unix_timestamp(), 0)
                .unwrap_or_default(),
        }
    }
}

/// Fetch all current invite links from the Discord API.
pub async fn fetch_guild_invites(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
) -> Result<Vec<LiveInvite>, Error> {
    let invites = guild_id.invites(&ctx.http).await?;
    Ok(invites.iter().map(LiveInvite::from).collect())
}

/// Sync live invite links into database snapshots.
pub async fn sync_invites_to_snapshots(
    guild_id: serenity::GuildId,
    invites: &[LiveInvite],
    data: &Data,
) -> Result<(), Error> {
    let now = Utc::now();

    for invite in invites {
        let expires_at = if invite.max_age > 0 {
            Some(invite.created_at + chrono::Duration::seconds(invite.max_age))
        } else {
            None
        };

        let snapshot = invite_snapshots::ActiveModel {
            guild_id: Set(guild_id.get() as i64),
            code: Set(invite.code.clone()),
            inviter_id: Set(invite.inviter_id.map(|id| id.get() as i64)),
            channel_id: Set(invite.channel_id.map(|id| id.get() as i64)),
            uses: Set(invite.uses),
            max_uses: Set(Some(invite.max_uses)),
            max_age: Set(Some(invite.max_age as i32)),
            temporary: Set(invite.temporary),
            created_at: Set(invite.created_at.into()),
            expires_at: Set(expires_at.map(Into::into)),
            last_synced_at: Set(now.into()),
        };

        invite_snapshots::Entity::insert(snapshot)
            .on_conflict(
                sea_orm::sea_query::OnConflict::columns([
                    invite_snapshots::Column::GuildId,
                    invite_snapshots::Column::Code,
                ])
                .update_columns([
                    invite_snapshots::Column::Uses,
                    invite_snapshots::Column::LastSyncedAt,
                ])
                .to_owned(),
            )
            .exec(&data.db)
            .await?;
    }

    Ok(())
}

pub async fn get_snapshots(
    guild_id: serenity::GuildId,
    data: &Data,
) -> Result<Vec<invite_snapshots::Model>, Error> {
    let snapshots = invite_snapshots::Entity::find()
        .filter(invite_snapshots::Column::GuildId.eq(guild_id.get() as i64))
        .all(&data.db)
        .await?;

    Ok(snapshots)
}

/// Compare the live invite list against the stored snapshots to find which
/// link was just used: the one whose use count increased.
pub fn find_used_invite<'a>(
    current_invites: &'a [LiveInvite],
    snapshots: &[invite_snapshots::Model],
) -> Option<&'a LiveInvite> {
    let snapshot_map: HashMap<&str, i32> = snapshots
        .iter()
        .map(|s| (s.code.as_str(), s.uses))
        .collect();

    current_invites.iter().find(|invite| {
        match snapshot_map.get(invite.code.as_str()) {
            Some(&old_uses) => invite.uses > old_uses,
            // A link created and used before we could snapshot it.
            None => invite.uses > 0,
        }
    })
}

/// Determine the join type for joins no invite link accounts for
/// (vanity URL, server widget, discovery).
pub async fn determine_special_join_type(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
) -> Result<(String, Option<String>), Error> {
    let vanity_code = guild_id
        .to_partial_guild(&ctx.http)
        .await
        .ok()
        .and_then(|guild| guild.vanity_url_code);

    Ok(classify_unattributed_join(vanity_code))
}

/// The gateway does not report vanity use counts, so widget and discovery
/// joins in a guild with a vanity code are folded into "vanity".
pub fn classify_unattributed_join(vanity_code: Option<String>) -> (String, Option<String>) {
    match vanity_code {
        Some(code) => ("vanity".to_string(), Some(code)),
        None => ("unknown".to_string(), None),
    }
}

pub async fn delete_invite_snapshot(
    guild_id: serenity::GuildId,
    code: &str,
    data: &Data,
) -> Result<(), Error> {
    invite_snapshots::Entity::delete_many()
        .filter(invite_snapshots::Column::GuildId.eq(guild_id.get() as i64))
        .filter(invite_snapshots::Column::Code.eq(code))
        .exec(&data.db)
        .await?;

    Ok(())
}

/// Sync all invites for a guild (used when the module is enabled).
pub async fn sync_all_guild_invites(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
    data: &Data,
) -> Result<(), Error> {
    match fetch_guild_invites(ctx, guild_id).await {
        Ok(invites) => {
            sync_invites_to_snapshots(guild_id, &invites, data).await?;
            tracing::info!("Synced invites for guild {}", guild_id);
        }
        Err(e) => {
            tracing::error!("Failed to fetch invites for guild {}: {:?}", guild_id, e);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live(code: &str, uses: i32) -> LiveInvite {
        LiveInvite {
            code: code.to_string(),
            inviter_id: Some(serenity::UserId::new(42)),
            channel_id: None,
            uses,
            max_uses: 0,
            max_age: 0,
            temporary: false,
            created_at: Utc::now(),
        }
    }

    fn snapshot(code: &str, uses: i32) -> invite_snapshots::Model {
        invite_snapshots::Model {
            guild_id: 1,
            code: code.to_string(),
            inviter_id: Some(42),
            channel_id: None,
            uses,
            max_uses: Some(0),
            max_age: Some(0),
            temporary: false,
            created_at: Utc::now().into(),
            expires_at: None,
            last_synced_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_find_used_invite_detects_increase() {
        let current = vec![live("aaa", 3), live("bbb", 6)];
        let snapshots = vec![snapshot("aaa", 3), snapshot("bbb", 5)];

        let used = find_used_invite(&current, &snapshots).expect("an invite was used");
        assert_eq!(used.code, "bbb");
    }

    #[test]
    fn test_find_used_invite_none_when_unchanged() {
        let current = vec![live("aaa", 3)];
        let snapshots = vec![snapshot("aaa", 3)];

        assert!(find_used_invite(&current, &snapshots).is_none());
    }

    #[test]
    fn test_find_used_invite_unsnapshotted_link() {
        // Created and used between syncs, so no snapshot exists yet.
        let current = vec![live("new", 1)];

        let used = find_used_invite(&current, &[]).expect("an invite was used");
        assert_eq!(used.code, "new");
    }

    #[test]
    fn test_unattributed_join_with_vanity_code() {
        let (join_type, code) = classify_unattributed_join(Some("rustaceans".to_string()));
        assert_eq!(join_type, "vanity");
        assert_eq!(code.as_deref(), Some("rustaceans"));
    }

    #[test]
    fn test_unattributed_join_without_vanity_code() {
        let (join_type, code) = classify_unattributed_join(None);
        assert_eq!(join_type, "unknown");
        assert!(code.is_none());
    }
}
