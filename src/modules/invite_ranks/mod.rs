pub mod assign;
pub mod commands;
pub mod engine;
pub mod selection;

use crate::db::entities::module_configs::{self, InviteRanksModuleConfig, ModuleType};
use crate::modules::Module;
use crate::{Data, Error};
use poise::serenity_prelude as serenity;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

pub const ID: &str = "invite_ranks";

pub fn module() -> Module {
    Module {
        id: ID,
        commands: commands::commands(),
        event_handlers: vec![],
    }
}

/// Check if the invite ranks module is enabled and get its config.
pub async fn get_config(
    guild_id: serenity::GuildId,
    data: &Data,
) -> Result<Option<InviteRanksModuleConfig>, Error> {
    let m_config =
        module_configs::Entity::find_by_id((guild_id.get() as i64, ModuleType::InviteRanks))
            .one(&data.db)
            .await?;

    match m_config {
        Some(m) => {
            if !m.enabled {
                return Ok(None);
            }
            let config: InviteRanksModuleConfig =
                serde_json::from_value(m.config).unwrap_or_default();
            Ok(Some(config))
        }
        None => Ok(None),
    }
}

/// Upsert the module config row, enabling the module.
pub async fn save_config(
    guild_id: serenity::GuildId,
    config: &InviteRanksModuleConfig,
    data: &Data,
) -> Result<(), Error> {
    let existing =
        module_configs::Entity::find_by_id((guild_id.get() as i64, ModuleType::InviteRanks))
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
                module_type: Set(ModuleType::InviteRanks),
                enabled: Set(true),
                config: Set(config_json),
            };
            active.insert(&data.db).await?;
        }
    }

    Ok(())
}
