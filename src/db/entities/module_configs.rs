use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    poise::ChoiceParameter,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum ModuleType {
    #[sea_orm(string_value = "invite_tracking")]
    InviteTracking,
    #[sea_orm(string_value = "invite_ranks")]
    InviteRanks,
}

impl std::fmt::Display for ModuleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleType::InviteTracking => write!(f, "invite_tracking"),
            ModuleType::InviteRanks => write!(f, "invite_ranks"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Eq)]
#[sea_orm(table_name = "module_configs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub guild_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub module_type: ModuleType,
    pub enabled: bool,
    pub config: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

fn default_join_message() -> String {
    "{user} joined the server! Invited by {inviter.tag} ({inviter.invites} invites)".to_string()
}

fn default_leave_message() -> String {
    "{user.tag} left the server. They were invited by {inviter.tag}".to_string()
}

fn default_fake_threshold_days() -> u32 {
    7
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InviteTrackingModuleConfig {
    pub ignore_bots: bool,
    pub track_vanity: bool,
    /// Joining accounts younger than this are counted as fake invites.
    pub fake_threshold_days: u32,
    pub join_channel_id: Option<i64>,
    pub join_message: String,
    pub leave_channel_id: Option<i64>,
    pub leave_message: String,
}

impl Default for InviteTrackingModuleConfig {
    fn default() -> Self {
        Self {
            ignore_bots: true,
            track_vanity: true,
            fake_threshold_days: default_fake_threshold_days(),
            join_channel_id: None,
            join_message: default_join_message(),
            leave_channel_id: None,
            leave_message: default_leave_message(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct InviteRanksModuleConfig {
    /// Earned tiers are never revoked, even if the count drops back below
    /// the threshold.
    pub keep_ranks: bool,
    /// All earned tiers are held at once instead of only the highest one.
    pub stacked_ranks: bool,
}
