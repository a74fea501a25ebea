use sea_orm::entity::prelude::*;

/// A reward tier: members whose effective invite count reaches `invite_count`
/// earn `role_id`. Several tiers may share a threshold; `position` records
/// catalog declaration order and is the deterministic tie-break.
///
/// The referenced role may be deleted in Discord at any time. The live guild
/// role set is checked at evaluation time; a missing role makes the tier
/// inert, it is not an error.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "rank_tiers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub guild_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub role_id: i64,
    pub invite_count: i32,
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
