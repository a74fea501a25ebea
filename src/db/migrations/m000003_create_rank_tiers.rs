use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RankTiers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(RankTiers::GuildId).big_integer().not_null())
                    .col(ColumnDef::new(RankTiers::RoleId).big_integer().not_null())
                    .col(
                        ColumnDef::new(RankTiers::InviteCount)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RankTiers::Position)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(
                        Index::create()
                            .col(RankTiers::GuildId)
                            .col(RankTiers::RoleId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-rank-tiers-guild-count")
                    .table(RankTiers::Table)
                    .col(RankTiers::GuildId)
                    .col(RankTiers::InviteCount)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RankTiers::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum RankTiers {
    Table,
    GuildId,
    RoleId,
    InviteCount,
    Position,
}
