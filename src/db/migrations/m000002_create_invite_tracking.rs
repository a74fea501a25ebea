use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create invite_records table (the per-member ledger)
        manager
            .create_table(
                Table::create()
                    .table(InviteRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InviteRecords::GuildId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InviteRecords::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InviteRecords::Regular)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InviteRecords::Bonus)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InviteRecords::Fake)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InviteRecords::Leaves)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InviteRecords::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(InviteRecords::GuildId)
                            .col(InviteRecords::UserId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-invite-records-guild-regular")
                    .table(InviteRecords::Table)
                    .col(InviteRecords::GuildId)
                    .col((InviteRecords::Regular, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        // Create invite_snapshots table
        manager
            .create_table(
                Table::create()
                    .table(InviteSnapshots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InviteSnapshots::GuildId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InviteSnapshots::Code)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(InviteSnapshots::InviterId).big_integer())
                    .col(ColumnDef::new(InviteSnapshots::ChannelId).big_integer())
                    .col(
                        ColumnDef::new(InviteSnapshots::Uses)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(InviteSnapshots::MaxUses).integer())
                    .col(ColumnDef::new(InviteSnapshots::MaxAge).integer())
                    .col(
                        ColumnDef::new(InviteSnapshots::Temporary)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(InviteSnapshots::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InviteSnapshots::ExpiresAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(InviteSnapshots::LastSyncedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(InviteSnapshots::GuildId)
                            .col(InviteSnapshots::Code),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-invite-snapshots-guild-inviter")
                    .table(InviteSnapshots::Table)
                    .col(InviteSnapshots::GuildId)
                    .col(InviteSnapshots::InviterId)
                    .to_owned(),
            )
            .await?;

        // Create invite_events table
        manager
            .create_table(
                Table::create()
                    .table(InviteEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InviteEvents::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(InviteEvents::GuildId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InviteEvents::EventType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(InviteEvents::InviteCode).string_len(32))
                    .col(ColumnDef::new(InviteEvents::InviterId).big_integer())
                    .col(ColumnDef::new(InviteEvents::TargetUserId).big_integer())
                    .col(ColumnDef::new(InviteEvents::JoinType).string_len(32))
                    .col(
                        ColumnDef::new(InviteEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .extra("DEFAULT NOW()".to_string()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-invite-events-target")
                    .table(InviteEvents::Table)
                    .col(InviteEvents::GuildId)
                    .col(InviteEvents::TargetUserId)
                    .col(InviteEvents::EventType)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-invite-events-inviter")
                    .table(InviteEvents::Table)
                    .col(InviteEvents::GuildId)
                    .col(InviteEvents::InviterId)
                    .col(InviteEvents::EventType)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InviteEvents::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(InviteSnapshots::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(InviteRecords::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum InviteRecords {
    Table,
    GuildId,
    UserId,
    Regular,
    Bonus,
    Fake,
    Leaves,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum InviteSnapshots {
    Table,
    GuildId,
    Code,
    InviterId,
    ChannelId,
    Uses,
    MaxUses,
    MaxAge,
    Temporary,
    CreatedAt,
    ExpiresAt,
    LastSyncedAt,
}

#[derive(DeriveIden)]
enum InviteEvents {
    Table,
    Id,
    GuildId,
    EventType,
    InviteCode,
    InviterId,
    TargetUserId,
    JoinType,
    CreatedAt,
}
