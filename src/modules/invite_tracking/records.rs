use crate::db::entities::invite_records;
use crate::{Data, Error};
use chrono::Utc;
use poise::serenity_prelude as serenity;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

/// A signed adjustment to the four ledger counters, applied in one
/// read-modify-write.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordDelta {
    pub regular: i32,
    pub bonus: i32,
    pub fake: i32,
    pub leaves: i32,
}

/// Effective invite count for a member: regular + bonus - fake - leaves.
///
/// Not clamped. A member whose invitees leave or turn out fake after the
/// member's own invites were removed can go negative, and a negative count
/// must not earn rewards.
pub fn effective_invites(record: &invite_records::Model) -> i64 {
    i64::from(record.regular) + i64::from(record.bonus)
        - i64::from(record.fake)
        - i64::from(record.leaves)
}

pub async fn get_record(
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
    data: &Data,
) -> Result<Option<invite_records::Model>, Error> {
    let record =
        invite_records::Entity::find_by_id((guild_id.get() as i64, user_id.get() as i64))
            .one(&data.db)
            .await?;

    Ok(record)
}

/// Apply a delta to a member's ledger, creating the row on first use.
/// Individual counters are floored at zero; the effective count is not.
pub async fn adjust_record(
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
    delta: RecordDelta,
    data: &Data,
) -> Result<invite_records::Model, Error> {
    let existing = get_record(guild_id, user_id, data).await?;
    let now = Utc::now();

    let record = match existing {
        Some(record) => {
            let mut active: invite_records::ActiveModel = record.clone().into();
            active.regular = Set((record.regular + delta.regular).max(0));
            active.bonus = Set((record.bonus + delta.bonus).max(0));
            active.fake = Set((record.fake + delta.fake).max(0));
            active.leaves = Set((record.leaves + delta.leaves).max(0));
            active.updated_at = Set(now.into());
            active.update(&data.db).await?
        }
        None => {
            let active = invite_records::ActiveModel {
                guild_id: Set(guild_id.get() as i64),
                user_id: Set(user_id.get() as i64),
                regular: Set(delta.regular.max(0)),
                bonus: Set(delta.bonus.max(0)),
                fake: Set(delta.fake.max(0)),
                leaves: Set(delta.leaves.max(0)),
                updated_at: Set(now.into()),
            };
            active.insert(&data.db).await?
        }
    };

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(regular: i32, bonus: i32, fake: i32, leaves: i32) -> invite_records::Model {
        invite_records::Model {
            guild_id: 1,
            user_id: 2,
            regular,
            bonus,
            fake,
            leaves,
            updated_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_effective_invites_sums_counters() {
        assert_eq!(effective_invites(&record(0, 0, 0, 0)), 0);
        assert_eq!(effective_invites(&record(10, 3, 2, 4)), 7);
        assert_eq!(effective_invites(&record(5, 0, 0, 5)), 0);
    }

    #[test]
    fn test_effective_invites_can_go_negative() {
        // Invitees marked fake after the member itself left: no clamping.
        assert_eq!(effective_invites(&record(2, 0, 3, 4)), -5);
        assert_eq!(effective_invites(&record(0, 1, 0, 2)), -1);
    }
}
