use crate::db::entities::rank_tiers;
use poise::serenity_prelude as serenity;

/// The nearest tier a member has not earned yet, for progress displays
/// ("you need N more invites for rank X"). Never used for reward
/// assignment.
///
/// Tiers whose role is gone are skipped; among the unearned remainder the
/// smallest threshold wins, ties resolved by catalog position.
pub fn select_next_tier<'a>(
    effective_count: i64,
    tiers: &'a [rank_tiers::Model],
    role_available: impl Fn(serenity::RoleId) -> bool,
) -> Option<&'a rank_tiers::Model> {
    tiers
        .iter()
        .filter(|tier| role_available(serenity::RoleId::new(tier.role_id as u64)))
        .filter(|tier| i64::from(tier.invite_count) > effective_count)
        .min_by_key(|tier| (tier.invite_count, tier.position))
}

/// All currently earned, still-available tiers, highest threshold first.
pub fn earned_tiers<'a>(
    effective_count: i64,
    tiers: &'a [rank_tiers::Model],
    role_available: impl Fn(serenity::RoleId) -> bool,
) -> Vec<&'a rank_tiers::Model> {
    let mut earned: Vec<&rank_tiers::Model> = tiers
        .iter()
        .filter(|tier| role_available(serenity::RoleId::new(tier.role_id as u64)))
        .filter(|tier| i64::from(tier.invite_count) <= effective_count)
        .collect();

    earned.sort_by(|a, b| {
        b.invite_count
            .cmp(&a.invite_count)
            .then(a.position.cmp(&b.position))
    });
    earned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(invite_count: i32, role_id: u64, position: i32) -> rank_tiers::Model {
        rank_tiers::Model {
            guild_id: 1,
            role_id: role_id as i64,
            invite_count,
            position,
        }
    }

    fn catalog() -> Vec<rank_tiers::Model> {
        vec![tier(5, 100, 0), tier(10, 200, 1), tier(20, 300, 2)]
    }

    #[test]
    fn test_next_tier_is_nearest_unearned() {
        let tiers = catalog();

        let next = select_next_tier(7, &tiers, |_| true).expect("a tier remains");
        assert_eq!(next.invite_count, 10);

        let next = select_next_tier(0, &tiers, |_| true).expect("a tier remains");
        assert_eq!(next.invite_count, 5);
    }

    #[test]
    fn test_next_tier_exact_threshold_counts_as_earned() {
        let tiers = catalog();

        let next = select_next_tier(10, &tiers, |_| true).expect("a tier remains");
        assert_eq!(next.invite_count, 20);
    }

    #[test]
    fn test_next_tier_none_when_all_earned() {
        let tiers = catalog();
        assert!(select_next_tier(25, &tiers, |_| true).is_none());
    }

    #[test]
    fn test_next_tier_skips_deleted_roles() {
        let tiers = catalog();

        let next = select_next_tier(7, &tiers, |role| role.get() != 200)
            .expect("a tier remains");
        assert_eq!(next.invite_count, 20);
    }

    #[test]
    fn test_next_tier_tie_picks_one_deterministically() {
        let tiers = vec![tier(10, 400, 0), tier(10, 500, 1)];

        let next = select_next_tier(3, &tiers, |_| true).expect("a tier remains");
        assert_eq!(next.role_id, 400);
    }

    #[test]
    fn test_earned_tiers_highest_first() {
        let tiers = catalog();

        let earned = earned_tiers(12, &tiers, |_| true);
        let thresholds: Vec<i32> = earned.iter().map(|t| t.invite_count).collect();
        assert_eq!(thresholds, vec![10, 5]);
    }

    #[test]
    fn test_earned_tiers_excludes_deleted_roles() {
        let tiers = catalog();

        let earned = earned_tiers(25, &tiers, |role| role.get() != 300);
        let thresholds: Vec<i32> = earned.iter().map(|t| t.invite_count).collect();
        assert_eq!(thresholds, vec![10, 5]);
    }
}
