use crate::db::entities::rank_tiers;
use poise::serenity_prelude as serenity;
use std::collections::BTreeSet;

/// The two guild-level reward policy switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankPolicy {
    /// A tier already granted is never revoked, even if the member's count
    /// later drops below its threshold.
    pub keep_ranks: bool,
    /// All earned tiers are granted simultaneously; otherwise only the
    /// highest earned tier is retained.
    pub stacked_ranks: bool,
}

/// Live platform role state, injected by the caller so the transition
/// function stays pure. Role existence is never cached: the tier catalog is
/// advisory, this is authoritative.
pub trait RoleState {
    fn role_exists(&self, role_id: serenity::RoleId) -> bool;
    /// Whether the acting principal is allowed to grant/revoke this role
    /// (role below the bot's highest role, not managed by an integration).
    fn role_editable(&self, role_id: serenity::RoleId) -> bool;
    fn has_role(&self, role_id: serenity::RoleId) -> bool;
}

/// The role mutations one evaluation decided on. Grants and revokes never
/// overlap; the caller applies grants before revokes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankTransitions {
    pub grant: BTreeSet<serenity::RoleId>,
    pub revoke: BTreeSet<serenity::RoleId>,
}

impl RankTransitions {
    pub fn is_empty(&self) -> bool {
        self.grant.is_empty() && self.revoke.is_empty()
    }
}

/// Compute the role grants and revokes for one member evaluation.
///
/// Pure: no mutation happens here, so a cancelled or failed application can
/// simply re-run the computation from the same inputs. Tiers whose role no
/// longer exists or cannot be edited are inert for this evaluation.
///
/// Two passes: the scan collects earned tiers and revokes lost ones, then
/// non-stacked mode resolves the earned set down to the single
/// highest-threshold tier, overriding any grant decision from the scan.
/// Tiers sharing a threshold are ordered by catalog position.
pub fn compute_transitions(
    is_bot: bool,
    effective_count: i64,
    tiers: &[rank_tiers::Model],
    policy: RankPolicy,
    roles: &impl RoleState,
) -> RankTransitions {
    let mut transitions = RankTransitions::default();

    // Automated accounts never receive rewards.
    if is_bot {
        return transitions;
    }

    let mut ordered: Vec<&rank_tiers::Model> = tiers.iter().collect();
    ordered.sort_by(|a, b| {
        b.invite_count
            .cmp(&a.invite_count)
            .then(a.position.cmp(&b.position))
    });

    let mut earned: Vec<&rank_tiers::Model> = Vec::new();

    for tier in ordered {
        let role_id = serenity::RoleId::new(tier.role_id as u64);

        if !roles.role_exists(role_id) || !roles.role_editable(role_id) {
            tracing::debug!("Skipping unavailable rank role {}", tier.role_id);
            continue;
        }

        if effective_count < i64::from(tier.invite_count) {
            // Tier not earned: revoke only when the member holds it and the
            // guild does not keep ranks.
            if !policy.keep_ranks && roles.has_role(role_id) {
                transitions.revoke.insert(role_id);
            }
        } else {
            earned.push(tier);
            if policy.stacked_ranks && !roles.has_role(role_id) {
                transitions.grant.insert(role_id);
            }
        }
    }

    // Non-stacked mode converges on exactly one held reward role: the
    // highest earned tier wins, every other earned tier's role goes.
    if !policy.stacked_ranks {
        if let Some(top) = earned.first() {
            let top_role = serenity::RoleId::new(top.role_id as u64);
            transitions.revoke.remove(&top_role);
            if !roles.has_role(top_role) {
                transitions.grant.insert(top_role);
            }

            for tier in earned.iter().skip(1) {
                let role_id = serenity::RoleId::new(tier.role_id as u64);
                if role_id == top_role {
                    continue;
                }
                transitions.grant.remove(&role_id);
                if roles.has_role(role_id) {
                    transitions.revoke.insert(role_id);
                }
            }
        }
    }

    debug_assert!(transitions.grant.is_disjoint(&transitions.revoke));
    transitions
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct FakeRoles {
        existing: HashSet<u64>,
        editable: HashSet<u64>,
        held: HashSet<u64>,
    }

    impl FakeRoles {
        fn new(existing: &[u64], held: &[u64]) -> Self {
            Self {
                existing: existing.iter().copied().collect(),
                editable: existing.iter().copied().collect(),
                held: held.iter().copied().collect(),
            }
        }

        fn uneditable(mut self, role_id: u64) -> Self {
            self.editable.remove(&role_id);
            self
        }
    }

    impl RoleState for FakeRoles {
        fn role_exists(&self, role_id: serenity::RoleId) -> bool {
            self.existing.contains(&role_id.get())
        }

        fn role_editable(&self, role_id: serenity::RoleId) -> bool {
            self.editable.contains(&role_id.get())
        }

        fn has_role(&self, role_id: serenity::RoleId) -> bool {
            self.held.contains(&role_id.get())
        }
    }

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

    fn role(id: u64) -> serenity::RoleId {
        serenity::RoleId::new(id)
    }

    fn ids(set: &BTreeSet<serenity::RoleId>) -> Vec<u64> {
        set.iter().map(|r| r.get()).collect()
    }

    #[test]
    fn test_bots_are_skipped() {
        let roles = FakeRoles::new(&[100, 200, 300], &[]);
        let policy = RankPolicy {
            keep_ranks: false,
            stacked_ranks: true,
        };

        let transitions = compute_transitions(true, 100, &catalog(), policy, &roles);
        assert!(transitions.is_empty());
    }

    #[test]
    fn test_stacked_grants_all_earned_tiers() {
        let roles = FakeRoles::new(&[100, 200, 300], &[]);
        let policy = RankPolicy {
            keep_ranks: false,
            stacked_ranks: true,
        };

        let transitions = compute_transitions(false, 22, &catalog(), policy, &roles);
        assert_eq!(ids(&transitions.grant), vec![100, 200, 300]);
        assert!(transitions.revoke.is_empty());
    }

    #[test]
    fn test_non_stacked_grants_only_highest() {
        let roles = FakeRoles::new(&[100, 200, 300], &[]);
        let policy = RankPolicy {
            keep_ranks: false,
            stacked_ranks: false,
        };

        let transitions = compute_transitions(false, 12, &catalog(), policy, &roles);
        assert_eq!(ids(&transitions.grant), vec![200]);
        assert!(transitions.revoke.is_empty());
    }

    #[test]
    fn test_count_drop_revokes_held_role() {
        // Member holds B (10 invites) and falls from 12 to 3: no tier earned.
        let roles = FakeRoles::new(&[100, 200, 300], &[200]);
        let policy = RankPolicy {
            keep_ranks: false,
            stacked_ranks: false,
        };

        let transitions = compute_transitions(false, 3, &catalog(), policy, &roles);
        assert!(transitions.grant.is_empty());
        assert_eq!(ids(&transitions.revoke), vec![200]);
    }

    #[test]
    fn test_keep_ranks_never_revokes() {
        let roles = FakeRoles::new(&[100, 200, 300], &[100, 200, 300]);
        let policy = RankPolicy {
            keep_ranks: true,
            stacked_ranks: true,
        };

        for count in [-5, 0, 3, 19] {
            let transitions = compute_transitions(false, count, &catalog(), policy, &roles);
            assert!(
                transitions.revoke.is_empty(),
                "count {} must not revoke",
                count
            );
        }
    }

    #[test]
    fn test_non_stacked_converges_from_stacked_state() {
        // Holds two reward roles from an earlier stacked configuration.
        let roles = FakeRoles::new(&[100, 200, 300], &[100, 200]);
        let policy = RankPolicy {
            keep_ranks: false,
            stacked_ranks: false,
        };

        let transitions = compute_transitions(false, 12, &catalog(), policy, &roles);
        // Highest earned (200) is kept, the lower one revoked.
        assert!(transitions.grant.is_empty());
        assert_eq!(ids(&transitions.revoke), vec![100]);
    }

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        let roles = FakeRoles::new(&[100, 200, 300], &[]);
        let policy = RankPolicy {
            keep_ranks: false,
            stacked_ranks: false,
        };

        let transitions = compute_transitions(false, 10, &catalog(), policy, &roles);
        assert_eq!(ids(&transitions.grant), vec![200]);
    }

    #[test]
    fn test_deleted_role_tier_is_inert() {
        // Role 300 was deleted in the guild.
        let roles = FakeRoles::new(&[100, 200], &[]);
        let policy = RankPolicy {
            keep_ranks: false,
            stacked_ranks: false,
        };

        let transitions = compute_transitions(false, 25, &catalog(), policy, &roles);
        assert_eq!(ids(&transitions.grant), vec![200]);
    }

    #[test]
    fn test_uneditable_role_tier_is_inert() {
        // Role 300 sits above the bot in the hierarchy.
        let roles = FakeRoles::new(&[100, 200, 300], &[]).uneditable(300);
        let policy = RankPolicy {
            keep_ranks: false,
            stacked_ranks: true,
        };

        let transitions = compute_transitions(false, 25, &catalog(), policy, &roles);
        assert_eq!(ids(&transitions.grant), vec![100, 200]);
    }

    #[test]
    fn test_negative_count_earns_nothing() {
        let roles = FakeRoles::new(&[100, 200, 300], &[]);
        let policy = RankPolicy {
            keep_ranks: false,
            stacked_ranks: true,
        };

        let transitions = compute_transitions(false, -4, &catalog(), policy, &roles);
        assert!(transitions.is_empty());
    }

    #[test]
    fn test_grant_and_revoke_never_overlap() {
        let policies = [
            RankPolicy { keep_ranks: false, stacked_ranks: false },
            RankPolicy { keep_ranks: false, stacked_ranks: true },
            RankPolicy { keep_ranks: true, stacked_ranks: false },
            RankPolicy { keep_ranks: true, stacked_ranks: true },
        ];

        for policy in policies {
            for count in [-3, 0, 5, 7, 10, 15, 20, 40] {
                for held in [&[][..], &[100][..], &[100, 200][..], &[100, 200, 300][..]] {
                    let roles = FakeRoles::new(&[100, 200, 300], held);
                    let transitions =
                        compute_transitions(false, count, &catalog(), policy, &roles);
                    assert!(
                        transitions.grant.is_disjoint(&transitions.revoke),
                        "overlap for policy {:?}, count {}, held {:?}",
                        policy,
                        count,
                        held
                    );
                }
            }
        }
    }

    #[test]
    fn test_idempotent_for_identical_inputs() {
        let roles = FakeRoles::new(&[100, 200, 300], &[100]);
        let policy = RankPolicy {
            keep_ranks: false,
            stacked_ranks: true,
        };

        let first = compute_transitions(false, 12, &catalog(), policy, &roles);
        let second = compute_transitions(false, 12, &catalog(), policy, &roles);
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_threshold_tie_break_is_declaration_order() {
        // Two tiers at 10 invites pointing at different roles: the earlier
        // catalog entry wins in non-stacked mode.
        let tiers = vec![tier(10, 400, 0), tier(10, 500, 1)];
        let roles = FakeRoles::new(&[400, 500], &[500]);
        let policy = RankPolicy {
            keep_ranks: false,
            stacked_ranks: false,
        };

        let transitions = compute_transitions(false, 11, &tiers, policy, &roles);
        assert_eq!(ids(&transitions.grant), vec![400]);
        assert_eq!(ids(&transitions.revoke), vec![500]);
    }
}
