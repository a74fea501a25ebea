pub mod invite_events;
pub mod invite_records;
pub mod invite_snapshots;
pub mod module_configs;
pub mod rank_tiers;
