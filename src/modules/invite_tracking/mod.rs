pub mod commands;
pub mod events;
pub mod records;
pub mod tracking;

use crate::modules::Module;

pub const ID: &str = "invite_tracking";

pub fn module() -> Module {
    Module {
        id: ID,
        commands: commands::commands(),
        event_handlers: vec![events::handler],
    }
}
