pub mod invite_ranks;
pub mod invite_tracking;

use crate::{Data, Error};
use poise::serenity_prelude as serenity;
use std::sync::OnceLock;

pub type EventHandler = for<'a> fn(
    &'a serenity::Context,
    &'a serenity::FullEvent,
    &'a Data,
) -> poise::BoxFuture<'a, Result<(), Error>>;

pub struct Module {
    pub id: &'static str,
    pub commands: Vec<poise::Command<Data, Error>>,
    pub event_handlers: Vec<EventHandler>,
}

pub fn get_modules() -> Vec<Module> {
    vec![invite_tracking::module(), invite_ranks::module()]
}

pub fn commands() -> Vec<poise::Command<Data, Error>> {
    let mut all_commands = vec![];

    for mut module in get_modules() {
        let category = module.id;
        for command in &mut module.commands {
            command.category = Some(category.into());
        }
        all_commands.extend(module.commands);
    }

    all_commands
}

pub fn event_handlers() -> &'static [(&'static str, EventHandler)] {
    static HANDLERS: OnceLock<Vec<(&'static str, EventHandler)>> = OnceLock::new();
    HANDLERS.get_or_init(|| {
        get_modules()
            .into_iter()
            .flat_map(|m| {
                let id = m.id;
                m.event_handlers.into_iter().map(move |h| (id, h))
            })
            .collect()
    })
}
