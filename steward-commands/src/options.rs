//! Typed lookups over slash-command options.

use twilight_model::{
    application::interaction::application_command::{CommandDataOption, CommandOptionValue},
    id::{Id, marker::UserMarker},
};

fn find<'a>(options: &'a [CommandDataOption], name: &str) -> Option<&'a CommandOptionValue> {
    options
        .iter()
        .find(|option| option.name == name)
        .map(|option| &option.value)
}

pub fn string_option<'a>(options: &'a [CommandDataOption], name: &str) -> Option<&'a str> {
    match find(options, name)? {
        CommandOptionValue::String(value) => Some(value.as_str()),
        _ => None,
    }
}

pub fn user_option(options: &[CommandDataOption], name: &str) -> Option<Id<UserMarker>> {
    match find(options, name)? {
        CommandOptionValue::User(user_id) => Some(*user_id),
        _ => None,
    }
}

pub fn bool_option(options: &[CommandDataOption], name: &str) -> Option<bool> {
    match find(options, name)? {
        CommandOptionValue::Boolean(value) => Some(*value),
        _ => None,
    }
}
