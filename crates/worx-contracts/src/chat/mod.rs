mod command_parser;
mod command_registry;

pub use command_parser::{parse_command, StudioCommand};
pub use command_registry::{CommandSpec, STUDIO_COMMANDS};
