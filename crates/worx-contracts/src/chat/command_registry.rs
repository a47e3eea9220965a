#[derive(Clone, Copy, Debug)]
pub struct CommandSpec {
    pub command: &'static str,
    pub usage: &'static str,
    pub summary: &'static str,
}

pub const STUDIO_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "help",
        usage: "/help",
        summary: "show commands and prompt examples",
    },
    CommandSpec {
        command: "presets",
        usage: "/presets",
        summary: "list brand presets and their selection state",
    },
    CommandSpec {
        command: "preset",
        usage: "/preset <id>",
        summary: "toggle a brand preset as a style reference",
    },
    CommandSpec {
        command: "upload",
        usage: "/upload <path>...",
        summary: "add custom reference images; accepted while fewer than 2 are attached",
    },
    CommandSpec {
        command: "remove",
        usage: "/remove <n>",
        summary: "remove custom upload number n",
    },
    CommandSpec {
        command: "gallery",
        usage: "/gallery",
        summary: "list generated images, newest first",
    },
    CommandSpec {
        command: "download",
        usage: "/download <id> [dir]",
        summary: "save a generated image as worxphere-<id>.png",
    },
    CommandSpec {
        command: "settings",
        usage: "/settings",
        summary: "open the API key settings",
    },
    CommandSpec {
        command: "connect",
        usage: "/connect",
        summary: "select a key through the host, or get the key registration page",
    },
    CommandSpec {
        command: "key",
        usage: "/key <api key>",
        summary: "verify and save an API key",
    },
    CommandSpec {
        command: "close",
        usage: "/close",
        summary: "close the API key settings",
    },
    CommandSpec {
        command: "quit",
        usage: "/quit",
        summary: "leave the studio",
    },
];
