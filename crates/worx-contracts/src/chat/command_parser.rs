/// One line of studio input, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudioCommand {
    Noop,
    Help,
    Presets,
    TogglePreset(String),
    Upload(Vec<String>),
    RemoveUpload(usize),
    Gallery,
    Download { id: String, dir: Option<String> },
    OpenSettings,
    ConnectHost,
    SaveKey(String),
    CloseSettings,
    Quit,
    /// Plain text is the prompt to generate from.
    Generate(String),
    Invalid { command: String, reason: String },
    Unknown { command: String, arg: String },
}

fn parse_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

fn invalid(command: &str, reason: &str) -> StudioCommand {
    StudioCommand::Invalid {
        command: command.to_string(),
        reason: reason.to_string(),
    }
}

pub fn parse_command(text: &str) -> StudioCommand {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return StudioCommand::Noop;
    }

    let Some(slash_tail) = raw_trimmed.strip_prefix('/') else {
        return StudioCommand::Generate(raw_trimmed.to_string());
    };
    let command_len = slash_tail
        .chars()
        .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        .count();
    if command_len == 0 {
        return StudioCommand::Generate(raw_trimmed.to_string());
    }
    let command = slash_tail[..command_len].to_ascii_lowercase();
    let arg = slash_tail[command_len..].trim();

    match command.as_str() {
        "help" => StudioCommand::Help,
        "presets" => StudioCommand::Presets,
        "gallery" => StudioCommand::Gallery,
        "settings" => StudioCommand::OpenSettings,
        "connect" => StudioCommand::ConnectHost,
        "close" => StudioCommand::CloseSettings,
        "quit" | "exit" => StudioCommand::Quit,
        "preset" => match parse_args(arg).into_iter().next() {
            Some(id) => StudioCommand::TogglePreset(id),
            None => invalid(&command, "a preset id is required"),
        },
        "upload" => {
            let paths = parse_args(arg);
            if paths.is_empty() {
                invalid(&command, "at least one path is required")
            } else {
                StudioCommand::Upload(paths)
            }
        }
        "remove" => match arg.parse::<usize>() {
            Ok(number) if number >= 1 => StudioCommand::RemoveUpload(number - 1),
            _ => invalid(&command, "expected an upload number starting at 1"),
        },
        "download" => {
            let mut parts = parse_args(arg).into_iter();
            match parts.next() {
                Some(id) => StudioCommand::Download {
                    id,
                    dir: parts.next(),
                },
                None => invalid(&command, "an image id is required"),
            }
        }
        "key" => {
            if arg.is_empty() {
                invalid(&command, "an API key is required")
            } else {
                StudioCommand::SaveKey(arg.to_string())
            }
        }
        _ => StudioCommand::Unknown {
            command,
            arg: arg.to_string(),
        },
    }
}
