use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use worx_contracts::brand::{BrandCatalog, PresetCategory};
use worx_contracts::chat::{parse_command, StudioCommand, STUDIO_COMMANDS};
use worx_contracts::credentials::{resolve_key, HostKeyStatus, KeyResolution};
use worx_contracts::events::EventWriter;
use worx_contracts::gallery::Gallery;
use worx_contracts::key_store::KeyStore;
use worx_contracts::references::{PresetSelection, MAX_CUSTOM_UPLOADS};
use worx_engine::{
    ConnectOutcome, EnvironmentKeySelector, GeminiApi, GenerateOutcome, GenerationClient,
    KeySaveOutcome, Studio, StudioConfig, UploadOutcome,
};

#[derive(Debug, Parser)]
#[command(name = "worx", version, about = "Worxphere brand illustration studio")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate one illustration and write it to --out.
    Generate(GenerateArgs),
    /// Interactive studio session.
    Studio(StudioArgs),
    /// Manage the stored API key.
    Key(KeyArgs),
    /// List brand presets and prompt examples.
    Presets,
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    #[arg(long)]
    prompt: String,
    #[arg(long = "preset")]
    presets: Vec<String>,
    /// Custom reference images, read as one batch.
    #[arg(long = "upload")]
    uploads: Vec<PathBuf>,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    state_dir: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct StudioArgs {
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    state_dir: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct KeyArgs {
    #[command(subcommand)]
    action: KeyAction,
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum KeyAction {
    /// Show where the key would come from, never the key itself.
    Status,
    /// Verify a key with a trial call and store it.
    Verify { key: String },
    /// Forget the stored key.
    Clear,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("worx error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Studio(args) => {
            run_studio(args)?;
            Ok(0)
        }
        Command::Key(args) => run_key(args),
        Command::Presets => {
            let catalog = BrandCatalog::embedded()?;
            print_presets(&catalog, &PresetSelection::new());
            print_prompt_examples();
            Ok(0)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn load_config(state_dir: Option<PathBuf>) -> StudioConfig {
    let mut config = StudioConfig::from_env();
    if let Some(state_dir) = state_dir {
        config.state_dir = state_dir;
    }
    tracing::debug!(?config, "loaded studio config");
    config
}

fn build_studio(config: &StudioConfig, events: Option<EventWriter>) -> Result<Studio<GeminiApi>> {
    let catalog = BrandCatalog::embedded().context("embedded brand catalog is invalid")?;
    let client = GenerationClient::new(GeminiApi::new(&config.api_base)?)
        .with_models(&config.image_model, &config.verify_model);
    let mut studio = Studio::new(catalog, client, KeyStore::new(config.key_store_path()))
        .with_environment_key(config.environment_key.clone());
    if let Some(host) = EnvironmentKeySelector::detect(config.environment_key.as_deref()) {
        studio = studio.with_host(Box::new(host));
    }
    if let Some(events) = events {
        studio = studio.with_events(events);
    }
    Ok(studio)
}

fn session_events(out: &Path, events: Option<PathBuf>) -> Result<EventWriter> {
    std::fs::create_dir_all(out).with_context(|| format!("failed to create {}", out.display()))?;
    let path = events.unwrap_or_else(|| out.join("events.jsonl"));
    Ok(EventWriter::for_new_session(path))
}

fn run_generate(args: GenerateArgs) -> Result<i32> {
    let config = load_config(args.state_dir);
    let events = session_events(&args.out, args.events)?;
    let mut studio = build_studio(&config, Some(events))?;
    studio.start();
    if studio.modal().is_open() {
        bail!(
            "no API key configured; run `worx key verify <KEY>` or set one of GEMINI_API_KEY / GOOGLE_API_KEY"
        );
    }

    for id in &args.presets {
        if studio.toggle_preset(id) != Some(true) {
            bail!("unknown or repeated preset '{id}' (see `worx presets`)");
        }
    }
    if let UploadOutcome::Failed(err) = studio.add_uploads(&args.uploads) {
        return Err(err).context("failed to read uploads");
    }

    studio.set_prompt(args.prompt);
    match studio.generate() {
        GenerateOutcome::Generated(image) => {
            let path = studio.download(&image.id, &args.out)?;
            println!("{}", path.display());
            Ok(0)
        }
        GenerateOutcome::Skipped => bail!("prompt is empty"),
        GenerateOutcome::NeedsKey => bail!("no usable API key; run `worx key verify <KEY>`"),
        GenerateOutcome::Failed(err) => {
            eprintln!("{err}");
            Ok(1)
        }
    }
}

fn run_key(args: KeyArgs) -> Result<i32> {
    let config = load_config(args.state_dir);
    let store = KeyStore::new(config.key_store_path());
    match args.action {
        KeyAction::Status => {
            let stored = store.load();
            let host = if config.environment_key.is_some() {
                HostKeyStatus::Selected
            } else {
                HostKeyStatus::Unavailable
            };
            println!("store: {}", store.path().display());
            println!(
                "stored key: {}",
                if stored.is_some() { "present" } else { "absent" }
            );
            println!(
                "environment key: {}",
                if config.environment_key.is_some() { "present" } else { "absent" }
            );
            match resolve_key(stored.as_deref(), host, config.environment_key.as_deref()) {
                KeyResolution::Resolved(key) => println!("active source: {}", key.source().as_str()),
                KeyResolution::NeedsKey => println!("active source: none"),
            }
            Ok(0)
        }
        KeyAction::Verify { key } => {
            let mut studio = build_studio(&config, None)?;
            match studio.save_manual_key(&key) {
                KeySaveOutcome::Saved { persisted: true } => {
                    println!("Key verified and saved to {}", store.path().display());
                    Ok(0)
                }
                KeySaveOutcome::Saved { persisted: false } => {
                    eprintln!("Key verified but could not be saved (see log)");
                    Ok(1)
                }
                KeySaveOutcome::Rejected => {
                    eprintln!(
                        "{}",
                        studio.modal().error().unwrap_or("key verification failed")
                    );
                    Ok(1)
                }
                KeySaveOutcome::Ignored => bail!("key is empty"),
            }
        }
        KeyAction::Clear => {
            if store.clear()? {
                println!("Stored key removed");
            } else {
                println!("No stored key");
            }
            Ok(0)
        }
    }
}

fn run_studio(args: StudioArgs) -> Result<()> {
    let config = load_config(args.state_dir);
    let events = session_events(&args.out, args.events)?;
    let mut studio = build_studio(&config, Some(events))?;
    studio.start();

    println!("Worxphere studio started. Type a prompt to generate, /help for commands.");
    print_key_state(&studio);

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        match parse_command(line.trim_end_matches(['\n', '\r'])) {
            StudioCommand::Noop => {}
            StudioCommand::Quit => break,
            StudioCommand::Help => {
                for spec in STUDIO_COMMANDS {
                    println!("  {:<24} {}", spec.usage, spec.summary);
                }
                print_prompt_examples();
            }
            StudioCommand::Presets => print_presets(studio.catalog(), studio.presets()),
            StudioCommand::TogglePreset(id) => match studio.toggle_preset(&id) {
                Some(true) => println!("Preset {id} selected"),
                Some(false) => println!("Preset {id} cleared"),
                None => println!("Unknown preset '{id}'. Try /presets."),
            },
            StudioCommand::Upload(paths) => {
                let paths: Vec<PathBuf> = paths.into_iter().map(PathBuf::from).collect();
                match studio.add_uploads(&paths) {
                    UploadOutcome::Added(count) => println!(
                        "Added {count} upload(s); {} attached",
                        studio.uploads().len()
                    ),
                    UploadOutcome::SlotsFull => println!(
                        "Uploads are closed at {MAX_CUSTOM_UPLOADS} or more images. Remove one with /remove <n>."
                    ),
                    UploadOutcome::Failed(err) => println!("Upload failed: {err}"),
                }
            }
            StudioCommand::RemoveUpload(index) => {
                if studio.remove_upload(index) {
                    println!("Removed upload {}", index + 1);
                } else {
                    println!("No upload at position {}", index + 1);
                }
            }
            StudioCommand::Gallery => print_gallery(studio.gallery()),
            StudioCommand::Download { id, dir } => {
                let dir = dir.map(PathBuf::from).unwrap_or_else(|| args.out.clone());
                match studio.download(&id, &dir) {
                    Ok(path) => println!("Saved {}", path.display()),
                    Err(err) => println!("Download failed: {err:#}"),
                }
            }
            StudioCommand::OpenSettings => {
                studio.open_settings();
                print_key_state(&studio);
            }
            StudioCommand::ConnectHost => match studio.connect_host() {
                ConnectOutcome::Selected => println!("Using the host-selected key"),
                ConnectOutcome::OpenRegistrationPage(url) => {
                    println!("No host key available. Create a key at {url} and save it with /key <value>.")
                }
                ConnectOutcome::Failed(reason) => println!("Host key selection failed: {reason}"),
            },
            StudioCommand::SaveKey(key) => match studio.save_manual_key(&key) {
                KeySaveOutcome::Saved { persisted } => {
                    if persisted {
                        println!("Key verified and saved");
                    } else {
                        println!("Key verified for this session only (could not save it)");
                    }
                }
                KeySaveOutcome::Rejected => {
                    println!("{}", studio.modal().error().unwrap_or("Key rejected"))
                }
                KeySaveOutcome::Ignored => println!("/key requires a value"),
            },
            StudioCommand::CloseSettings => {
                studio.close_settings();
                println!("Settings closed");
            }
            StudioCommand::Generate(prompt) => {
                studio.set_prompt(prompt);
                println!("Generating...");
                match studio.generate() {
                    GenerateOutcome::Generated(image) => {
                        println!("Generated image {} (gallery: {})", image.id, studio.gallery().len());
                        match studio.download(&image.id, &args.out) {
                            Ok(path) => println!("Saved {}", path.display()),
                            Err(err) => println!("Could not save image: {err:#}"),
                        }
                    }
                    GenerateOutcome::Skipped => {}
                    GenerateOutcome::NeedsKey => print_key_state(&studio),
                    GenerateOutcome::Failed(_) => {
                        if let Some(message) = studio.error() {
                            println!("{message}");
                        }
                        if studio.modal().is_open() {
                            print_key_state(&studio);
                        }
                    }
                }
            }
            StudioCommand::Invalid { command, reason } => println!("/{command}: {reason}"),
            StudioCommand::Unknown { command, .. } => {
                println!("Unknown command /{command}. Type /help.")
            }
        }
    }
    Ok(())
}

fn print_key_state<A: worx_engine::GenerationApi>(studio: &Studio<A>) {
    if !studio.modal().is_open() {
        println!("API key: {}", studio.session_key().describe());
        return;
    }
    println!("API key needed.");
    if studio.modal().saved_draft().is_some() {
        println!("  A stored key exists; /key <value> replaces it.");
    }
    if studio.has_host() {
        println!("  /connect     use the host-selected key");
    }
    println!("  /key <value> verify and save a key");
    println!("  /close       dismiss");
    if let Some(error) = studio.modal().error() {
        println!("  {error}");
    }
}

fn print_presets(catalog: &BrandCatalog, selection: &PresetSelection) {
    for category in PresetCategory::ALL {
        println!("{}:", category.as_str());
        for preset in catalog.by_category(category) {
            println!("{}", preset_line(&preset.id, &preset.label, selection.contains(&preset.id)));
        }
    }
}

fn preset_line(id: &str, label: &str, selected: bool) -> String {
    let marker = if selected { "[x]" } else { "[ ]" };
    format!("  {marker} {id:<8} {label}")
}

fn print_prompt_examples() {
    println!("Prompt examples:");
    for category in PresetCategory::ALL {
        for example in category.prompt_examples() {
            println!("  ({}) {example}", category.as_str());
        }
    }
}

fn print_gallery(gallery: &Gallery) {
    if gallery.is_empty() {
        println!("Gallery is empty");
        return;
    }
    for (index, image) in gallery.images().iter().enumerate() {
        println!("  {}. {}  {}", index + 1, image.id, clamp_text(&image.prompt, 60));
    }
}

fn clamp_text(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}
