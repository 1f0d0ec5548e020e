use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use delver::{
    Alignment, BatchMode, Engine, JsonCatalog, JsonRecorder, LlmAssistant, LlmConfig, LlmProvider,
    Motivation, Player, Profile, ScriptedAssistant, assign_encounters, assign_loot,
    batch_profiles, generate_layout, populate, render_layout, render_progress,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Fallback player names when none is supplied.
const PLAYER_NAMES: [&str; 12] = [
    "Aldric", "Brynn", "Caspian", "Darya", "Edwyn", "Fenna", "Gareth", "Isolde", "Joren",
    "Katla", "Maren", "Oswin",
];

#[derive(Parser)]
#[command(
    name = "delver",
    version,
    about = "LLM dungeon-crawler profile evaluation (maps, turns, scoring)",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Brain {
    /// Deterministic first-choice walker (control and smoke runs)
    Scripted,
    /// Chat-model driven decisions
    Llm,
}

#[derive(Clone, Debug, clap::Args)]
pub struct LlmOptions {
    /// LLM host/base URL (default OpenAI endpoint)
    #[arg(long, default_value = "https://api.openai.com")]
    pub llm_host: String,
    /// Model name (e.g., gpt-4o, llama3:70b). Interpreted by the selected provider.
    #[arg(long, default_value = "gpt-4o")]
    pub llm_model: String,
    /// LLM provider: openai (/v1/chat/completions) or ollama (local /api/chat)
    #[arg(long, default_value_t = LlmProvider::Openai, value_enum)]
    pub llm_provider: LlmProvider,
    /// LLM timeout in ms
    #[arg(long, default_value_t = 30_000)]
    pub llm_timeout_ms: u64,
    /// API key for OpenAI-compatible providers (also reads LLM_API_KEY env var)
    #[arg(long)]
    pub llm_api_key: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Play one run with a single profile
    Run {
        /// Alignment (full name or short key, e.g. "Lawful Good" or LG)
        #[arg(long)]
        alignment: Option<Alignment>,
        /// Motivation (Wealth, Safety, Wanderlust, Speed)
        #[arg(long)]
        motivation: Option<Motivation>,
        /// Combined profile key, e.g. LG-Wealth (overrides the flags above)
        #[arg(long)]
        key: Option<Profile>,
        /// Player name (random if omitted)
        #[arg(long)]
        name: Option<String>,
        /// Label grouping recorded runs
        #[arg(long, default_value = "ADHOC")]
        run_name: String,
        /// Seed for reproducible map generation
        #[arg(long)]
        seed: Option<u64>,
        /// Decision driver
        #[arg(long, default_value_t = Brain::Llm, value_enum)]
        brain: Brain,
        #[command(flatten)]
        llm: LlmOptions,
        /// Catalog file (embedded default if omitted)
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Directory for recorded runs
        #[arg(long, default_value = "runs")]
        out: PathBuf,
        /// Print the populated map before and the progress map after the run
        #[arg(long, action = ArgAction::SetTrue, default_value_t = false)]
        show_map: bool,
        /// Strip the persona from the system prompt (baseline behavior)
        #[arg(long, action = ArgAction::SetTrue, default_value_t = false)]
        control: bool,
    },
    /// Run a profile sweep: every profile in the set, `loops` times over
    Batch {
        /// Number of passes over the profile set
        #[arg(long, default_value_t = 1)]
        loops: u64,
        /// alignment, motivation, or combined
        #[arg(long, default_value = "combined")]
        mode: BatchMode,
        /// Restrict to a named alignment group (lawful, neutral, chaotic, good, neutrals, evil)
        #[arg(long)]
        group: Option<String>,
        /// Restrict to a single profile key, e.g. TN-Speed
        #[arg(long)]
        key: Option<Profile>,
        /// Label grouping recorded runs
        #[arg(long, default_value = "BATCH")]
        run_name: String,
        /// Base seed; each run offsets from it. Fresh entropy if omitted.
        #[arg(long)]
        seed: Option<u64>,
        /// Decision driver
        #[arg(long, default_value_t = Brain::Llm, value_enum)]
        brain: Brain,
        #[command(flatten)]
        llm: LlmOptions,
        /// Catalog file (embedded default if omitted)
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Directory for recorded runs
        #[arg(long, default_value = "runs")]
        out: PathBuf,
    },
    /// Generate a map and print its layout
    Map {
        /// Seed for reproducible generation
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Validate a catalog file and print a summary
    Catalog {
        /// Catalog file (embedded default if omitted)
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

pub fn run() {
    let cli = Cli::parse();
    if let Err(err) = dispatch(cli.command) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn dispatch(command: Command) -> Result<(), String> {
    match command {
        Command::Run {
            alignment,
            motivation,
            key,
            name,
            run_name,
            seed,
            brain,
            llm,
            catalog,
            out,
            show_map,
            control,
        } => {
            let profile = resolve_profile(key, alignment, motivation, control)?;
            run_single(
                profile,
                control,
                name,
                &run_name,
                seed,
                brain,
                &llm,
                catalog.as_deref(),
                &out,
                show_map,
                0,
            )
        }
        Command::Batch {
            loops,
            mode,
            group,
            key,
            run_name,
            seed,
            brain,
            llm,
            catalog,
            out,
        } => run_batch(
            loops,
            mode,
            group,
            key,
            &run_name,
            seed,
            brain,
            &llm,
            catalog.as_deref(),
            &out,
        ),
        Command::Map { seed } => run_map(seed),
        Command::Catalog { file } => run_catalog(file.as_deref()),
    }
}

fn resolve_profile(
    key: Option<Profile>,
    alignment: Option<Alignment>,
    motivation: Option<Motivation>,
    control: bool,
) -> Result<Profile, String> {
    if let Some(profile) = key {
        return Ok(profile);
    }
    match (alignment, motivation) {
        (None, None) if control => Ok(Profile::full(Alignment::LawfulGood, Motivation::Wealth)),
        (None, None) => Err("provide --alignment, --motivation, or --key".into()),
        (alignment, motivation) => Ok(Profile {
            alignment,
            motivation,
        }),
    }
}

fn run_single(
    profile: Profile,
    control: bool,
    name: Option<String>,
    run_name: &str,
    seed: Option<u64>,
    brain: Brain,
    llm: &LlmOptions,
    catalog_path: Option<&Path>,
    out: &Path,
    show_map: bool,
    run_index: u64,
) -> Result<(), String> {
    let catalog = load_catalog(catalog_path)?;

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut layout = generate_layout(&mut rng);
    if profile.alignment.is_some() {
        assign_encounters(&mut layout, &mut rng);
    }
    if profile.motivation.is_some() {
        assign_loot(&mut layout, &mut rng);
    }
    let map = populate(&layout, &catalog, profile).map_err(|e| e.to_string())?;

    if show_map {
        println!("{}", render_layout(&map.snapshot()));
    }

    let name = name.unwrap_or_else(|| {
        PLAYER_NAMES
            .choose(&mut rng)
            .copied()
            .unwrap_or("Adventurer")
            .to_string()
    });

    println!("_________________________________");
    println!("Welcome Player\t {}", name);
    println!(
        "Alignment is: \t {}",
        profile.alignment.map(|a| a.name()).unwrap_or("None")
    );
    println!(
        "Motivation is:\t {}",
        profile.motivation.map(|m| m.name()).unwrap_or("None")
    );
    println!("_________________________________");
    print_the_time("Run Start");

    let player = Player::new(name, profile, run_name.to_string(), map.entrance());
    let run_id = format!("run_{}_{}", Utc::now().timestamp_millis(), run_index);
    let mut recorder = JsonRecorder::new(out, run_name, run_id);

    let report = match brain {
        Brain::Scripted => {
            let mut assistant = ScriptedAssistant::first_choice();
            Engine::new(map, player, &mut assistant, &mut recorder, rng).run()
        }
        Brain::Llm => {
            let config = LlmConfig {
                host: llm.llm_host.clone(),
                model: llm.llm_model.clone(),
                provider: llm.llm_provider,
                api_key: llm
                    .llm_api_key
                    .clone()
                    .or_else(|| env::var("LLM_API_KEY").ok()),
                timeout: Duration::from_millis(llm.llm_timeout_ms),
            };
            let mut assistant = LlmAssistant::new(profile, control, config)?;
            Engine::new(map, player, &mut assistant, &mut recorder, rng).run()
        }
    };

    print_the_time("Run End");
    println!("{}", report.player.summary());
    if show_map {
        println!("{}", render_progress(&report.map.snapshot()));
    }
    Ok(())
}

fn run_batch(
    loops: u64,
    mode: BatchMode,
    group: Option<String>,
    key: Option<Profile>,
    run_name: &str,
    seed: Option<u64>,
    brain: Brain,
    llm: &LlmOptions,
    catalog_path: Option<&Path>,
    out: &Path,
) -> Result<(), String> {
    let profiles = match key {
        Some(profile) => vec![profile],
        None => batch_profiles(mode, group.as_deref())?,
    };

    print_the_time("Batch Start");
    let mut run_index = 0u64;
    for pass in 0..loops {
        println!("Batch: {} of: {}", pass + 1, loops);
        for profile in &profiles {
            run_single(
                *profile,
                false,
                None,
                run_name,
                seed.map(|s| s.wrapping_add(run_index)),
                brain,
                llm,
                catalog_path,
                out,
                false,
                run_index,
            )?;
            run_index += 1;
        }
    }
    print_the_time("Batch End");
    Ok(())
}

fn run_map(seed: Option<u64>) -> Result<(), String> {
    let catalog = load_catalog(None)?;
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut layout = generate_layout(&mut rng);
    assign_encounters(&mut layout, &mut rng);
    assign_loot(&mut layout, &mut rng);
    let profile = Profile::full(Alignment::LawfulGood, Motivation::Wealth);
    let map = populate(&layout, &catalog, profile).map_err(|e| e.to_string())?;
    println!("{}", render_layout(&map.snapshot()));
    println!("entrance: {}  exit: {}", map.entrance(), map.exit());
    Ok(())
}

fn run_catalog(file: Option<&Path>) -> Result<(), String> {
    let catalog = load_catalog(file)?;
    println!("Catalog OK: {}", catalog.summary());
    Ok(())
}

fn load_catalog(path: Option<&Path>) -> Result<JsonCatalog, String> {
    match path {
        Some(path) => JsonCatalog::load(path).map_err(|e| e.to_string()),
        None => JsonCatalog::builtin().map_err(|e| e.to_string()),
    }
}

fn print_the_time(message: &str) {
    println!("{} time:\t{}", message, Utc::now().format("%H:%M:%S"));
    println!("______________________________________________");
}
