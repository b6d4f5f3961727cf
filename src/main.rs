//! smartchef: AI recipe assistant with a hands-free cooking mode.

mod alarm;
mod api;
mod config;
mod cooking;
mod error;
mod gamification;
mod kitchen;
mod narrator;
mod pipeline;
mod recipe;
mod saved;
mod storage;
mod time_parser;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cooking::{CookingCommand, CookingEvent, CookingSession};
use crate::gamification::{GamificationStats, Ledger, SystemClock};
use crate::kitchen::Kitchen;
use crate::pipeline::{ImageData, OllamaPipeline};
use crate::recipe::{find_by_name, Recipe};
use crate::saved::SavedRecipes;
use crate::storage::{load_json, save_json, FileStorage, Storage, LAST_RECIPES_KEY};
use crate::time_parser::format_countdown;

#[derive(Parser, Debug)]
#[command(name = "smartchef", about = "AI recipe assistant with hands-free cooking mode")]
struct Args {
    /// Path to config.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate recipes from ingredients, leftovers and an optional fridge photo
    Generate {
        /// Ingredient on hand (repeatable, or comma-separated)
        #[arg(short, long = "ingredient", value_delimiter = ',')]
        ingredients: Vec<String>,

        /// Dietary filter: Vegan, Vegetarian, Gluten-Free, Keto, Low-Carb,
        /// High-Protein, Dairy-Free
        #[arg(short, long = "filter", value_delimiter = ',')]
        filters: Vec<String>,

        /// Free-text description of leftovers to use up
        #[arg(short, long)]
        leftovers: Option<String>,

        /// Photo of the fridge or pantry to scan for ingredients
        #[arg(short, long)]
        scan: Option<PathBuf>,

        /// Ingredient to leave out, e.g. one the scan picked up by mistake
        #[arg(short = 'x', long = "exclude", value_delimiter = ',')]
        exclude: Vec<String>,
    },
    /// List the ingredients recognised in a photo
    Scan { image: PathBuf },
    /// Show a recipe from the last batch or the saved collection
    Show { name: String },
    /// Cook a recipe step by step with narration and timers
    Cook { name: String },
    /// List saved recipes
    Saved,
    /// Save a recipe from the last batch
    Save { name: String },
    /// Remove a saved recipe
    Unsave { name: String },
    /// Show points and streak
    Stats,
    /// Serve the HTTP API
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Keep HTTP and audio internals quiet
    let filter = if args.verbose {
        EnvFilter::new("debug,hyper=info,reqwest=info,rodio=info")
    } else {
        EnvFilter::new("info,hyper=warn,reqwest=warn,rodio=warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = config::Config::load(args.config.as_deref());
    let file_storage = FileStorage::new(config.data_dir());
    debug!("Data directory: {}", file_storage.dir().display());
    let storage: Arc<dyn Storage> = Arc::new(file_storage);

    match args.command {
        Command::Generate {
            ingredients,
            filters,
            leftovers,
            scan,
            exclude,
        } => {
            let ledger = Ledger::load(storage.clone(), Arc::new(SystemClock));
            let mut kitchen = Kitchen::new(
                OllamaPipeline::new(config.ai.clone()),
                ledger,
                config.gamification.points_per_ingredient,
            );
            for ingredient in &ingredients {
                kitchen.add_ingredient(ingredient);
            }
            for filter in &filters {
                if kitchen.toggle_filter(filter).is_none() {
                    warn!("Unknown dietary filter '{filter}', ignoring");
                }
            }
            if let Some(text) = leftovers {
                kitchen.set_leftovers(&text);
            }
            if let Some(path) = scan {
                // A failed scan still leaves the typed ingredients to work with
                match ImageData::from_path(&path) {
                    Ok(image) => {
                        if let Err(e) = kitchen.scan(&image).await {
                            warn!("{e}");
                        }
                    }
                    Err(e) => warn!("{e}"),
                }
            }
            for ingredient in &exclude {
                kitchen.remove_ingredient(ingredient);
            }

            info!(
                "Generating recipes for: {} (filters: {:?})",
                kitchen.ingredients().join(", "),
                kitchen.filters()
            );
            if !kitchen.leftovers().is_empty() {
                debug!("Leftovers: {}", kitchen.leftovers());
            }
            kitchen.generate().await?;
            let recipes = kitchen.recipes();
            if let Err(e) = save_json(storage.as_ref(), LAST_RECIPES_KEY, recipes) {
                warn!("Failed to remember last recipes: {e}");
            }

            print_batch(recipes);
            print_stats(&kitchen.stats());
        }

        Command::Scan { image } => {
            let image = ImageData::from_path(&image)?;
            let mut kitchen = Kitchen::new(
                OllamaPipeline::new(config.ai.clone()),
                Ledger::load(storage.clone(), Arc::new(SystemClock)),
                config.gamification.points_per_ingredient,
            );
            kitchen.scan(&image).await?;
            if kitchen.ingredients().is_empty() {
                println!("No ingredients recognised.");
            }
            for ingredient in kitchen.ingredients() {
                println!("- {ingredient}");
            }
        }

        Command::Show { name } => {
            let saved = SavedRecipes::load(storage.clone());
            let recipe = lookup(storage.as_ref(), &saved, &name)?;
            println!("{}", recipe.to_markdown());
            if saved.is_saved(&recipe.name) {
                println!("(saved)");
            }
        }

        Command::Cook { name } => {
            let saved = SavedRecipes::load(storage.clone());
            let recipe = lookup(storage.as_ref(), &saved, &name)?;
            cook(recipe, &config).await?;
        }

        Command::Saved => {
            let saved = SavedRecipes::load(storage.clone());
            if saved.list().is_empty() {
                println!("No saved recipes yet.");
            }
            for recipe in saved.list() {
                println!(
                    "- {} ({}, {})",
                    recipe.name, recipe.difficulty, recipe.cooking_time
                );
            }
        }

        Command::Save { name } => {
            let last = last_recipes(storage.as_ref());
            let recipe = find_by_name(&last, &name)
                .cloned()
                .ok_or_else(|| format!("No recipe named '{name}' in the last batch"))?;
            let mut saved = SavedRecipes::load(storage.clone());
            let title = recipe.name.clone();
            if saved.save(recipe) {
                println!("Saved '{title}'.");
            } else {
                println!("'{title}' is already saved.");
            }
        }

        Command::Unsave { name } => {
            let mut saved = SavedRecipes::load(storage.clone());
            let title = saved
                .get(&name)
                .map(|r| r.name.clone())
                .unwrap_or(name);
            if saved.unsave(&title) {
                println!("Removed '{title}'.");
            } else {
                println!("'{title}' was not saved.");
            }
        }

        Command::Stats => {
            let ledger = Ledger::load(storage.clone(), Arc::new(SystemClock));
            print_stats(&ledger.stats());
        }

        Command::Serve { port } => {
            let state = api::ApiState::new(
                OllamaPipeline::new(config.ai.clone()),
                Ledger::load(storage.clone(), Arc::new(SystemClock)),
                SavedRecipes::load(storage.clone()),
                config.gamification.points_per_ingredient,
            );
            api::serve(state, port.unwrap_or(config.server.port)).await?;
        }
    }

    Ok(())
}

fn last_recipes(storage: &dyn Storage) -> Vec<Recipe> {
    match load_json(storage, LAST_RECIPES_KEY) {
        Ok(recipes) => recipes.unwrap_or_default(),
        Err(e) => {
            warn!("Failed to load last recipes: {e}");
            Vec::new()
        }
    }
}

/// Look a recipe up in the last batch first, then the saved collection.
fn lookup(
    storage: &dyn Storage,
    saved: &SavedRecipes,
    name: &str,
) -> Result<Recipe, Box<dyn std::error::Error>> {
    let last = last_recipes(storage);
    find_by_name(&last, name)
        .or_else(|| saved.get(name))
        .cloned()
        .ok_or_else(|| format!("No recipe named '{name}'. Run `smartchef generate` first.").into())
}

fn print_batch(recipes: &[Recipe]) {
    if recipes.is_empty() {
        println!("The AI had no recipes for that. Try different ingredients.");
        return;
    }
    for (i, recipe) in recipes.iter().enumerate() {
        println!(
            "{}. {} ({}, {})",
            i + 1,
            recipe.name,
            recipe.difficulty,
            recipe.cooking_time
        );
        println!("   {}", recipe.description);
        if !recipe.ingredients_needed.is_empty() {
            println!("   Shopping list: {}", recipe.ingredients_needed.join(", "));
        }
    }
}

fn print_stats(stats: &GamificationStats) {
    println!("Points: {}  Streak: {} day(s)", stats.points, stats.streak);
    if let Some(last) = stats.last_used {
        println!("Last cooked: {}", last.format("%Y-%m-%d %H:%M"));
    }
}

const COOKING_HELP: &str =
    "Commands: n = next, p = previous, m = mute, t = start timer, space = pause/resume, c = cancel timer, q = quit";

async fn cook(recipe: Recipe, config: &config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let session = CookingSession::start(
        recipe,
        narrator::from_config(&config.narration),
        alarm::from_config(&config.alarm),
    )?;

    // Blocking stdin on its own thread; it dies with the process
    let (tx, rx) = mpsc::channel(16);
    std::thread::Builder::new()
        .name("cooking-input".into())
        .spawn(move || {
            for line in std::io::stdin().lines() {
                let Ok(line) = line else { break };
                match CookingCommand::parse(&line) {
                    Some(command) => {
                        if tx.blocking_send(command).is_err() {
                            break;
                        }
                    }
                    None => println!("{COOKING_HELP}"),
                }
            }
        })?;

    println!("{COOKING_HELP}");
    cooking::run(session, rx, render).await;
    println!();
    Ok(())
}

fn render(session: &CookingSession, event: CookingEvent) {
    match event {
        CookingEvent::Started | CookingEvent::Step => {
            if event == CookingEvent::Started {
                println!("Cooking: {}", session.recipe().name);
            }
            println!(
                "\nStep {}/{}: {}",
                session.step() + 1,
                session.step_count(),
                session.instruction()
            );
            if let Some(secs) = session.step_duration() {
                println!("  (press t for a {} timer)", format_countdown(secs));
            }
        }
        CookingEvent::Mute => {
            println!(
                "Narration {}",
                if session.is_muted() { "muted" } else { "on" }
            );
        }
        CookingEvent::Timer => match session.timer() {
            Some(timer) => {
                print!(
                    "\rTimer {} [{}]   ",
                    format_countdown(timer.remaining_secs),
                    session.timer_phase()
                );
                let _ = std::io::stdout().flush();
            }
            None => println!("\rTimer cancelled        "),
        },
        CookingEvent::TimerExpired => println!("\rTimer 0:00 - time's up!"),
        CookingEvent::Narration => {
            debug!("Speaking: {}", session.is_speaking());
        }
        CookingEvent::Rejected(e) => println!("{e}"),
    }
}
