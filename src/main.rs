//! Npcdata - Entry Point
//!
//! Command line front end for inspecting, reloading and editing NPC templates
//! in a database.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};

use npcdata::data::schema::{self, AttrValue, AttributeSet};
use npcdata::data::{LoadReport, NpcTemplate, StaticCatalog};
use npcdata::{Config, NpcLoader, NpcRegistry, SqliteStore};

#[derive(Parser)]
#[command(name = "npcdata")]
#[command(about = "NPC template loader and registry tools", version)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database file, overriding the config
    #[arg(short, long)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create any missing base and custom tables
    InitSchema,

    /// Load every template and print a summary
    Load,

    /// Print one template, by id or name
    Show {
        npc: String,
    },

    /// Print one template as JSON
    Dump {
        id: u32,
    },

    /// Reload one template and its child rows
    Reload {
        id: u32,
    },

    /// Reload the whole registry
    ReloadAll,

    /// Write columns back to an NPC's tables, as column=value pairs
    Save {
        id: u32,
        #[arg(required = true)]
        values: Vec<String>,
    },
}

type Loader = NpcLoader<SqliteStore, StaticCatalog>;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    if let Some(database) = cli.database {
        config.database = database;
    }

    let store = SqliteStore::open(&config.database, config.store_timeout())
        .with_context(|| format!("opening database {}", config.database.display()))?;

    if let Commands::InitSchema = cli.command {
        store.create_schema()?;
        log::info!("Schema ready in {}", config.database.display());
        return Ok(());
    }

    let catalog = load_catalog(&config)?;
    let loader = NpcLoader::new(store, catalog, config, Arc::new(NpcRegistry::new()));

    match cli.command {
        Commands::InitSchema => {}
        Commands::Load | Commands::ReloadAll => {
            let report = loader.reload_all();
            print_report(&report);
            println!("{} NPC template(s) in registry", loader.registry().len());
        }
        Commands::Show { npc } => {
            loader.reload_all();
            let template = find(&loader, &npc)?;
            print_template(&template);
        }
        Commands::Dump { id } => {
            loader.reload_all();
            let template = find(&loader, &id.to_string())?;
            println!("{}", serde_json::to_string_pretty(&*template)?);
        }
        Commands::Reload { id } => {
            loader.reload_all();
            let report = loader.reload_one(id);
            print_report(&report);
            let template = find(&loader, &id.to_string())?;
            print_template(&template);
        }
        Commands::Save { id, values } => {
            let attributes = parse_assignments(&values)?;
            let outcome = loader.save_template(id, &attributes)?;
            println!(
                "Saved NPC {} to {} tables ({} row(s))",
                id,
                outcome.source.name(),
                outcome.rows
            );
        }
    }

    Ok(())
}

fn load_catalog(config: &Config) -> Result<StaticCatalog> {
    match &config.catalog {
        Some(path) if path.exists() => StaticCatalog::load(path)
            .with_context(|| format!("loading catalog {}", path.display())),
        Some(path) => {
            log::warn!("Catalog {} not found, skills, items and classes will not resolve", path.display());
            Ok(StaticCatalog::default())
        }
        None => {
            log::warn!("No catalog configured, skills, items and classes will not resolve");
            Ok(StaticCatalog::default())
        }
    }
}

/// Look a template up by id, then by name
fn find(loader: &Loader, key: &str) -> Result<Arc<NpcTemplate>> {
    let registry = loader.registry();
    let found = match key.parse::<u32>() {
        Ok(id) => registry.get(id),
        Err(_) => registry.get_by_name(key),
    };
    found.ok_or_else(|| anyhow!("no NPC template {:?}", key))
}

/// Parse `column=value` pairs using the npc and AI table column types
fn parse_assignments(values: &[String]) -> Result<AttributeSet> {
    let mut attributes = AttributeSet::new();
    for pair in values {
        let Some((name, raw)) = pair.split_once('=') else {
            bail!("expected column=value, got {:?}", pair);
        };
        let column = schema::NPC
            .column(name)
            .or_else(|| schema::NPC_AI.column(name))
            .ok_or_else(|| anyhow!("unknown column {:?}", name))?;
        let value = AttrValue::parse(column.kind, raw)
            .ok_or_else(|| anyhow!("{:?} is not a valid {:?} for {}", raw, column.kind, name))?;
        attributes.set(name, value);
    }
    Ok(attributes)
}

fn print_report(report: &LoadReport) {
    println!(
        "templates: {} base, {} custom, {} rejected",
        report.npcs.base.loaded,
        report.npcs.custom.loaded,
        report.npcs.rejected()
    );
    println!(
        "orphan rows: {}  unresolved references: {}  failed passes: {}",
        report.orphans(),
        report.unresolved(),
        report.failed_passes()
    );
}

fn print_template(t: &NpcTemplate) {
    println!("{} [{}] (display {})", t.name, t.id, t.display_id);
    if !t.title.is_empty() {
        println!("  title:    {}", t.title);
    }
    println!("  type:     {}  level {}", t.kind, t.level);
    if let Some(race) = t.race {
        println!("  race:     {}", race);
    }
    println!(
        "  stats:    STR {} CON {} DEX {} INT {} WIT {} MEN {}",
        t.stats.strength,
        t.stats.constitution,
        t.stats.dexterity,
        t.stats.intelligence,
        t.stats.wit,
        t.stats.mental
    );
    println!(
        "  combat:   HP {} MP {} (regen {:.2}/{:.2})  P.Atk {} P.Def {} M.Atk {} M.Def {}",
        t.combat.hp_max,
        t.combat.mp_max,
        t.combat.hp_reg,
        t.combat.mp_reg,
        t.combat.p_atk,
        t.combat.p_def,
        t.combat.m_atk,
        t.combat.m_def
    );
    println!("  skills:   {}", t.skills.len());
    println!("  drops:    {} in {} categories", t.drop_count(), t.drop_categories.len());
    println!("  minions:  {}", t.minions.len());
    println!("  teaches:  {}", t.teaches.len());
    if let Some(attack) = t.elementals.attack {
        println!("  element:  {:?} {}", attack.kind, attack.value);
    }
    println!("  ai:       {}", if t.ai.is_some() { "yes" } else { "no" });
}
