use super::render;
use super::setup::{Cli, Commands};
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use pdmvault::api::Vault;
use pdmvault::config::VaultConfig;
use pdmvault::error::VaultError;
use pdmvault::model::ListFilter;
use pdmvault::store::local::LocalFs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const VAULT_CONFIG_FILE: &str = ".pdmvault.toml";

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli)?;
    let root = config
        .root
        .clone()
        .ok_or_else(|| anyhow!("no vault given; use --vault or set PDMVAULT_ROOT"))?;
    let fs = LocalFs::new(&root);

    let vault = match cli.command {
        Commands::Init => {
            std::fs::create_dir_all(&root)
                .with_context(|| format!("cannot create {}", root.display()))?;
            Vault::init(fs, &config)?
        }
        _ => Vault::open(fs, &config)
            .with_context(|| format!("{} is not a vault", root.display()))?,
    };
    dispatch(&vault, &root, cli.command)
}

/// `RUST_LOG` wins; otherwise warnings only, or debug with `--verbose`.
fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = match (verbose, EnvFilter::try_from_default_env()) {
        (false, Ok(filter)) => filter,
        _ => EnvFilter::new(fallback),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn user_config_file() -> Option<PathBuf> {
    ProjectDirs::from("", "", "pdmvault").map(|dirs| dirs.config_dir().join("pdmvault.toml"))
}

/// Resolves the vault root first, then loads every config file that applies to it.
fn load_config(cli: &Cli) -> Result<VaultConfig> {
    let outer: Vec<PathBuf> = cli
        .config
        .iter()
        .cloned()
        .chain(user_config_file())
        .collect();

    let root = match &cli.vault {
        Some(root) => Some(root.clone()),
        None => VaultConfig::load(&outer)?.root,
    };

    let mut files: Vec<PathBuf> = cli.config.iter().cloned().collect();
    if let Some(root) = &root {
        files.push(root.join(VAULT_CONFIG_FILE));
    }
    files.extend(user_config_file());
    debug!(?files, "loading configuration");

    let mut config = VaultConfig::load(&files)?;
    if root.is_some() {
        config.root = root;
    }
    if let Some(user) = &cli.user {
        config.user = Some(user.clone());
    }
    if config.user.is_none() {
        config.user = std::env::var("USER").ok().filter(|u| !u.is_empty());
    }
    Ok(config)
}

/// Accepts an item number or a current item name. A catalogued number wins over
/// an item whose name is the same digits.
fn item_number(vault: &Vault<LocalFs>, item: &str) -> Result<u64> {
    if let Ok(number) = item.parse::<u64>() {
        match vault.item(number) {
            Ok(_) => return Ok(number),
            Err(VaultError::ItemNotFound(_)) => {
                return vault
                    .resolve(item)?
                    .ok_or_else(|| VaultError::ItemNotFound(number).into());
            }
            Err(e) => return Err(e.into()),
        }
    }
    vault
        .resolve(item)?
        .ok_or_else(|| VaultError::NameNotFound(item.to_string()).into())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn dispatch(vault: &Vault<LocalFs>, root: &Path, command: Commands) -> Result<()> {
    match command {
        Commands::Init => println!("Initialized vault in {}", root.display()),
        Commands::Import {
            file,
            dir,
            message,
            details,
        } => {
            let number = vault
                .import_into(&file, &dir, &message, &details)
                .with_context(|| format!("cannot import {}", file.display()))?;
            println!("Imported {} as item {}", display_name(&file), number);
        }
        Commands::Checkout { item } => {
            let number = item_number(vault, &item)?;
            vault.checkout(number)?;
            println!("Checked out item {}", number);
        }
        Commands::Checkin {
            item,
            file,
            message,
            details,
        } => {
            let number = item_number(vault, &item)?;
            match file {
                Some(file) => {
                    let sequence = vault.commit(number, &file, &message, &details)?;
                    println!("Stored version {} of item {} and checked it in", sequence, number);
                }
                None if vault.checkin(number)? => println!("Checked in item {}", number),
                None => println!("Item {} was not checked out", number),
            }
        }
        Commands::Status { item } => {
            let number = item_number(vault, &item)?;
            println!("{}", render::lock_status(number, &vault.status(number)?));
        }
        Commands::Unlock { item } => {
            let number = item_number(vault, &item)?;
            match vault.force_checkin(number)? {
                Some(holder) => println!("Released item {} (was held by {})", number, holder),
                None => println!("Item {} was not checked out", number),
            }
        }
        Commands::Rename { old, new } => {
            let item = vault.rename(&old, &new)?;
            println!("Item {} is now {}", item.number, item.current_name);
        }
        Commands::Resolve { name } => match vault.resolve(&name)? {
            Some(number) => println!("{}", number),
            None => bail!(VaultError::NameNotFound(name)),
        },
        Commands::List {
            dir,
            documents_only,
            show_superseded,
            json,
        } => {
            let defaults = vault.default_filter();
            let filter = ListFilter {
                documents_only: documents_only || defaults.documents_only,
                hide_superseded: defaults.hide_superseded && !show_superseded,
            };
            let listing = vault.list_with(&dir, filter)?;
            if json {
                print_json(&listing)?;
            } else {
                print!("{}", render::listing(&listing));
            }
        }
        Commands::Purge { dir, yes } => {
            if yes {
                let removed = vault.purge(&dir)?;
                println!("Purged {} superseded file(s)", removed);
            } else {
                let candidates = vault.list_with(&dir, ListFilter::default())?.purge_candidates;
                print!("{}", render::purge_preview(&candidates));
            }
        }
        Commands::History { item, json } => {
            let number = item_number(vault, &item)?;
            let history = vault.history(number)?;
            if json {
                print_json(&history)?;
            } else {
                print!("{}", render::history(&history));
            }
        }
        Commands::Inspect { item, json } => {
            let number = item_number(vault, &item)?;
            let props = vault.inspect(number)?;
            if json {
                print_json(&props)?;
            } else {
                print!("{}", render::properties(&props));
            }
        }
        Commands::Export { item, out, version } => {
            let number = item_number(vault, &item)?;
            let path = vault.export(number, version, &out)?;
            println!("Exported to {}", path.display());
        }
        Commands::Move { item, dir } => {
            let number = item_number(vault, &item)?;
            let dest = vault.move_item(number, &dir)?;
            println!("Moved item {} to /{}", number, dest);
        }
        Commands::Remove { name } => {
            let number = vault.remove(&name)?;
            println!("Removed item {} ({})", number, name);
        }
        Commands::Mkdir { dir } => {
            let created = vault.mkdir(&dir)?;
            println!("Created /{}", created);
        }
        Commands::Doctor => {
            print!("{}", render::doctor(&vault.doctor()?));
        }
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
