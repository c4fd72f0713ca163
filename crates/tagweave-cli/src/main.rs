mod script;

use anyhow::{Context, Result, bail};
use std::{env, path::PathBuf, process};
use tagweave_config::Config;
use tagweave_engine::Session;

use crate::script::{Script, render_counts, render_highlights, replay};

struct Args {
    document: PathBuf,
    script: PathBuf,
    config: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut positional = Vec::new();
    let mut config = None;
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let Some(path) = iter.next() else {
                bail!("--config needs a path");
            };
            config = Some(PathBuf::from(path));
        } else {
            positional.push(PathBuf::from(arg));
        }
    }
    let [document, script] = <[PathBuf; 2]>::try_from(positional)
        .map_err(|_| anyhow::anyhow!("expected a document and a script"))?;
    Ok(Args {
        document,
        script,
        config,
    })
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let loaded = match path {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    Ok(loaded.unwrap_or_else(|| {
        log::info!("no config file found, using default tags");
        Config::new(".")
    }))
}

/// Relative document paths that do not exist as given are looked up under
/// the configured documents folder.
fn resolve_document(config: &Config, document: PathBuf) -> PathBuf {
    if document.is_relative() && !document.exists() {
        let candidate = config.documents_path.join(&document);
        if candidate.exists() {
            return candidate;
        }
    }
    document
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().collect();
    let parsed = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Usage: {} <document.txt> <script.toml> [--config <path>]", args[0]);
            process::exit(1);
        }
    };

    let config = load_config(parsed.config.as_ref())?;
    let document = resolve_document(&config, parsed.document);

    let mut session = Session::new(config.registry())
        .with_highlight_color(config.default_highlight_color.clone());
    match std::fs::read_to_string(&document) {
        Ok(text) => session.load(&text),
        Err(e) => {
            session.fail(e.to_string());
            eprintln!("Error: could not read document '{}': {e}", document.display());
            process::exit(1);
        }
    }

    let script_text = std::fs::read_to_string(&parsed.script)
        .with_context(|| format!("could not read script '{}'", parsed.script.display()))?;
    let script = Script::parse(&script_text)?;

    println!("Steps:");
    for line in replay(&mut session, &script) {
        println!("{line}");
    }
    println!();
    println!("Highlights:");
    print!("{}", render_highlights(&session));
    println!();
    println!("Tag counts:");
    print!("{}", render_counts(&session));

    Ok(())
}
