//! netsieve CLI
//!
//! Loads filter lists from a JSON config and matches requests, pages and
//! hostnames against them.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};

use ns_core::MethodMask;
use ns_engine::{CosmeticOption, DnsEngine, Engine, EngineConfig, RequestType, RuleStorage};

#[derive(Parser)]
#[command(name = "ns-cli")]
#[command(about = "netsieve filter list matching tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match a network request
    Match {
        /// Engine config (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Request URL
        #[arg(short, long)]
        url: String,

        /// URL of the page that made the request
        #[arg(short, long)]
        source: Option<String>,

        /// Request type (script, image, sub_frame, ...)
        #[arg(short = 't', long = "type", default_value = "other")]
        request_type: String,

        /// HTTP method
        #[arg(short, long)]
        method: Option<String>,
    },

    /// List cosmetic rules for a page
    Cosmetic {
        /// Engine config (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Page URL
        #[arg(short, long)]
        url: String,

        /// Rule groups: all, css, generic-css, specific-css, js, html
        #[arg(short, long, default_value = "all")]
        option: String,
    },

    /// Match a hostname the way a DNS resolver would
    Dns {
        /// Engine config (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Hostname to look up
        #[arg(long)]
        hostname: String,
    },

    /// Build an engine and print rule counts
    Count {
        /// Engine config (JSON)
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Match {
            config,
            url,
            source,
            request_type,
            method,
        } => cmd_match(&config, &url, source.as_deref(), &request_type, method.as_deref()),
        Commands::Cosmetic {
            config,
            url,
            option,
        } => cmd_cosmetic(&config, &url, &option),
        Commands::Dns { config, hostname } => cmd_dns(&config, &hostname),
        Commands::Count { config } => cmd_count(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn load_config(path: &Path) -> Result<EngineConfig, String> {
    EngineConfig::from_file(path).map_err(|e| format!("Failed to load config '{}': {}", path.display(), e))
}

fn load_engine(path: &Path) -> Result<Engine, String> {
    let config = load_config(path)?;
    let start = Instant::now();
    let engine = Engine::from_config(&config).map_err(|e| e.to_string())?;
    log::info!(
        "Engine ready with {} rules in {:.1}ms",
        engine.rules_count(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(engine)
}

fn cmd_match(
    config: &Path,
    url: &str,
    source: Option<&str>,
    request_type: &str,
    method: Option<&str>,
) -> Result<(), String> {
    let mut engine = load_engine(config)?;

    let mut request = engine.request(url, source, RequestType::from_browser_type(request_type));
    if let Some(method) = method {
        let mask = MethodMask::from_method_name(method).ok_or_else(|| format!("Unknown HTTP method '{method}'"))?;
        request = request.with_method(mask);
    }

    let frame_rule = match source {
        Some(source) => engine.match_frame(source),
        None => None,
    };
    let result = engine.match_request(&request, frame_rule.as_ref());

    println!("Request: {url}");
    println!("  Blocked:     {}", result.is_blocked());
    match result.basic_rule() {
        Some(rule) => println!("  Rule:        {} (list {})", rule.text(), rule.list_id()),
        None => println!("  Rule:        none"),
    }
    if let Some(rule) = result.document_allowlist_rule() {
        println!("  Document:    {}", rule.text());
    }
    if result.rules().len() > 1 {
        println!("  Matched:");
        for rule in result.rules() {
            println!("    {}", rule.text());
        }
    }

    Ok(())
}

fn cmd_cosmetic(config: &Path, url: &str, option: &str) -> Result<(), String> {
    let option = CosmeticOption::from_option_name(option).ok_or_else(|| format!("Unknown cosmetic option '{option}'"))?;
    let mut engine = load_engine(config)?;

    let request = engine.request(url, None, RequestType::DOCUMENT);
    let frame_rule = engine.match_frame(url);
    let enabled = engine.match_request(&request, frame_rule.as_ref()).cosmetic_option();
    let result = engine.get_cosmetic_result(&request, option & enabled);

    println!("Page: {url}");
    println!("  Element hiding: {} generic, {} specific", result.element_hiding.generic.len(), result.element_hiding.specific.len());
    println!("  CSS:            {} generic, {} specific", result.css.generic.len(), result.css.specific.len());
    println!("  JS:             {} generic, {} specific", result.js.generic.len(), result.js.specific.len());
    println!("  HTML:           {} generic, {} specific", result.html.generic.len(), result.html.specific.len());

    let stylesheet = result.stylesheet();
    if !stylesheet.is_empty() {
        println!();
        println!("{stylesheet}");
    }
    for rule in result.extended_rules() {
        println!("extended: {rule}");
    }
    for call in result.scriptlets() {
        println!("scriptlet: {}", call.canonical());
    }
    for script in result.scripts() {
        println!("script: {script}");
    }
    for rule in result.html.iter() {
        println!("html: {}", rule.content());
    }

    Ok(())
}

fn cmd_dns(config: &Path, hostname: &str) -> Result<(), String> {
    let config = load_config(config)?;
    let storage = RuleStorage::new(config.load_lists().map_err(|e| e.to_string())?).map_err(|e| e.to_string())?;
    let psl = config.load_public_suffixes().map_err(|e| e.to_string())?;
    let mut engine = DnsEngine::with_public_suffixes(storage, &config.options, psl);

    let result = engine.match_hostname(hostname);
    println!("Hostname: {hostname}");
    println!("  Blocked:     {}", result.is_blocked());
    if let Some(rule) = &result.basic_rule {
        println!("  Rule:        {}", rule.text());
    }
    for rule in &result.host_rules {
        match rule.ip() {
            Some(ip) => println!("  Host rule:   {} -> {}", rule.text(), ip),
            None => println!("  Host rule:   {}", rule.text()),
        }
    }

    Ok(())
}

fn cmd_count(config: &Path) -> Result<(), String> {
    let engine = load_engine(config)?;

    println!("Config: {}", config.display());
    for list in engine.storage().lists() {
        println!("  List {:>3}:    {} bytes", list.id(), list.text().len());
    }
    println!("  Network:     {}", engine.network_rules_count());
    println!("  Cosmetic:    {}", engine.cosmetic_rules_count());
    println!("  Total:       {}", engine.rules_count());

    Ok(())
}
