//! where-next: 目的地建议服务的命令行入口
//!
//! Usage:
//!   where-next serve [--bind <addr>]        Run the HTTP service
//!   where-next suggest '<json>'             Answer one request and print the response
//!   where-next seeds validate <path>        Check a seed file without starting the service

use anyhow::{bail, Context};
use std::io::Read;
use where_next::cache::CacheKeyBuilder;
use where_next::suggestions::SeedTable;
use where_next::{ServiceConfig, SuggestionService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    match args[1].as_str() {
        "serve" => cmd_serve(&args[2..]).await,
        "suggest" => cmd_suggest(&args[2..]).await,
        "seeds" => cmd_seeds(&args[2..]),
        "version" | "--version" | "-V" => {
            cmd_version();
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!(
        r#"where-next: destination suggestion service

USAGE:
    where-next <COMMAND> [OPTIONS]

COMMANDS:
    serve [--bind <addr>]       Run the HTTP service
    suggest <json|->            Answer one request body (use - for stdin)
    seeds validate <path>       Validate a seed file
    version                     Show version information
    help                        Show this help message

ENVIRONMENT:
    WHERE_NEXT_BIND             Listen address (default 127.0.0.1:3000)
    WHERE_NEXT_CACHE_CAPACITY   Maximum cached requests (default 500)
    WHERE_NEXT_CACHE_TTL_SECS   Cache entry lifetime (default 3600)
    WHERE_NEXT_AI_ENABLED       Set to false to skip AI generation
    WHERE_NEXT_COALESCE         Share one generation between identical concurrent misses
    WHERE_NEXT_SEEDS            Seed file replacing the built-in table
    WHERE_NEXT_CONFIG           YAML file overriding the variables above
    OPENAI_API_KEY              API key (keyring entry where-next/openai wins)
    OPENAI_BASE_URL, OPENAI_MODEL, AI_PROXY_URL
    WHERE_NEXT_HTTP_POOL_MAX_IDLE_PER_HOST  Idle AI connections kept per host (default 8)
    RUST_LOG                    Log filter (default info)"#
    );
}

fn cmd_version() {
    println!("where-next {}", env!("CARGO_PKG_VERSION"));
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

async fn cmd_serve(args: &[String]) -> anyhow::Result<()> {
    where_next::telemetry::init_tracing();
    let mut config = ServiceConfig::from_env_or_yaml().context("loading configuration")?;
    if let Some(bind) = flag_value(args, "--bind") {
        config.bind_addr = bind
            .parse()
            .with_context(|| format!("invalid --bind address: {bind}"))?;
    }
    where_next::server::serve(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
    .context("serving")?;
    Ok(())
}

async fn cmd_suggest(args: &[String]) -> anyhow::Result<()> {
    let Some(input) = args.first() else {
        bail!("usage: where-next suggest <json|->");
    };
    let body = if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading request from stdin")?;
        buf
    } else {
        input.clone()
    };

    let config = ServiceConfig::from_env_or_yaml().context("loading configuration")?;
    let service = SuggestionService::from_config(&config).context("building service")?;
    let response = service.handle_bytes(body.as_bytes()).await;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn cmd_seeds(args: &[String]) -> anyhow::Result<()> {
    match (args.first().map(String::as_str), args.get(1)) {
        (Some("validate"), Some(path)) => {
            let table = SeedTable::from_path(path, &CacheKeyBuilder::new())
                .with_context(|| format!("validating {path}"))?;
            println!("✅ {path}: {} seed entries", table.len());
            Ok(())
        }
        _ => bail!("usage: where-next seeds validate <path>"),
    }
}
