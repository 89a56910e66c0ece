// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result, anyhow};
use config::Config;
use consultas_app::Console;
use consultas_client::Client;
use logging::LogTarget;
use runtime::HttpRuntime;
use std::env;
use std::path::PathBuf;
use tracing::info;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `consultas --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;
    logging::init(&config, &LogTarget::for_mode(&config, !options.check_only))?;

    let base_url = config.base_url(options.base_url.as_deref());
    let timeout = config.timeout()?;
    let client = Client::new(&base_url, timeout).with_context(|| {
        format!(
            "invalid [server] config in {}; fix base_url/timeout values",
            options.config_path.display()
        )
    })?;

    if options.check_only {
        client.ping()?;
        info!(base_url = client.base_url(), "query server is healthy");
        println!("ok: {} is reachable", client.base_url());
        return Ok(());
    }

    info!(
        base_url = client.base_url(),
        timeout_ms = timeout.map(|timeout| timeout.as_millis() as u64),
        "starting console"
    );
    let mut console = Console::default();
    let mut runtime = HttpRuntime::new(client);
    consultas_tui::run_app(&mut console, &mut runtime)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    base_url: Option<String>,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        base_url: None,
        print_config_path: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--base-url" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--base-url requires a URL such as http://localhost:8000"))?;
                options.base_url = Some(value.as_ref().to_owned());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("consultas: parameterized query console");
    println!("  --config <path>          Use a specific config path");
    println!("  --base-url <url>         Query server base URL (overrides config and {})", config::BASE_URL_ENV);
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --check                  Validate config and ping the query server");
    println!("  --help                   Show this help");
}
