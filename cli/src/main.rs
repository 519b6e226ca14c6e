#![deny(clippy::all)]
mod args;
mod catalog;
mod commands;
mod config;
mod errors;
mod printer;
mod progress;
mod utils;

use anyhow::{Context, Result};
use ckan_client::{Client, Config as ClientConfig};
use log::{error, warn};
use reqwest::Url;
use std::{fs, io, path::PathBuf, process};
use structopt::{clap::Shell as ClapShell, StructOpt};

use crate::{
    args::{Args, Command, Shell},
    commands::{config as config_command, dictionary, get, inventory},
    config::BiaPineConfig,
    printer::Printer,
    utils::io::init_env_logger,
};

fn run(args: Args) -> Result<()> {
    let config_path = find_configuration(&args)?;
    let cli_config = config::read_bia_pine_config(&config_path)?;
    let printer = Printer::new(args.output);

    match &args.command {
        Command::Config { config_args } => {
            config_command::run(config_args, cli_config, config_path).map(|_| ())
        }
        Command::Completion { shell } => {
            let mut app = Args::clap();
            let clap_shell = match shell {
                Shell::Zsh => ClapShell::Zsh,
                Shell::Bash => ClapShell::Bash,
            };
            app.gen_completions_to("bp", clap_shell, &mut io::stdout());
            Ok(())
        }
        Command::Dictionary { dictionary_args } => {
            let client = client_from_args(&args, &cli_config, dictionary_args.portal())?;
            dictionary::run(dictionary_args, &client, &cli_config)
        }
        Command::Inventory { inventory_args } => inventory::run(
            inventory_args,
            client_config_from_args(&args, &cli_config, None),
            &cli_config,
        ),
        Command::Get { get_args } => get::run(
            get_args,
            client_from_args(&args, &cli_config, get_args.portal())?,
            &printer,
        ),
    }
}

/// Resolve the portal connection settings. The `--endpoint` flag wins over a
/// portal named by the command input, which wins over the config file.
fn client_config_from_args(
    args: &Args,
    config: &BiaPineConfig,
    input_portal: Option<Url>,
) -> ClientConfig {
    let endpoint = args
        .endpoint
        .clone()
        .or(input_portal)
        .unwrap_or_else(|| config.portal.clone());

    let accept_invalid_certificates = args
        .accept_invalid_certificates
        .unwrap_or(config.accept_invalid_certificates);

    if accept_invalid_certificates {
        warn!(concat!(
            "TLS certificate verification is disabled. ",
            "Do NOT use this over an insecure network."
        ));
    }

    ClientConfig {
        endpoint,
        accept_invalid_certificates,
        proxy: args.proxy.clone().or_else(|| config.proxy.clone()),
        ..Default::default()
    }
}

fn client_from_args(
    args: &Args,
    config: &BiaPineConfig,
    input_portal: Option<Url>,
) -> Result<Client> {
    Client::new(client_config_from_args(args, config, input_portal))
        .context("Failed to initialise the HTTP client.")
}

fn find_configuration(args: &Args) -> Result<PathBuf> {
    let config_path = if let Some(config_path) = args.config.clone() {
        if !config_path.exists() {
            warn!(
                "Configuration file `{}` doesn't exist.",
                config_path.display()
            );
        }
        config_path
    } else {
        let mut config_path =
            dirs::config_dir().context("Could not get path to the user's config directory")?;
        config_path.push("bia-pine");
        fs::create_dir_all(&config_path).with_context(|| {
            format!(
                "Could not create config directory {}",
                config_path.display()
            )
        })?;
        config_path.push("config.json");
        config_path
    };
    Ok(config_path)
}

fn main() {
    let args = Args::from_args();
    init_env_logger(args.verbose);

    if let Err(error) = run(args) {
        error!("An error occurred:");
        for cause in error.chain() {
            error!(" |- {cause}");
        }

        #[cfg(feature = "backtrace")]
        {
            error!("{}", error.backtrace());
        }

        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(arguments: &[&str]) -> Args {
        Args::from_iter_safe(arguments).unwrap()
    }

    #[test]
    fn test_endpoint_precedence() {
        let config = BiaPineConfig {
            portal: Url::parse("https://config.example").unwrap(),
            ..Default::default()
        };
        let link_portal = Some(Url::parse("https://link.example").unwrap());

        let from_flag = client_config_from_args(
            &args(&["bp", "--endpoint", "https://flag.example", "get", "datasets"]),
            &config,
            link_portal.clone(),
        );
        assert_eq!(from_flag.endpoint.as_str(), "https://flag.example/");

        let from_link =
            client_config_from_args(&args(&["bp", "get", "datasets"]), &config, link_portal);
        assert_eq!(from_link.endpoint.as_str(), "https://link.example/");

        let from_file = client_config_from_args(&args(&["bp", "get", "datasets"]), &config, None);
        assert_eq!(from_file.endpoint.as_str(), "https://config.example/");
    }

    #[test]
    fn test_insecure_flag_overrides_config() {
        let config = BiaPineConfig {
            accept_invalid_certificates: true,
            ..Default::default()
        };
        let client_config =
            client_config_from_args(&args(&["bp", "-k", "false", "get", "datasets"]), &config, None);
        assert!(!client_config.accept_invalid_certificates);
    }
}
