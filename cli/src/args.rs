use crate::{
    commands::{
        config::ConfigArgs, dictionary::DictionaryArgs, get::GetArgs, inventory::InventoryArgs,
    },
    printer::OutputFormat,
};
use anyhow::{anyhow, Error, Result};
use reqwest::Url;
use std::{path::PathBuf, str::FromStr};
use structopt::StructOpt;

/// bp builds data dictionaries and catalog inventories for CKAN open data
/// portals.
#[derive(Debug, StructOpt)]
#[structopt(
    global_settings = &[
        structopt::clap::AppSettings::ColoredHelp,
        structopt::clap::AppSettings::InferSubcommands,
    ]
)]
pub struct Args {
    #[structopt(long = "config-file", parse(from_os_str))]
    /// Path to the configuration file. Typically defaults to
    /// ~/.config/bia-pine/config.json on Linux.
    pub config: Option<PathBuf>,

    #[structopt(short = "v", long = "verbose")]
    /// Enable more verbose logging.
    pub verbose: bool,

    #[structopt(long = "endpoint", parse(try_from_str))]
    /// Portal to use. Overrides the one from the configuration file.
    pub endpoint: Option<Url>,

    #[structopt(short = "k", long = "accept-invalid-certificates", parse(try_from_str))]
    /// Whether to accept invalid TLS certificates from the portal.
    pub accept_invalid_certificates: Option<bool>,

    #[structopt(long = "proxy")]
    /// URL of an HTTP proxy used for every request.
    pub proxy: Option<Url>,

    #[structopt(short = "o", long = "output", default_value = "table")]
    /// Output format. One of: json, table
    pub output: OutputFormat,

    #[structopt(subcommand)]
    pub command: Command,
}

#[derive(Debug, StructOpt)]
pub enum Command {
    #[structopt(name = "completion")]
    /// Output shell completion code for the specified shell (bash or zsh)
    Completion { shell: Shell },

    #[structopt(name = "config")]
    /// Show or change the settings stored in the configuration file
    Config {
        #[structopt(subcommand)]
        config_args: ConfigArgs,
    },

    #[structopt(name = "dictionary")]
    /// Write the Word data dictionary of a datastore resource
    Dictionary {
        #[structopt(flatten)]
        dictionary_args: DictionaryArgs,
    },

    #[structopt(name = "inventory")]
    /// Push the inventory of every dataset resource to the spreadsheet
    Inventory {
        #[structopt(flatten)]
        inventory_args: InventoryArgs,
    },

    #[structopt(name = "get")]
    /// Display datasets and resource columns
    Get {
        #[structopt(subcommand)]
        get_args: GetArgs,
    },
}

#[derive(Debug)]
pub enum Shell {
    Bash,
    Zsh,
}

impl FromStr for Shell {
    type Err = Error;

    fn from_str(string: &str) -> Result<Self> {
        match string {
            "bash" => Ok(Shell::Bash),
            "zsh" => Ok(Shell::Zsh),
            _ => Err(anyhow!("unknown shell: '{}'", string)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dictionary_command() {
        let args = Args::from_iter_safe([
            "bp",
            "--endpoint",
            "https://dados.example.org",
            "dictionary",
            "https://dados.example.org/dataset/a/resource/b",
            "--output-dir",
            "saida",
        ])
        .unwrap();

        assert_eq!(
            args.endpoint.map(|url| url.to_string()),
            Some("https://dados.example.org/".to_owned())
        );
        match args.command {
            Command::Dictionary { dictionary_args } => {
                assert_eq!(
                    dictionary_args.resource_url,
                    "https://dados.example.org/dataset/a/resource/b"
                );
                assert_eq!(dictionary_args.output_dir, Some(PathBuf::from("saida")));
                assert_eq!(dictionary_args.template, None);
            }
            command => panic!("unexpected command {command:?}"),
        }
    }

    #[test]
    fn test_parse_inventory_command() {
        let args = Args::from_iter_safe(["bp", "-o", "json", "inventory", "--check-urls"]).unwrap();
        assert!(matches!(args.output, OutputFormat::Json));
        match args.command {
            Command::Inventory { inventory_args } => {
                assert!(inventory_args.check_urls);
                assert!(inventory_args.portal.is_none());
            }
            command => panic!("unexpected command {command:?}"),
        }
    }

    #[test]
    fn test_reject_unknown_shell() {
        assert!(Args::from_iter_safe(["bp", "completion", "fish"]).is_err());
    }
}
