//! `streamfetch config` - inspect and edit `config.ini`.
//!
//! Keys are addressed as `section.key`, e.g. `download.concurrency` or
//! `output.muxer`. Values are validated before the file is rewritten.

use clap::Subcommand;
use streamfetch::config::{config_file_path, ConfigFile, ConfigKey};

use crate::error::CliError;

/// Placeholder printed for keys without a value.
const UNSET: &str = "(not set)";

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print one value
    Get {
        /// Key as section.key, e.g. download.concurrency
        key: String,
    },

    /// Validate and store one value
    Set {
        /// Key as section.key, e.g. output.keep_segments
        key: String,

        /// New value
        value: String,
    },

    /// Print every key grouped by section
    List,

    /// Print where config.ini is read from
    Path,
}

pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => {
            let key = lookup(&key)?;
            println!("{}", display_value(key.get(&ConfigFile::load()?)));
        }
        ConfigCommands::Set { key, value } => {
            let key = lookup(&key)?;
            let mut file = ConfigFile::load()?;
            key.set(&mut file, &value)?;
            file.save()?;
            println!("{} = {}", key.name(), key.get(&file));
        }
        ConfigCommands::List => list(&ConfigFile::load()?),
        ConfigCommands::Path => println!("{}", config_file_path().display()),
    }
    Ok(())
}

fn lookup(name: &str) -> Result<ConfigKey, CliError> {
    name.parse().map_err(|_| {
        let known: Vec<String> = ConfigKey::all().iter().map(ConfigKey::name).collect();
        CliError::Config(format!(
            "No configuration key named '{}'. Known keys: {}",
            name,
            known.join(", ")
        ))
    })
}

fn display_value(value: String) -> String {
    if value.is_empty() {
        UNSET.to_string()
    } else {
        value
    }
}

/// Print keys as INI-style sections, in declaration order.
fn list(file: &ConfigFile) {
    let keys = ConfigKey::all();
    let width = keys.iter().map(|k| k.key_name().len()).max().unwrap_or(0);

    for (i, key) in keys.iter().enumerate() {
        let new_section = i == 0 || keys[i - 1].section() != key.section();
        if new_section {
            if i > 0 {
                println!();
            }
            println!("[{}]", key.section());
        }
        println!(
            "{:<width$} = {}",
            key.key_name(),
            display_value(key.get(file)),
            width = width
        );
    }
}
