//! `tfmgr config` command - Configuration management
//!
//! Provides commands to view and modify the tfmgr configuration file.

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::GlobalOpts;
use crate::core::{Config, Provider};

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration values
    Show(ShowArgs),

    /// Set a configuration value
    Set(SetArgs),

    /// Unset (remove) a configuration value
    Unset(UnsetArgs),

    /// Show the path of the configuration file
    Path,

    /// List all available configuration keys
    Keys,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show only this key's value
    pub key: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Configuration key (e.g., osf_project, gh_user)
    pub key: String,

    /// Value to set
    pub value: String,
}

#[derive(clap::Args, Debug)]
pub struct UnsetArgs {
    /// Configuration key to remove
    pub key: String,
}

/// Valid configuration keys
const VALID_KEYS: &[(&str, &str)] = &[
    ("osf_project", "OSF project receiving template files (OSF_PROJECT)"),
    ("osf_user", "OSF user name (OSF_USERNAME)"),
    ("gh_user", "GitHub user owning the Archive fork (GITHUB_USER)"),
    ("provider", "CLI opening pull requests: hub or gh"),
    ("upstream", "Upstream Archive repository (owner/name)"),
    ("intake_branch", "Upstream branch receiving intake pull requests"),
    ("nprocs", "Number of concurrent OSF transfers"),
];

/// Run a config subcommand
pub fn run(cmd: ConfigCommands, _global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => run_show(args),
        ConfigCommands::Set(args) => run_set(args),
        ConfigCommands::Unset(args) => run_unset(args),
        ConfigCommands::Path => run_path(),
        ConfigCommands::Keys => run_keys(),
    }
}

fn run_show(args: ShowArgs) -> Result<()> {
    let config = Config::load();

    if let Some(key) = &args.key {
        check_key(key)?;
        return match config.get(key) {
            Some(v) => {
                println!("{}", v);
                Ok(())
            }
            None => Err(miette::miette!("Key '{}' is not set", key)),
        };
    }

    println!("{}", style("Effective Configuration").bold().underlined());
    println!();

    for (key, _) in VALID_KEYS {
        match config.get(key) {
            Some(v) => println!("  {}: {}", style(key).cyan(), style(v).yellow()),
            None => println!("  {}: {}", style(key).cyan(), style("(not set)").dim()),
        }
    }

    println!();
    println!("{}", style("Config Sources (in priority order):").dim());
    println!("  1. Command-line flags");
    println!("  2. Environment variables (OSF_PROJECT, OSF_USERNAME, GITHUB_USER, ...)");
    println!("  3. Config file (see 'tfmgr config path')");

    Ok(())
}

fn run_set(args: SetArgs) -> Result<()> {
    check_key(&args.key)?;
    let value = typed_value(&args.key, &args.value)?;
    set_value(&config_path()?, &args.key, value)?;

    println!(
        "{} Set {} {} {}",
        style("✓").green(),
        style(&args.key).cyan(),
        style("→").dim(),
        style(&args.value).yellow(),
    );

    Ok(())
}

fn run_unset(args: UnsetArgs) -> Result<()> {
    let config_path = config_path()?;

    if !config_path.exists() {
        return Err(miette::miette!(
            "Config file does not exist: {}",
            config_path.display()
        ));
    }

    let mut config_map = read_mapping(&config_path)?;
    let removed = match &mut config_map {
        serde_yml::Value::Mapping(map) => map
            .remove(serde_yml::Value::String(args.key.clone()))
            .is_some(),
        _ => false,
    };

    if !removed {
        return Err(miette::miette!("Key '{}' not found in config", args.key));
    }

    let yaml = serde_yml::to_string(&config_map).into_diagnostic()?;
    fs::write(&config_path, yaml).into_diagnostic()?;

    println!(
        "{} Removed {} from config",
        style("✓").green(),
        style(&args.key).cyan(),
    );

    Ok(())
}

fn run_path() -> Result<()> {
    let path = config_path()?;
    println!("{}", path.display());
    if !path.exists() {
        eprintln!("{}", style("(not created)").dim());
    }
    Ok(())
}

fn run_keys() -> Result<()> {
    println!("{}", style("Available configuration keys:").bold());
    println!();

    for (key, description) in VALID_KEYS {
        println!("  {:<16} {}", style(key).cyan(), style(description).dim());
    }

    println!();
    println!(
        "{}",
        style("Use 'tfmgr config set <key> <value>' to set a value.").dim()
    );

    Ok(())
}

// Helper functions

fn config_path() -> Result<PathBuf> {
    Config::config_path()
        .ok_or_else(|| miette::miette!("Could not determine the config directory"))
}

fn check_key(key: &str) -> Result<()> {
    if VALID_KEYS.iter().any(|(k, _)| *k == key) {
        Ok(())
    } else {
        Err(miette::miette!(
            help = "Run 'tfmgr config keys' to list the available keys",
            "Unknown configuration key '{}'",
            key
        ))
    }
}

/// Write one key into the config file, keeping every other key
fn set_value(path: &Path, key: &str, value: serde_yml::Value) -> Result<()> {
    let mut config_map = read_mapping(path)?;
    if let serde_yml::Value::Mapping(map) = &mut config_map {
        map.insert(serde_yml::Value::String(key.to_string()), value);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).into_diagnostic()?;
    }

    let yaml = serde_yml::to_string(&config_map).into_diagnostic()?;
    fs::write(path, yaml).into_diagnostic()
}

/// Existing config file as a YAML mapping (empty if missing or null).
///
/// A file that does not parse to a mapping is an error, so it is never
/// rewritten.
fn read_mapping(path: &Path) -> Result<serde_yml::Value> {
    if !path.exists() {
        return Ok(serde_yml::Value::Mapping(Default::default()));
    }

    let content = fs::read_to_string(path).into_diagnostic()?;
    if content.trim().is_empty() {
        return Ok(serde_yml::Value::Mapping(Default::default()));
    }
    let parsed: serde_yml::Value = serde_yml::from_str(&content).map_err(|e| {
        miette::miette!(
            help = "Fix or remove the file, then try again",
            "Cannot parse config file {}: {}",
            path.display(),
            e
        )
    })?;

    match parsed {
        serde_yml::Value::Null => Ok(serde_yml::Value::Mapping(Default::default())),
        serde_yml::Value::Mapping(_) => Ok(parsed),
        _ => Err(miette::miette!(
            help = "The config file must hold 'key: value' pairs",
            "Config file {} is not a mapping",
            path.display()
        )),
    }
}

/// Convert a raw value to the YAML type the key deserializes from
fn typed_value(key: &str, value: &str) -> Result<serde_yml::Value> {
    match key {
        "nprocs" => {
            let n = crate::cli::helpers::parse_nprocs(value).map_err(|e| miette::miette!(e))?;
            Ok(serde_yml::Value::Number((n as u64).into()))
        }
        "provider" => {
            let provider = <Provider as clap::ValueEnum>::from_str(value, true)
                .map_err(|_| miette::miette!("Unknown provider '{}' (expected hub or gh)", value))?;
            Ok(serde_yml::Value::String(provider.to_string()))
        }
        _ => Ok(serde_yml::Value::String(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_key() {
        assert!(check_key("osf_project").is_ok());
        assert!(check_key("author").is_err());
    }

    #[test]
    fn test_typed_value() {
        assert_eq!(
            typed_value("nprocs", "8").unwrap(),
            serde_yml::Value::Number(8u64.into())
        );
        assert!(typed_value("nprocs", "0").is_err());
        assert_eq!(
            typed_value("provider", "GH").unwrap(),
            serde_yml::Value::String("gh".into())
        );
        assert!(typed_value("provider", "gitlab").is_err());
        assert_eq!(
            typed_value("gh_user", "octocat").unwrap(),
            serde_yml::Value::String("octocat".into())
        );
    }

    #[test]
    fn test_set_values_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut map = read_mapping(&path).unwrap();
        if let serde_yml::Value::Mapping(m) = &mut map {
            m.insert("nprocs".into(), typed_value("nprocs", "3").unwrap());
            m.insert("provider".into(), typed_value("provider", "gh").unwrap());
        }
        fs::write(&path, serde_yml::to_string(&map).unwrap()).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.nprocs, Some(3));
        assert_eq!(config.provider, Some(Provider::Gh));
    }

    #[test]
    fn test_set_value_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "osf_project: ue5gx\ngh_user: octocat\n").unwrap();

        set_value(&path, "osf_user", "me".into()).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.osf_project.as_deref(), Some("ue5gx"));
        assert_eq!(config.gh_user.as_deref(), Some("octocat"));
        assert_eq!(config.osf_user.as_deref(), Some("me"));
    }

    #[test]
    fn test_set_value_leaves_malformed_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let original = "osf_project: ue5gx\ngh_user: octocat\nnprocs: [oops";
        fs::write(&path, original).unwrap();

        let err = set_value(&path, "osf_user", "me".into()).unwrap_err();
        assert!(err.to_string().contains("Cannot parse config file"));
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_read_mapping_rejects_non_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        fs::write(&path, "- osf_project\n- gh_user\n").unwrap();
        assert!(read_mapping(&path).is_err());

        fs::write(&path, "").unwrap();
        assert!(read_mapping(&path).unwrap().is_mapping());
    }
}
