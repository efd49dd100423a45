//! Configuration loading with layered precedence.
//!
//! Precedence (lowest to highest): application defaults, configuration file,
//! environment variables, command-line arguments.
//!
//! The layers are composed manually with `MergeComposer` rather than through
//! the derived `load()` so that the `Cli` struct keeps ownership of subcommand
//! parsing and so that typed environment values fail fast instead of being
//! silently ignored.
//!
//! # File formats
//!
//! Files ending in `.properties` are read as flat `key=value` pairs whose keys
//! are mapped through [`PROPERTY_SPECS`]. Every other file is parsed as TOML.
//!
//! # Environment Variable Handling
//!
//! String fields (e.g., `APIPROBE_BASE_API_PATH`) are always accepted. Typed
//! fields like `APIPROBE_HTTP_LEGACY_NULL_BEARER` or `APIPROBE_HTTP_TIMEOUT_SECS`
//! must hold valid values or loading fails with `ConfigError::InvalidValue`.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use ortho_config::discovery::ConfigDiscovery;
use ortho_config::serde_json::{self, Map, Value};
use ortho_config::{MergeComposer, toml};
use tracing::{debug, info};

use crate::config::{Cli, HarnessConfig};
use crate::error::{ConfigError, Result};

// ============================================================================
// Key Specification Tables
// ============================================================================

/// The type of value expected from a raw configuration string.
#[derive(Clone, Copy)]
enum ValueType {
    /// String value (always accepted).
    String,
    /// Boolean value (`true`/`false`). Invalid values return an error.
    Bool,
    /// Unsigned 64-bit integer. Invalid values return an error.
    U64,
}

/// Maps one raw key (environment variable or property name) to a JSON path.
struct KeySpec {
    /// The raw key as it appears in the source.
    key: &'static str,
    /// The JSON path segments (e.g., `["admin", "username"]`).
    path: &'static [&'static str],
    /// The expected value type.
    value_type: ValueType,
}

/// Table of all environment variables and their JSON paths.
const ENV_VAR_SPECS: &[KeySpec] = &[
    KeySpec {
        key: "APIPROBE_BASE_API_PATH",
        path: &["base_api_path"],
        value_type: ValueType::String,
    },
    KeySpec {
        key: "APIPROBE_ADMIN_USERNAME",
        path: &["admin", "username"],
        value_type: ValueType::String,
    },
    KeySpec {
        key: "APIPROBE_ADMIN_PASSWORD",
        path: &["admin", "password"],
        value_type: ValueType::String,
    },
    KeySpec {
        key: "APIPROBE_USER_USERNAME",
        path: &["user", "username"],
        value_type: ValueType::String,
    },
    KeySpec {
        key: "APIPROBE_USER_PASSWORD",
        path: &["user", "password"],
        value_type: ValueType::String,
    },
    KeySpec {
        key: "APIPROBE_HTTP_TIMEOUT_SECS",
        path: &["http", "timeout_secs"],
        value_type: ValueType::U64,
    },
    KeySpec {
        key: "APIPROBE_HTTP_LEGACY_NULL_BEARER",
        path: &["http", "legacy_null_bearer"],
        value_type: ValueType::Bool,
    },
];

/// Table of recognised keys in `.properties` files.
const PROPERTY_SPECS: &[KeySpec] = &[
    KeySpec {
        key: "baseApiPath",
        path: &["base_api_path"],
        value_type: ValueType::String,
    },
    KeySpec {
        key: "admin.username",
        path: &["admin", "username"],
        value_type: ValueType::String,
    },
    KeySpec {
        key: "admin.password",
        path: &["admin", "password"],
        value_type: ValueType::String,
    },
    KeySpec {
        key: "user.username",
        path: &["user", "username"],
        value_type: ValueType::String,
    },
    KeySpec {
        key: "user.password",
        path: &["user", "password"],
        value_type: ValueType::String,
    },
    KeySpec {
        key: "http.timeoutSecs",
        path: &["http", "timeout_secs"],
        value_type: ValueType::U64,
    },
    KeySpec {
        key: "http.legacyNullBearer",
        path: &["http", "legacy_null_bearer"],
        value_type: ValueType::Bool,
    },
];

/// Returns the list of environment variable names recognised by the config loader.
///
/// Tests use this to clear every `APIPROBE_*` variable without keeping a
/// separate hard-coded list in sync.
#[must_use]
pub fn env_var_names() -> Vec<&'static str> {
    ENV_VAR_SPECS.iter().map(|spec| spec.key).collect()
}

/// Load configuration with full layer precedence.
///
/// 1. Application defaults defined in the struct
/// 2. Configuration file (`--config`, or discovered via XDG paths and
///    `APIPROBE_CONFIG_PATH`)
/// 3. Environment variables prefixed with `APIPROBE_`
/// 4. Command-line arguments (from the provided `Cli`)
///
/// Later sources override earlier ones. Required keys are not checked here;
/// [`CredentialStore::from_config`](crate::credentials::CredentialStore::from_config)
/// does that once the layers are merged.
///
/// # Errors
///
/// Returns `ConfigError` if:
/// - an explicit `--config` path does not exist
/// - the configuration file cannot be read or parsed
/// - a typed environment variable or property holds an unparseable value
/// - merging the layers fails
pub fn load_config(cli: &Cli) -> Result<HarnessConfig> {
    let mut composer = MergeComposer::new();

    // Layer 1: Defaults.
    let defaults =
        serde_json::to_value(HarnessConfig::default()).map_err(|e| ConfigError::ParseError {
            message: format!("failed to serialise defaults: {e}"),
        })?;
    composer.push_defaults(defaults);

    // Layer 2: Configuration file.
    if let Some(path) = resolve_config_path(cli)? {
        info!(path = %path, "Loading harness configuration file");
        let value = read_config_file(&path)?;
        composer.push_file(value, Some(path));
    }

    // Layer 3: Environment variables.
    let env_values = collect_env_vars()?;
    if !env_values.is_null() {
        composer.push_environment(env_values);
    }

    // Layer 4: CLI overrides.
    let cli_overrides = build_cli_overrides(cli);
    if !cli_overrides.is_null() {
        composer.push_cli(cli_overrides);
    }

    let config =
        HarnessConfig::merge_from_layers(composer.layers()).map_err(ConfigError::OrthoConfig)?;

    Ok(config)
}

/// Pick the configuration file to load, if any.
///
/// An explicit `--config` path must exist. Without one, the first existing
/// discovery candidate wins and having none is not an error.
fn resolve_config_path(cli: &Cli) -> Result<Option<Utf8PathBuf>> {
    if let Some(path) = &cli.config {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.clone().into_std_path_buf(),
            }
            .into());
        }
        return Ok(Some(path.clone()));
    }

    let discovery = ConfigDiscovery::builder("apiprobe")
        .env_var("APIPROBE_CONFIG_PATH")
        .config_file_name("config.toml")
        .dotfile_name(".apiprobe.toml")
        .build();
    Ok(discovery
        .candidates()
        .into_iter()
        .filter(|p| p.exists())
        .find_map(|p| Utf8PathBuf::try_from(p).ok()))
}

/// Read a configuration file through a `cap_std` directory capability and
/// convert it to a JSON layer.
fn read_config_file(path: &Utf8Path) -> Result<Value> {
    let current_dir = Utf8PathBuf::from(".");
    let parent = path
        .parent()
        .filter(|p| !p.as_str().is_empty())
        .unwrap_or_else(|| current_dir.as_ref());
    let file_name = path.file_name().unwrap_or(path.as_str());

    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|e| {
        ConfigError::ParseError {
            message: format!("failed to open directory {parent}: {e}"),
        }
    })?;

    let content = dir
        .read_to_string(file_name)
        .map_err(|e| ConfigError::ParseError {
            message: format!("failed to read {path}: {e}"),
        })?;

    if path.extension() == Some("properties") {
        parse_properties(&content)
    } else {
        toml::from_str::<Value>(&content).map_err(|e| {
            ConfigError::ParseError {
                message: format!("failed to parse {path}: {e}"),
            }
            .into()
        })
    }
}

/// Parse a flat `.properties` document into a nested JSON value.
///
/// Supports `key=value` and `key: value` separators and `#`/`!` comment
/// lines. Keys not listed in [`PROPERTY_SPECS`] are skipped. Values keep
/// trailing whitespace, so passwords reach the login payload unchanged.
pub(crate) fn parse_properties(content: &str) -> Result<Value> {
    let mut root = Map::new();

    for line in content.lines().map(str::trim_start) {
        if line.trim_end().is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let Some((raw_key, raw_value)) = line.split_once(['=', ':']) else {
            debug!(line, "Skipping property line without a separator");
            continue;
        };
        let key = raw_key.trim();
        let Some(spec) = PROPERTY_SPECS.iter().find(|spec| spec.key == key) else {
            debug!(key, "Ignoring unrecognised property");
            continue;
        };
        let value = parse_typed(raw_value.trim_start(), spec)?;
        insert_at_path(&mut root, spec.path, value);
    }

    Ok(Value::Object(root))
}

/// Collect `APIPROBE_*` environment variables into a JSON value.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` if a typed variable has an
/// unparseable value.
fn collect_env_vars() -> Result<Value> {
    let mut root = Map::new();

    for spec in ENV_VAR_SPECS {
        let Ok(raw_value) = std::env::var(spec.key) else {
            continue;
        };
        let json_value = parse_typed(&raw_value, spec)?;
        insert_at_path(&mut root, spec.path, json_value);
    }

    if root.is_empty() {
        Ok(Value::Null)
    } else {
        Ok(Value::Object(root))
    }
}

/// Convert a raw string into the JSON type its spec expects.
fn parse_typed(raw_value: &str, spec: &KeySpec) -> Result<Value> {
    match spec.value_type {
        ValueType::String => Ok(Value::String(raw_value.to_owned())),
        ValueType::Bool => raw_value
            .trim()
            .parse::<bool>()
            .map(Value::Bool)
            .map_err(|_| {
                ConfigError::InvalidValue {
                    field: spec.key.to_owned(),
                    reason: format!("expected bool (true/false), got '{raw_value}'"),
                }
                .into()
            }),
        ValueType::U64 => raw_value
            .trim()
            .parse::<u64>()
            .map(|n| Value::Number(n.into()))
            .map_err(|_| {
                ConfigError::InvalidValue {
                    field: spec.key.to_owned(),
                    reason: format!("expected unsigned integer, got '{raw_value}'"),
                }
                .into()
            }),
    }
}

/// Insert a value at a nested path in a JSON map, creating intermediate
/// objects as needed.
fn insert_at_path(root: &mut Map<String, Value>, path: &[&str], value: Value) {
    let Some((&field, parents)) = path.split_last() else {
        return;
    };

    let mut current = root;
    for &segment in parents {
        let entry = current
            .entry(segment.to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        let Some(obj) = entry.as_object_mut() else {
            return;
        };
        current = obj;
    }

    current.insert(field.to_owned(), value);
}

/// Build a JSON value containing CLI overrides.
fn build_cli_overrides(cli: &Cli) -> Value {
    let mut overrides = Map::new();

    if let Some(ref base) = cli.base_api_path {
        overrides.insert("base_api_path".to_owned(), Value::String(base.clone()));
    }

    if overrides.is_empty() {
        Value::Null
    } else {
        Value::Object(overrides)
    }
}
