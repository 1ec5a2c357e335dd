//! Configuration loading
//!
//! A configuration is a tree of TOML files. The root file declares
//! resources and child modules; a child module is either written inline
//! or pulled in from another file with `source`:
//!
//! ```toml
//! [resources."local_file.motd"]
//! attributes = { path = "/tmp/motd", content = "hello" }
//!
//! [modules.network]
//! source = "network.toml"
//! depends_on = ["local_file.motd"]
//! ```
//!
//! `source` paths are relative to the file that names them.

use anyhow::{Context, Result, bail};
use reconcile::{ModuleConfig, ResourceConfig};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

#[derive(Debug, Default, Deserialize)]
struct ModuleFile {
    #[serde(default)]
    depends_on: Vec<String>,
    #[serde(default)]
    resources: BTreeMap<String, ResourceConfig>,
    #[serde(default)]
    modules: BTreeMap<String, ModuleEntry>,
}

#[derive(Debug, Deserialize)]
struct ModuleEntry {
    /// File holding the module body
    source: Option<String>,
    #[serde(flatten)]
    body: ModuleFile,
}

/// Load the configuration tree rooted at `path`
pub fn load(path: &Path) -> Result<ModuleConfig> {
    let mut stack = Vec::new();
    let config = load_file(path, &mut stack)?;
    log::info!(
        "Loaded {} resources from {}",
        config.resource_count(),
        path.display()
    );
    Ok(config)
}

/// Parse a configuration held in memory; `source` entries are not allowed
pub fn parse(content: &str) -> Result<ModuleConfig> {
    let file: ModuleFile = toml::from_str(content).context("Invalid configuration")?;
    into_module(file, None, &mut Vec::new())
}

fn load_file(path: &Path, stack: &mut Vec<PathBuf>) -> Result<ModuleConfig> {
    let canonical = fs::canonicalize(path)
        .with_context(|| format!("Could not read config file: {}", path.display()))?;
    if stack.contains(&canonical) {
        bail!("Module source cycle at {}", path.display());
    }

    let content = fs::read_to_string(&canonical)
        .with_context(|| format!("Could not read config file: {}", path.display()))?;
    let file: ModuleFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    log::debug!("Parsed config file {}", path.display());

    stack.push(canonical.clone());
    let module = into_module(file, canonical.parent(), stack);
    stack.pop();
    module
}

fn into_module(
    file: ModuleFile,
    dir: Option<&Path>,
    stack: &mut Vec<PathBuf>,
) -> Result<ModuleConfig> {
    let mut module = ModuleConfig::new().depends_on(file.depends_on);
    for (name, resource) in file.resources {
        module = module.with_resource(&name, resource);
    }

    for (name, entry) in file.modules {
        let child = match entry.source {
            Some(source) => {
                let Some(dir) = dir else {
                    bail!("Module '{}' uses a source but the configuration has no file", name);
                };
                let source_path = dir.join(paths::expand(&source));
                if !entry.body.resources.is_empty() || !entry.body.modules.is_empty() {
                    bail!("Module '{}' has a source and an inline body", name);
                }
                let mut loaded = load_file(&source_path, stack)
                    .with_context(|| format!("Failed to load module '{}'", name))?;
                loaded.depends_on.extend(entry.body.depends_on);
                loaded
            }
            None => into_module(entry.body, dir, stack)?,
        };
        module = module.with_module(&name, child);
    }

    Ok(module)
}
