//! Built-in provider
//!
//! `local_file` resources are real files: `path` names the file and
//! `content` is written to it. Every other kind is a null resource whose
//! declared attributes are taken as the real-world truth, which is enough
//! to drive the engine end to end without any external system.

use anyhow::{Context, Result, bail};
use reconcile::{Attributes, Diff, EvalContext, Provider};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

/// Resource kind backed by files on disk
pub const LOCAL_FILE: &str = "local_file";

#[derive(Debug, Default)]
pub struct LocalProvider;

impl LocalProvider {
    fn file_path(attributes: &Attributes) -> Result<&Path> {
        match attributes.get("path") {
            Some(path) if !path.is_empty() => Ok(Path::new(path)),
            _ => bail!("{} requires a 'path' attribute", LOCAL_FILE),
        }
    }

    fn remove_file(path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Err(e) if e.kind() != ErrorKind::NotFound => {
                Err(e).with_context(|| format!("Failed to remove {}", path.display()))
            }
            _ => Ok(()),
        }
    }

    fn write_file(attributes: &Attributes) -> Result<()> {
        let path = Self::file_path(attributes)?;
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let content = attributes.get("content").map_or("", String::as_str);
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
    }
}

impl Provider for LocalProvider {
    fn refresh(&self, kind: &str, attributes: &Attributes) -> Result<Option<Attributes>> {
        if kind != LOCAL_FILE {
            return Ok(Some(attributes.clone()));
        }

        let path = Self::file_path(attributes)?;
        match fs::read_to_string(path) {
            Ok(content) => {
                let mut current = attributes.clone();
                current.insert("content".to_string(), content);
                Ok(Some(current))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("{} is gone", path.display());
                Ok(None)
            }
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    fn apply(&self, kind: &str, current: Option<&Attributes>, diff: &Diff) -> Result<Attributes> {
        let next = diff.apply_to(current);
        if kind != LOCAL_FILE {
            return Ok(next);
        }

        if diff.is_destroy() {
            if let Some(current) = current {
                Self::remove_file(Self::file_path(current)?)?;
            }
            return Ok(next);
        }

        // A changed path moves the file
        if let Some(current) = current
            && current.get("path") != next.get("path")
            && let Ok(old) = Self::file_path(current)
        {
            Self::remove_file(old)?;
        }
        Self::write_file(&next)?;
        Ok(next)
    }
}

/// Evaluation context using the built-in provider for every resource
pub fn context() -> EvalContext {
    let provider = Arc::new(LocalProvider);
    EvalContext::new()
        .with_provider("local", provider.clone())
        .with_fallback(provider)
}
