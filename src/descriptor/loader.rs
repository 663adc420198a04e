use super::EntityDescriptor;
use crate::util::{Result, SchemaError};
use glob::glob;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Deserialize)]
#[serde(untagged)]
enum DescriptorFile {
    Many(Vec<EntityDescriptor>),
    One(EntityDescriptor),
}

/// Load entity descriptors from files, directories or glob patterns.
///
/// Files are read in sorted path order so the resulting registry (and every
/// script built from it) is reproducible. A path matched by several sources
/// is read once.
pub fn load_descriptor_sources(sources: &[String]) -> Result<Vec<EntityDescriptor>> {
    if sources.is_empty() {
        return Err(SchemaError::ParseError(
            "No descriptor sources provided".to_string(),
        ));
    }

    let mut files = BTreeSet::new();
    for source in sources {
        files.extend(resolve_source(source)?);
    }

    let mut descriptors = Vec::new();
    for file in &files {
        descriptors.extend(load_descriptor_file(file)?);
    }

    tracing::debug!(
        files = files.len(),
        entities = descriptors.len(),
        "loaded entity descriptors"
    );

    Ok(descriptors)
}

fn load_descriptor_file(path: &Path) -> Result<Vec<EntityDescriptor>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        SchemaError::ParseError(format!("Failed to read {}: {e}", path.display()))
    })?;

    let parsed: DescriptorFile = serde_json::from_str(&content).map_err(|e| {
        SchemaError::ParseError(format!("Invalid descriptor file {}: {e}", path.display()))
    })?;

    Ok(match parsed {
        DescriptorFile::Many(entities) => entities,
        DescriptorFile::One(entity) => vec![entity],
    })
}

/// Resolve a source pattern to a list of descriptor file paths.
/// Handles: single files, directories (recursive *.json), and glob patterns.
fn resolve_source(source: &str) -> Result<Vec<PathBuf>> {
    let path = Path::new(source);

    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    if path.is_dir() {
        let pattern = path.join("**/*.json");
        return resolve_glob(pattern.to_str().unwrap_or(source));
    }

    resolve_glob(source)
}

fn resolve_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let entries = glob(pattern)
        .map_err(|e| SchemaError::ParseError(format!("Invalid glob pattern: {e}")))?;

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| SchemaError::ParseError(format!("Glob error: {e}")))?;
        if path.is_file() {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(SchemaError::ParseError(format!(
            "No descriptor files found matching pattern: {pattern}"
        )));
    }

    files.sort();
    Ok(files)
}
