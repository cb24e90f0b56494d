//! Schema assembly from SDL fragment files.
//!
//! A schema is spread over `*.gql`/`*.graphql` files under one directory
//! tree. Fragments are concatenated in lexicographic path order (so
//! assembly is deterministic regardless of filesystem iteration order) and
//! validated as a whole; duplicate definitions across fragments surface as
//! validation errors.

use std::path::{Path, PathBuf};

use apollo_compiler::{Schema, ast, validation::Valid};
use walkdir::WalkDir;

/// Schema assembly failure. Always fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read schema directory {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no schema fragments found under {0}")]
    Empty(PathBuf),

    #[error("invalid schema: {0}")]
    Invalid(String),

    #[error("subscriptions are not supported (schema declares a subscription root)")]
    SubscriptionRoot,
}

fn is_sdl_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("gql" | "graphql")
    )
}

/// Discover, concatenate, and validate every SDL fragment under `dir`.
pub fn load_schema(dir: &Path) -> Result<Valid<Schema>, LoadError> {
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| LoadError::Io {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;
        if entry.file_type().is_file() && is_sdl_file(entry.path()) {
            paths.push(entry.into_path());
        }
    }
    paths.sort();

    if paths.is_empty() {
        return Err(LoadError::Empty(dir.to_path_buf()));
    }

    let mut sdl = String::new();
    for path in &paths {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        sdl.push_str(&text);
        sdl.push('\n');
    }

    let schema = Schema::parse_and_validate(sdl, "schema.graphql")
        .map_err(|e| LoadError::Invalid(e.errors.to_string()))?;

    if schema
        .root_operation(ast::OperationType::Subscription)
        .is_some()
    {
        return Err(LoadError::SubscriptionRoot);
    }

    tracing::info!(
        dir = %dir.display(),
        fragments = paths.len(),
        types = schema.types.len(),
        "schema loaded"
    );
    Ok(schema)
}
