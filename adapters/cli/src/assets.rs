use std::{fs, path::Path, sync::Arc};

use anyhow::{Context, Result};
use siege_core::{Catalog, MapDefinition};

/// Loads the catalog from `path`, or the built-in roster when absent.
pub(crate) fn load_catalog(path: Option<&Path>) -> Result<Arc<Catalog>> {
    let Some(path) = path else {
        return Ok(Arc::new(Catalog::standard()));
    };
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    let catalog = Catalog::from_json_str(&json)
        .with_context(|| format!("invalid catalog {}", path.display()))?;
    Ok(Arc::new(catalog))
}

/// Loads the map from `path`, or the built-in meadow when absent.
pub(crate) fn load_map(path: Option<&Path>, catalog: &Catalog) -> Result<Arc<MapDefinition>> {
    let Some(path) = path else {
        return Ok(Arc::new(MapDefinition::meadow()));
    };
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read map {}", path.display()))?;
    let map = MapDefinition::from_json_str(&json, catalog)
        .with_context(|| format!("invalid map {}", path.display()))?;
    Ok(Arc::new(map))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_paths_fall_back_to_builtins() {
        let catalog = load_catalog(None).expect("builtin catalog");
        let map = load_map(None, &catalog).expect("builtin map");
        assert_eq!(map.id, "meadow");
    }

    #[test]
    fn unreadable_files_name_the_path() {
        let error = load_catalog(Some(Path::new("/nonexistent/catalog.json")))
            .expect_err("missing file");
        assert!(error.to_string().contains("/nonexistent/catalog.json"));
    }
}
