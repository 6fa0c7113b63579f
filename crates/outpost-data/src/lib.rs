//! Data-driven game content for Outpost.
//!
//! A data directory holds up to three files, each in RON, TOML or JSON:
//!
//! - `resources.*` (required) -- list of [`schema::ResourceData`]
//! - `buildings.*` (required) -- list of [`schema::BuildingData`]
//! - `config.*` (optional) -- a [`GameConfig`]; missing fields use defaults
//!
//! TOML files keep their lists under a `resources` or `buildings` key.

pub mod loader;
pub mod schema;

use loader::{deserialize_file, deserialize_list, find_data_file, require_data_file};
use outpost_core::catalog::{Catalog, CatalogBuilder};
use outpost_core::config::GameConfig;
use schema::{BuildingData, ResourceData};
use std::path::Path;

pub use loader::DataLoadError;

/// Everything a session needs from disk.
#[derive(Debug)]
pub struct GameData {
    pub catalog: Catalog,
    pub config: GameConfig,
}

/// Load and validate the catalog and config in `dir`.
pub fn load_game_data(dir: &Path) -> Result<GameData, DataLoadError> {
    let catalog = load_catalog(dir)?;
    let config = load_config(dir)?;
    tracing::info!(
        dir = %dir.display(),
        resources = catalog.resource_count(),
        buildings = catalog.building_count(),
        "loaded game data"
    );
    Ok(GameData { catalog, config })
}

/// Load `resources.*` and `buildings.*` into a validated catalog.
pub fn load_catalog(dir: &Path) -> Result<Catalog, DataLoadError> {
    let resources: Vec<ResourceData> =
        deserialize_list(&require_data_file(dir, "resources")?, "resources")?;
    let buildings: Vec<BuildingData> =
        deserialize_list(&require_data_file(dir, "buildings")?, "buildings")?;

    let mut builder = CatalogBuilder::new();
    for res in resources {
        builder.register_resource(res.into_definition());
    }
    for building in buildings {
        builder.register_building(building.into_definition());
    }
    builder.build().map_err(|source| DataLoadError::Catalog {
        dir: dir.to_path_buf(),
        source,
    })
}

/// Load `config.*`, or the defaults when there is none.
pub fn load_config(dir: &Path) -> Result<GameConfig, DataLoadError> {
    match find_data_file(dir, "config")? {
        Some(path) => deserialize_file(&path),
        None => {
            tracing::debug!(dir = %dir.display(), "no config file, using defaults");
            Ok(GameConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "outpost_data_lib_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    const RESOURCES_RON: &str = r#"[
        (id: "ore", name: Some("Ore"), capacity: Some(200.0)),
        (id: "credits", name: Some("Credits"), initial: 100.0),
    ]"#;

    const BUILDINGS_RON: &str = r#"[
        (
            id: "oreMiner",
            name: "Ore Miner",
            cost: [("credits", 10.0)],
            cost_growth: 1.15,
            produces: [("ore", 1.0)],
        ),
    ]"#;

    #[test]
    fn loads_catalog_and_default_config() {
        let dir = make_test_dir("basic");
        fs::write(dir.join("resources.ron"), RESOURCES_RON).unwrap();
        fs::write(dir.join("buildings.ron"), BUILDINGS_RON).unwrap();

        let data = load_game_data(&dir).unwrap();
        assert_eq!(data.catalog.resource_count(), 2);
        assert_eq!(
            data.catalog.compute_cost("oreMiner", 1).unwrap()["credits"],
            11.0
        );
        assert_eq!(data.config, GameConfig::default());
        cleanup(&dir);
    }

    #[test]
    fn config_overrides_defaults() {
        let dir = make_test_dir("config");
        fs::write(dir.join("resources.ron"), RESOURCES_RON).unwrap();
        fs::write(dir.join("buildings.ron"), BUILDINGS_RON).unwrap();
        fs::write(
            dir.join("config.toml"),
            "max_node_level = 5\n\n[market.prices]\nore = 2.0\n",
        )
        .unwrap();

        let data = load_game_data(&dir).unwrap();
        assert_eq!(data.config.max_node_level, 5);
        assert_eq!(data.config.market.prices.len(), 1);
        assert_eq!(data.config.min_offline_ms, 60_000);
        cleanup(&dir);
    }

    #[test]
    fn missing_buildings_file() {
        let dir = make_test_dir("missing");
        fs::write(dir.join("resources.ron"), RESOURCES_RON).unwrap();
        assert!(matches!(
            load_game_data(&dir),
            Err(DataLoadError::MissingRequired { .. })
        ));
        cleanup(&dir);
    }

    #[test]
    fn dangling_resource_reference_is_invalid() {
        let dir = make_test_dir("dangling");
        fs::write(dir.join("resources.ron"), r#"[(id: "credits")]"#).unwrap();
        fs::write(dir.join("buildings.ron"), BUILDINGS_RON).unwrap();
        let err = load_game_data(&dir).unwrap_err();
        assert!(matches!(err, DataLoadError::Catalog { .. }));
        assert!(err.to_string().contains("ore"), "got: {err}");
        cleanup(&dir);
    }
}
