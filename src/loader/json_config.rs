// src/loader/json_config.rs
use crate::bitmask::Bitmask;
use crate::config::{AutoTileConfig, BitmaskSet, TileDefinition};
use crate::error::{AutotileError, ConfigError};
use crate::spatial::GridCoord;
use serde::Deserialize;
use serde_json::{Map as JsonObject, Value as JsonValue};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const INLINE_SOURCE: &str = "<inline>";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonConfig {
    tile_size: i64,
    // Kept as a raw object so definition order survives parsing.
    #[serde(default)]
    tile_definitions: JsonObject<String, JsonValue>,
    #[serde(default)]
    bitmask_sets: BTreeMap<String, BTreeMap<String, i64>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonTileDefinition {
    layer: i64,
    image_file_name: String,
    bitmask_name: String,
    position_in_set: JsonCoord,
    auto_tile_group: i32,
}

#[derive(Deserialize)]
struct JsonCoord {
    x: i32,
    y: i32,
}

fn json_err(path: &Path) -> impl FnOnce(serde_json::Error) -> AutotileError + '_ {
    move |source| AutotileError::Json {
        path: path.to_path_buf(),
        source,
    }
}

fn definition_from_json(
    name: &str,
    def: JsonTileDefinition,
) -> Result<TileDefinition, ConfigError> {
    let layer = usize::try_from(def.layer).map_err(|_| ConfigError::NegativeLayer {
        tile: name.to_owned(),
        layer: def.layer,
    })?;
    Ok(TileDefinition {
        layer,
        image_file_name: def.image_file_name,
        bitmask_name: def.bitmask_name,
        position_in_set: GridCoord::new(def.position_in_set.x, def.position_in_set.y),
        auto_tile_group: def.auto_tile_group,
    })
}

fn bitmask_set_from_json(
    set_name: &str,
    entries: BTreeMap<String, i64>,
) -> Result<BitmaskSet, ConfigError> {
    let mut set = BitmaskSet::new();
    for (key, value) in entries {
        let coord = key
            .parse::<GridCoord>()
            .map_err(|_| ConfigError::InvalidCoordKey {
                set: set_name.to_owned(),
                key: key.clone(),
            })?;
        let bits = u8::try_from(value).map_err(|_| ConfigError::MaskOutOfRange {
            set: set_name.to_owned(),
            key,
            value,
        })?;
        set.insert(coord, Bitmask(bits));
    }
    Ok(set)
}

fn config_from_json(j: JsonConfig, source_path: &Path) -> Result<AutoTileConfig, AutotileError> {
    let mut defs = Vec::with_capacity(j.tile_definitions.len());
    for (name, value) in j.tile_definitions {
        let raw: JsonTileDefinition =
            serde_json::from_value(value).map_err(json_err(source_path))?;
        let def = definition_from_json(&name, raw)?;
        defs.push((name, def));
    }

    let mut sets = BTreeMap::new();
    for (name, entries) in j.bitmask_sets {
        let set = bitmask_set_from_json(&name, entries)?;
        sets.insert(name, set);
    }

    Ok(AutoTileConfig::new(j.tile_size, defs, sets)?)
}

/// Parse a config document held in memory.
pub fn decode_config_str(json: &str) -> Result<AutoTileConfig, AutotileError> {
    let source = Path::new(INLINE_SOURCE);
    let j: JsonConfig = serde_json::from_str(json).map_err(json_err(source))?;
    config_from_json(j, source)
}

/// Read and parse a config document; errors carry `path`.
pub fn decode_config_file(path: &Path) -> Result<AutoTileConfig, AutotileError> {
    let txt = std::fs::read_to_string(path).map_err(|source| AutotileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let j: JsonConfig = serde_json::from_str(&txt).map_err(json_err(path))?;
    let config = config_from_json(j, path)?;
    log::info!(
        "Loaded autotile config {} ({} tiles, {} bitmask sets)",
        path.display(),
        config.tile_definitions().count(),
        config.bitmask_sets().count()
    );
    Ok(config)
}

fn definition_to_json(def: &TileDefinition) -> JsonValue {
    serde_json::json!({
        "layer": def.layer,
        "imageFileName": def.image_file_name,
        "bitmaskName": def.bitmask_name,
        "positionInSet": { "x": def.position_in_set.x, "y": def.position_in_set.y },
        "autoTileGroup": def.auto_tile_group,
    })
}

fn bitmask_set_to_json(set: &BitmaskSet) -> JsonValue {
    let entries: JsonObject<String, JsonValue> = set
        .iter()
        .map(|(coord, mask)| (coord.to_string(), JsonValue::from(mask.bits())))
        .collect();
    JsonValue::Object(entries)
}

/// Canonical document: definitions in order, sets and keys sorted.
pub fn encode_config(config: &AutoTileConfig) -> String {
    let tile_definitions: JsonObject<String, JsonValue> = config
        .tile_definitions()
        .map(|(name, def)| (name.to_owned(), definition_to_json(def)))
        .collect();
    let bitmask_sets: JsonObject<String, JsonValue> = config
        .bitmask_sets()
        .map(|(name, set)| (name.to_owned(), bitmask_set_to_json(set)))
        .collect();

    let value = serde_json::json!({
        "tileSize": config.tile_size(),
        "tileDefinitions": tile_definitions,
        "bitmaskSets": bitmask_sets,
    });
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}

/// Path of the image backing `image_file_name` inside `image_dir`.
pub fn image_path(image_dir: &Path, image_file_name: &str, extension: &str) -> PathBuf {
    image_dir.join(format!("{image_file_name}.{extension}"))
}
