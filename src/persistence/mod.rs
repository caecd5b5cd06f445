use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    core::{
        PackError,
        PipelineOptions,
    },
    mapping::MappingOptions,
};

const APP_NAME: &str = "heicpack";
pub const SETTINGS_FILE: &str = "settings.json";

pub fn get_app_data_dir() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        let app_dir = data_dir.join(APP_NAME);
        let _ = fs::create_dir_all(&app_dir);
        app_dir
    } else {
        PathBuf::from(".")
    }
}

pub fn get_data_file_path(filename: &str) -> PathBuf {
    get_app_data_dir().join(filename)
}

pub fn save_json_to<T: Serialize>(data: &T, file_path: &Path) -> Result<(), PackError> {
    let json = serde_json::to_string_pretty(data)?;
    fs::write(file_path, json)?;
    tracing::info!("Data saved to: {}", file_path.display());
    Ok(())
}

pub fn load_json_from<T: for<'de> Deserialize<'de> + Default>(file_path: &Path) -> Result<T, PackError> {
    if !file_path.exists() {
        return Ok(T::default());
    }

    let json = fs::read_to_string(file_path)?;
    let data: T = serde_json::from_str(&json)?;
    tracing::debug!("Data loaded from: {}", file_path.display());
    Ok(data)
}

pub fn save_json<T: Serialize>(data: &T, filename: &str) -> Result<(), PackError> {
    save_json_to(data, &get_data_file_path(filename))
}

pub fn load_json_or_default<T: for<'de> Deserialize<'de> + Default>(filename: &str) -> T {
    let file_path = get_data_file_path(filename);
    match load_json_from::<T>(&file_path) {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!("Failed to load {}: {}. Using defaults.", filename, e);
            T::default()
        }
    }
}

/// Persisted defaults for `convert`. Command-line flags override them per run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub pipeline: PipelineOptions,
    pub mapping: MappingOptions,
}

impl Settings {
    pub fn load() -> Self {
        load_json_or_default(SETTINGS_FILE)
    }

    pub fn save(&self) -> Result<(), PackError> {
        save_json(self, SETTINGS_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("heicpack_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let settings: Settings = load_json_from(&temp_file("absent.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.pipeline.concurrency, 4);
        assert_eq!(settings.mapping.key_column, 16);
    }

    #[test]
    fn test_settings_round_trip() {
        let path = temp_file("settings.json");
        let mut settings = Settings::default();
        settings.pipeline.jpeg_quality = 0.65;
        settings.mapping.delimiter = ';';
        settings.mapping.sheet_header_rows = 0;

        save_json_to(&settings, &path).unwrap();
        let loaded: Settings = load_json_from(&path).unwrap();
        assert_eq!(loaded, settings);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let path = temp_file("partial.json");
        fs::write(&path, r#"{ "pipeline": { "jpeg_quality": 0.5, "concurrency": 2 } }"#).unwrap();

        let loaded: Settings = load_json_from(&path).unwrap();
        assert_eq!(loaded.pipeline.concurrency, 2);
        assert_eq!(loaded.mapping, MappingOptions::default());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_partial_sections_keep_saved_values() {
        let path = temp_file("partial_sections.json");
        fs::write(&path, r#"{ "pipeline": { "jpeg_quality": 0.6 }, "mapping": { "delimiter": ";" } }"#)
            .unwrap();

        let loaded: Settings = load_json_from(&path).unwrap();
        assert_eq!(loaded.pipeline.jpeg_quality, 0.6);
        assert_eq!(loaded.pipeline.concurrency, 4);
        assert_eq!(loaded.mapping.delimiter, ';');
        assert_eq!(loaded.mapping.key_column, 16);
        assert_eq!(loaded.mapping.value_column, 17);
        assert_eq!(loaded.mapping.sheet_header_rows, 1);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let path = temp_file("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let result: Result<Settings, PackError> = load_json_from(&path);
        assert!(matches!(result, Err(PackError::Json(_))));

        fs::remove_file(&path).unwrap();
    }
}
