use std::{fs::File, io::BufReader, path::{Component, Path}};

use serde::Deserialize;

use crate::errors::{Error, Result};

/// Run configuration, read from a JSON file. Every field is optional in the file; values
/// given on the command line take precedence.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct UserConfig {
    pub data_path: String,
    pub dest_path: String,
    pub lines_output: String,
    pub areas_output: String,
    pub log_level: String,
    pub progress: bool,
}

impl Default for UserConfig {
    fn default() -> Self {
        UserConfig {
            data_path: String::new(),
            dest_path: "output".to_string(),
            lines_output: "linear_features.geojson".to_string(),
            areas_output: "areal_features.geojson".to_string(),
            log_level: "info".to_string(),
            progress: true,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub data_path: Option<String>,
    pub dest_path: Option<String>,
    pub lines_output: Option<String>,
    pub areas_output: Option<String>,
    pub log_level: Option<String>,
    pub no_progress: bool,
}

impl UserConfig {
    pub fn load(path: &Path) -> Result<UserConfig> {
        let file = File::open(path).map_err(|err| {
            Error::config(format!("Could not open config file {}: {}", path.display(), err))
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|err| {
            Error::config(format!("Could not parse config {}: {}", path.display(), err))
        })
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(data_path) = overrides.data_path {
            self.data_path = data_path;
        }
        if let Some(dest_path) = overrides.dest_path {
            self.dest_path = dest_path;
        }
        if let Some(lines_output) = overrides.lines_output {
            self.lines_output = lines_output;
        }
        if let Some(areas_output) = overrides.areas_output {
            self.areas_output = areas_output;
        }
        if let Some(log_level) = overrides.log_level {
            self.log_level = log_level;
        }
        if overrides.no_progress {
            self.progress = false;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.data_path.is_empty() {
            return Err(Error::config("No input document given (data_path)"));
        }
        if self.lines_output.is_empty() || self.areas_output.is_empty() {
            return Err(Error::config("Output names must not be empty"));
        }
        for name in [&self.lines_output, &self.areas_output] {
            if !is_bare_file_name(name) {
                return Err(Error::config(format!(
                    "Output name {:?} must be a plain file name inside the output directory", name
                )));
            }
        }
        if self.lines_output == self.areas_output {
            return Err(Error::config("Linear and areal outputs must have different names"));
        }
        Ok(())
    }
}

fn is_bare_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use std::io::Write;

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "data_path": "data/lakes.json", "progress": false }}"#).unwrap();

        let config = UserConfig::load(file.path()).unwrap();
        assert_eq!(config.data_path, "data/lakes.json");
        assert!(!config.progress);
        assert_eq!(config.dest_path, "output");
        assert_eq!(config.lines_output, "linear_features.geojson");
    }

    #[test]
    fn test_overrides_win() {
        let config = UserConfig {
            data_path: "a.json".to_string(),
            ..UserConfig::default()
        };
        let config = config.with_overrides(ConfigOverrides {
            data_path: Some("b.osm".to_string()),
            areas_output: Some("water.geojson".to_string()),
            no_progress: true,
            ..ConfigOverrides::default()
        });

        assert_eq!(config.data_path, "b.osm");
        assert_eq!(config.areas_output, "water.geojson");
        assert_eq!(config.lines_output, "linear_features.geojson");
        assert!(!config.progress);
    }

    #[test]
    fn test_validate() {
        assert_eq!(UserConfig::default().validate().unwrap_err().kind, ErrorKind::Config);

        let clashing = UserConfig {
            data_path: "a.json".to_string(),
            areas_output: "linear_features.geojson".to_string(),
            ..UserConfig::default()
        };
        assert_eq!(clashing.validate().unwrap_err().kind, ErrorKind::Config);
    }

    #[test]
    fn test_output_names_stay_in_output_dir() {
        let config = UserConfig {
            data_path: "lakes.json".to_string(),
            ..UserConfig::default()
        };
        assert!(config.validate().is_ok());

        for name in ["../escape.geojson", "/tmp/abs.geojson", "nested/lines.geojson", "..", "."] {
            let escaping = UserConfig {
                lines_output: name.to_string(),
                ..config.clone()
            };
            assert_eq!(escaping.validate().unwrap_err().kind, ErrorKind::Config, "{}", name);

            let escaping = UserConfig {
                areas_output: name.to_string(),
                ..config.clone()
            };
            assert_eq!(escaping.validate().unwrap_err().kind, ErrorKind::Config, "{}", name);
        }
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = UserConfig::load(Path::new("/nonexistent/config.json")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Config);
    }
}
