use ::config::{Config, ConfigError, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "lectio.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Any OpenAI-compatible chat completions endpoint.
    OpenAi,
    /// Canned offline replies.
    Dummy,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: Backend,
    pub api_base: String,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    pub prompt_path: PathBuf,
    pub max_input_chars: usize,
    /// Shown next to the API key field.
    pub api_key_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            backend: Backend::OpenAi,
            api_base: "https://generativelanguage.googleapis.com/v1beta/openai".to_owned(),
            model: "gemini-1.5-pro".to_owned(),
            temperature: 0.7,
            top_p: 0.95,
            max_output_tokens: 8192,
            prompt_path: PathBuf::from("prompt.txt"),
            max_input_chars: 750,
            api_key_url: "https://makersuite.google.com/app/apikey".to_owned(),
        }
    }
}

impl AppConfig {
    /// Loads the config file if it exists, unspecified keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path).required(false))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let cfg = AppConfig::load(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn file_overrides_some_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"
backend = "dummy"
model = "gemini-2.0-flash"
temperature = 0.2
max_input_chars = 500
"#,
        )
        .unwrap();

        let cfg = AppConfig::load(&path).unwrap();

        assert_eq!(cfg.backend, Backend::Dummy);
        assert_eq!(cfg.model, "gemini-2.0-flash");
        assert_eq!(cfg.temperature, 0.2);
        assert_eq!(cfg.max_input_chars, 500);
        assert_eq!(cfg.top_p, 0.95);
        assert_eq!(cfg.prompt_path, PathBuf::from("prompt.txt"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "backend = \"carrier-pigeon\"").unwrap();

        assert!(AppConfig::load(&path).is_err());
    }
}
