use std::fs;
use std::path::{Path, PathBuf};

use toml::Value;
use vendorhub_core::config::{AppConfig, LoadOptions, DEFAULT_CONFIG_FILES, ENV_BINDINGS};

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let fields = [
        ("database.url", config.database.url.clone()),
        ("database.max_connections", config.database.max_connections.to_string()),
        ("database.timeout_secs", config.database.timeout_secs.to_string()),
        ("server.bind_address", config.server.bind_address.clone()),
        ("server.port", config.server.port.to_string()),
        ("server.graceful_shutdown_secs", config.server.graceful_shutdown_secs.to_string()),
        ("logging.level", config.logging.level.clone()),
        ("logging.format", format!("{:?}", config.logging.format)),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.push(format!(
        "- config file: {}",
        config_file_path
            .as_deref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "<none>".to_string())
    ));
    for (key_path, value) in fields {
        let source = field_source(key_path, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key_path, &value, source));
    }

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    DEFAULT_CONFIG_FILES.iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let env_key = ENV_BINDINGS
        .iter()
        .filter(|binding| binding.field == key_path)
        .find_map(|binding| binding.active().map(|(key, _)| key));
    if let Some(env_key) = env_key {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use super::{contains_path, field_source, render_line};

    #[test]
    fn contains_path_walks_nested_tables() {
        let doc: toml::Value = "[database]\nurl = \"sqlite://vendors.db\"\n"
            .parse()
            .expect("toml document should parse");

        assert!(contains_path(&doc, "database.url"));
        assert!(!contains_path(&doc, "database.max_connections"));
        assert!(!contains_path(&doc, "server.port"));
    }

    #[test]
    fn field_source_prefers_file_over_default_without_env() {
        let doc: toml::Value =
            "[server]\nport = 9000\n".parse().expect("toml document should parse");
        let path = std::path::Path::new("vendorhub.toml");

        assert_eq!(
            field_source("server.port", Some(&doc), Some(path)),
            "file (vendorhub.toml)"
        );
        assert_eq!(field_source("server.bind_address", Some(&doc), Some(path)), "default");
    }

    #[test]
    fn render_line_formats_value_and_source() {
        assert_eq!(
            render_line("server.port", "8080", "default".to_string()),
            "- server.port = 8080 (source: default)"
        );
    }
}
