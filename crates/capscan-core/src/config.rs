use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Effective configuration for one process. Built once at start-up and
/// handed by reference to every component that needs it.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub root_paths: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_file: Option<String>,
    pub skip_folders: Vec<String>,
    pub skip_extensions: Vec<String>,
    pub ignore_patterns: Vec<String>,
    pub caption_extension: String,
    pub output_dir: String,
    pub log_dir: String,
    pub history_dir: String,
    pub cache_dir: String,
    pub auto_open: bool,
    pub save: SaveConfig,
    pub report: ReportConfig,
    pub tags: TagConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root_paths: Vec::new(),
            batch_file: None,
            skip_folders: vec![".bf".to_string()],
            skip_extensions: [".txt", ".xlsx", ".csv", ".json", ".ini", ".db"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ignore_patterns: Vec::new(),
            caption_extension: ".txt".to_string(),
            output_dir: "./scan_reports".to_string(),
            log_dir: "./logs".to_string(),
            history_dir: "./history".to_string(),
            cache_dir: "./cache".to_string(),
            auto_open: false,
            save: SaveConfig::default(),
            report: ReportConfig::default(),
            tags: TagConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SaveConfig {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay_ms: 2000,
        }
    }
}

impl SaveConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    pub column_width: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { column_width: 20 }
    }
}

/// A named keyword group. A caption line containing any keyword as a
/// substring carries the group's label.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CategoryRule {
    pub label: String,
    pub keywords: Vec<String>,
}

impl CategoryRule {
    pub fn new(label: &str, keywords: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TagConfig {
    /// Marker appended to cleaned captions with sensitive content.
    pub sentinel: String,
    /// Label of the category group whose keywords mark a caption as
    /// sensitive instead of being cleaned away.
    pub sensitive_category: String,
    pub cleanup_extra: Vec<String>,
    pub sensitive_extra: Vec<String>,
    pub categories: Vec<CategoryRule>,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            sentinel: "uncensored".to_string(),
            sensitive_category: "R18".to_string(),
            cleanup_extra: vec!["censor".to_string(), "censored".to_string()],
            sensitive_extra: [
                "nipple", "pussy", "penis", "hetero", "sex", "anus", "naked", "explicit",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            categories: default_categories(),
        }
    }
}

impl TagConfig {
    /// Keywords whose presence removes a token from a cleaned caption:
    /// every non-sensitive category keyword plus `cleanup_extra`.
    pub fn cleanup_keywords(&self) -> Vec<String> {
        let from_groups = self
            .categories
            .iter()
            .filter(|rule| rule.label != self.sensitive_category)
            .flat_map(|rule| rule.keywords.iter());
        dedup_lowercase(from_groups.chain(self.cleanup_extra.iter()))
    }

    /// Keywords that flag a caption as sensitive: the sensitive category's
    /// keywords plus `sensitive_extra`.
    pub fn sensitive_keywords(&self) -> Vec<String> {
        let from_groups = self
            .categories
            .iter()
            .filter(|rule| rule.label == self.sensitive_category)
            .flat_map(|rule| rule.keywords.iter());
        dedup_lowercase(from_groups.chain(self.sensitive_extra.iter()))
    }
}

fn dedup_lowercase<'a>(words: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for word in words {
        let lower = word.trim().to_lowercase();
        if !lower.is_empty() && !out.contains(&lower) {
            out.push(lower);
        }
    }
    out
}

fn default_categories() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new(
            "R18",
            &[
                "sex", "nude", "pussy", "penis", "cum", "nipples", "vaginal", "cum_in_pussy",
                "oral", "rape", "fellatio", "facial", "anus", "anal", "ejaculation", "gangbang",
                "testicles", "multiple_penises", "erection", "handjob", "cumdrip", "pubic_hair",
                "pussy_juice", "bukkake", "clitoris", "female_ejaculation", "threesome",
                "doggystyle", "sex_from_behind", "cum_on_breasts", "double_penetration",
                "anal_object_insertion", "cunnilingus", "triple_penetration", "paizuri",
                "vaginal_object_insertion", "imminent_rape", "impregnation", "prone_bone",
                "reverse_cowgirl_position", "cum_inflation", "milking_machine", "cumdump",
                "anal_hair", "futanari", "glory_hole", "penis_on_face", "licking_penis",
                "breast_sucking", "breast_squeeze", "straddling",
            ],
        ),
        CategoryRule::new("boy", &["1boy", "2boys", "multiple_boys"]),
        CategoryRule::new("no_human", &["no_human"]),
        CategoryRule::new("furry", &["furry", "animal_focus"]),
        CategoryRule::new("黑白原图", &["monochrome", "greyscale"]),
        CategoryRule::new("简单背景", &["background"]),
    ]
}

/// Load configuration from built-in defaults, then `Config.toml` (or the
/// given file), then `CAPSCAN__*` environment variables.
pub fn load_configuration(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let file_source = match path {
        Some(path) => ConfigFile::from(path).required(true),
        None => ConfigFile::with_name("Config").required(false),
    };
    let builder = Config::builder()
        .add_source(file_source)
        .add_source(
            Environment::with_prefix("CAPSCAN")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_keyword_sets() {
        let tags = TagConfig::default();
        let cleanup = tags.cleanup_keywords();
        assert!(cleanup.contains(&"monochrome".to_string()));
        assert!(cleanup.contains(&"background".to_string()));
        assert!(cleanup.contains(&"censor".to_string()));
        assert!(!cleanup.contains(&"nipples".to_string()));

        let sensitive = tags.sensitive_keywords();
        assert!(sensitive.contains(&"nipples".to_string()));
        assert!(sensitive.contains(&"explicit".to_string()));
        assert!(!sensitive.contains(&"background".to_string()));
        // "sex" appears in both the group and the extras
        assert_eq!(sensitive.iter().filter(|w| *w == "sex").count(), 1);
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("capscan.toml");
        fs::write(
            &path,
            r#"
root_paths = ["/data/set_a"]
skip_folders = [".bf", "rejected"]

[save]
max_attempts = 3
"#,
        )
        .unwrap();

        let config = load_configuration(Some(&path)).unwrap();
        assert_eq!(config.root_paths, vec!["/data/set_a".to_string()]);
        assert_eq!(config.skip_folders.len(), 2);
        assert_eq!(config.save.max_attempts, 3);
        assert_eq!(config.save.retry_delay_ms, 2000);
        assert_eq!(config.report.column_width, 20);
        assert_eq!(config.tags.sentinel, "uncensored");
        assert_eq!(config.tags.categories.len(), 6);
    }

    #[test]
    fn test_toml_output_reloads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("roundtrip.toml");
        let original = AppConfig::default();
        fs::write(&path, original.to_toml().unwrap()).unwrap();

        let reloaded = load_configuration(Some(&path)).unwrap();
        assert_eq!(reloaded.skip_extensions, original.skip_extensions);
        assert_eq!(reloaded.tags.categories, original.tags.categories);
    }
}
