use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "survey-scanner";
const DEFAULT_DB_FILE: &str = "survey_scanner.db";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub db_file: String,
    pub log_filter: String,
}

impl Settings {
    /// Load `.env` from the working directory and the data directory, then read the environment.
    ///
    /// Values already set in the process environment win over both files.
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        let data_dir = resolve_data_dir(std::env::var("SURVEY_DATA_DIR").ok());
        // Production users can keep credentials next to the database.
        let env_path = data_dir.join(".env");
        if env_path.exists() {
            let _ = dotenvy::from_path(&env_path);
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Settings {
            data_dir: resolve_data_dir(non_empty("SURVEY_DATA_DIR")),
            db_file: non_empty("SURVEY_DB_FILE").unwrap_or_else(|| DEFAULT_DB_FILE.to_string()),
            log_filter: non_empty("SURVEY_LOG")
                .or_else(|| non_empty("RUST_LOG"))
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        let file = Path::new(&self.db_file);
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.data_dir.join(file)
        }
    }
}

fn resolve_data_dir(explicit: Option<String>) -> PathBuf {
    match explicit.filter(|v| !v.trim().is_empty()) {
        Some(dir) => PathBuf::from(dir.trim()),
        None => dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let s = settings(&[]);
        assert_eq!(s.db_file, DEFAULT_DB_FILE);
        assert_eq!(s.log_filter, "info");
        assert!(s.data_dir.ends_with(APP_DIR_NAME));
    }

    #[test]
    fn explicit_values_win() {
        let s = settings(&[
            ("SURVEY_DATA_DIR", "/tmp/surveys"),
            ("SURVEY_DB_FILE", "other.db"),
            ("RUST_LOG", "warn"),
            ("SURVEY_LOG", "survey_scanner_lib=debug"),
        ]);
        assert_eq!(s.db_path(), PathBuf::from("/tmp/surveys/other.db"));
        assert_eq!(s.log_filter, "survey_scanner_lib=debug");
    }

    #[test]
    fn rust_log_is_the_fallback_filter() {
        let s = settings(&[("RUST_LOG", "debug"), ("SURVEY_LOG", "  ")]);
        assert_eq!(s.log_filter, "debug");
    }

    #[test]
    fn absolute_db_file_ignores_data_dir() {
        let s = settings(&[("SURVEY_DATA_DIR", "/data"), ("SURVEY_DB_FILE", "/var/lib/survey.db")]);
        assert_eq!(s.db_path(), PathBuf::from("/var/lib/survey.db"));
    }
}
