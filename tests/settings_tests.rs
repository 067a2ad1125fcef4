use camino::Utf8PathBuf;
use chrono::NaiveDate;
use epss_scores::settings::{Settings, DEFAULT_BASE_URL};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_defaults() {
    let settings = Settings::default();

    assert_eq!(settings.base_url, DEFAULT_BASE_URL);
    assert_eq!(settings.min_date, NaiveDate::from_ymd_opt(2022, 7, 15).unwrap());
    assert!(!settings.case_sensitive);
    assert!(settings.workdir.ends_with("epss-scores"));
    assert!(settings
        .scores_by_date_dir()
        .ends_with("epss-scores/by/date"));
}

#[test]
fn test_toml_overrides_defaults() {
    let settings = Settings::from_toml(
        r#"
workdir = "/var/cache/epss"
min_date = "2023-03-07"
case_sensitive = true
workers = 8
"#,
    )
    .unwrap();

    assert_eq!(settings.workdir, Utf8PathBuf::from("/var/cache/epss"));
    assert_eq!(settings.min_date, NaiveDate::from_ymd_opt(2023, 3, 7).unwrap());
    assert!(settings.case_sensitive);
    assert_eq!(settings.workers, 8);
    // Untouched keys keep their defaults
    assert_eq!(settings.base_url, DEFAULT_BASE_URL);
    assert_eq!(settings.timeout_secs, 60);
}

#[test]
fn test_load_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = Utf8PathBuf::from_path_buf(temp_dir.path().join("epss.toml"))
        .expect("Invalid UTF-8 in path");

    fs::write(
        &config_path,
        "base_url = \"http://localhost:8080\"\nshow_progress = false\n",
    )
    .unwrap();

    let settings = Settings::load(Some(&config_path)).unwrap();
    assert_eq!(settings.base_url, "http://localhost:8080");
    assert!(!settings.show_progress);
}

#[test]
fn test_invalid_min_date_is_rejected() {
    assert!(Settings::from_toml("min_date = \"July 15th\"").is_err());
}
