use listing_deck_core::config::FileType;
use serial_test::serial;
use std::env;
use std::fs::write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;

fn config_file(yaml: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), yaml).unwrap();
    file
}

/// A full config with every section set, and the token taken from the environment.
#[tokio::test]
#[serial]
async fn test_load_config_success_with_export_section() {
    let config_file = config_file(
        r#"
design:
  base_url: https://design.example.com
  design_id: DAF123
  request_timeout_secs: 10
listings:
  - id: A
    image_url: https://images.example.com/a.jpg
  - id: B
    image_url: https://images.example.com/b.jpg
export:
  accepted_file_types: [png, svg]
  timeout_secs: 60
  poll_interval_ms: 500
  name_prefix: listing
  output_dir: ./tmp/exports
"#,
    );
    env::set_var("DESIGN_API_TOKEN", "secret-token");

    let config = listing_deck::load_config::load_config(config_file.path()).expect("Config should load");

    assert_eq!(config.api_token, "secret-token");
    assert_eq!(config.design.base_url, "https://design.example.com");
    assert_eq!(config.design.design_id.as_deref(), Some("DAF123"));
    assert_eq!(config.design.request_timeout(), Duration::from_secs(10));
    let ids: Vec<&str> = config.listings.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B"]);
    assert_eq!(config.listings[1].image_url, "https://images.example.com/b.jpg");

    let settings = config.export.settings();
    assert_eq!(settings.accepted_file_types, vec![FileType::Png, FileType::Svg]);
    assert_eq!(settings.timeout, Duration::from_secs(60));
    assert_eq!(settings.name_prefix, "listing");
    assert_eq!(config.export.poll_interval(), Duration::from_millis(500));
    assert_eq!(config.export.output_dir, PathBuf::from("./tmp/exports"));
}

/// The export section and the pinned design are optional.
#[tokio::test]
#[serial]
async fn test_load_config_defaults_export_section() {
    let config_file = config_file(
        r#"
design:
  base_url: https://design.example.com
listings: []
"#,
    );
    env::set_var("DESIGN_API_TOKEN", "secret-token");

    let config = listing_deck::load_config::load_config(config_file.path()).expect("Config should load");

    assert!(config.design.design_id.is_none());
    assert_eq!(config.design.request_timeout(), Duration::from_secs(30));
    assert!(config.listings.is_empty());
    let settings = config.export.settings();
    assert_eq!(settings.accepted_file_types, FileType::default_allow_list());
    assert_eq!(settings.timeout, Duration::from_secs(300));
    assert_eq!(settings.name_prefix, "exported");
    assert_eq!(config.export.poll_interval(), Duration::from_millis(2000));
    assert_eq!(config.export.output_dir, PathBuf::from("./exports"));
}

#[tokio::test]
#[serial]
async fn test_load_config_errors_without_token() {
    let config_file = config_file("design:\n  base_url: https://design.example.com\n");
    env::remove_var("DESIGN_API_TOKEN");

    let err = listing_deck::load_config::load_config(config_file.path()).unwrap_err();

    assert!(err.to_string().contains("DESIGN_API_TOKEN"), "got: {err}");
}

#[tokio::test]
#[serial]
async fn test_load_config_errors_on_empty_allow_list() {
    let config_file = config_file(
        "design:\n  base_url: https://design.example.com\nexport:\n  accepted_file_types: []\n",
    );
    env::set_var("DESIGN_API_TOKEN", "secret-token");

    let err = listing_deck::load_config::load_config(config_file.path()).unwrap_err();

    assert!(err.to_string().contains("accepted_file_types"), "got: {err}");
}

#[tokio::test]
#[serial]
async fn test_load_config_errors_on_unknown_file_type() {
    let config_file = config_file(
        "design:\n  base_url: https://design.example.com\nexport:\n  accepted_file_types: [bmp]\n",
    );
    env::set_var("DESIGN_API_TOKEN", "secret-token");

    let err = listing_deck::load_config::load_config(config_file.path()).unwrap_err();

    assert!(err.to_string().contains("YAML"), "Parse error expected, got: {err}");
}

/// Invalid YAML is reported as a parse failure.
#[tokio::test]
#[serial]
async fn test_load_config_errors_for_invalid_file() {
    let config_file = config_file("not-yaml: [:::");
    env::set_var("DESIGN_API_TOKEN", "secret-token");

    let err = listing_deck::load_config::load_config(config_file.path()).unwrap_err();
    let msg = err.to_string();
    assert!(
        msg.contains("parse") || msg.contains("YAML"),
        "Parse error expected, got: {msg}"
    );
}
