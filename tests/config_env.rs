// tests/config_env.rs
use health_reconciler::config::reconcile::{DEFAULT_CONFIG_PATH, ENV_CONFIG_PATH};
use health_reconciler::ReconcileConfig;
use std::path::PathBuf;
use std::{env, fs};

const OVERRIDES: [&str; 6] = [
    "APPLE_EXPORT_PATH",
    "OURA_EXPORT_PATH",
    "STRAVA_EXPORT_PATH",
    "UNIFIED_OUTPUT_PATH",
    "PRIORITY_TABLE_PATH",
    "SLEEP_CUTOFF_HOUR",
];

fn clear_env() {
    env::remove_var(ENV_CONFIG_PATH);
    for k in OVERRIDES {
        env::remove_var(k);
    }
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallback_file_then_builtins() {
    // isolate CWD so the repo's own config/ is not read
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    clear_env();

    // 1) nothing → built-in defaults
    let cfg = ReconcileConfig::load_default().unwrap();
    assert_eq!(cfg, ReconcileConfig::default());

    // 2) fallback TOML in ./config/
    fs::create_dir_all(tmp.path().join("config")).unwrap();
    fs::write(
        tmp.path().join(DEFAULT_CONFIG_PATH),
        r#"output_path = "from-fallback.json""#,
    )
    .unwrap();
    let cfg = ReconcileConfig::load_default().unwrap();
    assert_eq!(cfg.output_path, PathBuf::from("from-fallback.json"));

    // 3) explicit env path wins over the fallback
    let explicit = tmp.path().join("other.toml");
    fs::write(&explicit, r#"output_path = "from-env.json""#).unwrap();
    env::set_var(ENV_CONFIG_PATH, &explicit);
    let cfg = ReconcileConfig::load_default().unwrap();
    assert_eq!(cfg.output_path, PathBuf::from("from-env.json"));

    // 4) env path that does not exist is an error
    env::set_var(ENV_CONFIG_PATH, tmp.path().join("nope.toml"));
    assert!(ReconcileConfig::load_default().is_err());

    clear_env();
    env::set_current_dir(old).unwrap();
}

#[serial_test::serial]
#[test]
fn individual_env_vars_override_file_values() {
    let tmp = tempfile::tempdir().unwrap();
    clear_env();

    let file = tmp.path().join("reconcile.toml");
    fs::write(
        &file,
        r#"
output_path = "file.json"

[sources]
apple = "file/export.xml"

[normalize]
sleep_cutoff_hour = 4
"#,
    )
    .unwrap();

    env::set_var("APPLE_EXPORT_PATH", "env/export.xml");
    env::set_var("UNIFIED_OUTPUT_PATH", "env.json");
    env::set_var("SLEEP_CUTOFF_HOUR", "5");

    let cfg = ReconcileConfig::load_from_file(&file).unwrap();
    assert_eq!(cfg.sources.apple, Some(PathBuf::from("env/export.xml")));
    assert_eq!(cfg.output_path, PathBuf::from("env.json"));
    assert_eq!(cfg.normalize.sleep_cutoff_hour, 5);

    env::set_var("SLEEP_CUTOFF_HOUR", "twenty");
    assert!(ReconcileConfig::load_from_file(&file).is_err());

    env::set_var("SLEEP_CUTOFF_HOUR", "24");
    assert!(ReconcileConfig::load_from_file(&file).is_err());

    clear_env();
}

#[serial_test::serial]
#[test]
fn malformed_toml_is_an_error() {
    clear_env();
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("bad.toml");
    fs::write(&file, "output_path = [").unwrap();
    let err = ReconcileConfig::load_from_file(&file).unwrap_err();
    assert!(format!("{err:#}").contains("parsing config"));
}
