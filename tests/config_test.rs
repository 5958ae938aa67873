use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use camino::Utf8Path;
use distro_probe::DistroError;
use distro_probe::config::{Config, load_config};
use distro_probe::executor::CommandExecutor;
use distro_probe::privilege::PrivilegeMethod;
use tempfile::NamedTempFile;

mod helpers;

fn write_config(yaml: &str) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(yaml.as_bytes())?;
    Ok(file)
}

fn load(file: &NamedTempFile) -> Result<Config> {
    let path = Utf8Path::from_path(file.path()).expect("utf-8 temp path");
    load_config(path)
}

#[test]
fn test_load_full_config() -> Result<()> {
    let file = write_config(
        r#"---
scratch_dir: /srv/scratch
arch: i686
privilege: doas
http:
  timeout_secs: 15
ftp:
  user: mirror
  password: secret
"#,
    )?;
    let config = load(&file)?;
    config.validate()?;

    assert_eq!(config.scratch_dir, "/srv/scratch");
    assert_eq!(config.arch.as_deref(), Some("i686"));
    assert_eq!(config.privilege, Some(PrivilegeMethod::Doas));

    let executor: Arc<dyn CommandExecutor> = Arc::new(helpers::RecordingExecutor::default());
    let settings = config.transport_settings(executor);
    assert_eq!(settings.timeout, Duration::from_secs(15));
    assert_eq!(settings.privilege, Some(PrivilegeMethod::Doas));
    assert_eq!(settings.ftp_credentials, Some(("mirror".to_string(), "secret".to_string())));
    Ok(())
}

#[test]
fn test_empty_sections_take_defaults() -> Result<()> {
    let file = write_config("---\nhttp: {}\n")?;
    let config = load(&file)?;

    assert_eq!(config, Config::default());
    let executor: Arc<dyn CommandExecutor> = Arc::new(helpers::RecordingExecutor::default());
    assert_eq!(config.transport_settings(executor).ftp_credentials, None);
    Ok(())
}

#[test]
fn test_unknown_field_rejected() -> Result<()> {
    let file = write_config("---\nscratch: /tmp\n")?;
    let err = load(&file).unwrap_err();
    assert!(format!("{:#}", err).contains("unknown field"), "{:#}", err);
    Ok(())
}

#[test]
fn test_invalid_values_rejected() -> Result<()> {
    let file = write_config("---\nscratch_dir: relative/dir\n")?;
    assert!(matches!(load(&file)?.validate(), Err(DistroError::Config(_))));

    let file = write_config("---\nhttp:\n  timeout_secs: 0\n")?;
    assert!(matches!(load(&file)?.validate(), Err(DistroError::Config(_))));

    let file = write_config("---\nftp:\n  password: secret\n")?;
    assert!(matches!(load(&file)?.validate(), Err(DistroError::Config(_))));
    Ok(())
}

#[test]
fn test_missing_file_reports_path() {
    let err = load_config(Utf8Path::new("/nonexistent/distro-probe.yaml")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/distro-probe.yaml"));
}
