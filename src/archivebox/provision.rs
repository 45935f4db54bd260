//! One-time bootstrap of the ArchiveBox compose project.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde_yaml::{Mapping, Value};
use tracing::info;

use super::compose::{execute, ArchiveBoxCli};
use crate::config::Config;
use crate::error::{ArchiveError, ArchiveResult};

/// Oldest Docker release with the compose features ArchiveBox needs.
const MIN_DOCKER_VERSION: (u32, u32, u32) = (17, 6, 0);

/// Timeout for `docker --version` style probes and the compose download.
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

static DOCKER_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Docker version ((\d+)\.(\d+)\.(\d+))").unwrap());

/// Parse `docker --version` output into a version triple.
#[must_use]
pub fn parse_docker_version(output: &str) -> Option<(u32, u32, u32)> {
    let caps = DOCKER_VERSION.captures(output)?;
    Some((
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
        caps[4].parse().ok()?,
    ))
}

/// Check a `docker --version` output against the minimum version.
///
/// # Errors
///
/// Returns an error if the output cannot be parsed or the version is too old.
pub fn check_docker_version_output(output: &str) -> ArchiveResult<String> {
    let parse_failed = || ArchiveError::Provision("Failed to parse Docker version.".to_string());
    let version = DOCKER_VERSION
        .captures(output)
        .map(|caps| caps[1].to_string())
        .ok_or_else(parse_failed)?;
    let triple = parse_docker_version(output).ok_or_else(parse_failed)?;
    if triple >= MIN_DOCKER_VERSION {
        Ok(version)
    } else {
        Err(ArchiveError::Provision(format!(
            "Docker version {version} is not sufficient. Please upgrade to 17.06.0 or later."
        )))
    }
}

async fn check_docker_version() -> ArchiveResult<String> {
    let output = execute("docker", &["--version".to_string()], None, PROBE_TIMEOUT)
        .await
        .map_err(|e| ArchiveError::Provision(format!("Error checking Docker version: {e}")))?;
    let version = check_docker_version_output(&output.stdout)?;
    info!(version = %version, "Docker version is sufficient");
    Ok(version)
}

async fn check_docker_compose() -> ArchiveResult<()> {
    let args = ["compose", "version"].map(String::from);
    execute("docker", &args, None, PROBE_TIMEOUT)
        .await
        .map_err(|e| ArchiveError::Provision(format!("Error checking Docker Compose: {e}")))?;
    info!("Docker Compose is available");
    Ok(())
}

async fn download_compose_file(config: &Config) -> ArchiveResult<String> {
    let fail = |e: reqwest::Error| {
        ArchiveError::Provision(format!("Failed to download docker-compose.yml: {e}"))
    };

    let mut builder = reqwest::Client::builder().timeout(PROBE_TIMEOUT);
    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy).map_err(fail)?);
    }
    let client = builder.build().map_err(fail)?;

    client
        .get(&config.docker_compose_url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(fail)?
        .text()
        .await
        .map_err(fail)
}

/// Apply credentials, timezone, image pin, and port mapping to a compose file.
///
/// # Errors
///
/// Returns an error if the YAML is invalid or has no `services.archivebox` mapping.
pub fn patch_compose(yaml: &str, config: &Config) -> ArchiveResult<String> {
    let invalid = |msg: String| ArchiveError::Provision(format!("Invalid docker-compose.yml: {msg}"));

    let mut doc: Value = serde_yaml::from_str(yaml).map_err(|e| invalid(e.to_string()))?;
    let service = doc
        .get_mut("services")
        .and_then(|services| services.get_mut("archivebox"))
        .and_then(Value::as_mapping_mut)
        .ok_or_else(|| invalid("missing services.archivebox".to_string()))?;

    if let (Some(user), Some(password)) = (&config.admin_username, &config.admin_password) {
        push_environment(service, "ADMIN_USERNAME", user);
        push_environment(service, "ADMIN_PASSWORD", password);
    }
    if let Some(tz) = &config.time_zones {
        push_environment(service, "TZ", tz);
    }
    if let Some(version) = &config.archivebox_version {
        service.insert(
            Value::String("image".to_string()),
            Value::String(format!("archivebox/archivebox:{version}")),
        );
    }
    if let Some(ports) = &config.deployment_ports {
        push_sequence(service, "ports", Value::String(ports.clone()));
    }

    serde_yaml::to_string(&doc).map_err(|e| invalid(e.to_string()))
}

fn push_environment(service: &mut Mapping, key: &str, value: &str) {
    match service.get_mut("environment") {
        Some(Value::Mapping(env)) => {
            env.insert(
                Value::String(key.to_string()),
                Value::String(value.to_string()),
            );
        }
        _ => push_sequence(service, "environment", Value::String(format!("{key}={value}"))),
    }
}

fn push_sequence(service: &mut Mapping, key: &str, value: Value) {
    if let Some(Value::Sequence(items)) = service.get_mut(key) {
        items.push(value);
        return;
    }
    service.insert(Value::String(key.to_string()), Value::Sequence(vec![value]));
}

/// Provision the ArchiveBox project and start its server.
///
/// # Errors
///
/// Returns the first failing step's error; later steps are not attempted.
pub async fn initialize(config: &Config, cli: &dyn ArchiveBoxCli) -> ArchiveResult<String> {
    check_docker_version().await?;
    check_docker_compose().await?;

    tokio::fs::create_dir_all(&config.project_dir)
        .await
        .map_err(|e| {
            ArchiveError::Provision(format!(
                "Failed to create project directory {}: {e}",
                config.project_dir.display()
            ))
        })?;

    let compose = download_compose_file(config).await?;
    let patched = patch_compose(&compose, config)?;
    let compose_path = config.compose_file();
    tokio::fs::write(&compose_path, patched).await.map_err(|e| {
        ArchiveError::Provision(format!(
            "Failed to write {}: {e}",
            compose_path.display()
        ))
    })?;
    info!(path = %compose_path.display(), "Wrote docker-compose.yml");

    cli.run(&["init".to_string(), "--setup".to_string()]).await?;
    info!("ArchiveBox collection initialized");

    cli.up().await.map_err(|e| {
        ArchiveError::Provision(format!("Failed to start ArchiveBox server: {e}"))
    })?;

    Ok("ArchiveBox server started successfully.".to_string())
}
