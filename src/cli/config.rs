use std::fs;
use std::path::{Path, PathBuf};

use crate::client::Credential;

const SESSION_FILE: &str = "session.json";

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("PROFILE_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("profile-sync")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn load_session() -> anyhow::Result<Option<Credential>> {
    load_session_from(&get_config_dir()?)
}

pub fn save_session(credential: &Credential) -> anyhow::Result<()> {
    save_session_to(&get_config_dir()?, credential)
}

pub fn clear_session() -> anyhow::Result<()> {
    clear_session_in(&get_config_dir()?)
}

pub fn load_session_from(dir: &Path) -> anyhow::Result<Option<Credential>> {
    let session_file = dir.join(SESSION_FILE);

    if !session_file.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(session_file)?;
    let credential: Credential = serde_json::from_str(&content)?;
    Ok(Some(credential))
}

pub fn save_session_to(dir: &Path, credential: &Credential) -> anyhow::Result<()> {
    let session_file = dir.join(SESSION_FILE);

    let content = serde_json::to_string_pretty(credential)?;
    fs::write(session_file, content)?;
    Ok(())
}

pub fn clear_session_in(dir: &Path) -> anyhow::Result<()> {
    let session_file = dir.join(SESSION_FILE);

    if session_file.exists() {
        fs::remove_file(session_file)?;
    }
    Ok(())
}
