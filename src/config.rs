use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_glow")]
    pub glow: bool,
}

#[derive(Debug, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_mb")]
    pub max_mb: u64,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            glow: default_glow(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_mb: default_max_mb(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 200 }
fn default_fps() -> u32 { 60 }
fn default_glow() -> bool { true }
fn default_max_mb() -> u64 { crate::upload::DEFAULT_MAX_MB }
fn default_port() -> u16 { 3000 }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            log::debug!("Invalid config {}: {}", path.display(), e);
            None
        }
    }
}

/// Local `beatbuddy.toml`, then `~/.config/beatbuddy/config.toml`, then the
/// platform config directory.
pub fn discover() -> Option<PathBuf> {
    let local = PathBuf::from("beatbuddy.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("beatbuddy").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("beatbuddy").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn empty_file_uses_defaults() {
        let file = write_config("");
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.render.width, 800);
        assert_eq!(cfg.render.height, 200);
        assert_eq!(cfg.render.fps, 60);
        assert!(cfg.render.glow);
        assert_eq!(cfg.upload.max_mb, 50);
        assert_eq!(cfg.server.port, 3000);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let file = write_config("[render]\nwidth = 1280\nglow = false\n\n[server]\nport = 8080\n");
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.render.width, 1280);
        assert_eq!(cfg.render.height, 200);
        assert!(!cfg.render.glow);
        assert_eq!(cfg.upload.max_mb, 50);
        assert_eq!(cfg.server.port, 8080);
    }

    #[test]
    fn malformed_or_missing_file_is_none() {
        let file = write_config("[render\nwidth = ");
        assert!(load_config(file.path()).is_none());
        assert!(load_config(Path::new("/nonexistent/beatbuddy.toml")).is_none());
    }
}
