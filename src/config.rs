use crate::theme::Theme;
use anyhow::{Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    time::Duration,
};

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "aries-chat")]
#[command(about = "Terminal chat client over an animated particle field")]
pub(crate) struct Cli {
    /// Chat service root; messages are POSTed to <endpoint>/chat
    #[arg(long)]
    pub(crate) endpoint: Option<String>,

    /// Colour theme
    #[arg(long, value_enum)]
    pub(crate) theme: Option<Theme>,

    /// Give up on a reply after this many seconds
    #[arg(long)]
    pub(crate) timeout_secs: Option<u64>,

    /// Frame rate cap (10..=120)
    #[arg(long)]
    pub(crate) fps: Option<u32>,

    /// Name shown on the assistant's messages
    #[arg(long)]
    pub(crate) bot_name: Option<String>,

    /// Seed the particle field for a reproducible animation
    #[arg(long)]
    pub(crate) seed: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) endpoint: String,
    pub(crate) theme: Theme,
    pub(crate) request_timeout_secs: u64,
    pub(crate) fps_cap: u32,
    pub(crate) bot_name: String,
    pub(crate) scroll_threshold_lines: usize,
    pub(crate) toast_secs: u64,
    #[serde(skip)]
    pub(crate) seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8000".to_string(),
            theme: Theme::Nebula,
            request_timeout_secs: 30,
            fps_cap: 30,
            bot_name: "Bot".to_string(),
            scroll_threshold_lines: 3,
            toast_secs: 5,
            seed: None,
        }
    }
}

impl Settings {
    /// Command-line values win over the settings file.
    pub(crate) fn apply_cli(&mut self, cli: &Cli) {
        if let Some(e) = &cli.endpoint {
            self.endpoint = e.clone();
        }
        if let Some(t) = cli.theme {
            self.theme = t;
        }
        if let Some(s) = cli.timeout_secs {
            self.request_timeout_secs = s;
        }
        if let Some(f) = cli.fps {
            self.fps_cap = f;
        }
        if let Some(b) = &cli.bot_name {
            self.bot_name = b.clone();
        }
        self.seed = cli.seed;
        self.fps_cap = self.fps_cap.clamp(10, 120);
        self.request_timeout_secs = self.request_timeout_secs.max(1);
        self.toast_secs = self.toast_secs.max(1);
    }

    pub(crate) fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub(crate) fn toast_ttl(&self) -> Duration {
        Duration::from_secs(self.toast_secs)
    }
}

/// Where settings and the log live on this machine.
pub(crate) struct Paths {
    pub(crate) settings_path: PathBuf,
    pub(crate) log_path: PathBuf,
}

impl Paths {
    fn in_dir(dir: &Path) -> Self {
        Self {
            settings_path: dir.join("settings.json"),
            log_path: dir.join("aries-chat.log"),
        }
    }
}

pub(crate) fn project_paths() -> Result<Paths> {
    let dirs = ProjectDirs::from("dev", "aries", "aries-chat")
        .context("no home directory to keep settings in")?;
    let data = dirs.data_dir();
    fs::create_dir_all(data).with_context(|| format!("creating {}", data.display()))?;
    Ok(Paths::in_dir(data))
}

/// A settings file that is missing or fails to parse counts as empty.
pub(crate) fn load_settings(path: &Path) -> Settings {
    fs::read(path)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}

/// Writes next to `path` first so a crash mid-write never truncates it.
pub(crate) fn save_settings_atomic(path: &Path, settings: &Settings) -> Result<()> {
    let staging = path.with_extension("json.tmp");
    {
        let file = File::create(&staging)
            .with_context(|| format!("creating {}", staging.display()))?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, settings)?;
        out.flush()?;
        out.get_ref().sync_all()?;
    }
    if cfg!(windows) && path.exists() {
        fs::remove_file(path).with_context(|| format!("removing {}", path.display()))?;
    }
    fs::rename(&staging, path).with_context(|| format!("replacing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("aries-chat-{name}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn cli_overrides_file_values() {
        let mut s = Settings::default();
        let cli = Cli::parse_from([
            "aries-chat",
            "--endpoint",
            "https://chat.example",
            "--theme",
            "ember",
            "--fps",
            "500",
            "--seed",
            "9",
        ]);
        s.apply_cli(&cli);
        assert_eq!(s.endpoint, "https://chat.example");
        assert_eq!(s.theme, Theme::Ember);
        assert_eq!(s.fps_cap, 120);
        assert_eq!(s.seed, Some(9));
        assert_eq!(s.bot_name, "Bot");
    }

    #[test]
    fn absent_flags_keep_file_values() {
        let mut s = Settings {
            bot_name: "Aries".into(),
            request_timeout_secs: 0,
            toast_secs: 0,
            ..Settings::default()
        };
        s.apply_cli(&Cli::default());
        assert_eq!(s.bot_name, "Aries");
        assert_eq!(s.request_timeout(), Duration::from_secs(1));
        // a zero lifetime would prune every toast before it is drawn
        assert_eq!(s.toast_ttl(), Duration::from_secs(1));
    }

    #[test]
    fn partial_settings_file_fills_defaults() {
        let s: Settings = serde_json::from_str(r#"{"theme":"aurora","bot_name":"Aries"}"#).unwrap();
        assert_eq!(s.theme, Theme::Aurora);
        assert_eq!(s.bot_name, "Aries");
        assert_eq!(s.request_timeout_secs, 30);
        assert_eq!(s.toast_ttl(), Duration::from_secs(5));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = scratch_dir("roundtrip");
        let path = dir.join("settings.json");
        let s = Settings {
            theme: Theme::Mono,
            endpoint: "http://10.0.0.2:9000".into(),
            ..Settings::default()
        };
        save_settings_atomic(&path, &s).unwrap();
        // second save replaces the first
        save_settings_atomic(&path, &s).unwrap();
        assert_eq!(load_settings(&path), s);
        assert!(!path.with_extension("json.tmp").exists());
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn paths_share_one_directory() {
        let dir = scratch_dir("paths");
        let p = Paths::in_dir(&dir);
        assert_eq!(p.settings_path.parent(), Some(dir.as_path()));
        assert_eq!(p.log_path.file_name().unwrap(), "aries-chat.log");
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn garbage_file_yields_defaults() {
        let dir = scratch_dir("garbage");
        let path = dir.join("settings.json");
        fs::write(&path, "{not json").unwrap();
        assert_eq!(load_settings(&path), Settings::default());
        assert_eq!(load_settings(&dir.join("missing.json")), Settings::default());
        fs::remove_dir_all(dir).ok();
    }
}
