use std::{env,fs,io};
use std::path::PathBuf;
use std::str::FromStr;

use log::LevelFilter;
use serde::Deserialize;

const CONFIG_ENV: &str = "MYSH_CONFIG";
const DEFAULT_PROMPT: &str = "shell >> ";

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	pub prompt: String,
	/// Color applied once at startup, same names as the `color` builtin.
	pub color: Option<String>,
	pub log_file: Option<PathBuf>,
	pub log_level: String,
}

impl Default for Config {
	fn default() -> Config {
		Config {
			prompt: DEFAULT_PROMPT.to_string(),
			color: None,
			log_file: None,
			log_level: "info".to_string(),
		}
	}
}

impl Config {
	pub fn parse(text: &str) -> Result<Config, toml::de::Error> {
		toml::from_str(text)
	}

	pub fn level_filter(&self) -> LevelFilter {
		LevelFilter::from_str(&self.log_level).unwrap_or(LevelFilter::Info)
	}

	/// `$MYSH_CONFIG`, else `~/.config/mysh/config.toml`.
	pub fn locate() -> Option<PathBuf> {
		if let Some(path) = env::var_os(CONFIG_ENV) {
			return Some(PathBuf::from(path));
		}
		env::var_os("HOME").map(|home| PathBuf::from(home).join(".config/mysh/config.toml"))
	}

	/// Loads the user's config. A missing default file is not an error; an
	/// unreadable or malformed one is reported and defaults are used.
	pub fn load() -> Config {
		let path = match Config::locate() {
			Some(p) => p,
			None => return Config::default(),
		};
		let text = match fs::read_to_string(&path) {
			Ok(t) => t,
			Err(ref e) if e.kind() == io::ErrorKind::NotFound && env::var_os(CONFIG_ENV).is_none() => {
				return Config::default();
			},
			Err(e) => {
				eprintln!("mysh: cannot read {}: {}", path.display(), e);
				return Config::default();
			},
		};
		match Config::parse(&text) {
			Ok(c) => c,
			Err(e) => {
				eprintln!("mysh: invalid config {}: {}", path.display(), e);
				Config::default()
			},
		}
	}
}
