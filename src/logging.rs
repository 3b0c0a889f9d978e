use std::fs;

use log::info;
use simplelog::WriteLogger;

use crate::config::Config;

/// Installs a file logger when `log_file` is configured. Without one no
/// logger is installed and the `log` macros are no-ops.
pub fn init(config: &Config) {
	let path = match config.log_file {
		Some(ref p) => p,
		None => return,
	};
	let file = match fs::OpenOptions::new().create(true).append(true).open(path) {
		Ok(f) => f,
		Err(e) => {
			eprintln!("mysh: cannot open log file {}: {}", path.display(), e);
			return;
		},
	};
	if WriteLogger::init(config.level_filter(), simplelog::Config::default(), file).is_ok() {
		info!("mysh started, pid {}", std::process::id());
	}
}
