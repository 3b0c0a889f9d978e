use crate::error::ShellError;
use crate::global;

use std::{env,str};
use std::io::Write;
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;
use nix::errno::Errno;
use nix::unistd;

pub type Builtin = fn(&mut global::State, &[&[u8]], &mut dyn Write) -> Result<u8, ShellError>;

const COLORS: [(&[u8], &str); 13] = [
	(b"red", "\x1b[0;31m"),
	(b"bred", "\x1b[1;31m"),
	(b"green", "\x1b[0;32m"),
	(b"bgreen", "\x1b[1;32m"),
	(b"yellow", "\x1b[0;33m"),
	(b"byellow", "\x1b[01;33m"),
	(b"blue", "\x1b[0;34m"),
	(b"bblue", "\x1b[1;34m"),
	(b"magenta", "\x1b[0;35m"),
	(b"bmagenta", "\x1b[1;35m"),
	(b"cyan", "\x1b[0;36m"),
	(b"bcyan", "\x1b[1;36m"),
	(b"reset", "\x1b[0m"),
];

const CLEAR_SCREEN: &[u8] = b"\x1b[2J\x1b[H";

pub fn color_code(name: &[u8]) -> Option<&'static str> {
	COLORS.iter().find(|&&(n, _)| n == name).map(|&(_, code)| code)
}

pub fn builtin_exit(state: &mut global::State, args: &[&[u8]], _: &mut dyn Write) -> Result<u8, ShellError> {
	let code = args.first()
		.and_then(|a| str::from_utf8(a).ok())
		.and_then(|a| a.parse::<i32>().ok())
		.unwrap_or(0);
	state.should_exit = Some(code);
	Ok(0)
}

pub fn builtin_clear(_: &mut global::State, _: &[&[u8]], out: &mut dyn Write) -> Result<u8, ShellError> {
	out.write_all(CLEAR_SCREEN)?;
	out.flush()?;
	Ok(0)
}

pub fn builtin_cd(_: &mut global::State, args: &[&[u8]], _: &mut dyn Write) -> Result<u8, ShellError> {
	let dir = match args.first() {
		Some(d) => PathBuf::from(OsStr::from_bytes(d)),
		None => match env::var_os("HOME") {
			Some(home) => PathBuf::from(home),
			None => return Err(ShellError::DirectoryChange { dir: "$HOME".to_string(), cause: Errno::ENOENT }),
		},
	};
	unistd::chdir(&dir).map_err(|e| ShellError::DirectoryChange {
		dir: dir.display().to_string(),
		cause: e,
	})?;
	Ok(0)
}

pub fn builtin_pwd(_: &mut global::State, _: &[&[u8]], out: &mut dyn Write) -> Result<u8, ShellError> {
	let cwd = env::current_dir()?;
	out.write_all(cwd.as_os_str().as_bytes())?;
	out.write_all(b"\n")?;
	Ok(0)
}

pub fn builtin_color(_: &mut global::State, args: &[&[u8]], out: &mut dyn Write) -> Result<u8, ShellError> {
	let name = args.first().cloned().unwrap_or(b"");
	match color_code(name) {
		Some(code) => {
			out.write_all(code.as_bytes())?;
			out.flush()?;
			Ok(0)
		},
		None => Err(ShellError::UnknownColor(String::from_utf8_lossy(name).into_owned())),
	}
}

pub fn match_builtin(name: &[u8]) -> Option<Builtin> {
	match name {
		b"exit" => Some(builtin_exit),
		b"clear" | b"cls" => Some(builtin_clear),
		b"cd" => Some(builtin_cd),
		b"pwd" => Some(builtin_pwd),
		b"color" => Some(builtin_color),
		_ => None,
	}
}
