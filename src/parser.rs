use crate::error::ShellError;
use crate::types::*;

use log::debug;

struct Parser<'a> {
	line: &'a [u8],
	i: usize,
}

impl<'a> Parser<'a> {
	fn new(line: &'a [u8]) -> Parser<'a> {
		Parser { line: line, i: 0 }
	}

	fn peek(&self) -> Option<u8> {
		self.line.get(self.i).cloned()
	}

	fn proceed_while<F>(&mut self, f: F) where F: Fn(u8) -> bool {
		while let Some(c) = self.line.get(self.i) {
			if !f(*c) { break; }
			self.i += 1;
		}
	}

	// '&' is the background marker; it never ends up inside an argument.
	fn is_delimiter(c: u8) -> bool {
		match c {
			b' ' | b'&' => true,
			_ => false,
		}
	}

	fn is_letter(c: u8) -> bool {
		c != b'"' && !Parser::is_delimiter(c)
	}

	fn skip_delimiters(&mut self) {
		self.proceed_while(Parser::is_delimiter);
	}

	fn read_word(&mut self) -> &'a [u8] {
		let orig = self.i;
		self.proceed_while(Parser::is_letter);
		&self.line[orig .. self.i]
	}

	/// Reads a double-quoted span starting at the opening quote. An
	/// unterminated span runs to the end of the line.
	fn read_quoted(&mut self) -> &'a [u8] {
		self.i += 1;
		let orig = self.i;
		self.proceed_while(|c| c != b'"');
		let span = &self.line[orig .. self.i];
		if self.peek() == Some(b'"') {
			self.i += 1;
		}
		span
	}

	fn skip_quoted(&mut self) {
		let _ = self.read_quoted();
	}
}

fn trim(mut s: &[u8]) -> &[u8] {
	let is_trimmed = |c: &u8| *c == b' ' || *c == b'&';
	while s.first().map_or(false, is_trimmed) {
		s = &s[1..];
	}
	while s.last().map_or(false, is_trimmed) {
		s = &s[.. s.len() - 1];
	}
	s
}

/// Splits one segment into its arguments. Double-quoted spans become a
/// single argument with the quotes removed.
pub fn tokenize<'a>(segment: &'a [u8]) -> Vec<&'a [u8]> {
	let mut parser = Parser::new(segment);
	let mut tokens: Vec<&'a [u8]> = vec![];
	loop {
		parser.skip_delimiters();
		match parser.peek() {
			None => { break; },
			Some(b'"') => tokens.push(parser.read_quoted()),
			Some(_) => tokens.push(parser.read_word()),
		}
	}
	tokens
}

/// Splits a line on `|` and `;` outside quotes. Returns the non-empty
/// segments and whether an unquoted `&` appeared anywhere in the line.
pub fn split_pipeline<'a>(line: &'a [u8]) -> (Vec<&'a [u8]>, bool) {
	let mut parser = Parser::new(line);
	let mut segments: Vec<&'a [u8]> = vec![];
	let mut is_background = false;
	let mut start = 0;
	let push = |segments: &mut Vec<&'a [u8]>, s: &'a [u8]| {
		let s = trim(s);
		if !s.is_empty() {
			segments.push(s);
		}
	};
	while let Some(c) = parser.peek() {
		match c {
			b'"' => {
				parser.skip_quoted();
				continue;
			},
			b'&' => { is_background = true; },
			b'|' | b';' => {
				push(&mut segments, &line[start .. parser.i]);
				start = parser.i + 1;
			},
			_ => {},
		}
		parser.i += 1;
	}
	push(&mut segments, &line[start ..]);
	(segments, is_background)
}

/// Strips a trailing `> file`, `>> file` or `< file` from the arguments.
/// Only the second-to-last position is inspected, so at most one redirect
/// is recognized per segment.
pub fn resolve<'a>(mut tokens: Vec<&'a [u8]>) -> (Vec<&'a [u8]>, RedirectSpec<'a>) {
	let len = tokens.len();
	if len <= 1 {
		return (tokens, RedirectSpec::None);
	}
	let op = tokens[len - 2];
	let target = tokens[len - 1];
	let redirect = if op == b">>" {
		RedirectSpec::OutputAppend(target)
	} else if op.first() == Some(&b'>') {
		RedirectSpec::OutputTruncate(target)
	} else if op == b"<" {
		RedirectSpec::Input(target)
	} else {
		RedirectSpec::None
	};
	if !redirect.is_none() {
		tokens.truncate(len - 2);
	}
	(tokens, redirect)
}

fn parse_segment<'a>(segment: &'a [u8]) -> Result<Segment<'a>, ShellError> {
	let (args, redirect) = resolve(tokenize(segment));
	if args.is_empty() {
		return Err(ShellError::EmptyCommand);
	}
	Ok(Segment { args: args, redirect: redirect })
}

/// Parses one input line. A line with nothing to run yields `Ok(None)`.
pub fn parse<'a>(line: &'a [u8]) -> Result<Option<Pipeline<'a>>, ShellError> {
	let (segments, is_background) = split_pipeline(line);
	if segments.is_empty() {
		return Ok(None);
	}
	let segments = segments.into_iter().map(parse_segment).collect::<Result<Vec<_>, _>>()?;
	let pipeline = Pipeline { segments: segments, is_background: is_background };
	debug!("parsed {:?}", pipeline);
	Ok(Some(pipeline))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn tokenize_keeps_quoted_span_together() {
		assert_eq!(tokenize(b"echo \"hello world\" foo"), vec![&b"echo"[..], b"hello world", b"foo"]);
	}

	#[test]
	fn tokenize_empty() {
		assert!(tokenize(b"").is_empty());
		assert!(tokenize(b"   ").is_empty());
	}

	#[test]
	fn tokenize_collapses_repeated_spaces() {
		assert_eq!(tokenize(b"ls   -l  "), vec![&b"ls"[..], b"-l"]);
	}

	#[test]
	fn tokenize_unterminated_quote_runs_to_end() {
		assert_eq!(tokenize(b"echo \"abc def"), vec![&b"echo"[..], b"abc def"]);
	}

	#[test]
	fn tokenize_empty_quotes_give_empty_argument() {
		assert_eq!(tokenize(b"printf \"\" x"), vec![&b"printf"[..], b"", b"x"]);
	}

	#[test]
	fn tokenize_drops_background_marker() {
		assert_eq!(tokenize(b"sleep 1 &"), vec![&b"sleep"[..], b"1"]);
		assert_eq!(tokenize(b"echo \"a & b\""), vec![&b"echo"[..], b"a & b"]);
	}

	#[test]
	fn split_three_stages() {
		let (segments, bg) = split_pipeline(b"a | b | c");
		assert_eq!(segments, vec![&b"a"[..], b"b", b"c"]);
		assert!(!bg);
	}

	#[test]
	fn split_background() {
		let (segments, bg) = split_pipeline(b"a & ");
		assert_eq!(segments, vec![&b"a"[..]]);
		assert!(bg);
	}

	#[test]
	fn split_ignores_separators_in_quotes() {
		let (segments, bg) = split_pipeline(b"echo \"a|b;c&\" | cat");
		assert_eq!(segments, vec![&b"echo \"a|b;c&\""[..], b"cat"]);
		assert!(!bg);
	}

	#[test]
	fn split_semicolon_is_a_separator() {
		let (segments, _) = split_pipeline(b"echo one; echo two");
		assert_eq!(segments, vec![&b"echo one"[..], b"echo two"]);
	}

	#[test]
	fn split_drops_empty_segments() {
		let (segments, _) = split_pipeline(b"ls |");
		assert_eq!(segments, vec![&b"ls"[..]]);
		let (segments, bg) = split_pipeline(b" ; ");
		assert!(segments.is_empty());
		assert!(!bg);
	}

	#[test]
	fn resolve_truncate() {
		let (args, redirect) = resolve(vec![&b"ls"[..], b"-l", b">", b"out.txt"]);
		assert_eq!(args, vec![&b"ls"[..], b"-l"]);
		assert_eq!(redirect, RedirectSpec::OutputTruncate(b"out.txt"));
	}

	#[test]
	fn resolve_append() {
		let (args, redirect) = resolve(vec![&b"echo"[..], b"hi", b">>", b"log"]);
		assert_eq!(args, vec![&b"echo"[..], b"hi"]);
		assert_eq!(redirect, RedirectSpec::OutputAppend(b"log"));
	}

	#[test]
	fn resolve_input() {
		let (args, redirect) = resolve(vec![&b"sort"[..], b"<", b"data"]);
		assert_eq!(args, vec![&b"sort"[..]]);
		assert_eq!(redirect, RedirectSpec::Input(b"data"));
	}

	#[test]
	fn resolve_only_inspects_second_to_last() {
		let tokens = vec![&b"sort"[..], b"<", b"in", b">", b"out"];
		let (args, redirect) = resolve(tokens);
		assert_eq!(args, vec![&b"sort"[..], b"<", b"in"]);
		assert_eq!(redirect, RedirectSpec::OutputTruncate(b"out"));

		let (args, redirect) = resolve(vec![&b">"[..]]);
		assert_eq!(args, vec![&b">"[..]]);
		assert_eq!(redirect, RedirectSpec::None);
	}

	#[test]
	fn parse_pipeline() {
		let pipeline = parse(b"cat < in | sort > out &").unwrap().unwrap();
		assert!(pipeline.is_background);
		assert_eq!(pipeline.segments, vec![
			Segment { args: vec![&b"cat"[..]], redirect: RedirectSpec::Input(b"in") },
			Segment { args: vec![&b"sort"[..]], redirect: RedirectSpec::OutputTruncate(b"out") },
		]);
	}

	#[test]
	fn parse_blank_line() {
		assert_eq!(parse(b"").unwrap(), None);
		assert_eq!(parse(b"  & ").unwrap(), None);
	}

	#[test]
	fn parse_rejects_redirect_without_command() {
		match parse(b"> out") {
			Err(ShellError::EmptyCommand) => {},
			r => panic!("unexpected {:?}", r),
		}
	}
}
