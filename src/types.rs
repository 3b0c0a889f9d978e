/// Where a segment's standard input or output is routed instead of the
/// terminal or the neighbouring pipe.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RedirectSpec<'a> {
	None,
	OutputTruncate(&'a [u8]),
	OutputAppend(&'a [u8]),
	Input(&'a [u8]),
}

impl<'a> RedirectSpec<'a> {
	pub fn is_none(&self) -> bool {
		*self == RedirectSpec::None
	}
}

#[derive(Debug, PartialEq, Eq)]
pub struct Segment<'a> {
	pub args: Vec<&'a [u8]>,
	pub redirect: RedirectSpec<'a>,
}

impl<'a> Segment<'a> {
	pub fn name(&self) -> &'a [u8] {
		self.args[0]
	}

	pub fn arguments(&self) -> &[&'a [u8]] {
		&self.args[1..]
	}
}

/// One parsed input line. Never empty.
#[derive(Debug, PartialEq, Eq)]
pub struct Pipeline<'a> {
	pub segments: Vec<Segment<'a>>,
	pub is_background: bool,
}
