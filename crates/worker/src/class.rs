/// Execution classes used for scheduling and observability of console work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Work whose result the user is actively waiting on (searches, lookups).
	Interactive,
	/// Work that may settle later without blocking input (persists, autosave).
	Background,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Interactive => "interactive",
			Self::Background => "background",
		}
	}
}
