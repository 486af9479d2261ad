use std::path::PathBuf;

use brandline_primitives::{DateWindow, StatusFilter};
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "brandline")]
#[command(about = "Filter community posts and search trainings from JSON fixtures")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Console configuration file (TOML)
	#[arg(short, long, value_name = "PATH", global = true)]
	pub config: Option<PathBuf>,

	/// Verbose logging
	#[arg(short, long, global = true)]
	pub verbose: bool,

	/// Subcommand to execute.
	#[command(subcommand)]
	pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
	/// Print the posts that survive the layered filters
	Filter(FilterArgs),
	/// Run one picker session against a training catalog
	Search(SearchArgs),
}

#[derive(Args, Debug)]
pub struct FilterArgs {
	/// JSON array of posts
	#[arg(long, value_name = "PATH")]
	pub posts: PathBuf,

	/// Case-insensitive match on title or body
	#[arg(long, default_value = "")]
	pub text: String,

	#[arg(long, value_enum, default_value_t = StatusArg::All)]
	pub status: StatusArg,

	/// Exact tag to keep
	#[arg(long)]
	pub tag: Option<String>,

	#[arg(long, value_enum, default_value_t = WindowArg::All)]
	pub window: WindowArg,

	/// Keep only posts attached to a training; `any` keeps every attached post
	#[arg(long = "ref", value_name = "ID")]
	pub reference: Option<String>,

	/// Evaluate the date window against this instant (RFC 3339) instead of now
	#[arg(long, value_name = "TIME")]
	pub now: Option<String>,

	/// Print the surviving posts as JSON
	#[arg(long)]
	pub json: bool,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
	/// JSON array of trainings
	#[arg(long, value_name = "PATH")]
	pub trainings: PathBuf,

	/// Text typed into the picker
	#[arg(long, short)]
	pub query: String,

	/// Override the configured page limit
	#[arg(long)]
	pub limit: Option<usize>,

	/// Only search trainings owned by this id
	#[arg(long, value_name = "ID")]
	pub owner: Option<String>,

	/// Commit the option at this index and print the selection
	#[arg(long, value_name = "INDEX")]
	pub pick: Option<usize>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusArg {
	All,
	Draft,
	Published,
}

impl From<StatusArg> for StatusFilter {
	fn from(arg: StatusArg) -> Self {
		match arg {
			StatusArg::All => Self::All,
			StatusArg::Draft => Self::Draft,
			StatusArg::Published => Self::Published,
		}
	}
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowArg {
	All,
	#[value(name = "7d")]
	Week,
	#[value(name = "30d")]
	Month,
}

impl From<WindowArg> for DateWindow {
	fn from(arg: WindowArg) -> Self {
		match arg {
			WindowArg::All => Self::All,
			WindowArg::Week => Self::LastWeek,
			WindowArg::Month => Self::LastMonth,
		}
	}
}
