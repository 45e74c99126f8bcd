use clap::builder::{
	Styles,
	styling::{AnsiColor, Effects},
};

/// Crate version followed by the git revision and target it was built from.
pub const VERSION: &str = concat!(
	env!("CARGO_PKG_VERSION"),
	"+",
	env!("VERGEN_GIT_SHA"),
	".",
	env!("VERGEN_CARGO_TARGET_TRIPLE"),
);

pub fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Yellow.on_default() | Effects::BOLD)
		.usage(AnsiColor::Yellow.on_default() | Effects::BOLD)
		.literal(AnsiColor::Cyan.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
		.error(AnsiColor::Red.on_default() | Effects::BOLD)
}
