/// Per-target outcome collection for batch commands.
pub mod batch;
/// Process-boundary error capture.
pub mod diagnostics;
/// Single source of truth for the message-command prefix.
pub const COMMAND_PREFIX: char = '!';
/// Pure parser and normalization helpers.
pub mod parse;
/// Permission helper utilities.
pub mod permissions;
/// Twilight-backed implementation of the platform seam.
pub mod platform;
