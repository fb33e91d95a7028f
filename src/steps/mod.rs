//! Script generators for steps that drive external tools.
//!
//! Each generator takes already-resolved arguments and returns a POSIX shell
//! script. Every user-supplied word is shell-quoted.

pub mod clone;
pub mod package;
