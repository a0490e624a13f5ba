//! CLI domain: parse, route, and presentation only.
//! The route table drives the library; no tagging logic lives here.

mod parse;
mod presentation;
mod route;

pub use parse::{Cli, Commands};
pub use presentation::{format_decode_text, format_identity_json, format_identity_text, IdentityReport};
pub use route::RunContext;
