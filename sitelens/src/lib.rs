// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

pub use handlers::{GlobalOptions, expand_output_dir, parse_base_url};
