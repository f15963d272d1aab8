//! Text dump of a real-space field: a `#`-prefixed header followed by the
//! values in scientific notation, first grid axis varying fastest.

mod model;
mod parser;
mod writer;

pub use model::{AtomicPosition, FieldDump, FileHeader};
pub use parser::{parse_field, parse_field_dump, read_field, read_field_dump};
pub use writer::{render_field_dump, render_header, write_field_dump};

pub const VALUES_PER_LINE: usize = 5;

/// Reserved fourth header line.
pub const HEADER_PLACEHOLDER_LINE: &str = "#      XXXX   XXXX   XXXX   XXXX   ";
