pub mod classifier;
pub mod parser;

pub use classifier::{classify, classify_at, Record};
pub use parser::{decode_line, LineParser, RawLine, IDLE_BACKOFF};
