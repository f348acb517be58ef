pub mod sexp;
pub mod pcb;
pub mod pcb_schema;

// Re-export for convenience
pub use sexp::{SExp, SExpParser, ParseError};
pub use pcb::{PcbParser, PcbParseError, PcbWriter};
pub use pcb_schema::*;
