//! XML parsing and output.
//!
//! The process model and the delta documents are plain XML. Parsing goes
//! through [`Preprocessor`], which normalizes the document into a process
//! tree; [`XmlPrinter`] writes trees back out.

mod parser;
mod printer;

pub use parser::{parse_file, parse_str, Preprocessor};
pub use printer::{print_to_string, print_to_string_pretty, XmlPrinter, XmlPrinterOptions};
