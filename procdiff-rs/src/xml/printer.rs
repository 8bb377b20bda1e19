//! XML printer for process trees.

use std::io::Write;

use quick_xml::escape::escape;

use crate::node::NodeRef;

/// Options for XML printing.
#[derive(Debug, Clone)]
pub struct XmlPrinterOptions {
    /// Whether to pretty-print with indentation.
    pub pretty_print: bool,
    /// Whether to start the output with an XML declaration.
    pub declaration: bool,
}

impl Default for XmlPrinterOptions {
    fn default() -> Self {
        XmlPrinterOptions {
            pretty_print: true,
            declaration: true,
        }
    }
}

/// XML printer that outputs node trees.
///
/// Attributes are written in sorted order, so equal trees always print the
/// same.
pub struct XmlPrinter<W: Write> {
    writer: W,
    options: XmlPrinterOptions,
}

impl<W: Write> XmlPrinter<W> {
    /// Creates a new XML printer.
    pub fn new(writer: W) -> Self {
        Self::with_options(writer, XmlPrinterOptions::default())
    }

    /// Creates a new XML printer with the given options.
    pub fn with_options(writer: W, options: XmlPrinterOptions) -> Self {
        XmlPrinter { writer, options }
    }

    /// Prints a node tree as a document.
    pub fn print(&mut self, root: &NodeRef) -> std::io::Result<()> {
        if self.options.declaration {
            write!(self.writer, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
            self.newline()?;
        }
        self.print_node(root, 0)?;
        if !self.options.pretty_print {
            writeln!(self.writer)?;
        }
        self.writer.flush()
    }

    /// Prints a node tree as a fragment (no XML declaration).
    pub fn print_fragment(&mut self, root: &NodeRef) -> std::io::Result<()> {
        self.print_node(root, 0)
    }

    fn print_node(&mut self, node: &NodeRef, depth: usize) -> std::io::Result<()> {
        let borrowed = node.borrow();
        let tag = borrowed.label().as_str();

        self.indent(depth)?;
        write!(self.writer, "<{}", tag)?;
        // BTreeMap iteration is already sorted by key
        for (key, value) in borrowed.attributes() {
            write!(self.writer, " {}=\"{}\"", key, escape(value.as_str()))?;
        }

        let children = borrowed.children();
        match (borrowed.text(), children.is_empty()) {
            (None, true) => {
                write!(self.writer, "/>")?;
            }
            (Some(text), true) => {
                write!(self.writer, ">{}</{}>", escape(text), tag)?;
            }
            (text, false) => {
                write!(self.writer, ">")?;
                self.newline()?;
                if let Some(text) = text {
                    self.indent(depth + 1)?;
                    write!(self.writer, "{}", escape(text))?;
                    self.newline()?;
                }
                for child in children {
                    self.print_node(child, depth + 1)?;
                }
                self.indent(depth)?;
                write!(self.writer, "</{}>", tag)?;
            }
        }
        self.newline()
    }

    fn indent(&mut self, depth: usize) -> std::io::Result<()> {
        if self.options.pretty_print {
            write!(self.writer, "{}", "  ".repeat(depth))?;
        }
        Ok(())
    }

    fn newline(&mut self) -> std::io::Result<()> {
        if self.options.pretty_print {
            writeln!(self.writer)?;
        }
        Ok(())
    }
}

/// Prints a node tree to a string without indentation.
pub fn print_to_string(root: &NodeRef) -> std::io::Result<String> {
    let options = XmlPrinterOptions {
        pretty_print: false,
        declaration: true,
    };
    print_with(root, options)
}

/// Prints a node tree to a string with pretty printing.
pub fn print_to_string_pretty(root: &NodeRef) -> std::io::Result<String> {
    print_with(root, XmlPrinterOptions::default())
}

fn print_with(root: &NodeRef, options: XmlPrinterOptions) -> std::io::Result<String> {
    let mut output = Vec::new();
    XmlPrinter::with_options(&mut output, options).print(root)?;
    Ok(String::from_utf8_lossy(&output).into_owned())
}
