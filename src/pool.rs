//! Thread-local parser pooling.
//!
//! Each rayon worker keeps one JavaScript parser alive for the whole batch
//! instead of creating one per unit.

use crate::tree::{JsParser, TreeError};
use std::cell::RefCell;

thread_local! {
    static JS_PARSER: RefCell<Option<JsParser>> = const { RefCell::new(None) };
}

/// Execute `f` with this thread's parser, creating it on first use.
///
/// # Example
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use es3_harmony::pool::with_parser;
///
/// let tree = with_parser(|parser| parser.parse("var a = 1;"))??;
/// assert_eq!(tree.root_node().kind(), "program");
/// # Ok(())
/// # }
/// ```
pub fn with_parser<F, R>(f: F) -> Result<R, TreeError>
where
    F: FnOnce(&mut JsParser) -> R,
{
    JS_PARSER.with(|cell| {
        let mut slot = cell.borrow_mut();
        let parser = match slot.take() {
            Some(parser) => parser,
            None => JsParser::new()?,
        };
        Ok(f(slot.insert(parser)))
    })
}
