//! Compiled XPath queries over [`arbor_core`] trees.
//!
//! A [`CompiledQuery`] couples an expression with a result [`Filter`] and
//! its namespace and variable bindings. It is compiled once and can be
//! evaluated any number of times, from any number of threads, against
//! different context nodes.
//!
//! ```
//! use arbor_core::{attr, doc, elem};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let tree = doc().child(elem("list").child(elem("entry").attr(attr("id", "a")))).build()?;
//! let query = arbor_query::compile("string(//entry/@id)")?;
//! assert_eq!(query.evaluate(&tree)?, vec![arbor_query::Item::String("a".into())]);
//! # Ok(())
//! # }
//! ```

mod backend;
mod compiled;
mod error;
pub mod filter;
mod namespace_node;
mod navigator;
mod resolver;
mod value;

pub use backend::XPathFactory;
pub use compiled::{CompiledExpression, CompiledQuery, Diagnostic, QueryBuilder, QueryFactory};
pub use error::QueryError;
pub use filter::{Filter, Rejected};
pub use resolver::{Bindings, VariableName};
pub use value::{Item, Value};

/// Compiles `expression` with the bundled engine, no bindings, and a filter
/// that keeps every result.
pub fn compile(expression: &str) -> Result<CompiledQuery<Item>, QueryError> {
    XPathFactory.compile(expression, filter::everything(), [], [])
}
