//! XPath 1.0 for any tree that implements [`Navigator`].
//!
//! ```
//! # fn demo<N: arbor_xpath::Navigator>(nav: &N, node: N::Node) -> Result<(), arbor_xpath::Error> {
//! use arbor_xpath::{DynamicContextBuilder, compile_xpath};
//!
//! let expr = compile_xpath("count(//item[@type = 'a'])")?;
//! let ctx = DynamicContextBuilder::new(nav, node).build();
//! let value = expr.evaluate(&ctx)?;
//! # let _ = value;
//! # Ok(())
//! # }
//! ```

pub mod compiler;
pub mod context;
mod engine;
pub mod error;
pub mod model;
pub mod parser;
pub mod value;

pub use compiler::{XPathExpr, compile_xpath};
pub use context::{
    DynamicContext, DynamicContextBuilder, NamespaceContext, NoNamespaces, NoVariables,
    SimpleNamespaceContext, SimpleVariableContext, UnresolvableVariable, VariableContext,
};
pub use error::{Error, ErrorCode};
pub use model::{Navigator, NodeKind, QName, compare_by_ancestry};
pub use parser::parse_xpath;
pub use value::{Item, Value, format_number, parse_number};
