use std::error::Error as StdError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("unable to compile '{expression}': {source}")]
    InvalidExpression {
        expression: String,
        #[source]
        source: arbor_xpath::Error,
    },
    #[error("unable to evaluate '{expression}': {message}")]
    EvaluationFailed {
        expression: String,
        message: String,
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },
    #[error("invalid binding: {0}")]
    InvalidBinding(String),
    #[error("variable {0} is not bound in this query")]
    UnknownVariable(String),
    #[error("namespace prefix '{0}' is not bound in this query")]
    UnknownPrefix(String),
}

pub(crate) fn invalid_expression(expression: &str, source: arbor_xpath::Error) -> QueryError {
    QueryError::InvalidExpression { expression: expression.to_string(), source }
}

pub(crate) fn evaluation_failed(
    expression: &str,
    source: impl StdError + Send + Sync + 'static,
) -> QueryError {
    QueryError::EvaluationFailed {
        expression: expression.to_string(),
        message: source.to_string(),
        source: Box::new(source),
    }
}

impl From<QueryError> for arbor_core::Error {
    fn from(err: QueryError) -> Self {
        arbor_core::Error::with_cause("query failed", err)
    }
}
