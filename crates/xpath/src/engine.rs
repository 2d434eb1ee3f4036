pub(crate) mod axes;
pub(crate) mod evaluator;
pub(crate) mod functions;

pub(crate) const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
