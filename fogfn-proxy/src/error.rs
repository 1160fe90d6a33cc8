use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouterError {
    #[error("no endpoints given for function {0}")]
    /// A route must always map to at least one replica endpoint.
    EmptyEndpointList(String),

    #[error("function {0} not found")]
    /// No route is registered under the given function name.
    RouteNotFound(String),
}
