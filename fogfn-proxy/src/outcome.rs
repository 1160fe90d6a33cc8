use bytes::Bytes;

#[derive(Debug, Clone, PartialEq, Eq)]
/// The result of a function invocation, local or cluster-forwarded.
///
/// Both invocation paths produce this one type so the edge listener only
/// needs a single mapping to transport status codes.
pub enum CallOutcome {
    /// The function replied. Carries the full response body.
    Ok(Bytes),

    /// The call was accepted for asynchronous execution.
    ///
    /// The eventual outcome of the call is never surfaced to the caller.
    Accepted,

    /// No route exists for the requested function name.
    NotFound,

    /// The call failed, either in transport or within the function itself.
    Error,
}
