use std::net::{SocketAddr, TcpListener};

/// Allocates a fresh local socket address from the OS.
///
/// The listener backing the allocation is dropped before returning, so the
/// address is free to bind but also free for a test to use as a guaranteed
/// unreachable peer.
pub fn get_unused_addr() -> SocketAddr {
    TcpListener::bind("127.0.0.1:0")
        .expect("bind to ephemeral port")
        .local_addr()
        .expect("read allocated address")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocated_addr_is_bindable() {
        let addr = get_unused_addr();
        TcpListener::bind(addr).expect("bind to allocated address");
    }
}
