//! A routed gRPC server's address, island range, and mTLS material
//! (`spec.md` §4.7).

use crate::error::{Error, Result};

/// One server in a client's routing table: the islands it owns and the
/// certificate triple used to dial it over mTLS.
#[derive(Debug, Clone)]
pub struct Server {
    pub host: String,
    pub from_island: u64,
    pub to_island: u64,
    /// PEM-encoded CA certificate used to verify the server.
    pub ca_crt: Vec<u8>,
    /// PEM-encoded client certificate presented to the server.
    pub client_crt: Vec<u8>,
    /// PEM-encoded private key for `client_crt`.
    pub client_key: Vec<u8>,
}

impl Server {
    pub fn new(
        host: impl Into<String>,
        from_island: u64,
        to_island: u64,
        ca_crt: Vec<u8>,
        client_crt: Vec<u8>,
        client_key: Vec<u8>,
    ) -> Self {
        Server {
            host: host.into(),
            from_island,
            to_island,
            ca_crt,
            client_crt,
            client_key,
        }
    }

    pub fn owns_island(&self, island_id: u64) -> bool {
        island_id >= self.from_island && island_id <= self.to_island
    }
}

/// Validates that `servers`' ranges exactly tile `[1, all_islands]` with no
/// gaps and no overlaps — the invariant `spec.md` §4.7 requires before a
/// client may route anything.
pub fn validate_ranges(servers: &[Server], all_islands: u64) -> Result<()> {
    let mut sorted: Vec<&Server> = servers.iter().collect();
    sorted.sort_by_key(|s| s.from_island);

    let mut expected_next = 1u64;
    for server in &sorted {
        if server.from_island > expected_next {
            return Err(Error::RangeGap { at: expected_next });
        }
        if server.from_island < expected_next {
            return Err(Error::RangeOverlap {
                at: server.from_island,
            });
        }
        expected_next = server.to_island + 1;
    }
    if expected_next <= all_islands {
        return Err(Error::RangeGap { at: expected_next });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(from: u64, to: u64) -> Server {
        Server::new(format!("host-{from}"), from, to, vec![], vec![], vec![])
    }

    #[test]
    fn contiguous_ranges_validate() {
        let servers = vec![server(1, 500), server(501, 1000)];
        assert!(validate_ranges(&servers, 1000).is_ok());
    }

    #[test]
    fn gap_at_start_is_rejected() {
        let servers = vec![server(2, 1000)];
        assert!(matches!(
            validate_ranges(&servers, 1000),
            Err(Error::RangeGap { at: 1 })
        ));
    }

    #[test]
    fn gap_in_middle_is_rejected() {
        let servers = vec![server(1, 400), server(500, 1000)];
        assert!(matches!(
            validate_ranges(&servers, 1000),
            Err(Error::RangeGap { at: 401 })
        ));
    }

    #[test]
    fn overlap_is_rejected() {
        let servers = vec![server(1, 600), server(500, 1000)];
        assert!(matches!(
            validate_ranges(&servers, 1000),
            Err(Error::RangeOverlap { at: 500 })
        ));
    }

    #[test]
    fn trailing_gap_is_rejected() {
        let servers = vec![server(1, 900)];
        assert!(matches!(
            validate_ranges(&servers, 1000),
            Err(Error::RangeGap { at: 901 })
        ));
    }
}
