//! Client-side routing: one mTLS `tonic` channel per configured [`Server`],
//! looked up by Swamp name via the island it hashes to (`spec.md` §4.7).

use std::sync::Arc;
use std::time::Duration;

use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint, Identity};

use hydraide_core::{Name, KEEPALIVE_INTERVAL_SECS, TYPICAL_MAX_MESSAGE_SIZE};

use crate::backoff::BackoffPolicy;
use crate::error::{Error, Result};
use crate::server::{validate_ranges, Server};

/// The injection point for server liveness checks. This crate implements
/// only channel management and routing: it does not generate or depend on
/// service-stub code from a `.proto` file, so probing a server's heartbeat
/// RPC is left to the caller's own generated client, wired in through this
/// trait.
#[async_trait::async_trait]
pub trait HeartbeatProbe: Send + Sync {
    async fn probe(&self, channel: &Channel) -> std::result::Result<(), String>;
}

/// A probe that accepts every channel without checking anything, useful in
/// tests and for callers that perform heartbeat checks out of band.
pub struct NoopProbe;

#[async_trait::async_trait]
impl HeartbeatProbe for NoopProbe {
    async fn probe(&self, _channel: &Channel) -> std::result::Result<(), String> {
        Ok(())
    }
}

struct Route {
    server: Server,
    channel: Channel,
}

/// A connected routing table: one live channel per configured [`Server`],
/// indexed by island id for O(1) lookup from a Swamp [`Name`].
pub struct Client {
    all_islands: u64,
    backoff: BackoffPolicy,
    /// `by_island[island_id]` is the index into `routes` that owns that
    /// island; index 0 is unused since island ids start at 1.
    by_island: Vec<usize>,
    routes: Vec<Route>,
}

impl Client {
    /// Validates `servers`' ranges, dials every one over mTLS, and probes
    /// each with `probe` before accepting it into the routing table.
    pub async fn connect(
        servers: Vec<Server>,
        all_islands: u64,
        probe: Arc<dyn HeartbeatProbe>,
    ) -> Result<Self> {
        validate_ranges(&servers, all_islands)?;

        let mut by_island = vec![0usize; all_islands as usize + 1];
        let mut routes = Vec::with_capacity(servers.len());

        for server in servers {
            let channel = Self::dial(&server).await?;
            probe
                .probe(&channel)
                .await
                .map_err(Error::HeartbeatMismatch)?;

            tracing::info!(
                host = %server.host,
                from_island = server.from_island,
                to_island = server.to_island,
                "connected and probed server"
            );

            let index = routes.len();
            for island in server.from_island..=server.to_island {
                by_island[island as usize] = index;
            }
            routes.push(Route { server, channel });
        }

        Ok(Client {
            all_islands,
            backoff: BackoffPolicy::hydraide_default(),
            by_island,
            routes,
        })
    }

    /// Builds the channel lazily: the TCP/TLS handshake happens on first
    /// use, not here, so a momentarily unreachable server doesn't fail
    /// `connect()` for the whole fleet. The heartbeat probe that follows is
    /// what actually exercises the connection before a route is accepted.
    async fn dial(server: &Server) -> Result<Channel> {
        let ca = Certificate::from_pem(&server.ca_crt);
        let identity = Identity::from_pem(&server.client_crt, &server.client_key);
        let tls = ClientTlsConfig::new()
            .ca_certificate(ca)
            .identity(identity)
            .domain_name(server.host.clone());

        let keepalive = Duration::from_secs(KEEPALIVE_INTERVAL_SECS);
        let uri = format!("https://{}", server.host);
        let endpoint = Endpoint::from_shared(uri)
            .map_err(|e| Error::InvalidCertificate(e.to_string()))?
            .tls_config(tls)
            .map_err(|e| Error::TlsHandshakeError(e.to_string()))?
            .http2_keep_alive_interval(keepalive)
            .keep_alive_while_idle(true)
            .tcp_keepalive(Some(keepalive));

        Ok(endpoint.connect_lazy())
    }

    /// The gRPC channel that owns `name`'s Swamp, found by hashing `name`
    /// to an island id and looking up the server whose range covers it.
    pub fn route(&self, name: &Name) -> Result<&Channel> {
        let island = name.island_id(self.all_islands);
        let route = &self.routes[self.by_island[island as usize]];
        Ok(&route.channel)
    }

    /// The backoff policy idempotent RPCs through this client should retry
    /// with on a retryable status code.
    pub fn backoff_policy(&self) -> BackoffPolicy {
        self.backoff
    }

    pub fn server_for_island(&self, island_id: u64) -> Option<&Server> {
        self.routes
            .iter()
            .map(|r| &r.server)
            .find(|s| s.owns_island(island_id))
    }

    /// The default gRPC message size limit. Callers expecting larger
    /// payloads configure up to the hard bound by building their own
    /// `Endpoint` in front of this module.
    pub fn message_size_limit(&self) -> usize {
        TYPICAL_MAX_MESSAGE_SIZE
    }
}
