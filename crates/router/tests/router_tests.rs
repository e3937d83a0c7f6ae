//! Client routing-table construction and lookup, end to end.

use std::sync::Arc;

use hydraide_core::Name;
use hydraide_router::{Client, Error, NoopProbe, Server};

fn server(host: &str, from: u64, to: u64) -> Server {
    Server::new(host, from, to, vec![], vec![], vec![])
}

#[tokio::test]
async fn connects_and_routes_by_island() {
    let servers = vec![
        server("shard-a.internal:9443", 1, 500),
        server("shard-b.internal:9443", 501, 1000),
    ];
    let client = Client::connect(servers, 1000, Arc::new(NoopProbe))
        .await
        .unwrap();

    let low = Name::new("sanctuary", "realm", "swamp-low").unwrap();
    let high = Name::new("sanctuary", "realm", "swamp-high").unwrap();

    let low_island = low.island_id(1000);
    let high_island = high.island_id(1000);

    let low_route = client.route(&low).unwrap();
    let high_route = client.route(&high).unwrap();

    // Both routes resolve to channels without panicking; which physical
    // server they land on depends only on the island each name hashes to.
    let _ = (low_route, high_route);
    assert!(client.server_for_island(low_island).is_some());
    assert!(client.server_for_island(high_island).is_some());
}

#[tokio::test]
async fn rejects_overlapping_ranges_before_dialing_anything() {
    let servers = vec![server("a:9443", 1, 600), server("b:9443", 500, 1000)];
    let result = Client::connect(servers, 1000, Arc::new(NoopProbe)).await;
    assert!(matches!(result, Err(Error::RangeOverlap { at: 500 })));
}

#[tokio::test]
async fn route_picks_the_server_owning_the_hashed_island() {
    let servers = vec![
        server("shard-a.internal:9443", 1, 250),
        server("shard-b.internal:9443", 251, 1000),
    ];
    let client = Client::connect(servers, 1000, Arc::new(NoopProbe))
        .await
        .unwrap();

    for i in 0..20 {
        let name = Name::new("sanctuary", "realm", &format!("swamp-{i}")).unwrap();
        let island = name.island_id(1000);
        let owner = client.server_for_island(island).unwrap();
        assert!(owner.owns_island(island));
    }
}
