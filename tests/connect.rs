mod common;

use std::time::Duration;

use common::{initialize_logger, loopback_neighbor, new_transport, next_port};

#[tokio::test]
async fn connects_to_a_neighbor_added_before_run() {
    initialize_logger();

    let server_port = next_port();
    let (server, _server_events) = new_transport(server_port);
    server.run().await.unwrap();

    let (client, _client_events) = new_transport(next_port());
    client.add_neighbor(loopback_neighbor(server_port)).await.unwrap();
    client.run().await.unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;

    let neighbor = client.get_neighbor("127.0.0.1").unwrap();
    assert!(client.is_connected_to(&neighbor));
}

#[tokio::test]
async fn connects_to_a_neighbor_added_after_run() {
    initialize_logger();

    let server_port = next_port();
    let (server, _server_events) = new_transport(server_port);
    server.run().await.unwrap();

    let (client, _client_events) = new_transport(next_port());
    client.run().await.unwrap();
    let neighbor = client.add_neighbor(loopback_neighbor(server_port)).await.unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(client.is_connected_to(&neighbor));
}

#[tokio::test]
async fn rejects_the_same_neighbor_added_twice() {
    initialize_logger();

    let (client, _events) = new_transport(next_port());
    let neighbor = loopback_neighbor(next_port());
    client.add_neighbor(neighbor.clone()).await.unwrap();

    let err = client.add_neighbor(neighbor).await.unwrap_err();
    assert!(matches!(err, p2p_tcp_transport::Error::AlreadyExists));
}

#[tokio::test]
async fn an_unknown_inbound_connection_is_admitted_when_configured() {
    initialize_logger();

    let server_port = next_port();
    let (server, mut server_events) = {
        let mut config = p2p_tcp_transport::Config::new(server_port);
        config.receive_unknown_neighbor = true;
        p2p_tcp_transport::Transport::new(config, common::U32Packer)
    };
    server.run().await.unwrap();

    let (client, _client_events) = new_transport(next_port());
    client.add_neighbor(loopback_neighbor(server_port)).await.unwrap();
    client.run().await.unwrap();

    let discovered = tokio::time::timeout(Duration::from_secs(2), server_events.neighbor.recv())
        .await
        .expect("a neighbor event should fire")
        .expect("the channel should still be open");
    assert_eq!(discovered.host(), "127.0.0.1");
}

#[tokio::test]
async fn an_unknown_inbound_connection_is_dropped_by_default() {
    initialize_logger();

    let server_port = next_port();
    let (server, mut server_events) = new_transport(server_port);
    server.run().await.unwrap();

    let (client, _client_events) = new_transport(next_port());
    client.add_neighbor(loopback_neighbor(server_port)).await.unwrap();
    client.run().await.unwrap();

    let result = tokio::time::timeout(Duration::from_millis(300), server_events.neighbor.recv()).await;
    assert!(result.is_err(), "no neighbor event should fire for an unconfigured server");
}
