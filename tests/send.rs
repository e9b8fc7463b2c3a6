mod common;

use std::time::Duration;

use common::{initialize_logger, loopback_neighbor, new_transport, next_port};

#[tokio::test]
async fn a_sent_packet_is_received_intact() {
    initialize_logger();

    let server_port = next_port();
    let (server, mut server_events) = new_transport(server_port);
    server.run().await.unwrap();

    let (client, _client_events) = new_transport(next_port());
    let neighbor = client.add_neighbor(loopback_neighbor(server_port)).await.unwrap();
    client.run().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    client.send(&0xdead_beef_u32, &neighbor).await.unwrap();

    let received = tokio::time::timeout(Duration::from_secs(2), server_events.receive.recv())
        .await
        .expect("a receive event should fire")
        .expect("the channel should still be open");
    assert_eq!(received.data, 0xdead_beef);
}

#[tokio::test]
async fn send_before_connecting_fails() {
    initialize_logger();

    let (client, _events) = new_transport(next_port());
    let neighbor = client.add_neighbor(loopback_neighbor(next_port())).await.unwrap();

    let err = client.send(&1, &neighbor).await.unwrap_err();
    assert!(matches!(err, p2p_tcp_transport::Error::NotConnected));
}

#[tokio::test]
async fn send_to_a_send_forbidden_neighbor_is_rejected() {
    initialize_logger();

    let (client, _events) = new_transport(next_port());
    let neighbor = p2p_tcp_transport::Neighbor::new("127.0.0.1", next_port(), false, true);
    client.add_neighbor(neighbor.clone()).await.unwrap();

    let err = client.send(&1, &neighbor).await.unwrap_err();
    assert!(matches!(err, p2p_tcp_transport::Error::SendForbidden));
}

#[tokio::test]
async fn receive_forbidden_neighbor_gets_no_receive_socket() {
    initialize_logger();

    let server_port = next_port();
    let (server, mut server_events) = new_transport(server_port);
    let client_port = next_port();
    server.add_neighbor(p2p_tcp_transport::Neighbor::new("127.0.0.1", client_port, true, false)).await.unwrap();
    server.run().await.unwrap();

    let (client, _client_events) = new_transport(client_port);
    client.add_neighbor(loopback_neighbor(server_port)).await.unwrap();
    client.run().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let result = tokio::time::timeout(Duration::from_millis(300), server_events.receive.recv()).await;
    assert!(result.is_err(), "a neighbor with gateway_can_receive_from=false should never emit a Received event");
}
