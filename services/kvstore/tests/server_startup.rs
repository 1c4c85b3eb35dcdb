mod common;

use std::time::Duration;

const CONVERGE: Duration = Duration::from_secs(10);

#[tokio::test]
async fn test_late_joiner_catches_up() {
    let a = common::start(44_000, 2, &[]).await;
    for i in 0..20 {
        a.client(i % 2)
            .put(&format!("early-{}", i), &i.to_string())
            .await
            .unwrap();
    }
    let full = a.client(1);
    assert!(
        common::eventually(CONVERGE, || async move {
            full.list("early-").await.map(|m| m.len()).unwrap_or(0) == 20
        })
        .await
    );

    // Nothing new is written after B joins; B only gets the data through
    // the snapshot A sends on hearing about it
    let b = common::start(44_100, 3, &[a.descriptor.clone()]).await;
    for client in &b.clients {
        let caught_up = common::eventually(CONVERGE, || async move {
            client.list("").await.map(|m| m.len()).unwrap_or(0) == 20
        })
        .await;
        assert!(caught_up);
    }
    assert_eq!(
        b.client(2).get("early-7").await.unwrap(),
        ("7".to_string(), true)
    );

    b.close().await;
    a.close().await;
}

#[tokio::test]
async fn test_third_server_joins_both() {
    let a = common::start(44_200, 1, &[]).await;
    let b = common::start(44_300, 2, &[a.descriptor.clone()]).await;
    a.client(0).put("from-a", "1").await.unwrap();
    b.client(0).put("from-b", "2").await.unwrap();

    let c = common::start(44_400, 2, &[a.descriptor.clone(), b.descriptor.clone()]).await;
    c.client(1).put("from-c", "3").await.unwrap();

    for node in [&a, &b, &c] {
        for client in &node.clients {
            let complete = common::eventually(CONVERGE, || async move {
                client.list("from-").await.map(|m| m.len()).unwrap_or(0) == 3
            })
            .await;
            assert!(complete);
        }
    }

    c.close().await;
    b.close().await;
    a.close().await;
}

#[tokio::test]
async fn test_descriptor_lists_partitions() {
    let a = common::start(44_500, 3, &[]).await;
    let refs = kvstore::decode_descriptor(&a.descriptor).unwrap();
    assert_eq!(refs, a.server.partitions());
    assert!(refs.iter().all(|r| r.address == "127.0.0.1:44500"));
    a.close().await;
}

#[tokio::test]
async fn test_port_in_use_fails_start() {
    let a = common::start(44_600, 1, &[]).await;
    let clash = kvstore::Server::start(kv_config::ServerConfig::new(44_600, 1), &[]).await;
    assert!(clash.is_err());
    a.close().await;
}

#[tokio::test]
async fn test_failed_start_is_not_announced_to_peers() {
    let a = common::start(44_700, 1, &[]).await;

    // Occupy the second front-end port of the joining server
    let _blocker = std::net::TcpListener::bind("127.0.0.1:44802").unwrap();
    let joined =
        kvstore::Server::start(kv_config::ServerConfig::new(44_800, 2), &[a.descriptor.clone()])
            .await;
    assert!(joined.is_err());

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(a.server.stats().remote_bytes_received, 0);

    // A is unaffected by the failed join
    a.client(0).put("k", "v").await.unwrap();
    assert!(common::sees(a.client(0), "k", "v").await);
    a.close().await;
}
