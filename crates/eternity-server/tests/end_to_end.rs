mod common;

use common::{Network, CLIENT_ADDRESS};
use eternity_crypto::SigningKey;
use eternity_protocol::{Action, Reply, Status};
use eternity_server::ServerConfig;
use eternity_types::{ContentHash, Recipient};

#[tokio::test]
async fn store_then_serve_replies_on_the_serve_token() {
    let net = Network::start(ServerConfig::default()).await;
    let key = SigningKey::generate();
    let contents = b"ten bytes!".to_vec();

    assert_eq!(
        net.client.self_address().await.unwrap(),
        Recipient::from(CLIENT_ADDRESS)
    );

    let hash = net
        .client
        .store(contents.clone(), Some(&key))
        .await
        .unwrap()
        .expect("store should be acknowledged");
    assert_eq!(hash, ContentHash::compute(&contents));

    let reply = net.client.request(&Action::Serve(hash)).await.unwrap();
    assert_eq!(reply.status, Status::Ok);
    assert_eq!(reply.body, contents);

    {
        let log = net.log.lock().unwrap();
        assert_eq!(log.issued.len(), 2);
        // Each reply travelled on the token of the request it answers.
        assert_eq!(log.answered, log.issued);
        assert_eq!(log.answered[1], b"surb-2");
    }

    let stats = net.shutdown().await;
    assert_eq!(stats.accepted, 2);
    assert_eq!(stats.sent, 2);
}

#[tokio::test]
async fn search_for_unknown_hash_returns_zero() {
    let net = Network::start(ServerConfig::default()).await;
    let reply = net
        .client
        .request(&Action::Search(ContentHash::compute(b"never stored")))
        .await
        .unwrap();
    assert_eq!(reply.encode(), vec![0x00]);
    net.shutdown().await;
}

#[tokio::test]
async fn search_finds_stored_object() {
    let net = Network::start(ServerConfig::default()).await;
    let hash = net
        .client
        .store(b"findable".to_vec(), None)
        .await
        .unwrap()
        .unwrap();
    assert!(net.client.search(hash).await.unwrap());
    net.shutdown().await;
}

#[tokio::test]
async fn delete_requires_the_publisher_key() {
    let net = Network::start(ServerConfig::default()).await;
    let owner = SigningKey::generate();
    let intruder = SigningKey::generate();
    let hash = net
        .client
        .store(b"owned object".to_vec(), Some(&owner))
        .await
        .unwrap()
        .unwrap();

    let refused = net.client.delete(hash, &intruder).await.unwrap();
    assert_eq!(refused, Reply::status(Status::Unauthorized));
    assert_eq!(
        net.client.serve(hash).await.unwrap(),
        Some(b"owned object".to_vec())
    );

    let accepted = net.client.delete(hash, &owner).await.unwrap();
    assert_eq!(accepted, Reply::status(Status::Ok));
    assert!(!net.client.search(hash).await.unwrap());
    assert_eq!(net.client.serve(hash).await.unwrap(), None);
    net.shutdown().await;
}

#[tokio::test]
async fn anonymous_objects_cannot_be_deleted() {
    let net = Network::start(ServerConfig::default()).await;
    let hash = net
        .client
        .store(b"anonymous".to_vec(), None)
        .await
        .unwrap()
        .unwrap();
    let key = SigningKey::generate();
    let reply = net.client.delete(hash, &key).await.unwrap();
    assert_eq!(reply.status, Status::Unauthorized);
    assert!(net.client.search(hash).await.unwrap());
    net.shutdown().await;
}

#[tokio::test]
async fn forged_store_signature_is_refused() {
    let net = Network::start(ServerConfig::default()).await;
    let key = SigningKey::generate();
    let forged = Action::Store {
        public_key: key.verifying_key().to_bytes(),
        signature: key.sign(b"something else"),
        contents: b"payload".to_vec(),
    };
    let reply = net.client.request(&forged).await.unwrap();
    assert_eq!(reply.status, Status::Unauthorized);
    assert!(!net
        .client
        .search(ContentHash::compute(b"payload"))
        .await
        .unwrap());
    net.shutdown().await;
}
