#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use telecore_client::backend::{LoopbackAcceptor, LoopbackBackend, LoopbackPeer};
use telecore_client::RpcClient;
use telecore_proto::Message;
use telecore_tl::{Cursor, Deserializable, Identifiable};

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Fail the test instead of hanging.
pub async fn within<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(TIMEOUT, fut).await.expect("timed out")
}

pub struct Harness {
    pub rpc:      RpcClient,
    pub acceptor: LoopbackAcceptor,
    pub peer:     LoopbackPeer,
}

/// A started client whose backend side the test scripts.
pub async fn harness() -> Harness {
    let (backend, mut acceptor) = LoopbackBackend::new();
    let rpc = RpcClient::new(Arc::new(backend));
    rpc.start().await.unwrap();
    let peer = within(acceptor.accept()).await.unwrap();
    Harness { rpc, acceptor, peer }
}

/// Decode the function carried by `msg`, checking its constructor id.
pub fn decode_call<R: Deserializable + Identifiable>(msg: &Message) -> R {
    let mut cur = Cursor::from_slice(&msg.body);
    let id = u32::deserialize(&mut cur).unwrap();
    assert_eq!(id, R::CONSTRUCTOR_ID, "unexpected call {id:#010x}");
    R::deserialize(&mut cur).unwrap()
}

/// Constructor id of the function carried by `msg`.
pub fn call_id(msg: &Message) -> u32 {
    u32::from_bytes(&msg.body).unwrap()
}

/// Poll `cond` until it holds.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    within(async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
}
