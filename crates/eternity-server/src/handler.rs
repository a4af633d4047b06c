//! Executes one decoded [`Action`] against a [`ContentStore`].
//!
//! Every outcome becomes a [`Reply`]; store errors are logged here and
//! reduced to a status byte so no error text reaches a remote peer.

use eternity_crypto::{VerifyingKey, PUBLIC_KEY_LEN, SIGNATURE_LEN};
use eternity_protocol::{Action, Reply, Status};
use eternity_store::{ContentStore, Publisher, StoreError};
use tracing::{debug, warn};

pub fn handle(store: &dyn ContentStore, action: Action) -> Reply {
    match action {
        Action::Search(hash) => {
            if store.exists(&hash) {
                Reply::status(Status::Ok)
            } else {
                Reply::not_found()
            }
        }
        Action::Serve(hash) => match store.fetch(&hash) {
            Ok(contents) => Reply::ok(contents),
            Err(e) => failure("serve", e),
        },
        Action::Store {
            public_key,
            signature,
            contents,
        } => {
            let publisher = if public_key == [0u8; PUBLIC_KEY_LEN]
                && signature.to_bytes() == [0u8; SIGNATURE_LEN]
            {
                None
            } else {
                match VerifyingKey::from_bytes(&public_key) {
                    Ok(key) => Some(Publisher::new(key, signature)),
                    Err(_) => {
                        debug!("store request carries a malformed public key");
                        return Reply::status(Status::Unauthorized);
                    }
                }
            };
            match store.store(&contents, publisher) {
                Ok(hash) => Reply::stored(&hash),
                Err(e) => failure("store", e),
            }
        }
        Action::Delete { hash, signature } => match store.delete(&hash, &signature) {
            Ok(()) => Reply::status(Status::Ok),
            Err(e) => failure("delete", e),
        },
    }
}

fn failure(action: &str, err: StoreError) -> Reply {
    match err {
        StoreError::NotFound(hash) => {
            debug!(action, %hash, "object not found");
            Reply::not_found()
        }
        StoreError::Unauthorized { hash, reason } => {
            debug!(action, %hash, %reason, "request not authorized");
            Reply::status(Status::Unauthorized)
        }
        other => {
            warn!(action, error = %other, "store operation failed");
            Reply::not_found()
        }
    }
}
