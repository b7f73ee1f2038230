use std::time::Duration;

use super::{ConnectNotifier, QrModal, RelayConfig, RelayTransport, Session, SessionProposal};
use crate::error::{RelayError, SignerError};

/// Knobs for [connect_session].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BootstrapOptions {
    /// Give up waiting for the wallet after this long. Waits forever when unset.
    pub connect_timeout: Option<Duration>,
}

/// Establish exactly one relay session.
///
/// Kills any previous session, proposes a new one, shows the pairing URI and
/// waits for the single connect event. Every failure, including the wallet
/// never connecting, is reported as [SignerError::MobileConnect].
pub async fn connect_session<T: RelayTransport, M: QrModal>(
    transport: &T,
    modal: &M,
    config: &RelayConfig,
    chain_ids: &[String],
    options: &BootstrapOptions,
) -> Result<Session, SignerError> {
    let fail = |e: RelayError| {
        tracing::warn!("Relay session bootstrap failed: {e}");
        SignerError::mobile_connect(e)
    };

    transport.kill_session().await.map_err(fail)?;

    let proposal = SessionProposal::new(config, chain_ids);
    let uri = proposal.pairing_uri().map_err(fail)?;
    let topic = proposal.topic.clone();
    let (notifier, rx) = ConnectNotifier::channel();
    transport
        .create_session(proposal, notifier)
        .await
        .map_err(fail)?;
    tracing::debug!("Proposed relay session {topic} ({})", config.protocol);

    modal.open(&uri, chain_ids);
    let outcome = async {
        let received = match options.connect_timeout {
            None => rx.await,
            Some(timeout) => tokio::time::timeout(timeout, rx)
                .await
                .map_err(|_| RelayError::ConnectTimeout { timeout })?,
        };
        received.map_err(|_| RelayError::NeverConnected)?
    }
    .await;
    modal.close();

    let session = outcome.map_err(fail)?;
    tracing::info!(
        "Relay session {} established for {} with {} account(s)",
        session.topic,
        session.chain_id,
        session.accounts.len()
    );
    Ok(session)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use serde_json::Value;

    use super::*;
    use crate::{error::SignerErrorKind, relay::JsonRpcRequest};

    #[derive(Default)]
    struct CountingModal {
        opened: AtomicUsize,
        closed: AtomicUsize,
    }

    impl QrModal for CountingModal {
        fn open(&self, _uri: &str, _chain_ids: &[String]) {
            self.opened.fetch_add(1, Ordering::SeqCst);
        }

        fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    enum Behavior {
        Connect,
        Fail,
        Drop,
        Hold,
    }

    struct ScriptedTransport {
        behavior: Behavior,
        calls: Mutex<Vec<&'static str>>,
        held: Mutex<Option<ConnectNotifier>>,
    }

    impl ScriptedTransport {
        fn new(behavior: Behavior) -> Self {
            ScriptedTransport {
                behavior,
                calls: Mutex::new(vec![]),
                held: Mutex::new(None),
            }
        }
    }

    impl RelayTransport for ScriptedTransport {
        async fn kill_session(&self) -> Result<(), RelayError> {
            self.calls.lock().push("kill");
            Ok(())
        }

        async fn create_session(
            &self,
            proposal: SessionProposal,
            notifier: ConnectNotifier,
        ) -> Result<(), RelayError> {
            self.calls.lock().push("create");
            match self.behavior {
                Behavior::Connect => notifier.notify(Ok(Session {
                    topic: proposal.topic.clone(),
                    chain_id: proposal.chain_ids[0].clone(),
                    pairing_uri: proposal.pairing_uri().unwrap(),
                    accounts: vec![],
                    namespaces: Default::default(),
                    protocol: proposal.protocol,
                    peer: None,
                })),
                Behavior::Fail => notifier.notify(Err(RelayError::SessionRejected {
                    reason: "user declined".to_owned(),
                })),
                Behavior::Drop => drop(notifier),
                Behavior::Hold => *self.held.lock() = Some(notifier),
            }
            Ok(())
        }

        async fn send_custom_request(&self, _request: JsonRpcRequest) -> Result<Value, RelayError> {
            Err(RelayError::NoSession)
        }
    }

    async fn run(
        transport: &ScriptedTransport,
        modal: &CountingModal,
        options: BootstrapOptions,
    ) -> Result<Session, SignerError> {
        connect_session(
            transport,
            modal,
            &RelayConfig::default(),
            &["cosmoshub-4".to_owned()],
            &options,
        )
        .await
    }

    #[tokio::test]
    async fn kills_then_creates_then_connects() {
        let transport = ScriptedTransport::new(Behavior::Connect);
        let modal = CountingModal::default();
        let session = run(&transport, &modal, BootstrapOptions::default())
            .await
            .unwrap();
        assert_eq!(session.chain_id, "cosmoshub-4");
        assert_eq!(*transport.calls.lock(), vec!["kill", "create"]);
        assert_eq!(modal.opened.load(Ordering::SeqCst), 1);
        assert_eq!(modal.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn never_connected_is_mobile_connect() {
        let transport = ScriptedTransport::new(Behavior::Drop);
        let modal = CountingModal::default();
        let err = run(&transport, &modal, BootstrapOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), SignerErrorKind::MobileConnect);
        assert_eq!(modal.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn connect_error_is_mobile_connect() {
        let transport = ScriptedTransport::new(Behavior::Fail);
        let modal = CountingModal::default();
        let err = run(&transport, &modal, BootstrapOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), SignerErrorKind::MobileConnect);
        assert!(err.to_string().contains("user declined"));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_mobile_connect() {
        let transport = ScriptedTransport::new(Behavior::Hold);
        let modal = CountingModal::default();
        let err = run(
            &transport,
            &modal,
            BootstrapOptions {
                connect_timeout: Some(Duration::from_secs(30)),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), SignerErrorKind::MobileConnect);
        assert!(transport.held.lock().is_some());
        assert_eq!(modal.closed.load(Ordering::SeqCst), 1);
    }
}
