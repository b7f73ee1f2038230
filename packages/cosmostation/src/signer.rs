//! The offline signer capability and its two wallet backends.

mod extension;
mod mobile;

use std::{fmt::Display, future::Future, str::FromStr};

pub use self::extension::ExtensionSigner;
pub use self::mobile::MobileSigner;
use crate::{
    account::AccountData,
    error::SignerError,
    extension::ExtensionProvider,
    relay::{BootstrapOptions, QrModal, RelayConfig, RelayTransport},
    sign_doc::{AminoSignResponse, DirectSignDoc, DirectSignResponse, StdSignDoc},
    Address,
};

/// Something that can list accounts and sign documents without ever exposing keys.
pub trait OfflineSigner: Send + Sync {
    /// Accounts available for the connected chain.
    fn get_accounts(&self) -> impl Future<Output = Result<Vec<AccountData>, SignerError>> + Send;

    /// Sign an Amino JSON document for `signer_address`.
    fn sign_amino(
        &self,
        signer_address: Address,
        doc: &StdSignDoc,
    ) -> impl Future<Output = Result<AminoSignResponse, SignerError>> + Send;

    /// Sign a protobuf document for `signer_address`.
    fn sign_direct(
        &self,
        signer_address: Address,
        doc: &DirectSignDoc,
    ) -> impl Future<Output = Result<DirectSignResponse, SignerError>> + Send;
}

impl<T: OfflineSigner> OfflineSigner for &T {
    async fn get_accounts(&self) -> Result<Vec<AccountData>, SignerError> {
        (*self).get_accounts().await
    }

    async fn sign_amino(
        &self,
        signer_address: Address,
        doc: &StdSignDoc,
    ) -> Result<AminoSignResponse, SignerError> {
        (*self).sign_amino(signer_address, doc).await
    }

    async fn sign_direct(
        &self,
        signer_address: Address,
        doc: &DirectSignDoc,
    ) -> Result<DirectSignResponse, SignerError> {
        (*self).sign_direct(signer_address, doc).await
    }
}

/// Where the dApp is running. Decides which backend is used.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum Environment {
    /// Browser with the extension injected.
    #[default]
    Desktop,
    /// Mobile browser, talk to the app over a relay.
    Mobile,
}

const MOBILE_MARKERS: [&str; 9] = [
    "Android",
    "webOS",
    "iPhone",
    "iPad",
    "iPod",
    "BlackBerry",
    "IEMobile",
    "Opera Mini",
    "Mobile",
];

impl Environment {
    /// Classify a user agent string. Anything that looks like a phone or tablet is mobile.
    pub fn from_user_agent(user_agent: &str) -> Self {
        if MOBILE_MARKERS
            .iter()
            .any(|marker| user_agent.contains(marker))
        {
            Environment::Mobile
        } else {
            Environment::Desktop
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Environment::Desktop => "desktop",
            Environment::Mobile => "mobile",
        }
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "desktop" => Ok(Environment::Desktop),
            "mobile" => Ok(Environment::Mobile),
            _ => Err(format!("Unknown environment {s:?}, expected desktop or mobile")),
        }
    }
}

/// Everything [WalletSigner::connect] might need. Only one backend is used.
pub struct SignerBackends<P, R, M> {
    #[allow(missing_docs)]
    pub provider: P,
    #[allow(missing_docs)]
    pub transport: R,
    /// Shows the pairing URI on mobile.
    pub modal: M,
    #[allow(missing_docs)]
    pub relay: RelayConfig,
    #[allow(missing_docs)]
    pub bootstrap: BootstrapOptions,
}

/// The signer picked once for the current [Environment].
pub enum WalletSigner<P, R> {
    #[allow(missing_docs)]
    Extension(ExtensionSigner<P>),
    #[allow(missing_docs)]
    Mobile(MobileSigner<R>),
}

impl<P: ExtensionProvider, R: RelayTransport> WalletSigner<P, R> {
    /// Connect the backend matching `environment`.
    pub async fn connect<M: QrModal>(
        environment: Environment,
        chain_id: impl Into<String>,
        backends: SignerBackends<P, R, M>,
    ) -> Result<Self, SignerError> {
        let SignerBackends {
            provider,
            transport,
            modal,
            relay,
            bootstrap,
        } = backends;
        let chain_id = chain_id.into();
        tracing::debug!("Connecting {environment} signer for {chain_id}");
        match environment {
            Environment::Desktop => ExtensionSigner::connect(provider, chain_id)
                .await
                .map(WalletSigner::Extension),
            Environment::Mobile => {
                MobileSigner::connect(transport, &modal, chain_id, &relay, &bootstrap)
                    .await
                    .map(WalletSigner::Mobile)
            }
        }
    }

    /// Which backend is in use.
    pub fn environment(&self) -> Environment {
        match self {
            WalletSigner::Extension(_) => Environment::Desktop,
            WalletSigner::Mobile(_) => Environment::Mobile,
        }
    }

    /// Chain this signer was connected for.
    pub fn chain_id(&self) -> &str {
        match self {
            WalletSigner::Extension(signer) => signer.chain_id(),
            WalletSigner::Mobile(signer) => signer.chain_id(),
        }
    }
}

impl<P: ExtensionProvider, R: RelayTransport> OfflineSigner for WalletSigner<P, R> {
    async fn get_accounts(&self) -> Result<Vec<AccountData>, SignerError> {
        match self {
            WalletSigner::Extension(signer) => signer.get_accounts().await,
            WalletSigner::Mobile(signer) => signer.get_accounts().await,
        }
    }

    async fn sign_amino(
        &self,
        signer_address: Address,
        doc: &StdSignDoc,
    ) -> Result<AminoSignResponse, SignerError> {
        match self {
            WalletSigner::Extension(signer) => signer.sign_amino(signer_address, doc).await,
            WalletSigner::Mobile(signer) => signer.sign_amino(signer_address, doc).await,
        }
    }

    async fn sign_direct(
        &self,
        signer_address: Address,
        doc: &DirectSignDoc,
    ) -> Result<DirectSignResponse, SignerError> {
        match self {
            WalletSigner::Extension(signer) => signer.sign_direct(signer_address, doc).await,
            WalletSigner::Mobile(signer) => signer.sign_direct(signer_address, doc).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::SignerErrorKind,
        error::JsonRpcError,
        extension::MissingExtension,
        relay::{Approval, LoopbackRelay, NoopModal, WalletApp},
        sign_doc::{make_amino_send_message, make_sign_doc, AminoCoin, StdFee},
        AddressHrp, HasAddress, LocalKeyProvider, SeedPhrase,
    };

    #[test]
    fn user_agents() {
        for ua in [
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15",
            "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 Mobile Safari/537.36",
            "Opera/9.80 (J2ME/MIDP; Opera Mini/9.80)",
        ] {
            assert_eq!(Environment::from_user_agent(ua), Environment::Mobile, "{ua}");
        }
        assert_eq!(
            Environment::from_user_agent(
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 Chrome/120.0 Safari/537.36"
            ),
            Environment::Desktop
        );
        assert_eq!(Environment::from_user_agent(""), Environment::Desktop);
    }

    #[test]
    fn environment_names() {
        assert_eq!("mobile".parse::<Environment>().unwrap(), Environment::Mobile);
        assert_eq!(Environment::Desktop.to_string(), "desktop");
        "tablet".parse::<Environment>().unwrap_err();
    }

    fn local_provider() -> LocalKeyProvider {
        let mut provider = LocalKeyProvider::new(SeedPhrase::random().unwrap(), "test");
        provider
            .add_chain("juno-1", AddressHrp::from_static("juno"))
            .unwrap();
        provider
    }

    fn backends<P, R>(provider: P, transport: R) -> SignerBackends<P, R, NoopModal> {
        SignerBackends {
            provider,
            transport,
            modal: NoopModal,
            relay: RelayConfig::default(),
            bootstrap: BootstrapOptions::default(),
        }
    }

    #[tokio::test]
    async fn desktop_uses_extension() {
        let provider = local_provider();
        let transport = LoopbackRelay::with_approval(local_provider(), Approval::Ignore);
        let signer = WalletSigner::connect(
            Environment::Desktop,
            "juno-1",
            backends(provider.clone(), transport),
        )
        .await
        .unwrap();
        assert_eq!(signer.environment(), Environment::Desktop);
        let accounts = signer.get_accounts().await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(
            accounts[0].address,
            provider.wallet("juno-1").unwrap().get_address()
        );
    }

    #[tokio::test]
    async fn mobile_uses_relay() {
        let wallet_side = local_provider();
        let transport = LoopbackRelay::new(wallet_side.clone());
        let signer = WalletSigner::connect(
            Environment::Mobile,
            "juno-1",
            backends(MissingExtension, transport),
        )
        .await
        .unwrap();
        assert_eq!(signer.environment(), Environment::Mobile);
        assert_eq!(signer.chain_id(), "juno-1");
        let accounts = signer.get_accounts().await.unwrap();
        assert_eq!(
            accounts[0].address,
            wallet_side.wallet("juno-1").unwrap().get_address()
        );
    }

    #[tokio::test]
    async fn missing_extension_is_install_error() {
        let err = match WalletSigner::connect(
            Environment::Desktop,
            "juno-1",
            backends(MissingExtension, LoopbackRelay::new(local_provider())),
        )
        .await
        {
            Ok(_) => panic!("connected without an extension"),
            Err(err) => err,
        };
        assert_eq!(err.kind(), SignerErrorKind::ExtensionInstall);
    }

    /// Wallet app that remembers every request it was asked to run.
    struct RecordingApp {
        inner: LocalKeyProvider,
        seen: parking_lot::Mutex<Vec<(String, serde_json::Value)>>,
    }

    impl WalletApp for RecordingApp {
        async fn session_addresses(&self, chain_id: &str) -> Result<Vec<Address>, JsonRpcError> {
            self.inner.session_addresses(chain_id).await
        }

        async fn handle_request(
            &self,
            chain_id: Option<&str>,
            method: &str,
            params: serde_json::Value,
        ) -> Result<serde_json::Value, JsonRpcError> {
            self.seen.lock().push((method.to_owned(), params.clone()));
            self.inner.handle_request(chain_id, method, params).await
        }
    }

    #[tokio::test]
    async fn same_document_same_request() {
        let transport = LoopbackRelay::new(RecordingApp {
            inner: local_provider(),
            seen: parking_lot::Mutex::new(vec![]),
        });
        let signer = WalletSigner::connect(
            Environment::Mobile,
            "juno-1",
            backends(MissingExtension, transport),
        )
        .await
        .unwrap();
        let address = signer.get_accounts().await.unwrap()[0].address;
        let doc = make_sign_doc(
            vec![make_amino_send_message(address, address, 1, "ujuno")],
            StdFee::new(vec![AminoCoin::new(0, "ujuno")], 80000),
            "juno-1",
            "",
            7,
            3,
        );
        signer.sign_amino(address, &doc).await.unwrap();
        signer.sign_amino(address, &doc).await.unwrap();

        let WalletSigner::Mobile(mobile) = &signer else {
            panic!("expected the mobile backend")
        };
        let seen = mobile.transport().wallet().seen.lock().clone();
        let signs = seen
            .iter()
            .filter(|(method, _)| method == crate::relay::SIGN_TX_V1)
            .collect::<Vec<_>>();
        assert_eq!(signs.len(), 2);
        assert_eq!(signs[0], signs[1]);
    }

    #[tokio::test]
    async fn connect_then_sign_transfer_of_one() {
        let signer = WalletSigner::connect(
            Environment::Desktop,
            "juno-1",
            backends(local_provider(), LoopbackRelay::new(local_provider())),
        )
        .await
        .unwrap();
        let accounts = signer.get_accounts().await.unwrap();
        assert_eq!(accounts.len(), 1);
        let address = accounts[0].address;

        let msgs = vec![make_amino_send_message(address, address, "1", "ujuno")];
        let doc = make_sign_doc(
            msgs.clone(),
            StdFee::new(vec![AminoCoin::new(0, "ujuno")], 80000),
            "juno-1",
            "",
            0,
            0,
        );
        let signed = signer.sign_amino(address, &doc).await.unwrap();
        assert_eq!(signed.signed.msgs, msgs);
        assert_eq!(signed.signature.signature_bytes().unwrap().len(), 64);
        assert_eq!(signed.signature.pub_key.key_bytes().unwrap(), accounts[0].pubkey);
    }
}
