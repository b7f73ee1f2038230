use std::str::FromStr;

use anyhow::{Context, Result};
use cosmostation::{
    clap::NetworkOpt,
    relay::{BootstrapOptions, LoopbackRelay, QrModal, RelayConfig, RelayProtocol},
    AccountData, Address, ClientBuilder, Environment, LocalKeyProvider, OfflineSigner,
    ParsedCoin, SeedPhrase, SignMode, SignerBackends, WalletSigner,
};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::{config, my_duration::MyDuration, wallet};

/// Command line dApp for signing with the Cosmostation wallet
#[derive(clap::Parser)]
pub(crate) struct Cmd {
    #[clap(flatten)]
    pub(crate) opt: Opt,
    #[clap(subcommand)]
    pub(crate) subcommand: Subcommand,
}

#[derive(clap::Parser)]
pub(crate) struct Opt {
    #[clap(flatten)]
    pub(crate) network_opt: NetworkOpt,
    /// Turn on verbose output
    #[clap(long, short, global = true)]
    verbose: bool,
}

impl Opt {
    pub(crate) fn init_logger(&self) -> Result<()> {
        let mut filter = EnvFilter::from_default_env().add_directive(Level::INFO.into());

        if self.verbose {
            filter = filter.add_directive("cosmostation=debug".parse()?);
            filter = filter.add_directive(format!("{}=debug", env!("CARGO_CRATE_NAME")).parse()?);
        };

        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::Layer::default()
                .with_writer(std::io::stderr)
                .and_then(filter),
        );

        subscriber.init();
        Ok(())
    }
}

/// Backend selection: a fixed [Environment] or detection from the user agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub(crate) enum EnvironmentChoice {
    #[default]
    Auto,
    Fixed(Environment),
}

impl EnvironmentChoice {
    pub(crate) fn resolve(self, user_agent: Option<&str>) -> Environment {
        match self {
            EnvironmentChoice::Fixed(environment) => environment,
            EnvironmentChoice::Auto => user_agent
                .map(Environment::from_user_agent)
                .unwrap_or_default(),
        }
    }
}

impl FromStr for EnvironmentChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(EnvironmentChoice::Auto),
            _ => s
                .parse()
                .map(EnvironmentChoice::Fixed)
                .map_err(|e| format!("{e}, or auto")),
        }
    }
}

/// Connected wallet used by every signing subcommand.
pub(crate) type CliSigner = WalletSigner<LocalKeyProvider, LoopbackRelay<LocalKeyProvider>>;

#[derive(clap::Parser)]
pub(crate) struct SignerOpt {
    /// Mnemonic phrase backing the local wallet
    #[clap(long, env = "COSMOSTATION_WALLET")]
    wallet: Option<SeedPhrase>,
    /// Wallet backend: desktop (extension), mobile (relay) or auto
    #[clap(long, env = "COSMOSTATION_ENVIRONMENT", default_value = "auto")]
    environment: EnvironmentChoice,
    /// User agent used to pick the backend with --environment auto
    #[clap(long, env = "COSMOSTATION_USER_AGENT")]
    user_agent: Option<String>,
    /// Relay protocol for mobile sessions, v1 or v2
    #[clap(long, env = "COSMOSTATION_RELAY_PROTOCOL", default_value = "v1")]
    relay_protocol: RelayProtocol,
    /// Give up waiting for the wallet after this long, e.g. 30s or 2m
    #[clap(long, env = "COSMOSTATION_CONNECT_TIMEOUT")]
    connect_timeout: Option<MyDuration>,
}

impl SignerOpt {
    pub(crate) fn environment(&self) -> Environment {
        self.environment.resolve(self.user_agent.as_deref())
    }

    pub(crate) async fn connect(&self, builder: &ClientBuilder) -> Result<CliSigner> {
        let wallet = self
            .wallet
            .clone()
            .context("No wallet provided, use --wallet or COSMOSTATION_WALLET")?;
        let mut provider = LocalKeyProvider::new(wallet, env!("CARGO_PKG_NAME"));
        provider.add_chain(builder.chain_id(), builder.hrp())?;
        let backends = SignerBackends {
            transport: LoopbackRelay::new(provider.clone()),
            provider,
            modal: TerminalModal,
            relay: RelayConfig {
                protocol: self.relay_protocol,
                ..RelayConfig::default()
            },
            bootstrap: BootstrapOptions {
                connect_timeout: self.connect_timeout.map(MyDuration::into_std_duration),
            },
        };
        Ok(WalletSigner::connect(self.environment(), builder.chain_id(), backends).await?)
    }
}

/// The account the wallet lists first.
pub(crate) async fn first_account(signer: &impl OfflineSigner) -> Result<AccountData> {
    signer
        .get_accounts()
        .await?
        .into_iter()
        .next()
        .context("Wallet returned no accounts")
}

/// Prints the pairing URI for the wallet user to open.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TerminalModal;

impl QrModal for TerminalModal {
    fn open(&self, uri: &str, chain_ids: &[String]) {
        eprintln!(
            "Open this link in the Cosmostation app to connect {}:",
            chain_ids.join(", ")
        );
        eprintln!("{uri}");
    }

    fn close(&self) {
        tracing::debug!("Pairing prompt closed");
    }
}

#[derive(clap::Parser)]
pub(crate) struct TxOpt {
    /// Memo to put on transaction
    #[clap(long)]
    pub(crate) memo: Option<String>,
    /// Signing mode, amino or direct
    #[clap(long, default_value_t = SignMode::Amino)]
    pub(crate) sign_mode: SignMode,
}

#[derive(clap::Parser)]
pub(crate) enum Subcommand {
    /// Connect the wallet and list its accounts
    Accounts {
        #[clap(flatten)]
        signer: SignerOpt,
    },
    /// Print bank balances, or a CW20 balance with --contract
    Balance {
        /// Address to check, defaults to the wallet's first account
        #[clap(long)]
        address: Option<Address>,
        /// CW20 token contract
        #[clap(long)]
        contract: Option<Address>,
        #[clap(flatten)]
        signer: SignerOpt,
    },
    /// Send coins to the given address
    Send {
        #[clap(flatten)]
        signer: SignerOpt,
        #[clap(flatten)]
        tx_opt: TxOpt,
        /// Destination address
        #[clap(long)]
        to: Address,
        /// Coins to send, e.g. 100ujuno
        coins: Vec<ParsedCoin>,
    },
    /// Send one unit of the fee denom to yourself
    SendSelf {
        #[clap(flatten)]
        signer: SignerOpt,
        #[clap(flatten)]
        tx_opt: TxOpt,
    },
    /// Sign a transfer to yourself and print the result without broadcasting
    SignOnly {
        #[clap(flatten)]
        signer: SignerOpt,
        #[clap(flatten)]
        tx_opt: TxOpt,
    },
    /// Transfer CW20 tokens
    Cw20Transfer {
        #[clap(flatten)]
        signer: SignerOpt,
        #[clap(flatten)]
        tx_opt: TxOpt,
        /// CW20 token contract, defaults to the network's configured contract
        #[clap(long)]
        contract: Option<Address>,
        /// Receiving address
        #[clap(long)]
        recipient: Address,
        /// Amount in the token's smallest unit
        #[clap(long, default_value_t = 1)]
        amount: u128,
    },
    /// Local key utilities
    Wallet {
        #[clap(flatten)]
        opt: wallet::Opt,
    },
    /// Inspect or change the config file
    Config {
        #[clap(subcommand)]
        opt: config::Opt,
    },
    /// Generate bash shell completion script
    GenerateShellCompletions {
        /// Which shell to generate for
        #[clap(default_value_t = clap_complete::Shell::Bash)]
        shell: clap_complete::Shell,
    },
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::*;

    const PHRASE: &str =
        "dilemma flavor noise circle voyage vacant amateur mass morning tunnel unhappy entire";

    #[test]
    fn command_is_consistent() {
        Cmd::command().debug_assert();
    }

    #[test]
    fn environment_choice() {
        assert_eq!(
            "auto".parse::<EnvironmentChoice>(),
            Ok(EnvironmentChoice::Auto)
        );
        assert_eq!(
            "mobile".parse::<EnvironmentChoice>(),
            Ok(EnvironmentChoice::Fixed(Environment::Mobile))
        );
        "tablet".parse::<EnvironmentChoice>().unwrap_err();
    }

    #[test]
    fn auto_detects_from_user_agent() {
        let iphone = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148";
        assert_eq!(
            EnvironmentChoice::Auto.resolve(Some(iphone)),
            Environment::Mobile
        );
        assert_eq!(EnvironmentChoice::Auto.resolve(None), Environment::Desktop);
        assert_eq!(
            EnvironmentChoice::Fixed(Environment::Desktop).resolve(Some(iphone)),
            Environment::Desktop
        );
    }

    #[test]
    fn parse_send() {
        let cmd = Cmd::try_parse_from([
            "cosmostation",
            "--network",
            "juno-mainnet",
            "send",
            "--wallet",
            PHRASE,
            "--environment",
            "mobile",
            "--sign-mode",
            "direct",
            "--to",
            "osmo1t3mvqjxvfxlstyzfskl37zqgu5ftq0rttpqqc5",
            "5ujuno",
        ])
        .unwrap();
        match cmd.subcommand {
            Subcommand::Send {
                signer,
                tx_opt,
                coins,
                ..
            } => {
                assert_eq!(signer.environment(), Environment::Mobile);
                assert_eq!(tx_opt.sign_mode, SignMode::Direct);
                assert_eq!(coins, vec!["5ujuno".parse::<ParsedCoin>().unwrap()]);
            }
            _ => panic!("expected send"),
        }
    }

    #[tokio::test]
    async fn connect_without_wallet() {
        let cmd = Cmd::try_parse_from(["cosmostation", "accounts"]).unwrap();
        let Subcommand::Accounts { signer } = cmd.subcommand else {
            panic!("expected accounts")
        };
        let builder = cosmostation::DappNetwork::JunoMainnet.builder();
        let err = match signer.connect(&builder).await {
            Ok(_) => panic!("connected without a wallet"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("No wallet provided"));
    }

    #[tokio::test]
    async fn desktop_and_mobile_list_same_account() {
        let builder = cosmostation::DappNetwork::JunoMainnet.builder();
        let mut addresses = vec![];
        for environment in ["desktop", "mobile"] {
            let cmd = Cmd::try_parse_from([
                "cosmostation",
                "accounts",
                "--wallet",
                PHRASE,
                "--environment",
                environment,
            ])
            .unwrap();
            let Subcommand::Accounts { signer } = cmd.subcommand else {
                panic!("expected accounts")
            };
            let signer = signer.connect(&builder).await.unwrap();
            assert_eq!(signer.environment().to_string(), environment);
            addresses.push(first_account(&signer).await.unwrap().address);
        }
        assert_eq!(addresses[0], addresses[1]);
    }
}
