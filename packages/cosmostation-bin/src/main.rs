mod bank;
mod cli;
mod config;
mod contract;
mod my_duration;
mod wallet;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use cli::Subcommand;
use cosmostation::{HasAddress, OfflineSigner, SigningClient};

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = cli::Cmd::parse();
    cmd.opt.init_logger()?;

    tracing::debug!("Verbose logging enabled");

    cmd.subcommand.go(cmd.opt).await
}

impl Subcommand {
    pub(crate) async fn go(self, opt: cli::Opt) -> Result<()> {
        match self {
            Subcommand::Accounts { signer } => {
                let client = opt.network_opt.build()?;
                let signer = signer.connect(client.get_client_builder()).await?;
                tracing::info!("Connected through the {} backend", signer.environment());
                for account in signer.get_accounts().await? {
                    println!(
                        "{} {} {}",
                        account.address,
                        account.algo,
                        hex::encode(&account.pubkey)
                    );
                }
            }
            Subcommand::Balance {
                address,
                contract,
                signer,
            } => {
                let client = opt.network_opt.build()?;
                let address = match address {
                    Some(address) => address,
                    None => {
                        let signer = signer.connect(client.get_client_builder()).await?;
                        cli::first_account(&signer).await?.get_address()
                    }
                };
                match contract {
                    Some(contract) => contract::cw20_balance(&client, contract, address).await?,
                    None => bank::balance(&client, address).await?,
                }
            }
            Subcommand::Send {
                signer,
                tx_opt,
                to,
                coins,
            } => {
                let client = opt.network_opt.build()?;
                let signer = signer.connect(client.get_client_builder()).await?;
                let client = SigningClient::new(client, signer);
                bank::send(&client, to, coins, tx_opt).await?;
            }
            Subcommand::SendSelf { signer, tx_opt } => {
                let client = opt.network_opt.build()?;
                let signer = signer.connect(client.get_client_builder()).await?;
                let client = SigningClient::new(client, signer);
                bank::send_self(&client, tx_opt).await?;
            }
            Subcommand::SignOnly { signer, tx_opt } => {
                let client = opt.network_opt.build()?;
                let signer = signer.connect(client.get_client_builder()).await?;
                let client = SigningClient::new(client, signer);
                bank::sign_only(&client, tx_opt).await?;
            }
            Subcommand::Cw20Transfer {
                signer,
                tx_opt,
                contract,
                recipient,
                amount,
            } => {
                let contract = match contract {
                    Some(contract) => contract,
                    None => config::default_contract(&opt.network_opt)?,
                };
                let client = opt.network_opt.build()?;
                let signer = signer.connect(client.get_client_builder()).await?;
                let client = SigningClient::new(client, signer);
                contract::cw20_transfer(&client, contract, recipient, amount, tx_opt).await?;
            }
            Subcommand::Wallet { opt } => {
                wallet::go(opt)?;
            }
            Subcommand::Config { opt: inner } => config::go(&opt.network_opt, inner)?,
            Subcommand::GenerateShellCompletions { shell } => {
                clap_complete::generate(
                    shell,
                    &mut cli::Cmd::command(),
                    "cosmostation",
                    &mut std::io::stdout(),
                );
            }
        }

        Ok(())
    }
}
