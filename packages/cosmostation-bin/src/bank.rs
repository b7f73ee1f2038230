use anyhow::Result;
use cosmostation::{
    sign_doc::{AminoCoin, StdFee},
    Address, HasAddress, LcdClient, OfflineSigner, ParsedCoin, SignMode, SigningClient,
    TxBuilder,
};

use crate::cli::{first_account, TxOpt};

/// Gas requested by the self transfers, paid with a zero fee.
const SELF_TRANSFER_GAS: u64 = 80000;

pub(crate) async fn balance(client: &LcdClient, address: Address) -> Result<()> {
    let balances = client.all_balances(address).await?;
    for AminoCoin { denom, amount } in &balances {
        println!("{amount}{denom}");
    }
    if balances.is_empty() {
        println!("0");
    }
    Ok(())
}

pub(crate) async fn send<S: OfflineSigner>(
    client: &SigningClient<S>,
    dest: Address,
    coins: Vec<ParsedCoin>,
    TxOpt { memo, sign_mode }: TxOpt,
) -> Result<()> {
    let from = first_account(client.signer()).await?;
    let txres = client
        .send_tokens(
            &from,
            dest,
            coins.into_iter().map(|x| x.into()).collect(),
            memo,
            sign_mode,
        )
        .await?;
    println!("{}", txres.txhash);
    Ok(())
}

/// One unit of the fee denom from the wallet back to itself.
fn self_transfer<S: OfflineSigner>(
    client: &SigningClient<S>,
    address: Address,
    memo: Option<String>,
) -> (TxBuilder, StdFee) {
    let denom = client.client().get_client_builder().denom();
    let mut builder = TxBuilder::default();
    builder
        .add_send_message(address, address, vec![AminoCoin::new(1, denom).into()])
        .set_optional_memo(memo);
    let fee = StdFee::new(vec![AminoCoin::new(0, denom)], SELF_TRANSFER_GAS);
    (builder, fee)
}

pub(crate) async fn send_self<S: OfflineSigner>(
    client: &SigningClient<S>,
    TxOpt { memo, sign_mode }: TxOpt,
) -> Result<()> {
    let address = first_account(client.signer()).await?.get_address();
    let (builder, fee) = self_transfer(client, address, memo);
    let txres = client
        .sign_and_broadcast(address, &builder, fee, sign_mode)
        .await?;
    println!("{}", txres.txhash);
    Ok(())
}

pub(crate) async fn sign_only<S: OfflineSigner>(
    client: &SigningClient<S>,
    TxOpt { memo, sign_mode }: TxOpt,
) -> Result<()> {
    let address = first_account(client.signer()).await?.get_address();
    let (builder, fee) = self_transfer(client, address, memo);
    let output = match sign_mode {
        SignMode::Amino => {
            serde_json::to_string_pretty(&client.sign_amino_only(address, &builder, fee).await?)?
        }
        SignMode::Direct => {
            serde_json::to_string_pretty(&client.sign_direct_only(address, &builder, fee).await?)?
        }
    };
    println!("{output}");
    Ok(())
}
