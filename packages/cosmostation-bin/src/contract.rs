use anyhow::Result;
use cosmostation::{Address, HasAddress, LcdClient, OfflineSigner, SigningClient, TxBuilder};

use crate::cli::{first_account, TxOpt};

#[derive(serde::Serialize)]
#[serde(rename_all = "snake_case")]
enum Cw20QueryMsg {
    Balance { address: String },
}

#[derive(serde::Serialize)]
#[serde(rename_all = "snake_case")]
enum Cw20ExecuteMsg {
    Transfer { recipient: String, amount: String },
}

#[derive(serde::Deserialize)]
struct BalanceResponse {
    balance: String,
}

pub(crate) async fn cw20_balance(
    client: &LcdClient,
    contract: Address,
    address: Address,
) -> Result<()> {
    let BalanceResponse { balance } = client
        .query_contract_smart(
            contract,
            &Cw20QueryMsg::Balance {
                address: address.to_string(),
            },
        )
        .await?;
    println!("{balance}");
    Ok(())
}

pub(crate) async fn cw20_transfer<S: OfflineSigner>(
    client: &SigningClient<S>,
    contract: Address,
    recipient: Address,
    amount: u128,
    TxOpt { memo, sign_mode }: TxOpt,
) -> Result<()> {
    let sender = first_account(client.signer()).await?.get_address();
    let msg = Cw20ExecuteMsg::Transfer {
        recipient: recipient.to_string(),
        amount: amount.to_string(),
    };
    let mut builder = TxBuilder::default();
    builder
        .add_execute_message(contract, sender, vec![], &msg)?
        .set_optional_memo(memo);
    let fee = client.calculate_fee(None)?;
    let txres = client
        .sign_and_broadcast(sender, &builder, fee, sign_mode)
        .await?;
    println!("{}", txres.txhash);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cw20_message_shapes() {
        let query = serde_json::to_value(Cw20QueryMsg::Balance {
            address: "juno1abc".to_owned(),
        })
        .unwrap();
        assert_eq!(query, serde_json::json!({"balance": {"address": "juno1abc"}}));

        let transfer = serde_json::to_value(Cw20ExecuteMsg::Transfer {
            recipient: "juno1def".to_owned(),
            amount: "1".to_owned(),
        })
        .unwrap();
        assert_eq!(
            transfer,
            serde_json::json!({"transfer": {"recipient": "juno1def", "amount": "1"}})
        );
    }
}
