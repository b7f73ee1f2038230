mod signing;

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::{Digest, Sha256};

pub use self::signing::{SignMode, SignedTx, SigningClient};
use crate::{
    error::{Action, StringOrBytes},
    sign_doc::AminoCoin,
    Address, ClientBuilder, HasAddress,
};

/// A connection to an LCD (REST) endpoint of a Cosmos SDK chain.
///
/// Cheap to clone, all clones share the same HTTP connection pool.
#[derive(Clone)]
pub struct LcdClient {
    client: reqwest::Client,
    lcd: reqwest::Url,
    builder: Arc<ClientBuilder>,
}

impl std::fmt::Debug for LcdClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LcdClient")
            .field("lcd_url", &self.builder.lcd_url())
            .field("chain_id", &self.builder.chain_id())
            .finish()
    }
}

/// Account number and sequence of an on-chain account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseAccount {
    #[allow(missing_docs)]
    pub address: Address,
    #[allow(missing_docs)]
    pub account_number: u64,
    #[allow(missing_docs)]
    pub sequence: u64,
}

/// Transaction result as reported by the LCD endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TxResponse {
    /// Block height, zero until included in a block.
    #[serde(default, with = "crate::encoding::u64_string")]
    pub height: u64,
    #[allow(missing_docs)]
    #[serde(default)]
    pub txhash: String,
    /// Zero on success, otherwise an ABCI error code.
    #[serde(default)]
    pub code: u32,
    #[allow(missing_docs)]
    #[serde(default)]
    pub codespace: String,
    #[allow(missing_docs)]
    #[serde(default)]
    pub raw_log: String,
    #[allow(missing_docs)]
    #[serde(default, with = "crate::encoding::u64_string")]
    pub gas_wanted: u64,
    #[allow(missing_docs)]
    #[serde(default, with = "crate::encoding::u64_string")]
    pub gas_used: u64,
}

#[derive(serde::Deserialize)]
struct TxResponseWrapper {
    tx_response: Option<TxResponse>,
}

/// Hex encoded transaction hash, as used by Tendermint.
pub fn txhash_for(tx_bytes: &[u8]) -> String {
    hex::encode_upper(Sha256::digest(tx_bytes))
}

impl LcdClient {
    pub(crate) fn from_parts(
        client: reqwest::Client,
        lcd: reqwest::Url,
        builder: ClientBuilder,
    ) -> Self {
        LcdClient {
            client,
            lcd,
            builder: Arc::new(builder),
        }
    }

    /// Settings this client was built with.
    pub fn get_client_builder(&self) -> &ClientBuilder {
        &self.builder
    }

    fn lcd_url(&self) -> Arc<String> {
        Arc::new(self.builder.lcd_url().to_owned())
    }

    /// The LCD URL with `segments` appended, each percent-encoded as needed.
    fn endpoint(&self, segments: &[&str]) -> reqwest::Url {
        let mut url = self.lcd.clone();
        // Base URLs are checked when the client is built.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
        action: Action,
    ) -> Result<T, crate::Error> {
        let res = req.send().await.map_err(|source| crate::Error::Http {
            source,
            lcd_url: self.lcd_url(),
            action: action.clone(),
        })?;
        let status = res.status();
        let body = res.text().await.map_err(|source| crate::Error::Http {
            source,
            lcd_url: self.lcd_url(),
            action: action.clone(),
        })?;
        if status == reqwest::StatusCode::NOT_FOUND
            || (!status.is_success() && body.contains("not found"))
        {
            return Err(crate::Error::NotFound {
                message: body,
                action,
            });
        }
        if !status.is_success() {
            return Err(crate::Error::HttpStatus {
                status,
                body,
                lcd_url: self.lcd_url(),
                action,
            });
        }
        serde_json::from_str(&body).map_err(|source| crate::Error::JsonDeserialize { source, action })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &[&str],
        query: &[(&str, String)],
        action: Action,
    ) -> Result<T, crate::Error> {
        let url = self.endpoint(path);
        tracing::debug!("GET {url}, action: {action}");
        self.handle_response(self.client.get(url).query(query), action)
            .await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &[&str],
        body: &impl serde::Serialize,
        action: Action,
    ) -> Result<T, crate::Error> {
        let url = self.endpoint(path);
        tracing::debug!("POST {url}, action: {action}");
        self.handle_response(self.client.post(url).json(body), action)
            .await
    }

    /// Look up account number and sequence.
    pub async fn get_base_account(
        &self,
        address: impl HasAddress,
    ) -> Result<BaseAccount, crate::Error> {
        let address = address.get_address();
        let action = Action::GetBaseAccount(address);

        #[derive(serde::Deserialize)]
        struct AccountResponse {
            account: Value,
        }

        let res: AccountResponse = self
            .get_json(
                &["cosmos", "auth", "v1beta1", "accounts", &address.to_string()],
                &[],
                action.clone(),
            )
            .await?;
        parse_base_account(address, &res.account).ok_or_else(|| {
            crate::Error::InvalidChainResponse {
                message: format!("Unable to find account_number and sequence in {}", res.account),
                action,
            }
        })
    }

    /// Every bank balance held by the address, following pagination.
    pub async fn all_balances(
        &self,
        address: impl HasAddress,
    ) -> Result<Vec<AminoCoin>, crate::Error> {
        let address = address.get_address();
        let action = Action::QueryAllBalances(address);

        #[derive(serde::Deserialize)]
        struct BalancesResponse {
            balances: Vec<AminoCoin>,
            pagination: Option<Pagination>,
        }
        #[derive(serde::Deserialize)]
        struct Pagination {
            next_key: Option<String>,
        }

        let address = address.to_string();
        let path = ["cosmos", "bank", "v1beta1", "balances", &address];
        let mut coins = vec![];
        let mut key = None;
        loop {
            let query = match key.take() {
                None => vec![],
                Some(key) => vec![("pagination.key", key)],
            };
            let res: BalancesResponse = self.get_json(&path, &query, action.clone()).await?;
            coins.extend(res.balances);
            match res.pagination.and_then(|p| p.next_key) {
                Some(next) if !next.is_empty() => key = Some(next),
                _ => break Ok(coins),
            }
        }
    }

    /// Balance of a single denom, zero if the account holds none.
    pub async fn balance(
        &self,
        address: impl HasAddress,
        denom: &str,
    ) -> Result<AminoCoin, crate::Error> {
        Ok(self
            .all_balances(address)
            .await?
            .into_iter()
            .find(|coin| coin.denom == denom)
            .unwrap_or_else(|| AminoCoin::new(0, denom)))
    }

    /// Run a CosmWasm smart query and parse the response.
    pub async fn query_contract_smart<T: DeserializeOwned>(
        &self,
        contract: impl HasAddress,
        msg: &impl serde::Serialize,
    ) -> Result<T, crate::Error> {
        let contract = contract.get_address();
        let msg = serde_json::to_vec(msg)?;
        let encoded = STANDARD.encode(&msg);
        let action = Action::SmartQuery {
            contract,
            message: StringOrBytes(msg),
        };

        #[derive(serde::Deserialize)]
        struct SmartResponse<T> {
            data: T,
        }

        let res: SmartResponse<T> = self
            .get_json(
                &[
                    "cosmwasm",
                    "wasm",
                    "v1",
                    "contract",
                    &contract.to_string(),
                    "smart",
                    &encoded,
                ],
                &[],
                action,
            )
            .await?;
        Ok(res.data)
    }

    /// Broadcast signed transaction bytes in sync mode.
    ///
    /// This does not check the response code, see [SigningClient::sign_and_broadcast].
    pub async fn broadcast_tx(&self, tx_bytes: &[u8]) -> Result<TxResponse, crate::Error> {
        self.broadcast_tx_with_action(tx_bytes, Action::BroadcastRaw(txhash_for(tx_bytes)))
            .await
    }

    pub(crate) async fn broadcast_tx_with_action(
        &self,
        tx_bytes: &[u8],
        action: Action,
    ) -> Result<TxResponse, crate::Error> {
        let body = serde_json::json!({
            "tx_bytes": STANDARD.encode(tx_bytes),
            "mode": "BROADCAST_MODE_SYNC",
        });
        let res: TxResponseWrapper = self
            .post_json(&["cosmos", "tx", "v1beta1", "txs"], &body, action.clone())
            .await?;
        res.tx_response
            .ok_or_else(|| crate::Error::InvalidChainResponse {
                message: "Missing inner tx_response".to_owned(),
                action,
            })
    }

    /// Get a transaction by hash, failing with [crate::Error::NotFound] if unknown.
    pub async fn get_transaction(
        &self,
        txhash: impl Into<String>,
    ) -> Result<TxResponse, crate::Error> {
        let txhash = txhash.into();
        self.get_transaction_with_action(&txhash, Action::GetTransaction(txhash.clone()))
            .await
    }

    async fn get_transaction_with_action(
        &self,
        txhash: &str,
        action: Action,
    ) -> Result<TxResponse, crate::Error> {
        let res: TxResponseWrapper = self
            .get_json(&["cosmos", "tx", "v1beta1", "txs", txhash], &[], action.clone())
            .await?;
        res.tx_response
            .ok_or_else(|| crate::Error::InvalidChainResponse {
                message: "Missing inner tx_response".to_owned(),
                action,
            })
    }

    /// Poll until the transaction is included in a block.
    pub async fn wait_for_transaction(
        &self,
        txhash: impl Into<String>,
    ) -> Result<TxResponse, crate::Error> {
        let txhash = txhash.into();
        let attempts = self.builder.transaction_attempts();
        for attempt in 1..=attempts {
            match self
                .get_transaction_with_action(&txhash, Action::WaitForTransaction(txhash.clone()))
                .await
            {
                Ok(res) => return Ok(res),
                Err(crate::Error::NotFound { .. }) => {
                    tracing::debug!("Transaction {txhash} not ready, attempt #{attempt}/{attempts}");
                    tokio::time::sleep(self.builder.transaction_delay()).await;
                }
                Err(e) => return Err(e),
            }
        }
        Err(crate::Error::WaitForTransactionTimedOut { txhash })
    }
}

/// Find account number and sequence, looking through vesting and module account wrappers.
fn parse_base_account(address: Address, account: &Value) -> Option<BaseAccount> {
    let obj = account.as_object()?;
    if let Some(account_number) = obj.get("account_number") {
        let parse = |value: Option<&Value>| -> Option<u64> {
            match value {
                // New accounts report no sequence at all.
                None | Some(Value::Null) => Some(0),
                Some(Value::String(s)) => s.parse().ok(),
                Some(Value::Number(n)) => n.as_u64(),
                Some(_) => None,
            }
        };
        return Some(BaseAccount {
            address,
            account_number: parse(Some(account_number))?,
            sequence: parse(obj.get("sequence"))?,
        });
    }
    ["base_account", "base_vesting_account"]
        .into_iter()
        .find_map(|key| parse_base_account(address, obj.get(key)?))
}
