//! Provides helpers for generating client values from command line parameters.

use crate::{error::BuilderError, AddressHrp, ClientBuilder, DappNetwork, GasPrice, LcdClient};

/// Command line options for connecting to a chain's LCD endpoint
#[derive(clap::Parser, Clone, Debug)]
pub struct NetworkOpt {
    /// Which built-in network to connect to
    #[clap(long, env = "COSMOSTATION_NETWORK", global = true)]
    pub network: Option<DappNetwork>,
    /// Optional LCD endpoint override
    #[clap(long, env = "COSMOSTATION_LCD", global = true)]
    pub lcd: Option<String>,
    /// Optional chain ID override
    #[clap(long, env = "COSMOSTATION_CHAIN_ID", global = true)]
    pub chain_id: Option<String>,
    /// Fee denom (e.g. ujuno)
    #[clap(long, global = true, env = "COSMOSTATION_DENOM")]
    denom: Option<String>,
    /// Human readable part (HRP) of wallet addresses
    #[clap(long, global = true, env = "COSMOSTATION_HRP")]
    hrp: Option<AddressHrp>,
    /// Gas price override, e.g. 0.025uatom
    #[clap(long, global = true, env = "COSMOSTATION_GAS_PRICE")]
    gas_price: Option<GasPrice>,
    /// Default gas limit override
    #[clap(long, global = true, env = "COSMOSTATION_GAS_LIMIT")]
    gas_limit: Option<u64>,
    /// Referer header
    #[clap(long, global = true, env = "COSMOSTATION_REFERER_HEADER")]
    referer_header: Option<String>,
    /// Config file to use instead of the default location
    #[cfg(feature = "config")]
    #[clap(long, global = true, env = "COSMOSTATION_CONFIG")]
    pub config: Option<std::path::PathBuf>,
}

/// Errors for working with [NetworkOpt]
#[derive(thiserror::Error, Debug)]
#[allow(missing_docs)]
pub enum NetworkOptError {
    #[error("No network specified, either provide the COSMOSTATION_NETWORK env var or --network option, or provide the following settings: {missing}")]
    NoNetworkProvided { missing: String },
    #[error("{source}")]
    Builder { source: BuilderError },
    #[cfg(feature = "config")]
    #[error("{source}")]
    Config {
        source: crate::error::DappConfigError,
    },
}

impl NetworkOpt {
    #[cfg(feature = "config")]
    fn network_builder(&self, network: DappNetwork) -> Result<ClientBuilder, NetworkOptError> {
        match &self.config {
            None => network.builder_with_config(),
            Some(path) => crate::config::DappConfig::load_from(path, true)
                .and_then(|config| config.builder_for(network.as_str())),
        }
        .map_err(|source| NetworkOptError::Config { source })
    }

    #[cfg(not(feature = "config"))]
    fn network_builder(&self, network: DappNetwork) -> Result<ClientBuilder, NetworkOptError> {
        Ok(network.builder())
    }

    /// Convert these options into a new [ClientBuilder].
    pub fn into_builder(self) -> Result<ClientBuilder, NetworkOptError> {
        let network_builder = self
            .network
            .map(|network| self.network_builder(network))
            .transpose()?;
        let NetworkOpt {
            lcd,
            chain_id,
            denom,
            hrp,
            gas_price,
            gas_limit,
            referer_header,
            ..
        } = self;

        // Do the error checking here instead of in clap so that the field can
        // be global.
        let mut builder = match network_builder {
            Some(mut builder) => {
                if let Some(lcd) = lcd {
                    builder.set_lcd_url(lcd);
                }
                if let Some(chain_id) = chain_id {
                    builder.set_chain_id(chain_id);
                }
                if let Some(denom) = denom {
                    builder.set_denom(denom);
                }
                if let Some(hrp) = hrp {
                    builder.set_hrp(hrp)
                }
                builder
            }
            None => match (lcd, chain_id, denom, hrp) {
                (Some(lcd), Some(chain_id), Some(denom), Some(hrp)) => {
                    ClientBuilder::new(chain_id, denom, hrp, lcd)
                }
                (lcd, chain_id, denom, hrp) => {
                    let mut missing = vec![];
                    if lcd.is_none() {
                        missing.push("COSMOSTATION_LCD");
                    }
                    if chain_id.is_none() {
                        missing.push("COSMOSTATION_CHAIN_ID");
                    }
                    if denom.is_none() {
                        missing.push("COSMOSTATION_DENOM");
                    }
                    if hrp.is_none() {
                        missing.push("COSMOSTATION_HRP");
                    }
                    return Err(NetworkOptError::NoNetworkProvided {
                        missing: missing.join(", "),
                    });
                }
            },
        };
        if gas_price.is_some() {
            builder.set_gas_price(gas_price);
        }
        if gas_limit.is_some() {
            builder.set_gas_limit(gas_limit);
        }
        builder.set_referer_header(referer_header);

        Ok(builder)
    }

    /// Convenient for calling [NetworkOpt::into_builder] and then [ClientBuilder::build].
    pub fn build(self) -> Result<LcdClient, NetworkOptError> {
        self.into_builder()?
            .build()
            .map_err(|source| NetworkOptError::Builder { source })
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn custom_network_needs_everything() {
        let opt = NetworkOpt::try_parse_from(["test", "--lcd", "http://localhost:1317"]).unwrap();
        match opt.into_builder() {
            Err(NetworkOptError::NoNetworkProvided { missing }) => assert_eq!(
                missing,
                "COSMOSTATION_CHAIN_ID, COSMOSTATION_DENOM, COSMOSTATION_HRP"
            ),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn custom_network() {
        let opt = NetworkOpt::try_parse_from([
            "test",
            "--lcd",
            "http://localhost:1317",
            "--chain-id",
            "testing",
            "--denom",
            "ustake",
            "--hrp",
            "wasm",
            "--gas-price",
            "0.1ustake",
        ])
        .unwrap();
        let builder = opt.into_builder().unwrap();
        assert_eq!(builder.chain_id(), "testing");
        assert_eq!(builder.gas_price().unwrap().to_string(), "0.1ustake");
    }
}
