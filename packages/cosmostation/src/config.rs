//! User overrides for network settings, read from a TOML file and the environment.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    str::FromStr,
};

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};

use crate::{error::DappConfigError, AddressHrp, ClientBuilder, DappNetwork, GasPrice};

/// Configuration overrides for individual networks
#[derive(Debug)]
pub struct DappConfig {
    path: PathBuf,
    inner: DappConfigInner,
}

#[derive(serde::Deserialize, serde::Serialize, Debug, Default)]
struct DappConfigInner {
    #[serde(default)]
    network: BTreeMap<String, NetworkConfig>,
}

#[derive(serde::Deserialize, serde::Serialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case")]
struct NetworkConfig {
    lcd: Option<String>,
    chain_id: Option<String>,
    denom: Option<String>,
    hrp: Option<AddressHrp>,
    gas_price: Option<String>,
    gas_limit: Option<u64>,
    contract: Option<String>,
}

impl NetworkConfig {
    fn apply_base_config(&self, builder: &mut ClientBuilder) {
        if let Some(lcd) = &self.lcd {
            builder.set_lcd_url(lcd);
        }
        if let Some(chain_id) = self.chain_id.clone() {
            builder.set_chain_id(chain_id);
        }
        if let Some(denom) = self.denom.clone() {
            builder.set_denom(denom);
        }
        if let Some(hrp) = self.hrp {
            builder.set_hrp(hrp);
        }
    }

    fn apply_extra_config(
        &self,
        network: &str,
        builder: &mut ClientBuilder,
    ) -> Result<(), DappConfigError> {
        if let Some(gas_price) = &self.gas_price {
            let gas_price =
                GasPrice::from_str(gas_price).map_err(|source| DappConfigError::InvalidGasPrice {
                    network: network.to_owned(),
                    source,
                })?;
            builder.set_gas_price(Some(gas_price));
        }
        if let Some(gas_limit) = self.gas_limit {
            builder.set_gas_limit(Some(gas_limit));
        }
        Ok(())
    }
}

impl DappConfig {
    /// Find the default config file location
    pub fn default_file() -> Result<PathBuf, DappConfigError> {
        let dirs = directories::ProjectDirs::from("io", "cosmostation", "cosmostation-rs")
            .ok_or(DappConfigError::ProjectDirsNotFound)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Load the config values from the default config file location
    pub fn load() -> Result<DappConfig, DappConfigError> {
        Self::load_from(&Self::default_file()?, false)
    }

    /// Load the config values from the specified file
    pub fn load_from(config: &Path, required: bool) -> Result<DappConfig, DappConfigError> {
        if required && !config.exists() {
            return Err(DappConfigError::FileNotFound {
                path: config.to_owned(),
            });
        }
        let inner = Figment::new()
            .merge(Toml::file(config))
            .merge(Env::prefixed("COSMOSTATION_CONFIG_"))
            .extract()
            .map_err(|source| DappConfigError::ConfigLoadError {
                source: Box::new(source),
                path: config.to_owned(),
            })?;
        Ok(DappConfig {
            path: config.to_owned(),
            inner,
        })
    }

    /// Generate a builder for the given network name
    ///
    /// Built-in [DappNetwork] names start from their defaults. Any other name
    /// must be fully described in the config file.
    pub fn builder_for(&self, network: &str) -> Result<ClientBuilder, DappConfigError> {
        match (
            DappNetwork::from_str(network).ok(),
            self.inner.network.get(network),
        ) {
            (None, None) => Err(DappConfigError::UnknownNetwork {
                network: network.to_owned(),
                config: self.path.clone(),
            }),
            (None, Some(config)) => {
                match (&config.lcd, &config.chain_id, &config.denom, config.hrp) {
                    (Some(lcd), Some(chain_id), Some(denom), Some(hrp)) => {
                        let mut builder = ClientBuilder::new(chain_id, denom, hrp, lcd);
                        config.apply_extra_config(network, &mut builder)?;
                        Ok(builder)
                    }
                    _ => {
                        let mut missing = vec![];
                        if config.lcd.is_none() {
                            missing.push("lcd");
                        }
                        if config.chain_id.is_none() {
                            missing.push("chain-id");
                        }
                        if config.denom.is_none() {
                            missing.push("denom");
                        }
                        if config.hrp.is_none() {
                            missing.push("hrp");
                        }
                        Err(DappConfigError::MissingRequiredConfig {
                            missing: missing.join(", "),
                            path: self.path.clone(),
                            network: network.to_owned(),
                        })
                    }
                }
            }
            (Some(known), None) => Ok(known.builder()),
            (Some(known), Some(config)) => {
                let mut builder = known.builder();
                config.apply_base_config(&mut builder);
                config.apply_extra_config(network, &mut builder)?;
                Ok(builder)
            }
        }
    }

    /// Default CW20 contract for the network, from the config file or built in.
    pub fn contract_for(&self, network: &str) -> Option<String> {
        self.inner
            .network
            .get(network)
            .and_then(|config| config.contract.clone())
            .or_else(|| {
                DappNetwork::from_str(network)
                    .ok()
                    .and_then(DappNetwork::default_contract)
                    .map(str::to_owned)
            })
    }

    /// Print out a description of the config file
    pub fn print(&self) {
        println!("Location: {}", self.path.display());
        for (
            network,
            NetworkConfig {
                lcd,
                chain_id,
                denom,
                hrp,
                gas_price,
                gas_limit,
                contract,
            },
        ) in &self.inner.network
        {
            println!();
            println!("{network}");
            if let Some(lcd) = lcd {
                println!("LCD endpoint: {lcd}");
            }
            if let Some(chain_id) = chain_id {
                println!("Chain ID: {chain_id}");
            }
            if let Some(denom) = denom {
                println!("Denom: {denom}");
            }
            if let Some(hrp) = hrp {
                println!("Address prefix (HRP): {hrp}");
            }
            if let Some(gas_price) = gas_price {
                println!("Gas price: {gas_price}");
            }
            if let Some(gas_limit) = gas_limit {
                println!("Gas limit: {gas_limit}");
            }
            if let Some(contract) = contract {
                println!("CW20 contract: {contract}");
            }
        }
    }

    /// Add a new network to the config
    pub fn new_network(
        &mut self,
        name: String,
        lcd: String,
        chain_id: String,
        denom: String,
        hrp: AddressHrp,
    ) {
        self.inner.network.insert(
            name,
            NetworkConfig {
                lcd: Some(lcd),
                chain_id: Some(chain_id),
                denom: Some(denom),
                hrp: Some(hrp),
                ..NetworkConfig::default()
            },
        );
    }

    /// Write the config to the original file.
    pub fn save(&self) -> Result<(), DappConfigError> {
        self.save_to(&self.path)
    }

    /// Write the config to the given file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), DappConfigError> {
        let s = toml::to_string_pretty(&self.inner)
            .map_err(|source| DappConfigError::TomlSerialization { source })?;
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent).map_err(|source| DappConfigError::ConfigWrite {
                source,
                path: path.to_owned(),
            })?;
        }
        fs_err::write(path, s).map_err(|source| DappConfigError::ConfigWrite {
            source,
            path: path.to_owned(),
        })
    }

    fn entry(&mut self, name: String) -> &mut NetworkConfig {
        self.inner.network.entry(name).or_default()
    }

    /// Set the LCD endpoint
    pub fn set_lcd(&mut self, name: String, url: String) {
        self.entry(name).lcd = Some(url);
    }

    /// Set the chain ID
    pub fn set_chain_id(&mut self, name: String, chain_id: String) {
        self.entry(name).chain_id = Some(chain_id);
    }

    /// Set the fee denom
    pub fn set_denom(&mut self, name: String, denom: String) {
        self.entry(name).denom = Some(denom);
    }

    /// Set the Human Readable Part (HRP)
    pub fn set_hrp(&mut self, name: String, hrp: AddressHrp) {
        self.entry(name).hrp = Some(hrp);
    }

    /// Set the gas price
    pub fn set_gas_price(&mut self, name: String, gas_price: GasPrice) {
        self.entry(name).gas_price = Some(gas_price.to_string());
    }

    /// Set the default gas limit
    pub fn set_gas_limit(&mut self, name: String, gas_limit: u64) {
        self.entry(name).gas_limit = Some(gas_limit);
    }

    /// Set the default CW20 contract
    pub fn set_contract(&mut self, name: String, contract: String) {
        self.entry(name).contract = Some(contract);
    }
}

impl DappNetwork {
    /// Generating a builder, respecting the default config file.
    pub fn builder_with_config(self) -> Result<ClientBuilder, DappConfigError> {
        DappConfig::load()?.builder_for(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("cosmostation-config-{}-{name}", std::process::id()))
            .join("config.toml")
    }

    #[test]
    fn missing_required_file() {
        let path = temp_config("missing");
        assert!(matches!(
            DappConfig::load_from(&path, true),
            Err(DappConfigError::FileNotFound { .. })
        ));
    }

    #[test]
    fn builtin_network_without_file() {
        let config = DappConfig::load_from(&temp_config("absent"), false).unwrap();
        let builder = config.builder_for("juno-mainnet").unwrap();
        assert_eq!(builder.chain_id(), "juno-1");
        assert_eq!(builder.denom(), "ujuno");
        assert!(config.contract_for("juno-mainnet").is_some());
        assert!(matches!(
            config.builder_for("nowhere"),
            Err(DappConfigError::UnknownNetwork { .. })
        ));
    }

    #[test]
    fn save_and_reload() {
        let path = temp_config("roundtrip");
        let mut config = DappConfig::load_from(&path, false).unwrap();
        config.new_network(
            "local".to_owned(),
            "http://localhost:1317".to_owned(),
            "testing".to_owned(),
            "ustake".to_owned(),
            AddressHrp::from_static("wasm"),
        );
        config.set_gas_price("local".to_owned(), "0.025ustake".parse().unwrap());
        config.set_gas_limit("juno-mainnet".to_owned(), 300000);
        config.save().unwrap();

        let config = DappConfig::load_from(&path, true).unwrap();
        let builder = config.builder_for("local").unwrap();
        assert_eq!(builder.lcd_url(), "http://localhost:1317");
        assert_eq!(builder.hrp(), AddressHrp::from_static("wasm"));
        assert_eq!(builder.gas_price().unwrap().to_string(), "0.025ustake");
        assert_eq!(config.builder_for("juno-mainnet").unwrap().gas_limit(), 300000);
        fs_err::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn incomplete_custom_network() {
        let path = temp_config("incomplete");
        let mut config = DappConfig::load_from(&path, false).unwrap();
        config.set_lcd("partial".to_owned(), "http://localhost:1317".to_owned());
        match config.builder_for("partial") {
            Err(DappConfigError::MissingRequiredConfig { missing, .. }) => {
                assert_eq!(missing, "chain-id, denom, hrp")
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
