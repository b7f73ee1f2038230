use std::str::FromStr;

use anyhow::{Context, Result};
use cosmostation::{
    clap::NetworkOpt, config::DappConfig, error::DappConfigError, Address, AddressHrp,
};

#[derive(clap::Parser)]
pub(crate) enum Opt {
    /// Print the location of the config file
    File {},
    /// Print the values from the config
    Print {},
    /// Configure a new network
    ///
    /// This forces the caller to provide all required fields.
    /// If you want to make smaller updates, use the set subcommand.
    NewNetwork {
        /// Name to be used for this network
        #[clap(long)]
        name: String,
        /// LCD endpoint
        #[clap(long)]
        lcd: String,
        /// Chain ID
        #[clap(long)]
        chain_id: String,
        /// Address prefix/HRP
        #[clap(long)]
        hrp: AddressHrp,
        /// Fee denom
        #[clap(long)]
        denom: String,
    },
    /// Set a config value for a specific network
    Set {
        /// Network name
        name: String,
        /// Config key
        key: ConfigKey,
        /// Value
        value: String,
    },
}

#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum ConfigKey {
    Lcd,
    ChainId,
    Denom,
    Hrp,
    GasPrice,
    GasLimit,
    Contract,
}

impl FromStr for ConfigKey {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_owned()))
    }
}

fn load(opt: &NetworkOpt) -> Result<DappConfig, DappConfigError> {
    opt.config
        .as_ref()
        .map_or_else(DappConfig::load, |path| DappConfig::load_from(path, true))
}

/// The CW20 contract configured for the selected network.
pub(crate) fn default_contract(opt: &NetworkOpt) -> Result<Address> {
    let network = opt
        .network
        .context("No CW20 contract given, pass --contract or --network")?;
    let contract = load(opt)?
        .contract_for(network.as_str())
        .with_context(|| format!("No CW20 contract configured for {network}"))?;
    contract
        .parse()
        .with_context(|| format!("Invalid CW20 contract {contract} configured for {network}"))
}

pub(crate) fn go(opt: &NetworkOpt, inner: Opt) -> Result<()> {
    match inner {
        Opt::File {} => {
            match &opt.config {
                Some(file) => {
                    tracing::info!(
                        "Config file overridden by command line parameter or environment variable"
                    );
                    println!("{}", file.display());
                }
                None => println!("{}", DappConfig::default_file()?.display()),
            }
            Ok(())
        }
        Opt::Print {} => {
            let config = load(opt)?;
            config.print();
            Ok(())
        }
        Opt::NewNetwork {
            name,
            lcd,
            chain_id,
            hrp,
            denom,
        } => {
            let mut config = load(opt)?;
            config.new_network(name, lcd, chain_id, denom, hrp);
            config.save()?;
            println!("Changes saved");
            Ok(())
        }
        Opt::Set { name, key, value } => {
            let mut config = load(opt)?;
            match key {
                ConfigKey::Lcd => config.set_lcd(name, value),
                ConfigKey::ChainId => config.set_chain_id(name, value),
                ConfigKey::Denom => config.set_denom(name, value),
                ConfigKey::Hrp => config.set_hrp(name, value.parse()?),
                ConfigKey::GasPrice => config.set_gas_price(name, value.parse()?),
                ConfigKey::GasLimit => config.set_gas_limit(name, value.parse()?),
                ConfigKey::Contract => {
                    value.parse::<Address>()?;
                    config.set_contract(name, value)
                }
            }
            config.save()?;
            println!("Changes saved");
            Ok(())
        }
    }
}
