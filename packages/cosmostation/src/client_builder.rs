use std::{sync::Arc, time::Duration};

use crate::{error::BuilderError, gas_price::GasPrice, AddressHrp, LcdClient};

/// Used to build a [crate::LcdClient].
#[derive(Clone, Debug)]
pub struct ClientBuilder {
    lcd_url: Arc<String>,
    chain_id: String,
    denom: String,
    hrp: AddressHrp,

    // Values with defaults
    gas_price: Option<GasPrice>,
    gas_limit: Option<u64>,
    transaction_attempts: Option<usize>,
    transaction_delay: Option<Duration>,
    referer_header: Option<String>,
    request_timeout: Option<Duration>,
}

impl ClientBuilder {
    /// Create a new [ClientBuilder] with default options where possible.
    pub fn new(
        chain_id: impl Into<String>,
        denom: impl Into<String>,
        hrp: AddressHrp,
        lcd_url: impl Into<String>,
    ) -> ClientBuilder {
        Self {
            lcd_url: Arc::new(lcd_url.into()),
            chain_id: chain_id.into(),
            denom: denom.into(),
            hrp,
            gas_price: None,
            gas_limit: None,
            transaction_attempts: None,
            transaction_delay: None,
            referer_header: None,
            request_timeout: None,
        }
    }

    /// LCD endpoint, without a trailing slash
    pub fn lcd_url(&self) -> &str {
        self.lcd_url.trim_end_matches('/')
    }

    /// See [Self::lcd_url]
    pub fn set_lcd_url(&mut self, lcd_url: impl Into<String>) {
        self.lcd_url = lcd_url.into().into();
    }

    /// Chain ID we want to communicate with
    pub fn chain_id(&self) -> &str {
        self.chain_id.as_ref()
    }

    /// See [Self::chain_id]
    pub fn set_chain_id(&mut self, chain_id: String) {
        self.chain_id = chain_id;
    }

    /// Native coin used for transfers
    pub fn denom(&self) -> &str {
        self.denom.as_ref()
    }

    /// See [Self::denom]
    pub fn set_denom(&mut self, denom: String) {
        self.denom = denom;
    }

    /// Human-readable part (HRP) of chain addresses
    pub fn hrp(&self) -> AddressHrp {
        self.hrp
    }

    /// See [Self::hrp]
    pub fn set_hrp(&mut self, hrp: AddressHrp) {
        self.hrp = hrp;
    }

    /// Gas price used by [crate::SigningClient::calculate_fee]
    pub fn gas_price(&self) -> Option<&GasPrice> {
        self.gas_price.as_ref()
    }

    /// See [Self::gas_price]
    pub fn set_gas_price(&mut self, gas_price: Option<GasPrice>) {
        self.gas_price = gas_price;
    }

    /// Gas limit used when a caller does not provide a fee.
    ///
    /// Defaults to 200,000
    pub fn gas_limit(&self) -> u64 {
        self.gas_limit.unwrap_or(200_000)
    }

    /// See [Self::gas_limit]
    pub fn set_gas_limit(&mut self, gas_limit: Option<u64>) {
        self.gas_limit = gas_limit;
    }

    /// How many times to poll for a broadcast transaction before giving up
    ///
    /// Defaults to 30
    pub fn transaction_attempts(&self) -> usize {
        self.transaction_attempts.unwrap_or(30)
    }

    /// See [Self::transaction_attempts]
    pub fn set_transaction_attempts(&mut self, transaction_attempts: Option<usize>) {
        self.transaction_attempts = transaction_attempts;
    }

    /// Delay between transaction polls
    ///
    /// Defaults to 2 seconds
    pub fn transaction_delay(&self) -> Duration {
        self.transaction_delay.unwrap_or(Duration::from_secs(2))
    }

    /// See [Self::transaction_delay]
    pub fn set_transaction_delay(&mut self, transaction_delay: Option<Duration>) {
        self.transaction_delay = transaction_delay;
    }

    /// Referer header sent with every LCD request
    pub fn referer_header(&self) -> Option<&str> {
        self.referer_header.as_deref()
    }

    /// See [Self::referer_header]
    pub fn set_referer_header(&mut self, referer_header: Option<String>) {
        self.referer_header = referer_header;
    }

    /// Timeout for a single LCD request
    ///
    /// Defaults to 10 seconds
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout.unwrap_or(Duration::from_secs(10))
    }

    /// See [Self::request_timeout]
    pub fn set_request_timeout(&mut self, request_timeout: Option<Duration>) {
        self.request_timeout = request_timeout;
    }

    /// Build the HTTP client and produce an [LcdClient].
    pub fn build(self) -> Result<LcdClient, BuilderError> {
        let invalid_url = |reason: String| BuilderError::InvalidLcdUrl {
            url: self.lcd_url().to_owned(),
            reason,
        };
        let lcd = reqwest::Url::parse(self.lcd_url()).map_err(|e| invalid_url(e.to_string()))?;
        if lcd.cannot_be_a_base() {
            return Err(invalid_url("not usable as a base URL".to_owned()));
        }
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(referer) = &self.referer_header {
            let value = reqwest::header::HeaderValue::from_str(referer).map_err(|source| {
                BuilderError::InvalidRefererHeader {
                    value: referer.clone(),
                    source,
                }
            })?;
            headers.insert(reqwest::header::REFERER, value);
        }
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(self.request_timeout())
            .build()
            .map_err(|source| BuilderError::HttpClient {
                url: self.lcd_url().to_owned(),
                source,
            })?;
        Ok(LcdClient::from_parts(client, lcd, self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let builder = ClientBuilder::new(
            "station-testnet",
            "uiss",
            AddressHrp::from_static("cosmos"),
            "https://lcd-office.cosmostation.io/station-testnet/",
        );
        assert_eq!(builder.lcd_url(), "https://lcd-office.cosmostation.io/station-testnet");
        assert_eq!(builder.gas_limit(), 200_000);
        assert_eq!(builder.transaction_attempts(), 30);
        assert_eq!(builder.transaction_delay(), Duration::from_secs(2));
        assert!(builder.gas_price().is_none());
    }

    #[test]
    fn bad_referer_rejected() {
        let mut builder = ClientBuilder::new(
            "juno-1",
            "ujuno",
            AddressHrp::from_static("juno"),
            "http://localhost:1317",
        );
        builder.set_referer_header(Some("bad\nvalue".to_owned()));
        assert!(matches!(
            builder.build(),
            Err(BuilderError::InvalidRefererHeader { .. })
        ));
    }

    #[test]
    fn bad_lcd_url_rejected() {
        for url in ["lcd.example.com", "mailto:lcd@example.com"] {
            let builder =
                ClientBuilder::new("juno-1", "ujuno", AddressHrp::from_static("juno"), url);
            assert!(
                matches!(builder.build(), Err(BuilderError::InvalidLcdUrl { .. })),
                "{url}"
            );
        }
    }
}
