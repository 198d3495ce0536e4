use super::{RateError, RateSource, Rates};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

/// Daily official rates published as JSON
pub const DEFAULT_URL: &str = "https://www.cbr-xml-daily.ru/daily_json.js";

#[derive(Debug, Deserialize)]
struct DailyRates {
    #[serde(rename = "Valute")]
    valute: Rates,
}

/// Central bank daily rates over HTTP
#[derive(Debug, Clone)]
pub struct CbrRateSource {
    client: Client,
    url: String,
}

impl CbrRateSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RateError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(CbrRateSource {
            client,
            url: url.into(),
        })
    }
}

impl RateSource for CbrRateSource {
    fn fetch(&self) -> Result<Rates, RateError> {
        log::info!("Fetching currency rates from {}", self.url);
        let response = self.client.get(&self.url).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(RateError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text()?;
        let daily: DailyRates =
            serde_json::from_str(&body).map_err(|err| RateError::Malformed(err.to_string()))?;
        log::info!("{} currency rates fetched", daily.valute.len());
        Ok(daily.valute)
    }
}
