use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info};

/// Hourly rates for one instance type in one region. Every rate is
/// optional: reserved pricing does not exist for all type/region
/// combinations, and an unparseable feed field counts as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstancePrice {
    pub on_demand: Option<f64>,
    pub yr_term1_convertible_all_upfront: Option<f64>,
    pub yr_term1_convertible_partial_upfront: Option<f64>,
    pub yr_term1_convertible_no_upfront: Option<f64>,
    pub yr_term1_standard_all_upfront: Option<f64>,
    pub yr_term1_standard_partial_upfront: Option<f64>,
    pub yr_term1_standard_no_upfront: Option<f64>,
    pub yr_term3_convertible_all_upfront: Option<f64>,
    pub yr_term3_convertible_partial_upfront: Option<f64>,
    pub yr_term3_convertible_no_upfront: Option<f64>,
    pub yr_term3_standard_all_upfront: Option<f64>,
    pub yr_term3_standard_partial_upfront: Option<f64>,
    pub yr_term3_standard_no_upfront: Option<f64>,
}

impl InstancePrice {
    /// Rates in report column order: on-demand first, then the twelve
    /// reserved plans (1yr/3yr x convertible/standard x all/partial/no
    /// upfront).
    pub fn rates(&self) -> [Option<f64>; 13] {
        [
            self.on_demand,
            self.yr_term1_convertible_all_upfront,
            self.yr_term1_convertible_partial_upfront,
            self.yr_term1_convertible_no_upfront,
            self.yr_term1_standard_all_upfront,
            self.yr_term1_standard_partial_upfront,
            self.yr_term1_standard_no_upfront,
            self.yr_term3_convertible_all_upfront,
            self.yr_term3_convertible_partial_upfront,
            self.yr_term3_convertible_no_upfront,
            self.yr_term3_standard_all_upfront,
            self.yr_term3_standard_partial_upfront,
            self.yr_term3_standard_no_upfront,
        ]
    }
}

/// Outcome of a single price lookup. `Unlisted` means the feed loaded
/// but has no entry for the instance type; `Unavailable` means the feed
/// itself could not be fetched or parsed.
#[derive(Debug, PartialEq)]
pub enum PriceLookup<'a> {
    Priced(&'a InstancePrice),
    Unlisted,
    Unavailable,
}

/// Price table for one region, or the reason none could be loaded. The
/// report stage decides what an unavailable feed means; this type only
/// keeps the distinction visible.
#[derive(Debug)]
pub enum PriceBook {
    Loaded(HashMap<String, InstancePrice>),
    Unavailable(String),
}

impl PriceBook {
    pub fn lookup(&self, instance_type: &str) -> PriceLookup<'_> {
        match self {
            PriceBook::Loaded(prices) => match prices.get(instance_type) {
                Some(price) => PriceLookup::Priced(price),
                None => PriceLookup::Unlisted,
            },
            PriceBook::Unavailable(_) => PriceLookup::Unavailable,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PriceBook::Loaded(prices) => prices.len(),
            PriceBook::Unavailable(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Feed schema of the ec2instances.info instances.json mirror. Rates are
// decimal strings, not numbers.
#[derive(Debug, Deserialize)]
struct FeedEntry {
    instance_type: String,
    #[serde(default)]
    pricing: HashMap<String, RegionPricing>,
}

#[derive(Debug, Deserialize)]
struct RegionPricing {
    linux: Option<LinuxPricing>,
}

#[derive(Debug, Deserialize)]
struct LinuxPricing {
    ondemand: Option<String>,
    reserved: Option<ReservedPricing>,
}

#[derive(Debug, Deserialize)]
struct ReservedPricing {
    #[serde(rename = "yrTerm1Convertible.allUpfront")]
    yr_term1_convertible_all_upfront: Option<String>,
    #[serde(rename = "yrTerm1Convertible.partialUpfront")]
    yr_term1_convertible_partial_upfront: Option<String>,
    #[serde(rename = "yrTerm1Convertible.noUpfront")]
    yr_term1_convertible_no_upfront: Option<String>,
    #[serde(rename = "yrTerm1Standard.allUpfront")]
    yr_term1_standard_all_upfront: Option<String>,
    #[serde(rename = "yrTerm1Standard.partialUpfront")]
    yr_term1_standard_partial_upfront: Option<String>,
    #[serde(rename = "yrTerm1Standard.noUpfront")]
    yr_term1_standard_no_upfront: Option<String>,
    #[serde(rename = "yrTerm3Convertible.allUpfront")]
    yr_term3_convertible_all_upfront: Option<String>,
    #[serde(rename = "yrTerm3Convertible.partialUpfront")]
    yr_term3_convertible_partial_upfront: Option<String>,
    #[serde(rename = "yrTerm3Convertible.noUpfront")]
    yr_term3_convertible_no_upfront: Option<String>,
    #[serde(rename = "yrTerm3Standard.allUpfront")]
    yr_term3_standard_all_upfront: Option<String>,
    #[serde(rename = "yrTerm3Standard.partialUpfront")]
    yr_term3_standard_partial_upfront: Option<String>,
    #[serde(rename = "yrTerm3Standard.noUpfront")]
    yr_term3_standard_no_upfront: Option<String>,
}

pub struct PriceFeed {
    http: reqwest::Client,
    url: String,
}

impl PriceFeed {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// Fetch and parse the feed for one region. Failure here is for the
    /// caller to soften: the pipeline treats it as an unavailable book,
    /// not a fatal error.
    pub async fn fetch(&self, region: &str) -> Result<PriceBook> {
        debug!(url = %self.url, region = %region, "Fetching pricing feed");

        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .context("Pricing feed request failed")?
            .error_for_status()
            .context("Pricing feed returned an error status")?;

        let body = response
            .bytes()
            .await
            .context("Failed to read pricing feed body")?;

        let prices = parse_price_book(&body, region)?;

        info!(
            region = %region,
            priced_instance_types = prices.len(),
            "Pricing feed loaded"
        );

        Ok(PriceBook::Loaded(prices))
    }
}

/// Parse the feed body into per-type prices for `region`. Entries with
/// no pricing for the region are skipped; individual rate strings that
/// fail to parse become absent rates.
pub fn parse_price_book(body: &[u8], region: &str) -> Result<HashMap<String, InstancePrice>> {
    let entries: Vec<FeedEntry> =
        serde_json::from_slice(body).context("Failed to parse pricing feed JSON")?;

    let mut prices = HashMap::new();

    for entry in entries {
        let linux = match entry.pricing.get(region).and_then(|r| r.linux.as_ref()) {
            Some(linux) => linux,
            None => continue,
        };

        let mut price = InstancePrice {
            on_demand: parse_rate(linux.ondemand.as_deref()),
            ..Default::default()
        };

        if let Some(reserved) = &linux.reserved {
            price.yr_term1_convertible_all_upfront =
                parse_rate(reserved.yr_term1_convertible_all_upfront.as_deref());
            price.yr_term1_convertible_partial_upfront =
                parse_rate(reserved.yr_term1_convertible_partial_upfront.as_deref());
            price.yr_term1_convertible_no_upfront =
                parse_rate(reserved.yr_term1_convertible_no_upfront.as_deref());
            price.yr_term1_standard_all_upfront =
                parse_rate(reserved.yr_term1_standard_all_upfront.as_deref());
            price.yr_term1_standard_partial_upfront =
                parse_rate(reserved.yr_term1_standard_partial_upfront.as_deref());
            price.yr_term1_standard_no_upfront =
                parse_rate(reserved.yr_term1_standard_no_upfront.as_deref());
            price.yr_term3_convertible_all_upfront =
                parse_rate(reserved.yr_term3_convertible_all_upfront.as_deref());
            price.yr_term3_convertible_partial_upfront =
                parse_rate(reserved.yr_term3_convertible_partial_upfront.as_deref());
            price.yr_term3_convertible_no_upfront =
                parse_rate(reserved.yr_term3_convertible_no_upfront.as_deref());
            price.yr_term3_standard_all_upfront =
                parse_rate(reserved.yr_term3_standard_all_upfront.as_deref());
            price.yr_term3_standard_partial_upfront =
                parse_rate(reserved.yr_term3_standard_partial_upfront.as_deref());
            price.yr_term3_standard_no_upfront =
                parse_rate(reserved.yr_term3_standard_no_upfront.as_deref());
        }

        prices.insert(entry.instance_type, price);
    }

    Ok(prices)
}

fn parse_rate(rate: Option<&str>) -> Option<f64> {
    rate.and_then(|r| r.trim().parse::<f64>().ok())
}
