//! Ocean REST API client (vault and pool pair queries).

use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::{CollateralRatio, LoanScheme, TokenAmount, Vault, VaultState};
use crate::error::{MaxiError, Result};

const PAGE_SIZE: u32 = 200;
const MAX_PAGES: usize = 50;

#[derive(Debug, Deserialize)]
struct OceanResponse<T> {
    data: T,
    #[serde(default)]
    page: Option<OceanPage>,
}

#[derive(Debug, Deserialize)]
struct OceanPage {
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanSchemeResponse {
    pub id: String,
    pub min_col_ratio: String,
    pub interest_rate: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceAmountResponse {
    pub amount: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivePriceResponse {
    #[serde(default)]
    pub active: Option<PriceAmountResponse>,
    #[serde(default)]
    pub next: Option<PriceAmountResponse>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAmountResponse {
    pub id: String,
    pub amount: String,
    pub symbol: String,
    #[serde(default)]
    pub active_price: Option<ActivePriceResponse>,
}

/// Vault as returned by `/loans/vaults/{id}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultResponse {
    pub vault_id: String,
    pub loan_scheme: LoanSchemeResponse,
    pub owner_address: String,
    pub state: String,
    #[serde(default)]
    pub collateral_ratio: Option<String>,
    #[serde(default)]
    pub collateral_value: Option<String>,
    #[serde(default)]
    pub loan_value: Option<String>,
    #[serde(default)]
    pub interest_value: Option<String>,
    #[serde(default)]
    pub collateral_amounts: Vec<TokenAmountResponse>,
    #[serde(default)]
    pub loan_amounts: Vec<TokenAmountResponse>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolPairResponse {
    pub id: String,
    pub symbol: String,
    #[serde(default)]
    pub status: bool,
}

fn parse_decimal(field: &str, raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw.trim())
        .map_err(|e| MaxiError::InvalidVaultData(format!("{} '{}' is not a number: {}", field, raw, e)))
}

fn parse_optional(field: &str, raw: Option<&String>) -> Result<Decimal> {
    match raw {
        Some(value) if !value.is_empty() => parse_decimal(field, value),
        _ => Ok(Decimal::ZERO),
    }
}

impl TryFrom<TokenAmountResponse> for TokenAmount {
    type Error = MaxiError;

    fn try_from(raw: TokenAmountResponse) -> Result<Self> {
        let price = |p: Option<&PriceAmountResponse>| -> Result<Option<Decimal>> {
            p.map(|p| parse_decimal("price", &p.amount)).transpose()
        };
        let (active_price, next_price) = match &raw.active_price {
            Some(ap) => (price(ap.active.as_ref())?, price(ap.next.as_ref())?),
            None => (None, None),
        };

        Ok(TokenAmount {
            amount: parse_decimal(&format!("{} amount", raw.symbol), &raw.amount)?,
            symbol: raw.symbol,
            active_price,
            next_price,
        })
    }
}

impl TryFrom<VaultResponse> for Vault {
    type Error = MaxiError;

    fn try_from(raw: VaultResponse) -> Result<Self> {
        let state = VaultState::try_from(raw.state.as_str()).map_err(MaxiError::InvalidVaultData)?;
        let loan_value = parse_optional("loanValue", raw.loan_value.as_ref())?;
        let raw_ratio = match raw.collateral_ratio.as_ref() {
            Some(r) if !r.is_empty() => parse_decimal("collateralRatio", r)?,
            _ => Decimal::NEGATIVE_ONE,
        };

        Ok(Vault {
            id: raw.vault_id,
            owner_address: raw.owner_address,
            state,
            loan_scheme: LoanScheme {
                min_collateral_ratio: parse_decimal("minColRatio", &raw.loan_scheme.min_col_ratio)?,
                interest_rate: parse_decimal("interestRate", &raw.loan_scheme.interest_rate)?,
                id: raw.loan_scheme.id,
            },
            collateral_value: parse_optional("collateralValue", raw.collateral_value.as_ref())?,
            interest_value: parse_optional("interestValue", raw.interest_value.as_ref())?,
            collateral_ratio: CollateralRatio::from_raw(raw_ratio, loan_value)?,
            loan_value,
            collateral_amounts: raw
                .collateral_amounts
                .into_iter()
                .map(TokenAmount::try_from)
                .collect::<Result<Vec<_>>>()?,
            loan_amounts: raw
                .loan_amounts
                .into_iter()
                .map(TokenAmount::try_from)
                .collect::<Result<Vec<_>>>()?,
        })
    }
}

/// Read-only Ocean API client
#[derive(Clone)]
pub struct OceanClient {
    http: Client,
    base_url: String,
    network: String,
}

impl OceanClient {
    pub fn new(base_url: &str, network: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("vault-maxi/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| MaxiError::Internal(format!("failed to build Ocean HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            network: network.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v0/{}/{}", self.base_url, self.network, path.trim_start_matches('/'))
    }

    /// GET returning `None` on 404
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<OceanResponse<T>>> {
        let url = self.endpoint(path);
        debug!("GET {}", url);

        let resp = self.http.get(&url).query(query).send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MaxiError::OceanApi {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Some(resp.json().await?))
    }

    /// Fetch a vault; `None` if Ocean does not know it
    pub async fn get_vault(&self, vault_id: &str) -> Result<Option<Vault>> {
        let response: Option<OceanResponse<VaultResponse>> = self
            .get_json(&format!("loans/vaults/{}", vault_id), &[])
            .await?;

        match response {
            Some(r) => Vault::try_from(r.data).map(Some),
            None => {
                warn!("vault {} not found on Ocean", vault_id);
                Ok(None)
            }
        }
    }

    /// All pool pairs, following pagination
    pub async fn list_pool_pairs(&self) -> Result<Vec<PoolPairResponse>> {
        let mut pairs = Vec::new();
        let mut next: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut query = vec![("size", PAGE_SIZE.to_string())];
            if let Some(token) = &next {
                query.push(("next", token.clone()));
            }

            let page: Option<OceanResponse<Vec<PoolPairResponse>>> =
                self.get_json("poolpairs", &query).await?;
            let Some(page) = page else { break };

            pairs.extend(page.data);
            next = page.page.and_then(|p| p.next);
            if next.is_none() {
                break;
            }
        }

        debug!("loaded {} pool pairs", pairs.len());
        Ok(pairs)
    }
}
