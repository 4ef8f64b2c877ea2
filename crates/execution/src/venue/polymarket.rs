//! Polymarket API客户端
//!
//! REST访问带 HMAC-SHA256 认证头；下单内容做 EIP-712 类型化数据签名，
//! 执行钱包私钥仅在本进程内使用。

use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use alloy::sol;
use alloy::sol_types::{eip712_domain, SolStruct};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, StatusCode};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sha2::Sha256;
use tracing::{debug, info};

use polyfund_domain::enums::TradeSide;
use polyfund_domain::traits::{Market, OrderRequest, OrderResponse, VenueClient};

sol! {
    /// 场所定义的订单签名结构
    struct Order {
        address market;
        uint256 outcome;
        uint8 side;
        uint256 size;
        uint256 price;
        uint256 nonce;
        uint256 expiration;
    }
}

/// Polygon主网
const CHAIN_ID: u64 = 137;
/// 签名域名称
const DOMAIN_NAME: &str = "Polymarket";
/// size/price 按6位小数定点数上链
const FIXED_POINT_SCALE: u32 = 6;

pub struct PolymarketClient {
    base_url: String,
    api_key: String,
    api_secret: String,
    passphrase: String,
    http_client: Client,
    signer: PrivateKeySigner,
    verifying_contract: Address,
}

impl PolymarketClient {
    pub fn new(
        base_url: String,
        api_key: String,
        api_secret: String,
        passphrase: String,
        private_key_hex: &str,
        verifying_contract: &str,
    ) -> Result<Self> {
        let signer =
            PrivateKeySigner::from_str(private_key_hex).context("解析执行钱包私钥失败")?;
        let verifying_contract =
            Address::from_str(verifying_contract).context("解析验证合约地址失败")?;

        Ok(Self {
            base_url,
            api_key,
            api_secret,
            passphrase,
            http_client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .context("构建HTTP客户端失败")?,
            signer,
            verifying_contract,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(
            std::env::var("POLYMARKET_BASE_URL")
                .unwrap_or_else(|_| "https://clob.polymarket.com".to_string()),
            std::env::var("POLYMARKET_API_KEY").context("缺少 POLYMARKET_API_KEY")?,
            std::env::var("POLYMARKET_API_SECRET").context("缺少 POLYMARKET_API_SECRET")?,
            std::env::var("POLYMARKET_PASSPHRASE").context("缺少 POLYMARKET_PASSPHRASE")?,
            &std::env::var("POLYMARKET_PRIVATE_KEY").context("缺少 POLYMARKET_PRIVATE_KEY")?,
            &std::env::var("POLYMARKET_VERIFYING_CONTRACT")
                .context("缺少 POLYMARKET_VERIFYING_CONTRACT")?,
        )
    }

    /// 认证头：HMAC-SHA256(timestamp + method + path + body)，base64编码
    fn auth_header(&self, method: &Method, path: &str, body: &str) -> String {
        let timestamp = Utc::now().timestamp().to_string();
        let payload = format!("{}{}{}{}", timestamp, method.as_str(), path, body);
        let mut mac = Hmac::<Sha256>::new_from_slice(self.api_secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(payload.as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());
        format!("PFX-HMAC-SHA256 {}:{}:{}", self.api_key, timestamp, signature)
    }

    /// EIP-712 订单签名，返回 0x 前缀的65字节签名
    fn sign_order(&self, req: &OrderRequest) -> Result<String> {
        let market = Address::from_str(&req.market_id)
            .map_err(|e| anyhow!("市场ID不是合法地址 '{}': {}", req.market_id, e))?;
        let outcome = U256::from_str_radix(&req.outcome_id, 10)
            .map_err(|e| anyhow!("结果ID不是合法整数 '{}': {}", req.outcome_id, e))?;

        let order = Order {
            market,
            outcome,
            side: match req.side {
                TradeSide::Buy => 0u8,
                TradeSide::Sell => 1u8,
            },
            size: to_fixed_point(req.size)?,
            price: to_fixed_point(req.price)?,
            nonce: U256::from(req.nonce as u64),
            expiration: U256::from(req.expiration as u64),
        };

        let domain = eip712_domain! {
            name: DOMAIN_NAME,
            version: "1",
            chain_id: CHAIN_ID,
            verifying_contract: self.verifying_contract,
        };

        let hash = order.eip712_signing_hash(&domain);
        let signature = self
            .signer
            .sign_hash_sync(&hash)
            .context("EIP-712签名失败")?;
        Ok(format!("0x{}", hex::encode(signature.as_bytes())))
    }

    async fn request_json<T: for<'de> serde::Deserialize<'de>>(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let body_str = body.unwrap_or_default();

        let mut builder = self
            .http_client
            .request(method.clone(), &url)
            .header("Authorization", self.auth_header(&method, path, &body_str))
            .header("PFX-PASSPHRASE", &self.passphrase);
        if !body_str.is_empty() {
            builder = builder
                .header("Content-Type", "application/json")
                .body(body_str);
        }

        let response = builder.send().await.context("请求失败")?;
        let status = response.status();
        let text = response.text().await.context("读取响应失败")?;
        debug!(path = path, status = %status, "polymarket响应");

        if status != StatusCode::OK && status != StatusCode::CREATED {
            return Err(anyhow!("API错误: {}", text));
        }

        serde_json::from_str(&text).map_err(|e| anyhow!("解析响应失败: {}: {}", e, text))
    }
}

/// Decimal → 6位小数定点 U256
fn to_fixed_point(value: Decimal) -> Result<U256> {
    let scaled = (value * Decimal::from(10u64.pow(FIXED_POINT_SCALE))).trunc();
    let units = scaled
        .to_u128()
        .ok_or_else(|| anyhow!("数值无法定点化: {}", value))?;
    Ok(U256::from(units))
}

#[async_trait]
impl VenueClient for PolymarketClient {
    async fn get_market(&self, market_id: &str) -> Result<Market> {
        let path = format!("/markets/{}", market_id);
        self.request_json(Method::GET, &path, None).await
    }

    async fn place_order(&self, req: &OrderRequest) -> Result<OrderResponse> {
        let signature = self.sign_order(req).context("签名订单失败")?;

        let body = serde_json::json!({
            "market_id": req.market_id,
            "outcome_id": req.outcome_id,
            "side": req.side.as_str(),
            "size": req.size.to_string(),
            "price": req.price.to_string(),
            "order_type": req.order_type.as_str(),
            "nonce": req.nonce,
            "expiration": req.expiration,
            "signature": signature,
        })
        .to_string();

        info!(
            market_id = %req.market_id,
            side = %req.side,
            size = %req.size,
            price = %req.price,
            "提交订单"
        );
        self.request_json(Method::POST, "/orders", Some(body)).await
    }

    async fn cancel_order(&self, order_id: &str) -> Result<()> {
        let path = format!("/orders/{}", order_id);
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http_client
            .request(Method::DELETE, &url)
            .header(
                "Authorization",
                self.auth_header(&Method::DELETE, &path, ""),
            )
            .header("PFX-PASSPHRASE", &self.passphrase)
            .send()
            .await
            .context("撤单请求失败")?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::NO_CONTENT {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("撤单失败: {}", text));
        }
        Ok(())
    }
}
