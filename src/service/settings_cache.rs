use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use tokio::sync::RwLock;

use crate::gateways::GatewayKind;
use crate::repo::site_settings_repo::{SiteSettingsRepo, PAYMENT_GATEWAY_KEY};

/// Cached read of the site-wide default gateway. Only the *default*
/// resolution path goes through here; a donation pinned at checkout never
/// consults this again.
#[derive(Clone)]
pub struct SettingsCache {
    pub settings_repo: SiteSettingsRepo,
    inner: Arc<RwLock<Option<(Instant, GatewayKind)>>>,
    ttl: Duration,
}

impl SettingsCache {
    pub fn new(settings_repo: SiteSettingsRepo, ttl: Duration) -> Self {
        Self {
            settings_repo,
            inner: Arc::new(RwLock::new(None)),
            ttl,
        }
    }

    pub async fn current_gateway(&self) -> Result<GatewayKind> {
        {
            let read = self.inner.read().await;
            if let Some((loaded_at, kind)) = &*read {
                if loaded_at.elapsed() <= self.ttl {
                    return Ok(*kind);
                }
            }
        }

        let kind = match self.settings_repo.get(PAYMENT_GATEWAY_KEY).await? {
            Some(value) => GatewayKind::parse(&value)
                .ok_or_else(|| anyhow!("site_settings holds unknown payment gateway: {value}"))?,
            None => GatewayKind::Ecpay,
        };

        let mut write = self.inner.write().await;
        *write = Some((Instant::now(), kind));
        Ok(kind)
    }

    pub async fn set_current_gateway(&self, kind: GatewayKind) -> Result<()> {
        self.settings_repo
            .set(PAYMENT_GATEWAY_KEY, kind.as_str())
            .await?;
        self.invalidate().await;
        Ok(())
    }

    pub async fn invalidate(&self) {
        let mut write = self.inner.write().await;
        *write = None;
    }
}
