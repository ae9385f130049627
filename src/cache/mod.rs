//! 进程内读穿缓存
//!
//! 每个键带独立过期时间，过期与未命中对调用方不可区分。
//! 用于缓存代币、群组配置、活跃监控列表以及异动监控水位。

use anyhow::Result;
use parking_lot::RwLock;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub const ACTIVE_MONITORS_KEY: &str = "active-spike-monitors";

pub fn token_key(address: &str) -> String {
    format!("token-{}", address)
}

pub fn token_id_key(id: i32) -> String {
    format!("token-id-{}", id)
}

pub fn group_config_key(chat_id: i64) -> String {
    format!("group-config-{}", chat_id)
}

pub fn watermark_key(token_address: &str) -> String {
    format!("spike-watermark-{}", token_address)
}

struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub inserts: u64,
    pub entries: usize,
}

pub struct Cache {
    default_ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
    inserts: AtomicU64,
}

impl Cache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            default_ttl,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
            inserts: AtomicU64::new(0),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// 读取缓存；过期、不存在或类型不匹配都视为未命中
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => {
                    let value = entry.value.downcast_ref::<T>().cloned();
                    if value.is_some() {
                        self.hits.fetch_add(1, Ordering::Relaxed);
                    } else {
                        self.misses.fetch_add(1, Ordering::Relaxed);
                    }
                    return value;
                }
                Some(_) => {}
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
            }
        }

        // 已过期：重新检查后再删除，避免误删并发写入的新值
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
            self.expirations.fetch_add(1, Ordering::Relaxed);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn set<T>(&self, key: impl Into<String>, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    pub fn set_with_ttl<T>(&self, key: impl Into<String>, value: T, ttl: Duration)
    where
        T: Send + Sync + 'static,
    {
        let entry = CacheEntry {
            value: Arc::new(value),
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().insert(key.into(), entry);
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    /// 删除键，返回删除前是否存在
    pub fn delete(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// 读穿：命中直接返回，未命中调用 `fetch` 并写入缓存。
    /// `fetch` 失败时不写入任何内容。
    pub async fn get_or_fetch<T, F, Fut>(&self, key: &str, ttl: Option<Duration>, fetch: F) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.get::<T>(key) {
            return Ok(value);
        }

        let value = fetch().await?;
        self.set_with_ttl(key, value.clone(), ttl.unwrap_or(self.default_ttl));
        Ok(value)
    }

    /// 与 `get_or_fetch` 相同，但只缓存查到的值，`None` 不入缓存
    pub async fn get_or_fetch_some<T, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        fetch: F,
    ) -> Result<Option<T>>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        if let Some(value) = self.get::<T>(key) {
            return Ok(Some(value));
        }

        let value = fetch().await?;
        if let Some(value) = &value {
            self.set_with_ttl(key, value.clone(), ttl.unwrap_or(self.default_ttl));
        }
        Ok(value)
    }

    /// 清理所有已过期条目，返回清理数量
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let purged = before - entries.len();
        self.expirations.fetch_add(purged as u64, Ordering::Relaxed);
        purged
    }

    pub fn metrics(&self) -> CacheMetrics {
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            entries: self.entries.read().len(),
        }
    }
}
