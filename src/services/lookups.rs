use crate::cache::{self, Cache};
use crate::database::{Database, GroupOperations, TokenOperations};
use crate::types::{ActiveMonitor, Token};
use anyhow::Result;

/// 带缓存的常用查询，查无结果不入缓存
pub struct CachedLookups;

impl CachedLookups {
    pub async fn token_by_address(db: &Database, cache: &Cache, address: &str) -> Result<Option<Token>> {
        cache
            .get_or_fetch_some(&cache::token_key(address), None, || {
                TokenOperations::find_by_address(db.pool(), address)
            })
            .await
    }

    pub async fn token_by_id(db: &Database, cache: &Cache, id: i32) -> Result<Option<Token>> {
        cache
            .get_or_fetch_some(&cache::token_id_key(id), None, || {
                TokenOperations::find_by_id(db.pool(), id)
            })
            .await
    }

    pub async fn group_configuration(db: &Database, cache: &Cache, chat_id: i64) -> Result<Option<ActiveMonitor>> {
        cache
            .get_or_fetch_some(&cache::group_config_key(chat_id), None, || {
                GroupOperations::find_with_token(db.pool(), chat_id)
            })
            .await
    }

    /// 群组配置写入后调用，使 `/price` 与监控循环读到新值
    pub fn invalidate_group(cache: &Cache, chat_id: i64) {
        cache.delete(&cache::group_config_key(chat_id));
        cache.delete(cache::ACTIVE_MONITORS_KEY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_invalidate_group_clears_both_keys() {
        let cache = Cache::new(Duration::from_secs(60));
        cache.set(cache::group_config_key(-100), 1u8);
        cache.set(cache::group_config_key(-200), 2u8);
        cache.set(cache::ACTIVE_MONITORS_KEY, Vec::<ActiveMonitor>::new());

        CachedLookups::invalidate_group(&cache, -100);

        assert_eq!(cache.get::<u8>(&cache::group_config_key(-100)), None);
        assert_eq!(cache.get::<u8>(&cache::group_config_key(-200)), Some(2));
        assert!(cache.get::<Vec<ActiveMonitor>>(cache::ACTIVE_MONITORS_KEY).is_none());
    }
}
