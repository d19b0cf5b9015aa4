/// Get-or-fetch-or-store over the metadata cache.
///
/// Looks the key up first and returns the cached value on a hit. On a miss
/// the block runs, its value is queued for the background writer, and the
/// value is returned.
///
/// # Arguments
/// * `$cache`: a cache with `lookup` and `store_in_background` methods.
/// * `$key`: the `CacheKey` for the value.
/// * `$ttl`: time-to-live for the stored value, in seconds.
/// * `$block`: async block computing the value on a miss.
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        if let Some(cached) = $cache.lookup(&$key).await? {
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.store_in_background(&$key, &value, $ttl);
            Ok(value)
        }
    }};
}
