//! Object key generation and public URL construction.

use chrono::{DateTime, Utc};
use rand::Rng;

/// Default prefix for published subject stills.
pub const DEFAULT_KEY_PREFIX: &str = "storybook/subjects";

/// Build a key of the form `{prefix}/{yyyyMMdd}/{unix_millis}-{8 hex}.{ext}`.
pub fn object_key(prefix: &str, now: DateTime<Utc>, suffix: u32, extension: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let extension = extension.trim_start_matches('.');
    let name = format!(
        "{}/{}-{:08x}.{}",
        now.format("%Y%m%d"),
        now.timestamp_millis(),
        suffix,
        extension
    );
    if prefix.is_empty() {
        name
    } else {
        format!("{}/{}", prefix, name)
    }
}

/// Build a fresh globally-unique key.
pub fn generate_key(prefix: &str, extension: &str) -> String {
    let suffix: u32 = rand::rng().random();
    object_key(prefix, Utc::now(), suffix, extension)
}

/// Regional host for a COS region, unless overridden.
pub fn region_host(region: &str, override_host: Option<&str>) -> String {
    match override_host {
        Some(host) if !host.trim().is_empty() => host.trim().trim_end_matches('/').to_string(),
        _ => format!("cos.{}.myqcloud.com", region),
    }
}

/// Public URL of an uploaded object.
pub fn public_url(bucket: &str, region_host: &str, key: &str) -> String {
    format!("https://{}.{}/{}", bucket, region_host, key.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_object_key_layout() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        let key = object_key("storybook/subjects/", now, 0xbeef, "jpg");
        assert_eq!(
            key,
            format!("storybook/subjects/20240309/{}-0000beef.jpg", now.timestamp_millis())
        );
    }

    #[test]
    fn test_object_key_without_prefix() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(object_key("", now, 1, ".png").starts_with("20240101/"));
        assert!(object_key("", now, 1, ".png").ends_with("-00000001.png"));
    }

    #[test]
    fn test_generated_keys_differ() {
        let a = generate_key(DEFAULT_KEY_PREFIX, "jpg");
        let b = generate_key(DEFAULT_KEY_PREFIX, "jpg");
        assert_ne!(a, b);
        assert!(a.starts_with("storybook/subjects/"));
    }

    #[test]
    fn test_public_url() {
        let host = region_host("ap-guangzhou", None);
        assert_eq!(host, "cos.ap-guangzhou.myqcloud.com");
        assert_eq!(
            public_url("stories-1250000000", &host, "storybook/a.jpg"),
            "https://stories-1250000000.cos.ap-guangzhou.myqcloud.com/storybook/a.jpg"
        );
        assert_eq!(region_host("ap-guangzhou", Some("cdn.example.com/")), "cdn.example.com");
        assert_eq!(region_host("ap-guangzhou", Some("  ")), "cos.ap-guangzhou.myqcloud.com");
    }
}
