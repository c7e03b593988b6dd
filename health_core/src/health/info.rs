//! Extraction of dashboard fields from Redis `INFO` text

use crate::health::probe::CacheMetadata;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref CONNECTED_CLIENTS: Regex = Regex::new(r"(?m)^connected_clients:(\d+)").unwrap();
    static ref USED_MEMORY_HUMAN: Regex = Regex::new(r"(?m)^used_memory_human:([^\r\n]+)").unwrap();
}

pub fn connected_clients(clients_info: &str) -> Option<u64> {
    CONNECTED_CLIENTS
        .captures(clients_info)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

pub fn used_memory_human(memory_info: &str) -> Option<String> {
    USED_MEMORY_HUMAN
        .captures(memory_info)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn parse_cache_info(clients_info: &str, memory_info: &str) -> CacheMetadata {
    CacheMetadata {
        connected_clients: connected_clients(clients_info),
        used_memory: used_memory_human(memory_info),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLIENTS: &str = "# Clients\r\nconnected_clients:7\r\ncluster_connections:0\r\nmaxclients:10000\r\nblocked_clients:0\r\n";
    const MEMORY: &str = "# Memory\r\nused_memory:1065536\r\nused_memory_human:1.02M\r\nused_memory_rss:2000000\r\n";

    #[test]
    fn test_parse_full_info() {
        let metadata = parse_cache_info(CLIENTS, MEMORY);
        assert_eq!(metadata.connected_clients, Some(7));
        assert_eq!(metadata.used_memory.as_deref(), Some("1.02M"));
    }

    #[test]
    fn test_missing_fields_are_omitted() {
        let metadata = parse_cache_info("# Clients\r\nblocked_clients:0\r\n", "# Memory\r\nused_memory:1024\r\n");
        assert_eq!(metadata, CacheMetadata::default());
    }

    #[test]
    fn test_unix_line_endings() {
        assert_eq!(used_memory_human("used_memory_human:512.00K\nused_memory_rss:1\n").as_deref(), Some("512.00K"));
        assert_eq!(connected_clients("connected_clients:3\n"), Some(3));
    }

    #[test]
    fn test_prefixed_keys_do_not_match() {
        assert_eq!(connected_clients("blocked_connected_clients:9\r\n"), None);
    }

    #[test]
    fn test_unparseable_client_count_is_omitted() {
        assert_eq!(connected_clients("connected_clients:99999999999999999999999\r\n"), None);
    }
}
