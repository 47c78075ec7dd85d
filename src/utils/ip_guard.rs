use std::net::IpAddr;

/// Parses the comma-separated punch allow-list from the environment.
/// Invalid entries are dropped with a warning rather than failing startup.
pub fn parse_allow_list(raw: &str) -> Vec<IpAddr> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<IpAddr>() {
            Ok(ip) => Some(ip),
            Err(_) => {
                log::warn!("Ignoring invalid entry in PUNCH_ALLOWED_IPS: {}", s);
                None
            }
        })
        .collect()
}

/// Transport gate for kiosk/self-service punches. An empty allow-list means
/// allow all; with a non-empty list an unknown peer address is rejected.
pub fn ip_allowed(peer: Option<IpAddr>, allow: &[IpAddr]) -> bool {
    if allow.is_empty() {
        return true;
    }
    match peer {
        Some(ip) => allow.contains(&ip),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_allows_everyone() {
        assert!(ip_allowed(Some("10.0.0.1".parse().unwrap()), &[]));
        assert!(ip_allowed(None, &[]));
    }

    #[test]
    fn non_empty_list_filters() {
        let allow = parse_allow_list("10.0.0.1, 192.168.1.20");
        assert_eq!(allow.len(), 2);
        assert!(ip_allowed(Some("10.0.0.1".parse().unwrap()), &allow));
        assert!(!ip_allowed(Some("10.0.0.2".parse().unwrap()), &allow));
        assert!(!ip_allowed(None, &allow));
    }

    #[test]
    fn junk_entries_are_skipped() {
        let allow = parse_allow_list("10.0.0.1, not-an-ip,, 2001:db8::1");
        assert_eq!(allow.len(), 2);
    }
}
