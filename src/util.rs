use reqwest::Url;

/// Returns true for localhost, loopback IPv4/IPv6, and 0.0.0.0 URLs.
pub fn is_local_endpoint_url(url: &str) -> bool {
    let parsed = match Url::parse(url.trim()) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };

    match parsed.host_str() {
        Some(host) => {
            let normalized = host
                .trim()
                .trim_start_matches('[')
                .trim_end_matches(']')
                .to_ascii_lowercase();
            normalized == "localhost"
                || normalized == "::1"
                || normalized == "0.0.0.0"
                || normalized.starts_with("127.")
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_local_endpoint_url_normalizes_case_and_space() {
        assert!(is_local_endpoint_url(
            " HTTP://LOCALHOST:8000/v1/chat/completions "
        ));
        assert!(is_local_endpoint_url("https://127.0.0.1/v1/chat/completions"));
        assert!(is_local_endpoint_url("http://[::1]:8080/v1/chat/completions"));
        assert!(!is_local_endpoint_url(
            "https://evil-localhost.com/v1/chat/completions"
        ));
        assert!(!is_local_endpoint_url(
            "https://api.openai.com/v1/chat/completions"
        ));
    }
}
