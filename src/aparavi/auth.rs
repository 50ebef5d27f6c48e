pub struct AparaviAuth {
    api_key: String,
}

impl AparaviAuth {
    pub fn new(api_key: String) -> Self {
        Self { api_key }
    }

    /// Key with everything but the last four characters masked, for logs.
    pub fn redacted(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 4 {
            return "*".repeat(chars.len());
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}", "*".repeat(chars.len() - 4), tail)
    }

    /// Build auth headers for a request.
    pub fn headers(&self) -> Vec<(String, String)> {
        vec![
            ("Authorization".to_string(), format!("Bearer {}", self.api_key)),
            ("Content-Type".to_string(), "application/json".to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_carry_bearer_token() {
        let auth = AparaviAuth::new("abc123".to_string());
        let headers = auth.headers();
        assert!(headers.contains(&("Authorization".to_string(), "Bearer abc123".to_string())));
        assert!(headers.contains(&("Content-Type".to_string(), "application/json".to_string())));
    }

    #[test]
    fn test_redacted_keeps_last_four() {
        assert_eq!(AparaviAuth::new("abcdefgh".to_string()).redacted(), "****efgh");
        assert_eq!(AparaviAuth::new("abc".to_string()).redacted(), "***");
    }
}
