pub trait CaseInsensitiveStringExt {
    fn strip_prefix_ignore_ascii_case<'a>(&'a self, prefix: &str) -> Option<&'a str>;
}

impl CaseInsensitiveStringExt for str {
    fn strip_prefix_ignore_ascii_case<'a>(&'a self, prefix: &str) -> Option<&'a str> {
        let head = self.get(..prefix.len())?;

        if head.eq_ignore_ascii_case(prefix) {
            Some(&self[prefix.len()..])
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_regardless_of_case() {
        assert_eq!("Bearer abc".strip_prefix_ignore_ascii_case("bearer "), Some("abc"));
        assert_eq!("BEARER abc".strip_prefix_ignore_ascii_case("bearer "), Some("abc"));
        assert_eq!("abc".strip_prefix_ignore_ascii_case("bearer "), None);
        assert_eq!("bear".strip_prefix_ignore_ascii_case("bearer "), None);
    }

    #[test]
    fn does_not_split_multibyte_characters() {
        assert_eq!("€€€ token".strip_prefix_ignore_ascii_case("bearer "), None);
    }
}
