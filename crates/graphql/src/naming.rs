//! GraphQL-to-Rust name translation.
//!
//! Schema field names follow GraphQL camelCase conventions while provider
//! methods are snake_case. Translation happens once at binding time for
//! field lookup and per call for argument keys.

/// Convert a camelCase GraphQL name to snake_case.
///
/// Word boundaries are inserted before an uppercase letter that follows a
/// lowercase letter or digit, and inside acronym runs before an uppercase
/// letter followed by a lowercase one. `getUserByID` becomes
/// `get_user_by_id`, `HTTPServer` becomes `http_server`, and names that are
/// already snake_case pass through unchanged.
pub fn camel_to_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let after_lower_or_digit = i > 0
                && (chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit());
            let acronym_end = i > 0
                && chars[i - 1].is_uppercase()
                && chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if after_lower_or_digit || acronym_end {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("getUserByID", "get_user_by_id")]
    #[case("firstName", "first_name")]
    #[case("id", "id")]
    #[case("userId", "user_id")]
    #[case("HTTPServer", "http_server")]
    #[case("parseHTMLDocument", "parse_html_document")]
    #[case("already_snake", "already_snake")]
    #[case("item2Count", "item2_count")]
    #[case("", "")]
    fn translates_camel_case(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(camel_to_snake(input), expected);
    }
}
