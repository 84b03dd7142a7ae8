//! String utility functions.
//!
//! The naming convention that maps type and member names onto table and
//! column names is built from these two conversions.

/// Converts a `camelCase` or `PascalCase` name to `snake_case`.
///
/// Every uppercase character becomes `_` followed by its lowercase form,
/// except at the very start where it is only lowercased. Characters that are
/// already lowercase, digits and underscores pass through unchanged.
///
/// # Examples
///
/// ```
/// use quill_core::utils::text::snake_case;
///
/// assert_eq!(snake_case("screenName"), "screen_name");
/// assert_eq!(snake_case("BlogPost"), "blog_post");
/// assert_eq!(snake_case("already_snake"), "already_snake");
/// ```
pub fn snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    push_snake_case(s, &mut out);
    out
}

/// Appends the `snake_case` form of `s` to `out`.
pub fn push_snake_case(s: &str, out: &mut String) {
    for (index, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if index > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
}

/// Converts a `snake_case` name to `camelCase`.
///
/// Each `_` is dropped and the character after it is uppercased. A trailing
/// `_` is dropped.
///
/// # Examples
///
/// ```
/// use quill_core::utils::text::camel_case;
///
/// assert_eq!(camel_case("screen_name"), "screenName");
/// assert_eq!(camel_case("created_by_id"), "createdById");
/// ```
pub fn camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '_' {
            if let Some(next) = chars.next() {
                out.extend(next.to_uppercase());
            }
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── snake_case ───────────────────────────────────────────────────

    #[test]
    fn test_snake_case_camel() {
        assert_eq!(snake_case("screenName"), "screen_name");
    }

    #[test]
    fn test_snake_case_pascal() {
        assert_eq!(snake_case("User"), "user");
        assert_eq!(snake_case("BlogPost"), "blog_post");
    }

    #[test]
    fn test_snake_case_consecutive_capitals() {
        assert_eq!(snake_case("HTMLPage"), "h_t_m_l_page");
    }

    #[test]
    fn test_snake_case_identity() {
        assert_eq!(snake_case("created_by_id"), "created_by_id");
        assert_eq!(snake_case(""), "");
    }

    #[test]
    fn test_push_snake_case_appends() {
        let mut out = String::from("x_");
        push_snake_case("fooBar", &mut out);
        assert_eq!(out, "x_foo_bar");
    }

    // ── camel_case ───────────────────────────────────────────────────

    #[test]
    fn test_camel_case_basic() {
        assert_eq!(camel_case("screen_name"), "screenName");
    }

    #[test]
    fn test_camel_case_trailing_underscore() {
        assert_eq!(camel_case("name_"), "name");
    }

    #[test]
    fn test_camel_case_no_underscore() {
        assert_eq!(camel_case("id"), "id");
    }

    #[test]
    fn test_round_trip_for_lower_camel() {
        for name in ["screenName", "createdById", "id", "aB"] {
            assert_eq!(camel_case(&snake_case(name)), name);
        }
    }
}
