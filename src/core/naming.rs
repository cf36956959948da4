//! Identifier shapes and case conversion.
//!
//! Pure string functions: total for any input and deterministic.

use std::sync::LazyLock;

use regex::Regex;

static LOWER_SNAKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("valid lower-snake regex"));

static UPPER_CAMEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][a-zA-Z0-9]*$").expect("valid upper-camel regex"));

static CASE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid boundary regex"));

pub fn is_lower_snake(name: &str) -> bool {
    LOWER_SNAKE.is_match(name)
}

pub fn is_upper_camel(name: &str) -> bool {
    UPPER_CAMEL.is_match(name)
}

/// Dunder-style and other double-underscore names are exempt from
/// the function naming rule.
pub fn is_special_function_name(name: &str) -> bool {
    name.starts_with("__")
}

/// At least one cased character and no lowercase ones (`MAX_SIZE`, `X1`).
pub fn is_constant_case(name: &str) -> bool {
    let mut cased = false;
    for c in name.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            cased = true;
        }
    }
    cased
}

/// `myName` / `MyName` / `HTTPServer2Go` → `my_name` / `my_name` / `httpserver2_go`.
pub fn to_lower_snake(name: &str) -> String {
    CASE_BOUNDARY
        .replace_all(name, "${1}_${2}")
        .to_lowercase()
}

/// `my_class` → `MyClass`; `myClass` → `MyClass`. Only the first character
/// of each underscore-separated segment changes.
pub fn to_upper_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for segment in name.split('_') {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Rule violated by an identifier, with its suggested rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingViolation {
    pub expected: &'static str,
    pub rename: String,
}

pub fn check_function_name(name: &str) -> Option<NamingViolation> {
    if is_lower_snake(name) || is_special_function_name(name) {
        return None;
    }
    Some(NamingViolation {
        expected: "snake_case",
        rename: to_lower_snake(name),
    })
}

pub fn check_class_name(name: &str) -> Option<NamingViolation> {
    if is_upper_camel(name) {
        return None;
    }
    Some(NamingViolation {
        expected: "PascalCase",
        rename: to_upper_camel(name),
    })
}

pub fn check_variable_name(name: &str) -> Option<NamingViolation> {
    if name.chars().count() <= 1 || is_constant_case(name) || is_lower_snake(name) {
        return None;
    }
    Some(NamingViolation {
        expected: "snake_case",
        rename: to_lower_snake(name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_between_cases() {
        assert_eq!(to_lower_snake("myVariable"), "my_variable");
        assert_eq!(to_lower_snake("MyClass"), "my_class");
        assert_eq!(to_lower_snake("HTTPServer"), "httpserver");
        assert_eq!(to_lower_snake("parse2Json"), "parse2_json");
        assert_eq!(to_lower_snake("already_snake"), "already_snake");

        assert_eq!(to_upper_camel("my_class"), "MyClass");
        assert_eq!(to_upper_camel("myClass"), "MyClass");
        assert_eq!(to_upper_camel("__private_thing"), "PrivateThing");
        assert_eq!(to_upper_camel("_"), "");
    }

    #[test]
    fn function_rule_exempts_dunder_names() {
        assert!(check_function_name("__init__").is_none());
        assert!(check_function_name("__weirdName").is_none());
        assert!(check_function_name("_helper").is_none());
        let v = check_function_name("doThing").expect("violation");
        assert_eq!(v.rename, "do_thing");
    }

    #[test]
    fn class_rule_suggests_pascal_case() {
        assert!(check_class_name("Widget2").is_none());
        let v = check_class_name("myClass").expect("violation");
        assert_eq!(v.expected, "PascalCase");
        assert_eq!(v.rename, "MyClass");
        assert!(check_class_name("_Private").is_some());
    }

    #[test]
    fn variable_rule_skips_constants_and_single_letters() {
        assert!(check_variable_name("X").is_none());
        assert!(check_variable_name("i").is_none());
        assert!(check_variable_name("MAX_SIZE").is_none());
        assert!(check_variable_name("HTTP2").is_none());
        assert!(check_variable_name("total_count").is_none());
        assert_eq!(
            check_variable_name("totalCount").map(|v| v.rename),
            Some("total_count".to_string())
        );
    }

    #[test]
    fn constant_case_needs_a_cased_letter() {
        assert!(!is_constant_case("__"));
        assert!(!is_constant_case("_1"));
        assert!(is_constant_case("_A1"));
    }
}
