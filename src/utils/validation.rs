use regex::Regex;
use std::sync::LazyLock;

static USERNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{2,31}$").unwrap());

pub fn is_valid_username(name: &str) -> bool {
    USERNAME.is_match(name)
}
