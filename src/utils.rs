use std::{path::PathBuf, time::SystemTime};

/// Milliseconds since the UNIX epoch; zero if the clock is before it.
#[must_use]
pub fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Expands a leading `~` to the user's home directory.
#[must_use]
pub fn expand_path(path_str: &str) -> PathBuf {
    let Some(rest) = path_str.strip_prefix('~') else {
        return PathBuf::from(path_str);
    };
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .ok()
        .map(PathBuf::from);
    match home {
        Some(home) if rest.is_empty() => home,
        Some(mut home) if rest.starts_with('/') || rest.starts_with('\\') => {
            home.push(&rest[1..]);
            home
        }
        _ => PathBuf::from(path_str),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paths_are_untouched() {
        assert_eq!(expand_path("/var/log/loopcall"), PathBuf::from("/var/log/loopcall"));
        assert_eq!(expand_path("logs"), PathBuf::from("logs"));
    }

    #[test]
    fn now_millis_is_after_2020() {
        assert!(now_millis() > 1_577_836_800_000);
    }
}
