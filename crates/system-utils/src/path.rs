use std::path::PathBuf;

pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home);
        }
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

/// Returns the final component of a client supplied file name, or `None` when
/// nothing usable is left (empty, `.`, `..`).
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let last = name
        .rsplit(|ch: char| ch == '/' || ch == '\\')
        .next()
        .unwrap_or_default()
        .trim();
    if last.is_empty() || last == "." || last == ".." {
        return None;
    }
    Some(last.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_plain_paths() {
        assert_eq!(expand_tilde("uploads"), PathBuf::from("uploads"));
        assert_eq!(expand_tilde("/var/data"), PathBuf::from("/var/data"));
    }

    #[test]
    fn strips_directories_from_file_names() {
        assert_eq!(sanitize_file_name("chat.csv").as_deref(), Some("chat.csv"));
        assert_eq!(
            sanitize_file_name("../../etc/passwd").as_deref(),
            Some("passwd")
        );
        assert_eq!(
            sanitize_file_name("C:\\Users\\me\\chat.csv").as_deref(),
            Some("chat.csv")
        );
        assert_eq!(sanitize_file_name(""), None);
        assert_eq!(sanitize_file_name("dir/.."), None);
    }
}
