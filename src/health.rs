use crate::config::{DEFAULT_TOKEN_PATH, REQUIRED_VARS};
use crate::services::CredentialStore;
use std::path::PathBuf;

/// Problems preventing a healthy start, empty when none.
pub fn problems<F>(lookup: F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut problems: Vec<String> = REQUIRED_VARS
        .iter()
        .filter(|key| lookup(key).map_or(true, |v| v.trim().is_empty()))
        .map(|key| format!("Missing environment variable: {}", key))
        .collect();

    let token_path = lookup("TOKEN_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_PATH));
    if !CredentialStore::new(&token_path).exists() {
        problems.push(format!(
            "{} not found. Authentication may be required.",
            token_path.display()
        ));
    }

    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(dir: &tempfile::TempDir, with_playlist: bool) -> HashMap<String, String> {
        let mut vars: HashMap<String, String> = REQUIRED_VARS
            .iter()
            .map(|k| (k.to_string(), "set".to_string()))
            .collect();
        if !with_playlist {
            vars.remove("SPOTIFY_PLAYLIST_ID");
        }
        vars.insert(
            "TOKEN_PATH".to_string(),
            dir.path().join("tokens.json").display().to_string(),
        );
        vars
    }

    #[test]
    fn healthy_with_vars_and_token_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tokens.json"), "{}").unwrap();
        let vars = vars(&dir, true);

        assert!(problems(|k| vars.get(k).cloned()).is_empty());
    }

    #[test]
    fn reports_missing_var_and_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let vars = vars(&dir, false);

        let found = problems(|k| vars.get(k).cloned());
        assert_eq!(found.len(), 2);
        assert!(found[0].contains("SPOTIFY_PLAYLIST_ID"));
        assert!(found[1].contains("not found"));
    }
}
