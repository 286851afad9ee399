//! License notices bundled with tfmgr (`data/*.LICENSE`)

use rust_embed::Embed;

#[derive(Embed)]
#[folder = "data/"]
struct BundledLicenses;

const SUFFIX: &str = ".LICENSE";

/// Identifiers of all bundled licenses, sorted
pub fn available() -> Vec<String> {
    let mut ids: Vec<String> = BundledLicenses::iter()
        .filter_map(|name| name.strip_suffix(SUFFIX).map(str::to_string))
        .collect();
    ids.sort();
    ids
}

/// Text of a bundled license; identifiers match case-insensitively
pub fn get(id: &str) -> Option<String> {
    let wanted = id.trim().trim_end_matches(SUFFIX);
    let name = BundledLicenses::iter().find(|name| {
        name.strip_suffix(SUFFIX)
            .map(|stem| stem.eq_ignore_ascii_case(wanted))
            .unwrap_or(false)
    })?;

    BundledLicenses::get(&name)
        .map(|file| String::from_utf8_lossy(&file.data).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_lists_bundled_files() {
        let ids = available();
        assert!(ids.contains(&"CC0-1.0".to_string()));
        assert!(ids.contains(&"CC-BY-4.0".to_string()));
        assert!(ids.iter().all(|id| !id.ends_with(".LICENSE")));
    }

    #[test]
    fn test_get_is_case_insensitive() {
        let text = get("cc-by-4.0").unwrap();
        assert!(text.contains("Attribution 4.0 International"));
        assert_eq!(get("CC0-1.0.LICENSE"), get("CC0-1.0"));
        assert!(get("GPL-3.0").is_none());
    }
}
