//! Product version comparison
//!
//! Vendor versions are dotted integers of varying length:
//! - `2024.1.1`, `2023.12.1.4`
//! - `21` and `21.0` are the same version
//!
//! Comparison rules:
//! - Components compared numerically, left to right: `2024.10 > 2024.9`
//! - A missing trailing component counts as `0`
//! - A non-numeric component also counts as `0`
//!
//! The literal `latest` is a sentinel, not a version. Only `needs_update`
//! interprets it; `compare_versions` treats it like any other non-numeric
//! string.

use std::cmp::Ordering;

/// Version sentinel meaning "whatever the vendor currently ships".
pub const LATEST: &str = "latest";

/// A parsed version for comparison
#[derive(Debug, Clone)]
pub struct Version {
    components: Vec<u64>,
    original: String,
}

impl Version {
    pub fn parse(s: &str) -> Self {
        let original = s.trim().to_string();
        let components = original
            .split('.')
            .map(|part| part.trim().parse::<u64>().unwrap_or(0))
            .collect();

        Version {
            components,
            original,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.original
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            let a = self.components.get(i).copied().unwrap_or(0);
            let b = other.components.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.original)
    }
}

pub fn compare_versions(a: &str, b: &str) -> Ordering {
    Version::parse(a).cmp(&Version::parse(b))
}

/// Whether moving from `current` to `target` is an update.
pub fn needs_update(current: &str, target: &str) -> bool {
    if target.trim() == LATEST {
        return true;
    }
    compare_versions(current, target) == Ordering::Less
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn compares_numerically_not_lexically() {
        assert_eq!(compare_versions("2024.10", "2024.9"), Ordering::Greater);
        assert_eq!(
            compare_versions("2024.1.1", "2023.12.1.4"),
            Ordering::Greater
        );
    }

    #[test]
    fn missing_components_are_zero() {
        assert_eq!(compare_versions("21", "21.0"), Ordering::Equal);
        assert_eq!(compare_versions("21", "21.0.5"), Ordering::Less);
        assert_eq!(compare_versions("21.0.0.0", "21"), Ordering::Equal);
    }

    #[test]
    fn non_numeric_components_are_zero() {
        assert_eq!(compare_versions("1.beta", "1.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.x.1", "1.0.1"), Ordering::Equal);
        assert_eq!(compare_versions(LATEST, "0"), Ordering::Equal);
    }

    #[test]
    fn latest_target_always_needs_update() {
        assert!(needs_update("2024.1.1", LATEST));
        assert!(needs_update(LATEST, LATEST));
    }

    #[test]
    fn same_or_older_target_does_not_need_update() {
        assert!(!needs_update("2024.1.1", "2024.1.1"));
        assert!(!needs_update("2024.1.1", "2023.12"));
        assert!(needs_update("2023.12", "2024.1.1"));
    }

    #[test]
    fn display_keeps_original() {
        assert_eq!(Version::parse(" 2024.1 ").to_string(), "2024.1");
    }

    proptest! {
        #[test]
        fn comparison_is_antisymmetric(
            a in prop::collection::vec(0u64..100, 1..5),
            b in prop::collection::vec(0u64..100, 1..5),
        ) {
            let a = a.iter().map(u64::to_string).collect::<Vec<_>>().join(".");
            let b = b.iter().map(u64::to_string).collect::<Vec<_>>().join(".");
            prop_assert_eq!(compare_versions(&a, &b), compare_versions(&b, &a).reverse());
        }

        #[test]
        fn trailing_zeros_do_not_matter(
            parts in prop::collection::vec(0u64..1000, 1..5),
            zeros in 0usize..4,
        ) {
            let base = parts.iter().map(u64::to_string).collect::<Vec<_>>().join(".");
            let padded = format!("{base}{}", ".0".repeat(zeros));
            prop_assert_eq!(compare_versions(&base, &padded), Ordering::Equal);
        }

        #[test]
        fn latest_is_always_an_update(current in "[0-9a-z.]{0,12}") {
            prop_assert!(needs_update(&current, LATEST));
        }
    }
}
