use std::collections::HashSet;

/// Slugify an external identifier for use as a heading anchor.
///
/// Lowercases, turns every run of non-alphanumerics into a single `-` and
/// trims dashes at both ends. Applying it twice gives the same result.
pub fn slugify(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Hands out heading anchors that are unique within one document.
///
/// The first claim of a slug gets it verbatim; later claims get `-2`, `-3`, …
/// skipping any suffixed form that was itself already claimed.
#[derive(Debug, Default)]
pub struct AnchorRegistry {
    used: HashSet<String>,
}

impl AnchorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim an anchor for an external identifier; `None` when it slugifies to nothing
    pub fn claim(&mut self, external_id: &str) -> Option<String> {
        let slug = slugify(external_id);
        if slug.is_empty() {
            return None;
        }
        if self.used.insert(slug.clone()) {
            return Some(slug);
        }
        let mut n = 2;
        loop {
            let candidate = format!("{slug}-{n}");
            if self.used.insert(candidate.clone()) {
                return Some(candidate);
            }
            n += 1;
        }
    }
}
