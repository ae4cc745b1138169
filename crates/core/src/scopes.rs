use crate::error::CoreError;

/// Titles for the pages the site ships with.
const KNOWN_SCOPES: &[(&str, &str)] = &[
    ("home", "Startseite"),
    ("mittelstand", "Mittelstand"),
    ("leistungen", "Leistungen"),
    ("portfolio", "Portfolio"),
    ("team", "Team"),
    ("ueber-uns", "Über uns"),
    ("kontakt", "Kontakt"),
    ("faq", "FAQ"),
    ("impressum", "Impressum"),
    ("datenschutz", "Datenschutz"),
];

/// Built-in display title for a slug, if the slug is one of the known pages.
pub fn known_title(slug: &str) -> Option<&'static str> {
    KNOWN_SCOPES
        .iter()
        .find(|(known, _)| *known == slug)
        .map(|(_, title)| *title)
}

/// Display title for a new scope: the known title, else the raw slug.
pub fn default_title(slug: &str) -> String {
    known_title(slug).unwrap_or(slug).to_string()
}

pub fn validate_slug(slug: &str) -> Result<(), CoreError> {
    if slug.trim().is_empty() {
        return Err(CoreError::InvalidKey("scope slug must not be empty".into()));
    }
    Ok(())
}

pub fn validate_section_key(key: &str) -> Result<(), CoreError> {
    if key.trim().is_empty() {
        return Err(CoreError::InvalidKey("section key must not be empty".into()));
    }
    Ok(())
}
