use std::sync::LazyLock;

use regex::Regex;

use crate::lookup::{company_country, domain_country, KEYWORD_COUNTRIES};

static KEYWORD_RES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    KEYWORD_COUNTRIES
        .iter()
        .map(|(kw, country)| {
            let re = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(kw))).unwrap();
            (re, *country)
        })
        .collect()
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferredCountries {
    pub developed: Option<String>,
    pub deployed: Option<String>,
}

/// Resolve developed and deployed country. Never fails; unresolved stays `None`.
///
/// Developed: owner name against the company table, then website domain suffix.
/// Deployed: first description keyword in table order, then the developed country.
pub fn infer_countries(owner: &str, website: &str, description: &str) -> InferredCountries {
    let developed = company_country(owner)
        .or_else(|| country_from_website(website))
        .map(str::to_string);

    let deployed = KEYWORD_RES
        .iter()
        .find(|(re, _)| re.is_match(description))
        .map(|(_, country)| country.to_string())
        .or_else(|| developed.clone());

    InferredCountries {
        developed,
        deployed,
    }
}

/// Country implied by a website's host, scheme and `www.` optional.
pub fn country_from_website(website: &str) -> Option<&'static str> {
    host_of(website).and_then(|host| domain_country(&host))
}

pub fn host_of(url: &str) -> Option<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return None;
    }
    let rest = trimmed
        .split_once("://")
        .map(|(_, r)| r)
        .unwrap_or(trimmed);
    let host = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or("")
        .split(':')
        .next()
        .unwrap_or("")
        .trim_start_matches("www.")
        .to_lowercase();
    if host.is_empty() || !host.contains('.') {
        None
    } else {
        Some(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn company_beats_domain() {
        let c = infer_countries(
            "Mitsubishi Heavy Industries, Ltd.",
            "https://www.example.de",
            "",
        );
        assert_eq!(c.developed.as_deref(), Some("Japan"));
        assert_eq!(c.deployed.as_deref(), Some("Japan"));
    }

    #[test]
    fn domain_when_company_unknown() {
        let c = infer_countries("Small Startup", "www.sunpower.co.uk/products", "");
        assert_eq!(c.developed.as_deref(), Some("United Kingdom"));
    }

    #[test]
    fn deployment_differs_from_development() {
        let c = infer_countries(
            "Vestas",
            "",
            "Pilot installation near Nairobi, scaled across East Africa.",
        );
        assert_eq!(c.developed.as_deref(), Some("Denmark"));
        assert_eq!(c.deployed.as_deref(), Some("Kenya"));
    }

    #[test]
    fn keyword_requires_word_boundary() {
        // "Indiana" must not match "India"
        let c = infer_countries("", "", "Tested in Indiana");
        assert_eq!(c.deployed, None);
    }

    #[test]
    fn unresolved() {
        assert_eq!(infer_countries("", "", ""), InferredCountries::default());
        assert_eq!(infer_countries("Nobody", "not a url", "nothing"), InferredCountries::default());
    }

    #[test]
    fn host_parsing() {
        assert_eq!(host_of("https://www.mhi.com/en/x?y=1").as_deref(), Some("mhi.com"));
        assert_eq!(host_of("mhi.co.jp:8080").as_deref(), Some("mhi.co.jp"));
        assert_eq!(host_of(""), None);
    }
}
