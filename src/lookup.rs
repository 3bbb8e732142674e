//! Static dictionaries used for rule-based inference.
//!
//! Ordered tables are plain `const` slices (first match wins); the exact-match
//! company index is built once on first use.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Owner name → country where the technology was developed.
pub const COMPANY_COUNTRIES: &[(&str, &str)] = &[
    ("Mitsubishi Heavy Industries", "Japan"),
    ("Mitsubishi Electric", "Japan"),
    ("Toshiba", "Japan"),
    ("Hitachi", "Japan"),
    ("Panasonic", "Japan"),
    ("Toyota", "Japan"),
    ("Kyocera", "Japan"),
    ("Siemens Gamesa", "Spain"),
    ("Siemens", "Germany"),
    ("Bosch", "Germany"),
    ("BASF", "Germany"),
    ("Fraunhofer", "Germany"),
    ("Vestas", "Denmark"),
    ("Orsted", "Denmark"),
    ("Danfoss", "Denmark"),
    ("Schneider Electric", "France"),
    ("TotalEnergies", "France"),
    ("Veolia", "France"),
    ("ABB", "Switzerland"),
    ("Climeworks", "Switzerland"),
    ("Philips", "Netherlands"),
    ("Shell", "Netherlands"),
    ("Equinor", "Norway"),
    ("Norsepower", "Finland"),
    ("Wartsila", "Finland"),
    ("Econowind", "Netherlands"),
    ("Samsung", "South Korea"),
    ("LG Chem", "South Korea"),
    ("Hyundai", "South Korea"),
    ("Huawei", "China"),
    ("BYD", "China"),
    ("CATL", "China"),
    ("LONGi", "China"),
    ("Goldwind", "China"),
    ("Tata", "India"),
    ("Suzlon", "India"),
    ("Infosys", "India"),
    ("General Electric", "United States"),
    ("Tesla", "United States"),
    ("IBM", "United States"),
    ("3M", "United States"),
    ("Rolls-Royce", "United Kingdom"),
    ("Unilever", "United Kingdom"),
    ("Embrapa", "Brazil"),
    ("Petrobras", "Brazil"),
    ("CSIRO", "Australia"),
];

/// Website host suffix → country. Longer, more specific suffixes come first.
pub const DOMAIN_COUNTRIES: &[(&str, &str)] = &[
    ("mhi.com", "Japan"),
    ("siemens.com", "Germany"),
    ("vestas.com", "Denmark"),
    ("ge.com", "United States"),
    ("co.jp", "Japan"),
    ("co.uk", "United Kingdom"),
    ("ac.uk", "United Kingdom"),
    ("com.cn", "China"),
    ("com.br", "Brazil"),
    ("com.au", "Australia"),
    ("co.kr", "South Korea"),
    ("co.in", "India"),
    ("co.za", "South Africa"),
    ("jp", "Japan"),
    ("de", "Germany"),
    ("fr", "France"),
    ("uk", "United Kingdom"),
    ("cn", "China"),
    ("kr", "South Korea"),
    ("in", "India"),
    ("br", "Brazil"),
    ("au", "Australia"),
    ("ca", "Canada"),
    ("dk", "Denmark"),
    ("nl", "Netherlands"),
    ("ch", "Switzerland"),
    ("se", "Sweden"),
    ("no", "Norway"),
    ("fi", "Finland"),
    ("es", "Spain"),
    ("it", "Italy"),
    ("ke", "Kenya"),
    ("ng", "Nigeria"),
    ("za", "South Africa"),
    ("mx", "Mexico"),
    ("cl", "Chile"),
    ("sg", "Singapore"),
    ("id", "Indonesia"),
    ("vn", "Viet Nam"),
    ("th", "Thailand"),
];

/// Description keyword → deployment country, scanned in order.
pub const KEYWORD_COUNTRIES: &[(&str, &str)] = &[
    ("Kenya", "Kenya"),
    ("Nairobi", "Kenya"),
    ("Nigeria", "Nigeria"),
    ("Lagos", "Nigeria"),
    ("Ghana", "Ghana"),
    ("Ethiopia", "Ethiopia"),
    ("Tanzania", "Tanzania"),
    ("Uganda", "Uganda"),
    ("Rwanda", "Rwanda"),
    ("South Africa", "South Africa"),
    ("Morocco", "Morocco"),
    ("Egypt", "Egypt"),
    ("India", "India"),
    ("Bangladesh", "Bangladesh"),
    ("Pakistan", "Pakistan"),
    ("Viet Nam", "Viet Nam"),
    ("Vietnam", "Viet Nam"),
    ("Indonesia", "Indonesia"),
    ("Philippines", "Philippines"),
    ("Thailand", "Thailand"),
    ("China", "China"),
    ("Japan", "Japan"),
    ("Tokyo", "Japan"),
    ("Korea", "South Korea"),
    ("Brazil", "Brazil"),
    ("Chile", "Chile"),
    ("Peru", "Peru"),
    ("Mexico", "Mexico"),
    ("Colombia", "Colombia"),
    ("Germany", "Germany"),
    ("Denmark", "Denmark"),
    ("North Sea", "United Kingdom"),
    ("Scotland", "United Kingdom"),
    ("United Kingdom", "United Kingdom"),
    ("France", "France"),
    ("Spain", "Spain"),
    ("Netherlands", "Netherlands"),
    ("Norway", "Norway"),
    ("Australia", "Australia"),
    ("Canada", "Canada"),
    ("United States", "United States"),
    ("California", "United States"),
];

/// Keyword → custom label with a ranking priority (higher first).
pub const KEYWORD_LABELS: &[(&str, &str, u8)] = &[
    ("solar", "Solar energy", 10),
    ("photovoltaic", "Solar energy", 10),
    ("wind", "Wind energy", 10),
    ("turbine", "Wind energy", 8),
    ("hydrogen", "Hydrogen", 9),
    ("fuel cell", "Hydrogen", 8),
    ("battery", "Energy storage", 9),
    ("storage", "Energy storage", 7),
    ("geothermal", "Geothermal energy", 9),
    ("hydropower", "Hydropower", 9),
    ("carbon capture", "Carbon capture", 9),
    ("biomass", "Bioenergy", 8),
    ("biogas", "Bioenergy", 8),
    ("electric vehicle", "Electric mobility", 8),
    ("sail", "Maritime decarbonization", 7),
    ("ship", "Maritime decarbonization", 6),
    ("water", "Water management", 7),
    ("irrigation", "Agriculture", 7),
    ("crop", "Agriculture", 6),
    ("waste", "Waste management", 7),
    ("recycling", "Waste management", 7),
    ("efficiency", "Energy efficiency", 6),
    ("building", "Green buildings", 5),
    ("cooling", "Cooling", 5),
    ("maintenance", "Operations and maintenance", 4),
    ("sensor", "Monitoring", 4),
];

/// Benefits-tag substring → clause used to synthesize a benefits narrative.
pub const BENEFIT_CLAUSES: &[(&str, &str)] = &[
    ("greenhouse", "It reduces greenhouse gas emissions"),
    ("energy", "improves energy efficiency"),
    ("water", "conserves water resources"),
    ("pollution", "lowers air and water pollution"),
    ("waste", "cuts waste generation"),
    ("cost", "lowers operating costs"),
    ("health", "delivers health benefits to local communities"),
    ("resilience", "strengthens climate resilience"),
];

pub const BENEFIT_CLOSING: &str = "contributing to a more sustainable future.";

/// Owner names that carry no identity and are exempt from consistency checks.
pub const OWNER_PLACEHOLDERS: &[&str] = &[
    "unknown",
    "n/a",
    "na",
    "none",
    "individual",
    "anonymous",
    "not specified",
    "private inventor",
];

/// Benefits descriptions that count as empty.
pub const TEXT_PLACEHOLDERS: &[&str] = &["", "-", "n/a", "na", "none", "tbd", "no description"];

static COMPANY_INDEX: LazyLock<HashMap<String, &'static str>> = LazyLock::new(|| {
    COMPANY_COUNTRIES
        .iter()
        .map(|(name, country)| (name.to_lowercase(), *country))
        .collect()
});

static COMPANY_RES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    COMPANY_COUNTRIES
        .iter()
        .map(|(name, country)| {
            let re = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(name))).unwrap();
            (re, *country)
        })
        .collect()
});

/// Exact (case-insensitive) company match, then whole-word match in table order.
pub fn company_country(owner: &str) -> Option<&'static str> {
    let owner = owner.trim();
    if owner.is_empty() {
        return None;
    }
    if let Some(country) = COMPANY_INDEX.get(&owner.to_lowercase()) {
        return Some(country);
    }
    COMPANY_RES
        .iter()
        .find(|(re, _)| re.is_match(owner))
        .map(|(_, country)| *country)
}

/// Suffix match of a bare host (no scheme, no `www.`) against the domain table.
/// Suffixes only match on a label boundary: `mhi.com` matches `www.mhi.com` but not `xmhi.com`.
pub fn domain_country(host: &str) -> Option<&'static str> {
    let host = host.trim().trim_end_matches('.').to_lowercase();
    if host.is_empty() {
        return None;
    }
    DOMAIN_COUNTRIES
        .iter()
        .find(|(suffix, _)| {
            host == *suffix
                || host
                    .strip_suffix(suffix)
                    .is_some_and(|rest| rest.ends_with('.'))
        })
        .map(|(_, country)| *country)
}

pub fn is_owner_placeholder(owner: &str) -> bool {
    OWNER_PLACEHOLDERS.contains(&owner.trim().to_lowercase().as_str())
}

pub fn is_text_placeholder(text: &str) -> bool {
    TEXT_PLACEHOLDERS.contains(&text.trim().to_lowercase().as_str())
}
