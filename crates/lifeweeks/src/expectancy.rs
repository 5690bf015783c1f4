//! Life expectancy at birth by country
//!
//! Both sexes combined, in years.

/// One row of the expectancy table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Country {
    /// ISO 3166-1 alpha-2 code
    pub code: &'static str,
    /// English short name
    pub name: &'static str,
    /// Life expectancy at birth in years
    pub expectancy_years: f64,
}

const fn country(code: &'static str, name: &'static str, expectancy_years: f64) -> Country {
    Country {
        code,
        name,
        expectancy_years,
    }
}

static COUNTRIES: &[Country] = &[
    country("AR", "Argentina", 76.6),
    country("AU", "Australia", 83.0),
    country("BR", "Brazil", 75.9),
    country("CA", "Canada", 82.2),
    country("CH", "Switzerland", 83.4),
    country("CN", "China", 77.4),
    country("DE", "Germany", 81.7),
    country("EG", "Egypt", 71.8),
    country("ES", "Spain", 83.2),
    country("FR", "France", 82.5),
    country("GB", "United Kingdom", 81.4),
    country("ID", "Indonesia", 71.3),
    country("IN", "India", 70.8),
    country("IT", "Italy", 83.0),
    country("JP", "Japan", 84.3),
    country("KE", "Kenya", 66.1),
    country("KR", "South Korea", 83.3),
    country("MX", "Mexico", 76.0),
    country("NG", "Nigeria", 62.6),
    country("NL", "Netherlands", 81.8),
    country("NO", "Norway", 82.6),
    country("NZ", "New Zealand", 82.0),
    country("PL", "Poland", 78.3),
    country("RU", "Russia", 73.2),
    country("SE", "Sweden", 82.4),
    country("SG", "Singapore", 83.2),
    country("TR", "Turkey", 78.6),
    country("UA", "Ukraine", 73.0),
    country("US", "United States", 78.5),
    country("ZA", "South Africa", 65.3),
];

/// Find a country by code or name, ignoring case
pub fn lookup(query: &str) -> Option<&'static Country> {
    let query = query.trim();
    COUNTRIES
        .iter()
        .find(|c| c.code.eq_ignore_ascii_case(query) || c.name.eq_ignore_ascii_case(query))
}

/// Every country, sorted by name
pub fn countries_by_name() -> Vec<&'static Country> {
    let mut all: Vec<_> = COUNTRIES.iter().collect();
    all.sort_by(|a, b| a.name.cmp(b.name));
    all
}
