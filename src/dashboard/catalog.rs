// APIHub API catalog

use serde::Serialize;

/// One entry of an API's version history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Release {
    pub version: &'static str,
    pub date: &'static str,
    pub changes: &'static str,
}

const fn release(version: &'static str, date: &'static str, changes: &'static str) -> Release {
    Release {
        version,
        date,
        changes,
    }
}

/// Static profile of one marketplace API
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ApiProfile {
    pub name: &'static str,
    pub cost_per_call: f64,
    pub quota_daily: u64,
    pub rate_limit_per_second: u32,
    pub documentation_url: &'static str,
    pub latest_version: &'static str,
    pub endpoints: &'static [&'static str],
    /// Newest release first
    pub changelog: &'static [Release],
}

pub const CATALOG: &[ApiProfile] = &[
    ApiProfile {
        name: "Image API",
        cost_per_call: 0.001,
        quota_daily: 10_000,
        rate_limit_per_second: 10,
        documentation_url: "https://www.apihub.digital/dashboard/Imageapi",
        latest_version: "v2.1",
        endpoints: &["/process", "/info", "/status"],
        changelog: &[
            release("v2.1", "2025-06-15", "Improved image processing, reduced latency."),
            release("v2.0", "2025-05-01", "New /process endpoint."),
            release("v1.0", "2024-11-20", "Initial release."),
        ],
    },
    ApiProfile {
        name: "Video API",
        cost_per_call: 0.002,
        quota_daily: 5_000,
        rate_limit_per_second: 5,
        documentation_url: "https://www.apihub.digital/dashboard/videoapi",
        latest_version: "v1.5",
        endpoints: &["/stream", "/upload", "/metadata"],
        changelog: &[
            release("v1.5", "2025-04-10", "Added MP4 support. Bug fixes."),
            release("v1.2", "2025-02-01", "Enhanced metadata extraction."),
            release("v1.0", "2024-12-05", "Initial release."),
        ],
    },
    ApiProfile {
        name: "Weather API",
        cost_per_call: 0.0005,
        quota_daily: 20_000,
        rate_limit_per_second: 20,
        documentation_url: "https://www.apihub.digital/dashboard/weatherapi",
        latest_version: "v3.0",
        endpoints: &["/current", "/forecast", "/historical"],
        changelog: &[
            release(
                "v3.0",
                "2025-06-01",
                "New data source, improved accuracy. New historical data.",
            ),
            release("v2.1", "2025-03-20", "Minor bug fixes and performance improvements."),
            release("v2.0", "2024-10-10", "Major overhaul, new `forecast` endpoint."),
        ],
    },
    ApiProfile {
        name: "Ecommerce API",
        cost_per_call: 0.0007,
        quota_daily: 15_000,
        rate_limit_per_second: 15,
        documentation_url: "https://www.apihub.digital/dashboard/ecommerceapi",
        latest_version: "v2.3",
        endpoints: &["/products", "/orders", "/users", "/checkout"],
        changelog: &[
            release("v2.3", "2025-05-20", "Optimized product search API."),
            release("v2.2", "2025-03-01", "New `/checkout` endpoint."),
            release("v2.0", "2024-11-15", "Initial release of full e-commerce suite."),
        ],
    },
    ApiProfile {
        name: "QR Code API",
        cost_per_call: 0.0012,
        quota_daily: 8_000,
        rate_limit_per_second: 8,
        documentation_url: "https://www.apihub.digital/dashboard/Qrcodeapi",
        latest_version: "v1.2",
        endpoints: &["/generate", "/decode"],
        changelog: &[
            release("v1.2", "2025-04-05", "Added support for various QR code types."),
            release("v1.0", "2025-01-10", "Initial release."),
        ],
    },
    ApiProfile {
        name: "Profile Photo API",
        cost_per_call: 0.0014,
        quota_daily: 7_000,
        rate_limit_per_second: 7,
        documentation_url: "https://www.apihub.digital/dashboard/profilepic",
        latest_version: "v2.0",
        endpoints: &["/upload", "/crop", "/filter"],
        changelog: &[
            release("v2.0", "2025-05-10", "Improved image resizing and cropping."),
            release("v1.0", "2024-12-20", "Initial release."),
        ],
    },
    ApiProfile {
        name: "Jokes API",
        cost_per_call: 0.0004,
        quota_daily: 25_000,
        rate_limit_per_second: 25,
        documentation_url: "https://www.apihub.digital/dashboard/jokesapi",
        latest_version: "v1.0",
        endpoints: &["/random", "/category", "/search"],
        changelog: &[
            release("v1.0", "2025-02-14", "Initial release with joke categories."),
        ],
    },
];

/// Look up an API by name, ignoring case and surrounding whitespace
pub fn find(name: &str) -> Option<&'static ApiProfile> {
    let name = name.trim();
    CATALOG.iter().find(|api| api.name.eq_ignore_ascii_case(name))
}

/// Cost of a single call; APIs outside the catalog are free
pub fn cost_per_call(name: &str) -> f64 {
    find(name).map(|api| api.cost_per_call).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_is_case_insensitive() {
        let api = find("  weather api ").unwrap();
        assert_eq!(api.name, "Weather API");
        assert_eq!(api.latest_version, "v3.0");
        assert!(find("Teleport API").is_none());
    }

    #[test]
    fn test_unknown_api_costs_nothing() {
        assert_eq!(cost_per_call("Video API"), 0.002);
        assert_eq!(cost_per_call("Mystery API"), 0.0);
    }

    #[test]
    fn test_changelog_starts_at_latest_version() {
        for api in CATALOG {
            assert!(!api.changelog.is_empty(), "{} has no changelog", api.name);
            assert_eq!(api.changelog[0].version, api.latest_version);
            let dates: Vec<_> = api.changelog.iter().map(|r| r.date).collect();
            let mut newest_first = dates.clone();
            newest_first.sort_by(|a, b| b.cmp(a));
            assert_eq!(dates, newest_first);
        }
    }

    #[test]
    fn test_catalog_names_are_unique() {
        let mut names: Vec<_> = CATALOG.iter().map(|api| api.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 7);
    }
}
