use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

/// What to do when the same event name shows up in both the individual
/// and the group source arrays. The sheet should never do this; when it
/// does, the winning kind is a product decision, so it lives in config
/// instead of being hardcoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    #[default]
    LastSeen,
    FirstSeen,
    Reject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_results_url")]
    pub results: String,
    #[serde(default = "default_total_points_url")]
    pub total_points: String,
    #[serde(default = "default_registrations_url")]
    pub registrations: String,
    #[serde(default = "default_schedule_url")]
    pub schedule: String,
    #[serde(default = "default_event_status_url")]
    pub event_status: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            results: default_results_url(),
            total_points: default_total_points_url(),
            registrations: default_registrations_url(),
            schedule: default_schedule_url(),
            event_status: default_event_status_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamRoster {
    pub name: String,
    #[serde(default)]
    pub departments: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FozlavaConfig {
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default = "default_results_page_size")]
    pub results_page_size: usize,
    #[serde(default = "default_points_poll_seconds")]
    pub points_poll_seconds: u64,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
    #[serde(default = "default_gallery_dir")]
    pub gallery_dir: String,
    #[serde(default)]
    pub merge_policy: MergePolicy,
    #[serde(default = "default_teams")]
    pub teams: Vec<TeamRoster>,
}

impl Default for FozlavaConfig {
    fn default() -> Self {
        Self {
            endpoints: EndpointsConfig::default(),
            results_page_size: default_results_page_size(),
            points_poll_seconds: default_points_poll_seconds(),
            cache_dir: default_cache_dir(),
            gallery_dir: default_gallery_dir(),
            merge_policy: MergePolicy::default(),
            teams: default_teams(),
        }
    }
}

impl FozlavaConfig {
    /// All departments across the configured teams, for the form
    /// dropdown.
    pub fn all_departments(&self) -> Vec<String> {
        self.teams
            .iter()
            .flat_map(|team| team.departments.iter().cloned())
            .collect()
    }
}

// The portal talks to the festival's published scripting deployments;
// a config file only needs to override these when the sheet moves.
fn default_results_url() -> String {
    "https://script.google.com/macros/s/AKfycbxu0ehjZKgAxTq4REiMrfdZlE5eZ5IhyURpggvW0AJEA8ikdzqOaRrbeg3_2Ag5jIXJGg/exec".to_string()
}

fn default_total_points_url() -> String {
    default_results_url()
}

fn default_registrations_url() -> String {
    "https://script.google.com/macros/s/AKfycbzxzB61OITDNFIdKpk_eYKUbz59p-504uIukXZT7qOw2yuD55YldAmTfmmdGpVM6HM/exec".to_string()
}

fn default_schedule_url() -> String {
    "https://script.google.com/macros/s/AKfycbzE0jNvKGLm0Sn3EEqhZdpioRIXGnK2fyb9zRPJ3nqWIHKBdOpEvYD9qNoT_mfbB6D6yA/exec".to_string()
}

fn default_event_status_url() -> String {
    "https://script.google.com/macros/s/AKfycbzszZ4Cuxy-HICD2taE8g0GKl1OZXEjBq6VYJUISPRDxV_sZ3dlVDqRKKkMowIG3q1vnQ/exec".to_string()
}

fn default_results_page_size() -> usize {
    12
}

fn default_points_poll_seconds() -> u64 {
    15
}

fn default_cache_dir() -> String {
    ".fozlava_cache".to_string()
}

fn default_gallery_dir() -> String {
    "gallery".to_string()
}

fn default_teams() -> Vec<TeamRoster> {
    let team = |name: &str, departments: &[&str]| TeamRoster {
        name: name.to_string(),
        departments: departments.iter().map(ToString::to_string).collect(),
    };
    vec![
        team(
            "Team A",
            &[
                "Maths",
                "Statistics",
                "Management Studies",
                "Geology",
                "History",
                "English (Aided)",
                "Library Science",
            ],
        ),
        team(
            "Team B",
            &[
                "Physics",
                "Chemistry",
                "Computer Science",
                "B.Voc IT",
                "Malayalam",
                "Functional English",
                "English (SF)",
            ],
        ),
        team(
            "Team C",
            &[
                "Psychology (SF)",
                "Psychology (Aided)",
                "Commerce",
                "Zoology",
                "Botany",
                "Sociology",
            ],
        ),
        team(
            "Team D",
            &["BCom CA", "Arabic", "Economics", "BMMC", "B.Voc Auto", "MCJ"],
        ),
    ]
}

pub fn load_fozlava_config(config_path: &Path) -> Result<FozlavaConfig, String> {
    if !config_path.exists() {
        info!(
            "fozlava.toml not found, using defaults: {}",
            config_path.display()
        );
        return Ok(FozlavaConfig::default());
    }

    let raw = fs::read_to_string(config_path).map_err(|err| {
        format!(
            "Failed to read fozlava.toml at {}: {}",
            config_path.display(),
            err
        )
    })?;

    toml::from_str::<FozlavaConfig>(&raw).map_err(|err| {
        format!(
            "Failed to parse fozlava.toml at {}: {}",
            config_path.display(),
            err
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_gets_full_defaults() {
        let config: FozlavaConfig = toml::from_str("").unwrap();
        assert_eq!(config.results_page_size, 12);
        assert_eq!(config.merge_policy, MergePolicy::LastSeen);
        assert_eq!(config.teams.len(), 4);
        assert!(config.endpoints.registrations.starts_with("https://"));
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config: FozlavaConfig = toml::from_str(
            "results_page_size = 6\nmerge_policy = \"reject\"\n\n[endpoints]\nschedule = \"http://localhost:9999/schedule\"\n",
        )
        .unwrap();
        assert_eq!(config.results_page_size, 6);
        assert_eq!(config.merge_policy, MergePolicy::Reject);
        assert_eq!(config.endpoints.schedule, "http://localhost:9999/schedule");
        assert_eq!(config.endpoints.results, default_results_url());
        assert_eq!(config.points_poll_seconds, 15);
    }

    #[test]
    fn departments_flatten_across_teams() {
        let config = FozlavaConfig::default();
        let departments = config.all_departments();
        assert!(departments.iter().any(|d| d == "Physics"));
        assert!(departments.iter().any(|d| d == "MCJ"));
        assert_eq!(departments.len(), 26);
    }
}
