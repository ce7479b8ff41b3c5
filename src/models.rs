use chrono::{DateTime, FixedOffset, Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Sheet serialization for "no time set" on a scheduled event.
pub const NO_TIME_SENTINEL: &str = "1899-12-30T00:00:00.000Z";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultKind {
    #[serde(rename = "individual")]
    Individual,
    #[serde(rename = "group")]
    Group,
}

impl ResultKind {
    pub fn label(self) -> &'static str {
        match self {
            ResultKind::Individual => "individual",
            ResultKind::Group => "group",
        }
    }
}

/// A credited winner. The sheet emits either a plain string (team name)
/// or an object for an individual. Anything else is kept verbatim so a
/// malformed row never fails the whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Winner {
    Group(String),
    Individual {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        department: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        year: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        group: Option<String>,
    },
    Other(serde_json::Value),
}

impl Winner {
    pub fn is_blank(&self) -> bool {
        match self {
            Winner::Group(name) => name.trim().is_empty(),
            Winner::Individual { name, .. } => name.trim().is_empty(),
            Winner::Other(value) => value.is_null(),
        }
    }

    /// Serialized form used for substring search, mirroring the
    /// stringification the search box matches against.
    pub fn search_blob(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// One placement slot as the sheet emits it: a single winner or an
/// already-grouped list of winners.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PlacementField {
    Many(Vec<Winner>),
    One(Winner),
}

impl PlacementField {
    /// Flatten one level so every placement is a plain winner list. An
    /// empty single value counts as "no winner at this placement".
    pub fn into_winners(self) -> Vec<Winner> {
        match self {
            PlacementField::Many(winners) => winners,
            PlacementField::One(winner) if winner.is_blank() => Vec::new(),
            PlacementField::One(winner) => vec![winner],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawResultEntry {
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub first: Option<PlacementField>,
    #[serde(default)]
    pub second: Option<PlacementField>,
    #[serde(default)]
    pub third: Option<PlacementField>,
}

/// Body of the results endpoint: two arrays tagged by position.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultsDocument {
    #[serde(default)]
    pub individual: Vec<RawResultEntry>,
    #[serde(default)]
    pub group: Vec<RawResultEntry>,
}

/// One event's aggregated result. The placement arrays are always
/// present after normalization, possibly empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventResult {
    pub kind: ResultKind,
    pub item: String,
    pub first: Vec<Winner>,
    pub second: Vec<Winner>,
    pub third: Vec<Winner>,
}

impl EventResult {
    pub fn placements(&self) -> [(&'static str, &[Winner]); 3] {
        [
            ("1st", self.first.as_slice()),
            ("2nd", self.second.as_slice()),
            ("3rd", self.third.as_slice()),
        ]
    }

    /// Winners that actually render on a card: individuals need a
    /// non-empty name, groups a non-empty team string.
    pub fn valid_winner_count(&self) -> usize {
        self.placements()
            .iter()
            .map(|(_, winners)| {
                winners
                    .iter()
                    .filter(|winner| match (self.kind, winner) {
                        (ResultKind::Individual, Winner::Individual { name, .. }) => {
                            !name.trim().is_empty()
                        }
                        (ResultKind::Group, Winner::Group(name)) => !name.trim().is_empty(),
                        _ => false,
                    })
                    .count()
            })
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsRow {
    #[serde(default = "default_team_name")]
    pub team: String,
    #[serde(rename = "totalPoints", default)]
    pub total_points: f64,
}

impl PointsRow {
    pub fn points_label(&self) -> String {
        if self.total_points.fract() == 0.0 {
            format!("{}", self.total_points as i64)
        } else {
            format!("{}", self.total_points)
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PointsDocument {
    #[serde(rename = "totalPoints", default)]
    pub total_points: Vec<PointsRow>,
}

impl PointsDocument {
    /// Standings sorted descending by points, ties kept in sheet order.
    pub fn sorted_rows(self) -> Vec<PointsRow> {
        let mut rows = self.total_points;
        rows.sort_by(|a, b| b.total_points.total_cmp(&a.total_points));
        rows
    }
}

fn default_team_name() -> String {
    "Unknown Team".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduledEvent {
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub venue: String,
}

impl ScheduledEvent {
    pub fn formatted_date(&self) -> String {
        match parse_sheet_timestamp(&self.date) {
            Some(date) => date.with_timezone(&Local).format("%d/%m/%Y").to_string(),
            None => "Invalid Date".to_string(),
        }
    }

    pub fn formatted_time(&self) -> String {
        if self.time == NO_TIME_SENTINEL {
            return "No Time Available".to_string();
        }
        match parse_sheet_timestamp(&self.time) {
            Some(time) => time.format("%I:%M %p").to_string(),
            None => "Invalid Time".to_string(),
        }
    }

    pub fn is_on(&self, day: NaiveDate) -> bool {
        parse_sheet_timestamp(&self.date)
            .map(|date| date.with_timezone(&Local).date_naive() == day)
            .unwrap_or(false)
    }
}

fn parse_sheet_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw).ok()
}

/// A registration as the listing endpoint returns it. `year` is absent
/// in older sheet rows, `group` only set for group events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(rename = "rollNo", default)]
    pub roll_no: String,
    #[serde(rename = "regNum", default)]
    pub reg_num: String,
    #[serde(default)]
    pub group: Option<String>,
}

/// Fields submitted by the off-stage registration form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrationForm {
    pub event: String,
    pub name: String,
    pub department: String,
    pub year: String,
    pub roll_no: String,
    pub phone: String,
    pub group: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub status: String,
    #[serde(rename = "regNum", default)]
    pub reg_num: String,
}

impl SubmitResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Admin sheet row controlling whether an event accepts registrations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventStatus {
    #[serde(rename = "Event")]
    pub event: String,
    #[serde(rename = "Status", default)]
    pub status: String,
}

impl EventStatus {
    pub fn is_open(&self) -> bool {
        self.status == "TRUE"
    }

    pub fn set_open(&mut self, open: bool) {
        self.status = if open { "TRUE" } else { "FALSE" }.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winner_parses_both_shapes() {
        let team: Winner = serde_json::from_str("\"TeamA\"").unwrap();
        assert_eq!(team, Winner::Group("TeamA".to_string()));

        let individual: Winner =
            serde_json::from_str(r#"{"name":"Alice","department":"CS","year":"2nd"}"#).unwrap();
        match individual {
            Winner::Individual {
                name, department, ..
            } => {
                assert_eq!(name, "Alice");
                assert_eq!(department.as_deref(), Some("CS"));
            }
            other => panic!("expected individual, got {other:?}"),
        }
    }

    #[test]
    fn malformed_winner_is_kept_not_rejected() {
        let odd: Winner = serde_json::from_str(r#"{"team":"no name field"}"#).unwrap();
        assert!(matches!(odd, Winner::Other(_)));
        assert!(!odd.search_blob().is_empty());
    }

    #[test]
    fn placement_field_flattens_one_level() {
        let one: PlacementField = serde_json::from_str(r#"{"name":"Bob"}"#).unwrap();
        assert_eq!(one.into_winners().len(), 1);

        let many: PlacementField = serde_json::from_str(r#"["TeamA","TeamB"]"#).unwrap();
        assert_eq!(many.into_winners().len(), 2);

        let blank: PlacementField = serde_json::from_str("\"\"").unwrap();
        assert!(blank.into_winners().is_empty());
    }

    #[test]
    fn points_rows_sort_descending_and_default_missing_fields() {
        let doc: PointsDocument = serde_json::from_str(
            r#"{"totalPoints":[{"team":"B","totalPoints":10},{"totalPoints":25},{"team":"C","totalPoints":17}]}"#,
        )
        .unwrap();
        let rows = doc.sorted_rows();
        assert_eq!(rows[0].team, "Unknown Team");
        assert_eq!(rows[0].total_points, 25.0);
        assert_eq!(rows[1].team, "C");
        assert_eq!(rows[2].team, "B");
        assert_eq!(rows[2].points_label(), "10");
    }

    #[test]
    fn schedule_time_sentinel_means_no_time() {
        let event = ScheduledEvent {
            event: "Quiz".to_string(),
            date: "2025-02-10T00:00:00.000Z".to_string(),
            time: NO_TIME_SENTINEL.to_string(),
            venue: "Main Hall".to_string(),
        };
        assert_eq!(event.formatted_time(), "No Time Available");

        let timed = ScheduledEvent {
            time: "2025-02-10T09:30:00.000Z".to_string(),
            ..event.clone()
        };
        assert_eq!(timed.formatted_time(), "09:30 AM");

        let broken = ScheduledEvent {
            date: "not a date".to_string(),
            ..event
        };
        assert_eq!(broken.formatted_date(), "Invalid Date");
        assert!(!broken.is_on(Local::now().date_naive()));
    }

    #[test]
    fn event_status_round_trips_sheet_booleans() {
        let mut status: EventStatus =
            serde_json::from_str(r#"{"Event":"Dance","Status":"TRUE"}"#).unwrap();
        assert!(status.is_open());
        status.set_open(false);
        assert_eq!(
            serde_json::to_string(&status).unwrap(),
            r#"{"Event":"Dance","Status":"FALSE"}"#
        );
    }

    #[test]
    fn valid_winner_count_respects_kind() {
        let result = EventResult {
            kind: ResultKind::Individual,
            item: "Quiz".to_string(),
            first: vec![
                Winner::Individual {
                    name: "Alice".to_string(),
                    department: None,
                    year: None,
                    group: None,
                },
                Winner::Group("TeamA".to_string()),
            ],
            second: vec![Winner::Individual {
                name: "  ".to_string(),
                department: None,
                year: None,
                group: None,
            }],
            third: Vec::new(),
        };
        // The stray group string and the blank name are both invisible
        // on an individual card.
        assert_eq!(result.valid_winner_count(), 1);
    }
}
