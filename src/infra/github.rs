//! GitHub contribution fetchers: the GraphQL API when a token is configured,
//! and a public profile scrape as the tokenless fallback.

use std::cell::RefCell;

use async_trait::async_trait;
use lol_html::{RewriteStrSettings, element, rewrite_str};
use serde::Deserialize;
use serde_json::json;
use time::{Date, Weekday, macros::format_description};
use tracing::debug;

use crate::application::contributions::{
    ContributionCalendar, ContributionDay, ContributionFetcher, ContributionSource,
    ContributionWeek, level_for_count,
};
use crate::infra::error::InfraError;

const GRAPHQL_ENDPOINT: &str = "https://api.github.com/graphql";
const USER_AGENT: &str = concat!("vetrina/", env!("CARGO_PKG_VERSION"));

const CALENDAR_QUERY: &str = "\
query($login: String!) {
  user(login: $login) {
    contributionsCollection {
      contributionCalendar {
        totalContributions
        weeks {
          contributionDays {
            date
            contributionCount
            contributionLevel
          }
        }
      }
    }
  }
}";

pub struct GraphQlFetcher {
    client: reqwest::Client,
    token: String,
}

impl GraphQlFetcher {
    pub fn new(client: reqwest::Client, token: String) -> Self {
        Self { client, token }
    }
}

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<GraphQlData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
struct GraphQlData {
    user: Option<GraphQlUser>,
}

#[derive(Deserialize)]
struct GraphQlUser {
    #[serde(rename = "contributionsCollection")]
    contributions: GraphQlCollection,
}

#[derive(Deserialize)]
struct GraphQlCollection {
    #[serde(rename = "contributionCalendar")]
    calendar: GraphQlCalendar,
}

#[derive(Deserialize)]
struct GraphQlCalendar {
    #[serde(rename = "totalContributions")]
    total: u64,
    weeks: Vec<GraphQlWeek>,
}

#[derive(Deserialize)]
struct GraphQlWeek {
    #[serde(rename = "contributionDays")]
    days: Vec<GraphQlDay>,
}

#[derive(Deserialize)]
struct GraphQlDay {
    date: String,
    #[serde(rename = "contributionCount")]
    count: u32,
    #[serde(rename = "contributionLevel")]
    level: String,
}

fn named_level(name: &str) -> u8 {
    match name {
        "FIRST_QUARTILE" => 1,
        "SECOND_QUARTILE" => 2,
        "THIRD_QUARTILE" => 3,
        "FOURTH_QUARTILE" => 4,
        _ => 0,
    }
}

#[async_trait]
impl ContributionFetcher for GraphQlFetcher {
    fn source(&self) -> ContributionSource {
        ContributionSource::Api
    }

    async fn fetch(&self, user: &str) -> Result<ContributionCalendar, InfraError> {
        let body = json!({
            "query": CALENDAR_QUERY,
            "variables": { "login": user },
        });

        let response = self
            .client
            .post(GRAPHQL_ENDPOINT)
            .bearer_auth(&self.token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .json(&body)
            .send()
            .await
            .map_err(|err| InfraError::upstream("github-api", err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InfraError::upstream(
                "github-api",
                format!("status {status}"),
            ));
        }

        let parsed: GraphQlResponse = response
            .json()
            .await
            .map_err(|err| InfraError::upstream("github-api", err.to_string()))?;

        if let Some(first) = parsed.errors.first() {
            return Err(InfraError::upstream("github-api", first.message.clone()));
        }
        let calendar = parsed
            .data
            .and_then(|data| data.user)
            .map(|found| found.contributions.calendar)
            .ok_or_else(|| InfraError::upstream("github-api", "user not found"))?;

        let date_format = format_description!("[year]-[month]-[day]");
        let mut weeks = Vec::with_capacity(calendar.weeks.len());
        for week in calendar.weeks {
            let mut days = Vec::with_capacity(week.days.len());
            for day in week.days {
                let date = Date::parse(&day.date, &date_format).map_err(|err| {
                    InfraError::upstream("github-api", format!("bad date `{}`: {err}", day.date))
                })?;
                days.push(ContributionDay {
                    date,
                    count: day.count,
                    level: named_level(&day.level),
                });
            }
            weeks.push(ContributionWeek { days });
        }

        debug!(target = "infra::github", user, total = calendar.total, "calendar via api");
        Ok(ContributionCalendar {
            user: user.to_string(),
            total: calendar.total,
            weeks,
            source: ContributionSource::Api,
        })
    }
}

pub struct ScrapeFetcher {
    client: reqwest::Client,
}

impl ScrapeFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ContributionFetcher for ScrapeFetcher {
    fn source(&self) -> ContributionSource {
        ContributionSource::Scrape
    }

    async fn fetch(&self, user: &str) -> Result<ContributionCalendar, InfraError> {
        let url = format!("https://github.com/users/{user}/contributions");
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|err| InfraError::upstream("github-scrape", err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InfraError::upstream(
                "github-scrape",
                format!("status {status}"),
            ));
        }

        let html = response
            .text()
            .await
            .map_err(|err| InfraError::upstream("github-scrape", err.to_string()))?;

        let days = parse_contribution_grid(&html)?;
        if days.is_empty() {
            return Err(InfraError::upstream(
                "github-scrape",
                "no contribution cells in profile markup",
            ));
        }

        debug!(target = "infra::github", user, cells = days.len(), "calendar via scrape");
        Ok(assemble_calendar(user, days))
    }
}

/// Pull `(date, level)` pairs out of the profile's calendar table. The cell
/// tooltips carry exact counts but live in separate elements, so the scrape
/// approximates counts from the intensity level instead.
fn parse_contribution_grid(html: &str) -> Result<Vec<ContributionDay>, InfraError> {
    let date_format = format_description!("[year]-[month]-[day]");
    let cells: RefCell<Vec<ContributionDay>> = RefCell::new(Vec::new());
    let bad_cell: RefCell<Option<String>> = RefCell::new(None);

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("td[data-date][data-level]", |el| {
                let date_raw = el.get_attribute("data-date").unwrap_or_default();
                let level_raw = el.get_attribute("data-level").unwrap_or_default();
                match (
                    Date::parse(&date_raw, &date_format),
                    level_raw.parse::<u8>(),
                ) {
                    (Ok(date), Ok(level)) if level <= 4 => {
                        cells.borrow_mut().push(ContributionDay {
                            date,
                            count: approximate_count(level),
                            level,
                        });
                    }
                    _ => {
                        bad_cell.borrow_mut().get_or_insert(date_raw);
                    }
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| InfraError::upstream("github-scrape", err.to_string()))?;

    if let Some(cell) = bad_cell.into_inner() {
        return Err(InfraError::upstream(
            "github-scrape",
            format!("unparseable calendar cell `{cell}`"),
        ));
    }

    let mut days = cells.into_inner();
    days.sort_by_key(|day| day.date);
    Ok(days)
}

/// Midpoint of the bucket that [`level_for_count`] maps back onto the level.
fn approximate_count(level: u8) -> u32 {
    match level {
        0 => 0,
        1 => 2,
        2 => 5,
        3 => 10,
        _ => 15,
    }
}

fn assemble_calendar(user: &str, days: Vec<ContributionDay>) -> ContributionCalendar {
    let total = days.iter().map(|day| u64::from(day.count)).sum();

    let mut weeks: Vec<ContributionWeek> = Vec::new();
    for day in days {
        if day.date.weekday() == Weekday::Sunday || weeks.is_empty() {
            weeks.push(ContributionWeek { days: Vec::new() });
        }
        if let Some(week) = weeks.last_mut() {
            week.days.push(day);
        }
    }

    ContributionCalendar {
        user: user.to_string(),
        total,
        weeks,
        source: ContributionSource::Scrape,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn grid_cells_are_parsed_and_sorted() {
        let html = r#"
            <table>
              <tr>
                <td data-date="2025-06-02" data-level="3" class="ContributionCalendar-day"></td>
                <td data-date="2025-06-01" data-level="0" class="ContributionCalendar-day"></td>
              </tr>
            </table>
        "#;

        let days = parse_contribution_grid(html).expect("grid");
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, date!(2025 - 06 - 01));
        assert_eq!(days[0].count, 0);
        assert_eq!(days[1].level, 3);
        assert_eq!(days[1].count, 10);
    }

    #[test]
    fn malformed_cells_fail_the_scrape() {
        let html = r#"<td data-date="not-a-date" data-level="1"></td>"#;
        assert!(parse_contribution_grid(html).is_err());
    }

    #[test]
    fn weeks_split_on_sundays() {
        // 2025-06-01 is a Sunday.
        let days: Vec<ContributionDay> = (0..10)
            .map(|offset| ContributionDay {
                date: date!(2025 - 06 - 01) + time::Duration::days(offset),
                count: 1,
                level: 1,
            })
            .collect();

        let calendar = assemble_calendar("octocat", days);
        assert_eq!(calendar.weeks.len(), 2);
        assert_eq!(calendar.weeks[0].days.len(), 7);
        assert_eq!(calendar.weeks[1].days.len(), 3);
        assert_eq!(calendar.total, 10);
        assert_eq!(calendar.source, ContributionSource::Scrape);
    }

    #[test]
    fn approximate_counts_round_trip_to_their_level() {
        for level in 0..=4 {
            assert_eq!(level_for_count(approximate_count(level)), level);
        }
    }
}
