//! Static portfolio records: profile, projects, resume, connect cards.
//!
//! These are literal data declared in `site.toml`, loaded once at startup.
//! Validation is a shape check (nothing empty, URLs well formed), not a
//! business invariant.

use serde::Deserialize;
use url::Url;

use crate::domain::error::DomainError;

#[derive(Debug, Clone, Deserialize)]
pub struct SiteContent {
    pub profile: Profile,
    #[serde(default)]
    pub blog: BlogSettings,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub resume: Resume,
    #[serde(default)]
    pub connect: Vec<ConnectCard>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub name: String,
    pub headline: String,
    #[serde(default)]
    pub bio: String,
    pub email: String,
    pub base_url: String,
    #[serde(default)]
    pub github_user: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct BlogSettings {
    /// Tags that earn a flat relevance bonus in related-post scoring.
    pub high_value_tags: Vec<String>,
    pub related_limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub name: String,
    pub summary: String,
    #[serde(default)]
    pub tech: Vec<String>,
    pub repo_url: Option<String>,
    pub live_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Resume {
    pub experience: Vec<ResumeEntry>,
    pub education: Vec<ResumeEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResumeEntry {
    pub organization: String,
    pub role: String,
    pub period: String,
    #[serde(default)]
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectCard {
    pub label: String,
    pub url: String,
}

impl SiteContent {
    pub fn from_toml(raw: &str) -> Result<Self, DomainError> {
        let content: SiteContent = toml::from_str(raw)
            .map_err(|err| DomainError::validation(format!("site.toml: {err}")))?;
        content.validate()?;
        Ok(content)
    }

    fn validate(&self) -> Result<(), DomainError> {
        require(&self.profile.name, "profile.name")?;
        require(&self.profile.headline, "profile.headline")?;
        require(&self.profile.email, "profile.email")?;
        require_url(&self.profile.base_url, "profile.base_url")?;

        for (index, project) in self.projects.iter().enumerate() {
            require(&project.name, "projects[].name")
                .map_err(|err| at_index(err, "projects", index))?;
            require(&project.summary, "projects[].summary")
                .map_err(|err| at_index(err, "projects", index))?;
            for url in [&project.repo_url, &project.live_url].into_iter().flatten() {
                require_url(url, "projects[].url").map_err(|err| at_index(err, "projects", index))?;
            }
        }

        for (index, entry) in self
            .resume
            .experience
            .iter()
            .chain(self.resume.education.iter())
            .enumerate()
        {
            require(&entry.organization, "resume[].organization")
                .map_err(|err| at_index(err, "resume", index))?;
            require(&entry.role, "resume[].role").map_err(|err| at_index(err, "resume", index))?;
        }

        for (index, card) in self.connect.iter().enumerate() {
            require(&card.label, "connect[].label")
                .map_err(|err| at_index(err, "connect", index))?;
            require_url(&card.url, "connect[].url")
                .map_err(|err| at_index(err, "connect", index))?;
        }

        Ok(())
    }

    /// Canonical site URL with exactly one trailing slash.
    pub fn base_url(&self) -> String {
        let trimmed = self.profile.base_url.trim_end_matches('/');
        format!("{trimmed}/")
    }
}

fn require(value: &str, key: &'static str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("`{key}` must not be empty")));
    }
    Ok(())
}

fn require_url(value: &str, key: &'static str) -> Result<(), DomainError> {
    Url::parse(value)
        .map_err(|err| DomainError::validation(format!("`{key}` is not a valid URL: {err}")))?;
    Ok(())
}

fn at_index(err: DomainError, section: &str, index: usize) -> DomainError {
    DomainError::validation(format!("{section}[{index}]: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[profile]
name = "Ada Writer"
headline = "Systems engineer"
email = "ada@example.com"
base_url = "https://ada.example.com"
"#;

    #[test]
    fn minimal_site_file_validates() {
        let content = SiteContent::from_toml(MINIMAL).expect("content");
        assert_eq!(content.profile.name, "Ada Writer");
        assert_eq!(content.base_url(), "https://ada.example.com/");
        assert!(content.projects.is_empty());
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let raw = MINIMAL.replace("https://ada.example.com", "not a url");
        assert!(SiteContent::from_toml(&raw).is_err());
    }

    #[test]
    fn project_without_summary_is_rejected() {
        let raw = format!(
            "{MINIMAL}\n[[projects]]\nname = \"vetrina\"\nsummary = \"\"\n"
        );
        assert!(SiteContent::from_toml(&raw).is_err());
    }
}
