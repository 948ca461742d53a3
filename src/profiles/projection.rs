// Display card projection

use serde::Serialize;

use super::{non_empty, Profile};

const SNIPPET_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileCard {
    pub id: String,
    pub linkedin_url: String,
    pub full_name: String,
    pub headline: String,
    pub current_company: String,
    pub current_title: String,
    pub location: String,
    pub skills: Vec<String>,
    pub about_snippet: String,
    pub photo: String,
    pub relevance_score: f64,
}

fn text(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

/// Flat display record for one profile, carrying `score` rounded to 4 decimals.
pub fn project(id: &str, profile: &Profile, score: f32) -> ProfileCard {
    let full_name = [profile.first_name.as_deref(), profile.last_name.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string();

    let skills = profile
        .top_skills
        .as_deref()
        .map(|s| {
            s.split('•')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let about = profile.about.as_deref().unwrap_or_default();
    let about_snippet = if about.chars().count() > SNIPPET_CHARS {
        let mut snippet: String = about.chars().take(SNIPPET_CHARS).collect();
        snippet.push('…');
        snippet
    } else {
        about.to_string()
    };

    let photo = non_empty(profile.profile_picture.url.as_deref())
        .or_else(|| non_empty(profile.photo.as_deref()));

    ProfileCard {
        id: id.to_string(),
        linkedin_url: text(profile.linkedin_url.as_deref()),
        full_name: if full_name.is_empty() {
            "Unknown".to_string()
        } else {
            full_name
        },
        headline: text(profile.headline.as_deref()),
        current_company: text(
            profile
                .current_position
                .first()
                .and_then(|p| p.company_name.as_deref()),
        ),
        current_title: text(profile.experience.first().and_then(|e| e.position.as_deref())),
        location: text(profile.location.display()),
        skills,
        about_snippet,
        photo: text(photo),
        relevance_score: round4(score),
    }
}

fn round4(score: f32) -> f64 {
    (f64::from(score) * 10_000.0).round() / 10_000.0
}
