// Flattened per-profile text used as the unit of embedding

use super::{non_empty, Profile};

/// Newline-joined searchable text for one profile. Never empty.
pub fn build_document(profile: &Profile) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut push = |value: Option<&str>| {
        if let Some(v) = non_empty(value) {
            parts.push(v.to_string());
        }
    };

    push(profile.about.as_deref());
    // "--" is LinkedIn's placeholder for a missing headline
    push(profile.headline.as_deref().filter(|h| h.trim() != "--"));
    push(profile.top_skills.as_deref().map(|s| s.replace(" • ", " ")).as_deref());
    push(profile.location.display());

    for position in &profile.current_position {
        push(position.company_name.as_deref());
    }
    for experience in &profile.experience {
        push(experience.position.as_deref());
        push(experience.company_name.as_deref());
        push(experience.description.as_deref());
    }

    let document = parts.join("\n");
    let document = document.trim();
    if document.is_empty() {
        " ".to_string()
    } else {
        document.to_string()
    }
}
