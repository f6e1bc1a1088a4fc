//! Filter state for the album content view.

use crate::album_content::ContentItem;
use api_client::Metadata;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterCriterion {
    Tag(String),
    Camera { make: Option<String>, model: Option<String> },
}

impl FilterCriterion {
    /// Camera criterion from raw input; `None` when both fields are blank.
    pub fn camera(make: &str, model: &str) -> Option<Self> {
        let make = non_blank(make);
        let model = non_blank(model);
        if make.is_none() && model.is_none() {
            None
        } else {
            Some(FilterCriterion::Camera { make, model })
        }
    }
}

impl std::fmt::Display for FilterCriterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterCriterion::Tag(tag) => write!(f, "tag '{}'", tag),
            FilterCriterion::Camera { make, model } => write!(
                f,
                "camera {} {}",
                make.as_deref().unwrap_or("*"),
                model.as_deref().unwrap_or("*")
            ),
        }
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// No filter and a filter that matched nothing are distinct states.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FilterState {
    #[default]
    None,
    Filtering { criterion: FilterCriterion, generation: u64 },
    Active { criterion: FilterCriterion, items: Vec<ContentItem> },
    Empty { criterion: FilterCriterion },
}

impl FilterState {
    pub fn criterion(&self) -> Option<&FilterCriterion> {
        match self {
            FilterState::None => None,
            FilterState::Filtering { criterion, .. }
            | FilterState::Active { criterion, .. }
            | FilterState::Empty { criterion } => Some(criterion),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, FilterState::None)
    }

    pub fn is_filtering(&self) -> bool {
        matches!(self, FilterState::Filtering { .. })
    }

    /// Settle a finished filter into `Active` or `Empty`.
    pub fn settle(criterion: FilterCriterion, items: Vec<ContentItem>) -> Self {
        if items.is_empty() {
            FilterState::Empty { criterion }
        } else {
            FilterState::Active { criterion, items }
        }
    }
}

/// Exact match on every non-empty criterion.
pub fn matches_camera(metadata: &Metadata, make: Option<&str>, model: Option<&str>) -> bool {
    let make_ok = make.map_or(true, |m| metadata.make.as_deref().map(str::trim) == Some(m));
    let model_ok = model.map_or(true, |m| metadata.model.as_deref().map(str::trim) == Some(m));
    make_ok && model_ok
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(make: &str, model: &str) -> Metadata {
        Metadata {
            make: Some(make.to_string()),
            model: Some(model.to_string()),
            ..Metadata::default()
        }
    }

    #[test]
    fn test_camera_criterion_requires_input() {
        assert_eq!(FilterCriterion::camera("  ", ""), None);
        assert_eq!(
            FilterCriterion::camera(" Canon ", ""),
            Some(FilterCriterion::Camera { make: Some("Canon".into()), model: None })
        );
    }

    #[test]
    fn test_matches_camera() {
        let canon = metadata("Canon", "EOS 5D");
        assert!(matches_camera(&canon, Some("Canon"), None));
        assert!(matches_camera(&canon, Some("Canon"), Some("EOS 5D")));
        assert!(!matches_camera(&canon, Some("Nikon"), None));
        assert!(!matches_camera(&canon, None, Some("EOS R")));
        assert!(!matches_camera(&Metadata::default(), Some("Canon"), None));
        assert!(matches_camera(&Metadata::default(), None, None));
    }

    #[test]
    fn test_settle_distinguishes_empty() {
        let state = FilterState::settle(FilterCriterion::Tag("sea".into()), Vec::new());
        assert!(matches!(state, FilterState::Empty { .. }));
        assert_eq!(state.criterion(), Some(&FilterCriterion::Tag("sea".into())));
        assert!(FilterState::default().is_none());
    }
}
