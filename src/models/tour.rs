use bson::DateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle of a tour record. Progress is monotonic along the happy path;
/// `Failed` is reachable from every non-terminal state and nothing leaves a
/// terminal state. All writes go through the transition table below so an
/// out-of-order status can never be persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TourStatus {
    Valid,
    Invalid,
    Geocoding,
    GeneratingPois,
    FilteringPois,
    GeneratingTour,
    Completed,
    Failed,
}

impl TourStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TourStatus::Invalid | TourStatus::Completed | TourStatus::Failed
        )
    }

    /// The closed transition table for the pipeline state machine.
    pub fn can_transition_to(&self, next: TourStatus) -> bool {
        use TourStatus::*;

        if self.is_terminal() {
            return false;
        }
        if next == Failed {
            return true;
        }
        matches!(
            (self, next),
            (Valid, Geocoding)
                | (Geocoding, GeneratingPois)
                | (GeneratingPois, FilteringPois)
                | (FilteringPois, GeneratingTour)
                | (GeneratingTour, Completed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TourStatus::Valid => "valid",
            TourStatus::Invalid => "invalid",
            TourStatus::Geocoding => "geocoding",
            TourStatus::GeneratingPois => "generating_pois",
            TourStatus::FilteringPois => "filtering_pois",
            TourStatus::GeneratingTour => "generating_tour",
            TourStatus::Completed => "completed",
            TourStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TourStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub lat: f64,
    pub lng: f64,
}

/// The caller-supplied constraint payload, retained verbatim on the tour so
/// later pipeline stages can reuse the original wording in prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TourConstraints {
    pub max_time: String,
    pub distance: String,
    pub custom: String,
}

/// A point of interest as it moves through the pipeline. One type for every
/// stage: generation fills `poi_title`/`address`, ordering adds `order` and
/// `story_keywords`, enrichment adds the Google place fields, and the
/// narrative stage fills `story`.
///
/// After enrichment, `google_place_id` of `Some("")` means the place lookup
/// was attempted and missed, as opposed to `None` (never attempted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poi {
    pub poi_title: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    pub story_keywords: Option<String>,
    pub story: Option<String>,
    pub google_place_id: Option<String>,
    pub google_maps_name: Option<String>,
    pub gps_location: Option<GeoLocation>,
    pub google_place_img_url: Option<String>,
    pub pin_image_url: Option<String>,
}

impl Poi {
    /// A bare candidate as suggested by the content provider.
    pub fn candidate(poi_title: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            poi_title: poi_title.into(),
            address: address.into(),
            order: None,
            story_keywords: None,
            story: None,
            google_place_id: None,
            google_maps_name: None,
            gps_location: None,
            google_place_img_url: None,
            pin_image_url: None,
        }
    }
}

/// The aggregate tour record, keyed by its transaction id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tour {
    pub id: Uuid,
    pub user_address: String,
    pub user_location: Option<GeoLocation>,
    pub theme: String,
    pub status_code: TourStatus,
    pub max_distance_km: f64,
    pub max_duration_minutes: i64,
    pub constraints: TourConstraints,
    #[serde(default)]
    pub filtered_candidate_poi_list: Vec<Poi>,
    #[serde(default)]
    pub pois: Vec<Poi>,
    pub introduction: Option<String>,
    pub error_message: Option<String>,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}

#[cfg(test)]
mod tests {
    use super::TourStatus::*;

    #[test]
    fn happy_path_transitions_are_allowed() {
        assert!(Valid.can_transition_to(Geocoding));
        assert!(Geocoding.can_transition_to(GeneratingPois));
        assert!(GeneratingPois.can_transition_to(FilteringPois));
        assert!(FilteringPois.can_transition_to(GeneratingTour));
        assert!(GeneratingTour.can_transition_to(Completed));
    }

    #[test]
    fn failed_is_reachable_from_any_non_terminal_state() {
        for state in [Valid, Geocoding, GeneratingPois, FilteringPois, GeneratingTour] {
            assert!(state.can_transition_to(Failed), "{state} -> failed");
        }
    }

    #[test]
    fn terminal_states_reject_everything() {
        for terminal in [Invalid, Completed, Failed] {
            for next in [Valid, Geocoding, GeneratingPois, Completed, Failed] {
                assert!(!terminal.can_transition_to(next), "{terminal} -> {next}");
            }
        }
    }

    #[test]
    fn skipping_a_stage_is_rejected() {
        assert!(!Valid.can_transition_to(GeneratingPois));
        assert!(!Geocoding.can_transition_to(GeneratingTour));
        assert!(!GeneratingPois.can_transition_to(Completed));
        assert!(!Valid.can_transition_to(Valid));
    }
}
