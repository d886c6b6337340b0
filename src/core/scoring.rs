use chrono::{DateTime, Utc};

use crate::core::compatibility::compatibility_score;
use crate::core::distance::distance_km;
use crate::models::{CandidateDonor, FeatureVector, MatchRequest, Urgency};

/// Standard whole-blood deferral interval: a donor is hard-ineligible for
/// 56 days after a donation.
pub const DEFERRAL_DAYS: f64 = 56.0;

/// Availability ramps linearly back to 1.0 over the 30 days following the
/// deferral window (fully available at 86 days).
pub const AVAILABILITY_RAMP_DAYS: f64 = 30.0;

/// Lifetime donation counts are normalized against this cap.
pub const HISTORY_CAP: u32 = 10;

/// Distance score (0-1): closer donors score higher, decaying
/// exponentially and reaching 0 at or beyond the search radius.
#[inline]
pub fn distance_score(distance_km: f64, search_radius_km: f64) -> f64 {
    if distance_km >= search_radius_km {
        return 0.0;
    }

    // Exponential decay: nearby donors score much higher than ones near
    // the edge of the radius.
    (-distance_km / (search_radius_km * 0.5)).exp()
}

/// Fixed urgency mapping: critical→1.0, high→0.75, medium→0.5, low→0.25.
#[inline]
pub fn urgency_score(urgency: Urgency) -> f64 {
    match urgency {
        Urgency::Critical => 1.0,
        Urgency::High => 0.75,
        Urgency::Medium => 0.5,
        Urgency::Low => 0.25,
    }
}

/// Availability score (0-1) from the time since the donor's last donation.
///
/// - never donated → 1.0
/// - within the 56-day deferral window → 0.0 (hard-ineligible)
/// - 56 to 86 days → linear ramp from 0.0 to 1.0
/// - 86 days or more → 1.0
#[inline]
pub fn availability_score(last_donation: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let Some(last) = last_donation else {
        return 1.0;
    };

    let days_since = (now - last).num_seconds() as f64 / 86_400.0;
    if days_since < DEFERRAL_DAYS {
        return 0.0;
    }

    ((days_since - DEFERRAL_DAYS) / AVAILABILITY_RAMP_DAYS).min(1.0)
}

/// Donation-history score: lifetime count normalized by a cap of 10,
/// reflecting donor reliability.
#[inline]
pub fn history_score(donation_count: u32) -> f64 {
    f64::from(donation_count.min(HISTORY_CAP)) / f64::from(HISTORY_CAP)
}

/// Compute the full feature vector for one (request, donor) pair.
///
/// `now` is sampled once per match run by the orchestrator so every
/// candidate in a run is scored against the same clock.
pub fn compute_features(
    request: &MatchRequest,
    donor: &CandidateDonor,
    now: DateTime<Utc>,
    search_radius_km: f64,
) -> (FeatureVector, f64) {
    let km = distance_km(request.location, donor.location);

    let features = FeatureVector {
        compatibility: compatibility_score(request.blood_type, donor.blood_type),
        distance: distance_score(km, search_radius_km),
        urgency: urgency_score(request.urgency),
        availability: availability_score(donor.last_donation, now),
        history: history_score(donor.donation_count),
    };

    (features, km)
}
