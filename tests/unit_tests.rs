// Unit tests for BloodLink Match

use bloodlink_match::core::compatibility::{
    compatibility_score, compatible_donors_for, compatible_recipients_for, is_compatible,
};
use bloodlink_match::core::distance::{bounding_box, distance_km, is_within_bounding_box};
use bloodlink_match::core::scoring::{
    availability_score, distance_score, history_score, urgency_score,
};
use bloodlink_match::models::{BloodType, GeoPoint, Urgency};
use chrono::{Duration, Utc};

#[test]
fn test_every_type_is_self_compatible() {
    for bt in BloodType::ALL {
        assert!(is_compatible(bt, bt));
    }
}

#[test]
fn test_o_negative_donates_to_everyone() {
    for recipient in BloodType::ALL {
        assert!(is_compatible(recipient, BloodType::ONeg));
    }
}

#[test]
fn test_ab_positive_receives_from_everyone() {
    for donor in BloodType::ALL {
        assert!(is_compatible(BloodType::AbPos, donor));
    }
}

#[test]
fn test_donor_and_recipient_views_agree() {
    for recipient in BloodType::ALL {
        for donor in BloodType::ALL {
            assert_eq!(
                compatible_donors_for(recipient).contains(&donor),
                compatible_recipients_for(donor).contains(&recipient),
            );
        }
    }
}

#[test]
fn test_o_negative_only_receives_o_negative() {
    let donors = compatible_donors_for(BloodType::ONeg);
    assert_eq!(donors.len(), 1);
    assert!(donors.contains(&BloodType::ONeg));
}

#[test]
fn test_compatibility_score_is_binary() {
    for recipient in BloodType::ALL {
        for donor in BloodType::ALL {
            let score = compatibility_score(recipient, donor);
            assert!(score == 0.0 || score == 1.0);
        }
    }
}

#[test]
fn test_urgency_scores_exact() {
    assert_eq!(urgency_score(Urgency::Critical), 1.0);
    assert_eq!(urgency_score(Urgency::High), 0.75);
    assert_eq!(urgency_score(Urgency::Medium), 0.5);
    assert_eq!(urgency_score(Urgency::Low), 0.25);
}

#[test]
fn test_unknown_urgency_defaults_to_medium() {
    assert_eq!(urgency_score(Urgency::parse_lenient("sometime")), 0.5);
}

#[test]
fn test_availability_hard_deferral() {
    let now = Utc::now();
    assert_eq!(availability_score(Some(now - Duration::days(55)), now), 0.0);
    assert_eq!(availability_score(Some(now), now), 0.0);
}

#[test]
fn test_availability_full_when_never_donated() {
    assert_eq!(availability_score(None, Utc::now()), 1.0);
}

#[test]
fn test_availability_ramp_and_cap() {
    let now = Utc::now();

    let at_71 = availability_score(Some(now - Duration::days(71)), now);
    assert!((at_71 - 0.5).abs() < 0.01, "71 days ≈ mid-ramp, got {}", at_71);

    let at_86 = availability_score(Some(now - Duration::days(86)), now);
    assert_eq!(at_86, 1.0);

    let at_200 = availability_score(Some(now - Duration::days(200)), now);
    assert_eq!(at_200, 1.0);
}

#[test]
fn test_history_normalized_by_cap() {
    assert_eq!(history_score(0), 0.0);
    assert_eq!(history_score(3), 0.3);
    assert_eq!(history_score(10), 1.0);
    assert_eq!(history_score(100), 1.0);
}

#[test]
fn test_distance_score_bounds() {
    assert!(distance_score(0.0, 50.0) > 0.99);
    assert_eq!(distance_score(50.0, 50.0), 0.0);
    assert_eq!(distance_score(120.0, 50.0), 0.0);
}

#[test]
fn test_distance_km_known_pairs() {
    let nyc = GeoPoint::new(40.7128, -74.0060);

    assert!(distance_km(nyc, nyc) < 0.01);

    // NYC to LA is approximately 3944 km
    let la = GeoPoint::new(34.0522, -118.2437);
    let d = distance_km(nyc, la);
    assert!((d - 3944.0).abs() < 100.0, "expected ~3944km, got {}", d);
}

#[test]
fn test_bounding_box_contains_nearby_points() {
    let center = GeoPoint::new(40.7128, -74.0060);
    let bbox = bounding_box(center, 10.0);

    assert!(is_within_bounding_box(center, &bbox));
    assert!(is_within_bounding_box(GeoPoint::new(40.71, -74.0), &bbox));
    assert!(!is_within_bounding_box(GeoPoint::new(50.0, -80.0), &bbox));
}
