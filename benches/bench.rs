// Criterion benchmarks for BloodLink Match

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use bloodlink_match::core::{Matcher, MatchScorer, NeuralScorer, TrainingConfig};
use bloodlink_match::models::{
    BloodType, CandidateDonor, FeatureVector, GeoPoint, MatchRequest, ScoringWeights,
};

fn create_donor(id: usize, lat: f64, lon: f64) -> CandidateDonor {
    CandidateDonor {
        id: format!("donor-{}", id),
        blood_type: BloodType::ALL[id % 8],
        location: GeoPoint::new(lat, lon),
        last_donation: None,
        donation_count: (id % 12) as u32,
    }
}

fn create_request() -> MatchRequest {
    MatchRequest::new("A+", GeoPoint::new(40.7128, -74.0060), "critical").unwrap()
}

fn bench_model_inference(c: &mut Criterion) {
    let model =
        NeuralScorer::train(&TrainingConfig::default(), ScoringWeights::default()).unwrap();
    let features = FeatureVector {
        compatibility: 1.0,
        distance: 0.8,
        urgency: 1.0,
        availability: 0.6,
        history: 0.4,
    };

    c.bench_function("model_inference", |b| {
        b.iter(|| model.score(black_box(&features)));
    });
}

fn bench_model_training(c: &mut Criterion) {
    let config = TrainingConfig {
        samples: 500,
        epochs: 10,
        ..TrainingConfig::default()
    };

    c.bench_function("model_training_500x10", |b| {
        b.iter(|| NeuralScorer::train(black_box(&config), ScoringWeights::default()).unwrap());
    });
}

fn bench_matching(c: &mut Criterion) {
    let matcher = Matcher::with_default_weights(50.0);
    let request = create_request();

    let mut group = c.benchmark_group("matching");

    for donor_count in [10, 50, 100, 500, 1000].iter() {
        let candidates: Vec<CandidateDonor> = (0..*donor_count)
            .map(|i| {
                let lat_offset = (i as f64 * 0.001) % 0.4;
                let lon_offset = (i as f64 * 0.001) % 0.4;
                create_donor(i as usize, 40.7128 + lat_offset, -74.0060 + lon_offset)
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::new("find_matches", donor_count),
            donor_count,
            |b, _| {
                b.iter(|| {
                    matcher
                        .find_matches(
                            black_box(&request),
                            black_box(candidates.clone()),
                            black_box(20),
                        )
                        .unwrap()
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_model_inference, bench_model_training, bench_matching);
criterion_main!(benches);
