use integration_tests::{monotone_dataset, monotone_model};
use trellis_layers::{
    Bounds, CalibratedModel, Calibrator, CalibratorInit, ConstraintSpec, Feature, Interpolation,
    LatticeInit, ShapeConstraint,
};
use trellis_train::{FiniteDifference, Optimizer, SquaredError, Trainer};

fn round_trip(model: &CalibratedModel) -> CalibratedModel {
    let json = serde_json::to_string(model).unwrap();
    serde_json::from_str(&json).unwrap()
}

#[test]
fn trained_model_round_trips_exactly() {
    let mut model = monotone_model();
    let mut trainer = Trainer::new(Optimizer::adam(0.05).unwrap());
    for _ in 0..3 {
        trainer
            .train_step(
                &mut model,
                &monotone_dataset(16),
                &SquaredError,
                &FiniteDifference::default(),
            )
            .unwrap();
    }

    let restored = round_trip(&model);

    assert_eq!(restored, model);
    for features in [[0.0, 0.0], [3.3, 0.7], [10.0, 1.0], [-5.0, 2.0]] {
        assert_eq!(
            restored.forward(&features).unwrap(),
            model.forward(&features).unwrap()
        );
    }
}

#[test]
fn every_optional_part_survives() {
    let output = Calibrator::with_init(
        vec![0.0, 0.5, 1.0],
        ConstraintSpec::new(&[ShapeConstraint::Increasing, ShapeConstraint::Concave]).unwrap(),
        CalibratorInit::EqualSlopes,
    )
    .unwrap();

    let model = CalibratedModel::builder()
        .feature(
            Feature::new([0.0, 1.0, 4.0], 3)
                .with_constraints(&[
                    ShapeConstraint::Decreasing,
                    ShapeConstraint::Bounded(Bounds::new(0.0, 2.0).unwrap()),
                ])
                .unwrap()
                .with_interpolation(Interpolation::Constant)
                .with_missing_input(-99.0),
        )
        .units(2)
        .lattice_init(LatticeInit::Constant(0.25))
        .lattice_bounds(Bounds::at_least(0.0).unwrap())
        .output_calibrator(output)
        .build()
        .unwrap();

    let restored = round_trip(&model);

    assert_eq!(restored, model);
    assert_eq!(restored.lattice().units(), 2);
    assert!(restored.output_calibrator().is_some());
    assert_eq!(
        restored.calibrators()[0].interpolation(),
        Interpolation::Constant
    );
    assert_eq!(
        restored.forward(&[-99.0]).unwrap(),
        model.forward(&[-99.0]).unwrap()
    );
}

#[test]
fn records_that_break_invariants_are_rejected() {
    let json = serde_json::to_value(monotone_model()).unwrap();

    let mut unsorted = json.clone();
    unsorted["calibrators"][0]["inputs"][1] = serde_json::json!(-1.0);
    assert!(serde_json::from_value::<CalibratedModel>(unsorted).is_err());

    let mut contradictory = json.clone();
    contradictory["calibrators"][0]["constraints"] = serde_json::json!(["increasing", "decreasing"]);
    assert!(serde_json::from_value::<CalibratedModel>(contradictory).is_err());

    let mut truncated = json;
    truncated["calibrators"]
        .as_array_mut()
        .unwrap()
        .pop();
    assert!(serde_json::from_value::<CalibratedModel>(truncated).is_err());
}
