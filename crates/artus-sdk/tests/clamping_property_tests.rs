//! 目标角度限位的属性测试

use artus_sdk::prelude::*;
use proptest::prelude::*;

fn product_strategy() -> impl Strategy<Value = (HandProduct, HandSide)> {
    (
        prop_oneof![
            Just(HandProduct::ArtusLite),
            Just(HandProduct::ArtusTalos),
            Just(HandProduct::ArtusScorpion),
        ],
        prop_oneof![Just(HandSide::Left), Just(HandSide::Right)],
    )
}

proptest! {
    #[test]
    fn prop_targets_always_within_limits(
        (product, side) in product_strategy(),
        angles in prop::collection::vec(-500.0f32..500.0, 16),
    ) {
        let mut hand = HandModel::new(product, side);
        let names: Vec<&'static str> = hand.joints().iter().map(|j| j.name).collect();
        let updates: Vec<_> = names
            .iter()
            .zip(&angles)
            .map(|(&name, &angle)| (name, JointTargetUpdate::angle(angle)))
            .collect();

        hand.set_targets(updates);

        for (joint, &angle) in hand.joints().iter().zip(&angles) {
            let requested = angle * joint.rotation_direction as f32;
            let expected = requested.clamp(joint.min_angle, joint.max_angle);
            prop_assert_eq!(joint.target_angle, expected);
        }
    }

    #[test]
    fn prop_non_finite_angles_keep_targets_within_limits(
        (product, side) in product_strategy(),
        angles in prop::collection::vec(
            prop_oneof![
                Just(f32::NAN),
                Just(f32::INFINITY),
                Just(f32::NEG_INFINITY),
                -500.0f32..500.0,
            ],
            16,
        ),
    ) {
        let mut hand = HandModel::new(product, side);
        let names: Vec<&'static str> = hand.joints().iter().map(|j| j.name).collect();
        let updates: Vec<_> = names
            .iter()
            .zip(&angles)
            .map(|(&name, &angle)| (name, JointTargetUpdate::angle(angle)))
            .collect();

        hand.set_targets(updates);

        for joint in hand.joints() {
            prop_assert!(!joint.target_angle.is_nan());
            prop_assert!(joint.target_angle >= joint.min_angle);
            prop_assert!(joint.target_angle <= joint.max_angle);
        }
    }

    #[test]
    fn prop_unknown_joints_leave_model_untouched(name in "[a-z]{3,12}_x", angle in -90.0f32..90.0) {
        let mut hand = HandModel::new(HandProduct::ArtusLite, HandSide::Right);
        let before: Vec<f32> = hand.joints().iter().map(|j| j.target_angle).collect();
        let mask = hand.set_targets([(name.as_str(), JointTargetUpdate::angle(angle))]);
        let after: Vec<f32> = hand.joints().iter().map(|j| j.target_angle).collect();
        prop_assert!(mask.is_empty());
        prop_assert_eq!(before, after);
    }
}
