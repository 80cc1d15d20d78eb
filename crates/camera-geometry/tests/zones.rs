use camera_geometry::{
    Dimension, PhysicalCamera, Rect, TransitionParams, TransitionZoneCalculator,
};
use proptest::prelude::*;

fn camera(id: u32, focal: f32, smooth: bool) -> PhysicalCamera {
    PhysicalCamera {
        camera_id: id,
        focal_length: focal,
        pixel_pitch: 1.12,
        active_array_size: Dimension::new(4000, 3000),
        sensor_output: Dimension::new(4000, 3000),
        ife_fov: None,
        always_on: false,
        smooth_transition: smooth,
        transition_zoom_ratio_min: 1.0,
        transition_zoom_ratio_max: 2.0,
    }
}

proptest! {
    #[test]
    fn zones_are_ordered_and_contiguous(
        focals in proptest::collection::btree_set(20u32..120, 2..5),
    ) {
        // distinct focal lengths, all smooth, primary is the widest
        let focals: Vec<f32> = focals.into_iter().map(|f| f as f32 / 10.0).collect();
        let cameras: Vec<PhysicalCamera> = focals
            .iter()
            .enumerate()
            .map(|(i, &f)| camera(i as u32, f, true))
            .collect();

        let params = TransitionParams { max_user_zoom: 100.0, ..Default::default() };
        let table = TransitionZoneCalculator::new(params).build(cameras, 0).unwrap();

        let order = table.fov_order();
        for &idx in order {
            let cam = table.by_index(idx).unwrap();
            prop_assert!(cam.transition_left.transition_ratio < cam.transition_right.transition_ratio);
        }
        for pair in order.windows(2) {
            let wider = table.by_index(pair[0]).unwrap();
            let narrower = table.by_index(pair[1]).unwrap();
            prop_assert_eq!(wider.transition_right, narrower.transition_left);
        }
    }

    #[test]
    fn primary_ratio_is_one(primary in 0u32..3) {
        let cameras = vec![camera(0, 2.5, true), camera(1, 4.0, true), camera(2, 9.0, true)];
        let params = TransitionParams { max_user_zoom: 100.0, ..Default::default() };
        let table = TransitionZoneCalculator::new(params).build(cameras, primary).unwrap();
        prop_assert!((table.primary().adjusted_fov_ratio - 1.0).abs() < 1e-6);
    }

    #[test]
    fn master_selection_is_deterministic(zoom in 0.1f32..12.0) {
        let cameras = vec![camera(0, 2.0, true), camera(1, 4.0, true), camera(2, 12.0, true)];
        let table = TransitionZoneCalculator::new(TransitionParams::default())
            .build(cameras, 1)
            .unwrap();

        let first = table.camera_for_zoom_clamped(zoom, 0.001);
        let second = table.camera_for_zoom_clamped(zoom, 0.001);
        prop_assert_eq!(first, second);

        // at most one zone claims any zoom
        let claims = table
            .fov_order()
            .iter()
            .enumerate()
            .filter(|(pos, &idx)| {
                let last = *pos + 1 == table.fov_order().len();
                table.by_index(idx).unwrap().zone_contains(zoom, last, 0.001)
            })
            .count();
        prop_assert!(claims <= 1);
    }

    #[test]
    fn clamp_outside_rect_stays_in_bounds(
        left in -20_000i32..20_000,
        top in -20_000i32..20_000,
        width in 1i32..10_000,
        height in 1i32..10_000,
    ) {
        let bounds = Dimension::new(4000, 3000);
        let clamped = Rect::new(left, top, width, height).clamp_to(bounds);
        prop_assert!(clamped.left >= 0);
        prop_assert!(clamped.top >= 0);
        prop_assert!(clamped.right() <= 4000);
        prop_assert!(clamped.bottom() <= 3000);
    }
}
