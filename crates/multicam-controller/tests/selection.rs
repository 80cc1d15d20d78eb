use camera_geometry::{Dimension, PhysicalCamera, Rect, TransitionParams};
use multicam_controller::{
    create_controller, BokehResult, ControllerManager, MccConfig, MccCreateData,
    MultiCamController, ResultMetadata, Topology,
};
use proptest::prelude::*;

fn camera(id: u32, focal: f32, smooth: bool) -> PhysicalCamera {
    PhysicalCamera {
        camera_id: id,
        focal_length: focal,
        pixel_pitch: 1.0,
        active_array_size: Dimension::new(4000, 3000),
        sensor_output: Dimension::new(4000, 3000),
        ife_fov: None,
        always_on: false,
        smooth_transition: smooth,
        transition_zoom_ratio_min: 2.5,
        transition_zoom_ratio_max: 6.0,
    }
}

fn triple(tele_smooth: bool) -> MccCreateData {
    MccCreateData {
        logical_camera_id: 1,
        topology: Topology::Sat,
        primary_camera_id: 0,
        cameras: vec![
            camera(0, 4.0, true),
            camera(1, 2.0, true),
            camera(2, 12.0, tele_smooth),
        ],
        streams: Vec::new(),
        fusion_enabled: true,
    }
}

fn crop_for_zoom(zoom: f32) -> Rect {
    let width = (4000.0 / zoom).round() as i32;
    let height = (3000.0 / zoom).round() as i32;
    Rect::new((4000 - width) / 2, (3000 - height) / 2, width, height)
}

#[test]
fn dual_camera_example_scenario() {
    let data = MccCreateData {
        logical_camera_id: 5,
        topology: Topology::Sat,
        primary_camera_id: 0,
        cameras: vec![camera(0, 4.0, true), camera(1, 8.0, true)],
        streams: Vec::new(),
        fusion_enabled: true,
    };
    let config = MccConfig {
        transition: TransitionParams::narrow_overlap(),
        ..Default::default()
    };
    let mcc = create_controller(&data, config).unwrap();

    mcc.update_results(Some(&crop_for_zoom(1.5)));
    let result = mcc.result(None, 0);
    assert_eq!(result.master_camera_id, 0);
    assert_eq!(result.is_active(0), Some(true));
    assert_eq!(result.is_active(1), Some(false));

    mcc.update_results(Some(&crop_for_zoom(2.5)));
    let result = mcc.result(None, 0);
    assert_eq!(result.master_camera_id, 1);
    assert_eq!(result.is_active(0), Some(false));
    assert_eq!(result.is_active(1), Some(true));
}

#[test]
fn manager_round_trip() {
    let manager = ControllerManager::new(MccConfig::default());
    let mcc = manager.get_controller(&triple(true)).unwrap();
    assert_eq!(mcc.logical_camera_id(), 1);
    assert!((mcc.max_digital_zoom() - 8.0).abs() < 0.001);
    assert!(manager.destroy_controller(1));
}

#[test]
fn bokeh_feedback_drives_rtb_master() {
    let rtb_camera = |id: u32, focal: f32, ratio_min: f32| PhysicalCamera {
        transition_zoom_ratio_min: ratio_min,
        ..camera(id, focal, true)
    };
    let data = MccCreateData {
        logical_camera_id: 2,
        topology: Topology::Rtb,
        primary_camera_id: 0,
        cameras: vec![
            rtb_camera(0, 4.0, 1.0),
            rtb_camera(1, 12.0, 3.0),
            rtb_camera(2, 2.0, 0.5),
        ],
        streams: Vec::new(),
        fusion_enabled: true,
    };
    let mcc = create_controller(&data, MccConfig::default()).unwrap();

    // 1x pairs the ultra-wide with the wide
    let result = mcc.result(None, 0);
    assert_eq!(result.master_camera_id, 0);
    assert_eq!(result.active_map, 0b101);

    mcc.process_result_metadata(&ResultMetadata::Bokeh(BokehResult {
        master_camera_id: 0,
        recommended_master_camera_id: 1,
        active_map: 0b001,
    }));
    let result = mcc.result(None, 0);
    assert_eq!(result.master_camera_id, 1);
    assert_eq!(result.is_active(1), Some(true));
    assert_eq!(result.active_map, 0b011);

    mcc.process_result_metadata(&ResultMetadata::Bokeh(BokehResult {
        master_camera_id: 5,
        recommended_master_camera_id: 1,
        active_map: 0b100,
    }));
    assert_eq!(mcc.result(None, 0), result);
}

proptest! {
    #[test]
    fn master_selection_is_deterministic(zoom in 1.0f32..7.9) {
        let a = create_controller(&triple(true), MccConfig::default()).unwrap();
        let b = create_controller(&triple(true), MccConfig::default()).unwrap();
        let crop = crop_for_zoom(zoom);
        a.update_results(Some(&crop));
        b.update_results(Some(&crop));

        let ra = a.result(None, 0);
        let rb = b.result(None, 0);
        prop_assert_eq!(&ra, &rb);
        prop_assert_eq!(ra.is_active(ra.master_camera_id), Some(true));
        prop_assert!(ra.num_active() <= 2);
        prop_assert_eq!(ra.active_map.count_ones() as usize, ra.num_active());
    }

    #[test]
    fn snapshot_mask_only_adds_cameras(zoom in 1.0f32..7.9, mask in 0u32..8) {
        let mcc = create_controller(&triple(true), MccConfig::default()).unwrap();
        mcc.update_results(Some(&crop_for_zoom(zoom)));
        let before = mcc.result(None, 0).active_map;
        let after = mcc.result(None, mask).active_map;
        prop_assert_eq!(after, before | mask);
    }

    #[test]
    fn hard_cut_result_follows_geometry(zoom in 1.0f32..5.9) {
        let mcc = create_controller(&triple(false), MccConfig::default()).unwrap();
        let crop = crop_for_zoom(zoom);
        let result = mcc.result(Some(&crop), 0);

        let expected = if zoom >= 2.5 { 2 } else { 0 };
        let actual_zoom = 4000.0 / crop.width as f32;
        if (actual_zoom - 2.5).abs() > 0.01 {
            prop_assert_eq!(result.master_camera_id, expected);
        }
    }
}
