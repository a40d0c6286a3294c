//! Integration tests for grid construction and the viewport plumbing.

use field_common::{
    BoundingBox, FieldError, FrameScheduler, GeoGrid, GridHeader, GridRecord, GridValues,
    ManualScheduler, MapView, Viewport, ViewportEvent, ViewportEvents,
};

// ============================================================================
// Grid records
// ============================================================================

const U_RECORD: &str = r#"{
    "header": {"lo1": 120.0, "la1": 40.0, "dx": 0.5, "dy": -0.5, "nx": 3, "ny": 2},
    "data": [1.0, 2.0, 3.0, 4.0, null, 6.0]
}"#;

const V_RECORD: &str = r#"{
    "header": {"lo1": 120.0, "la1": 40.0, "dx": 0.5, "dy": -0.5, "nx": 3, "ny": 2},
    "data": [0.5, 0.5, 0.5, 0.5, 0.5, 0.5]
}"#;

#[test]
fn test_scalar_record_round_trip_header() {
    let record = GridRecord::from_json(U_RECORD).unwrap();
    let grid = GeoGrid::scalar_from_record(&record).unwrap();

    let header = grid.header();
    assert_eq!(header.width, 3);
    assert_eq!(header.height, 2);
    assert_eq!(header.lat_step, -0.5);
    assert!(!grid.is_vector());
    assert_eq!(grid.scalar_cell(1, 1), None);
    assert_eq!(grid.scalar_cell(2, 1), Some(6.0));
}

#[test]
fn test_vector_record_pair() {
    let u = GridRecord::from_json(U_RECORD).unwrap();
    let v = GridRecord::from_json(V_RECORD).unwrap();
    let grid = GeoGrid::vector_from_records(&u, &v).unwrap();

    match grid.values() {
        GridValues::Vector(values) => {
            assert_eq!(values.len(), 6);
            assert_eq!(values[0], Some([1.0, 0.5]));
            assert_eq!(values[4], None);
        }
        GridValues::Scalar(_) => panic!("expected vector values"),
    }
    assert_eq!(
        grid.bounding_box(),
        BoundingBox::new(120.0, 39.5, 121.0, 40.0)
    );
}

#[test]
fn test_missing_v_header_is_invalid_grid() {
    let u = GridRecord::from_json(U_RECORD).unwrap();
    let v = GridRecord::from_json(r#"{"data": [0.5, 0.5, 0.5, 0.5, 0.5, 0.5]}"#).unwrap();
    let err = GeoGrid::vector_from_records(&u, &v).unwrap_err();
    assert!(matches!(err, FieldError::InvalidGrid(_)));
}

#[test]
fn test_malformed_json_is_json_error() {
    let err = GridRecord::from_json("{not json").unwrap_err();
    assert!(matches!(err, FieldError::Json(_)));
}

#[test]
fn test_zero_width_is_invalid() {
    let header = GridHeader::new(0.0, 0.0, 1.0, 1.0, 0, 3);
    assert!(GeoGrid::scalar(header, Vec::new()).is_err());
}

// ============================================================================
// Viewport, events and frames working together
// ============================================================================

#[test]
fn test_map_view_events_reach_subscribers() {
    let events = ViewportEvents::new();
    let moves = events.subscribe(&[ViewportEvent::MoveEnd]);
    let resizes = events.subscribe(&[ViewportEvent::Resize]);

    let mut view = MapView::new([0.0, 0.0], 1.0, (100, 100)).with_events(events.clone());
    view.set_resolution(2.0);
    view.set_size((200, 50));

    assert_eq!(moves.drain(), vec![ViewportEvent::MoveEnd]);
    assert_eq!(resizes.drain(), vec![ViewportEvent::Resize]);
    assert_eq!(view.size(), Some((200, 50)));

    drop(moves);
    drop(resizes);
    assert_eq!(events.listener_count(), 0);
}

#[test]
fn test_fit_view_projects_bbox_corners_inside() {
    let bbox = BoundingBox::new(120.0, 30.0, 130.0, 40.0);
    let view = MapView::fit(&bbox, (100, 100));

    let top_left = view.pixel_from_coordinate([bbox.min_x, bbox.max_y]).unwrap();
    let bottom_right = view.pixel_from_coordinate([bbox.max_x, bbox.min_y]).unwrap();
    assert!((top_left[0] - 0.0).abs() < 1e-9);
    assert!((top_left[1] - 0.0).abs() < 1e-9);
    assert!((bottom_right[0] - 100.0).abs() < 1e-9);
    assert!((bottom_right[1] - 100.0).abs() < 1e-9);
}

#[test]
fn test_manual_scheduler_handles_are_unique() {
    let mut scheduler = ManualScheduler::new();
    let a = scheduler.request_frame();
    let b = scheduler.request_frame();
    assert_ne!(a, b);
    assert_eq!(scheduler.pending().len(), 2);
}
