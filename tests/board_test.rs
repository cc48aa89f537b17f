use checkerboard_calibration::CalibError;
use checkerboard_calibration::board::{Board, BoardConfig};
use checkerboard_calibration::io::{object_from_json, object_to_json};

#[test]
fn test_interior_corner_count() {
    for rows in 3..=20 {
        for cols in 3..=20 {
            let config = BoardConfig::new(rows, cols).unwrap();
            let board = Board::from_config(&config).unwrap();
            assert_eq!(config.interior_corner_count(), (rows - 1) * (cols - 1));
            assert_eq!(board.points_3d.len(), (rows - 1) * (cols - 1));
        }
    }
}

#[test]
fn test_board_point_order() {
    let board = Board::from_config(&BoardConfig::new(7, 9).unwrap()).unwrap();
    let (w, h) = board.pattern_size();
    assert_eq!((w, h), (8, 6));
    for j in 0..h {
        for i in 0..w {
            let p = board.points_3d[j * w + i];
            assert_eq!(p, glam::Vec3::new(i as f32, j as f32, 0.0));
        }
    }
}

#[test]
fn test_out_of_range_dimensions() {
    for (rows, cols) in [(2, 5), (5, 2), (21, 5), (5, 21), (0, 0)] {
        let err = BoardConfig::new(rows, cols).unwrap_err();
        assert!(matches!(err, CalibError::InvalidBoardDimension { .. }));
    }
    let config = BoardConfig { rows: 1, cols: 9 };
    assert!(Board::from_config(&config).is_err());
}

#[test]
fn test_default_board() {
    let config = BoardConfig::default();
    assert_eq!((config.rows, config.cols), (3, 3));
    assert_eq!(config.interior_corner_count(), 4);
}

#[test]
fn test_board_config_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("board.json");
    let config = BoardConfig::new(6, 11).unwrap();
    object_to_json(&path, &config).unwrap();
    let loaded: BoardConfig = object_from_json(&path).unwrap();
    assert_eq!(loaded, config);
}
