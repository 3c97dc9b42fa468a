// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Connected-component box extraction from detection probability maps

use kordoc_ocr_node::vision::ocr::detection::{
    find_regions, scale_to_original, MapBox, ProbabilityMap, DEFAULT_DETECTION_THRESHOLD,
};

/// Map of `width x height` with the given inclusive rectangles set to 0.9
fn map_with(width: usize, height: usize, rects: &[(usize, usize, usize, usize)]) -> ProbabilityMap {
    let mut data = vec![0.05; width * height];
    for &(x1, y1, x2, y2) in rects {
        for y in y1..=y2 {
            for x in x1..=x2 {
                data[y * width + x] = 0.9;
            }
        }
    }
    ProbabilityMap::new(width, height, data)
}

#[test]
fn test_two_disjoint_regions() {
    let map = map_with(100, 60, &[(10, 10, 19, 19), (50, 30, 59, 39)]);
    let boxes = find_regions(&map, DEFAULT_DETECTION_THRESHOLD);

    assert_eq!(
        boxes,
        vec![
            MapBox { min_x: 7, min_y: 7, max_x: 22, max_y: 22 },
            MapBox { min_x: 47, min_y: 27, max_x: 62, max_y: 42 },
        ]
    );
}

#[test]
fn test_regions_clamped_to_map_edges() {
    let map = map_with(40, 30, &[(0, 0, 9, 9), (30, 20, 39, 29)]);
    let boxes = find_regions(&map, DEFAULT_DETECTION_THRESHOLD);

    assert_eq!(boxes.len(), 2);
    assert_eq!((boxes[0].min_x, boxes[0].min_y), (0, 0));
    assert_eq!((boxes[1].max_x, boxes[1].max_y), (39, 29));
}

#[test]
fn test_thin_components_discarded() {
    // a 1-pixel line and a 4x4 speck
    let map = map_with(80, 40, &[(5, 5, 70, 5), (20, 20, 23, 23)]);
    assert!(find_regions(&map, DEFAULT_DETECTION_THRESHOLD).is_empty());
}

#[test]
fn test_touching_rectangles_merge() {
    let map = map_with(60, 40, &[(5, 5, 20, 15), (21, 10, 40, 25)]);
    let boxes = find_regions(&map, DEFAULT_DETECTION_THRESHOLD);
    assert_eq!(boxes.len(), 1);
}

#[test]
fn test_diagonal_neighbours_are_separate() {
    let map = map_with(60, 60, &[(5, 5, 14, 14), (15, 15, 24, 24)]);
    assert_eq!(find_regions(&map, DEFAULT_DETECTION_THRESHOLD).len(), 2);
}

#[test]
fn test_boxes_scale_back_to_original() {
    let map = map_with(96, 64, &[(10, 10, 29, 19)]);
    let boxes = find_regions(&map, DEFAULT_DETECTION_THRESHOLD);
    assert_eq!(boxes.len(), 1);

    // original was twice the map size
    let region = scale_to_original(&boxes[0], (96, 64), (192, 128)).unwrap();
    assert_eq!((region.x1, region.y1), (14, 14));
    assert_eq!((region.x2, region.y2), (64, 44));
    assert!(region.x1 < region.x2 && region.y1 < region.y2);
}
