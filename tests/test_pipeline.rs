use approx::assert_relative_eq;
use chrono::{TimeZone, Utc};
use geo::{polygon, MultiPolygon};
use landzone::{
    BoundaryFeature, BoundarySource, GridGeometry, LandCoverPipeline, LandError, RasterTile,
    RasterTileCollection, Selection,
};
use ndarray::Array2;

fn boundary(country: &str, admin1: &str, x0: f64, y0: f64, x1: f64, y1: f64) -> BoundaryFeature {
    BoundaryFeature {
        country: country.to_string(),
        admin1: admin1.to_string(),
        geometry: MultiPolygon(vec![polygon![
            (x: x0, y: y0),
            (x: x1, y: y0),
            (x: x1, y: y1),
            (x: x0, y: y1),
            (x: x0, y: y0),
        ]]),
    }
}

fn tile(year: i32, x0: f64, y0: f64, data: Array2<u8>) -> RasterTile {
    RasterTile::new(
        Utc.with_ymd_and_hms(year, 6, 1, 0, 0, 0).single().unwrap(),
        GridGeometry::new(x0, y0, 30.0, data.ncols(), data.nrows()),
        data,
    )
}

/// 4x4 tile: top two rows raw code 1 (Water), bottom two rows raw code 11
/// (Rangeland), pixel centers spanning 15..105 in both axes
fn water_rangeland_tile(year: i32) -> RasterTile {
    let mut data = Array2::from_elem((4, 4), 1u8);
    data.slice_mut(ndarray::s![2.., ..]).fill(11);
    tile(year, 0.0, 120.0, data)
}

#[test]
fn test_area_summary_for_a_fully_covered_jurisdiction() {
    let boundaries = BoundarySource::new(vec![boundary("Testland", "Province", -10.0, -10.0, 130.0, 130.0)]);
    let tiles = RasterTileCollection::new(vec![water_rangeland_tile(2020)]);
    let pipeline = LandCoverPipeline::new(&boundaries, &tiles);

    let result = pipeline
        .analyze(&Selection::new("Testland", "Province", 2020), None)
        .unwrap();
    let breakdown = &result.breakdown;

    // all nine classes, in legend order
    assert_eq!(breakdown.classes.len(), 9);
    let ids: Vec<u8> = breakdown.classes.iter().map(|c| c.class_id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);

    // 8 pixels of 30 m = 8 * 900 m2 = 0.72 ha for Water and Rangeland
    assert_eq!(breakdown.classes[0].class_name, "Water");
    assert_eq!(breakdown.classes[0].pixel_count, 8);
    assert_relative_eq!(breakdown.classes[0].area_hectares, 0.72, epsilon = 1e-12);
    assert_eq!(breakdown.classes[8].class_name, "Rangeland");
    assert_relative_eq!(breakdown.classes[8].area_hectares, 0.72, epsilon = 1e-12);
    for class in &breakdown.classes[1..8] {
        assert_eq!(class.pixel_count, 0);
        assert_eq!(class.area_hectares, 0.0);
    }
    assert_eq!(breakdown.unmapped_pixels, 0);
    assert_eq!(breakdown.total_pixels, 16);
}

#[test]
fn test_area_accounting_is_consistent_with_pixel_counts() {
    let boundaries = BoundarySource::new(vec![boundary("Testland", "Province", 0.0, 0.0, 70.0, 130.0)]);
    let tiles = RasterTileCollection::new(vec![water_rangeland_tile(2020)]);
    let pipeline = LandCoverPipeline::new(&boundaries, &tiles);

    let result = pipeline
        .analyze(&Selection::new("Testland", "Province", 2020), None)
        .unwrap();
    let breakdown = &result.breakdown;

    let class_pixels: u64 = breakdown.classes.iter().map(|c| c.pixel_count).sum();
    assert_eq!(class_pixels + breakdown.unmapped_pixels, breakdown.total_pixels);

    let total_area: f64 = breakdown.classes.iter().map(|c| c.area_hectares).sum::<f64>()
        + breakdown.unmapped_hectares;
    let pixel_area_m2 = breakdown.pixel_scale_m * breakdown.pixel_scale_m;
    assert_relative_eq!(
        total_area * 10_000.0 / pixel_area_m2,
        breakdown.total_pixels as f64,
        epsilon = 1e-9
    );
}

#[test]
fn test_disjoint_jurisdiction_reports_all_zero_areas() {
    let boundaries = BoundarySource::new(vec![boundary("Testland", "Elsewhere", 5_000.0, 5_000.0, 6_000.0, 6_000.0)]);
    let tiles = RasterTileCollection::new(vec![water_rangeland_tile(2020)]);
    let pipeline = LandCoverPipeline::new(&boundaries, &tiles);

    let result = pipeline
        .analyze(&Selection::new("Testland", "Elsewhere", 2020), None)
        .unwrap();
    assert_eq!(result.breakdown.classes.len(), 9);
    assert!(result.breakdown.classes.iter().all(|c| c.pixel_count == 0));
    assert_eq!(result.breakdown.total_pixels, 0);
}

#[test]
fn test_unsupported_year_is_an_error_not_an_empty_result() {
    let boundaries = BoundarySource::new(vec![boundary("Testland", "Province", -10.0, -10.0, 130.0, 130.0)]);
    let tiles = RasterTileCollection::new(vec![water_rangeland_tile(2020)]);
    let pipeline = LandCoverPipeline::new(&boundaries, &tiles);

    match pipeline.analyze(&Selection::new("Testland", "Province", 2016), None) {
        Err(LandError::YearOutOfRange { year, min, max }) => {
            assert_eq!((year, min, max), (2016, 2017, 2022));
        }
        other => panic!("expected YearOutOfRange, got {:?}", other.err()),
    }
}

#[test]
fn test_missing_year_within_range_is_no_tiles() {
    let boundaries = BoundarySource::new(vec![boundary("Testland", "Province", -10.0, -10.0, 130.0, 130.0)]);
    let tiles = RasterTileCollection::new(vec![water_rangeland_tile(2020)]);
    let pipeline = LandCoverPipeline::new(&boundaries, &tiles);

    assert!(matches!(
        pipeline.analyze(&Selection::new("Testland", "Province", 2018), None),
        Err(LandError::NoTilesForYear(2018))
    ));
}

#[test]
fn test_overlapping_tiles_resolve_to_the_later_tile() {
    let boundaries = BoundarySource::new(vec![boundary("Testland", "Province", -10.0, -10.0, 130.0, 130.0)]);

    let water = tile(2020, 0.0, 120.0, Array2::from_elem((4, 4), 1u8));
    let rangeland = tile(2020, 0.0, 120.0, Array2::from_elem((4, 4), 11u8));

    let forward = RasterTileCollection::new(vec![water.clone(), rangeland.clone()]);
    let result = LandCoverPipeline::new(&boundaries, &forward)
        .analyze(&Selection::new("Testland", "Province", 2020), None)
        .unwrap();
    assert_eq!(result.breakdown.classes[0].pixel_count, 0);
    assert_eq!(result.breakdown.classes[8].pixel_count, 16);

    let reversed = RasterTileCollection::new(vec![rangeland, water]);
    let result = LandCoverPipeline::new(&boundaries, &reversed)
        .analyze(&Selection::new("Testland", "Province", 2020), None)
        .unwrap();
    assert_eq!(result.breakdown.classes[0].pixel_count, 16);
    assert_eq!(result.breakdown.classes[8].pixel_count, 0);
}

#[test]
fn test_unknown_raw_codes_count_as_unmapped_never_as_water() {
    let boundaries = BoundarySource::new(vec![boundary("Testland", "Province", -10.0, -10.0, 130.0, 130.0)]);
    let mut data = Array2::from_elem((4, 4), 99u8);
    data[[0, 0]] = 1;
    let tiles = RasterTileCollection::new(vec![tile(2020, 0.0, 120.0, data)]);

    let result = LandCoverPipeline::new(&boundaries, &tiles)
        .analyze(&Selection::new("Testland", "Province", 2020), None)
        .unwrap();
    assert_eq!(result.breakdown.classes[0].pixel_count, 1);
    assert_eq!(result.breakdown.unmapped_pixels, 15);
    assert_eq!(result.breakdown.total_pixels, 16);
}

#[test]
fn test_clipped_raster_is_remapped_and_masked() {
    use landzone::{CategoricalSurface, NODATA};

    // jurisdiction ends at x = 40: column 0 (centers at x = 15) is inside,
    // column 1 (centers at x = 45) falls in the clip window but is masked
    let boundaries = BoundarySource::new(vec![boundary("Testland", "West", -10.0, -10.0, 40.0, 130.0)]);
    let tiles = RasterTileCollection::new(vec![water_rangeland_tile(2020)]);

    let result = LandCoverPipeline::new(&boundaries, &tiles)
        .analyze(&Selection::new("Testland", "West", 2020), None)
        .unwrap();

    let block = result.raster.read_full().unwrap();
    assert_eq!(block.dim(), (4, 2));
    // raw code 11 reads back as canonical Rangeland id 9
    assert_eq!(block[[0, 0]], 1);
    assert_eq!(block[[3, 0]], 9);
    assert!(block.column(1).iter().all(|&v| v == NODATA));
    assert_eq!(result.breakdown.total_pixels, 4);
}

#[test]
fn test_mosaic_of_adjacent_tiles_covers_the_whole_jurisdiction() {
    let boundaries = BoundarySource::new(vec![boundary("Testland", "Province", -10.0, -10.0, 250.0, 130.0)]);
    // two adjacent 4x4 tiles side by side
    let left = tile(2020, 0.0, 120.0, Array2::from_elem((4, 4), 1u8));
    let right = tile(2020, 120.0, 120.0, Array2::from_elem((4, 4), 11u8));
    let tiles = RasterTileCollection::new(vec![left, right]);

    let result = LandCoverPipeline::new(&boundaries, &tiles)
        .analyze(&Selection::new("Testland", "Province", 2020), None)
        .unwrap();
    assert_eq!(result.breakdown.classes[0].pixel_count, 16);
    assert_eq!(result.breakdown.classes[8].pixel_count, 16);
    assert_eq!(result.breakdown.total_pixels, 32);
}
