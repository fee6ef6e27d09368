//! Integration test: write archives and read them back.

use grid_archive::{ArchiveConfig, ArchiveError, ArchiveReader, ArchiveWriter, Attributes};
use test_utils::{assert_slice_approx_eq, create_test_grid};

fn attrs(variable: &str) -> Attributes {
    let mut attrs = Attributes::new();
    attrs.insert("variable".to_string(), serde_json::json!(variable));
    attrs.insert("units".to_string(), serde_json::json!("dBZ"));
    attrs
}

#[test]
fn test_patch_archive_full_and_subset_reads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mem_1_REFL_20200501_patches.zarr");

    // 3 hours x 4 patches x 5 x 6
    let shape = [3, 4, 5, 6];
    let data: Vec<f32> = (0..360).map(|i| i as f32).collect();

    let writer = ArchiveWriter::new(ArchiveConfig {
        chunk_size: 4,
        ..ArchiveConfig::uncompressed()
    });
    writer.write_f32(&path, &shape, &data, attrs("REFL")).unwrap();

    let reader = ArchiveReader::open(&path).unwrap();
    assert_eq!(reader.shape(), vec![3, 4, 5, 6]);
    assert_eq!(reader.attribute_str("variable"), Some("REFL"));

    let all = reader.read_f32().unwrap();
    assert_eq!(all.shape(), &[3, 4, 5, 6]);
    assert_eq!(all[[2, 3, 4, 5]], 359.0);

    // hour 1, patch 2
    let patch = reader.read_f32_subset(&[1, 2, 0, 0], &[1, 1, 5, 6]).unwrap();
    let expected: Vec<f32> = (0..30).map(|i| (120 + 60 + i) as f32).collect();
    assert_slice_approx_eq!(patch.iter().copied().collect::<Vec<_>>(), expected, 0.0);
}

#[test]
fn test_compressed_archive_preserves_nan() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("counts.zarr");

    let mut grid = create_test_grid(20, 10);
    grid[7] = f32::NAN;

    ArchiveWriter::new(ArchiveConfig::default())
        .write_f32(&path, &[10, 20], &grid, Attributes::new())
        .unwrap();

    let back = ArchiveReader::open(&path).unwrap().read_f32().unwrap();
    assert_slice_approx_eq!(back.iter().copied().collect::<Vec<_>>(), grid, 0.0);
}

#[test]
fn test_label_archive_int32() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("obs_labels_20200501.zarr");
    let labels = vec![0, 1, 2, 3, 0, 0, 1, 1];

    ArchiveWriter::default()
        .write_i32(&path, &[2, 4], &labels, Attributes::new())
        .unwrap();

    let reader = ArchiveReader::open(&path).unwrap();
    let back = reader.read_i32().unwrap();
    assert_eq!(back.iter().copied().collect::<Vec<_>>(), labels);

    // wrong element type
    assert!(matches!(reader.read_f32(), Err(ArchiveError::Read(_))));
}

#[test]
fn test_rewrite_replaces_archive() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.zarr");
    let writer = ArchiveWriter::new(ArchiveConfig::uncompressed());

    writer.write_f32(&path, &[4, 4], &[1.0; 16], Attributes::new()).unwrap();
    writer.write_f32(&path, &[2, 2], &[2.0; 4], Attributes::new()).unwrap();

    let back = ArchiveReader::open(&path).unwrap().read_f32().unwrap();
    assert_eq!(back.shape(), &[2, 2]);
    assert!(back.iter().all(|&v| v == 2.0));
}

#[test]
fn test_open_missing_and_out_of_bounds() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        ArchiveReader::open(dir.path().join("missing.zarr")),
        Err(ArchiveError::Open { .. })
    ));

    let path = dir.path().join("b.zarr");
    ArchiveWriter::new(ArchiveConfig::uncompressed())
        .write_f32(&path, &[3, 3], &[0.0; 9], Attributes::new())
        .unwrap();
    let reader = ArchiveReader::open(&path).unwrap();
    assert!(reader.read_f32_subset(&[2, 0], &[2, 3]).is_err());
}
