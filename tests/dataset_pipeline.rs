use std::path::Path;

use blendbox::{ArtifactStore, BatchReport, DatasetBatch, DatasetProcessor, GroupKey, PairRecord};

fn temp_dir(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "blendbox_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn write_png(path: &Path, width: u32, height: u32, color: [u8; 3]) {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb(color));
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
}

fn pair(image: &str, mask: &str) -> PairRecord {
    PairRecord {
        image_path: Some(image.to_string()),
        mask_path: Some(mask.to_string()),
        upload_index: None,
        frame_index: None,
    }
}

fn frame(image: &str, mask: &str, upload: i64, idx: i64) -> PairRecord {
    PairRecord {
        image_path: Some(image.to_string()),
        mask_path: Some(mask.to_string()),
        upload_index: Some(GroupKey::Number(upload)),
        frame_index: Some(idx),
    }
}

fn processor(root: &Path) -> DatasetProcessor {
    DatasetProcessor::new(ArtifactStore::new(root))
}

#[test]
fn corrupt_mask_only_drops_its_own_pair() {
    let tmp = temp_dir("pipeline_isolation");
    std::fs::create_dir_all(&tmp).unwrap();
    for name in ["img0.png", "img1.png", "img2.png"] {
        write_png(&tmp.join(name), 4, 4, [100, 100, 100]);
    }
    write_png(&tmp.join("mask0.png"), 4, 4, [0, 0, 0]);
    std::fs::write(tmp.join("mask1.png"), b"truncated junk").unwrap();
    write_png(&tmp.join("mask2.png"), 4, 4, [0, 0, 0]);

    let batch = DatasetBatch {
        pairs: vec![
            pair("img0.png", "mask0.png"),
            pair("img1.png", "mask1.png"),
            pair("img2.png", "mask2.png"),
        ],
    };

    let report = processor(&tmp).process_dataset("u1", &batch);
    let BatchReport::Completed {
        success,
        images,
        videos,
    } = report
    else {
        panic!("expected a completed report");
    };

    assert!(success);
    assert!(videos.is_empty());
    let originals: Vec<_> = images.iter().map(|i| i.original_path.as_str()).collect();
    assert_eq!(originals, ["img0.png", "img2.png"]);
    for image in &images {
        assert!(tmp.join(&image.output_path).exists());
    }

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn empty_batch_reports_the_fixed_error() {
    let tmp = temp_dir("pipeline_empty");
    std::fs::create_dir_all(&tmp).unwrap();

    let report = processor(&tmp).process_dataset("u1", &DatasetBatch::default());
    let BatchReport::Failed { success, error } = report else {
        panic!("expected a failed report");
    };
    assert!(!success);
    assert_eq!(error, "No data pairs found in dataset");

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn saved_artifact_carries_the_blend() {
    let tmp = temp_dir("pipeline_blend_values");
    std::fs::create_dir_all(&tmp).unwrap();
    write_png(&tmp.join("gray.png"), 4, 4, [128, 128, 128]);
    write_png(&tmp.join("white.png"), 4, 4, [255, 255, 255]);

    let batch = DatasetBatch {
        pairs: vec![pair("gray.png", "white.png")],
    };
    let report = processor(&tmp).process_dataset("u1", &batch);
    let BatchReport::Completed { images, .. } = report else {
        panic!("expected a completed report");
    };
    assert_eq!(images.len(), 1);

    let saved = image::open(tmp.join(&images[0].output_path)).unwrap().to_rgb8();
    assert_eq!(saved.dimensions(), (4, 4));
    assert_eq!(saved.get_pixel(1, 1).0, [191, 191, 191]);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn group_with_no_usable_frames_is_skipped_not_fatal() {
    let tmp = temp_dir("pipeline_dead_group");
    std::fs::create_dir_all(&tmp).unwrap();
    write_png(&tmp.join("ok.png"), 4, 4, [50, 50, 50]);
    write_png(&tmp.join("ok_mask.png"), 4, 4, [0, 0, 0]);

    let batch = DatasetBatch {
        pairs: vec![
            frame("gone0.png", "gone0_mask.png", 5, 0),
            frame("gone1.png", "gone1_mask.png", 5, 1),
            pair("ok.png", "ok_mask.png"),
        ],
    };

    let report = processor(&tmp).process_dataset("u1", &batch);
    let BatchReport::Completed {
        success,
        images,
        videos,
    } = report
    else {
        panic!("expected a completed report");
    };
    assert!(success);
    assert_eq!(images.len(), 1);
    assert!(videos.is_empty());

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn records_missing_fields_are_skipped() {
    let tmp = temp_dir("pipeline_malformed");
    std::fs::create_dir_all(&tmp).unwrap();
    write_png(&tmp.join("ok.png"), 2, 2, [9, 9, 9]);
    write_png(&tmp.join("ok_mask.png"), 2, 2, [0, 0, 0]);

    let batch = DatasetBatch {
        pairs: vec![
            PairRecord {
                image_path: Some("half.png".to_string()),
                ..PairRecord::default()
            },
            PairRecord::default(),
            pair("ok.png", "ok_mask.png"),
        ],
    };

    let report = processor(&tmp).process_dataset("u1", &batch);
    let BatchReport::Completed { images, .. } = report else {
        panic!("expected a completed report");
    };
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].original_path, "ok.png");

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn identical_sources_get_distinct_artifacts() {
    let tmp = temp_dir("pipeline_distinct");
    std::fs::create_dir_all(&tmp).unwrap();
    write_png(&tmp.join("img.png"), 2, 2, [40, 40, 40]);
    write_png(&tmp.join("mask.png"), 2, 2, [0, 0, 0]);

    let batch = DatasetBatch {
        pairs: vec![pair("img.png", "mask.png"), pair("img.png", "mask.png")],
    };
    let report = processor(&tmp).process_dataset("u1", &batch);
    let BatchReport::Completed { images, .. } = report else {
        panic!("expected a completed report");
    };
    assert_eq!(images.len(), 2);
    assert_ne!(images[0].output_path, images[1].output_path);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn report_serializes_with_wire_keys() {
    let tmp = temp_dir("pipeline_wire_keys");
    std::fs::create_dir_all(&tmp).unwrap();
    write_png(&tmp.join("img.png"), 2, 2, [1, 2, 3]);
    write_png(&tmp.join("mask.png"), 2, 2, [0, 0, 0]);

    let batch = DatasetBatch {
        pairs: vec![pair("img.png", "mask.png")],
    };
    let report = processor(&tmp).process_dataset("u1", &batch);
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["success"], true);
    assert_eq!(json["images"][0]["originalPath"], "img.png");
    assert!(
        json["images"][0]["outputPath"]
            .as_str()
            .unwrap()
            .starts_with("inferences/u1/")
    );
    assert!(json["videos"].as_array().unwrap().is_empty());

    std::fs::remove_dir_all(&tmp).ok();
}
