use crowdtrack_rs::integration::DetectionBuilder;
use crowdtrack_rs::{
    AppearanceConfig, AppearanceTracker, CentroidConfig, CentroidTracker, Detection,
    MultiObjectTracker, SortConfig, SortTracker,
};

fn boxed(x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
    Detection::new(x1, y1, x2, y2, 0.9)
}

fn pointed(x: i32, y: i32) -> Detection {
    DetectionBuilder::new()
        .xywh(x as f32 - 10.0, y as f32 - 10.0, 20.0, 20.0)
        .confidence(0.9)
        .point(x, y)
        .build()
}

fn assigned_ids(records: &[Detection]) -> Vec<u64> {
    records.iter().filter_map(|r| r.id).collect()
}

#[test]
fn test_sort_confirms_after_min_hits() {
    // Scenario A: a stationary box must not be emitted on its birth frame
    // and must be confirmed with a stable id by the third call.
    let mut tracker = SortTracker::new(SortConfig {
        max_age: 5,
        min_hits: 3,
        ..SortConfig::default()
    });

    let frame0 = tracker.update(vec![boxed(0.0, 0.0, 10.0, 10.0)]).unwrap();
    assert!(assigned_ids(&frame0).is_empty());

    tracker.update(vec![boxed(0.0, 0.0, 10.0, 10.0)]).unwrap();
    let frame2 = tracker.update(vec![boxed(0.0, 0.0, 10.0, 10.0)]).unwrap();

    let ids = assigned_ids(&frame2);
    assert_eq!(ids.len(), 1);
    let confirmed = frame2.iter().find(|r| r.id.is_some()).unwrap();
    let [x1, y1, x2, y2] = confirmed.rect.to_tlbr();
    assert!((x1 - 0.0).abs() < 1.0);
    assert!((y1 - 0.0).abs() < 1.0);
    assert!((x2 - 10.0).abs() < 1.0);
    assert!((y2 - 10.0).abs() < 1.0);

    // the id stays fixed on later frames
    let frame3 = tracker.update(vec![boxed(0.0, 0.0, 10.0, 10.0)]).unwrap();
    assert_eq!(assigned_ids(&frame3), ids);
}

#[test]
fn test_sort_idempotent_identity() {
    let min_hits = 3;
    let mut tracker = SortTracker::new(SortConfig {
        max_age: 5,
        min_hits,
        ..SortConfig::default()
    });

    let mut seen = Vec::new();
    for _ in 0..12 {
        let records = tracker.update(vec![boxed(40.0, 40.0, 80.0, 120.0)]).unwrap();
        seen.push(assigned_ids(&records));
    }

    // exactly one confirmed track from min_hits on, with a stable id
    let stable = &seen[min_hits as usize];
    assert_eq!(stable.len(), 1);
    for ids in &seen[min_hits as usize..] {
        assert_eq!(ids, stable);
    }
}

#[test]
fn test_sort_purges_after_max_age() {
    let max_age = 2;
    let mut tracker = SortTracker::new(SortConfig {
        max_age,
        min_hits: 1,
        ..SortConfig::default()
    });

    tracker.update(vec![boxed(0.0, 0.0, 10.0, 10.0)]).unwrap();
    tracker.update(vec![boxed(0.0, 0.0, 10.0, 10.0)]).unwrap();
    assert_eq!(tracker.tracks().len(), 1);

    for _ in 0..max_age {
        tracker.update(vec![]).unwrap();
        assert_eq!(tracker.tracks().len(), 1);
    }
    tracker.update(vec![]).unwrap();
    assert!(tracker.tracks().is_empty());
}

#[test]
fn test_sort_ids_unique_per_frame_and_never_reused() {
    let mut tracker = SortTracker::new(SortConfig {
        max_age: 1,
        min_hits: 1,
        ..SortConfig::default()
    });

    let far_apart = vec![
        boxed(0.0, 0.0, 20.0, 40.0),
        boxed(100.0, 0.0, 120.0, 40.0),
        boxed(200.0, 0.0, 220.0, 40.0),
    ];

    let mut first_ids = Vec::new();
    for _ in 0..3 {
        let records = tracker.update(far_apart.clone()).unwrap();
        first_ids = assigned_ids(&records);
        let mut deduped = first_ids.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), first_ids.len());
    }
    assert_eq!(first_ids.len(), 3);

    // let every track die, then track a fresh object: no id comes back
    for _ in 0..3 {
        tracker.update(vec![]).unwrap();
    }
    assert!(tracker.tracks().is_empty());

    let mut reborn = Vec::new();
    for _ in 0..3 {
        let records = tracker.update(vec![boxed(0.0, 0.0, 20.0, 40.0)]).unwrap();
        reborn = assigned_ids(&records);
    }
    assert_eq!(reborn.len(), 1);
    assert!(!first_ids.contains(&reborn[0]));
}

#[test]
fn test_sort_two_crossing_objects_keep_distinct_ids() {
    let mut tracker = SortTracker::new(SortConfig {
        max_age: 3,
        min_hits: 1,
        ..SortConfig::default()
    });

    // two boxes sliding horizontally toward each other, never overlapping
    for step in 0..5 {
        let offset = step as f32 * 5.0;
        let records = tracker
            .update(vec![
                boxed(0.0 + offset, 0.0, 30.0 + offset, 60.0),
                boxed(200.0 - offset, 0.0, 230.0 - offset, 60.0),
            ])
            .unwrap();
        if step > 0 {
            let ids = assigned_ids(&records);
            assert_eq!(ids.len(), 2);
            assert_ne!(ids[0], ids[1]);
        }
    }
}

#[test]
fn test_centroid_carries_id_within_spread() {
    // Scenario B
    let mut tracker = CentroidTracker::new(CentroidConfig { max_spread: 50.0 });

    let frame0 = tracker.update(vec![pointed(100, 100)]).unwrap();
    assert_eq!(frame0[0].id, Some(0));

    // distance ~22 < 50: same entity
    let frame1 = tracker.update(vec![pointed(120, 110)]).unwrap();
    assert_eq!(frame1[0].id, Some(0));

    // a second entity appears far away
    let frame2 = tracker
        .update(vec![pointed(121, 111), pointed(500, 500)])
        .unwrap();
    assert_eq!(frame2[0].id, Some(0));
    let new_id = frame2[1].id.unwrap();
    assert_ne!(new_id, 0);
}

#[test]
fn test_centroid_never_bridges_beyond_spread() {
    // Scenario C: consecutive detections farther apart than max_spread
    // must never share an id.
    let mut tracker = CentroidTracker::new(CentroidConfig { max_spread: 50.0 });

    let frame0 = tracker.update(vec![pointed(100, 100)]).unwrap();
    let first = frame0[0].id.unwrap();

    let frame1 = tracker.update(vec![pointed(200, 100)]).unwrap();
    assert_ne!(frame1[0].id.unwrap(), first);
}

#[test]
fn test_centroid_carries_tags_and_misc() {
    let mut tracker = CentroidTracker::default();

    let mut det = pointed(100, 100);
    det.face_id = Some(crowdtrack_rs::IdentityTag::new("alice", 0.8));
    det.misc = Some(serde_json::json!({"camera": 3}));
    tracker.update(vec![det]).unwrap();

    let frame1 = tracker.update(vec![pointed(105, 102)]).unwrap();
    assert_eq!(frame1[0].face_id.as_ref().unwrap().label, "alice");
    assert_eq!(frame1[0].misc, Some(serde_json::json!({"camera": 3})));
}

#[test]
fn test_centroid_detection_without_point_gets_fresh_id() {
    let mut tracker = CentroidTracker::default();

    let frame0 = tracker.update(vec![boxed(0.0, 0.0, 20.0, 20.0)]).unwrap();
    let frame1 = tracker.update(vec![boxed(0.0, 0.0, 20.0, 20.0)]).unwrap();

    // without a representative point there is nothing to associate on
    assert_ne!(frame0[0].id, frame1[0].id);
}

#[test]
fn test_centroid_instances_do_not_share_ids() {
    // two cameras, two trackers: numbering starts at 0 in each
    let mut a = CentroidTracker::default();
    let mut b = CentroidTracker::default();

    let ra = a.update(vec![pointed(10, 10)]).unwrap();
    let rb = b.update(vec![pointed(900, 900)]).unwrap();
    assert_eq!(ra[0].id, Some(0));
    assert_eq!(rb[0].id, Some(0));
}

#[test]
fn test_appearance_tracker_confirms_and_holds_id() {
    let mut tracker = AppearanceTracker::new(AppearanceConfig {
        n_init: 2,
        ..AppearanceConfig::default()
    });

    let det = |x: f32| {
        DetectionBuilder::new()
            .xywh(x, 50.0, 20.0, 40.0)
            .confidence(0.9)
            .feature(vec![1.0, 0.0, 0.0])
            .build()
    };

    let frame0 = tracker.update(vec![det(100.0)]).unwrap();
    assert!(assigned_ids(&frame0).is_empty());

    let frame1 = tracker.update(vec![det(101.0)]).unwrap();
    let ids = assigned_ids(&frame1);
    assert_eq!(ids.len(), 1);

    let frame2 = tracker.update(vec![det(102.0)]).unwrap();
    assert_eq!(assigned_ids(&frame2), ids);
}

#[test]
fn test_appearance_tags_held_back_on_young_tracks() {
    let mut tracker = AppearanceTracker::new(AppearanceConfig {
        n_init: 1,
        ..AppearanceConfig::default()
    });

    let det = |tag: Option<&str>| {
        let mut b = DetectionBuilder::new()
            .xywh(100.0, 50.0, 20.0, 40.0)
            .confidence(0.9)
            .feature(vec![1.0, 0.0]);
        if let Some(label) = tag {
            b = b.deep_id(label, 0.9);
        }
        b.build()
    };

    tracker.update(vec![det(None)]).unwrap();
    // tag observed on frame 2 is absorbed into the track
    tracker.update(vec![det(Some("bob"))]).unwrap();

    // age 3: still held back
    let frame2 = tracker.update(vec![det(None)]).unwrap();
    assert!(frame2[0].deep_id.is_none());

    // age 4 > 3: the stored tag is propagated
    let frame3 = tracker.update(vec![det(None)]).unwrap();
    assert_eq!(frame3[0].deep_id.as_ref().unwrap().label, "bob");
}

#[test]
fn test_appearance_featureless_detection_is_ignored() {
    let mut tracker = AppearanceTracker::new(AppearanceConfig {
        n_init: 1,
        ..AppearanceConfig::default()
    });

    for _ in 0..4 {
        let records = tracker.update(vec![boxed(100.0, 50.0, 120.0, 90.0)]).unwrap();
        assert!(assigned_ids(&records).is_empty());
    }
    assert!(tracker.deep().tracks().is_empty());
}

#[test]
fn test_all_trackers_reject_malformed_input() {
    let bad = || vec![boxed(f32::NAN, 0.0, 10.0, 10.0)];

    let mut centroid = CentroidTracker::default();
    assert!(centroid.update(bad()).is_err());

    let mut sort = SortTracker::default();
    assert!(sort.update(bad()).is_err());

    let mut appearance = AppearanceTracker::default();
    assert!(appearance.update(bad()).is_err());
}

#[test]
fn test_failed_update_commits_nothing() {
    let mut tracker = SortTracker::new(SortConfig {
        max_age: 5,
        min_hits: 1,
        ..SortConfig::default()
    });

    assert!(tracker.update(vec![boxed(f32::NAN, 0.0, 1.0, 1.0)]).is_err());
    assert_eq!(tracker.frame_count(), 0);
    assert!(tracker.tracks().is_empty());
}
