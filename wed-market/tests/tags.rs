mod common;

use std::sync::atomic::Ordering;

use serde_json::json;
use wed_docs::{DocumentStore, Query};
use wed_market::{
    Bounds, Click, ClickResult, LoadOutcome, MarketError, PendingMarker, TagPhase, UploadState,
};

use common::{image, user, Harness};

const BOX: Bounds = Bounds {
    left: 100.0,
    top: 50.0,
    width: 640.0,
    height: 480.0,
};

fn seed_tag(h: &Harness, id: &str, image_id: &str, description: &str) {
    h.docs.inner.insert_raw(
        "tags",
        id,
        json!({
            "x": 1.0,
            "y": 2.0,
            "description": description,
            "userId": "u1",
            "imageId": image_id,
        }),
    );
}

async fn uploaded(h: &Harness, names: &[&str]) -> Vec<String> {
    let ids = h.stage(names.iter().enumerate().map(|(i, n)| image(n, i as i64)).collect());
    for id in &ids {
        h.sync.upload(&user(), id).await.unwrap();
    }
    ids
}

#[tokio::test]
async fn selecting_loads_only_this_users_tags_for_the_image() {
    let h = Harness::new();
    let ids = uploaded(&h, &["a.jpg", "b.jpg"]).await;
    seed_tag(&h, "t1", &ids[0], "Arch");
    seed_tag(&h, "t2", &ids[1], "Chairs");
    h.docs.inner.insert_raw(
        "tags",
        "t3",
        json!({"x": 0.0, "y": 0.0, "description": "Not mine", "userId": "u2", "imageId": ids[0]}),
    );

    let outcome = h.tags.open(&user(), &ids[0]).await.unwrap();
    assert_eq!(outcome, LoadOutcome::Loaded(1));
    let visible = h.tags.visible_tags();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, "t1");
    assert_eq!(visible[0].description, "Arch");
}

#[tokio::test]
async fn file_mid_upload_cannot_be_selected() {
    let h = Harness::new();
    let ids = h.stage(vec![image("a.jpg", 1)]);
    h.files.lock().get_mut(&ids[0]).unwrap().begin_upload().unwrap();

    let err = h.tags.select(&ids[0]).unwrap_err();
    assert!(matches!(
        err,
        MarketError::NotSelectable { state: UploadState::Uploading, .. }
    ));
    assert_eq!(h.tags.phase(), TagPhase::NoSelection);
}

#[tokio::test]
async fn idle_and_failed_files_can_be_selected() {
    let h = Harness::new();
    let ids = h.stage(vec![image("a.jpg", 1)]);
    assert!(h.tags.select(&ids[0]).is_ok());
    assert!(h.tags.select("missing").is_err());
}

#[tokio::test]
async fn image_click_places_marker_relative_to_box() {
    let h = Harness::new();
    let ids = uploaded(&h, &["a.jpg"]).await;
    h.tags.open(&user(), &ids[0]).await.unwrap();

    let result = h
        .tags
        .click(Click::Image {
            client_x: 160.0,
            client_y: 80.5,
            bounds: BOX,
        })
        .unwrap();
    let marker = PendingMarker { x: 60.0, y: 30.5 };
    assert_eq!(result, ClickResult::Placing(marker));
    assert_eq!(
        h.tags.phase(),
        TagPhase::Placing {
            image_id: ids[0].clone(),
            marker
        }
    );
}

#[tokio::test]
async fn click_outside_the_box_is_ignored() {
    let h = Harness::new();
    let ids = uploaded(&h, &["a.jpg"]).await;
    h.tags.open(&user(), &ids[0]).await.unwrap();
    let inside = Click::Image {
        client_x: 740.0,
        client_y: 530.0,
        bounds: BOX,
    };
    let marker = PendingMarker { x: 640.0, y: 480.0 };
    assert_eq!(h.tags.click(inside).unwrap(), ClickResult::Placing(marker));

    for (client_x, client_y) in [(99.0, 80.0), (741.0, 80.0), (160.0, 49.5), (160.0, 531.0)] {
        let result = h
            .tags
            .click(Click::Image {
                client_x,
                client_y,
                bounds: BOX,
            })
            .unwrap();
        assert_eq!(result, ClickResult::Ignored);
    }
    // the earlier marker is still pending
    assert_eq!(
        h.tags.phase(),
        TagPhase::Placing {
            image_id: ids[0].clone(),
            marker
        }
    );
}

#[tokio::test]
async fn click_without_selection_is_rejected() {
    let h = Harness::new();
    let err = h.tags.click(Click::Marker { index: 0 }).unwrap_err();
    assert!(matches!(err, MarketError::NoSelection));
}

#[tokio::test]
async fn confirm_persists_trimmed_tag() {
    let h = Harness::new();
    let ids = uploaded(&h, &["a.jpg"]).await;
    h.tags.open(&user(), &ids[0]).await.unwrap();
    h.tags
        .click(Click::Image {
            client_x: 110.0,
            client_y: 60.0,
            bounds: BOX,
        })
        .unwrap();

    let tag = h
        .tags
        .confirm(&user(), "  Gold Centrepiece ", "£120")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tag.description, "Gold Centrepiece");
    assert_eq!(tag.price.as_deref(), Some("£120"));
    assert_eq!(tag.image_id, ids[0]);
    assert_eq!((tag.x, tag.y), (10.0, 10.0));

    let stored = h.docs.query("tags", Query::new()).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].data["description"], "Gold Centrepiece");
    assert_eq!(stored[0].data["price"], "£120");
    assert_eq!(stored[0].data["userId"], "u1");

    assert_eq!(h.tags.visible_tags(), vec![tag]);
    assert_eq!(
        h.tags.phase(),
        TagPhase::Selected {
            image_id: ids[0].clone()
        }
    );
}

#[tokio::test]
async fn blank_description_saves_nothing() {
    let h = Harness::new();
    let ids = uploaded(&h, &["a.jpg"]).await;
    h.tags.open(&user(), &ids[0]).await.unwrap();
    h.tags
        .click(Click::Image {
            client_x: 110.0,
            client_y: 60.0,
            bounds: BOX,
        })
        .unwrap();

    assert!(h.tags.confirm(&user(), "   ", "£5").await.unwrap().is_none());
    assert_eq!(h.docs.inner.count("tags"), 0);
    assert!(matches!(h.tags.phase(), TagPhase::Placing { .. }));
}

#[tokio::test]
async fn blank_price_is_stored_as_absent() {
    let h = Harness::new();
    let ids = uploaded(&h, &["a.jpg"]).await;
    h.tags.open(&user(), &ids[0]).await.unwrap();
    h.tags
        .click(Click::Image {
            client_x: 110.0,
            client_y: 60.0,
            bounds: BOX,
        })
        .unwrap();

    let tag = h.tags.confirm(&user(), "Veil", "  ").await.unwrap().unwrap();
    assert!(tag.price.is_none());
    let stored = h.docs.query("tags", Query::new()).await.unwrap();
    assert!(stored[0].data.get("price").is_none());
}

#[tokio::test]
async fn confirm_without_pending_marker_is_noop() {
    let h = Harness::new();
    let ids = uploaded(&h, &["a.jpg"]).await;
    h.tags.open(&user(), &ids[0]).await.unwrap();

    assert!(h.tags.confirm(&user(), "Veil", "").await.unwrap().is_none());
    assert_eq!(h.docs.inner.count("tags"), 0);
}

#[tokio::test]
async fn cancel_discards_pending_marker() {
    let h = Harness::new();
    let ids = uploaded(&h, &["a.jpg"]).await;
    h.tags.open(&user(), &ids[0]).await.unwrap();
    h.tags
        .click(Click::Image {
            client_x: 110.0,
            client_y: 60.0,
            bounds: BOX,
        })
        .unwrap();

    h.tags.cancel();
    assert_eq!(
        h.tags.phase(),
        TagPhase::Selected {
            image_id: ids[0].clone()
        }
    );
    assert_eq!(h.docs.inner.count("tags"), 0);
}

#[tokio::test]
async fn marker_click_discloses_without_placing() {
    let h = Harness::new();
    let ids = uploaded(&h, &["a.jpg"]).await;
    seed_tag(&h, "t1", &ids[0], "Arch");
    h.tags.open(&user(), &ids[0]).await.unwrap();

    match h.tags.click(Click::Marker { index: 0 }).unwrap() {
        ClickResult::Disclosed(tag) => assert_eq!(tag.description, "Arch"),
        other => panic!("unexpected click result {other:?}"),
    }
    assert_eq!(h.tags.click(Click::Marker { index: 9 }).unwrap(), ClickResult::Ignored);
    assert!(matches!(h.tags.phase(), TagPhase::Selected { .. }));
}

#[tokio::test]
async fn reselecting_clears_pending_marker() {
    let h = Harness::new();
    let ids = uploaded(&h, &["a.jpg", "b.jpg"]).await;
    h.tags.open(&user(), &ids[0]).await.unwrap();
    h.tags
        .click(Click::Image {
            client_x: 110.0,
            client_y: 60.0,
            bounds: BOX,
        })
        .unwrap();

    h.tags.select(&ids[1]).unwrap();
    assert_eq!(
        h.tags.phase(),
        TagPhase::Selected {
            image_id: ids[1].clone()
        }
    );
}

#[tokio::test]
async fn stale_fetch_never_overwrites_newer_selection() {
    let h = Harness::new();
    let ids = uploaded(&h, &["a.jpg", "b.jpg"]).await;
    seed_tag(&h, "ta", &ids[0], "From A");
    seed_tag(&h, "tb", &ids[1], "From B");

    // A's fetch hangs until released
    h.docs.gate_image(&ids[0]);
    let ticket_a = h.tags.select(&ids[0]).unwrap();
    let tags = h.tags.clone();
    let slow = tokio::spawn(async move { tags.load_tags(&user(), &ticket_a).await });
    tokio::task::yield_now().await;

    // user moves on to B, which resolves first
    assert_eq!(h.tags.open(&user(), &ids[1]).await.unwrap(), LoadOutcome::Loaded(1));

    h.docs.release();
    assert_eq!(slow.await.unwrap().unwrap(), LoadOutcome::Stale);

    let visible = h.tags.visible_tags();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].description, "From B");
    assert!(h.tags.tags_for(&ids[0]).is_empty());
}

#[tokio::test]
async fn failed_fetch_keeps_prior_tags() {
    let h = Harness::new();
    let ids = uploaded(&h, &["a.jpg"]).await;
    seed_tag(&h, "t1", &ids[0], "Arch");
    h.tags.open(&user(), &ids[0]).await.unwrap();

    h.docs.fail_query.store(true, Ordering::SeqCst);
    let err = h.tags.open(&user(), &ids[0]).await.unwrap_err();
    assert!(matches!(err, MarketError::Fetch { .. }));
    assert_eq!(h.tags.visible_tags().len(), 1);
}

#[tokio::test]
async fn removing_selected_file_closes_viewer() {
    let h = Harness::new();
    let ids = uploaded(&h, &["a.jpg", "b.jpg"]).await;
    h.tags.open(&user(), &ids[0]).await.unwrap();

    h.files.lock().remove(&ids[1]);
    assert!(!h.tags.reconcile());
    assert_eq!(h.tags.selected(), Some(ids[0].clone()));

    h.files.lock().remove(&ids[0]);
    assert!(h.tags.reconcile());
    assert_eq!(h.tags.phase(), TagPhase::NoSelection);
}

#[tokio::test]
async fn tags_survive_reload_under_same_join_key() {
    let h = Harness::new();
    let ids = uploaded(&h, &["a.jpg"]).await;
    h.tags.open(&user(), &ids[0]).await.unwrap();
    h.tags
        .click(Click::Image {
            client_x: 110.0,
            client_y: 60.0,
            bounds: BOX,
        })
        .unwrap();
    h.tags.confirm(&user(), "Arch", "").await.unwrap();

    // session ends, the photo comes back from storage
    h.tags.clear();
    h.files.lock().clear();
    h.sync.reload(&user()).await.unwrap();

    assert_eq!(h.tags.open(&user(), &ids[0]).await.unwrap(), LoadOutcome::Loaded(1));
    assert_eq!(h.tags.visible_tags()[0].description, "Arch");
}
