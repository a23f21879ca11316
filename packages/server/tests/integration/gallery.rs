use reqwest::multipart::Form;
use serde_json::json;

use crate::common::{TestApp, TestResponse, file_part, localized_form, routes};

fn relation_form() -> Form {
    localized_form(&[("title", "Hamkorlik"), ("description", "Tashrif")])
}

async fn create_album(app: &TestApp, names: &[&str]) -> TestResponse {
    let mut form = relation_form();
    for name in names {
        form = form.part("photos", file_part(name, name.as_bytes()));
    }
    app.create_form("relation", form).await
}

#[tokio::test]
async fn create_stores_photos_in_upload_order() {
    let app = TestApp::spawn().await;
    let res = create_album(&app, &["a.jpg", "b.jpg", "c.jpg"]).await;
    let photos = res.data_paths("photos");

    assert_eq!(photos.len(), 3);
    for (path, expected) in photos.iter().zip([b"a.jpg", b"b.jpg", b"c.jpg"]) {
        assert_eq!(std::fs::read(app.disk_path(path)).unwrap(), expected);
    }
}

#[tokio::test]
async fn album_without_photos_has_empty_list() {
    let app = TestApp::spawn().await;
    let res = create_album(&app, &[]).await;
    assert_eq!(res.body["data"]["photos"], json!([]));
}

#[tokio::test]
async fn removing_one_photo_keeps_the_rest_in_order() {
    let app = TestApp::spawn().await;
    let res = create_album(&app, &["a.jpg", "b.jpg", "c.jpg"]).await;
    let id = res.id();
    let photos = res.data_paths("photos");
    let (a, b, c) = (&photos[0], &photos[1], &photos[2]);

    let res = app
        .put_form(
            &routes::update("relation", &id),
            Form::new().text("deletedPhotos", b.clone()),
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);

    let stored = app.get(&routes::get("relation", &id)).await;
    assert_eq!(stored.data_paths("photos"), vec![a.clone(), c.clone()]);
    assert!(app.removed(b).await);
    assert!(app.on_disk(a));
    assert!(app.on_disk(c));
}

#[tokio::test]
async fn new_photos_are_appended() {
    let app = TestApp::spawn().await;
    let res = create_album(&app, &["a.jpg", "b.jpg", "c.jpg"]).await;
    let id = res.id();
    let photos = res.data_paths("photos");

    let res = app
        .put_form(
            &routes::update("relation", &id),
            Form::new().part("photos", file_part("d.jpg", b"d")),
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);

    let next = res.data_paths("photos");
    assert_eq!(next.len(), 4);
    assert_eq!(&next[..3], photos.as_slice());
    assert!(app.on_disk(&next[3]));
}

#[tokio::test]
async fn json_removal_list_and_foreign_paths() {
    let app = TestApp::spawn().await;
    let other = create_album(&app, &["x.jpg"]).await;
    let foreign = other.data_paths("photos").remove(0);

    let res = create_album(&app, &["a.jpg", "b.jpg"]).await;
    let id = res.id();
    let photos = res.data_paths("photos");

    let res = app
        .put_json(
            &routes::update("relation", &id),
            &json!({"deletedPhotos": [photos[0], foreign, "/uploads/photos/unknown.jpg"]}),
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.data_paths("photos"), vec![photos[1].clone()]);

    assert!(app.removed(&photos[0]).await);
    assert!(app.on_disk(&foreign), "files of other records must survive");
}

#[tokio::test]
async fn delete_survives_missing_photo() {
    let app = TestApp::spawn().await;
    let res = create_album(&app, &["a.jpg", "b.jpg", "c.jpg"]).await;
    let id = res.id();
    let photos = res.data_paths("photos");
    std::fs::remove_file(app.disk_path(&photos[1])).unwrap();

    let res = app.delete(&routes::delete("relation", &id)).await;
    assert_eq!(res.status, 200, "{}", res.text);

    for path in &photos {
        assert!(app.removed(path).await);
    }
    assert_eq!(app.get(&routes::get("relation", &id)).await.status, 404);
}

#[tokio::test]
async fn concurrent_gallery_edits_keep_every_reference_live() {
    let app = TestApp::spawn().await;
    for _ in 0..10 {
        let res = create_album(&app, &["a.jpg", "b.jpg", "c.jpg"]).await;
        let id = res.id();
        let photos = res.data_paths("photos");
        let b = photos[1].clone();
        let path = routes::update("relation", &id);

        let (removal, append, title) = tokio::join!(
            app.put_form(&path, Form::new().text("deletedPhotos", b.clone())),
            app.put_form(&path, Form::new().part("photos", file_part("d.jpg", b"d"))),
            app.put_form(&path, Form::new().text("title_en", "Visit")),
        );
        for res in [&removal, &append, &title] {
            assert_eq!(res.status, 200, "{}", res.text);
        }

        let stored = app.get(&routes::get("relation", &id)).await;
        let current = stored.data_paths("photos");
        assert_eq!(current.len(), 3);
        assert!(!current.contains(&b));
        assert!(app.removed(&b).await);
        for path in &current {
            assert!(app.on_disk(path), "{path} is referenced but missing");
        }
        assert_eq!(stored.data_str("title_en"), "Visit");
    }
}

#[tokio::test]
async fn relations_list_newest_first() {
    let app = TestApp::spawn().await;
    let first = create_album(&app, &[]).await.id();
    let second = create_album(&app, &[]).await.id();

    let res = app.get(&routes::list_localized("relation", "ru")).await;
    let ids: Vec<&str> = res.body["relations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![second.as_str(), first.as_str()]);
    assert_eq!(res.body["relations"][0]["title"], "Hamkorlik ru");
}
