use serde_json::json;

use crate::common::{TestApp, routes};

fn service_body() -> serde_json::Value {
    json!({
        "title_uz": "Xizmat", "title_ru": "Услуга", "title_en": "Service",
        "description_uz": "Tavsif", "description_ru": "Описание", "description_en": "Description",
    })
}

fn charter_body(active: bool) -> serde_json::Value {
    json!({
        "title_uz": "Nizom", "title_ru": "Устав", "title_en": "Charter",
        "description_uz": "d", "description_ru": "d", "description_en": "d",
        "signatory_uz": "s", "signatory_ru": "s", "signatory_en": "s",
        "active": active,
    })
}

mod create {
    use super::*;

    #[tokio::test]
    async fn create_returns_raw_record() {
        let app = TestApp::spawn().await;
        let res = app.post_json(&routes::create("service"), &service_body()).await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["success"], true);
        assert_eq!(res.body["message"], "Service created successfully");
        assert_eq!(res.body["data"]["title_ru"], "Услуга");
        assert!(res.body["data"]["createdAt"].is_string());
        assert!(res.body["data"]["updatedAt"].is_string());
    }

    #[tokio::test]
    async fn missing_locale_is_rejected_without_side_effects() {
        let app = TestApp::spawn().await;
        let mut body = service_body();
        body.as_object_mut().unwrap().remove("title_en");

        let res = app.post_json(&routes::create("service"), &body).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["success"], false);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert!(res.body["message"].as_str().unwrap().contains("title_en"));

        let list = app.get(&routes::list_raw("service")).await;
        assert_eq!(list.body["services"], json!([]));
    }

    #[tokio::test]
    async fn invalid_choice_is_rejected() {
        let app = TestApp::spawn().await;
        let res = app
            .post_json(&routes::create("project"), &json!({"status": "cancelled"}))
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn unknown_kind_is_not_found() {
        let app = TestApp::spawn().await;
        let res = app.post_json(&routes::create("news"), &json!({})).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod projection {
    use super::*;

    #[tokio::test]
    async fn each_locale_projects_its_own_values() {
        let app = TestApp::spawn().await;
        let id = app.create_json("service", &service_body()).await;

        for (locale, title, description) in [
            ("uz", "Xizmat", "Tavsif"),
            ("ru", "Услуга", "Описание"),
            ("en", "Service", "Description"),
        ] {
            let res = app.get(&routes::list_localized("service", locale)).await;
            assert_eq!(res.status, 200);
            let view = &res.body["services"][0];
            assert_eq!(view["id"], id.as_str());
            assert_eq!(view["title"], title);
            assert_eq!(view["description"], description);
            assert!(view.get("title_uz").is_none());
        }
    }

    #[tokio::test]
    async fn unsupported_locale_falls_back_to_uz() {
        let app = TestApp::spawn().await;
        app.create_json("service", &service_body()).await;

        let uz = app.get(&routes::list_localized("service", "uz")).await;
        for locale in ["fr", "UZ", "xx"] {
            let res = app.get(&routes::list_localized("service", locale)).await;
            assert_eq!(res.status, 200);
            assert_eq!(res.body["services"], uz.body["services"]);
        }
    }

    #[tokio::test]
    async fn single_record_lookup_raw_and_projected() {
        let app = TestApp::spawn().await;
        let id = app.create_json("service", &service_body()).await;

        let raw = app.get(&routes::get("service", &id)).await;
        assert_eq!(raw.status, 200);
        assert_eq!(raw.body["data"]["title_en"], "Service");

        let view = app.get(&routes::get_localized("service", &id, "ru")).await;
        assert_eq!(view.status, 200);
        assert_eq!(view.body["data"]["title"], "Услуга");
    }

    #[tokio::test]
    async fn rekvizit_location_is_viewed_as_title() {
        let app = TestApp::spawn().await;
        app.create_json(
            "rekvizit",
            &json!({
                "location_uz": "Toshkent", "location_ru": "Ташкент", "location_en": "Tashkent",
                "phone_number": "+998 71 000 00 00",
            }),
        )
        .await;

        let res = app.get(&routes::list_localized("rekvizit", "en")).await;
        let view = &res.body["rekvizits"][0];
        assert_eq!(view["title"], "Tashkent");
        assert_eq!(view["phone_number"], "+998 71 000 00 00");
        assert!(view.get("location").is_none());
    }

    #[tokio::test]
    async fn empty_listing_is_success() {
        let app = TestApp::spawn().await;
        let res = app.get(&routes::list_localized("task", "uz")).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["success"], true);
        assert_eq!(res.body["tasks"], json!([]));
    }
}

mod update_delete {
    use super::*;

    #[tokio::test]
    async fn partial_update_keeps_other_fields() {
        let app = TestApp::spawn().await;
        let id = app.create_json("service", &service_body()).await;

        let res = app
            .put_json(&routes::update("service", &id), &json!({"title_en": "Public service"}))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["data"]["title_en"], "Public service");
        assert_eq!(res.body["data"]["title_uz"], "Xizmat");
        assert_eq!(res.body["data"]["description_en"], "Description");
    }

    #[tokio::test]
    async fn update_and_delete_of_unknown_id_are_not_found() {
        let app = TestApp::spawn().await;
        let id = "01936f0e-1234-7abc-8000-000000000001";

        let res = app.put_json(&routes::update("service", id), &json!({})).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");

        let res = app.delete(&routes::delete("service", id)).await;
        assert_eq!(res.status, 404);

        let res = app.delete(&routes::delete("service", "not-a-uuid")).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn ids_are_scoped_to_their_kind() {
        let app = TestApp::spawn().await;
        let id = app.create_json("service", &service_body()).await;

        let res = app.get(&routes::get("task", &id)).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn deleted_record_is_gone() {
        let app = TestApp::spawn().await;
        let id = app.create_json("service", &service_body()).await;

        let res = app.delete(&routes::delete("service", &id)).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["message"], "Service deleted successfully");

        let res = app.get(&routes::get("service", &id)).await;
        assert_eq!(res.status, 404);
    }
}

mod filters {
    use super::*;

    #[tokio::test]
    async fn public_listing_only_shows_active_charters() {
        let app = TestApp::spawn().await;
        let hidden = app.create_json("charter", &charter_body(false)).await;
        let shown = app.create_json("charter", &charter_body(true)).await;

        let res = app.get(&routes::list_localized("charter", "en")).await;
        let charters = res.body["charters"].as_array().unwrap();
        assert_eq!(charters.len(), 1);
        assert_eq!(charters[0]["id"], shown.as_str());
        assert_eq!(charters[0]["active"], true);

        let raw = app.get(&routes::list_raw("charter")).await;
        assert_eq!(raw.body["charters"].as_array().unwrap().len(), 2);

        let res = app
            .put_json(&routes::update("charter", &hidden), &json!({"active": true}))
            .await;
        assert_eq!(res.status, 200);
        let res = app
            .put_json(&routes::update("charter", &shown), &json!({"active": false}))
            .await;
        assert_eq!(res.status, 200);

        let res = app.get(&routes::list_localized("charter", "en")).await;
        let charters = res.body["charters"].as_array().unwrap();
        assert_eq!(charters.len(), 1);
        assert_eq!(charters[0]["id"], hidden.as_str());
    }

    #[tokio::test]
    async fn charter_flag_defaults_to_inactive() {
        let app = TestApp::spawn().await;
        let mut body = charter_body(true);
        body.as_object_mut().unwrap().remove("active");
        let id = app.create_json("charter", &body).await;

        let res = app.get(&routes::get("charter", &id)).await;
        assert_eq!(res.body["data"]["active"], false);
    }

    #[tokio::test]
    async fn projects_filter_by_status() {
        let app = TestApp::spawn().await;
        let ongoing = app
            .create_json("project", &json!({"companyName_en": "A", "status": "ongoing"}))
            .await;
        app.create_json("project", &json!({"companyName_en": "B", "status": "completed"}))
            .await;

        let res = app
            .get(&format!("{}?status=ongoing", routes::list_localized("project", "en")))
            .await;
        let projects = res.body["projects"].as_array().unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0]["id"], ongoing.as_str());
        assert_eq!(projects[0]["companyName"], "A");

        let res = app
            .get(&format!("{}?status=offer", routes::list_raw("project")))
            .await;
        assert_eq!(res.body["projects"], json!([]));
    }

    #[tokio::test]
    async fn unknown_filter_is_rejected() {
        let app = TestApp::spawn().await;
        let res = app
            .get(&format!("{}?companyName=A", routes::list_raw("project")))
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");

        let res = app
            .get(&format!("{}?status=paused", routes::list_raw("project")))
            .await;
        assert_eq!(res.status, 400);
    }
}
