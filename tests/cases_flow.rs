mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, body_to_json, TestApp};
use serde_json::json;
use uuid::Uuid;

fn case_payload(client_id: Uuid, number: &str) -> serde_json::Value {
    json!({
        "number": number,
        "case_number": format!("A40-{number}/2024"),
        "authority": "Arbitration Court of Moscow",
        "client_id": client_id,
        "case_type": "construction_expertise",
        "object_type": "residential_building",
        "object_address": "12 Tverskaya St",
        "start_date": "2024-01-01T00:00:00Z",
        "deadline": "2024-03-01T00:00:00Z",
        "cost": "150000.00",
    })
}

#[tokio::test]
async fn create_defaults_status_and_rejects_bad_dates() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let password = "casepass";
    app.insert_user("cases@firm.test", password, "admin").await?;
    let session = app.login_session("cases@firm.test", password).await?;
    let client_id = app.insert_client("Acme LLC").await?;

    let mut bad_dates = case_payload(client_id, "1");
    bad_dates["start_date"] = json!("2024-01-01T00:00:00Z");
    bad_dates["deadline"] = json!("2023-12-31T00:00:00Z");
    let rejected = app.post_json("/api/cases", &bad_dates, Some(&session)).await?;
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);

    let mut negative_cost = case_payload(client_id, "1");
    negative_cost["cost"] = json!("-1.00");
    let rejected = app
        .post_json("/api/cases", &negative_cost, Some(&session))
        .await?;
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);

    let created = app
        .post_json("/api/cases", &case_payload(client_id, "1"), Some(&session))
        .await?;
    assert_eq!(created.status(), StatusCode::CREATED);
    let case = body_to_json(created.into_body()).await?;
    assert_eq!(case["status"], "in_work");
    assert_eq!(case["number"], "1");

    let duplicate = app
        .post_json("/api/cases", &case_payload(client_id, "1"), Some(&session))
        .await?;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn partial_update_checks_dates_against_merged_record() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let password = "patchpass";
    app.insert_user("patch@firm.test", password, "admin").await?;
    let session = app.login_session("patch@firm.test", password).await?;
    let client_id = app.insert_client("Patch LLC").await?;

    let created = app
        .post_json("/api/cases", &case_payload(client_id, "2"), Some(&session))
        .await?;
    assert_eq!(created.status(), StatusCode::CREATED);
    let case = body_to_json(created.into_body()).await?;
    let case_id = case["id"].as_str().unwrap().to_string();

    // Moving only the deadline behind the stored start date must fail.
    let bad_patch = app
        .patch_json(
            &format!("/api/cases/{case_id}"),
            &json!({"deadline": "2023-06-01T00:00:00Z"}),
            Some(&session),
        )
        .await?;
    assert_eq!(bad_patch.status(), StatusCode::BAD_REQUEST);

    let status_patch = app
        .patch_json(
            &format!("/api/cases/{case_id}"),
            &json!({"status": "debt"}),
            Some(&session),
        )
        .await?;
    assert_eq!(status_patch.status(), StatusCode::OK);
    let patched = body_to_json(status_patch.into_body()).await?;
    assert_eq!(patched["status"], "debt");
    assert_eq!(patched["number"], "2");

    // Explicit null clears a nullable field, omission leaves it alone.
    let remark_patch = app
        .patch_json(
            &format!("/api/cases/{case_id}"),
            &json!({"remarks": "needs follow-up"}),
            Some(&session),
        )
        .await?;
    assert_eq!(remark_patch.status(), StatusCode::OK);

    let cleared = app
        .patch_json(
            &format!("/api/cases/{case_id}"),
            &json!({"remarks": null}),
            Some(&session),
        )
        .await?;
    let cleared = body_to_json(cleared.into_body()).await?;
    assert!(cleared["remarks"].is_null());
    assert_eq!(cleared["status"], "debt");

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn soft_deleted_cases_disappear_from_reads() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let password = "delpass";
    app.insert_user("del@firm.test", password, "admin").await?;
    let session = app.login_session("del@firm.test", password).await?;
    let client_id = app.insert_client("Del LLC").await?;
    let case_id = app.insert_case("3", client_id, "in_work").await?;

    let delete = app.delete(&format!("/api/cases/{case_id}"), Some(&session)).await?;
    assert_eq!(delete.status(), StatusCode::NO_CONTENT);

    let get = app.get(&format!("/api/cases/{case_id}"), Some(&session)).await?;
    assert_eq!(get.status(), StatusCode::NOT_FOUND);

    let patch = app
        .patch_json(
            &format!("/api/cases/{case_id}"),
            &json!({"status": "debt"}),
            Some(&session),
        )
        .await?;
    assert_eq!(patch.status(), StatusCode::NOT_FOUND);

    let list = app.get("/api/cases", Some(&session)).await?;
    let list = body_to_json(list.into_body()).await?;
    assert_eq!(list["pagination"]["total"], 0);
    assert!(list["data"].as_array().unwrap().is_empty());

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn listing_paginates_filters_and_summarizes() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    let password = "listpass";
    app.insert_user("list@firm.test", password, "admin").await?;
    let session = app.login_session("list@firm.test", password).await?;
    let client_id = app.insert_client("List LLC").await?;

    // 40 active, 5 executed; all deadlines lie in the future.
    for i in 0..40 {
        app.insert_case(&format!("A-{i}"), client_id, "in_work").await?;
    }
    for i in 0..5 {
        app.insert_case(&format!("E-{i}"), client_id, "executed").await?;
    }

    let page = app.get("/api/cases?page=1&limit=20", Some(&session)).await?;
    assert_eq!(page.status(), StatusCode::OK);
    let page = body_to_json(page.into_body()).await?;
    assert_eq!(page["pagination"]["total"], 45);
    assert_eq!(page["pagination"]["total_pages"], 3);
    assert_eq!(page["data"].as_array().unwrap().len(), 20);

    let last = app.get("/api/cases?page=3&limit=20", Some(&session)).await?;
    let last = body_to_json(last.into_body()).await?;
    assert_eq!(last["data"].as_array().unwrap().len(), 5);

    // Summary covers all live cases regardless of the status filter.
    let filtered = app.get("/api/cases?status=executed", Some(&session)).await?;
    let filtered = body_to_json(filtered.into_body()).await?;
    assert_eq!(filtered["pagination"]["total"], 5);
    assert_eq!(filtered["summary"]["active"], 40);
    assert_eq!(filtered["summary"]["completed"], 5);
    assert_eq!(filtered["summary"]["overdue"], 0);

    let active = filtered["summary"]["active"].as_i64().unwrap();
    let completed = filtered["summary"]["completed"].as_i64().unwrap();
    assert_eq!(active + completed, 45);

    let bad_status = app.get("/api/cases?status=bogus", Some(&session)).await?;
    assert_eq!(bad_status.status(), StatusCode::BAD_REQUEST);

    let bad_page = app.get("/api/cases?page=0", Some(&session)).await?;
    assert_eq!(bad_page.status(), StatusCode::BAD_REQUEST);

    let bad_limit = app.get("/api/cases?limit=500", Some(&session)).await?;
    assert_eq!(bad_limit.status(), StatusCode::BAD_REQUEST);

    app.cleanup().await?;
    Ok(())
}
