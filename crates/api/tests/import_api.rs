//! Integration tests for the `/api/v1/import` endpoints.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::{body_bytes, body_json, get, post_file, post_multipart};
use propline_core::import::schema::EntityKind;
use propline_core::import::store::MemoryStore;
use propline_core::import::template::{self, TemplateFormat};

const PROPERTY_CSV: &str = "property_name,category,state,price,developer_name\n\
                            Golf View,Residential,Goa,1200000,Acme Builders\n\
                            ,Residential,Goa,900000,Acme Builders\n\
                            Golf View,Residential,Goa,1200000,Acme Builders\n";

const LEADS_CSV: &str = "Name,Mobile\n\
                         Asha,9876543210\n\
                         Ravi,9123456789\n\
                         Asha Again,+91 98765 43210\n\
                         Meera,8899776655\n";

fn new_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

#[tokio::test]
async fn property_import_returns_summary() {
    let store = new_store();
    let app = common::build_test_app(Arc::clone(&store));

    let response = post_file(app, "/api/v1/import/properties", "listings.csv", PROPERTY_CSV.as_bytes()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["success"], true);
    assert_eq!(data["insertedCount"], 2);
    assert_eq!(data["skippedCount"], 1);
    assert_eq!(data["totalProcessed"], 3);
    assert_eq!(data["duplicateCount"], 1);
    assert_eq!(data["warnings"][0], "Row 4 is a duplicate of row 2");
    assert_eq!(data["errors"][0]["row"], 3);
    assert_eq!(data["errors"][0]["errors"][0], "property_name is required");

    let creations = &data["configCreations"];
    assert_eq!(creations["totalNewEntries"], 3);
    assert_eq!(creations["summary"]["developer"][0], "Acme Builders");
    assert_eq!(creations["details"][0]["isNew"], true);

    assert_eq!(store.documents("properties").len(), 2);
    assert_eq!(store.documents("developers").len(), 1);
}

#[tokio::test]
async fn lead_import_rejects_repeated_phone() {
    let store = new_store();
    let app = common::build_test_app(Arc::clone(&store));

    let response = post_file(app, "/api/v1/import/leads", "leads.csv", LEADS_CSV.as_bytes()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["total"], 4);
    assert_eq!(data["successful"], 3);
    assert_eq!(data["failed"], 1);
    let error = data["errors"][0].as_str().unwrap();
    assert!(error.starts_with("Row 4:"), "{error}");

    assert_eq!(store.insert_attempts("leads"), 3);
    let phones: Vec<_> = store
        .documents("leads")
        .iter()
        .map(|d| d["phone"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(phones, vec!["+919876543210", "+919123456789", "+918899776655"]);
}

#[tokio::test]
async fn xlsx_upload_is_imported() {
    let store = new_store();
    let app = common::build_test_app(Arc::clone(&store));
    let workbook = template::render(EntityKind::Category, TemplateFormat::Xlsx).unwrap();

    let response = post_file(app, "/api/v1/import/categories", "categories.xlsx", &workbook.bytes).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["insertedCount"], 2);
    assert_eq!(store.documents("categories")[1]["slug"], "villa");
}

#[tokio::test]
async fn storage_failures_are_reported_per_row() {
    let store = new_store();
    store.fail_inserts_into("states");
    let app = common::build_test_app(Arc::clone(&store));

    let response = post_file(app, "/api/v1/import/states", "states.csv", b"name\nGoa\nKerala\n").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["insertedCount"], 0);
    assert_eq!(data["skippedCount"], 2);
    assert_eq!(data["errors"][1]["row"], 3);
    assert!(data["errors"][1]["error"].is_string());
}

// ---------------------------------------------------------------------------
// Request-level failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_file_returns_400() {
    let store = new_store();
    let app = common::build_test_app(Arc::clone(&store));

    let response = post_file(app, "/api/v1/import/leads", "leads.csv", b"name,phone\n").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "EMPTY_FILE");
    assert_eq!(store.insert_attempts("leads"), 0);
}

#[tokio::test]
async fn unknown_kind_returns_400() {
    let app = common::build_test_app(new_store());
    let response = post_file(app, "/api/v1/import/widgets", "w.csv", b"name\nx\n").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn unsupported_extension_returns_400() {
    let app = common::build_test_app(new_store());
    let response = post_file(app, "/api/v1/import/categories", "cats.pdf", b"%PDF").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNSUPPORTED_FILE_TYPE");
}

#[tokio::test]
async fn corrupt_spreadsheet_returns_400() {
    let app = common::build_test_app(new_store());
    let response = post_file(app, "/api/v1/import/categories", "cats.xlsx", b"not a workbook").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "PARSE_ERROR");
}

#[tokio::test]
async fn missing_file_field_returns_400() {
    let app = common::build_test_app(new_store());
    let response = post_multipart(app, "/api/v1/import/categories", "attachment", "c.csv", b"name\nx\n").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
}

// ---------------------------------------------------------------------------
// Validate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn validate_reports_without_persisting() {
    let store = new_store();
    let app = common::build_test_app(Arc::clone(&store));

    let response = post_file(app, "/api/v1/import/properties/validate", "listings.csv", PROPERTY_CSV.as_bytes()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let report = &json["data"];
    assert_eq!(report["total_rows"], 3);
    assert_eq!(report["valid_rows"], 2);
    assert_eq!(report["invalid_rows"], 1);
    assert_eq!(report["duplicate_rows"], 1);
    assert_eq!(report["errors"][0]["field"], "property_name");
    assert_eq!(report["field_accuracy"]["property_name"]["percentage"], 67);

    assert_eq!(store.insert_attempts("properties"), 0);
    assert_eq!(store.insert_attempts("categories"), 0);
}

#[tokio::test]
async fn lead_validation_flags_repeated_and_malformed_phones() {
    let store = new_store();
    let app = common::build_test_app(Arc::clone(&store));
    let csv = b"name,phone\nAsha,9876543210\nAsha Again,+919876543210\nRavi,12345\n";

    let response = post_file(app, "/api/v1/import/leads/validate", "leads.csv", csv).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let report = &json["data"];
    assert_eq!(report["valid_rows"], 2);
    assert_eq!(report["invalid_rows"], 1);
    assert_eq!(report["duplicate_rows"], 1);
    assert_eq!(report["errors"][0]["row"], 4);
    assert_eq!(report["errors"][0]["field"], "phone");
    assert_eq!(report["field_accuracy"]["phone"]["invalid"], 1);
    assert_eq!(store.insert_attempts("leads"), 0);
}

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

#[tokio::test]
async fn csv_template_download() {
    let app = common::build_test_app(new_store());
    let response = get(app, "/api/v1/import/leads/template").await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert!(headers["content-type"].to_str().unwrap().starts_with("text/csv"));
    assert_eq!(
        headers["content-disposition"],
        "attachment; filename=\"leads_template.csv\""
    );

    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.starts_with("name,phone,"));
}

#[tokio::test]
async fn xlsx_template_download() {
    let app = common::build_test_app(new_store());
    let response = get(app, "/api/v1/import/properties/template?format=xlsx").await;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = body_bytes(response).await;
    assert_eq!(&bytes[..2], b"PK");
}

#[tokio::test]
async fn unknown_template_format_returns_400() {
    let app = common::build_test_app(new_store());
    let response = get(app, "/api/v1/import/leads/template?format=pdf").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
