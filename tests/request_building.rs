use std::io::Write;

use drmdeploy::errors::DeployError;
use drmdeploy::template::CompiledTemplateBuilder;
use drmdeploy::template::request::{
    PARAMETERS_CONTENT_VERSION, PARAMETERS_SCHEMA_URL, build_request_body, load_json_document,
    merge_parameter_overrides, requires_credential,
};
use drmdeploy_test_utils::builders::{RequestBodyBuilder, ResourceBuilder};
use serde_json::{Value, json};
use tempfile::NamedTempFile;

#[test]
fn overrides_without_file_generate_a_parameter_document() {
    let doc = merge_parameter_overrides(
        None,
        &[("region".to_string(), json!("west")), ("count".to_string(), json!(2))],
    )
    .unwrap();

    assert_eq!(doc["$schema"], json!(PARAMETERS_SCHEMA_URL));
    assert_eq!(doc["contentVersion"], json!(PARAMETERS_CONTENT_VERSION));
    assert_eq!(doc["parameters"]["region"], json!({ "value": "west" }));
    assert_eq!(doc["parameters"]["count"], json!({ "value": 2 }));
}

#[test]
fn no_file_and_no_overrides_is_an_empty_object() {
    assert_eq!(merge_parameter_overrides(None, &[]).unwrap(), json!({}));
}

#[test]
fn overrides_replace_and_extend_file_parameters() {
    let file = json!({
        "contentVersion": "2.0.0.0",
        "parameters": {
            "region": { "value": "east" },
            "secret": { "reference": { "secretName": "pw" } }
        }
    });

    let doc = merge_parameter_overrides(
        Some(file),
        &[("region".to_string(), json!("west")), ("tier".to_string(), json!("gold"))],
    )
    .unwrap();

    assert_eq!(doc["contentVersion"], json!("2.0.0.0"));
    assert_eq!(doc["parameters"]["region"], json!({ "value": "west" }));
    assert_eq!(doc["parameters"]["tier"], json!({ "value": "gold" }));
    assert!(doc["parameters"]["secret"].get("reference").is_some());
}

#[test]
fn secret_references_require_a_credential() {
    assert!(requires_credential(&json!({
        "parameters": { "pw": { "reference": { "secretName": "pw" } } }
    })));
    assert!(!requires_credential(&json!({
        "parameters": { "region": { "value": "west" } }
    })));
    assert!(!requires_credential(&json!({})));
}

#[test]
fn token_is_injected_into_the_azure_profile() {
    let with = build_request_body(json!({ "resources": [] }), json!({}), Some("tok")).unwrap();
    let parsed: Value = serde_json::from_str(&with).unwrap();
    assert_eq!(parsed["azureProfile"]["keyVaultAccessToken"], json!("tok"));

    let without = build_request_body(json!({ "resources": [] }), json!({}), None).unwrap();
    let parsed: Value = serde_json::from_str(&without).unwrap();
    assert!(parsed.get("azureProfile").is_none());
}

#[test]
fn non_object_documents_are_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[1, 2, 3]").unwrap();

    match load_json_document(file.path()) {
        Err(DeployError::Validation(err)) => {
            assert_eq!(err.code.as_deref(), Some("InvalidDocument"))
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn documents_are_read_from_disk() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{ "resources": [] }}"#).unwrap();
    assert_eq!(load_json_document(file.path()).unwrap(), json!({ "resources": [] }));
}

#[test]
fn built_body_compiles_with_resolved_parameters() {
    let body = RequestBodyBuilder::new()
        .declared_parameter("region", json!("west"))
        .resource(
            ResourceBuilder::new("site")
                .of_type("drm/site")
                .property("region", json!("[parameters('region')]"))
                .property("sku", json!("[parameters('sku')]")),
        )
        .resource(ResourceBuilder::new("dns").depends_on(&["site"]))
        .parameter("sku", json!("premium"))
        .build();

    let template = CompiledTemplateBuilder::new().compile(&body).unwrap();
    assert_eq!(template.len(), 2);

    let site = template.resource("site").unwrap();
    assert_eq!(site.resource_type, "drm/site");
    assert_eq!(site.properties["region"], json!("west"));
    assert_eq!(site.properties["sku"], json!("premium"));
    assert_eq!(template.resource("dns").unwrap().depends_on, vec!["site"]);
}

#[test]
fn duplicate_names_fail_the_build() {
    let body = RequestBodyBuilder::new()
        .resource(ResourceBuilder::new("a"))
        .resource(ResourceBuilder::new("a"))
        .build();

    let err = CompiledTemplateBuilder::new().compile(&body).unwrap_err();
    assert_eq!(err.code.as_deref(), Some("DuplicateResource"));
}

#[test]
fn unknown_dependency_fails_the_build() {
    let body = RequestBodyBuilder::new()
        .resource(ResourceBuilder::new("a").depends_on(&["ghost"]))
        .build();

    let err = CompiledTemplateBuilder::new().compile(&body).unwrap_err();
    assert_eq!(err.code.as_deref(), Some("UnknownDependency"));
    assert!(err.to_string().starts_with("[UnknownDependency]"));
}

#[test]
fn resource_without_type_is_invalid() {
    let body = RequestBodyBuilder::new()
        .raw_resource(json!({ "name": "a" }))
        .build();

    let err = CompiledTemplateBuilder::new().compile(&body).unwrap_err();
    assert_eq!(err.code.as_deref(), Some("InvalidResource"));
}
