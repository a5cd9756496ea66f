use super::*;
use serde_json::json;

static WIDGET: ResourceDescriptor = ResourceDescriptor {
    name: "test_widget",
    endpoint: "widgets",
    shape: Shape::Object,
    fields: &[
        Field::required("name", FieldType::String),
        Field::optional("forks", FieldType::Int, DefaultValue::Int(0)),
        Field::optional("enabled", FieldType::Bool, DefaultValue::Bool(true)),
        Field::optional("inventory_id", FieldType::IdString, DefaultValue::Str(""))
            .remote("inventory"),
        Field::optional("secret", FieldType::String, DefaultValue::Str("")).sensitive(),
        Field::computed("created", FieldType::String),
    ],
};

static VAULT: ResourceDescriptor = ResourceDescriptor {
    name: "test_vault",
    endpoint: "vaults",
    shape: Shape::Object,
    fields: &[
        Field::required("name", FieldType::String),
        Field::fixed("kind_id", FieldType::Int, DefaultValue::Int(3)).remote("kind"),
        Field::optional("url", FieldType::String, DefaultValue::Str("")).within("inputs"),
        Field::optional("token", FieldType::String, DefaultValue::Str(""))
            .within("inputs")
            .sensitive(),
    ],
};

fn desired(value: Value) -> DesiredState {
    serde_json::from_value(value).unwrap()
}

mod payload {
    use super::*;

    #[test]
    fn fills_unset_optional_fields_with_defaults() {
        let payload = WIDGET.payload(&desired(json!({"name": "x"}))).unwrap();
        assert_eq!(
            json!({
                "name": "x",
                "forks": 0,
                "enabled": true,
                "inventory": null,
                "secret": "",
            }),
            Value::Object(payload),
        );
    }

    #[test]
    fn treats_null_as_unset() {
        let payload = WIDGET
            .payload(&desired(json!({"name": "x", "forks": null})))
            .unwrap();
        assert_eq!(Some(&json!(0)), payload.get("forks"));
    }

    #[test]
    fn uses_remote_names() {
        let payload = WIDGET
            .payload(&desired(json!({"name": "x", "inventory_id": "12"})))
            .unwrap();
        assert_eq!(Some(&json!(12)), payload.get("inventory"));
        assert!(!payload.contains_key("inventory_id"));
    }

    #[test]
    fn skips_computed_fields() {
        let payload = WIDGET
            .payload(&desired(json!({"name": "x", "created": "today"})))
            .unwrap();
        assert!(!payload.contains_key("created"));
    }

    #[test]
    fn requires_required_fields() {
        let error = WIDGET.payload(&desired(json!({"forks": 2}))).unwrap_err();
        assert_eq!("name", error.field);
    }

    #[test]
    fn rejects_wrong_types() {
        let error = WIDGET
            .payload(&desired(json!({"name": "x", "forks": "two"})))
            .unwrap_err();
        assert_eq!("forks", error.field);
        assert!(error.reason.contains("a string"));
    }

    #[test]
    fn rejects_non_numeric_id_strings() {
        let error = WIDGET
            .payload(&desired(json!({"name": "x", "inventory_id": "abc"})))
            .unwrap_err();
        assert_eq!("inventory_id", error.field);
    }

    #[test]
    fn rejects_negative_and_fractional_ids() {
        for id in [json!(-5), json!(1.5)] {
            let error = WIDGET
                .payload(&desired(json!({"name": "x", "inventory_id": id})))
                .unwrap_err();
            assert_eq!("inventory_id", error.field);
            assert!(error.reason.contains("not a numeric ID"), "{}", error.reason);
        }
    }

    #[test]
    fn accepts_integer_ids() {
        let payload = WIDGET
            .payload(&desired(json!({"name": "x", "inventory_id": 12})))
            .unwrap();
        assert_eq!(Some(&json!(12)), payload.get("inventory"));
    }

    #[test]
    fn rejects_unknown_fields() {
        let error = WIDGET
            .payload(&desired(json!({"name": "x", "colour": "red"})))
            .unwrap_err();
        assert_eq!("colour", error.field);
    }
}

mod observe {
    use super::*;

    #[test]
    fn maps_remote_names_back_to_schema_names() {
        let instance = json!({
            "id": 4,
            "name": "x",
            "forks": 2,
            "enabled": false,
            "inventory": 12,
            "secret": "$encrypted$",
            "created": "today",
        });
        let observed = WIDGET.observe(instance.as_object().unwrap());
        assert_eq!(
            json!({
                "name": "x",
                "forks": 2,
                "enabled": false,
                "inventory_id": "12",
                "secret": "$encrypted$",
                "created": "today",
            }),
            serde_json::to_value(observed).unwrap(),
        );
    }

    #[test]
    fn missing_values_take_defaults() {
        let instance = json!({"name": "x", "inventory": null});
        let observed = WIDGET.observe(instance.as_object().unwrap());
        assert_eq!(json!(0), observed["forks"]);
        assert_eq!(json!(true), observed["enabled"]);
        assert_eq!(json!(""), observed["inventory_id"]);
        assert_eq!(Value::Null, observed["created"]);
    }

    #[test]
    fn preserves_schema_order() {
        let instance = json!({"created": "today", "name": "x"});
        let observed = WIDGET.observe(instance.as_object().unwrap());
        let names: Vec<_> = observed.keys().map(String::as_str).collect();
        assert_eq!(
            vec!["name", "forks", "enabled", "inventory_id", "secret", "created"],
            names,
        );
    }
}

#[test]
fn redacted_hides_sensitive_values() {
    let payload = WIDGET
        .payload(&desired(json!({"name": "x", "secret": "hunter2"})))
        .unwrap();
    let redacted = WIDGET.redacted(&payload);
    assert_eq!(Some(&json!(REDACTED)), redacted.get("secret"));
    assert_eq!(Some(&json!("x")), redacted.get("name"));
}

#[test]
fn scheme_follows_shape() {
    assert_eq!(IdentityScheme::Simple, WIDGET.scheme());
    assert!(WIDGET.association().is_none());
}

mod nested_and_fixed {
    use super::*;

    #[test]
    fn payload_nests_fields_and_sends_fixed_values() {
        let payload = VAULT
            .payload(&desired(json!({"name": "v", "url": "https://vault"})))
            .unwrap();
        assert_eq!(
            json!({
                "name": "v",
                "kind": 3,
                "inputs": {"url": "https://vault", "token": ""},
            }),
            Value::Object(payload),
        );
    }

    #[test]
    fn fixed_fields_accept_only_their_value() {
        assert!(VAULT
            .payload(&desired(json!({"name": "v", "kind_id": 3})))
            .is_ok());
        let error = VAULT
            .payload(&desired(json!({"name": "v", "kind_id": 4})))
            .unwrap_err();
        assert_eq!("kind_id", error.field);
    }

    #[test]
    fn observe_reads_nested_values() {
        let instance = json!({
            "name": "v",
            "kind": 3,
            "inputs": {"url": "https://vault", "token": "$encrypted$"},
        });
        let observed = VAULT.observe(instance.as_object().unwrap());
        assert_eq!(json!("https://vault"), observed["url"]);
        assert_eq!(json!("$encrypted$"), observed["token"]);
        assert_eq!(json!(3), observed["kind_id"]);
    }

    #[test]
    fn redacted_hides_nested_secrets() {
        let payload = VAULT
            .payload(&desired(json!({"name": "v", "token": "s3cret"})))
            .unwrap();
        let redacted = VAULT.redacted(&payload);
        assert_eq!(json!(REDACTED), redacted["inputs"]["token"]);
    }
}
