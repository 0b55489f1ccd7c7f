use oaish_engine::{Catalog, Session, after_call_updates, check_response_field, command_params, load_config, render_response};
use oaish_types::{LayoutKind, ParameterLocation};
use serde_json::{Map, Value, json};

fn document() -> Value {
    json!({
        "openapi": "3.0.3",
        "components": {
            "schemas": {
                "Credentials": {
                    "type": "object",
                    "required": ["username", "password"],
                    "properties": { "username": { "type": "string" }, "password": { "type": "string" } }
                },
                "Token": {
                    "type": "object",
                    "properties": { "access_token": { "type": "string" }, "user": { "$ref": "#/components/schemas/User" } }
                },
                "User": {
                    "type": "object",
                    "properties": { "id": { "type": "string" }, "manager": { "$ref": "#/components/schemas/User" } }
                }
            }
        },
        "paths": {
            "/api/v1/login": {
                "post": {
                    "operationId": "login",
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Credentials" } } }
                    },
                    "responses": {
                        "200": { "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Token" } } } }
                    }
                }
            },
            "/api/v1/sessions/{session_id}/messages": {
                "parameters": [{ "name": "session_id", "in": "path", "required": true, "schema": { "type": "string" } }],
                "post": {
                    "operationId": "send_message",
                    "parameters": [{ "name": "Authorization", "in": "header", "schema": { "type": "string" } }],
                    "requestBody": {
                        "content": {
                            "application/json": {
                                "schema": {
                                    "type": "object",
                                    "required": ["message"],
                                    "properties": {
                                        "message": { "type": "string" },
                                        "user": { "$ref": "#/components/schemas/User" }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    })
}

fn write_config(dir: &std::path::Path) -> std::path::PathBuf {
    let state_path = dir.join("state").join("state.json");
    let config_path = dir.join("oaish.yaml");
    let yaml = format!(
        r#"
name: Chat
base_url: http://localhost:8001
commands:
  /login:
    operationId: login
    mapping:
      username: $1
      password: $2
    default_response_field: access_token
    after_call:
      save_to_state:
        token: json:access_token
        user: json:user
  /say:
    operationId: send_message
    mapping:
      message: $1
      Authorization: Bearer $STATE.token
    formatting:
      title: Sent
      blocks:
        - path: ""
          layout: list
          fields:
            - path: id
              label: Message id
state:
  storage: {}
  defaults:
    session_id: s1
"#,
        state_path.display()
    );
    std::fs::write(&config_path, yaml).expect("write config");
    config_path
}

#[test]
fn login_then_message_uses_saved_state() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = load_config(Some(&write_config(dir.path()))).expect("config");
    let catalog = Catalog::from_document(document());
    assert_eq!(catalog.common_prefix(), "/api/v1/");

    let mut session = Session::from_config(catalog, &config.state).expect("session");
    let login = &config.commands["/login"];
    check_response_field(session.catalog(), login).expect("access_token is documented");

    let params = command_params(&session.assembler(), login, &["ada".to_string(), "pw".to_string()], Map::new());
    let assembly = session.prepare_call(&login.operation_id, params);
    assert_eq!(Value::Object(assembly.payload.body.clone()), json!({ "username": "ada", "password": "pw" }));

    let response = json!({ "access_token": "t0k", "user": { "id": "u1" } });
    assert_eq!(render_response(&response, Some(login)), "\"t0k\"");
    let saved = session.apply_after_call(login, &response).expect("after call");
    assert_eq!(saved, vec!["token".to_string(), "user".to_string()]);

    let say = &config.commands["/say"];
    let params = command_params(&session.assembler(), say, &["hello".to_string()], Map::new());
    let assembly = session.prepare_call(&say.operation_id, params);

    assert_eq!(assembly.autofilled, vec!["session_id".to_string(), "user.id".to_string()]);
    assert_eq!(assembly.payload.path_params["session_id"], json!("s1"));
    assert_eq!(assembly.payload.headers["Authorization"], json!("Bearer t0k"));
    assert_eq!(Value::Object(assembly.payload.body), json!({ "message": "hello", "user": { "id": "u1" } }));

    assert_eq!(
        say.formatting.as_ref().map(|formatting| formatting.blocks[0].layout),
        Some(LayoutKind::List)
    );
    assert_eq!(render_response(&json!({ "id": "m1" }), Some(say)), "Sent\n\nMessage id: m1");
}

#[test]
fn state_survives_a_new_session() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = load_config(Some(&write_config(dir.path()))).expect("config");

    let mut first = Session::from_config(Catalog::from_document(document()), &config.state).expect("session");
    first.state_mut().set("session_id", json!("s2")).expect("set");

    let second = Session::from_config(Catalog::from_document(document()), &config.state).expect("session");
    assert_eq!(second.state().get("session_id"), Some(&json!("s2")));
}

#[test]
fn recursive_response_schemas_flatten_and_validate() {
    let catalog = Catalog::from_document(document());

    let inputs = catalog.params_for_operation("send_message");
    let summary: Vec<_> = inputs
        .iter()
        .map(|param| (param.name.as_str(), param.location, param.param_type.as_str(), param.required))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("session_id", ParameterLocation::Path, "string", true),
            ("Authorization", ParameterLocation::Header, "string", false),
            ("message", ParameterLocation::Body, "string", true),
            ("user.id", ParameterLocation::Body, "string", false),
            ("user.manager", ParameterLocation::Body, "object", false),
        ]
    );

    let extraction = oaish_types::CommandConfig {
        operation_id: "login".into(),
        default_response_field: Some("user.manager.manager.id".into()),
        ..Default::default()
    };
    assert!(check_response_field(&catalog, &extraction).is_ok());
    assert!(after_call_updates(&extraction, &json!({})).is_empty());
}
