//! End-to-end endpoint tests against a live listener.
//!
//! Predictors are either the in-memory mock or `sh -c` stubs standing in for
//! the real scoring script.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::net::TcpListener;

use mathscore_api::{build_router, ApiState, FormClient};
use mathscore_core::error::PredictorError;
use mathscore_core::model::{FormDraft, PredictionResult};
use mathscore_core::scale::BuiltinScaler;
use mathscore_core::traits::Predictor;
use mathscore_predictor::{MockPredictor, ProcedureCommand, ScriptPredictor};

async fn spawn_app(predictor: Arc<dyn Predictor>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = ApiState::new(predictor, Arc::new(BuiltinScaler));
    tokio::spawn(async move {
        axum::serve(listener, build_router(state, &[])).await.unwrap();
    });
    format!("http://{addr}")
}

fn stub(script: &str) -> Arc<dyn Predictor> {
    Arc::new(ScriptPredictor::new(
        ProcedureCommand::new("sh").with_args(["-c", script, "predictor"]),
    ))
}

fn scenario_body() -> Value {
    json!({
        "gender": 1,
        "lunch": 1,
        "test_preparation_course": 0,
        "reading_score": 72,
        "writing_score": 74,
        "race_ethnicity_group_E": 0,
        "parental_level_of_education_high_school": 1
    })
}

async fn post(base: &str, route: &str, body: &Value) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(format!("{base}{route}"))
        .json(body)
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

// --- Predict ---

#[tokio::test]
async fn predict_merges_prediction_with_input() {
    let base = spawn_app(stub(r#"echo '{"math_score": 70, "confidence": 0.8}'"#)).await;

    let (status, body) = post(&base, "/predict", &scenario_body()).await;
    assert_eq!(status, 200, "body: {body}");
    assert_eq!(body["math_score_prediction"], 70.0);
    assert_eq!(body["confidence"], 0.8);
    for (key, value) in scenario_body().as_object().unwrap() {
        assert_eq!(&body[key], value, "field {key} should be echoed");
    }
}

#[tokio::test]
async fn predict_missing_field_is_bad_request() {
    let mock = Arc::new(MockPredictor::with_result(PredictionResult::new(70.0)));
    let base = spawn_app(mock.clone()).await;

    let mut body = scenario_body();
    body.as_object_mut().unwrap().remove("writing_score");
    let (status, body) = post(&base, "/predict", &body).await;

    assert_eq!(status, 400);
    assert_eq!(body["error"], "Variables faltantes: writing_score");
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn predict_null_field_is_missing() {
    let base = spawn_app(Arc::new(MockPredictor::with_result(PredictionResult::new(1.0)))).await;

    let mut body = scenario_body();
    body["gender"] = Value::Null;
    body["lunch"] = Value::Null;
    let (status, body) = post(&base, "/predict", &body).await;

    assert_eq!(status, 400);
    assert_eq!(body["error"], "Variables faltantes: gender, lunch");
}

#[tokio::test]
async fn predictor_failure_returns_diagnostic() {
    let base = spawn_app(stub("echo 'model not found' >&2; exit 1")).await;

    let (status, body) = post(&base, "/predict", &scenario_body()).await;
    assert_eq!(status, 500);
    let message = body["error"].as_str().unwrap();
    assert!(message.starts_with("Error en predicción: "), "{message}");
    assert!(message.contains("model not found"), "{message}");
}

#[tokio::test]
async fn non_json_predictor_output_is_generic_error() {
    let base = spawn_app(stub("echo 'Traceback (most recent call last):'")).await;

    let (status, body) = post(&base, "/predict", &scenario_body()).await;
    assert_eq!(status, 500);
    assert_eq!(body["error"], "Error al procesar la predicción");
}

#[tokio::test]
async fn wedged_predictor_times_out() {
    let predictor = ScriptPredictor::new(
        ProcedureCommand::new("sh").with_args(["-c", "sleep 30", "predictor"]),
    )
    .with_timeout(Duration::from_millis(300));
    let base = spawn_app(Arc::new(predictor)).await;

    let (status, body) = post(&base, "/predict", &scenario_body()).await;
    assert_eq!(status, 500);
    assert!(body["error"].as_str().unwrap().contains("timed out"));
}

#[tokio::test]
async fn missing_predictor_binary_is_server_error() {
    let base = spawn_app(Arc::new(ScriptPredictor::new(ProcedureCommand::new(
        "mathscore_missing_python",
    ))))
    .await;

    let (status, body) = post(&base, "/predict", &scenario_body()).await;
    assert_eq!(status, 500);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Error en predicción: failed to launch"));
}

#[tokio::test]
async fn out_of_range_score_is_rejected() {
    let mock = Arc::new(MockPredictor::failing(PredictorError::MalformedOutput(
        "unreachable".into(),
    )));
    let base = spawn_app(mock.clone()).await;

    let mut body = scenario_body();
    body["reading_score"] = json!(101);
    let (status, body) = post(&base, "/predict", &body).await;

    assert_eq!(status, 400);
    assert_eq!(
        body["error"],
        "Valor fuera de rango para reading_score: 101 (0-100)"
    );
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let base = spawn_app(Arc::new(MockPredictor::with_result(PredictionResult::new(1.0)))).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/predict"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Cuerpo de solicitud inválido");
}

#[tokio::test]
async fn model_info_is_forwarded() {
    let base = spawn_app(stub(
        r#"echo '{"math_score": 66.4, "confidence": 0.872, "model_info": {"type": "LinearRegression", "features_used": 7}}'"#,
    ))
    .await;

    let (status, body) = post(&base, "/api/predict", &scenario_body()).await;
    assert_eq!(status, 200);
    assert_eq!(body["model_info"]["features_used"], 7);
}

#[tokio::test]
async fn timed_out_predictor_does_not_outlive_request() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("finished");
    let predictor = ScriptPredictor::new(ProcedureCommand::new("sh").with_args([
        "-c".to_string(),
        format!("sleep 1; touch '{}'; echo '{{\"math_score\": 1}}'", marker.display()),
    ]))
    .with_timeout(Duration::from_millis(200));
    let base = spawn_app(Arc::new(predictor)).await;

    let (status, _) = post(&base, "/predict", &scenario_body()).await;
    assert_eq!(status, 500);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(!marker.exists(), "predictor kept running after its timeout");
}

#[tokio::test]
async fn client_disconnect_does_not_cancel_prediction() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("finished");
    let base = spawn_app(stub(&format!(
        "sleep 1; touch '{}'; echo '{{\"math_score\": 1}}'",
        marker.display()
    )))
    .await;

    let impatient = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let sent = impatient
        .post(format!("{base}/predict"))
        .json(&scenario_body())
        .send()
        .await;
    assert!(sent.is_err(), "request should have given up first");

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(marker.exists(), "predictor was cancelled with the request");
}

// --- Rejections outside the flows ---

#[tokio::test]
async fn oversized_body_is_json_error() {
    let base = spawn_app(Arc::new(MockPredictor::with_result(PredictionResult::new(1.0)))).await;

    let mut body = scenario_body();
    body["padding"] = json!("x".repeat(3 * 1024 * 1024));
    let (status, body) = post(&base, "/predict", &body).await;

    assert_eq!(status, 413);
    assert_eq!(body["error"], "Cuerpo de solicitud demasiado grande");
}

#[tokio::test]
async fn unknown_route_is_json_error() {
    let base = spawn_app(Arc::new(MockPredictor::with_result(PredictionResult::new(1.0)))).await;

    let response = reqwest::get(format!("{base}/nope")).await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Ruta no encontrada");
}

#[tokio::test]
async fn wrong_method_is_json_error() {
    let base = spawn_app(Arc::new(MockPredictor::with_result(PredictionResult::new(1.0)))).await;

    let response = reqwest::get(format!("{base}/predict")).await.unwrap();
    assert_eq!(response.status().as_u16(), 405);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Método no permitido");
}

// --- Scale ---

#[tokio::test]
async fn validate_normalizes_fields() {
    let base = spawn_app(Arc::new(MockPredictor::with_result(PredictionResult::new(1.0)))).await;

    let mut body = scenario_body();
    body["reading_score"] = json!("85.5");
    let (status, body) = post(&base, "/validate", &body).await;

    assert_eq!(status, 200);
    assert_eq!(body["reading_score"], 85.5);
    assert_eq!(body["gender"], 1.0);
    assert_eq!(body["_validado"], true);
}

#[tokio::test]
async fn validate_reports_first_missing_field() {
    let base = spawn_app(Arc::new(MockPredictor::with_result(PredictionResult::new(1.0)))).await;

    let mut body = scenario_body();
    let object = body.as_object_mut().unwrap();
    object.remove("gender");
    object.remove("lunch");
    let (status, body) = post(&base, "/api/escalar", &body).await;

    assert_eq!(status, 400);
    assert_eq!(body["error"], "Variable faltante: lunch");
}

// --- Full flow ---

#[tokio::test]
async fn client_drives_both_stages() {
    let mock = Arc::new(MockPredictor::with_result(
        PredictionResult::new(70.0).with_confidence(0.8),
    ));
    let base = spawn_app(mock.clone()).await;

    let client = FormClient::new(&base).unwrap();
    let draft: FormDraft = serde_json::from_value(scenario_body()).unwrap();
    let response = client.submit(&draft).await.unwrap();

    assert_eq!(response.math_score_prediction, 70.0);
    assert_eq!(response.confidence, Some(0.8));
    assert_eq!(response.fields["_validado"], true);
    assert_eq!(
        mock.last_vector().unwrap().values(),
        &[1.0, 1.0, 0.0, 72.0, 74.0, 0.0, 1.0]
    );

    let health = client.health().await.unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["predictor"], "mock");
    assert_eq!(health["scaler"], "builtin");
}
