//! A small notes API used to drive the scenario tests: notes are stored in the write model and
//! their summaries are projected into the read model under the request's correlation scope.

use hyper::{
    body,
    header::{HeaderValue, CONTENT_TYPE},
    service::service_fn,
    Body, Request, Response, StatusCode,
};
use serde_json::{json, Value};
use std::convert::Infallible;
use stepwise::{
    BoxError, CorrelationId, Error, InMemoryReadStore, InMemoryWriteStore, ScenarioContext,
    ServicePipeline, DEFAULT_CORRELATION_HEADER,
};

const SEQUENCE_KEY: &str = "sequence";
const SUMMARIES_KEY: &str = "notes";

#[derive(Debug, Clone, Default)]
pub struct NotesApi {
    write_model: InMemoryWriteStore,
    read_model: InMemoryReadStore,
}

impl NotesApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_model(&self) -> &InMemoryWriteStore {
        &self.write_model
    }

    pub fn read_model(&self) -> &InMemoryReadStore {
        &self.read_model
    }

    /// Builds a scenario context dispatching in-process to this API and sandboxing its stores.
    pub fn context(&self) -> Result<ScenarioContext, Error> {
        let api = self.clone();
        let pipeline = ServicePipeline::new(service_fn(move |request: Request<Body>| {
            let api = api.clone();
            async move { Ok::<_, Infallible>(api.handle(request).await) }
        }));

        ScenarioContext::builder()
            .with_pipeline(pipeline)
            .with_write_model(self.write_model.clone())
            .with_read_model(self.read_model.clone())
            .build()
    }

    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let scope = request
            .headers()
            .get(DEFAULT_CORRELATION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(CorrelationId::new);
        let method = request.method().as_str().to_owned();
        let path = request.uri().path().to_owned();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let result = match (method.as_str(), segments.as_slice()) {
            ("GET", ["health"]) => Ok(json_response(StatusCode::OK, &json!({}))),
            ("GET", ["notes"]) => self.list(scope.as_ref()),
            ("POST", ["notes"]) => self.create(scope.as_ref(), request).await,
            ("GET", ["notes", "count"]) => self.count(scope.as_ref()),
            ("GET", ["notes", id]) => self.show(id),
            ("DELETE", ["notes", id]) => self.delete(scope.as_ref(), id),
            _ => Ok(empty_response(StatusCode::NOT_FOUND)),
        };

        result.unwrap_or_else(|e| {
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &json!({ "error": e.to_string() }),
            )
        })
    }

    fn list(&self, scope: Option<&CorrelationId>) -> Result<Response<Body>, BoxError> {
        Ok(json_response(
            StatusCode::OK,
            &Value::Array(self.summaries(scope)?),
        ))
    }

    fn count(&self, scope: Option<&CorrelationId>) -> Result<Response<Body>, BoxError> {
        let id = scope.map_or("anonymous", CorrelationId::human_readable);
        let count = self.summaries(scope)?.len().to_string();

        Ok(json_response(
            StatusCode::OK,
            &json!({ "id": id, "count": count }),
        ))
    }

    fn show(&self, id: &str) -> Result<Response<Body>, BoxError> {
        Ok(match self.write_model.get(note_key(id))? {
            Some(note) => json_response(StatusCode::OK, &note),
            None => empty_response(StatusCode::NOT_FOUND),
        })
    }

    async fn create(
        &self,
        scope: Option<&CorrelationId>,
        request: Request<Body>,
    ) -> Result<Response<Body>, BoxError> {
        let request_body = body::to_bytes(request.into_body()).await?;
        let payload: Value = match serde_json::from_slice(&request_body) {
            Ok(payload) => payload,
            Err(e) => {
                return Ok(json_response(
                    StatusCode::BAD_REQUEST,
                    &json!({ "error": e.to_string() }),
                ))
            }
        };
        let title = match payload.get("title").and_then(Value::as_str) {
            Some(title) => title.to_owned(),
            None => {
                return Ok(json_response(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    &json!({ "error": "title is required" }),
                ))
            }
        };

        let sequence = self
            .write_model
            .get(SEQUENCE_KEY)?
            .and_then(|value| value.as_u64())
            .unwrap_or(0)
            + 1;
        let id = sequence.to_string();
        let note = json!({
            "id": id,
            "title": title,
            "links": [format!("/notes/{}", id)],
        });
        self.write_model.insert(SEQUENCE_KEY, json!(sequence))?;
        self.write_model.insert(note_key(&id), note.clone())?;

        let mut summaries = self.summaries(scope)?;
        summaries.push(json!({ "id": id, "title": title }));
        self.read_model
            .upsert(scope, SUMMARIES_KEY, Value::Array(summaries))?;

        Ok(json_response(StatusCode::CREATED, &note))
    }

    fn delete(&self, scope: Option<&CorrelationId>, id: &str) -> Result<Response<Body>, BoxError> {
        if self.write_model.remove(note_key(id))?.is_none() {
            return Ok(empty_response(StatusCode::NOT_FOUND));
        }

        let summaries = self
            .summaries(scope)?
            .into_iter()
            .filter(|summary| summary["id"] != id)
            .collect();
        self.read_model
            .upsert(scope, SUMMARIES_KEY, Value::Array(summaries))?;

        Ok(empty_response(StatusCode::NO_CONTENT))
    }

    fn summaries(&self, scope: Option<&CorrelationId>) -> Result<Vec<Value>, BoxError> {
        Ok(self
            .read_model
            .get(scope, SUMMARIES_KEY)?
            .and_then(|value| value.as_array().cloned())
            .unwrap_or_default())
    }
}

fn note_key(id: &str) -> String {
    format!("note:{}", id)
}

fn json_response(status: StatusCode, value: &Value) -> Response<Body> {
    let mut response = Response::new(Body::from(value.to_string()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn empty_response(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use super::NotesApi;
    use stepwise::{scenario_test, Error, Feature, Runner, ScenarioContext, Subject};

    const NOTES_FEATURE: &str = include_str!("../features/notes.feature");

    fn notes_api() -> Result<ScenarioContext, Error> {
        let _ = env_logger::builder().is_test(true).try_init();
        NotesApi::new().context()
    }

    #[test]
    fn notes_feature_passes_and_leaves_no_trace() {
        let _ = env_logger::builder().is_test(true).try_init();
        let api = NotesApi::new();
        let feature = Feature::parse(NOTES_FEATURE).unwrap();

        let report = Runner::new(|| api.context()).run(&feature).unwrap();

        assert!(report.is_success(), "{}", report);
        assert_eq!(report.outcomes.len(), 6);
        assert!(api.write_model().is_empty().unwrap());
        assert!(!api.write_model().in_transaction().unwrap());
        assert_eq!(api.read_model().committed_len().unwrap(), 0);
    }

    #[test]
    fn writes_from_one_scenario_are_invisible_to_the_next() {
        let api = NotesApi::new();
        let mut first = api.context().unwrap();
        let mut second = api.context().unwrap();

        first
            .run(|context| {
                context.i_call_with_body("POST", "/notes", Some(r#"{"title": "a"}"#))?;
                context.the_status_code_should_be(201)
            })
            .unwrap();

        second
            .run(|context| {
                context.i_call("GET", "/notes/1")?;
                context.the_status_code_should_be(404)?;
                context.i_call("GET", "/notes")?;
                context.the_response_should_be("[]")
            })
            .unwrap();
    }

    #[scenario_test(notes_api)]
    fn created_note_matches_its_shape(context: &mut ScenarioContext) -> Result<(), Error> {
        context.i_call_with_body("POST", "/notes", Some(r#"{"title": "Write tests"}"#))?;

        context.the_status_code_should_be(201)?;
        context.the_response_should_be_a_json_like(
            r#"{"id": $$placeholder$$, "links": [$$placeholder$$], "title": "Write tests"}"#,
        )
    }

    #[scenario_test(notes_api)]
    fn placeholder_and_integer_tokens_match_the_count(
        context: &mut ScenarioContext,
    ) -> Result<(), Error> {
        context.i_call_with_body("POST", "/notes", Some(r#"{"title": "one"}"#))?;
        context.i_call("GET", "/notes/count")?;

        context.the_response_should_be_a_json_like(
            r#"{"id": $$placeholder$$, "count": $$integer$$}"#,
        )?;
        let expected = format!(r#"{{"count":"1","id":"{}"}}"#, context.correlation_id());
        context.the_response_should_be(&expected)
    }

    #[scenario_test(notes_api)]
    fn asserting_before_calling_reports_the_missing_response(
        context: &mut ScenarioContext,
    ) -> Result<(), Error> {
        assert!(matches!(
            context.the_status_code_should_be(200),
            Err(Error::NoResponseCaptured)
        ));
        assert!(matches!(
            context.the_response_should_be_empty(),
            Err(Error::NoResponseCaptured)
        ));

        Ok(())
    }

    #[scenario_test(notes_api)]
    fn mismatches_carry_expected_and_actual(context: &mut ScenarioContext) -> Result<(), Error> {
        context.i_call("GET", "/health")?;

        match context.the_response_should_be_a_json_like(r#"{"status": "$$placeholder$$"}"#) {
            Err(Error::AssertionMismatch {
                subject,
                expected,
                actual,
            }) => {
                assert_eq!(subject, Subject::JsonShape);
                assert_eq!(expected, r#"{"status": "$$placeholder$$"}"#);
                assert_eq!(actual, "{}");
            }
            other => panic!("unexpected result: {:?}", other),
        }

        Ok(())
    }

    #[scenario_test(notes_api)]
    #[should_panic(expected = "Scenario failed")]
    fn failing_scenarios_fail_the_test(context: &mut ScenarioContext) -> Result<(), Error> {
        context.i_call("GET", "/missing")?;
        context.the_status_code_should_be(200)
    }
}
