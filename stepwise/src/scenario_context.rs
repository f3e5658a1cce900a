use crate::{
    data::CapturedResponse,
    driver_configuration::DriverConfiguration,
    error::{Error, Subject},
    pattern::{RegexMatcher, StructuralMatcher},
    pipeline::DispatchPipeline,
    request_driver::RequestDriver,
    sandbox::{ReadModelTransactions, Sandbox, WriteModelTransactions},
    CorrelationId,
};
use log::{error, info};
use std::{
    collections::HashMap,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

/// Builder used to build a ScenarioContext instance.
#[derive(Debug, Default)]
pub struct ScenarioContextBuilder {
    configuration: Option<DriverConfiguration>,
    pipeline: Option<Arc<dyn DispatchPipeline + Send + Sync>>,
    write_model: Option<Arc<dyn WriteModelTransactions + Send + Sync>>,
    read_model: Option<Arc<dyn ReadModelTransactions + Send + Sync>>,
    matcher: Option<Box<dyn StructuralMatcher + Send + Sync>>,
}

impl ScenarioContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_configuration(mut self, configuration: DriverConfiguration) -> Self {
        self.configuration = Some(configuration);
        self
    }

    pub fn with_pipeline<P: DispatchPipeline + Send + Sync + 'static>(mut self, pipeline: P) -> Self {
        self.pipeline = Some(Arc::new(pipeline));
        self
    }

    pub fn with_write_model<W: WriteModelTransactions + Send + Sync + 'static>(
        mut self,
        write_model: W,
    ) -> Self {
        self.write_model = Some(Arc::new(write_model));
        self
    }

    pub fn with_read_model<R: ReadModelTransactions + Send + Sync + 'static>(
        mut self,
        read_model: R,
    ) -> Self {
        self.read_model = Some(Arc::new(read_model));
        self
    }

    /// Replaces the regex-based structural matcher used by `the_response_should_be_a_json_like`.
    pub fn with_matcher<M: StructuralMatcher + Send + Sync + 'static>(mut self, matcher: M) -> Self {
        self.matcher = Some(Box::new(matcher));
        self
    }

    /// Consume the builder and create a ScenarioContext. The pipeline and both stores are
    /// required.
    pub fn build(self) -> Result<ScenarioContext, Error> {
        let pipeline = self.pipeline.ok_or(Error::NotConfigured("dispatch pipeline"))?;
        let write_model = self.write_model.ok_or(Error::NotConfigured("write-model store"))?;
        let read_model = self.read_model.ok_or(Error::NotConfigured("read-model store"))?;

        Ok(ScenarioContext {
            driver: RequestDriver::new(self.configuration.unwrap_or_default(), pipeline)?,
            sandbox: Sandbox::new(write_model, read_model),
            matcher: self.matcher.unwrap_or_else(|| Box::new(RegexMatcher)),
        })
    }
}

/// Everything one scenario owns: the request driver with its captured response and the sandbox
/// isolating the scenario's writes.
///
/// Calls block on the context's own runtime, so a context must be driven and dropped from
/// synchronous code, never from inside a tokio runtime such as a `#[tokio::test]`.
#[derive(Debug)]
pub struct ScenarioContext {
    driver: RequestDriver,
    sandbox: Sandbox,
    matcher: Box<dyn StructuralMatcher + Send + Sync>,
}

impl ScenarioContext {
    pub fn builder() -> ScenarioContextBuilder {
        ScenarioContextBuilder::new()
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        self.driver.correlation_id()
    }

    pub fn is_active(&self) -> bool {
        self.sandbox.is_active()
    }

    pub fn before_scenario(&mut self) -> Result<(), Error> {
        let id = self.driver.correlation_id().clone();
        self.sandbox.open(&id)
    }

    pub fn after_scenario(&mut self) -> Result<(), Error> {
        self.driver.clear_response();
        self.sandbox.close()
    }

    /// Runs `scenario` between the lifecycle hooks. The sandbox is closed even when the scenario
    /// fails or panics; a panic is resumed once teardown is done.
    pub fn run<F>(&mut self, scenario: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Self) -> Result<(), Error>,
    {
        self.before_scenario()?;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| scenario(&mut *self)));
        let teardown = self.after_scenario();

        match outcome {
            Ok(result) => {
                teardown?;
                result
            }
            Err(panic) => {
                if let Err(e) = teardown {
                    error!("Scenario teardown failed while unwinding: {}", e);
                }
                panic::resume_unwind(panic)
            }
        }
    }

    pub fn set_header<S1: Into<String>, S2: Into<String>>(&mut self, name: S1, value: S2) {
        self.driver.set_header(name, value);
    }

    pub fn i_call(&mut self, verb: &str, path: &str) -> Result<(), Error> {
        self.i_call_with_body(verb, path, None)
    }

    pub fn i_call_with_body(
        &mut self,
        verb: &str,
        path: &str,
        body: Option<&str>,
    ) -> Result<(), Error> {
        self.driver.call(verb, path, None, body)
    }

    pub fn i_call_with_headers(
        &mut self,
        verb: &str,
        path: &str,
        headers: &HashMap<String, String>,
        body: Option<&str>,
    ) -> Result<(), Error> {
        self.driver.call(verb, path, Some(headers), body)
    }

    pub fn response(&self) -> Result<&CapturedResponse, Error> {
        self.driver.response()
    }

    pub fn the_status_code_should_be(&self, status_code: u16) -> Result<(), Error> {
        let response = self.response()?;

        if response.status_code == status_code {
            Ok(())
        } else {
            Err(Error::mismatch(
                Subject::StatusCode,
                status_code,
                response.status_code,
            ))
        }
    }

    pub fn the_response_should_be(&self, expected: &str) -> Result<(), Error> {
        let response = self.response()?;

        if response.body.as_ref() == expected.as_bytes() {
            Ok(())
        } else {
            Err(Error::mismatch(Subject::Body, expected, response.body_text()))
        }
    }

    pub fn the_response_should_be_a_json_like(&self, pattern: &str) -> Result<(), Error> {
        let response = self.response()?;

        if self.matcher.matches(pattern, &response.body)? {
            Ok(())
        } else {
            Err(Error::mismatch(
                Subject::JsonShape,
                pattern,
                response.body_text(),
            ))
        }
    }

    pub fn the_response_should_be_empty(&self) -> Result<(), Error> {
        self.the_response_should_be("")
    }

    pub fn the_response_should_be_empty_object(&self) -> Result<(), Error> {
        self.the_response_should_be("{}")
    }
}

impl Drop for ScenarioContext {
    fn drop(&mut self) {
        if self.sandbox.is_active() {
            info!(
                "Scenario context {} dropped with an open sandbox, rolling back",
                self.driver.correlation_id()
            );
            if let Err(e) = self.sandbox.close() {
                error!("Couldn't roll back the scenario sandbox: {}", e);
            }
        }
    }
}
