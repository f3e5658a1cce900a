use crate::{
    correlation::CorrelationId,
    data::CapturedResponse,
    driver_configuration::DriverConfiguration,
    error::Error,
    pipeline::DispatchPipeline,
    util,
};
use hyper::{
    header::{HeaderName, HeaderValue},
    Body, Method, Request,
};
use log::debug;
use std::{collections::HashMap, sync::Arc};
use tokio::runtime::{Builder, Runtime};

/// Sends requests through the dispatch pipeline and keeps the last response for assertions.
#[derive(Debug)]
pub struct RequestDriver {
    configuration: DriverConfiguration,
    pipeline: Arc<dyn DispatchPipeline + Send + Sync>,
    correlation_id: CorrelationId,
    headers: HashMap<String, String>,
    response: Option<CapturedResponse>,
    runtime: Runtime,
}

impl RequestDriver {
    pub fn new(
        configuration: DriverConfiguration,
        pipeline: Arc<dyn DispatchPipeline + Send + Sync>,
    ) -> Result<Self, Error> {
        let correlation_id = configuration.id_generator().generate();
        let runtime = Builder::new_current_thread().enable_all().build()?;

        Ok(Self {
            configuration,
            pipeline,
            correlation_id,
            headers: HashMap::new(),
            response: None,
            runtime,
        })
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    pub fn configuration(&self) -> &DriverConfiguration {
        &self.configuration
    }

    /// Adds a header sent with every following call. It overrides the configured defaults but not
    /// the headers passed to a single call.
    pub fn set_header<S1: Into<String>, S2: Into<String>>(&mut self, name: S1, value: S2) {
        let name = name.into();
        self.headers
            .retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
    }

    pub fn call(
        &mut self,
        verb: &str,
        path: &str,
        headers: Option<&HashMap<String, String>>,
        body: Option<&str>,
    ) -> Result<(), Error> {
        let request = self.build_request(verb, path, headers, body)?;
        debug!("{} {} ({})", verb, path, self.correlation_id);

        let pipeline = self.pipeline.clone();
        let response = self.runtime.block_on(async move {
            let response = pipeline.dispatch(request).await?;
            let status_code = response.status().as_u16();
            let headers = util::extract_headers(response.headers());
            let body = hyper::body::to_bytes(response.into_body()).await?;

            Ok::<_, Error>(CapturedResponse {
                status_code,
                headers,
                body,
            })
        })?;

        debug!("{} {} -> {}", verb, path, response.status_code);
        self.response = Some(response);

        Ok(())
    }

    pub fn response(&self) -> Result<&CapturedResponse, Error> {
        self.response.as_ref().ok_or(Error::NoResponseCaptured)
    }

    pub fn clear_response(&mut self) {
        self.response = None;
    }

    fn build_request(
        &self,
        verb: &str,
        path: &str,
        headers: Option<&HashMap<String, String>>,
        body: Option<&str>,
    ) -> Result<Request<Body>, Error> {
        let method = Method::from_bytes(verb.as_bytes())
            .map_err(|_| Error::InvalidMethod(String::from(verb)))?;
        let mut request_builder = Request::builder().method(method).uri(path);

        if let Some(header_map) = request_builder.headers_mut() {
            util::insert_headers(header_map, self.configuration.default_headers())?;
            util::insert_headers(header_map, &self.headers)?;
            if let Some(headers) = headers {
                util::insert_headers(header_map, headers)?;
            }
            if let Some(correlation_header) = self.configuration.correlation_header() {
                header_map.insert(
                    HeaderName::from_lowercase(correlation_header.to_lowercase().as_bytes())?,
                    HeaderValue::from_str(self.correlation_id.human_readable())?,
                );
            }
        }

        Ok(request_builder.body(Body::from(body.unwrap_or_default().to_owned()))?)
    }
}
