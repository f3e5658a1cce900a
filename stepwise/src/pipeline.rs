use crate::error::{BoxError, Error};
use async_trait::async_trait;
use futures::future::poll_fn;
use hyper::{
    client::HttpConnector,
    http::uri::{PathAndQuery, Uri},
    service::Service,
    Body, Request, Response,
};
use hyper_tls::HttpsConnector;
use std::fmt::{self, Debug};

/// Turns a request into a response. Retries and timeouts are the pipeline's business; the
/// driver awaits whatever it returns.
#[async_trait]
pub trait DispatchPipeline: Debug {
    async fn dispatch(&self, request: Request<Body>) -> Result<Response<Body>, Error>;
}

/// In-process pipeline wrapping a hyper service, typically the application's router.
#[derive(Clone)]
pub struct ServicePipeline<S> {
    service: S,
}

impl<S> ServicePipeline<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

impl<S> Debug for ServicePipeline<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServicePipeline").finish_non_exhaustive()
    }
}

#[async_trait]
impl<S> DispatchPipeline for ServicePipeline<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + Sync,
    S::Error: Into<BoxError>,
    S::Future: Send,
{
    async fn dispatch(&self, request: Request<Body>) -> Result<Response<Body>, Error> {
        let mut service = self.service.clone();

        poll_fn(|cx| service.poll_ready(cx))
            .await
            .map_err(|e| Error::Dispatch(e.into()))?;

        service
            .call(request)
            .await
            .map_err(|e| Error::Dispatch(e.into()))
    }
}

/// Pipeline forwarding every request to a running server.
#[derive(Debug, Clone)]
pub struct RemotePipeline {
    base_url: String,
    client: hyper::Client<HttpsConnector<HttpConnector>>,
}

impl RemotePipeline {
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            client: hyper::Client::builder().build(HttpsConnector::new()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn target_uri(&self, uri: &Uri) -> Result<Uri, Error> {
        let path = uri
            .path_and_query()
            .map(PathAndQuery::as_str)
            .unwrap_or("/");

        Ok(format!("{}{}", self.base_url, path).parse::<Uri>().map_err(hyper::http::Error::from)?)
    }
}

#[async_trait]
impl DispatchPipeline for RemotePipeline {
    async fn dispatch(&self, mut request: Request<Body>) -> Result<Response<Body>, Error> {
        *request.uri_mut() = self.target_uri(request.uri())?;
        request.headers_mut().remove(hyper::header::HOST);

        Ok(self.client.request(request).await?)
    }
}
