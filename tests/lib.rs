//! Shared doubles for the funddb integration tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use funddb_core::{HttpClient, HttpError, HttpRequest, HttpResponse};

/// Answers each request with the first route whose URL prefix matches and
/// remembers every requested URL. Unmatched URLs get a 404.
#[derive(Default)]
pub struct CannedHttpClient {
    routes: Vec<(&'static str, u16, &'static str)>,
    urls: Mutex<Vec<String>>,
}

impl CannedHttpClient {
    /// Serve `status` and `body` for every URL.
    pub fn new(status: u16, body: &'static str) -> Self {
        Self::default().route_with_status("", status, body)
    }

    pub fn route(self, prefix: &'static str, body: &'static str) -> Self {
        self.route_with_status(prefix, 200, body)
    }

    pub fn route_with_status(mut self, prefix: &'static str, status: u16, body: &'static str) -> Self {
        self.routes.push((prefix, status, body));
        self
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().expect("url log").clone()
    }
}

impl HttpClient for CannedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let response = self
            .routes
            .iter()
            .find(|(prefix, _, _)| request.url.starts_with(prefix))
            .map(|(_, status, body)| HttpResponse::with_status(*status, *body))
            .unwrap_or_else(|| HttpResponse::with_status(404, "not found"));
        self.urls.lock().expect("url log").push(request.url);
        Box::pin(async move { Ok(response) })
    }
}
