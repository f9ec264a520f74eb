use std::{sync::Arc, time::Duration};

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, RETRY_AFTER},
    Client,
    Response,
    StatusCode,
};
use tokio::sync::RwLock;

use crate::{config::AccrualConfig, helpers::parse_retry_after, AccrualApiError, AccrualResponse};

/// Rate-limit aware client for the accrual service.
///
/// Clones share the underlying HTTP client and the pause lock, so a pause engaged through one clone holds back
/// requests made through every other clone.
#[derive(Clone)]
pub struct AccrualProxy {
    config: AccrualConfig,
    client: Arc<Client>,
    // Requests hold the read side. `pause` holds the write side for the duration of the pause.
    sender_lock: Arc<RwLock<()>>,
}

impl AccrualProxy {
    pub fn new(config: AccrualConfig) -> Result<Self, AccrualApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| AccrualApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client), sender_lock: Arc::new(RwLock::new(())) })
    }

    pub fn url(&self, number: &str) -> String {
        format!("{}/api/orders/{number}", self.config.base_url)
    }

    /// Asks the accrual service for the state of the given order.
    ///
    /// Waits for any pause in progress before sending the request.
    pub async fn check_accrual(&self, number: &str) -> Result<AccrualResponse, AccrualApiError> {
        let _guard = self.sender_lock.read().await;
        let url = self.url(number);
        trace!("🌐️ Sending accrual query: {url}");
        let response =
            self.client.get(url).send().await.map_err(|e| AccrualApiError::RestRequestError(e.to_string()))?;
        self.interpret_response(number, response).await
    }

    /// Blocks every accrual request for `duration`. Requests already in flight are allowed to finish first.
    pub async fn pause(&self, duration: Duration) {
        info!("🌐️ Pausing accrual requests for {}s", duration.as_secs_f64());
        let _guard = self.sender_lock.write().await;
        tokio::time::sleep(duration).await;
        debug!("🌐️ Accrual pause complete");
    }

    async fn interpret_response(&self, number: &str, response: Response) -> Result<AccrualResponse, AccrualApiError> {
        match response.status() {
            StatusCode::OK => {
                debug!("🌐️ Order {number} is registered with the accrual service");
                let body =
                    response.json::<AccrualResponse>().await.map_err(|e| AccrualApiError::JsonError(e.to_string()))?;
                if body.accrual.map(|a| a.is_negative()).unwrap_or(false) {
                    return Err(AccrualApiError::InvalidResponse(format!("Negative accrual for order {number}")));
                }
                Ok(body)
            },
            StatusCode::NO_CONTENT => {
                info!("🌐️ Order {number} is not registered with the accrual service");
                Err(AccrualApiError::NotRegistered)
            },
            StatusCode::INTERNAL_SERVER_ERROR => {
                info!("🌐️ Accrual check for order {number} failed with an internal error");
                Err(AccrualApiError::UpstreamInternal)
            },
            StatusCode::TOO_MANY_REQUESTS => {
                info!("🌐️ Accrual service is rate limiting us (order {number})");
                let pause = self.retry_after(&response);
                Err(AccrualApiError::RateLimited { pause })
            },
            status => {
                warn!("🌐️ Unknown status {status} from the accrual service for order {number}");
                Err(AccrualApiError::UnknownStatus(status.as_u16()))
            },
        }
    }

    fn retry_after(&self, response: &Response) -> Duration {
        let header = match response.headers().get(RETRY_AFTER) {
            Some(h) => h,
            None => return self.config.default_pause,
        };
        match header.to_str().ok().and_then(parse_retry_after) {
            Some(pause) => pause,
            None => {
                error!("🌐️ Could not parse Retry-After header {header:?}. Using the default pause.");
                self.config.default_pause
            },
        }
    }
}
