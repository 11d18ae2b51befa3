//! API Gateway service - binds the router and serves until shutdown.

use crate::domain::GatewayConfig;
use crate::error::{GatewayError, GatewayResult, SUBSYSTEM};
use crate::router::{build_router, GatewayState};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

pub struct ApiGatewayService {
    config: GatewayConfig,
    state: GatewayState,
}

impl ApiGatewayService {
    /// Create the service. Fails on invalid configuration.
    pub fn new(config: GatewayConfig, state: GatewayState) -> GatewayResult<Self> {
        config.validate()?;
        Ok(Self { config, state })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone(), &self.config)
    }

    /// Bind the configured address and serve.
    pub async fn start(self) -> GatewayResult<()> {
        let addr = self.config.http_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Server(format!("bind {addr}: {e}")))?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until the shutdown token fires.
    pub async fn serve(self, listener: TcpListener) -> GatewayResult<()> {
        let addr = listener
            .local_addr()
            .map_err(|e| GatewayError::Server(e.to_string()))?;
        let shutdown = self.state.shutdown.clone();
        let router = self.router();

        info!(subsystem = SUBSYSTEM, %addr, "API gateway listening");
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| GatewayError::Server(e.to_string()))?;
        info!(subsystem = SUBSYSTEM, "API gateway stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::create_test_state;
    use std::time::Duration;

    #[test]
    fn test_invalid_config_rejected() {
        let harness = create_test_state();
        let config = GatewayConfig {
            request_timeout: Duration::ZERO,
            ..GatewayConfig::for_testing()
        };
        assert!(matches!(
            ApiGatewayService::new(config, harness.state),
            Err(GatewayError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_serves_until_shutdown() {
        let harness = create_test_state();
        let shutdown = harness.state.shutdown.clone();
        let service = ApiGatewayService::new(GatewayConfig::for_testing(), harness.state).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(service.serve(listener));

        let mut stream = tokio::net::TcpStream::connect(addr).await;
        for _ in 0..10 {
            if stream.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            stream = tokio::net::TcpStream::connect(addr).await;
        }
        assert!(stream.is_ok());
        drop(stream);

        shutdown.cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
