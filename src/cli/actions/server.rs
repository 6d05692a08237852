use crate::api::{
    self, AdminSecret, AuthConfig, AuthState, Environment, LoginRateLimiter, NoopRateLimiter,
    RateLimiter,
};
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub admin_secret: AdminSecret,
    pub environment: Environment,
    pub session_ttl_seconds: i64,
    pub login_path: String,
    pub login_rate_limit: bool,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the server fails to bind or serve.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let rate_limiter: Arc<dyn RateLimiter> = if args.login_rate_limit {
        Arc::new(LoginRateLimiter::default())
    } else {
        warn!("Login rate limiting is disabled");
        Arc::new(NoopRateLimiter)
    };

    let auth_config = AuthConfig::new(args.admin_secret)
        .with_environment(args.environment)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_login_path(args.login_path);

    let auth_state = Arc::new(AuthState::new(auth_config, rate_limiter));

    api::new(args.port, auth_state).await
}

fn log_startup_args(args: &Args) {
    info!(
        port = args.port,
        environment = args.environment.as_str(),
        session_ttl_seconds = args.session_ttl_seconds,
        login_path = %args.login_path,
        login_rate_limit = args.login_rate_limit,
        "Starting ipe-admin"
    );
}
