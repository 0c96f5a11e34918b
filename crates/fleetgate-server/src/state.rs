//! Service wiring shared by request handlers.

use std::sync::Arc;

use crate::auth::{CredentialVerifier, JwtManager, TokenPolicy, TokenService};
use crate::directory::{AdminDirectory, DeviceDirectory};
use crate::storage::FleetDatabase;
use crate::telemetry::TelemetryIngest;

/// Services constructed once at startup and handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenService>,
    pub admins: Arc<AdminDirectory>,
    pub devices: Arc<DeviceDirectory>,
    pub telemetry: Arc<TelemetryIngest>,
}

impl AppState {
    pub fn new(
        db: FleetDatabase,
        jwt: JwtManager,
        policy: TokenPolicy,
        credentials: Arc<dyn CredentialVerifier>,
    ) -> Self {
        let tokens = Arc::new(TokenService::new(db.clone(), jwt, policy));
        let admins = Arc::new(AdminDirectory::new(
            db.clone(),
            Arc::clone(&tokens),
            Arc::clone(&credentials),
        ));
        let devices = Arc::new(DeviceDirectory::new(
            db.clone(),
            Arc::clone(&tokens),
            credentials,
            Arc::clone(&admins),
        ));
        let telemetry = Arc::new(TelemetryIngest::new(db, Arc::clone(&devices)));

        Self {
            tokens,
            admins,
            devices,
            telemetry,
        }
    }
}
