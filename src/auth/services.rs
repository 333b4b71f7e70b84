// src/auth/services.rs

use std::net::IpAddr;
use std::sync::Arc;

use login_governor_api::{LoginRequest, LoginResponse, UserType};

use super::governor::{GovernorError, LoginAttemptGovernor, normalize_identifier};
use super::jwt::JwtManager;
use super::password::PasswordManager;
use super::portal::{IdentifierField, Portal, PortalGuard};
use crate::config::StoreFailurePolicy;
use crate::error::AppError;
use crate::store::StoreError;
use crate::users::UserDirectory;

const MAX_IDENTIFIER_LEN: usize = 255;

enum Rejection {
    BadCredentials,
    WrongPortal(Portal),
}

pub struct AuthService {
    governor: LoginAttemptGovernor,
    users: Arc<dyn UserDirectory>,
    jwt_manager: JwtManager,
    store_failure_policy: StoreFailurePolicy,
}

impl AuthService {
    pub fn new(
        governor: LoginAttemptGovernor,
        users: Arc<dyn UserDirectory>,
        jwt_manager: JwtManager,
        store_failure_policy: StoreFailurePolicy,
    ) -> Self {
        Self {
            governor,
            users,
            jwt_manager,
            store_failure_policy,
        }
    }

    pub fn governor(&self) -> &LoginAttemptGovernor {
        &self.governor
    }

    /// Connexion via un portail
    pub fn login(
        &self,
        portal: Portal,
        request: &LoginRequest,
        ip: IpAddr,
    ) -> Result<LoginResponse, AppError> {
        let field = portal.identifier_field();
        let user_type = portal.user_type();
        let identifier = normalize_identifier(Self::identifier(field, request)?);
        Self::validate(field, &identifier, &request.password)?;

        self.ensure_allowed(field, &identifier, user_type, ip)?;

        let Some(user) = self.users.find(field, &identifier) else {
            tracing::info!(target: "security", %portal, %ip, "Login failed: unknown identifier");
            return Err(self.reject(field, &identifier, user_type, ip, Rejection::BadCredentials));
        };

        if let Err(wrong) = PortalGuard::check(portal, user.user_type) {
            tracing::warn!(
                target: "security",
                user_id = %user.id,
                account_type = %wrong.user_type,
                %portal,
                %ip,
                "Login failed: wrong portal"
            );
            return Err(self.reject(
                field,
                &identifier,
                user_type,
                ip,
                Rejection::WrongPortal(portal),
            ));
        }

        let password_matches = match PasswordManager::verify(&request.password, &user.password_hash)
        {
            Ok(matches) => matches,
            Err(e) => {
                tracing::error!(error = %e, user_id = %user.id, "Stored password hash is unusable");
                false
            }
        };

        if !password_matches || !user.is_active {
            tracing::info!(
                target: "security",
                user_id = %user.id,
                active = user.is_active,
                %portal,
                %ip,
                "Login failed: bad credentials"
            );
            return Err(self.reject(field, &identifier, user_type, ip, Rejection::BadCredentials));
        }

        // A failed clear leaves stale counters that expire on their own.
        if let Err(e) = self
            .governor
            .clear_failed_attempts(&identifier, user_type, ip)
        {
            tracing::error!(error = %e, user_id = %user.id, "Failed to clear login attempts");
        }

        let access_token = self
            .jwt_manager
            .generate_access_token(user.id, user.user_type)?;

        tracing::info!(target: "security", user_id = %user.id, %portal, %ip, "Login succeeded");

        Ok(LoginResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt_manager.expires_in_seconds(),
            user: user.into(),
        })
    }

    fn ensure_allowed(
        &self,
        field: IdentifierField,
        identifier: &str,
        user_type: UserType,
        ip: IpAddr,
    ) -> Result<(), AppError> {
        match self.governor.check_login_allowed(identifier, user_type, ip) {
            Ok(()) => Ok(()),
            Err(GovernorError::LockedOut {
                locked_until,
                retry_after_seconds,
            }) => Err(AppError::LockedOut {
                field,
                locked_until,
                retry_after_seconds,
            }),
            Err(GovernorError::Store(e)) => self.on_store_failure(e),
        }
    }

    /// Records the failure and builds the error the portal shows.
    fn reject(
        &self,
        field: IdentifierField,
        identifier: &str,
        user_type: UserType,
        ip: IpAddr,
        rejection: Rejection,
    ) -> AppError {
        let attempts_remaining = match self
            .governor
            .record_failed_attempt(identifier, user_type, ip)
        {
            Ok(outcome) => {
                if let Some(locked_until) = outcome.locked_until {
                    return AppError::LockedOut {
                        field,
                        locked_until,
                        retry_after_seconds: self.governor.retry_after_seconds(locked_until),
                    };
                }
                outcome.attempts_remaining
            }
            Err(GovernorError::LockedOut {
                locked_until,
                retry_after_seconds,
            }) => {
                return AppError::LockedOut {
                    field,
                    locked_until,
                    retry_after_seconds,
                };
            }
            Err(GovernorError::Store(e)) => match self.on_store_failure(e) {
                Ok(()) => None,
                Err(err) => return err,
            },
        };

        match rejection {
            Rejection::BadCredentials => AppError::InvalidCredentials {
                field,
                attempts_remaining,
            },
            Rejection::WrongPortal(portal) => AppError::WrongPortal {
                field,
                portal,
                attempts_remaining,
            },
        }
    }

    fn on_store_failure(&self, err: StoreError) -> Result<(), AppError> {
        match self.store_failure_policy {
            StoreFailurePolicy::Open => {
                tracing::warn!(error = %err, "Attempt store failed, continuing without lockout");
                Ok(())
            }
            StoreFailurePolicy::Closed => Err(AppError::from(err)),
        }
    }

    // === Helpers de validation ===

    /// The identifier posted under the portal's field. The other field is refused.
    fn identifier(field: IdentifierField, request: &LoginRequest) -> Result<&str, AppError> {
        let (wanted, other, other_field) = match field {
            IdentifierField::Email => (&request.email, &request.member_id, IdentifierField::MemberId),
            IdentifierField::MemberId => (&request.member_id, &request.email, IdentifierField::Email),
        };
        if other.is_some() {
            return Err(AppError::validation(format!(
                "{} is not accepted on this portal",
                other_field.as_str()
            )));
        }
        Ok(wanted.as_deref().unwrap_or_default())
    }

    fn validate(field: IdentifierField, identifier: &str, password: &str) -> Result<(), AppError> {
        if identifier.is_empty() {
            return Err(AppError::validation(format!("{} is required", field.as_str())));
        }
        if identifier.len() > MAX_IDENTIFIER_LEN {
            return Err(AppError::validation(format!("{} is too long", field.as_str())));
        }
        if field == IdentifierField::Email && !Self::is_valid_email(identifier) {
            return Err(AppError::InvalidEmail);
        }
        if password.is_empty() {
            return Err(AppError::validation("password is required"));
        }
        Ok(())
    }

    fn is_valid_email(email: &str) -> bool {
        match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
            }
            None => false,
        }
    }
}
