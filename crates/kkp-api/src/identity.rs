//! Extraction of the calling user from the identity header set by the authenticating proxy.
use axum::extract::FromRequestParts;
use http::{HeaderName, header::ToStrError, request::Parts};
use kkp_dashboard::{
    error::{Classify, ErrorClass},
    identity::UserInfo,
    store::StoreError,
};
use snafu::{OptionExt, ResultExt, Snafu, ensure};

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("request carries no {header} header"))]
    MissingIdentity { header: HeaderName },

    #[snafu(display("the {header} header is not valid text"))]
    InvalidIdentity {
        source: ToStrError,
        header: HeaderName,
    },

    #[snafu(display("failed to resolve user {email:?}"))]
    ResolveUser { source: StoreError, email: String },

    #[snafu(display("failed to resolve {email:?} as a member of project {project_id:?}"))]
    ResolveProjectMember {
        source: StoreError,
        email: String,
        project_id: String,
    },
}

impl Classify for Error {
    fn class(&self) -> ErrorClass {
        match self {
            Self::MissingIdentity { .. } | Self::InvalidIdentity { .. } => ErrorClass::Unauthorized,
            Self::ResolveUser { source, .. } if source.is_not_found() => ErrorClass::Forbidden,
            Self::ResolveUser { source, .. } => source.class(),
            Self::ResolveProjectMember { source, .. } if source.is_not_found() => {
                ErrorClass::Forbidden
            }
            Self::ResolveProjectMember { source, .. } => source.class(),
        }
    }
}

/// The authenticated caller of a request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Caller(pub UserInfo);

impl Caller {
    async fn resolve(parts: &Parts, state: &AppState) -> Result<Self, Error> {
        let header = &state.identity_header;
        let email = parts
            .headers
            .get(header)
            .context(MissingIdentitySnafu { header: header.clone() })?
            .to_str()
            .context(InvalidIdentitySnafu { header: header.clone() })?
            .trim();
        ensure!(!email.is_empty(), MissingIdentitySnafu { header: header.clone() });

        let user = state
            .users
            .user_info(email)
            .await
            .context(ResolveUserSnafu { email })?;
        Ok(Self(user))
    }

    /// Resolves the caller again within `project_id`, adding the project's group.
    ///
    /// Admins are returned as they are. Callers without a binding to the project are
    /// forbidden.
    pub async fn in_project(
        self,
        state: &AppState,
        project_id: &str,
    ) -> Result<UserInfo, ApiError> {
        if self.0.is_admin {
            return Ok(self.0);
        }

        let email = self.0.email.as_str();
        let user = state
            .users
            .user_info_for_project(email, project_id)
            .await
            .context(ResolveProjectMemberSnafu { email, project_id })?;
        Ok(user)
    }
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let caller = Self::resolve(parts, state).await?;
        tracing::debug!(user = %caller.0.email, is_admin = caller.0.is_admin, "resolved caller");
        Ok(caller)
    }
}
