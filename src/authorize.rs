//! The three-legged authorization flow.
//!
//! Request token, user authorization and access token run as a
//! [`Sequence`]; the first failure ends the flow and is returned from
//! [`OAuthClient::authorize`]. Nothing is rolled back: a request token
//! granted before a later failure stays in the credential state.

use std::future::{self, Future};
use std::pin::Pin;
use std::time::Duration;

use http::Method;
use tokio::sync::oneshot;
use tracing::{info, warn};
use url::Url;

use crate::seq::{Sequence, Step, StepFuture};
use crate::{
    AuthorizationHost, CancelReason, Error, FlowConfig, HmacSha1, Notice, OAuthClient,
    OAuthRequest, Result, Signer, SurfaceId, TokenReaderFuture, OAUTH_CALLBACK_KEY,
    OAUTH_TOKEN_KEY, OAUTH_VERIFIER_KEY,
};

/// Where a client stands in the authorization flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthorized,
    RequestTokenPending,
    AwaitingUserAuthorization,
    AccessTokenPending,
    Authorized,
    /// A token endpoint, the transport or the host failed.
    Failed,
    /// The interactive step ended without the owner's approval.
    Cancelled,
}

/// Value handed from one leg to the next.
#[derive(Debug, Default)]
pub struct Grant {
    verifier: Option<String>,
}

impl OAuthClient<HmacSha1> {
    /// Build a client for `config` and run the whole flow with it.
    ///
    /// Returns the authorized client, ready to sign requests.
    pub async fn authorized<H>(config: FlowConfig, host: &H) -> Result<Self>
    where
        H: AuthorizationHost,
    {
        let mut client = Self::new(config)?;
        client.authorize(host).await?;
        Ok(client)
    }
}

impl<S: Signer> OAuthClient<S> {
    /// Run the whole three-legged flow, showing the authorization page
    /// through `host`.
    ///
    /// Waits for the resource owner as long as the configured
    /// authorization timeout allows, or forever without one.
    pub async fn authorize<H>(&mut self, host: &H) -> Result<()>
    where
        H: AuthorizationHost,
    {
        self.authorize_until(host, future::pending()).await
    }

    /// Like [`authorize`](Self::authorize), but gives up with
    /// [`CancelReason::Aborted`] once `cancel` resolves while the resource
    /// owner has not answered yet.
    pub async fn authorize_until<'h, H, F>(&mut self, host: &'h H, cancel: F) -> Result<()>
    where
        H: AuthorizationHost,
        F: Future<Output = ()> + 'h,
    {
        let config = self.config.clone().ok_or(Error::NotConfigured)?;
        let deadline = config.authorization_deadline();

        let legs: Sequence<'_, Self, Grant> = Sequence::new()
            .then(TokenExchange {
                leg: "request_token",
                endpoint: config.request_token_url,
                pending: AuthState::RequestTokenPending,
            })
            .then(UserAuthorization {
                host,
                authorize_url: config.authorize_url,
                callback_url: config.callback_url,
                deadline,
                cancel: Box::pin(cancel),
            })
            .then(TokenExchange {
                leg: "access_token",
                endpoint: config.access_token_url,
                pending: AuthState::AccessTokenPending,
            });

        match legs.run(self, Grant::default()).await {
            Ok(_) => {
                self.transition(AuthState::Authorized);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, state = ?self.state, "authorization failed");
                self.transition(if err.is_cancelled() {
                    AuthState::Cancelled
                } else {
                    AuthState::Failed
                });
                Err(err)
            }
        }
    }
}

/// Signed POST to a token endpoint; stores the granted token pair.
struct TokenExchange {
    leg: &'static str,
    endpoint: Url,
    pending: AuthState,
}

impl<S: Signer> Step<OAuthClient<S>, Grant> for TokenExchange {
    fn name(&self) -> &'static str {
        self.leg
    }

    fn run<'a>(&'a mut self, client: &'a mut OAuthClient<S>, grant: Grant) -> StepFuture<'a, Grant> {
        Box::pin(async move {
            client.transition(self.pending);
            let mut request = OAuthRequest::new(Method::POST, self.endpoint.clone());
            if let Some(verifier) = grant.verifier {
                request
                    .oauth_parameters
                    .insert(OAUTH_VERIFIER_KEY.to_string(), verifier);
            }
            let token = client.send(request).parse_oauth_token().await?;
            client.credentials.grant(&token);
            info!(leg = self.leg, extra = token.remain.len(), "token granted");
            Ok(Grant::default())
        })
    }
}

/// Shows the authorization page and waits for the owner to come back.
struct UserAuthorization<'h, H> {
    host: &'h H,
    authorize_url: Url,
    callback_url: Url,
    deadline: Option<Duration>,
    cancel: Pin<Box<dyn Future<Output = ()> + 'h>>,
}

impl<'h, H: AuthorizationHost> UserAuthorization<'h, H> {
    fn page_url(&self, token: &str) -> Url {
        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair(OAUTH_TOKEN_KEY, token)
            .append_pair(OAUTH_CALLBACK_KEY, self.callback_url.as_str());
        url
    }

    async fn wait(&mut self, listener: oneshot::Receiver<Notice>) -> Result<Notice> {
        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(deadline) => tokio::time::sleep(deadline).await,
                None => future::pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            received = listener => {
                received.map_err(|_| Error::Cancelled(CancelReason::HostDisconnected))
            }
            _ = &mut self.cancel => Err(Error::Cancelled(CancelReason::Aborted)),
            _ = expired => Err(Error::Cancelled(CancelReason::DeadlineElapsed)),
        }
    }
}

impl<'h, S, H> Step<OAuthClient<S>, Grant> for UserAuthorization<'h, H>
where
    S: Signer,
    H: AuthorizationHost,
{
    fn name(&self) -> &'static str {
        "user_authorization"
    }

    fn run<'a>(&'a mut self, client: &'a mut OAuthClient<S>, _grant: Grant) -> StepFuture<'a, Grant> {
        Box::pin(async move {
            client.transition(AuthState::AwaitingUserAuthorization);
            let url = match client.credentials.token() {
                Some(token) => self.page_url(token),
                None => return Err(Error::MissingToken),
            };

            let id = self.host.open(&url).await?;
            let listener = self.host.listen(&id);
            let surface = OpenSurface {
                host: self.host,
                id: Some(id),
            };
            let notice = self.wait(listener).await;
            surface.release().await;

            match notice? {
                Notice::Completed { verifier } => Ok(Grant { verifier }),
                Notice::Dismissed => Err(Error::Cancelled(CancelReason::Dismissed)),
            }
        })
    }
}

/// An open authorization surface; abandoned with the host when dropped
/// before [`release`](OpenSurface::release).
struct OpenSurface<'h, H: AuthorizationHost> {
    host: &'h H,
    id: Option<SurfaceId>,
}

impl<'h, H: AuthorizationHost> OpenSurface<'h, H> {
    async fn release(mut self) {
        if let Some(id) = self.id.take() {
            self.host.unlisten(&id);
            if let Err(err) = self.host.close(&id).await {
                warn!(surface = %id, error = %err, "could not close authorization surface");
            }
        }
    }
}

impl<'h, H: AuthorizationHost> Drop for OpenSurface<'h, H> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            warn!(surface = %id, "authorization dropped while the surface was open");
            self.host.abandon(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::Credentials;

    struct Unreachable;

    #[async_trait(?Send)]
    impl AuthorizationHost for Unreachable {
        async fn open(&self, _url: &Url) -> Result<SurfaceId> {
            Err(Error::Host("no display".to_string()))
        }

        fn listen(&self, _surface: &SurfaceId) -> oneshot::Receiver<Notice> {
            oneshot::channel().1
        }

        fn unlisten(&self, _surface: &SurfaceId) {}

        async fn close(&self, _surface: &SurfaceId) -> Result<()> {
            Ok(())
        }
    }

    fn user_authorization(host: &Unreachable) -> UserAuthorization<'_, Unreachable> {
        UserAuthorization {
            host,
            authorize_url: Url::parse("https://api.example.com/oauth/authorize?lang=en").unwrap(),
            callback_url: Url::parse("https://app.example.com/cb?x=1").unwrap(),
            deadline: None,
            cancel: Box::pin(future::pending()),
        }
    }

    #[test]
    fn page_url_keeps_existing_query() {
        let step = user_authorization(&Unreachable);
        assert_eq!(
            step.page_url("T1").as_str(),
            "https://api.example.com/oauth/authorize?lang=en&oauth_token=T1\
             &oauth_callback=https%3A%2F%2Fapp.example.com%2Fcb%3Fx%3D1"
        );
    }

    #[tokio::test]
    async fn user_authorization_needs_a_token() {
        let mut client = OAuthClient::restore(Credentials::new("key", "secret", Vec::new()));
        let mut step = user_authorization(&Unreachable);
        let result = step.run(&mut client, Grant::default()).await;
        assert!(matches!(result, Err(Error::MissingToken)));
        assert_eq!(client.state(), AuthState::AwaitingUserAuthorization);
    }

    #[tokio::test]
    async fn host_failure_is_not_a_cancellation() {
        let mut credentials = Credentials::new("key", "secret", Vec::new());
        credentials.grant(&crate::TokenResponse {
            oauth_token: "T1".to_string(),
            oauth_token_secret: "S1".to_string(),
            remain: Default::default(),
        });
        let mut client = OAuthClient::restore(credentials);
        let mut step = user_authorization(&Unreachable);
        let result = step.run(&mut client, Grant::default()).await;
        assert!(matches!(result, Err(Error::Host(_))));
        assert!(!result.unwrap_err().is_cancelled());
    }
}
