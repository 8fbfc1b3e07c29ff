use anime_sync_sources::TraktCredentials;

/// Operator hooks consulted when the pass cannot decide on its own.
///
/// Calls block until the operator answers. Every method may decline by
/// returning `None`/`false`, and the pass treats that as "leave it for the
/// next run".
pub trait ResolutionGateway {
    /// Catalog IDs for an anime show that has no cross-reference hit
    fn prompt_manual_ids(&mut self, title: &str) -> Option<Vec<String>>;

    /// Whether to ignore the show permanently
    fn prompt_ignore(&mut self, title: &str) -> bool;

    /// Application credentials when none are configured
    fn prompt_credentials(&mut self) -> Option<TraktCredentials>;

    /// Authorization code after the operator visits `authorize_url`
    fn prompt_authorization_code(&mut self, authorize_url: &str) -> Option<String>;
}

/// Gateway for unattended runs: declines everything
#[derive(Debug, Default, Clone, Copy)]
pub struct DecliningGateway;

impl ResolutionGateway for DecliningGateway {
    fn prompt_manual_ids(&mut self, _title: &str) -> Option<Vec<String>> {
        None
    }

    fn prompt_ignore(&mut self, _title: &str) -> bool {
        false
    }

    fn prompt_credentials(&mut self) -> Option<TraktCredentials> {
        None
    }

    fn prompt_authorization_code(&mut self, _authorize_url: &str) -> Option<String> {
        None
    }
}
