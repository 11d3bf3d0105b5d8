use url::Url;

use crate::request::{PROCESS_ACS_RESULT, SESSION_ID, SESSION_VERSION, THREE_DS_ID};

/// Builds the URLs that carry correlation ids through the cardholder's browser,
/// so the ACS post-back can be matched without server-side session state.
#[derive(Debug, Clone)]
pub struct ReturnUrlBuilder {
    controller_url: Url,
}

impl ReturnUrlBuilder {
    /// `controller_url` is the checkout controller endpoint; any query string or
    /// fragment it carries is dropped.
    pub fn new(controller_url: &Url) -> Self {
        let mut controller_url = controller_url.clone();
        controller_url.set_query(None);
        controller_url.set_fragment(None);
        Self { controller_url }
    }

    /// URL sent to the gateway as `responseUrl`.
    pub fn response_url(&self) -> Url {
        self.controller_url.clone()
    }

    /// URL the ACS posts the cardholder back to after step-up.
    pub fn step_up_return_url(
        &self,
        authentication_id: &str,
        session_id: &str,
        session_version: Option<&str>,
    ) -> Url {
        let mut url = self.controller_url.clone();
        url.query_pairs_mut()
            .append_pair(THREE_DS_ID, authentication_id)
            .append_pair(PROCESS_ACS_RESULT, "1")
            .append_pair(SESSION_ID, session_id)
            .append_pair(SESSION_VERSION, session_version.unwrap_or_default());
        url
    }
}
