//! TestFlight beta group membership.
//!
//! Adding a tester is a create-or-find-then-attach sequence against a
//! remote service that offers no transactions:
//!
//! 1. Create the tester with the target group as a relationship. Success
//!    means the tester is already a member and nothing else is needed.
//! 2. A 409 on create means the tester (probably) exists. The id is located
//!    from the conflict body's `meta.existingResources`, then its `included`
//!    section, then the `filter[email]` query, then a full scan of all
//!    testers. If every strategy fails the operation fails; ids are never
//!    guessed.
//! 3. Membership is checked before attaching to avoid a redundant write.
//! 4. A 409 on attach triggers one re-read of the group, since another writer
//!    may have attached the tester in between.
//!
//! Group reconciliation runs adds, then removes, one at a time. The first
//! failure aborts the batch; re-running is safe because every step checks
//! current state first.

use crate::app_store_api::client::AppStoreClient;
use crate::app_store_api::config::AppStoreConfig;
use crate::app_store_api::resources::{
    BetaGroup, BetaTester, BetaTesterCreateRequest, CollectionResponse, RelationshipRequest,
    ResourceResponse,
};
use crate::app_store_api::token::TokenPurpose;
use crate::app_store_api::types::{ApiError, AppStoreError};
use reqwest::Method;
use std::collections::HashSet;

/// Name of the group managed by [`BetaTesterClient::update_public_testing_group`]
pub const PUBLIC_TESTING_GROUP: &str = "Public Testing";

/// Page size requested when listing all testers
const TESTERS_PAGE_LIMIT: &str = "200";

/// Longest slice of a conflict body written to the debug log
const MAX_LOGGED_BODY_CHARS: usize = 500;

/// What a 409 on tester creation most likely means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// A tester with this email already exists
    TesterExists,
    /// The create was rejected because a relationship was required
    RelationshipRequired,
    /// Wording not recognised
    Unknown,
}

/// Classify a conflict by its `detail` text.
///
/// Apple's wording is the only signal available here, so all substring
/// matching lives in this one function.
pub fn classify_conflict(detail: &str) -> ConflictKind {
    let detail = detail.to_lowercase();
    if detail.contains("relationship is required") || detail.contains("betagroups or builds") {
        ConflictKind::RelationshipRequired
    } else if detail.contains("already exists") || detail.contains("already been added") {
        ConflictKind::TesterExists
    } else {
        ConflictKind::Unknown
    }
}

/// Result of a best-effort tester lookup by email
///
/// Lookup failures are reported as a value rather than an error so the
/// caller can fall through to the next resolution strategy.
#[derive(Debug)]
pub enum TesterLookup {
    Found(BetaTester),
    NotFound,
    LookupFailed(AppStoreError),
}

impl TesterLookup {
    /// Collapse to the tester, treating "not found" and "failed" alike
    pub fn into_tester(self) -> Option<BetaTester> {
        match self {
            TesterLookup::Found(tester) => Some(tester),
            TesterLookup::NotFound | TesterLookup::LookupFailed(_) => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, TesterLookup::Found(_))
    }
}

/// How [`BetaTesterClient::add_tester_to_group`] reached success
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddTesterOutcome {
    /// Created with the group relationship in one request
    Created,
    /// Existing tester was already in the group
    AlreadyMember,
    /// Existing tester was attached to the group
    Attached,
    /// Attach conflicted but the tester turned out to be in the group
    ConfirmedAttached,
}

/// Emails processed by a reconciliation pass, in the order they were applied
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

/// Client for TestFlight beta groups and testers
#[derive(Debug, Clone)]
pub struct BetaTesterClient {
    client: AppStoreClient,
}

impl BetaTesterClient {
    pub fn new(client: AppStoreClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: AppStoreConfig) -> Result<Self, AppStoreError> {
        Ok(Self::new(AppStoreClient::new(config)?))
    }

    /// List the beta groups of the configured app
    pub async fn list_beta_groups(&self) -> Result<Vec<BetaGroup>, AppStoreError> {
        let app_id = &self.client.config().app_id;
        if app_id.trim().is_empty() {
            return Err(AppStoreError::Config(
                "App id is not set. Please set APP_APPLE_ID.".to_string(),
            ));
        }

        let url = self
            .client
            .url(TokenPurpose::Connect, &format!("/v1/apps/{}/betaGroups", app_id));
        tracing::debug!("Fetching beta groups for app {} from: {}", app_id, url);

        let response: CollectionResponse<BetaGroup> =
            self.client.get_json(TokenPurpose::Connect, &url, &[]).await?;
        Ok(response.data)
    }

    /// Id of the first group whose name matches exactly, or `None`
    pub async fn resolve_group_id_by_name(
        &self,
        group_name: &str,
    ) -> Result<Option<String>, AppStoreError> {
        let groups = self.list_beta_groups().await?;
        let group_id = groups
            .into_iter()
            .find(|g| g.name() == group_name)
            .map(|g| g.id);

        if group_id.is_none() {
            tracing::debug!(
                "Beta group \"{}\" not found among the app's groups",
                group_name
            );
        }
        Ok(group_id)
    }

    /// List every tester in a group, following pagination
    pub async fn list_testers_in_group(
        &self,
        group_id: &str,
    ) -> Result<Vec<BetaTester>, AppStoreError> {
        let url = self.client.url(
            TokenPurpose::Connect,
            &format!("/v1/betaGroups/{}/betaTesters", group_id),
        );
        tracing::debug!("Fetching testers in group: {}", url);

        self.client
            .get_all_pages(TokenPurpose::Connect, &url, &[])
            .await
    }

    /// Fetch one page of all testers: the first page, or the page at `next`
    pub async fn list_testers_page(
        &self,
        next: Option<&str>,
    ) -> Result<CollectionResponse<BetaTester>, AppStoreError> {
        match next {
            Some(next) => self.client.get_json(TokenPurpose::Connect, next, &[]).await,
            None => {
                let url = self.client.url(TokenPurpose::Connect, "/v1/betaTesters");
                self.client
                    .get_json(TokenPurpose::Connect, &url, &[("limit", TESTERS_PAGE_LIMIT)])
                    .await
            }
        }
    }

    /// Fetch all testers across all pages, in arrival order
    pub async fn list_all_testers(&self) -> Result<Vec<BetaTester>, AppStoreError> {
        let url = self.client.url(TokenPurpose::Connect, "/v1/betaTesters");
        self.client
            .get_all_pages(TokenPurpose::Connect, &url, &[("limit", TESTERS_PAGE_LIMIT)])
            .await
    }

    /// Look a tester up with the server-side `filter[email]` query
    ///
    /// Never fails: transport and remote errors come back as
    /// [`TesterLookup::LookupFailed`].
    pub async fn find_tester_by_email(&self, email: &str) -> TesterLookup {
        let url = self.client.url(TokenPurpose::Connect, "/v1/betaTesters");
        let result: Result<CollectionResponse<BetaTester>, AppStoreError> = self
            .client
            .get_json(TokenPurpose::Connect, &url, &[("filter[email]", email)])
            .await;

        match result {
            Ok(response) => match response.data.into_iter().next() {
                Some(tester) => TesterLookup::Found(tester),
                None => TesterLookup::NotFound,
            },
            Err(e) => {
                tracing::warn!("Error fetching tester by email {}: {}", email, e);
                TesterLookup::LookupFailed(e)
            }
        }
    }

    /// Add a tester to a group by group name
    pub async fn add_tester_to_group_by_name(
        &self,
        group_name: &str,
        email: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<AddTesterOutcome, AppStoreError> {
        let group_id = self
            .resolve_group_id_by_name(group_name)
            .await?
            .ok_or_else(|| AppStoreError::GroupNotFound {
                name: group_name.to_string(),
            })?;

        self.add_tester_to_group(&group_id, email, first_name, last_name)
            .await
    }

    /// Add a tester to a group, creating the tester if needed
    ///
    /// The tester is created with the group relationship in one request. If
    /// the email is already registered the existing tester is located and
    /// attached, unless it is already a member.
    ///
    /// # Arguments
    ///
    /// * `group_id` - The beta group to add the tester to
    /// * `email` - The tester's email address
    /// * `first_name` - Optional first name, used only when creating
    /// * `last_name` - Optional last name, used only when creating
    ///
    /// # Returns
    ///
    /// Returns `Ok(AddTesterOutcome)` describing how membership was reached.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use app_store_connect_sdk::{AppStoreConfig, BetaTesterClient};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let testers = BetaTesterClient::from_config(AppStoreConfig::from_env())?;
    ///
    /// let outcome = testers
    ///     .add_tester_to_group("group-id", "alice@example.com", Some("Alice"), None)
    ///     .await?;
    /// println!("{:?}", outcome);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// * `TesterResolution` if creation conflicted and the existing tester
    ///   could not be located
    /// * `GroupOrTesterNotFound`, `PermissionDenied`, `AttachConflict` or
    ///   `AttachFailed` if attaching the tester failed
    /// * `Api` for any other remote or transport failure
    pub async fn add_tester_to_group(
        &self,
        group_id: &str,
        email: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<AddTesterOutcome, AppStoreError> {
        // Create the tester already linked to the group
        let tester_id = match self.create_tester(group_id, email, first_name, last_name).await {
            Ok(tester_id) => {
                tracing::info!(
                    "Created tester with id: {} for email: {} and added to group {}",
                    tester_id,
                    email,
                    group_id
                );
                return Ok(AddTesterOutcome::Created);
            }
            Err(AppStoreError::Api(err)) if err.status() == Some(409) => {
                self.resolve_conflicting_tester(email, &err).await?
            }
            Err(e) => {
                tracing::error!("Error creating tester {}: {}", email, e);
                return Err(e);
            }
        };

        tracing::info!(
            "Tester already exists. Using id: {} for email: {}",
            tester_id,
            email
        );

        // Skip the write if the existing tester is already a member
        match self.is_member(group_id, &tester_id).await {
            Ok(true) => {
                tracing::info!(
                    "Tester {} ({}) is already in group {}. Skipping add.",
                    tester_id,
                    email,
                    group_id
                );
                return Ok(AddTesterOutcome::AlreadyMember);
            }
            Ok(false) => {}
            Err(e) => tracing::warn!(
                "Could not verify if tester {} is in group {}, proceeding with add: {}",
                tester_id,
                group_id,
                e
            ),
        }

        self.attach_tester(group_id, &tester_id, email).await
    }

    /// Remove a tester from a group
    pub async fn remove_tester_from_group(
        &self,
        group_id: &str,
        tester_id: &str,
    ) -> Result<(), AppStoreError> {
        let url = self.relationship_url(group_id);
        let body = RelationshipRequest::beta_testers([tester_id]);

        self.client
            .send_no_content(Method::DELETE, TokenPurpose::Connect, &url, &body)
            .await?;

        tracing::info!("Removed tester {} from group {}", tester_id, group_id);
        Ok(())
    }

    /// Make the "Public Testing" group contain exactly `emails`
    pub async fn update_public_testing_group<S: AsRef<str>>(
        &self,
        emails: &[S],
    ) -> Result<SyncReport, AppStoreError> {
        self.sync_group(PUBLIC_TESTING_GROUP, emails).await
    }

    /// Make the named group contain exactly `emails`
    ///
    /// Emails are compared exactly (case-sensitive). Additions run first, then
    /// removals, sequentially; the first failure aborts the remaining work.
    ///
    /// # Arguments
    ///
    /// * `group_name` - Exact name of the beta group
    /// * `emails` - The complete target membership
    ///
    /// # Returns
    ///
    /// Returns `Ok(SyncReport)` listing the emails added and removed, or
    /// `Err(AppStoreError::GroupNotFound)` if no group has that name.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use app_store_connect_sdk::{AppStoreConfig, BetaTesterClient};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let testers = BetaTesterClient::from_config(AppStoreConfig::from_env())?;
    ///
    /// let report = testers
    ///     .sync_group("External Testers", &["alice@example.com", "bob@example.com"])
    ///     .await?;
    /// println!("added {:?}, removed {:?}", report.added, report.removed);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn sync_group<S: AsRef<str>>(
        &self,
        group_name: &str,
        emails: &[S],
    ) -> Result<SyncReport, AppStoreError> {
        let group_id = self
            .resolve_group_id_by_name(group_name)
            .await?
            .ok_or_else(|| AppStoreError::GroupNotFound {
                name: group_name.to_string(),
            })?;

        // Diff current membership against the target
        let current = self.list_testers_in_group(&group_id).await?;
        let plan = plan_sync(&current, emails);

        tracing::info!(
            "Syncing group {} ({}): {} to add, {} to remove",
            group_name,
            group_id,
            plan.to_add.len(),
            plan.to_remove.len()
        );

        let mut report = SyncReport::default();

        for email in plan.to_add {
            self.add_tester_to_group(&group_id, email, None, None)
                .await?;
            report.added.push(email.to_string());
        }

        for tester in plan.to_remove {
            self.remove_tester_from_group(&group_id, &tester.id).await?;
            report
                .removed
                .push(tester.email().unwrap_or(&tester.id).to_string());
        }

        Ok(report)
    }

    /// POST the tester with its group relationship; returns the new id
    async fn create_tester(
        &self,
        group_id: &str,
        email: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<String, AppStoreError> {
        let url = self.client.url(TokenPurpose::Connect, "/v1/betaTesters");
        let body = BetaTesterCreateRequest::new(
            email,
            first_name.map(str::to_string),
            last_name.map(str::to_string),
            group_id,
        );

        let response: ResourceResponse<BetaTester> = self
            .client
            .send_json(Method::POST, TokenPurpose::Connect, &url, &body)
            .await?;
        Ok(response.data.id)
    }

    /// Locate the id of a tester whose creation returned 409
    async fn resolve_conflicting_tester(
        &self,
        email: &str,
        conflict: &ApiError,
    ) -> Result<String, AppStoreError> {
        let document = conflict.error_document().unwrap_or_default();

        match classify_conflict(document.first_detail()) {
            ConflictKind::RelationshipRequired => tracing::info!(
                "Relationship required error (409) - tester may already exist. Attempting to find tester ID for email: {}",
                email
            ),
            ConflictKind::TesterExists => tracing::info!(
                "Tester already exists (409). Attempting to find tester ID for email: {}",
                email
            ),
            ConflictKind::Unknown => tracing::info!(
                "Conflict (409) creating tester: {}. Attempting to find tester ID for email: {}",
                document.first_detail(),
                email
            ),
        }

        if let Some(id) = document.existing_resource_id() {
            tracing::info!(
                "Found tester ID from error response meta: {} for email: {}",
                id,
                email
            );
            return Ok(id.to_string());
        }

        if let Some(id) = document.included_tester_id(email) {
            tracing::info!(
                "Found tester ID from error response included: {} for email: {}",
                id,
                email
            );
            return Ok(id.to_string());
        }

        if let ApiError::Http { message, .. } = conflict {
            let truncated: String = message.chars().take(MAX_LOGGED_BODY_CHARS).collect();
            tracing::debug!("Conflict response structure: {}", truncated);
        }

        match self.find_tester_by_email(email).await {
            TesterLookup::Found(tester) => {
                tracing::info!(
                    "Found tester ID via email filter: {} for email: {}",
                    tester.id,
                    email
                );
                return Ok(tester.id);
            }
            TesterLookup::NotFound => {
                tracing::debug!("Email filter returned no tester for {}", email)
            }
            TesterLookup::LookupFailed(_) => {}
        }

        tracing::info!(
            "Email filter failed. Attempting to search all testers for email: {}",
            email
        );
        match self.list_all_testers().await {
            Ok(testers) => {
                let wanted = email.to_lowercase();
                if let Some(tester) = testers
                    .iter()
                    .find(|t| t.email().is_some_and(|e| e.to_lowercase() == wanted))
                {
                    tracing::info!(
                        "Found tester ID via full search: {} for email: {}",
                        tester.id,
                        email
                    );
                    return Ok(tester.id.clone());
                }
                tracing::info!(
                    "Tester not found in {} total testers for email: {}",
                    testers.len(),
                    email
                );
            }
            Err(e) => tracing::error!("Error searching all testers: {}", e),
        }

        tracing::error!(
            "Could not find tester ID for {}. Error response: {}",
            email,
            conflict
        );
        Err(AppStoreError::TesterResolution {
            email: email.to_string(),
        })
    }

    async fn is_member(&self, group_id: &str, tester_id: &str) -> Result<bool, AppStoreError> {
        let testers = self.list_testers_in_group(group_id).await?;
        Ok(testers.iter().any(|t| t.id == tester_id))
    }

    /// Link an existing tester to a group, resolving attach conflicts
    async fn attach_tester(
        &self,
        group_id: &str,
        tester_id: &str,
        email: &str,
    ) -> Result<AddTesterOutcome, AppStoreError> {
        let url = self.relationship_url(group_id);
        let body = RelationshipRequest::beta_testers([tester_id]);

        let err = match self
            .client
            .send_no_content(Method::POST, TokenPurpose::Connect, &url, &body)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    "Successfully added tester {} ({}) to group {}",
                    tester_id,
                    email,
                    group_id
                );
                return Ok(AddTesterOutcome::Attached);
            }
            Err(AppStoreError::Api(err)) => err,
            Err(e) => return Err(e),
        };

        match err.status() {
            Some(409) => {
                match self.is_member(group_id, tester_id).await {
                    Ok(true) => {
                        tracing::info!(
                            "Tester {} ({}) is now in group {} (race condition resolved).",
                            tester_id,
                            email,
                            group_id
                        );
                        return Ok(AddTesterOutcome::ConfirmedAttached);
                    }
                    Ok(false) => {}
                    Err(e) => tracing::warn!(
                        "Could not re-check group {} after attach conflict: {}",
                        group_id,
                        e
                    ),
                }

                let detail = match &err {
                    ApiError::Http { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                tracing::error!(
                    "409 Conflict when adding tester {} to group {}. Error details: {}",
                    tester_id,
                    group_id,
                    detail
                );
                Err(AppStoreError::AttachConflict {
                    email: email.to_string(),
                    group_id: group_id.to_string(),
                    tester_id: tester_id.to_string(),
                    detail,
                })
            }
            Some(404) => Err(AppStoreError::GroupOrTesterNotFound {
                group_id: group_id.to_string(),
                tester_id: tester_id.to_string(),
            }),
            Some(403) => Err(AppStoreError::PermissionDenied {
                group_id: group_id.to_string(),
                tester_id: tester_id.to_string(),
            }),
            Some(status) => {
                tracing::error!(
                    "Error adding tester {} to group {} ({}): {}",
                    tester_id,
                    group_id,
                    status,
                    err
                );
                Err(AppStoreError::AttachFailed {
                    email: email.to_string(),
                    status,
                    detail: err.remote_detail(),
                })
            }
            None => {
                tracing::error!("Error adding tester {} to group: {}", email, err);
                Err(AppStoreError::Api(err))
            }
        }
    }

    fn relationship_url(&self, group_id: &str) -> String {
        self.client.url(
            TokenPurpose::Connect,
            &format!("/v1/betaGroups/{}/relationships/betaTesters", group_id),
        )
    }
}

/// Additions and removals needed to turn `current` into `target`
struct SyncPlan<'a> {
    to_add: Vec<&'a str>,
    to_remove: Vec<&'a BetaTester>,
}

/// Exact, case-sensitive set difference; target duplicates collapse to the
/// first occurrence. Members without an email are never in the target.
fn plan_sync<'a, S: AsRef<str>>(current: &'a [BetaTester], target: &'a [S]) -> SyncPlan<'a> {
    let current_emails: HashSet<&str> = current.iter().filter_map(|t| t.email()).collect();

    let mut seen = HashSet::new();
    let target: Vec<&str> = target
        .iter()
        .map(|e| e.as_ref())
        .filter(|e| seen.insert(*e))
        .collect();

    let to_add = target
        .iter()
        .copied()
        .filter(|e| !current_emails.contains(e))
        .collect();

    let to_remove = current
        .iter()
        .filter(|t| t.email().map_or(true, |e| !seen.contains(e)))
        .collect();

    SyncPlan { to_add, to_remove }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_store_api::resources::BetaTesterAttributes;

    fn tester(id: &str, email: Option<&str>) -> BetaTester {
        BetaTester {
            resource_type: "betaTesters".to_string(),
            id: id.to_string(),
            attributes: BetaTesterAttributes {
                email: email.map(str::to_string),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_classify_conflict() {
        assert_eq!(
            classify_conflict("Tester already exists"),
            ConflictKind::TesterExists
        );
        assert_eq!(
            classify_conflict("A relationship is required for betaGroups or builds"),
            ConflictKind::RelationshipRequired
        );
        assert_eq!(
            classify_conflict("You must provide betaGroups or builds"),
            ConflictKind::RelationshipRequired
        );
        assert_eq!(classify_conflict(""), ConflictKind::Unknown);
        assert_eq!(
            classify_conflict("Something else entirely"),
            ConflictKind::Unknown
        );
    }

    #[test]
    fn test_plan_sync_adds_and_removes() {
        let current = vec![tester("a", Some("a@x.com")), tester("b", Some("b@x.com"))];
        let target = ["b@x.com", "c@x.com"];

        let plan = plan_sync(&current, &target);

        assert_eq!(plan.to_add, vec!["c@x.com"]);
        assert_eq!(plan.to_remove.len(), 1);
        assert_eq!(plan.to_remove[0].id, "a");
    }

    #[test]
    fn test_plan_sync_is_case_sensitive() {
        let current = vec![tester("a", Some("A@x.com"))];
        let target = ["a@x.com"];

        let plan = plan_sync(&current, &target);

        assert_eq!(plan.to_add, vec!["a@x.com"]);
        assert_eq!(plan.to_remove[0].id, "a");
    }

    #[test]
    fn test_plan_sync_dedupes_target_and_removes_emailless_members() {
        let current = vec![tester("n", None)];
        let target = ["c@x.com".to_string(), "c@x.com".to_string()];

        let plan = plan_sync(&current, &target);

        assert_eq!(plan.to_add, vec!["c@x.com"]);
        assert_eq!(plan.to_remove.len(), 1);
        assert_eq!(plan.to_remove[0].id, "n");
    }

    #[test]
    fn test_plan_sync_no_changes() {
        let current = vec![tester("a", Some("a@x.com"))];
        let target = ["a@x.com"];

        let plan = plan_sync(&current, &target);

        assert!(plan.to_add.is_empty());
        assert!(plan.to_remove.is_empty());
    }

    #[test]
    fn test_tester_lookup_into_tester() {
        assert!(TesterLookup::NotFound.into_tester().is_none());
        assert!(TesterLookup::LookupFailed(AppStoreError::Config("x".into()))
            .into_tester()
            .is_none());
        let found = TesterLookup::Found(tester("t", Some("t@x.com")));
        assert!(found.is_found());
        assert_eq!(found.into_tester().unwrap().id, "t");
    }
}
