//! Flow actions: launching apps and URLs, switching accounts

use appletv_api::{LaunchableApp, RemoteChannel, UserAccount};
use serde::Serialize;
use tracing::info;
use url::Url;

use crate::error::Result;

/// An action the host's automation flows can run against a device
#[derive(Debug, Clone, PartialEq)]
pub enum FlowAction {
    LaunchApp(String),
    LaunchUrl(Url),
    SwitchAccount(String),
    ListApps,
    ListAccounts,
}

impl FlowAction {
    pub fn name(&self) -> &'static str {
        match self {
            FlowAction::LaunchApp(_) => "launch_app",
            FlowAction::LaunchUrl(_) => "launch_url",
            FlowAction::SwitchAccount(_) => "switch_account",
            FlowAction::ListApps => "app autocomplete",
            FlowAction::ListAccounts => "account autocomplete",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Done,
    Apps(Vec<LaunchableApp>),
    Accounts(Vec<UserAccount>),
}

/// Run `action` on a connected remote/input channel
pub async fn run(remote: &dyn RemoteChannel, action: FlowAction) -> Result<ActionOutcome> {
    match action {
        FlowAction::LaunchApp(bundle_id) => {
            info!(%bundle_id, "Launching app");
            remote.launch_app(&bundle_id).await?;
        }
        FlowAction::LaunchUrl(url) => {
            info!(%url, "Launching url");
            remote.launch_url(&url).await?;
        }
        FlowAction::SwitchAccount(account_id) => {
            info!(%account_id, "Switching user account");
            remote.switch_user_account(&account_id).await?;
        }
        FlowAction::ListApps => return Ok(ActionOutcome::Apps(remote.launchable_apps().await?)),
        FlowAction::ListAccounts => return Ok(ActionOutcome::Accounts(remote.user_accounts().await?)),
    }
    Ok(ActionOutcome::Done)
}

/// One entry of an argument autocomplete list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutocompleteItem {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Apps whose name contains `query`, sorted by name
pub fn app_suggestions(apps: Vec<LaunchableApp>, query: &str) -> Vec<AutocompleteItem> {
    suggestions(
        apps.into_iter().map(|app| AutocompleteItem {
            description: Some(app.bundle_id.clone()),
            id: app.bundle_id,
            name: app.name,
        }),
        query,
    )
}

/// Accounts whose name contains `query`, sorted by name
pub fn account_suggestions(accounts: Vec<UserAccount>, query: &str) -> Vec<AutocompleteItem> {
    suggestions(
        accounts.into_iter().map(|account| AutocompleteItem {
            id: account.account_id,
            name: account.name,
            description: None,
        }),
        query,
    )
}

fn suggestions<I>(items: I, query: &str) -> Vec<AutocompleteItem>
where
    I: Iterator<Item = AutocompleteItem>,
{
    let needle = query.to_lowercase();
    let keep_all = query.trim().is_empty();

    let mut items: Vec<_> = items
        .filter(|item| keep_all || item.name.to_lowercase().contains(&needle))
        .collect();
    items.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
    items
}
