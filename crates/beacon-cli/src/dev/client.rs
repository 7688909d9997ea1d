//! The reload-decision state machine.
//!
//! This is the canonical form of the policy the browser-side runtime
//! applies to build status messages (the shipped script in
//! `assets/runtime/index.js` mirrors it). State is one explicit object
//! per page session, keyed by bundle name, never shared across tabs.
//!
//! The load-bearing rule: the first message ever seen for a name never
//! triggers a reload. The page has already loaded the initially-built
//! bundle, so reloading on the first status message would loop forever
//! at startup.

use std::collections::HashMap;

use super::protocol::BuildStatus;
use super::RUNTIME_BUNDLE;

/// Warnings surfaced to the console before the overflow notice.
const MAX_CONSOLE_WARNINGS: usize = 5;

/// What the browser runtime should do in response to one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Force a full page reload.
    Reload,
    /// Dismiss stale error state (console + overlay).
    ClearErrors,
    /// Surface one warning to the developer console.
    LogWarning(String),
    /// More warnings exist than are shown; point at the terminal.
    WarningOverflow,
    /// Surface one error to the developer console.
    LogError(String),
    /// Display the full-screen overlay with this formatted error.
    ShowOverlay(String),
}

#[derive(Debug, Default)]
struct ChannelState {
    first_compilation: bool,
    is_building: bool,
    has_compile_errors: bool,
}

/// Per-tab reload client. Create one per page session and feed every
/// push-channel message through [`ReloadClient::on_message`].
#[derive(Debug, Default)]
pub struct ReloadClient {
    channels: HashMap<String, ChannelState>,
}

impl ReloadClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one build status message, returning the actions to take
    /// in order.
    pub fn on_message(&mut self, msg: &BuildStatus) -> Vec<ClientAction> {
        // First message for a name establishes the baseline.
        let state = self
            .channels
            .entry(msg.name.clone())
            .and_modify(|s| s.first_compilation = false)
            .or_insert_with(|| ChannelState {
                first_compilation: true,
                ..ChannelState::default()
            });
        let first = state.first_compilation;

        if msg.name == RUNTIME_BUNDLE {
            // The support runtime itself changed; no partial recovery.
            return if first { vec![] } else { vec![ClientAction::Reload] };
        }

        let mut actions = Vec::new();
        state.is_building = msg.building;

        if msg.building {
            if !first && state.has_compile_errors {
                actions.push(ClientAction::ClearErrors);
            }
            return actions;
        }

        let (warnings, errors) = match &msg.result {
            Some(report) => (report.warnings.as_slice(), report.errors.as_slice()),
            None => (&[][..], &[][..]),
        };

        let successful = !first && warnings.is_empty() && errors.is_empty();
        if successful {
            state.has_compile_errors = false;
            actions.push(ClientAction::Reload);
            return actions;
        }

        state.has_compile_errors = true;
        if !first {
            actions.push(ClientAction::ClearErrors);
        }

        for (i, warning) in warnings.iter().enumerate() {
            if i == MAX_CONSOLE_WARNINGS {
                actions.push(ClientAction::WarningOverflow);
                break;
            }
            actions.push(ClientAction::LogWarning(warning.clone()));
        }

        for error in errors {
            actions.push(ClientAction::LogError(error.clone()));
        }

        if let Some(primary) = errors.first() {
            actions.push(ClientAction::ShowOverlay(primary.clone()));
        }

        actions
    }

    /// Whether the named channel currently shows compile errors.
    pub fn has_compile_errors(&self, name: &str) -> bool {
        self.channels
            .get(name)
            .is_some_and(|s| s.has_compile_errors)
    }

    /// Whether the named channel is mid-rebuild.
    pub fn is_building(&self, name: &str) -> bool {
        self.channels.get(name).is_some_and(|s| s.is_building)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::BuildReport;

    fn finished(name: &str, warnings: &[&str], errors: &[&str]) -> BuildStatus {
        BuildStatus::finished(
            name,
            BuildReport {
                warnings: warnings.iter().map(|s| s.to_string()).collect(),
                errors: errors.iter().map(|s| s.to_string()).collect(),
            },
        )
    }

    fn count_reloads(actions: &[ClientAction]) -> usize {
        actions.iter().filter(|a| **a == ClientAction::Reload).count()
    }

    #[test]
    fn test_first_runtime_message_is_inert() {
        let mut client = ReloadClient::new();
        let actions = client.on_message(&finished("runtime", &[], &[]));
        assert!(actions.is_empty());
    }

    #[test]
    fn test_every_runtime_message_after_the_first_reloads() {
        let mut client = ReloadClient::new();
        client.on_message(&finished("runtime", &[], &[]));

        let second = client.on_message(&BuildStatus::started("runtime"));
        assert_eq!(count_reloads(&second), 1);

        let third = client.on_message(&finished("runtime", &[], &[]));
        assert_eq!(count_reloads(&third), 1);
    }

    #[test]
    fn test_first_app_message_never_reloads_even_if_clean() {
        let mut client = ReloadClient::new();
        let actions = client.on_message(&finished("app", &[], &[]));
        assert_eq!(count_reloads(&actions), 0);
        // a clean first build still marks error state, matching the
        // success rule (first compile is never "successful")
        assert!(client.has_compile_errors("app"));
    }

    #[test]
    fn test_clean_rebuild_reloads_exactly_once() {
        let mut client = ReloadClient::new();
        client.on_message(&finished("app", &[], &[]));

        let actions = client.on_message(&finished("app", &[], &[]));
        assert_eq!(count_reloads(&actions), 1);
        assert!(!client.has_compile_errors("app"));
    }

    #[test]
    fn test_warnings_alone_block_reload() {
        let mut client = ReloadClient::new();
        client.on_message(&finished("app", &[], &[]));

        let actions = client.on_message(&finished("app", &["unused import"], &[]));
        assert_eq!(count_reloads(&actions), 0);
        assert!(actions.contains(&ClientAction::LogWarning("unused import".to_string())));
        assert!(!actions.iter().any(|a| matches!(a, ClientAction::ShowOverlay(_))));
    }

    #[test]
    fn test_errors_populate_console_and_overlay() {
        let mut client = ReloadClient::new();
        client.on_message(&finished("app", &[], &[]));

        let actions = client.on_message(&finished("app", &[], &["E1", "E2"]));
        assert_eq!(count_reloads(&actions), 0);
        assert!(actions.contains(&ClientAction::LogError("E1".to_string())));
        assert!(actions.contains(&ClientAction::LogError("E2".to_string())));
        assert!(actions.contains(&ClientAction::ShowOverlay("E1".to_string())));
        assert!(client.has_compile_errors("app"));
    }

    #[test]
    fn test_warnings_beyond_five_collapse_into_one_notice() {
        let mut client = ReloadClient::new();
        client.on_message(&finished("app", &[], &[]));

        let warnings = ["w1", "w2", "w3", "w4", "w5", "w6", "w7"];
        let actions = client.on_message(&finished("app", &warnings, &["E"]));

        let logged = actions
            .iter()
            .filter(|a| matches!(a, ClientAction::LogWarning(_)))
            .count();
        let overflows = actions
            .iter()
            .filter(|a| **a == ClientAction::WarningOverflow)
            .count();
        assert_eq!(logged, 5);
        assert_eq!(overflows, 1);
    }

    #[test]
    fn test_building_clears_stale_errors_only_after_first_compile() {
        let mut client = ReloadClient::new();

        // first compile fails; building:true for the first message would
        // clear an error that was never displayed, so it must not
        let actions = client.on_message(&BuildStatus::started("app"));
        assert!(actions.is_empty());
        client.on_message(&finished("app", &[], &["E"]));

        // next rebuild starts: the stale overlay goes away
        let actions = client.on_message(&BuildStatus::started("app"));
        assert_eq!(actions, vec![ClientAction::ClearErrors]);
        assert!(client.is_building("app"));
    }

    #[test]
    fn test_channels_are_independent() {
        let mut client = ReloadClient::new();
        client.on_message(&finished("app", &[], &["E"]));

        // a first runtime message is inert regardless of app state
        let actions = client.on_message(&finished("runtime", &[], &[]));
        assert!(actions.is_empty());
        assert!(client.has_compile_errors("app"));
        assert!(!client.has_compile_errors("runtime"));
    }
}
